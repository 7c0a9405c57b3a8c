//! Outbound calls to the Slack Web API.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use brainrelay_core::config::SlackConfig;
use brainrelay_core::domain::thread::{ChannelId, MessageId, ThreadId};
use brainrelay_core::errors::ChatPlatformError;

use crate::blocks::{Block, MessageTemplate};

const POST_MESSAGE: &str = "chat.postMessage";
const DELETE_MESSAGE: &str = "chat.delete";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// The chat surface the relay writes to.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Posts `message` as a reply in `thread` and returns the new message's id.
    async fn post_message(
        &self,
        channel: &ChannelId,
        thread: &ThreadId,
        message: &MessageTemplate,
    ) -> Result<MessageId, ChatPlatformError>;

    async fn delete_message(
        &self,
        channel: &ChannelId,
        message: &MessageId,
    ) -> Result<(), ChatPlatformError>;
}

#[derive(Serialize)]
struct PostMessageRequest<'a> {
    channel: &'a str,
    thread_ts: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "<[Block]>::is_empty")]
    blocks: &'a [Block],
    unfurl_links: bool,
}

#[derive(Serialize)]
struct DeleteMessageRequest<'a> {
    channel: &'a str,
    ts: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    ts: Option<String>,
}

pub struct SlackWebClient {
    http: reqwest::Client,
    base_url: String,
    bot_token: SecretString,
}

impl SlackWebClient {
    pub fn new(
        base_url: impl Into<String>,
        bot_token: SecretString,
        timeout: Duration,
    ) -> Result<Self, ChatPlatformError> {
        let http = reqwest::Client::builder().timeout(timeout).build().map_err(|err| {
            ChatPlatformError::Transport { method: "client".to_owned(), message: err.to_string() }
        })?;
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Ok(Self { http, base_url, bot_token })
    }

    pub fn from_config(config: &SlackConfig) -> Result<Self, ChatPlatformError> {
        Self::new(
            config.api_base_url.clone(),
            config.bot_token.clone(),
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
    }

    async fn call<T: Serialize + ?Sized>(
        &self,
        method: &str,
        body: &T,
    ) -> Result<ApiResponse, ChatPlatformError> {
        let url = format!("{}/{method}", self.base_url);
        let transport = |err: reqwest::Error| ChatPlatformError::Transport {
            method: method.to_owned(),
            message: err.to_string(),
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(self.bot_token.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatPlatformError::Api {
                method: method.to_owned(),
                error: format!("http_status_{}", status.as_u16()),
            });
        }

        let parsed: ApiResponse = response.json().await.map_err(transport)?;
        if !parsed.ok {
            return Err(ChatPlatformError::Api {
                method: method.to_owned(),
                error: parsed.error.unwrap_or_else(|| "unknown_error".to_owned()),
            });
        }
        Ok(parsed)
    }
}

#[async_trait]
impl ChatPlatform for SlackWebClient {
    async fn post_message(
        &self,
        channel: &ChannelId,
        thread: &ThreadId,
        message: &MessageTemplate,
    ) -> Result<MessageId, ChatPlatformError> {
        let request = PostMessageRequest {
            channel: &channel.0,
            thread_ts: &thread.ts,
            text: &message.fallback_text,
            blocks: &message.blocks,
            unfurl_links: false,
        };

        let response = self.call(POST_MESSAGE, &request).await?;
        let ts = response.ts.ok_or_else(|| ChatPlatformError::Api {
            method: POST_MESSAGE.to_owned(),
            error: "missing_ts".to_owned(),
        })?;
        debug!(channel_id = %channel, thread_id = %thread, message_id = %ts, "posted slack message");
        Ok(MessageId(ts))
    }

    async fn delete_message(
        &self,
        channel: &ChannelId,
        message: &MessageId,
    ) -> Result<(), ChatPlatformError> {
        let request = DeleteMessageRequest { channel: &channel.0, ts: &message.0 };
        match self.call(DELETE_MESSAGE, &request).await {
            Ok(_) => Ok(()),
            // Already gone is what we wanted.
            Err(ChatPlatformError::Api { error, .. }) if error == "message_not_found" => Ok(()),
            Err(error) => Err(error),
        }
    }
}
