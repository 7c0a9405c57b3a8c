//! Client for the Quivr question-answering API.
//!
//! Endpoints used:
//! - `GET /brains/` lists knowledge bases
//! - `POST /chat` opens a chat session
//! - `POST /chat/{chat_id}/question[?brain_id=…]` asks within a session

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use brainrelay_core::config::QuivrConfig;
use brainrelay_core::domain::answer::{Answer, Source};
use brainrelay_core::domain::knowledge_base::{
    KnowledgeBase, KnowledgeBaseId, KnowledgeBaseSelection,
};
use brainrelay_core::domain::thread::SessionId;
use brainrelay_core::errors::RemoteApiError;

/// Error bodies are kept for logs only; cap what we hold on to.
const MAX_ERROR_BODY_CHARS: usize = 512;

#[async_trait]
pub trait QuestionAnsweringApi: Send + Sync {
    async fn list_knowledge_bases(&self) -> Result<Vec<KnowledgeBase>, RemoteApiError>;

    async fn create_session(&self, name: &str) -> Result<SessionId, RemoteApiError>;

    /// `knowledge_base` of `None` lets the backend pick.
    async fn ask_question(
        &self,
        session_id: &SessionId,
        question: &str,
        knowledge_base: Option<&KnowledgeBaseId>,
    ) -> Result<Answer, RemoteApiError>;
}

#[derive(Deserialize)]
struct BrainsResponse {
    #[serde(default)]
    brains: Vec<BrainEntry>,
}

#[derive(Deserialize)]
struct BrainEntry {
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Serialize)]
struct CreateChatRequest<'a> {
    name: &'a str,
}

#[derive(Deserialize)]
struct CreateChatResponse {
    chat_id: String,
}

#[derive(Serialize)]
struct QuestionRequest<'a> {
    question: &'a str,
}

#[derive(Deserialize)]
struct QuestionResponse {
    #[serde(default)]
    assistant: Option<String>,
    #[serde(default)]
    brain_id: Option<String>,
    #[serde(default)]
    metadata: Option<QuestionMetadata>,
}

#[derive(Deserialize)]
struct QuestionMetadata {
    #[serde(default)]
    sources: Vec<SourceEntry>,
}

#[derive(Deserialize)]
struct SourceEntry {
    #[serde(default)]
    name: String,
    #[serde(default, alias = "url")]
    source_url: String,
}

impl From<QuestionResponse> for Answer {
    fn from(response: QuestionResponse) -> Self {
        let knowledge_base_id = response
            .brain_id
            .map(|id| KnowledgeBaseSelection::from_stored(&id))
            .and_then(|selection| selection.remote_id().cloned());
        let sources = response
            .metadata
            .map(|metadata| metadata.sources)
            .unwrap_or_default()
            .into_iter()
            .map(|source| Source::new(source.name, source.source_url))
            .collect();

        Answer { text: response.assistant, knowledge_base_id, sources }
    }
}

pub struct QuivrClient {
    http: reqwest::Client,
    base_url: String,
    api_key: SecretString,
}

impl QuivrClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: SecretString,
        timeout: Duration,
    ) -> Result<Self, RemoteApiError> {
        let http = reqwest::Client::builder().timeout(timeout).build().map_err(|err| {
            RemoteApiError::Transport { endpoint: "client".to_owned(), message: err.to_string() }
        })?;
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Ok(Self { http, base_url, api_key })
    }

    pub fn from_config(config: &QuivrConfig) -> Result<Self, RemoteApiError> {
        Self::new(
            config.base_url.clone(),
            config.api_key.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    async fn send<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, RemoteApiError> {
        let response = request
            .bearer_auth(self.api_key.expose_secret())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|err| RemoteApiError::Transport {
                endpoint: endpoint.to_owned(),
                message: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteApiError::Status {
                endpoint: endpoint.to_owned(),
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        response.json::<T>().await.map_err(|err| RemoteApiError::Decode {
            endpoint: endpoint.to_owned(),
            message: err.to_string(),
        })
    }
}

#[async_trait]
impl QuestionAnsweringApi for QuivrClient {
    async fn list_knowledge_bases(&self) -> Result<Vec<KnowledgeBase>, RemoteApiError> {
        let endpoint = "GET /brains/";
        let request = self.http.get(format!("{}/brains/", self.base_url));
        let response: BrainsResponse = self.send(endpoint, request).await?;

        debug!(endpoint, count = response.brains.len(), "listed knowledge bases");
        Ok(response.brains.into_iter().map(|brain| KnowledgeBase::new(brain.id, brain.name)).collect())
    }

    async fn create_session(&self, name: &str) -> Result<SessionId, RemoteApiError> {
        let endpoint = "POST /chat";
        let request =
            self.http.post(format!("{}/chat", self.base_url)).json(&CreateChatRequest { name });
        let response: CreateChatResponse = self.send(endpoint, request).await?;

        if response.chat_id.trim().is_empty() {
            return Err(RemoteApiError::Decode {
                endpoint: endpoint.to_owned(),
                message: "empty chat_id".to_owned(),
            });
        }
        Ok(SessionId(response.chat_id))
    }

    async fn ask_question(
        &self,
        session_id: &SessionId,
        question: &str,
        knowledge_base: Option<&KnowledgeBaseId>,
    ) -> Result<Answer, RemoteApiError> {
        let endpoint = "POST /chat/{chat_id}/question";
        let mut request = self
            .http
            .post(format!("{}/chat/{}/question", self.base_url, session_id.0))
            .json(&QuestionRequest { question });
        if let Some(knowledge_base) = knowledge_base {
            request = request.query(&[("brain_id", knowledge_base.0.as_str())]);
        }

        let response: QuestionResponse = self.send(endpoint, request).await?;
        Ok(Answer::from(response))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use brainrelay_core::domain::answer::Source;
    use brainrelay_core::domain::knowledge_base::{KnowledgeBase, KnowledgeBaseId};
    use brainrelay_core::domain::thread::SessionId;
    use brainrelay_core::errors::RemoteApiError;

    use super::{QuestionAnsweringApi, QuivrClient};

    fn client(base_url: String) -> QuivrClient {
        QuivrClient::new(base_url, "quivr-test-key".to_owned().into(), Duration::from_secs(5))
            .expect("client")
    }

    #[tokio::test]
    async fn lists_brains_with_bearer_auth() {
        let mock_server = httpmock::MockServer::start_async().await;
        let mock = mock_server
            .mock_async(|when, then| {
                when.method(httpmock::Method::GET)
                    .path("/brains/")
                    .header("authorization", "Bearer quivr-test-key");
                then.status(200).header("content-type", "application/json").body(
                    r#"{"brains":[{"id":"kb1","name":"Docs","status":"private"},{"id":"kb2","name":"Wiki"}]}"#,
                );
            })
            .await;

        let brains = client(mock_server.base_url()).list_knowledge_bases().await.expect("list");

        assert_eq!(brains, vec![KnowledgeBase::new("kb1", "Docs"), KnowledgeBase::new("kb2", "Wiki")]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn creates_named_chat_session() {
        let mock_server = httpmock::MockServer::start_async().await;
        let mock = mock_server
            .mock_async(|when, then| {
                when.method(httpmock::Method::POST)
                    .path("/chat")
                    .body_contains(r#""name":"Slack Chat""#);
                then.status(200)
                    .header("content-type", "application/json")
                    .body(r#"{"chat_id":"chat-123","chat_name":"Slack Chat"}"#);
            })
            .await;

        let session = client(mock_server.base_url()).create_session("Slack Chat").await.expect("create");

        assert_eq!(session, SessionId("chat-123".to_owned()));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn question_sends_brain_id_as_query_and_reads_sources() {
        let mock_server = httpmock::MockServer::start_async().await;
        let mock = mock_server
            .mock_async(|when, then| {
                when.method(httpmock::Method::POST)
                    .path("/chat/chat-123/question")
                    .query_param("brain_id", "kb42")
                    .body_contains(r#""question":"what is X""#);
                then.status(200).header("content-type", "application/json").body(
                    r#"{
                        "assistant": "X is a thing.",
                        "brain_id": "kb42",
                        "metadata": {"sources": [
                            {"name": "guide.pdf", "source_url": "https://example.com/guide.pdf"}
                        ]}
                    }"#,
                );
            })
            .await;

        let answer = client(mock_server.base_url())
            .ask_question(
                &SessionId("chat-123".to_owned()),
                "what is X",
                Some(&KnowledgeBaseId("kb42".to_owned())),
            )
            .await
            .expect("ask");

        assert_eq!(answer.text(), Some("X is a thing."));
        assert_eq!(answer.knowledge_base_id, Some(KnowledgeBaseId("kb42".to_owned())));
        assert_eq!(answer.sources, vec![Source::new("guide.pdf", "https://example.com/guide.pdf")]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn question_without_brain_tolerates_missing_answer() {
        let mock_server = httpmock::MockServer::start_async().await;
        let mock = mock_server
            .mock_async(|when, then| {
                when.method(httpmock::Method::POST).path("/chat/chat-1/question");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(r#"{"brain_id":"00000000-0000-0000-0000-000000000000"}"#);
            })
            .await;

        let answer = client(mock_server.base_url())
            .ask_question(&SessionId("chat-1".to_owned()), "anything", None)
            .await
            .expect("ask");

        assert_eq!(answer.text(), None);
        assert_eq!(answer.knowledge_base_id, None);
        assert!(answer.sources.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_carries_endpoint_and_status() {
        let mock_server = httpmock::MockServer::start_async().await;
        let mock = mock_server
            .mock_async(|when, then| {
                when.any_request();
                then.status(401).body("unauthorized");
            })
            .await;

        let error = client(mock_server.base_url())
            .list_knowledge_bases()
            .await
            .expect_err("401 should fail");

        assert_eq!(error.endpoint(), "GET /brains/");
        assert_eq!(error.status(), Some(401));
        assert!(matches!(error, RemoteApiError::Status { ref body, .. } if body == "unauthorized"));
        assert_eq!(mock.hits(), 1, "failures are not retried");
    }
}
