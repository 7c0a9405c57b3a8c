//! Inbound Slack HTTP bodies, parsed once into typed envelopes.
//!
//! Events API deliveries arrive as JSON; interactivity (button clicks)
//! arrives form-encoded with the JSON document in a `payload` field.

use serde::Deserialize;
use thiserror::Error;

use crate::events::{AppMentionEvent, BlockActionEvent, SlackEnvelope, SlackEvent};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("request body is not valid JSON: {0}")]
    Json(String),
    #[error("interaction body has no `payload` field")]
    MissingPayloadField,
    #[error("payload is missing required field `{0}`")]
    MissingField(&'static str),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundRequest {
    UrlVerification { challenge: String },
    Event(SlackEnvelope),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum EventsApiBody {
    UrlVerification {
        challenge: String,
    },
    EventCallback {
        #[serde(default)]
        event_id: Option<String>,
        event: serde_json::Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct RawAppMention {
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    text: String,
    ts: String,
    channel: String,
    #[serde(default)]
    thread_ts: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawInteraction {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    trigger_id: Option<String>,
    #[serde(default)]
    user: Option<RawId>,
    #[serde(default)]
    channel: Option<RawId>,
    #[serde(default)]
    container: Option<RawContainer>,
    #[serde(default)]
    message: Option<RawMessage>,
    #[serde(default)]
    actions: Vec<RawAction>,
}

#[derive(Debug, Deserialize)]
struct RawId {
    id: String,
}

#[derive(Debug, Deserialize)]
struct RawContainer {
    #[serde(default)]
    channel_id: Option<String>,
    #[serde(default)]
    message_ts: Option<String>,
    #[serde(default)]
    thread_ts: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(default)]
    ts: Option<String>,
    #[serde(default)]
    thread_ts: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawAction {
    action_id: String,
    #[serde(default)]
    text: Option<RawText>,
    #[serde(default)]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawText {
    text: String,
}

pub fn parse_events_body(body: &[u8]) -> Result<InboundRequest, PayloadError> {
    let parsed: EventsApiBody =
        serde_json::from_slice(body).map_err(|err| PayloadError::Json(err.to_string()))?;

    match parsed {
        EventsApiBody::UrlVerification { challenge } => {
            Ok(InboundRequest::UrlVerification { challenge })
        }
        EventsApiBody::EventCallback { event_id, event } => {
            let envelope_id = event_id.unwrap_or_else(|| "unknown-event-id".to_owned());
            let event = parse_callback_event(event)?;
            Ok(InboundRequest::Event(SlackEnvelope { envelope_id, event }))
        }
        EventsApiBody::Other => Ok(InboundRequest::Event(SlackEnvelope {
            envelope_id: "unknown-event-id".to_owned(),
            event: SlackEvent::Unsupported { event_type: "unknown_envelope".to_owned() },
        })),
    }
}

fn parse_callback_event(event: serde_json::Value) -> Result<SlackEvent, PayloadError> {
    let event_type = event.get("type").and_then(|value| value.as_str()).unwrap_or("").to_owned();
    if event_type != "app_mention" {
        return Ok(SlackEvent::Unsupported { event_type });
    }

    let raw: RawAppMention =
        serde_json::from_value(event).map_err(|err| PayloadError::Json(err.to_string()))?;

    Ok(SlackEvent::AppMention(AppMentionEvent {
        channel_id: raw.channel,
        ts: raw.ts,
        thread_ts: raw.thread_ts,
        user_id: raw.user,
        text: raw.text,
    }))
}

pub fn parse_interaction_body(body: &[u8]) -> Result<SlackEnvelope, PayloadError> {
    let payload = url::form_urlencoded::parse(body)
        .find(|(key, _)| key == "payload")
        .map(|(_, value)| value.into_owned())
        .ok_or(PayloadError::MissingPayloadField)?;

    let raw: RawInteraction =
        serde_json::from_str(&payload).map_err(|err| PayloadError::Json(err.to_string()))?;
    let envelope_id = raw.trigger_id.clone().unwrap_or_else(|| "unknown-trigger-id".to_owned());

    if raw.kind != "block_actions" {
        return Ok(SlackEnvelope { envelope_id, event: SlackEvent::Unsupported { event_type: raw.kind } });
    }

    let action = raw.actions.into_iter().next().ok_or(PayloadError::MissingField("actions"))?;
    let channel_id = raw
        .channel
        .map(|channel| channel.id)
        .or_else(|| raw.container.as_ref().and_then(|container| container.channel_id.clone()))
        .ok_or(PayloadError::MissingField("channel"))?;
    let message_ts = raw
        .message
        .as_ref()
        .and_then(|message| message.ts.clone())
        .or_else(|| raw.container.as_ref().and_then(|container| container.message_ts.clone()))
        .ok_or(PayloadError::MissingField("message.ts"))?;
    let thread_ts = raw
        .message
        .as_ref()
        .and_then(|message| message.thread_ts.clone())
        .or_else(|| raw.container.as_ref().and_then(|container| container.thread_ts.clone()));

    Ok(SlackEnvelope {
        envelope_id,
        event: SlackEvent::BlockAction(BlockActionEvent {
            channel_id,
            message_ts,
            thread_ts,
            user_id: raw.user.map(|user| user.id),
            action_id: action.action_id,
            label: action.text.map(|text| text.text),
            value: action.value,
        }),
    })
}
