//! Slack integration for brainrelay.
//!
//! - **Payloads** (`payload`) - Events API and interactivity bodies parsed into typed envelopes
//! - **Signatures** (`signature`) - `X-Slack-Signature` verification
//! - **Events** (`events`) - dispatcher routing mentions and button clicks to services
//! - **Block Kit** (`blocks`) - message builders, including the knowledge-base prompt
//! - **Web API** (`web_api`) - `chat.postMessage` / `chat.delete` behind the `ChatPlatform` trait
//!
//! # Architecture
//!
//! ```text
//! HTTP webhook → payload → EventDispatcher → Handlers → ThreadOrchestrator
//!                                                            ↓
//!                                         ChatPlatform ← Block Kit messages
//! ```

pub mod blocks;
pub mod events;
pub mod payload;
pub mod signature;
pub mod web_api;
