//! Relay runtime - the per-thread state machine between Slack and Quivr
//!
//! - **Remote API** (`quivr`) - `QuestionAnsweringApi` trait and its HTTP client
//! - **Locks** (`locks`) - per-thread mutual exclusion, independent across threads
//! - **Orchestrator** (`orchestrator`) - mention and selection handling
//!
//! # Flow
//!
//! ```text
//! mention ──▶ pending question ──▶ stored selection? ──yes──▶ ask + relay answer
//!                                        │ no
//!                                        ▼
//!                              post knowledge-base prompt
//!                                        │ click
//!                                        ▼
//!                  store selection ──▶ ask ──▶ delete prompts ──▶ relay answer
//! ```
//!
//! Every step for one thread runs under that thread's lock, so a redelivered
//! event or a double click observes the state the first one left behind.

pub mod locks;
pub mod orchestrator;
pub mod quivr;

pub use locks::ThreadLocks;
pub use orchestrator::{MentionEvent, OrchestratorSettings, SelectionEvent, ThreadOrchestrator};
pub use quivr::{QuestionAnsweringApi, QuivrClient};
