//! Core domain for brainrelay.
//!
//! Holds everything that does not talk to the network or the database:
//! thread and knowledge-base types, the error taxonomy shared by every crate,
//! configuration loading, and the pure pieces of the relay protocol
//! (mention stripping, selection action ids, answer formatting).

pub mod config;
pub mod domain;
pub mod errors;
pub mod formatter;
pub mod mention;
pub mod outcome;
pub mod selection;

pub use domain::answer::{Answer, Source};
pub use domain::knowledge_base::{KnowledgeBase, KnowledgeBaseId, KnowledgeBaseSelection};
pub use domain::thread::{ChannelId, MessageId, SessionId, ThreadId, ThreadState, TransientMessage};
pub use errors::{ChatPlatformError, ProtocolViolation, RelayError, RemoteApiError, StorageError};
pub use formatter::{format_answer, FormattedAnswer};
pub use mention::strip_mentions;
pub use outcome::RelayOutcome;
pub use selection::{build_selection_prompt, parse_action_id, SelectionOption, SelectionPrompt};
