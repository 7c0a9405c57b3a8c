use std::fmt;

use serde::{Deserialize, Serialize};

/// Reserved id meaning "no specific knowledge base; let the backend choose".
pub const ANY_KNOWLEDGE_BASE_SENTINEL: &str = "00000000-0000-0000-0000-000000000000";

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KnowledgeBaseId(pub String);

impl fmt::Display for KnowledgeBaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    pub id: KnowledgeBaseId,
    pub name: String,
}

impl KnowledgeBase {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: KnowledgeBaseId(id.into()), name: name.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeBaseSelection {
    Any,
    Specific(KnowledgeBaseId),
}

impl KnowledgeBaseSelection {
    /// Id to transmit to the backend; `Any` is sent as no id at all.
    pub fn remote_id(&self) -> Option<&KnowledgeBaseId> {
        match self {
            Self::Any => None,
            Self::Specific(id) => Some(id),
        }
    }

    pub fn as_stored(&self) -> &str {
        match self {
            Self::Any => ANY_KNOWLEDGE_BASE_SENTINEL,
            Self::Specific(id) => &id.0,
        }
    }

    pub fn from_stored(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed == ANY_KNOWLEDGE_BASE_SENTINEL {
            Self::Any
        } else {
            Self::Specific(KnowledgeBaseId(trimmed.to_owned()))
        }
    }
}
