use serde::{Deserialize, Serialize};

use crate::domain::knowledge_base::KnowledgeBaseId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub name: String,
    pub url: String,
}

impl Source {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self { name: name.into(), url: url.into() }
    }
}

/// Response of a single question submission.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub text: Option<String>,
    pub knowledge_base_id: Option<KnowledgeBaseId>,
    pub sources: Vec<Source>,
}

impl Answer {
    /// Answer text, or `None` when the backend returned nothing usable.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref().filter(|text| !text.trim().is_empty())
    }
}
