/// What a single inbound event ended up doing in its thread.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RelayOutcome {
    /// A knowledge-base prompt was posted; `options` includes the "Any" choice.
    PromptPosted { options: usize },
    NoKnowledgeBases,
    Answered { chunks: usize, citations: usize },
    NoAnswer,
    /// The mention carried no question; a usage hint was posted.
    UsageHint,
    Ignored,
}

impl RelayOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PromptPosted { .. } => "prompt_posted",
            Self::NoKnowledgeBases => "no_knowledge_bases",
            Self::Answered { .. } => "answered",
            Self::NoAnswer => "no_answer",
            Self::UsageHint => "usage_hint",
            Self::Ignored => "ignored",
        }
    }
}
