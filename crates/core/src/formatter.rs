//! Answer formatting for chat delivery.

use crate::domain::answer::Source;

/// Per-message text budget on the chat platform.
pub const MESSAGE_CHUNK_LIMIT: usize = 3000;
pub const MAX_CITATIONS: usize = 3;

pub const NO_ANSWER_MESSAGE: &str = "Sorry, I couldn't find an answer.";
pub const NO_KNOWLEDGE_BASES_MESSAGE: &str = "No brains found. Please create a brain first.";
pub const GENERIC_FAILURE_MESSAGE: &str =
    "Something went wrong while handling your question. Please try again in a moment.";
pub const EMPTY_QUESTION_MESSAGE: &str = "Mention me together with a question and I'll look it up.";
pub const SELECTION_PROMPT_TEXT: &str = "Which brain should I use to answer this?";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormattedAnswer {
    pub citations: Option<String>,
    pub chunks: Vec<String>,
}

impl FormattedAnswer {
    /// Messages in posting order: the citation block first, then every chunk.
    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.citations.as_deref().into_iter().chain(self.chunks.iter().map(String::as_str))
    }
}

pub fn format_answer(text: &str, sources: &[Source]) -> FormattedAnswer {
    FormattedAnswer {
        citations: citation_block(sources),
        chunks: chunk_text(text, MESSAGE_CHUNK_LIMIT),
    }
}

pub fn citation_block(sources: &[Source]) -> Option<String> {
    if sources.is_empty() {
        return None;
    }

    let mut lines = vec!["*Sources:*".to_owned()];
    for source in sources.iter().take(MAX_CITATIONS) {
        lines.push(format!("• {} → {}", source.name, source.url));
    }
    Some(lines.join("\n"))
}

/// Splits `text` into consecutive pieces of at most `limit` characters.
///
/// Counting is per `char`, so a piece never ends inside a UTF-8 sequence;
/// word boundaries are not considered.
pub fn chunk_text(text: &str, limit: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    if limit == 0 {
        return vec![text.to_owned()];
    }

    let mut chunks = Vec::with_capacity(text.len() / limit + 1);
    let mut start = 0;
    let mut count = 0;
    for (idx, _) in text.char_indices() {
        if count == limit {
            chunks.push(text[start..idx].to_owned());
            start = idx;
            count = 0;
        }
        count += 1;
    }
    chunks.push(text[start..].to_owned());
    chunks
}
