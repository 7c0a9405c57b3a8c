//! Knowledge-base selection protocol.
//!
//! Each option carries an action id: `brain_<id>` for a concrete knowledge
//! base, or the bare all-zero sentinel for "Any".

use crate::domain::knowledge_base::{
    KnowledgeBase, KnowledgeBaseId, KnowledgeBaseSelection, ANY_KNOWLEDGE_BASE_SENTINEL,
};
use crate::errors::ProtocolViolation;

pub const ACTION_ID_PREFIX: &str = "brain_";
pub const ANY_OPTION_LABEL: &str = "Any";
/// Slack caps an actions block at 25 elements; one slot is reserved for "Any".
pub const MAX_PROMPT_OPTIONS: usize = 24;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionOption {
    pub label: String,
    pub action_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionPrompt {
    pub options: Vec<SelectionOption>,
}

impl SelectionPrompt {
    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

pub fn build_selection_prompt(knowledge_bases: &[KnowledgeBase]) -> SelectionPrompt {
    let mut options: Vec<SelectionOption> = knowledge_bases
        .iter()
        .take(MAX_PROMPT_OPTIONS)
        .map(|knowledge_base| SelectionOption {
            label: knowledge_base.name.clone(),
            action_id: action_id_for(&KnowledgeBaseSelection::Specific(knowledge_base.id.clone())),
        })
        .collect();

    options.push(SelectionOption {
        label: ANY_OPTION_LABEL.to_owned(),
        action_id: action_id_for(&KnowledgeBaseSelection::Any),
    });

    SelectionPrompt { options }
}

pub fn action_id_for(selection: &KnowledgeBaseSelection) -> String {
    match selection {
        KnowledgeBaseSelection::Any => ANY_KNOWLEDGE_BASE_SENTINEL.to_owned(),
        KnowledgeBaseSelection::Specific(id) => format!("{ACTION_ID_PREFIX}{id}"),
    }
}

pub fn parse_action_id(action_id: &str) -> Result<KnowledgeBaseSelection, ProtocolViolation> {
    let trimmed = action_id.trim();
    if trimmed == ANY_KNOWLEDGE_BASE_SENTINEL {
        return Ok(KnowledgeBaseSelection::Any);
    }

    match trimmed.strip_prefix(ACTION_ID_PREFIX) {
        Some(id) if id == ANY_KNOWLEDGE_BASE_SENTINEL => Ok(KnowledgeBaseSelection::Any),
        Some(id) if !id.is_empty() => {
            Ok(KnowledgeBaseSelection::Specific(KnowledgeBaseId(id.to_owned())))
        }
        _ => Err(ProtocolViolation::UnrecognizedAction { action_id: action_id.to_owned() }),
    }
}
