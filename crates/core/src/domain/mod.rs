pub mod answer;
pub mod knowledge_base;
pub mod thread;
