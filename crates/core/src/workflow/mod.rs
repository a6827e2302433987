pub mod engine;
pub mod states;
pub mod visibility;

pub use engine::{WorkflowEngine, WorkflowError};
pub use states::{
    DetailsPatch, LedgerDebit, RecordChange, TransitionOutcome, WorkflowCommand, WorkflowEvent,
};
pub use visibility::{is_visible, visible, Queue, Scope};
