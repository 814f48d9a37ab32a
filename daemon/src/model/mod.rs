pub mod tab;
pub mod task;

pub use tab::{TabRecord, TabStore, NO_TASK};
pub use task::{TaskRecord, TaskStore};
