//! # sitemind Runtime
//!
//! The self-healing task executor: drives page sessions, resolves actions
//! through hints or learned selectors, and feeds every outcome back into the
//! knowledge store.

pub mod change;
pub mod error;
pub mod executor;
pub mod extract;
pub mod operations;

mod actions;
mod parallel;

pub use change::StateChange;
pub use error::ExecutorError;
pub use executor::{ActionResult, TaskExecutor, TaskExecutorConfig};
pub use extract::extract_by_schema;
pub use operations::{OperationDescriptor, available_operations};
pub use parallel::{ParallelTask, TaskResult};
