//! Workflow orchestration: template catalog, execution engine, history and
//! summaries.

pub mod catalog;
pub mod executor;
pub mod history;
pub mod summary;

pub use catalog::WorkflowCatalog;
pub use executor::{RunningWorkflow, WorkflowEngine};
pub use history::ExecutionHistory;
pub use summary::{fallback_summary, summarize, MessagesApiSummarizer, SummaryGenerator};
