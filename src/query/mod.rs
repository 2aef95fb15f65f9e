//! Query execution for athena-glance.
//!
//! This module owns the lifecycle of a submitted query: the job model,
//! the polling controller with its cancellation handle, and the assembly of
//! paged results into a [`QueryResult`].

mod assembler;
mod cancel;
mod controller;
mod job;
mod parameters;
mod result;

pub use assembler::assemble;
pub use cancel::CancelHandle;
pub use controller::QueryJobController;
pub use job::{JobStatus, QueryJob};
pub use parameters::{is_parameterized, placeholder_count};
pub use result::{QueryOutcome, QueryResult};
