//! In-process job queue and the single worker that drains it.

mod queue;
mod worker;

pub use queue::JobQueue;
pub use worker::Worker;
