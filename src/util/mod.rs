//! Utility modules: retry backoff, deadline-bounded workers.

pub mod retry;
pub mod timeout;
