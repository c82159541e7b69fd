//! Recruitment pipeline service library.
//!
//! The [`pipeline`] module holds the core: the status-transition engine with
//! its append-only stage history and audit trail. [`config`], [`telemetry`],
//! and [`error`] carry the service's ambient stack.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod telemetry;
