//! Shared domain types for the copylens pipeline: the error taxonomy,
//! configuration, task/result shapes, and structured trace events.

pub mod config;
pub mod error;
pub mod result;
pub mod task;
pub mod trace;
