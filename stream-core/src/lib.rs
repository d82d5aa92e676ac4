//! # stream-core
//!
//! Pure logic for the agentcast relay (no I/O, instant tests).
//!
//! This crate implements the buffer bookkeeping and scanning rules of the
//! relay without any tasks, timers or sockets, so every rule can be tested
//! synchronously.
//!
//! - [`EventLog`]: the append-only per-channel buffer
//! - [`ReplayScan`]: resume-point search and incremental replay/tail scanning
//! - [`SseDecoder`]: incremental byte decoder used by stream clients
//!
//! The relay server (`stream-relay`) owns the locking and scheduling around
//! these types.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod decoder;
pub mod log;
pub mod scan;

pub use decoder::SseDecoder;
pub use log::{EventLog, LogError};
pub use scan::{ReplayScan, ResumePoint};
