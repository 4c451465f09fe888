//! Shared data model for the handshake protocol.
//!
//! Everything in this crate is wire-level or static: identity snapshots,
//! activity events, the action classification registry, and the queue name
//! constants every component publishes to or consumes from.

/// Module for the static action classification registry
pub mod actions;

/// Module for activity event records
pub mod event;

/// Module for queue name constants
pub mod queues;

/// Module for identity and handshake data types
pub mod types;
