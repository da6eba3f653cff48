//! Main-thread dispatch for AgentWorld extensions.
//!
//! The simulation host has a single privileged update thread; viewport and
//! stage mutations must run there. HTTP worker tasks enqueue closures with
//! [`MainThreadDispatcher::run_on_main`] and block (with a deadline) until
//! the next update tick drains the queue. Fire-and-forget operations record
//! their outcome in the [`RequestTracker`] instead.

pub mod dispatcher;
pub mod ticker;
pub mod tracker;

pub use dispatcher::{MainThreadDispatcher, TaskFn};
pub use ticker::HostTicker;
pub use tracker::{RequestTracker, TrackedRequest};
