//! The peer engine: request multiplexing, deadlines, cancellation, and
//! the initialize handshake.

#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

mod cancel;
mod deadline;
mod engine;
mod error;
mod handshake;
mod id;
mod inbound;
mod pending;

pub use cancel::{CancelObserver, CancelSource, cancel_pair};
pub use deadline::DeadlineTracker;
pub use engine::{InboundHandler, NotificationHandler, PeerEngine, RequestContext, ServerIdentity};
pub use error::PeerError;
pub use handshake::SessionState;
pub use id::IdAllocator;
pub use inbound::InboundTracker;
pub use pending::{Outcome, PendingMap};
