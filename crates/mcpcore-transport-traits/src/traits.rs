//! The core `Transport` trait and its factory.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::TransportResult;
use crate::types::{TransportCapabilities, TransportState};

/// Invoked once per inbound frame, with the raw decoded JSON text.
pub type MessageCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Invoked when the transport observes a fatal error and is about to
/// transition to [`TransportState::Closed`].
pub type ErrorCallback = Arc<dyn Fn(TransportError) + Send + Sync>;

pub use crate::error::TransportError;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A framed duplex message pipe.
///
/// Implementors deliver whole, decoded inbound messages to the callback
/// registered via [`Transport::set_on_message`] and accept whole outbound
/// messages via [`Transport::send`]. Boxed futures keep the trait object
/// safe so a session can hold `Box<dyn Transport>` without committing to
/// a concrete transport at compile time.
pub trait Transport: Send + Sync {
    /// Establish the underlying connection.
    fn connect(&self) -> BoxFuture<'_, TransportResult<()>>;

    /// Send one complete outbound message.
    fn send(&self, message: String) -> BoxFuture<'_, TransportResult<()>>;

    /// Register the callback invoked for every inbound message. Replaces
    /// any previously registered callback.
    fn set_on_message(&self, callback: MessageCallback);

    /// Register the callback invoked when a fatal transport error occurs.
    fn set_on_error(&self, callback: ErrorCallback);

    /// Tear down the connection. Idempotent.
    fn disconnect(&self) -> BoxFuture<'_, TransportResult<()>>;

    /// Current lifecycle state.
    fn state(&self) -> TransportState;

    /// What this transport instance supports.
    fn capabilities(&self) -> TransportCapabilities;
}

/// Constructs a concrete [`Transport`] implementation.
pub trait TransportFactory: Send + Sync {
    /// Build a new, unconnected transport instance.
    fn create(&self) -> Box<dyn Transport>;
}
