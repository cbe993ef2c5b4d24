pub mod error;
pub mod logging;
pub mod message;
pub mod transport;

pub use error::AddressError;
pub use message::{Mailbox, Message, MessageBuilder};
pub use tracing;
pub use transport::{MockTransport, ScriptedFailure, Transport, TransportError};

/// Lifecycle signals of a unit of work (a request, a command invocation)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// A new unit of work begins
    Started,
    /// The current unit of work hit an unhandled failure
    Failed,
    /// The current unit of work is over
    Terminated,
}
