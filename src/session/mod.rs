//! Chat session: shared flags, the connection abstraction and the
//! connection manager that drives the event loop.

pub mod connection;
pub mod manager;
pub mod outbox;
pub mod state;

pub use connection::{ChatConnection, Connector, IrcConnection, IrcConnector};
pub use manager::{ConnectionManager, Phase, Shutdown};
pub use outbox::Outbox;
pub use state::{SessionState, SharedState};
