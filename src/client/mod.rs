//! The playing client: message dispatch, terminal view and failover

pub mod failover;
pub mod machine;
pub mod view;

pub use failover::{Connector, FailoverClient, WsConnector};
pub use machine::{ClientSession, ClientState, SessionOutcome};
pub use view::{render_board, ClientView, TerminalView};
