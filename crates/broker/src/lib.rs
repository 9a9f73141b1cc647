pub mod auth;
pub mod broker;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod notify;
pub mod protocol;
pub mod rates;
pub mod session;
pub mod tools;
#[cfg(feature = "ws-api")]
pub mod ws;

pub use auth::TokenSigner;
pub use broker::Broker;
pub use config::{AuthConfig, BrokerConfig, RatesConfig};
pub use dispatch::{DispatchOutcome, Dispatcher, ToolResult};
pub use error::{BrokerError, Result};
pub use notify::BroadcastNotifier;
pub use protocol::{ClientMessage, ContextualUpdate, ServerMessage, ToolCallRequest};
pub use session::{ConnectionHandle, ConnectionId, SessionId, SessionRegistry};
pub use tools::{Tool, ToolOutput};
