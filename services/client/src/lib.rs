//! # Formlink Client Binding
//!
//! Typed call sites for the form service plus the connection/recovery state
//! machine that keeps them usable across service crashes.
//!
//! A process constructs one [`ConnectionManager`] (one logical connection,
//! one recovery state machine per process), hands it to a [`FormClient`],
//! and calls typed methods. The manager resolves a [`RemoteEndpoint`]
//! through the injected [`Discovery`] collaborator, watches it for peer
//! death, and runs a bounded fixed-delay reconnect loop when it dies.
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use formlink_client::{ClientConfig, ConnectionManager, FormClient, Discovery};
//! # async fn example(discovery: Arc<dyn Discovery>) -> formlink_types::FormResult<()> {
//! let conn = ConnectionManager::new(discovery, ClientConfig::default());
//! let client = FormClient::new(conn.clone());
//! let forms = client.get_all_forms_info().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod proxy;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::ClientConfig;
pub use connection::{ConnectionManager, RecoveryStatus};
pub use proxy::FormClient;
pub use transport::{Discovery, RemoteEndpoint};
