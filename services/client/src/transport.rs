//! Transport seam.
//!
//! The transport is consumed here, not designed: an opaque request/reply
//! channel with an asynchronous peer-death signal. Concrete endpoints (unix
//! socket, shared memory, in-process loopback for tests) live outside this
//! crate.

use async_trait::async_trait;
use bytes::Bytes;
use formlink_types::TransportError;
use std::sync::Arc;
use tokio::sync::watch;

/// Opaque capability for a live connection to the form service.
///
/// Exclusively owned by the [`ConnectionManager`](crate::ConnectionManager);
/// proxy code only ever borrows it for the duration of one call.
#[async_trait]
pub trait RemoteEndpoint: Send + Sync {
    /// Send a request frame and block until the reply frame or a transport
    /// failure. On failure no reply bytes are produced.
    async fn call(&self, opcode: u16, request: Bytes) -> Result<Bytes, TransportError>;

    /// Hand a request frame to the transport without awaiting a reply.
    /// Only hand-off failures are observable to the caller.
    async fn send_oneway(&self, opcode: u16, request: Bytes) -> Result<(), TransportError>;

    /// Cheap liveness probe. May report death before the death signal has
    /// been delivered.
    fn is_alive(&self) -> bool;

    /// Death signal for this endpoint: flips to `true` exactly once when the
    /// peer process terminates. A dedicated monitor task awaits it.
    fn death_signal(&self) -> watch::Receiver<bool>;
}

impl std::fmt::Debug for dyn RemoteEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RemoteEndpoint")
    }
}

/// Resolves the well-known form service identity to a live endpoint.
///
/// Treated as an opaque capability source; bundle/ability lookups and
/// environment awareness are the collaborator's concern.
#[async_trait]
pub trait Discovery: Send + Sync {
    async fn resolve(&self) -> Result<Arc<dyn RemoteEndpoint>, TransportError>;
}
