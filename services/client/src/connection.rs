//! Client-side connection ownership and crash recovery.
//!
//! One [`ConnectionManager`] per process owns the live endpoint and the
//! recovery state machine:
//!
//! ```text
//! DISCONNECTED → CONNECTED → RECOVERING → { CONNECTED | RECOVER_FAILED }
//! ```
//!
//! The endpoint is guarded by a reader/writer lock: ordinary calls take the
//! shared path, (re)connect and death-triggered invalidation take the
//! exclusive path. The recovery status is a separate lock-free atomic read
//! by the fast-reject check without contending on the endpoint lock. Peer
//! death arrives through the endpoint's watch channel and is consumed by a
//! dedicated monitor task.

use crate::config::ClientConfig;
use crate::transport::{Discovery, RemoteEndpoint};
use formlink_types::{FormError, FormResult, TransportError};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Process-wide recovery status, checked by every operation before any
/// transport call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStatus {
    NotRecovering,
    Recovering,
    /// The bounded reconnect loop exhausted its attempts. Sticky until a
    /// later explicit `ensure_connected` succeeds.
    RecoverFailed,
}

impl RecoveryStatus {
    fn from_raw(raw: u8) -> Self {
        match raw {
            1 => RecoveryStatus::Recovering,
            2 => RecoveryStatus::RecoverFailed,
            _ => RecoveryStatus::NotRecovering,
        }
    }

    fn raw(self) -> u8 {
        match self {
            RecoveryStatus::NotRecovering => 0,
            RecoveryStatus::Recovering => 1,
            RecoveryStatus::RecoverFailed => 2,
        }
    }
}

type LivenessCallback = Box<dyn Fn() + Send + Sync>;

struct Inner {
    discovery: Arc<dyn Discovery>,
    config: ClientConfig,
    endpoint: tokio::sync::RwLock<Option<Arc<dyn RemoteEndpoint>>>,
    recovery: AtomicU8,
    liveness: Mutex<Vec<LivenessCallback>>,
}

/// Owner of the one logical connection to the form service.
///
/// Cheap to clone; every clone shares the same endpoint and the same
/// recovery state machine. Constructed explicitly and passed to whoever
/// needs it rather than living in a global.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

impl ConnectionManager {
    pub fn new(discovery: Arc<dyn Discovery>, config: ClientConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                discovery,
                config,
                endpoint: tokio::sync::RwLock::new(None),
                recovery: AtomicU8::new(RecoveryStatus::NotRecovering.raw()),
                liveness: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn status(&self) -> RecoveryStatus {
        RecoveryStatus::from_raw(self.inner.recovery.load(Ordering::Acquire))
    }

    pub async fn is_connected(&self) -> bool {
        match self.inner.endpoint.read().await.as_ref() {
            Some(ep) => ep.is_alive(),
            None => false,
        }
    }

    /// Register a callback fired after a successful recovery so dependent
    /// subsystems can re-synchronize their service-side state.
    pub fn on_reconnected(&self, callback: impl Fn() + Send + Sync + 'static) {
        self.inner
            .liveness
            .lock()
            .expect("liveness registry poisoned")
            .push(Box::new(callback));
    }

    /// Resolve and cache an endpoint if none is live.
    ///
    /// Idempotent: while already connected this performs no discovery call.
    /// A cached endpoint whose peer already died (observer not yet fired)
    /// counts as not connected and is re-resolved. Rejected outright while a
    /// recovery loop is running; callable again after `RECOVER_FAILED`.
    pub async fn ensure_connected(&self) -> FormResult<()> {
        if self.status() == RecoveryStatus::Recovering {
            return Err(FormError::RecoveryInProgress);
        }

        {
            let guard = self.inner.endpoint.read().await;
            if let Some(ep) = guard.as_ref() {
                if ep.is_alive() {
                    return Ok(());
                }
            }
        }

        let mut guard = self.inner.endpoint.write().await;
        // Another caller may have connected while we waited for the lock.
        if let Some(ep) = guard.as_ref() {
            if ep.is_alive() {
                return Ok(());
            }
        }

        let endpoint = self
            .inner
            .discovery
            .resolve()
            .await
            .map_err(FormError::Transport)?;
        *guard = Some(endpoint.clone());
        self.inner
            .recovery
            .store(RecoveryStatus::NotRecovering.raw(), Ordering::Release);
        drop(guard);

        info!("connected to form service");
        self.spawn_monitor(endpoint);
        Ok(())
    }

    /// Fast path used by every proxy call: reject if recovering, connect if
    /// needed, and hand out a shared reference to the live endpoint.
    pub async fn acquire(&self) -> FormResult<Arc<dyn RemoteEndpoint>> {
        self.ensure_connected().await?;
        let guard = self.inner.endpoint.read().await;
        guard
            .as_ref()
            .cloned()
            .ok_or(FormError::Transport(TransportError::NotConnected))
    }

    /// Spawn the task that consumes the endpoint's death signal and drives
    /// the recovery loop. The death notification goes through the same
    /// exclusive lock as ordinary callers, so no torn endpoint read is
    /// possible.
    fn spawn_monitor(&self, endpoint: Arc<dyn RemoteEndpoint>) {
        let inner = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            let mut death = endpoint.death_signal();
            loop {
                if *death.borrow() {
                    break;
                }
                // A closed channel means the endpoint was torn down; treat
                // it as death and let the stale-endpoint guard sort it out.
                if death.changed().await.is_err() {
                    break;
                }
            }
            if let Some(inner) = inner.upgrade() {
                handle_peer_death(inner, endpoint).await;
            }
        });
    }
}

async fn handle_peer_death(inner: Arc<Inner>, dead: Arc<dyn RemoteEndpoint>) {
    {
        let mut guard = inner.endpoint.write().await;
        match guard.as_ref() {
            Some(current) if Arc::ptr_eq(current, &dead) => {
                *guard = None;
                inner
                    .recovery
                    .store(RecoveryStatus::Recovering.raw(), Ordering::Release);
            }
            // Stale notification for an endpoint that was already replaced.
            _ => {
                debug!("ignoring death signal from superseded endpoint");
                return;
            }
        }
    }

    warn!("form service peer died, entering recovery");
    recover(inner).await;
}

/// Bounded reconnect loop: fixed inter-attempt delay, `reconnect_attempts`
/// tries, then sticky failure.
async fn recover(inner: Arc<Inner>) {
    let attempts = inner.config.reconnect_attempts;
    let delay = inner.config.reconnect_delay();

    for attempt in 1..=attempts {
        sleep(delay).await;
        match inner.discovery.resolve().await {
            Ok(endpoint) => {
                {
                    let mut guard = inner.endpoint.write().await;
                    *guard = Some(endpoint.clone());
                }
                inner
                    .recovery
                    .store(RecoveryStatus::NotRecovering.raw(), Ordering::Release);
                info!(attempt, "reconnected to form service");

                let manager = ConnectionManager {
                    inner: inner.clone(),
                };
                manager.spawn_monitor(endpoint);
                notify_liveness(&inner);
                return;
            }
            Err(e) => {
                warn!(attempt, max = attempts, error = %e, "reconnect attempt failed");
            }
        }
    }

    error!(attempts, "recovery exhausted reconnect attempts");
    inner
        .recovery
        .store(RecoveryStatus::RecoverFailed.raw(), Ordering::Release);
}

fn notify_liveness(inner: &Inner) {
    let callbacks = inner.liveness.lock().expect("liveness registry poisoned");
    for callback in callbacks.iter() {
        callback();
    }
}
