//! Controllable endpoint and discovery doubles for the crate's own tests.

use crate::transport::{Discovery, RemoteEndpoint};
use async_trait::async_trait;
use bytes::Bytes;
use formlink_types::TransportError;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

type ReplyFn = Box<dyn Fn(u16, &[u8]) -> Result<Bytes, TransportError> + Send + Sync>;

/// Endpoint double with a scripted reply function and a controllable death
/// signal.
pub struct MockEndpoint {
    reply: ReplyFn,
    calls: AtomicU32,
    oneways: AtomicU32,
    silently_dead: AtomicBool,
    death_tx: watch::Sender<bool>,
}

impl MockEndpoint {
    pub fn new(reply: ReplyFn) -> Arc<Self> {
        let (death_tx, _) = watch::channel(false);
        Arc::new(Self {
            reply,
            calls: AtomicU32::new(0),
            oneways: AtomicU32::new(0),
            silently_dead: AtomicBool::new(false),
            death_tx,
        })
    }

    /// An endpoint whose every call fails with `PeerDied`; recovery tests
    /// never interpret replies anyway.
    pub fn alive() -> Arc<Self> {
        Self::new(Box::new(|_, _| Err(TransportError::PeerDied)))
    }

    /// Fire the death signal (exactly-once semantics are the watch
    /// channel's).
    pub fn kill(&self) {
        self.death_tx.send_replace(true);
    }

    /// Make `is_alive` report death without delivering the signal, modeling
    /// the window where the peer died but the observer has not fired yet.
    pub fn mark_dead_silently(&self) {
        self.silently_dead.store(true, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn oneway_count(&self) -> u32 {
        self.oneways.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteEndpoint for MockEndpoint {
    async fn call(&self, opcode: u16, request: Bytes) -> Result<Bytes, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.is_alive() {
            return Err(TransportError::PeerDied);
        }
        (self.reply)(opcode, &request)
    }

    async fn send_oneway(&self, _opcode: u16, _request: Bytes) -> Result<(), TransportError> {
        self.oneways.fetch_add(1, Ordering::SeqCst);
        if !self.is_alive() {
            return Err(TransportError::PeerDied);
        }
        Ok(())
    }

    fn is_alive(&self) -> bool {
        !self.silently_dead.load(Ordering::SeqCst) && !*self.death_tx.borrow()
    }

    fn death_signal(&self) -> watch::Receiver<bool> {
        self.death_tx.subscribe()
    }
}

/// Discovery double: serves whatever endpoint was last installed, counts
/// resolve calls, and can be switched into a failing mode.
pub struct MockDiscovery {
    current: Mutex<Option<Arc<dyn RemoteEndpoint>>>,
    resolves: AtomicU32,
    fail: AtomicBool,
}

impl MockDiscovery {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
            resolves: AtomicU32::new(0),
            fail: AtomicBool::new(false),
        }
    }

    pub fn serve(&self, endpoint: Arc<dyn RemoteEndpoint>) {
        *self.current.lock().expect("discovery double poisoned") = Some(endpoint);
    }

    pub fn fail_resolves(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn resolve_count(&self) -> u32 {
        self.resolves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Discovery for MockDiscovery {
    async fn resolve(&self) -> Result<Arc<dyn RemoteEndpoint>, TransportError> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(TransportError::Discovery("service unavailable".into()));
        }
        self.current
            .lock()
            .expect("discovery double poisoned")
            .clone()
            .ok_or_else(|| TransportError::Discovery("no endpoint installed".into()))
    }
}
