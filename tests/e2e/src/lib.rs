//! In-process loopback harness.
//!
//! Wires the client proxy to the dispatcher without any real IPC: every
//! request frame produced by the proxy is handed straight to a
//! [`Dispatcher`] over a shared [`FormStore`]. Endpoints can be killed to
//! exercise the recovery state machine; the store outlives endpoints the
//! same way the real service process outlives individual connections.

use async_trait::async_trait;
use bytes::Bytes;
use formlink_client::{ClientConfig, ConnectionManager, Discovery, FormClient, RemoteEndpoint};
use formlink_manager::{CallerContext, Dispatcher, FormStore};
use formlink_types::TransportError;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// Endpoint that services requests by calling the dispatcher directly.
pub struct LoopbackEndpoint {
    dispatcher: Arc<Dispatcher>,
    caller: CallerContext,
    alive: AtomicBool,
    calls: AtomicU32,
    oneways: AtomicU32,
    death_tx: watch::Sender<bool>,
}

impl LoopbackEndpoint {
    fn new(dispatcher: Arc<Dispatcher>, caller: CallerContext) -> Arc<Self> {
        let (death_tx, _) = watch::channel(false);
        Arc::new(Self {
            dispatcher,
            caller,
            alive: AtomicBool::new(true),
            calls: AtomicU32::new(0),
            oneways: AtomicU32::new(0),
            death_tx,
        })
    }

    /// Simulate a service crash: the endpoint stops accepting requests and
    /// the death signal fires.
    pub fn kill(&self) {
        self.alive.store(false, Ordering::SeqCst);
        self.death_tx.send_replace(true);
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn oneway_count(&self) -> u32 {
        self.oneways.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteEndpoint for LoopbackEndpoint {
    async fn call(&self, _opcode: u16, request: Bytes) -> Result<Bytes, TransportError> {
        if !self.is_alive() {
            return Err(TransportError::PeerDied);
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.dispatcher.dispatch(&self.caller, &request).await)
    }

    async fn send_oneway(&self, _opcode: u16, request: Bytes) -> Result<(), TransportError> {
        if !self.is_alive() {
            return Err(TransportError::PeerDied);
        }
        self.oneways.fetch_add(1, Ordering::SeqCst);
        self.dispatcher.dispatch_oneway(&self.caller, &request).await;
        Ok(())
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn death_signal(&self) -> watch::Receiver<bool> {
        self.death_tx.subscribe()
    }
}

/// Discovery that mints a fresh loopback endpoint per resolve, all backed
/// by the same dispatcher and store.
pub struct LoopbackDiscovery {
    dispatcher: Arc<Dispatcher>,
    caller: CallerContext,
    fail: AtomicBool,
    resolves: AtomicU32,
    current: Mutex<Option<Arc<LoopbackEndpoint>>>,
}

impl LoopbackDiscovery {
    pub fn new(store: Arc<FormStore>, caller: CallerContext) -> Arc<Self> {
        Arc::new(Self {
            dispatcher: Arc::new(Dispatcher::new(store)),
            caller,
            fail: AtomicBool::new(false),
            resolves: AtomicU32::new(0),
            current: Mutex::new(None),
        })
    }

    /// While set, resolution fails as if the service were not registered.
    pub fn fail_resolves(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn resolve_count(&self) -> u32 {
        self.resolves.load(Ordering::SeqCst)
    }

    /// The most recently resolved endpoint, for crash injection.
    pub fn current_endpoint(&self) -> Option<Arc<LoopbackEndpoint>> {
        self.current.lock().expect("endpoint slot poisoned").clone()
    }
}

#[async_trait]
impl Discovery for LoopbackDiscovery {
    async fn resolve(&self) -> Result<Arc<dyn RemoteEndpoint>, TransportError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(TransportError::Discovery(
                "form service not registered".into(),
            ));
        }
        self.resolves.fetch_add(1, Ordering::SeqCst);
        let endpoint = LoopbackEndpoint::new(self.dispatcher.clone(), self.caller.clone());
        *self.current.lock().expect("endpoint slot poisoned") = Some(endpoint.clone());
        Ok(endpoint)
    }
}

/// A fully wired stack: client, its discovery, and the shared store.
pub struct Harness {
    pub client: FormClient,
    pub discovery: Arc<LoopbackDiscovery>,
    pub store: Arc<FormStore>,
}

static TRACING: std::sync::Once = std::sync::Once::new();

/// Install a test-writer subscriber once per process so RUST_LOG works in
/// these tests.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Build a stack for the given caller identity with test-friendly
/// reconnect timing.
pub fn harness(caller: CallerContext) -> Harness {
    harness_with_config(
        caller,
        ClientConfig {
            reconnect_attempts: 3,
            reconnect_delay_ms: 10,
        },
    )
}

/// Poll until `cond` holds, failing the test after a generous deadline.
pub async fn wait_for<F: Fn() -> bool>(cond: F) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

pub fn harness_with_config(caller: CallerContext, config: ClientConfig) -> Harness {
    init_tracing();
    let store = Arc::new(FormStore::new());
    let discovery = LoopbackDiscovery::new(store.clone(), caller);
    let conn = ConnectionManager::new(discovery.clone(), config);
    Harness {
        client: FormClient::new(conn),
        discovery,
        store,
    }
}
