//! Shared helpers for integration tests

#![allow(dead_code)]

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tcp_relay::{DrainOutcome, Relay, RelayConfig, RelayEvents};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// An event as seen by [`RecordingEvents`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    ListenerReady,
    AcceptFailed,
    DialRetry { tunnel_id: u64, backoff: Duration },
    DialCancelled { tunnel_id: u64 },
    TunnelStarted { tunnel_id: u64, active: usize },
    ForcedClose { tunnel_id: u64 },
    TunnelEnded { tunnel_id: u64, active: usize },
    ShutdownStarted,
    DrainComplete,
    DrainForced { remaining: usize },
}

/// Event sink that keeps every event in memory
#[derive(Default)]
pub struct RecordingEvents {
    events: Mutex<Vec<Event>>,
}

impl RecordingEvents {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn snapshot(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.snapshot().iter().filter(|e| pred(e)).count()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl RelayEvents for RecordingEvents {
    fn listener_ready(&self, _listen: SocketAddr, _target: &str) {
        self.push(Event::ListenerReady);
    }

    fn accept_failed(&self, _error: &io::Error) {
        self.push(Event::AcceptFailed);
    }

    fn dial_retry(&self, tunnel_id: u64, _target: &str, _error: &io::Error, backoff: Duration) {
        self.push(Event::DialRetry { tunnel_id, backoff });
    }

    fn dial_cancelled(&self, tunnel_id: u64) {
        self.push(Event::DialCancelled { tunnel_id });
    }

    fn tunnel_started(&self, tunnel_id: u64, _client: SocketAddr, active: usize) {
        self.push(Event::TunnelStarted { tunnel_id, active });
    }

    fn forced_close(&self, tunnel_id: u64, _linger: Duration) {
        self.push(Event::ForcedClose { tunnel_id });
    }

    fn tunnel_ended(&self, tunnel_id: u64, active: usize) {
        self.push(Event::TunnelEnded { tunnel_id, active });
    }

    fn shutdown_started(&self) {
        self.push(Event::ShutdownStarted);
    }

    fn drain_complete(&self) {
        self.push(Event::DrainComplete);
    }

    fn drain_forced(&self, remaining: usize, _waited: Duration) {
        self.push(Event::DrainForced { remaining });
    }
}

/// Config with short timings pointing at `target`
pub fn test_config(target: impl ToString) -> RelayConfig {
    RelayConfig {
        listen: "127.0.0.1:0".parse().unwrap(),
        target: target.to_string(),
        log_level: "debug".to_string(),
        buffer_size: 4096,
        max_idle_buffers: 8,
        connect_timeout_ms: 500,
        backoff_initial_ms: 20,
        backoff_max_ms: 100,
        linger_ms: 1_000,
        drain_timeout_ms: 2_000,
        drain_poll_interval_ms: 50,
    }
}

/// A running relay under test
pub struct TestRelay {
    pub relay: Relay,
    pub addr: SocketAddr,
    pub events: Arc<RecordingEvents>,
    pub server: JoinHandle<DrainOutcome>,
}

/// Bind and serve a relay on an ephemeral port
pub async fn start_relay(config: RelayConfig) -> TestRelay {
    let events = RecordingEvents::new();
    let relay = Relay::with_events(Arc::new(config), events.clone());
    let listener = relay.bind().await.expect("bind relay");
    let addr = listener.local_addr().unwrap();

    let server_relay = relay.clone();
    let server = tokio::spawn(async move { server_relay.serve(listener).await });

    TestRelay { relay, addr, events, server }
}

/// Backend that echoes every connection until the client half-closes,
/// then closes its side
pub async fn spawn_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve_echo(listener));
    addr
}

pub async fn serve_echo(listener: TcpListener) {
    while let Ok((mut stream, _)) = listener.accept().await {
        tokio::spawn(async move {
            let (mut r, mut w) = stream.split();
            let _ = tokio::io::copy(&mut r, &mut w).await;
            let _ = w.shutdown().await;
        });
    }
}

/// An address with nothing listening on it
pub fn closed_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Poll `cond` every 10ms until it holds or `within` elapses
pub async fn wait_until(within: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    loop {
        if cond() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Read exactly `n` bytes
pub async fn read_n<R: AsyncReadExt + Unpin>(reader: &mut R, n: usize) -> Vec<u8> {
    let mut buf = vec![0u8; n];
    reader.read_exact(&mut buf).await.unwrap();
    buf
}
