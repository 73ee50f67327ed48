//! Runtime Agent
//!
//! The connection state machine that runs inside an extension instance:
//! `Disconnected -> Connecting -> Connected`, applying received reload
//! signals and reconnecting on failure at a fixed interval. The injected
//! watcher script implements exactly this behavior in the browser; this
//! module is its reference implementation and what integration tests run
//! against the broker.
//!
//! Connection errors here are never fatal. They only drive the
//! reconnect transition; a lost build process just means quiet retries
//! until it comes back.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;
use tungstenite::protocol::Message;
use tungstenite::stream::MaybeTlsStream;

use crate::middleware::RECONNECT_INTERVAL_MS;
use crate::reload::message::ReloadSignal;

/// Poll granularity for shutdown-aware reads and sleeps
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Connection state of one agent instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Disconnected,
    Connecting,
    Connected,
}

/// What applying a reload signal does. The extension wires this to its
/// runtime/tabs APIs; tests record invocations.
pub trait ReloadHandler: Send + 'static {
    /// Reload the entire extension runtime
    fn full_reload(&self);
    /// Reload the currently active page/tab
    fn tab_reload(&self);
}

/// Agent configuration, fixed at spawn time.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Broker port to connect to
    pub port: u16,
    /// Whether TabReload signals are applied
    pub reload_page: bool,
    /// Fixed reconnection interval (no backoff)
    pub reconnect_interval: Duration,
}

impl AgentConfig {
    pub fn new(port: u16, reload_page: bool) -> Self {
        Self {
            port,
            reload_page,
            reconnect_interval: Duration::from_millis(RECONNECT_INTERVAL_MS),
        }
    }
}

/// Handle to a running agent.
pub struct AgentHandle {
    state: Arc<Mutex<AgentState>>,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl AgentHandle {
    /// Current connection state.
    pub fn state(&self) -> AgentState {
        *self.state.lock()
    }

    /// Stop the agent and wait for its thread to exit.
    pub fn shutdown(mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Spawn an agent connecting to the broker on `config.port`.
///
/// The agent starts `Disconnected` and immediately transitions to
/// `Connecting` on its own thread.
pub fn spawn<H: ReloadHandler>(config: AgentConfig, handler: H) -> AgentHandle {
    let state = Arc::new(Mutex::new(AgentState::Disconnected));
    let running = Arc::new(AtomicBool::new(true));

    let thread_state = Arc::clone(&state);
    let thread_running = Arc::clone(&running);
    let thread = std::thread::spawn(move || {
        run(&config, &thread_state, &thread_running, &handler);
    });

    AgentHandle {
        state,
        running,
        thread: Some(thread),
    }
}

/// Connect/read/reconnect loop.
fn run<H: ReloadHandler>(
    config: &AgentConfig,
    state: &Mutex<AgentState>,
    running: &AtomicBool,
    handler: &H,
) {
    let url = format!("ws://127.0.0.1:{}", config.port);
    let mut suppressed_logged = false;

    while running.load(Ordering::SeqCst) {
        *state.lock() = AgentState::Connecting;

        match tungstenite::connect(url.as_str()) {
            Ok((mut ws, _)) => {
                suppressed_logged = false;
                set_read_timeout(&ws);
                *state.lock() = AgentState::Connected;
                crate::debug!("agent"; "connected to {}", url);

                read_loop(&mut ws, running, config, handler);
                let _ = ws.close(None);
            }
            Err(e) => {
                if is_suppressed(&e) {
                    // Build process not up yet; log once, retry quietly
                    if !suppressed_logged {
                        crate::debug!("agent"; "broker unreachable, retrying quietly");
                        suppressed_logged = true;
                    }
                } else {
                    crate::log!("agent"; "connect failed: {}", e);
                }
            }
        }

        *state.lock() = AgentState::Disconnected;

        // Exactly one reconnect per disconnect, rearmed here, never
        // overlapping; the fixed interval applies to every retry.
        if !sleep_while_running(config.reconnect_interval, running) {
            break;
        }
    }

    *state.lock() = AgentState::Disconnected;
}

/// Read signals until close, error, or shutdown.
fn read_loop<H: ReloadHandler>(
    ws: &mut tungstenite::WebSocket<MaybeTlsStream<std::net::TcpStream>>,
    running: &AtomicBool,
    config: &AgentConfig,
    handler: &H,
) {
    loop {
        if !running.load(Ordering::SeqCst) {
            return;
        }
        match ws.read() {
            Ok(Message::Text(text)) => {
                if let Some(signal) = ReloadSignal::from_json(&text) {
                    apply_signal(signal, config, handler);
                }
            }
            Ok(Message::Close(_)) => return,
            Ok(_) => {}
            Err(tungstenite::Error::Io(ref e))
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) =>
            {
                // Read timeout; loop around to check the shutdown flag
            }
            Err(e) => {
                crate::debug!("agent"; "connection lost: {}", e);
                return;
            }
        }
    }
}

/// Apply a signal and stay connected.
fn apply_signal<H: ReloadHandler>(signal: ReloadSignal, config: &AgentConfig, handler: &H) {
    match signal {
        ReloadSignal::FullReload => {
            crate::debug!("agent"; "applying full reload");
            handler.full_reload();
        }
        ReloadSignal::TabReload if config.reload_page => {
            crate::debug!("agent"; "applying tab reload");
            handler.tab_reload();
        }
        ReloadSignal::TabReload => {
            crate::debug!("agent"; "tab reload ignored (reload_page disabled)");
        }
    }
}

/// Bounded reads so shutdown never hangs on a quiet socket.
fn set_read_timeout(ws: &tungstenite::WebSocket<MaybeTlsStream<std::net::TcpStream>>) {
    if let MaybeTlsStream::Plain(stream) = ws.get_ref() {
        let _ = stream.set_read_timeout(Some(POLL_INTERVAL));
    }
}

/// Connect failures whose repetition would only be noise.
fn is_suppressed(e: &tungstenite::Error) -> bool {
    use std::io::ErrorKind;
    matches!(
        e,
        tungstenite::Error::Io(io) if matches!(
            io.kind(),
            ErrorKind::ConnectionRefused | ErrorKind::ConnectionReset | ErrorKind::TimedOut
        )
    )
}

/// Sleep the full interval in shutdown-aware slices. Returns false if the
/// agent was stopped meanwhile.
fn sleep_while_running(interval: Duration, running: &AtomicBool) -> bool {
    let deadline = std::time::Instant::now() + interval;
    loop {
        if !running.load(Ordering::SeqCst) {
            return false;
        }
        let remaining = deadline.saturating_duration_since(std::time::Instant::now());
        if remaining.is_zero() {
            return true;
        }
        std::thread::sleep(POLL_INTERVAL.min(remaining));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reload::broker::SignalBroker;
    use crate::reload::classify::ChangeScope;
    use std::net::TcpListener;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    #[derive(Clone, Default)]
    struct CountingHandler {
        full: Arc<AtomicUsize>,
        tab: Arc<AtomicUsize>,
    }

    impl ReloadHandler for CountingHandler {
        fn full_reload(&self) {
            self.full.fetch_add(1, Ordering::SeqCst);
        }
        fn tab_reload(&self) {
            self.tab.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn wait_until(deadline: Duration, mut check: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < deadline {
            if check() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        false
    }

    fn agent_config(port: u16, reload_page: bool, interval_ms: u64) -> AgentConfig {
        AgentConfig {
            port,
            reload_page,
            reconnect_interval: Duration::from_millis(interval_ms),
        }
    }

    #[test]
    fn reconnect_waits_the_fixed_interval() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        // Record accept times; close each connection right after the
        // handshake so the agent keeps disconnecting.
        let accepts: Arc<Mutex<Vec<Instant>>> = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&accepts);
        std::thread::spawn(move || {
            while let Ok((stream, _)) = listener.accept() {
                recorder.lock().push(Instant::now());
                if let Ok(mut ws) = tungstenite::accept(stream) {
                    let _ = ws.close(None);
                }
            }
        });

        let interval = Duration::from_millis(400);
        let handle = spawn(agent_config(port, true, 400), CountingHandler::default());

        // First attempt happens promptly
        assert!(wait_until(Duration::from_secs(2), || accepts.lock().len() >= 1));

        // No second attempt before the interval elapses
        std::thread::sleep(Duration::from_millis(200));
        assert_eq!(accepts.lock().len(), 1);

        // Exactly one attempt once it does
        assert!(wait_until(Duration::from_secs(2), || accepts.lock().len() >= 2));
        let times = accepts.lock().clone();
        assert!(times[1] - times[0] >= interval - Duration::from_millis(50));

        handle.shutdown();
    }

    #[test]
    fn refused_connections_keep_the_agent_retrying() {
        // Grab a port with no listener on it
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let handle = spawn(agent_config(port, true, 100), CountingHandler::default());
        std::thread::sleep(Duration::from_millis(400));
        // Still alive and cycling, never Connected
        assert_ne!(handle.state(), AgentState::Connected);
        handle.shutdown();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn applies_signals_and_gates_tab_reload() {
        let (broker, actor) = SignalBroker::start(0).unwrap();
        tokio::spawn(actor.run());

        let counter = CountingHandler::default();
        let handle = spawn(agent_config(broker.port(), false, 100), counter.clone());

        // Polling with short sleeps; the broker actor runs on another worker
        assert!(
            wait_until(Duration::from_secs(3), || handle.state()
                == AgentState::Connected),
            "agent never connected"
        );

        broker.trigger(ChangeScope::BackgroundOrContent).await.unwrap();
        assert!(wait_until(Duration::from_secs(3), || counter
            .full
            .load(Ordering::SeqCst)
            == 1));

        // TabReload is gated off when reload_page is disabled
        broker.trigger(ChangeScope::PageOnly).await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(counter.tab.load(Ordering::SeqCst), 0);

        // Applying a signal is transient; the agent stays connected
        assert_eq!(handle.state(), AgentState::Connected);

        handle.shutdown();
        broker.shutdown().await;
    }
}
