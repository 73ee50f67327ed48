//! Signal Broker Actor
//!
//! Owns the set of connected agent WebSockets and broadcasts reload
//! signals to all of them. Connections arrive as raw TCP streams from the
//! acceptor thread (see [`super::server`]) and are handshaked here.
//!
//! `trigger` is the async seam the orchestrator awaits: it resolves once
//! the signal has been handed to the transport for every currently
//! connected agent. Zero connected agents is a successful no-op.

use std::net::TcpStream;

use anyhow::{Context, Result, anyhow, bail};
use tokio::sync::{mpsc, oneshot};
use tungstenite::WebSocket;
use tungstenite::protocol::Message;

use super::classify::ChangeScope;
use super::message::ReloadSignal;
use super::server::start_signal_server;

/// Messages handled by the broker actor
pub enum BrokerMsg {
    /// Raw stream from the acceptor thread, pre-handshake
    AddAgent(TcpStream),
    /// Broadcast a signal; ack resolves once every connection was handed
    /// the message
    Trigger {
        signal: ReloadSignal,
        ack: oneshot::Sender<Result<()>>,
    },
    /// Close all connections and stop the actor
    Shutdown,
}

/// One connected extension instance.
///
/// Transient: created on agent connect, destroyed on close or error. An
/// agent reconnect always produces a fresh connection.
struct AgentConnection {
    ws: WebSocket<TcpStream>,
}

/// Handle for triggering broadcasts from the build side.
#[derive(Clone)]
pub struct SignalBroker {
    tx: mpsc::Sender<BrokerMsg>,
    port: u16,
}

impl SignalBroker {
    /// Bind the listener and create the broker actor.
    ///
    /// The caller spawns [`BrokerActor::run`] on its runtime; the broker
    /// is useless until it does.
    pub fn start(port: u16) -> Result<(Self, BrokerActor)> {
        let (tx, rx) = mpsc::channel(32);
        let actual_port = start_signal_server(port, tx.clone())?;
        let broker = Self {
            tx,
            port: actual_port,
        };
        Ok((broker, BrokerActor::new(rx)))
    }

    /// Actual bound port (differs from the configured one only for port 0).
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Broadcast the signal for a reload scope to every connected agent.
    ///
    /// Resolves once the signal has been handed to the transport for all
    /// connections. A transport failure on any connection rejects the
    /// future; the orchestrator deliberately propagates that into the
    /// build's emit phase. `ChangeScope::None` is a contract violation
    /// filtered upstream and rejected here.
    pub async fn trigger(&self, scope: ChangeScope) -> Result<()> {
        let Some(signal) = ReloadSignal::from_scope(scope) else {
            bail!("trigger called with ChangeScope::None");
        };

        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(BrokerMsg::Trigger {
                signal,
                ack: ack_tx,
            })
            .await
            .map_err(|_| anyhow!("signal broker is not running"))?;

        ack_rx
            .await
            .context("signal broker dropped before acknowledging")?
    }

    /// Close all agent connections and stop the actor.
    pub async fn shutdown(&self) {
        let _ = self.tx.send(BrokerMsg::Shutdown).await;
    }
}

/// Broker actor event loop. Spawn [`Self::run`] on a tokio runtime.
pub struct BrokerActor {
    rx: mpsc::Receiver<BrokerMsg>,
    agents: Vec<AgentConnection>,
}

impl BrokerActor {
    fn new(rx: mpsc::Receiver<BrokerMsg>) -> Self {
        Self {
            rx,
            agents: Vec::new(),
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.rx.recv().await {
            match msg {
                BrokerMsg::AddAgent(stream) => self.add_agent(stream),

                BrokerMsg::Trigger { signal, ack } => {
                    let result = self.broadcast(signal);
                    let _ = ack.send(result);
                }

                BrokerMsg::Shutdown => {
                    crate::debug!("broker"; "shutting down");
                    for agent in &mut self.agents {
                        let _ = agent.ws.close(None);
                    }
                    self.agents.clear();
                    break;
                }
            }
        }
    }

    /// Handshake a new agent connection
    fn add_agent(&mut self, stream: TcpStream) {
        match tungstenite::accept(stream) {
            Ok(ws) => {
                crate::debug!("broker"; "agent registered (total: {})", self.agents.len() + 1);
                self.agents.push(AgentConnection { ws });
            }
            Err(e) => {
                crate::log!("broker"; "handshake failed: {}", e);
            }
        }
    }

    /// Send the signal to every connection, in registration order.
    ///
    /// Connections that turn out to be closed are dropped silently (the
    /// agent reconnects with a fresh one). Any other transport error
    /// fails the broadcast, after the remaining connections were still
    /// attempted. Per-connection ordering is guaranteed by this single
    /// loop being the only writer.
    fn broadcast(&mut self, signal: ReloadSignal) -> Result<()> {
        let count = self.agents.len();
        if count == 0 {
            crate::debug!("broker"; "no agents connected");
            return Ok(());
        }

        let payload = Message::Text(signal.to_json().into());
        let mut first_error: Option<tungstenite::Error> = None;

        self.agents.retain_mut(|agent| {
            match agent.ws.send(payload.clone()) {
                Ok(()) => true,
                Err(e) => {
                    if is_disconnect(&e) {
                        crate::debug!("broker"; "agent disconnected: {}", e);
                    } else if first_error.is_none() {
                        first_error = Some(e);
                    } else {
                        crate::log!("broker"; "send failed: {}", e);
                    }
                    false
                }
            }
        });

        match first_error {
            None => {
                crate::debug!("broker"; "broadcast {} to {} agents", signal.wire_tag(), count);
                Ok(())
            }
            Some(e) => Err(anyhow!("broadcast failed: {e}")),
        }
    }
}

/// Errors that mean the agent went away, as opposed to a transport fault.
fn is_disconnect(e: &tungstenite::Error) -> bool {
    use std::io::ErrorKind;
    match e {
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => true,
        tungstenite::Error::Io(io) => matches!(
            io.kind(),
            ErrorKind::BrokenPipe | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted
        ),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn trigger_with_no_agents_is_a_successful_noop() {
        let (broker, actor) = SignalBroker::start(0).unwrap();
        tokio::spawn(actor.run());

        broker
            .trigger(ChangeScope::BackgroundOrContent)
            .await
            .unwrap();
        broker.trigger(ChangeScope::PageOnly).await.unwrap();

        broker.shutdown().await;
    }

    #[tokio::test]
    async fn trigger_with_none_scope_is_rejected() {
        let (broker, actor) = SignalBroker::start(0).unwrap();
        tokio::spawn(actor.run());

        assert!(broker.trigger(ChangeScope::None).await.is_err());

        broker.shutdown().await;
    }

    #[tokio::test]
    async fn ephemeral_port_is_reported() {
        let (broker, _actor) = SignalBroker::start(0).unwrap();
        assert_ne!(broker.port(), 0);
    }

    #[tokio::test]
    async fn broadcast_reaches_a_connected_client() {
        let (broker, actor) = SignalBroker::start(0).unwrap();
        tokio::spawn(actor.run());
        let port = broker.port();

        let client = tokio::task::spawn_blocking(move || {
            let (mut ws, _) =
                tungstenite::connect(format!("ws://127.0.0.1:{port}")).unwrap();
            match ws.read().unwrap() {
                Message::Text(text) => ReloadSignal::from_json(&text),
                other => panic!("unexpected message: {other:?}"),
            }
        });

        // Give the acceptor and handshake a moment to register the client
        tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        broker
            .trigger(ChangeScope::BackgroundOrContent)
            .await
            .unwrap();

        assert_eq!(client.await.unwrap(), Some(ReloadSignal::FullReload));
        broker.shutdown().await;
    }
}
