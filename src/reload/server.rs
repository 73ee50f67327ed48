//! Signal Server Listener
//!
//! Binds the broker's TCP listener and feeds accepted agent connections
//! to the broker actor over a channel. The WebSocket handshake itself
//! happens inside the actor.

use std::net::TcpListener;

use anyhow::{Context, Result};

use super::broker::BrokerMsg;

/// Start the listener for agent connections.
///
/// Accepted streams are sent through the channel for the broker actor to
/// handshake and register. Binding a configured port that is already in
/// use is a startup failure, not something to paper over with a retry;
/// port 0 binds an ephemeral port. Returns the actual bound port.
pub fn start_signal_server(
    port: u16,
    broker_tx: tokio::sync::mpsc::Sender<BrokerMsg>,
) -> Result<u16> {
    let listener = TcpListener::bind(format!("127.0.0.1:{port}"))
        .with_context(|| format!("failed to bind signal server on port {port}"))?;
    let actual_port = listener.local_addr()?.port();
    listener.set_nonblocking(true)?;

    // Acceptor thread; lives for the whole build session
    std::thread::spawn(move || {
        loop {
            match listener.accept() {
                Ok((stream, addr)) => {
                    crate::debug!("broker"; "agent connected: {}", addr);

                    // Switch to blocking for the WebSocket handshake and sends
                    let _ = stream.set_nonblocking(false);

                    if broker_tx.blocking_send(BrokerMsg::AddAgent(stream)).is_err() {
                        // Broker actor is gone; stop accepting
                        break;
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(std::time::Duration::from_millis(100));
                    continue;
                }
                Err(e) => {
                    crate::log!("broker"; "accept error: {}", e);
                    std::thread::sleep(std::time::Duration::from_millis(100));
                }
            }
        }
    });

    Ok(actual_port)
}
