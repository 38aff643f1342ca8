//! Broker client with an owned connection state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, RwLock};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::BrokerConfig;

use super::frame::Frame;
use super::types::{BrokerError, MessageListener, SendOptions};

/// What to do with the connection before the next operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectAction {
    /// The existing connection is usable.
    Reuse,
    /// Tear down whatever is there and dial a fresh connection.
    Reconnect,
}

/// Reconnection decision as a pure function of the current state and the
/// result of a liveness probe. A connection is only ever reused when the
/// probe confirms it.
pub fn connect_action(currently_connected: bool, probe_ok: bool) -> ConnectAction {
    if currently_connected && probe_ok {
        ConnectAction::Reuse
    } else {
        ConnectAction::Reconnect
    }
}

/// Shared pieces of one live connection.
#[derive(Clone)]
struct ConnectionHandle {
    writer: Arc<Mutex<OwnedWriteHalf>>,
    /// Read half, taken by the first subscriber's reader task.
    reader: Arc<Mutex<Option<BufReader<OwnedReadHalf>>>>,
    alive: Arc<AtomicBool>,
}

impl ConnectionHandle {
    fn is_live(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn mark_dead(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    async fn write_frame(&self, frame: &Frame) -> Result<(), BrokerError> {
        let mut writer = self.writer.lock().await;
        let result = async {
            writer.write_all(&frame.encode()).await?;
            writer.flush().await
        }
        .await;
        if let Err(e) = result {
            self.mark_dead();
            return Err(BrokerError::ConnectionLost(e.to_string()));
        }
        Ok(())
    }
}

enum ConnectionState {
    Disconnected,
    Connected(ConnectionHandle),
}

/// Client for the message broker.
///
/// Holds at most one connection per process, established lazily on first
/// use and reused across sends. Reconnection happens only when a probe
/// observes the connection dead, never proactively.
pub struct BrokerClient {
    config: BrokerConfig,
    state: RwLock<ConnectionState>,
}

impl BrokerClient {
    pub fn new(config: BrokerConfig) -> Self {
        Self {
            config,
            state: RwLock::new(ConnectionState::Disconnected),
        }
    }

    /// Ensure a usable connection exists, dialing one if needed.
    pub async fn connect(&self) -> Result<(), BrokerError> {
        self.ensure_connected().await.map(|_| ())
    }

    /// Whether a live connection is currently held.
    pub async fn is_connected(&self) -> bool {
        match &*self.state.read().await {
            ConnectionState::Connected(handle) => handle.is_live(),
            ConnectionState::Disconnected => false,
        }
    }

    /// Liveness check. Fails with [`BrokerError::NotConnected`] when no
    /// usable connection is held.
    pub async fn assert_connected(&self) -> Result<(), BrokerError> {
        if self.is_connected().await {
            Ok(())
        } else {
            Err(BrokerError::NotConnected)
        }
    }

    /// Drop the connection, telling the broker first when possible.
    /// No-ops when already disconnected.
    pub async fn disconnect(&self) {
        let mut state = self.state.write().await;
        if let ConnectionState::Connected(handle) =
            std::mem::replace(&mut *state, ConnectionState::Disconnected)
        {
            info!("Disconnecting from broker");
            if handle.is_live() {
                let _ = handle.write_frame(&Frame::disconnect()).await;
            }
        }
    }

    /// Publish one message to `destination`.
    ///
    /// A dead connection observed here fails the send; there is no
    /// internal retry. The next send dials afresh.
    pub async fn send(
        &self,
        destination: &str,
        body: &str,
        opts: &SendOptions,
    ) -> Result<(), BrokerError> {
        let handle = self.ensure_connected().await?;
        let frame = Frame::send(destination, body, opts);
        handle.write_frame(&frame).await?;
        debug!("Sent {} bytes to {}", body.len(), destination);
        Ok(())
    }

    /// Subscribe `listener` to each queue and start dispatching messages.
    ///
    /// Acks are sent after the listener returns, and the prefetch of one
    /// keeps at most one unacknowledged message in flight per consumer.
    pub async fn subscribe(
        &self,
        queues: &[String],
        consumer_id: &str,
        listener: Arc<dyn MessageListener>,
    ) -> Result<(), BrokerError> {
        let handle = self.ensure_connected().await?;

        let reader = handle
            .reader
            .lock()
            .await
            .take()
            .ok_or(BrokerError::ListenerActive)?;

        for (i, queue) in queues.iter().enumerate() {
            let frame = Frame::subscribe(&format!("{consumer_id}-{i}"), queue);
            handle.write_frame(&frame).await?;
            info!("[{}] Subscribed to {}", consumer_id, queue);
        }

        let writer = handle.writer.clone();
        let alive = handle.alive.clone();
        let consumer = consumer_id.to_string();
        tokio::spawn(async move {
            let mut reader = reader;
            loop {
                match Frame::read(&mut reader).await {
                    Ok(Some(frame)) if frame.command == "MESSAGE" => {
                        let destination = frame.header("destination").unwrap_or("").to_string();
                        let body = String::from_utf8_lossy(&frame.body).to_string();
                        listener.on_message(&destination, &body).await;

                        let ack_id = frame
                            .header("ack")
                            .or_else(|| frame.header("message-id"))
                            .map(str::to_string);
                        if let Some(id) = ack_id {
                            let ack = Frame::ack(&id);
                            let mut w = writer.lock().await;
                            let result = async {
                                w.write_all(&ack.encode()).await?;
                                w.flush().await
                            }
                            .await;
                            if let Err(e) = result {
                                warn!("[{}] Failed to ack {}: {}", consumer, id, e);
                                alive.store(false, Ordering::SeqCst);
                                break;
                            }
                        }
                    }
                    Ok(Some(frame)) => {
                        debug!("[{}] Ignoring {} frame", consumer, frame.command);
                    }
                    Ok(None) => {
                        info!("[{}] Broker closed the connection", consumer);
                        alive.store(false, Ordering::SeqCst);
                        break;
                    }
                    Err(e) => {
                        warn!("[{}] Listener error: {}", consumer, e);
                        alive.store(false, Ordering::SeqCst);
                        break;
                    }
                }
            }
        });

        Ok(())
    }

    async fn ensure_connected(&self) -> Result<ConnectionHandle, BrokerError> {
        {
            let state = self.state.read().await;
            if let ConnectionState::Connected(handle) = &*state {
                if connect_action(true, handle.is_live()) == ConnectAction::Reuse {
                    return Ok(handle.clone());
                }
            }
        }

        let mut state = self.state.write().await;
        // Another task may have reconnected while we waited for the lock.
        if let ConnectionState::Connected(handle) = &*state {
            if handle.is_live() {
                return Ok(handle.clone());
            }
        }
        if matches!(&*state, ConnectionState::Connected(_)) {
            debug!("Discarding stale broker connection");
            *state = ConnectionState::Disconnected;
        }

        let handle = self.dial().await?;
        *state = ConnectionState::Connected(handle.clone());
        Ok(handle)
    }

    async fn dial(&self) -> Result<ConnectionHandle, BrokerError> {
        let host = self.config.host.as_str();
        let port = self.config.port;
        let connect_timeout = Duration::from_secs(self.config.connect_timeout_secs as u64);

        info!("Connecting to broker at {}:{}", host, port);
        let stream = timeout(connect_timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| BrokerError::ConnectFailed(format!("connect to {host}:{port} timed out")))?
            .map_err(|e| BrokerError::ConnectFailed(e.to_string()))?;

        let (read_half, write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);
        let mut writer = write_half;

        let connect = Frame::connect(host, &self.config.user, &self.config.password);
        writer
            .write_all(&connect.encode())
            .await
            .map_err(|e| BrokerError::ConnectFailed(e.to_string()))?;
        writer
            .flush()
            .await
            .map_err(|e| BrokerError::ConnectFailed(e.to_string()))?;

        let reply = timeout(connect_timeout, Frame::read(&mut reader))
            .await
            .map_err(|_| BrokerError::ConnectFailed("handshake timed out".to_string()))?
            .map_err(|e| BrokerError::ConnectFailed(e.to_string()))?;

        match reply {
            Some(frame) if frame.command == "CONNECTED" => {}
            Some(frame) if frame.command == "ERROR" => {
                let reason = frame
                    .header("message")
                    .map(str::to_string)
                    .unwrap_or_else(|| String::from_utf8_lossy(&frame.body).to_string());
                return Err(BrokerError::ConnectFailed(reason));
            }
            Some(frame) => {
                return Err(BrokerError::ConnectFailed(format!(
                    "unexpected {} frame during handshake",
                    frame.command
                )));
            }
            None => {
                return Err(BrokerError::ConnectFailed(
                    "broker closed the connection during handshake".to_string(),
                ));
            }
        }

        // The broker has been observed to drop messages sent immediately
        // after a handshake; give it a moment before first use.
        if self.config.settle_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.settle_delay_ms)).await;
        }

        Ok(ConnectionHandle {
            writer: Arc::new(Mutex::new(writer)),
            reader: Arc::new(Mutex::new(Some(reader))),
            alive: Arc::new(AtomicBool::new(true)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(port: u16) -> BrokerConfig {
        BrokerConfig {
            host: "127.0.0.1".to_string(),
            port,
            user: "ingest".to_string(),
            password: "ingest".to_string(),
            destination: "/queue/DataReady".to_string(),
            cycle_folder: "cycle_22_1".to_string(),
            settle_delay_ms: 0,
            connect_timeout_secs: 1,
            persistent: true,
            priority: 4,
            delay_ms: None,
        }
    }

    #[test]
    fn test_disconnected_always_reconnects() {
        assert_eq!(connect_action(false, false), ConnectAction::Reconnect);
        assert_eq!(connect_action(false, true), ConnectAction::Reconnect);
    }

    #[test]
    fn test_live_connection_is_reused() {
        assert_eq!(connect_action(true, true), ConnectAction::Reuse);
    }

    #[test]
    fn test_dead_connection_is_replaced() {
        assert_eq!(connect_action(true, false), ConnectAction::Reconnect);
    }

    #[tokio::test]
    async fn test_connect_refused_fails() {
        // Reserved port nothing listens on.
        let client = BrokerClient::new(test_config(1));
        let err = client.connect().await.unwrap_err();
        assert!(matches!(err, BrokerError::ConnectFailed(_)));
        assert!(!client.is_connected().await);
    }

    #[tokio::test]
    async fn test_assert_connected_when_disconnected() {
        let client = BrokerClient::new(test_config(61613));
        let err = client.assert_connected().await.unwrap_err();
        assert!(matches!(err, BrokerError::NotConnected));
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let client = BrokerClient::new(test_config(61613));
        client.disconnect().await;
        client.disconnect().await;
        assert!(!client.is_connected().await);
    }
}
