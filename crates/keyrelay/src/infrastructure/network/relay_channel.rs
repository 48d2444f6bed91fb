//! UDP transport shared by the host and client sessions.
//!
//! A [`RelayChannel`] owns one bound UDP socket.  Sending is best-effort:
//! a datagram handed to the OS counts as delivered, and failures to reach an
//! individual peer are logged rather than returned from a broadcast.
//!
//! # Receiving
//!
//! [`RelayChannel::start_receiving`] spawns one background Tokio task that
//! loops on `recv_from` and pushes every [`Datagram`] into a bounded queue.
//! The loop re-arms after every message and after transient errors; it ends
//! only when the channel is closed or the queue's consumer is dropped.
//!
//! # Transient errors
//!
//! On a connected socket, an ICMP "port unreachable" reply to an earlier
//! send surfaces as `ConnectionRefused` (or `ConnectionReset` on Windows) on
//! the next receive.  These say nothing about the health of the socket, so
//! the loop logs them and keeps going.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use keyrelay_core::protocol::MAX_DATAGRAM_SIZE;
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::application::relay_keys::{KeyTransmitter, TransmitError};

/// Pause after an unexpected receive error before re-arming.
const RECV_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// Error type for channel operations.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The UDP socket could not be bound, usually because the port is taken.
    #[error("failed to bind UDP socket on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to connect UDP socket to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to send to {dest}: {source}")]
    Send {
        dest: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("socket I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `send` was called before `connect`.
    #[error("channel has no connected peer")]
    NotConnected,

    #[error("channel is already receiving")]
    AlreadyReceiving,

    /// The channel was closed; no further operations are possible.
    #[error("channel is closed")]
    Closed,
}

/// One received datagram and the address it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub payload: Vec<u8>,
    pub sender: SocketAddr,
}

/// A bound UDP socket plus its optional background receive task.
///
/// All methods take `&self` so the channel can be shared between a session
/// loop and the code that stops it.
pub struct RelayChannel {
    socket: Mutex<Option<Arc<UdpSocket>>>,
    local_addr: SocketAddr,
    peer: Mutex<Option<SocketAddr>>,
    receive_task: Mutex<Option<JoinHandle<()>>>,
}

impl RelayChannel {
    /// Binds a UDP socket on `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Bind`] if the address is in use or otherwise
    /// unavailable.
    pub async fn bind(addr: SocketAddr) -> Result<Self, ChannelError> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| ChannelError::Bind { addr, source })?;
        let local_addr = socket.local_addr()?;
        info!("UDP channel bound on {local_addr}");

        Ok(Self {
            socket: Mutex::new(Some(Arc::new(socket))),
            local_addr,
            peer: Mutex::new(None),
            receive_task: Mutex::new(None),
        })
    }

    /// The address the socket is bound to, with the OS-assigned port resolved.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Fixes `remote` as the default destination for [`Self::send`].
    ///
    /// The socket is connected at the OS level, so only datagrams from
    /// `remote` are received afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Closed`] after `close`, or
    /// [`ChannelError::Connect`] if the OS rejects the address.
    pub async fn connect(&self, remote: SocketAddr) -> Result<(), ChannelError> {
        let socket = self.socket()?;
        socket
            .connect(remote)
            .await
            .map_err(|source| ChannelError::Connect { addr: remote, source })?;
        *lock(&self.peer) = Some(remote);
        debug!("UDP channel {} connected to {remote}", self.local_addr);
        Ok(())
    }

    /// Sends `payload` to the connected peer.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::NotConnected`] before `connect`,
    /// [`ChannelError::Closed`] after `close`, or [`ChannelError::Send`].
    pub async fn send(&self, payload: &[u8]) -> Result<(), ChannelError> {
        let socket = self.socket()?;
        let dest = (*lock(&self.peer)).ok_or(ChannelError::NotConnected)?;
        socket
            .send(payload)
            .await
            .map_err(|source| ChannelError::Send { dest, source })?;
        Ok(())
    }

    /// Sends `payload` to `dest`.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Closed`] after `close`, or [`ChannelError::Send`].
    pub async fn send_to(&self, payload: &[u8], dest: SocketAddr) -> Result<(), ChannelError> {
        let socket = self.socket()?;
        socket
            .send_to(payload, dest)
            .await
            .map_err(|source| ChannelError::Send { dest, source })?;
        Ok(())
    }

    /// Sends `payload` to every address in `dests`, best-effort.
    ///
    /// A failed send is logged and the broadcast moves on to the next
    /// destination.  Returns how many sends the OS accepted.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Closed`] after `close`.
    pub async fn send_to_all(
        &self,
        payload: &[u8],
        dests: &[SocketAddr],
    ) -> Result<usize, ChannelError> {
        let socket = self.socket()?;
        let mut delivered = 0;
        for &dest in dests {
            match socket.send_to(payload, dest).await {
                Ok(_) => delivered += 1,
                Err(e) => warn!("failed to send to {dest}: {e}"),
            }
        }
        Ok(delivered)
    }

    /// Starts the background receive task and returns its queue.
    ///
    /// `capacity` bounds the queue; when it is full the receive task waits
    /// for the consumer instead of dropping datagrams.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Closed`] after `close`, or
    /// [`ChannelError::AlreadyReceiving`] if called twice.
    pub fn start_receiving(&self, capacity: usize) -> Result<mpsc::Receiver<Datagram>, ChannelError> {
        let socket = self.socket()?;
        let mut task = lock(&self.receive_task);
        if task.is_some() {
            return Err(ChannelError::AlreadyReceiving);
        }

        let (tx, rx) = mpsc::channel(capacity.max(1));
        let local = self.local_addr;
        *task = Some(tokio::spawn(receive_loop(socket, tx, local)));
        debug!("receive task started on {local}");
        Ok(rx)
    }

    /// Stops the receive task and releases the socket.
    ///
    /// Calling `close` on a closed channel does nothing.
    pub fn close(&self) {
        if let Some(task) = lock(&self.receive_task).take() {
            task.abort();
        }
        if lock(&self.socket).take().is_some() {
            info!("UDP channel on {} closed", self.local_addr);
        }
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.socket).is_none()
    }

    fn socket(&self) -> Result<Arc<UdpSocket>, ChannelError> {
        lock(&self.socket).clone().ok_or(ChannelError::Closed)
    }
}

impl Drop for RelayChannel {
    fn drop(&mut self) {
        self.close();
    }
}

#[async_trait]
impl KeyTransmitter for RelayChannel {
    async fn send_to_peers(
        &self,
        payload: &[u8],
        peers: &[SocketAddr],
    ) -> Result<usize, TransmitError> {
        match self.send_to_all(payload, peers).await {
            Ok(delivered) => Ok(delivered),
            Err(e) => {
                debug!("broadcast refused: {e}");
                Err(TransmitError::Closed)
            }
        }
    }
}

/// The body of the background receive task.
async fn receive_loop(socket: Arc<UdpSocket>, tx: mpsc::Sender<Datagram>, local: SocketAddr) {
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];

    loop {
        let (len, sender) = match socket.recv_from(&mut buf).await {
            Ok(pair) => pair,
            Err(e) if is_transient_error(&e) => {
                debug!("transient receive error on {local}: {e}");
                continue;
            }
            Err(e) => {
                warn!("receive error on {local}: {e}");
                tokio::time::sleep(RECV_ERROR_BACKOFF).await;
                continue;
            }
        };

        let datagram = Datagram {
            payload: buf[..len].to_vec(),
            sender,
        };
        if tx.send(datagram).await.is_err() {
            // Consumer dropped: the session is gone.
            break;
        }
    }

    debug!("receive task on {local} stopped");
}

/// Returns `true` for errors caused by an earlier send rather than the socket.
fn is_transient_error(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::Interrupted
    )
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
