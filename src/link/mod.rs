//! # Vehicle Link Module
//!
//! Owns the sockets to the autopilot: a TCP stream for outbound commands
//! and a UDP socket for inbound telemetry, mirroring the MAVProxy-style
//! split the vehicle side expects.
//!
//! This module handles:
//! - Opening and re-opening both sockets
//! - Fire-and-forget sends that recover the link inline on a fault
//! - Timed receives for the bounded drain loop
//! - The 1 Hz heartbeat timer

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpSocket, TcpStream, UdpSocket};
use tracing::{debug, info, trace, warn};

use crate::error::Result;

/// Heartbeat emission period
pub const HEARTBEAT_PERIOD: Duration = Duration::from_secs(1);

/// Fires at most once per period; re-arms itself when it fires
///
/// Reset on connection re-establishment so a fresh link starts a full
/// period away from its first heartbeat.
#[derive(Debug, Clone)]
pub struct HeartbeatTimer {
    period: Duration,
    last: Instant,
}

impl HeartbeatTimer {
    /// Creates a timer that first fires one period from now.
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            last: Instant::now(),
        }
    }

    /// True when a period has elapsed; re-arms for the next period.
    pub fn overflow(&mut self) -> bool {
        if self.last.elapsed() >= self.period {
            self.last = Instant::now();
            true
        } else {
            false
        }
    }

    /// Restarts the current period.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }
}

/// TCP command + UDP telemetry link to the autopilot
///
/// `send` never surfaces a transport fault to the caller: a failed write
/// marks the link down and synchronously attempts one reopen before
/// returning, per the recovery design.
pub struct ArdupilotLink {
    /// Autopilot command endpoint
    remote: SocketAddr,
    /// Local TCP bind port (0 = ephemeral)
    command_port: u16,
    /// Local UDP telemetry bind port (0 = ephemeral)
    telemetry_port: u16,
    sender: Option<TcpStream>,
    receiver: Option<UdpSocket>,
    connected: bool,
    /// Bumped on every successful open, so the supervisor can notice an
    /// inline reopen performed by a faulting send or receive
    generation: u64,
}

impl std::fmt::Debug for ArdupilotLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArdupilotLink")
            .field("remote", &self.remote)
            .field("connected", &self.connected)
            .finish_non_exhaustive()
    }
}

impl ArdupilotLink {
    /// Creates a closed link to the given autopilot endpoint.
    #[must_use]
    pub fn new(remote: SocketAddr, command_port: u16, telemetry_port: u16) -> Self {
        Self {
            remote,
            command_port,
            telemetry_port,
            sender: None,
            receiver: None,
            connected: false,
            generation: 0,
        }
    }

    /// True while the command stream is believed healthy.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// True while the telemetry socket exists.
    #[must_use]
    pub fn has_sockets(&self) -> bool {
        self.receiver.is_some()
    }

    /// Local address of the telemetry socket, once open.
    pub fn telemetry_addr(&self) -> Option<SocketAddr> {
        self.receiver.as_ref().and_then(|s| s.local_addr().ok())
    }

    /// Opens both sockets.
    ///
    /// # Errors
    ///
    /// Returns error if binding or connecting fails; the link stays down.
    pub async fn open(&mut self) -> Result<()> {
        self.close();

        let receiver = UdpSocket::bind(("0.0.0.0", self.telemetry_port)).await?;

        let socket = TcpSocket::new_v4()?;
        socket.set_reuseaddr(true)?;
        socket.bind(SocketAddr::from(([0, 0, 0, 0], self.command_port)))?;
        let sender = socket.connect(self.remote).await?;
        sender.set_nodelay(true)?;

        info!("Ardupilot teleoperation link established to {}", self.remote);
        self.sender = Some(sender);
        self.receiver = Some(receiver);
        self.connected = true;
        self.generation += 1;
        Ok(())
    }

    /// Count of successful opens since creation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Drops both sockets and marks the link down.
    pub fn close(&mut self) {
        self.sender = None;
        self.receiver = None;
        self.connected = false;
    }

    /// Sends one frame to the vehicle.
    ///
    /// Returns the number of bytes written: zero when the link is down.
    /// On an I/O fault the link is torn down and one reopen is attempted
    /// inline before returning.
    pub async fn send(&mut self, frame: &[u8]) -> usize {
        if !self.connected {
            return 0;
        }
        let Some(sender) = self.sender.as_mut() else {
            return 0;
        };

        let result = async {
            sender.write_all(frame).await?;
            sender.flush().await
        }
        .await;

        match result {
            Ok(()) => {
                trace!("Sent {} bytes to {}", frame.len(), self.remote);
                frame.len()
            }
            Err(e) => {
                warn!("Unable to send data to MAVLink system: {}", e);
                if let Err(e) = self.open().await {
                    warn!("Connection failed: {}", e);
                }
                0
            }
        }
    }

    /// Receives one telemetry datagram, waiting at most `timeout`.
    ///
    /// Returns `None` when nothing arrived in time or the socket is gone.
    /// A receive fault tears the link down and attempts one reopen.
    pub async fn recv(&mut self, buf: &mut [u8], timeout: Duration) -> Option<usize> {
        let receiver = self.receiver.as_ref()?;

        match tokio::time::timeout(timeout, receiver.recv_from(buf)).await {
            Ok(Ok((n, _peer))) => {
                trace!("Received MAVLink data with size: {}", n);
                Some(n)
            }
            Ok(Err(e)) => {
                warn!("Error receiving data: {}", e);
                if let Err(e) = self.open().await {
                    warn!("Connection failed: {}", e);
                }
                None
            }
            Err(_) => {
                debug!("telemetry poll timed out");
                None
            }
        }
    }
}
