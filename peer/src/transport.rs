//! Request/response transport between peers
//!
//! Every call opens a TCP connection, writes one request frame, reads one
//! reply frame and closes. A frame is a big-endian `u32` length followed by
//! the bincode-encoded [`Packet`]. There are no retries and no deadlines:
//! whatever goes wrong on the caller's side is reported as
//! [`Error::Unreachable`].

use crate::error::{Error, Result};
use async_trait::async_trait;
use log::{debug, error, info, warn};
use shared::Packet;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tokio::task::JoinSet;

/// Upper bound on a single encoded packet.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// Client side of a call.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request` to the peer at `address` and waits for its reply.
    async fn call(&self, address: &str, request: Packet) -> Result<Packet>;
}

/// Server side of a call: turns one request into one reply.
#[async_trait]
pub trait Service: Send + Sync + 'static {
    async fn handle(&self, request: Packet) -> Packet;
}

pub async fn write_frame<W>(writer: &mut W, packet: &Packet) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let body = packet.to_bytes()?;
    if body.len() > MAX_FRAME_LEN {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("frame of {} bytes exceeds {}", body.len(), MAX_FRAME_LEN),
        )));
    }
    writer.write_u32(body.len() as u32).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_frame<R>(reader: &mut R) -> Result<Packet>
where
    R: AsyncRead + Unpin,
{
    let len = reader.read_u32().await? as usize;
    if len > MAX_FRAME_LEN {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("frame of {} bytes exceeds {}", len, MAX_FRAME_LEN),
        )));
    }
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Packet::from_bytes(&body)?)
}

/// Plain TCP transport used between real peers.
#[derive(Debug, Clone, Default)]
pub struct TcpTransport;

impl TcpTransport {
    pub fn new() -> Self {
        Self
    }

    async fn exchange(address: &str, request: &Packet) -> Result<Packet> {
        let mut stream = TcpStream::connect(address).await?;
        write_frame(&mut stream, request).await?;
        read_frame(&mut stream).await
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn call(&self, address: &str, request: Packet) -> Result<Packet> {
        debug!("-> {} {}", address, request.name());
        match Self::exchange(address, &request).await {
            Ok(reply) => {
                debug!("<- {} {}", address, reply.name());
                Ok(reply)
            }
            Err(e) => Err(Error::unreachable(address, e)),
        }
    }
}

/// Accepts inbound calls and hands each one to a [`Service`] on its own task.
pub struct PeerServer {
    listener: TcpListener,
}

impl PeerServer {
    pub async fn bind(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Listening on {}", listener.local_addr()?);
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serves calls until `shutdown` is notified, then stops accepting and
    /// waits for every in-flight call to write its reply.
    pub async fn serve<S: Service>(self, service: Arc<S>, shutdown: Arc<Notify>) -> Result<()> {
        let mut in_flight = JoinSet::new();

        loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    info!("Stopped accepting calls, draining {} in flight", in_flight.len());
                    break;
                }
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let service = Arc::clone(&service);
                            in_flight.spawn(async move {
                                if let Err(e) = Self::handle_connection(stream, service).await {
                                    warn!("Call from {} failed: {}", peer, e);
                                }
                            });
                        }
                        Err(e) => error!("Error accepting connection: {}", e),
                    }
                }
                Some(finished) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = finished {
                        error!("Call handler panicked: {}", e);
                    }
                }
            }
        }

        while let Some(finished) = in_flight.join_next().await {
            if let Err(e) = finished {
                error!("Call handler panicked: {}", e);
            }
        }
        Ok(())
    }

    async fn handle_connection<S: Service>(mut stream: TcpStream, service: Arc<S>) -> Result<()> {
        let request = read_frame(&mut stream).await?;
        let reply = service.handle(request).await;
        write_frame(&mut stream, &reply).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Hazard, Position};
    use tokio_test::{assert_err, assert_ok};

    struct Echo;

    #[async_trait]
    impl Service for Echo {
        async fn handle(&self, request: Packet) -> Packet {
            match request {
                Packet::StatusQuery => Packet::Status {
                    id: 7,
                    was_hit: false,
                    position: Position::new(1, 2),
                },
                _ => Packet::Ack,
            }
        }
    }

    #[tokio::test]
    async fn test_frame_round_trip_over_duplex() {
        let (mut a, mut b) = tokio::io::duplex(1024);
        let packet = Packet::HazardNotify {
            hazard: Hazard::new(3, Position::new(4, 4)),
            time_to_impact: 2,
        };
        assert_ok!(write_frame(&mut a, &packet).await);
        let read = assert_ok!(read_frame(&mut b).await);
        assert_eq!(read, packet);
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected() {
        let (mut a, mut b) = tokio::io::duplex(64);
        a.write_u32((MAX_FRAME_LEN + 1) as u32).await.unwrap();
        assert_err!(read_frame(&mut b).await);
    }

    #[tokio::test]
    async fn test_call_served_and_drained() {
        let server = PeerServer::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap().to_string();
        let shutdown = Arc::new(Notify::new());
        let handle = tokio::spawn(server.serve(Arc::new(Echo), Arc::clone(&shutdown)));

        let transport = TcpTransport::new();
        let reply = assert_ok!(transport.call(&addr, Packet::StatusQuery).await);
        assert_eq!(
            reply,
            Packet::Status {
                id: 7,
                was_hit: false,
                position: Position::new(1, 2)
            }
        );

        shutdown.notify_one();
        assert_ok!(handle.await.unwrap());

        let after = transport.call(&addr, Packet::StatusQuery).await;
        assert!(matches!(after, Err(Error::Unreachable { .. })));
    }

    /// Asks the server to stop while its own reply is still unwritten.
    struct LastCall {
        shutdown: Arc<Notify>,
    }

    #[async_trait]
    impl Service for LastCall {
        async fn handle(&self, _request: Packet) -> Packet {
            self.shutdown.notify_one();
            tokio::task::yield_now().await;
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            Packet::Ack
        }
    }

    #[tokio::test]
    async fn test_shutdown_drains_call_in_flight() {
        let server = PeerServer::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap().to_string();
        let shutdown = Arc::new(Notify::new());
        let service = Arc::new(LastCall {
            shutdown: Arc::clone(&shutdown),
        });
        let handle = tokio::spawn(server.serve(service, shutdown));

        let reply = assert_ok!(TcpTransport::new().call(&addr, Packet::Terminate).await);
        assert_eq!(reply, Packet::Ack);
        assert_ok!(handle.await.unwrap());

        let after = TcpTransport::new().call(&addr, Packet::Terminate).await;
        assert!(matches!(after, Err(Error::Unreachable { .. })));
    }

    #[tokio::test]
    async fn test_unreachable_peer() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let result = TcpTransport::new().call(&addr, Packet::Terminate).await;
        assert!(matches!(result, Err(Error::Unreachable { .. })));
    }
}
