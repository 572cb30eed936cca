//! Connection management: binds QUIC endpoints, accepts/dials connections,
//! and turns each into a [`QuicFace`] (§4.1).
//!
//! `FaceId` assignment belongs to the forwarder (`Forwarder::next_face_id`),
//! so this module hands back a [`PendingFace`] rather than a finished `Face`
//! — the caller assigns an id and completes the face with `into_face`.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use quinn::{Connection, Endpoint};
use std::net::ToSocketAddrs;
use std::time::Duration;
use tokio::sync::mpsc;

use ndnfd_core::face::{Face, FaceId, Persistency, Scope};

use crate::config::{self, ClientOptions, ServerOptions};
use crate::face::{FaceMessage, QuicFace, QuicFaceHandle};

/// A connection whose handshake completed but that isn't yet wired up as a
/// registered `Face`.
pub struct PendingFace {
    connection: Connection,
    scope: Scope,
    persistency: Persistency,
}

impl PendingFace {
    pub fn remote_addr(&self) -> std::net::SocketAddr {
        self.connection.remote_address()
    }

    /// Completes the face: spawns its background receiver and returns it
    /// ready for `Forwarder::register_face`.
    pub fn into_face(
        self,
        id: FaceId,
        mtu: usize,
        idle_period: Duration,
        events: mpsc::Sender<FaceMessage>,
    ) -> Box<dyn Face> {
        Box::new(QuicFaceHandle(QuicFace::new(
            id,
            self.connection,
            self.scope,
            self.persistency,
            mtu,
            idle_period,
            events,
        )))
    }
}

/// Accepts inbound QUIC connections on a bound endpoint.
pub struct FaceListener {
    endpoint: Endpoint,
}

impl FaceListener {
    pub async fn bind(options: &ServerOptions) -> Result<Self> {
        let server_config = config::configure_server(options).await?;
        let endpoint = Endpoint::server(
            server_config,
            options.listen_addr.parse().context("invalid listen address")?,
        )?;
        info!("ndnfd-face listening on {}", endpoint.local_addr()?);
        Ok(Self { endpoint })
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.endpoint.local_addr()
    }

    /// Waits for the next inbound connection to complete its handshake.
    /// Faces arriving this way are non-local and on-demand: §4.1's defaults
    /// for peers that showed up rather than being configured ahead of time.
    /// Returns `None` once the endpoint itself has been closed.
    pub async fn accept(&self) -> Option<PendingFace> {
        loop {
            let incoming = self.endpoint.accept().await?;
            match incoming.await {
                Ok(connection) => {
                    debug!("accepted connection from {}", connection.remote_address());
                    return Some(PendingFace {
                        connection,
                        scope: Scope::NonLocal,
                        persistency: Persistency::OnDemand,
                    });
                }
                Err(e) => warn!("inbound QUIC handshake failed: {}", e),
            }
        }
    }

    pub fn close(&self) {
        self.endpoint.close(0u32.into(), b"ndnfd-face listener shutting down");
    }
}

/// Dials outbound QUIC connections. Faces created this way default to
/// persistent, non-local: an operator-configured link to a known peer
/// rather than a walk-up client.
pub struct FaceDialer {
    endpoint: Endpoint,
}

impl FaceDialer {
    pub async fn new(options: &ClientOptions) -> Result<Self> {
        let client_config = config::configure_client(options).await?;
        let mut endpoint = Endpoint::client("0.0.0.0:0".parse().unwrap())?;
        endpoint.set_default_client_config(client_config);
        Ok(Self { endpoint })
    }

    pub async fn connect<T: ToSocketAddrs>(&self, addr: T, server_name: &str) -> Result<PendingFace> {
        let addr = addr
            .to_socket_addrs()?
            .next()
            .context("failed to resolve remote address")?;
        let connection = self
            .endpoint
            .connect(addr, server_name)?
            .await
            .context("QUIC handshake failed")?;
        info!("connected to {}", connection.remote_address());
        Ok(PendingFace {
            connection,
            scope: Scope::NonLocal,
            persistency: Persistency::Persistent,
        })
    }

    pub fn close(&self) {
        self.endpoint.close(0u32.into(), b"ndnfd-face dialer shutting down");
    }
}
