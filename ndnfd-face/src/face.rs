//! NDN face implementation over a QUIC connection (§4.1).
//!
//! Outbound packets are NDNLP-sliced and sent as unreliable QUIC datagrams;
//! inbound datagrams are fed through a per-connection [`PartialMessageStore`]
//! and, once reassembled, delivered as [`FaceEvent`]s on a channel the
//! forwarding loop drains.

use bytes::BytesMut;
use log::{debug, trace, warn};
use ndnfd_common::ndnlp::NdnlpFragment;
use ndnfd_common::packet::{Data, Interest, Nack, NdnPacket};
use ndnfd_common::{Error, Result};
use ndnfd_core::face::{Face, FaceId, FaceInfo, FaceState, LinkType, Persistency, Scope};
use quinn::Connection;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::fragmentation::{PartialMessageStore, Slicer};

/// What a `QuicFace`'s background receiver hands back to the forwarding
/// loop. Carries the originating face so a multiplexing loop over many
/// faces can tell them apart.
#[derive(Debug, Clone)]
pub enum FaceEvent {
    Interest(Interest),
    Data(Data),
    Nack(Nack),
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct FaceMessage {
    pub face_id: FaceId,
    pub event: FaceEvent,
}

/// A Face backed by a single QUIC connection.
pub struct QuicFace {
    info: FaceInfo,
    connection: Connection,
    slicer: Slicer,
    mtu: usize,
}

impl QuicFace {
    /// Wraps an established QUIC connection as a Face and spawns the
    /// background task that reads datagrams, reassembles NDNLP fragments,
    /// and forwards decoded packets on `events`.
    pub fn new(
        id: FaceId,
        connection: Connection,
        scope: Scope,
        persistency: Persistency,
        mtu: usize,
        idle_period: Duration,
        events: mpsc::Sender<FaceMessage>,
    ) -> Arc<Self> {
        let local_uri = "quic://local".to_string();
        let remote_uri = format!("quic://{}", connection.remote_address());
        let info = FaceInfo::new(id, local_uri, remote_uri, scope, persistency, LinkType::PointToPoint);

        let face = Arc::new(Self { info, connection, slicer: Slicer::new(), mtu });
        face.clone().spawn_receiver(idle_period, events);
        face
    }

    fn spawn_receiver(self: Arc<Self>, idle_period: Duration, events: mpsc::Sender<FaceMessage>) {
        let partials = PartialMessageStore::new(idle_period);
        tokio::spawn(async move {
            loop {
                let datagram = match self.connection.read_datagram().await {
                    Ok(d) => d,
                    Err(e) => {
                        debug!("[face {}] connection closed: {}", self.info.id, e);
                        let _ = events
                            .send(FaceMessage { face_id: self.info.id, event: FaceEvent::Failed(e.to_string()) })
                            .await;
                        return;
                    }
                };

                self.info.counters.in_bytes.add(datagram.len() as u64);

                let fragment = match NdnlpFragment::decode(&datagram) {
                    Ok(f) => f,
                    Err(e) => {
                        warn!("[face {}] malformed NDNLP fragment: {}", self.info.id, e);
                        self.info.counters.dropped.increment();
                        continue;
                    }
                };

                let Some(payload) = partials.insert(fragment).await else { continue };

                let packet = match NdnPacket::from_bytes(&payload) {
                    Ok(p) => p,
                    Err(e) => {
                        warn!("[face {}] malformed reassembled packet: {}", self.info.id, e);
                        self.info.counters.dropped.increment();
                        continue;
                    }
                };

                let event = match packet {
                    NdnPacket::Interest(interest) => {
                        self.info.counters.in_interests.increment();
                        FaceEvent::Interest(interest)
                    }
                    NdnPacket::Data(data) => {
                        self.info.counters.in_data.increment();
                        FaceEvent::Data(data)
                    }
                    NdnPacket::Nack(nack) => {
                        self.info.counters.in_nacks.increment();
                        FaceEvent::Nack(nack)
                    }
                };

                if events.send(FaceMessage { face_id: self.info.id, event }).await.is_err() {
                    return;
                }
            }
        });
    }

    fn send(&self, packet: NdnPacket) -> Result<()> {
        if self.info.state() != FaceState::Up {
            return Err(Error::Transport(format!("face {} is not up", self.info.id)));
        }

        let bytes = packet.to_bytes()?;
        let fragments = self.slicer.slice(&bytes, self.mtu);
        trace!("[face {}] sending {} in {} fragment(s)", self.info.id, packet.name(), fragments.len());

        for fragment in fragments {
            let mut buf = BytesMut::new();
            fragment.encode(&mut buf);
            self.connection
                .send_datagram(buf.freeze())
                .map_err(|e| Error::Transport(e.to_string()))?;
        }

        self.info.counters.out_bytes.add(bytes.len() as u64);
        Ok(())
    }
}

/// Thin `Face` adapter over a shared `QuicFace`. A bare `QuicFace` can't
/// implement `Face` and also live behind the `Arc` its background receiver
/// task needs, since the forwarder wants a `Box<dyn Face>` it owns outright;
/// this handle is the `Arc`-sharing local type the orphan rule requires.
pub struct QuicFaceHandle(pub Arc<QuicFace>);

impl Face for QuicFaceHandle {
    fn info(&self) -> &FaceInfo {
        &self.0.info
    }

    fn send_interest(&self, interest: Interest) -> Result<()> {
        self.0.info.counters.out_interests.increment();
        self.0.send(NdnPacket::Interest(interest))
    }

    fn send_data(&self, data: Data) -> Result<()> {
        self.0.info.counters.out_data.increment();
        self.0.send(NdnPacket::Data(data))
    }

    fn send_nack(&self, nack: Nack) -> Result<()> {
        self.0.info.counters.out_nacks.increment();
        self.0.send(NdnPacket::Nack(nack))
    }
}
