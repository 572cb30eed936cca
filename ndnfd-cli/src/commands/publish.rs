//! Data-publishing command implementation for the ndnfd CLI.
//!
//! Runs a standalone QUIC producer for one name, outside the daemon
//! entirely — this is a demonstration/testing tool, not how a real
//! producer registers with a running `ndnfd` (that happens through
//! `fib add`/`face create` against the daemon it actually dials into).

use anyhow::Context;
use anyhow::Result;
use bytes::Bytes;
use log::info;
use ndnfd_common::name::Name;
use ndnfd_common::packet::Data;
use ndnfd_core::face::Face;
use ndnfd_face::{FaceEvent, FaceListener, FaceMessage, ServerOptions};
use std::time::Duration;
use tokio::signal;
use tokio::sync::mpsc;

pub async fn publish_data(name_str: String, content: String, ttl_ms: u32, listen_addr: String) -> Result<()> {
    let name = Name::from_str(&name_str);
    let data = Data::new(name.clone(), Bytes::from(content.into_bytes()))
        .with_freshness_period(Duration::from_millis(ttl_ms as u64));

    let options = ServerOptions { listen_addr: listen_addr.clone(), ..Default::default() };
    let listener = FaceListener::bind(&options).await.context("failed to bind QUIC listener")?;
    println!("serving {} on {} (Ctrl+C to stop)", name_str, listen_addr);

    loop {
        tokio::select! {
            pending = listener.accept() => {
                let Some(pending) = pending else { break };
                info!("producer accepted connection from {}", pending.remote_addr());
                let (events_tx, events_rx) = mpsc::channel::<FaceMessage>(16);
                let face = pending.into_face(0, options.mtu, Duration::from_secs(5), events_tx);
                tokio::spawn(serve_consumer(face, name.clone(), data.clone(), events_rx));
            }
            _ = signal::ctrl_c() => {
                println!("shutting down");
                break;
            }
        }
    }

    Ok(())
}

async fn serve_consumer(
    face: Box<dyn Face>,
    name: Name,
    data: Data,
    mut events: mpsc::Receiver<FaceMessage>,
) {
    while let Some(message) = events.recv().await {
        match message.event {
            FaceEvent::Interest(interest) if interest.name == name || name.is_prefix_of(&interest.name) => {
                if let Err(e) = face.send_data(data.clone()) {
                    log::warn!("failed to send Data: {}", e);
                }
            }
            FaceEvent::Interest(_) => {}
            FaceEvent::Failed(reason) => {
                info!("consumer connection closed: {}", reason);
                return;
            }
            FaceEvent::Data(_) | FaceEvent::Nack(_) => {}
        }
    }
}
