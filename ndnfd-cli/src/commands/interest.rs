//! Interest-sending command implementation for the ndnfd CLI.
//!
//! Dials the router directly over QUIC rather than going through the
//! management socket — Interest/Data exchange is data-plane traffic, not a
//! management verb (§6 scopes the control channel to FIB/face/strategy/CS
//! administration only).

use anyhow::{Context, Result};
use ndnfd_common::name::Name;
use ndnfd_common::packet::Interest;
use ndnfd_core::face::Face;
use ndnfd_face::{ClientOptions, FaceDialer, FaceEvent, FaceMessage};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

pub async fn send_interest(name_str: String, timeout_ms: u64, router: String) -> Result<()> {
    let name = Name::from_str(&name_str);
    let interest = Interest::new(name).with_lifetime(Duration::from_millis(timeout_ms));

    let client_options = ClientOptions { verify_certificate: false, ..Default::default() };
    let dialer = FaceDialer::new(&client_options).await.context("failed to initialize QUIC dialer")?;
    let pending = dialer
        .connect(&router, "localhost")
        .await
        .with_context(|| format!("failed to connect to {}", router))?;

    let (events_tx, mut events_rx) = mpsc::channel::<FaceMessage>(16);
    let face = pending.into_face(0, client_options.mtu, Duration::from_secs(5), events_tx);

    println!("sending Interest for {}", name_str);
    face.send_interest(interest)?;

    match timeout(Duration::from_millis(timeout_ms), events_rx.recv()).await {
        Ok(Some(FaceMessage { event: FaceEvent::Data(data), .. })) => {
            println!("received Data: {} ({} bytes)", data.name, data.content.len());
            if let Ok(text) = std::str::from_utf8(&data.content) {
                println!("content: {}", text);
            }
        }
        Ok(Some(FaceMessage { event: FaceEvent::Nack(nack), .. })) => {
            println!("received Nack: {:?}", nack.reason);
        }
        Ok(Some(FaceMessage { event: FaceEvent::Failed(reason), .. })) => {
            println!("face failed: {}", reason);
        }
        Ok(Some(FaceMessage { event: FaceEvent::Interest(_), .. })) => {
            println!("unexpected Interest echoed back from the router");
        }
        Ok(None) => println!("connection closed without a reply"),
        Err(_) => println!("timed out after {}ms", timeout_ms),
    }

    Ok(())
}
