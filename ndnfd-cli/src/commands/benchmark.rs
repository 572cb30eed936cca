//! Forwarder benchmark command implementation for the ndnfd CLI.
//!
//! Dials `concurrent` independent QUIC faces against a running router and
//! drives each one through its share of `count` Interests back-to-back,
//! reporting success rate and round-trip latency.

use anyhow::{Context, Result};
use ndnfd_common::name::{Name, NameComponent};
use ndnfd_common::packet::Interest;
use ndnfd_core::face::Face;
use ndnfd_face::{ClientOptions, FaceDialer, FaceEvent, FaceMessage};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::utils::{format_duration, print_header, Timer};

struct WorkerResult {
    sent: usize,
    satisfied: usize,
    latencies: Vec<Duration>,
}

pub async fn run_benchmark(count: usize, prefix: String, concurrent: usize, router: String) -> Result<()> {
    print_header("ndnfd benchmark");
    println!("router: {}, prefix: {}, count: {}, concurrent: {}", router, prefix, count, concurrent);

    let timer = Timer::new("benchmark run");
    let per_worker = (count + concurrent.max(1) - 1) / concurrent.max(1);

    let mut handles = Vec::with_capacity(concurrent);
    for worker in 0..concurrent {
        let router = router.clone();
        let prefix = prefix.clone();
        handles.push(tokio::spawn(async move {
            run_worker(worker, per_worker, &prefix, &router).await
        }));
    }

    let mut total_sent = 0usize;
    let mut total_satisfied = 0usize;
    let mut latencies = Vec::new();
    for handle in handles {
        match handle.await {
            Ok(Ok(result)) => {
                total_sent += result.sent;
                total_satisfied += result.satisfied;
                latencies.extend(result.latencies);
            }
            Ok(Err(e)) => println!("worker failed: {}", e),
            Err(e) => println!("worker panicked: {}", e),
        }
    }

    drop(timer);

    println!(
        "\nsent: {}, satisfied: {} ({:.1}%)",
        total_sent,
        total_satisfied,
        percentage(total_satisfied, total_sent)
    );
    if !latencies.is_empty() {
        latencies.sort();
        let total: Duration = latencies.iter().sum();
        let avg = total / latencies.len() as u32;
        println!(
            "latency: min {}, avg {}, max {}",
            format_duration(latencies[0]),
            format_duration(avg),
            format_duration(*latencies.last().unwrap())
        );
    }

    Ok(())
}

fn percentage(satisfied: usize, sent: usize) -> f64 {
    if sent == 0 {
        0.0
    } else {
        satisfied as f64 / sent as f64 * 100.0
    }
}

async fn run_worker(worker: usize, count: usize, prefix: &str, router: &str) -> Result<WorkerResult> {
    let client_options = ClientOptions { verify_certificate: false, ..Default::default() };
    let dialer = FaceDialer::new(&client_options).await.context("failed to initialize QUIC dialer")?;
    let pending = dialer
        .connect(router, "localhost")
        .await
        .with_context(|| format!("worker {} failed to connect to {}", worker, router))?;

    let (events_tx, mut events_rx) = mpsc::channel::<FaceMessage>(16);
    let face = pending.into_face(0, client_options.mtu, Duration::from_secs(5), events_tx);

    let mut base = Name::from_str(prefix);
    base.push(NameComponent::new(format!("worker-{}", worker)));

    let mut result = WorkerResult { sent: 0, satisfied: 0, latencies: Vec::new() };
    for i in 0..count {
        let mut name = base.clone();
        name.push(NameComponent::new(i.to_string()));
        let interest = Interest::new(name).with_lifetime(Duration::from_secs(2));

        let start = Instant::now();
        face.send_interest(interest)?;
        result.sent += 1;

        if let Ok(Some(FaceMessage { event: FaceEvent::Data(_), .. })) =
            timeout(Duration::from_secs(2), events_rx.recv()).await
        {
            result.satisfied += 1;
            result.latencies.push(start.elapsed());
        }
    }

    Ok(result)
}
