//! The `ndnfd` daemon binary.
//!
//! Owns one `Forwarder` on a single task (§5): periodic maintenance, face
//! traffic, and management RPCs all funnel through one `ForwarderCommand`
//! channel rather than sharing the tables across threads. Face I/O and the
//! management control socket each get their own tokio task and only ever
//! reach the forwarder by posting to that channel.

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, error, info, warn};
use ndnfd_common::config::NdnfdConfig;
use ndnfd_common::name::Name;
use ndnfd_common::rpc::{ControlRequest, ControlResponse};
use ndnfd_core::face::FaceId;
use ndnfd_core::management::{ManagementRequest, ManagementResponse, StatusCode};
use ndnfd_core::Forwarder;
use ndnfd_face::{ClientOptions, FaceDialer, FaceListener, FaceMessage, PendingFace, ServerOptions};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, oneshot};

#[derive(Parser)]
#[clap(author, version, about = "Named Data Networking forwarding daemon")]
struct Cli {
    /// Path to the configuration file (TOML).
    #[clap(short, long, default_value = "ndnfd.toml")]
    config: String,

    /// Raise the log level to debug regardless of RUST_LOG.
    #[clap(short, long)]
    verbose: bool,
}

/// Everything the forwarder task consumes. Distinct from `FaceMessage`
/// (decoded packets) since management work needs a reply channel and face
/// registration needs to hand back the assigned id.
enum ForwarderCommand {
    Packet(FaceMessage),
    Management(ManagementRequest, oneshot::Sender<ManagementResponse>),
    RegisterFace(PendingFace, oneshot::Sender<FaceId>),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if cli.verbose { "debug" } else { "info" }),
    )
    .init();

    let config = NdnfdConfig::load(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config))?;

    let (cmd_tx, cmd_rx) = mpsc::channel::<ForwarderCommand>(1024);
    let (packet_tx, mut packet_rx) = mpsc::channel::<FaceMessage>(1024);

    // Re-post face packets onto the single forwarder command channel so the
    // forwarder task is the only consumer it has to select over once.
    {
        let cmd_tx = cmd_tx.clone();
        tokio::spawn(async move {
            while let Some(message) = packet_rx.recv().await {
                if cmd_tx.send(ForwarderCommand::Packet(message)).await.is_err() {
                    return;
                }
            }
        });
    }

    let mtu = config
        .face_system
        .get("quic")
        .map(|entry| entry.mtu)
        .unwrap_or(1400);
    let idle_period = config
        .face_system
        .get("quic")
        .map(|entry| entry.default_idle_period())
        .unwrap_or_else(|| Duration::from_millis(100));

    if let Some(entry) = config.face_system.get("quic") {
        if let Some(listen_addr) = &entry.listen_addr {
            let options = ServerOptions {
                listen_addr: listen_addr.clone(),
                cert_path: entry.cert_path.clone().unwrap_or_else(|| "cert.pem".to_string()).into(),
                key_path: entry.key_path.clone().unwrap_or_else(|| "key.pem".to_string()).into(),
                mtu,
                ..Default::default()
            };
            let listener = FaceListener::bind(&options)
                .await
                .context("failed to bind QUIC face listener")?;
            let cmd_tx = cmd_tx.clone();
            tokio::spawn(async move {
                while let Some(pending) = listener.accept().await {
                    debug!("inbound face from {}", pending.remote_addr());
                    let (reply_tx, reply_rx) = oneshot::channel();
                    if cmd_tx
                        .send(ForwarderCommand::RegisterFace(pending, reply_tx))
                        .await
                        .is_err()
                    {
                        return;
                    }
                    if let Ok(id) = reply_rx.await {
                        info!("registered inbound face {}", id);
                    }
                }
            });
        }
    }

    {
        let socket_path = config.management.socket_path.clone();
        let cmd_tx = cmd_tx.clone();
        let client_options = ClientOptions { verify_certificate: false, mtu, ..Default::default() };
        tokio::spawn(async move {
            if let Err(e) = run_management_dispatcher(&socket_path, cmd_tx, client_options).await {
                error!("management dispatcher stopped: {}", e);
            }
        });
    }

    info!("ndnfd starting, config = {}", cli.config);
    run_forwarder(config, cmd_rx, mtu, idle_period, packet_tx).await;
    Ok(())
}

/// The forwarder task. Single owner of `Forwarder`; everything else talks
/// to it through `cmd_rx`. `mtu`/`idle_period`/`face_events` are what every
/// newly registered `QuicFace` needs, regardless of whether it arrived via
/// an inbound accept or a `face-create` dial.
async fn run_forwarder(
    config: NdnfdConfig,
    mut cmd_rx: mpsc::Receiver<ForwarderCommand>,
    mtu: usize,
    idle_period: Duration,
    face_events: mpsc::Sender<FaceMessage>,
) {
    let mut forwarder = Forwarder::new(&config);
    let mut maintenance = tokio::time::interval(Duration::from_millis(50));

    loop {
        tokio::select! {
            _ = maintenance.tick() => {
                forwarder.tick(Instant::now());
            }
            command = cmd_rx.recv() => {
                let Some(command) = command else { break };
                match command {
                    ForwarderCommand::Packet(message) => {
                        let now = Instant::now();
                        match message.event {
                            ndnfd_face::FaceEvent::Interest(interest) => {
                                forwarder.handle_interest(message.face_id, interest, now);
                            }
                            ndnfd_face::FaceEvent::Data(data) => {
                                forwarder.handle_data(message.face_id, data, now);
                            }
                            ndnfd_face::FaceEvent::Nack(nack) => {
                                forwarder.handle_nack(message.face_id, nack, now);
                            }
                            ndnfd_face::FaceEvent::Failed(reason) => {
                                warn!("face {} failed: {}", message.face_id, reason);
                                forwarder.fail_face(message.face_id);
                            }
                        }
                    }
                    ForwarderCommand::Management(request, reply) => {
                        let response = forwarder.handle_management(request);
                        let _ = reply.send(response);
                    }
                    ForwarderCommand::RegisterFace(pending, reply) => {
                        let id = forwarder.next_face_id();
                        let face = pending.into_face(id, mtu, idle_period, face_events.clone());
                        forwarder.register_face(face);
                        let _ = reply.send(id);
                    }
                }
            }
        }
    }
}

/// Accepts control-channel connections on a Unix socket and dispatches
/// each newline-delimited JSON `ControlRequest` to the forwarder task.
async fn run_management_dispatcher(
    socket_path: &str,
    cmd_tx: mpsc::Sender<ForwarderCommand>,
    client_options: ClientOptions,
) -> Result<()> {
    let _ = std::fs::remove_file(socket_path);
    let listener = UnixListener::bind(socket_path)
        .with_context(|| format!("failed to bind management socket at {}", socket_path))?;
    info!("management dispatcher listening on {}", socket_path);

    loop {
        let (stream, _addr) = listener.accept().await?;
        let cmd_tx = cmd_tx.clone();
        let client_options = client_options.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_control_connection(stream, cmd_tx, client_options).await {
                warn!("control connection error: {}", e);
            }
        });
    }
}

async fn handle_control_connection(
    stream: UnixStream,
    cmd_tx: mpsc::Sender<ForwarderCommand>,
    client_options: ClientOptions,
) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<ControlRequest>(&line) {
            Ok(request) => dispatch_control_request(request, &cmd_tx, &client_options).await,
            Err(e) => ControlResponse::error(400, format!("malformed request: {}", e)),
        };
        let mut encoded = serde_json::to_string(&response).unwrap_or_else(|_| {
            r#"{"status":504,"message":"failed to encode response"}"#.to_string()
        });
        encoded.push('\n');
        writer.write_all(encoded.as_bytes()).await?;
    }
    Ok(())
}

async fn dispatch_control_request(
    request: ControlRequest,
    cmd_tx: &mpsc::Sender<ForwarderCommand>,
    client_options: &ClientOptions,
) -> ControlResponse {
    match request {
        ControlRequest::FibAddNexthop { name, face_id, cost } => {
            forward_management(
                cmd_tx,
                ManagementRequest::FibAddNextHop { name: Name::from_str(&name), face_id, cost },
            )
            .await
        }
        ControlRequest::FibRemoveNexthop { name, face_id } => {
            forward_management(
                cmd_tx,
                ManagementRequest::FibRemoveNextHop { name: Name::from_str(&name), face_id },
            )
            .await
        }
        ControlRequest::FaceDestroy { face_id } => {
            forward_management(cmd_tx, ManagementRequest::FaceDestroy { face_id }).await
        }
        ControlRequest::StrategyChoiceSet { name, strategy } => {
            forward_management(
                cmd_tx,
                ManagementRequest::StrategyChoiceSet { name: Name::from_str(&name), strategy },
            )
            .await
        }
        ControlRequest::StrategyChoiceUnset { name } => {
            forward_management(cmd_tx, ManagementRequest::StrategyChoiceUnset { name: Name::from_str(&name) }).await
        }
        ControlRequest::CsErase { prefix, count } => {
            forward_management(
                cmd_tx,
                ManagementRequest::CsErase { prefix: Name::from_str(&prefix), count },
            )
            .await
        }
        ControlRequest::FaceCreate { uri, persistency } => {
            create_face(uri, persistency, cmd_tx, client_options).await
        }
    }
}

async fn forward_management(cmd_tx: &mpsc::Sender<ForwarderCommand>, request: ManagementRequest) -> ControlResponse {
    let (reply_tx, reply_rx) = oneshot::channel();
    if cmd_tx.send(ForwarderCommand::Management(request, reply_tx)).await.is_err() {
        return ControlResponse::error(504, "forwarder task is gone");
    }
    match reply_rx.await {
        Ok(response) => status_to_control_response(response),
        Err(_) => ControlResponse::error(504, "forwarder task dropped the reply"),
    }
}

fn status_to_control_response(response: ManagementResponse) -> ControlResponse {
    let code = match response.status {
        StatusCode::Success => 200,
        StatusCode::Malformed => 400,
        StatusCode::NotAuthorized => 403,
        StatusCode::NotFound => 404,
        StatusCode::Conflict => 409,
        StatusCode::FaceNotFound => 410,
        StatusCode::NameTooLong => 414,
        StatusCode::InternalError => 504,
    };
    ControlResponse { status: code, message: response.message, face_id: None }
}

/// `face-create` dials out (an async operation the core cannot perform
/// itself) before the resulting connection is handed to the forwarder task
/// for id assignment and registration.
async fn create_face(
    uri: String,
    persistency: String,
    cmd_tx: &mpsc::Sender<ForwarderCommand>,
    client_options: &ClientOptions,
) -> ControlResponse {
    let Some(addr) = uri.strip_prefix("quic://").or_else(|| uri.strip_prefix("udp4://")) else {
        return ControlResponse::error(400, format!("unsupported face URI scheme: {}", uri));
    };
    if !matches!(persistency.as_str(), "on-demand" | "persistent" | "permanent") {
        return ControlResponse::error(400, format!("unknown persistency: {}", persistency));
    }

    let dialer = match FaceDialer::new(client_options).await {
        Ok(d) => d,
        Err(e) => return ControlResponse::error(504, format!("failed to initialize dialer: {}", e)),
    };
    let pending = match dialer.connect(addr, "localhost").await {
        Ok(p) => p,
        Err(e) => return ControlResponse::error(504, format!("failed to connect to {}: {}", addr, e)),
    };

    let (reply_tx, reply_rx) = oneshot::channel();
    if cmd_tx
        .send(ForwarderCommand::RegisterFace(pending, reply_tx))
        .await
        .is_err()
    {
        return ControlResponse::error(504, "forwarder task is gone");
    }
    match reply_rx.await {
        Ok(id) => {
            let mut response = ControlResponse::ok("face created");
            response.face_id = Some(id);
            response
        }
        Err(_) => ControlResponse::error(504, "forwarder task dropped the reply"),
    }
}
