//! Face management command implementation for the ndnfd CLI.

use anyhow::Result;
use log::info;
use ndnfd_common::rpc::ControlRequest;

use crate::rpc_client;
use crate::FaceCommands;

pub async fn handle_command(socket: &str, cmd: FaceCommands) -> Result<()> {
    match cmd {
        FaceCommands::Create { uri, persistency } => create_face(socket, uri, persistency).await,
        FaceCommands::Destroy { face } => destroy_face(socket, face).await,
    }
}

async fn create_face(socket: &str, uri: String, persistency: String) -> Result<()> {
    info!("creating face: uri={}, persistency={}", uri, persistency);
    let response = rpc_client::send(socket, ControlRequest::FaceCreate { uri, persistency }).await?;
    match response.face_id {
        Some(id) => println!("[{}] {} (face {})", response.status, response.message, id),
        None => println!("[{}] {}", response.status, response.message),
    }
    Ok(())
}

async fn destroy_face(socket: &str, face: u64) -> Result<()> {
    info!("destroying face {}", face);
    let response = rpc_client::send(socket, ControlRequest::FaceDestroy { face_id: face }).await?;
    println!("[{}] {}", response.status, response.message);
    Ok(())
}
