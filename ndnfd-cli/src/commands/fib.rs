//! FIB command implementation for the ndnfd CLI.

use anyhow::Result;
use log::info;
use ndnfd_common::rpc::ControlRequest;

use crate::rpc_client;
use crate::FibCommands;

pub async fn handle_command(socket: &str, cmd: FibCommands) -> Result<()> {
    match cmd {
        FibCommands::Add { prefix, face, cost } => add_route(socket, prefix, face, cost).await,
        FibCommands::Remove { prefix, face } => remove_route(socket, prefix, face).await,
    }
}

async fn add_route(socket: &str, prefix: String, face: u64, cost: u64) -> Result<()> {
    info!("adding route: prefix={}, face={}, cost={}", prefix, face, cost);
    let response = rpc_client::send(
        socket,
        ControlRequest::FibAddNexthop { name: prefix.clone(), face_id: face, cost },
    )
    .await?;
    println!("[{}] {}", response.status, response.message);
    Ok(())
}

async fn remove_route(socket: &str, prefix: String, face: u64) -> Result<()> {
    info!("removing route: prefix={}, face={}", prefix, face);
    let response = rpc_client::send(
        socket,
        ControlRequest::FibRemoveNexthop { name: prefix.clone(), face_id: face },
    )
    .await?;
    println!("[{}] {}", response.status, response.message);
    Ok(())
}
