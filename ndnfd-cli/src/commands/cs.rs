//! Content Store administration command implementation for the ndnfd CLI.

use anyhow::Result;
use log::info;
use ndnfd_common::rpc::ControlRequest;

use crate::rpc_client;
use crate::CsCommands;

pub async fn handle_command(socket: &str, cmd: CsCommands) -> Result<()> {
    match cmd {
        CsCommands::Erase { prefix, count } => erase(socket, prefix, count).await,
    }
}

async fn erase(socket: &str, prefix: String, count: usize) -> Result<()> {
    info!("erasing up to {} Content Store entries under {}", count, prefix);
    let response = rpc_client::send(socket, ControlRequest::CsErase { prefix, count }).await?;
    println!("[{}] {}", response.status, response.message);
    Ok(())
}
