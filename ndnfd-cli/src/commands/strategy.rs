//! Strategy-choice command implementation for the ndnfd CLI.

use anyhow::Result;
use log::info;
use ndnfd_common::rpc::ControlRequest;

use crate::rpc_client;
use crate::StrategyCommands;

pub async fn handle_command(socket: &str, cmd: StrategyCommands) -> Result<()> {
    match cmd {
        StrategyCommands::Set { prefix, strategy } => set_strategy(socket, prefix, strategy).await,
        StrategyCommands::Unset { prefix } => unset_strategy(socket, prefix).await,
    }
}

async fn set_strategy(socket: &str, prefix: String, strategy: String) -> Result<()> {
    info!("setting strategy for {} to {}", prefix, strategy);
    let response = rpc_client::send(
        socket,
        ControlRequest::StrategyChoiceSet { name: prefix, strategy },
    )
    .await?;
    println!("[{}] {}", response.status, response.message);
    Ok(())
}

async fn unset_strategy(socket: &str, prefix: String) -> Result<()> {
    info!("unsetting strategy for {}", prefix);
    let response = rpc_client::send(socket, ControlRequest::StrategyChoiceUnset { name: prefix }).await?;
    println!("[{}] {}", response.status, response.message);
    Ok(())
}
