mod cli;
mod commands;
mod demo;
mod infra;

use nic_certify::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
