use anyhow::Result;
use cpp_properties::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run_cli().await
}
