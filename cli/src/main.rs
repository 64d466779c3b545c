use std::process::ExitCode;

use clap::Parser;
use judgebox_cli::cmd::GlobalArgs;

#[tokio::main]
async fn main() -> ExitCode {
    let app = GlobalArgs::parse();

    let default_level = if app.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();

    app.exec_subcmd().await.unwrap_or_else(|e| {
        eprintln!("Error: {:?}", e);
        ExitCode::FAILURE
    })
}
