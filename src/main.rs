mod cli;
mod client;
mod config;
mod dto;
mod error;
mod outcome_log;
mod server;
mod transcript;
mod youtube;

use clap::Parser;
use log::{error, info};

use cli::{Cli, Commands};
use config::{ClientConfig, ServerConfig};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            host,
            port,
            log_dir,
            languages,
            proxy_http,
            proxy_https,
            proxy_regions,
            upstream_timeout,
        } => {
            let config = ServerConfig::new(
                host,
                port,
                log_dir,
                languages,
                proxy_http,
                proxy_https,
                proxy_regions,
                upstream_timeout,
            )?;

            if let Err(e) = server::run_server(config).await {
                error!("Server failed: {e:#}");
                return Err(e);
            }
            info!("Server stopped");
        }
        Commands::Fetch {
            video_id,
            order,
            server_url,
        } => {
            let config = ClientConfig::new(server_url, video_id, order);
            client::run_client(config).await?;
        }
    }

    Ok(())
}
