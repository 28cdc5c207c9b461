use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use dpc_portal::cli::{Cli, Commands, ConfigCommands, config_generate};
use dpc_portal::config::AppConfig;
use dpc_portal::errors::PortalError;
use dpc_portal::runtime::modes::run_server;
use dpc_portal::storage::StorageFactory;
use dpc_portal::system::init_logging;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // 生成配置文件不需要加载配置
    if let Some(Commands::Config {
        action: ConfigCommands::Generate { output_path, force },
    }) = cli.command
    {
        return config_generate(output_path, force)
            .map(|_| ())
            .inspect_err(|e| eprintln!("{}", e.format_colored()))
            .context("Failed to generate configuration");
    }

    let config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("{}", e.format_colored());
            return Err(e).context("Failed to load configuration");
        }
    };

    let _guard = init_logging(&config)
        .inspect_err(|e: &PortalError| eprintln!("{}", e.format_colored()))
        .context("Failed to initialize logging")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server(config).await,
        Commands::Migrate => {
            // 连接时会执行迁移
            let storage = StorageFactory::create(&config.database)
                .await
                .inspect_err(|e| error!("Migration failed: {}", e))?;
            info!(
                "Database migrations applied ({})",
                storage.get_backend_config().storage_type
            );
            storage.get_db().clone().close().await?;
            Ok(())
        }
        Commands::Config { .. } => Ok(()),
    }
}
