use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use minivault_core::record_kind;
use minivault_service::{BootstrapRequest, MiniVault, MiniVaultConfig};
use minivault_web::AppState;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "minivault")]
#[command(about = "MiniVault project dashboard")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the HTTP API.
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print a database's properties and, with --kind, how each field resolves.
    Schema {
        database_id: String,
        #[arg(long)]
        kind: Option<String>,
    },
    /// Duplicate the NOTION_TEMPLATE_* databases for a new project.
    Bootstrap {
        project_name: String,
        #[arg(long)]
        parent: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,minivault=debug")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = MiniVaultConfig::from_env();

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.port = port;
            }
            let port = config.port;
            let vault = MiniVault::new(config).context("building http client")?;
            minivault_web::serve(AppState::new(vault), port)
                .await
                .with_context(|| format!("serving on port {port}"))?;
        }
        Commands::Schema { database_id, kind } => {
            let kind = kind
                .as_deref()
                .map(|slug| record_kind(slug).ok_or_else(|| anyhow!("unknown record kind `{slug}`")))
                .transpose()?;
            let vault = MiniVault::new(config).context("building http client")?;
            let report = vault
                .inspect_schema(&database_id, kind)
                .await
                .with_context(|| format!("inspecting database {database_id}"))?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Bootstrap { project_name, parent } => {
            let vault = MiniVault::new(config).context("building http client")?;
            let request = BootstrapRequest {
                project_name: Some(project_name),
                parent_page_id: parent,
            };
            let result = vault
                .bootstrap_project(&request)
                .await
                .context("bootstrapping project")?;
            info!(databases = result.databases.len(), "bootstrap complete");
            for (kind, database) in &result.databases {
                println!("{kind}: {} {}", database.id, database.url);
            }
        }
    }

    Ok(())
}
