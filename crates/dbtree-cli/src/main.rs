mod config;
mod error;
mod server;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use dbtree_core::{Project, Resolution};
use dbtree_store::{Fields, ProjectService, Store};
use serde::Serialize;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "dbtree", about = "Store and merge database-inventory projects")]
struct Cli {
    /// Config file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Address to listen on
        #[arg(long)]
        bind: Option<SocketAddr>,
    },

    /// Submit a project from a JSON file, merging by name
    Create {
        /// Project JSON file
        path: PathBuf,
    },

    /// List projects
    List {
        /// Only projects owned by this user id
        #[arg(long)]
        user: Option<String>,
    },

    /// Show one project
    Show { id: String },

    /// Apply a partial update from a JSON file
    Update {
        id: String,
        /// Patch JSON file
        path: PathBuf,
    },

    /// Delete a project
    Delete { id: String },
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref()).context("failed to load config")?;
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Commands::Serve { bind: Some(addr) } = &cli.command {
        config.bind_addr = *addr;
    }
    Ok(config)
}

fn open_service(config: &Config) -> Result<ProjectService<Store>> {
    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("failed to create {}", config.data_dir.display()))?;
    let store = Store::open(&config.db_path()).context("failed to open project store")?;
    Ok(ProjectService::new(store))
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(&cli)?;
    let service = open_service(&config)?;

    match &cli.command {
        Commands::Serve { .. } => server::serve(&config, service).await,
        Commands::Create { path } => cmd_create(&service, path),
        Commands::List { user } => cmd_list(&service, user.as_deref()),
        Commands::Show { id } => cmd_show(&service, id),
        Commands::Update { id, path } => cmd_update(&service, id, path),
        Commands::Delete { id } => cmd_delete(&service, id),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid JSON in {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_create(service: &ProjectService<Store>, path: &Path) -> Result<()> {
    let candidate: Project = read_json(path)?;
    let resolution = service.create(candidate)?;
    let verb = match &resolution {
        Resolution::Created(_) => "created project",
        Resolution::Merged(_) => "merged into project",
    };
    let project = resolution.into_project();
    println!("{verb} {}", project.id.as_deref().unwrap_or_default());
    print_json(&project)
}

fn cmd_list(service: &ProjectService<Store>, user: Option<&str>) -> Result<()> {
    let projects = match user {
        Some(user_id) => service.find_all_by_user_id(user_id)?,
        None => service.find_all()?,
    };
    print_json(&projects)
}

fn cmd_show(service: &ProjectService<Store>, id: &str) -> Result<()> {
    match service.find_by_id(id)? {
        Some(project) => print_json(&project),
        None => bail!("Project with ID {id} not found"),
    }
}

fn cmd_update(service: &ProjectService<Store>, id: &str, path: &Path) -> Result<()> {
    let patch: Fields = read_json(path)?;
    let project = service.update(id, patch)?;
    println!("updated project {id}");
    print_json(&project)
}

fn cmd_delete(service: &ProjectService<Store>, id: &str) -> Result<()> {
    service.remove(id)?;
    println!("deleted project {id}");
    Ok(())
}
