use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;

use gazetrack_lib::{
    settings::{AppConfig, SettingsStore, TaskType},
    ServeOptions,
};

/// Gaze and mouse tracking capture service.
#[derive(Debug, Parser)]
#[command(name = "gazetrack", version, about)]
struct Cli {
    /// Directory holding config.json and tasks.json
    #[arg(long, global = true, env = "GAZETRACK_CONFIG_DIR", default_value = ".")]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve(ServeArgs),
    /// Update config.json and tasks.json
    Configure(ConfigureArgs),
}

#[derive(Debug, Args)]
struct ServeArgs {
    /// SQLite database file
    #[arg(long = "db", env = "GAZETRACK_DB", default_value = "instance/gazetrack.db")]
    db_path: PathBuf,

    #[arg(long, env = "GAZETRACK_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Overrides the port from config.json
    #[arg(long)]
    port: Option<u16>,

    /// Name for the study created when the configured prototype is new
    #[arg(long)]
    study_name: Option<String>,
}

#[derive(Debug, Args)]
struct ConfigureArgs {
    /// Prototype URL (clears the image)
    #[arg(long, conflicts_with = "image")]
    url: Option<String>,

    /// Prototype image path (clears the URL)
    #[arg(long)]
    image: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    /// Append a task to tasks.json
    #[arg(long, requires = "task_type")]
    add_task: Option<String>,

    #[arg(long, value_enum)]
    task_type: Option<TaskKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TaskKind {
    Bool,
    Numeric,
    Text,
}

impl From<TaskKind> for TaskType {
    fn from(kind: TaskKind) -> Self {
        match kind {
            TaskKind::Bool => TaskType::Bool,
            TaskKind::Numeric => TaskType::Numeric,
            TaskKind::Text => TaskType::Text,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    gazetrack_lib::init_logging();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => {
            gazetrack_lib::serve(ServeOptions {
                config_dir: cli.config_dir,
                db_path: args.db_path,
                host: args.host,
                port: args.port,
                study_name: args.study_name,
            })
            .await
        }
        Command::Configure(args) => configure(cli.config_dir, args),
    }
}

fn configure(config_dir: PathBuf, args: ConfigureArgs) -> Result<()> {
    let store = SettingsStore::new(config_dir)?;

    if args.url.is_some() || args.image.is_some() || args.port.is_some() {
        let current = store.config();
        let (url_path, img_path) = match (args.url, args.image) {
            (Some(url), _) => (Some(url), None),
            (None, Some(image)) => (None, Some(image)),
            (None, None) => (current.url_path, current.img_path),
        };
        store.update_config(AppConfig {
            url_path,
            img_path,
            port: args.port.or(current.port),
        })?;
        info!("Configuration saved to {}", store.dir().display());
    }

    if let (Some(task), Some(kind)) = (args.add_task, args.task_type) {
        let mut tasks = store.tasks().unwrap_or_default();
        tasks.add_task(task, kind.into())?;
        store.update_tasks(tasks)?;
        info!("Task added to {}", store.dir().display());
    }

    Ok(())
}
