//! taskdeck - run scripts as tracked background tasks.
//!
//! Usage:
//!   td serve [--config FILE]      Serve the HTTP API
//!   td run <SCRIPT> [ARGS...]     Run one script and follow it to completion
//!   td scripts [--config FILE]    List the configured scripts

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use taskdeck::api::{create_api_state, start_server};
use taskdeck::{
    ConfigLoader, Event, EventBus, EventHandler, NewTask, ScriptCatalog, TaskEngine, TaskStatus,
};
use tracing::{error, info, warn};

/// td - run scripts as tracked background tasks
#[derive(Parser)]
#[command(name = "td")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        /// Path to the YAML configuration file
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Host to bind to (overrides the config file)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory for task log files (overrides the config file)
        #[arg(long, value_name = "DIR")]
        logs_dir: Option<PathBuf>,
    },

    /// Run a single script and follow it until it finishes
    Run {
        /// Path to the script to run
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,

        /// Arguments passed to the script
        #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,

        /// Program used to run the script (e.g. python3)
        #[arg(short, long)]
        interpreter: Option<String>,

        /// Name recorded on the task
        #[arg(short, long, default_value = "cli")]
        user: String,

        /// Directory for the task log file
        #[arg(long, value_name = "DIR", default_value = "logs")]
        logs_dir: PathBuf,
    },

    /// List the configured scripts
    Scripts {
        /// Path to the YAML configuration file
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

/// Event handler that logs task lifecycle events.
struct LoggingHandler;

#[async_trait::async_trait]
impl EventHandler for LoggingHandler {
    async fn handle(&self, event: &Event) {
        match event {
            Event::TaskStarted { task_id, .. } => {
                info!("Task '{}' started", task_id);
            }
            Event::TaskCompleted {
                task_id, duration, ..
            } => {
                info!("Task '{}' completed successfully in {:?}", task_id, duration);
            }
            Event::TaskFailed {
                task_id,
                error,
                return_code,
                ..
            } => {
                let exit_info = return_code
                    .map(|c| format!(" (exit: {})", c))
                    .unwrap_or_default();
                warn!("Task '{}' failed{}: {}", task_id, exit_info, error.trim_end());
            }
            Event::TaskOutput { .. } => {}
        }
    }
}

/// Event handler that echoes captured output to stdout.
struct EchoHandler;

#[async_trait::async_trait]
impl EventHandler for EchoHandler {
    async fn handle(&self, event: &Event) {
        if let Event::TaskOutput { line, .. } = event {
            print!("{}", line);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            host,
            port,
            logs_dir,
        } => {
            serve(config, host, port, logs_dir).await?;
        }
        Commands::Run {
            script,
            args,
            interpreter,
            user,
            logs_dir,
        } => {
            let status = run_once(script, args, interpreter, user, logs_dir).await?;
            if status != TaskStatus::Success {
                std::process::exit(1);
            }
        }
        Commands::Scripts { config } => {
            list_scripts(config)?;
        }
    }

    Ok(())
}

/// Serve the HTTP API until Ctrl+C.
async fn serve(
    config_path: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    logs_dir: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ConfigLoader::load_or_default(config_path.as_deref())?;
    if let Some(host) = host {
        config.api.host = host;
    }
    if let Some(port) = port {
        config.api.port = port;
    }
    if let Some(logs_dir) = logs_dir {
        config.logs_dir = logs_dir;
    }
    ConfigLoader::validate(&config)?;

    let catalog = ScriptCatalog::from_config(&config);
    info!("Loaded {} script(s):", catalog.len());
    for name in catalog.names() {
        match catalog.resolve(name) {
            Ok(entry) => info!("  - {}: {}", name, entry.path.display()),
            Err(e) => warn!("  - {}: {}", name, e),
        }
    }

    let event_bus = EventBus::new();
    event_bus.register(Arc::new(LoggingHandler)).await;

    let engine = TaskEngine::new(&config.logs_dir)?.with_event_bus(event_bus);
    info!("Writing task logs to {}", config.logs_dir.display());

    let state = create_api_state(engine, catalog);
    let server = start_server(&config.api, state).await?;
    let server_abort = server.abort_handle();
    info!("Press Ctrl+C to stop");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down...");
            server_abort.abort();
        }
        result = server => {
            if let Err(e) = result {
                error!("API server task ended: {}", e);
            }
        }
    }

    info!("Goodbye!");
    Ok(())
}

/// Run one script to completion and report its outcome.
async fn run_once(
    script: PathBuf,
    args: Vec<String>,
    interpreter: Option<String>,
    user: String,
    logs_dir: PathBuf,
) -> Result<TaskStatus, Box<dyn std::error::Error>> {
    let event_bus = EventBus::new();
    event_bus.register(Arc::new(EchoHandler)).await;
    event_bus.register(Arc::new(LoggingHandler)).await;

    let engine = TaskEngine::new(&logs_dir)?.with_event_bus(event_bus);
    let new = NewTask::new(user, script)
        .with_args(args)
        .with_interpreter(interpreter);
    let id = engine.create_task_with(new)?;
    engine.execute_task(&id)?;

    let task = engine
        .wait_for_completion(&id, Duration::from_millis(100))
        .await?;

    println!();
    println!("Task:     {}", task.id);
    println!("Status:   {}", task.status);
    if let Some(code) = task.return_code {
        println!("Exit:     {}", code);
    }
    if let Some(duration) = task.duration() {
        println!("Duration: {}ms", duration.num_milliseconds());
    }
    println!("Log file: {}", task.log_file.display());
    if !task.error.is_empty() {
        println!("Error:    {}", task.error.trim_end());
    }

    Ok(task.status)
}

/// List the scripts in the catalog.
fn list_scripts(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigLoader::load_or_default(config_path.as_deref())?;

    if config.scripts.is_empty() {
        println!("No scripts configured");
        return Ok(());
    }

    println!("Scripts:");
    println!();
    for (name, script) in &config.scripts {
        println!("{}", name);
        println!("  Path: {}", script.path.display());
        if let Some(interpreter) = &script.interpreter {
            println!("  Interpreter: {}", interpreter);
        }
        if let Some(description) = &script.description {
            println!("  Description: {}", description);
        }
        println!();
    }

    Ok(())
}
