mod cli;

use streamforged::{
    config, probe, server,
    state::EventBus,
    tools::ToolRegistry,
    transcode::{TaskSettings, TranscodeManager},
};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::sync::Arc;
use std::time::Duration;

async fn start_server(
    host: String,
    port: u16,
    config_path: Option<&std::path::Path>,
) -> Result<()> {
    // Load config
    let mut config = config::load_config_or_default(config_path)?;

    // Override host/port from CLI if specified
    config.server.host = host;
    config.server.port = port;

    tracing::info!("Starting streamforged");

    let tools = Arc::new(ToolRegistry::discover(&config.tools));
    let ffmpeg = match tools.require("ffmpeg") {
        Ok(tool) => tool.path.clone(),
        Err(_) => {
            tracing::warn!("ffmpeg not found; transcode jobs will fail to start");
            std::path::PathBuf::from("ffmpeg")
        }
    };

    let events = EventBus::default();
    let settings = TaskSettings {
        ffmpeg,
        threads: config.transcode.threads,
        stop_grace: Duration::from_secs(config.transcode.stop_grace_secs),
        public_path: config.transcode.public_path.clone(),
    };

    let manager = TranscodeManager::new(config.transcode.max_tasks, settings, events);
    let listener = manager.spawn_event_listener();

    let result = server::start_server(config, manager, tools).await;

    listener.abort();
    result
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "streamforged=trace,tower_http=debug".to_string()
        } else {
            "streamforged=debug,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Probe { file, json } => probe_file(&file, json),
        Commands::CheckTools => check_tools(),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("streamforged {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn probe_file(file: &std::path::Path, json: bool) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let config = config::Config::default();
    let tools = ToolRegistry::discover(&config.tools);
    let ffprobe = tools.require("ffprobe")?;

    let rt = tokio::runtime::Runtime::new()?;
    let timing = rt.block_on(probe::probe_timing(&ffprobe.path, file))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&timing)?);
    } else {
        println!("File: {}", file.display());
        println!("Duration: {:.3}s", timing.duration);
        println!("Start offset: {:.3}s", timing.start_time);
    }

    Ok(())
}

fn check_tools() -> Result<()> {
    println!("Checking external tools...\n");

    let config = config::Config::default();
    let tools = ToolRegistry::discover(&config.tools);
    let mut all_ok = true;

    for tool in tools.check_all() {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install them to enable transcoding.");
    }

    Ok(())
}

fn validate_config(path: Option<&std::path::Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Max tasks: {}", config.transcode.max_tasks);
            println!("  Output dir: {:?}", config.transcode.output_dir);
            println!("  Public path: {}", config.transcode.public_path);
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Max tasks: {}", config.transcode.max_tasks);
        }
    }

    Ok(())
}
