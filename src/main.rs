mod cli;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use ristbond::config::{self, ConfigStore};
use ristbond::pipeline::{self, PipelineController};
use ristbond::server::{self, AppContext};
use ristbond_av::ToolRegistry;
use ristbond_process::Supervisor;

async fn start(host: Option<String>, port: Option<u16>, config_path: &Path) -> Result<()> {
    let store = ConfigStore::new(config_path);
    if store.ensure_materialized()? {
        tracing::info!("Materialized default config at {}", config_path.display());
    }
    let config = store
        .load()
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    for problem in config.validate() {
        tracing::warn!("Config problem: {problem}");
    }

    let (listen_host, listen_port) = config.ui.host_port()?;
    let host = host.unwrap_or(listen_host);
    let port = port.unwrap_or(listen_port);

    let registry = ToolRegistry::discover(&config.tools);
    for name in registry.missing() {
        tracing::warn!("{name} not found; its role will fail to launch");
    }

    tracing::info!("Starting ristbond");
    tracing::info!("Config: {}", config_path.display());
    tracing::info!("Process logs: {}", config.logging.log_dir.display());

    let supervisor = Supervisor::new(&config.logging.log_dir)
        .with_grace(Duration::from_secs(config.supervisor.grace_secs));
    let controller = Arc::new(PipelineController::new(store, supervisor));

    // Installed before the boot start so a signal during it is honored.
    let mut shutdown = Box::pin(server::shutdown_signal());

    // A failed start keeps the control plane up so the operator can fix it.
    let interrupted = tokio::select! {
        result = controller.start_all() => {
            match result {
                Ok(report) => {
                    for failure in &report.failures {
                        tracing::warn!("{} did not start: {}", failure.role, failure.error);
                    }
                }
                Err(e) => tracing::error!("Pipeline failed to start: {e}"),
            }
            false
        }
        _ = &mut shutdown => true,
    };

    let server_result = if interrupted {
        tracing::info!("Shutdown requested during startup");
        Ok(())
    } else {
        server::serve(AppContext::new(controller.clone()), &host, port, shutdown).await
    };

    // Cleanup
    tracing::info!("Shutting down...");
    controller.stop_all().await;

    server_result
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "ristbond=debug,ristbond_process=debug,ristbond_av=debug,tower_http=debug".to_string()
        } else {
            "ristbond=info,ristbond_process=info,ristbond_av=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    let config_path = config::resolve_config_path(cli.config.as_deref());

    match cli.command {
        Commands::Start { host, port } => {
            // Create tokio runtime
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start(host, port, &config_path))
        }
        Commands::Validate => validate_config(&config_path),
        Commands::PrintCommands => print_commands(&config_path),
        Commands::CheckTools => check_tools(&config_path),
        Commands::Version => {
            println!("ristbond {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn load(config_path: &Path) -> Result<config::Config> {
    let text = std::fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
    config::Config::from_yaml(&text)
        .with_context(|| format!("Failed to parse config file: {}", config_path.display()))
}

fn validate_config(config_path: &Path) -> Result<()> {
    println!("Validating config: {}", config_path.display());
    let config = load(config_path)?;

    let problems = config.validate();
    if !problems.is_empty() {
        for problem in &problems {
            println!("✗ {problem}");
        }
        anyhow::bail!("{} problem(s) found", problems.len());
    }

    println!("✓ Configuration is valid");
    println!("  Ingest: {}", config.ingest.source);
    println!("  Sender shape: {:?}", config.rist.mode);
    println!("  Senders: {}", config.rist.senders.len());
    println!(
        "    Enabled: {}",
        config.rist.senders.iter().filter(|s| s.enabled).count()
    );
    println!("  Relay enabled: {}", config.mediamtx.enable);
    Ok(())
}

fn print_commands(config_path: &Path) -> Result<()> {
    let config = load(config_path)?;
    for spec in pipeline::plan(&config)? {
        println!("# {}", spec.role);
        if let Some(identity) = spec.identity {
            println!("#   as uid={} gid={}", identity.uid, identity.gid);
        }
        println!("{}\n", spec.command_line());
    }
    Ok(())
}

fn check_tools(config_path: &Path) -> Result<()> {
    println!("Checking external tools...\n");

    let tools_config = load(config_path).map(|c| c.tools).unwrap_or_default();
    let registry = ToolRegistry::discover(&tools_config);
    let mut all_ok = true;

    for tool in registry.check_all() {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({version})");
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
        println!("Some tools are missing. The pipeline roles using them will not start.");
    }

    Ok(())
}
