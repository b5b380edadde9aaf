use crate::config::{self, ConfigAction, EngineConfig};
use crate::core::platform::HostPlatform;
use crate::core::properties::{include_scan, CompilerDefaults, CppProperties, StoreOptions};
use crate::core::providers::ProviderRegistry;
use crate::core::service::PropertiesService;
use crate::core::settings::CppSettings;
use crate::core::watchers::{
    MessageLevel, NotifyCompileCommandsWatch, PropertiesEvent, PropertiesNotifier,
    PropertiesWatcher, UserMessage,
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "cpp-properties")]
#[command(about = "Resolve and watch C/C++ IntelliSense configurations for a workspace folder")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace folder (default: current directory)
    #[arg(short, long, global = true)]
    pub folder: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the resolved configurations as JSON
    Resolve {
        /// JSON file with detected compiler defaults
        #[arg(long)]
        compiler_defaults: Option<PathBuf>,
    },

    /// Watch the folder and print notifications until Ctrl-C
    Watch {
        /// JSON file with detected compiler defaults
        #[arg(long)]
        compiler_defaults: Option<PathBuf>,
    },

    /// Append a path to the current configuration's includePath
    AddIncludePath { path: String },

    /// Set compileCommands on the current configuration
    SetCompileCommands { path: String },

    /// Set or clear the configuration provider
    SetProvider { id: Option<String> },

    /// Select a configuration by index
    Select { index: usize },

    /// Manage engine configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    let engine = EngineConfig::load()?;

    // Initialize logging
    let log_level = if cli.verbose {
        "debug"
    } else {
        engine.log_level.as_str()
    };
    tracing_subscriber::fmt()
        .with_env_filter(format!("cpp_properties={}", log_level))
        .with_writer(std::io::stderr)
        .init();

    let folder = match &cli.folder {
        Some(folder) => folder.clone(),
        None => std::env::current_dir()?,
    };

    match cli.command {
        Commands::Resolve { compiler_defaults } => {
            let mut workspace = Workspace::open(&folder, &engine, compiler_defaults.as_deref())?;
            print_resolved(&workspace.store)?;
            workspace.flush_messages();
        }

        Commands::Watch { compiler_defaults } => {
            watch(&folder, &engine, compiler_defaults.as_deref()).await?;
        }

        Commands::AddIncludePath { path } => {
            let mut workspace = Workspace::open(&folder, &engine, None)?;
            workspace.store.add_to_include_path(&path)?;
            workspace.flush_messages();
            println!("{} {}", "Added".green(), path);
        }

        Commands::SetCompileCommands { path } => {
            let mut workspace = Workspace::open(&folder, &engine, None)?;
            workspace.store.set_compile_commands(&path)?;
            workspace.flush_messages();
            println!("{} compileCommands = {}", "Set".green(), path);
        }

        Commands::SetProvider { id } => {
            let mut workspace = Workspace::open(&folder, &engine, None)?;
            let had_file = workspace.store.properties_file().is_some();
            workspace
                .store
                .update_custom_configuration_provider(id.as_deref())?;
            workspace.flush_messages();
            if !had_file {
                println!(
                    "{}",
                    "No c_cpp_properties.json: the provider only applies to this session".yellow()
                );
            }
            match id {
                Some(id) => println!("{} configurationProvider = {}", "Set".green(), id),
                None => println!("{} configurationProvider", "Cleared".green()),
            }
        }

        Commands::Select { index } => {
            let mut workspace = Workspace::open(&folder, &engine, None)?;
            let count = workspace.store.document().configurations.len();
            if index > count {
                bail!("Configuration index {} out of range (0..={})", index, count);
            }
            workspace.store.select(index)?;
            workspace.flush_messages();
            if let Some(config) = workspace.store.current_configuration() {
                println!("{} {} ({})", "Selected".green(), config.name.bold(), index);
            }
        }

        Commands::Config { action } => {
            manage_config(action, &engine)?;
        }
    }

    Ok(())
}

/// One store plus the subscription its messages arrive on
struct Workspace {
    store: CppProperties,
    events: broadcast::Receiver<PropertiesEvent>,
}

impl Workspace {
    fn open(folder: &Path, engine: &EngineConfig, compiler_defaults: Option<&Path>) -> Result<Self> {
        let folder = fs::canonicalize(folder)
            .with_context(|| format!("Workspace folder not found: {}", folder.display()))?;
        let platform = HostPlatform::current();

        let settings = CppSettings::load(&folder).unwrap_or_else(|e| {
            warn!("{}", e);
            CppSettings::new()
        });

        let (notifier, events) = PropertiesNotifier::new(engine.notify_capacity);
        let mut store = CppProperties::new(
            folder,
            settings,
            Arc::new(ProviderRegistry::new()),
            notifier,
            StoreOptions {
                platform,
                await_include_scan: engine.scan_vcpkg,
                state_file: engine.resolved_state_file(),
            },
        );

        if engine.scan_vcpkg {
            store.set_include_scan_result(include_scan::scan(platform))?;
        }
        if let Some(path) = compiler_defaults {
            store.set_compiler_defaults(load_compiler_defaults(path)?)?;
        }

        Ok(Self { store, events })
    }

    /// Print user messages raised so far; other notifications are dropped
    fn flush_messages(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            if let PropertiesEvent::Message(message) = event {
                print_message(&message);
            }
        }
    }
}

fn load_compiler_defaults(path: &Path) -> Result<CompilerDefaults> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read compiler defaults: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid compiler defaults in {}", path.display()))
}

fn print_resolved(store: &CppProperties) -> Result<()> {
    let output = serde_json::json!({
        "folder": store.root(),
        "propertiesFile": store.properties_file(),
        "complete": store.is_complete(),
        "currentIndex": store.current_index(),
        "configurations": store.resolved(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_message(message: &UserMessage) {
    let label = match message.level {
        MessageLevel::Info => "info".blue(),
        MessageLevel::Warning => "warning".yellow(),
        MessageLevel::Error => "error".red(),
    };
    eprintln!("{}: {}", label.bold(), message.text);
}

fn print_event(event: &PropertiesEvent) {
    match event {
        PropertiesEvent::ConfigurationsChanged(configs) => {
            println!("{} {} configuration(s)", "Updated".green().bold(), configs.len());
            for config in configs {
                let includes = config.include_path.as_ref().map_or(0, Vec::len);
                println!("  {} ({} include path entries)", config.name.bold(), includes);
            }
        }
        PropertiesEvent::SelectionChanged(index) => {
            println!("{} configuration {}", "Selected".cyan(), index);
        }
        PropertiesEvent::CompileCommandsChanged(path) => {
            println!("{} {}", "Compile commands changed:".cyan(), path.display());
        }
        PropertiesEvent::Message(message) => print_message(message),
    }
}

async fn watch(folder: &Path, engine: &EngineConfig, compiler_defaults: Option<&Path>) -> Result<()> {
    let Workspace { store, mut events } = Workspace::open(folder, engine, compiler_defaults)?;
    print_resolved(&store)?;

    let (sender, receiver) = mpsc::unbounded_channel();
    let store = if engine.watch_compile_commands {
        store.with_compile_commands_watch(Box::new(NotifyCompileCommandsWatch::new(
            sender.clone(),
        )))
    } else {
        store
    };

    let mut service =
        PropertiesService::new(store, receiver, engine.fallback_poll_interval());
    match PropertiesWatcher::start(service.store().root(), sender) {
        Ok(watcher) => {
            if !watcher.is_watching_config_folder() {
                info!("No .vscode folder yet; polling until it appears");
            }
            service = service.with_watcher(watcher);
        }
        Err(e) => warn!("{}; relying on periodic checks", e),
    }

    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => print_event(&event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Dropped {} notifications", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    info!("Press Ctrl-C to stop");
    service
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl-C: {}", e);
            }
        })
        .await;
    Ok(())
}

fn manage_config(action: ConfigAction, engine: &EngineConfig) -> Result<()> {
    let config_path = config::config_file()?;

    match action {
        ConfigAction::Init => {
            if config_path.exists() {
                println!("Configuration already exists at {}", config_path.display());
            } else {
                EngineConfig::default().save(&config_path)?;
                println!("Configuration initialized at {}", config_path.display());
            }
        }

        ConfigAction::Show => {
            println!("# {}", config_path.display());
            println!("{}", toml::to_string_pretty(engine)?);
        }
    }

    Ok(())
}
