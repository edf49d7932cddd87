//! Main entry point for the order tracking service.
//!
//! The `tracker` binary drives an order's production progress against the
//! configured tracking service (`show`, `next`, `back`) and can host a
//! reference tracking service itself (`serve`).

use clap::{Parser, Subcommand};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use tracker_config::Config;
use tracker_core::{
	BuilderError, OrderProgressTracker, TrackerBuilder, TrackerEngine, TrackerFactories,
};
use tracker_storage::StorageService;
use tracker_types::ConfigSchema;

mod apis;
mod server;

use tracker_remote::implementations::http::create_remote as create_http_remote;
use tracker_remote::implementations::memory::create_remote as create_memory_remote;

/// Command-line arguments for the tracker.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Print the stages of an order
	Show { order: String },
	/// Mark the next stage of an order as reached
	Next { order: String },
	/// Step an order back one stage
	Back { order: String },
	/// Host the tracking service from the [api] section
	Serve,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	let config = Config::from_file(&args.config).await?;
	tracing::info!("Loaded configuration [{}]", config.tracker.id);

	match args.command {
		Command::Serve => {
			let api_config = config
				.enabled_api()
				.cloned()
				.ok_or("`serve` needs an [api] section with enabled = true")?;
			let storage = Arc::new(build_storage(&config)?);
			server::start_server(api_config, storage).await?;
			tracing::info!("Stopped tracking service");
		},
		Command::Show { order } => {
			let engine = build_engine(config)?;
			let tracker = engine.open(&order).await?;
			print!("{}", render(&tracker));
		},
		Command::Next { order } => {
			let engine = build_engine(config)?;
			let mut tracker = engine.open(&order).await?;
			let result = tracker.next().await;
			print!("{}", render(&tracker));
			result?;
		},
		Command::Back { order } => {
			let engine = build_engine(config)?;
			let mut tracker = engine.open(&order).await?;
			let result = tracker.back().await;
			print!("{}", render(&tracker));
			result?;
		},
	}

	Ok(())
}

/// Macro to create a factory HashMap with the appropriate type aliases
macro_rules! create_factory_map {
    ($interface:path, $error:path, $( $name:literal => $factory:expr ),* $(,)?) => {{
        let mut factories = std::collections::HashMap::new();
        $(
            factories.insert(
                $name.to_string(),
                $factory as fn(&toml::Value) -> Result<Box<dyn $interface>, $error>
            );
        )*
        factories
    }};
}

/// Builds the tracker engine with every linked remote implementation.
fn build_engine(config: Config) -> Result<TrackerEngine, BuilderError> {
	let remote_factories = create_factory_map!(
		tracker_remote::RemoteInterface,
		tracker_remote::RemoteError,
		"http" => create_http_remote,
		"memory" => create_memory_remote,
	);

	TrackerBuilder::new(config).build(TrackerFactories { remote_factories })
}

/// Creates the primary storage backend of the hosted service.
fn build_storage(config: &Config) -> Result<StorageService, Box<dyn std::error::Error>> {
	let storage_config = config
		.storage
		.as_ref()
		.ok_or("`serve` needs a [storage] section")?;

	let primary = storage_config.primary.as_str();
	let factory = tracker_storage::get_all_implementations()
		.into_iter()
		.find_map(|(name, factory)| (name == primary).then_some(factory))
		.ok_or_else(|| format!("Unknown storage implementation '{}'", primary))?;
	let implementation_config = storage_config
		.implementations
		.get(primary)
		.ok_or_else(|| format!("Primary storage '{}' has no configuration", primary))?;

	let backend = factory(implementation_config)?;
	backend
		.config_schema()
		.validate(implementation_config)
		.map_err(|e| format!("Invalid configuration for storage '{}': {}", primary, e))?;
	tracing::info!(component = "storage", implementation = %primary, "Loaded");
	Ok(StorageService::new(backend))
}

/// Formats the stage list with the current stage marked.
fn render(tracker: &OrderProgressTracker) -> String {
	let mut out = String::new();
	let _ = writeln!(
		out,
		"Order {} ({:.1}%)",
		tracker.order_id().unwrap_or("-"),
		tracker.progress_percent()
	);
	for (index, stage) in tracker.stages().iter().enumerate() {
		let marker = if tracker.is_current(index) { '>' } else { ' ' };
		let check = if stage.active { 'x' } else { ' ' };
		let _ = writeln!(out, "{} [{}] {}", marker, check, stage.name);
	}
	out
}
