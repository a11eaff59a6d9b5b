mod app;
mod backend;
mod clipboard;
mod commands;
mod config;
mod controller;
mod db;
mod event;
mod generator;
mod query;
mod shell;
mod sync;
mod ui;
mod vault;
mod worker;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::app::{App, AppContext, AppWorker};
use crate::backend::{BackendClient, SessionStore};
use crate::config::{Capabilities, Config, GeneratorConfig};
use crate::controller::{PushStatus, TerminalPrompter};
use crate::db::Database;
use crate::generator::{check_strength, generate_password, GeneratorOptions, MAX_STRENGTH};
use crate::sync::MutationQueue;
use crate::worker::{HttpNetwork, OfflineWorker, PushInbox, SqliteCacheStore, WorkerOptions};

#[derive(Parser, Debug)]
#[command(name = "pocket-secrets")]
#[command(about = "A terminal password vault that keeps working offline")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/pocket-secrets/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Skip offline worker registration for this run
  #[arg(long)]
  no_worker: bool,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Print a generated password and its strength
  Generate {
    #[arg(short, long)]
    length: Option<usize>,
    #[arg(long)]
    no_uppercase: bool,
    #[arg(long)]
    no_digits: bool,
    #[arg(long)]
    no_symbols: bool,
  },
  /// Remove the offline worker registration
  Unregister,
  /// Deliver a push message to the running session
  Push {
    /// JSON payload with optional title, body and url
    #[arg(long)]
    data: Option<String>,
  },
}

/// Log to a daily file; the terminal belongs to the UI.
fn setup_logging() -> Result<WorkerGuard> {
  let dir = Config::data_dir()?;
  let appender = tracing_appender::rolling::daily(&dir, "pocket-secrets.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter =
    EnvFilter::try_from_env("POCKET_SECRETS_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
  tracing_subscriber::registry()
    .with(fmt::layer().with_writer(writer).with_ansi(false))
    .with(filter)
    .init();
  Ok(guard)
}

fn build_worker(config: &Config, db: &Database) -> Result<AppWorker> {
  let options = WorkerOptions::from_config(config)?;
  let network = HttpNetwork::new(options.origin.clone());
  Ok(OfflineWorker::new(SqliteCacheStore::new(db.conn()), network, options))
}

fn print_password(
  config: Option<GeneratorConfig>,
  length: Option<usize>,
  no_upper: bool,
  no_digits: bool,
  no_symbols: bool,
) {
  let mut options = GeneratorOptions::from(&config.unwrap_or_default());
  if let Some(length) = length {
    options.length = length;
  }
  options.uppercase &= !no_upper;
  options.digits &= !no_digits;
  options.symbols &= !no_symbols;

  let password = generate_password(options);
  let strength = check_strength(&password);
  println!("{}", password);
  eprintln!("Strength: {} ({}/{})", strength.label, strength.score, MAX_STRENGTH);
}

async fn run_tui(config: Config, no_worker: bool) -> Result<()> {
  let db = Database::open()?;
  let mut worker = build_worker(&config, &db)?;

  let capabilities = if no_worker {
    Capabilities {
      offline_cache: false,
      ..config.capabilities
    }
  } else {
    config.capabilities
  };

  // A worker from an earlier run serves the shell before registration runs
  if capabilities.offline_cache {
    if let Err(e) = worker.restore() {
      tracing::warn!("Could not restore worker registration: {}", e);
    }
  }
  let client_id = worker.attach_client("/")?;
  let manifest_request = worker.options().request(shell::MANIFEST_PATH)?;
  let network = HttpNetwork::new(worker.options().origin.clone());
  let served_by = capabilities.offline_cache.then_some(&worker);
  let mut title =
    shell::resolve_title(config.title.as_deref(), served_by, &network, &manifest_request).await;

  // Prompts happen here, before the terminal enters raw mode
  let mut prompter = TerminalPrompter::stdio(capabilities.push);
  let report = controller::register(&mut worker, capabilities, &mut prompter).await;
  // release stdin before the UI reads keys
  drop(prompter);
  info!(?report, state = ?worker.state(), "worker registration finished");

  if report.reload_requested() {
    info!("reloading shell assets");
    title =
      shell::resolve_title(config.title.as_deref(), Some(&worker), &network, &manifest_request).await;
  }

  let queue = (config.sync.enabled && report.sync_registered).then(|| MutationQueue::new(db.conn()));
  let inbox = (report.push == PushStatus::Ready).then(|| PushInbox::new(db.conn()));
  let anon_key = Config::get_anon_key()?;
  let backend = BackendClient::new(&config.backend, &anon_key, SessionStore::new())?;

  let worker = capabilities.offline_cache.then(|| Arc::new(worker));
  let ctx = AppContext {
    client_id: worker.as_ref().map(|_| client_id),
    worker,
    config: Arc::new(config),
    backend,
    queue,
    inbox,
  };

  let mut app = App::new(ctx, title);
  app.run().await
}

async fn unregister(config: &Config) -> Result<()> {
  let db = Database::open()?;
  let mut worker = build_worker(config, &db)?;
  worker.restore()?;
  if worker.unregister()? {
    println!("Offline worker unregistered");
  } else {
    println!("No offline worker was registered");
  }
  Ok(())
}

fn deliver_push(data: Option<&str>) -> Result<()> {
  let db = Database::open()?;
  PushInbox::new(db.conn()).deliver(data.map(str::as_bytes))?;
  println!("Push message delivered");
  Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _guard = setup_logging()?;

  match args.command {
    Some(Command::Generate {
      length,
      no_uppercase,
      no_digits,
      no_symbols,
    }) => {
      // generating works without a config file
      let generator = Config::load(args.config.as_deref()).ok().map(|c| c.generator);
      print_password(generator, length, no_uppercase, no_digits, no_symbols);
      Ok(())
    }
    Some(Command::Push { data }) => deliver_push(data.as_deref()),
    Some(Command::Unregister) => {
      let config = Config::load(args.config.as_deref())?;
      unregister(&config).await
    }
    None => {
      let config = Config::load(args.config.as_deref())?;
      run_tui(config, args.no_worker).await
    }
  }
}
