use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use gpi_config::Settings;
use gpi_engine::{ComputeEngine, GraphSession};
use gpi_graph::GraphDef;
use gpi_loader::{EventFilter, NodeLoader, watch_dir};
use gpi_node::{NodeDescription, builtin_definitions};
use gpi_registry::NodeRegistry;
use gpi_remote::{NodeSource, ProcessNodeSource};

/// gpi - evaluate node graphs built from built-in and external nodes
#[derive(Parser)]
#[command(name = "gpi")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the config file (default: <config_dir>/gpi/config.toml)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// Directory holding external node sources, overriding the config file
  #[arg(long, global = true)]
  nodes_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Print every known node type as JSON
  Nodes,

  /// Evaluate a graph once and print each node's status and output
  Eval {
    /// Path to the graph file (JSON)
    graph_file: PathBuf,
  },

  /// Evaluate a graph, then re-evaluate whenever the node sources change
  Watch {
    /// Path to the graph file (JSON)
    graph_file: PathBuf,
  },

  /// Print the effective settings as TOML
  Config,
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_tracing();

  let mut settings = Settings::load(cli.config.as_deref()).context("failed to load config")?;
  if let Some(nodes_dir) = cli.nodes_dir {
    settings.nodes_dir = nodes_dir;
  }

  match cli.command {
    Some(Commands::Nodes) => run(list_nodes(settings)),
    Some(Commands::Eval { graph_file }) => run(eval_graph(settings, graph_file)),
    Some(Commands::Watch { graph_file }) => run(watch_graph(settings, graph_file)),
    Some(Commands::Config) => {
      print!("{}", settings.to_toml()?);
      Ok(())
    }
    None => {
      println!("gpi - use --help to see available commands");
      Ok(())
    }
  }
}

fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .init();
}

fn run(task: impl Future<Output = Result<()>>) -> Result<()> {
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(task)
}

/// Registry, node source and loader wired together from settings.
struct Services {
  registry: Arc<NodeRegistry>,
  source: Arc<dyn NodeSource>,
  loader: Arc<NodeLoader>,
}

impl Services {
  async fn start(settings: &Settings) -> Result<Self> {
    let registry = Arc::new(
      NodeRegistry::new(builtin_definitions()).context("invalid built-in node set")?,
    );
    let source: Arc<dyn NodeSource> = Arc::new(ProcessNodeSource::new(
      settings.host_program(),
      settings.host.args.clone(),
      &settings.nodes_dir,
      settings.host.timeout(),
    ));
    let loader = Arc::new(NodeLoader::new(registry.clone(), source.clone()));

    // Built-ins stay usable when the node source is down.
    if let Ok(snapshot) = loader.reload().await {
      info!(dynamic = snapshot.len(), "loaded external nodes");
    }

    Ok(Self {
      registry,
      source,
      loader,
    })
  }

  fn session(&self) -> GraphSession {
    GraphSession::new(
      self.registry.clone(),
      ComputeEngine::with_source(self.source.clone()),
    )
  }
}

async fn list_nodes(settings: Settings) -> Result<()> {
  let services = Services::start(&settings).await?;

  let mut nodes = Vec::new();
  for def in services.registry.definitions() {
    let mut value = serde_json::to_value(NodeDescription::from(def.as_ref()))?;
    if let Some(object) = value.as_object_mut() {
      object.insert("origin".to_string(), def.origin().into());
    }
    nodes.push(value);
  }

  println!("{}", serde_json::to_string_pretty(&nodes)?);
  Ok(())
}

async fn read_graph(path: &Path) -> Result<GraphDef> {
  let content = tokio::fs::read_to_string(path)
    .await
    .with_context(|| format!("failed to read graph file: {}", path.display()))?;
  serde_json::from_str(&content)
    .with_context(|| format!("failed to parse graph file: {}", path.display()))
}

fn print_report(session: &GraphSession) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(&session.report())?);
  Ok(())
}

async fn eval_graph(settings: Settings, graph_file: PathBuf) -> Result<()> {
  let graph = read_graph(&graph_file).await?;
  let services = Services::start(&settings).await?;

  let mut session = services.session();
  session.load(graph).context("failed to load graph")?;
  session.run_until_idle().await;

  print_report(&session)
}

async fn watch_graph(settings: Settings, graph_file: PathBuf) -> Result<()> {
  let graph = read_graph(&graph_file).await?;
  let services = Services::start(&settings).await?;

  let mut session = services.session();
  session.load(graph).context("failed to load graph")?;
  session.run_until_idle().await;
  print_report(&session)?;

  tokio::fs::create_dir_all(&settings.nodes_dir)
    .await
    .with_context(|| format!("failed to create {}", settings.nodes_dir.display()))?;
  let (_watcher, events) = watch_dir(&settings.nodes_dir, settings.watch.recursive)
    .context("failed to watch node directory")?;

  let cancel = CancellationToken::new();
  let filter = EventFilter::new(
    settings.watch.extensions.clone(),
    settings.watch.ignore_dirs.clone(),
  );
  let loader_task = tokio::spawn({
    let loader = services.loader.clone();
    let cancel = cancel.clone();
    let quiet = settings.watch.debounce();
    async move { loader.run(events, filter, quiet, cancel).await }
  });

  let mut changes = services.registry.subscribe();
  loop {
    tokio::select! {
      _ = tokio::signal::ctrl_c() => {
        info!("interrupted, shutting down");
        break;
      }
      changed = changes.changed() => {
        if changed.is_err() {
          warn!("registry closed");
          break;
        }
        session.on_registry_changed();
        session.run_until_idle().await;
        print_report(&session)?;
      }
    }
  }

  cancel.cancel();
  loader_task.await.context("node loader task failed")?;
  Ok(())
}
