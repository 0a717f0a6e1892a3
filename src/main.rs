mod plan;

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value as Json};

use lathe_config::PlanDef;
use lathe_graph::{Context, OperationRegistry};
use lathe_ops::OutputDir;
use lathe_resolver::Resolver;
use lathe_store::FsResultStore;

/// Lathe - content-addressed, cached evaluation of operation graphs
#[derive(Parser)]
#[command(name = "lathe")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.lathe)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Build and evaluate a plan, printing every step's value
  Run {
    /// Path to the plan file (JSON)
    plan_file: PathBuf,

    /// Result cache directory (default: <data-dir>/cache)
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Evaluate every node without reading or writing the cache
    #[arg(long)]
    no_cache: bool,

    /// Directory relative `write` paths resolve against (default: current directory)
    #[arg(long)]
    out_dir: Option<PathBuf>,
  },

  /// Print the content id of every step without evaluating anything
  Ids {
    /// Path to the plan file (JSON)
    plan_file: PathBuf,
  },

  /// List the registered operations
  Ops,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt().with_writer(io::stderr).init();

  let cli = Cli::parse();

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".lathe"),
  };

  match cli.command {
    Some(Commands::Run {
      plan_file,
      cache_dir,
      no_cache,
      out_dir,
    }) => {
      let cache_dir = (!no_cache).then(|| cache_dir.unwrap_or_else(|| data_dir.join("cache")));
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(run_plan(plan_file, cache_dir, out_dir))?;
    }
    Some(Commands::Ids { plan_file }) => {
      print_ids(&plan_file)?;
    }
    Some(Commands::Ops) => {
      for name in registry()?.names() {
        println!("{}", name);
      }
    }
    None => {
      println!("lathe - use --help to see available commands");
    }
  }

  Ok(())
}

fn registry() -> Result<Arc<OperationRegistry>> {
  let mut registry = OperationRegistry::new();
  lathe_ops::register_all(&mut registry).context("failed to register operations")?;
  Ok(Arc::new(registry))
}

async fn run_plan(plan_file: PathBuf, cache_dir: Option<PathBuf>, out_dir: Option<PathBuf>) -> Result<()> {
  let mut plan = load_plan(&plan_file).await?;
  eprintln!("Loaded plan: {}", plan.name);

  let overrides = read_externals_from_stdin()?;
  if !overrides.is_empty() {
    eprintln!("Externals from stdin: {}", overrides.len());
  }
  plan.externals.extend(overrides);
  plan.validate().context("invalid plan")?;

  let out_dir = match out_dir {
    Some(dir) => dir,
    None => std::env::current_dir().context("could not determine current directory")?,
  };
  let mut context = Context::new().with_data(OutputDir(out_dir));
  match cache_dir {
    Some(dir) => {
      eprintln!("Cache: {}", dir.display());
      context = context.with_store(Arc::new(FsResultStore::new(dir)));
    }
    None => eprintln!("Cache: disabled"),
  }

  let resolver = Resolver::new(registry()?);
  let resolution = resolver
    .run(context, |builder| plan::build_plan(builder, &plan))
    .await
    .context("plan evaluation failed")?;

  eprintln!("Run completed: {}", resolution.run_id);
  eprintln!(
    "Nodes evaluated: {} (cache hits: {}, writes: {})",
    resolution.stats.evaluations, resolution.stats.hits, resolution.stats.writes
  );

  let mut output = Map::new();
  for (step_id, id) in &resolution.output {
    let value = resolution
      .value(id)
      .with_context(|| format!("no value for step '{}'", step_id))?;
    output.insert(step_id.clone(), value.clone());
  }

  println!("{}", serde_json::to_string_pretty(&output)?);

  Ok(())
}

fn print_ids(plan_file: &Path) -> Result<()> {
  let rt = tokio::runtime::Runtime::new()?;
  let plan = rt.block_on(load_plan(plan_file))?;
  plan.validate().context("invalid plan")?;

  let resolver = Resolver::new(registry()?);
  let (ids, graph) = resolver
    .build(|builder| plan::build_plan(builder, &plan))
    .context("failed to build plan")?;

  eprintln!("Built {} nodes ({} distinct)", graph.len(), graph.distinct());
  for (step_id, id) in ids {
    println!("{}\t{}", id, step_id);
  }

  Ok(())
}

async fn load_plan(plan_file: &Path) -> Result<PlanDef> {
  let content = tokio::fs::read_to_string(plan_file)
    .await
    .with_context(|| format!("failed to read plan file: {}", plan_file.display()))?;

  serde_json::from_str(&content).with_context(|| format!("failed to parse plan file: {}", plan_file.display()))
}

/// A JSON object piped on stdin overrides the plan's externals.
fn read_externals_from_stdin() -> Result<Map<String, Json>> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    return Ok(Map::new());
  }

  let mut input = String::new();
  io::stdin()
    .read_to_string(&mut input)
    .context("failed to read externals from stdin")?;

  if input.trim().is_empty() {
    return Ok(Map::new());
  }

  match serde_json::from_str(&input).context("failed to parse externals JSON from stdin")? {
    Json::Object(map) => Ok(map),
    other => bail!("externals on stdin must be a JSON object, got {}", other),
  }
}
