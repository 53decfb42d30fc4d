use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use megamol_graph::{Catalog, Graph, GraphError};
use megamol_protocol::{ErrorEnvelope, SchemaKind};
use serde_json::json;
use std::fs;
use std::path::PathBuf;

mod input;

#[derive(Parser)]
#[command(name = "megamol-graph")]
#[command(about = "Inspect and edit MegaMol project graphs", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Graph configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a project and check its structural invariants
    Validate(ProjectArgs),

    /// Apply a batch of edits and write the resulting project
    Apply(ApplyArgs),

    /// Print modules grouped into dependency layers
    Layers(ProjectArgs),

    /// Print the JSON schema of a document type
    Schema(SchemaArgs),
}

#[derive(Args)]
struct ProjectArgs {
    /// Module/call catalog (JSON)
    #[arg(long)]
    catalog: PathBuf,

    /// Project document (JSON)
    #[arg(long)]
    project: PathBuf,

    /// Output JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ApplyArgs {
    #[command(flatten)]
    input: ProjectArgs,

    /// Edit batch (JSON)
    #[arg(long)]
    edits: PathBuf,

    /// Write the project here instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args)]
struct SchemaArgs {
    #[arg(value_enum, default_value = "project")]
    kind: SchemaArg,
}

#[derive(Copy, Clone, ValueEnum)]
enum SchemaArg {
    Project,
    Catalog,
    Edits,
}

impl SchemaArg {
    const fn as_kind(self) -> SchemaKind {
        match self {
            SchemaArg::Project => SchemaKind::Project,
            SchemaArg::Catalog => SchemaKind::Catalog,
            SchemaArg::Edits => SchemaKind::Edits,
        }
    }
}

fn main() {
    let mut cli = Cli::parse();

    // Keep stdout clean for JSON consumers
    let json_output = match &cli.command {
        Commands::Validate(args) | Commands::Layers(args) => args.json,
        Commands::Apply(args) => args.input.json,
        Commands::Schema(_) => false,
    };
    if json_output {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    if let Err(err) = run(cli) {
        report_error(&err, json_output);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Validate(args) => run_validate(args, cli.config),
        Commands::Apply(args) => run_apply(args, cli.config),
        Commands::Layers(args) => run_layers(args, cli.config),
        Commands::Schema(args) => run_schema(args),
    }
}

fn open_project(args: &ProjectArgs, config: Option<PathBuf>) -> Result<(Catalog, Graph)> {
    let config = input::load_config(config.as_deref())?;
    let catalog = input::load_catalog(&args.catalog)?;
    let graph = input::load_project(&catalog, config, &args.project)?;
    Ok((catalog, graph))
}

fn run_validate(args: ProjectArgs, config: Option<PathBuf>) -> Result<()> {
    let (_catalog, graph) = open_project(&args, config)?;
    let violations = graph.check_invariants();

    if args.json {
        let report = json!({
            "valid": violations.is_empty(),
            "project": graph.name(),
            "modules": graph.module_count(),
            "calls": graph.call_count(),
            "groups": graph.group_count(),
            "violations": violations.iter().map(ToString::to_string).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if violations.is_empty() {
        println!(
            "'{}' is consistent: {} modules, {} calls, {} groups",
            graph.name(),
            graph.module_count(),
            graph.call_count(),
            graph.group_count()
        );
    } else {
        println!("'{}' has {} violations:", graph.name(), violations.len());
        for violation in &violations {
            println!("  - {violation}");
        }
    }

    if !violations.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

fn run_apply(args: ApplyArgs, config: Option<PathBuf>) -> Result<()> {
    let (catalog, mut graph) = open_project(&args.input, config)?;
    let edits = input::load_edits(&args.edits)?;

    let outcomes = graph.apply_all(&catalog, &edits)?;
    log::info!("Applied {} edits to '{}'", outcomes.len(), graph.name());
    for outcome in &outcomes {
        log::debug!("{}", megamol_protocol::serialize_json(outcome)?);
    }

    let output = graph.to_json_string()?;
    match &args.out {
        Some(path) => {
            fs::write(path, format!("{output}\n"))
                .with_context(|| format!("Failed to write project to {}", path.display()))?;
            log::info!("Project written to {}", path.display());
        }
        None => println!("{output}"),
    }
    Ok(())
}

fn run_layers(args: ProjectArgs, config: Option<PathBuf>) -> Result<()> {
    let (_catalog, graph) = open_project(&args, config)?;
    let layers: Vec<Vec<&str>> = graph
        .dependency_layers()?
        .iter()
        .map(|layer| {
            layer
                .iter()
                .filter_map(|uid| graph.module(*uid))
                .map(|m| m.name())
                .collect()
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&json!({ "layers": layers }))?);
    } else {
        for (depth, layer) in layers.iter().enumerate() {
            println!("{depth}: {}", layer.join(", "));
        }
    }
    Ok(())
}

fn run_schema(args: SchemaArgs) -> Result<()> {
    let schema = megamol_protocol::json_schema(args.kind.as_kind())?;
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn report_error(err: &anyhow::Error, json_output: bool) {
    let graph_error = err.chain().find_map(|e| e.downcast_ref::<GraphError>());
    if json_output {
        let code = graph_error.map_or("error", GraphError::code);
        let envelope = ErrorEnvelope {
            code: code.to_string(),
            message: format!("{err:#}"),
            details: None,
            hint: hint_for(code).map(str::to_string),
        };
        match megamol_protocol::serialize_json_pretty(&envelope) {
            Ok(body) => println!("{body}"),
            Err(_) => eprintln!("Error: {err:#}"),
        }
    } else {
        eprintln!("Error: {err:#}");
    }
}

fn hint_for(code: &str) -> Option<&'static str> {
    match code {
        "class_not_found" | "invalid_project" => {
            Some("Check that the project only uses classes and slots listed in the catalog")
        }
        "incompatible" => Some("Connect a caller slot to a callee slot sharing a call class"),
        "not_found" => Some("Modules are addressed by instance name, slots as module::slot"),
        "cycle" => Some("Dependency layers need an acyclic call graph"),
        "invalid_name" => Some("Names must not be empty; slots are written as module::slot"),
        _ => None,
    }
}
