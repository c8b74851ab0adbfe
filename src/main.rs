// src/main.rs

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fxresolver::{AssemblyReference, FxResolver, ResolverConfig};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "fxresolver")]
#[command(author, version, about = "Resolve reference assemblies for scripts", long_about = None)]
struct Cli {
    /// Config file (default: <config dir>/fxresolver/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SDK directory to derive the runtime from
    #[arg(long, global = true)]
    sdk_root: Option<PathBuf>,

    /// Platform identifier to use instead of the detected one
    #[arg(long, global = true)]
    rid: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the target framework moniker
    Tfm,
    /// Print the platform identifier
    Rid,
    /// Print the selected reference pack directory
    Pack,
    /// List the default script references
    Refs {
        /// Include the interactive support library
        #[arg(long)]
        interactive: bool,
        /// Resolve for the legacy desktop framework
        #[arg(long)]
        desktop: bool,
        /// Skip the reference pack and compute the closure
        #[arg(long)]
        no_pack: bool,
        /// Print JSON instead of one reference per line
        #[arg(long)]
        json: bool,
    },
    /// List the system assembly names
    System,
    /// Print the runtime environment as JSON
    Env,
}

#[derive(Serialize)]
struct RefsOutput<'a> {
    tfm: &'a str,
    rid: &'a str,
    references: &'a [AssemblyReference],
}

fn load_config(cli: &Cli) -> Result<ResolverConfig> {
    let mut config = match &cli.config {
        Some(path) => ResolverConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ResolverConfig::load_default()?,
    };
    if let Some(sdk_root) = &cli.sdk_root {
        config = config.with_sdk_root(sdk_root);
    }
    if let Some(rid) = &cli.rid {
        config = config.with_rid(rid);
    }
    Ok(config)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let resolver = FxResolver::new(config).context("Failed to establish runtime environment")?;

    match cli.command {
        Commands::Tfm => println!("{}", resolver.get_target_framework_moniker()),
        Commands::Rid => println!("{}", resolver.get_platform_identifier()),
        Commands::Pack => match resolver.get_reference_pack_directory() {
            Some(dir) => println!("{}", dir.display()),
            None => {
                info!("No reference pack installed for this runtime");
                std::process::exit(1);
            }
        },
        Commands::Refs {
            interactive,
            desktop,
            no_pack,
            json,
        } => {
            let references = resolver.get_default_references(interactive, desktop, !no_pack)?;
            if json {
                let (tfm, rid) = resolver.get_tfm_and_rid();
                let output = RefsOutput {
                    tfm,
                    rid,
                    references: &references,
                };
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                for reference in &references {
                    println!("{}", reference);
                }
            }
        }
        Commands::System => {
            let mut names: Vec<String> = resolver.get_system_assembly_names().into_iter().collect();
            names.sort();
            for name in names {
                println!("{}", name);
            }
        }
        Commands::Env => {
            println!("{}", serde_json::to_string_pretty(resolver.environment())?);
        }
    }

    Ok(())
}
