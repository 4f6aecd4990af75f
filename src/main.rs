use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::{debug, info};
use std::path::PathBuf;

use annoswag::config::{Config, EmbeddedFields};
use annoswag::generator::Generator;

/// Generate Swagger 2.0 documents from annotation comments in Go sources
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse the sources and write the Swagger document
    Init {
        /// Root directory of the Go sources
        #[arg(short, long, default_value = "./")]
        dir: PathBuf,

        /// Output directory for generated files
        #[arg(short, long, default_value = "./docs")]
        output: PathBuf,

        /// Output file name, without extension
        #[arg(short, long)]
        file: Option<String>,

        /// Output types to generate (json,yaml)
        #[arg(long = "ot")]
        output_types: Option<String>,

        /// YAML config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory names to exclude, comma separated
        #[arg(long = "exclude-dir")]
        exclude_dir: Option<String>,

        /// Represent embedded struct fields as merged compositions
        #[arg(long = "compose-embedded")]
        compose_embedded: bool,
    },

    /// Parse and validate the sources without writing anything
    Check {
        /// Root directory of the Go sources
        #[arg(short, long, default_value = "./")]
        dir: PathBuf,

        /// YAML config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path).with_context(|| format!("Failed to load config {:?}", path)),
        None => Ok(Config::default()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let env = Env::default().filter_or("RUST_LOG", if cli.verbose { "debug" } else { "info" });
    env_logger::init_from_env(env);

    debug!("Starting annoswag...");

    match &cli.command {
        Commands::Init {
            dir,
            output,
            file,
            output_types,
            config,
            exclude_dir,
            compose_embedded,
        } => {
            let mut config = load_config(config.as_ref())?;
            if let Some(exclude_dir) = exclude_dir {
                config.exclude_dirs.extend(split_list(exclude_dir));
            }
            if let Some(output_types) = output_types {
                config.output.types = split_list(output_types);
            }
            if let Some(file) = file {
                config.output.file_name = file.clone();
            }
            if *compose_embedded {
                config.embedded_fields = EmbeddedFields::Compose;
            }
            debug!("Configuration: {:?}", config);

            info!("Generating Swagger document from {:?}", dir);
            let output_config = config.output.clone();
            let document = annoswag::Parser::new(dir, config)
                .parse()
                .with_context(|| format!("Failed to parse sources in {:?}", dir))?;

            Generator::new(&document, output_config.file_name)
                .generate(output, &output_config.types)?;
            info!("Swagger documentation generated successfully");
        }
        Commands::Check { dir, config } => {
            let config = load_config(config.as_ref())?;
            let document = annoswag::Parser::new(dir, config)
                .parse()
                .with_context(|| format!("Failed to parse sources in {:?}", dir))?;
            info!(
                "{:?} is valid: {} paths, {} definitions",
                dir,
                document.paths.len(),
                document.definitions.len()
            );
        }
    }

    Ok(())
}
