//! ThemeForge CLI - Bridge interface for the service layer
//!
//! Commands: build, validate, platforms
//! Outputs JSON to stdout
//! Returns non-zero on build failure

use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use themeforge_core::{validate, Platform, ThemePipeline};

#[derive(Parser)]
#[command(name = "themeforge-cli")]
#[command(about = "ThemeForge CLI - Declarative Theme Compiler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output root for published themes, archives and reports
    #[arg(short, long, default_value = "dist")]
    output_root: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a theme from a spec document
    Build {
        /// Spec JSON payload
        #[arg(short, long, conflicts_with = "spec_file")]
        payload: Option<String>,

        /// Path to a spec JSON file
        #[arg(short, long)]
        spec_file: Option<PathBuf>,
    },

    /// Validate an existing theme directory
    Validate {
        /// Theme directory
        #[arg(short, long)]
        dir: PathBuf,

        /// Platform the directory targets
        #[arg(short, long)]
        platform: String,
    },

    /// List registered platforms
    Platforms,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let pipeline = ThemePipeline::with_defaults(&cli.output_root);

    match cli.command {
        Commands::Build { payload, spec_file } => {
            let raw = match (payload, spec_file) {
                (Some(p), _) => p,
                (None, Some(path)) => match fs::read_to_string(&path) {
                    Ok(s) => s,
                    Err(e) => {
                        eprintln!("Failed to read spec file {}: {e}", path.display());
                        return ExitCode::FAILURE;
                    }
                },
                (None, None) => {
                    eprintln!("Provide --payload or --spec-file");
                    return ExitCode::FAILURE;
                }
            };

            let value: serde_json::Value = match serde_json::from_str(&raw) {
                Ok(v) => v,
                Err(e) => {
                    println!(r#"{{"success": false, "error": "Invalid spec JSON: {e}"}}"#);
                    return ExitCode::FAILURE;
                }
            };

            match pipeline.build_theme(value) {
                Ok(outcome) => {
                    let output = serde_json::json!({
                        "success": true,
                        "build": outcome,
                    });
                    println!("{}", serde_json::to_string_pretty(&output).unwrap());
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    let output = serde_json::json!({
                        "success": false,
                        "error": e.to_string(),
                    });
                    println!("{}", serde_json::to_string(&output).unwrap());
                    ExitCode::from(2) // Build failure
                }
            }
        }

        Commands::Validate { dir, platform } => {
            let platform = match Platform::from_str(&platform) {
                Ok(p) => p,
                Err(e) => {
                    println!(r#"{{"failed": true, "error": "{e}"}}"#);
                    return ExitCode::FAILURE;
                }
            };
            let validator = validate::resolve_validator(platform);
            let check = validator.validate(&dir);
            println!("{}", serde_json::to_string_pretty(&check).unwrap());
            if check.failed {
                ExitCode::from(2) // Validation failure
            } else {
                ExitCode::SUCCESS
            }
        }

        Commands::Platforms => {
            let platforms: Vec<_> = Platform::ALL.iter().map(|p| p.as_str()).collect();
            println!("{}", serde_json::to_string_pretty(&platforms).unwrap());
            ExitCode::SUCCESS
        }
    }
}
