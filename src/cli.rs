use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::core::{Engine, GenerateOptions, ValidateOptions};

#[derive(Parser)]
#[command(name = "flowdoc")]
#[command(about = "Generate business flow diagrams from annotated Python code")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate flow diagrams from Python source files
    Generate {
        /// Source file or directory to analyze
        source: PathBuf,

        /// Output format (mermaid, dot, png, svg, pdf, html, json)
        #[arg(short, long)]
        format: Option<String>,

        /// Output file path (defaults to one file per flow, named by slug)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Layout direction (TB or LR)
        #[arg(short, long)]
        direction: Option<String>,

        /// Source root for module path resolution (defaults to the input directory)
        #[arg(long)]
        src_root: Option<PathBuf>,

        /// Additional directory names to exclude (can be repeated)
        #[arg(long)]
        exclude: Vec<String>,

        /// Include docstrings as tooltips (not supported for PNG/PDF)
        #[arg(long)]
        docstrings: bool,
    },

    /// Validate flow consistency in Python source files
    Validate {
        /// Source file or directory to analyze
        source: PathBuf,

        /// Exit with error code on warnings
        #[arg(long)]
        strict: bool,

        /// Source root for module path resolution (defaults to the input directory)
        #[arg(long)]
        src_root: Option<PathBuf>,

        /// Additional directory names to exclude (can be repeated)
        #[arg(long)]
        exclude: Vec<String>,
    },
}

impl Cli {
    pub async fn execute(self, mut engine: Engine) -> Result<()> {
        match self.command {
            Commands::Generate {
                source,
                format,
                output,
                direction,
                src_root,
                exclude,
                docstrings,
            } => {
                engine
                    .generate(
                        source,
                        GenerateOptions {
                            format,
                            output,
                            direction,
                            src_root,
                            exclude,
                            docstrings,
                        },
                    )
                    .await
            }
            Commands::Validate {
                source,
                strict,
                src_root,
                exclude,
            } => {
                engine
                    .validate(
                        source,
                        ValidateOptions {
                            strict,
                            src_root,
                            exclude,
                        },
                    )
                    .await
            }
        }
    }
}
