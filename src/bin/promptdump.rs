//! promptdump CLI - Bundle files and directories into one LLM-ready document.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use promptdump::builder::{Aggregation, Aggregator};
use promptdump::errors::{exit_code, PromptDumpError};
use promptdump::output::{format_document, OutputError, OutputFormat, OutputOptions, Summary};
use promptdump::policy::Policy;
use promptdump::tokens::Encoding;
use promptdump::walker::{collect_sources, WalkOptions};
use serde::Serialize;
use tracing::debug;

#[derive(Parser)]
#[command(name = "promptdump")]
#[command(about = "Bundle files and directories into one document for LLM prompts")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log verbosity (written to stderr)
    #[arg(long, short, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// JSON file overriding the built-in ignore and binary lists
    #[arg(long, global = true)]
    policy: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the tree listing followed by every file's contents
    Bundle {
        #[command(flatten)]
        walk: WalkArgs,

        /// Document format
        #[arg(long, value_enum, default_value = "xml")]
        format: FormatArg,

        /// Write the document to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Print file, line and token counts to stderr
        #[arg(long)]
        summary: bool,

        /// Token encoding for counts (cl100k or o200k)
        #[arg(long, default_value = "cl100k")]
        encoding: Encoding,
    },

    /// Print only the tree listing
    Tree {
        #[command(flatten)]
        walk: WalkArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print only the file contents dump
    Contents {
        #[command(flatten)]
        walk: WalkArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective ignore policy as JSON
    Policy,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
struct WalkArgs {
    /// Files and directories to include, each becoming one source
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Glob patterns to leave out, matched against paths inside a directory
    #[arg(long, value_delimiter = ',')]
    exclude: Vec<String>,

    /// Respect .gitignore files inside selected directories
    #[arg(long)]
    respect_gitignore: bool,

    /// Skip hidden files and directories
    #[arg(long)]
    no_hidden: bool,

    /// Maximum directory depth
    #[arg(long)]
    max_depth: Option<usize>,
}

impl WalkArgs {
    fn options(&self) -> Result<WalkOptions, PromptDumpError> {
        let options = WalkOptions {
            max_depth: self.max_depth,
            include_hidden: !self.no_hidden,
            respect_gitignore: self.respect_gitignore,
            ..Default::default()
        };
        Ok(options.with_excludes(&self.exclude)?)
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Xml,
    Markdown,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Xml => OutputFormat::Xml,
            FormatArg::Markdown => OutputFormat::Markdown,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    Silent,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<tracing::Level> {
        match self {
            LogLevel::Debug => Some(tracing::Level::DEBUG),
            LogLevel::Info => Some(tracing::Level::INFO),
            LogLevel::Warn => Some(tracing::Level::WARN),
            LogLevel::Error => Some(tracing::Level::ERROR),
            LogLevel::Silent => None,
        }
    }
}

fn setup_tracing(level: LogLevel) {
    if let Some(level) = level.to_tracing_level() {
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .without_time()
            .compact()
            .init();
    }
}

fn main() {
    let cli = Cli::parse();
    setup_tracing(cli.log_level);
    let json_output = json_flag(&cli.command);

    let result = match load_policy(cli.policy.as_deref()) {
        Err(e) => Err(e),
        Ok(policy) => match cli.command {
            Commands::Bundle {
                walk,
                format,
                output,
                summary,
                encoding,
            } => run_bundle(&walk, policy, format.into(), output, summary, encoding),
            Commands::Tree { walk, json } => run_section(&walk, policy, json, true),
            Commands::Contents { walk, json } => run_section(&walk, policy, json, false),
            Commands::Policy => run_policy(&policy),
            Commands::Completions { shell } => {
                generate(shell, &mut Cli::command(), "promptdump", &mut std::io::stdout());
                Ok(())
            }
        },
    };

    if let Err(e) = result {
        if json_output {
            #[derive(Serialize)]
            struct ErrorOutput {
                error: String,
            }

            let payload = ErrorOutput {
                error: e.to_string(),
            };

            let json = serde_json::to_string(&payload)
                .unwrap_or_else(|_| "{\"error\":\"serialization failed\"}".to_string());
            eprintln!("{json}");
        } else {
            eprintln!("error: {}", e);
        }
        std::process::exit(exit_code(&e));
    }
}

fn json_flag(cmd: &Commands) -> bool {
    match cmd {
        Commands::Bundle { format, .. } => matches!(format, FormatArg::Json),
        Commands::Tree { json, .. } => *json,
        Commands::Contents { json, .. } => *json,
        Commands::Policy => false,
        Commands::Completions { .. } => false,
    }
}

fn load_policy(path: Option<&Path>) -> Result<Policy, PromptDumpError> {
    match path {
        Some(path) => {
            debug!(path = %path.display(), "loading policy file");
            Ok(Policy::load(path)?)
        }
        None => Ok(Policy::default()),
    }
}

/// Collect sources from the given paths and run one pass.
fn run_pass(walk: &WalkArgs, policy: Policy) -> Result<Aggregation, PromptDumpError> {
    if walk.paths.is_empty() {
        return Err(PromptDumpError::NoSources);
    }
    for path in &walk.paths {
        if !path.exists() {
            return Err(PromptDumpError::PathNotFound(path.clone()));
        }
    }

    let options = walk.options()?;
    let sources = collect_sources(&walk.paths, &options, &policy)?;
    Aggregator::new().policy(policy).run(sources.as_slice())
}

// --- Bundle command ---

fn run_bundle(
    walk: &WalkArgs,
    policy: Policy,
    format: OutputFormat,
    output: Option<PathBuf>,
    summary: bool,
    encoding: Encoding,
) -> Result<(), PromptDumpError> {
    let aggregation = run_pass(walk, policy)?;

    let options = OutputOptions {
        format,
        encoding,
        ..Default::default()
    };
    let document = format_document(&aggregation, &options)?;

    match output {
        Some(path) => {
            fs::write(&path, &document).map_err(OutputError::Io)?;
            debug!(path = %path.display(), bytes = document.len(), "document written");
        }
        None => print!("{}", document),
    }

    if summary {
        let stats = Summary::compute(&aggregation, encoding);
        eprintln!(
            "{} files, {} directories, {} lines, {} tokens ({})",
            stats.files, stats.directories, stats.lines, stats.tokens, encoding
        );
    }

    Ok(())
}

// --- Tree and Contents commands ---

fn run_section(
    walk: &WalkArgs,
    policy: Policy,
    json: bool,
    structure: bool,
) -> Result<(), PromptDumpError> {
    let aggregation = run_pass(walk, policy)?;

    if json {
        let mut options = if structure {
            OutputOptions::structure_only()
        } else {
            OutputOptions::contents_only()
        };
        options.format = OutputFormat::Json;
        print!("{}", format_document(&aggregation, &options)?);
    } else if structure {
        print!("{}", aggregation.structure);
    } else if !aggregation.contents.is_empty() {
        println!("{}", aggregation.contents);
    }

    Ok(())
}

// --- Policy command ---

fn run_policy(policy: &Policy) -> Result<(), PromptDumpError> {
    let json = serde_json::to_string_pretty(policy).map_err(OutputError::Serialization)?;
    println!("{json}");
    Ok(())
}
