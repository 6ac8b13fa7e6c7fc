mod logging;

use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use paramcheck_analyze::{Run, Validation};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Exit status for a run that could not start (missing directories).
const EXIT_FATAL: i32 = 1;
/// Exit status under `--strict` when the report is not clean.
const EXIT_ISSUES: i32 = 2;

/// Data Factory parameter-passing checker.
#[derive(Parser)]
#[command(
    name = "adf-paramcheck",
    version,
    about = "Check parameter passing between Data Factory pipelines and triggers"
)]
struct Cli {
    /// Project root containing the pipeline/ and trigger/ directories
    /// (defaults to the current directory)
    root: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long)]
    quiet: bool,

    /// Exit with status 2 when validation issues are found
    #[arg(long)]
    strict: bool,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.quiet);

    let root = match cli.root {
        Some(root) => root,
        None => match std::env::current_dir() {
            Ok(dir) => dir,
            Err(e) => {
                let msg = format!("error: cannot determine current directory: {}", e);
                report_error(&msg, cli.output, cli.quiet);
                process::exit(EXIT_FATAL);
            }
        },
    };

    let validation = match Run::new().execute(&root) {
        Ok(validation) => validation,
        Err(e) => {
            report_error(&format!("error: {}", e), cli.output, cli.quiet);
            process::exit(EXIT_FATAL);
        }
    };

    logging::emit_diagnostics(&validation.diagnostics);
    tracing::info!(
        pipelines = validation.summary.pipelines,
        triggers = validation.summary.triggers,
        sites = validation.summary.sites,
        issues = validation.report.len(),
        "validation finished"
    );

    print_validation(&validation, cli.output, cli.quiet);

    // Issues are reported, not treated as failure, unless asked for.
    if cli.strict && !validation.report.is_clean() {
        process::exit(EXIT_ISSUES);
    }
}

fn print_validation(validation: &Validation, output: OutputFormat, quiet: bool) {
    match output {
        OutputFormat::Text => {
            if validation.report.is_clean() {
                if !quiet {
                    println!("No validation issues found.");
                }
            } else {
                print!("{}", validation.report.render_text());
            }
        }
        OutputFormat::Json => {
            let pretty = serde_json::to_string_pretty(validation)
                .unwrap_or_else(|e| format!("{{\"error\": \"serialization error: {}\"}}", e));
            println!("{}", pretty);
        }
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
