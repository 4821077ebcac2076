//! htmlmail: render HTML mail templates from the command line.
//!
//! # Usage
//!
//! ```text
//! htmlmail render <template> [--style <css>] [--model <json>] [--config <yaml>] [--out <file>] [--strict]
//! htmlmail check <template>...
//! ```

mod commands;

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;

use commands::{check::CheckArgs, render::RenderArgs};
use htmlmail_renderer::RenderError;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "htmlmail",
    version,
    about = "Render HTML mail templates against JSON models",
    long_about = None,
)]
struct Cli {
    /// Log compile and render steps to stderr (`-vv` for everything).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a template to HTML.
    Render(RenderArgs),

    /// Compile templates and report syntax errors without rendering.
    Check(CheckArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn init_tracing(verbose: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn report(err: &anyhow::Error) {
    // Library errors already embed their source in the message.
    let mut message = err.to_string();
    for cause in err.chain().skip(1) {
        let cause = cause.to_string();
        if !message.contains(&cause) {
            message.push_str(": ");
            message.push_str(&cause);
        }
    }
    eprintln!("{} {message}", "error:".red().bold());
    if let Some(RenderError::Template {
        line_text: Some(text),
        source,
        ..
    }) = err.downcast_ref::<RenderError>()
    {
        if let Some(line) = source.line() {
            eprintln!("{}", format!("{line:>5} | {text}").dimmed());
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Render(args) => args.run(),
        Commands::Check(args) => args.run(),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}
