//! Parametric macro command line entry point
//!
//! Runs the macro recipe against an in-memory host, printing the status
//! lines the host receives and the resulting equation list.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use pm_core::{
    DocumentError, HostApplication, MacroError, MacroRecipe, MacroRunner, MemoryDocument,
    MemoryHost, RecipeError, report,
};

#[derive(Parser)]
#[command(name = "pm")]
#[command(about = "Define parameters, ensure a configuration and bind a dimensioned sketch")]
struct Cli {
    /// Document file (RON); a new part is used when omitted or missing
    #[arg(short, long)]
    document: Option<PathBuf>,

    /// Recipe file (RON); the built-in recipe is used when omitted
    #[arg(short, long)]
    recipe: Option<PathBuf>,

    /// Write the document back to `--document` after the run
    #[arg(short, long)]
    write: bool,

    /// Run with no active document
    #[arg(long)]
    no_document: bool,

    /// Print the built-in recipe as RON and exit
    #[arg(long)]
    print_recipe: bool,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("Document: {0}")]
    Document(#[from] DocumentError),

    #[error("Recipe: {0}")]
    Recipe(#[from] RecipeError),

    #[error("{}", report::error_message(.0))]
    Macro(#[from] MacroError),
}

fn main() -> ExitCode {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pm_cli=info,pm_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode, CliError> {
    if cli.print_recipe {
        println!("{}", MacroRecipe::default().to_ron()?);
        return Ok(ExitCode::SUCCESS);
    }

    let recipe = match &cli.recipe {
        Some(path) => MacroRecipe::load(path)?,
        None => MacroRecipe::default(),
    };

    let mut host = if cli.no_document {
        MemoryHost::new()
    } else {
        let document = match &cli.document {
            Some(path) if path.exists() => MemoryDocument::load(path)?,
            _ => MemoryDocument::default(),
        };
        MemoryHost::with_document(document)
    };

    tracing::info!("Running macro against the {} host", host.name());
    let outcome = MacroRunner::new(recipe).run(&mut host)?;

    for message in host.messages() {
        println!("{}", message);
    }

    if let Some(document) = host.document() {
        println!();
        println!("Equations:");
        for (index, equation) in document.equations().iter().enumerate() {
            println!("  {:>3}  {}", index, equation);
        }

        if cli.write {
            match &cli.document {
                Some(path) => {
                    document.save(path)?;
                    tracing::info!("Saved {}", path.display());
                }
                None => tracing::warn!("--write needs --document; nothing saved"),
            }
        }
    }

    if outcome.is_clean() {
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::warn!("{} step(s) failed", outcome.failures().count());
        Ok(ExitCode::from(2))
    }
}
