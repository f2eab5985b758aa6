use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{
    aggregate, export, generate, generate_all, hook, init, install_hook, list, scan, untrack,
};

#[derive(Parser)]
#[command(name = "gitjournal")]
#[command(version, about = "Devlogs and changelogs from git history", long_about = None)]
struct Cli {
    /// Repository to work on (defaults to current directory)
    #[arg(short, long, global = true, default_value = ".")]
    path: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Update the devlog with commits made since the last run
    Generate {
        /// Also write the changelog
        #[arg(long)]
        changelog: bool,

        /// Re-render even if nothing is new, accepting rewritten history
        #[arg(long)]
        force: bool,
    },

    /// Update the devlog and the categorized changelog
    Changelog {
        /// Re-render even if nothing is new, accepting rewritten history
        #[arg(long)]
        force: bool,
    },

    /// Start journaling a repository from scratch
    Init {
        /// Do not install the post-commit hook
        #[arg(long)]
        no_hook: bool,
    },

    /// Install the post-commit hook that keeps the devlog current
    InstallHook,

    /// Entry point for the post-commit hook
    #[command(hide = true)]
    Hook,

    /// Export the devlog as a standalone HTML page
    ExportHtml,

    /// Write the combined devlog of all tracked repositories
    Aggregate,

    /// List tracked repositories
    List,

    /// Find repositories under a directory and track them
    Scan {
        /// Directory to search
        dir: PathBuf,

        /// How many levels to descend (defaults to the configured depth)
        #[arg(short, long)]
        depth: Option<usize>,

        /// Track everything found without asking
        #[arg(short, long)]
        yes: bool,
    },

    /// Update the journals of every tracked repository
    GenerateAll {
        /// Also write changelogs
        #[arg(long)]
        changelog: bool,
    },

    /// Stop tracking a repository
    Untrack {
        /// repo_id or path of the repository
        repo: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let path = cli.path;

    match cli.command.unwrap_or(Commands::Generate {
        changelog: false,
        force: false,
    }) {
        Commands::Generate { changelog, force } => {
            generate::run(&path, changelog, force)?;
        }
        Commands::Changelog { force } => {
            generate::run(&path, true, force)?;
        }
        Commands::Init { no_hook } => {
            init::run(&path, !no_hook)?;
        }
        Commands::InstallHook => {
            install_hook::run(&path)?;
        }
        Commands::Hook => {
            hook::run(&path)?;
        }
        Commands::ExportHtml => {
            export::run(&path)?;
        }
        Commands::Aggregate => {
            aggregate::run()?;
        }
        Commands::List => {
            list::run()?;
        }
        Commands::Scan { dir, depth, yes } => {
            scan::run(&dir, depth, yes)?;
        }
        Commands::GenerateAll { changelog } => {
            generate_all::run(changelog)?;
        }
        Commands::Untrack { repo } => {
            untrack::run(&repo)?;
        }
    }

    Ok(())
}
