use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Development environment profiles
///
/// devprof picks one named toolchain profile for a project (python, cpp,
/// cuda, deep-learning, all...), resolves it from the declarative registry in
/// `devprof.toml` and prints the shell environment that activates it.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Project directory (defaults to the current directory)
    #[arg(short = 'C', long = "project", value_name = "DIR", global = true)]
    pub project: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create devprof.toml from the built-in registry and ignore the override file
    Init,

    /// List available profiles
    Profiles,

    /// Show the resolved package set for a profile
    Show {
        /// Profile name (defaults to the selected profile)
        #[arg(value_name = "PROFILE")]
        profile: Option<String>,

        /// Print the resolved environment as JSON
        #[arg(long)]
        json: bool,
    },

    /// Pin a profile for this checkout (writes the local override file)
    Use {
        /// Profile name to activate
        #[arg(value_name = "PROFILE", required_unless_present = "clear")]
        profile: Option<String>,

        /// Remove the local override and return to the default profile
        #[arg(long, conflicts_with = "profile")]
        clear: bool,
    },

    /// Show the selected profile and toolchain diagnostics
    Status,

    /// Validate the registry and every profile in it
    Check,

    /// Output environment setup (used by the directory loader)
    Env {
        /// Shell type (zsh, bash, fish)
        #[arg(short, long, value_name = "SHELL", default_value = "zsh")]
        shell: String,

        /// Do not print diagnostics to stderr
        #[arg(short, long)]
        quiet: bool,
    },
}
