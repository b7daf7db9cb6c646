use crate::cli::{Cli, Commands};
use crate::Project;
use anyhow::{Context, Result};

mod check;
mod env;
mod init;
mod profiles;
mod show;
mod status;
mod use_profile;

pub fn execute(cli: Cli) -> Result<()> {
    let start = match cli.project {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to determine current directory")?,
    };

    // Project is the root entry point for every command
    let project = Project::discover(&start)?;

    match cli.command {
        Commands::Init => init::execute(&project),

        Commands::Profiles => profiles::execute(&project),

        Commands::Show { profile, json } => show::execute(&project, profile, json),

        Commands::Use { profile, clear } => use_profile::execute(&project, profile, clear),

        Commands::Status => status::execute(&project, cli.verbose),

        Commands::Check => check::execute(&project),

        Commands::Env { shell, quiet } => env::execute(&project, shell, quiet),
    }
}
