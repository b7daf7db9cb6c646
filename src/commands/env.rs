use crate::environment::{Environment, Shell};
use crate::{ui, Project};
use anyhow::Result;

pub fn execute(project: &Project, shell: String, quiet: bool) -> Result<()> {
    let (shell_kind, defaulted) = Shell::from_name_or_default(&shell);
    if defaulted {
        ui::warn(format!(
            "Unknown shell '{}'; defaulting to {}.",
            shell,
            shell_kind.as_str()
        ));
    }

    let registry = project.registry()?;
    let activation = project.activate(&registry)?;

    if let Some(warning) = &activation.selection.warning {
        ui::warn(warning);
    }
    if !quiet {
        for line in &activation.result.diagnostics {
            ui::note("Toolchain", line);
        }
    }

    let environment = Environment::from_activation(&activation.result);
    println!("{}", environment.format_for_shell(shell_kind));

    Ok(())
}
