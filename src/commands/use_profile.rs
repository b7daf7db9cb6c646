use crate::{ui, Project};
use anyhow::Result;

pub fn execute(project: &Project, profile: Option<String>, clear: bool) -> Result<()> {
    if clear {
        if project.clear_override()? {
            ui::success("Cleared", "local profile override");
        } else {
            ui::info("No local profile override to clear.");
        }
        return Ok(());
    }

    let Some(profile) = profile else {
        anyhow::bail!("A profile name is required unless --clear is given");
    };

    let registry = project.registry()?;
    project.use_profile(&registry, &profile)?;
    ui::success("Using", format!("profile '{profile}'"));

    if project.override_is_ignored()? == Some(false) {
        ui::warn("The override file is not git-ignored; run 'devprof init' to fix that.");
    }
    Ok(())
}
