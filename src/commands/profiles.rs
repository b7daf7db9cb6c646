use crate::selector::select;
use crate::{ui, Project};
use anyhow::Result;

pub fn execute(project: &Project) -> Result<()> {
    let registry = project.registry()?;
    if registry.is_empty() {
        ui::info("No profiles defined. Use 'devprof init' to create devprof.toml.");
        return Ok(());
    }

    let requested = project.override_reader()?.read();
    let selection = select(&registry, requested.as_ref(), registry.default_profile())?;
    if let Some(warning) = &selection.warning {
        ui::warn(warning);
    }

    for profile in registry.profiles() {
        let line = match &profile.description {
            Some(description) => format!("{} - {}", profile.name, description),
            None => profile.name.clone(),
        };
        if profile.name == selection.name {
            ui::success("Active", line);
        } else {
            ui::status("Profile", line);
        }
    }
    Ok(())
}
