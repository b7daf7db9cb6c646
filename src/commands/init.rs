use crate::project::{ProjectPath, OVERRIDE_FILE};
use crate::{ui, Project};
use anyhow::Result;

pub fn execute(project: &Project) -> Result<()> {
    let report = project.init()?;
    let manifest = project.path(ProjectPath::Manifest)?;

    if report.manifest_created {
        ui::success("Created", manifest.display());
    } else {
        ui::status("Existing", manifest.display());
    }
    if report.gitignore_updated {
        ui::success("Ignored", format!("{OVERRIDE_FILE} added to .gitignore"));
    }
    ui::info("Run 'devprof profiles' to see the available profiles.");
    Ok(())
}
