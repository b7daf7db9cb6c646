use crate::manifest::RegistrySource;
use crate::selector::SelectionOrigin;
use crate::{ui, Project};
use anyhow::Result;

pub fn execute(project: &Project, verbose: bool) -> Result<()> {
    let manifests = project.manifests()?;
    match manifests.source() {
        RegistrySource::Builtin => ui::status("Registry", "built-in (no devprof.toml found)"),
        RegistrySource::Files(paths) => {
            let listed: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
            ui::status("Registry", listed.join("\n"));
        }
    }

    let registry = manifests.into_registry()?;
    let activation = project.activate(&registry)?;

    if let Some(warning) = &activation.selection.warning {
        ui::warn(warning);
    }

    let origin = match &activation.selection.origin {
        SelectionOrigin::Override(source) => format!("override from {source}"),
        SelectionOrigin::Default => "default".to_string(),
    };
    ui::success(
        "Profile",
        format!("{} ({})", activation.selection.name, origin),
    );
    ui::status("Capabilities", &activation.resolved.capabilities);

    if verbose {
        for package in &activation.resolved.packages {
            let overlays = if package.overlays.is_empty() {
                String::new()
            } else {
                format!(" [{}]", package.overlays.join(", "))
            };
            ui::status("Package", format!("{}{}", package.name(), overlays));
        }
        for entry in &activation.result.path {
            ui::status("Path", entry.display());
        }
    }

    for line in &activation.result.diagnostics {
        ui::status("Toolchain", line);
    }
    Ok(())
}
