use crate::resolver::Resolver;
use crate::selector::select;
use crate::{ui, Project};
use anyhow::{Context, Result};

pub fn execute(project: &Project, profile: Option<String>, json: bool) -> Result<()> {
    let registry = project.registry()?;

    let name = match profile {
        Some(name) => name,
        None => {
            let requested = project.override_reader()?.read();
            let selection = select(&registry, requested.as_ref(), registry.default_profile())?;
            if let Some(warning) = &selection.warning {
                ui::warn(warning);
            }
            selection.name
        }
    };

    let resolved = Resolver::new(&registry)
        .resolve_name(&name)
        .with_context(|| format!("Failed to resolve profile '{name}'"))?;

    if json {
        let rendered = serde_json::to_string_pretty(&resolved)
            .context("Failed to serialize resolved environment")?;
        println!("{rendered}");
        return Ok(());
    }

    let heading = match &resolved.description {
        Some(description) => format!("{} - {}", resolved.profile, description),
        None => resolved.profile.clone(),
    };
    ui::success("Profile", heading);
    ui::status("Capabilities", &resolved.capabilities);
    for package in &resolved.packages {
        let mut line = package.name().to_string();
        if let Some(version) = &package.spec.version {
            line.push_str(&format!(" {version}"));
        }
        if !package.overlays.is_empty() {
            line.push_str(&format!(" [{}]", package.overlays.join(", ")));
        }
        if !package.spec.flags.is_empty() {
            let flags: Vec<&str> = package.spec.flags.iter().map(String::as_str).collect();
            line.push_str(&format!("\n{}", flags.join(" ")));
        }
        ui::status("Package", line);
    }
    for hook in &resolved.hooks {
        ui::status("Hook", hook);
    }
    Ok(())
}
