use crate::project::{ProjectPath, OVERRIDE_FILE};
use crate::resolver::Resolver;
use crate::{ui, Project};
use anyhow::Result;

pub fn execute(project: &Project) -> Result<()> {
    let registry = project.registry()?;
    let mut issues = Vec::new();

    if let Err(error) = registry.ensure_default(registry.default_profile()) {
        issues.push(error.to_string());
    }

    // One resolver for every profile so overlay patches are shared.
    let mut resolver = Resolver::new(&registry);
    let mut validated = 0usize;
    for profile in registry.profiles() {
        match resolver.resolve(profile) {
            Ok(resolved) => {
                validated += 1;
                ui::status(
                    "Resolved",
                    format!(
                        "{} ({} packages)",
                        resolved.profile,
                        resolved.packages.len()
                    ),
                );
            }
            Err(error) => issues.push(format!("profile '{}': {error}", profile.name)),
        }
    }

    match project.override_is_ignored()? {
        Some(true) => {}
        Some(false) => {
            let gitignore = project.path(ProjectPath::Gitignore)?;
            ui::warn(format!(
                "{OVERRIDE_FILE} is not ignored by git; add it to {}",
                gitignore.display()
            ));
        }
        None => ui::info("Not inside a git work tree; skipping ignore check."),
    }

    if issues.is_empty() {
        ui::success(
            "Check",
            format!(
                "Validated {validated} profile(s) with {} overlay application(s).",
                resolver.applications()
            ),
        );
        Ok(())
    } else {
        for issue in &issues {
            ui::error(issue);
        }
        anyhow::bail!("Registry validation failed ({} issue(s)).", issues.len());
    }
}
