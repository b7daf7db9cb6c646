use std::path::PathBuf;

use crate::materialize::ActivationResult;

/// Shell type for environment generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shell {
    Zsh,
    Bash,
    Fish,
}

impl Shell {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "zsh" => Some(Shell::Zsh),
            "bash" | "sh" => Some(Shell::Bash),
            "fish" => Some(Shell::Fish),
            _ => None,
        }
    }

    /// Parse `name`, falling back to zsh. The flag reports whether the fallback was used.
    pub fn from_name_or_default(name: &str) -> (Self, bool) {
        match Self::from_name(name) {
            Some(shell) => (shell, false),
            None => (Shell::Zsh, true),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Shell::Zsh => "zsh",
            Shell::Bash => "bash",
            Shell::Fish => "fish",
        }
    }
}

/// Shell environment for an activated profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub path: Vec<PathBuf>,
    pub variables: Vec<(String, String)>,
    pub hooks: Vec<String>,
}

impl Environment {
    pub fn from_activation(result: &ActivationResult) -> Self {
        Self {
            path: result.path.clone(),
            variables: result
                .variables
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            hooks: result.hooks.clone(),
        }
    }

    /// Format the environment for the given shell
    pub fn format_for_shell(&self, shell: Shell) -> String {
        match shell {
            Shell::Zsh | Shell::Bash => self.format_posix(),
            Shell::Fish => self.format_fish(),
        }
    }

    fn format_posix(&self) -> String {
        let mut lines = Vec::new();
        if !self.path.is_empty() {
            let entries: Vec<String> = self
                .path
                .iter()
                .map(|p| escape_double_quoted(&p.display().to_string()))
                .collect();
            lines.push(format!("export PATH=\"{}:$PATH\"", entries.join(":")));
        }
        for (name, value) in &self.variables {
            lines.push(format!("export {}={}", name, single_quote(value)));
        }
        lines.extend(self.hooks.iter().cloned());
        lines.join("\n")
    }

    fn format_fish(&self) -> String {
        let mut lines = Vec::new();
        if !self.path.is_empty() {
            let entries: Vec<String> = self
                .path
                .iter()
                .map(|p| single_quote(&p.display().to_string()))
                .collect();
            lines.push(format!("set -gx PATH {} $PATH", entries.join(" ")));
        }
        for (name, value) in &self.variables {
            lines.push(format!("set -gx {} {}", name, single_quote(value)));
        }
        lines.extend(self.hooks.iter().cloned());
        lines.join("\n")
    }
}

fn single_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

fn escape_double_quoted(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '"' | '\\' | '$' | '`') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn environment() -> Environment {
        let result = ActivationResult {
            profile: "cpp".to_string(),
            path: vec![
                PathBuf::from("/state/packages/gcc-13/bin"),
                PathBuf::from("/state/packages/cmake/bin"),
            ],
            variables: BTreeMap::from([
                ("DEVPROF_ACTIVE_PROFILE".to_string(), "cpp".to_string()),
                ("GREETING".to_string(), "it's ready".to_string()),
            ]),
            hooks: vec!["ulimit -c unlimited".to_string()],
            diagnostics: vec!["profile cpp (2 packages)".to_string()],
        };
        Environment::from_activation(&result)
    }

    #[test]
    fn test_format_zsh() {
        let output = environment().format_for_shell(Shell::Zsh);

        assert!(output.contains(
            "export PATH=\"/state/packages/gcc-13/bin:/state/packages/cmake/bin:$PATH\""
        ));
        assert!(output.contains("export DEVPROF_ACTIVE_PROFILE='cpp'"));
        assert!(output.contains("export GREETING='it'\\''s ready'"));
        assert!(output.ends_with("ulimit -c unlimited"));
    }

    #[test]
    fn test_format_bash_matches_zsh() {
        let env = environment();
        assert_eq!(
            env.format_for_shell(Shell::Bash),
            env.format_for_shell(Shell::Zsh)
        );
    }

    #[test]
    fn test_format_fish() {
        let output = environment().format_for_shell(Shell::Fish);

        assert!(output.contains(
            "set -gx PATH '/state/packages/gcc-13/bin' '/state/packages/cmake/bin' $PATH"
        ));
        assert!(output.contains("set -gx DEVPROF_ACTIVE_PROFILE 'cpp'"));
        assert!(!output.contains("export")); // fish uses set -gx
    }

    #[test]
    fn test_path_line_escapes_specials() {
        let env = Environment {
            path: vec![PathBuf::from("/opt/$weird \"dir\"/bin")],
            variables: Vec::new(),
            hooks: Vec::new(),
        };
        assert_eq!(
            env.format_for_shell(Shell::Bash),
            "export PATH=\"/opt/\\$weird \\\"dir\\\"/bin:$PATH\""
        );
    }

    #[test]
    fn test_shell_from_name() {
        assert_eq!(Shell::from_name("zsh"), Some(Shell::Zsh));
        assert_eq!(Shell::from_name("BASH"), Some(Shell::Bash));
        assert_eq!(Shell::from_name("Fish"), Some(Shell::Fish));
        assert_eq!(Shell::from_name("powershell"), None);
        assert_eq!(Shell::from_name_or_default("powershell"), (Shell::Zsh, true));
    }

    #[test]
    fn test_shell_as_str() {
        assert_eq!(Shell::Zsh.as_str(), "zsh");
        assert_eq!(Shell::Bash.as_str(), "bash");
        assert_eq!(Shell::Fish.as_str(), "fish");
    }
}
