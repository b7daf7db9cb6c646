use std::env;
use std::ffi::OsString;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use thiserror::Error;
use wait_timeout::ChildExt;

/// Default bound for a single version probe.
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 2_000;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("no version command configured")]
    NoCommand,

    #[error("failed to run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' timed out after {timeout_ms} ms")]
    Timeout { command: String, timeout_ms: u64 },

    #[error("'{command}' exited with status {status}")]
    Failed { command: String, status: String },

    #[error("'{command}' produced no output")]
    EmptyOutput { command: String },
}

/// Asks a tool for its version string.
pub trait VersionProbe {
    /// Run `command` with `path` prepended to `PATH` and return one line of output.
    fn probe(&self, command: &[String], path: &[PathBuf]) -> Result<String, ProbeError>;
}

/// Runs the version command as a child process, bounded by a timeout.
#[derive(Debug, Clone)]
pub struct CommandProbe {
    timeout: Duration,
}

impl CommandProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for CommandProbe {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_PROBE_TIMEOUT_MS))
    }
}

impl VersionProbe for CommandProbe {
    fn probe(&self, command: &[String], path: &[PathBuf]) -> Result<String, ProbeError> {
        let (program, args) = command.split_first().ok_or(ProbeError::NoCommand)?;
        let rendered = command.join(" ");

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(search_path) = search_path(path) {
            cmd.env("PATH", search_path);
        }

        let mut child = cmd.spawn().map_err(|source| ProbeError::Spawn {
            command: rendered.clone(),
            source,
        })?;

        // Pipes are drained while waiting; a full pipe would stall the child.
        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);

        let status = match child.wait_timeout(self.timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                reap(&mut child);
                // Readers are left detached: a grandchild may still hold the pipes.
                return Err(ProbeError::Timeout {
                    command: rendered,
                    timeout_ms: self.timeout.as_millis() as u64,
                });
            }
            Err(source) => {
                reap(&mut child);
                return Err(ProbeError::Spawn {
                    command: rendered,
                    source,
                });
            }
        };

        if !status.success() {
            let status = status
                .code()
                .map(|code| code.to_string())
                .unwrap_or_else(|| "terminated_by_signal".to_string());
            return Err(ProbeError::Failed {
                command: rendered,
                status,
            });
        }

        let stdout = stdout.map(join_reader).unwrap_or_default();
        let stderr = stderr.map(join_reader).unwrap_or_default();

        // Some tools (older pythons, gcc -v) report on stderr.
        first_line(&stdout)
            .or_else(|| first_line(&stderr))
            .ok_or(ProbeError::EmptyOutput { command: rendered })
    }
}

/// Kill `child` and collect its exit status so no zombie is left behind.
fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut output = Vec::new();
        let _ = pipe.read_to_end(&mut output);
        output
    })
}

fn join_reader(handle: JoinHandle<Vec<u8>>) -> String {
    let output = handle.join().unwrap_or_default();
    String::from_utf8_lossy(&output).into_owned()
}

fn first_line(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

fn search_path(prepend: &[PathBuf]) -> Option<OsString> {
    let mut entries: Vec<PathBuf> = prepend.to_vec();
    if let Some(existing) = env::var_os("PATH") {
        entries.extend(env::split_paths(&existing));
    }
    env::join_paths(entries).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_first_line_skips_blank_lines() {
        assert_eq!(
            first_line("\n  \nPython 3.12.1\nextra"),
            Some("Python 3.12.1".to_string())
        );
        assert_eq!(first_line("   \n"), None);
    }

    #[test]
    fn test_empty_command_is_rejected() {
        let probe = CommandProbe::default();
        assert!(matches!(probe.probe(&[], &[]), Err(ProbeError::NoCommand)));
    }

    #[test]
    fn test_missing_tool_is_spawn_error() {
        let probe = CommandProbe::default();
        let result = probe.probe(&cmd(&["devprof-definitely-missing-tool", "--version"]), &[]);
        assert!(matches!(result, Err(ProbeError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_reads_stdout() {
        let probe = CommandProbe::default();
        let line = probe.probe(&cmd(&["sh", "-c", "echo tool 1.2.3"]), &[]).unwrap();
        assert_eq!(line, "tool 1.2.3");
    }

    #[cfg(unix)]
    #[test]
    fn test_falls_back_to_stderr() {
        let probe = CommandProbe::default();
        let line = probe
            .probe(&cmd(&["sh", "-c", "echo 'Python 2.7.18' 1>&2"]), &[])
            .unwrap();
        assert_eq!(line, "Python 2.7.18");
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_failure() {
        let probe = CommandProbe::default();
        let result = probe.probe(&cmd(&["sh", "-c", "exit 3"]), &[]);
        assert!(matches!(result, Err(ProbeError::Failed { status, .. }) if status == "3"));
    }

    #[cfg(unix)]
    #[test]
    fn test_large_output_does_not_block() {
        let probe = CommandProbe::new(Duration::from_millis(1_500));
        let line = probe
            .probe(
                &cmd(&[
                    "sh",
                    "-c",
                    "echo 'tool 9.9'; head -c 200000 /dev/zero | tr '\\0' a",
                ]),
                &[],
            )
            .unwrap();
        assert_eq!(line, "tool 9.9");
    }

    #[cfg(unix)]
    #[test]
    fn test_reap_collects_killed_child() {
        let mut child = Command::new("sleep").arg("5").spawn().unwrap();
        reap(&mut child);
        assert!(child.try_wait().unwrap().is_some());
    }

    #[cfg(unix)]
    #[test]
    fn test_slow_tool_times_out() {
        let probe = CommandProbe::new(Duration::from_millis(100));
        let result = probe.probe(&cmd(&["sh", "-c", "sleep 5"]), &[]);
        assert!(matches!(result, Err(ProbeError::Timeout { timeout_ms: 100, .. })));
    }
}
