pub mod discovery;
pub mod wireguard;

use std::collections::BTreeSet;
use std::fmt;
use std::process::Stdio;
use thiserror::Error;

/// Fallback diagnostic when a failed command printed nothing
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Non-interactive elevation: fails instead of prompting for a password
const ELEVATE: [&str; 2] = ["sudo", "-n"];

#[derive(Debug, Error)]
pub enum RunError {
    #[error("empty command line")]
    EmptyCommand,
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Captured result of one external command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Most specific diagnostic available: stderr, then stdout, then a sentinel
    pub fn diagnostic(&self) -> &str {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr;
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout;
        }
        UNKNOWN_ERROR
    }
}

/// Whether the process already runs with root privileges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    Root,
    User,
}

impl Privilege {
    pub fn detect() -> Self {
        if is_root() {
            Privilege::Root
        } else {
            Privilege::User
        }
    }

    /// Prefix `command` with the elevation wrapper when not already root
    pub fn wrap(self, command: &[&str]) -> Vec<String> {
        let prefix: &[&str] = match self {
            Privilege::Root => &[],
            Privilege::User => &ELEVATE,
        };
        prefix
            .iter()
            .chain(command.iter())
            .map(|s| s.to_string())
            .collect()
    }
}

#[cfg(unix)]
fn is_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
fn is_root() -> bool {
    false
}

/// Runs an argv to completion. The seam tests replace.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    async fn run(&self, argv: &[String]) -> Result<CommandOutput, RunError>;
}

/// Spawns real processes with tokio
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    async fn run(&self, argv: &[String]) -> Result<CommandOutput, RunError> {
        let (program, args) = argv.split_first().ok_or(RunError::EmptyCommand)?;

        let output = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| RunError::Spawn {
                program: program.clone(),
                source,
            })?;

        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Run `command` with elevation as needed
pub async fn run_privileged<R: CommandRunner>(
    runner: &R,
    privilege: Privilege,
    command: &[&str],
) -> Result<CommandOutput, RunError> {
    let argv = privilege.wrap(command);
    tracing::debug!(?argv, "running privileged command");
    runner.run(&argv).await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceState {
    Up,
    Down,
}

impl InterfaceState {
    pub fn as_str(self) -> &'static str {
        match self {
            InterfaceState::Up => "up",
            InterfaceState::Down => "down",
        }
    }
}

impl fmt::Display for InterfaceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of an activate/deactivate request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    pub success: bool,
    pub message: String,
}

impl StateChange {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// The three host capabilities the session needs.
///
/// None of these fail: queries degrade to an empty set and state changes
/// report failure in the returned [`StateChange`].
#[allow(async_fn_in_trait)]
pub trait TunnelBackend {
    /// Identifiers of interfaces currently up
    async fn query_active_interfaces(&self) -> BTreeSet<String>;

    /// Raw configuration names, extension included
    async fn list_configuration_names(&self) -> BTreeSet<String>;

    async fn set_interface_state(&self, identifier: &str, desired: InterfaceState) -> StateChange;
}

/// Kernel interface name rule: 1-15 chars of `[A-Za-z0-9_=+.-]`.
/// A leading `-` is refused so a name can never read as an option.
pub fn is_valid_interface_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 15
        && !name.starts_with('-')
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '=' | '+' | '.' | '-'))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_runs_command_directly() {
        assert_eq!(
            Privilege::Root.wrap(&["wg", "show", "interfaces"]),
            ["wg", "show", "interfaces"]
        );
    }

    #[test]
    fn test_user_gets_non_interactive_sudo() {
        assert_eq!(
            Privilege::User.wrap(&["wg-quick", "up", "wg0"]),
            ["sudo", "-n", "wg-quick", "up", "wg0"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_detect_matches_effective_uid() {
        let expected = if unsafe { libc::geteuid() } == 0 {
            Privilege::Root
        } else {
            Privilege::User
        };
        assert_eq!(Privilege::detect(), expected);
    }

    #[test]
    fn test_diagnostic_prefers_stderr() {
        let out = CommandOutput {
            success: false,
            stdout: "some output".into(),
            stderr: "  Cannot find device \"wg0\"\n".into(),
        };
        assert_eq!(out.diagnostic(), "Cannot find device \"wg0\"");
    }

    #[test]
    fn test_diagnostic_falls_back_to_stdout_then_sentinel() {
        let out = CommandOutput {
            success: false,
            stdout: "usage: wg-quick\n".into(),
            stderr: "   ".into(),
        };
        assert_eq!(out.diagnostic(), "usage: wg-quick");
        assert_eq!(CommandOutput::default().diagnostic(), UNKNOWN_ERROR);
    }

    #[test]
    fn test_interface_name_validation() {
        assert!(is_valid_interface_name("wg0"));
        assert!(is_valid_interface_name("office-vpn_2"));
        assert!(!is_valid_interface_name(""));
        assert!(!is_valid_interface_name("-h"));
        assert!(!is_valid_interface_name("../etc/passwd"));
        assert!(!is_valid_interface_name("a-very-long-interface"));
        assert!(!is_valid_interface_name("with space"));
    }

    #[tokio::test]
    async fn test_system_runner_rejects_empty_argv() {
        let err = SystemRunner.run(&[]).await.unwrap_err();
        assert!(matches!(err, RunError::EmptyCommand));
    }

    #[tokio::test]
    async fn test_run_privileged_passes_wrapped_argv() {
        let runner = testing::FakeRunner::with(vec![testing::FakeRunner::ok("")]);
        run_privileged(&runner, Privilege::User, &["wg", "show", "interfaces"])
            .await
            .unwrap();
        assert_eq!(
            runner.calls.borrow()[0],
            ["sudo", "-n", "wg", "show", "interfaces"]
        );
    }
}
