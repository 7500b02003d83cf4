use std::collections::BTreeSet;
use std::path::PathBuf;

use super::{
    discovery, is_valid_interface_name, run_privileged, CommandRunner, InterfaceState,
    Privilege, StateChange, SystemRunner, TunnelBackend,
};

/// Default location wg-quick reads configurations from
pub const DEFAULT_CONFIG_DIR: &str = "/etc/wireguard";

/// `wg` + `wg-quick` on the local host
pub struct WgQuick<R = SystemRunner> {
    runner: R,
    privilege: Privilege,
    config_dir: PathBuf,
}

impl WgQuick<SystemRunner> {
    pub fn system(config_dir: impl Into<PathBuf>) -> Self {
        Self::new(SystemRunner, Privilege::detect(), config_dir)
    }
}

impl<R: CommandRunner> WgQuick<R> {
    pub fn new(runner: R, privilege: Privilege, config_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            privilege,
            config_dir: config_dir.into(),
        }
    }
}

/// Parse `wg show interfaces` output (whitespace separated names)
pub fn parse_interface_list(stdout: &str) -> BTreeSet<String> {
    stdout.split_whitespace().map(str::to_string).collect()
}

impl<R: CommandRunner> TunnelBackend for WgQuick<R> {
    async fn query_active_interfaces(&self) -> BTreeSet<String> {
        match run_privileged(&self.runner, self.privilege, &["wg", "show", "interfaces"]).await {
            Ok(output) if output.success => parse_interface_list(&output.stdout),
            Ok(output) => {
                tracing::debug!("wg show interfaces failed: {}", output.diagnostic());
                BTreeSet::new()
            }
            Err(e) => {
                tracing::debug!("wg show interfaces failed: {}", e);
                BTreeSet::new()
            }
        }
    }

    async fn list_configuration_names(&self) -> BTreeSet<String> {
        discovery::list_configuration_names(&self.runner, self.privilege, &self.config_dir).await
    }

    async fn set_interface_state(&self, identifier: &str, desired: InterfaceState) -> StateChange {
        let action = desired.as_str();

        if !is_valid_interface_name(identifier) {
            return StateChange::failed(format!("Invalid interface name: '{}'", identifier));
        }

        let result =
            run_privileged(&self.runner, self.privilege, &["wg-quick", action, identifier]).await;

        let change = match result {
            Ok(output) if output.success => {
                StateChange::ok(format!("Interface '{}' {} succeeded.", identifier, action))
            }
            Ok(output) => {
                StateChange::failed(format!("wg-quick {} failed: {}", action, output.diagnostic()))
            }
            Err(e) => StateChange::failed(format!("wg-quick {} failed: {}", action, e)),
        };

        if change.success {
            tracing::info!("{}", change.message);
        } else {
            tracing::warn!("{}", change.message);
        }
        change
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vpn::testing::FakeRunner;
    use crate::vpn::UNKNOWN_ERROR;

    fn backend(runner: FakeRunner, privilege: Privilege) -> WgQuick<FakeRunner> {
        WgQuick::new(runner, privilege, "/nonexistent/wgtoggle-test")
    }

    #[test]
    fn test_parse_interface_list() {
        let set = parse_interface_list("wg0 office\thome\n");
        assert_eq!(set.into_iter().collect::<Vec<_>>(), ["home", "office", "wg0"]);
        assert!(parse_interface_list("\n").is_empty());
    }

    #[tokio::test]
    async fn test_query_active_interfaces() {
        let wg = backend(FakeRunner::with(vec![FakeRunner::ok("wg0 office\n")]), Privilege::Root);
        let active = wg.query_active_interfaces().await;
        assert!(active.contains("wg0") && active.contains("office"));
        assert_eq!(wg.runner.calls.borrow()[0], ["wg", "show", "interfaces"]);
    }

    #[tokio::test]
    async fn test_query_failure_is_empty_set() {
        let wg = backend(
            FakeRunner::with(vec![FakeRunner::fail("", "Unable to access interface")]),
            Privilege::User,
        );
        assert!(wg.query_active_interfaces().await.is_empty());

        let wg = backend(FakeRunner::with(vec![FakeRunner::spawn_error("sudo")]), Privilege::User);
        assert!(wg.query_active_interfaces().await.is_empty());
    }

    #[tokio::test]
    async fn test_up_success_names_interface_and_action() {
        let wg = backend(FakeRunner::with(vec![FakeRunner::ok("")]), Privilege::User);
        let change = wg.set_interface_state("wg0", InterfaceState::Up).await;

        assert!(change.success);
        assert_eq!(change.message, "Interface 'wg0' up succeeded.");
        assert_eq!(
            wg.runner.calls.borrow()[0],
            ["sudo", "-n", "wg-quick", "up", "wg0"]
        );
    }

    #[tokio::test]
    async fn test_up_failure_reports_stderr() {
        let wg = backend(
            FakeRunner::with(vec![FakeRunner::fail("[#] ip link add wg0", "Cannot find device")]),
            Privilege::Root,
        );
        let change = wg.set_interface_state("wg0", InterfaceState::Up).await;

        assert!(!change.success);
        assert!(change.message.contains("Cannot find device"));
        assert!(!change.message.contains("ip link add"));
    }

    #[tokio::test]
    async fn test_down_failure_without_output_uses_sentinel() {
        let wg = backend(FakeRunner::with(vec![FakeRunner::fail("", "")]), Privilege::Root);
        let change = wg.set_interface_state("office", InterfaceState::Down).await;

        assert!(!change.success);
        assert_eq!(change.message, format!("wg-quick down failed: {}", UNKNOWN_ERROR));
    }

    #[tokio::test]
    async fn test_spawn_error_is_reported_not_raised() {
        let wg = backend(FakeRunner::with(vec![FakeRunner::spawn_error("sudo")]), Privilege::User);
        let change = wg.set_interface_state("wg0", InterfaceState::Down).await;
        assert!(!change.success);
        assert!(change.message.contains("failed to spawn sudo"));
    }

    #[tokio::test]
    async fn test_invalid_name_never_spawns() {
        let wg = backend(FakeRunner::default(), Privilege::Root);
        let change = wg.set_interface_state("--help", InterfaceState::Up).await;
        assert!(!change.success);
        assert!(wg.runner.calls.borrow().is_empty());
    }
}
