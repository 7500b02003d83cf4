//! Finds tunnel configurations on the host.
//!
//! The configuration directory is normally root-only, so a direct read is
//! tried first and a privileged listing second. Every failure collapses to
//! an empty set.

use std::collections::BTreeSet;
use std::path::Path;

use super::{run_privileged, CommandRunner, Privilege};

const CONFIG_EXTENSION: &str = ".conf";

fn is_config_name(name: &str) -> bool {
    name.len() > CONFIG_EXTENSION.len() && name.ends_with(CONFIG_EXTENSION)
}

/// Keep the configuration names out of an `ls -1` style listing
pub fn config_names_from_listing(listing: &str) -> BTreeSet<String> {
    listing
        .lines()
        .map(str::trim)
        .filter(|name| is_config_name(name))
        .map(str::to_string)
        .collect()
}

async fn read_dir_names(dir: &Path) -> std::io::Result<BTreeSet<String>> {
    let mut names = BTreeSet::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        // Follows symlinks, so a link to a directory is skipped
        let is_file = tokio::fs::metadata(entry.path())
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if is_config_name(name) {
                names.insert(name.to_string());
            }
        }
    }
    Ok(names)
}

/// List configuration display names in `dir`, extension included
pub async fn list_configuration_names<R: CommandRunner>(
    runner: &R,
    privilege: Privilege,
    dir: &Path,
) -> BTreeSet<String> {
    match read_dir_names(dir).await {
        Ok(names) => return names,
        Err(e) => tracing::debug!("Direct listing of {} failed: {}", dir.display(), e),
    }

    // Running as root already failed above; sudo would not help
    if privilege == Privilege::Root {
        return BTreeSet::new();
    }

    let dir_arg = dir.to_string_lossy();
    match run_privileged(runner, privilege, &["ls", "-1", &*dir_arg]).await {
        Ok(output) if output.success => config_names_from_listing(&output.stdout),
        Ok(output) => {
            tracing::debug!("Privileged listing failed: {}", output.diagnostic());
            BTreeSet::new()
        }
        Err(e) => {
            tracing::debug!("Privileged listing failed: {}", e);
            BTreeSet::new()
        }
    }
}
