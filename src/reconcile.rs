//! Merges discovered tunnel configurations with live interface state.
//!
//! The engine is pure: it never touches the system. Callers gather the two
//! input sets (see [`crate::vpn::TunnelBackend`]) and hand them in.

use serde::Serialize;
use std::collections::BTreeSet;

const CONF_SUFFIX: &str = ".conf";

/// Derive the interface identifier from a configuration's storage name.
///
/// Strips exactly one trailing `.conf`, nothing else.
pub fn identifier_for(display_name: &str) -> &str {
    display_name.strip_suffix(CONF_SUFFIX).unwrap_or(display_name)
}

/// One discovered tunnel configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigEntry {
    pub identifier: String,
    pub display_name: String,
    pub active: bool,
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciledView {
    /// Sorted by `display_name`, byte-wise ascending
    pub entries: Vec<ConfigEntry>,
    /// Always one of `entries[i].identifier`, or `None`
    pub selected: Option<String>,
}

impl ReconciledView {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn position_of(&self, identifier: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.identifier == identifier)
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected.as_deref().and_then(|id| self.position_of(id))
    }

    pub fn active_count(&self) -> usize {
        self.entries.iter().filter(|e| e.active).count()
    }
}

/// Build a view from the discovered names and the active interface set.
///
/// Selection priority: first active entry, then `previous` if it still
/// exists, then the first entry, then nothing.
pub fn reconcile(
    discovered: &BTreeSet<String>,
    active: &BTreeSet<String>,
    previous: Option<&str>,
) -> ReconciledView {
    // BTreeSet<String> iterates in byte order, which is the display order.
    let entries: Vec<ConfigEntry> = discovered
        .iter()
        .map(|name| {
            let identifier = identifier_for(name);
            ConfigEntry {
                identifier: identifier.to_string(),
                display_name: name.clone(),
                active: active.contains(identifier),
            }
        })
        .collect();

    let selected = entries
        .iter()
        .find(|e| e.active)
        .or_else(|| previous.and_then(|prev| entries.iter().find(|e| e.identifier == prev)))
        .or_else(|| entries.first())
        .map(|e| e.identifier.clone());

    ReconciledView { entries, selected }
}

/// The one piece of state that survives between refreshes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionMemory {
    previous: Option<String>,
}

impl SelectionMemory {
    pub fn previous(&self) -> Option<&str> {
        self.previous.as_deref()
    }
}

/// Owns [`SelectionMemory`] and threads it through [`reconcile`].
#[derive(Debug, Default)]
pub struct Reconciler {
    memory: SelectionMemory,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a pass with the remembered selection and remember its outcome.
    pub fn reconcile(
        &mut self,
        discovered: &BTreeSet<String>,
        active: &BTreeSet<String>,
    ) -> ReconciledView {
        let view = reconcile(discovered, active, self.memory.previous());
        if view.selected.is_some() {
            self.memory.previous = view.selected.clone();
        }
        tracing::debug!(
            entries = view.entries.len(),
            active = view.active_count(),
            selected = ?view.selected,
            "reconciled"
        );
        view
    }

    /// The user highlighted a row. Only affects the next pass.
    pub fn record_user_selection(&mut self, identifier: impl Into<String>) {
        self.memory.previous = Some(identifier.into());
    }
}
