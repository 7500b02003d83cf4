use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::config::AppConfig;
use crate::reconcile::{ConfigEntry, ReconciledView, Reconciler};
use crate::theme::Theme;
use crate::vpn::{InterfaceState, TunnelBackend};

/// How long a status message stays on the info line
const STATUS_TIMEOUT: Duration = Duration::from_secs(3);

pub const NOTHING_SELECTED: &str = "Nothing selected";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Popup {
    None,
    Help,
}

/// Cosmetic layout density picked from the terminal size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Density {
    Compact,
    Comfortable,
}

impl Density {
    pub fn for_size(width: u16, height: u16) -> Self {
        if width < 60 || height < 12 {
            Density::Compact
        } else {
            Density::Comfortable
        }
    }
}

pub struct App<B> {
    backend: B,
    reconciler: Reconciler,

    pub view: ReconciledView,
    /// Highlighted row in `view.entries`
    pub cursor: Option<usize>,

    pub popup: Popup,
    pub density: Density,
    pub theme: Theme,

    // Status message (shown in info line, auto-clears after timeout)
    pub status_message: Option<String>,
    pub status_is_error: bool,
    pub status_message_time: Option<Instant>,

    pub config: AppConfig,
    config_path: Option<PathBuf>,

    pub should_quit: bool,
}

impl<B: TunnelBackend> App<B> {
    /// Build the session. `config_path` is where the remembered interface is
    /// written; `None` keeps it in memory only.
    pub fn new(backend: B, config: AppConfig, config_path: Option<PathBuf>) -> Self {
        let mut reconciler = Reconciler::new();
        if let Some(last) = config.last_interface.as_deref() {
            reconciler.record_user_selection(last);
        }

        Self {
            backend,
            reconciler,
            view: ReconciledView::default(),
            cursor: None,
            popup: Popup::None,
            density: Density::Comfortable,
            theme: Theme::from_config(&config.theme),
            status_message: None,
            status_is_error: false,
            status_message_time: None,
            config,
            config_path,
            should_quit: false,
        }
    }

    fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
        self.status_is_error = false;
        self.status_message_time = Some(Instant::now());
    }

    fn set_error(&mut self, msg: impl Into<String>) {
        self.set_status(msg);
        self.status_is_error = true;
    }

    pub fn selected_entry(&self) -> Option<&ConfigEntry> {
        self.cursor.and_then(|i| self.view.entries.get(i))
    }

    /// Re-read discovery and live state and reconcile
    pub async fn refresh(&mut self) {
        let discovered = self.backend.list_configuration_names().await;
        let active = self.backend.query_active_interfaces().await;
        self.view = self.reconciler.reconcile(&discovered, &active);
        self.cursor = self.view.selected_index();
    }

    pub fn on_resize(&mut self, width: u16, height: u16) {
        self.density = Density::for_size(width, height);
    }

    pub async fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.quit();
            return Ok(());
        }

        if self.popup == Popup::Help {
            if matches!(
                key.code,
                KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('h') | KeyCode::Enter | KeyCode::Char('q')
            ) {
                self.popup = Popup::None;
            }
            return Ok(());
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.quit(),

            KeyCode::Char('j') | KeyCode::Down => self.move_down(),
            KeyCode::Char('k') | KeyCode::Up => self.move_up(),

            KeyCode::Char('u') => self.set_selected_state(InterfaceState::Up).await,
            KeyCode::Char('d') => self.set_selected_state(InterfaceState::Down).await,
            KeyCode::Char(' ') | KeyCode::Enter => self.toggle_selected().await,

            KeyCode::Char('r') | KeyCode::Char('R') => {
                self.refresh().await;
                self.set_status("Refreshed");
            }

            KeyCode::Char('?') | KeyCode::Char('h') => self.popup = Popup::Help,

            _ => {}
        }
        Ok(())
    }

    fn move_down(&mut self) {
        let len = self.view.entries.len();
        if len == 0 {
            return;
        }
        let next = self.cursor.map(|i| (i + 1) % len).unwrap_or(0);
        self.select(next);
    }

    fn move_up(&mut self) {
        let len = self.view.entries.len();
        if len == 0 {
            return;
        }
        let prev = self
            .cursor
            .and_then(|i| i.checked_sub(1))
            .unwrap_or(len - 1);
        self.select(prev);
    }

    fn select(&mut self, index: usize) {
        self.cursor = Some(index);
        if let Some(entry) = self.view.entries.get(index) {
            self.reconciler.record_user_selection(entry.identifier.clone());
        }
    }

    async fn toggle_selected(&mut self) {
        let desired = match self.selected_entry() {
            Some(entry) if entry.active => InterfaceState::Down,
            Some(_) => InterfaceState::Up,
            None => {
                self.set_status(NOTHING_SELECTED);
                return;
            }
        };
        self.set_selected_state(desired).await;
    }

    async fn set_selected_state(&mut self, desired: InterfaceState) {
        let Some(identifier) = self.selected_entry().map(|e| e.identifier.clone()) else {
            self.set_status(NOTHING_SELECTED);
            return;
        };

        self.remember(&identifier);
        let change = self.backend.set_interface_state(&identifier, desired).await;
        if change.success {
            self.set_status(change.message);
        } else {
            self.set_error(change.message);
        }

        // Show what actually happened, success or not
        self.refresh().await;
    }

    fn remember(&mut self, identifier: &str) {
        if self.config.last_interface.as_deref() == Some(identifier) {
            return;
        }
        self.config.last_interface = Some(identifier.to_string());
        self.persist();
    }

    fn persist(&self) {
        let Some(path) = &self.config_path else { return };
        if let Err(e) = self.config.save_to(path) {
            tracing::warn!("Could not save config: {:#}", e);
        }
    }

    fn quit(&mut self) {
        if let Some(identifier) = self.selected_entry().map(|e| e.identifier.clone()) {
            self.remember(&identifier);
        }
        self.should_quit = true;
    }

    /// Expire the status message
    pub fn tick(&mut self) {
        if let Some(time) = self.status_message_time {
            if time.elapsed() >= STATUS_TIMEOUT {
                self.status_message = None;
                self.status_is_error = false;
                self.status_message_time = None;
            }
        }
    }
}
