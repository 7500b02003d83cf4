mod app;
mod config;
mod reconcile;
mod theme;
mod ui;
mod vpn;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    cursor,
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use app::App;
use config::AppConfig;
use reconcile::Reconciler;
use vpn::wireguard::WgQuick;
use vpn::{InterfaceState, TunnelBackend};

#[derive(Parser, Debug)]
#[command(name = "wgtoggle")]
#[command(version)]
#[command(about = "Toggle WireGuard interfaces from the terminal")]
struct Args {
    /// Print the reconciled tunnel list as JSON and exit
    #[arg(short, long, conflicts_with_all = ["up", "down"])]
    status: bool,

    /// Bring an interface up and exit
    #[arg(short, long, value_name = "NAME", conflicts_with = "down")]
    up: Option<String>,

    /// Bring an interface down and exit
    #[arg(short, long, value_name = "NAME")]
    down: Option<String>,

    /// Directory holding the WireGuard configurations
    #[arg(long, value_name = "DIR", env = "WGTOGGLE_WIREGUARD_DIR")]
    wireguard_dir: Option<PathBuf>,
}

impl Args {
    fn is_tui(&self) -> bool {
        !self.status && self.up.is_none() && self.down.is_none()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.is_tui());

    let mut config = AppConfig::load();
    if let Some(dir) = args.wireguard_dir.clone() {
        config.wireguard_dir = dir;
    }
    let backend = WgQuick::system(config.wireguard_dir.clone());

    if args.status {
        println!("{}", status_json(&backend, &config).await?);
        return Ok(());
    }
    if let Some(name) = args.up.as_deref() {
        return change_state(&backend, &config, name, InterfaceState::Up).await;
    }
    if let Some(name) = args.down.as_deref() {
        return change_state(&backend, &config, name, InterfaceState::Down).await;
    }

    run_tui(backend, config).await
}

/// The TUI owns the terminal, so its logs go to a file
fn init_logging(tui: bool) {
    let filter = EnvFilter::from_default_env();

    if !tui {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .with(filter)
            .init();
        return;
    }

    let log_file = config::config_dir()
        .and_then(|dir| {
            let path = dir.join(format!("{}.log", config::APP_NAME));
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("Failed to open {}", path.display()))
        });

    match log_file {
        Ok(file) => tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
            .with(filter)
            .init(),
        // No log file: stay silent rather than scribble over the screen
        Err(_) => tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_writer(io::sink))
            .with(filter)
            .init(),
    }
}

/// One reconciliation pass, seeded like the TUI's first refresh
async fn status_json<B: TunnelBackend>(backend: &B, config: &AppConfig) -> Result<String> {
    let mut reconciler = Reconciler::new();
    if let Some(last) = config.last_interface.as_deref() {
        reconciler.record_user_selection(last);
    }

    let discovered = backend.list_configuration_names().await;
    let active = backend.query_active_interfaces().await;
    let view = reconciler.reconcile(&discovered, &active);

    Ok(serde_json::to_string(&view)?)
}

async fn change_state<B: TunnelBackend>(
    backend: &B,
    config: &AppConfig,
    name: &str,
    desired: InterfaceState,
) -> Result<()> {
    let identifier = reconcile::identifier_for(name.trim());
    let change = backend.set_interface_state(identifier, desired).await;

    if config.notifications {
        if let Err(e) = notify("wgtoggle", &change.message) {
            tracing::warn!("Notification failed: {}", e);
        }
    }

    if !change.success {
        anyhow::bail!(change.message);
    }
    println!("{}", change.message);
    Ok(())
}

async fn run_tui<B: TunnelBackend>(backend: B, config: AppConfig) -> Result<()> {
    enable_raw_mode()?;

    // Restore even when setup fails half-way
    let result = run_session(backend, config).await;
    restore_terminal()?;

    result
}

async fn run_session<B: TunnelBackend>(backend: B, config: AppConfig) -> Result<()> {
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend_term = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend_term)?;

    let mut app = App::new(backend, config, AppConfig::path().ok());
    let size = terminal.size()?;
    app.on_resize(size.width, size.height);
    app.refresh().await;

    run_app(&mut terminal, &mut app).await
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen, cursor::Show)?;
    Ok(())
}

async fn run_app<B: TunnelBackend>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App<B>,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    // Handle key and catch any errors to prevent crashes
                    if let Err(e) = app.handle_key(key).await {
                        tracing::error!("Key handling failed: {:#}", e);
                    }
                }
                Event::Resize(width, height) => app.on_resize(width, height),
                _ => {}
            }
        }

        if app.should_quit {
            return Ok(());
        }

        app.tick();
    }
}

fn notify(summary: &str, body: &str) -> Result<()> {
    notify_rust::Notification::new()
        .summary(summary)
        .body(body)
        .icon("network-vpn")
        .show()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vpn::testing::FakeBackend;

    #[test]
    fn test_args_modes() {
        let args = Args::try_parse_from(["wgtoggle"]).unwrap();
        assert!(args.is_tui());

        let args = Args::try_parse_from(["wgtoggle", "--up", "wg0"]).unwrap();
        assert_eq!(args.up.as_deref(), Some("wg0"));
        assert!(!args.is_tui());

        assert!(Args::try_parse_from(["wgtoggle", "--up", "a", "--down", "b"]).is_err());
        assert!(Args::try_parse_from(["wgtoggle", "--status", "--down", "b"]).is_err());
    }

    #[tokio::test]
    async fn test_status_json_shape() {
        let backend = FakeBackend::new(&["wg0.conf", "office.conf"], &["wg0"]);
        let json = status_json(&backend, &AppConfig::default()).await.unwrap();
        assert_eq!(
            json,
            r#"{"entries":[{"identifier":"office","display_name":"office.conf","active":false},{"identifier":"wg0","display_name":"wg0.conf","active":true}],"selected":"wg0"}"#
        );
    }

    #[tokio::test]
    async fn test_status_replays_remembered_interface() {
        let backend = FakeBackend::new(&["office.conf", "wg0.conf"], &[]);
        let config = AppConfig {
            last_interface: Some("wg0".to_string()),
            ..Default::default()
        };
        let json = status_json(&backend, &config).await.unwrap();
        assert!(json.ends_with(r#""selected":"wg0"}"#));

        let json = status_json(&backend, &AppConfig::default()).await.unwrap();
        assert!(json.ends_with(r#""selected":"office"}"#));
    }

    #[tokio::test]
    async fn test_change_state_strips_conf_suffix() {
        let backend = FakeBackend::new(&["wg0.conf"], &[]);
        change_state(&backend, &AppConfig::default(), "wg0.conf", InterfaceState::Up)
            .await
            .unwrap();

        assert_eq!(
            backend.calls.borrow()[0],
            ("wg0".to_string(), InterfaceState::Up)
        );
        assert!(backend.active.borrow().contains("wg0"));
    }

    #[tokio::test]
    async fn test_failed_change_is_an_error() {
        let backend = FakeBackend::new(&["wg0.conf"], &[]);
        backend
            .failures
            .borrow_mut()
            .push_back("Cannot find device \"wg0\"".to_string());

        let err = change_state(&backend, &AppConfig::default(), "wg0", InterfaceState::Down)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Cannot find device"));
    }
}
