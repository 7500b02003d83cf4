use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Row, Table, Wrap},
    Frame,
};

use crate::app::{App, Density, Popup};

pub fn draw<B>(f: &mut Frame, app: &App<B>) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Info line
            Constraint::Min(3),    // Tunnels box
            Constraint::Length(1), // Footer
        ])
        .split(area);

    draw_info_line(f, app, chunks[0]);
    draw_tunnels(f, app, chunks[1]);
    draw_footer(f, app, chunks[2]);

    if app.popup == Popup::Help {
        draw_help_popup(f, app);
    }
}

fn draw_info_line<B>(f: &mut Frame, app: &App<B>, area: Rect) {
    let theme = &app.theme;

    let line = if let Some(ref status) = app.status_message {
        let color = if app.status_is_error { theme.danger } else { theme.accent };
        Line::from(Span::styled(status.as_str(), Style::default().fg(color)))
    } else {
        let active = app.view.active_count();
        let summary = match active {
            0 => format!("{} tunnels, none active", app.view.entries.len()),
            n => format!("{} tunnels, {} active", app.view.entries.len(), n),
        };
        Line::from(Span::styled(summary, Style::default().fg(theme.text_dim)))
    };

    f.render_widget(Paragraph::new(line).alignment(Alignment::Center), area);
}

fn draw_tunnels<B>(f: &mut Frame, app: &App<B>, area: Rect) {
    let theme = &app.theme;
    let compact = app.density == Density::Compact;

    let block = Block::default()
        .title(Span::styled(
            " Tunnels ",
            Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.accent));

    if app.view.is_empty() {
        let empty = Paragraph::new(vec![
            Line::from(Span::styled(
                "  No tunnel configurations found",
                Style::default().fg(theme.text_dim),
            )),
            Line::from(Span::styled(
                format!("  in {}", app.config.wireguard_dir.display()),
                Style::default().fg(theme.text_dim),
            )),
        ])
        .block(block);
        f.render_widget(empty, area);
        return;
    }

    let rows: Vec<Row> = app
        .view
        .entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let (icon, status, color) = if entry.active {
                ("●", "UP", theme.active)
            } else {
                ("○", "DOWN", theme.text_dim)
            };

            let row_style = if Some(i) == app.cursor {
                Style::default().bg(theme.selected_bg).fg(theme.text)
            } else {
                Style::default()
            };

            let mut cells = vec![
                Span::styled(icon, Style::default().fg(color)),
                Span::styled(entry.display_name.as_str(), Style::default().fg(theme.text)),
            ];
            if !compact {
                cells.push(Span::styled(status, Style::default().fg(color)));
            }
            Row::new(cells).style(row_style)
        })
        .collect();

    let table = if compact {
        Table::new(rows, [Constraint::Length(2), Constraint::Min(10)])
    } else {
        let header = Row::new(vec![
            Span::styled("", Style::default().fg(theme.header)),
            Span::styled("Name", Style::default().fg(theme.header)),
            Span::styled("Status", Style::default().fg(theme.header)),
        ]);
        Table::new(
            rows,
            [Constraint::Length(3), Constraint::Percentage(70), Constraint::Length(8)],
        )
        .header(header)
    };

    f.render_widget(table.block(block), area);
}

fn draw_footer<B>(f: &mut Frame, app: &App<B>, area: Rect) {
    let hints: &[(&str, &str)] = &[
        ("↑↓", "Nav"),
        ("Space", "Toggle"),
        ("u", "Up"),
        ("d", "Down"),
        ("r", "Refresh"),
        ("?", "Help"),
        ("q", "Quit"),
    ];

    let max_hints = match app.density {
        Density::Compact => 4,
        Density::Comfortable => hints.len(),
    };

    let spans: Vec<Span> = hints
        .iter()
        .take(max_hints)
        .flat_map(|(key, action)| {
            vec![
                Span::styled(*key, Style::default().fg(app.theme.accent)),
                Span::styled(format!(" {} │ ", action), Style::default().fg(app.theme.text_dim)),
            ]
        })
        .collect();

    f.render_widget(Paragraph::new(Line::from(spans)).alignment(Alignment::Center), area);
}

fn draw_help_popup<B>(f: &mut Frame, app: &App<B>) {
    let theme = &app.theme;
    let area = f.area();
    let popup_area = centered_rect(
        if area.width < 80 { 95 } else { 60 },
        if area.height < 30 { 90 } else { 60 },
        area,
    );

    f.render_widget(Clear, popup_area);

    let key_line = |key: &'static str, what: &'static str| {
        Line::from(vec![
            Span::styled(format!("  {:<10}", key), Style::default().fg(theme.accent)),
            Span::raw(what),
        ])
    };

    let help_text = vec![
        key_line("↑/↓ k/j", "Move the highlight"),
        key_line("Space", "Bring the highlighted tunnel up or down"),
        key_line("u / d", "Bring the highlighted tunnel up / down"),
        key_line("r", "Re-read configurations and interface state"),
        key_line("q / Esc", "Quit"),
        Line::from(""),
        Line::from(Span::styled(
            "  Runs wg-quick through `sudo -n` unless already root;",
            Style::default().fg(theme.text_dim),
        )),
        Line::from(Span::styled(
            "  cache credentials with `sudo -v` beforehand.",
            Style::default().fg(theme.text_dim),
        )),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .title(Span::styled(" wgtoggle Help ", Style::default().fg(theme.accent)))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.accent)),
        )
        .wrap(Wrap { trim: false });

    f.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
