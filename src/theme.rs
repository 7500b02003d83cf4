//! Colour palette for the UI, with optional overrides from `[theme]` in
//! config.toml

use ratatui::style::Color;

use crate::config::ThemeConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub accent: Color,      // Borders, key hints
    pub active: Color,      // Tunnels that are up
    pub danger: Color,      // Failed actions
    pub text: Color,
    pub text_dim: Color,    // Inactive rows, help text
    pub selected_bg: Color,
    pub header: Color,
}

impl Default for Theme {
    fn default() -> Self {
        // Catppuccin-inspired
        Self {
            accent: Color::Rgb(250, 179, 135),
            active: Color::Rgb(166, 218, 149),
            danger: Color::Rgb(243, 139, 168),
            text: Color::Rgb(205, 214, 244),
            text_dim: Color::Rgb(147, 153, 178),
            selected_bg: Color::Rgb(69, 71, 90),
            header: Color::Rgb(137, 180, 250),
        }
    }
}

impl Theme {
    /// Defaults with every parsable override applied
    pub fn from_config(config: &ThemeConfig) -> Self {
        let mut theme = Self::default();

        let overrides = [
            (&config.accent, &mut theme.accent),
            (&config.active, &mut theme.active),
            (&config.danger, &mut theme.danger),
            (&config.selected_bg, &mut theme.selected_bg),
        ];

        for (value, slot) in overrides {
            let Some(value) = value else { continue };
            match parse_hex_color(value) {
                Some(color) => *slot = color,
                None => tracing::warn!("Ignoring invalid theme colour: {}", value),
            }
        }

        theme
    }
}

/// Parse a hex color string (#RRGGBB or #RGB)
fn parse_hex_color(s: &str) -> Option<Color> {
    let s = s.trim().trim_start_matches('#');
    if !s.is_ascii() {
        return None;
    }

    if s.len() == 6 {
        let r = u8::from_str_radix(&s[0..2], 16).ok()?;
        let g = u8::from_str_radix(&s[2..4], 16).ok()?;
        let b = u8::from_str_radix(&s[4..6], 16).ok()?;
        Some(Color::Rgb(r, g, b))
    } else if s.len() == 3 {
        let r = u8::from_str_radix(&s[0..1], 16).ok()? * 17;
        let g = u8::from_str_radix(&s[1..2], 16).ok()? * 17;
        let b = u8::from_str_radix(&s[2..3], 16).ok()? * 17;
        Some(Color::Rgb(r, g, b))
    } else {
        None
    }
}
