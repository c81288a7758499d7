//! Colour themes for the dashboard, persisted under the `theme` setting.

use ratatui::style::{Color, Modifier, Style};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub primary_color: String,
    pub background_color: String,
    pub secondary_background_color: String,
    pub text_color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sidebar_background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sidebar_text_color: Option<String>,
    #[serde(default = "default_font")]
    pub font: String,
}

fn default_font() -> String {
    "sans serif".to_string()
}

impl Default for Theme {
    fn default() -> Self {
        dracula_soft_dark()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeMode {
    Dark,
    Light,
}

fn theme(primary: &str, bg: &str, secondary: &str, text: &str, sidebar_bg: &str, sidebar_text: &str) -> Theme {
    Theme {
        primary_color: primary.to_string(),
        background_color: bg.to_string(),
        secondary_background_color: secondary.to_string(),
        text_color: text.to_string(),
        sidebar_background_color: Some(sidebar_bg.to_string()),
        sidebar_text_color: Some(sidebar_text.to_string()),
        font: default_font(),
    }
}

pub fn dracula_soft_dark() -> Theme {
    theme("#bf96f9", "#282a36", "#44475a", "#C0C0D0", "#44475a", "#C0C0D0")
}

/// Built-in palettes for `mode`, in display order.
pub fn builtin_themes(mode: ThemeMode) -> Vec<(&'static str, Theme)> {
    match mode {
        ThemeMode::Dark => vec![
            ("Dracula Soft Dark", dracula_soft_dark()),
            ("Tokyo Night", theme("#7aa2f7", "#1a1b26", "#24283b", "#a9b1d6", "#24283b", "#565f89")),
            ("GitHub Dark", theme("#58a6ff", "#0d1117", "#161b22", "#c9d1d9", "#161b22", "#8b949e")),
        ],
        ThemeMode::Light => vec![
            ("Solarized Light", theme("#268bd2", "#fdf6e3", "#eee8d5", "#657b83", "#eee8d5", "#657b83")),
            ("Nord Light", theme("#5e81ac", "#eceff4", "#e5e9f0", "#2e3440", "#e5e9f0", "#4c566a")),
            ("GitHub Light", theme("#0969da", "#ffffff", "#f6f8fa", "#24292f", "#f6f8fa", "#57606a")),
        ],
    }
}

/// Look up a built-in theme by display name (case-insensitive).
pub fn find_builtin(name: &str) -> Option<Theme> {
    [ThemeMode::Dark, ThemeMode::Light]
        .into_iter()
        .flat_map(builtin_themes)
        .find(|(n, _)| n.eq_ignore_ascii_case(name.trim()))
        .map(|(_, t)| t)
}

/// Parse `#rrggbb` (leading `#` optional).
pub fn parse_hex_color(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

/// Shift every channel by `amount`, clamping to 0..=255.
pub fn adjust_brightness(hex: &str, amount: i16) -> Option<String> {
    let (r, g, b) = parse_hex_color(hex)?;
    let shift = |c: u8| (c as i16 + amount).clamp(0, 255) as u8;
    Some(format!("#{:02x}{:02x}{:02x}", shift(r), shift(g), shift(b)))
}

/// Black on light colours, white on dark ones.
pub fn contrasting_text_color(hex: &str) -> &'static str {
    match parse_hex_color(hex) {
        Some((r, g, b)) => {
            let luminance = (0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64) / 255.0;
            if luminance > 0.5 { "#000000" } else { "#ffffff" }
        }
        None => "#ffffff",
    }
}

fn to_color(hex: &str, fallback: Color) -> Color {
    parse_hex_color(hex).map_or(fallback, |(r, g, b)| Color::Rgb(r, g, b))
}

/// Terminal styles derived from a theme.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub base: Style,
    pub panel: Style,
    pub accent: Style,
    pub selected: Style,
    pub sidebar: Style,
    pub muted: Style,
}

impl Theme {
    pub fn palette(&self) -> Palette {
        let bg = to_color(&self.background_color, Color::Reset);
        let fg = to_color(&self.text_color, Color::White);
        let panel_bg = to_color(&self.secondary_background_color, bg);
        let primary = to_color(&self.primary_color, Color::Cyan);
        let sidebar_bg = self
            .sidebar_background_color
            .as_deref()
            .map_or(panel_bg, |c| to_color(c, panel_bg));
        let sidebar_fg = self
            .sidebar_text_color
            .as_deref()
            .map_or(fg, |c| to_color(c, fg));
        let selected_fg = to_color(contrasting_text_color(&self.primary_color), Color::Black);

        Palette {
            base: Style::default().fg(fg).bg(bg),
            panel: Style::default().fg(fg).bg(panel_bg),
            accent: Style::default().fg(primary).add_modifier(Modifier::BOLD),
            selected: Style::default().fg(selected_fg).bg(primary),
            sidebar: Style::default().fg(sidebar_fg).bg(sidebar_bg),
            muted: Style::default().fg(sidebar_fg).add_modifier(Modifier::DIM),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#bf96f9"), Some((0xbf, 0x96, 0xf9)));
        assert_eq!(parse_hex_color("C0C0D0"), Some((0xc0, 0xc0, 0xd0)));
        assert_eq!(parse_hex_color("#fff"), None);
        assert_eq!(parse_hex_color("#zzzzzz"), None);
    }

    #[test]
    fn test_adjust_brightness_clamps() {
        assert_eq!(adjust_brightness("#f0f0f0", 50).as_deref(), Some("#ffffff"));
        assert_eq!(adjust_brightness("#101010", -20).as_deref(), Some("#000000"));
    }

    #[test]
    fn test_contrasting_text_color() {
        assert_eq!(contrasting_text_color("#ffffff"), "#000000");
        assert_eq!(contrasting_text_color("#282a36"), "#ffffff");
    }

    #[test]
    fn test_theme_json_uses_camel_case() {
        let json = serde_json::to_value(Theme::default()).unwrap();
        assert_eq!(json["primaryColor"], "#bf96f9");
        assert_eq!(json["font"], "sans serif");
    }

    #[test]
    fn test_find_builtin() {
        assert_eq!(find_builtin("tokyo night").unwrap().background_color, "#1a1b26");
        assert!(find_builtin("Matrix").is_none());
    }
}
