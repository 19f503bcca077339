//! Theme colors
//! Follows the terminal's kitty theme when one is present
//! (~/.config/kitty/current-theme.conf, then ~/.config/kitty/kitty.conf).

use ratatui::style::Color;
use std::collections::HashMap;
use std::fs;

#[derive(Debug, Clone)]
pub struct Theme {
    pub accent: Color,      // Focused borders, key hints, drop zone
    pub danger: Color,      // Alerts
    pub success: Color,     // Strong match
    pub warning: Color,     // Fair match, in-flight indicator
    pub text: Color,
    pub text_dim: Color,
    pub bg_selected: Color, // Browser selection
    pub inactive: Color,    // Unfocused borders, disabled button
    pub header: Color,      // Section titles, bold feedback
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            accent: Color::Rgb(137, 180, 250),
            danger: Color::Rgb(243, 139, 168),
            success: Color::Rgb(166, 227, 161),
            warning: Color::Rgb(250, 179, 135),
            text: Color::Rgb(205, 214, 244),
            text_dim: Color::Rgb(147, 153, 178),
            bg_selected: Color::Rgb(69, 71, 90),
            inactive: Color::Rgb(88, 91, 112),
            header: Color::Rgb(203, 166, 247),
        }
    }
}

impl Theme {
    pub fn load() -> Self {
        Self::load_kitty_theme().unwrap_or_default()
    }

    fn load_kitty_theme() -> Option<Self> {
        let kitty_dir = dirs::config_dir()?.join("kitty");
        let content = ["current-theme.conf", "kitty.conf"]
            .iter()
            .find_map(|name| fs::read_to_string(kitty_dir.join(name)).ok())?;

        Self::from_kitty_conf(&content)
    }

    /// Map kitty palette entries onto theme roles. Returns `None` when the
    /// file defines no colors at all.
    fn from_kitty_conf(content: &str) -> Option<Self> {
        let colors = parse_kitty_colors(content);
        if colors.is_empty() {
            return None;
        }

        let fallback = Self::default();
        let pick = |keys: &[&str], default: Color| {
            keys.iter()
                .find_map(|k| colors.get(*k).copied())
                .unwrap_or(default)
        };

        Some(Self {
            accent: pick(&["color4", "color12"], fallback.accent),
            danger: pick(&["color1", "color9"], fallback.danger),
            success: pick(&["color2", "color10"], fallback.success),
            warning: pick(&["color3", "color11"], fallback.warning),
            text: pick(&["foreground"], fallback.text),
            text_dim: pick(&["color8"], fallback.text_dim),
            bg_selected: pick(&["selection_background", "color0"], fallback.bg_selected),
            inactive: pick(&["inactive_border_color", "color8"], fallback.inactive),
            header: pick(&["color5", "color13"], fallback.header),
        })
    }

    /// Color for a match percentage band
    pub fn match_color(&self, percentage: f64) -> Color {
        if percentage >= 70.0 {
            self.success
        } else if percentage >= 40.0 {
            self.warning
        } else {
            self.danger
        }
    }
}

/// Parse `key #rrggbb` lines, skipping comments and non-color settings
fn parse_kitty_colors(content: &str) -> HashMap<String, Color> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let (key, value) = line.split_once(char::is_whitespace)?;
            Some((key.to_string(), parse_hex_color(value)?))
        })
        .collect()
}

/// `#RRGGBB` or `#RGB`
fn parse_hex_color(s: &str) -> Option<Color> {
    let hex = s.trim().strip_prefix('#')?;
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(hex.get(range)?, 16).ok();

    match hex.len() {
        6 => Some(Color::Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
        3 => Some(Color::Rgb(
            channel(0..1)? * 17,
            channel(1..2)? * 17,
            channel(2..3)? * 17,
        )),
        _ => None,
    }
}
