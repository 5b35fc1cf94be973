//! Theme colors
//! Built-in palette, optionally overridden from the `[theme]` table in config.toml

use ratatui::style::Color;
use std::collections::HashMap;

/// Theme colors for the UI
#[derive(Debug, Clone)]
pub struct Theme {
    pub accent: Color,       // Active borders, highlights
    pub danger: Color,       // Errors
    pub success: Color,      // Confirmed name
    pub warning: Color,      // Status messages
    pub text: Color,         // Primary text
    pub text_dim: Color,     // Hints, secondary text
    pub inactive: Color,     // Inactive borders
    pub header: Color,       // Section headers
}

impl Default for Theme {
    fn default() -> Self {
        // Catppuccin-inspired
        Self {
            accent: Color::Rgb(250, 179, 135),
            danger: Color::Rgb(243, 139, 168),
            success: Color::Rgb(166, 218, 149),
            warning: Color::Rgb(249, 226, 175),
            text: Color::Rgb(205, 214, 244),
            text_dim: Color::Rgb(147, 153, 178),
            inactive: Color::Rgb(88, 91, 112),
            header: Color::Rgb(137, 180, 250),
        }
    }
}

impl Theme {
    /// Apply `name = "#RRGGBB"` overrides on top of the defaults.
    /// Unknown names and bad colors are skipped with a warning.
    pub fn from_overrides(overrides: &HashMap<String, String>) -> Self {
        let mut theme = Self::default();

        for (name, value) in overrides {
            let Some(color) = Self::parse_hex_color(value) else {
                tracing::warn!("Ignoring theme color '{}': bad value '{}'", name, value);
                continue;
            };

            let slot = match name.as_str() {
                "accent" => &mut theme.accent,
                "danger" => &mut theme.danger,
                "success" => &mut theme.success,
                "warning" => &mut theme.warning,
                "text" => &mut theme.text,
                "text_dim" => &mut theme.text_dim,
                "inactive" => &mut theme.inactive,
                "header" => &mut theme.header,
                _ => {
                    tracing::warn!("Ignoring unknown theme color '{}'", name);
                    continue;
                }
            };
            *slot = color;
        }

        theme
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(Theme::parse_hex_color("#FFC107"), Some(Color::Rgb(255, 193, 7)));
        assert_eq!(Theme::parse_hex_color("fff"), Some(Color::Rgb(255, 255, 255)));
        assert_eq!(Theme::parse_hex_color("#12345"), None);
        assert_eq!(Theme::parse_hex_color("#zzzzzz"), None);
    }

    #[test]
    fn test_overrides_apply_known_names_only() {
        let mut overrides = HashMap::new();
        overrides.insert("accent".to_string(), "#000000".to_string());
        overrides.insert("sparkle".to_string(), "#FFFFFF".to_string());
        overrides.insert("danger".to_string(), "red".to_string());

        let theme = Theme::from_overrides(&overrides);
        assert_eq!(theme.accent, Color::Rgb(0, 0, 0));
        assert_eq!(theme.danger, Theme::default().danger);
    }
}
