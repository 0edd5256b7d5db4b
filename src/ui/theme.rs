//! Theme definitions for dailyspark-admin
//!
//! Provides three built-in themes: Gruvbox, Nord, and Transparent.
//! Each theme defines colors for all UI elements.

use crate::config::ThemeName;
use ratatui::style::{Color, Modifier, Style};

/// Complete theme with all required colors
#[derive(Debug, Clone)]
pub struct Theme {
    // Base colors
    pub bg: Color,
    pub fg: Color,
    pub fg_dim: Color,

    // Accent colors
    pub accent: Color,
    pub accent_dim: Color,

    // Status colors
    pub success: Color,
    pub warning: Color,
    pub error: Color,

    // UI element colors
    pub border: Color,
    pub border_focused: Color,
    pub selection_bg: Color,
    pub selection_fg: Color,

    // Row treatments
    pub pending: Color,
    pub info: Color,
}

impl Theme {
    /// Create a theme from a theme name
    pub fn from_name(name: ThemeName) -> Self {
        match name {
            ThemeName::Gruvbox => Self::gruvbox(),
            ThemeName::Nord => Self::nord(),
            ThemeName::Transparent => Self::transparent(),
        }
    }

    /// Gruvbox dark theme (default)
    pub fn gruvbox() -> Self {
        Self {
            bg: Color::Rgb(40, 40, 40),                 // #282828
            fg: Color::Rgb(235, 219, 178),              // #ebdbb2
            fg_dim: Color::Rgb(146, 131, 116),          // #928374
            accent: Color::Rgb(254, 128, 25),           // #fe8019
            accent_dim: Color::Rgb(214, 93, 14),        // #d65d0e
            success: Color::Rgb(184, 187, 38),          // #b8bb26
            warning: Color::Rgb(250, 189, 47),          // #fabd2f
            error: Color::Rgb(251, 73, 52),             // #fb4934
            border: Color::Rgb(80, 73, 69),             // #504945
            border_focused: Color::Rgb(168, 153, 132),  // #a89984
            selection_bg: Color::Rgb(80, 73, 69),       // #504945
            selection_fg: Color::Rgb(235, 219, 178),    // #ebdbb2
            pending: Color::Rgb(204, 36, 29),           // #cc241d
            info: Color::Rgb(131, 165, 152),            // #83a598
        }
    }

    /// Nord theme
    pub fn nord() -> Self {
        Self {
            // Polar Night
            bg: Color::Rgb(46, 52, 64),                 // #2e3440
            fg: Color::Rgb(236, 239, 244),              // #eceff4
            fg_dim: Color::Rgb(76, 86, 106),            // #4c566a
            // Frost
            accent: Color::Rgb(136, 192, 208),          // #88c0d0
            accent_dim: Color::Rgb(94, 129, 172),       // #5e81ac
            // Aurora
            success: Color::Rgb(163, 190, 140),         // #a3be8c
            warning: Color::Rgb(235, 203, 139),         // #ebcb8b
            error: Color::Rgb(191, 97, 106),            // #bf616a
            border: Color::Rgb(59, 66, 82),             // #3b4252
            border_focused: Color::Rgb(136, 192, 208),  // #88c0d0
            selection_bg: Color::Rgb(76, 86, 106),      // #4c566a
            selection_fg: Color::Rgb(236, 239, 244),    // #eceff4
            pending: Color::Rgb(208, 135, 112),         // #d08770
            info: Color::Rgb(129, 161, 193),            // #81a1c1
        }
    }

    /// Transparent theme (uses terminal colors)
    pub fn transparent() -> Self {
        Self {
            bg: Color::Reset,
            fg: Color::Reset,
            fg_dim: Color::DarkGray,
            accent: Color::Cyan,
            accent_dim: Color::Blue,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            border: Color::DarkGray,
            border_focused: Color::Cyan,
            selection_bg: Color::DarkGray,
            selection_fg: Color::White,
            pending: Color::LightRed,
            info: Color::Blue,
        }
    }

    /// Background for bordered blocks
    pub fn block_style(&self) -> Style {
        Style::default().bg(self.bg)
    }

    /// Default text style
    pub fn text(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bg)
    }

    /// Dimmed text style
    pub fn text_dim(&self) -> Style {
        Style::default().fg(self.fg_dim).bg(self.bg)
    }

    /// Title/header style
    pub fn title(&self) -> Style {
        Style::default()
            .fg(self.accent)
            .bg(self.bg)
            .add_modifier(Modifier::BOLD)
    }

    /// Selected item style
    pub fn selected(&self) -> Style {
        Style::default()
            .fg(self.selection_fg)
            .bg(self.selection_bg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn border(&self) -> Style {
        Style::default().fg(self.border).bg(self.bg)
    }

    pub fn border_focused(&self) -> Style {
        Style::default().fg(self.border_focused).bg(self.bg)
    }

    pub fn tab_inactive(&self) -> Style {
        Style::default().fg(self.fg_dim).bg(self.bg)
    }

    pub fn tab_active(&self) -> Style {
        Style::default()
            .fg(self.accent)
            .bg(self.bg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn success(&self) -> Style {
        Style::default().fg(self.success).bg(self.bg)
    }

    pub fn warning(&self) -> Style {
        Style::default().fg(self.warning).bg(self.bg)
    }

    pub fn error(&self) -> Style {
        Style::default().fg(self.error).bg(self.bg)
    }

    /// Row waiting out its undo window
    pub fn pending_row(&self) -> Style {
        Style::default()
            .fg(self.fg_dim)
            .bg(self.bg)
            .add_modifier(Modifier::CROSSED_OUT)
    }

    /// Countdown next to a pending row
    pub fn pending_badge(&self) -> Style {
        Style::default()
            .fg(self.pending)
            .bg(self.bg)
            .add_modifier(Modifier::BOLD)
    }

    /// Colour a status label the way the web dashboard does
    pub fn status(&self, label: &str) -> Style {
        let color = match label {
            "ACTIVE" | "SENT" => self.success,
            "SCHEDULED" => self.info,
            "FAILED" => self.error,
            "DRAFT" => self.warning,
            _ => self.fg_dim,
        };
        Style::default().fg(color).bg(self.bg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_from_name() {
        let gruvbox = Theme::from_name(ThemeName::Gruvbox);
        assert_eq!(gruvbox.bg, Color::Rgb(40, 40, 40));

        let nord = Theme::from_name(ThemeName::Nord);
        assert_eq!(nord.bg, Color::Rgb(46, 52, 64));

        let transparent = Theme::from_name(ThemeName::Transparent);
        assert_eq!(transparent.bg, Color::Reset);
    }

    #[test]
    fn test_status_colors() {
        let theme = Theme::gruvbox();
        assert_eq!(theme.status("ACTIVE").fg, Some(theme.success));
        assert_eq!(theme.status("FAILED").fg, Some(theme.error));
        assert_eq!(theme.status("PASSIVE").fg, Some(theme.fg_dim));
    }
}
