//! Reusable UI widgets
//!
//! Contains common UI components used across multiple tabs:
//! - Popup dialogs (confirmation, error)
//! - Toasts with an undo countdown
//! - Status bar

use crate::app::{Toast, ToastKind};
use crate::ui::Theme;
use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

/// Render a centered popup dialog
pub fn render_popup(
    frame: &mut Frame,
    title: &str,
    content: Vec<Line>,
    buttons: &[(&str, char)], // (label, key)
    theme: &Theme,
    area: Rect,
) {
    let popup_width = 56.min(area.width.saturating_sub(4));
    let popup_height = (content.len() as u16 + 6).min(area.height.saturating_sub(4));

    let popup_area = centered_rect(popup_width, popup_height, area);

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .title(format!(" {} ", title))
        .title_style(theme.title())
        .borders(Borders::ALL)
        .border_style(theme.border_focused())
        .style(theme.text());

    frame.render_widget(block, popup_area);

    let inner = Rect {
        x: popup_area.x + 2,
        y: popup_area.y + 1,
        width: popup_area.width.saturating_sub(4),
        height: popup_area.height.saturating_sub(4),
    };

    let content_widget = Paragraph::new(content)
        .style(theme.text())
        .wrap(Wrap { trim: false });
    frame.render_widget(content_widget, inner);

    if !buttons.is_empty() {
        let button_area = Rect {
            x: popup_area.x + 2,
            y: popup_area.y + popup_area.height.saturating_sub(2),
            width: popup_area.width.saturating_sub(4),
            height: 1,
        };

        let button_spans: Vec<Span> = buttons
            .iter()
            .enumerate()
            .flat_map(|(i, (label, key))| {
                let mut spans = vec![
                    Span::styled("[", theme.text_dim()),
                    Span::styled(
                        key.to_string(),
                        Style::default()
                            .fg(theme.accent)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::styled("] ", theme.text_dim()),
                    Span::styled(*label, theme.text()),
                ];
                if i < buttons.len() - 1 {
                    spans.push(Span::raw("    "));
                }
                spans
            })
            .collect();

        let buttons_widget = Paragraph::new(Line::from(button_spans))
            .alignment(Alignment::Center);
        frame.render_widget(buttons_widget, button_area);
    }
}

/// Render a confirmation popup with Yes/No buttons
pub fn render_confirm_popup(
    frame: &mut Frame,
    title: &str,
    message: &str,
    theme: &Theme,
    area: Rect,
) {
    let mut content = vec![Line::raw("")];
    content.extend(message.lines().map(|line| Line::raw(line.to_string())));
    content.push(Line::raw(""));

    render_popup(
        frame,
        title,
        content,
        &[("Yes", 'y'), ("Cancel", 'n')],
        theme,
        area,
    );
}

/// Render an error popup
pub fn render_error_popup(
    frame: &mut Frame,
    title: &str,
    message: &str,
    theme: &Theme,
    area: Rect,
) {
    let content = vec![
        Line::raw(""),
        Line::styled(message, theme.error()),
        Line::raw(""),
    ];

    render_popup(frame, title, content, &[("OK", 'o')], theme, area);
}

/// Bar of `width` cells, filled in proportion to the time left
pub fn countdown_bar(remaining_ms: u64, total_ms: u64, width: usize) -> String {
    let filled = if total_ms == 0 {
        0
    } else {
        ((remaining_ms.min(total_ms) as u128 * width as u128).div_ceil(total_ms as u128)) as usize
    };
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

/// Whole seconds left, rounded up so "0s" only shows at the deadline
pub fn seconds_left(remaining_ms: u64) -> u64 {
    remaining_ms.div_ceil(1000)
}

/// Render a toast in the bottom-right corner, above the status bar.
///
/// Undo toasts get a countdown bar fed from the pending action's remaining
/// time; `remaining` is `None` for other toasts.
pub fn render_toast(
    frame: &mut Frame,
    toast: &Toast,
    remaining: Option<(u64, u64)>,
    theme: &Theme,
    area: Rect,
) {
    let (accent, icon) = match toast.kind {
        ToastKind::Success => (theme.success(), "✓"),
        ToastKind::Error => (theme.error(), "✗"),
        ToastKind::Undo => (theme.warning(), "⏳"),
    };

    let width = 48.min(area.width.saturating_sub(2));
    let text_width = width.saturating_sub(4).max(1) as usize;

    let mut lines = Vec::new();
    if let Some(title) = &toast.title {
        lines.push(Line::from(vec![
            Span::styled(format!("{} ", icon), accent),
            Span::styled(title.clone(), accent.add_modifier(Modifier::BOLD)),
        ]));
    }
    lines.push(Line::styled(toast.message.clone(), theme.text()));

    if let Some((remaining_ms, total_ms)) = remaining {
        let bar_width = text_width.saturating_sub(10).max(1);
        lines.push(Line::from(vec![
            Span::styled(countdown_bar(remaining_ms, total_ms, bar_width), accent),
            Span::raw(format!("  {}s ", seconds_left(remaining_ms))),
            Span::styled("[u] Undo", theme.title()),
        ]));
    }

    // Rough wrap estimate for the message line
    let message_rows = (toast.message.chars().count() / text_width) as u16 + 1;
    let height = (lines.len() as u16 + message_rows + 1).min(area.height.saturating_sub(2));

    let toast_area = Rect {
        x: area.x + area.width.saturating_sub(width + 1),
        y: area.y + area.height.saturating_sub(height + 1),
        width,
        height,
    };

    frame.render_widget(Clear, toast_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(accent)
        .style(theme.text());
    let widget = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(widget, toast_area);
}

/// Render status bar at bottom
pub fn render_status_bar(
    frame: &mut Frame,
    left_content: &str,
    right_content: &str,
    theme: &Theme,
    area: Rect,
) {
    let status_area = Rect {
        x: area.x,
        y: area.y + area.height.saturating_sub(1),
        width: area.width,
        height: 1,
    };

    frame.render_widget(Clear, status_area);

    let left_widget = Paragraph::new(left_content).style(theme.text_dim());

    let right_len = right_content.chars().count() as u16;
    let right_area = Rect {
        x: status_area.x + status_area.width.saturating_sub(right_len + 1),
        y: status_area.y,
        width: (right_len + 1).min(status_area.width),
        height: 1,
    };
    let right_widget = Paragraph::new(right_content).style(theme.text_dim());

    frame.render_widget(left_widget, status_area);
    frame.render_widget(right_widget, right_area);
}

/// Helper: Create a centered rect of given size
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect { x, y, width, height }
}
