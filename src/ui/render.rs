//! Main rendering module
//!
//! Handles rendering the complete UI including:
//! - Header with backend, signed-in admin and tab bar
//! - KPI line for the active list
//! - Active tab content
//! - Popups, toasts and the status bar

use crate::app::{App, PopupState, RowState, ToastKind, SETTINGS_COUNT};
use crate::list::{ListRow, ListView};
use crate::types::{format_date, ResourceKind, Tab};
use crate::ui::widgets;
use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Cell, List, ListItem, Paragraph, Row, Table, Tabs},
    Frame,
};

/// Main render function - entry point for all UI rendering
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let layout = Layout::vertical([
        Constraint::Length(3), // Header + tabs
        Constraint::Length(1), // KPIs
        Constraint::Min(8),    // Content
        Constraint::Length(1), // Status bar
    ])
    .split(area);

    render_header(frame, app, layout[0]);
    render_kpis(frame, app, layout[1]);
    render_tab_content(frame, app, layout[2]);
    render_status_bar(frame, app, layout[3]);

    render_overlays(frame, app, area);
}

/// Render header with backend and tab bar
fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;

    let who = app
        .session
        .as_ref()
        .map(|s| s.display_name().to_string())
        .unwrap_or_else(|| "not signed in".into());

    let header_block = Block::default()
        .style(theme.block_style())
        .title(format!(" DailySpark Admin · {} · {} ", app.api_base, who))
        .title_style(theme.title())
        .borders(Borders::BOTTOM)
        .border_style(theme.border());

    frame.render_widget(header_block, area);

    let tab_titles: Vec<Line> = Tab::all()
        .iter()
        .enumerate()
        .map(|(i, tab)| {
            let style = if app.active_tab == *tab {
                theme.tab_active()
            } else {
                theme.tab_inactive()
            };
            Line::styled(format!("[{}] {}", i + 1, tab.label()), style)
        })
        .collect();

    let tabs = Tabs::new(tab_titles)
        .select(app.active_tab.index())
        .divider(" │ ")
        .style(theme.text());

    let tabs_area = Rect {
        x: area.x + 2,
        y: area.y + 1,
        width: area.width.saturating_sub(4),
        height: 1,
    };
    frame.render_widget(tabs, tabs_area);
}

fn render_kpis(frame: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let mut spans = vec![Span::raw("  ")];
    for (label, value) in app.kpis() {
        spans.push(Span::styled(format!("{} ", label), theme.text_dim()));
        spans.push(Span::styled(value, theme.title()));
        spans.push(Span::raw("   "));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)).style(theme.text()), area);
}

/// Render the active tab's content
fn render_tab_content(frame: &mut Frame, app: &App, area: Rect) {
    match app.active_tab {
        Tab::Users => render_users_tab(frame, app, area),
        Tab::Audiences => render_audiences_tab(frame, app, area),
        Tab::Notifications => render_notifications_tab(frame, app, area),
        Tab::Surveys => render_surveys_tab(frame, app, area),
        Tab::Feedbacks => render_feedbacks_tab(frame, app, area),
        Tab::Settings => render_settings_tab(frame, app, area),
    }
}

/// Render status bar with keybindings
fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;

    let hints = if app.filter_input {
        "Type to filter  [Enter] Done  [Esc] Clear"
    } else {
        match app.active_tab {
            Tab::Users => "[j/k] Move  [n/p] Page  [/] Filter  [f] Role  [s] Status  [d] Delete  [u] Undo  [q] Quit",
            Tab::Audiences => "[Space] Select  [a] Page  [D] Delete selected  [d] Delete  [u] Undo  [q] Quit",
            Tab::Notifications => "[j/k] Move  [/] Filter  [f] Status  [c] Channel  [R] Resend  [d] Delete  [u] Undo  [q] Quit",
            Tab::Surveys => "[j/k] Move  [f] Status  [P] Publish  [A] Archive  [d] Delete  [u] Undo  [q] Quit",
            Tab::Feedbacks => "[j/k] Move  [n/p] Page  [/] Search  [f] Rating  [r] Reload  [q] Quit",
            Tab::Settings => "[j/k] Navigate  [Enter] Change  [q] Quit",
        }
    };

    let pending = app.deferred.pending_count();
    let right = if pending > 0 {
        format!("{} pending delete(s)", pending)
    } else {
        String::new()
    };

    widgets::render_status_bar(frame, hints, &right, theme, area);
}

/// Render popups and the toast if active
fn render_overlays(frame: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;

    if let Some(toast) = &app.toast {
        let remaining = match (&toast.kind, &toast.action) {
            (ToastKind::Undo, Some(binding)) => app
                .deferred
                .remaining_ms(&binding.target)
                .map(|ms| (ms, app.config.undo.delay_ms)),
            _ => None,
        };
        // Leave the status bar visible
        let toast_area = Rect {
            height: area.height.saturating_sub(1),
            ..area
        };
        widgets::render_toast(frame, toast, remaining, theme, toast_area);
    }

    match &app.popup {
        PopupState::None => {}
        PopupState::Confirm { title, message, .. } => {
            widgets::render_confirm_popup(frame, title, message, theme, area);
        }
        PopupState::Error { title, message } => {
            widgets::render_error_popup(frame, title, message, theme, area);
        }
    }
}

// === LIST TABS ===

/// Columns of one list table
struct TableColumns<'a> {
    title: &'a str,
    facet_label: &'a str,
    secondary_label: &'a str,
    headers: &'a [&'a str],
    widths: &'a [Constraint],
    selectable: bool,
}

/// Shared frame for every list tab: filter line, table, pager.
///
/// Pending rows are dimmed and carry their countdown in the last column.
fn render_list<T: ListRow>(
    frame: &mut Frame,
    app: &App,
    kind: ResourceKind,
    view: &ListView<T>,
    columns: &TableColumns,
    cells: impl Fn(&T) -> Vec<Cell<'static>>,
    area: Rect,
) {
    let theme = &app.theme;

    let block = Block::default()
        .style(theme.block_style())
        .title(format!(" {} ({}) ", columns.title, view.filtered().len()))
        .title_style(theme.title())
        .borders(Borders::ALL)
        .border_style(theme.border_focused());

    let inner = block.inner(area);
    frame.render_widget(block, area);

    // Filter line
    let cursor = if app.filter_input { "_" } else { "" };
    let mut filter_spans = vec![
        Span::styled("Filter: ", theme.text_dim()),
        Span::styled(format!("{}{}", view.filter, cursor), theme.text()),
    ];
    if view.has_facets() {
        filter_spans.push(Span::styled(format!("   {}: ", columns.facet_label), theme.text_dim()));
        filter_spans.push(Span::styled(
            view.active_facet().unwrap_or("ALL"),
            Style::default().fg(theme.accent_dim),
        ));
    }
    if view.has_secondary() {
        filter_spans.push(Span::styled(format!("   {}: ", columns.secondary_label), theme.text_dim()));
        filter_spans.push(Span::styled(
            view.active_secondary().unwrap_or("ALL"),
            Style::default().fg(theme.accent_dim),
        ));
    }
    if columns.selectable && !view.selected.is_empty() {
        filter_spans.push(Span::styled(
            format!("   {} selected", view.selected.len()),
            theme.warning(),
        ));
    }
    let filter_area = Rect { height: 1, ..inner };
    frame.render_widget(Paragraph::new(Line::from(filter_spans)), filter_area);

    let table_area = Rect {
        x: inner.x,
        y: inner.y + 2,
        width: inner.width,
        height: inner.height.saturating_sub(3),
    };

    if let Some(error) = &view.error {
        let msg = Paragraph::new(error.as_str())
            .style(theme.error())
            .alignment(Alignment::Center);
        frame.render_widget(msg, table_area);
        return;
    }

    let page_rows = view.page_rows();
    if page_rows.is_empty() {
        let empty_msg = Paragraph::new("Nothing to show")
            .style(theme.text_dim())
            .alignment(Alignment::Center);
        frame.render_widget(empty_msg, table_area);
        return;
    }

    let mut header_cells = vec![Cell::from("")];
    header_cells.extend(columns.headers.iter().map(|h| Cell::from(*h).style(theme.title())));
    header_cells.push(Cell::from(""));
    let header = Row::new(header_cells);

    let rows: Vec<Row> = page_rows
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            let marker = if !columns.selectable {
                " "
            } else if view.selected.contains(row.id()) {
                "■"
            } else {
                "□"
            };

            let (state_cell, base_style) = match app.row_state(kind, row.id()) {
                RowState::Idle => (Cell::from(""), theme.text()),
                RowState::Pending { remaining_ms } => (
                    Cell::from(format!(
                        "deleting in {}s",
                        widgets::seconds_left(remaining_ms)
                    ))
                    .style(theme.pending_badge()),
                    theme.pending_row(),
                ),
                RowState::Deleting => (
                    Cell::from("deleting…").style(theme.pending_badge()),
                    theme.pending_row(),
                ),
            };

            let style = if i == view.cursor() {
                base_style.patch(theme.selected())
            } else {
                base_style
            };

            let mut all = vec![Cell::from(marker)];
            all.extend(cells(row));
            all.push(state_cell);
            Row::new(all).style(style)
        })
        .collect();

    let mut widths = vec![Constraint::Length(2)];
    widths.extend_from_slice(columns.widths);
    widths.push(Constraint::Length(16));

    let table = Table::new(rows, widths).header(header);
    frame.render_widget(table, table_area);

    let pager_area = Rect {
        x: inner.x,
        y: inner.y + inner.height.saturating_sub(1),
        width: inner.width,
        height: 1,
    };
    let position = match view.paging() {
        Some(paging) => format!("Page {} / {} · {} total", paging.page, paging.total_pages, paging.total),
        None => format!("Page {} / {}", view.page() + 1, view.total_pages()),
    };
    let pager = Paragraph::new(position)
        .style(theme.text_dim())
        .alignment(Alignment::Right);
    frame.render_widget(pager, pager_area);
}

fn render_users_tab(frame: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let toggling = &app.toggling;
    let columns = TableColumns {
        title: "Users",
        facet_label: "Role",
        secondary_label: "",
        headers: &["NAME", "EMAIL", "ROLE", "JOINED", "STATUS"],
        widths: &[
            Constraint::Percentage(22),
            Constraint::Percentage(30),
            Constraint::Length(7),
            Constraint::Length(16),
            Constraint::Length(10),
        ],
        selectable: false,
    };

    render_list(
        frame,
        app,
        ResourceKind::User,
        &app.users,
        &columns,
        |u| {
            let status = if toggling.contains(&u.id) {
                Cell::from("saving…").style(theme.text_dim())
            } else {
                Cell::from(u.status_label()).style(theme.status(if u.active { "ACTIVE" } else { "" }))
            };
            vec![
                Cell::from(u.name.clone()),
                Cell::from(u.email.clone()),
                Cell::from(u.role.clone()),
                Cell::from(format_date(u.created_at.as_ref())),
                status,
            ]
        },
        area,
    );
}

fn render_audiences_tab(frame: &mut Frame, app: &App, area: Rect) {
    let columns = TableColumns {
        title: "Audiences",
        facet_label: "",
        secondary_label: "",
        headers: &["NAME", "DESCRIPTION", "USERS", "CREATED"],
        widths: &[
            Constraint::Percentage(25),
            Constraint::Percentage(40),
            Constraint::Length(7),
            Constraint::Length(16),
        ],
        selectable: true,
    };

    render_list(
        frame,
        app,
        ResourceKind::Audience,
        &app.audiences,
        &columns,
        |a| {
            vec![
                Cell::from(a.name.clone()),
                Cell::from(a.description.clone()),
                Cell::from(a.user_count.to_string()),
                Cell::from(format_date(a.created_at.as_ref())),
            ]
        },
        area,
    );
}

fn render_notifications_tab(frame: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let columns = TableColumns {
        title: "Notifications",
        facet_label: "Status",
        secondary_label: "Channel",
        headers: &["TITLE", "SEGMENT", "STATUS", "WHEN", "SENT", "DELIV", "OPENS"],
        widths: &[
            Constraint::Percentage(28),
            Constraint::Percentage(16),
            Constraint::Length(10),
            Constraint::Length(15),
            Constraint::Length(6),
            Constraint::Length(6),
            Constraint::Length(6),
        ],
        selectable: false,
    };

    render_list(
        frame,
        app,
        ResourceKind::Notification,
        &app.notifications,
        &columns,
        |n| {
            let when = n.sent_at.as_ref().or(n.scheduled_at.as_ref()).or(n.created_at.as_ref());
            vec![
                Cell::from(n.title.clone()),
                Cell::from(n.segment_name.clone()),
                Cell::from(n.status.as_str()).style(theme.status(n.status.as_str())),
                Cell::from(format_date(when)),
                Cell::from(n.sent_count.to_string()),
                Cell::from(n.delivered_count.to_string()),
                Cell::from(n.open_count.to_string()),
            ]
        },
        area,
    );
}

fn render_surveys_tab(frame: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let columns = TableColumns {
        title: "Surveys",
        facet_label: "Status",
        secondary_label: "",
        headers: &["TITLE", "AUDIENCE", "STATUS", "QUESTIONS", "RESPONSES", "PUBLISHED"],
        widths: &[
            Constraint::Percentage(30),
            Constraint::Percentage(18),
            Constraint::Length(9),
            Constraint::Length(9),
            Constraint::Length(9),
            Constraint::Length(15),
        ],
        selectable: false,
    };

    render_list(
        frame,
        app,
        ResourceKind::Survey,
        &app.surveys,
        &columns,
        |s| {
            let status = s.status.as_str().to_string();
            vec![
                Cell::from(s.title.clone()),
                Cell::from(s.audience_name.clone()),
                Cell::from(status.clone()).style(theme.status(&status)),
                Cell::from(s.question_count.to_string()),
                Cell::from(s.total_responses.to_string()),
                Cell::from(format_date(s.published_at.as_ref())),
            ]
        },
        area,
    );
}

fn render_feedbacks_tab(frame: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let columns = TableColumns {
        title: "Feedbacks",
        facet_label: "Rating",
        secondary_label: "",
        headers: &["NOTE", "RATING", "USER", "CREATED"],
        widths: &[
            Constraint::Percentage(50),
            Constraint::Length(7),
            Constraint::Percentage(25),
            Constraint::Length(16),
        ],
        selectable: false,
    };

    render_list(
        frame,
        app,
        ResourceKind::Feedback,
        &app.feedbacks,
        &columns,
        |f| {
            let rating = f.rating.map(|r| format!("{}/5", r)).unwrap_or_else(|| "-".into());
            let who = f
                .user_name
                .clone()
                .or_else(|| f.user_email.clone())
                .unwrap_or_else(|| "-".into());
            vec![
                Cell::from(f.note_preview.clone()),
                Cell::from(rating).style(theme.text_dim()),
                Cell::from(who),
                Cell::from(format_date(f.created_at.as_ref())),
            ]
        },
        area,
    );
}

/// Settings tab
fn render_settings_tab(frame: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;

    let block = Block::default()
        .style(theme.block_style())
        .title(" Settings ")
        .title_style(theme.title())
        .borders(Borders::ALL)
        .border_style(theme.border_focused());

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let delay = format!("{}s", app.config.undo.delay_ms as f64 / 1000.0);
    let settings: [(&str, &str); SETTINGS_COUNT] = [
        ("Theme", app.config.theme.as_str()),
        ("Undo window", &delay),
        ("Pending deletes", app.config.undo.policy.as_str()),
    ];

    let items: Vec<ListItem> = settings
        .iter()
        .enumerate()
        .map(|(i, (label, value))| {
            let style = if i == app.settings_selected {
                theme.selected()
            } else {
                theme.text()
            };

            ListItem::new(Line::from(vec![
                Span::styled(format!("{:<24}", label), style),
                Span::styled(format!("[{}]", value), Style::default().fg(theme.accent)),
            ]))
        })
        .collect();

    frame.render_widget(List::new(items), inner);

    let log_path = crate::logging::log_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "Unknown".into());

    let info = vec![
        Line::styled(format!("Backend: {}", app.api_base), theme.text_dim()),
        Line::styled(format!("Config:  {}", app.config_path.display()), theme.text_dim()),
        Line::styled(format!("Log:     {}", log_path), theme.text_dim()),
    ];
    let info_area = Rect {
        x: inner.x,
        y: inner.y + inner.height.saturating_sub(info.len() as u16 + 1),
        width: inner.width,
        height: info.len() as u16,
    };
    frame.render_widget(Paragraph::new(info), info_area);
}
