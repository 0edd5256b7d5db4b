//! Application state and event handling
//!
//! This is the core of dailyspark-admin, managing:
//! - Application state across all tabs
//! - Event handling (keyboard input)
//! - Deferred deletes with undo, and the background jobs that commit them
//! - Toasts and popups

use crate::api::{AdminBackend, ApiError, FeedbackQuery, Session, UserQuery};
use crate::config::Config;
use crate::deferred::{ArmHandle, DeferredActions};
use crate::jobs::{Job, JobOutcome, JobRunner, RowAction};
use crate::list::{
    ListControl, ListView, FEEDBACK_FACETS, NOTIFICATION_CHANNELS, NOTIFICATION_FACETS,
    SURVEY_FACETS, USER_ROLE_FACETS,
};
use crate::types::{
    AudienceRow, FeedbackRow, NotificationRow, ResourceKind, RowKey, SurveyRow, SurveyStatus, Tab,
    UserRow,
};
use crate::ui::Theme;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Number of rows in the Settings tab
pub const SETTINGS_COUNT: usize = 3;

/// Main application state
pub struct App {
    // Core state
    pub should_quit: bool,
    pub active_tab: Tab,
    pub config: Config,
    pub config_path: PathBuf,
    pub theme: Theme,
    pub session: Option<Session>,
    pub api_base: String,

    // List screens
    pub users: ListView<UserRow>,
    pub audiences: ListView<AudienceRow>,
    pub notifications: ListView<NotificationRow>,
    pub surveys: ListView<SurveyRow>,
    pub feedbacks: ListView<FeedbackRow>,
    loaded: HashSet<ResourceKind>,

    // Deferred deletes
    pub deferred: DeferredActions<RowKey>,
    events_tx: Sender<DeferredEvent>,
    events_rx: Receiver<DeferredEvent>,
    jobs: JobRunner,
    /// Deletes committed and waiting for the backend
    pub in_flight: HashSet<RowKey>,
    /// Users whose status change is waiting for the backend
    pub toggling: HashSet<String>,

    // Input state
    pub filter_input: bool,
    pub settings_selected: usize,

    // Overlays
    pub popup: PopupState,
    pub toast: Option<Toast>,
}

/// Lifecycle notifications sent by deferred action callbacks
#[derive(Debug, Clone, PartialEq)]
enum DeferredEvent {
    Committed(RowKey),
    Cancelled(RowKey),
}

/// Popup overlay state
#[derive(Debug, Clone)]
pub enum PopupState {
    None,
    Confirm {
        title: String,
        message: String,
        action: ConfirmAction,
    },
    Error {
        title: String,
        message: String,
    },
}

/// Action run when a confirmation popup is accepted
#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmAction {
    BulkDelete {
        kind: ResourceKind,
        ids: Vec<String>,
    },
    Row {
        action: RowAction,
        id: String,
        title: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Undo,
}

/// Undo binding carried by the toast of a pending delete
#[derive(Debug, Clone, PartialEq)]
pub struct UndoBinding {
    pub target: RowKey,
    pub handle: ArmHandle,
}

/// Transient message shown above the status bar
#[derive(Debug, Clone)]
pub struct Toast {
    pub kind: ToastKind,
    pub title: Option<String>,
    pub message: String,
    pub action: Option<UndoBinding>,
    pub shown_at: Instant,
    /// None for undo toasts, which live as long as their pending action
    pub auto_dismiss: Option<Duration>,
}

/// How a row is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowState {
    Idle,
    Pending { remaining_ms: u64 },
    Deleting,
}

/// Application state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    FilterInput,
    ConfirmAction,
    ShowError,
}

impl App {
    /// Create a new App instance and load the first tab
    pub fn new(
        config: Config,
        config_path: PathBuf,
        session: Option<Session>,
        api_base: String,
        backend: Arc<dyn AdminBackend>,
    ) -> Self {
        let deferred = DeferredActions::new(config.undo.policy);
        let jobs = JobRunner::new(backend);
        let mut app = Self::assemble(config, config_path, session, api_base, deferred, jobs);
        app.ensure_loaded(app.active_tab);
        app
    }

    fn assemble(
        config: Config,
        config_path: PathBuf,
        session: Option<Session>,
        api_base: String,
        deferred: DeferredActions<RowKey>,
        jobs: JobRunner,
    ) -> Self {
        let theme = Theme::from_name(config.theme);
        let page_size = config.list.page_size;
        let (events_tx, events_rx) = mpsc::channel();

        Self {
            should_quit: false,
            active_tab: Tab::default(),
            config,
            config_path,
            theme,
            session,
            api_base,

            users: ListView::new(page_size, USER_ROLE_FACETS).server_paged(),
            audiences: ListView::new(page_size, &[]),
            notifications: ListView::new(page_size, NOTIFICATION_FACETS)
                .with_secondary(NOTIFICATION_CHANNELS),
            surveys: ListView::new(page_size, SURVEY_FACETS),
            feedbacks: ListView::new(page_size, FEEDBACK_FACETS),
            loaded: HashSet::new(),

            deferred,
            events_tx,
            events_rx,
            jobs,
            in_flight: HashSet::new(),
            toggling: HashSet::new(),

            filter_input: false,
            settings_selected: 0,

            popup: PopupState::None,
            toast: None,
        }
    }

    /// Get current app state
    pub fn state(&self) -> AppState {
        match &self.popup {
            PopupState::Confirm { .. } => AppState::ConfirmAction,
            PopupState::Error { .. } => AppState::ShowError,
            PopupState::None if self.filter_input => AppState::FilterInput,
            PopupState::None => AppState::Normal,
        }
    }

    /// Advance timers: toasts, deferred deadlines, finished jobs
    pub fn tick(&mut self) {
        let now = self.deferred.now();
        self.expire_toast(now);

        self.deferred.poll();
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_deferred_event(event);
        }

        for outcome in self.jobs.drain() {
            self.handle_outcome(outcome);
        }

        // An undo toast disappears with its pending action
        if let Some(binding) = self.toast.as_ref().and_then(|t| t.action.as_ref()) {
            if !self.deferred.is_pending(&binding.target) {
                self.toast = None;
            }
        }
    }

    /// Cancel everything still pending, then give deletes already sent to
    /// the backend up to `wait` to report back.
    ///
    /// Returns the rows whose delete outcome is still unknown.
    pub fn shutdown(&mut self, wait: Duration) -> Vec<String> {
        self.should_quit = true;
        let cancelled = self.deferred.cancel_all();
        if cancelled > 0 {
            info!(cancelled, "pending deletes cancelled on exit");
        }

        if self.jobs.running() > 0 {
            info!(running = self.jobs.running(), "waiting for running jobs");
            for outcome in self.jobs.wait_idle(wait) {
                self.handle_outcome(outcome);
            }
        }

        let mut unresolved: Vec<String> = self
            .in_flight
            .iter()
            .map(|key| format!("{} \"{}\"", key.kind.as_str().to_lowercase(), self.row_label(key)))
            .collect();
        unresolved.sort();
        for row in &unresolved {
            warn!(row = %row, "delete outcome unknown at exit");
        }
        unresolved
    }

    /// How a row should be drawn right now
    pub fn row_state(&self, kind: ResourceKind, id: &str) -> RowState {
        let key = RowKey::new(kind, id);
        if self.in_flight.contains(&key) {
            return RowState::Deleting;
        }
        match self.deferred.remaining_ms(&key) {
            Some(remaining_ms) => RowState::Pending { remaining_ms },
            None => RowState::Idle,
        }
    }

    /// Header figures for the active list
    pub fn kpis(&self) -> Vec<(&'static str, String)> {
        match self.active_tab {
            Tab::Users => {
                let active = self.users.rows.iter().filter(|u| u.active).count();
                let total = self.users.paging().map(|p| p.total).unwrap_or_default();
                vec![
                    ("Users", total.max(self.users.rows.len() as u64).to_string()),
                    ("On page", self.users.rows.len().to_string()),
                    ("Active", active.to_string()),
                ]
            }
            Tab::Audiences => {
                let reach: u64 = self.audiences.rows.iter().map(|a| a.user_count).sum();
                vec![
                    ("Audiences", self.audiences.rows.len().to_string()),
                    ("Reach", reach.to_string()),
                ]
            }
            Tab::Notifications => {
                let rows = &self.notifications.rows;
                vec![
                    ("Notifications", rows.len().to_string()),
                    ("Sent", rows.iter().map(|n| n.sent_count).sum::<u64>().to_string()),
                    ("Delivered", rows.iter().map(|n| n.delivered_count).sum::<u64>().to_string()),
                    ("Opens", rows.iter().map(|n| n.open_count).sum::<u64>().to_string()),
                ]
            }
            Tab::Surveys => {
                let rows = &self.surveys.rows;
                let active = rows.iter().filter(|s| s.status == SurveyStatus::Active).count();
                vec![
                    ("Surveys", rows.len().to_string()),
                    ("Active", active.to_string()),
                    ("Responses", rows.iter().map(|s| s.total_responses).sum::<u64>().to_string()),
                ]
            }
            Tab::Feedbacks => {
                let shown = self.feedbacks.filtered();
                let average = if shown.is_empty() {
                    "-".to_string()
                } else {
                    let sum: u64 = shown.iter().map(|f| u64::from(f.rating.unwrap_or(0))).sum();
                    format!("{:.1}", sum as f64 / shown.len() as f64)
                };
                vec![("Feedbacks", shown.len().to_string()), ("Avg rating", average)]
            }
            Tab::Settings => Vec::new(),
        }
    }

    /// Handle a key event
    pub fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        match self.state() {
            AppState::ConfirmAction => self.handle_confirm_key(key),
            AppState::ShowError => self.handle_error_key(key),
            AppState::FilterInput => self.handle_filter_key(key),
            AppState::Normal => self.handle_normal_key(key),
        }
    }

    /// Handle key in normal state
    fn handle_normal_key(&mut self, key: KeyEvent) -> Result<()> {
        // Global keys (work in all tabs)
        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                return Ok(());
            }
            KeyCode::Char('1') => return self.switch_tab(Tab::Users),
            KeyCode::Char('2') => return self.switch_tab(Tab::Audiences),
            KeyCode::Char('3') => return self.switch_tab(Tab::Notifications),
            KeyCode::Char('4') => return self.switch_tab(Tab::Surveys),
            KeyCode::Char('5') => return self.switch_tab(Tab::Feedbacks),
            KeyCode::Char('6') => return self.switch_tab(Tab::Settings),
            KeyCode::Tab => {
                let tabs = Tab::all();
                let next = tabs[(self.active_tab.index() + 1) % tabs.len()];
                return self.switch_tab(next);
            }
            KeyCode::BackTab => {
                let tabs = Tab::all();
                let prev = tabs[(self.active_tab.index() + tabs.len() - 1) % tabs.len()];
                return self.switch_tab(prev);
            }
            _ => {}
        }

        match self.active_tab.resource() {
            Some(kind) => self.handle_list_key(kind, key),
            None => self.handle_settings_key(key),
        }
    }

    fn switch_tab(&mut self, tab: Tab) -> Result<()> {
        self.active_tab = tab;
        self.ensure_loaded(tab);
        Ok(())
    }

    /// Keys shared by every list tab, then the tab's own actions
    fn handle_list_key(&mut self, kind: ResourceKind, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.list_mut(kind).move_down(),
            KeyCode::Char('k') | KeyCode::Up => self.list_mut(kind).move_up(),
            KeyCode::Char('g') => self.list_mut(kind).first(),
            KeyCode::Char('G') => self.list_mut(kind).last(),
            KeyCode::Char('n') | KeyCode::Right => {
                if self.list_mut(kind).next_page() {
                    self.reload(kind);
                }
            }
            KeyCode::Char('p') | KeyCode::Left => {
                if self.list_mut(kind).prev_page() {
                    self.reload(kind);
                }
            }
            KeyCode::Char('/') => self.filter_input = true,
            KeyCode::Char('f') => {
                self.list_mut(kind).cycle_facet();
                self.query_changed(kind);
            }
            KeyCode::Char('r') => self.reload(kind),
            KeyCode::Char('d') => self.arm_delete(kind),
            KeyCode::Char('u') => self.undo(kind),
            KeyCode::Esc => {
                if self.toast.as_ref().is_some_and(|t| t.action.is_none()) {
                    self.toast = None;
                } else {
                    self.list_mut(kind).clear_filter();
                    self.query_changed(kind);
                }
            }
            _ => match kind {
                ResourceKind::User => self.handle_users_key(key),
                ResourceKind::Audience => self.handle_audiences_key(key),
                ResourceKind::Notification => self.handle_notifications_key(key),
                ResourceKind::Survey => self.handle_surveys_key(key),
                ResourceKind::Feedback => {}
            },
        }
        Ok(())
    }

    fn handle_users_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('s') {
            self.toggle_user_status();
        }
    }

    fn handle_audiences_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char(' ') => {
                if self.current_target(ResourceKind::Audience).is_some() {
                    self.audiences.toggle_selected();
                }
            }
            KeyCode::Char('a') => self.audiences.toggle_select_page(),
            KeyCode::Char('c') => self.audiences.selected.clear(),
            KeyCode::Char('D') => self.prompt_bulk_delete(),
            _ => {}
        }
    }

    fn handle_notifications_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('R') => self.prompt_row_action(RowAction::Resend),
            KeyCode::Char('c') => self.notifications.cycle_secondary(),
            _ => {}
        }
    }

    fn handle_surveys_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('P') => self.prompt_row_action(RowAction::Publish),
            KeyCode::Char('A') => self.prompt_row_action(RowAction::Archive),
            _ => {}
        }
    }

    /// Handle keys while typing a filter
    fn handle_filter_key(&mut self, key: KeyEvent) -> Result<()> {
        let Some(kind) = self.active_tab.resource() else {
            self.filter_input = false;
            return Ok(());
        };

        match key.code {
            KeyCode::Enter => {
                self.filter_input = false;
                self.query_changed(kind);
            }
            KeyCode::Esc => {
                self.list_mut(kind).clear_filter();
                self.filter_input = false;
                self.query_changed(kind);
            }
            KeyCode::Backspace => self.list_mut(kind).pop_filter(),
            KeyCode::Char(c) => self.list_mut(kind).push_filter(c),
            _ => {}
        }
        Ok(())
    }

    /// Handle keys in Settings tab
    fn handle_settings_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                if self.settings_selected < SETTINGS_COUNT - 1 {
                    self.settings_selected += 1;
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.settings_selected = self.settings_selected.saturating_sub(1);
            }
            KeyCode::Enter => {
                match self.settings_selected {
                    0 => {
                        self.config.theme = self.config.theme.next();
                        self.theme = Theme::from_name(self.config.theme);
                    }
                    1 => self.config.undo.next_delay(),
                    2 => {
                        self.config.undo.policy = self.config.undo.policy.next();
                        self.deferred.set_policy(self.config.undo.policy);
                    }
                    _ => {}
                }
                match self.config.save_to(&self.config_path) {
                    Ok(()) => self.show_success(None, "Settings saved"),
                    Err(e) => self.show_error_popup("Save Failed", &format!("{:#}", e)),
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Handle keys in confirm popup
    fn handle_confirm_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                let popup = std::mem::replace(&mut self.popup, PopupState::None);
                if let PopupState::Confirm { action, .. } = popup {
                    self.execute_confirmed(action);
                }
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.popup = PopupState::None;
            }
            _ => {}
        }
        Ok(())
    }

    /// Handle keys in error popup
    fn handle_error_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Char('o') | KeyCode::Enter | KeyCode::Esc => {
                self.popup = PopupState::None;
            }
            _ => {}
        }
        Ok(())
    }

    // === LOADING ===

    fn ensure_loaded(&mut self, tab: Tab) {
        if let Some(kind) = tab.resource() {
            if !self.loaded.contains(&kind) {
                self.reload(kind);
            }
        }
    }

    /// Fetch a list again from the backend
    pub fn reload(&mut self, kind: ResourceKind) {
        self.loaded.insert(kind);
        let backend = Arc::clone(self.jobs.backend());

        let result = match kind {
            ResourceKind::User => {
                let query = self.user_query();
                backend.list_users(&query).map(|page| {
                    let count = page.rows.len();
                    self.users.set_server_page(page.rows, page.total, page.total_pages);
                    count
                })
            }
            ResourceKind::Audience => backend.list_audiences().map(|rows| {
                let count = rows.len();
                self.audiences.set_rows(rows);
                count
            }),
            ResourceKind::Notification => backend.list_notifications().map(|rows| {
                let count = rows.len();
                self.notifications.set_rows(rows);
                count
            }),
            ResourceKind::Survey => backend.list_surveys().map(|rows| {
                let count = rows.len();
                self.surveys.set_rows(rows);
                count
            }),
            ResourceKind::Feedback => {
                let query = FeedbackQuery {
                    search: non_empty(&self.feedbacks.filter),
                    rating: self.feedbacks.active_facet().and_then(|r| r.parse().ok()),
                };
                backend.list_feedbacks(&query).map(|rows| {
                    let count = rows.len();
                    self.feedbacks.set_rows(rows);
                    count
                })
            }
        };

        match result {
            Ok(count) => info!(kind = kind.as_str(), count, "list loaded"),
            Err(e) => {
                error!(kind = kind.as_str(), error = %e, "list load failed");
                self.list_mut(kind).set_error(e.to_string());
                self.show_error_toast("Could not load list", &e);
            }
        }
    }

    /// Server query for the users page currently shown
    fn user_query(&self) -> UserQuery {
        UserQuery {
            page: self.users.paging().map(|p| p.page).unwrap_or(1),
            limit: u32::try_from(self.config.list.page_size).unwrap_or(u32::MAX),
            search: non_empty(&self.users.filter),
            role: self.users.active_facet().map(str::to_string),
        }
    }

    /// Refetch from the first page when search or facet go to the server
    fn query_changed(&mut self, kind: ResourceKind) {
        if kind.server_filtered() {
            self.list_mut(kind).rewind();
            self.reload(kind);
        }
    }

    // === DEFERRED DELETE ===

    /// Arm a delete for the row under the cursor and show the undo toast
    fn arm_delete(&mut self, kind: ResourceKind) {
        if !kind.deletable() {
            self.show_error(None, &format!("{} entries cannot be deleted", kind.as_str()));
            return;
        }
        let Some((id, label)) = self.current_target(kind) else {
            return;
        };
        let key = RowKey::new(kind, id);

        if self.in_flight.contains(&key) {
            self.show_error(None, "This row is already being deleted");
            return;
        }

        let delay = match self.config.undo_delay() {
            Ok(delay) => delay,
            Err(e) => {
                self.show_error_popup("Invalid configuration", &format!("{:#}", e));
                return;
            }
        };

        let commit_tx = self.events_tx.clone();
        let cancel_tx = self.events_tx.clone();
        let handle = self.deferred.arm_with_cancel(
            key.clone(),
            delay,
            move |target| {
                // Receiver lives as long as the App that owns the controller
                let _ = commit_tx.send(DeferredEvent::Committed(target.clone()));
            },
            move |target| {
                // Receiver lives as long as the App that owns the controller
                let _ = cancel_tx.send(DeferredEvent::Cancelled(target.clone()));
            },
        );

        let seconds = delay.as_duration().as_secs_f64();
        self.toast = Some(Toast {
            kind: ToastKind::Undo,
            title: Some("Preparing delete".into()),
            message: format!(
                "\"{}\" will be deleted in {:.0} seconds. Press u to undo.",
                label, seconds
            ),
            action: Some(UndoBinding { target: key, handle }),
            shown_at: self.deferred.now(),
            auto_dismiss: None,
        });
    }

    /// Undo the pending delete under the cursor, else the one on the toast
    fn undo(&mut self, kind: ResourceKind) {
        if let Some((id, _)) = self.list(kind).current_entry() {
            if self.deferred.cancel(&RowKey::new(kind, id)) {
                return;
            }
        }

        if let Some(binding) = self.toast.as_ref().and_then(|t| t.action.clone()) {
            self.deferred.cancel_handle(binding.handle);
        }
    }

    fn handle_deferred_event(&mut self, event: DeferredEvent) {
        match event {
            DeferredEvent::Committed(key) => {
                let label = self.row_label(&key);
                self.in_flight.insert(key.clone());
                self.jobs.submit(Job::Delete { key, label });
            }
            // Undo is silent: the row simply goes back to normal
            DeferredEvent::Cancelled(key) => debug!(key = %key, "delete undone"),
        }
    }

    // === ROW ACTIONS ===

    /// Flip a user's status immediately; reverted if the backend refuses
    fn toggle_user_status(&mut self) {
        let Some((id, _)) = self.current_target(ResourceKind::User) else {
            return;
        };

        if self.row_busy(ResourceKind::User, &id) || self.toggling.contains(&id) {
            return;
        }

        let Some(user) = self.users.find_mut(&id) else {
            return;
        };
        let previous = user.active;
        user.active = !previous;
        self.toggling.insert(id.clone());
        self.jobs.submit(Job::SetUserStatus {
            id,
            active: !previous,
            previous,
        });
    }

    fn prompt_bulk_delete(&mut self) {
        let ids: Vec<String> = self
            .audiences
            .selected_ids()
            .into_iter()
            .filter(|id| !self.row_busy(ResourceKind::Audience, id))
            .collect();

        if ids.is_empty() {
            self.show_error(None, "Select audiences with Space first");
            return;
        }

        self.popup = PopupState::Confirm {
            title: "Confirm Delete".into(),
            message: format!(
                "Delete {} selected audience(s)?\n\nThis cannot be undone.",
                ids.len()
            ),
            action: ConfirmAction::BulkDelete {
                kind: ResourceKind::Audience,
                ids,
            },
        };
    }

    fn prompt_row_action(&mut self, action: RowAction) {
        let kind = action.kind();
        let Some((id, title)) = self.current_target(kind) else {
            return;
        };

        if self.row_busy(kind, &id) {
            self.show_error(None, "This row is pending deletion");
            return;
        }

        self.popup = PopupState::Confirm {
            title: format!("Confirm {}", action.as_str()),
            message: format!("{} {} \"{}\"?", action.as_str(), kind.as_str().to_lowercase(), title),
            action: ConfirmAction::Row { action, id, title },
        };
    }

    fn execute_confirmed(&mut self, action: ConfirmAction) {
        match action {
            ConfirmAction::BulkDelete { kind, ids } => {
                for id in &ids {
                    self.in_flight.insert(RowKey::new(kind, id.clone()));
                }
                self.jobs.submit(Job::BulkDelete { kind, ids });
            }
            ConfirmAction::Row { action, id, title } => {
                self.jobs.submit(Job::Action { action, id, title });
            }
        }
    }

    // === JOB OUTCOMES ===

    fn handle_outcome(&mut self, outcome: JobOutcome) {
        match outcome {
            JobOutcome::Deleted { key, label, result } => {
                self.in_flight.remove(&key);
                match result {
                    Ok(()) => {
                        self.remove_row(&key);
                        self.show_success(
                            Some(format!("{} deleted", key.kind.as_str()).as_str()),
                            &format!("\"{}\" was deleted", label),
                        );
                    }
                    Err(e) => self.show_error_toast("Delete failed", &e),
                }
            }
            JobOutcome::BulkDeleted { kind, deleted, failed } => {
                for id in deleted.iter().chain(failed.iter().map(|(id, _)| id)) {
                    self.in_flight.remove(&RowKey::new(kind, id.clone()));
                }
                for id in &deleted {
                    self.remove_row(&RowKey::new(kind, id.clone()));
                }
                self.list_mut(kind).clear_selection();

                match failed.first() {
                    None => self.show_success(
                        Some("Bulk delete"),
                        &format!("{} item(s) deleted", deleted.len()),
                    ),
                    Some((_, reason)) => self.show_error(
                        Some("Bulk delete"),
                        &format!(
                            "{} deleted, {} failed: {}",
                            deleted.len(),
                            failed.len(),
                            reason
                        ),
                    ),
                }
            }
            JobOutcome::UserStatus { id, active, previous, result } => {
                self.toggling.remove(&id);
                match result {
                    Ok(()) => {
                        let name = self.users.find(&id).map(|u| u.name.clone()).unwrap_or(id);
                        let status = if active { "ACTIVE" } else { "PASSIVE" };
                        self.show_success(
                            Some("Status updated"),
                            &format!("{} is now {}", name, status),
                        );
                    }
                    Err(e) => {
                        if let Some(user) = self.users.find_mut(&id) {
                            user.active = previous;
                        }
                        self.show_error_toast("Status update failed", &e);
                    }
                }
            }
            JobOutcome::Action { action, title, result } => match result {
                Ok(()) => {
                    self.show_success(
                        Some(format!("{} {}", action.kind().as_str(), action.past_tense()).as_str()),
                        &format!("\"{}\"", title),
                    );
                    if !self.should_quit {
                        self.reload(action.kind());
                    }
                }
                Err(e) => self.show_error_toast(&format!("{} failed", action.as_str()), &e),
            },
        }
    }

    // === HELPER METHODS ===

    fn list(&self, kind: ResourceKind) -> &dyn ListControl {
        match kind {
            ResourceKind::User => &self.users,
            ResourceKind::Audience => &self.audiences,
            ResourceKind::Notification => &self.notifications,
            ResourceKind::Survey => &self.surveys,
            ResourceKind::Feedback => &self.feedbacks,
        }
    }

    fn list_mut(&mut self, kind: ResourceKind) -> &mut dyn ListControl {
        match kind {
            ResourceKind::User => &mut self.users,
            ResourceKind::Audience => &mut self.audiences,
            ResourceKind::Notification => &mut self.notifications,
            ResourceKind::Survey => &mut self.surveys,
            ResourceKind::Feedback => &mut self.feedbacks,
        }
    }

    /// Id and label of the row under the cursor, if it can be acted on
    fn current_target(&mut self, kind: ResourceKind) -> Option<(String, String)> {
        let (id, label) = self.list(kind).current_entry()?;
        if id.is_empty() {
            self.show_error(None, "This row has no id; reload the list or fix it in the backend");
            return None;
        }
        Some((id, label))
    }

    /// Pending or in-flight rows take no other actions
    fn row_busy(&self, kind: ResourceKind, id: &str) -> bool {
        self.row_state(kind, id) != RowState::Idle
    }

    fn row_label(&self, key: &RowKey) -> String {
        self.list(key.kind)
            .label_of(&key.id)
            .unwrap_or_else(|| key.to_string())
    }

    fn remove_row(&mut self, key: &RowKey) {
        self.list_mut(key.kind).remove_row(&key.id);
    }

    fn expire_toast(&mut self, now: Instant) {
        let expired = self.toast.as_ref().is_some_and(|toast| {
            toast
                .auto_dismiss
                .is_some_and(|ttl| now.saturating_duration_since(toast.shown_at) >= ttl)
        });
        if expired {
            self.toast = None;
        }
    }

    fn show_success(&mut self, title: Option<&str>, message: &str) {
        self.toast = Some(Toast {
            kind: ToastKind::Success,
            title: title.map(str::to_string),
            message: message.into(),
            action: None,
            shown_at: self.deferred.now(),
            auto_dismiss: Some(Duration::from_millis(self.config.toast.success_ms)),
        });
    }

    fn show_error(&mut self, title: Option<&str>, message: &str) {
        self.toast = Some(Toast {
            kind: ToastKind::Error,
            title: title.map(str::to_string),
            message: message.into(),
            action: None,
            shown_at: self.deferred.now(),
            auto_dismiss: Some(Duration::from_millis(self.config.toast.error_ms)),
        });
    }

    fn show_error_toast(&mut self, title: &str, err: &ApiError) {
        self.show_error(Some(title), &err.to_string());
    }

    /// Show an error popup
    fn show_error_popup(&mut self, title: &str, message: &str) {
        self.popup = PopupState::Error {
            title: title.into(),
            message: message.into(),
        };
    }
}

fn non_empty(text: &str) -> Option<String> {
    Some(text.trim().to_string()).filter(|t| !t.is_empty())
}
