//! List screen state
//!
//! Every resource tab shows the same thing: rows fetched from the backend,
//! narrowed by a free-text filter and up to two cycling facets (role,
//! status, rating, channel), with a cursor and an optional multi-selection.
//! Lists are paginated client-side unless the server pages them (users).

use crate::types::{AudienceRow, FeedbackRow, NotificationRow, SurveyRow, UserRow};
use std::collections::HashSet;

/// Row shown in a list screen
pub trait ListRow {
    fn id(&self) -> &str;

    /// Text searched by the free-text filter
    fn haystack(&self) -> String;

    /// Value compared against the selected facet
    fn facet(&self) -> Option<&str> {
        None
    }

    /// Value compared against the second facet, if the list has one
    fn secondary_facet(&self) -> Option<&str> {
        None
    }

    /// Short name used in toasts
    fn label(&self) -> &str;
}

impl ListRow for UserRow {
    fn id(&self) -> &str {
        &self.id
    }

    fn haystack(&self) -> String {
        format!("{} {} {} {}", self.id, self.name, self.email, self.role)
    }

    fn facet(&self) -> Option<&str> {
        Some(&self.role)
    }

    fn label(&self) -> &str {
        &self.name
    }
}

impl ListRow for AudienceRow {
    fn id(&self) -> &str {
        &self.id
    }

    fn haystack(&self) -> String {
        format!("{} {}", self.name, self.description)
    }

    fn label(&self) -> &str {
        &self.name
    }
}

impl ListRow for NotificationRow {
    fn id(&self) -> &str {
        &self.id
    }

    fn haystack(&self) -> String {
        format!("{} {} {}", self.title, self.body_preview, self.segment_name)
    }

    fn facet(&self) -> Option<&str> {
        Some(self.status.as_str())
    }

    fn secondary_facet(&self) -> Option<&str> {
        Some(&self.channel)
    }

    fn label(&self) -> &str {
        &self.title
    }
}

impl ListRow for SurveyRow {
    fn id(&self) -> &str {
        &self.id
    }

    fn haystack(&self) -> String {
        format!("{} {} {}", self.title, self.description_preview, self.audience_name)
    }

    fn facet(&self) -> Option<&str> {
        Some(self.status.as_str())
    }

    fn label(&self) -> &str {
        &self.title
    }
}

impl ListRow for FeedbackRow {
    fn id(&self) -> &str {
        &self.id
    }

    fn haystack(&self) -> String {
        format!(
            "{} {} {}",
            self.note,
            self.user_email.as_deref().unwrap_or_default(),
            self.user_name.as_deref().unwrap_or_default()
        )
    }

    fn facet(&self) -> Option<&str> {
        let idx = usize::from(self.rating?).checked_sub(1)?;
        RATINGS.get(idx).copied()
    }

    fn label(&self) -> &str {
        &self.note_preview
    }
}

pub const USER_ROLE_FACETS: &[&str] = &["USER", "ADMIN"];
pub const NOTIFICATION_FACETS: &[&str] = &["SENT", "SCHEDULED", "DRAFT", "FAILED"];
pub const NOTIFICATION_CHANNELS: &[&str] = &["PUSH", "EMAIL"];
pub const SURVEY_FACETS: &[&str] = &["DRAFT", "ACTIVE", "ARCHIVED"];
pub const FEEDBACK_FACETS: &[&str] = &["5", "4", "3", "2", "1"];

const RATINGS: [&str; 5] = ["1", "2", "3", "4", "5"];

/// Position of a list the server paginates; `page` is 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerPaging {
    pub page: u32,
    pub total_pages: u32,
    pub total: u64,
}

impl Default for ServerPaging {
    fn default() -> Self {
        Self {
            page: 1,
            total_pages: 1,
            total: 0,
        }
    }
}

pub struct ListView<T> {
    pub rows: Vec<T>,
    pub filter: String,
    pub error: Option<String>,
    pub selected: HashSet<String>,
    cursor: usize,
    page: usize,
    page_size: usize,
    facets: &'static [&'static str],
    // 0 = all, i = facets[i - 1]
    facet_idx: usize,
    secondary: &'static [&'static str],
    secondary_idx: usize,
    paging: Option<ServerPaging>,
}

impl<T: ListRow> ListView<T> {
    pub fn new(page_size: usize, facets: &'static [&'static str]) -> Self {
        Self {
            rows: Vec::new(),
            filter: String::new(),
            error: None,
            selected: HashSet::new(),
            cursor: 0,
            page: 0,
            page_size: page_size.max(1),
            facets,
            facet_idx: 0,
            secondary: &[],
            secondary_idx: 0,
            paging: None,
        }
    }

    /// Add a second, independent facet
    pub fn with_secondary(mut self, facets: &'static [&'static str]) -> Self {
        self.secondary = facets;
        self
    }

    /// The server pages, searches and filters this list; rows hold one page
    pub fn server_paged(mut self) -> Self {
        self.paging = Some(ServerPaging::default());
        self
    }

    pub fn paging(&self) -> Option<ServerPaging> {
        self.paging
    }

    /// Replace rows after a load; selection is cleared, position clamped
    pub fn set_rows(&mut self, rows: Vec<T>) {
        self.rows = rows;
        self.error = None;
        self.selected.clear();
        self.clamp();
    }

    /// Replace rows with one server page and its totals
    pub fn set_server_page(&mut self, rows: Vec<T>, total: u64, total_pages: u64) {
        if let Some(paging) = &mut self.paging {
            paging.total = total;
            paging.total_pages = u32::try_from(total_pages.max(1)).unwrap_or(u32::MAX);
        }
        self.set_rows(rows);
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    /// Rows passing the text filter and the facets.
    ///
    /// Server-paged rows already match the query they were fetched with.
    pub fn filtered(&self) -> Vec<&T> {
        if self.paging.is_some() {
            return self.rows.iter().collect();
        }

        let needle = self.filter.trim().to_lowercase();
        let facet = self.active_facet();
        let secondary = self.active_secondary();

        self.rows
            .iter()
            .filter(|row| needle.is_empty() || row.haystack().to_lowercase().contains(&needle))
            .filter(|row| facet.is_none() || row.facet() == facet)
            .filter(|row| secondary.is_none() || row.secondary_facet() == secondary)
            .collect()
    }

    fn local_pages(&self) -> usize {
        self.filtered().len().div_ceil(self.page_size).max(1)
    }

    pub fn total_pages(&self) -> usize {
        match self.paging {
            Some(paging) => paging.total_pages as usize,
            None => self.local_pages(),
        }
    }

    /// Zero-based current page
    pub fn page(&self) -> usize {
        match self.paging {
            Some(paging) => paging.page.saturating_sub(1) as usize,
            None => self.page,
        }
    }

    /// Rows on the current page
    pub fn page_rows(&self) -> Vec<&T> {
        self.filtered()
            .into_iter()
            .skip(self.page * self.page_size)
            .take(self.page_size)
            .collect()
    }

    /// Cursor position within the current page
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> Option<&T> {
        self.page_rows().get(self.cursor).copied()
    }

    pub fn find(&self, id: &str) -> Option<&T> {
        self.rows.iter().find(|row| row.id() == id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut T> {
        self.rows.iter_mut().find(|row| row.id() == id)
    }

    /// Remove a row (after a confirmed delete)
    pub fn remove(&mut self, id: &str) -> Option<T> {
        let idx = self.rows.iter().position(|row| row.id() == id)?;
        let removed = self.rows.remove(idx);
        self.selected.remove(id);
        if let Some(paging) = &mut self.paging {
            paging.total = paging.total.saturating_sub(1);
        }
        self.clamp();
        Some(removed)
    }

    pub fn move_down(&mut self) {
        let len = self.page_rows().len();
        if self.cursor < len.saturating_sub(1) {
            self.cursor += 1;
        }
    }

    pub fn move_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn first(&mut self) {
        self.cursor = 0;
    }

    pub fn last(&mut self) {
        self.cursor = self.page_rows().len().saturating_sub(1);
    }

    /// Move to the next page; true when a server page must be fetched
    pub fn next_page(&mut self) -> bool {
        if let Some(paging) = &mut self.paging {
            if paging.page >= paging.total_pages {
                return false;
            }
            paging.page += 1;
            self.cursor = 0;
            return true;
        }

        if self.page + 1 < self.local_pages() {
            self.page += 1;
            self.cursor = 0;
        }
        false
    }

    /// Move to the previous page; true when a server page must be fetched
    pub fn prev_page(&mut self) -> bool {
        if let Some(paging) = &mut self.paging {
            if paging.page <= 1 {
                return false;
            }
            paging.page -= 1;
            self.cursor = 0;
            return true;
        }

        if self.page > 0 {
            self.page -= 1;
            self.cursor = 0;
        }
        false
    }

    /// Back to the first page, e.g. when the server query changes
    pub fn rewind(&mut self) {
        if let Some(paging) = &mut self.paging {
            paging.page = 1;
        }
        self.page = 0;
        self.cursor = 0;
    }

    pub fn push_filter(&mut self, c: char) {
        self.filter.push(c);
        self.page = 0;
        self.cursor = 0;
    }

    pub fn pop_filter(&mut self) {
        self.filter.pop();
        self.clamp();
    }

    pub fn clear_filter(&mut self) {
        self.filter.clear();
        self.clamp();
    }

    pub fn active_facet(&self) -> Option<&'static str> {
        self.facet_idx
            .checked_sub(1)
            .and_then(|i| self.facets.get(i).copied())
    }

    pub fn has_facets(&self) -> bool {
        !self.facets.is_empty()
    }

    pub fn cycle_facet(&mut self) {
        if self.facets.is_empty() {
            return;
        }
        self.facet_idx = (self.facet_idx + 1) % (self.facets.len() + 1);
        self.rewind();
    }

    pub fn active_secondary(&self) -> Option<&'static str> {
        self.secondary_idx
            .checked_sub(1)
            .and_then(|i| self.secondary.get(i).copied())
    }

    pub fn has_secondary(&self) -> bool {
        !self.secondary.is_empty()
    }

    pub fn cycle_secondary(&mut self) {
        if self.secondary.is_empty() {
            return;
        }
        self.secondary_idx = (self.secondary_idx + 1) % (self.secondary.len() + 1);
        self.rewind();
    }

    /// Toggle multi-selection of the row under the cursor
    pub fn toggle_selected(&mut self) {
        let Some(id) = self
            .current()
            .map(|row| row.id().to_string())
            .filter(|id| !id.is_empty())
        else {
            return;
        };
        if !self.selected.remove(&id) {
            self.selected.insert(id);
        }
    }

    /// Select every row on the page, or clear them if all are selected
    pub fn toggle_select_page(&mut self) {
        let ids: Vec<String> = self
            .page_rows()
            .iter()
            .map(|row| row.id().to_string())
            .filter(|id| !id.is_empty())
            .collect();
        if ids.iter().all(|id| self.selected.contains(id)) {
            for id in &ids {
                self.selected.remove(id);
            }
        } else {
            self.selected.extend(ids);
        }
    }

    /// Pull page and cursor back inside the filtered set
    fn clamp(&mut self) {
        let pages = self.local_pages();
        if self.page >= pages {
            self.page = pages - 1;
        }
        let len = self.page_rows().len();
        if self.cursor >= len {
            self.cursor = len.saturating_sub(1);
        }
    }
}

/// Row-type independent access used by the key handler
pub trait ListControl {
    fn move_up(&mut self);
    fn move_down(&mut self);
    fn first(&mut self);
    fn last(&mut self);
    fn next_page(&mut self) -> bool;
    fn prev_page(&mut self) -> bool;
    fn rewind(&mut self);
    fn push_filter(&mut self, c: char);
    fn pop_filter(&mut self);
    fn clear_filter(&mut self);
    fn cycle_facet(&mut self);
    fn cycle_secondary(&mut self);
    fn toggle_selected(&mut self);
    fn clear_selection(&mut self);
    fn set_error(&mut self, message: String);

    /// Id and label of the row under the cursor
    fn current_entry(&self) -> Option<(String, String)>;
    fn label_of(&self, id: &str) -> Option<String>;
    fn remove_row(&mut self, id: &str) -> bool;
    fn selected_ids(&self) -> Vec<String>;
}

impl<T: ListRow> ListControl for ListView<T> {
    fn move_up(&mut self) {
        ListView::move_up(self)
    }

    fn move_down(&mut self) {
        ListView::move_down(self)
    }

    fn first(&mut self) {
        ListView::first(self)
    }

    fn last(&mut self) {
        ListView::last(self)
    }

    fn next_page(&mut self) -> bool {
        ListView::next_page(self)
    }

    fn prev_page(&mut self) -> bool {
        ListView::prev_page(self)
    }

    fn rewind(&mut self) {
        ListView::rewind(self)
    }

    fn push_filter(&mut self, c: char) {
        ListView::push_filter(self, c)
    }

    fn pop_filter(&mut self) {
        ListView::pop_filter(self)
    }

    fn clear_filter(&mut self) {
        ListView::clear_filter(self)
    }

    fn cycle_facet(&mut self) {
        ListView::cycle_facet(self)
    }

    fn cycle_secondary(&mut self) {
        ListView::cycle_secondary(self)
    }

    fn toggle_selected(&mut self) {
        ListView::toggle_selected(self)
    }

    fn clear_selection(&mut self) {
        self.selected.clear();
    }

    fn set_error(&mut self, message: String) {
        ListView::set_error(self, message)
    }

    fn current_entry(&self) -> Option<(String, String)> {
        self.current()
            .map(|row| (row.id().to_string(), row.label().to_string()))
    }

    fn label_of(&self, id: &str) -> Option<String> {
        self.find(id).map(|row| row.label().to_string())
    }

    fn remove_row(&mut self, id: &str) -> bool {
        self.remove(id).is_some()
    }

    fn selected_ids(&self) -> Vec<String> {
        // Keep list order so bulk jobs run top to bottom
        self.rows
            .iter()
            .map(|row| row.id())
            .filter(|id| self.selected.contains(*id))
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, name: &str, role: &str) -> UserRow {
        UserRow {
            id: id.into(),
            name: name.into(),
            email: format!("{}@dailyspark.app", name.to_lowercase()),
            role: role.into(),
            created_at: None,
            active: true,
        }
    }

    fn view(count: usize, page_size: usize) -> ListView<UserRow> {
        let mut view = ListView::new(page_size, USER_ROLE_FACETS);
        view.set_rows(
            (0..count)
                .map(|i| user(&i.to_string(), &format!("User{}", i), if i % 3 == 0 { "ADMIN" } else { "USER" }))
                .collect(),
        );
        view
    }

    #[test]
    fn test_pagination() {
        let mut v = view(25, 10);
        assert_eq!(v.total_pages(), 3);
        assert_eq!(v.page_rows().len(), 10);

        v.next_page();
        v.next_page();
        assert_eq!(v.page(), 2);
        assert_eq!(v.page_rows().len(), 5);

        v.next_page();
        assert_eq!(v.page(), 2);

        v.prev_page();
        assert_eq!(v.page(), 1);
    }

    #[test]
    fn test_filter_and_facet() {
        let mut v = view(9, 20);
        v.push_filter('u');
        v.push_filter('s');
        v.push_filter('e');
        v.push_filter('r');
        v.push_filter('1');
        assert_eq!(v.filtered().len(), 1);

        v.clear_filter();
        assert_eq!(v.active_facet(), None);
        v.cycle_facet();
        assert_eq!(v.active_facet(), Some("USER"));
        assert_eq!(v.filtered().len(), 6);
        v.cycle_facet();
        assert_eq!(v.active_facet(), Some("ADMIN"));
        assert_eq!(v.filtered().len(), 3);
        v.cycle_facet();
        assert_eq!(v.active_facet(), None);
    }

    #[test]
    fn test_page_clamped_when_rows_shrink() {
        let mut v = view(21, 10);
        v.next_page();
        v.next_page();
        assert_eq!(v.page(), 2);

        assert!(v.remove("20").is_some());
        assert_eq!(v.page(), 1);
        assert!(v.current().is_some());
    }

    #[test]
    fn test_remove_unknown_row() {
        let mut v = view(3, 10);
        assert!(v.remove("missing").is_none());
        assert_eq!(v.rows.len(), 3);
    }

    #[test]
    fn test_selection() {
        let mut v = view(4, 10);
        v.toggle_selected();
        assert!(v.selected.contains("0"));
        v.toggle_selected();
        assert!(v.selected.is_empty());

        v.toggle_select_page();
        assert_eq!(v.selected.len(), 4);
        v.toggle_select_page();
        assert!(v.selected.is_empty());
    }

    #[test]
    fn test_id_less_rows_are_not_selectable() {
        let mut v = view(2, 10);
        v.rows[0].id.clear();
        v.toggle_selected();
        assert!(v.selected.is_empty());

        v.toggle_select_page();
        assert_eq!(v.selected.len(), 1);
        assert!(v.selected.contains("1"));
    }

    #[test]
    fn test_server_paging_asks_for_reload() {
        let mut v = ListView::new(20, USER_ROLE_FACETS).server_paged();
        v.set_server_page(vec![user("1", "Ayla", "USER"), user("2", "Can", "ADMIN")], 45, 3);
        assert_eq!(v.total_pages(), 3);
        assert_eq!(v.page(), 0);

        // the server already applied search and role
        v.push_filter('z');
        v.cycle_facet();
        assert_eq!(v.filtered().len(), 2);
        assert_eq!(v.page(), 0);

        assert!(v.next_page());
        assert!(v.next_page());
        assert!(!v.next_page());
        assert_eq!(v.paging().map(|p| p.page), Some(3));

        assert!(v.prev_page());
        assert_eq!(v.page(), 1);

        v.remove("1");
        assert_eq!(v.paging().map(|p| p.total), Some(44));

        v.rewind();
        assert_eq!(v.paging().map(|p| p.page), Some(1));
        assert!(!v.prev_page());
    }

    #[test]
    fn test_secondary_facet_is_independent() {
        use crate::types::NotificationStatus;

        let row = |id: &str, channel: &str, status| NotificationRow {
            id: id.into(),
            title: format!("N{}", id),
            body_preview: String::new(),
            segment_name: "All users".into(),
            channel: channel.into(),
            status,
            created_at: None,
            scheduled_at: None,
            sent_at: None,
            sent_count: 0,
            delivered_count: 0,
            open_count: 0,
        };

        let mut v = ListView::new(20, NOTIFICATION_FACETS).with_secondary(NOTIFICATION_CHANNELS);
        v.set_rows(vec![
            row("1", "PUSH", NotificationStatus::Sent),
            row("2", "EMAIL", NotificationStatus::Sent),
            row("3", "EMAIL", NotificationStatus::Draft),
        ]);

        v.cycle_secondary();
        v.cycle_secondary();
        assert_eq!(v.active_secondary(), Some("EMAIL"));
        assert_eq!(v.filtered().len(), 2);

        v.cycle_facet();
        assert_eq!(v.active_facet(), Some("SENT"));
        assert_eq!(v.filtered().len(), 1);

        v.cycle_secondary();
        assert_eq!(v.active_secondary(), None);
        assert_eq!(v.filtered().len(), 2);
    }

    #[test]
    fn test_feedback_rating_facet() {
        let fb = |id: &str, rating| FeedbackRow {
            id: id.into(),
            note: "Love it".into(),
            note_preview: "Love it".into(),
            rating,
            user_email: Some("ece@dailyspark.app".into()),
            user_name: None,
            created_at: None,
        };

        let mut v = ListView::new(20, FEEDBACK_FACETS);
        v.set_rows(vec![fb("1", Some(5)), fb("2", Some(3)), fb("3", None), fb("4", Some(0))]);

        v.cycle_facet();
        assert_eq!(v.active_facet(), Some("5"));
        assert_eq!(v.filtered().len(), 1);

        v.cycle_facet();
        v.cycle_facet();
        assert_eq!(v.active_facet(), Some("3"));
        assert_eq!(v.filtered()[0].id, "2");

        v.clear_filter();
        for c in "ece@".chars() {
            v.push_filter(c);
        }
        assert_eq!(v.filtered().len(), 1);
    }

    #[test]
    fn test_cursor_bounds() {
        let mut v = view(3, 10);
        v.move_up();
        assert_eq!(v.cursor(), 0);
        v.last();
        assert_eq!(v.cursor(), 2);
        v.move_down();
        assert_eq!(v.cursor(), 2);
        v.first();
        assert_eq!(v.current().map(|u| u.id.as_str()), Some("0"));
    }

    #[test]
    fn test_list_control_through_trait_object() {
        let mut v = view(5, 10);
        let control: &mut dyn ListControl = &mut v;

        control.move_down();
        assert_eq!(control.current_entry(), Some(("1".to_string(), "User1".to_string())));

        control.toggle_selected();
        control.move_down();
        control.move_down();
        control.toggle_selected();
        assert_eq!(control.selected_ids(), vec!["1".to_string(), "3".to_string()]);

        assert!(control.remove_row("1"));
        assert_eq!(control.selected_ids(), vec!["3".to_string()]);
        assert_eq!(control.label_of("4").as_deref(), Some("User4"));
    }
}
