use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::clipboard::ClipboardSink;
use crate::filter::{visible, visible_groups, FilterState};
use crate::frame::{Body, CodeCell, EntryLine, FrameModel, GroupLine, Mode, RevealCard};
use crate::index::{build_rows, group_names, Row};
use crate::keymap::{Action, BROWSE_HINT, GROUP_HINT, REVEAL_HINT};
use crate::models::Db;
use crate::otp::OtpSource;
use crate::reveal::{rotated, whole_seconds, RevealState};
use crate::selection::Selection;

pub const STATUS_MESSAGE_SECS: u64 = 2;
pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const ALL_GROUPS_LABEL: &str = "-- All OTPs --";

const MSG_COPIED: &str = "OTP copied to clipboard!";
const MSG_NO_CLIPBOARD: &str = "Clipboard unavailable.";
const MSG_NO_SELECTION: &str = "No entry selected.";
const MSG_NO_CODE: &str = "No code available for this entry.";
const MSG_TIMED_OUT: &str = "Code hidden after 60s of inactivity.";
const NO_CODE: &str = "no code";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RevealExit {
    Cancel,
    Timeout,
    Quit,
}

struct Status {
    text: String,
    until: Instant,
}

/// Interactive state of one browsing session.
///
/// All input goes through [`Session::apply`] and all time through
/// [`Session::tick`]; neither touches the terminal.
pub struct Session {
    mode: Mode,
    rows: Vec<Row>,
    groups: Vec<String>,
    filter: FilterState,
    group_query: String,
    browse: Selection,
    group_sel: Selection,
    revealed: HashSet<String>,
    reveal: Option<RevealState>,
    codes: HashMap<String, String>,
    remaining_ms: i64,
    status: Option<Status>,
    show_help: bool,
    page_size: usize,
    otp: Box<dyn OtpSource>,
    clipboard: Option<Box<dyn ClipboardSink>>,
    quit: bool,
}

impl Session {
    pub fn new(
        db: &Db,
        otp: Box<dyn OtpSource>,
        clipboard: Option<Box<dyn ClipboardSink>>,
        initial_group: Option<String>,
    ) -> Self {
        let codes = otp.current_codes();
        let remaining_ms = otp.time_to_next_rotation_ms();
        let mut session = Self {
            mode: Mode::Browse,
            rows: build_rows(db),
            groups: group_names(db),
            filter: FilterState::with_group(initial_group),
            group_query: String::new(),
            browse: Selection::default(),
            group_sel: Selection::default(),
            revealed: HashSet::new(),
            reveal: None,
            codes,
            remaining_ms,
            status: None,
            show_help: false,
            page_size: DEFAULT_PAGE_SIZE,
            otp,
            clipboard,
            quit: false,
        };
        session.reclamp_browse();
        info!(
            entries = session.rows.len(),
            groups = session.groups.len(),
            clipboard = session.clipboard.is_some(),
            "session started"
        );
        session
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn visible_rows(&self) -> Vec<&Row> {
        visible(&self.rows, &self.filter)
    }

    pub fn selected_row(&self) -> Option<&Row> {
        let index = self.browse.selected?;
        self.visible_rows().get(index).copied()
    }

    /// "All" first, then group names matching the picker query.
    fn group_options(&self) -> Vec<Option<&String>> {
        std::iter::once(None)
            .chain(visible_groups(&self.groups, &self.group_query).into_iter().map(Some))
            .collect()
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        let page_size = page_size.max(1);
        if page_size == self.page_size {
            return;
        }
        self.page_size = page_size;
        self.reclamp_browse();
        self.reclamp_groups();
    }

    fn reclamp_browse(&mut self) {
        let len = self.visible_rows().len();
        self.browse.reclamp(len, self.page_size);
    }

    fn reclamp_groups(&mut self) {
        let len = self.group_options().len();
        self.group_sel.reclamp(len, self.page_size);
    }

    fn set_status(&mut self, text: impl Into<String>, now: Instant) {
        self.status = Some(Status {
            text: text.into(),
            until: now + Duration::from_secs(STATUS_MESSAGE_SECS),
        });
    }

    pub fn apply(&mut self, action: Action, now: Instant) {
        if self.show_help {
            self.show_help = false;
            return;
        }
        match self.mode {
            Mode::Browse => self.apply_browse(action, now),
            Mode::GroupSelect => self.apply_group_select(action),
            Mode::Reveal => self.apply_reveal(action, now),
        }
    }

    fn apply_browse(&mut self, action: Action, now: Instant) {
        let len = self.visible_rows().len();
        let page = self.page_size;
        match action {
            Action::MoveUp => self.browse.move_up(len, page),
            Action::MoveDown => self.browse.move_down(len, page),
            Action::PageUp => self.browse.page_up(len, page),
            Action::PageDown => self.browse.page_down(len, page),
            Action::Insert(c) => {
                self.filter.search_term.push(c);
                self.on_search_edited();
            }
            Action::EraseChar => {
                if self.filter.search_term.pop().is_some() {
                    self.on_search_edited();
                }
            }
            Action::Cancel => {
                self.filter.search_term.clear();
                self.filter.group = None;
                self.revealed.clear();
                self.browse.reset();
                self.reclamp_browse();
            }
            Action::ToggleGroups => self.enter_group_select(),
            Action::Confirm => {
                if let Some(uuid) = self.selected_row().map(|r| r.uuid.clone()) {
                    self.enter_reveal(uuid, now);
                }
            }
            Action::Copy => {
                let message = match self.selected_row().map(|r| r.uuid.clone()) {
                    Some(uuid) => self.copy_code(&uuid),
                    None => MSG_NO_SELECTION.to_string(),
                };
                self.set_status(message, now);
            }
            Action::Help => self.show_help = true,
            Action::Quit => self.quit = true,
        }
    }

    /// Every way out of Reveal empties `revealed`, so Browse edits only
    /// have to move the cursor.
    fn on_search_edited(&mut self) {
        self.browse.reset();
        self.reclamp_browse();
    }

    fn enter_group_select(&mut self) {
        self.filter.search_term.clear();
        self.group_query.clear();
        let preselect = match &self.filter.group {
            Some(active) => self
                .groups
                .iter()
                .position(|g| g == active)
                .map_or(0, |i| i + 1),
            None => 0,
        };
        self.group_sel = Selection {
            selected: Some(preselect),
            scroll_offset: 0,
        };
        self.reclamp_groups();
        self.mode = Mode::GroupSelect;
        debug!("entered group selection");
    }

    fn leave_group_select(&mut self, group: Option<String>) {
        self.group_query.clear();
        self.filter.search_term.clear();
        self.filter.group = group;
        self.revealed.clear();
        self.mode = Mode::Browse;
        self.browse.reset();
        self.reclamp_browse();
        info!(group = ?self.filter.group, "group filter changed");
    }

    fn apply_group_select(&mut self, action: Action) {
        let len = self.group_options().len();
        let page = self.page_size;
        match action {
            Action::MoveUp => self.group_sel.move_up(len, page),
            Action::MoveDown => self.group_sel.move_down(len, page),
            Action::PageUp => self.group_sel.page_up(len, page),
            Action::PageDown => self.group_sel.page_down(len, page),
            Action::Insert(c) => {
                self.group_query.push(c);
                self.group_sel.reset();
                self.reclamp_groups();
            }
            Action::EraseChar => {
                if self.group_query.pop().is_some() {
                    self.group_sel.reset();
                    self.reclamp_groups();
                }
            }
            Action::Confirm => {
                let chosen = self
                    .group_sel
                    .selected
                    .and_then(|i| self.group_options().get(i).copied())
                    .flatten()
                    .cloned();
                self.leave_group_select(chosen);
            }
            Action::Cancel | Action::ToggleGroups => self.leave_group_select(None),
            Action::Copy => {}
            Action::Help => self.show_help = true,
            Action::Quit => self.quit = true,
        }
    }

    fn enter_reveal(&mut self, uuid: String, now: Instant) {
        self.codes = self.otp.current_codes();
        self.remaining_ms = self.otp.time_to_next_rotation_ms();
        self.revealed.clear();
        self.revealed.insert(uuid.clone());
        let code = self.codes.get(&uuid).cloned();
        self.reveal = Some(RevealState::new(uuid, code, self.remaining_ms, now));
        self.mode = Mode::Reveal;
        debug!("entered reveal");
    }

    fn exit_reveal(&mut self, reason: RevealExit, now: Instant) {
        let target = self.reveal.take().map(|r| r.uuid);
        self.revealed.clear();
        self.filter.search_term.clear();
        self.mode = Mode::Browse;
        self.browse.reset();
        if let Some(uuid) = target {
            self.browse.selected = self.visible_rows().iter().position(|r| r.uuid == uuid);
        }
        self.reclamp_browse();
        if reason == RevealExit::Timeout {
            self.set_status(MSG_TIMED_OUT, now);
        }
        debug!(?reason, "left reveal");
    }

    /// Any key press counts as activity, including keys with no binding.
    pub fn note_input(&mut self, now: Instant) {
        if let Some(reveal) = self.reveal.as_mut() {
            reveal.touch(now);
        }
    }

    fn apply_reveal(&mut self, action: Action, now: Instant) {
        self.note_input(now);
        match action {
            Action::Cancel | Action::EraseChar => self.exit_reveal(RevealExit::Cancel, now),
            Action::Quit => {
                self.exit_reveal(RevealExit::Quit, now);
                self.quit = true;
            }
            Action::Copy => {
                let Some(uuid) = self.reveal.as_ref().map(|r| r.uuid.clone()) else {
                    return;
                };
                let message = self.copy_code(&uuid);
                if let Some(reveal) = self.reveal.as_mut() {
                    reveal.set_feedback(message, now);
                }
            }
            _ => {}
        }
    }

    /// Writes the entry's current code to the clipboard and returns the
    /// message to show.
    fn copy_code(&mut self, uuid: &str) -> String {
        let Some(clipboard) = self.clipboard.as_mut() else {
            return MSG_NO_CLIPBOARD.to_string();
        };
        let codes = self.otp.current_codes();
        let Some(code) = codes.get(uuid) else {
            return MSG_NO_CODE.to_string();
        };
        match clipboard.copy(code) {
            Ok(()) => MSG_COPIED.to_string(),
            Err(e) => {
                warn!(error = %e, "clipboard write failed");
                MSG_NO_CLIPBOARD.to_string()
            }
        }
    }

    /// Advances timers. Returns true when the frame needs redrawing.
    pub fn tick(&mut self, now: Instant) -> bool {
        let mut dirty = false;

        if self.status.as_ref().is_some_and(|s| now >= s.until) {
            self.status = None;
            dirty = true;
        }

        let remaining = self.otp.time_to_next_rotation_ms();
        if rotated(self.remaining_ms, remaining) {
            self.codes = self.otp.current_codes();
            dirty = true;
        }
        if whole_seconds(remaining) != whole_seconds(self.remaining_ms) {
            dirty = true;
        }
        self.remaining_ms = remaining;

        if self.reveal.as_ref().is_some_and(|r| r.idle_expired(now)) {
            info!("reveal timed out");
            self.exit_reveal(RevealExit::Timeout, now);
            return true;
        }
        if let Some(reveal) = self.reveal.as_mut() {
            dirty |= reveal.observe(remaining, &self.codes);
            dirty |= reveal.expire_feedback(now);
        }
        dirty
    }

    fn code_cell(&self, uuid: &str) -> CodeCell {
        match self.codes.get(uuid) {
            None => CodeCell::Error(NO_CODE.to_string()),
            Some(code) if self.revealed.contains(uuid) => CodeCell::Revealed(code.clone()),
            Some(_) => CodeCell::Masked,
        }
    }

    fn header(&self) -> String {
        match self.mode {
            Mode::GroupSelect => "Select Group".to_string(),
            Mode::Reveal => match self.reveal.as_ref().and_then(|r| self.row(&r.uuid)) {
                Some(row) => format!("Revealed OTP: {}", row.name),
                None => "Revealed OTP".to_string(),
            },
            Mode::Browse => match &self.filter.group {
                Some(group) => format!("Group: {group}"),
                None => "All OTPs".to_string(),
            },
        }
    }

    fn row(&self, uuid: &str) -> Option<&Row> {
        self.rows.iter().find(|r| r.uuid == uuid)
    }

    fn reveal_card(&self) -> Option<RevealCard> {
        let reveal = self.reveal.as_ref()?;
        let row = self.row(&reveal.uuid)?;
        let code = match &reveal.code {
            Some(code) => CodeCell::Revealed(code.clone()),
            None => CodeCell::Error(NO_CODE.to_string()),
        };
        Some(RevealCard {
            issuer: row.issuer.clone(),
            name: row.name.clone(),
            groups: row.groups_label(),
            note: row.note.clone(),
            code,
            seconds_left: whole_seconds(reveal.remaining_ms),
            urgent: reveal.urgent(),
        })
    }

    pub fn frame(&self) -> FrameModel {
        let (body, window, prompt) = match self.mode {
            Mode::GroupSelect => {
                let options = self.group_options();
                let lines = options
                    .iter()
                    .enumerate()
                    .map(|(i, option)| GroupLine {
                        label: option.map_or(ALL_GROUPS_LABEL.to_string(), |g| g.clone()),
                        selected: self.group_sel.selected == Some(i),
                        active: option.map(|g| g.as_str()) == self.filter.group.as_deref(),
                    })
                    .collect();
                (
                    Body::Groups(lines),
                    self.group_sel.window(options.len(), self.page_size),
                    format!("Group search: {}", self.group_query),
                )
            }
            Mode::Browse | Mode::Reveal => {
                let rows = self.visible_rows();
                let lines = rows
                    .iter()
                    .enumerate()
                    .map(|(i, row)| EntryLine {
                        position: row.position,
                        issuer: row.issuer.clone(),
                        name: row.name.clone(),
                        groups: row.groups_label(),
                        note: row.note.clone(),
                        code: self.code_cell(&row.uuid),
                        selected: self.browse.selected == Some(i),
                        revealed: self.revealed.contains(&row.uuid),
                    })
                    .collect();
                (
                    Body::Entries(lines),
                    self.browse.window(rows.len(), self.page_size),
                    format!("Search: {}", self.filter.search_term),
                )
            }
        };

        let status = match self.mode {
            Mode::Reveal => self
                .reveal
                .as_ref()
                .and_then(|r| r.feedback())
                .unwrap_or(REVEAL_HINT)
                .to_string(),
            Mode::GroupSelect => self
                .status
                .as_ref()
                .map_or(GROUP_HINT.to_string(), |s| s.text.clone()),
            Mode::Browse => self
                .status
                .as_ref()
                .map_or(BROWSE_HINT.to_string(), |s| s.text.clone()),
        };

        FrameModel {
            mode: self.mode,
            header: self.header(),
            body,
            window,
            reveal: self.reveal_card(),
            prompt,
            status,
            help: self.show_help,
        }
    }
}

#[cfg(test)]
impl Session {
    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn revealed(&self) -> &HashSet<String> {
        &self.revealed
    }

    pub fn browse_selection(&self) -> Selection {
        self.browse
    }
}
