use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use ratatui_interact::components::InputState;
use ratatui_interact::traits::ClickRegionRegistry;
use ratatui_themes::{ThemeName, ThemePalette};
use tracing::{debug, error, info, warn};

use crate::config::PickerConfig;
use crate::debounce::Debouncer;
use crate::selection::{SelectedChannel, Selection, SelectionChange};
use crate::source::{SourceNode, TeamPhoto, TeamSource};
use crate::tree::{FlatRow, NodeId, PresentationNode, PresentationTree};

/// Actions that the event loop should take after handling an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    None,
    Quit,
    Accept,
}

/// Externally observable state of the picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerState {
    /// Dropdown hidden, nothing selected.
    Closed,
    /// Dropdown visible, no typed text.
    OpenEmpty,
    /// Dropdown visible with typed text (re-filter pending or applied).
    OpenFiltering,
    /// Dropdown hidden, a channel is selected.
    Selected,
}

/// Clickable areas registered by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Input,
    Clear,
    List,
}

/// Whether keystrokes go to the text input or to the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFocus {
    Input,
    List,
}

/// Result of a completed load.
#[derive(Debug, Clone, Default)]
pub struct LoadedTeams {
    pub teams: Vec<SourceNode>,
    pub photos: HashMap<String, TeamPhoto>,
}

enum Load {
    NotLoaded,
    Loading(Receiver<Option<LoadedTeams>>),
    Loaded(LoadedTeams),
    /// A load finished without data (missing scopes or a failed fetch).
    Unavailable,
}

/// Main picker state.
pub struct App {
    config: PickerConfig,

    source: Arc<dyn TeamSource>,

    load: Load,

    /// Current color theme.
    pub theme_name: ThemeName,

    /// Text typed into the picker input.
    pub input: InputState,

    /// Filter the current tree was built with. Trails `input` by the debounce.
    filter: String,

    debounce: Debouncer,

    /// Whether the dropdown is visible.
    open: bool,

    tree: Option<PresentationTree>,

    /// Visible rows of `tree`, in keyboard traversal order.
    rows: Vec<FlatRow>,

    /// Logical focus index into `rows`; `None` is "no focus".
    focus_index: Option<usize>,

    key_focus: KeyFocus,

    selection: Selection,

    /// Notifications not yet taken by the host.
    changes: Vec<SelectionChange>,

    /// First visible row of the dropdown list.
    pub list_scroll: usize,

    /// Click region registry for mouse hit-testing.
    pub click_regions: ClickRegionRegistry<Region>,
}

impl App {
    pub fn new(source: Arc<dyn TeamSource>, config: PickerConfig) -> Self {
        let debounce = Debouncer::new(config.debounce);
        Self {
            config,
            source,
            load: Load::NotLoaded,
            theme_name: ThemeName::default(),
            input: InputState::empty(),
            filter: String::new(),
            debounce,
            open: false,
            tree: None,
            rows: Vec::new(),
            focus_index: None,
            key_focus: KeyFocus::Input,
            selection: Selection::default(),
            changes: Vec::new(),
            list_scroll: 0,
            click_regions: ClickRegionRegistry::new(),
        }
    }

    #[cfg(test)]
    pub fn config(&self) -> &PickerConfig {
        &self.config
    }

    /// Get the current theme palette.
    pub fn palette(&self) -> ThemePalette {
        self.theme_name.palette()
    }

    pub fn state(&self) -> PickerState {
        match (self.open, self.selection.selected().is_some()) {
            (false, true) => PickerState::Selected,
            (false, false) => PickerState::Closed,
            (true, _) if self.text().is_empty() => PickerState::OpenEmpty,
            (true, _) => PickerState::OpenFiltering,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.load, Load::Loading(_))
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.load, Load::Loaded(_))
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self.load, Load::Unavailable)
    }

    /// Text currently in the input.
    pub fn text(&self) -> &str {
        self.input.text()
    }

    /// Filter applied to the current tree.
    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Whether typed text is waiting for the debounce to elapse.
    pub fn filter_pending(&self) -> bool {
        self.debounce.is_pending()
    }

    pub fn tree(&self) -> Option<&PresentationTree> {
        self.tree.as_ref()
    }

    pub fn rows(&self) -> &[FlatRow] {
        &self.rows
    }

    #[cfg(test)]
    pub fn focus_index(&self) -> Option<usize> {
        self.focus_index
    }

    #[cfg(test)]
    pub fn key_focus(&self) -> KeyFocus {
        self.key_focus
    }

    /// Row drawn as focused. Entering the list focuses row 0 before the
    /// logical index moves.
    pub fn highlighted_row(&self) -> Option<usize> {
        match (self.key_focus, self.focus_index) {
            (_, Some(index)) => Some(index),
            (KeyFocus::List, None) if !self.rows.is_empty() => Some(0),
            _ => None,
        }
    }

    pub fn selected(&self) -> Option<&SelectedChannel> {
        self.selection.selected()
    }

    pub fn photo(&self, team_id: &str) -> Option<&TeamPhoto> {
        match &self.load {
            Load::Loaded(loaded) => loaded.photos.get(team_id),
            _ => None,
        }
    }

    /// Drain the selection change notifications emitted so far.
    pub fn take_selection_changes(&mut self) -> Vec<SelectionChange> {
        std::mem::take(&mut self.changes)
    }

    /// How long the event loop may block before the next `tick` is due.
    pub fn poll_timeout(&self, now: Instant, idle: Duration) -> Duration {
        self.debounce
            .remaining(now)
            .map_or(idle, |remaining| remaining.min(idle))
    }

    // --- Loading ---

    /// Start the background load unless one is running or data is present.
    /// Returns whether a load was started.
    pub fn request_load(&mut self) -> bool {
        if matches!(self.load, Load::Loading(_) | Load::Loaded(_)) {
            return false;
        }

        let (tx, rx) = mpsc::channel();
        let source = Arc::clone(&self.source);
        let required = self.config.required_scopes();
        let spawned = thread::Builder::new()
            .name("team-load".to_string())
            .spawn(move || {
                let _ = tx.send(fetch_teams(source.as_ref(), required));
            });

        match spawned {
            Ok(_) => {
                debug!("team load started");
                self.load = Load::Loading(rx);
            }
            Err(err) => {
                warn!("cannot spawn load thread, loading inline: {err}");
                let loaded = fetch_teams(self.source.as_ref(), required);
                self.finish_load(loaded);
            }
        }
        true
    }

    /// Make sure data is loaded, waiting for an in-flight load or loading
    /// synchronously. Returns whether teams are available afterwards.
    pub fn ensure_loaded(&mut self) -> bool {
        let loaded = match &self.load {
            Load::Loaded(_) => return true,
            Load::Loading(rx) => rx.recv().unwrap_or(None),
            Load::NotLoaded | Load::Unavailable => {
                fetch_teams(self.source.as_ref(), self.config.required_scopes())
            }
        };
        self.finish_load(loaded);
        self.is_loaded()
    }

    fn poll_load(&mut self) {
        let outcome = match &self.load {
            Load::Loading(rx) => match rx.try_recv() {
                Ok(loaded) => Some(loaded),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => Some(None),
            },
            _ => None,
        };
        if let Some(loaded) = outcome {
            self.finish_load(loaded);
        }
    }

    fn finish_load(&mut self, loaded: Option<LoadedTeams>) {
        match loaded {
            Some(loaded) => {
                info!(teams = loaded.teams.len(), "teams loaded");
                self.load = Load::Loaded(loaded);
                // Text typed while loading becomes the first filter.
                self.debounce.cancel();
                self.filter = self.text().to_string();
                self.rebuild();
            }
            None => {
                self.load = Load::Unavailable;
                self.tree = None;
                self.rows.clear();
                self.focus_index = None;
                self.key_focus = KeyFocus::Input;
            }
        }
    }

    /// Advance timers and collect background results.
    pub fn tick(&mut self, now: Instant) {
        self.poll_load();
        if self.debounce.fire(now) {
            let text = self.text().to_string();
            self.apply_filter(text);
        }
    }

    // --- Derivation ---

    fn apply_filter(&mut self, filter: String) {
        self.filter = filter;
        self.rebuild();
    }

    /// Rebuild the presentation tree from the source and the applied filter.
    fn rebuild(&mut self) {
        self.focus_index = None;
        self.key_focus = KeyFocus::Input;
        self.list_scroll = 0;

        let Load::Loaded(loaded) = &self.load else {
            self.tree = None;
            self.rows.clear();
            return;
        };
        let tree = PresentationTree::build(&loaded.teams, &self.filter);
        self.rows = tree.flatten();
        debug!(
            filter = %self.filter,
            nodes = tree.len(),
            rows = self.rows.len(),
            "rebuilt presentation tree"
        );
        self.tree = Some(tree);
    }

    /// Recompute the visible rows after an expand/collapse.
    fn reflatten(&mut self) {
        self.rows = self.tree.as_ref().map(|t| t.flatten()).unwrap_or_default();
        if self.focus_index.is_some_and(|i| i >= self.rows.len()) {
            self.focus_index = self.rows.len().checked_sub(1);
        }
    }

    // --- Selection ---

    /// Select the channel with `channel_id`, searching the full unfiltered
    /// tree. Loads the teams first if needed.
    pub fn select_by_id(&mut self, channel_id: &str) -> bool {
        if !self.ensure_loaded() {
            return false;
        }
        let Load::Loaded(loaded) = &self.load else {
            return false;
        };

        let full = PresentationTree::build(&loaded.teams, "");
        let Some(leaf) = full.find_leaf(channel_id) else {
            debug!(channel_id, "no channel with this id");
            return false;
        };
        let change = self.selection.select(&full, Some(leaf));
        self.finish_selection(change);
        true
    }

    /// Clear the selection (the clear affordance). The dropdown stays as it was.
    pub fn clear_selection(&mut self) {
        let change = self.selection.clear();
        self.record_change(change);
    }

    /// Re-select the current selection: closes the dropdown and drops typed
    /// text without notifying.
    fn confirm_current(&mut self) {
        let current = self.selection.selected().cloned();
        let change = self.selection.set(current);
        self.finish_selection(change);
    }

    /// Common tail of every selection: clear the text, close the dropdown and
    /// show the full tree again.
    fn finish_selection(&mut self, change: Option<SelectionChange>) {
        self.record_change(change);
        self.input.clear();
        self.debounce.cancel();
        self.open = false;
        self.apply_filter(String::new());
    }

    fn record_change(&mut self, change: Option<SelectionChange>) {
        if let Some(change) = change {
            match change.0.first() {
                Some(picked) => debug!(channel = %picked.channel.id, team = %picked.team.id, "channel selected"),
                None => debug!("selection cleared"),
            }
            self.changes.push(change);
        }
    }

    // --- Dropdown ---

    /// Show the dropdown, starting the load on first use. An existing
    /// selection is kept.
    pub fn open_dropdown(&mut self) {
        if !self.open {
            debug!("dropdown opened");
        }
        self.open = true;
        if !self.request_load() && self.tree.is_none() && self.is_loaded() {
            self.rebuild();
        }
    }

    /// Focus left the picker. Without a selection the typed text is dropped.
    pub fn blur(&mut self) {
        self.open = false;
        self.focus_index = None;
        self.key_focus = KeyFocus::Input;
        if self.selection.selected().is_none() && (!self.text().is_empty() || !self.filter.is_empty()) {
            self.input.clear();
            self.debounce.cancel();
            self.apply_filter(String::new());
        }
    }

    fn on_text_changed(&mut self, now: Instant) {
        if !self.text().is_empty() {
            if let Some(label) = self.selection.selected().map(SelectedChannel::label) {
                let rest = self.text().strip_prefix(label.as_str()).map(str::to_string);
                if let Some(rest) = rest {
                    self.input.set_text(rest);
                }
                self.clear_selection();
            }
        }
        self.open = true;
        self.key_focus = KeyFocus::Input;
        self.focus_index = None;
        self.request_load();
        self.debounce.schedule(now);
    }

    // --- Keyboard ---

    pub fn handle_key(&mut self, key: KeyEvent) -> Action {
        self.handle_key_at(key, Instant::now())
    }

    pub fn handle_key_at(&mut self, key: KeyEvent, now: Instant) -> Action {
        if !self.open {
            return self.handle_closed_key(key, now);
        }

        match key.code {
            KeyCode::Down => {
                self.move_down();
                Action::None
            }
            KeyCode::Up => {
                self.move_up();
                Action::None
            }
            // Enter never reaches the text input.
            KeyCode::Enter => {
                self.activate_focused();
                Action::None
            }
            KeyCode::Esc => {
                self.confirm_current();
                Action::None
            }
            KeyCode::Tab | KeyCode::BackTab => {
                self.blur();
                Action::None
            }
            KeyCode::Backspace => {
                if self.text().is_empty() {
                    self.clear_selection();
                } else {
                    self.input.delete_char_backward();
                    self.on_text_changed(now);
                }
                Action::None
            }
            KeyCode::Delete => {
                if !self.text().is_empty() {
                    self.input.delete_char_forward();
                    self.on_text_changed(now);
                }
                Action::None
            }
            KeyCode::Left => {
                self.input.move_left();
                Action::None
            }
            KeyCode::Right => {
                self.input.move_right();
                Action::None
            }
            KeyCode::Home => {
                self.input.move_home();
                Action::None
            }
            KeyCode::End => {
                self.input.move_end();
                Action::None
            }
            KeyCode::Char(c) if !has_command_modifier(&key) => {
                self.input.insert_char(c);
                self.on_text_changed(now);
                Action::None
            }
            _ => Action::None,
        }
    }

    fn handle_closed_key(&mut self, key: KeyEvent, now: Instant) -> Action {
        match key.code {
            KeyCode::Esc => Action::Quit,
            KeyCode::Enter => {
                if self.selection.selected().is_some() {
                    return Action::Accept;
                }
                self.open_dropdown();
                Action::None
            }
            KeyCode::Backspace => {
                if self.text().is_empty() {
                    self.clear_selection();
                }
                Action::None
            }
            KeyCode::Down => {
                self.open_dropdown();
                Action::None
            }
            KeyCode::Char(c) if !has_command_modifier(&key) => {
                self.open_dropdown();
                self.input.insert_char(c);
                self.on_text_changed(now);
                Action::None
            }
            _ => Action::None,
        }
    }

    fn move_down(&mut self) {
        if self.rows.is_empty() {
            return;
        }
        // The first press only moves focus into the list; the index stays.
        if self.key_focus == KeyFocus::Input {
            self.key_focus = KeyFocus::List;
            return;
        }
        let last = self.rows.len() - 1;
        self.focus_index = Some(self.focus_index.map_or(0, |i| (i + 1).min(last)));
    }

    fn move_up(&mut self) {
        if self.rows.is_empty() || self.key_focus == KeyFocus::Input {
            return;
        }
        match self.focus_index {
            None | Some(0) => {
                self.key_focus = KeyFocus::Input;
                self.focus_index = None;
            }
            Some(i) => self.focus_index = Some(i - 1),
        }
    }

    fn activate_focused(&mut self) {
        let Some(row) = self.focus_index.and_then(|i| self.rows.get(i)).copied() else {
            return;
        };
        self.activate(row.node);
    }

    /// Toggle a team or select a channel.
    fn activate(&mut self, node: NodeId) {
        let Some(tree) = self.tree.as_mut() else {
            return;
        };
        if tree.get(node).is_some_and(PresentationNode::is_team) {
            tree.toggle_expanded(node);
            self.reflatten();
            return;
        }
        let change = self.selection.select(tree, Some(node));
        self.finish_selection(change);
    }

    // --- Mouse ---

    pub fn handle_mouse(&mut self, event: MouseEvent) -> Action {
        let hit = self
            .click_regions
            .handle_click(event.column, event.row)
            .copied();

        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                match hit {
                    Some(Region::Clear) => self.clear_selection(),
                    Some(Region::Input) => self.open_dropdown(),
                    Some(Region::List) => self.click_row(event.row),
                    None => self.blur(),
                }
                Action::None
            }
            MouseEventKind::Moved => {
                if hit == Some(Region::Input) && !self.open {
                    self.open_dropdown();
                }
                Action::None
            }
            MouseEventKind::ScrollDown if self.open => {
                self.move_down();
                Action::None
            }
            MouseEventKind::ScrollUp if self.open => {
                self.move_up();
                Action::None
            }
            _ => Action::None,
        }
    }

    fn click_row(&mut self, row: u16) {
        let Some(area) = self.region_area(Region::List) else {
            return;
        };
        // Rows live between the top and bottom borders.
        let inner_top = area.y + 1;
        let inner_bottom = area.bottom().saturating_sub(1);
        if row < inner_top || row >= inner_bottom {
            return;
        }
        let index = self.list_scroll + (row - inner_top) as usize;
        let Some(flat) = self.rows.get(index).copied() else {
            return;
        };
        self.key_focus = KeyFocus::List;
        self.focus_index = Some(index);
        self.activate(flat.node);
    }

    fn region_area(&self, region: Region) -> Option<Rect> {
        self.click_regions
            .regions()
            .iter()
            .find(|r| r.data == region)
            .map(|r| r.area)
    }

    /// Ensure the scroll offset keeps the highlighted row inside a viewport of
    /// `viewport_height` rows.
    pub fn ensure_visible(&mut self, viewport_height: usize) {
        if viewport_height == 0 {
            return;
        }
        let max_scroll = self.rows.len().saturating_sub(viewport_height);
        if let Some(index) = self.highlighted_row() {
            if index < self.list_scroll {
                self.list_scroll = index;
            } else if index >= self.list_scroll + viewport_height {
                self.list_scroll = index + 1 - viewport_height;
            }
        }
        self.list_scroll = self.list_scroll.min(max_scroll);
    }
}

/// Ctrl/Alt chords never edit the filter text.
fn has_command_modifier(key: &KeyEvent) -> bool {
    key.modifiers
        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
}

/// Permission check, then fetch. Failures end the load with no data.
fn fetch_teams(source: &dyn TeamSource, required: &[&str]) -> Option<LoadedTeams> {
    if !source.has_scopes(required) {
        warn!(?required, "required scopes not granted, teams not loaded");
        return None;
    }

    let teams = match source.fetch_teams_with_channels() {
        Ok(teams) => teams,
        Err(err) => {
            error!("failed to fetch teams: {err:#}");
            return None;
        }
    };

    let team_ids: Vec<String> = teams.iter().map(|t| t.id.clone()).collect();
    let photos = source.fetch_team_photos(&team_ids).unwrap_or_else(|err| {
        warn!("failed to fetch team photos: {err:#}");
        HashMap::new()
    });

    Some(LoadedTeams { teams, photos })
}
