//! The GUI client's keyboard input-mode state machine: interprets keycodes
//! into high-level UI intents, independent of any transport (spec §4.8).
//!
//! Grounded on the tagged-union-plus-reducer shape of TUI event handling
//! (`zdx-tui`'s `UiEvent`/reducer split): a `Mode` enum carries its own
//! per-state buffer rather than a shared `void*` payload, and `handle_key`
//! plays the reducer's role of being the single place state transitions and
//! their side-effecting intents are decided.

use tracing::trace;

/// Bound on a filter-text buffer (spec §4.8: "bounded capacity, e.g. 1024 bytes").
const FILTER_CAPACITY: usize = 1024;

/// Keycodes are the source's platform-specific values, treated here as
/// opaque symbolic constants (spec §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Slash,
    Esc,
    Down,
    Up,
    J,
    K,
    Enter,
    Space,
    CmdA,
    X,
    Backspace,
    /// Any other alphanumeric / space / `_` / `-` character, appended to an
    /// in-progress filter buffer.
    Char(char),
}

/// High-level UI intents the mode machine emits for the GUI to act on. The
/// machine itself never renders anything or touches a tab list; it only
/// decides which intent a keystroke produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiIntent {
    UpdateListFilter(String),
    CommitListFilter(String),
    HideUi,
    NavigateDown,
    NavigateUp,
    ActivateToTab,
    SelectTab,
    SelectAllTabs,
    CloseSelectedTabs,
    AdhereToMode,
}

/// The three reachable modes. The spec's `Unknown` initial pseudostate
/// exists only until [`ModeMachine::new`] assigns `ListNormal`, so it has
/// no runtime representation here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    ListNormal { filter: String },
    FilterInflight { buffer: String },
    Multiselect { filter_text: String },
}

impl Mode {
    fn list_normal(filter: String) -> Self {
        Mode::ListNormal { filter: truncate(filter) }
    }

    fn filter_inflight(buffer: String) -> Self {
        Mode::FilterInflight { buffer: truncate(buffer) }
    }

    fn multiselect(filter_text: String) -> Self {
        Mode::Multiselect { filter_text: truncate(filter_text) }
    }
}

fn truncate(mut s: String) -> String {
    if s.len() > FILTER_CAPACITY {
        s.truncate(FILTER_CAPACITY);
    }
    s
}

pub struct ModeMachine {
    mode: Mode,
}

impl Default for ModeMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ModeMachine {
    pub fn new() -> Self {
        Self {
            mode: Mode::list_normal(String::new()),
        }
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    /// Handle one keystroke, returning the intent it produces (if any).
    pub fn handle_key(&mut self, key: Key) -> Option<UiIntent> {
        let (next_mode, intent) = match &self.mode {
            Mode::ListNormal { filter } => self.handle_list_normal(filter.clone(), key),
            Mode::FilterInflight { buffer } => self.handle_filter_inflight(buffer.clone(), key),
            Mode::Multiselect { filter_text } => self.handle_multiselect(filter_text.clone(), key),
        };
        if let Some(next) = next_mode {
            trace!(?next, "mode transition");
            self.mode = next;
        }
        intent
    }

    /// Spec §4.8: "when the list length becomes zero in Multiselect, the
    /// state auto-returns to ListNormal emitting AdhereToMode." The filter
    /// transfer for this auto-return follows the same "copy filter_text"
    /// rule the transfer matrix gives for every other Multiselect→ListNormal
    /// transition.
    pub fn notify_list_len(&mut self, len: usize) -> Option<UiIntent> {
        if len != 0 {
            return None;
        }
        match &self.mode {
            Mode::Multiselect { filter_text } => {
                self.mode = Mode::list_normal(filter_text.clone());
                Some(UiIntent::AdhereToMode)
            }
            _ => None,
        }
    }

    fn handle_list_normal(&self, filter: String, key: Key) -> (Option<Mode>, Option<UiIntent>) {
        match key {
            // Entering FilterInflight never copies ListNormal's filter
            // (spec §4.8 "clears inflight buffer; does NOT copy").
            Key::Slash => (Some(Mode::filter_inflight(String::new())), None),
            Key::Esc if !filter.is_empty() => {
                (Some(Mode::list_normal(String::new())), Some(UiIntent::UpdateListFilter(String::new())))
            }
            Key::Esc => (None, Some(UiIntent::HideUi)),
            Key::J | Key::Down => (None, Some(UiIntent::NavigateDown)),
            Key::K | Key::Up => (None, Some(UiIntent::NavigateUp)),
            Key::Enter => (None, Some(UiIntent::ActivateToTab)),
            Key::Space => (Some(Mode::multiselect(filter)), Some(UiIntent::SelectTab)),
            Key::CmdA => (Some(Mode::multiselect(filter)), Some(UiIntent::SelectAllTabs)),
            Key::X => (None, Some(UiIntent::CloseSelectedTabs)),
            Key::Backspace | Key::Char(_) => (None, None),
        }
    }

    fn handle_filter_inflight(&self, buffer: String, key: Key) -> (Option<Mode>, Option<UiIntent>) {
        match key {
            Key::Esc => (Some(Mode::list_normal(String::new())), None),
            Key::Enter => {
                let committed = buffer.clone();
                (Some(Mode::list_normal(committed.clone())), Some(UiIntent::CommitListFilter(committed)))
            }
            Key::Backspace => {
                let mut next = buffer;
                next.pop();
                (Some(Mode::filter_inflight(next.clone())), Some(UiIntent::UpdateListFilter(next)))
            }
            Key::Char(c) if is_filter_char(c) => {
                let mut next = buffer;
                if next.len() < FILTER_CAPACITY {
                    next.push(c);
                }
                (Some(Mode::filter_inflight(next.clone())), Some(UiIntent::UpdateListFilter(next)))
            }
            Key::Char(_) | Key::Slash | Key::Space | Key::CmdA | Key::X | Key::J | Key::K | Key::Down | Key::Up => {
                (None, None)
            }
        }
    }

    fn handle_multiselect(&self, filter_text: String, key: Key) -> (Option<Mode>, Option<UiIntent>) {
        match key {
            Key::Esc => (Some(Mode::list_normal(filter_text)), None),
            Key::J | Key::Down => (None, Some(UiIntent::NavigateDown)),
            Key::K | Key::Up => (None, Some(UiIntent::NavigateUp)),
            Key::Space => (None, Some(UiIntent::SelectTab)),
            Key::CmdA => (None, Some(UiIntent::SelectAllTabs)),
            Key::X => (None, Some(UiIntent::CloseSelectedTabs)),
            Key::Enter | Key::Slash | Key::Backspace | Key::Char(_) => (None, None),
        }
    }
}

fn is_filter_char(c: char) -> bool {
    c.is_alphanumeric() || c == ' ' || c == '_' || c == '-'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slash_does_not_copy_list_normal_filter() {
        let mut m = ModeMachine::new();
        m.handle_key(Key::Char('a'));
        // ListNormal never mutates its filter on plain chars; seed it directly
        // via the filter-inflight commit path instead.
        m.handle_key(Key::Slash);
        m.handle_key(Key::Char('a'));
        m.handle_key(Key::Char('b'));
        m.handle_key(Key::Char('c'));
        m.handle_key(Key::Enter); // commit "abc" into ListNormal
        assert_eq!(m.mode(), &Mode::ListNormal { filter: "abc".to_string() });

        m.handle_key(Key::Slash);
        assert_eq!(m.mode(), &Mode::FilterInflight { buffer: String::new() });
    }

    #[test]
    fn new_search_clears_old_inflight_buffer() {
        let mut m = ModeMachine::new();
        m.handle_key(Key::Slash);
        m.handle_key(Key::Char('a'));
        m.handle_key(Key::Char('b'));
        m.handle_key(Key::Char('c'));
        m.handle_key(Key::Enter);
        assert_eq!(m.mode(), &Mode::ListNormal { filter: "abc".to_string() });

        m.handle_key(Key::Slash);
        m.handle_key(Key::Char('d'));
        assert_eq!(m.mode(), &Mode::FilterInflight { buffer: "d".to_string() });
    }

    #[test]
    fn filter_transfer_round_trip_through_multiselect() {
        let mut m = ModeMachine::new();
        m.handle_key(Key::Slash);
        m.handle_key(Key::Char('x'));
        m.handle_key(Key::Char('y'));
        m.handle_key(Key::Char('z'));
        m.handle_key(Key::Enter);
        assert_eq!(m.mode(), &Mode::ListNormal { filter: "xyz".to_string() });

        m.handle_key(Key::Space);
        assert_eq!(m.mode(), &Mode::Multiselect { filter_text: "xyz".to_string() });

        m.handle_key(Key::Esc);
        assert_eq!(m.mode(), &Mode::ListNormal { filter: "xyz".to_string() });

        m.handle_key(Key::Esc);
        assert_eq!(m.mode(), &Mode::ListNormal { filter: String::new() });
    }

    #[test]
    fn esc_on_empty_filter_emits_hide_ui() {
        let mut m = ModeMachine::new();
        let intent = m.handle_key(Key::Esc);
        assert_eq!(intent, Some(UiIntent::HideUi));
    }

    #[test]
    fn multiselect_auto_returns_when_list_empties() {
        let mut m = ModeMachine::new();
        m.handle_key(Key::Slash);
        m.handle_key(Key::Char('q'));
        m.handle_key(Key::Enter);
        m.handle_key(Key::Space);
        assert!(matches!(m.mode(), Mode::Multiselect { .. }));

        let intent = m.notify_list_len(0);
        assert_eq!(intent, Some(UiIntent::AdhereToMode));
        assert_eq!(m.mode(), &Mode::ListNormal { filter: "q".to_string() });
    }

    #[test]
    fn backspace_shortens_inflight_buffer() {
        let mut m = ModeMachine::new();
        m.handle_key(Key::Slash);
        m.handle_key(Key::Char('a'));
        m.handle_key(Key::Char('b'));
        let intent = m.handle_key(Key::Backspace);
        assert_eq!(intent, Some(UiIntent::UpdateListFilter("a".to_string())));
    }

    #[test]
    fn cmd_a_selects_all_and_enters_multiselect() {
        let mut m = ModeMachine::new();
        let intent = m.handle_key(Key::CmdA);
        assert_eq!(intent, Some(UiIntent::SelectAllTabs));
        assert!(matches!(m.mode(), Mode::Multiselect { .. }));
    }
}
