use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Logical input the session reacts to, independent of the concrete key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    MoveUp,
    MoveDown,
    PageUp,
    PageDown,
    Insert(char),
    EraseChar,
    Confirm,
    Cancel,
    ToggleGroups,
    Copy,
    Help,
    Quit,
}

pub const BROWSE_HINT: &str =
    "↑/↓ move | type to search | Enter reveal | Ctrl+G groups | Ctrl+C copy | ? help | Ctrl+Q quit";
pub const GROUP_HINT: &str = "↑/↓ move | type to filter | Enter select | Esc/Ctrl+G back | Ctrl+Q quit";
pub const REVEAL_HINT: &str = "Press ESC to return to search... | Ctrl+C copy | Ctrl+Q quit";

pub const HELP_LINES: [&str; 12] = [
    "Browse",
    "  ↑/↓ PgUp/PgDn   move selection",
    "  type / Bksp     edit search (text or # position)",
    "  Enter           reveal selected code",
    "  Esc             clear search and group",
    "  Ctrl+G          choose a group",
    "  Ctrl+C          copy selected code",
    "  Ctrl+Q          quit",
    "Reveal",
    "  Esc/Bksp returns, Ctrl+C copies, idle for 60s hides the code",
    "",
    "Press any key to close",
];

pub fn map_key(key: KeyEvent) -> Option<Action> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => Some(Action::Quit),
            KeyCode::Char('c') | KeyCode::Char('C') => Some(Action::Copy),
            KeyCode::Char('g') | KeyCode::Char('G') => Some(Action::ToggleGroups),
            _ => None,
        };
    }
    match key.code {
        KeyCode::Up => Some(Action::MoveUp),
        KeyCode::Down => Some(Action::MoveDown),
        KeyCode::PageUp => Some(Action::PageUp),
        KeyCode::PageDown => Some(Action::PageDown),
        KeyCode::Enter => Some(Action::Confirm),
        KeyCode::Esc => Some(Action::Cancel),
        KeyCode::Backspace | KeyCode::Delete => Some(Action::EraseChar),
        KeyCode::F(1) | KeyCode::Char('?') => Some(Action::Help),
        KeyCode::Char(c) if !c.is_control() => Some(Action::Insert(c)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    #[test]
    fn control_chords_map_to_commands() {
        assert_eq!(map_key(ctrl('q')), Some(Action::Quit));
        assert_eq!(map_key(ctrl('c')), Some(Action::Copy));
        assert_eq!(map_key(ctrl('g')), Some(Action::ToggleGroups));
        assert_eq!(map_key(ctrl('x')), None);
    }

    #[test]
    fn printable_characters_are_search_input() {
        assert_eq!(map_key(key(KeyCode::Char('a'))), Some(Action::Insert('a')));
        assert_eq!(
            map_key(KeyEvent::new(KeyCode::Char('A'), KeyModifiers::SHIFT)),
            Some(Action::Insert('A'))
        );
        assert_eq!(map_key(key(KeyCode::Char('?'))), Some(Action::Help));
    }

    #[test]
    fn navigation_and_editing_keys() {
        assert_eq!(map_key(key(KeyCode::Up)), Some(Action::MoveUp));
        assert_eq!(map_key(key(KeyCode::PageDown)), Some(Action::PageDown));
        assert_eq!(map_key(key(KeyCode::Backspace)), Some(Action::EraseChar));
        assert_eq!(map_key(key(KeyCode::Enter)), Some(Action::Confirm));
        assert_eq!(map_key(key(KeyCode::Esc)), Some(Action::Cancel));
        assert_eq!(map_key(key(KeyCode::Tab)), None);
    }

    #[test]
    fn key_releases_are_ignored() {
        let mut release = key(KeyCode::Enter);
        release.kind = KeyEventKind::Release;
        assert_eq!(map_key(release), None);
    }
}
