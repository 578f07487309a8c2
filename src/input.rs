use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tui_textarea::{CursorMove, Input, Key, TextArea};

pub fn to_textarea_input(key: KeyEvent) -> Input {
    Input {
        key: match key.code {
            KeyCode::Char(c) => Key::Char(c),
            KeyCode::Enter => Key::Enter,
            KeyCode::Backspace => Key::Backspace,
            KeyCode::Delete => Key::Delete,
            KeyCode::Left => Key::Left,
            KeyCode::Right => Key::Right,
            KeyCode::Up => Key::Up,
            KeyCode::Down => Key::Down,
            KeyCode::Tab => Key::Tab,
            KeyCode::Home => Key::Home,
            KeyCode::End => Key::End,
            KeyCode::PageUp => Key::PageUp,
            KeyCode::PageDown => Key::PageDown,
            KeyCode::Esc => Key::Esc,
            KeyCode::F(n) => Key::F(n),
            _ => Key::Null,
        },
        ctrl: key.modifiers.contains(KeyModifiers::CONTROL),
        alt: key.modifiers.contains(KeyModifiers::ALT),
    }
}

pub fn is_ctrl(key: &KeyEvent, c: char) -> bool {
    key.code == KeyCode::Char(c) && key.modifiers.contains(KeyModifiers::CONTROL)
}

pub fn text_of(textarea: &TextArea<'_>) -> String {
    textarea.lines().join("\n")
}

pub fn char_count(textarea: &TextArea<'_>) -> usize {
    let lines = textarea.lines();
    let chars: usize = lines.iter().map(|l| l.chars().count()).sum();
    // newlines count like any other character
    chars + lines.len().saturating_sub(1)
}

/// A textarea holding `text` with the cursor at its end.
pub fn textarea_with(text: &str) -> TextArea<'static> {
    let lines: Vec<String> = if text.is_empty() {
        vec![String::new()]
    } else {
        text.split('\n').map(|s| s.to_string()).collect()
    };
    let mut textarea = TextArea::new(lines);
    textarea.move_cursor(CursorMove::Bottom);
    textarea.move_cursor(CursorMove::End);
    textarea
}

/// Feeds `key` to `textarea`. Inserting keys are dropped once the text holds
/// `max_chars` characters; Enter is dropped for single-line fields. Returns
/// true when the text changed.
pub fn feed(
    textarea: &mut TextArea<'static>,
    key: KeyEvent,
    max_chars: Option<usize>,
    multiline: bool,
) -> bool {
    let input = to_textarea_input(key);
    let inserts = match input.key {
        Key::Char(_) if !input.ctrl && !input.alt => true,
        Key::Enter | Key::Tab => true,
        _ => false,
    };
    if !multiline && matches!(input.key, Key::Enter) {
        return false;
    }
    if inserts && max_chars.is_some_and(|max| char_count(textarea) >= max) {
        return false;
    }
    let before = text_of(textarea);
    textarea.input(input);
    text_of(textarea) != before
}
