use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::core::navigator::Intent;
use crate::utils::logger;

/// Maps a key press to a navigation intent.
pub fn intent_for_key(key: &KeyEvent) -> Option<Intent> {
    // Windows also reports releases.
    if key.kind == KeyEventKind::Release {
        return None;
    }

    match key.code {
        KeyCode::Right | KeyCode::Char('l') | KeyCode::Char(' ') => Some(Intent::Next),
        KeyCode::Left | KeyCode::Char('h') => Some(Intent::Previous),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Intent::Quit),
        KeyCode::Char('r') => Some(Intent::Rewind),
        KeyCode::Char('q') | KeyCode::Esc => Some(Intent::Quit),
        _ => None,
    }
}

/// Blocking stream of intents read from the terminal.
///
/// Ends when reading input fails.
pub struct TerminalIntents;

impl Iterator for TerminalIntents {
    type Item = Intent;

    fn next(&mut self) -> Option<Intent> {
        loop {
            match event::read() {
                Ok(Event::Key(key)) => {
                    if let Some(intent) = intent_for_key(&key) {
                        return Some(intent);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    logger::error(&format!("Input error: {}", e));
                    return None;
                }
            }
        }
    }
}
