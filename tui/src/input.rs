//! Keyboard mapping
//!
//! Number keys and Enter go to the prompt being shown; letters drive the
//! demo itself.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use popup_core::Key;

/// What a key press means to the application
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Answer key for the active prompt
    Prompt(Key),
    /// Queue a plain message
    Message,
    /// Queue a shuffled quiz question
    Quiz,
    /// Queue a forced notice that ignores the scene pause
    Urgent,
    /// Start the update walkthrough
    Updates,
    /// Start the dependency-error walkthrough
    Errors,
    /// Cancel the active prompt
    Cancel,
    /// Pause or resume the scene from outside the queue
    TogglePause,
    /// Leave the application
    Quit,
}

/// Map a key event to a command
pub fn command_for(key: KeyEvent) -> Option<Command> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q'))
            .then_some(Command::Quit);
    }

    match key.code {
        KeyCode::Enter => Some(Command::Prompt(Key::Confirm)),
        KeyCode::Char(c @ '1'..='9') => c
            .to_digit(10)
            .and_then(|d| u8::try_from(d).ok())
            .map(|d| Command::Prompt(Key::Digit(d))),
        KeyCode::Char('m') => Some(Command::Message),
        KeyCode::Char('q') => Some(Command::Quiz),
        KeyCode::Char('f') => Some(Command::Urgent),
        KeyCode::Char('u') => Some(Command::Updates),
        KeyCode::Char('e') => Some(Command::Errors),
        KeyCode::Char('c') | KeyCode::Backspace => Some(Command::Cancel),
        KeyCode::Char('p') => Some(Command::TogglePause),
        KeyCode::Esc => Some(Command::Quit),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_digits_and_enter_reach_the_prompt() {
        assert_eq!(
            command_for(press(KeyCode::Char('3'))),
            Some(Command::Prompt(Key::Digit(3)))
        );
        assert_eq!(
            command_for(press(KeyCode::Enter)),
            Some(Command::Prompt(Key::Confirm))
        );
        assert_eq!(command_for(press(KeyCode::Char('0'))), None);
    }

    #[test]
    fn test_quit_keys() {
        assert_eq!(command_for(press(KeyCode::Esc)), Some(Command::Quit));
        assert_eq!(
            command_for(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Command::Quit)
        );
        assert_eq!(command_for(press(KeyCode::Char('c'))), Some(Command::Cancel));
    }
}
