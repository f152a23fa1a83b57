//! App tests over ratatui's test backend
//!
//! Drive the frame loop by hand: `frame` then `draw`, exactly what the
//! event loop does on each tick, with key presses fed in between.

use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use pretty_assertions::assert_eq;
use ratatui::backend::TestBackend;
use ratatui::Terminal;
use tempfile::TempDir;

use popup_core::{PopupConfig, RenderSurface, Resolution};
use popup_tui::schedule::UpdateCheckSchedule;
use popup_tui::{App, AppOptions, Scenario};

const FRAME: Duration = Duration::from_millis(16);

fn setup(scenario: Scenario) -> (App, Terminal<TestBackend>) {
    let options = AppOptions {
        scenario,
        ..AppOptions::default()
    };
    let app = App::new((240, 67), PopupConfig::default(), &options).unwrap();
    let terminal = Terminal::new(TestBackend::new(240, 67)).unwrap();
    (app, terminal)
}

fn step(app: &mut App, terminal: &mut Terminal<TestBackend>) {
    app.frame(FRAME);
    app.draw(terminal).unwrap();
}

fn key(app: &mut App, code: KeyCode) {
    app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
}

fn screen_contains(terminal: &Terminal<TestBackend>, needle: &str) -> bool {
    let buf = terminal.backend().buffer();
    (0..buf.area.height).any(|y| {
        let row: String = (0..buf.area.width).map(|x| buf[(x, y)].symbol()).collect();
        row.contains(needle)
    })
}

fn active_title(app: &App) -> Option<String> {
    app.queue()
        .active_prompt()
        .filter(|p| p.is_active())
        .map(|p| p.title().to_string())
}

#[test]
fn test_welcome_is_drawn_and_closed_with_enter() {
    let (mut app, mut terminal) = setup(Scenario::Welcome);

    for _ in 0..4 {
        step(&mut app, &mut terminal);
    }
    assert_eq!(active_title(&app).as_deref(), Some("Welcome"));
    assert!(screen_contains(&terminal, "Welcome"));
    assert!(screen_contains(&terminal, "Press Enter to close."));
    assert!(screen_contains(&terminal, "scene PAUSED"));

    key(&mut app, KeyCode::Enter);
    step(&mut app, &mut terminal);
    step(&mut app, &mut terminal);

    assert!(app.queue().is_idle());
    assert_eq!(app.host().hook_count(), 0);
    assert!(!screen_contains(&terminal, "Press Enter to close."));
    assert!(screen_contains(&terminal, "scene running"));
}

#[test]
fn test_manual_pause_holds_messages_but_not_urgent_notices() {
    let (mut app, mut terminal) = setup(Scenario::None);

    key(&mut app, KeyCode::Char('p'));
    key(&mut app, KeyCode::Char('m'));
    for _ in 0..10 {
        step(&mut app, &mut terminal);
    }
    assert_eq!(active_title(&app), None);
    assert_eq!(app.queue().pending_len(), 1);

    key(&mut app, KeyCode::Char('f'));
    for _ in 0..4 {
        step(&mut app, &mut terminal);
    }
    assert_eq!(active_title(&app).as_deref(), Some("Urgent"));

    key(&mut app, KeyCode::Enter);
    step(&mut app, &mut terminal);
    // Scene is still paused by hand, so the message keeps waiting
    for _ in 0..5 {
        step(&mut app, &mut terminal);
    }
    assert_eq!(active_title(&app), None);

    key(&mut app, KeyCode::Char('p'));
    for _ in 0..4 {
        step(&mut app, &mut terminal);
    }
    assert_eq!(active_title(&app).as_deref(), Some("Message #1"));
}

#[test]
fn test_cancel_dismisses_the_active_prompt() {
    let (mut app, mut terminal) = setup(Scenario::Welcome);
    for _ in 0..4 {
        step(&mut app, &mut terminal);
    }
    let prompt = app.queue().active_prompt().unwrap();

    key(&mut app, KeyCode::Char('c'));
    step(&mut app, &mut terminal);

    assert!(!prompt.is_active());
    assert_eq!(prompt.selected_answer_index(), None);
    assert!(app.queue().is_idle());
}

#[test]
fn test_quiz_result_follows_the_answer() {
    let (mut app, mut terminal) = setup(Scenario::Quiz);
    for _ in 0..40 {
        step(&mut app, &mut terminal);
    }
    let prompt = app.queue().active_prompt().unwrap();
    assert_eq!(prompt.title(), "Quiz");

    let position = prompt
        .answers_as_presented()
        .iter()
        .position(|a| *a == "4")
        .unwrap();
    let digit = char::from(b'1' + u8::try_from(position).unwrap());
    key(&mut app, KeyCode::Char(digit));
    for _ in 0..4 {
        step(&mut app, &mut terminal);
    }

    assert_eq!(prompt.selected_answer_index(), Some(0));
    assert_eq!(active_title(&app).as_deref(), Some("Quiz result"));
    assert!(screen_contains(&terminal, "4 is not prime. The answer was 7."));
}

#[test]
fn test_update_deferral_is_persisted() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("checks.toml");
    let options = AppOptions {
        scenario: Scenario::Updates,
        schedule_path: Some(path.clone()),
        ..AppOptions::default()
    };
    let mut app = App::new((240, 67), PopupConfig::default(), &options).unwrap();
    let mut terminal = Terminal::new(TestBackend::new(240, 67)).unwrap();

    // Intro, two updates, then the summary
    for answer in ['1', '1', '1', '4'] {
        for _ in 0..4 {
            step(&mut app, &mut terminal);
        }
        key(&mut app, KeyCode::Char(answer));
        step(&mut app, &mut terminal);
    }

    let schedule = UpdateCheckSchedule::load(&path).unwrap();
    assert!(!schedule.disabled);
    assert!(schedule.next_check.is_some());
    assert!(app
        .host()
        .notices()
        .iter()
        .any(|n| n.text.starts_with("Update checks postponed until")));
}

#[test]
fn test_quit_and_resize() {
    let (mut app, mut terminal) = setup(Scenario::None);

    app.handle_resize(100, 30);
    step(&mut app, &mut terminal);
    assert_eq!(app.host().resolution(), Resolution::new(800, 480));

    assert!(app.is_running());
    key(&mut app, KeyCode::Esc);
    assert!(!app.is_running());
}
