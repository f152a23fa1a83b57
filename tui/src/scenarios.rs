//! Demo scenarios
//!
//! Canned prompt sequences queued at startup or from the keyboard.

use std::rc::Rc;
use std::time::Duration;

use chrono::Utc;
use clap::ValueEnum;

use popup_core::{
    DependencyIssue, ErrorWalkthrough, PendingUpdate, Prompt, PromptQueue, QueueError,
    UpdateWalkthrough,
};

use crate::schedule::TerminalActions;

/// Product name shown in walkthrough titles
pub const PRODUCT: &str = "Popup Demo";

/// What to queue at startup
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// Welcome message only
    #[default]
    Welcome,
    /// A shuffled quiz question with a follow-up
    Quiz,
    /// The update walkthrough
    Updates,
    /// The dependency-error walkthrough
    Errors,
    /// Everything, one after another
    All,
    /// Start with an empty queue
    None,
}

const WELCOME_TEXT: &str = "Prompts queue up and show one at a time while the scene behind \
them is paused.\nNumber keys answer, Enter closes a message.\n\
m: message   q: quiz   f: urgent notice   u: updates   e: errors\n\
c: cancel   p: pause scene   Esc: quit";

/// Queue the prompts for `scenario`
pub fn launch(
    scenario: Scenario,
    queue: &PromptQueue,
    actions: &Rc<TerminalActions>,
) -> Result<(), QueueError> {
    tracing::info!(?scenario, "Launching scenario");
    match scenario {
        Scenario::Welcome => welcome(queue),
        Scenario::Quiz => quiz(queue),
        Scenario::Updates => updates(queue, actions),
        Scenario::Errors => errors(queue, actions),
        Scenario::All => {
            welcome(queue)?;
            quiz(queue)?;
            errors(queue, actions)?;
            updates(queue, actions)
        }
        Scenario::None => Ok(()),
    }
}

/// Keyboard help
pub fn welcome(queue: &PromptQueue) -> Result<(), QueueError> {
    queue.show_message("Welcome", WELCOME_TEXT, true)?;
    Ok(())
}

/// A plain message that does not pause the scene
pub fn message(queue: &PromptQueue, count: usize) -> Result<(), QueueError> {
    queue.show_message(
        format!("Message #{count}"),
        "This message leaves the scene running behind it.",
        false,
    )?;
    Ok(())
}

/// A forced notice that shows even while the scene is paused by hand
pub fn urgent(queue: &PromptQueue) -> Result<(), QueueError> {
    queue.enqueue(
        Prompt::message(
            "Urgent",
            "Forced prompts jump ahead of everything queued normally.",
        )
        .force_display(true)
        .pause_host(true),
    )?;
    Ok(())
}

/// Shuffled question; the answer is reported in a follow-up message
pub fn quiz(queue: &PromptQueue) -> Result<(), QueueError> {
    queue.enqueue(
        Prompt::question(
            "Quiz",
            "Which of these is a prime number? The answers are shuffled each time.",
            ["4", "9", "7", "15"],
        )
        .shuffle_answers(true)
        .pause_host(true)
        .activation_delay(Duration::from_millis(300))
        .on_resolved(|done| {
            let text = match (&done.result, done.answer_index()) {
                (_, Some(2)) => "Correct, 7 is prime.".to_string(),
                (_, Some(index)) => format!(
                    "{} is not prime. The answer was 7.",
                    done.prompt.answers().get(index).map_or("?", String::as_str)
                ),
                (Err(e), None) => format!("The quiz was interrupted: {e}"),
                (Ok(_), None) => "The quiz was dismissed.".to_string(),
            };
            if let Err(e) = done.queue.show_message("Quiz result", text, true) {
                tracing::warn!(error = %e, "Failed to queue quiz result");
            }
        }),
    )?;
    Ok(())
}

/// Update walkthrough over sample updates, unless checks are postponed
pub fn updates(queue: &PromptQueue, actions: &Rc<TerminalActions>) -> Result<(), QueueError> {
    let schedule = actions.schedule();
    if !schedule.is_due(Utc::now()) {
        tracing::info!(?schedule, "Skipping update walkthrough");
        queue.show_message(
            "Update Check",
            "Update checks are postponed or disabled. Delete the schedule file to re-enable them.",
            false,
        )?;
        return Ok(());
    }

    UpdateWalkthrough::new(
        PRODUCT,
        vec![
            PendingUpdate::new("Scene Pack", "https://example.invalid/downloads/scene-pack"),
            PendingUpdate::new("Sound Bank", "https://example.invalid/downloads/sound-bank"),
        ],
        actions.clone(),
    )
    .start(queue)?;
    Ok(())
}

/// Error walkthrough over sample dependency issues
pub fn errors(queue: &PromptQueue, actions: &Rc<TerminalActions>) -> Result<(), QueueError> {
    ErrorWalkthrough::new(
        PRODUCT,
        vec![
            DependencyIssue::new(
                "Scene Pack",
                "The scene pack needs a newer runtime than the one installed.",
            ),
            DependencyIssue::new("Sound Bank", "Sound files are missing from the install folder."),
        ],
        actions.clone(),
    )
    .start(queue)?;
    Ok(())
}
