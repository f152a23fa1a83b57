//! Prompt Data Model
//!
//! A [`Prompt`] is a single modal notification or question. Its content is
//! fixed when it is built; only the lifecycle fields (phase, active flag,
//! selected answer) change, and only the queue and its display drivers change
//! them.
//!
//! [`Prompt`] is a cheap handle: clones refer to the same prompt, which is
//! what lets a completion callback re-submit the prompt it was called for.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

use crate::host::HostError;
use crate::layout::TextLayout;
use crate::queue::PromptQueue;

/// Number of answer keys (`1`..`6`) a prompt can offer
pub const MAX_ANSWERS: usize = 6;

/// Legacy "no answer" index
pub const NO_ANSWER: i32 = -1;

// ============================================================================
// Identifiers and enums
// ============================================================================

/// Unique prompt identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PromptId(u64);

impl PromptId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for PromptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "prompt#{}", self.0)
    }
}

/// How a prompt is resolved by the user
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PromptMode {
    /// Closed with the confirm key
    Acknowledge,
    /// Closed by picking one of the numbered answers
    Answers,
    /// No input resolves it; only cancellation ends it
    Silent,
}

/// Lifecycle position of a prompt
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PromptPhase {
    /// Built but never submitted
    #[default]
    Idle,
    /// Submitted, waiting for its turn
    Queued,
    /// Holds the active slot, waiting out its activation delay
    Waiting,
    /// On screen and accepting input
    Presenting,
    /// Resolved, cancelled or failed
    Done,
}

impl PromptPhase {
    /// Human-readable label
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Queued => "Queued",
            Self::Waiting => "Waiting",
            Self::Presenting => "Presenting",
            Self::Done => "Done",
        }
    }
}

impl std::fmt::Display for PromptPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// How a prompt's lifetime ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Answer {
    /// The confirm key closed an acknowledgement prompt
    Acknowledged,
    /// An answer was picked; the index is into the original answer list
    Selected(usize),
    /// Closed without an answer (cancelled while active)
    Dismissed,
}

impl Answer {
    /// Selected index into the original answers, if any
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Selected(i) => Some(*i),
            Self::Acknowledged | Self::Dismissed => None,
        }
    }

    /// Selected index, or `-1` when there is none
    #[must_use]
    pub fn legacy_index(&self) -> i32 {
        self.index()
            .and_then(|i| i32::try_from(i).ok())
            .unwrap_or(NO_ANSWER)
    }
}

/// Errors from building a malformed prompt
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PromptError {
    /// Acknowledgement mode and answers were both requested
    #[error("prompt `{title}` requests both acknowledgement and {answers} answer(s)")]
    ConflictingModes {
        /// Prompt title
        title: String,
        /// Number of answers supplied
        answers: usize,
    },
    /// More answers than there are answer keys
    #[error("prompt `{title}` has {count} answers; at most {max} can be offered")]
    TooManyAnswers {
        /// Prompt title
        title: String,
        /// Number of answers supplied
        count: usize,
        /// Maximum supported
        max: usize,
    },
}

// ============================================================================
// Completion callback
// ============================================================================

/// What a completion callback receives
pub struct Completion<'a> {
    /// The prompt that stopped being active
    pub prompt: &'a Prompt,
    /// How it ended, or the collaborator failure that ended it
    pub result: Result<Answer, HostError>,
    /// The queue, for submitting follow-up prompts
    pub queue: &'a PromptQueue,
}

impl Completion<'_> {
    /// Selected index into the original answers, if any
    #[must_use]
    pub fn answer_index(&self) -> Option<usize> {
        self.result.as_ref().ok().and_then(Answer::index)
    }
}

/// Completion callback, invoked once per lifetime after the prompt stops
/// being active
pub type OnResolved = Rc<dyn Fn(&Completion<'_>)>;

// ============================================================================
// Prompt
// ============================================================================

struct PromptInner {
    id: PromptId,
    title: String,
    body_lines: Vec<String>,
    answers: Vec<String>,
    /// Original answer index at each presented position
    presented: Vec<usize>,
    answer_lines: Vec<String>,
    footer_lines: RefCell<Vec<String>>,
    line_height: Cell<f64>,
    shuffle_answers: bool,
    pause_host: bool,
    require_acknowledgement: bool,
    force_display: bool,
    activation_delay: Duration,
    on_resolved: Option<OnResolved>,

    selected: Cell<Option<usize>>,
    has_been_displayed: Cell<bool>,
    is_active: Cell<bool>,
    phase: Cell<PromptPhase>,
    /// Pending or active in some queue
    live: Cell<bool>,
}

/// Handle to a modal prompt
#[derive(Clone)]
pub struct Prompt {
    inner: Rc<PromptInner>,
}

impl Prompt {
    /// Start building a prompt
    pub fn builder(title: impl Into<String>) -> PromptBuilder {
        PromptBuilder::new(title)
    }

    /// Acknowledgement prompt closed with the confirm key
    pub fn message(title: impl Into<String>, text: impl Into<String>) -> PromptBuilder {
        PromptBuilder::new(title)
            .text(text)
            .require_acknowledgement(true)
    }

    /// Multiple-choice prompt
    pub fn question<I, S>(title: impl Into<String>, text: impl Into<String>, answers: I) -> PromptBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PromptBuilder::new(title).text(text).answers(answers)
    }

    /// Unique identifier
    #[must_use]
    pub fn id(&self) -> PromptId {
        self.inner.id
    }

    /// Title line
    #[must_use]
    pub fn title(&self) -> &str {
        &self.inner.title
    }

    /// Wrapped body lines
    #[must_use]
    pub fn body_lines(&self) -> &[String] {
        &self.inner.body_lines
    }

    /// Answers in their original order
    #[must_use]
    pub fn answers(&self) -> &[String] {
        &self.inner.answers
    }

    /// Answers in the order they are shown and keyed
    #[must_use]
    pub fn answers_as_presented(&self) -> Vec<&str> {
        self.inner
            .presented
            .iter()
            .map(|&i| self.inner.answers[i].as_str())
            .collect()
    }

    /// Original answer index shown at a presented position
    #[must_use]
    pub fn answer_at_position(&self, position: usize) -> Option<usize> {
        self.inner.presented.get(position).copied()
    }

    /// Every line drawn below the title: body, numbered answers, footer
    #[must_use]
    pub fn display_lines(&self) -> Vec<String> {
        let footer = self.inner.footer_lines.borrow();
        self.inner
            .body_lines
            .iter()
            .chain(self.inner.answer_lines.iter())
            .chain(footer.iter())
            .cloned()
            .collect()
    }

    /// Vertical pitch of the body lines (before spacing)
    #[must_use]
    pub fn line_height(&self) -> f64 {
        self.inner.line_height.get()
    }

    /// How the prompt is resolved
    #[must_use]
    pub fn mode(&self) -> PromptMode {
        if self.inner.require_acknowledgement {
            PromptMode::Acknowledge
        } else if self.inner.answers.is_empty() {
            PromptMode::Silent
        } else {
            PromptMode::Answers
        }
    }

    /// Whether answers were shuffled for presentation
    #[must_use]
    pub fn shuffles_answers(&self) -> bool {
        self.inner.shuffle_answers
    }

    /// Whether the host is paused while the prompt is active
    #[must_use]
    pub fn pauses_host(&self) -> bool {
        self.inner.pause_host
    }

    /// Whether the confirm key closes this prompt
    #[must_use]
    pub fn requires_acknowledgement(&self) -> bool {
        self.inner.require_acknowledgement
    }

    /// Whether the prompt skips queue-order waiting
    #[must_use]
    pub fn forces_display(&self) -> bool {
        self.inner.force_display
    }

    /// Delay between claiming the active slot and appearing
    #[must_use]
    pub fn activation_delay(&self) -> Duration {
        self.inner.activation_delay
    }

    /// Answer picked during the latest lifetime
    #[must_use]
    pub fn selected_answer_index(&self) -> Option<usize> {
        self.inner.selected.get()
    }

    /// Answer picked during the latest lifetime, `-1` if none
    #[must_use]
    pub fn selected_answer_legacy(&self) -> i32 {
        self.selected_answer_index()
            .and_then(|i| i32::try_from(i).ok())
            .unwrap_or(NO_ANSWER)
    }

    /// Whether the prompt finished at least one presentation
    #[must_use]
    pub fn has_been_displayed(&self) -> bool {
        self.inner.has_been_displayed.get()
    }

    /// Whether the prompt is on screen and accepting input
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner.is_active.get()
    }

    /// Current lifecycle phase
    #[must_use]
    pub fn phase(&self) -> PromptPhase {
        self.inner.phase.get()
    }

    /// Whether two handles refer to the same prompt
    #[must_use]
    pub fn same(&self, other: &Prompt) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn on_resolved(&self) -> Option<OnResolved> {
        self.inner.on_resolved.clone()
    }

    // --- lifecycle, driven by the queue ---

    pub(crate) fn reset_for_submit(&self) {
        self.inner.selected.set(None);
        self.inner.has_been_displayed.set(false);
        self.inner.is_active.set(false);
        self.inner.phase.set(PromptPhase::Queued);
    }

    pub(crate) fn set_phase(&self, phase: PromptPhase) {
        self.inner.phase.set(phase);
    }

    pub(crate) fn is_live(&self) -> bool {
        self.inner.live.get()
    }

    pub(crate) fn set_live(&self, live: bool) {
        self.inner.live.set(live);
    }

    pub(crate) fn set_active(&self, active: bool) {
        self.inner.is_active.set(active);
    }

    pub(crate) fn set_selected(&self, index: Option<usize>) {
        self.inner.selected.set(index);
    }

    pub(crate) fn mark_displayed(&self) {
        self.inner.has_been_displayed.set(true);
    }

    /// Replace the footer (closing line) for this lifetime
    pub(crate) fn set_footer(&self, lines: Vec<String>, line_height: f64) {
        *self.inner.footer_lines.borrow_mut() = lines;
        if line_height > 0.0 {
            self.inner.line_height.set(line_height);
        }
    }
}

impl PartialEq for Prompt {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl Eq for Prompt {}

impl std::fmt::Debug for Prompt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Prompt")
            .field("id", &self.inner.id)
            .field("title", &self.inner.title)
            .field("mode", &self.mode())
            .field("phase", &self.phase())
            .field("selected", &self.selected_answer_index())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Builder
// ============================================================================

enum Body {
    Text(String),
    Lines(Vec<String>),
}

/// Builder for [`Prompt`]
pub struct PromptBuilder {
    title: String,
    body: Body,
    answers: Vec<String>,
    shuffle_answers: bool,
    pause_host: bool,
    require_acknowledgement: bool,
    force_display: bool,
    activation_delay: Duration,
    on_resolved: Option<OnResolved>,
}

impl PromptBuilder {
    /// Start a prompt with only a title
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: Body::Text(String::new()),
            answers: Vec::new(),
            shuffle_answers: false,
            pause_host: false,
            require_acknowledgement: false,
            force_display: false,
            activation_delay: Duration::ZERO,
            on_resolved: None,
        }
    }

    /// Body text, wrapped when the prompt is built
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.body = Body::Text(text.into());
        self
    }

    /// Pre-wrapped body lines, used as-is
    #[must_use]
    pub fn lines<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.body = Body::Lines(lines.into_iter().map(Into::into).collect());
        self
    }

    /// Numbered answers
    #[must_use]
    pub fn answers<I, S>(mut self, answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.answers = answers.into_iter().map(Into::into).collect();
        self
    }

    /// Shuffle the presented order of the answers
    #[must_use]
    pub fn shuffle_answers(mut self, shuffle: bool) -> Self {
        self.shuffle_answers = shuffle;
        self
    }

    /// Pause the host while the prompt is active
    #[must_use]
    pub fn pause_host(mut self, pause: bool) -> Self {
        self.pause_host = pause;
        self
    }

    /// Close with the confirm key (incompatible with answers)
    #[must_use]
    pub fn require_acknowledgement(mut self, require: bool) -> Self {
        self.require_acknowledgement = require;
        self
    }

    /// Skip queue-order waiting
    #[must_use]
    pub fn force_display(mut self, force: bool) -> Self {
        self.force_display = force;
        self
    }

    /// Delay between claiming the active slot and appearing
    #[must_use]
    pub fn activation_delay(mut self, delay: Duration) -> Self {
        self.activation_delay = delay;
        self
    }

    /// Completion callback
    #[must_use]
    pub fn on_resolved(mut self, callback: impl Fn(&Completion<'_>) + 'static) -> Self {
        self.on_resolved = Some(Rc::new(callback));
        self
    }

    /// Completion callback shared with other prompts (wizards)
    #[must_use]
    pub fn on_resolved_shared(mut self, callback: OnResolved) -> Self {
        self.on_resolved = Some(callback);
        self
    }

    /// Build the prompt, shuffling with the thread-local RNG
    ///
    /// # Errors
    ///
    /// See [`PromptBuilder::build_with_rng`].
    pub fn build(self, layout: &TextLayout) -> Result<Prompt, PromptError> {
        self.build_with_rng(layout, &mut rand::thread_rng())
    }

    /// Build the prompt using `rng` for the answer shuffle
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::ConflictingModes`] if acknowledgement and answers
    /// were both requested, and [`PromptError::TooManyAnswers`] if there are
    /// more answers than answer keys.
    pub fn build_with_rng<R: Rng + ?Sized>(
        self,
        layout: &TextLayout,
        rng: &mut R,
    ) -> Result<Prompt, PromptError> {
        if self.require_acknowledgement && !self.answers.is_empty() {
            return Err(PromptError::ConflictingModes {
                title: self.title,
                answers: self.answers.len(),
            });
        }
        if self.answers.len() > MAX_ANSWERS {
            return Err(PromptError::TooManyAnswers {
                title: self.title,
                count: self.answers.len(),
                max: MAX_ANSWERS,
            });
        }

        let (body_lines, mut line_height) = match self.body {
            Body::Text(text) => {
                let wrapped = layout.wrap(&text);
                (wrapped.lines, wrapped.line_height)
            }
            Body::Lines(lines) => {
                let height = lines
                    .iter()
                    .rev()
                    .find(|l| !l.trim().is_empty())
                    .map_or(0.0, |l| layout.measure(l).height);
                (lines, height)
            }
        };

        let mut presented: Vec<usize> = (0..self.answers.len()).collect();
        if self.shuffle_answers {
            presented.shuffle(rng);
        }

        let mut answer_lines = Vec::new();
        for (position, &original) in presented.iter().enumerate() {
            let wrapped = layout.wrap(&format!("[{}] {}", position + 1, self.answers[original]));
            if wrapped.line_height > 0.0 {
                line_height = wrapped.line_height;
            }
            answer_lines.extend(wrapped.lines);
        }

        Ok(Prompt {
            inner: Rc::new(PromptInner {
                id: PromptId::next(),
                title: self.title,
                body_lines,
                answers: self.answers,
                presented,
                answer_lines,
                footer_lines: RefCell::new(Vec::new()),
                line_height: Cell::new(line_height),
                shuffle_answers: self.shuffle_answers,
                pause_host: self.pause_host,
                require_acknowledgement: self.require_acknowledgement,
                force_display: self.force_display,
                activation_delay: self.activation_delay,
                on_resolved: self.on_resolved,
                selected: Cell::new(None),
                has_been_displayed: Cell::new(false),
                is_active: Cell::new(false),
                phase: Cell::new(PromptPhase::Idle),
                live: Cell::new(false),
            }),
        })
    }
}

impl std::fmt::Debug for PromptBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptBuilder")
            .field("title", &self.title)
            .field("answers", &self.answers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{FontSpec, MonospaceMeasurer};
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn layout() -> TextLayout {
        TextLayout::new(
            Rc::new(MonospaceMeasurer::terminal()),
            720.0,
            FontSpec::new("Arial Bold", 15.0),
        )
    }

    #[test]
    fn test_message_is_acknowledgement_mode() {
        let prompt = Prompt::message("Title", "Hello there").build(&layout()).unwrap();
        assert_eq!(prompt.mode(), PromptMode::Acknowledge);
        assert_eq!(prompt.body_lines(), ["Hello there"]);
        assert_eq!(prompt.phase(), PromptPhase::Idle);
        assert_eq!(prompt.selected_answer_legacy(), NO_ANSWER);
        assert_eq!(prompt.line_height(), 16.0);
    }

    #[test]
    fn test_conflicting_modes_fail_fast() {
        let result = Prompt::message("Both", "text")
            .answers(["Yes", "No"])
            .build(&layout());
        assert_eq!(
            result.unwrap_err(),
            PromptError::ConflictingModes {
                title: "Both".to_string(),
                answers: 2
            }
        );
    }

    #[test]
    fn test_too_many_answers() {
        let result = Prompt::question("Seven", "text", ["a", "b", "c", "d", "e", "f", "g"])
            .build(&layout());
        assert!(matches!(
            result,
            Err(PromptError::TooManyAnswers { count: 7, max: 6, .. })
        ));
    }

    #[test]
    fn test_silent_prompt() {
        let prompt = Prompt::builder("Loading").text("Please wait").build(&layout()).unwrap();
        assert_eq!(prompt.mode(), PromptMode::Silent);
    }

    #[test]
    fn test_answer_lines_follow_presented_order() {
        let prompt = Prompt::question("Pick", "Which?", ["A", "B", "C"])
            .build(&layout())
            .unwrap();
        assert_eq!(prompt.answers_as_presented(), vec!["A", "B", "C"]);
        assert_eq!(
            prompt.display_lines(),
            vec!["Which?", "[1] A", "[2] B", "[3] C"]
        );
    }

    #[test]
    fn test_shuffle_is_permutation() {
        let answers = ["Continue", "Open link", "Exit", "Later", "Never", "Again"];
        for seed in 0..32 {
            let prompt = Prompt::question("Shuffle", "", answers)
                .shuffle_answers(true)
                .build_with_rng(&layout(), &mut StdRng::seed_from_u64(seed))
                .unwrap();

            let mut presented = prompt.answers_as_presented();
            presented.sort_unstable();
            let mut original: Vec<&str> = answers.to_vec();
            original.sort_unstable();
            assert_eq!(presented, original);

            for position in 0..answers.len() {
                let index = prompt.answer_at_position(position).unwrap();
                assert_eq!(
                    prompt.answers()[index],
                    prompt.answers_as_presented()[position]
                );
            }
        }
    }

    #[test]
    fn test_prewrapped_lines_kept_verbatim() {
        let prompt = Prompt::builder("Lines")
            .lines(["first line", "second line"])
            .require_acknowledgement(true)
            .build(&layout())
            .unwrap();
        assert_eq!(prompt.body_lines(), ["first line", "second line"]);
        assert_eq!(prompt.line_height(), 16.0);
    }

    #[test]
    fn test_legacy_index() {
        assert_eq!(Answer::Selected(3).legacy_index(), 3);
        assert_eq!(Answer::Acknowledged.legacy_index(), -1);
        assert_eq!(Answer::Dismissed.legacy_index(), -1);
    }

    #[test]
    fn test_clones_share_identity() {
        let prompt = Prompt::message("Same", "x").build(&layout()).unwrap();
        let other = prompt.clone();
        assert!(prompt.same(&other));
        other.set_selected(Some(2));
        assert_eq!(prompt.selected_answer_index(), Some(2));

        let different = Prompt::message("Same", "x").build(&layout()).unwrap();
        assert_ne!(prompt, different);
    }
}
