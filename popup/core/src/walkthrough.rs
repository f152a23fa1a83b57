//! Dependency-error and update walkthroughs
//!
//! Two wizards built on [`Wizard`]: an intro prompt, one prompt per item and a
//! summary with terminal options. Opening links and persisting update-check
//! decisions go through [`WalkthroughActions`].

use std::rc::Rc;

use chrono::{DateTime, Duration as ChronoDuration, Months, Utc};

use crate::prompt::{Prompt, PromptBuilder};
use crate::queue::{PromptQueue, QueueError};
use crate::wizard::{StepAction, Wizard};

/// Installation and troubleshooting video
pub const TROUBLESHOOTING_VIDEO_URL: &str =
    "https://youtu.be/af434m72rIo?list=PLEKypmos74W8PMP4k6xmVxpTKdebvJpFb";

/// Side effects a walkthrough can request
pub trait WalkthroughActions {
    /// Open `url` in the user's browser
    fn open_url(&self, url: &str);

    /// Skip update checks until `until`
    fn defer_update_checks(&self, until: DateTime<Utc>);

    /// Stop checking for updates for this version
    fn disable_update_checks(&self);
}

/// Position within a walkthrough
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cursor {
    /// The intro prompt
    Intro,
    /// The item at this index
    Item(usize),
    /// The summary with terminal options
    Summary,
    /// A closing acknowledgement after a terminal choice
    Closing,
}

impl Cursor {
    fn advance(self, items: usize) -> Self {
        let next = match self {
            Self::Intro => 0,
            Self::Item(i) => i + 1,
            Self::Summary | Self::Closing => return self,
        };
        if next < items {
            Self::Item(next)
        } else {
            Self::Summary
        }
    }
}

/// Comma-separated list of distinct names, in first-seen order
fn distinct_names<'a>(names: impl Iterator<Item = &'a str>) -> String {
    let mut seen: Vec<&str> = Vec::new();
    for name in names {
        if !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen.join(", ")
}

// ============================================================================
// Dependency errors
// ============================================================================

/// A plugin that failed its installation check
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DependencyIssue {
    /// Plugin name
    pub plugin: String,
    /// Installation tutorial for the plugin
    pub help_url: String,
    /// What is wrong
    pub message: String,
}

impl DependencyIssue {
    /// Issue pointing at the default installation video
    pub fn new(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            help_url: TROUBLESHOOTING_VIDEO_URL.to_string(),
            message: message.into(),
        }
    }
}

/// Walkthrough over detected installation errors
pub struct ErrorWalkthrough {
    product: String,
    issues: Vec<DependencyIssue>,
    cursor: Cursor,
    actions: Rc<dyn WalkthroughActions>,
}

impl ErrorWalkthrough {
    /// Create a walkthrough for `issues` reported by `product`
    pub fn new(
        product: impl Into<String>,
        issues: Vec<DependencyIssue>,
        actions: Rc<dyn WalkthroughActions>,
    ) -> Self {
        Self {
            product: product.into(),
            issues,
            cursor: Cursor::Intro,
            actions,
        }
    }

    /// Current position
    #[must_use]
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// The intro prompt
    #[must_use]
    pub fn intro(&self) -> PromptBuilder {
        Prompt::question(
            format!("{} detected errors", self.product),
            format!(
                "Errors were detected in your installation of the following modifications, \
                 so they will not load: {}",
                distinct_names(self.issues.iter().map(|i| i.plugin.as_str()))
            ),
            ["Continue"],
        )
    }

    fn current(&self) -> PromptBuilder {
        match self.cursor {
            Cursor::Item(i) => {
                let issue = &self.issues[i];
                Prompt::question(
                    format!("Error {}: {}", i + 1, issue.plugin),
                    issue.message.clone(),
                    ["Continue", "Open installation video tutorial for this plugin"],
                )
            }
            Cursor::Intro => self.intro(),
            Cursor::Summary | Cursor::Closing => Prompt::question(
                format!("{} detected errors", self.product),
                "To fix these installation errors, you should read the appropriate ReadMe or \
                 documentation files, watch the installation video tutorial or use the \
                 Troubleshooter (link in video description).",
                [
                    "Continue",
                    "Open installation/troubleshooting video tutorial",
                    "Exit",
                ],
            ),
        }
    }

    /// Step function
    pub fn step(&mut self, answer: Option<usize>) -> StepAction {
        match (self.cursor, answer) {
            (Cursor::Summary, Some(0)) => {
                tracing::info!("Continue pressed");
                StepAction::Finish
            }
            (_, Some(0)) => {
                tracing::info!("Continue pressed");
                self.cursor = self.cursor.advance(self.issues.len());
                StepAction::Next(self.current())
            }
            (Cursor::Item(i), Some(1)) => {
                tracing::info!(plugin = %self.issues[i].plugin, "Opening installation video");
                self.actions.open_url(&self.issues[i].help_url);
                StepAction::Redisplay
            }
            (Cursor::Summary, Some(1)) => {
                tracing::info!("Opening troubleshooting video");
                self.actions.open_url(TROUBLESHOOTING_VIDEO_URL);
                StepAction::Redisplay
            }
            _ => {
                tracing::info!(?answer, "Error walkthrough closed");
                StepAction::Finish
            }
        }
    }

    /// Submit the intro and hand back the running wizard
    ///
    /// # Errors
    ///
    /// Returns the queue error if the intro cannot be submitted.
    pub fn start(self, queue: &PromptQueue) -> Result<Wizard<Self>, QueueError> {
        let intro = self.intro();
        let wizard = Wizard::new(self, Self::step);
        wizard.start(queue, intro)?;
        Ok(wizard)
    }
}

// ============================================================================
// Updates
// ============================================================================

/// A modification with an update available
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingUpdate {
    /// Modification name
    pub name: String,
    /// Download page
    pub download_url: String,
}

impl PendingUpdate {
    /// Create an update entry
    pub fn new(name: impl Into<String>, download_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            download_url: download_url.into(),
        }
    }
}

/// How long to postpone update checks
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Deferral {
    /// Six days
    Week,
    /// One calendar month
    Month,
}

impl Deferral {
    /// When checks resume if deferred at `from`
    #[must_use]
    pub fn until(self, from: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::Week => from + ChronoDuration::days(6),
            Self::Month => from
                .checked_add_months(Months::new(1))
                .unwrap_or(from + ChronoDuration::days(30)),
        }
    }
}

/// Walkthrough over available updates
pub struct UpdateWalkthrough {
    product: String,
    updates: Vec<PendingUpdate>,
    cursor: Cursor,
    actions: Rc<dyn WalkthroughActions>,
    clock: fn() -> DateTime<Utc>,
}

impl UpdateWalkthrough {
    /// Create a walkthrough for `updates` found by `product`
    pub fn new(
        product: impl Into<String>,
        updates: Vec<PendingUpdate>,
        actions: Rc<dyn WalkthroughActions>,
    ) -> Self {
        Self {
            product: product.into(),
            updates,
            cursor: Cursor::Intro,
            actions,
            clock: Utc::now,
        }
    }

    /// Use `clock` for deferral timestamps
    #[must_use]
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Current position
    #[must_use]
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    fn title(&self) -> String {
        format!("{} Update Check", self.product)
    }

    /// The intro prompt
    #[must_use]
    pub fn intro(&self) -> PromptBuilder {
        Prompt::question(
            self.title(),
            format!(
                "Updates are available for the following modifications: {}",
                distinct_names(self.updates.iter().map(|u| u.name.as_str()))
            ),
            ["Continue"],
        )
    }

    fn current(&self) -> PromptBuilder {
        match self.cursor {
            Cursor::Item(i) => Prompt::question(
                self.title(),
                format!("Update {}: {}", i + 1, self.updates[i].name),
                ["Continue", "Go to download page"],
            ),
            Cursor::Intro => self.intro(),
            Cursor::Summary => Prompt::question(
                self.title(),
                "Please install updates to maintain stability and don't request support for \
                 old versions.",
                [
                    "-",
                    "Open installation/troubleshooting video tutorial",
                    "Continue to game.",
                    "Delay next update check by a week.",
                    "Delay next update check by a month.",
                    "Fully disable update checks (not recommended).",
                ],
            ),
            Cursor::Closing => Prompt::message(
                self.title(),
                format!(
                    "Update checking has been disabled for this version of {}. To re-enable \
                     it, delete its update schedule file. Please do not request support for \
                     old versions.",
                    self.product
                ),
            ),
        }
    }

    fn defer(&self, deferral: Deferral) -> StepAction {
        let until = deferral.until((self.clock)());
        tracing::info!(?deferral, %until, "Delaying next update check");
        self.actions.defer_update_checks(until);
        StepAction::Finish
    }

    /// Step function
    pub fn step(&mut self, answer: Option<usize>) -> StepAction {
        match (self.cursor, answer) {
            (Cursor::Closing, _) | (_, None) => StepAction::Finish,
            (Cursor::Summary, Some(0)) => StepAction::Redisplay,
            (_, Some(0)) => {
                tracing::info!("Continue pressed");
                self.cursor = self.cursor.advance(self.updates.len());
                StepAction::Next(self.current())
            }
            (Cursor::Item(i), Some(1)) => {
                tracing::info!(update = %self.updates[i].name, "Go to download pressed");
                self.actions.open_url(&self.updates[i].download_url);
                StepAction::Redisplay
            }
            (_, Some(1)) => {
                self.actions.open_url(TROUBLESHOOTING_VIDEO_URL);
                StepAction::Redisplay
            }
            (Cursor::Summary, Some(3)) => self.defer(Deferral::Week),
            (Cursor::Summary, Some(4)) => self.defer(Deferral::Month),
            (Cursor::Summary, Some(5)) => {
                tracing::info!("Disable update checks pressed");
                self.actions.disable_update_checks();
                self.cursor = Cursor::Closing;
                StepAction::Next(self.current())
            }
            _ => {
                tracing::info!(?answer, "Update walkthrough closed");
                StepAction::Finish
            }
        }
    }

    /// Submit the intro and hand back the running wizard
    ///
    /// # Errors
    ///
    /// Returns the queue error if the intro cannot be submitted.
    pub fn start(self, queue: &PromptQueue) -> Result<Wizard<Self>, QueueError> {
        let intro = self.intro();
        let wizard = Wizard::new(self, Self::step);
        wizard.start(queue, intro)?;
        Ok(wizard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{FontSpec, MonospaceMeasurer, TextLayout};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        urls: RefCell<Vec<String>>,
        deferred: RefCell<Vec<DateTime<Utc>>>,
        disabled: RefCell<bool>,
    }

    impl WalkthroughActions for Recorder {
        fn open_url(&self, url: &str) {
            self.urls.borrow_mut().push(url.to_string());
        }

        fn defer_update_checks(&self, until: DateTime<Utc>) {
            self.deferred.borrow_mut().push(until);
        }

        fn disable_update_checks(&self) {
            *self.disabled.borrow_mut() = true;
        }
    }

    fn layout() -> TextLayout {
        TextLayout::new(
            Rc::new(MonospaceMeasurer::terminal()),
            720.0,
            FontSpec::new("Arial Bold", 15.0),
        )
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 31, 12, 0, 0).unwrap()
    }

    fn next_title(action: StepAction) -> String {
        match action {
            StepAction::Next(builder) => builder.build(&layout()).unwrap().title().to_string(),
            other => panic!("expected next step, got {other:?}"),
        }
    }

    #[test]
    fn test_error_walkthrough_sequence() {
        let recorder = Rc::new(Recorder::default());
        let mut walk = ErrorWalkthrough::new(
            "Common",
            vec![
                DependencyIssue::new("Alpha", "Alpha is missing files"),
                DependencyIssue {
                    plugin: "Beta".into(),
                    help_url: "https://example.invalid/beta".into(),
                    message: "Beta is out of date".into(),
                },
            ],
            recorder.clone(),
        );

        let intro = walk.intro().build(&layout()).unwrap();
        assert_eq!(
            intro.body_lines().join(" "),
            "Errors were detected in your installation of the following modifications, so \
             they will not load: Alpha, Beta"
        );

        assert_eq!(next_title(walk.step(Some(0))), "Error 1: Alpha");
        assert_eq!(next_title(walk.step(Some(0))), "Error 2: Beta");
        assert!(matches!(walk.step(Some(1)), StepAction::Redisplay));
        assert_eq!(*recorder.urls.borrow(), vec!["https://example.invalid/beta"]);

        assert_eq!(next_title(walk.step(Some(0))), "Common detected errors");
        assert_eq!(walk.cursor(), Cursor::Summary);
        assert!(matches!(walk.step(Some(1)), StepAction::Redisplay));
        assert_eq!(recorder.urls.borrow()[1], TROUBLESHOOTING_VIDEO_URL);
        assert!(matches!(walk.step(Some(2)), StepAction::Finish));
    }

    #[test]
    fn test_update_deferrals() {
        let recorder = Rc::new(Recorder::default());
        let mut walk = UpdateWalkthrough::new(
            "Common",
            vec![PendingUpdate::new("Alpha", "https://example.invalid/alpha")],
            recorder.clone(),
        )
        .with_clock(fixed_now);

        walk.step(Some(0));
        assert_eq!(walk.cursor(), Cursor::Item(0));
        walk.step(Some(0));
        assert_eq!(walk.cursor(), Cursor::Summary);

        assert!(matches!(walk.step(Some(3)), StepAction::Finish));
        assert!(matches!(walk.step(Some(4)), StepAction::Finish));
        assert_eq!(
            *recorder.deferred.borrow(),
            vec![
                Utc.with_ymd_and_hms(2024, 2, 6, 12, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap(),
            ]
        );
    }

    #[test]
    fn test_update_disable_shows_closing_notice() {
        let recorder = Rc::new(Recorder::default());
        let mut walk = UpdateWalkthrough::new("Common", Vec::new(), recorder.clone());

        walk.step(Some(0));
        assert_eq!(walk.cursor(), Cursor::Summary);
        let closing = match walk.step(Some(5)) {
            StepAction::Next(builder) => builder.build(&layout()).unwrap(),
            other => panic!("expected closing notice, got {other:?}"),
        };
        assert!(*recorder.disabled.borrow());
        assert!(closing.requires_acknowledgement());
        assert!(matches!(walk.step(None), StepAction::Finish));
    }

    #[test]
    fn test_summary_dash_redisplays() {
        let recorder = Rc::new(Recorder::default());
        let mut walk = UpdateWalkthrough::new("Common", Vec::new(), recorder);
        walk.step(Some(0));
        assert!(matches!(walk.step(Some(0)), StepAction::Redisplay));
        assert!(matches!(walk.step(Some(2)), StepAction::Finish));
    }
}
