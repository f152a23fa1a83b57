//! Chained dialogs
//!
//! A wizard is a chain of prompts where each step is submitted from the
//! previous step's completion callback. [`Wizard`] owns the sequencing state
//! and a step function `(state, answer) -> StepAction`; the step function
//! never touches the queue, so a wizard's branching can be tested without a
//! display loop.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::prompt::{Completion, OnResolved, Prompt, PromptBuilder};
use crate::queue::{PromptQueue, QueueError};

/// What a wizard does after a step resolves
#[derive(Debug)]
pub enum StepAction {
    /// Submit this prompt as the next step
    Next(PromptBuilder),
    /// Submit the prompt that just resolved again
    Redisplay,
    /// End the wizard
    Finish,
}

type StepFn<S> = dyn Fn(&mut S, Option<usize>) -> StepAction;

/// Multi-step dialog driven by completion callbacks
pub struct Wizard<S> {
    state: Rc<RefCell<S>>,
    step: Rc<StepFn<S>>,
    submitted: Rc<Cell<usize>>,
    finished: Rc<Cell<bool>>,
}

impl<S> Clone for Wizard<S> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
            step: Rc::clone(&self.step),
            submitted: Rc::clone(&self.submitted),
            finished: Rc::clone(&self.finished),
        }
    }
}

impl<S: 'static> Wizard<S> {
    /// Create a wizard over `state`
    pub fn new(state: S, step: impl Fn(&mut S, Option<usize>) -> StepAction + 'static) -> Self {
        Self {
            state: Rc::new(RefCell::new(state)),
            step: Rc::new(step),
            submitted: Rc::new(Cell::new(0)),
            finished: Rc::new(Cell::new(false)),
        }
    }

    /// Submit the first step
    ///
    /// # Errors
    ///
    /// Returns the queue error if the first prompt cannot be built or
    /// submitted.
    pub fn start(&self, queue: &PromptQueue, first: PromptBuilder) -> Result<Prompt, QueueError> {
        let prompt = queue.enqueue(first.on_resolved_shared(self.callback()))?;
        self.submitted.set(self.submitted.get() + 1);
        Ok(prompt)
    }

    /// Run the step function for `answer` without touching any queue
    pub fn advance(&self, answer: Option<usize>) -> StepAction {
        let mut state = self.state.borrow_mut();
        (self.step)(&mut state, answer)
    }

    /// Read the sequencing state
    pub fn with_state<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.state.borrow())
    }

    /// Prompts submitted so far, redisplays included
    #[must_use]
    pub fn prompts_submitted(&self) -> usize {
        self.submitted.get()
    }

    /// Whether the wizard has ended
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished.get()
    }

    fn callback(&self) -> OnResolved {
        let wizard = self.clone();
        Rc::new(move |completion: &Completion<'_>| wizard.on_step(completion))
    }

    fn on_step(&self, completion: &Completion<'_>) {
        let answer = match &completion.result {
            Ok(answer) => answer.index(),
            Err(e) => {
                tracing::warn!(prompt = %completion.prompt.title(), error = %e, "Wizard stopped by collaborator failure");
                self.finished.set(true);
                return;
            }
        };

        let outcome = match self.advance(answer) {
            StepAction::Next(builder) => builder
                .on_resolved_shared(self.callback())
                .build(completion.queue.layout())
                .map_err(QueueError::from)
                .and_then(|next| completion.queue.submit(&next)),
            StepAction::Redisplay => completion.queue.submit(completion.prompt),
            StepAction::Finish => {
                tracing::debug!(prompt = %completion.prompt.title(), "Wizard finished");
                self.finished.set(true);
                return;
            }
        };

        match outcome {
            Ok(()) => self.submitted.set(self.submitted.get() + 1),
            Err(e) => {
                tracing::error!(error = %e, "Wizard could not submit its next step");
                self.finished.set(true);
            }
        }
    }
}

impl<S> std::fmt::Debug for Wizard<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wizard")
            .field("submitted", &self.submitted.get())
            .field("finished", &self.finished.get())
            .finish_non_exhaustive()
    }
}
