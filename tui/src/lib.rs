//! Popup TUI - Terminal host for the popup queue
//!
//! This crate hosts `popup-core` in a terminal: a drifting scene stands in
//! for the application being interrupted, and prompts are drawn over it as
//! translucent panels.
//!
//! # Architecture
//!
//! - **Surface**: Host collaborators over a terminal (8×16 pixel cells)
//! - **Compositor**: Layered rendering with z-ordering
//! - **Scene**: Background animation that stops while the host is paused
//! - **Scenarios**: Canned prompt sequences and walkthroughs
//! - **Schedule**: Persisted update-check preferences

pub mod app;
pub mod compositor;
pub mod input;
pub mod scenarios;
pub mod scene;
pub mod schedule;
pub mod surface;
pub mod theme;
pub mod widgets;

pub use app::{App, AppOptions};
pub use scenarios::Scenario;
