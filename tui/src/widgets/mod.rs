//! Widgets

pub mod text_block;
