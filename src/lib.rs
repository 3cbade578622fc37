//! hscontent library
//!
//! Cached access to external education content (Khan Academy, NASA, CK-12,
//! OpenLibrary, WordsAPI), normalization into one item shape, and lesson
//! draft assembly. The binary in `main.rs` is a thin JSON-printing front end.

pub mod activity;
pub mod cache;
pub mod cli;
pub mod config;
pub mod content;
pub mod lesson;
