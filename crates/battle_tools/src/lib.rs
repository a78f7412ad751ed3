//! # Battle Development Tools
//!
//! Command-line tools for content authors and balance work:
//! - RON content loading and validation
//! - Seeded auto-battles with replay recording
//! - Replay verification

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod loader;
pub mod simulate;
pub mod validate;
