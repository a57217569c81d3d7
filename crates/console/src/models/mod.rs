//! Session-backed models for the console.

pub mod preferences;
pub mod session;

pub use preferences::{Preferences, THEMES, Theme};
pub use session::{CurrentUser, keys as session_keys};
