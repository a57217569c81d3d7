//! View-model components shared by templates.

pub mod chart;

pub use chart::{Bar, BarChart};
