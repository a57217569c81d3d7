//! ServiceFlow Core - Shared types library.
//!
//! This crate provides the types the ServiceFlow console shares with its
//! tests:
//! - `console` - Server-rendered helpdesk console over the ServiceFlow REST API
//! - `integration-tests` - End-to-end tests against a mocked API
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O and no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Typed ids, emails, ticket status/priority, roles, providers
//! - [`worklog`] - Aggregation of work intervals into elapsed minutes
//! - [`text`] - Excerpts, initials and display names for views

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod text;
pub mod types;
pub mod worklog;

pub use types::*;
