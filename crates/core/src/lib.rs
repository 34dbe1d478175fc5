//! Delicious Core - Shared domain types.
//!
//! This crate provides the types used across all Delicious components:
//! - `web` - The server-rendered store directory
//! - `cli` - Command-line tools for migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. Anything that can be decided without talking to Postgres
//! (slug normalization, pagination arithmetic, coordinate validation) lives here
//! so it can be unit tested in isolation.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, emails, slugs, coordinates and ratings

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
