//! Delicious: find, review and heart local stores.
//!
//! The web app as a library, so the binary, the CLI and the integration
//! tests share one set of repositories and services.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod flash;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
