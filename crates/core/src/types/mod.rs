//! Core types for Delicious.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod geo;
pub mod id;
pub mod page;
pub mod rating;
pub mod slug;

pub use email::{Email, EmailError};
pub use geo::{GeoError, GeoPoint};
pub use id::*;
pub use page::{PageRequest, Pagination};
pub use rating::{Rating, RatingError};
pub use slug::{Slug, disambiguate, slugify};
