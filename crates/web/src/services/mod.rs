//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Registration, login, account updates, password resets (Argon2)
//! - `email` - Transactional email over SMTP
//! - `password_reset` - Issuing and validating reset tokens
//! - `photos` - Resizing and storing uploaded store photos

pub mod auth;
pub mod email;
pub mod password_reset;
pub mod photos;

pub use auth::{AuthError, AuthService, Registration};
pub use email::{EmailError, EmailService};
pub use password_reset::{ResetError, ResetRequest};
pub use photos::{PhotoError, PhotoStore, PhotoUpload};
