//! Domain models.
//!
//! Validated domain objects, separate from the database row types that live
//! next to their queries in [`crate::db`].

pub mod review;
pub mod session;
pub mod store;
pub mod user;

pub use review::{Review, ReviewDraft, ReviewInput, ReviewValidationError};
pub use session::{CurrentUser, Flash, FlashLevel, FlashLink};
pub use store::{
    Location, NearbyStore, Store, StoreDraft, StoreInput, StoreValidationError, TagCount,
    TopStore, TAG_CHOICES,
};
pub use user::User;
