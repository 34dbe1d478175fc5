//! Review domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use delicious_core::{Rating, RatingError, ReviewId, StoreId, UserId};

/// A review left on a store.
#[derive(Debug, Clone, Serialize)]
pub struct Review {
    pub id: ReviewId,
    pub author: UserId,
    /// Author display name, joined in for the store page.
    pub author_name: String,
    pub store: StoreId,
    pub text: String,
    pub rating: Rating,
    pub created: DateTime<Utc>,
}

/// Raw review form fields.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewInput {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub rating: Option<i64>,
}

/// Reasons a review form is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReviewValidationError {
    #[error("Your review must have text!")]
    MissingText,
    #[error("Please pick a rating")]
    MissingRating,
    #[error("{0}")]
    Rating(#[from] RatingError),
}

/// A validated review, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewDraft {
    pub text: String,
    pub rating: Rating,
}

impl ReviewInput {
    /// Trim the text and range-check the rating.
    ///
    /// # Errors
    ///
    /// Returns the first [`ReviewValidationError`] found.
    pub fn validate(self) -> Result<ReviewDraft, ReviewValidationError> {
        let text = self.text.trim();
        if text.is_empty() {
            return Err(ReviewValidationError::MissingText);
        }
        let rating = Rating::new(self.rating.ok_or(ReviewValidationError::MissingRating)?)?;
        Ok(ReviewDraft {
            text: text.to_owned(),
            rating,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_review() {
        let draft = ReviewInput {
            text: "  Lovely  ".to_string(),
            rating: Some(4),
        }
        .validate()
        .unwrap();
        assert_eq!(draft.text, "Lovely");
        assert_eq!(draft.rating.stars(), 4);
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        let blank = ReviewInput {
            text: " ".to_string(),
            rating: Some(3),
        };
        assert_eq!(blank.validate(), Err(ReviewValidationError::MissingText));

        let unrated = ReviewInput {
            text: "ok".to_string(),
            rating: None,
        };
        assert_eq!(unrated.validate(), Err(ReviewValidationError::MissingRating));

        let too_high = ReviewInput {
            text: "ok".to_string(),
            rating: Some(6),
        };
        assert!(matches!(too_high.validate(), Err(ReviewValidationError::Rating(_))));
    }
}
