//! Store domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use delicious_core::{GeoError, GeoPoint, Slug, StoreId, UserId};

/// Tags offered as checkboxes on the store form.
pub const TAG_CHOICES: &[&str] = &["Wifi", "Open Late", "Family Friendly", "Vegetarian", "Licensed"];

/// Image shown for stores without a photo.
pub const DEFAULT_PHOTO_URL: &str = "/static/images/store.svg";

/// Public URL of a stored photo, or the placeholder.
#[must_use]
pub fn photo_url(photo: Option<&str>) -> String {
    photo.map_or_else(|| DEFAULT_PHOTO_URL.to_owned(), |p| format!("/uploads/{p}"))
}

/// Where a store is: a point plus the human-readable address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// `{ "type": "Point", "coordinates": [lng, lat] }` on the wire.
    #[serde(flatten)]
    pub point: GeoPoint,
    /// Street address as entered.
    pub address: String,
}

/// A store listing (domain type).
#[derive(Debug, Clone, Serialize)]
pub struct Store {
    /// Unique store ID.
    #[serde(rename = "_id")]
    pub id: StoreId,
    /// Display name.
    pub name: String,
    /// URL identifier, unique across all stores.
    pub slug: Slug,
    /// Free-text description.
    pub description: Option<String>,
    /// Tags in display order, without duplicates.
    pub tags: Vec<String>,
    /// When the store was created.
    pub created: DateTime<Utc>,
    /// Coordinates and address.
    pub location: Location,
    /// Stored photo filename under the uploads directory.
    pub photo: Option<String>,
    /// The user who created the store.
    pub author: UserId,
}

impl Store {
    /// Whether `user` may edit this store.
    #[must_use]
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.author == user
    }

    /// URL of the store's photo or the placeholder.
    #[must_use]
    pub fn photo_url(&self) -> String {
        photo_url(self.photo.as_deref())
    }
}

/// Reasons a store form is rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreValidationError {
    #[error("You must supply a name!")]
    MissingName,
    #[error("You must supply an address!")]
    MissingAddress,
    #[error("You must supply coordinates!")]
    MissingCoordinates,
    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(#[from] GeoError),
}

/// Raw store form fields, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub lng: String,
    #[serde(default)]
    pub lat: String,
}

impl StoreInput {
    /// Trim and check every field, producing a draft ready to persist.
    ///
    /// # Errors
    ///
    /// Returns the first [`StoreValidationError`] found.
    pub fn validate(self) -> Result<StoreDraft, StoreValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(StoreValidationError::MissingName);
        }
        let address = self.address.trim();
        if address.is_empty() {
            return Err(StoreValidationError::MissingAddress);
        }
        if self.lng.trim().is_empty() || self.lat.trim().is_empty() {
            return Err(StoreValidationError::MissingCoordinates);
        }
        let point = GeoPoint::parse(&self.lng, &self.lat)?;

        let description = self.description.trim();
        Ok(StoreDraft {
            name: name.to_owned(),
            description: (!description.is_empty()).then(|| description.to_owned()),
            tags: normalize_tags(self.tags),
            location: Location {
                point,
                address: address.to_owned(),
            },
            photo: None,
        })
    }
}

/// A validated store, ready for create or update.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreDraft {
    pub name: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub location: Location,
    /// New photo filename. `None` on update keeps the current photo.
    pub photo: Option<String>,
}

impl StoreDraft {
    /// Attach the filename produced by the photo pipeline.
    #[must_use]
    pub fn with_photo(mut self, photo: Option<String>) -> Self {
        self.photo = photo;
        self
    }
}

/// Trim tags, drop blanks, and remove repeats while keeping first-seen order.
#[must_use]
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !seen.iter().any(|t: &String| t == tag) {
            seen.push(tag.to_owned());
        }
    }
    seen
}

/// One row of the tag cloud.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    #[serde(rename = "_id")]
    pub tag: String,
    pub count: i64,
}

/// A store in the top-rated ranking.
#[derive(Debug, Clone, Serialize)]
pub struct TopStore {
    pub slug: Slug,
    pub name: String,
    pub photo: Option<String>,
    pub average_rating: f64,
    pub review_count: i64,
}

impl TopStore {
    /// URL of the store's photo or the placeholder.
    #[must_use]
    pub fn photo_url(&self) -> String {
        photo_url(self.photo.as_deref())
    }
}

/// Compact projection returned by the proximity query.
#[derive(Debug, Clone, Serialize)]
pub struct NearbyStore {
    pub slug: Slug,
    pub name: String,
    pub description: Option<String>,
    pub photo: Option<String>,
    pub location: Location,
    /// Great-circle distance from the query point.
    pub distance_meters: f64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input() -> StoreInput {
        StoreInput {
            name: "  Wes's Coffee ".to_string(),
            description: "  Great beans  ".to_string(),
            tags: vec!["Wifi".to_string(), "Open Late".to_string(), "Wifi".to_string()],
            address: " 123 King St ".to_string(),
            lng: "-79.38".to_string(),
            lat: "43.65".to_string(),
        }
    }

    #[test]
    fn test_photo_url() {
        assert_eq!(photo_url(Some("abc.jpg")), "/uploads/abc.jpg");
        assert_eq!(photo_url(None), DEFAULT_PHOTO_URL);
    }

    #[test]
    fn test_validate_trims() {
        let draft = input().validate().unwrap();
        assert_eq!(draft.name, "Wes's Coffee");
        assert_eq!(draft.description.as_deref(), Some("Great beans"));
        assert_eq!(draft.location.address, "123 King St");
        assert_eq!(draft.tags, vec!["Wifi", "Open Late"]);
        assert!(draft.photo.is_none());
    }

    #[test]
    fn test_validate_empty_description_is_absent() {
        let draft = StoreInput {
            description: "   ".to_string(),
            ..input()
        }
        .validate()
        .unwrap();
        assert!(draft.description.is_none());
    }

    #[test]
    fn test_validate_required_fields() {
        let no_name = StoreInput {
            name: " ".to_string(),
            ..input()
        };
        assert_eq!(no_name.validate(), Err(StoreValidationError::MissingName));

        let no_address = StoreInput {
            address: String::new(),
            ..input()
        };
        assert_eq!(no_address.validate(), Err(StoreValidationError::MissingAddress));

        let no_coords = StoreInput {
            lat: String::new(),
            ..input()
        };
        assert_eq!(no_coords.validate(), Err(StoreValidationError::MissingCoordinates));
    }

    #[test]
    fn test_validate_coordinate_range() {
        let bad = StoreInput {
            lat: "123".to_string(),
            ..input()
        };
        assert!(matches!(
            bad.validate(),
            Err(StoreValidationError::InvalidCoordinates(_))
        ));
    }

    #[test]
    fn test_normalize_tags() {
        let tags = vec![
            " Vegetarian ".to_string(),
            String::new(),
            "Licensed".to_string(),
            "Vegetarian".to_string(),
        ];
        assert_eq!(normalize_tags(tags), vec!["Vegetarian", "Licensed"]);
    }

    #[test]
    fn test_location_serializes_as_geojson_with_address() {
        let location = Location {
            point: GeoPoint::new(-79.0, 43.0).unwrap(),
            address: "1 Main St".to_string(),
        };
        let json = serde_json::to_value(&location).unwrap();
        assert_eq!(json["type"], "Point");
        assert_eq!(json["coordinates"], serde_json::json!([-79.0, 43.0]));
        assert_eq!(json["address"], "1 Main St");
    }
}
