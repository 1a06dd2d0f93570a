//! Album and comment records as stored in the `albums` and `comments` collections.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::format;
use crate::validate::ValidationError;

/// Release kind shown as a one-letter badge on each marker.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum AlbumType {
    #[default]
    Album,
    Single,
}

impl AlbumType {
    pub fn glyph(self) -> char {
        match self {
            AlbumType::Album => 'A',
            AlbumType::Single => 'S',
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AlbumType::Album => "album",
            AlbumType::Single => "single",
        }
    }

    /// Parses the form/select value; anything else is rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "album" => Some(AlbumType::Album),
            "single" => Some(AlbumType::Single),
            _ => None,
        }
    }
}

impl fmt::Display for AlbumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Month precision release date. Decoding goes through [`ReleaseDate::new`], so a
/// stored month outside 1-12 is rejected instead of landing on another month.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "RawReleaseDate")]
pub struct ReleaseDate {
    // Field order matters: derived `Ord` compares year first.
    pub year: i32,
    pub month: u32,
}

impl ReleaseDate {
    pub fn new(month: u32, year: i32) -> Result<Self, ValidationError> {
        if !(1..=12).contains(&month) {
            return Err(ValidationError::MonthOutOfRange(month));
        }
        Ok(Self { year, month })
    }

    /// Months elapsed since January of `reference_year`.
    pub(crate) fn months_since(self, reference_year: i32) -> i64 {
        i64::from(self.year - reference_year) * 12 + i64::from(self.month) - 1
    }

    /// "March 2023".
    pub fn label(self) -> String {
        format::format_date(self.month, self.year)
    }
}

#[derive(Deserialize)]
struct RawReleaseDate {
    month: u32,
    year: i32,
}

impl TryFrom<RawReleaseDate> for ReleaseDate {
    type Error = ValidationError;

    fn try_from(raw: RawReleaseDate) -> Result<Self, Self::Error> {
        ReleaseDate::new(raw.month, raw.year)
    }
}

impl fmt::Display for ReleaseDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// One album or single placed on the timeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(rename = "type", default)]
    pub kind: AlbumType,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub image_url: Option<String>,
    pub release_date: ReleaseDate,
    #[serde(default)]
    pub added_by: String,
    /// Unset until the server has stamped the write.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Album {
    pub fn image(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    pub fn is_owned_by(&self, uid: &str) -> bool {
        !uid.is_empty() && self.added_by == uid
    }
}

/// A rating plus review left by one user on one album.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(default)]
    pub id: String,
    pub album_id: String,
    pub user_id: String,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(deserialize_with = "rating_in_range")]
    pub rating: u8,
    #[serde(rename = "comment")]
    pub body: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Comment {
    pub fn author_label(&self) -> &str {
        match self.user_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => "Anonymous",
        }
    }

    /// Creation time in epoch milliseconds; pending server timestamps count as 0.
    pub fn created_millis(&self) -> i64 {
        self.created_at.map_or(0, |at| at.timestamp_millis())
    }

    pub fn is_edited(&self) -> bool {
        self.updated_at.is_some()
    }
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|url| !url.trim().is_empty()))
}

fn rating_in_range<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let rating = u8::deserialize(deserializer)?;
    if (1..=10).contains(&rating) {
        Ok(rating)
    } else {
        Err(de::Error::custom(ValidationError::RatingOutOfRange(rating)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn album_deserializes_collection_fields() {
        let album: Album = serde_json::from_value(serde_json::json!({
            "id": "a1",
            "title": "Blue",
            "type": "single",
            "imageUrl": "",
            "releaseDate": { "month": 6, "year": 1971 },
            "addedBy": "u1"
        }))
        .unwrap();

        assert_eq!(album.kind, AlbumType::Single);
        assert_eq!(album.image(), None);
        assert_eq!(album.release_date, ReleaseDate::new(6, 1971).unwrap());
        assert!(album.created_at.is_none());
        assert!(album.is_owned_by("u1"));
        assert!(!album.is_owned_by(""));
    }

    #[test]
    fn missing_type_defaults_to_album() {
        let album: Album = serde_json::from_value(serde_json::json!({
            "title": "Untyped",
            "releaseDate": { "month": 1, "year": 2001 }
        }))
        .unwrap();
        assert_eq!(album.kind, AlbumType::Album);
        assert_eq!(album.kind.glyph(), 'A');
    }

    #[test]
    fn release_date_orders_by_year_then_month() {
        let early = ReleaseDate::new(12, 2019).unwrap();
        let late = ReleaseDate::new(1, 2020).unwrap();
        assert!(early < late);
        assert!(ReleaseDate::new(13, 2020).is_err());
        assert!(ReleaseDate::new(0, 2020).is_err());
    }

    #[test]
    fn comment_without_name_is_anonymous() {
        let comment: Comment = serde_json::from_value(serde_json::json!({
            "albumId": "a1",
            "userId": "u2",
            "rating": 7,
            "comment": "Solid",
            "createdAt": null
        }))
        .unwrap();
        assert_eq!(comment.author_label(), "Anonymous");
        assert_eq!(comment.created_millis(), 0);
        assert!(!comment.is_edited());
    }

    #[test]
    fn decoding_rejects_months_outside_the_year() {
        for month in [0, 13] {
            let err = serde_json::from_value::<ReleaseDate>(serde_json::json!({
                "month": month,
                "year": 2020
            }))
            .unwrap_err();
            assert_eq!(err.to_string(), "Month must be between 1 and 12");
        }
        let date: ReleaseDate =
            serde_json::from_value(serde_json::json!({ "month": 12, "year": 2020 })).unwrap();
        assert_eq!(date, ReleaseDate::new(12, 2020).unwrap());
    }

    #[test]
    fn decoding_rejects_ratings_outside_one_to_ten() {
        let comment = |rating: u8| {
            serde_json::from_value::<Comment>(serde_json::json!({
                "albumId": "a1",
                "userId": "u2",
                "rating": rating,
                "comment": "Solid"
            }))
        };
        assert!(comment(1).is_ok());
        assert!(comment(10).is_ok());
        for rating in [0, 11] {
            let err = comment(rating).unwrap_err();
            assert_eq!(err.to_string(), "Please select a rating (1-10)");
        }
    }
}
