//! Form checks that run before anything is sent to the document store.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::model::{AlbumType, ReleaseDate};

/// Rejected input. `Display` is the message shown next to the form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please fill in all required fields")]
    MissingField(&'static str),
    #[error("Month must be between 1 and 12")]
    MonthOutOfRange(u32),
    #[error("Please select a valid release type")]
    UnknownType(String),
    #[error("Please enter a valid image URL")]
    InvalidImageUrl(String),
    #[error("Please select a rating (1-10)")]
    RatingOutOfRange(u8),
    #[error("Please enter a comment")]
    EmptyComment,
}

/// Raw values from the "add album" form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AlbumDraft {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub image_url: String,
}

/// An album that passed validation but has no id, owner or timestamp yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAlbum {
    pub title: String,
    pub kind: AlbumType,
    pub image_url: Option<String>,
    pub release_date: ReleaseDate,
}

impl AlbumDraft {
    pub fn validate(&self) -> Result<NewAlbum, ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::MissingField("title"));
        }
        if self.kind.trim().is_empty() {
            return Err(ValidationError::MissingField("type"));
        }
        let kind = AlbumType::parse(&self.kind)
            .ok_or_else(|| ValidationError::UnknownType(self.kind.clone()))?;
        // The form sends 0 for an unselected month.
        let month = self
            .month
            .filter(|month| *month != 0)
            .ok_or(ValidationError::MissingField("month"))?;
        let year = self
            .year
            .filter(|year| *year != 0)
            .ok_or(ValidationError::MissingField("year"))?;
        let release_date = ReleaseDate::new(month, year)?;

        let image_url = match self.image_url.trim() {
            "" => None,
            raw if is_valid_image_url(raw) => Some(raw.to_string()),
            raw => return Err(ValidationError::InvalidImageUrl(raw.to_string())),
        };

        Ok(NewAlbum {
            title: title.to_string(),
            kind,
            image_url,
            release_date,
        })
    }
}

/// Only absolute http(s) URLs are accepted for cover art.
pub fn is_valid_image_url(raw: &str) -> bool {
    Url::parse(raw)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Raw values from the add/edit comment form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CommentDraft {
    pub rating: u8,
    #[serde(rename = "comment")]
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedComment {
    pub rating: u8,
    pub body: String,
}

impl CommentDraft {
    pub fn new(rating: u8, body: impl Into<String>) -> Self {
        Self {
            rating,
            body: body.into(),
        }
    }

    pub fn validate(&self) -> Result<ValidatedComment, ValidationError> {
        if !(1..=10).contains(&self.rating) {
            return Err(ValidationError::RatingOutOfRange(self.rating));
        }
        let body = self.body.trim();
        if body.is_empty() {
            return Err(ValidationError::EmptyComment);
        }
        Ok(ValidatedComment {
            rating: self.rating,
            body: body.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> AlbumDraft {
        AlbumDraft {
            title: "  Kid A ".to_string(),
            kind: "album".to_string(),
            month: Some(10),
            year: Some(2000),
            image_url: String::new(),
        }
    }

    #[test]
    fn accepts_minimal_album() {
        let album = draft().validate().unwrap();
        assert_eq!(album.title, "Kid A");
        assert_eq!(album.kind, AlbumType::Album);
        assert_eq!(album.image_url, None);
        assert_eq!(album.release_date, ReleaseDate::new(10, 2000).unwrap());
    }

    #[test]
    fn rejects_missing_fields() {
        let mut missing_title = draft();
        missing_title.title = "   ".to_string();
        assert_eq!(
            missing_title.validate(),
            Err(ValidationError::MissingField("title"))
        );

        let mut missing_month = draft();
        missing_month.month = Some(0);
        let err = missing_month.validate().unwrap_err();
        assert_eq!(err.to_string(), "Please fill in all required fields");
    }

    #[test]
    fn image_url_must_be_http() {
        let mut with_ftp = draft();
        with_ftp.image_url = "ftp://example.com/cover.jpg".to_string();
        assert!(matches!(
            with_ftp.validate(),
            Err(ValidationError::InvalidImageUrl(_))
        ));

        let mut with_https = draft();
        with_https.image_url = " https://img.example.com/kid-a.jpg ".to_string();
        assert_eq!(
            with_https.validate().unwrap().image_url.as_deref(),
            Some("https://img.example.com/kid-a.jpg")
        );
        assert!(!is_valid_image_url("not a url"));
    }

    #[test]
    fn comment_rating_and_body_are_required() {
        assert_eq!(
            CommentDraft::new(0, "fine").validate(),
            Err(ValidationError::RatingOutOfRange(0))
        );
        assert_eq!(
            CommentDraft::new(11, "fine").validate(),
            Err(ValidationError::RatingOutOfRange(11))
        );
        assert_eq!(
            CommentDraft::new(7, "  ").validate(),
            Err(ValidationError::EmptyComment)
        );
        assert_eq!(
            CommentDraft::new(7, " great ").validate().unwrap().body,
            "great"
        );
    }
}
