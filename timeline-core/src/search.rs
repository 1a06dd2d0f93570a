//! Free-text search over the album list.
//!
//! Matching only decides what gets dimmed and what shows up in the dropdown; the
//! sorted album list itself is never touched.

use serde::{Deserialize, Serialize};

use crate::model::Album;

/// Normalised query: trimmed and lower-cased.
fn normalise(query: &str) -> String {
    query.trim().to_lowercase()
}

fn haystack(album: &Album) -> String {
    format!(
        "{} {} {} {}",
        album.title,
        album.kind,
        album.release_date.label(),
        album.release_date.year
    )
    .to_lowercase()
}

/// Case-insensitive substring match over title, type, date label and year.
pub fn matches(album: &Album, query: &str) -> bool {
    let query = normalise(query);
    query.is_empty() || haystack(album).contains(&query)
}

/// Albums that match, in their original order.
pub fn filter<'a>(albums: &'a [Album], query: &str) -> Vec<&'a Album> {
    let query = normalise(query);
    albums
        .iter()
        .filter(|album| query.is_empty() || haystack(album).contains(&query))
        .collect()
}

/// One entry in the dropdown under the search box.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub album_id: String,
    pub title: String,
    pub date_label: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchResults {
    pub query: String,
    /// Every matching album, not just the ones listed in `hits`.
    pub total_matches: usize,
    pub hits: Vec<SearchHit>,
    /// Set when a non-empty query matched nothing.
    pub no_results: bool,
}

impl SearchResults {
    /// Dropdown content; empty queries produce no dropdown at all.
    pub fn collect(albums: &[Album], query: &str, limit: usize) -> Self {
        let normalised = normalise(query);
        if normalised.is_empty() {
            return Self::default();
        }

        let matched = filter(albums, &normalised);
        Self {
            query: normalised,
            total_matches: matched.len(),
            no_results: matched.is_empty(),
            hits: matched
                .into_iter()
                .take(limit)
                .map(|album| SearchHit {
                    album_id: album.id.clone(),
                    title: album.title.clone(),
                    date_label: album.release_date.label(),
                    image_url: album.image_url.clone(),
                })
                .collect(),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.query.is_empty()
    }
}
