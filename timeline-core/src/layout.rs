//! Marker layout for the timeline canvas.
//!
//! [`TimelineLayout::build`] is the renderer without a rendering surface: it decides
//! where every year tick, month tick and album marker goes. The UI crate only turns
//! the result into elements.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::coords::{CoordinateMapper, YearRange};
use crate::model::{Album, AlbumType, ReleaseDate};
use crate::search;

/// Shown in place of cover art.
pub const PLACEHOLDER_GLYPH: &str = "🎵";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct YearMarker {
    pub year: i32,
    pub offset: f64,
    pub x: f64,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthMarker {
    pub year: i32,
    pub month: u32,
    pub offset: f64,
    pub x: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "url", rename_all = "snake_case")]
pub enum Thumbnail {
    Image(String),
    Placeholder,
}

/// One album inside a marker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlbumPin {
    pub album_id: String,
    pub title: String,
    pub album_type: AlbumType,
    pub glyph: char,
    pub thumbnail: Thumbnail,
    /// False when a search is active and this album does not match it.
    pub matched: bool,
}

impl AlbumPin {
    fn from_album(album: &Album) -> Self {
        Self {
            album_id: album.id.clone(),
            title: album.title.clone(),
            album_type: album.kind,
            glyph: album.kind.glyph(),
            thumbnail: album
                .image()
                .map_or(Thumbnail::Placeholder, |url| Thumbnail::Image(url.to_string())),
            matched: true,
        }
    }
}

/// A positioned marker: one album, or a cluster of albums sharing a release month.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlbumMarker {
    Single {
        date: ReleaseDate,
        offset: f64,
        x: f64,
        pin: AlbumPin,
        dimmed: bool,
    },
    Cluster {
        date: ReleaseDate,
        offset: f64,
        x: f64,
        pins: Vec<AlbumPin>,
        dimmed: bool,
    },
}

impl AlbumMarker {
    pub fn date(&self) -> ReleaseDate {
        match self {
            AlbumMarker::Single { date, .. } | AlbumMarker::Cluster { date, .. } => *date,
        }
    }

    pub fn offset(&self) -> f64 {
        match self {
            AlbumMarker::Single { offset, .. } | AlbumMarker::Cluster { offset, .. } => *offset,
        }
    }

    pub fn x(&self) -> f64 {
        match self {
            AlbumMarker::Single { x, .. } | AlbumMarker::Cluster { x, .. } => *x,
        }
    }

    pub fn pins(&self) -> &[AlbumPin] {
        match self {
            AlbumMarker::Single { pin, .. } => std::slice::from_ref(pin),
            AlbumMarker::Cluster { pins, .. } => pins,
        }
    }

    /// Value for the count badge on clusters.
    pub fn count(&self) -> usize {
        self.pins().len()
    }

    pub fn is_cluster(&self) -> bool {
        matches!(self, AlbumMarker::Cluster { .. })
    }

    pub fn is_dimmed(&self) -> bool {
        match self {
            AlbumMarker::Single { dimmed, .. } | AlbumMarker::Cluster { dimmed, .. } => *dimmed,
        }
    }

    fn highlight(&mut self, albums_by_id: &BTreeMap<&str, &Album>, query: &str) {
        let (pins, dimmed) = match self {
            AlbumMarker::Single { pin, dimmed, .. } => (std::slice::from_mut(pin), dimmed),
            AlbumMarker::Cluster { pins, dimmed, .. } => (pins.as_mut_slice(), dimmed),
        };
        for pin in pins.iter_mut() {
            pin.matched = albums_by_id
                .get(pin.album_id.as_str())
                .map_or(false, |album| search::matches(album, query));
        }
        *dimmed = !pins.iter().any(|pin| pin.matched);
    }
}

/// Everything the canvas needs for one render pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimelineLayout {
    pub range: YearRange,
    pub zoom: f64,
    /// Absolute offset of the canvas' left edge.
    pub origin: f64,
    pub width: f64,
    pub years: Vec<YearMarker>,
    pub months: Vec<MonthMarker>,
    pub markers: Vec<AlbumMarker>,
    /// Trimmed search query the markers were highlighted with.
    pub query: String,
}

impl TimelineLayout {
    /// Lays out `albums` (already reconciled) over `range` at `zoom`.
    pub fn build(albums: &[Album], range: YearRange, zoom: f64, mapper: &CoordinateMapper) -> Self {
        let origin = range.origin(mapper, zoom);
        let position = |date: ReleaseDate| {
            let offset = mapper.position_of(date, zoom);
            (offset, offset - origin)
        };

        let mut years = Vec::with_capacity(range.len());
        let mut months = Vec::with_capacity(range.len() * 11);
        for year in range.years() {
            let (offset, x) = position(ReleaseDate { year, month: 1 });
            years.push(YearMarker {
                year,
                offset,
                x,
                label: year.to_string(),
            });
            for month in 2..=12 {
                let (offset, x) = position(ReleaseDate { year, month });
                months.push(MonthMarker {
                    year,
                    month,
                    offset,
                    x,
                });
            }
        }

        let mut groups: BTreeMap<ReleaseDate, Vec<&Album>> = BTreeMap::new();
        for album in albums {
            groups.entry(album.release_date).or_default().push(album);
        }

        let markers = groups
            .into_iter()
            .map(|(date, group)| {
                let (offset, x) = position(date);
                match group.as_slice() {
                    [album] => AlbumMarker::Single {
                        date,
                        offset,
                        x,
                        pin: AlbumPin::from_album(album),
                        dimmed: false,
                    },
                    _ => AlbumMarker::Cluster {
                        date,
                        offset,
                        x,
                        pins: group.iter().map(|album| AlbumPin::from_album(album)).collect(),
                        dimmed: false,
                    },
                }
            })
            .collect::<Vec<_>>();

        debug!(
            start_year = range.start_year,
            end_year = range.end_year,
            zoom,
            markers = markers.len(),
            "built timeline layout"
        );

        Self {
            range,
            zoom,
            origin,
            width: range.width(mapper, zoom),
            years,
            months,
            markers,
            query: String::new(),
        }
    }

    /// Marks matching pins and dims markers with no match. `albums` must be the
    /// list the layout was built from.
    pub fn highlight(&mut self, albums: &[Album], query: &str) {
        self.query = query.trim().to_string();
        let by_id: BTreeMap<&str, &Album> =
            albums.iter().map(|album| (album.id.as_str(), album)).collect();
        for marker in &mut self.markers {
            marker.highlight(&by_id, &self.query);
        }
    }

    /// Markers not dimmed by the current query.
    pub fn visible_markers(&self) -> impl Iterator<Item = &AlbumMarker> {
        self.markers.iter().filter(|marker| !marker.is_dimmed())
    }

    pub fn visible_count(&self) -> usize {
        self.visible_markers().count()
    }

    /// True when a query is active and nothing matched.
    pub fn no_results(&self) -> bool {
        !self.query.is_empty() && self.visible_count() == 0
    }

    pub fn marker_for(&self, album_id: &str) -> Option<&AlbumMarker> {
        self.markers
            .iter()
            .find(|marker| marker.pins().iter().any(|pin| pin.album_id == album_id))
    }

    /// Canvas x for a date, whether or not an album sits there.
    pub fn x_of(&self, date: ReleaseDate, mapper: &CoordinateMapper) -> f64 {
        mapper.position_of(date, self.zoom) - self.origin
    }
}

/// Hover card shown next to the pointer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PreviewCard {
    pub album_id: String,
    pub title: String,
    pub date_label: String,
    pub image_url: Option<String>,
    pub left: f64,
    pub top: f64,
}

impl PreviewCard {
    const POINTER_GAP_X: f64 = 20.0;
    const POINTER_GAP_Y: f64 = -100.0;

    pub fn at_pointer(album: &Album, client_x: f64, client_y: f64) -> Self {
        Self {
            album_id: album.id.clone(),
            title: album.title.clone(),
            date_label: album.release_date.label(),
            image_url: album.image_url.clone(),
            left: client_x + Self::POINTER_GAP_X,
            top: client_y + Self::POINTER_GAP_Y,
        }
    }
}
