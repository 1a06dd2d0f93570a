//! Mapping between release dates and horizontal pixel offsets.

use serde::{Deserialize, Serialize};

use crate::model::{Album, ReleaseDate};
use crate::TimelineConfig;

/// Linear date <-> pixel mapping anchored at January of `reference_year`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    reference_year: i32,
    year_width: f64,
}

impl CoordinateMapper {
    pub fn new(reference_year: i32, year_width: f64) -> Self {
        Self {
            reference_year,
            year_width,
        }
    }

    pub fn year_width(&self, zoom: f64) -> f64 {
        self.year_width * zoom
    }

    pub fn month_width(&self, zoom: f64) -> f64 {
        self.year_width / 12.0 * zoom
    }

    pub fn position_of(&self, date: ReleaseDate, zoom: f64) -> f64 {
        date.months_since(self.reference_year) as f64 * self.month_width(zoom)
    }

    /// Inverse of [`position_of`](Self::position_of), truncating to the containing month.
    pub fn date_of(&self, offset: f64, zoom: f64) -> ReleaseDate {
        let month_width = self.month_width(zoom);
        let raw = offset / month_width;
        // Offsets produced by `position_of` can divide to a hair below the month
        // boundary; snap only when the offset equals the boundary up to rounding.
        let nearest = raw.round();
        let boundary = nearest * month_width;
        let tolerance = 4.0 * f64::EPSILON * boundary.abs().max(offset.abs());
        let months = if (offset - boundary).abs() <= tolerance {
            nearest as i64
        } else {
            raw.floor() as i64
        };

        ReleaseDate {
            year: self.reference_year + months.div_euclid(12) as i32,
            month: months.rem_euclid(12) as u32 + 1,
        }
    }
}

impl Default for CoordinateMapper {
    fn default() -> Self {
        TimelineConfig::default().mapper()
    }
}

/// Inclusive span of years drawn on the canvas.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct YearRange {
    pub start_year: i32,
    pub end_year: i32,
}

impl YearRange {
    pub fn years(&self) -> impl Iterator<Item = i32> {
        self.start_year..=self.end_year
    }

    pub fn len(&self) -> usize {
        (self.end_year - self.start_year + 1).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.end_year < self.start_year
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.start_year..=self.end_year).contains(&year)
    }

    /// Absolute offset of January of the first year; canvas x = offset - origin.
    pub fn origin(&self, mapper: &CoordinateMapper, zoom: f64) -> f64 {
        mapper.position_of(
            ReleaseDate {
                year: self.start_year,
                month: 1,
            },
            zoom,
        )
    }

    pub fn width(&self, mapper: &CoordinateMapper, zoom: f64) -> f64 {
        self.len() as f64 * mapper.year_width(zoom)
    }
}

/// Years spanned by the albums plus padding, or a window around `current_year` when empty.
pub fn timeline_range(albums: &[Album], current_year: i32, config: &TimelineConfig) -> YearRange {
    let years = albums.iter().map(|album| album.release_date.year);
    match (years.clone().min(), years.max()) {
        (Some(min), Some(max)) => YearRange {
            start_year: min - config.range_padding_years,
            end_year: max + config.range_padding_years,
        },
        _ => YearRange {
            start_year: current_year - config.empty_range_years,
            end_year: current_year + config.empty_range_years,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AlbumType;
    use proptest::prelude::*;

    fn album(month: u32, year: i32) -> Album {
        Album {
            id: format!("{year}-{month}"),
            title: "t".to_string(),
            kind: AlbumType::Album,
            image_url: None,
            release_date: ReleaseDate::new(month, year).unwrap(),
            added_by: String::new(),
            created_at: None,
        }
    }

    #[test]
    fn january_2000_is_origin() {
        let mapper = CoordinateMapper::default();
        assert_eq!(mapper.position_of(ReleaseDate::new(1, 2000).unwrap(), 1.0), 0.0);
        assert_eq!(mapper.position_of(ReleaseDate::new(3, 2001).unwrap(), 1.0), 1400.0);
        assert_eq!(mapper.position_of(ReleaseDate::new(12, 1999).unwrap(), 0.5), -50.0);
    }

    #[test]
    fn date_of_truncates_inside_month() {
        let mapper = CoordinateMapper::default();
        assert_eq!(mapper.date_of(1450.0, 1.0), ReleaseDate::new(3, 2001).unwrap());
        assert_eq!(mapper.date_of(-1.0, 1.0), ReleaseDate::new(12, 1999).unwrap());
        assert_eq!(mapper.date_of(-1200.0, 1.0), ReleaseDate::new(1, 1999).unwrap());
    }

    #[test]
    fn empty_range_centres_on_current_year() {
        let range = timeline_range(&[], 2026, &TimelineConfig::default());
        assert_eq!(range, YearRange { start_year: 2021, end_year: 2031 });
        assert_eq!(range.len(), 11);
    }

    #[test]
    fn range_pads_album_years() {
        let albums = vec![album(5, 1998), album(1, 2004), album(11, 2001)];
        let range = timeline_range(&albums, 2026, &TimelineConfig::default());
        assert_eq!(range, YearRange { start_year: 1996, end_year: 2006 });

        let mapper = CoordinateMapper::default();
        assert_eq!(range.origin(&mapper, 1.0), -4800.0);
        assert_eq!(range.width(&mapper, 0.5), 11.0 * 600.0);
    }

    #[test]
    fn offsets_just_below_a_boundary_stay_in_the_earlier_month() {
        let mapper = CoordinateMapper::default();
        assert_eq!(mapper.date_of(-1e-7, 1.0), ReleaseDate::new(12, 1999).unwrap());
        assert_eq!(mapper.date_of(0.0, 1.0), ReleaseDate::new(1, 2000).unwrap());
        assert_eq!(mapper.date_of(100.0 - 1e-6, 1.0), ReleaseDate::new(1, 2000).unwrap());
        assert_eq!(mapper.date_of(100.0, 1.0), ReleaseDate::new(2, 2000).unwrap());
    }

    proptest! {
        #[test]
        fn position_round_trips(
            month in 1u32..=12,
            year in 1800i32..2300,
            zoom in prop::sample::select(vec![0.1, 0.25, 0.5, 1.0, 2.0, 3.7]),
        ) {
            let mapper = CoordinateMapper::default();
            let date = ReleaseDate::new(month, year).unwrap();
            prop_assert_eq!(mapper.date_of(mapper.position_of(date, zoom), zoom), date);
        }

        #[test]
        fn any_offset_inside_a_month_maps_back_to_it(
            month in 1u32..=12,
            year in 1900i32..2100,
            fraction in 0.01f64..0.99,
        ) {
            let mapper = CoordinateMapper::default();
            let date = ReleaseDate::new(month, year).unwrap();
            let offset = mapper.position_of(date, 1.0) + fraction * mapper.month_width(1.0);
            prop_assert_eq!(mapper.date_of(offset, 1.0), date);
        }
    }
}
