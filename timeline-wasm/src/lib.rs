//! Bridge WASM <-> JavaScript trung lập framework cho timeline âm nhạc.

mod guard;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use serde_wasm_bindgen::{from_value, to_value};
use timeline_core::{
    format, navigation, timeline_range, Album, Comment, RateLimitPolicy, ReleaseDate,
    SearchResults, ThreadStats, TimelineConfig, TimelineError, TimelineLayout,
};
use wasm_bindgen::prelude::*;

pub use guard::LoginGuard;

#[derive(Deserialize, Default)]
struct JsTimelineConfig {
    #[serde(default)]
    reference_year: Option<i32>,
    #[serde(default)]
    year_width: Option<f64>,
    #[serde(default)]
    zoom_levels: Option<Vec<f64>>,
    #[serde(default)]
    initial_zoom: Option<f64>,
    #[serde(default)]
    range_padding_years: Option<i32>,
    #[serde(default)]
    empty_range_years: Option<i32>,
    #[serde(default)]
    search_result_limit: Option<usize>,
    #[serde(default)]
    rate_limit: Option<RateLimitPolicy>,
}

impl From<JsTimelineConfig> for TimelineConfig {
    fn from(cfg: JsTimelineConfig) -> Self {
        let mut base = TimelineConfig::default();
        if let Some(year) = cfg.reference_year {
            base.reference_year = year;
        }
        if let Some(width) = cfg.year_width {
            base.year_width = width;
        }
        if let Some(levels) = cfg.zoom_levels {
            base.zoom_levels = levels;
        }
        if let Some(zoom) = cfg.initial_zoom {
            base.initial_zoom = zoom;
        }
        if let Some(years) = cfg.range_padding_years {
            base.range_padding_years = years;
        }
        if let Some(years) = cfg.empty_range_years {
            base.empty_range_years = years;
        }
        if let Some(limit) = cfg.search_result_limit {
            base.search_result_limit = limit;
        }
        if let Some(policy) = cfg.rate_limit {
            base.rate_limit = policy;
        }
        base
    }
}

pub(crate) fn read_config(config: Option<JsValue>) -> Result<TimelineConfig, JsValue> {
    let cfg = match config {
        Some(js_cfg) if !js_cfg.is_undefined() && !js_cfg.is_null() => {
            let cfg: JsTimelineConfig = from_value(js_cfg)
                .map_err(|err| JsValue::from_str(&format!("Không đọc được config: {err}")))?;
            TimelineConfig::from(cfg)
        }
        _ => TimelineConfig::default(),
    };
    cfg.validate()
        .map_err(|err| JsValue::from_str(&format_timeline_error(err)))?;
    Ok(cfg)
}

/// Albums from a snapshot array or a REST export, sorted for the timeline.
fn read_albums(albums: JsValue) -> Result<Vec<Album>, JsValue> {
    let value = from_value::<serde_json::Value>(albums)
        .map_err(|err| JsValue::from_str(&format!("Không đọc được danh sách album: {err}")))?;
    let albums = timeline_firestore::albums_from_value(&value)
        .map_err(|err| JsValue::from_str(&format_timeline_error(err)))?;
    Ok(timeline_core::reconcile_albums(albums))
}

fn write<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    to_value(value).map_err(|err| JsValue::from_str(&format!("Không serialize kết quả: {err}")))
}

fn init_panic_hook() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

/// Lays out an album snapshot. `zoom` defaults to the configured initial zoom and
/// `query` highlights matching markers.
#[wasm_bindgen]
pub fn layout_timeline(
    albums: JsValue,
    zoom: Option<f64>,
    query: Option<String>,
    config: Option<JsValue>,
) -> Result<JsValue, JsValue> {
    init_panic_hook();
    let cfg = read_config(config)?;
    let albums = read_albums(albums)?;
    let zoom = zoom.unwrap_or(cfg.initial_zoom);

    let range = timeline_range(&albums, Utc::now().year(), &cfg);
    let mut layout = TimelineLayout::build(&albums, range, zoom, &cfg.mapper());
    if let Some(query) = query {
        layout.highlight(&albums, &query);
    }
    write(&layout)
}

/// Dropdown results for the search box.
#[wasm_bindgen]
pub fn search_albums(
    albums: JsValue,
    query: &str,
    config: Option<JsValue>,
) -> Result<JsValue, JsValue> {
    let cfg = read_config(config)?;
    let albums = read_albums(albums)?;
    write(&SearchResults::collect(
        &albums,
        query,
        cfg.search_result_limit,
    ))
}

#[wasm_bindgen]
pub fn reconcile_albums(albums: JsValue) -> Result<JsValue, JsValue> {
    write(&read_albums(albums)?)
}

/// One comment as the album page shows it.
#[derive(Serialize)]
struct CommentCard {
    id: String,
    author: String,
    rating: u8,
    stars: String,
    body: String,
    posted: Option<String>,
    edited: bool,
}

impl CommentCard {
    fn new(comment: &Comment, now: DateTime<Utc>) -> Self {
        Self {
            id: comment.id.clone(),
            author: comment.author_label().to_string(),
            rating: comment.rating,
            stars: format::star_rating(comment.rating),
            body: comment.body.clone(),
            posted: comment
                .created_at
                .map(|created| format::relative_time(created, now)),
            edited: comment.is_edited(),
        }
    }
}

#[derive(Serialize)]
struct ThreadView {
    own: Option<CommentCard>,
    others: Vec<CommentCard>,
    stats: ThreadStats,
    count_label: String,
    average_label: String,
}

impl ThreadView {
    fn build(comments: Vec<Comment>, viewer: Option<&str>, now: DateTime<Utc>) -> Self {
        let thread = timeline_core::reconcile_comments(comments, viewer);
        let stats = thread.stats();
        Self {
            own: thread.own.as_ref().map(|comment| CommentCard::new(comment, now)),
            others: thread
                .others
                .iter()
                .map(|comment| CommentCard::new(comment, now))
                .collect(),
            count_label: stats.count_label(),
            average_label: stats.average_label(),
            stats,
        }
    }
}

/// Splits a comment snapshot around `viewer`, with header stats and display text.
#[wasm_bindgen]
pub fn reconcile_comments(comments: JsValue, viewer: Option<String>) -> Result<JsValue, JsValue> {
    let value = from_value::<serde_json::Value>(comments)
        .map_err(|err| JsValue::from_str(&format!("Không đọc được bình luận: {err}")))?;
    let comments = timeline_firestore::comments_from_value(&value)
        .map_err(|err| JsValue::from_str(&format_timeline_error(err)))?;

    write(&ThreadView::build(comments, viewer.as_deref(), Utc::now()))
}

/// "Mar 2023", for compact date labels.
#[wasm_bindgen]
pub fn format_release_short(month: u32, year: i32) -> String {
    format::format_date_short(month, year)
}

/// Shortens album titles and comment bodies for cards, appending "...".
#[wasm_bindgen]
pub fn truncate_text(text: &str, length: usize) -> String {
    format::truncate(text, length)
}

#[wasm_bindgen]
pub fn position_of(month: u32, year: i32, zoom: f64, config: Option<JsValue>) -> Result<f64, JsValue> {
    let cfg = read_config(config)?;
    let date = ReleaseDate::new(month, year).map_err(|err| JsValue::from_str(&err.to_string()))?;
    Ok(cfg.mapper().position_of(date, zoom))
}

#[wasm_bindgen]
pub fn date_of(offset: f64, zoom: f64, config: Option<JsValue>) -> Result<JsValue, JsValue> {
    let cfg = read_config(config)?;
    write(&cfg.mapper().date_of(offset, zoom))
}

/// Decodes a raw export (either shape) into album records without sorting.
#[wasm_bindgen]
pub fn decode_albums(json: &str) -> Result<JsValue, JsValue> {
    let albums = timeline_firestore::albums_from_str(json)
        .map_err(|err| JsValue::from_str(&format_timeline_error(err)))?;
    write(&albums)
}

#[wasm_bindgen]
pub fn album_link(album_id: &str) -> String {
    navigation::album_link(album_id)
}

#[wasm_bindgen]
pub fn album_id_from_query(query: &str) -> Option<String> {
    navigation::album_id_from_query(query)
}

fn format_timeline_error(err: TimelineError) -> String {
    format!("Timeline error: {err}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_js_config_keeps_defaults() {
        let cfg = TimelineConfig::from(JsTimelineConfig {
            zoom_levels: Some(vec![0.25, 1.0]),
            ..JsTimelineConfig::default()
        });
        assert_eq!(cfg.zoom_levels, vec![0.25, 1.0]);
        assert_eq!(cfg.year_width, 1200.0);
        assert_eq!(cfg.initial_zoom, 1.0);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn js_config_can_replace_the_rate_limit_policy() {
        let policy = RateLimitPolicy {
            soft_threshold: 4,
            soft_lockout_secs: 60,
            ..RateLimitPolicy::default()
        };
        let cfg = TimelineConfig::from(JsTimelineConfig {
            rate_limit: Some(policy.clone()),
            ..JsTimelineConfig::default()
        });
        assert_eq!(cfg.rate_limit, policy);
        assert_eq!(cfg.year_width, 1200.0);
    }

    #[test]
    fn thread_view_carries_display_text() {
        use chrono::TimeZone;

        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let comment = |id: &str, user: &str, rating: u8, hours_ago: Option<i64>| Comment {
            id: id.to_string(),
            album_id: "a1".to_string(),
            user_id: user.to_string(),
            user_name: None,
            rating,
            body: format!("body {id}"),
            created_at: hours_ago.map(|hours| now - chrono::Duration::hours(hours)),
            updated_at: None,
        };

        let view = ThreadView::build(
            vec![
                comment("mine", "me", 8, Some(3)),
                comment("old", "x", 5, None),
                comment("new", "y", 10, Some(1)),
            ],
            Some("me"),
            now,
        );

        let own = view.own.expect("own comment");
        assert_eq!(own.stars, "★★★★☆ 8/10");
        assert_eq!(own.posted.as_deref(), Some("3 hours ago"));
        assert_eq!(own.author, "Anonymous");
        let ids: Vec<_> = view.others.iter().map(|card| card.id.as_str()).collect();
        assert_eq!(ids, ["new", "old"]);
        assert_eq!(view.others[1].posted, None);
        assert_eq!(view.count_label, "3 comments");
    }

    #[test]
    fn short_labels_for_cards() {
        assert_eq!(format_release_short(3, 2023), "Mar 2023");
        assert_eq!(truncate_text("Stranger in the Alps", 8), "Stranger...");
    }
}
