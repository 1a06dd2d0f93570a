//! Logic lõi dựng timeline âm nhạc: toạ độ, gom nhóm marker, tìm kiếm và chặn đăng nhập.
//!
//! Crate này không chạm vào DOM hay mạng. Các crate `timeline-firestore`,
//! `timeline-wasm` và `timeline-ui` dựa trên những kiểu dữ liệu ở đây.

pub mod auth;
pub mod coords;
pub mod format;
pub mod layout;
pub mod model;
pub mod navigation;
pub mod rate_limit;
pub mod reconcile;
pub mod search;
pub mod validate;
pub mod viewport;

use serde::{Deserialize, Serialize};

pub use auth::{AuthFailure, Session, GUEST_MODE_KEY};
pub use coords::{timeline_range, CoordinateMapper, YearRange};
pub use layout::{
    AlbumMarker, AlbumPin, MonthMarker, PreviewCard, Thumbnail, TimelineLayout, YearMarker,
};
pub use model::{Album, AlbumType, Comment, ReleaseDate};
pub use rate_limit::{
    Countdown, FailureOutcome, GuardState, LocalStore, Lockout, LoginGuard, MemoryStore,
    RateLimitPolicy,
};
pub use reconcile::{
    reconcile_albums, reconcile_comments, AlbumReconciler, CommentThread, ThreadStats,
};
pub use search::{SearchHit, SearchResults};
pub use validate::{AlbumDraft, CommentDraft, NewAlbum, ValidatedComment, ValidationError};
pub use viewport::{Viewport, ZoomCycle};

/// Cấu hình hình học timeline, tìm kiếm và chính sách chặn đăng nhập.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimelineConfig {
    /// Năm ứng với offset 0 (tháng 1).
    pub reference_year: i32,
    /// Số pixel cho một năm ở mức zoom 1.0.
    pub year_width: f64,
    /// Các mức zoom theo thứ tự vòng lặp.
    pub zoom_levels: Vec<f64>,
    /// Mức zoom khi mở trang.
    pub initial_zoom: f64,
    /// Số năm đệm hai đầu khi có album.
    pub range_padding_years: i32,
    /// Nửa độ rộng khoảng năm (quanh năm hiện tại) khi chưa có album.
    pub empty_range_years: i32,
    /// Số kết quả tối đa trong dropdown tìm kiếm.
    pub search_result_limit: usize,
    pub rate_limit: RateLimitPolicy,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            reference_year: 2000,
            year_width: 1200.0,
            zoom_levels: vec![0.1, 0.5, 1.0],
            initial_zoom: 1.0,
            range_padding_years: 2,
            empty_range_years: 5,
            search_result_limit: 8,
            rate_limit: RateLimitPolicy::default(),
        }
    }
}

impl TimelineConfig {
    /// Đọc cấu hình từ JSON; các trường thiếu lấy giá trị mặc định.
    pub fn from_json_str(raw: &str) -> Result<Self, TimelineError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|err| TimelineError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Kiểm tra các ràng buộc mà serde không diễn đạt được.
    pub fn validate(&self) -> Result<(), TimelineError> {
        if !(self.year_width.is_finite() && self.year_width > 0.0) {
            return Err(TimelineError::InvalidConfig(format!(
                "year_width must be positive, got {}",
                self.year_width
            )));
        }
        if self.zoom_levels.is_empty() {
            return Err(TimelineError::InvalidConfig(
                "zoom_levels must not be empty".to_string(),
            ));
        }
        if let Some(bad) = self
            .zoom_levels
            .iter()
            .find(|zoom| !(zoom.is_finite() && **zoom > 0.0))
        {
            return Err(TimelineError::InvalidConfig(format!(
                "zoom level {bad} is not a positive number"
            )));
        }
        if !self.zoom_levels.contains(&self.initial_zoom) {
            return Err(TimelineError::InvalidConfig(format!(
                "initial_zoom {} is not one of the zoom levels",
                self.initial_zoom
            )));
        }
        if self.range_padding_years < 0 || self.empty_range_years < 0 {
            return Err(TimelineError::InvalidConfig(
                "range padding must not be negative".to_string(),
            ));
        }
        self.rate_limit.validate()
    }

    pub fn mapper(&self) -> CoordinateMapper {
        CoordinateMapper::new(self.reference_year, self.year_width)
    }
}

/// Lỗi chung của timeline.
#[derive(Debug, thiserror::Error)]
pub enum TimelineError {
    #[error("Dữ liệu đầu vào thiếu thông tin tối thiểu")]
    MissingData,
    #[error("Không đọc được dữ liệu: {0}")]
    Parse(String),
    #[error("Cấu hình không hợp lệ: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}
