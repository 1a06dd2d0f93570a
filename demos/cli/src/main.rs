use std::path::PathBuf;

use anyhow::{anyhow, Context};
use chrono::{Datelike, Utc};
use clap::Parser;
use timeline_core::{
    reconcile_albums, timeline_range, AlbumMarker, ReleaseDate, SearchResults, TimelineConfig,
    TimelineLayout,
};
use timeline_firestore::albums_from_str;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "timeline-cli",
    about = "Dựng bố cục timeline âm nhạc từ file export album JSON."
)]
struct Args {
    /// Đường dẫn tới file export album (mảng JSON hoặc export REST).
    #[arg(short, long)]
    input: PathBuf,

    /// File JSON ghi đè cấu hình mặc định.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Mức zoom; mặc định lấy `initial_zoom` trong cấu hình.
    #[arg(short, long)]
    zoom: Option<f64>,

    /// Từ khóa tìm kiếm để làm mờ các album không khớp.
    #[arg(short, long)]
    query: Option<String>,

    /// Tháng hiện tại dạng YYYY-MM, dùng để tính khoảng năm.
    #[arg(long, value_parser = parse_month)]
    today: Option<ReleaseDate>,
}

fn parse_month(raw: &str) -> Result<ReleaseDate, String> {
    let (year, month) = raw
        .split_once('-')
        .ok_or_else(|| format!("expected YYYY-MM, got {raw:?}"))?;
    let year: i32 = year.parse().map_err(|_| format!("invalid year in {raw:?}"))?;
    let month: u32 = month.parse().map_err(|_| format!("invalid month in {raw:?}"))?;
    ReleaseDate::new(month, year).map_err(|err| err.to_string())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "timeline_cli=info,timeline_core=info,timeline_firestore=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let data = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Không đọc được file {:?}", args.input))?;

    let config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Không đọc được file cấu hình {path:?}"))?;
            TimelineConfig::from_json_str(&raw)?
        }
        None => TimelineConfig::default(),
    };
    config.validate()?;

    let zoom = args.zoom.unwrap_or(config.initial_zoom);
    if !(zoom.is_finite() && zoom > 0.0) {
        return Err(anyhow!("zoom must be a positive number, got {zoom}"));
    }

    let albums = reconcile_albums(albums_from_str(&data)?);
    info!(albums = albums.len(), input = ?args.input, "loaded album export");

    let current_year = args.today.map_or_else(|| Utc::now().year(), |today| today.year);
    let range = timeline_range(&albums, current_year, &config);
    let mut layout = TimelineLayout::build(&albums, range, zoom, &config.mapper());
    debug!(origin = layout.origin, width = layout.width, "layout built");

    println!(
        "Range: {}-{} ({} years, {:.0}px at zoom {zoom})",
        range.start_year,
        range.end_year,
        range.len(),
        layout.width
    );

    if let Some(query) = args.query.as_deref() {
        layout.highlight(&albums, query);
    }

    for marker in &layout.markers {
        let dimmed = if marker.is_dimmed() { " (dimmed)" } else { "" };
        match marker {
            AlbumMarker::Single { date, x, pin, .. } => {
                println!("{:>9.1}px  {}  [{}] {}{dimmed}", x, date.label(), pin.glyph, pin.title);
            }
            AlbumMarker::Cluster { date, x, pins, .. } => {
                println!("{:>9.1}px  {}  cluster of {}{dimmed}", x, date.label(), pins.len());
                for pin in pins {
                    println!("             [{}] {}", pin.glyph, pin.title);
                }
            }
        }
    }

    if let Some(query) = args.query.as_deref() {
        let results = SearchResults::collect(&albums, query, config.search_result_limit);
        if results.no_results {
            println!("No albums match {query:?}");
        } else {
            println!(
                "Search {query:?}: {} match(es), showing {}",
                results.total_matches,
                results.hits.len()
            );
            for hit in &results.hits {
                println!("  {}  {} ({})", hit.album_id, hit.title, hit.date_label);
            }
        }
    }

    Ok(())
}
