use async_trait::async_trait;
use futures::channel::mpsc::UnboundedReceiver;
use futures::StreamExt;
use timeline_core::{Album, AlbumReconciler, Comment};
use tracing::debug;

/// Realtime feed of full-collection snapshots. Each item replaces the previous one.
pub type SnapshotStream<T> = UnboundedReceiver<Vec<T>>;

/// Failure reported by the document store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("document not found: {0}")]
    NotFound(String),
    #[error("permission denied")]
    PermissionDenied,
    #[error("network failure: {0}")]
    Network(String),
    #[error("request throttled by the provider")]
    Throttled,
    #[error("store error: {0}")]
    Other(String),
}

impl StoreError {
    /// Maps a Firestore error code (`permission-denied`, `unavailable`, ...).
    pub fn from_code(code: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            "not-found" => StoreError::NotFound(message),
            "permission-denied" | "unauthenticated" => StoreError::PermissionDenied,
            "unavailable" | "deadline-exceeded" => StoreError::Network(message),
            "resource-exhausted" => StoreError::Throttled,
            _ => StoreError::Other(message),
        }
    }

    /// Short, non-technical text for a toast.
    pub fn user_message(&self) -> &'static str {
        match self {
            StoreError::NotFound(_) => "That item no longer exists.",
            StoreError::PermissionDenied => "Permission denied. Check your Firestore rules are published.",
            StoreError::Network(_) => "Network error. Check your internet connection.",
            StoreError::Throttled => "Too many requests. Please try again later.",
            StoreError::Other(_) => "Something went wrong. Please try again.",
        }
    }
}

/// The `albums` and `comments` collections as seen by the pages.
///
/// Futures are `?Send`: everything runs on the browser's single event loop.
#[async_trait(?Send)]
pub trait DocumentStore {
    async fn list_albums(&self) -> Result<Vec<Album>, StoreError>;

    async fn get_album(&self, id: &str) -> Result<Option<Album>, StoreError>;

    /// Stores `album` under a new id and stamps `created_at` with server time.
    async fn add_album(&self, album: Album) -> Result<Album, StoreError>;

    async fn delete_album(&self, id: &str) -> Result<(), StoreError>;

    async fn comments_for(&self, album_id: &str) -> Result<Vec<Comment>, StoreError>;

    async fn get_comment(&self, id: &str) -> Result<Option<Comment>, StoreError>;

    /// Stores `comment` under a new id and stamps `created_at` with server time.
    async fn add_comment(&self, comment: Comment) -> Result<Comment, StoreError>;

    /// Replaces rating and body and stamps `updated_at`.
    async fn update_comment(&self, id: &str, rating: u8, body: &str) -> Result<(), StoreError>;

    async fn delete_comment(&self, id: &str) -> Result<(), StoreError>;

    /// Subscribes to the whole `albums` collection. The current contents arrive first.
    fn watch_albums(&self) -> SnapshotStream<Album>;

    /// Subscribes to the comments of one album. The current contents arrive first.
    fn watch_comments(&self, album_id: &str) -> SnapshotStream<Comment>;
}

/// Applies every album snapshot from `feed` to `reconciler` and hands the sorted
/// list to `on_update`. Returns when the feed closes.
pub async fn follow_albums<F>(
    mut feed: SnapshotStream<Album>,
    reconciler: &mut AlbumReconciler,
    mut on_update: F,
) where
    F: FnMut(&[Album]),
{
    while let Some(snapshot) = feed.next().await {
        let albums = reconciler.apply(snapshot);
        on_update(albums);
    }
    debug!(revision = reconciler.revision(), "album feed closed");
}
