use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::channel::mpsc::{self, UnboundedSender};
use timeline_core::{Album, Comment};
use tracing::debug;

use crate::store::{DocumentStore, SnapshotStream, StoreError};

type Clock = Rc<dyn Fn() -> DateTime<Utc>>;

#[derive(Default)]
struct State {
    albums: BTreeMap<String, Album>,
    comments: BTreeMap<String, Comment>,
    next_id: u64,
    album_watchers: Vec<UnboundedSender<Vec<Album>>>,
    comment_watchers: Vec<(String, UnboundedSender<Vec<Comment>>)>,
    failing_deletes: HashSet<String>,
    offline: bool,
}

impl State {
    fn allocate_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{:04}", self.next_id)
    }

    fn album_snapshot(&self) -> Vec<Album> {
        self.albums.values().cloned().collect()
    }

    fn comment_snapshot(&self, album_id: &str) -> Vec<Comment> {
        self.comments
            .values()
            .filter(|comment| comment.album_id == album_id)
            .cloned()
            .collect()
    }

    fn publish_albums(&mut self) {
        let snapshot = self.album_snapshot();
        self.album_watchers
            .retain(|watcher| watcher.unbounded_send(snapshot.clone()).is_ok());
    }

    fn publish_comments(&mut self, album_id: &str) {
        let snapshot = self.comment_snapshot(album_id);
        self.comment_watchers.retain(|(watched, watcher)| {
            watched != album_id || watcher.unbounded_send(snapshot.clone()).is_ok()
        });
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.offline {
            Err(StoreError::Network("offline".to_string()))
        } else {
            Ok(())
        }
    }
}

/// In-process [`DocumentStore`] with realtime feeds, for the CLI and tests.
#[derive(Clone)]
pub struct MemoryDatabase {
    state: Rc<RefCell<State>>,
    clock: Clock,
}

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::with_clock(Utc::now)
    }

    /// Uses `clock` for the server timestamps stamped on writes.
    pub fn with_clock(clock: impl Fn() -> DateTime<Utc> + 'static) -> Self {
        Self {
            state: Rc::new(RefCell::new(State::default())),
            clock: Rc::new(clock),
        }
    }

    /// Seeds documents as-is, keeping their ids.
    pub fn seed(&self, albums: Vec<Album>, comments: Vec<Comment>) {
        let mut state = self.state.borrow_mut();
        for album in albums {
            state.albums.insert(album.id.clone(), album);
        }
        for comment in comments {
            state.comments.insert(comment.id.clone(), comment);
        }
        state.publish_albums();
    }

    /// Makes deleting the comment with this id fail with a network error.
    pub fn fail_delete_of(&self, comment_id: &str) {
        self.state
            .borrow_mut()
            .failing_deletes
            .insert(comment_id.to_string());
    }

    /// While offline every call fails with [`StoreError::Network`].
    pub fn set_offline(&self, offline: bool) {
        self.state.borrow_mut().offline = offline;
    }

    pub fn album_count(&self) -> usize {
        self.state.borrow().albums.len()
    }

    pub fn comment_count(&self) -> usize {
        self.state.borrow().comments.len()
    }
}

#[async_trait(?Send)]
impl DocumentStore for MemoryDatabase {
    async fn list_albums(&self) -> Result<Vec<Album>, StoreError> {
        let state = self.state.borrow();
        state.ensure_online()?;
        Ok(state.album_snapshot())
    }

    async fn get_album(&self, id: &str) -> Result<Option<Album>, StoreError> {
        let state = self.state.borrow();
        state.ensure_online()?;
        Ok(state.albums.get(id).cloned())
    }

    async fn add_album(&self, mut album: Album) -> Result<Album, StoreError> {
        let mut state = self.state.borrow_mut();
        state.ensure_online()?;
        album.id = state.allocate_id("album");
        album.created_at = Some((self.clock)());
        state.albums.insert(album.id.clone(), album.clone());
        debug!(id = %album.id, "stored album");
        state.publish_albums();
        Ok(album)
    }

    async fn delete_album(&self, id: &str) -> Result<(), StoreError> {
        let mut state = self.state.borrow_mut();
        state.ensure_online()?;
        state
            .albums
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        state.publish_albums();
        Ok(())
    }

    async fn comments_for(&self, album_id: &str) -> Result<Vec<Comment>, StoreError> {
        let state = self.state.borrow();
        state.ensure_online()?;
        Ok(state.comment_snapshot(album_id))
    }

    async fn get_comment(&self, id: &str) -> Result<Option<Comment>, StoreError> {
        let state = self.state.borrow();
        state.ensure_online()?;
        Ok(state.comments.get(id).cloned())
    }

    async fn add_comment(&self, mut comment: Comment) -> Result<Comment, StoreError> {
        let mut state = self.state.borrow_mut();
        state.ensure_online()?;
        comment.id = state.allocate_id("comment");
        comment.created_at = Some((self.clock)());
        comment.updated_at = None;
        state.comments.insert(comment.id.clone(), comment.clone());
        state.publish_comments(&comment.album_id);
        Ok(comment)
    }

    async fn update_comment(&self, id: &str, rating: u8, body: &str) -> Result<(), StoreError> {
        let mut state = self.state.borrow_mut();
        state.ensure_online()?;
        let now = (self.clock)();
        let comment = state
            .comments
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        comment.rating = rating;
        comment.body = body.to_string();
        comment.updated_at = Some(now);
        let album_id = comment.album_id.clone();
        state.publish_comments(&album_id);
        Ok(())
    }

    async fn delete_comment(&self, id: &str) -> Result<(), StoreError> {
        let mut state = self.state.borrow_mut();
        state.ensure_online()?;
        if state.failing_deletes.contains(id) {
            return Err(StoreError::Network(format!("delete of {id} failed")));
        }
        let removed = state
            .comments
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        state.publish_comments(&removed.album_id);
        Ok(())
    }

    fn watch_albums(&self) -> SnapshotStream<Album> {
        let (sender, receiver) = mpsc::unbounded();
        let mut state = self.state.borrow_mut();
        // The receiver is still in hand, so this send cannot fail.
        let _ = sender.unbounded_send(state.album_snapshot());
        state.album_watchers.push(sender);
        receiver
    }

    fn watch_comments(&self, album_id: &str) -> SnapshotStream<Comment> {
        let (sender, receiver) = mpsc::unbounded();
        let mut state = self.state.borrow_mut();
        let _ = sender.unbounded_send(state.comment_snapshot(album_id));
        state
            .comment_watchers
            .push((album_id.to_string(), sender));
        receiver
    }
}
