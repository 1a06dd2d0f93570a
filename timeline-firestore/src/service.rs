use futures::future::join_all;
use timeline_core::{Album, AlbumDraft, Comment, CommentDraft, Session, ValidationError};
use tracing::{error, info, warn};

use crate::store::{DocumentStore, StoreError};

/// Why an album or comment operation was refused or failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Please log in to make changes")]
    ReadOnly,
    #[error("Only the person who added this album can delete it")]
    NotOwner,
    #[error("You can only change your own comment")]
    NotAuthor,
    #[error("You have already reviewed this album")]
    AlreadyCommented,
    #[error("Album not found")]
    AlbumNotFound,
    #[error("Comment not found")]
    CommentNotFound,
    /// Some comment deletions failed; the album was left in place.
    #[error("Failed to delete album. Please try again.")]
    CascadeFailed { failed: usize },
    #[error("{}", .0.user_message())]
    Remote(#[from] StoreError),
}

/// Album and comment operations with the rules the pages enforce.
pub struct AlbumService<S> {
    store: S,
}

impl<S: DocumentStore> AlbumService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Album detail page entry point.
    pub async fn load_album(&self, id: &str) -> Result<Album, ServiceError> {
        match self.store.get_album(id).await {
            Ok(Some(album)) => Ok(album),
            Ok(None) => Err(ServiceError::AlbumNotFound),
            Err(err) => {
                error!(album_id = id, error = %err, "failed to load album");
                Err(err.into())
            }
        }
    }

    /// Validates the form, then stores the album owned by the signed-in member.
    pub async fn add_album(
        &self,
        session: &Session,
        draft: &AlbumDraft,
    ) -> Result<Album, ServiceError> {
        let owner = session.uid().ok_or(ServiceError::ReadOnly)?;
        let album = draft.validate()?;

        let stored = self
            .store
            .add_album(Album {
                id: String::new(),
                title: album.title,
                kind: album.kind,
                image_url: album.image_url,
                release_date: album.release_date,
                added_by: owner.to_string(),
                created_at: None,
            })
            .await
            .map_err(|err| {
                error!(error = %err, "failed to add album");
                ServiceError::from(err)
            })?;

        info!(album_id = %stored.id, title = %stored.title, "album added");
        Ok(stored)
    }

    /// Deletes every comment on the album concurrently, then the album itself.
    ///
    /// Nothing is rolled back when a comment deletion fails; the album stays and
    /// the caller gets a single [`ServiceError::CascadeFailed`]. Returns the number
    /// of comments removed.
    pub async fn delete_album(&self, session: &Session, album_id: &str) -> Result<usize, ServiceError> {
        let uid = session.uid().ok_or(ServiceError::ReadOnly)?;
        let album = self.load_album(album_id).await?;
        if !album.is_owned_by(uid) {
            return Err(ServiceError::NotOwner);
        }

        let comments = self.store.comments_for(album_id).await.map_err(|err| {
            error!(album_id, error = %err, "failed to list comments for cascade delete");
            ServiceError::from(err)
        })?;

        let results = join_all(
            comments
                .iter()
                .map(|comment| self.store.delete_comment(&comment.id)),
        )
        .await;

        let failed = results.iter().filter(|result| result.is_err()).count();
        if failed > 0 {
            for err in results.iter().filter_map(|result| result.as_ref().err()) {
                error!(album_id, error = %err, "comment delete failed during album delete");
            }
            return Err(ServiceError::CascadeFailed { failed });
        }

        self.store.delete_album(album_id).await.map_err(|err| {
            error!(album_id, error = %err, "failed to delete album");
            ServiceError::from(err)
        })?;

        info!(album_id, comments = comments.len(), "album deleted");
        Ok(comments.len())
    }

    /// Adds the member's review; each member gets one per album.
    pub async fn post_comment(
        &self,
        session: &Session,
        album_id: &str,
        draft: &CommentDraft,
    ) -> Result<Comment, ServiceError> {
        let uid = session.uid().ok_or(ServiceError::ReadOnly)?;
        let comment = draft.validate()?;

        let existing = self.store.comments_for(album_id).await.map_err(|err| {
            error!(album_id, error = %err, "failed to check existing comments");
            ServiceError::from(err)
        })?;
        if existing.iter().any(|comment| comment.user_id == uid) {
            warn!(album_id, user_id = uid, "rejected second comment by the same user");
            return Err(ServiceError::AlreadyCommented);
        }

        let stored = self
            .store
            .add_comment(Comment {
                id: String::new(),
                album_id: album_id.to_string(),
                user_id: uid.to_string(),
                user_name: session.display_name(),
                rating: comment.rating,
                body: comment.body,
                created_at: None,
                updated_at: None,
            })
            .await
            .map_err(|err| {
                error!(album_id, error = %err, "failed to add comment");
                ServiceError::from(err)
            })?;

        info!(album_id, comment_id = %stored.id, "comment added");
        Ok(stored)
    }

    pub async fn edit_comment(
        &self,
        session: &Session,
        comment_id: &str,
        draft: &CommentDraft,
    ) -> Result<(), ServiceError> {
        let uid = session.uid().ok_or(ServiceError::ReadOnly)?;
        let update = draft.validate()?;
        self.authored_comment(uid, comment_id).await?;

        self.store
            .update_comment(comment_id, update.rating, &update.body)
            .await
            .map_err(|err| {
                error!(comment_id, error = %err, "failed to update comment");
                ServiceError::from(err)
            })
    }

    pub async fn remove_comment(&self, session: &Session, comment_id: &str) -> Result<(), ServiceError> {
        let uid = session.uid().ok_or(ServiceError::ReadOnly)?;
        self.authored_comment(uid, comment_id).await?;

        self.store.delete_comment(comment_id).await.map_err(|err| {
            error!(comment_id, error = %err, "failed to delete comment");
            ServiceError::from(err)
        })
    }

    async fn authored_comment(&self, uid: &str, comment_id: &str) -> Result<Comment, ServiceError> {
        let comment = self
            .store
            .get_comment(comment_id)
            .await
            .map_err(ServiceError::from)?
            .ok_or(ServiceError::CommentNotFound)?;
        if comment.user_id != uid {
            return Err(ServiceError::NotAuthor);
        }
        Ok(comment)
    }
}
