//! Turning full-collection snapshots into sorted view state.
//!
//! Every snapshot replaces what came before; nothing is patched in place.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::model::{Album, Comment};

/// Albums oldest first by release date; equal dates keep snapshot order.
pub fn reconcile_albums(mut snapshot: Vec<Album>) -> Vec<Album> {
    snapshot.sort_by_key(|album| album.release_date);
    snapshot
}

/// Holds the latest album snapshot for the timeline page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlbumReconciler {
    albums: Vec<Album>,
    revision: u64,
}

impl AlbumReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, snapshot: Vec<Album>) -> &[Album] {
        self.albums = reconcile_albums(snapshot);
        self.revision += 1;
        debug!(revision = self.revision, albums = self.albums.len(), "applied album snapshot");
        &self.albums
    }

    pub fn albums(&self) -> &[Album] {
        &self.albums
    }

    /// Number of snapshots applied so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn find(&self, id: &str) -> Option<&Album> {
        self.albums.iter().find(|album| album.id == id)
    }
}

/// Comments on one album split around the viewer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommentThread {
    pub own: Option<Comment>,
    /// Newest first; comments still waiting on a server timestamp go last.
    pub others: Vec<Comment>,
}

pub fn reconcile_comments(snapshot: Vec<Comment>, viewer: Option<&str>) -> CommentThread {
    let mut own: Option<Comment> = None;
    let mut others = Vec::with_capacity(snapshot.len());

    for comment in snapshot {
        let is_viewer = viewer.is_some_and(|uid| !uid.is_empty() && comment.user_id == uid);
        if !is_viewer {
            others.push(comment);
            continue;
        }
        match own.take() {
            None => own = Some(comment),
            Some(existing) => {
                warn!(
                    album_id = %comment.album_id,
                    user_id = %comment.user_id,
                    "more than one comment by the same user; keeping the newest"
                );
                own = Some(if comment.created_millis() >= existing.created_millis() {
                    comment
                } else {
                    existing
                });
            }
        }
    }

    others.sort_by_key(|comment| std::cmp::Reverse(comment.created_millis()));
    CommentThread { own, others }
}

/// Count and average rating for the album header.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThreadStats {
    pub total: usize,
    pub average_rating: Option<f64>,
}

impl ThreadStats {
    /// "3 comments".
    pub fn count_label(&self) -> String {
        let plural = if self.total == 1 { "" } else { "s" };
        format!("{} comment{plural}", self.total)
    }

    /// "7.5/10 average", or "N/A/10 average" with no ratings.
    pub fn average_label(&self) -> String {
        match self.average_rating {
            Some(avg) => format!("{avg:.1}/10 average"),
            None => "N/A/10 average".to_string(),
        }
    }
}

impl CommentThread {
    pub fn total(&self) -> usize {
        self.others.len() + usize::from(self.own.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Comment> {
        self.own.iter().chain(self.others.iter())
    }

    pub fn stats(&self) -> ThreadStats {
        let total = self.total();
        let sum: u32 = self.iter().map(|comment| u32::from(comment.rating)).sum();
        ThreadStats {
            total,
            average_rating: (total > 0).then(|| f64::from(sum) / total as f64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AlbumType, ReleaseDate};
    use chrono::{TimeZone, Utc};

    fn album(id: &str, month: u32, year: i32) -> Album {
        Album {
            id: id.to_string(),
            title: id.to_string(),
            kind: AlbumType::Album,
            image_url: None,
            release_date: ReleaseDate::new(month, year).unwrap(),
            added_by: "u1".to_string(),
            created_at: None,
        }
    }

    fn comment(id: &str, user: &str, rating: u8, created_secs: Option<i64>) -> Comment {
        Comment {
            id: id.to_string(),
            album_id: "a1".to_string(),
            user_id: user.to_string(),
            user_name: Some(user.to_string()),
            rating,
            body: format!("body {id}"),
            created_at: created_secs.map(|secs| Utc.timestamp_opt(secs, 0).unwrap()),
            updated_at: None,
        }
    }

    #[test]
    fn albums_sorted_by_year_then_month_stably() {
        let sorted = reconcile_albums(vec![
            album("c", 7, 2021),
            album("a", 3, 2020),
            album("z", 12, 2019),
            album("b", 3, 2020),
        ]);
        let ids: Vec<_> = sorted.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, ["z", "a", "b", "c"]);

        let again = reconcile_albums(sorted.clone());
        assert_eq!(again, sorted);
    }

    #[test]
    fn reconciler_replaces_state() {
        let mut reconciler = AlbumReconciler::new();
        reconciler.apply(vec![album("a", 1, 2020), album("b", 2, 2020)]);
        reconciler.apply(vec![album("b", 2, 2020)]);
        assert_eq!(reconciler.albums().len(), 1);
        assert_eq!(reconciler.revision(), 2);
        assert!(reconciler.find("a").is_none());
    }

    #[test]
    fn viewer_comment_is_split_out_and_others_newest_first() {
        let thread = reconcile_comments(
            vec![
                comment("c1", "other-1", 6, Some(100)),
                comment("mine", "me", 9, Some(150)),
                comment("c2", "other-2", 8, Some(200)),
            ],
            Some("me"),
        );
        assert_eq!(thread.own.as_ref().map(|c| c.id.as_str()), Some("mine"));
        let ids: Vec<_> = thread.others.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["c2", "c1"]);
        assert!(thread.others.iter().all(|c| c.user_id != "me"));
    }

    #[test]
    fn pending_timestamps_sort_last() {
        let thread = reconcile_comments(
            vec![
                comment("pending", "x", 5, None),
                comment("old", "y", 5, Some(10)),
            ],
            None,
        );
        assert!(thread.own.is_none());
        assert_eq!(thread.others[0].id, "old");
        assert_eq!(thread.others[1].id, "pending");
    }

    #[test]
    fn duplicate_viewer_comments_keep_newest() {
        let thread = reconcile_comments(
            vec![
                comment("new", "me", 5, Some(300)),
                comment("old", "me", 5, Some(100)),
            ],
            Some("me"),
        );
        assert_eq!(thread.own.unwrap().id, "new");
        assert!(thread.others.is_empty());
    }

    #[test]
    fn stats_average_all_ratings() {
        let thread = reconcile_comments(
            vec![
                comment("a", "me", 9, Some(1)),
                comment("b", "x", 6, Some(2)),
            ],
            Some("me"),
        );
        let stats = thread.stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.count_label(), "2 comments");
        assert_eq!(stats.average_label(), "7.5/10 average");

        let empty = CommentThread::default().stats();
        assert_eq!(empty.average_label(), "N/A/10 average");
        assert_eq!(empty.count_label(), "0 comments");
    }

    mod properties {
        use super::album;
        use crate::reconcile::reconcile_albums;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn sorting_is_stable_and_idempotent(
                dates in prop::collection::vec((1u32..=12, 1990i32..2030), 0..40)
            ) {
                let albums: Vec<_> = dates
                    .iter()
                    .enumerate()
                    .map(|(i, (month, year))| album(&format!("{i:03}"), *month, *year))
                    .collect();
                let sorted = reconcile_albums(albums);

                for pair in sorted.windows(2) {
                    prop_assert!(pair[0].release_date <= pair[1].release_date);
                    if pair[0].release_date == pair[1].release_date {
                        // Ids encode snapshot order.
                        prop_assert!(pair[0].id < pair[1].id);
                    }
                }
                prop_assert_eq!(reconcile_albums(sorted.clone()), sorted);
            }
        }
    }
}
