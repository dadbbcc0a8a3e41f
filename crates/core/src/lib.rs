//! # Campus Core
//!
//! Comment-thread logic for the Campus community features (threads, articles and events).
//!
//! This crate contains pure data operations plus snapshot loading:
//! - [`group`]: order-preserving grouping of sequences into keyed buckets
//! - [`comments`]: reply-tree construction from flat comment lists
//! - [`wire`]: strict JSON/YAML models for comment snapshots
//! - [`ThreadService`]: loads a snapshot and builds its forest under the configured policy
//!
//! **No transport concerns**: fetching comments from the backend and rendering them belong to
//! the calling application.

pub mod comments;
pub mod config;
pub mod constants;
pub mod error;
pub mod group;
pub mod wire;

pub use comments::{
    build_comment_tree, build_comment_tree_with, flatten_forest, map_forest, Comment,
    CommentAuthor, CommentWithReplies, OrphanPolicy, Threaded, TreeOptions,
};
pub use config::CoreConfig;
pub use error::{CoreError, CoreResult};
pub use group::{group_by, group_by_field, group_json_by_field, FieldAccess, Groups};
pub use wire::{CommentWire, SnapshotFormat};

use std::path::Path;

/// Comment-thread operations bound to one configuration.
#[derive(Clone, Debug, Default)]
pub struct ThreadService {
    cfg: CoreConfig,
}

impl ThreadService {
    pub fn new(cfg: CoreConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    /// Reads and parses a comment snapshot.
    ///
    /// The format comes from the configuration when forced, otherwise from the file extension.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidInput`] if the format cannot be determined,
    /// [`CoreError::FileRead`] if the file cannot be read, and any parse error from
    /// [`CommentWire`].
    pub fn load_snapshot(&self, path: &Path) -> CoreResult<Vec<Comment>> {
        let format = match self.cfg.snapshot_format() {
            Some(format) => format,
            None => SnapshotFormat::from_path(path).ok_or_else(|| {
                CoreError::InvalidInput(format!(
                    "cannot infer snapshot format from {} (use .json, .yaml or .yml)",
                    path.display()
                ))
            })?,
        };

        let text = std::fs::read_to_string(path).map_err(CoreError::FileRead)?;
        let comments = CommentWire::parse(&text, format)?;
        tracing::debug!(
            "loaded {} comments from {} ({})",
            comments.len(),
            path.display(),
            format.as_str()
        );
        Ok(comments)
    }

    /// Builds the reply forest for `comments` with the configured orphan policy.
    ///
    /// Comments omitted under [`OrphanPolicy::Drop`] are reported as a warning.
    pub fn build_thread<C: Threaded>(
        &self,
        comments: Vec<C>,
    ) -> CoreResult<Vec<CommentWithReplies<C>>> {
        let total = comments.len();
        let forest = build_comment_tree_with(comments, &self.cfg.tree_options())?;

        let kept: usize = forest.iter().map(|root| 1 + root.descendant_count()).sum();
        let omitted = total - kept;
        if omitted > 0 {
            tracing::warn!(
                "omitted {} of {} comments with no reachable parent",
                omitted,
                total
            );
        }
        tracing::debug!(
            "built comment forest: {} roots, {} comments, policy {}",
            forest.len(),
            kept,
            self.cfg.orphan_policy().as_str()
        );

        Ok(forest)
    }

    /// Loads a snapshot and builds its forest.
    pub fn thread_from_path(&self, path: &Path) -> CoreResult<Vec<CommentWithReplies<Comment>>> {
        let comments = self.load_snapshot(path)?;
        self.build_thread(comments)
    }
}
