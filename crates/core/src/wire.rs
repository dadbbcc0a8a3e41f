//! Wire models for comment snapshots.
//!
//! The community backend returns comments as a JSON array of camelCase records; exported
//! threads and test fixtures use the same shape in YAML. This module:
//! - defines the strict wire record (`deny_unknown_fields`)
//! - converts wire records into validated [`Comment`] values
//! - renders a built forest back into the same shape with a nested `replies` array
//!
//! Example record:
//!
//! ```json
//! {
//!   "id": "cm_02",
//!   "parentCommentId": "cm_01",
//!   "author": { "id": "user_7", "displayName": "Ada Lovelace" },
//!   "body": "Agreed, the second module is the hardest.",
//!   "createdAt": "2026-03-02T09:15:00Z"
//! }
//! ```

use crate::comments::{map_forest, Comment, CommentAuthor, CommentWithReplies};
use crate::constants::MAX_RENDER_DEPTH;
use crate::{CoreError, CoreResult};
use campus_types::{CommentId, NonEmptyText};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Text encoding of a comment snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnapshotFormat {
    Json,
    Yaml,
}

impl SnapshotFormat {
    /// Infers the format from a file extension (`.json`, `.yaml`, `.yml`).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
        }
    }
}

impl std::str::FromStr for SnapshotFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            _ => Err(CoreError::InvalidInput(format!(
                "Invalid snapshot format: {s} (expected json or yaml)"
            ))),
        }
    }
}

/// Parsing and rendering of comment snapshots.
///
/// Zero-sized; all methods are associated functions.
pub struct CommentWire;

impl CommentWire {
    /// Parse a snapshot in the given format.
    pub fn parse(text: &str, format: SnapshotFormat) -> CoreResult<Vec<Comment>> {
        match format {
            SnapshotFormat::Json => Self::parse_json(text),
            SnapshotFormat::Yaml => Self::parse_yaml(text),
        }
    }

    /// Parse a JSON array of comment records.
    ///
    /// Schema mismatches report the path of the failing field (for example
    /// `[1].author.displayName`).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Translation`] if the text does not match the wire schema, and
    /// [`CoreError::InvalidInput`] if a record fails validation.
    pub fn parse_json(text: &str) -> CoreResult<Vec<Comment>> {
        let mut deserializer = serde_json::Deserializer::from_str(text);
        let records: Vec<CommentRecord> =
            serde_path_to_error::deserialize(&mut deserializer).map_err(schema_mismatch)?;
        deserializer
            .end()
            .map_err(|e| CoreError::Translation(format!("Trailing data after comments: {e}")))?;
        records_to_domain(records)
    }

    /// Parse a YAML sequence of comment records.
    ///
    /// # Errors
    ///
    /// As [`CommentWire::parse_json`].
    pub fn parse_yaml(text: &str) -> CoreResult<Vec<Comment>> {
        let deserializer = serde_yaml::Deserializer::from_str(text);
        let records: Vec<CommentRecord> =
            serde_path_to_error::deserialize(deserializer).map_err(schema_mismatch)?;
        records_to_domain(records)
    }

    /// Render a forest in the given format.
    pub fn render_forest(
        forest: &[CommentWithReplies<Comment>],
        format: SnapshotFormat,
    ) -> CoreResult<String> {
        match format {
            SnapshotFormat::Json => Self::render_forest_json(forest),
            SnapshotFormat::Yaml => Self::render_forest_yaml(forest),
        }
    }

    /// Render a forest as pretty-printed JSON with nested `replies` arrays.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Translation`] if replies nest deeper than [`MAX_RENDER_DEPTH`] or
    /// serialisation fails.
    pub fn render_forest_json(forest: &[CommentWithReplies<Comment>]) -> CoreResult<String> {
        serde_json::to_string_pretty(&forest_to_wire(forest)?)
            .map_err(|e| CoreError::Translation(format!("Failed to serialize forest: {e}")))
    }

    /// Render a forest as YAML with nested `replies` sequences.
    pub fn render_forest_yaml(forest: &[CommentWithReplies<Comment>]) -> CoreResult<String> {
        serde_yaml::to_string(&forest_to_wire(forest)?)
            .map_err(|e| CoreError::Translation(format!("Failed to serialize forest: {e}")))
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct CommentRecord {
    id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent_comment_id: Option<String>,
    author: AuthorRecord,
    body: String,
    created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct AuthorRecord {
    id: String,
    display_name: String,
}

// ============================================================================
// Helper functions (internal)
// ============================================================================

fn schema_mismatch<E: std::fmt::Display>(err: serde_path_to_error::Error<E>) -> CoreError {
    let path = err.path().to_string();
    let source = err.into_inner();
    let path = if path.is_empty() || path == "." {
        "<root>"
    } else {
        path.as_str()
    };
    CoreError::Translation(format!("Comment snapshot schema mismatch at {path}: {source}"))
}

fn records_to_domain(records: Vec<CommentRecord>) -> CoreResult<Vec<Comment>> {
    records
        .into_iter()
        .enumerate()
        .map(|(idx, record)| record_to_domain(idx, record))
        .collect()
}

fn record_to_domain(idx: usize, record: CommentRecord) -> CoreResult<Comment> {
    let id = CommentId::new(record.id)
        .map_err(|e| CoreError::InvalidInput(format!("Invalid id in comments[{idx}]: {e}")))?;

    // The RPC layer sends `null` for top-level comments; some exports send "".
    let parent_comment_id = record
        .parent_comment_id
        .filter(|p| !p.is_empty())
        .map(CommentId::new)
        .transpose()
        .map_err(|e| {
            CoreError::InvalidInput(format!("Invalid parentCommentId in comments[{idx}]: {e}"))
        })?;

    let display_name = NonEmptyText::new(&record.author.display_name).map_err(|_| {
        CoreError::InvalidInput(format!("Empty author displayName in comments[{idx}]"))
    })?;
    let body = NonEmptyText::new(&record.body)
        .map_err(|_| CoreError::InvalidInput(format!("Empty body in comments[{idx}]")))?;

    Ok(Comment {
        id,
        parent_comment_id,
        author: CommentAuthor {
            id: record.author.id,
            display_name,
        },
        body,
        created_at: record.created_at,
        updated_at: record.updated_at,
    })
}

fn domain_to_record(comment: &Comment) -> CommentRecord {
    CommentRecord {
        id: comment.id.to_string(),
        parent_comment_id: comment.parent_comment_id.as_ref().map(ToString::to_string),
        author: AuthorRecord {
            id: comment.author.id.clone(),
            display_name: comment.author.display_name.to_string(),
        },
        body: comment.body.to_string(),
        created_at: comment.created_at,
        updated_at: comment.updated_at,
    }
}

fn forest_to_wire(
    forest: &[CommentWithReplies<Comment>],
) -> CoreResult<Vec<CommentWithReplies<CommentRecord>>> {
    let depth = forest
        .iter()
        .map(CommentWithReplies::depth)
        .max()
        .unwrap_or(0);
    if depth > MAX_RENDER_DEPTH {
        return Err(CoreError::Translation(format!(
            "Replies nest {depth} levels deep; at most {MAX_RENDER_DEPTH} can be rendered"
        )));
    }
    Ok(map_forest(forest, domain_to_record))
}
