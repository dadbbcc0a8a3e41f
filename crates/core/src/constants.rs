//! Constants used throughout the Campus core crate.

/// Bucket key holding top-level comments during tree construction.
///
/// Comment ids are never empty, so the empty string cannot collide with a real parent id.
pub const ROOT_BUCKET: &str = "";

/// Environment variable selecting the orphan policy (`drop` or `promote`).
pub const ORPHAN_POLICY_ENV: &str = "CAMPUS_ORPHAN_POLICY";

/// Environment variable forcing the snapshot format (`json` or `yaml`).
pub const SNAPSHOT_FORMAT_ENV: &str = "CAMPUS_SNAPSHOT_FORMAT";

/// Field name the backend uses for a comment's parent reference.
pub const PARENT_COMMENT_ID_FIELD: &str = "parentCommentId";

/// Deepest reply nesting the JSON/YAML renderers accept.
///
/// Serialisation recurses once per level, on the caller's stack.
pub const MAX_RENDER_DEPTH: usize = 128;
