//! Reply trees built from flat comment lists.
//!
//! The community backend returns a thread's comments as one flat list where each reply names
//! its parent. [`build_comment_tree`] turns that list into an ordered forest:
//! - top-level comments become roots, in input order
//! - each comment's replies are the comments naming it as parent, in input order
//!
//! Comments that cannot be reached from a root are handled according to [`OrphanPolicy`].

use crate::constants::{PARENT_COMMENT_ID_FIELD, ROOT_BUCKET};
use crate::group::{group_by, FieldAccess};
use crate::{CoreError, CoreResult};
use campus_types::{CommentId, NonEmptyText, TextError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;

/// A record that can take part in a reply tree.
pub trait Threaded {
    /// Identifier other records use to reply to this one.
    fn id(&self) -> &str;

    /// Identifier of the record this one replies to; `None` for a top-level record.
    fn parent_id(&self) -> Option<&str>;
}

impl<T: Threaded + ?Sized> Threaded for &T {
    fn id(&self) -> &str {
        (**self).id()
    }

    fn parent_id(&self) -> Option<&str> {
        (**self).parent_id()
    }
}

/// Author of a comment as shown next to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommentAuthor {
    /// Identity-provider user id. Opaque.
    pub id: String,
    pub display_name: NonEmptyText,
}

/// A comment on a community thread, article or event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Comment {
    pub id: CommentId,
    pub parent_comment_id: Option<CommentId>,
    pub author: CommentAuthor,
    pub body: NonEmptyText,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Comment {
    /// Creates a comment posted at `created_at`.
    ///
    /// # Errors
    ///
    /// Returns [`TextError`] if the id, parent id, author name or body fail validation.
    pub fn new(
        id: &str,
        parent_comment_id: Option<&str>,
        author_id: impl Into<String>,
        author_name: &str,
        body: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Self, TextError> {
        Ok(Self {
            id: CommentId::new(id)?,
            parent_comment_id: parent_comment_id.map(CommentId::new).transpose()?,
            author: CommentAuthor {
                id: author_id.into(),
                display_name: NonEmptyText::new(author_name)?,
            },
            body: NonEmptyText::new(body)?,
            created_at,
            updated_at: None,
        })
    }
}

impl Threaded for Comment {
    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn parent_id(&self) -> Option<&str> {
        self.parent_comment_id.as_ref().map(CommentId::as_str)
    }
}

impl FieldAccess for Comment {
    /// Field names follow the backend payload. `parentCommentId` is absent on top-level
    /// comments, as it is on the wire.
    fn field(&self, name: &str) -> Option<String> {
        match name {
            "id" => Some(self.id.to_string()),
            PARENT_COMMENT_ID_FIELD => self.parent_comment_id.as_ref().map(ToString::to_string),
            "authorId" => Some(self.author.id.clone()),
            "body" => Some(self.body.to_string()),
            "createdAt" => Some(self.created_at.to_rfc3339()),
            "updatedAt" => self.updated_at.map(|t| t.to_rfc3339()),
            _ => None,
        }
    }
}

/// A comment together with its direct replies, each carrying its own replies.
///
/// Serialises as the comment's own fields followed by `replies`. Building, walking, cloning,
/// comparing and dropping use explicit work stacks, so reply chains of any depth are safe.
#[derive(Debug, Serialize)]
pub struct CommentWithReplies<C> {
    #[serde(flatten)]
    pub comment: C,
    pub replies: Vec<CommentWithReplies<C>>,
}

impl<C> CommentWithReplies<C> {
    /// Number of comments below this one, at any depth.
    pub fn descendant_count(&self) -> usize {
        let mut count = 0;
        let mut pending: Vec<&Self> = self.replies.iter().collect();
        while let Some(node) = pending.pop() {
            count += 1;
            pending.extend(node.replies.iter());
        }
        count
    }

    /// Number of levels in this subtree; 1 for a comment without replies.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending = vec![(self, 1)];
        while let Some((node, level)) = pending.pop() {
            deepest = deepest.max(level);
            pending.extend(node.replies.iter().map(|reply| (reply, level + 1)));
        }
        deepest
    }
}

impl<C> Drop for CommentWithReplies<C> {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.replies);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.replies);
        }
    }
}

impl<C: Clone> Clone for CommentWithReplies<C> {
    fn clone(&self) -> Self {
        // One root in, one root out.
        map_forest(std::slice::from_ref(self), C::clone).swap_remove(0)
    }
}

impl<C: PartialEq> PartialEq for CommentWithReplies<C> {
    fn eq(&self, other: &Self) -> bool {
        let mut pending = vec![(self, other)];
        while let Some((a, b)) = pending.pop() {
            if a.comment != b.comment || a.replies.len() != b.replies.len() {
                return false;
            }
            pending.extend(a.replies.iter().zip(&b.replies));
        }
        true
    }
}

impl<C: Eq> Eq for CommentWithReplies<C> {}

/// What happens to comments that no root leads to.
///
/// A comment is unreachable when its parent id matches no comment in the same snapshot (for
/// example the parent was deleted server-side), or when its ancestors form a cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OrphanPolicy {
    /// Omit unreachable comments silently.
    #[default]
    Drop,
    /// Treat comments with a missing parent as roots. Comments on a parent cycle fail the
    /// build with [`CoreError::CycleDetected`].
    PromoteToRoot,
}

impl OrphanPolicy {
    /// Parses a policy name (case-insensitive): `drop`, `promote` or `promote-to-root`.
    pub fn parse(s: &str) -> CoreResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "drop" => Ok(Self::Drop),
            "promote" | "promote-to-root" => Ok(Self::PromoteToRoot),
            _ => Err(CoreError::InvalidInput(format!(
                "Invalid orphan policy: {s} (expected drop or promote)"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Drop => "drop",
            Self::PromoteToRoot => "promote",
        }
    }
}

impl std::str::FromStr for OrphanPolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Options for [`build_comment_tree_with`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TreeOptions {
    pub orphan_policy: OrphanPolicy,
}

/// Builds the reply forest for `comments` with the default options.
///
/// Unreachable comments are dropped; see [`build_comment_tree_with`].
pub fn build_comment_tree<I>(comments: I) -> CoreResult<Vec<CommentWithReplies<I::Item>>>
where
    I: IntoIterator,
    I::Item: Threaded,
{
    build_comment_tree_with(comments, &TreeOptions::default())
}

/// Builds the reply forest for `comments`.
///
/// Roots and replies keep their relative input order. Every reachable comment appears exactly
/// once.
///
/// # Errors
///
/// - [`CoreError::InvalidInput`] if a comment has an empty id
/// - [`CoreError::DuplicateId`] if two comments share an id
/// - [`CoreError::CycleDetected`] under [`OrphanPolicy::PromoteToRoot`] when a comment is still
///   unreachable after promotion
pub fn build_comment_tree_with<I>(
    comments: I,
    options: &TreeOptions,
) -> CoreResult<Vec<CommentWithReplies<I::Item>>>
where
    I: IntoIterator,
    I::Item: Threaded,
{
    let comments: Vec<I::Item> = comments.into_iter().collect();

    let mut ids = HashSet::with_capacity(comments.len());
    for (index, comment) in comments.iter().enumerate() {
        let id = comment.id();
        if id.is_empty() {
            return Err(CoreError::InvalidInput(format!(
                "comment at index {index} has an empty id"
            )));
        }
        if !ids.insert(id.to_owned()) {
            return Err(CoreError::DuplicateId { id: id.to_owned() });
        }
    }

    let promote = options.orphan_policy == OrphanPolicy::PromoteToRoot;
    let mut groups = group_by(comments.into_iter().enumerate(), |(_, comment)| {
        let bucket = match comment.parent_id() {
            Some(parent) if !parent.is_empty() && !(promote && !ids.contains(parent)) => parent,
            _ => ROOT_BUCKET,
        };
        bucket.to_owned()
    });

    // Pre-order walk; each bucket is taken once, so this terminates even on malformed input.
    let mut entries = Vec::new();
    let mut pending: Vec<(Option<usize>, I::Item)> = groups
        .take_bucket(ROOT_BUCKET)
        .into_iter()
        .rev()
        .map(|(_, comment)| (None, comment))
        .collect();
    while let Some((parent, comment)) = pending.pop() {
        let slot = entries.len();
        let children = groups.take_bucket(comment.id());
        pending.extend(
            children
                .into_iter()
                .rev()
                .map(|(_, child)| (Some(slot), child)),
        );
        entries.push((parent, comment));
    }

    if promote {
        let stranded = groups
            .into_items()
            .into_iter()
            .min_by_key(|(index, _)| *index);
        if let Some((_, comment)) = stranded {
            return Err(CoreError::CycleDetected {
                id: comment.id().to_owned(),
            });
        }
    }

    Ok(assemble(entries))
}

/// Builds nodes bottom-up from a pre-order listing of `(parent slot, comment)` pairs.
///
/// Siblings must appear in their final order. Every descendant of slot `i` sits after `i`, so
/// walking the listing backwards finishes all replies before their parent.
fn assemble<C>(entries: Vec<(Option<usize>, C)>) -> Vec<CommentWithReplies<C>> {
    let mut replies: Vec<Vec<CommentWithReplies<C>>> =
        (0..entries.len()).map(|_| Vec::new()).collect();
    let mut roots = Vec::new();

    for (slot, (parent, comment)) in entries.into_iter().enumerate().rev() {
        let mut children = std::mem::take(&mut replies[slot]);
        children.reverse();
        let node = CommentWithReplies {
            comment,
            replies: children,
        };
        match parent {
            Some(parent) => replies[parent].push(node),
            None => roots.push(node),
        }
    }

    roots.reverse();
    roots
}

/// Converts every comment in `forest`, keeping its shape.
pub fn map_forest<C, D>(
    forest: &[CommentWithReplies<C>],
    mut f: impl FnMut(&C) -> D,
) -> Vec<CommentWithReplies<D>> {
    let mut entries = Vec::new();
    let mut pending: Vec<(Option<usize>, &CommentWithReplies<C>)> =
        forest.iter().rev().map(|node| (None, node)).collect();
    while let Some((parent, node)) = pending.pop() {
        let slot = entries.len();
        pending.extend(node.replies.iter().rev().map(|reply| (Some(slot), reply)));
        entries.push((parent, f(&node.comment)));
    }
    assemble(entries)
}

/// Lists every comment in `forest` in pre-order (each comment before its replies).
pub fn flatten_forest<C>(forest: &[CommentWithReplies<C>]) -> Vec<&C> {
    let mut out = Vec::new();
    let mut pending: Vec<&CommentWithReplies<C>> = forest.iter().rev().collect();
    while let Some(node) = pending.pop() {
        out.push(&node.comment);
        pending.extend(node.replies.iter().rev());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::group_by_field;
    use proptest::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq)]
    struct Node {
        id: String,
        parent: Option<String>,
    }

    impl Threaded for Node {
        fn id(&self) -> &str {
            &self.id
        }

        fn parent_id(&self) -> Option<&str> {
            self.parent.as_deref()
        }
    }

    fn node(id: &str, parent: Option<&str>) -> Node {
        Node {
            id: id.to_owned(),
            parent: parent.map(str::to_owned),
        }
    }

    fn ids<C: Threaded>(nodes: &[CommentWithReplies<C>]) -> Vec<&str> {
        nodes.iter().map(|n| n.comment.id()).collect()
    }

    fn sample_comment(id: &str, parent: Option<&str>) -> Comment {
        let at = DateTime::parse_from_rfc3339("2026-03-02T09:15:00Z")
            .expect("timestamp")
            .with_timezone(&Utc);
        Comment::new(id, parent, "user_7", "Ada Lovelace", "Nice summary", at).expect("comment")
    }

    #[test]
    fn roots_and_replies_keep_input_order() {
        let comments = vec![
            node("1", None),
            node("2", Some("1")),
            node("3", None),
            node("4", Some("1")),
        ];

        let forest = build_comment_tree(comments).expect("build");

        assert_eq!(ids(&forest), vec!["1", "3"]);
        assert_eq!(ids(&forest[0].replies), vec!["2", "4"]);
        assert!(forest[0].replies.iter().all(|r| r.replies.is_empty()));
        assert!(forest[1].replies.is_empty());
    }

    #[test]
    fn nested_replies_nest_under_their_parents() {
        let comments = vec![
            node("c", Some("b")),
            node("a", None),
            node("b", Some("a")),
            node("d", Some("c")),
        ];

        let forest = build_comment_tree(&comments).expect("build");

        assert_eq!(ids(&forest), vec!["a"]);
        assert_eq!(forest[0].depth(), 4);
        assert_eq!(forest[0].descendant_count(), 3);
        let flat = flatten_forest(&forest);
        let order: Vec<&str> = flat.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn empty_input_builds_empty_forest() {
        let forest = build_comment_tree(Vec::<Node>::new()).expect("build");
        assert!(forest.is_empty());
    }

    #[test]
    fn dangling_parent_is_dropped_by_default() {
        let forest = build_comment_tree(vec![node("1", Some("ghost"))]).expect("build");
        assert!(forest.is_empty());
    }

    #[test]
    fn dangling_parent_is_promoted_in_input_order() {
        let options = TreeOptions {
            orphan_policy: OrphanPolicy::PromoteToRoot,
        };
        let comments = vec![
            node("1", None),
            node("2", Some("ghost")),
            node("3", Some("2")),
            node("4", None),
        ];

        let forest = build_comment_tree_with(comments, &options).expect("build");

        assert_eq!(ids(&forest), vec!["1", "2", "4"]);
        assert_eq!(ids(&forest[1].replies), vec!["3"]);
    }

    #[test]
    fn empty_parent_id_counts_as_top_level() {
        let forest = build_comment_tree(vec![node("1", Some(""))]).expect("build");
        assert_eq!(ids(&forest), vec!["1"]);
    }

    #[test]
    fn cycle_is_dropped_by_default() {
        let comments = vec![node("root", None), node("a", Some("b")), node("b", Some("a"))];
        let forest = build_comment_tree(comments).expect("build");
        assert_eq!(ids(&forest), vec!["root"]);
        assert!(forest[0].replies.is_empty());
    }

    #[test]
    fn cycle_fails_when_promoting() {
        let options = TreeOptions {
            orphan_policy: OrphanPolicy::PromoteToRoot,
        };
        let comments = vec![
            node("root", None),
            node("x", Some("b")),
            node("a", Some("b")),
            node("b", Some("a")),
        ];

        let err = build_comment_tree_with(comments, &options).expect_err("cycle");
        match err {
            CoreError::CycleDetected { id } => assert_eq!(id, "x"),
            other => panic!("expected CycleDetected, got {other:?}"),
        }
    }

    #[test]
    fn self_parent_is_a_cycle() {
        let options = TreeOptions {
            orphan_policy: OrphanPolicy::PromoteToRoot,
        };
        let err = build_comment_tree_with(vec![node("a", Some("a"))], &options)
            .expect_err("self reference");
        assert!(matches!(err, CoreError::CycleDetected { id } if id == "a"));
    }

    #[test]
    fn long_reply_chain_builds_without_recursion() {
        const LEN: usize = 100_000;
        let comments: Vec<Node> = (0..LEN)
            .map(|i| Node {
                id: format!("c{i}"),
                parent: i.checked_sub(1).map(|p| format!("c{p}")),
            })
            .collect();

        let forest = build_comment_tree(comments).expect("build");

        assert_eq!(ids(&forest), vec!["c0"]);
        assert_eq!(forest[0].descendant_count(), LEN - 1);
        assert_eq!(forest[0].depth(), LEN);
        let flat = flatten_forest(&forest);
        assert_eq!(flat.len(), LEN);
        assert_eq!(flat[LEN - 1].id, format!("c{}", LEN - 1));

        let copy = forest.clone();
        assert_eq!(copy, forest);
        let labels = map_forest(&forest, |n| n.id.len());
        assert_eq!(labels[0].descendant_count(), LEN - 1);

        drop(labels);
        drop(copy);
        drop(forest);
    }

    #[test]
    fn trees_with_different_shapes_are_not_equal() {
        let nested = build_comment_tree(vec![node("a", None), node("b", Some("a"))]).expect("build");
        let flat = build_comment_tree(vec![node("a", None), node("b", None)]).expect("build");
        assert_ne!(nested[0], flat[0]);
        assert_eq!(nested[0].clone(), nested[0]);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let comments = vec![node("1", None), node("1", Some("1"))];
        let err = build_comment_tree(comments).expect_err("duplicate");
        assert!(matches!(err, CoreError::DuplicateId { id } if id == "1"));
    }

    #[test]
    fn empty_id_is_rejected() {
        let err = build_comment_tree(vec![node("", None)]).expect_err("empty id");
        match err {
            CoreError::InvalidInput(msg) => assert!(msg.contains("index 0")),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn comments_keep_all_fields() {
        let comments = vec![sample_comment("c1", None), sample_comment("c2", Some("c1"))];

        let forest = build_comment_tree(comments.clone()).expect("build");

        assert_eq!(forest[0].comment, comments[0]);
        assert_eq!(forest[0].replies[0].comment, comments[1]);
    }

    #[test]
    fn comment_fields_group_by_name() {
        let comments = vec![
            sample_comment("c1", None),
            sample_comment("c2", Some("c1")),
            sample_comment("c3", Some("c1")),
        ];

        let by_author = group_by_field(&comments, "authorId").expect("group");
        assert_eq!(by_author.get("user_7").map(<[_]>::len), Some(3));

        let err = group_by_field(&comments, PARENT_COMMENT_ID_FIELD).expect_err("top level");
        assert!(matches!(err, CoreError::MissingKey { index: 0, .. }));

        let replies = group_by_field(&comments[1..], PARENT_COMMENT_ID_FIELD).expect("group");
        assert_eq!(replies.keys().collect::<Vec<_>>(), vec!["c1"]);
    }

    #[test]
    fn orphan_policy_parses_names() {
        assert_eq!(OrphanPolicy::parse("Drop").unwrap(), OrphanPolicy::Drop);
        assert_eq!(
            "promote-to-root".parse::<OrphanPolicy>().unwrap(),
            OrphanPolicy::PromoteToRoot
        );
        assert!(OrphanPolicy::parse("keep").is_err());
    }

    // Well-formed snapshots: every parent refers to an earlier-generated comment, then the
    // list is shuffled so parents may come after their replies.
    fn well_formed_snapshot() -> impl Strategy<Value = Vec<Node>> {
        (1usize..40)
            .prop_flat_map(|len| {
                (0..len)
                    .map(|i| {
                        if i == 0 {
                            Just(None).boxed()
                        } else {
                            prop::option::of(0..i).boxed()
                        }
                    })
                    .collect::<Vec<_>>()
            })
            .prop_map(|parents| {
                parents
                    .into_iter()
                    .enumerate()
                    .map(|(i, parent)| Node {
                        id: format!("c{i}"),
                        parent: parent.map(|p| format!("c{p}")),
                    })
                    .collect::<Vec<_>>()
            })
            .prop_shuffle()
    }

    proptest! {
        #[test]
        fn well_formed_input_appears_exactly_once(comments in well_formed_snapshot()) {
            let forest = build_comment_tree(&comments).expect("build");

            let flat = flatten_forest(&forest);
            let mut seen: Vec<&str> = flat.iter().map(|n| n.id.as_str()).collect();
            seen.sort_unstable();
            let mut expected: Vec<&str> = comments.iter().map(|n| n.id.as_str()).collect();
            expected.sort_unstable();
            prop_assert_eq!(seen, expected);

            for root in &forest {
                prop_assert!(root.comment.parent_id().is_none());
            }
        }

        #[test]
        fn siblings_follow_input_order(comments in well_formed_snapshot()) {
            let position = |id: &str| comments.iter().position(|n| n.id == id);
            let forest = build_comment_tree(&comments).expect("build");

            let mut levels = vec![&forest];
            while let Some(level) = levels.pop() {
                let positions: Vec<_> = level.iter().map(|n| position(n.comment.id())).collect();
                let mut sorted = positions.clone();
                sorted.sort_unstable();
                prop_assert_eq!(positions, sorted);
                levels.extend(level.iter().map(|n| &n.replies));
            }
        }
    }
}
