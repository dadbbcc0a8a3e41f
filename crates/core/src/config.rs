//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into [`crate::ThreadService`].
//! Library code never reads environment variables itself; binaries read them and hand the raw
//! values to the parsing helpers below.

use crate::comments::{OrphanPolicy, TreeOptions};
use crate::wire::SnapshotFormat;
use crate::CoreResult;

/// Core configuration resolved at startup.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CoreConfig {
    orphan_policy: OrphanPolicy,
    snapshot_format: Option<SnapshotFormat>,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// `snapshot_format` forces the format of every loaded snapshot; `None` infers it from the
    /// file extension.
    pub fn new(orphan_policy: OrphanPolicy, snapshot_format: Option<SnapshotFormat>) -> Self {
        Self {
            orphan_policy,
            snapshot_format,
        }
    }

    pub fn orphan_policy(&self) -> OrphanPolicy {
        self.orphan_policy
    }

    pub fn snapshot_format(&self) -> Option<SnapshotFormat> {
        self.snapshot_format
    }

    pub fn tree_options(&self) -> TreeOptions {
        TreeOptions {
            orphan_policy: self.orphan_policy,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse the orphan policy from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`OrphanPolicy::Drop`].
pub fn orphan_policy_from_env_value(value: Option<String>) -> CoreResult<OrphanPolicy> {
    let parsed = non_blank(value)
        .map(|v| v.parse::<OrphanPolicy>())
        .transpose()?;
    Ok(parsed.unwrap_or_default())
}

/// Parse a forced snapshot format from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns `None` (infer from file extension).
pub fn snapshot_format_from_env_value(
    value: Option<String>,
) -> CoreResult<Option<SnapshotFormat>> {
    non_blank(value)
        .map(|v| v.parse::<SnapshotFormat>())
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CoreError;

    #[test]
    fn orphan_policy_defaults_to_drop() {
        assert_eq!(orphan_policy_from_env_value(None).unwrap(), OrphanPolicy::Drop);
        assert_eq!(
            orphan_policy_from_env_value(Some("   ".into())).unwrap(),
            OrphanPolicy::Drop
        );
    }

    #[test]
    fn orphan_policy_parses_promote() {
        assert_eq!(
            orphan_policy_from_env_value(Some(" PROMOTE ".into())).unwrap(),
            OrphanPolicy::PromoteToRoot
        );
    }

    #[test]
    fn orphan_policy_rejects_unknown() {
        let err = orphan_policy_from_env_value(Some("reparent".into())).expect_err("unknown");
        match err {
            CoreError::InvalidInput(msg) => assert!(msg.contains("reparent")),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn snapshot_format_is_optional() {
        assert_eq!(snapshot_format_from_env_value(None).unwrap(), None);
        assert_eq!(
            snapshot_format_from_env_value(Some("yml".into())).unwrap(),
            Some(SnapshotFormat::Yaml)
        );
        assert!(snapshot_format_from_env_value(Some("xml".into())).is_err());
    }

    #[test]
    fn tree_options_follow_policy() {
        let cfg = CoreConfig::new(OrphanPolicy::PromoteToRoot, None);
        assert_eq!(cfg.tree_options().orphan_policy, OrphanPolicy::PromoteToRoot);
        assert_eq!(CoreConfig::default().tree_options(), TreeOptions::default());
    }
}
