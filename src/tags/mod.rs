//! # Tags attached to every outbound call.
//!
//! A [`Tag`] is a `key:value` pair; a [`TagSet`] is an ordered list of them.
//! Event tags are derived from the process snapshot:
//!
//! ```text
//! application:<name>, instance:<id>, status:<status>
//!   + branch:<branch>    iff versioning has a branch other than "HEAD"
//!   + version:<semver>   iff package.json in the working directory has one
//! ```
//!
//! Sanitization of reserved characters happens when a datagram is encoded,
//! not here.

pub mod manifest;

use std::fmt;

use crate::events::ProcessSnapshot;
use crate::poller::ProcessInfo;

/// Branch name git reports for a detached checkout.
pub const DETACHED_BRANCH: &str = "HEAD";

/// One `key:value` tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag {
    pub key: &'static str,
    pub value: String,
}

impl Tag {
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.key, self.value)
    }
}

/// Ordered collection of tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet(Vec<Tag>);

impl TagSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends a tag.
    pub fn push(&mut self, key: &'static str, value: impl Into<String>) {
        self.0.push(Tag::new(key, value));
    }

    /// Builder-style [`push`](Self::push).
    #[must_use]
    pub fn with(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.push(key, value);
        self
    }

    /// `application:<name>` only.
    pub fn application(name: &str) -> Self {
        Self::new().with("application", name)
    }

    /// Tags for a lifecycle event.
    ///
    /// `version` is the package version found in the working directory, if any.
    pub fn for_event(process: &ProcessSnapshot, version: Option<&str>) -> Self {
        let mut tags = Self::application(&process.name)
            .with("instance", process.instance.as_str())
            .with("status", process.status.as_str());

        if let Some(branch) = process.branch().filter(|b| *b != DETACHED_BRANCH) {
            tags.push("branch", branch);
        }
        if let Some(version) = version {
            tags.push("version", version);
        }
        tags
    }

    /// `application` and `instance` of a polled process.
    pub fn for_process(info: &ProcessInfo) -> Self {
        Self::application(&info.name).with("instance", info.instance())
    }

    /// Looks up the value of the first tag with `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|t| t.key == key)
            .map(|t| t.value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Rendered `key:value` strings, in insertion order.
    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(Tag::to_string).collect()
    }
}

impl<'a> IntoIterator for &'a TagSet {
    type Item = &'a Tag;
    type IntoIter = std::slice::Iter<'a, Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(versioning: serde_json::Value) -> ProcessSnapshot {
        serde_json::from_value(serde_json::json!({
            "name": "api",
            "NODE_APP_INSTANCE": 2,
            "status": "online",
            "versioning": versioning,
        }))
        .unwrap()
    }

    #[test]
    fn base_tags_are_always_present() {
        let tags = TagSet::for_event(&snapshot(serde_json::Value::Null), None);
        assert_eq!(
            tags.to_strings(),
            vec!["application:api", "instance:2", "status:online"]
        );
    }

    #[test]
    fn branch_is_added_unless_detached() {
        let tags = TagSet::for_event(&snapshot(serde_json::json!({"branch": "main"})), None);
        assert_eq!(tags.get("branch"), Some("main"));

        let tags = TagSet::for_event(&snapshot(serde_json::json!({"branch": "HEAD"})), None);
        assert_eq!(tags.get("branch"), None);

        let tags = TagSet::for_event(&snapshot(serde_json::json!({})), None);
        assert_eq!(tags.get("branch"), None);
    }

    #[test]
    fn version_comes_last() {
        let tags = TagSet::for_event(
            &snapshot(serde_json::json!({"branch": "dev"})),
            Some("1.4.2"),
        );
        assert_eq!(
            tags.to_strings(),
            vec![
                "application:api",
                "instance:2",
                "status:online",
                "branch:dev",
                "version:1.4.2"
            ]
        );
    }

    #[test]
    fn process_tags_carry_no_status() {
        let info: ProcessInfo = serde_json::from_value(serde_json::json!({
            "name": "worker",
            "pm2_env": {"status": "errored", "NODE_APP_INSTANCE": "3"},
        }))
        .unwrap();
        assert_eq!(
            TagSet::for_process(&info).to_strings(),
            vec!["application:worker", "instance:3"]
        );
    }
}
