use crate::history::DEFAULT_CAPACITY;
use serde::{Deserialize, Serialize};
use treebank_conllu::{OrphanPolicy, TagSets};

/// When pending edits are written out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SavePolicy {
    /// Save once this many edits are pending (0 saves after every edit)
    AfterEdits(usize),

    /// Save pending edits when a non-editing command runs
    OnSentenceChange,
}

/// Editor settings, fixed for the lifetime of a session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    /// Pending edits that trigger a save when no `savePolicy` is given
    #[serde(default)]
    pub save_after: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_policy: Option<SavePolicy>,

    /// Browse mode: every editing command is rejected
    #[serde(default)]
    pub read_only: bool,

    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    #[serde(default)]
    pub orphan_policy: OrphanPolicy,

    #[serde(default)]
    pub valid_upos: Vec<String>,

    #[serde(default)]
    pub valid_xpos: Vec<String>,

    #[serde(default)]
    pub valid_deprels: Vec<String>,

    #[serde(default)]
    pub valid_features: Vec<String>,

    /// Appended to the file name by the backup save strategy
    #[serde(default = "default_backup_suffix")]
    pub backup_suffix: String,

    /// Reported to clients
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_history_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_backup_suffix() -> String {
    ".2".to_string()
}

fn default_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

impl EditorConfig {
    pub fn save_policy(&self) -> SavePolicy {
        self.save_policy
            .unwrap_or(SavePolicy::AfterEdits(self.save_after))
    }

    pub fn tag_sets(&self) -> TagSets {
        TagSets::new(
            self.valid_upos.iter().map(String::as_str),
            self.valid_xpos.iter().map(String::as_str),
            self.valid_deprels.iter().map(String::as_str),
            self.valid_features.iter().map(String::as_str),
        )
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            save_after: 0,
            save_policy: None,
            read_only: false,
            history_capacity: default_history_capacity(),
            orphan_policy: OrphanPolicy::default(),
            valid_upos: vec![],
            valid_xpos: vec![],
            valid_deprels: vec![],
            valid_features: vec![],
            backup_suffix: default_backup_suffix(),
            version: default_version(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "saveAfter": 5,
            "readOnly": true,
            "orphanPolicy": "orphan",
            "validUpos": ["NOUN", "VERB"]
        }"#;

        let config: EditorConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.save_policy(), SavePolicy::AfterEdits(5));
        assert!(config.read_only);
        assert_eq!(config.orphan_policy, OrphanPolicy::Orphan);
        assert_eq!(config.history_capacity, 200);
        assert_eq!(config.tag_sets().upos.len(), 2);
        assert!(config.tag_sets().xpos.is_empty());
    }

    #[test]
    fn test_explicit_policy_wins() {
        let json = r#"{ "saveAfter": 5, "savePolicy": "onSentenceChange" }"#;
        let config: EditorConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.save_policy(), SavePolicy::OnSentenceChange);

        let json = r#"{ "savePolicy": { "afterEdits": 3 } }"#;
        let config: EditorConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.save_policy(), SavePolicy::AfterEdits(3));
    }

    #[test]
    fn test_default_config() {
        let config = EditorConfig::default();
        assert_eq!(config.save_policy(), SavePolicy::AfterEdits(0));
        assert!(!config.read_only);
        assert_eq!(config.backup_suffix, ".2");
        assert_eq!(config.orphan_policy, OrphanPolicy::ReattachToHead);
    }
}
