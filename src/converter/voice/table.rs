//! Voice mapping overrides keyed by voice hash

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// A ROM program chosen for a source voice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceMapping {
    /// OPLL program (1-15), 0 or 16+ for a user-voice patch
    pub program: u8,
    /// Added to the converted channel volume (attenuation steps)
    #[serde(default)]
    pub volume_offset: i8,
    /// Added to the converted block
    #[serde(default)]
    pub octave_offset: i8,
}

impl VoiceMapping {
    pub const FALLBACK: VoiceMapping = VoiceMapping {
        program: 1,
        volume_offset: 0,
        octave_offset: 0,
    };
}

/// Overrides file content.
///
/// ```json
/// { "autoEstimate": true, "voices": { "<hash>": { "program": 3, "volumeOffset": 1, "octaveOffset": 0 } } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceTable {
    /// Estimate unmapped voices; when off they use the fallback program
    #[serde(default = "default_auto_estimate")]
    pub auto_estimate: bool,
    #[serde(default)]
    pub voices: BTreeMap<String, VoiceMapping>,
}

fn default_auto_estimate() -> bool {
    true
}

impl VoiceTable {
    pub fn new() -> Self {
        Self {
            auto_estimate: true,
            voices: BTreeMap::new(),
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::VoiceTable(e.to_string()))
    }

    /// Load an overrides file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::VoiceTable(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&text).map_err(|e| match e {
            Error::VoiceTable(msg) => Error::VoiceTable(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    /// Overlay `other` on this table; its entries and flag win
    pub fn merge(&mut self, other: VoiceTable) {
        self.auto_estimate = other.auto_estimate;
        self.voices.extend(other.voices);
    }

    pub fn get(&self, hash: &str) -> Option<VoiceMapping> {
        self.voices.get(hash).copied()
    }
}

impl Default for VoiceTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_overrides() {
        let table = VoiceTable::from_json(
            r#"{"voices": {"00ff": {"program": 3, "volumeOffset": -2}}}"#,
        )
        .unwrap();
        assert!(table.auto_estimate);
        assert_eq!(
            table.get("00ff"),
            Some(VoiceMapping {
                program: 3,
                volume_offset: -2,
                octave_offset: 0
            })
        );
        assert_eq!(table.get("0000"), None);
    }

    #[test]
    fn test_merge_overrides_builtin() {
        let mut table = VoiceTable::new();
        table.voices.insert("aa".into(), VoiceMapping::FALLBACK);
        let mut user = VoiceTable::from_json(r#"{"autoEstimate": false}"#).unwrap();
        user.voices.insert(
            "bb".into(),
            VoiceMapping {
                program: 7,
                volume_offset: 0,
                octave_offset: 1,
            },
        );
        table.merge(user);
        assert!(!table.auto_estimate);
        assert_eq!(table.voices.len(), 2);
    }

    #[test]
    fn test_malformed_table_is_an_error() {
        assert!(matches!(
            VoiceTable::from_json("{\"voices\": 3}"),
            Err(Error::VoiceTable(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = VoiceTable::load(&dir.path().join("none.json")).unwrap_err();
        assert!(matches!(err, Error::VoiceTable(_)));
    }
}
