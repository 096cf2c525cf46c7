//! Memory type definitions.
//!
//! [`MemoryRecord`] is one journal note, [`Category`] and [`Importance`] are
//! the labels a note carries, and [`Recollection`] is a long-term memory hit
//! returned by vector retrieval.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The categories offered when writing a new note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Knowledge,
    Experience,
    Task,
    Insight,
    Conversation,
    Other,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Self::Knowledge,
        Self::Experience,
        Self::Task,
        Self::Insight,
        Self::Conversation,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Knowledge => "Knowledge",
            Self::Experience => "Experience",
            Self::Task => "Task",
            Self::Insight => "Insight",
            Self::Conversation => "Conversation",
            Self::Other => "Other",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown category: {s}"))
    }
}

/// How much a note matters. Notes without one read as `Medium`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    Low,
    #[default]
    Medium,
    High,
}

impl Importance {
    pub const ALL: [Importance; 3] = [Self::Low, Self::Medium, Self::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for Importance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Importance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(format!("unknown importance: {s}")),
        }
    }
}

/// The `importance` field as written on disk.
///
/// Journals written by other tools may carry any value here, so anything
/// outside the known levels is kept verbatim, `null` included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImportanceLabel {
    Known(Importance),
    Other(Value),
}

impl ImportanceLabel {
    /// The level this label names, if it names one.
    pub fn level(&self) -> Option<Importance> {
        match self {
            Self::Known(level) => Some(*level),
            Self::Other(_) => None,
        }
    }
}

impl From<Importance> for ImportanceLabel {
    fn from(level: Importance) -> Self {
        Self::Known(level)
    }
}

impl std::fmt::Display for ImportanceLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Known(level) => f.write_str(level.as_str()),
            Self::Other(Value::String(s)) => f.write_str(s),
            Self::Other(v) => write!(f, "{v}"),
        }
    }
}

/// Present-but-null deserializes to `Some(Other(Null))` instead of `None`.
fn present<'de, D>(deserializer: D) -> Result<Option<ImportanceLabel>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    ImportanceLabel::deserialize(deserializer).map(Some)
}

/// A journal note. Field order matches the on-disk JSON layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: u64,
    pub content: String,
    /// Free-form on load; new notes use a [`Category`] name.
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Local time, ISO 8601.
    pub timestamp: String,
    /// `None` means the key is absent from the JSON object.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub importance: Option<ImportanceLabel>,
    /// Fields written by other tools; kept so a load/save cycle is lossless.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MemoryRecord {
    /// The level used for filtering. A missing field reads as `Medium`; a
    /// value outside the known levels has no level.
    pub fn importance(&self) -> Option<Importance> {
        match &self.importance {
            None => Some(Importance::default()),
            Some(label) => label.level(),
        }
    }

    /// The importance as shown to a reader.
    pub fn importance_label(&self) -> String {
        match &self.importance {
            None => Importance::default().to_string(),
            Some(label) => label.to_string(),
        }
    }

    /// The date part of the timestamp (first 10 characters).
    pub fn date(&self) -> &str {
        self.timestamp.get(..10).unwrap_or(&self.timestamp)
    }
}

/// A long-term memory returned by similarity search.
#[derive(Debug, Clone, Serialize)]
pub struct Recollection {
    pub id: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    /// L2 distance to the query vector (lower is closer).
    pub distance: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parses_case_insensitively() {
        assert_eq!("insight".parse::<Category>().unwrap(), Category::Insight);
        assert_eq!(" Task ".parse::<Category>().unwrap(), Category::Task);
        assert!("Gossip".parse::<Category>().is_err());
    }

    #[test]
    fn record_without_importance_reads_as_medium() {
        let rec: MemoryRecord = serde_json::from_str(
            r#"{"id":1,"content":"c","category":"Task","tags":[],"timestamp":"2024-05-01T10:00:00"}"#,
        )
        .unwrap();
        assert_eq!(rec.importance, None);
        assert_eq!(rec.importance(), Some(Importance::Medium));
        assert_eq!(rec.date(), "2024-05-01");
    }

    #[test]
    fn record_serializes_in_field_order() {
        let rec = MemoryRecord {
            id: 7,
            content: "x".into(),
            category: "Other".into(),
            tags: vec!["t".into()],
            timestamp: "2024-05-01T10:00:00.000001".into(),
            importance: Some(Importance::High.into()),
            extra: Map::new(),
        };
        let json = serde_json::to_string(&rec).unwrap();
        assert_eq!(
            json,
            r#"{"id":7,"content":"x","category":"Other","tags":["t"],"timestamp":"2024-05-01T10:00:00.000001","importance":"high"}"#
        );
    }

    #[test]
    fn short_timestamp_date_does_not_panic() {
        let rec = MemoryRecord {
            id: 1,
            content: String::new(),
            category: String::new(),
            tags: vec![],
            timestamp: "2024".into(),
            importance: None,
            extra: Map::new(),
        };
        assert_eq!(rec.date(), "2024");
    }

    fn parse(json: &str) -> MemoryRecord {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn unknown_importance_is_kept_verbatim() {
        let rec = parse(
            r#"{"id":1,"content":"c","category":"Task","tags":[],"timestamp":"t","importance":"critical"}"#,
        );
        assert_eq!(rec.importance(), None);
        assert_eq!(rec.importance_label(), "critical");
        assert!(serde_json::to_string(&rec).unwrap().ends_with(r#""importance":"critical"}"#));

        let capital = parse(
            r#"{"id":2,"content":"c","category":"Task","tags":[],"timestamp":"t","importance":"Medium"}"#,
        );
        assert_eq!(capital.importance(), None);
        assert_eq!(capital.importance_label(), "Medium");
    }

    #[test]
    fn null_importance_survives_serialization() {
        let rec = parse(
            r#"{"id":1,"content":"c","category":"Task","tags":[],"timestamp":"t","importance":null}"#,
        );
        assert_eq!(rec.importance, Some(ImportanceLabel::Other(Value::Null)));
        assert_eq!(rec.importance(), None);
        assert!(serde_json::to_string(&rec).unwrap().ends_with(r#""importance":null}"#));
    }

    #[test]
    fn known_importance_parses_as_level() {
        let rec = parse(
            r#"{"id":1,"content":"c","category":"Task","tags":[],"timestamp":"t","importance":"low"}"#,
        );
        assert_eq!(rec.importance, Some(ImportanceLabel::Known(Importance::Low)));
        assert_eq!(rec.importance(), Some(Importance::Low));
    }
}
