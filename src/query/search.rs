//! Keyword matching over designated record fields

use serde_json::Value;

/// Substring predicate over a fixed set of string fields
///
/// A record matches when any of the fields holds a string containing the
/// keyword. Non-string and missing fields never match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordSearch {
    fields: Vec<&'static str>,
    case_sensitive: bool,
}

impl KeywordSearch {
    /// Case-sensitive search over `fields`
    pub fn new(fields: &[&'static str]) -> Self {
        Self {
            fields: fields.to_vec(),
            case_sensitive: true,
        }
    }

    /// Switches to case-insensitive matching
    pub fn case_insensitive(mut self) -> Self {
        self.case_sensitive = false;
        self
    }

    /// Returns true if `record` matches `keyword`
    pub fn matches(&self, record: &Value, keyword: &str) -> bool {
        let needle = if self.case_sensitive {
            keyword.to_string()
        } else {
            keyword.to_lowercase()
        };

        self.fields
            .iter()
            .filter_map(|field| record.get(*field).and_then(Value::as_str))
            .any(|text| {
                if self.case_sensitive {
                    text.contains(&needle)
                } else {
                    text.to_lowercase().contains(&needle)
                }
            })
    }
}
