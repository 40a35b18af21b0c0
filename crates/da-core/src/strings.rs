//! TLK string tables
//!
//! A string table is an immutable `id -> text` mapping. Payloads come in two
//! encodings, sniffed from the first non-whitespace byte:
//! - JSON: `[{"id": 1, "text": "..."}]` or `{"strings": [...]}`
//! - CSV: a header row followed by `id,text` records

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One `(id, text)` entry of a TLK payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StringEntry {
    pub id: u64,
    pub text: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonPayload {
    Entries(Vec<StringEntry>),
    Wrapped { strings: Vec<StringEntry> },
}

/// Immutable mapping from string id to text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringTable {
    strings: HashMap<u64, String>,
}

impl StringTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from entries. Later duplicates overwrite earlier ones.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (u64, String)>,
    {
        Self {
            strings: entries.into_iter().collect(),
        }
    }

    /// Parse a TLK payload fetched under `name`
    pub fn from_payload(name: &str, bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes).map_err(|e| Error::MalformedStringTable {
            name: name.to_string(),
            message: e.to_string(),
        })?;

        match text.trim_start().chars().next() {
            Some('[') | Some('{') => Self::from_json(name, text),
            Some(_) => Self::from_csv(name, text),
            None => Err(Error::MalformedStringTable {
                name: name.to_string(),
                message: "empty payload".to_string(),
            }),
        }
    }

    fn from_json(name: &str, text: &str) -> Result<Self> {
        let payload: JsonPayload =
            serde_json::from_str(text).map_err(|e| Error::MalformedStringTable {
                name: name.to_string(),
                message: e.to_string(),
            })?;

        let entries = match payload {
            JsonPayload::Entries(entries) => entries,
            JsonPayload::Wrapped { strings } => strings,
        };
        Ok(Self::from_entries(entries.into_iter().map(|e| (e.id, e.text))))
    }

    fn from_csv(name: &str, text: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut entries = Vec::new();
        for result in reader.records() {
            let record = result.map_err(|e| Error::Csv {
                name: name.to_string(),
                source: e,
            })?;

            let raw_id = record.get(0).unwrap_or_default().trim();
            let id = raw_id
                .parse::<u64>()
                .map_err(|_| Error::MalformedStringTable {
                    name: name.to_string(),
                    message: format!("invalid string id '{}'", raw_id),
                })?;
            let text = record.get(1).unwrap_or_default().to_string();
            entries.push((id, text));
        }

        Ok(Self::from_entries(entries))
    }

    /// Look up text by id
    pub fn get(&self, id: u64) -> Option<&str> {
        self.strings.get(&id).map(String::as_str)
    }

    /// Number of strings
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// True when the table holds no strings
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_write_wins() {
        let table = StringTable::from_entries(vec![
            (1, "first".to_string()),
            (2, "other".to_string()),
            (1, "second".to_string()),
        ]);
        assert_eq!(table.get(1), Some("second"));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_json_array_payload() {
        let payload = br#"[{"id": 500, "text": "Longsword"}, {"id": 501, "text": "Dagger"}]"#;
        let table = StringTable::from_payload("dialog", payload).unwrap();
        assert_eq!(table.get(500), Some("Longsword"));
        assert_eq!(table.get(501), Some("Dagger"));
    }

    #[test]
    fn test_json_wrapped_payload() {
        let payload = br#"{"strings": [{"id": 1, "text": "CustomSword"}]}"#;
        let table = StringTable::from_payload("custom", payload).unwrap();
        assert_eq!(table.get(1), Some("CustomSword"));
    }

    #[test]
    fn test_csv_payload() {
        let payload = b"id,text\n500,Longsword\n7,\"Sword, long\"\n";
        let table = StringTable::from_payload("dialog", payload).unwrap();
        assert_eq!(table.get(500), Some("Longsword"));
        assert_eq!(table.get(7), Some("Sword, long"));
    }

    #[test]
    fn test_malformed_payloads() {
        assert!(matches!(
            StringTable::from_payload("x", b"   "),
            Err(Error::MalformedStringTable { .. })
        ));
        assert!(matches!(
            StringTable::from_payload("x", b"{\"nope\": 1}"),
            Err(Error::MalformedStringTable { .. })
        ));
        assert!(matches!(
            StringTable::from_payload("x", b"id,text\nabc,Foo\n"),
            Err(Error::MalformedStringTable { .. })
        ));
        assert!(StringTable::from_payload("x", &[0xff, 0xfe]).is_err());
    }
}
