//! External name index.
//!
//! The store itself carries no names; a payload is identified by its
//! [`EntryKey`] and the manifest maps that key back to a human name and the
//! two name digests.  Extraction only depends on the [`ManifestIndex`]
//! lookup; [`Manifest`] is the text-backed implementation:
//!
//! ```text
//! Hash 32     Hash 64             Blob ID  Blob idx  Name
//! 0xa2e0939b  0x4288cfb749e4c631  000      0000      Xamarin.AndroidX.Activity
//! ```
//!
//! Blank lines and the `Hash` column header are ignored.

use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

use crate::record::EntryKey;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("line {line}: {reason}")]
    MalformedLine { line: usize, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestEntry {
    pub hash32:   String,
    pub hash64:   String,
    pub store_id: u32,
    pub index:    u32,
    pub name:     String,
}

impl ManifestEntry {
    pub fn key(&self) -> EntryKey {
        EntryKey::new(self.store_id, self.index)
    }
}

/// Exact-match lookup on `(store id, positional index)`.
pub trait ManifestIndex {
    fn lookup(&self, key: EntryKey) -> Option<&ManifestEntry>;
}

impl ManifestIndex for HashMap<EntryKey, ManifestEntry> {
    fn lookup(&self, key: EntryKey) -> Option<&ManifestEntry> {
        self.get(&key)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
    by_key:  HashMap<EntryKey, usize>,
}

impl Manifest {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ManifestError> {
        Self::parse(&fs::read_to_string(path)?)
    }

    pub fn parse(text: &str) -> Result<Self, ManifestError> {
        let mut manifest = Self::default();
        for (i, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with("Hash") {
                continue;
            }
            manifest.insert(parse_line(i + 1, line)?);
        }
        Ok(manifest)
    }

    /// Add an entry.  The first entry for a key wins.
    pub fn insert(&mut self, entry: ManifestEntry) {
        let key = entry.key();
        if let Some(&existing) = self.by_key.get(&key) {
            tracing::warn!(
                "duplicate manifest key {}: keeping '{}', ignoring '{}'",
                key, self.entries[existing].name, entry.name
            );
            return;
        }
        self.by_key.insert(key, self.entries.len());
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ManifestIndex for Manifest {
    fn lookup(&self, key: EntryKey) -> Option<&ManifestEntry> {
        self.by_key.get(&key).map(|&i| &self.entries[i])
    }
}

fn parse_line(line_no: usize, line: &str) -> Result<ManifestEntry, ManifestError> {
    let malformed = |reason: String| ManifestError::MalformedLine { line: line_no, reason };

    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 5 {
        return Err(malformed(format!("expected 5 fields, found {}", fields.len())));
    }
    let number = |field: &str, what: &str| {
        field
            .parse::<u32>()
            .map_err(|e| malformed(format!("bad {what} '{field}': {e}")))
    };

    Ok(ManifestEntry {
        hash32:   fields[0].to_lowercase(),
        hash64:   fields[1].to_lowercase(),
        store_id: number(fields[2], "blob id")?,
        index:    number(fields[3], "blob index")?,
        name:     fields[4].to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Hash 32     Hash 64             Blob ID  Blob idx  Name
0xa2e0939b  0x4288cfb749e4c631  000      0000      Xamarin.AndroidX.Activity
0x1f2d9cd4  0x0ff7ff2ab1a4f1d7  000      0001      Mono.Android

0x0a2e2b1c  0x93b7d6a9a3e6c8f1  001      0000      System.Private.CoreLib
";

    #[test]
    fn parses_entries_and_skips_header() {
        let m = Manifest::parse(SAMPLE).unwrap();
        assert_eq!(m.len(), 3);
        let e = m.lookup(EntryKey::new(0, 1)).unwrap();
        assert_eq!(e.name, "Mono.Android");
        assert_eq!(e.hash32, "0x1f2d9cd4");
        assert_eq!(e.hash64, "0x0ff7ff2ab1a4f1d7");
    }

    #[test]
    fn lookup_needs_both_fields() {
        let m = Manifest::parse(SAMPLE).unwrap();
        assert_eq!(m.lookup(EntryKey::new(1, 0)).unwrap().name, "System.Private.CoreLib");
        assert_eq!(m.lookup(EntryKey::new(0, 0)).unwrap().name, "Xamarin.AndroidX.Activity");
        assert!(m.lookup(EntryKey::new(1, 1)).is_none());
        assert!(m.lookup(EntryKey::new(2, 0)).is_none());
    }

    #[test]
    fn first_duplicate_wins() {
        let m = Manifest::parse("0x1 0x2 0 0 First\n0x3 0x4 0 0 Second\n").unwrap();
        assert_eq!(m.len(), 1);
        assert_eq!(m.lookup(EntryKey::new(0, 0)).unwrap().name, "First");
    }

    #[test]
    fn short_line_is_malformed() {
        let err = Manifest::parse("0x1 0x2 0 Name\n").unwrap_err();
        assert!(matches!(err, ManifestError::MalformedLine { line: 1, .. }));
    }

    #[test]
    fn non_numeric_index_is_malformed() {
        let err = Manifest::parse("\n0x1 0x2 0 zz Name\n").unwrap_err();
        match err {
            ManifestError::MalformedLine { line, reason } => {
                assert_eq!(line, 2);
                assert!(reason.contains("blob index"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn hashmap_is_an_index() {
        let mut map = HashMap::new();
        let entry = ManifestEntry {
            hash32:   "0x1".into(),
            hash64:   "0x2".into(),
            store_id: 7,
            index:    1,
            name:     "A".into(),
        };
        map.insert(entry.key(), entry);
        assert!(map.lookup(EntryKey::new(7, 1)).is_some());
        assert!(map.lookup(EntryKey::new(7, 0)).is_none());
    }
}
