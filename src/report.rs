//! Run summary written as `assemblies.json`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::header::StoreHeader;

#[derive(Debug, Clone, Serialize)]
pub struct HeaderSummary {
    pub version:  u32,
    pub lec:      u32,
    pub gec:      u32,
    pub store_id: u32,
}

impl From<&StoreHeader> for HeaderSummary {
    fn from(h: &StoreHeader) -> Self {
        HeaderSummary {
            version:  h.version,
            lec:      h.local_count,
            gec:      h.global_count,
            store_id: h.store_id,
        }
    }
}

/// One store of the run.  `header` is absent when the store could not be
/// parsed, in which case `error` says why.
#[derive(Debug, Clone, Serialize)]
pub struct StoreSummary {
    pub file:   String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<HeaderSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error:  Option<String>,
}

impl StoreSummary {
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// One processed directory slot.  Exactly one of `file` / `error` is set.
#[derive(Debug, Clone, Serialize)]
pub struct AssemblyEntry {
    pub name:     String,
    pub store_id: u32,
    pub blob_idx: u32,
    pub hash32:   String,
    pub hash64:   String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_hash32: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_hash64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file:     Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size:     Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compressed: Option<bool>,
    /// BLAKE3 of the written image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blake3:   Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error:    Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl AssemblyEntry {
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Aggregate over every store processed in one run, in processing order.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub generated_at: DateTime<Utc>,
    pub stores:       Vec<StoreSummary>,
    pub assemblies:   Vec<AssemblyEntry>,
}

impl Default for RunReport {
    fn default() -> Self {
        Self {
            generated_at: Utc::now(),
            stores:       Vec::new(),
            assemblies:   Vec::new(),
        }
    }
}

impl RunReport {
    pub fn push_store(&mut self, store: StoreReport) {
        self.stores.push(store.summary);
        self.assemblies.extend(store.assemblies);
    }

    /// Record a store that was rejected before any payload was read.
    pub fn push_failed_store(&mut self, file: impl Into<String>, error: impl ToString) {
        self.stores.push(StoreSummary {
            file:   file.into(),
            header: None,
            error:  Some(error.to_string()),
        });
    }

    pub fn failures(&self) -> impl Iterator<Item = &AssemblyEntry> {
        self.assemblies.iter().filter(|a| a.is_failed())
    }

    pub fn failed_stores(&self) -> impl Iterator<Item = &StoreSummary> {
        self.stores.iter().filter(|s| s.is_failed())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }

    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        fs::write(path, self.to_bytes()?)?;
        Ok(())
    }
}

/// Result of extracting a single store.
#[derive(Debug, Clone, Serialize)]
pub struct StoreReport {
    pub summary:    StoreSummary,
    pub assemblies: Vec<AssemblyEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, error: Option<&str>) -> AssemblyEntry {
        AssemblyEntry {
            name:         name.into(),
            store_id:     0,
            blob_idx:     0,
            hash32:       "0x00000000".into(),
            hash64:       "0x0000000000000000".into(),
            store_hash32: None,
            store_hash64: None,
            file:         error.is_none().then(|| format!("out/{name}.dll")),
            size:         None,
            compressed:   None,
            blake3:       None,
            error:        error.map(str::to_owned),
            warnings:     Vec::new(),
        }
    }

    #[test]
    fn report_json_shape() {
        let mut report = RunReport::default();
        report.push_store(StoreReport {
            summary: StoreSummary {
                file:   "assemblies.blob".into(),
                header: Some(HeaderSummary::from(&StoreHeader::new(2, 2, 0))),
                error:  None,
            },
            assemblies: vec![entry("A", None), entry("B", Some("out of bounds"))],
        });

        let json: serde_json::Value = serde_json::from_slice(&report.to_bytes().unwrap()).unwrap();
        assert_eq!(json["stores"][0]["header"]["lec"], 2);
        assert_eq!(json["assemblies"][0]["file"], "out/A.dll");
        assert!(json["assemblies"][0].get("error").is_none());
        assert_eq!(json["assemblies"][1]["error"], "out of bounds");
        assert!(json["assemblies"][1].get("warnings").is_none());
        assert_eq!(report.failures().count(), 1);
        assert!(json["stores"][0].get("error").is_none());
    }

    #[test]
    fn failed_store_has_error_and_no_header() {
        let mut report = RunReport::default();
        report.push_failed_store("assemblies.arm64.blob", "unsupported format version 9");

        let json: serde_json::Value = serde_json::from_slice(&report.to_bytes().unwrap()).unwrap();
        assert_eq!(json["stores"][0]["file"], "assemblies.arm64.blob");
        assert_eq!(json["stores"][0]["error"], "unsupported format version 9");
        assert!(json["stores"][0].get("header").is_none());
        assert_eq!(report.failed_stores().count(), 1);
        assert_eq!(report.failures().count(), 0);
    }
}
