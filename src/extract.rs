//! Extraction driver.
//!
//! Walks a store's directory in order.  For every slot the manifest knows a
//! name for, the payload is located, inflated when tagged, and written to
//! `<output_dir>/<name>.<extension>`.  Slots without a manifest entry and
//! slots with an empty payload are skipped and leave no trace in the report.
//! Any other per-payload problem is recorded on the report entry and the
//! walk continues; only I/O failures while writing stop the run.
//!
//! With the `parallel` feature payloads are decoded on the Rayon pool.
//! Results are collected back in directory order and written sequentially.

use std::ffi::OsString;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::arch::{discover_stores, Arch, MANIFEST_FILE, REPORT_FILE};
use crate::codec::Encoding;
use crate::error::Error;
use crate::manifest::{Manifest, ManifestEntry, ManifestIndex};
use crate::record::{PayloadRecord, Span};
use crate::report::{AssemblyEntry, HeaderSummary, RunReport, StoreReport, StoreSummary};
use crate::store::{ExtractionError, Payload, Store};

// ── ExtractOptions ───────────────────────────────────────────────────────────

/// Configuration for [`Extractor`].
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub output_dir:     PathBuf,
    /// Appended to the manifest name, without the dot.
    pub extension:      String,
    /// Also write the debug-data section as `<name>.pdb`.
    pub include_debug:  bool,
    /// Also write the config-data section as `<name>.<extension>.config`.
    pub include_config: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            output_dir:     PathBuf::from("."),
            extension:      "dll".to_owned(),
            include_debug:  false,
            include_config: false,
        }
    }
}

// ── Extractor ────────────────────────────────────────────────────────────────

struct Job<'m> {
    index:  u32,
    record: PayloadRecord,
    entry:  &'m ManifestEntry,
}

pub struct Extractor<'m, M: ManifestIndex + ?Sized> {
    manifest: &'m M,
    options:  ExtractOptions,
}

impl<'m, M: ManifestIndex + ?Sized> Extractor<'m, M> {
    pub fn new(manifest: &'m M, options: ExtractOptions) -> Self {
        Self { manifest, options }
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Extract every named payload of `store`.  `file_name` only labels the
    /// store in the report.
    pub fn extract_store(&self, file_name: &str, store: &Store) -> crate::Result<StoreReport> {
        let jobs: Vec<Job<'m>> = store
            .directory
            .iter()
            .enumerate()
            .filter_map(|(i, record)| {
                let key = store.key(i as u32);
                match self.manifest.lookup(key) {
                    Some(entry) => Some(Job { index: key.index, record: *record, entry }),
                    None => {
                        tracing::debug!("{file_name}: no manifest entry for {key}, skipping");
                        None
                    }
                }
            })
            .collect();

        #[cfg(feature = "parallel")]
        let decoded = {
            use rayon::prelude::*;
            jobs.par_iter()
                .map(|job| store.read_section(job.record.data))
                .collect::<Vec<_>>()
                .into_iter()
        };
        #[cfg(not(feature = "parallel"))]
        let decoded = jobs.iter().map(|job| store.read_section(job.record.data));

        let mut assemblies = Vec::with_capacity(jobs.len());
        for (job, result) in jobs.iter().zip(decoded) {
            if let Some(entry) = self.process(file_name, store, job, result)? {
                assemblies.push(entry);
            }
        }

        let failed = assemblies.iter().filter(|a| a.is_failed()).count();
        tracing::info!(
            "{file_name}: store {} extracted {} of {} assemblies ({failed} failed)",
            store.store_id(),
            assemblies.len() - failed,
            store.directory.len(),
        );

        Ok(StoreReport {
            summary: StoreSummary {
                file:   file_name.to_owned(),
                header: Some(HeaderSummary::from(&store.header)),
                error:  None,
            },
            assemblies,
        })
    }

    fn process(
        &self,
        file_name: &str,
        store:     &Store,
        job:       &Job<'_>,
        decoded:   Result<Payload<'_>, ExtractionError>,
    ) -> crate::Result<Option<AssemblyEntry>> {
        let entry = job.entry;
        let key = store.key(job.index);
        let (h32, h64) = store.hash_entries(key);
        let store_hash32 = h32.map(|h| h.hash_hex());
        let store_hash64 = h64.map(|h| h.hash_hex());
        let digests = [
            ("hash32", &store_hash32, &entry.hash32),
            ("hash64", &store_hash64, &entry.hash64),
        ];
        for (table, ours, theirs) in digests {
            if let Some(ours) = ours {
                if !ours.eq_ignore_ascii_case(theirs) {
                    tracing::debug!("{file_name}: {key} {table} differs: store {ours}, manifest {theirs}");
                }
            }
        }

        let mut out = AssemblyEntry {
            name:         entry.name.clone(),
            store_id:     entry.store_id,
            blob_idx:     entry.index,
            hash32:       entry.hash32.clone(),
            hash64:       entry.hash64.clone(),
            store_hash32,
            store_hash64,
            file:         None,
            size:         None,
            compressed:   None,
            blake3:       None,
            error:        None,
            warnings:     Vec::new(),
        };

        let payload = match decoded {
            Ok(payload) => payload,
            Err(ExtractionError::EmptyPayload) => {
                tracing::debug!("{file_name}: {key} '{}' has an empty payload, skipping", entry.name);
                return Ok(None);
            }
            Err(e) => {
                tracing::warn!("{file_name}: {key} '{}': {e}", entry.name);
                out.error = Some(e.to_string());
                return Ok(Some(out));
            }
        };

        let Some(base) = output_base(&self.options.output_dir, &entry.name) else {
            tracing::warn!("{file_name}: {key} name '{}' has no usable path", entry.name);
            out.error = Some(format!("unusable output name '{}'", entry.name));
            return Ok(Some(out));
        };

        let image = with_suffix(&base, &format!(".{}", self.options.extension));
        write_file(&image, &payload.bytes)?;
        tracing::debug!(
            "{file_name}: {key} -> {} ({} bytes, {})",
            image.display(),
            payload.bytes.len(),
            payload.encoding.name()
        );

        out.file       = Some(image.display().to_string());
        out.size       = Some(payload.bytes.len() as u64);
        out.compressed = Some(payload.encoding != Encoding::Raw);
        out.blake3     = Some(hex::encode(blake3::hash(&payload.bytes).as_bytes()));

        if self.options.include_debug {
            let path = with_suffix(&base, ".pdb");
            self.write_section(store, job.record.debug, &path, "debug", &mut out)?;
        }
        if self.options.include_config {
            let path = with_suffix(&image, ".config");
            self.write_section(store, job.record.config, &path, "config", &mut out)?;
        }

        Ok(Some(out))
    }

    /// Write an auxiliary section.  Absent sections are ignored and broken
    /// ones become warnings on the entry.
    fn write_section(
        &self,
        store: &Store,
        span:  Span,
        path:  &Path,
        what:  &str,
        out:   &mut AssemblyEntry,
    ) -> crate::Result<()> {
        match store.read_section(span) {
            Ok(section) => write_file(path, &section.bytes)?,
            Err(ExtractionError::EmptyPayload) => {}
            Err(e) => {
                tracing::warn!("'{}' {what} section: {e}", out.name);
                out.warnings.push(format!("{what}: {e}"));
            }
        }
        Ok(())
    }
}

// ── Bundle ───────────────────────────────────────────────────────────────────

/// Extract every store found in an unpacked bundle directory.
///
/// Reads `assemblies.manifest` from `input_dir`, processes the generic store
/// and the per-ABI stores selected by `arches`, and writes
/// `assemblies.json` into the output directory.
///
/// A store that fails to parse is recorded in the report with its error and
/// the remaining stores are still processed.  Manifest and I/O errors stop
/// the run.
pub fn unpack_bundle(input_dir: &Path, arches: &[Arch], options: ExtractOptions) -> crate::Result<RunReport> {
    let manifest = Manifest::open(input_dir.join(MANIFEST_FILE))?;
    tracing::info!("manifest: {} entries", manifest.len());

    let stores = discover_stores(input_dir, arches);
    if stores.is_empty() {
        tracing::warn!("no assembly stores found in {}", input_dir.display());
    }

    let extractor = Extractor::new(&manifest, options);
    let mut report = RunReport::default();
    for (arch, path) in stores {
        tracing::info!("reading {} store {}", arch.name(), path.display());
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| arch.store_file().to_owned());
        let store = match Store::open(&path) {
            Ok(store) => store,
            Err(Error::Format(e)) => {
                tracing::warn!("{file_name}: {e}, skipping store");
                report.push_failed_store(file_name, e);
                continue;
            }
            Err(e) => return Err(e),
        };
        report.push_store(extractor.extract_store(&file_name, &store)?);
    }

    fs::create_dir_all(&extractor.options().output_dir)?;
    report.write_to(extractor.options().output_dir.join(REPORT_FILE))?;
    Ok(report)
}

// ── helpers ──────────────────────────────────────────────────────────────────

/// `output_dir` joined with the normal components of `name`.  Root, prefix
/// and parent components are dropped so the result stays under `output_dir`.
pub fn output_base(output_dir: &Path, name: &str) -> Option<PathBuf> {
    let mut rel = PathBuf::new();
    for component in Path::new(name).components() {
        if let Component::Normal(part) = component {
            rel.push(part);
        }
    }
    if rel.as_os_str().is_empty() {
        return None;
    }
    Some(output_dir.join(rel))
}

// Appends rather than replacing, since names like `System.Runtime` contain dots.
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s: OsString = path.as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}

fn write_file(path: &Path, data: &[u8]) -> crate::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_base_stays_under_dir() {
        let dir = Path::new("out");
        assert_eq!(output_base(dir, "System.Runtime"), Some(PathBuf::from("out/System.Runtime")));
        assert_eq!(output_base(dir, "en/Foo.resources"), Some(PathBuf::from("out/en/Foo.resources")));
        assert_eq!(output_base(dir, "../../etc/passwd"), Some(PathBuf::from("out/etc/passwd")));
        assert_eq!(output_base(dir, "/abs/Name"), Some(PathBuf::from("out/abs/Name")));
        assert_eq!(output_base(dir, ".."), None);
    }

    #[test]
    fn suffix_is_appended() {
        assert_eq!(
            with_suffix(Path::new("out/System.Runtime"), ".dll"),
            PathBuf::from("out/System.Runtime.dll")
        );
    }
}
