//! Post-build resolution of deferred footnote numbers.
//!
//! Deferred anchors are written while their number is still unknown and carry
//! the placeholder `0`. Once every page is on disk, this pass walks the output
//! directory and copies the number of each page's normal anchor into the
//! deferred anchor with the same id.
//!
//! ```text
//! collect_units() ──► rewrite_html() per unit (parallel) ──► atomic write
//!                           │
//!                           └── no deferred anchors / nothing changed: skip
//! ```
//!
//! Units are independent; identifiers never leak between pages.

mod rewrite;

pub use rewrite::{Rewrite, rewrite_html};

use crate::log;
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::{
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
};
use walkdir::WalkDir;

/// Extension of the output units visited by the pass.
pub const OUTPUT_EXTENSION: &str = "html";

/// Counts reported after a resolve pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResolveSummary {
    pub scanned: usize,
    pub updated: usize,
    pub anchors: usize,
}

/// Collect every output unit under `dir` recursively.
pub fn collect_units(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension() == Some(OsStr::new(OUTPUT_EXTENSION)))
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// Rewrite one unit in place. Returns the rewrite outcome.
///
/// The file is either replaced as a whole or not touched at all.
pub fn resolve_unit(path: &Path) -> Result<Rewrite> {
    let content = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let rewrite =
        rewrite_html(&content).with_context(|| format!("Failed to parse {}", path.display()))?;

    if let Some(new_content) = &rewrite.content {
        write_atomic(path, new_content)?;
    }
    Ok(rewrite)
}

/// Write to a sibling temp file, then rename over the target.
fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".footref-tmp");
    let tmp = path.with_file_name(tmp_name);

    fs::write(&tmp, content).with_context(|| format!("Failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).map_err(|err| {
        fs::remove_file(&tmp).ok();
        anyhow::Error::new(err).context(format!("Failed to replace {}", path.display()))
    })
}

/// Resolve the given units, named relative to `root` in logs.
///
/// A failing unit is logged and does not stop the others. The pass then
/// returns the first failure, with the number of failed units as context.
pub fn resolve_units(
    root: &Path,
    units: &[PathBuf],
    warn_unmatched: bool,
    on_progress: impl Fn() + Sync,
) -> Result<ResolveSummary> {
    let updated = AtomicUsize::new(0);
    let anchors = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let first_error: Mutex<Option<anyhow::Error>> = Mutex::new(None);

    units.par_iter().for_each(|path| {
        match resolve_unit(path) {
            Ok(rewrite) => {
                if rewrite.is_changed() {
                    updated.fetch_add(1, Ordering::Relaxed);
                    anchors.fetch_add(rewrite.resolved.len(), Ordering::Relaxed);
                }
                if warn_unmatched && !rewrite.unmatched.is_empty() {
                    log!("warn"; "{}: unresolved deferred footnotes: {}",
                         rel_path(path, root), rewrite.unmatched.join(", "));
                }
            }
            Err(e) => {
                failed.fetch_add(1, Ordering::Relaxed);
                log!("error"; "{:#}", e);
                let mut first = first_error.lock().unwrap_or_else(PoisonError::into_inner);
                if first.is_none() {
                    *first = Some(e);
                }
            }
        }
        on_progress();
    });

    let first_error = first_error.into_inner().unwrap_or_else(PoisonError::into_inner);
    if let Some(e) = first_error {
        let failed = failed.into_inner();
        return Err(e.context(format!(
            "{failed} of {} output files could not be resolved",
            units.len()
        )));
    }

    Ok(ResolveSummary {
        scanned: units.len(),
        updated: updated.into_inner(),
        anchors: anchors.into_inner(),
    })
}

/// `/proj/public/a/index.html` → `a/index.html`
fn rel_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}
