//! Site building orchestration.
//!
//! # Architecture
//!
//! ```text
//! build_site()
//!     │
//!     ├── prepare_output()       clean / create output dir
//!     ├── ContentStore::load()   every collection under content/
//!     │
//!     ├── build_page() per page (parallel, one registry each)
//!     │       register deferred → pre-register bodies → validate → render
//!     │       └── write <output>/<path>/index.html
//!     │
//!     ├── write_report()         footnotes.json
//!     │
//!     └── resolve_site()         fill deferred anchors (optional)
//! ```

use crate::{
    config::{PageConfig, SiteConfig},
    content::ContentStore,
    footnote::{FootnoteEntry, FootnoteManager},
    log,
    logger::ProgressBars,
    render::{HtmlRenderer, Section, page_html},
    resolve::{ResolveSummary, collect_units, resolve_units},
};
use anyhow::{Context, Result, anyhow};
use rayon::prelude::*;
use serde::Serialize;
use std::{
    fs,
    path::Path,
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};

/// Numbering of one built page, as written to the report.
#[derive(Debug, Clone, Serialize)]
pub struct PageReport {
    pub path: String,
    /// Every numbered footnote in assignment order.
    pub footnotes: Vec<FootnoteEntry>,
    /// Deferred footnotes and the number each one received.
    pub deferred: Vec<FootnoteEntry>,
}

#[derive(Debug, Serialize)]
struct SiteReport<'a> {
    pages: &'a [PageReport],
}

/// Outcome of a build.
#[derive(Debug, Default)]
pub struct BuildSummary {
    pub pages: Vec<PageReport>,
}

/// Build every configured page, then optionally resolve deferred anchors.
///
/// A page whose footnotes fail validation is not written. The first page
/// error is returned with its full context.
pub fn build_site(config: &SiteConfig, resolve: bool) -> Result<BuildSummary> {
    let output = &config.build.output;
    prepare_output(output, config.build.clean)?;

    let store = ContentStore::load(&config.build.content, &config.build.extensions)?;
    if store.is_empty() {
        log!("warn"; "no entries found in {}", config.build.content.display());
    } else {
        log!("build"; "{} entries in {} collections", store.len(), store.collection_names().count());
    }

    if config.pages.is_empty() {
        log!("warn"; "no [[pages]] configured, nothing to build");
    }

    let progress = ProgressBars::new_filtered(&[("pages", config.pages.len())]);
    let has_error = AtomicBool::new(false);
    let first_error: Mutex<Option<anyhow::Error>> = Mutex::new(None);

    let pages: Result<Vec<PageReport>> = config
        .pages
        .par_iter()
        .map(|page| {
            if has_error.load(Ordering::Relaxed) {
                return Err(anyhow!("Aborted"));
            }
            let report = build_page(config, &store, page).map_err(|e| {
                if !has_error.swap(true, Ordering::Relaxed) {
                    log!("error"; "{:#}", e);
                    *first_error.lock().unwrap_or_else(PoisonError::into_inner) = Some(e);
                }
                anyhow!("Build failed")
            })?;
            if let Some(progress) = &progress {
                progress.inc(0);
            }
            Ok(report)
        })
        .collect();

    drop(progress);

    let first_error = first_error.into_inner().unwrap_or_else(PoisonError::into_inner);
    let pages = pages.map_err(|e| first_error.unwrap_or(e))?;

    for page in pages.iter().filter(|page| !page.deferred.is_empty()) {
        let numbers: Vec<_> = page
            .deferred
            .iter()
            .map(|entry| format!("{} → {}", entry.id, entry.number))
            .collect();
        log!("build"; "{}: deferred {}", page.path, numbers.join(", "));
    }

    write_report(&config.report_path(), &pages)?;

    if resolve {
        resolve_site(config)?;
    }

    log!("build"; "done, {} pages", pages.len());
    Ok(BuildSummary { pages })
}

/// Run the deferred anchor pass over the whole output directory.
pub fn resolve_site(config: &SiteConfig) -> Result<ResolveSummary> {
    let output = &config.build.output;
    let units = collect_units(output);

    let progress = ProgressBars::new_filtered(&[("resolve", units.len())]);
    let summary = resolve_units(output, &units, config.build.footnotes.warn_unmatched, || {
        if let Some(progress) = &progress {
            progress.inc(0);
        }
    });
    drop(progress);

    let summary = summary?;
    log!("resolve"; "{} files scanned, {} updated, {} anchors filled",
         summary.scanned, summary.updated, summary.anchors);
    Ok(summary)
}

/// Number, render and write a single page.
fn build_page(config: &SiteConfig, store: &ContentStore, page: &PageConfig) -> Result<PageReport> {
    let name = page.display_name();
    let content = store
        .page_content(page)
        .with_context(|| format!("page `{name}`: failed to collect content"))?;

    let footnotes = FootnoteManager::create_for_page(&page.deferred, &content, &HtmlRenderer)
        .with_context(|| format!("page `{name}`: failed to number footnotes"))?;

    let sources: Vec<String> = footnotes.rendered.iter().map(|r| r.entry.source()).collect();
    let sections: Vec<Section<'_>> = footnotes
        .rendered
        .iter()
        .zip(&sources)
        .map(|(rendered, source)| Section {
            source,
            title: rendered.entry.meta.title.as_deref(),
            html: &rendered.html,
        })
        .collect();

    let html = page_html(
        config.page_title(page),
        &config.base.language,
        &page.deferred,
        &sections,
    );

    let path = page.output_path(&config.build.output);
    write_page(&path, &html)?;

    Ok(PageReport {
        path: name.to_owned(),
        footnotes: footnotes.registry.all_footnotes(),
        deferred: footnotes.registry.deferred_mappings(),
    })
}

/// Create the output directory, removing it first when `clean` is set.
fn prepare_output(output: &Path, clean: bool) -> Result<()> {
    if clean && output.exists() {
        fs::remove_dir_all(output).with_context(|| {
            format!("Failed to clear output directory: {}", output.display())
        })?;
    }
    fs::create_dir_all(output)
        .with_context(|| format!("Failed to create output directory: {}", output.display()))
}

fn write_page(path: &Path, html: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, html).with_context(|| format!("Failed to write {}", path.display()))
}

fn write_report(path: &Path, pages: &[PageReport]) -> Result<()> {
    let json = serde_json::to_string_pretty(&SiteReport { pages })?;
    write_page(path, &json)
}
