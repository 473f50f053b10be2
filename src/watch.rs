//! File system watcher for rebuild on change.
//!
//! Watches the content directory and the config file. Every batch of changes
//! triggers a full rebuild without the deferred footnote pass, so header
//! callouts keep the placeholder number until the next `footref build`.
//!
//! ```text
//! notify events ──► Debouncer ──► handle_changes()
//!                   (debounce_ms)     ├── config changed: reload, rebuild
//!                                     └── content changed: rebuild
//! ```

use crate::{build::build_site, config::SiteConfig, footnote::PLACEHOLDER, log};
use anyhow::{Context, Result};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use rustc_hash::FxHashSet;
use std::{
    path::{Path, PathBuf},
    sync::mpsc::RecvTimeoutError,
    time::{Duration, Instant},
};

/// Poll interval while nothing is pending.
const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

/// What a changed path means for the site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Change {
    Config,
    Content,
    Ignored,
}

fn classify(path: &Path, config: &SiteConfig) -> Change {
    if path == config.config_path {
        return Change::Config;
    }
    let is_entry = path.starts_with(&config.build.content)
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| config.build.extensions.iter().any(|e| e == ext));
    if is_entry {
        Change::Content
    } else {
        Change::Ignored
    }
}

/// `/proj/content/articles/a.md` → `content/articles/a.md`
fn rel_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

/// Batches rapid file events.
struct Debouncer {
    delay: Duration,
    pending: FxHashSet<PathBuf>,
    last_event: Option<Instant>,
}

impl Debouncer {
    fn new(delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            pending: FxHashSet::default(),
            last_event: None,
        }
    }

    fn add(&mut self, event: Event) {
        for path in event.paths {
            if !is_temp_file(&path) {
                self.pending.insert(path);
            }
        }
        self.last_event = Some(Instant::now());
    }

    fn ready(&self) -> bool {
        !self.pending.is_empty() && self.last_event.is_some_and(|t| t.elapsed() >= self.delay)
    }

    fn take(&mut self) -> Vec<PathBuf> {
        self.last_event = None;
        let mut paths: Vec<_> = self.pending.drain().collect();
        paths.sort();
        paths
    }

    fn timeout(&self) -> Duration {
        if self.pending.is_empty() {
            IDLE_TIMEOUT
        } else {
            self.delay
        }
    }
}

const fn is_relevant(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
    )
}

/// Reload the config file with the same CLI overrides.
fn reload_config(config: &SiteConfig) -> Result<SiteConfig> {
    let mut reloaded = SiteConfig::from_path(&config.config_path)?;
    if let Some(cli) = config.cli {
        reloaded.update_with_cli(cli);
    }
    reloaded.validate()?;
    Ok(reloaded)
}

fn rebuild(config: &SiteConfig) {
    match build_site(config, false) {
        Ok(summary) => {
            let deferred: usize = summary.pages.iter().map(|p| p.deferred.len()).sum();
            if deferred > 0 {
                log!("watch"; "{deferred} deferred footnotes show {PLACEHOLDER} until `footref build`");
            }
        }
        Err(e) => log!("error"; "build failed: {:#}", e),
    }
}

/// Rebuild for a batch of changed paths. Replaces `config` when it was reloaded.
fn handle_changes(paths: &[PathBuf], config: &mut SiteConfig) {
    let root = config.get_root().to_owned();
    let mut config_changed = false;
    let mut content_changed = Vec::new();

    for path in paths {
        match classify(path, config) {
            Change::Config => config_changed = true,
            Change::Content => content_changed.push(rel_path(path, &root)),
            Change::Ignored => {}
        }
    }

    if config_changed {
        match reload_config(config) {
            Ok(reloaded) => {
                log!("watch"; "config changed, rebuilding...");
                *config = reloaded;
            }
            Err(e) => {
                log!("error"; "config reload failed, keeping previous config: {:#}", e);
                return;
            }
        }
    } else if content_changed.is_empty() {
        return;
    } else {
        log!("watch"; "{} changed, rebuilding...", content_changed.join(", "));
    }

    rebuild(config);
}

fn setup_watchers(watcher: &mut impl Watcher, config: &SiteConfig) -> Result<()> {
    let root = config.get_root();

    watcher
        .watch(&config.build.content, RecursiveMode::Recursive)
        .with_context(|| format!("Failed to watch content: {}", config.build.content.display()))?;

    if config.config_path.exists() {
        watcher
            .watch(&config.config_path, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch config: {}", config.config_path.display()))?;
    }

    log!("watch"; "watching {}/, {}",
         rel_path(&config.build.content, root), rel_path(&config.config_path, root));
    Ok(())
}

/// Build once, then rebuild on every debounced batch of changes until the
/// watcher channel closes.
pub fn watch_for_changes_blocking(config: &SiteConfig) -> Result<()> {
    let mut config = config.clone();

    rebuild(&config);

    let (tx, rx) = std::sync::mpsc::channel();
    let mut watcher = notify::recommended_watcher(tx).context("Failed to create file watcher")?;
    setup_watchers(&mut watcher, &config)?;

    let mut debouncer = Debouncer::new(config.watch.debounce_ms);

    loop {
        match rx.recv_timeout(debouncer.timeout()) {
            Ok(Ok(event)) if is_relevant(&event) => debouncer.add(event),
            Ok(Err(e)) => log!("watch"; "error: {e}"),
            Err(RecvTimeoutError::Timeout) if debouncer.ready() => {
                handle_changes(&debouncer.take(), &mut config);
            }
            Err(RecvTimeoutError::Disconnected) => break,
            _ => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind};

    fn config() -> SiteConfig {
        let mut config = SiteConfig::default();
        config.config_path = PathBuf::from("/site/footref.toml");
        config.build.content = PathBuf::from("/site/content");
        config
    }

    #[test]
    fn test_is_temp_file() {
        assert!(is_temp_file(Path::new("/a/post.md.swp")));
        assert!(is_temp_file(Path::new("/a/post.md~")));
        assert!(is_temp_file(Path::new("/a/.post.md")));
        assert!(!is_temp_file(Path::new("/a/post.md")));
    }

    #[test]
    fn test_classify() {
        let config = config();
        assert_eq!(classify(Path::new("/site/footref.toml"), &config), Change::Config);
        assert_eq!(
            classify(Path::new("/site/content/articles/a.md"), &config),
            Change::Content
        );
        assert_eq!(
            classify(Path::new("/site/content/articles/a.mdx"), &config),
            Change::Content
        );
        assert_eq!(
            classify(Path::new("/site/content/articles/a.png"), &config),
            Change::Ignored
        );
        assert_eq!(classify(Path::new("/site/public/index.html"), &config), Change::Ignored);
    }

    #[test]
    fn test_debouncer_batches_events() {
        let mut debouncer = Debouncer::new(0);
        assert!(!debouncer.ready());
        assert_eq!(debouncer.timeout(), IDLE_TIMEOUT);

        let a = PathBuf::from("/site/content/a.md");
        debouncer.add(Event::new(EventKind::Create(CreateKind::File)).add_path(a.clone()));
        debouncer.add(Event::new(EventKind::Modify(ModifyKind::Any)).add_path(a.clone()));
        debouncer.add(
            Event::new(EventKind::Modify(ModifyKind::Any))
                .add_path(PathBuf::from("/site/content/a.md.swp")),
        );

        assert!(debouncer.ready());
        assert_eq!(debouncer.take(), vec![a]);
        assert!(!debouncer.ready());
    }

    #[test]
    fn test_debouncer_waits_for_quiet_period() {
        let mut debouncer = Debouncer::new(60_000);
        debouncer.add(
            Event::new(EventKind::Create(CreateKind::File))
                .add_path(PathBuf::from("/site/content/a.md")),
        );
        assert!(!debouncer.ready());
        assert_eq!(debouncer.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_is_relevant() {
        assert!(is_relevant(&Event::new(EventKind::Create(CreateKind::File))));
        assert!(!is_relevant(&Event::new(EventKind::Any)));
    }
}
