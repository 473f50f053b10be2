//! Terminal output: prefixed log lines and in-place progress bars.
//!
//! ```ignore
//! log!("build"; "{} pages", pages.len());
//!
//! let progress = ProgressBars::new(&[("pages", 12), ("resolve", 12)]);
//! progress.inc(0);
//! progress.finish();
//! ```
//!
//! Log lines printed while bars are active are inserted above the bar area,
//! which is then redrawn below them.

use colored::{ColoredString, Colorize};
use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType, size},
};
use std::{
    io::{StdoutLock, Write, stdout},
    sync::{
        Mutex, OnceLock,
        atomic::{AtomicUsize, Ordering},
    },
};

/// Cached terminal width
static TERMINAL_WIDTH: OnceLock<u16> = OnceLock::new();

/// Rows currently reserved by progress bars
static BAR_ROWS: AtomicUsize = AtomicUsize::new(0);

// Bar line: "[module] [████░░░░] 42/100"

/// `[` and `]` around the module name plus the following space
const PREFIX_OVERHEAD: usize = 3;
/// " [" and "]" around the bar plus the space before the count
const BAR_OVERHEAD: usize = 4;
const MIN_BAR_WIDTH: usize = 10;
const MAX_BAR_WIDTH: usize = 40;
const FALLBACK_WIDTH: u16 = 120;

fn terminal_width() -> usize {
    *TERMINAL_WIDTH.get_or_init(|| size().map(|(w, _)| w).unwrap_or(FALLBACK_WIDTH)) as usize
}

/// Log a message with a colored module prefix.
///
/// ```ignore
/// log!("resolve"; "{} anchors updated", count);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Print one prefixed line, truncated to the terminal width.
///
/// `error` and `warn` lines and multi-line messages are printed as is.
pub fn log(module: &str, message: &str) {
    let prefix = colorize_prefix(module);
    let message = fit_message(message, module, terminal_width());

    let mut stdout = stdout().lock();
    let rows = BAR_ROWS.load(Ordering::SeqCst);
    if rows > 0 {
        move_up(&mut stdout, rows);
        execute!(stdout, Clear(ClearType::FromCursorDown)).ok();
    } else {
        execute!(stdout, Clear(ClearType::UntilNewLine)).ok();
    }

    writeln!(stdout, "{prefix} {message}").ok();

    // Keep the bar area below the new line
    for _ in 0..rows {
        writeln!(stdout).ok();
    }
    stdout.flush().ok();
}

fn colorize_prefix(module: &str) -> ColoredString {
    let prefix = format!("[{module}]");
    match module.to_ascii_lowercase().as_str() {
        "build" => prefix.bright_blue().bold(),
        "resolve" => prefix.bright_cyan().bold(),
        "watch" => prefix.bright_green().bold(),
        "warn" => prefix.yellow().bold(),
        "error" => prefix.bright_red().bold(),
        _ => prefix.bright_magenta().bold(),
    }
}

/// Cut a single-line message so prefix and message fit in `width` columns.
fn fit_message<'a>(message: &'a str, module: &str, width: usize) -> &'a str {
    let keep_whole = message.contains('\n')
        || matches!(module.to_ascii_lowercase().as_str(), "error" | "warn");
    if keep_whole {
        return message;
    }
    let max_len = width.saturating_sub(module.len() + PREFIX_OVERHEAD);
    truncate_str(message, max_len)
}

/// Truncate to at most `max_len` bytes on a char boundary.
fn truncate_str(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[allow(clippy::cast_possible_truncation)] // bar rows are few
fn move_up(stdout: &mut StdoutLock<'_>, rows: usize) {
    execute!(stdout, cursor::MoveUp(rows as u16)).ok();
}

#[allow(clippy::cast_possible_truncation)]
fn move_down(stdout: &mut StdoutLock<'_>, rows: usize) {
    execute!(stdout, cursor::MoveDown(rows as u16)).ok();
}

// ============================================================================
// Progress Bars
// ============================================================================

/// Progress bars drawn on consecutive terminal rows, indexed in creation order.
///
/// `inc` may be called from rayon workers; drawing is serialized by a mutex.
pub struct ProgressBars {
    bars: Vec<Bar>,
    lock: Mutex<()>,
}

struct Bar {
    prefix: ColoredString,
    module_len: usize,
    total: usize,
    current: AtomicUsize,
}

impl ProgressBars {
    /// Reserve one row per `(module, total)` pair.
    pub fn new(modules: &[(&'static str, usize)]) -> Self {
        let mut stdout = stdout().lock();
        for _ in modules {
            writeln!(stdout).ok();
        }
        stdout.flush().ok();
        BAR_ROWS.store(modules.len(), Ordering::SeqCst);

        let bars = modules
            .iter()
            .map(|(module, total)| Bar {
                prefix: colorize_prefix(module),
                module_len: module.len(),
                total: *total,
                current: AtomicUsize::new(0),
            })
            .collect();

        Self {
            bars,
            lock: Mutex::new(()),
        }
    }

    /// Like `new`, but skips when there is at most one item of work.
    pub fn new_filtered(modules: &[(&'static str, usize)]) -> Option<Self> {
        let modules: Vec<_> = modules.iter().filter(|(_, n)| *n > 0).copied().collect();
        let total: usize = modules.iter().map(|(_, n)| n).sum();
        (total > 1).then(|| Self::new(&modules))
    }

    pub fn inc(&self, index: usize) {
        if let Some(bar) = self.bars.get(index) {
            let current = bar.current.fetch_add(1, Ordering::Relaxed) + 1;
            self.draw(index, bar, current);
        }
    }

    fn draw(&self, row: usize, bar: &Bar, current: usize) {
        let _guard = self.lock.lock().ok();

        let count = format!("{current}/{}", bar.total);
        let overhead = bar.module_len + PREFIX_OVERHEAD + BAR_OVERHEAD + count.len();
        let width = terminal_width().saturating_sub(overhead);
        let line = bar_line(current, bar.total, width.clamp(MIN_BAR_WIDTH, MAX_BAR_WIDTH));

        let mut stdout = stdout().lock();
        let rows_up = self.bars.len() - row;
        move_up(&mut stdout, rows_up);
        execute!(stdout, Clear(ClearType::CurrentLine)).ok();
        write!(stdout, "{} [{line}] {count}", bar.prefix).ok();
        move_down(&mut stdout, rows_up);
        write!(stdout, "\r").ok();
        stdout.flush().ok();
    }

    /// Clear the bar area. Also runs on drop.
    pub fn finish(&self) {
        if BAR_ROWS.swap(0, Ordering::SeqCst) == 0 {
            return;
        }
        let _guard = self.lock.lock().ok();

        let mut stdout = stdout().lock();
        let rows = self.bars.len();
        move_up(&mut stdout, rows);
        for _ in 0..rows {
            execute!(stdout, Clear(ClearType::CurrentLine)).ok();
            move_down(&mut stdout, 1);
        }
        move_up(&mut stdout, rows);
        stdout.flush().ok();
    }
}

impl Drop for ProgressBars {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Filled and empty cells for `current` of `total` in `width` cells.
fn bar_line(current: usize, total: usize, width: usize) -> String {
    let filled = if total > 0 {
        (current.min(total) * width) / total
    } else {
        0
    };
    "█".repeat(filled) + &"░".repeat(width - filled)
}
