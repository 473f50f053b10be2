//! Page-level footnote orchestration.
//!
//! Renderers only look numbers up, so every registration must happen before
//! the first body is rendered. `FootnoteManager` enforces that order:
//!
//! ```text
//! register_deferred()   header callouts, numbers withheld
//!        │
//! pre_register()        scan all bodies in page order, assign numbers
//!        │
//! validate()            every deferred id must appear in some body
//!        │
//! render()              bodies → HTML, lookups only
//! ```

use super::{FootnoteError, FootnoteRegistry, extract::footnote_ids};
use serde::{Deserialize, Serialize};

/// A footnote declared ahead of the body (e.g. in a page header).
///
/// Deserializes from either a bare string or `{ id = "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "DeferredFootnoteRepr")]
pub struct DeferredFootnote {
    pub id: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DeferredFootnoteRepr {
    Id(String),
    Table { id: String },
}

impl From<DeferredFootnoteRepr> for DeferredFootnote {
    fn from(repr: DeferredFootnoteRepr) -> Self {
        match repr {
            DeferredFootnoteRepr::Id(id) | DeferredFootnoteRepr::Table { id } => Self { id },
        }
    }
}

impl DeferredFootnote {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Anything carrying raw body text that may contain reference markers.
pub trait FootnoteContent {
    fn body(&self) -> &str;
}

impl FootnoteContent for str {
    fn body(&self) -> &str {
        self
    }
}

impl FootnoteContent for String {
    fn body(&self) -> &str {
        self
    }
}

impl<T: FootnoteContent + ?Sized> FootnoteContent for &T {
    fn body(&self) -> &str {
        (**self).body()
    }
}

/// Turns one body into output markup, resolving markers by lookup.
///
/// Implementations must call [`FootnoteRegistry::get_number`], never
/// `register`, and report unknown identifiers as
/// [`FootnoteError::MissingFootnote`].
pub trait Renderer {
    fn render(&self, body: &str, registry: &FootnoteRegistry) -> Result<String, FootnoteError>;
}

/// A rendered body paired with the entry it came from.
#[derive(Debug)]
pub struct RenderedContent<'a, T> {
    pub entry: &'a T,
    pub html: String,
}

/// Result of [`FootnoteManager::create_for_page`].
#[derive(Debug)]
pub struct PageFootnotes<'a, T> {
    pub registry: FootnoteRegistry,
    pub rendered: Vec<RenderedContent<'a, T>>,
}

/// Owns the registry for a single page.
#[derive(Debug, Default)]
pub struct FootnoteManager {
    registry: FootnoteRegistry,
}

impl FootnoteManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register header callouts whose numbers depend on the body.
    pub fn register_deferred(&mut self, footnotes: &[DeferredFootnote]) -> &mut Self {
        for footnote in footnotes {
            self.registry.register(&footnote.id, true);
        }
        self
    }

    /// Scan every body in order and number each reference on first sight.
    pub fn pre_register<T: FootnoteContent>(&mut self, content: &[T]) -> &mut Self {
        for item in content {
            for id in footnote_ids(item.body()) {
                self.registry.register(id, false);
            }
        }
        self
    }

    /// Fail if a deferred footnote never appeared in any body.
    pub fn validate(&self) -> Result<(), FootnoteError> {
        self.registry.validate_no_deferred_footnotes()
    }

    /// Render entries in order. Registration must already be complete.
    pub fn render<'a, T, R>(
        &self,
        entries: &'a [T],
        renderer: &R,
    ) -> Result<Vec<RenderedContent<'a, T>>, FootnoteError>
    where
        T: FootnoteContent,
        R: Renderer + ?Sized,
    {
        entries
            .iter()
            .map(|entry| {
                let html = renderer.render(entry.body(), &self.registry)?;
                Ok(RenderedContent { entry, html })
            })
            .collect()
    }

    pub fn into_registry(self) -> FootnoteRegistry {
        self.registry
    }

    /// Number and render a whole page.
    ///
    /// Deferred ids are registered first, then all bodies are scanned, then
    /// the registry is validated, and only then is anything rendered.
    pub fn create_for_page<'a, T, R>(
        deferred: &[DeferredFootnote],
        content: &'a [T],
        renderer: &R,
    ) -> Result<PageFootnotes<'a, T>, FootnoteError>
    where
        T: FootnoteContent,
        R: Renderer + ?Sized,
    {
        let mut manager = Self::new();
        manager.register_deferred(deferred).pre_register(content);
        manager.validate()?;

        let rendered = manager.render(content, renderer)?;
        Ok(PageFootnotes {
            registry: manager.into_registry(),
            rendered,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::footnote::FootnoteEntry;

    /// Renders each marker id as `[id:number]`, nothing else.
    struct NumbersOnly;

    impl Renderer for NumbersOnly {
        fn render(&self, body: &str, registry: &FootnoteRegistry) -> Result<String, FootnoteError> {
            footnote_ids(body)
                .map(|id| {
                    registry
                        .get_number(id)
                        .map(|n| format!("[{id}:{n}]"))
                        .ok_or_else(|| FootnoteError::MissingFootnote(id.to_owned()))
                })
                .collect()
        }
    }

    fn marker(id: &str) -> String {
        format!(r#"<FootnoteRef id="{id}" />"#)
    }

    #[test]
    fn test_numbers_follow_body_order() {
        let bodies = vec![
            format!("one {} two {}", marker("b"), marker("a")),
            format!("three {}", marker("c")),
        ];
        let page = FootnoteManager::create_for_page(&[], &bodies, &NumbersOnly).unwrap();

        assert_eq!(page.rendered[0].html, "[b:1][a:2]");
        assert_eq!(page.rendered[1].html, "[c:3]");
    }

    #[test]
    fn test_repeat_reference_keeps_first_number() {
        // `a` repeats in the second body and keeps the number from the first.
        let bodies = vec![
            format!("{} {}", marker("z"), marker("a")),
            marker("a"),
        ];
        let page = FootnoteManager::create_for_page(&[], &bodies, &NumbersOnly).unwrap();
        assert_eq!(page.rendered[1].html, "[a:2]");
    }

    #[test]
    fn test_deferred_gets_body_number() {
        let deferred = [DeferredFootnote::new("late")];
        let bodies = vec![format!("{} then {}", marker("early"), marker("late"))];
        let page = FootnoteManager::create_for_page(&deferred, &bodies, &NumbersOnly).unwrap();

        assert_eq!(page.registry.get_number("late"), Some(2));
        assert_eq!(
            page.registry.deferred_mappings(),
            vec![FootnoteEntry {
                id: "late".into(),
                number: 2
            }]
        );
    }

    #[test]
    fn test_unreferenced_deferred_fails() {
        let deferred = [DeferredFootnote::new("x"), DeferredFootnote::new("y")];
        let bodies = vec![marker("x")];
        let err = FootnoteManager::create_for_page(&deferred, &bodies, &NumbersOnly).unwrap_err();

        assert_eq!(err, FootnoteError::DeferredNotResolved("y".into()));
    }

    #[test]
    fn test_render_without_registration_reports_missing() {
        let manager = FootnoteManager::new();
        let bodies = vec![marker("ghost")];
        let err = manager.render(&bodies, &NumbersOnly).unwrap_err();
        assert_eq!(err, FootnoteError::MissingFootnote("ghost".into()));
    }

    #[test]
    fn test_rendered_keeps_input_order_and_entries() {
        let bodies = vec!["no refs".to_string(), marker("q")];
        let page = FootnoteManager::create_for_page(&[], &bodies, &NumbersOnly).unwrap();

        assert_eq!(page.rendered.len(), 2);
        assert_eq!(page.rendered[0].entry, &bodies[0]);
        assert_eq!(page.rendered[0].html, "");
        assert_eq!(page.rendered[1].entry, &bodies[1]);
    }

    #[test]
    fn test_deferred_footnote_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            deferred: Vec<DeferredFootnote>,
        }
        let wrapper: Wrapper = toml::from_str(r#"deferred = ["a", { id = "b" }]"#).unwrap();
        assert_eq!(
            wrapper.deferred,
            vec![DeferredFootnote::new("a"), DeferredFootnote::new("b")]
        );
    }
}
