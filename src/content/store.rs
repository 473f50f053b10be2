//! Collection loading and page content selection.

use super::{ContentError, Entry};
use crate::config::{ArticleSelection, ArticleStrategy, EntryRef, PageConfig};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

/// Collection holding the page articles.
pub const ARTICLES: &str = "articles";

/// Files to ignore during directory traversal
const IGNORED_FILES: &[&str] = &[".DS_Store"];

/// All collections under the content directory, keyed by name.
///
/// Entries within a collection are sorted by slug.
#[derive(Debug, Default)]
pub struct ContentStore {
    collections: BTreeMap<String, Vec<Entry>>,
}

impl ContentStore {
    /// Load every collection under `dir`.
    ///
    /// Each direct subdirectory is a collection; every file below it with one
    /// of `extensions` is an entry.
    pub fn load(dir: &Path, extensions: &[String]) -> Result<Self, ContentError> {
        let mut collections = BTreeMap::new();
        let read_dir = fs::read_dir(dir).map_err(|err| ContentError::Io(dir.to_path_buf(), err))?;

        for dir_entry in read_dir.filter_map(Result::ok) {
            let path = dir_entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let entries = load_collection(name, &path, extensions)?;
            collections.insert(name.to_owned(), entries);
        }

        Ok(Self { collections })
    }

    #[cfg(test)]
    pub fn from_entries(entries: impl IntoIterator<Item = Entry>) -> Self {
        let mut collections: BTreeMap<String, Vec<Entry>> = BTreeMap::new();
        for entry in entries {
            collections
                .entry(entry.collection.clone())
                .or_default()
                .push(entry);
        }
        for entries in collections.values_mut() {
            entries.sort_by(|a, b| a.slug.cmp(&b.slug));
        }
        Self { collections }
    }

    /// Entries of one collection, sorted by slug.
    pub fn collection(&self, name: &str) -> Result<&[Entry], ContentError> {
        self.collections
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| ContentError::CollectionNotFound(name.to_owned()))
    }

    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    /// Total number of entries across collections.
    pub fn len(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Articles sorted by their `order` field (missing = 0, stable).
    ///
    /// A missing `articles` collection yields no articles.
    pub fn ordered_articles(&self) -> Vec<&Entry> {
        let mut articles: Vec<_> = self
            .collections
            .get(ARTICLES)
            .map(|entries| entries.iter().collect())
            .unwrap_or_default();
        articles.sort_by_key(|entry| entry.order());
        articles
    }

    /// Articles in the exact order of `ids`, matched against entry ids.
    ///
    /// An empty `ids` list never requires the `articles` collection.
    pub fn articles_by_ids(&self, ids: &[String]) -> Result<Vec<&Entry>, ContentError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let articles = self.collection(ARTICLES)?;
        ids.iter()
            .map(|id| {
                articles
                    .iter()
                    .find(|e| e.id() == id)
                    .ok_or_else(|| ContentError::ArticleNotFound(id.clone()))
            })
            .collect()
    }

    /// Look up one entry by collection and slug.
    pub fn entry(&self, collection: &str, slug: &str) -> Result<&Entry, ContentError> {
        self.collection(collection)?
            .iter()
            .find(|e| e.slug == slug)
            .ok_or_else(|| ContentError::EntryNotFound {
                collection: collection.to_owned(),
                slug: slug.to_owned(),
            })
    }

    /// Everything rendered on a page: selected articles, then additional entries.
    pub fn page_content(&self, page: &PageConfig) -> Result<Vec<&Entry>, ContentError> {
        let mut content = match &page.articles {
            ArticleSelection::Strategy(ArticleStrategy::ByOrder) => self.ordered_articles(),
            ArticleSelection::Strategy(ArticleStrategy::None) => Vec::new(),
            ArticleSelection::Ids(ids) => self.articles_by_ids(ids)?,
        };

        for EntryRef { collection, slug } in &page.additional {
            content.push(self.entry(collection, slug)?);
        }
        Ok(content)
    }
}

fn load_collection(
    name: &str,
    dir: &Path,
    extensions: &[String],
) -> Result<Vec<Entry>, ContentError> {
    let mut entries = Vec::new();

    for path in collect_entry_files(dir, extensions) {
        let text = fs::read_to_string(&path).map_err(|err| ContentError::Io(path.clone(), err))?;
        let slug = slug_of(&path, dir);
        entries.push(Entry::parse(name, &slug, &path, &text)?);
    }

    entries.sort_by(|a, b| a.slug.cmp(&b.slug));
    Ok(entries)
}

fn collect_entry_files(dir: &Path, extensions: &[String]) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let name = e.file_name().to_str().unwrap_or_default();
            !IGNORED_FILES.contains(&name)
        })
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| extensions.iter().any(|allowed| allowed == ext))
        })
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// `content/articles/guides/intro.md` → `guides/intro`
fn slug_of(path: &Path, collection_dir: &Path) -> String {
    let rel = path.strip_prefix(collection_dir).unwrap_or(path).with_extension("");
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn exts() -> Vec<String> {
        vec!["md".into(), "mdx".into()]
    }

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn article(slug: &str, id: &str, order: Option<i64>) -> Entry {
        let front = match order {
            Some(order) => format!("+++\nid = \"{id}\"\norder = {order}\n+++\n"),
            None => format!("+++\nid = \"{id}\"\n+++\n"),
        };
        Entry::parse(ARTICLES, slug, Path::new(slug), &format!("{front}{slug} body")).unwrap()
    }

    fn page(articles: ArticleSelection, additional: Vec<EntryRef>) -> PageConfig {
        PageConfig {
            articles,
            additional,
            ..PageConfig::default()
        }
    }

    #[test]
    fn test_load_collections() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "articles/one.md", "+++\nid = \"first\"\n+++\nOne");
        write(dir.path(), "articles/nested/two.mdx", "Two");
        write(dir.path(), "articles/skip.txt", "ignored");
        write(dir.path(), "footnotes/intro.md", "Intro");
        write(dir.path(), "README.md", "not a collection");

        let store = ContentStore::load(dir.path(), &exts()).unwrap();
        assert_eq!(store.collection_names().collect::<Vec<_>>(), vec!["articles", "footnotes"]);
        assert_eq!(store.len(), 3);

        let articles = store.collection(ARTICLES).unwrap();
        let slugs: Vec<_> = articles.iter().map(|e| e.slug.as_str()).collect();
        assert_eq!(slugs, vec!["nested/two", "one"]);
        assert_eq!(store.entry(ARTICLES, "one").unwrap().id(), "first");
    }

    #[test]
    fn test_load_missing_dir() {
        let dir = TempDir::new().unwrap();
        let err = ContentStore::load(&dir.path().join("nope"), &exts()).unwrap_err();
        assert!(matches!(err, ContentError::Io(..)));
    }

    #[test]
    fn test_ordered_articles_stable() {
        let store = ContentStore::from_entries([
            article("a", "a", Some(2)),
            article("b", "b", None),
            article("c", "c", Some(1)),
            article("d", "d", Some(0)),
        ]);
        let ids: Vec<_> = store.ordered_articles().iter().map(|e| e.id()).collect();
        assert_eq!(ids, vec!["b", "d", "c", "a"]);
    }

    #[test]
    fn test_ordered_articles_without_collection() {
        assert!(ContentStore::default().ordered_articles().is_empty());
    }

    #[test]
    fn test_articles_by_ids() {
        let store = ContentStore::from_entries([
            article("x-file", "x", None),
            article("y-file", "y", None),
        ]);
        let ids: Vec<_> = store
            .articles_by_ids(&["y".into(), "x".into()])
            .unwrap()
            .iter()
            .map(|e| e.slug.as_str())
            .collect();
        assert_eq!(ids, vec!["y-file", "x-file"]);

        let err = store.articles_by_ids(&["zzz".into()]).unwrap_err();
        assert!(matches!(err, ContentError::ArticleNotFound(id) if id == "zzz"));
    }

    #[test]
    fn test_entry_not_found() {
        let store = ContentStore::from_entries([article("a", "a", None)]);
        let err = store.entry(ARTICLES, "b").unwrap_err();
        assert!(matches!(
            err,
            ContentError::EntryNotFound { collection, slug } if collection == ARTICLES && slug == "b"
        ));
    }

    #[test]
    fn test_missing_collection() {
        let store = ContentStore::from_entries([article("a", "a", None)]);
        let err = store.entry("footnotes", "a").unwrap_err();
        assert!(matches!(err, ContentError::CollectionNotFound(name) if name == "footnotes"));

        let empty = ContentStore::default();
        assert!(empty.is_empty());
        let err = empty.articles_by_ids(&["a".into()]).unwrap_err();
        assert!(matches!(err, ContentError::CollectionNotFound(name) if name == ARTICLES));
        assert!(empty.articles_by_ids(&[]).unwrap().is_empty());

        let err = empty
            .page_content(&page(
                ArticleSelection::Strategy(ArticleStrategy::None),
                vec![EntryRef {
                    collection: "footnotes".into(),
                    slug: "intro".into(),
                }],
            ))
            .unwrap_err();
        assert_eq!(format!("{err}"), "Collection `footnotes` not found");
    }

    #[test]
    fn test_page_content_order() {
        let note = Entry::parse("footnotes", "intro", Path::new("intro"), "note").unwrap();
        let store = ContentStore::from_entries([
            article("b", "b", Some(2)),
            article("a", "a", Some(1)),
            note,
        ]);

        let extra = vec![EntryRef {
            collection: "footnotes".into(),
            slug: "intro".into(),
        }];
        let sources: Vec<_> = store
            .page_content(&page(ArticleSelection::default(), extra.clone()))
            .unwrap()
            .iter()
            .map(|e| e.source())
            .collect();
        assert_eq!(sources, vec!["articles/a", "articles/b", "footnotes/intro"]);

        let only_extra = store
            .page_content(&page(ArticleSelection::Strategy(ArticleStrategy::None), extra))
            .unwrap();
        assert_eq!(only_extra.len(), 1);
    }
}
