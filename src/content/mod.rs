//! Content collections feeding the page renderer.
//!
//! ```text
//! content/
//! ├── articles/            ordered page sections (`order` front matter)
//! │   ├── getting-started.md
//! │   └── advanced.mdx
//! └── footnotes/           extra entries pulled in by slug
//!     └── intro.md
//! ```
//!
//! Only the raw body of an entry is inspected for footnote markers; front
//! matter carries `id`, `title` and `order`.

mod entry;
mod error;
mod store;

pub use entry::Entry;
pub use error::ContentError;
pub use store::ContentStore;
