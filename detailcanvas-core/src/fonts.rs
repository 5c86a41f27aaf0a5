//! Font resolution for text layers.
//!
//! Text is rasterized through usvg, which looks faces up in a
//! [`fontdb`](usvg::fontdb) database. A process-wide [`FontBook`] holds that
//! database: system fonts are loaded once on first use, and extra font files
//! can be registered at startup. Families the book does not know resolve to
//! the generic sans-serif family, so a missing font never fails a render.

use std::path::Path;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use usvg::fontdb::{Database, Family, Query};

use crate::error::CanvasResult;

/// Generic family used when a requested family is unavailable.
pub const FALLBACK_FAMILY: &str = "sans-serif";

static GLOBAL_BOOK: OnceLock<RwLock<FontBook>> = OnceLock::new();

/// A shareable font database.
#[derive(Debug, Clone)]
pub struct FontBook {
    database: Arc<Database>,
}

impl FontBook {
    /// Create a book with no fonts at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            database: Arc::new(Database::new()),
        }
    }

    /// Create a book populated with the system fonts.
    #[must_use]
    pub fn system() -> Self {
        let mut database = Database::new();
        database.load_system_fonts();
        tracing::debug!("Loaded {} system font faces", database.len());
        let mut book = Self {
            database: Arc::new(database),
        };
        book.ensure_sans_serif();
        book
    }

    /// The process-wide book, loading system fonts on first access.
    #[must_use]
    pub fn global() -> Self {
        GLOBAL_BOOK
            .get_or_init(|| RwLock::new(Self::system()))
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Register a font file with the process-wide book.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn register_global_font(path: &Path) -> CanvasResult<()> {
        let mut book = GLOBAL_BOOK
            .get_or_init(|| RwLock::new(Self::system()))
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        book.load_font_file(path)
    }

    /// Add a font file to this book.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn load_font_file(&mut self, path: &Path) -> CanvasResult<()> {
        Arc::make_mut(&mut self.database).load_font_file(path)?;
        tracing::info!("Registered font file {}", path.display());
        self.ensure_sans_serif();
        Ok(())
    }

    /// Whether a face with the given family name is available.
    #[must_use]
    pub fn has_family(&self, family: &str) -> bool {
        let families = [Family::Name(family)];
        self.database
            .query(&Query {
                families: &families,
                ..Query::default()
            })
            .is_some()
    }

    /// Resolve a family name to one usvg can render, falling back to sans-serif.
    #[must_use]
    pub fn resolve_family(&self, family: &str) -> String {
        if self.has_family(family) {
            family.to_string()
        } else {
            tracing::debug!("Font family {family:?} unavailable, using {FALLBACK_FAMILY}");
            FALLBACK_FAMILY.to_string()
        }
    }

    /// Shared handle to the underlying database.
    #[must_use]
    pub fn database(&self) -> Arc<Database> {
        Arc::clone(&self.database)
    }

    /// Whether the book holds no faces.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.database.is_empty()
    }

    /// Point the generic sans-serif family at a face that actually exists.
    fn ensure_sans_serif(&mut self) {
        let families = [Family::SansSerif];
        let query = Query {
            families: &families,
            ..Query::default()
        };
        if self.database.query(&query).is_some() {
            return;
        }
        let first = self
            .database
            .faces()
            .find_map(|face| face.families.first().map(|(name, _)| name.clone()));
        if let Some(name) = first {
            Arc::make_mut(&mut self.database).set_sans_serif_family(name);
        }
    }
}

impl Default for FontBook {
    fn default() -> Self {
        Self::global()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_book_falls_back() {
        let book = FontBook::empty();
        assert!(book.is_empty());
        assert!(!book.has_family("Arial"));
        assert_eq!(book.resolve_family("Arial"), FALLBACK_FAMILY);
    }

    #[test]
    fn test_missing_font_file_is_an_error() {
        let mut book = FontBook::empty();
        let result = book.load_font_file(Path::new("/definitely/not/a/font.ttf"));
        assert!(result.is_err());
    }
}
