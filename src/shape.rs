//! Glyph outline acquisition.
//!
//! The physics never touches outlines. A [`ShapeCache`] is owned by whoever
//! drives the simulation and is handed in explicitly; it memoizes what the
//! underlying [`ShapeProvider`] produces until [`ShapeCache::clear`] tears it down.

use std::collections::HashMap;
use std::sync::Arc;

/// Renderable outline of one glyph at one size, e.g. SVG path data.
#[derive(Clone, Debug, PartialEq)]
pub struct Outline {
    pub path: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ShapeError {
    #[error("no outline available for glyph {glyph:?}")]
    Unavailable { glyph: char },
    #[error("shape provider failed: {0}")]
    Provider(String),
}

/// Source of glyph outlines, typically backed by a parsed font.
pub trait ShapeProvider {
    fn outline(&mut self, glyph: char, size: f32) -> Result<Outline, ShapeError>;
}

pub struct ShapeCache {
    provider: Box<dyn ShapeProvider>,
    entries: HashMap<(char, u32), Arc<Outline>>,
}

impl std::fmt::Debug for ShapeCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShapeCache")
            .field("provider", &"ShapeProvider")
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl ShapeCache {
    pub fn new(provider: impl ShapeProvider + 'static) -> Self {
        Self {
            provider: Box::new(provider),
            entries: HashMap::new(),
        }
    }

    /// Returns the cached outline or asks the provider. Failures are not cached.
    pub fn get(&mut self, glyph: char, size: f32) -> Result<Arc<Outline>, ShapeError> {
        let key = (glyph, size.to_bits());
        if let Some(outline) = self.entries.get(&key) {
            return Ok(Arc::clone(outline));
        }
        let outline = Arc::new(self.provider.outline(glyph, size)?);
        self.entries.insert(key, Arc::clone(&outline));
        Ok(outline)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every cached outline.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Counting {
        calls: Rc<Cell<usize>>,
    }

    impl ShapeProvider for Counting {
        fn outline(&mut self, glyph: char, size: f32) -> Result<Outline, ShapeError> {
            self.calls.set(self.calls.get() + 1);
            if glyph == 'x' {
                return Err(ShapeError::Unavailable { glyph });
            }
            Ok(Outline {
                path: format!("{glyph}@{size}"),
            })
        }
    }

    #[test]
    fn memoizes_per_glyph_and_size() {
        let calls = Rc::new(Cell::new(0));
        let mut cache = ShapeCache::new(Counting { calls: calls.clone() });

        let a = cache.get('あ', 60.0).unwrap();
        let b = cache.get('あ', 60.0).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.get(), 1);

        cache.get('あ', 72.0).unwrap();
        assert_eq!(calls.get(), 2);
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
        cache.get('あ', 60.0).unwrap();
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn failures_are_retried() {
        let calls = Rc::new(Cell::new(0));
        let mut cache = ShapeCache::new(Counting { calls: calls.clone() });

        assert!(matches!(cache.get('x', 60.0), Err(ShapeError::Unavailable { glyph: 'x' })));
        assert!(cache.get('x', 60.0).is_err());
        assert_eq!(calls.get(), 2);
        assert!(cache.is_empty());
    }
}
