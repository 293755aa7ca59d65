//! Per-font cache of glyph atlases.
//!
//! Entries are keyed by the font's hash. Distinct fonts may share a hash, so
//! each hash maps to a short list of entries that is scanned for an exactly
//! equal font.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use log::debug;

use crate::atlas::GlyphAtlas;
use crate::backend::GlyphBackend;
use crate::config::AtlasConfig;
use crate::error::TextError;
use crate::font::{FontKey, FontMetrics};

/// A cached font: its identity, metrics and glyph atlas.
#[derive(Debug)]
pub struct FontCacheEntry<K> {
    font: K,
    hash: u32,
    metrics: FontMetrics,
    /// Glyph textures of this font.
    pub atlas: GlyphAtlas,
}

impl<K: FontKey> FontCacheEntry<K> {
    fn new(font: K, hash: u32, metrics: FontMetrics, config: AtlasConfig) -> Self {
        Self {
            font,
            hash,
            metrics,
            atlas: GlyphAtlas::new(config),
        }
    }

    /// The font this entry was created for.
    pub fn font(&self) -> &K {
        &self.font
    }

    /// The font's hash.
    pub fn hash(&self) -> u32 {
        self.hash
    }

    /// The font's metrics.
    pub fn metrics(&self) -> &FontMetrics {
        &self.metrics
    }
}

/// Process-lifetime cache of glyph atlases, one per distinct font.
///
/// Entries are never evicted; an instrument display uses a handful of fonts.
#[derive(Debug)]
pub struct FontCache<K> {
    config: AtlasConfig,
    buckets: HashMap<u32, Vec<FontCacheEntry<K>>>,
    len: usize,
}

impl<K: FontKey> FontCache<K> {
    /// Creates an empty cache whose atlases use `config`.
    #[must_use]
    pub fn new(config: AtlasConfig) -> Self {
        Self {
            config,
            buckets: HashMap::new(),
            len: 0,
        }
    }

    /// The atlas settings of every entry.
    #[must_use]
    pub fn config(&self) -> AtlasConfig {
        self.config
    }

    /// Returns the entry for `font`, creating it on first use.
    ///
    /// `metrics` is only called on a miss.
    ///
    /// # Errors
    ///
    /// Returns the error of `metrics`; the cache is not modified in that
    /// case.
    pub fn get_or_create<F>(
        &mut self,
        font: &K,
        metrics: F,
    ) -> Result<&mut FontCacheEntry<K>, TextError>
    where
        F: FnOnce(&K) -> Result<FontMetrics, TextError>,
    {
        let hash = font.font_hash();
        let config = self.config;
        match self.buckets.entry(hash) {
            Entry::Occupied(occupied) => {
                let bucket = occupied.into_mut();
                if let Some(pos) = bucket.iter().position(|e| e.font == *font) {
                    return Ok(&mut bucket[pos]);
                }
                debug!("font hash {hash:#010x} collides, adding {font:?}");
                let entry = FontCacheEntry::new(font.clone(), hash, metrics(font)?, config);
                let pos = bucket.len();
                bucket.push(entry);
                self.len += 1;
                Ok(&mut bucket[pos])
            }
            Entry::Vacant(vacant) => {
                let entry = FontCacheEntry::new(font.clone(), hash, metrics(font)?, config);
                debug!("caching font {font:?} (hash {hash:#010x})");
                self.len += 1;
                Ok(&mut vacant.insert(vec![entry])[0])
            }
        }
    }

    /// Looks up the entry for `font` without creating it.
    pub fn get(&self, font: &K) -> Option<&FontCacheEntry<K>> {
        self.buckets
            .get(&font.font_hash())?
            .iter()
            .find(|e| e.font == *font)
    }

    /// Number of cached fonts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no font is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterates all entries.
    pub fn entries(&self) -> impl Iterator<Item = &FontCacheEntry<K>> {
        self.buckets.values().flatten()
    }

    /// Iterates all entries mutably.
    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut FontCacheEntry<K>> {
        self.buckets.values_mut().flatten()
    }

    /// Deletes the GPU textures of every atlas. Client-side buffers and
    /// packing state are kept; textures are marked dirty so a later draw
    /// recreates and refills them.
    pub fn release_gpu<B: GlyphBackend>(&mut self, backend: &mut B) {
        for entry in self.entries_mut() {
            for index in 0..entry.atlas.textures().len() {
                let Some(texture) = entry.atlas.texture_mut(index) else {
                    continue;
                };
                if let Some(handle) = texture.gpu_handle() {
                    backend.delete_texture(handle);
                    texture.set_gpu_handle(None);
                    texture.invalidate();
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::font::FontDescriptor;
    use std::cell::Cell;

    /// A font key whose hash always collides.
    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Colliding(&'static str);

    impl FontKey for Colliding {
        fn font_hash(&self) -> u32 {
            7
        }
    }

    fn metrics(height: f32) -> impl FnOnce(&Colliding) -> Result<FontMetrics, TextError> {
        move |_: &Colliding| {
            Ok(FontMetrics {
                line_height: height,
                ..FontMetrics::default()
            })
        }
    }

    #[test]
    fn repeated_lookups_share_the_entry() {
        let mut cache = FontCache::new(AtlasConfig::default());
        let font = FontDescriptor::new("Sans").with_pixel_size(16.0);
        let calls = Cell::new(0);
        let count = |_: &FontDescriptor| {
            calls.set(calls.get() + 1);
            Ok(FontMetrics::default())
        };
        cache.get_or_create(&font, count).unwrap();
        cache
            .get_or_create(&font, |_| {
                calls.set(calls.get() + 1);
                Ok(FontMetrics::default())
            })
            .unwrap();
        assert_eq!(calls.get(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn colliding_hashes_get_distinct_entries() {
        let mut cache = FontCache::new(AtlasConfig::default());
        let a = Colliding("Sans 12");
        let b = Colliding("Mono 12");

        cache.get_or_create(&a, metrics(14.0)).unwrap();
        cache.get_or_create(&b, metrics(20.0)).unwrap();
        assert_eq!(cache.len(), 2);

        let again_a = cache.get_or_create(&a, metrics(99.0)).unwrap();
        assert_eq!(again_a.font(), &a);
        assert!((again_a.metrics().line_height - 14.0).abs() < f32::EPSILON);
        assert_eq!(again_a.hash(), 7);

        let again_b = cache.get_or_create(&b, metrics(99.0)).unwrap();
        assert_eq!(again_b.font(), &b);
        assert!((again_b.metrics().line_height - 20.0).abs() < f32::EPSILON);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn colliding_entries_keep_separate_atlases() {
        let mut cache = FontCache::new(AtlasConfig::default());
        let a = Colliding("a");
        let b = Colliding("b");
        let entry = cache.get_or_create(&a, metrics(10.0)).unwrap();
        entry
            .atlas
            .place(1, 3, 3, || {
                Ok(crate::font::GlyphBitmap {
                    width: 3,
                    height: 3,
                    bearing_x: 0,
                    bearing_y: -3,
                    coverage: vec![1; 9],
                })
            })
            .unwrap();
        let entry_b = cache.get_or_create(&b, metrics(10.0)).unwrap();
        assert!(entry_b.atlas.is_empty());
        assert_eq!(cache.get(&a).unwrap().atlas.len(), 1);
    }

    #[test]
    fn failed_metrics_leave_cache_untouched() {
        let mut cache = FontCache::new(AtlasConfig::default());
        let a = Colliding("broken");
        let err = cache
            .get_or_create(&a, |_| Err(TextError::Metrics("no face".into())))
            .unwrap_err();
        assert!(matches!(err, TextError::Metrics(_)));
        assert!(cache.is_empty());
        assert!(cache.get(&a).is_none());
        assert_eq!(cache.entries().count(), 0);

        // A collision miss that fails does not disturb the existing entry.
        let b = Colliding("fine");
        cache.get_or_create(&b, metrics(1.0)).unwrap();
        assert!(cache
            .get_or_create(&a, |_| Err(TextError::Metrics("no face".into())))
            .is_err());
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&b).is_some());
    }
}
