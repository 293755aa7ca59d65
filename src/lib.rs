//! Glyph atlas caching and OpenGL text rendering for variometer displays.
//!
//! Text on the instrument face is laid out by [`TextLayout`], and each glyph
//! is then drawn as a textured quad sampled from a per-font glyph atlas
//! instead of being rasterized every frame. The pieces:
//!
//! - [`FontCache`] keeps one [`GlyphAtlas`] per distinct font, keyed by the
//!   font's hash with exact comparison on collisions.
//! - [`GlyphAtlas`] shelf-packs glyph bitmaps into square textures and tracks
//!   which region still has to be uploaded.
//! - [`GlyphDrawInterceptor`] is the [`GlyphSink`] that connects the two to a
//!   [`GlyphBackend`], such as the OpenGL [`GlowBackend`].
//! - [`TextRenderer`] bundles a [`FontLibrary`], the cache and a backend.
//!
//! # Features
//!
//! - **`glow`** (default): the OpenGL backend, built on [glow]. Without it the crate is pure
//!   CPU code, and any [`GlyphBackend`] implementation can be plugged in.
//!
//! # Safety
//!
//! Creating a [`GlowBackend`] requires a valid OpenGL context that stays
//! current for every later call on it.
//!
//! [glow]: https://docs.rs/glow

mod atlas;
mod backend;
mod cache;
mod config;
mod error;
mod font;
mod interceptor;
mod layout;
mod library;
#[cfg(feature = "glow")]
mod render;
#[cfg(feature = "glow")]
mod shaders;
mod text;
mod types;

pub use atlas::{
    AtlasGlyph, AtlasTexture, BoundingBox, GlyphAtlas, EDGE_MARGIN, GLYPH_GAP, GLYPH_PADDING,
};
pub use backend::GlyphBackend;
pub use cache::{FontCache, FontCacheEntry};
pub use config::{AtlasConfig, PixelFormat, DEFAULT_TEXTURE_SIZE};
pub use error::TextError;
pub use font::{
    FontDescriptor, FontEngine, FontKey, FontMetrics, FontStyle, FontWeight, GlyphBitmap,
    GlyphExtents, LAYOUT_SCALE,
};
pub use interceptor::{GlyphDrawInterceptor, RenderStats, GLYPH_TEXTURE_UNIT};
pub use layout::{
    draw_glyphs, FontResolver, GlyphSink, PositionedGlyph, TextLayout, DEFAULT_FAMILY,
};
pub use library::{FontLibrary, DEFAULT_DPI};
#[cfg(feature = "glow")]
pub use render::GlowBackend;
pub use text::TextRenderer;
pub use types::{GlyphVertex, TextureHandle, TexturedQuad};
