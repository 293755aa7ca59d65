//! Glyph atlases: fixed-size textures packed line by line with glyph bitmaps.
//!
//! Each atlas texture is filled with a two-line shelf packer. Glyphs are
//! appended left to right to the *current* line, whose bottom edge sits 2 px
//! above the top of the tallest box of the *previous* line. When a glyph no
//! longer fits to the right, the current line becomes the previous one. When
//! a new line no longer fits vertically, a fresh texture is appended to the
//! atlas.
//!
//! Coordinates are integer texture pixels with y growing upwards: row 0 of
//! the client buffer is the first row handed to the GPU, the bottom of the
//! texture. Boxes are never moved once assigned, so texture coordinates
//! handed out earlier stay valid.

use std::collections::HashMap;
use std::path::Path;

use image::{DynamicImage, GrayImage, RgbaImage};
use log::debug;

use crate::config::{AtlasConfig, PixelFormat};
use crate::error::TextError;
use crate::font::GlyphBitmap;
use crate::types::TextureHandle;

/// Blank pixels between a box and the texture edge.
pub const EDGE_MARGIN: u32 = 1;

/// Blank pixels between neighbouring boxes, horizontally and vertically.
pub const GLYPH_GAP: u32 = 2;

/// Blank pixels between a box and the glyph image it holds, on every side.
pub const GLYPH_PADDING: u32 = 1;

/// A rectangle of texture pixels, `[x_left, x_right) x [y_bottom, y_top)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    /// Left edge.
    pub x_left: u32,
    /// Bottom edge.
    pub y_bottom: u32,
    /// Right edge, exclusive.
    pub x_right: u32,
    /// Top edge, exclusive.
    pub y_top: u32,
}

impl BoundingBox {
    /// A `width` x `height` box with its bottom-left corner at `(x, y)`.
    #[must_use]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x_left: x,
            y_bottom: y,
            x_right: x + width,
            y_top: y + height,
        }
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.x_right - self.x_left
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.y_top - self.y_bottom
    }

    /// Whether the two boxes come closer than `gap` pixels on both axes,
    /// i.e. overlap once one of them is grown by `gap`.
    #[must_use]
    pub fn is_within(&self, other: &Self, gap: u32) -> bool {
        self.x_left < other.x_right + gap
            && other.x_left < self.x_right + gap
            && self.y_bottom < other.y_top + gap
            && other.y_bottom < self.y_top + gap
    }

    /// The glyph image inside this box, i.e. the box minus its padding.
    #[must_use]
    pub fn glyph_rect(&self) -> Self {
        Self {
            x_left: self.x_left + GLYPH_PADDING,
            y_bottom: self.y_bottom + GLYPH_PADDING,
            x_right: self.x_right.saturating_sub(GLYPH_PADDING).max(self.x_left + GLYPH_PADDING),
            y_top: self.y_top.saturating_sub(GLYPH_PADDING).max(self.y_bottom + GLYPH_PADDING),
        }
    }

    /// The smallest box covering both.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            x_left: self.x_left.min(other.x_left),
            y_bottom: self.y_bottom.min(other.y_bottom),
            x_right: self.x_right.max(other.x_right),
            y_top: self.y_top.max(other.y_top),
        }
    }
}

/// Where a glyph lives in an atlas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtlasGlyph {
    /// Index of the texture in [`GlyphAtlas::textures`].
    pub texture: usize,
    /// The glyph's box, padding included.
    pub bounds: BoundingBox,
    /// Offset from the glyph origin to the left edge of the image.
    pub bearing_x: i32,
    /// Offset from the glyph origin to the top edge of the image (y down).
    pub bearing_y: i32,
}

impl AtlasGlyph {
    /// Width of the glyph image.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.bounds.glyph_rect().width()
    }

    /// Height of the glyph image.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.bounds.glyph_rect().height()
    }

    /// Texture coordinates `[u_left, v_top, u_right, v_bottom]` of the glyph
    /// image in a texture of `texture_size` pixels.
    #[must_use]
    pub fn uv(&self, texture_size: u32) -> [f32; 4] {
        let rect = self.bounds.glyph_rect();
        #[allow(clippy::cast_precision_loss)]
        let norm = |v: u32| v as f32 / texture_size as f32;
        [
            norm(rect.x_left),
            norm(rect.y_top),
            norm(rect.x_right),
            norm(rect.y_bottom),
        ]
    }
}

/// Packing state of one texture: the line being filled and the line below
/// it.
#[derive(Debug, Clone, Default)]
struct Shelf {
    previous: Vec<BoundingBox>,
    current: Vec<BoundingBox>,
}

/// A free slot found by [`Shelf::find_slot`].
#[derive(Debug)]
enum Slot {
    /// Append to the current line.
    CurrentLine(BoundingBox),
    /// Close the current line and start a new one.
    NextLine(BoundingBox),
}

impl Shelf {
    fn find_slot(&self, width: u32, height: u32, size: u32) -> Option<Slot> {
        let x = self
            .current
            .last()
            .map_or(EDGE_MARGIN, |last| last.x_right + GLYPH_GAP);
        if let Some(bounds) = fit(x, line_origin(&self.previous), width, height, size) {
            return Some(Slot::CurrentLine(bounds));
        }
        if self.current.is_empty() {
            return None;
        }
        fit(EDGE_MARGIN, line_origin(&self.current), width, height, size).map(Slot::NextLine)
    }

    fn commit(&mut self, slot: Slot) -> BoundingBox {
        match slot {
            Slot::CurrentLine(bounds) => {
                self.current.push(bounds);
                bounds
            }
            Slot::NextLine(bounds) => {
                self.previous = std::mem::take(&mut self.current);
                self.current.push(bounds);
                bounds
            }
        }
    }
}

/// Bottom edge of the line above `below`: 2 px over its highest box.
fn line_origin(below: &[BoundingBox]) -> u32 {
    below
        .iter()
        .map(|b| b.y_top + GLYPH_GAP)
        .max()
        .unwrap_or(EDGE_MARGIN)
}

/// Tries to put a `width` x `height` box at `(x, y)`.
fn fit(x: u32, y: u32, width: u32, height: u32, size: u32) -> Option<BoundingBox> {
    let limit = size - EDGE_MARGIN;
    (x + width <= limit && y + height <= limit).then(|| BoundingBox::new(x, y, width, height))
}

/// One texture of an atlas: the client-side pixels, its packing state, the
/// region not yet uploaded and the GPU texture, once created.
#[derive(Debug)]
pub struct AtlasTexture {
    size: u32,
    format: PixelFormat,
    pixels: Vec<u8>,
    shelf: Shelf,
    glyph_count: usize,
    dirty: Option<BoundingBox>,
    gpu: Option<TextureHandle>,
}

impl AtlasTexture {
    fn new(size: u32, format: PixelFormat) -> Self {
        let len = size as usize * size as usize * format.bytes_per_pixel();
        Self {
            size,
            format,
            pixels: vec![0; len],
            shelf: Shelf::default(),
            glyph_count: 0,
            dirty: None,
            gpu: None,
        }
    }

    /// Edge length in pixels.
    #[must_use]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Pixel format of [`pixels`](Self::pixels).
    #[must_use]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// The whole client buffer, bottom row first.
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Number of glyphs packed into this texture.
    #[must_use]
    pub fn glyph_count(&self) -> usize {
        self.glyph_count
    }

    /// Whether the client buffer holds glyphs the GPU copy lacks.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty.is_some()
    }

    /// The region changed since the last upload.
    #[must_use]
    pub fn dirty_region(&self) -> Option<BoundingBox> {
        self.dirty
    }

    /// Records that the GPU copy is up to date.
    pub fn mark_clean(&mut self) {
        self.dirty = None;
    }

    /// Marks the whole texture as needing upload, e.g. after its GPU copy was
    /// lost.
    pub fn invalidate(&mut self) {
        if self.glyph_count > 0 {
            self.dirty = Some(BoundingBox::new(0, 0, self.size, self.size));
        }
    }

    /// The GPU texture mirroring this buffer, if created yet.
    #[must_use]
    pub fn gpu_handle(&self) -> Option<TextureHandle> {
        self.gpu
    }

    /// Attaches or detaches the GPU texture.
    pub fn set_gpu_handle(&mut self, handle: Option<TextureHandle>) {
        self.gpu = handle;
    }

    /// Copies `region` out of the client buffer, bottom row first, tightly
    /// packed. The region is clipped to the texture.
    #[must_use]
    pub fn region_pixels(&self, region: &BoundingBox) -> Vec<u8> {
        let bpp = self.format.bytes_per_pixel();
        let size = self.size as usize;
        let x_left = region.x_left.min(self.size) as usize;
        let x_right = region.x_right.min(self.size) as usize;
        let y_bottom = region.y_bottom.min(self.size) as usize;
        let y_top = region.y_top.min(self.size) as usize;

        let mut out = Vec::with_capacity((x_right - x_left) * (y_top - y_bottom) * bpp);
        for row in y_bottom..y_top {
            let start = (row * size + x_left) * bpp;
            let end = (row * size + x_right) * bpp;
            out.extend_from_slice(&self.pixels[start..end]);
        }
        out
    }

    /// The texture as an image, top row first.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::Export`] if the buffer does not match the
    /// texture size.
    pub fn to_image(&self) -> Result<DynamicImage, TextError> {
        let mismatch = || TextError::Export("pixel buffer does not match texture size".into());
        let image = match self.format {
            PixelFormat::Alpha8 => DynamicImage::ImageLuma8(
                GrayImage::from_raw(self.size, self.size, self.pixels.clone()).ok_or_else(mismatch)?,
            ),
            PixelFormat::Rgba8 => DynamicImage::ImageRgba8(
                RgbaImage::from_raw(self.size, self.size, self.pixels.clone()).ok_or_else(mismatch)?,
            ),
        };
        Ok(image.flipv())
    }

    /// Writes the texture to `path` as a PNG.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::Export`] if encoding or writing fails.
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), TextError> {
        self.to_image()?
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(|e| TextError::Export(e.to_string()))
    }

    fn commit(&mut self, slot: Slot, bitmap: &GlyphBitmap) -> BoundingBox {
        let bounds = self.shelf.commit(slot);
        self.blit(&bounds, bitmap);
        self.glyph_count += 1;
        self.dirty = Some(self.dirty.map_or(bounds, |dirty| dirty.union(&bounds)));
        bounds
    }

    /// Copies the top-down `bitmap` into the glyph image area of `bounds`.
    fn blit(&mut self, bounds: &BoundingBox, bitmap: &GlyphBitmap) {
        let bpp = self.format.bytes_per_pixel();
        let size = self.size as usize;
        let width = bitmap.width as usize;
        let x_left = (bounds.x_left + GLYPH_PADDING) as usize;
        let top_row = (bounds.y_top - GLYPH_PADDING) as usize;

        for (r, src) in bitmap.coverage.chunks_exact(width.max(1)).enumerate() {
            let row = top_row - 1 - r;
            let start = (row * size + x_left) * bpp;
            let dst = &mut self.pixels[start..start + width * bpp];
            match self.format {
                PixelFormat::Alpha8 => dst.copy_from_slice(src),
                PixelFormat::Rgba8 => {
                    for (pixel, &coverage) in dst.chunks_exact_mut(4).zip(src) {
                        pixel.copy_from_slice(&[255, 255, 255, coverage]);
                    }
                }
            }
        }
    }
}

/// The glyph textures of one font.
///
/// Textures are allocated on demand: an atlas that never drew a glyph holds
/// none.
#[derive(Debug)]
pub struct GlyphAtlas {
    config: AtlasConfig,
    textures: Vec<AtlasTexture>,
    glyphs: HashMap<u32, AtlasGlyph>,
}

impl GlyphAtlas {
    /// Creates an empty atlas.
    #[must_use]
    pub fn new(config: AtlasConfig) -> Self {
        Self {
            config,
            textures: Vec::new(),
            glyphs: HashMap::new(),
        }
    }

    /// The atlas settings.
    #[must_use]
    pub fn config(&self) -> AtlasConfig {
        self.config
    }

    /// Looks up an already placed glyph.
    #[must_use]
    pub fn get(&self, glyph: u32) -> Option<AtlasGlyph> {
        self.glyphs.get(&glyph).copied()
    }

    /// Number of glyphs placed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    /// Whether no glyph was placed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// All textures, in allocation order.
    #[must_use]
    pub fn textures(&self) -> &[AtlasTexture] {
        &self.textures
    }

    /// The texture at `index`.
    #[must_use]
    pub fn texture(&self, index: usize) -> Option<&AtlasTexture> {
        self.textures.get(index)
    }

    /// The texture at `index`, mutably.
    pub fn texture_mut(&mut self, index: usize) -> Option<&mut AtlasTexture> {
        self.textures.get_mut(index)
    }

    /// Iterates the placed glyphs of texture `index`.
    pub fn glyphs_in(&self, index: usize) -> impl Iterator<Item = (u32, AtlasGlyph)> + '_ {
        self.glyphs
            .iter()
            .filter(move |(_, placed)| placed.texture == index)
            .map(|(&glyph, &placed)| (glyph, placed))
    }

    /// Assigns `glyph` a box for a `width` x `height` bitmap and copies the
    /// bitmap produced by `rasterize` into it.
    ///
    /// A glyph that already has a box gets it back unchanged and `rasterize`
    /// is not called. Otherwise `rasterize` runs exactly once, before the
    /// atlas is modified; if it fails, or returns a bitmap of another size,
    /// the atlas stays as it was.
    ///
    /// # Errors
    ///
    /// - [`TextError::AtlasOverflow`] if the glyph is larger than an empty
    ///   texture.
    /// - [`TextError::Rasterization`] if `rasterize` fails or returns a
    ///   bitmap that does not match `width` x `height`.
    pub fn place<F>(
        &mut self,
        glyph: u32,
        width: u32,
        height: u32,
        rasterize: F,
    ) -> Result<AtlasGlyph, TextError>
    where
        F: FnOnce() -> Result<GlyphBitmap, TextError>,
    {
        if let Some(placed) = self.glyphs.get(&glyph) {
            return Ok(*placed);
        }

        let size = self.config.texture_size();
        let padded_width = width.saturating_add(2 * GLYPH_PADDING);
        let padded_height = height.saturating_add(2 * GLYPH_PADDING);
        let usable = size - 2 * EDGE_MARGIN;
        if padded_width > usable || padded_height > usable {
            return Err(TextError::AtlasOverflow {
                glyph,
                width,
                height,
                texture_size: size,
            });
        }

        let (index, slot) = match self
            .textures
            .last()
            .and_then(|t| t.shelf.find_slot(padded_width, padded_height, size))
        {
            Some(slot) => (self.textures.len() - 1, slot),
            None => (
                self.textures.len(),
                Slot::CurrentLine(BoundingBox::new(
                    EDGE_MARGIN,
                    EDGE_MARGIN,
                    padded_width,
                    padded_height,
                )),
            ),
        };

        let bitmap = rasterize()?;
        if bitmap.width != width
            || bitmap.height != height
            || bitmap.coverage.len() != width as usize * height as usize
        {
            return Err(TextError::Rasterization {
                glyph,
                reason: format!(
                    "expected a {width}x{height} bitmap, got {}x{} with {} bytes",
                    bitmap.width,
                    bitmap.height,
                    bitmap.coverage.len()
                ),
            });
        }

        if index == self.textures.len() {
            debug!(
                "allocating atlas texture {index} ({size}x{size}) for glyph {glyph}"
            );
            self.textures
                .push(AtlasTexture::new(size, self.config.format()));
        }
        let bounds = self.textures[index].commit(slot, &bitmap);
        debug!("placed glyph {glyph} in texture {index} at {bounds:?}");

        let placed = AtlasGlyph {
            texture: index,
            bounds,
            bearing_x: bitmap.bearing_x,
            bearing_y: bitmap.bearing_y,
        };
        self.glyphs.insert(glyph, placed);
        Ok(placed)
    }
}
