//! Drives the cache, atlas and draw interceptor through the public API.

#![allow(clippy::unwrap_used)]

use vario_gltext::{
    AtlasConfig, BoundingBox, FontCache, FontDescriptor, FontEngine, FontMetrics, GlyphBackend,
    GlyphBitmap, GlyphDrawInterceptor, GlyphExtents, GlyphSink, PixelFormat, TextError,
    TextureHandle, TexturedQuad,
};

/// Every glyph is a 12x12 block with a diagonal stripe.
struct BlockEngine;

impl FontEngine for BlockEngine {
    type Font = FontDescriptor;

    fn metrics(&self, font: &FontDescriptor) -> Result<FontMetrics, TextError> {
        if font.family() == "Missing" {
            return Err(TextError::Metrics("no such face".into()));
        }
        Ok(FontMetrics {
            ascent: 12.0,
            descent: 3.0,
            line_height: 16.0,
            approximate_char_width: 8.0,
            approximate_digit_width: 9.0,
        })
    }

    fn glyph_extents(&self, _font: &FontDescriptor, _glyph: u32) -> Result<GlyphExtents, TextError> {
        Ok(GlyphExtents {
            width: 12,
            height: 12,
            bearing_x: 0,
            bearing_y: -12,
        })
    }

    fn render_glyph(&self, _font: &FontDescriptor, _glyph: u32) -> Result<GlyphBitmap, TextError> {
        let coverage = (0..144u32)
            .map(|i| if i % 13 == 0 { 255 } else { 0 })
            .collect();
        Ok(GlyphBitmap {
            width: 12,
            height: 12,
            bearing_x: 0,
            bearing_y: -12,
            coverage,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Op {
    Create(u32, PixelFormat),
    Upload(TextureHandle, BoundingBox),
    Bind(TextureHandle),
    Draw(TexturedQuad),
    Delete(TextureHandle),
}

#[derive(Default)]
struct Recorder {
    ops: Vec<Op>,
    textures: u32,
}

impl Recorder {
    fn uploads(&self) -> Vec<(TextureHandle, BoundingBox)> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::Upload(handle, region) => Some((*handle, *region)),
                _ => None,
            })
            .collect()
    }

    fn draws(&self) -> usize {
        self.ops.iter().filter(|op| matches!(op, Op::Draw(_))).count()
    }
}

impl GlyphBackend for Recorder {
    fn create_texture(&mut self, size: u32, format: PixelFormat) -> Result<TextureHandle, TextError> {
        self.textures += 1;
        self.ops.push(Op::Create(size, format));
        Ok(TextureHandle(self.textures))
    }

    fn upload_subregion(
        &mut self,
        texture: TextureHandle,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<(), TextError> {
        assert_eq!(pixels.len() % (width * height) as usize, 0);
        self.ops
            .push(Op::Upload(texture, BoundingBox::new(x, y, width, height)));
        Ok(())
    }

    fn bind_for_sampling(&mut self, texture: TextureHandle, unit: u32) -> Result<(), TextError> {
        assert_eq!(unit, 0);
        self.ops.push(Op::Bind(texture));
        Ok(())
    }

    fn draw_quad(&mut self, quad: &TexturedQuad) -> Result<(), TextError> {
        self.ops.push(Op::Draw(*quad));
        Ok(())
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        self.ops.push(Op::Delete(texture));
    }
}

fn sans() -> FontDescriptor {
    FontDescriptor::new("Sans").with_pixel_size(14.0)
}

#[test]
fn a_full_line_wraps_to_the_next_shelf() {
    let mut cache = FontCache::new(AtlasConfig::default());
    let mut backend = Recorder::default();
    let mut sink = GlyphDrawInterceptor::new(&mut cache, &BlockEngine, &mut backend);
    for glyph in 1..=17 {
        sink.draw_glyph(&sans(), glyph, 0.0, 20.0);
    }
    let stats = sink.finish().unwrap();
    assert_eq!(stats.drawn, 17);
    assert_eq!(stats.uploads, 17);

    // Sixteen 14 px boxes with 2 px gaps fill the first line of 256.
    let atlas = &cache.get(&sans()).unwrap().atlas;
    assert_eq!(atlas.get(1).unwrap().bounds, BoundingBox::new(1, 1, 14, 14));
    assert_eq!(atlas.get(16).unwrap().bounds, BoundingBox::new(241, 1, 14, 14));
    assert_eq!(atlas.get(17).unwrap().bounds, BoundingBox::new(1, 17, 14, 14));
    assert_eq!(atlas.textures().len(), 1);

    let uploads = backend.uploads();
    assert_eq!(uploads.last(), Some(&(TextureHandle(1), BoundingBox::new(1, 17, 14, 14))));
    assert_eq!(backend.ops[0], Op::Create(256, PixelFormat::Alpha8));
}

#[test]
fn every_draw_follows_its_upload_and_bind() {
    let mut cache = FontCache::new(AtlasConfig::default());
    let mut backend = Recorder::default();
    let mut sink = GlyphDrawInterceptor::new(&mut cache, &BlockEngine, &mut backend);
    for glyph in [7, 8, 7, 7, 9] {
        sink.draw_glyph(&sans(), glyph, 0.0, 20.0);
    }
    sink.finish().unwrap();

    let mut uploaded = false;
    let mut bound = false;
    for op in &backend.ops {
        match op {
            Op::Upload(..) => uploaded = true,
            Op::Bind(_) => bound = true,
            Op::Draw(_) => {
                assert!(uploaded && bound);
                bound = false;
            }
            Op::Create(..) | Op::Delete(_) => {}
        }
    }
    assert_eq!(backend.draws(), 5);
    assert_eq!(backend.uploads().len(), 3);
}

#[test]
fn fonts_get_their_own_textures() {
    let mut cache = FontCache::new(AtlasConfig::new(64, PixelFormat::Rgba8).unwrap());
    let mut backend = Recorder::default();
    let mono = FontDescriptor::new("Mono").with_pixel_size(14.0);
    let mut sink = GlyphDrawInterceptor::new(&mut cache, &BlockEngine, &mut backend)
        .with_color([0.2, 0.4, 0.6, 1.0]);
    sink.draw_glyph(&sans(), 1, 0.0, 0.0);
    sink.draw_glyph(&mono, 1, 20.0, 0.0);
    sink.draw_glyph(&sans(), 1, 40.0, 0.0);
    let stats = sink.finish().unwrap();
    assert_eq!(stats.drawn, 3);
    assert_eq!(cache.len(), 2);

    let creates = backend
        .ops
        .iter()
        .filter(|op| matches!(op, Op::Create(64, PixelFormat::Rgba8)))
        .count();
    assert_eq!(creates, 2);

    let textures: Vec<TextureHandle> = backend
        .ops
        .iter()
        .filter_map(|op| match op {
            Op::Draw(quad) => Some(quad.texture),
            _ => None,
        })
        .collect();
    assert_eq!(textures, vec![TextureHandle(1), TextureHandle(2), TextureHandle(1)]);
}

#[test]
fn a_small_atlas_spills_into_a_second_texture() {
    // 32 px textures hold two lines of two 14 px boxes.
    let mut cache = FontCache::new(AtlasConfig::new(32, PixelFormat::Alpha8).unwrap());
    let mut backend = Recorder::default();
    let mut sink = GlyphDrawInterceptor::new(&mut cache, &BlockEngine, &mut backend);
    for glyph in 1..=5 {
        sink.draw_glyph(&sans(), glyph, 0.0, 0.0);
    }
    sink.finish().unwrap();

    let atlas = &cache.get(&sans()).unwrap().atlas;
    assert_eq!(atlas.get(2).unwrap().bounds, BoundingBox::new(17, 1, 14, 14));
    assert_eq!(atlas.get(3).unwrap().bounds, BoundingBox::new(1, 17, 14, 14));
    assert_eq!(atlas.get(4).unwrap().texture, 0);
    assert_eq!(atlas.get(4).unwrap().bounds, BoundingBox::new(17, 17, 14, 14));
    assert_eq!(atlas.get(5).unwrap().texture, 1);
    assert_eq!(atlas.get(5).unwrap().bounds, BoundingBox::new(1, 1, 14, 14));
    assert_eq!(backend.textures, 2);
}

#[test]
fn metric_failures_abort_the_pass() {
    let mut cache = FontCache::new(AtlasConfig::default());
    let mut backend = Recorder::default();
    let missing = FontDescriptor::new("Missing").with_pixel_size(14.0);
    let mut sink = GlyphDrawInterceptor::new(&mut cache, &BlockEngine, &mut backend);
    sink.draw_glyph(&sans(), 1, 0.0, 0.0);
    sink.draw_glyph(&missing, 1, 0.0, 0.0);
    sink.draw_glyph(&sans(), 2, 0.0, 0.0);
    let err = sink.finish().unwrap_err();
    assert!(matches!(err, TextError::Metrics(_)));
    assert_eq!(backend.draws(), 1);
    assert!(cache.get(&missing).is_none());
}

#[test]
fn released_textures_are_refilled_whole() {
    let mut cache = FontCache::new(AtlasConfig::default());
    let mut backend = Recorder::default();
    let mut sink = GlyphDrawInterceptor::new(&mut cache, &BlockEngine, &mut backend);
    sink.draw_glyph(&sans(), 1, 0.0, 0.0);
    sink.draw_glyph(&sans(), 2, 0.0, 0.0);
    sink.finish().unwrap();

    cache.release_gpu(&mut backend);
    assert_eq!(backend.ops.last(), Some(&Op::Delete(TextureHandle(1))));

    let mut sink = GlyphDrawInterceptor::new(&mut cache, &BlockEngine, &mut backend);
    sink.draw_glyph(&sans(), 2, 0.0, 0.0);
    sink.finish().unwrap();
    assert_eq!(
        backend.uploads().last(),
        Some(&(TextureHandle(2), BoundingBox::new(0, 0, 256, 256)))
    );
}
