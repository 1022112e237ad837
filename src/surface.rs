//! The in-memory pixel surface: an exclusively-owned 2D grid of packed
//! colors, plus the scoped pixel access and blit/stamp primitives the tools
//! are built on.
//!
//! Surfaces have fixed dimensions; "resizing" means creating a new surface.
//! All coordinate-taking operations bounds-check and silently drop
//! out-of-range work, so a stray pointer event can never index out of the
//! buffer.

use std::collections::HashMap;

use crate::palette;
use crate::raster;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Surface {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl Surface {
    /// A blank (all index-0 transparent) surface.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; (width * height) as usize],
        }
    }

    /// Wrap an existing pixel buffer; `None` if the length doesn't match the
    /// dimensions (decoded documents go through here).
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<u32>) -> Option<Self> {
        if pixels.len() != (width * height) as usize {
            return None;
        }
        Some(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// The pixel buffer as raw RGBA bytes (red first), for GPU upload and
    /// image encoding. A reinterpreting view, not a copy.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Scoped access to the raw pixel buffer.
    ///
    /// One call is the mutation window for one logical operation (a whole
    /// stroke segment, a whole fill): the closure gets the surface's own
    /// storage, so every write is committed the moment the scope ends, on
    /// every exit path. Callers are expected to follow a mutating scope with
    /// a renderer flush for this surface.
    pub fn with_pixels<R>(&mut self, f: impl FnOnce(&mut [u32]) -> R) -> R {
        f(&mut self.pixels)
    }

    #[inline]
    fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Read one pixel; `None` outside the surface.
    pub fn get(&self, x: i32, y: i32) -> Option<u32> {
        if self.in_bounds(x, y) {
            Some(self.pixels[self.index(x, y)])
        } else {
            None
        }
    }

    /// Write one pixel; out-of-bounds writes are dropped.
    pub fn put(&mut self, x: i32, y: i32, value: u32) {
        if self.in_bounds(x, y) {
            let i = self.index(x, y);
            self.pixels[i] = value;
        }
    }

    /// Reset every pixel to transparent index 0.
    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    /// Write `color` at every cell the mask covers (any mask pixel with
    /// nonzero alpha), with the mask's top-left at (x, y). The color is
    /// written verbatim, so stamping color 0 erases — this is the eraser
    /// path, not source-over.
    pub fn stamp(&mut self, mask: &Surface, x: i32, y: i32, color: u32) {
        for my in 0..mask.height as i32 {
            for mx in 0..mask.width as i32 {
                if palette::alpha(mask.pixels[mask.index(mx, my)]) != 0 {
                    self.put(x + mx, y + my, color);
                }
            }
        }
    }

    /// Copy `src` onto this surface at (x, y), skipping fully transparent
    /// source pixels (binary source-over, the only blend the compositing
    /// model has besides the eraser's destination-out).
    pub fn blit(&mut self, src: &Surface, x: i32, y: i32) {
        for sy in 0..src.height as i32 {
            for sx in 0..src.width as i32 {
                let value = src.pixels[src.index(sx, sy)];
                if palette::alpha(value) != 0 {
                    self.put(x + sx, y + sy, value);
                }
            }
        }
    }

    /// Flood-fill starting at (x, y); see [`raster::flood_fill`].
    pub fn flood_fill(&mut self, x: i32, y: i32, color: u32) {
        let (w, h) = (self.width, self.height);
        self.with_pixels(|pixels| raster::flood_fill(pixels, w, h, x, y, color));
    }

    /// Rewrite every pixel through a color→color table. Pixels whose value
    /// is not in the table keep their value (identity fallback), so a remap
    /// can never invent invalid pixels.
    pub fn remap(&mut self, table: &HashMap<u32, u32>) {
        for pixel in &mut self.pixels {
            if let Some(&mapped) = table.get(pixel) {
                *pixel = mapped;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::pack;

    const OPAQUE: u32 = 0xFF00_0042;

    #[test]
    fn with_pixels_commits_partial_mutations() {
        let mut s = Surface::new(4, 4);
        s.put(0, 0, 7);
        s.with_pixels(|pixels| {
            pixels[5] = OPAQUE; // (1, 1) only
        });
        assert_eq!(s.get(1, 1), Some(OPAQUE));
        // Untouched pixels round-trip unchanged.
        assert_eq!(s.get(0, 0), Some(7));
        assert_eq!(s.get(3, 3), Some(0));
    }

    #[test]
    fn with_pixels_returns_the_closure_value() {
        let mut s = Surface::new(2, 2);
        s.put(1, 0, OPAQUE);
        let count = s.with_pixels(|pixels| pixels.iter().filter(|&&p| p != 0).count());
        assert_eq!(count, 1);
    }

    #[test]
    fn get_and_put_guard_bounds() {
        let mut s = Surface::new(3, 2);
        assert_eq!(s.get(-1, 0), None);
        assert_eq!(s.get(3, 0), None);
        assert_eq!(s.get(0, 2), None);
        s.put(-1, 0, OPAQUE);
        s.put(3, 5, OPAQUE);
        assert!(s.pixels().iter().all(|&p| p == 0));
    }

    #[test]
    fn from_pixels_validates_length() {
        assert!(Surface::from_pixels(2, 2, vec![0; 4]).is_some());
        assert!(Surface::from_pixels(2, 2, vec![0; 5]).is_none());
    }

    fn cross_mask() -> Surface {
        // 3x3 plus-shape: corners transparent.
        let t = 0;
        let x = 0xFFFF_FFFF;
        Surface::from_pixels(3, 3, vec![t, x, t, x, x, x, t, x, t]).unwrap()
    }

    #[test]
    fn stamp_writes_color_through_the_mask_only() {
        let mut s = Surface::new(5, 5);
        s.stamp(&cross_mask(), 1, 1, OPAQUE);
        assert_eq!(s.get(2, 1), Some(OPAQUE));
        assert_eq!(s.get(1, 2), Some(OPAQUE));
        assert_eq!(s.get(2, 2), Some(OPAQUE));
        // Mask corners stay untouched.
        assert_eq!(s.get(1, 1), Some(0));
        assert_eq!(s.get(3, 3), Some(0));
    }

    #[test]
    fn stamp_with_zero_erases() {
        let mut s = Surface::new(5, 5);
        s.with_pixels(|pixels| pixels.fill(OPAQUE));
        s.stamp(&cross_mask(), 1, 1, 0);
        assert_eq!(s.get(2, 2), Some(0));
        assert_eq!(s.get(1, 1), Some(OPAQUE)); // corner not covered
    }

    #[test]
    fn stamp_clips_at_the_edges() {
        let mut s = Surface::new(3, 3);
        s.stamp(&cross_mask(), -1, -1, OPAQUE);
        s.stamp(&cross_mask(), 2, 2, OPAQUE);
        // No panic and the overlapping cells took the stamp.
        assert_eq!(s.get(0, 0), Some(OPAQUE));
        assert_eq!(s.get(2, 2), Some(0)); // center cell of second stamp lands at (3,3), clipped; (2,2) is its transparent corner
    }

    #[test]
    fn blit_skips_transparent_source_pixels() {
        let mut below = Surface::new(3, 1);
        below.put(0, 0, 111);
        below.put(1, 0, 222);
        below.put(2, 0, 333);

        let mut above = Surface::new(3, 1);
        above.put(0, 0, pack(9, 9, 9, 255));
        // (1, 0) stays transparent
        above.put(2, 0, pack(5, 5, 5, 255));

        below.blit(&above, 0, 0);
        assert_eq!(below.get(0, 0), Some(pack(9, 9, 9, 255)));
        assert_eq!(below.get(1, 0), Some(222));
        assert_eq!(below.get(2, 0), Some(pack(5, 5, 5, 255)));
    }

    #[test]
    fn blit_clips_negative_offsets() {
        let mut dst = Surface::new(2, 2);
        let mut src = Surface::new(2, 2);
        src.with_pixels(|pixels| pixels.fill(OPAQUE));
        dst.blit(&src, -1, -1);
        assert_eq!(dst.get(0, 0), Some(OPAQUE));
        assert_eq!(dst.get(1, 1), Some(0));
    }

    #[test]
    fn remap_applies_table_with_identity_fallback() {
        let mut s = Surface::new(2, 1);
        s.put(0, 0, 10);
        s.put(1, 0, 20);
        let mut table = HashMap::new();
        table.insert(10u32, 99u32);
        s.remap(&table);
        assert_eq!(s.get(0, 0), Some(99));
        assert_eq!(s.get(1, 0), Some(20)); // unmapped value untouched
    }

    #[test]
    fn flood_fill_runs_against_surface_dimensions() {
        let mut s = Surface::new(4, 3);
        s.put(0, 0, OPAQUE);
        s.flood_fill(3, 2, 0xFF00_0001);
        // Every transparent pixel was reachable from the seed; the lone
        // opaque pixel is not part of the region.
        assert_eq!(s.get(0, 0), Some(OPAQUE));
        assert_eq!(s.get(1, 0), Some(0xFF00_0001));
        assert_eq!(s.get(0, 1), Some(0xFF00_0001));
        assert_eq!(s.get(3, 2), Some(0xFF00_0001));
    }
}
