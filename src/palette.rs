//! Packed colors and the indexed palette.
//!
//! Colors are 32-bit RGBA packed little-endian style: red in the low byte,
//! alpha in the high byte (`(a<<24)|(b<<16)|(g<<8)|r`). Surfaces in this app
//! store *indexed* pixels: the palette index lives in the red channel and the
//! alpha channel is 255 for any drawn pixel, so `0x00000000` doubles as both
//! "index 0" and "fully transparent". The renderer resolves indices through
//! the palette at draw time, which is what makes global recoloring instant.

/// Size of the GPU palette texture; palettes shorter than this are tiled.
pub const PALETTE_SLOTS: usize = 256;

/// Pack RGBA components into a color value.
#[inline]
pub fn pack(r: u8, g: u8, b: u8, a: u8) -> u32 {
    ((a as u32) << 24) | ((b as u32) << 16) | ((g as u32) << 8) | (r as u32)
}

/// Unpack a color value into `[r, g, b, a]`.
#[inline]
pub fn unpack(color: u32) -> [u8; 4] {
    [
        (color & 0xFF) as u8,
        ((color >> 8) & 0xFF) as u8,
        ((color >> 16) & 0xFF) as u8,
        ((color >> 24) & 0xFF) as u8,
    ]
}

/// Alpha component of a packed color.
#[inline]
pub fn alpha(color: u32) -> u8 {
    (color >> 24) as u8
}

/// The stored pixel value for a palette index: opaque, index in the red
/// channel. Index 0 is the transparent/eraser value `0x00000000`.
#[inline]
pub fn index_color(index: u8) -> u32 {
    if index == 0 {
        0
    } else {
        0xFF00_0000 | index as u32
    }
}

/// Recover the palette index from a stored pixel value (the red byte).
#[inline]
pub fn pixel_index(color: u32) -> u8 {
    (color & 0xFF) as u8
}

/// Format the RGB part of a color as `#rrggbb` (palette editor display).
pub fn to_hex(color: u32) -> String {
    let [r, g, b, _] = unpack(color);
    format!("#{:02x}{:02x}{:02x}", r, g, b)
}

/// Parse a `#rrggbb` / `rrggbb` string into an opaque packed color.
pub fn from_hex(text: &str) -> Option<u32> {
    let hex = text.trim().trim_start_matches('#');
    if hex.len() != 6 {
        return None;
    }
    let value = u32::from_str_radix(hex, 16).ok()?;
    Some(pack(
        ((value >> 16) & 0xFF) as u8,
        ((value >> 8) & 0xFF) as u8,
        (value & 0xFF) as u8,
        0xFF,
    ))
}

fn dist_sq(a: u32, b: u32) -> u32 {
    let [ar, ag, ab, _] = unpack(a);
    let [br, bg, bb, _] = unpack(b);
    let dr = ar as i32 - br as i32;
    let dg = ag as i32 - bg as i32;
    let db = ab as i32 - bb as i32;
    (dr * dr + dg * dg + db * db) as u32
}

/// An ordered list of up to 256 colors. Slot 0 is always the
/// transparent/erase slot and is never matched as a real color.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<u32>,
}

impl Palette {
    /// A palette holding only the transparent slot.
    pub fn new() -> Self {
        Self { colors: vec![0] }
    }

    /// Build a palette from a color list. Slot 0 is forced transparent and
    /// anything beyond 256 entries is dropped.
    pub fn from_colors(colors: &[u32]) -> Self {
        let mut colors: Vec<u32> = colors.iter().copied().take(PALETTE_SLOTS).collect();
        if colors.is_empty() {
            colors.push(0);
        }
        colors[0] = 0;
        Self { colors }
    }

    /// The app's starter palette: transparent plus fifteen general-purpose
    /// pixel-art colors.
    pub fn starter() -> Self {
        fn rgb(r: u8, g: u8, b: u8) -> u32 {
            pack(r, g, b, 0xFF)
        }
        Self {
            colors: vec![
                0,
                rgb(0x14, 0x0c, 0x1c),
                rgb(0x44, 0x24, 0x34),
                rgb(0x30, 0x34, 0x6d),
                rgb(0x4e, 0x4a, 0x4e),
                rgb(0x85, 0x4c, 0x30),
                rgb(0x34, 0x65, 0x24),
                rgb(0xd0, 0x46, 0x48),
                rgb(0x59, 0x7d, 0xce),
                rgb(0xd2, 0x7d, 0x2c),
                rgb(0x85, 0x95, 0xa1),
                rgb(0x6d, 0xaa, 0x2c),
                rgb(0xd2, 0xaa, 0x99),
                rgb(0x6d, 0xc2, 0xca),
                rgb(0xda, 0xd4, 0x5e),
                rgb(0xde, 0xee, 0xd6),
            ],
        }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        false // always holds at least the transparent slot
    }

    pub fn colors(&self) -> &[u32] {
        &self.colors
    }

    /// The color a palette index resolves to, with the same modulo wrap the
    /// tiled GPU texture applies.
    pub fn resolve(&self, index: u8) -> u32 {
        self.colors[index as usize % self.colors.len()]
    }

    /// Replace the color in a slot. Slot 0 and out-of-range slots are
    /// silently ignored.
    pub fn set(&mut self, slot: usize, color: u32) {
        if slot == 0 || slot >= self.colors.len() {
            return;
        }
        self.colors[slot] = color;
    }

    /// Append a color; returns the new slot, or `None` at the 256-slot cap.
    pub fn push(&mut self, color: u32) -> Option<usize> {
        if self.colors.len() >= PALETTE_SLOTS {
            return None;
        }
        self.colors.push(color);
        Some(self.colors.len() - 1)
    }

    /// Tile the palette into the fixed 256-slot layout the renderer uploads:
    /// slot i holds `colors[i % len]`.
    pub fn tiled(&self) -> [u32; PALETTE_SLOTS] {
        let mut slots = [0u32; PALETTE_SLOTS];
        for (i, slot) in slots.iter_mut().enumerate() {
            *slot = self.colors[i % self.colors.len()];
        }
        slots
    }

    /// Nearest palette index for an arbitrary RGBA color, used when
    /// quantizing imported images: colors at or below half alpha map to the
    /// transparent slot; everything else matches the closest real slot by
    /// squared RGB distance (slot 0 excluded). Ties resolve to the lowest
    /// slot.
    pub fn nearest_index(&self, color: u32) -> u8 {
        if alpha(color) < 128 {
            return 0;
        }
        let mut best = 0u8;
        let mut best_dist = u32::MAX;
        for (slot, &candidate) in self.colors.iter().enumerate().skip(1) {
            let d = dist_sq(color, candidate);
            if d < best_dist {
                best_dist = d;
                best = slot as u8;
            }
        }
        best
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new()
    }
}
