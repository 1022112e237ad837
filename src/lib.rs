//! PixelPad: a palette-indexed pixel art editor.
//!
//! Pixels store palette slots, not colors. Every surface keeps one byte of
//! index per pixel (packed into the red channel of an RGBA word), and color
//! only appears when the GPU resolves indices through the palette texture at
//! draw time. Edit a palette slot and every pixel using it follows.
//!
//! Module map:
//!
//!   surface    — index bitmaps with scoped pixel access and blitting
//!   palette    — palette slots, packing helpers, nearest-color matching
//!   raster     — brush stamping, line sweep, flood fill on surfaces
//!   scene      — the id-keyed surface store, scene objects, viewport math,
//!                hit testing
//!   editor     — pointer gestures, tool state, document lifecycle
//!   gpu        — wgpu context, per-surface textures, scene compositor
//!   io         — document save/load, PNG export, image import
//!   components — egui widgets (toolbar buttons, palette panel, dialogs)
//!   app        — the eframe shell wiring all of the above together

pub mod app;
pub mod assets;
pub mod components;
pub mod editor;
pub mod gpu;
pub mod io;
pub mod logger;
pub mod palette;
pub mod raster;
pub mod scene;
pub mod surface;
