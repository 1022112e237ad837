// ============================================================================
// GPU MODULE — palette-indexed scene rendering over wgpu
// ============================================================================
//
// Architecture:
//
//   context.rs   — device/queue acquisition (headless; hardware adapter with
//                  a software-rasterizer fallback)
//   texture.rs   — IndexTexture: one GPU texture per surface, red channel
//                  carries the palette index
//   shaders.rs   — the WGSL scene shader (two-stage lookup: sprite index →
//                  palette color, times the per-object tint)
//   renderer.rs  — SceneRenderer: palette texture, per-surface texture
//                  cache, quad compositing into an offscreen target, and
//                  synchronous readback for presentation through egui
//
// The renderer is headless: it never owns a window surface. The same
// pipeline runs on a real GPU and on the fallback rasterizer, and the app
// drops to a blank canvas when neither exists.

pub mod context;
pub mod renderer;
pub mod shaders;
pub mod texture;

pub use context::GpuContext;
pub use renderer::SceneRenderer;

/// Round a row of RGBA pixels up to wgpu's copy alignment.
/// Buffer copies require `bytes_per_row` to be a multiple of 256.
pub(crate) fn aligned_bytes_per_row(width: u32) -> u32 {
    let unaligned = width * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    (unaligned + align - 1) / align * align
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_alignment_rounds_up_to_256() {
        assert_eq!(aligned_bytes_per_row(1), 256);
        assert_eq!(aligned_bytes_per_row(64), 256);
        assert_eq!(aligned_bytes_per_row(65), 512);
        assert_eq!(aligned_bytes_per_row(128), 512);
        assert_eq!(aligned_bytes_per_row(256), 1024);
    }
}
