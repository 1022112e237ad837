// ============================================================================
// GPU CONTEXT — wgpu device, queue, and adapter initialization
// ============================================================================

use std::sync::Arc;

use crate::{log_info, log_warn};

/// The core wgpu resources shared by the renderer.
/// Created once at startup; if creation fails the app runs without a canvas.
pub struct GpuContext {
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
    pub adapter_name: String,
    /// Maximum texture dimension supported by this device.
    pub max_texture_dim: u32,
}

impl GpuContext {
    /// Attempt to create a GPU context. Tries a hardware adapter first, then
    /// the software rasterizer (`force_fallback_adapter`) so rendering still
    /// works on machines without a usable GPU.
    ///
    /// `pollster::block_on` because eframe doesn't expose its own wgpu
    /// device to application code and we need a headless one for offscreen
    /// composition.
    pub fn new() -> Option<Self> {
        if let Some(ctx) = pollster::block_on(Self::new_async(false)) {
            return Some(ctx);
        }
        log_warn!("hardware adapter unavailable, trying software fallback");
        pollster::block_on(Self::new_async(true))
    }

    async fn new_async(force_fallback: bool) -> Option<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None, // headless — offscreen composition only
                force_fallback_adapter: force_fallback,
            })
            .await?;

        let adapter_name = adapter.get_info().name;
        let limits = adapter.limits();

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("pixelpad gpu"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits {
                        max_texture_dimension_2d: limits.max_texture_dimension_2d,
                        ..wgpu::Limits::downlevel_defaults()
                    },
                },
                None,
            )
            .await
            .ok()?;

        log_info!(
            "gpu context ready: {} (max texture {})",
            adapter_name,
            limits.max_texture_dimension_2d
        );

        Some(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            adapter_name,
            max_texture_dim: limits.max_texture_dimension_2d,
        })
    }

    /// Whether a texture of the given dimensions can be created here.
    pub fn supports_size(&self, width: u32, height: u32) -> bool {
        width <= self.max_texture_dim && height <= self.max_texture_dim
    }
}
