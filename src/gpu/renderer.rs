// ============================================================================
// SCENE RENDERER — palette texture, per-surface texture cache, compositing
// ============================================================================
//
// One pipeline, created once: nearest filtering, no mipmaps, standard alpha
// blending. Per frame the renderer draws every scene object as a quad in
// list order (painter's algorithm) into an offscreen target, then reads the
// result back for presentation through egui.
//
// GPU state is stale by contract: the renderer never looks at pixel
// contents to decide freshness. `flush_surface` is the only path that
// re-uploads a surface's texture, and callers invoke it after every
// mutation.

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};

use super::context::GpuContext;
use super::texture::IndexTexture;
use crate::palette::Palette;
use crate::scene::{SceneObject, SurfaceId, SurfaceStore, Viewport};
use crate::{log_info, log_warn};

/// Per-quad uniforms; layout mirrors `SceneUniforms` in shaders.rs
/// (vec2/f32 pairs padded so `tint` lands on a 16-byte boundary).
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct SceneUniforms {
    quad_pos: [f32; 2],
    quad_size: [f32; 2],
    view_offset: [f32; 2],
    view_scale: f32,
    _pad0: f32,
    viewport_size: [f32; 2],
    _pad1: [f32; 2],
    tint: [f32; 4],
}

struct RenderTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

pub struct SceneRenderer {
    ctx: GpuContext,
    pipeline: wgpu::RenderPipeline,
    uniform_bgl: wgpu::BindGroupLayout,
    /// Texture + sampler pair layout, shared by the sprite group (1) and
    /// the palette group (2).
    tex_bgl: wgpu::BindGroupLayout,
    sampler_nearest: wgpu::Sampler,

    palette_texture: wgpu::Texture,
    palette_bind_group: wgpu::BindGroup,

    /// Texture cache keyed by surface handle. Entries are created lazily on
    /// first draw or flush and erased by `dispose_surface`.
    cache: HashMap<SurfaceId, IndexTexture>,
    /// Per-quad uniform buffers + bind groups, reused across frames via
    /// `queue.write_buffer`; grows to the largest scene drawn so far.
    quad_slots: Vec<(wgpu::Buffer, wgpu::BindGroup)>,

    target: Option<RenderTarget>,
    /// Cached staging buffer for readback, grown as the viewport grows.
    staging: Option<(wgpu::Buffer, u64)>,
}

impl SceneRenderer {
    /// Acquire a GPU context and build the renderer, or `None` when no
    /// adapter (hardware or software) is usable — the app then runs with a
    /// blank canvas instead of crashing.
    pub fn create() -> Option<Self> {
        GpuContext::new().map(Self::new)
    }

    pub fn new(ctx: GpuContext) -> Self {
        let device = &ctx.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("scene_shader"),
            source: wgpu::ShaderSource::Wgsl(super::shaders::SCENE_SHADER.into()),
        });

        // Group 0: per-quad uniforms.
        let uniform_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("scene_uniform_bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        // Groups 1 and 2: texture + sampler.
        let tex_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("scene_tex_bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene_pipeline_layout"),
            bind_group_layouts: &[&uniform_bgl, &tex_bgl, &tex_bgl],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("scene_pipeline"),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_scene",
                buffers: &[],
                compilation_options: Default::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_scene",
                targets: &[Some(wgpu::ColorTargetState {
                    format: wgpu::TextureFormat::Rgba8Unorm,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            multiview: None,
        });

        // Pixel art is sampled nearest everywhere, palette included.
        let sampler_nearest = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("sampler_nearest"),
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        // 256x1 palette texture; one texel per palette slot. Starts zeroed
        // (all transparent) until the first set_palette call.
        let palette_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("palette_texture"),
            size: wgpu::Extent3d {
                width: crate::palette::PALETTE_SLOTS as u32,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let palette_view = palette_texture.create_view(&wgpu::TextureViewDescriptor::default());
        let palette_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("palette_bind_group"),
            layout: &tex_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&palette_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler_nearest),
                },
            ],
        });

        log_info!("scene renderer ready on {}", ctx.adapter_name);

        Self {
            ctx,
            pipeline,
            uniform_bgl,
            tex_bgl,
            sampler_nearest,
            palette_texture,
            palette_bind_group,
            cache: HashMap::new(),
            quad_slots: Vec::new(),
            target: None,
            staging: None,
        }
    }

    pub fn adapter_name(&self) -> &str {
        &self.ctx.adapter_name
    }

    /// Upload the palette, tiled to all 256 slots (`colors[i % len]`).
    /// Cheap enough to call every frame, normally called on palette change.
    pub fn set_palette(&mut self, palette: &Palette) {
        let slots = palette.tiled();
        self.ctx.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.palette_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(&slots),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * crate::palette::PALETTE_SLOTS as u32),
                rows_per_image: Some(1),
            },
            wgpu::Extent3d {
                width: crate::palette::PALETTE_SLOTS as u32,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
    }

    /// Re-upload one surface's texture from its current pixels, creating
    /// the cache entry if absent. The only way stale GPU state is refreshed.
    pub fn flush_surface(&mut self, id: SurfaceId, surface: &crate::surface::Surface) {
        if let Some(entry) = self.cache.get(&id) {
            if entry.width == surface.width() && entry.height == surface.height() {
                entry.upload_full(&self.ctx.queue, surface.as_bytes());
                return;
            }
            // Stale entry from a disposed-and-recreated size; rebuild below.
            self.cache.remove(&id);
        }
        if !self.ctx.supports_size(surface.width(), surface.height()) {
            log_warn!(
                "surface {:?} ({}x{}) exceeds the device texture limit, not cached",
                id,
                surface.width(),
                surface.height()
            );
            return;
        }
        let entry = IndexTexture::new(
            &self.ctx.device,
            &self.ctx.queue,
            &self.tex_bgl,
            &self.sampler_nearest,
            surface.width(),
            surface.height(),
            surface.as_bytes(),
        );
        self.cache.insert(id, entry);
    }

    /// Release the cached texture for a surface that left the scene. The
    /// map entry goes with it, so a disposed handle holds no GPU memory.
    pub fn dispose_surface(&mut self, id: SurfaceId) {
        if self.cache.remove(&id).is_some() {
            log_info!("disposed texture for surface {:?}", id);
        }
    }

    /// Composite the scene into an offscreen target and read the RGBA
    /// result back. Objects draw in list order; later entries land on top.
    pub fn render_scene(
        &mut self,
        objects: &[SceneObject],
        store: &SurfaceStore,
        view: &Viewport,
        width: u32,
        height: u32,
    ) -> Vec<u8> {
        if width == 0 || height == 0 {
            return Vec::new();
        }
        if !self.ctx.supports_size(width, height) {
            log_warn!("viewport {}x{} exceeds the device texture limit", width, height);
            return Vec::new();
        }
        self.ensure_target(width, height);

        // First walk: make sure every visible surface has a texture and a
        // uniform slot, and upload this frame's quad uniforms.
        let mut draws: Vec<SurfaceId> = Vec::with_capacity(objects.len());
        for object in objects {
            let Some(surface) = store.get(object.surface) else {
                continue;
            };
            if !self.cache.contains_key(&object.surface) {
                // Lazy creation path; flush_surface also populates the cache.
                self.flush_surface(object.surface, surface);
                if !self.cache.contains_key(&object.surface) {
                    continue; // unsupported size, skipped
                }
            }
            let slot = draws.len();
            self.ensure_slot(slot);
            let uniforms = SceneUniforms {
                quad_pos: [object.x as f32, object.y as f32],
                quad_size: [surface.width() as f32, surface.height() as f32],
                view_offset: view.offset,
                view_scale: view.scale,
                _pad0: 0.0,
                viewport_size: [width as f32, height as f32],
                _pad1: [0.0; 2],
                tint: object.tint,
            };
            self.ctx
                .queue
                .write_buffer(&self.quad_slots[slot].0, 0, bytemuck::bytes_of(&uniforms));
            draws.push(object.surface);
        }

        let Some(target) = self.target.as_ref() else {
            return Vec::new();
        };

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("scene_encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(2, &self.palette_bind_group, &[]);
            for (slot, id) in draws.iter().enumerate() {
                let Some(entry) = self.cache.get(id) else {
                    continue;
                };
                pass.set_bind_group(0, &self.quad_slots[slot].1, &[]);
                pass.set_bind_group(1, &entry.bind_group, &[]);
                pass.draw(0..6, 0..1);
            }
        }

        self.ctx.queue.submit(std::iter::once(encoder.finish()));

        Self::readback_texture(
            &self.ctx,
            &target.texture,
            target.width,
            target.height,
            &mut self.staging,
        )
    }

    fn ensure_target(&mut self, width: u32, height: u32) {
        if let Some(target) = &self.target {
            if target.width == width && target.height == height {
                return;
            }
        }
        let texture = self.ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("scene_target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.target = Some(RenderTarget {
            texture,
            view,
            width,
            height,
        });
    }

    fn ensure_slot(&mut self, slot: usize) {
        if slot < self.quad_slots.len() {
            return;
        }
        let buffer = self.ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("scene_quad_uniforms"),
            size: std::mem::size_of::<SceneUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = self.ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("scene_quad_bind_group"),
            layout: &self.uniform_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        self.quad_slots.push((buffer, bind_group));
    }

    /// Copy the target into a (cached) staging buffer, map it, and strip the
    /// 256-byte row padding into a tightly packed RGBA vec.
    fn readback_texture(
        ctx: &GpuContext,
        texture: &wgpu::Texture,
        width: u32,
        height: u32,
        cached_staging: &mut Option<(wgpu::Buffer, u64)>,
    ) -> Vec<u8> {
        let bytes_per_row = super::aligned_bytes_per_row(width);
        let buffer_size = (bytes_per_row * height) as u64;

        let need_new = match cached_staging {
            Some((_, size)) if *size >= buffer_size => false,
            _ => true,
        };
        if need_new {
            let buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("readback_staging"),
                size: buffer_size,
                usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            *cached_staging = Some((buffer, buffer_size));
        }
        let Some((staging, _)) = cached_staging.as_ref() else {
            return Vec::new();
        };

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("readback_encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: staging,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        ctx.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        ctx.device.poll(wgpu::Maintain::Wait);
        match rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                log_warn!("readback map failed: {:?}", e);
                return Vec::new();
            }
            Err(e) => {
                log_warn!("readback channel failed: {:?}", e);
                return Vec::new();
            }
        }

        let mapped = slice.get_mapped_range();
        let packed_row = (width * 4) as usize;
        let mut result = Vec::with_capacity(packed_row * height as usize);
        for y in 0..height as usize {
            let start = y * bytes_per_row as usize;
            result.extend_from_slice(&mapped[start..start + packed_row]);
        }
        drop(mapped);
        staging.unmap();

        result
    }
}
