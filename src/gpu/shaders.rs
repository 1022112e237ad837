// ============================================================================
// WGSL SHADERS — inline shader source, compiled at pipeline creation
// ============================================================================

/// The scene shader: one textured quad per scene object, resolved through
/// the palette.
///
/// The sprite texture's red channel carries the palette index; the fragment
/// stage looks that index up in the 256x1 palette texture and multiplies by
/// the object's tint. Both textures are sampled nearest with no mipmaps, so
/// indices are never interpolated into nonsense between two palette slots.
pub const SCENE_SHADER: &str = r#"
struct SceneUniforms {
    // Quad placement, in scene units.
    quad_pos: vec2<f32>,
    quad_size: vec2<f32>,
    // Shared view transform: pan in scene units, zoom in pixels per unit.
    view_offset: vec2<f32>,
    view_scale: f32,
    _pad0: f32,
    viewport_size: vec2<f32>,
    _pad1: vec2<f32>,
    // Per-object color multiplier.
    tint: vec4<f32>,
};

@group(0) @binding(0) var<uniform> u: SceneUniforms;
@group(1) @binding(0) var sprite_tex: texture_2d<f32>;
@group(1) @binding(1) var sprite_samp: sampler;
@group(2) @binding(0) var palette_tex: texture_2d<f32>;
@group(2) @binding(1) var palette_samp: sampler;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_scene(@builtin(vertex_index) vi: u32) -> VertexOutput {
    // Unit quad (0..1) as two triangles.
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(0.0, 0.0),
        vec2<f32>(1.0, 0.0),
        vec2<f32>(0.0, 1.0),
        vec2<f32>(0.0, 1.0),
        vec2<f32>(1.0, 0.0),
        vec2<f32>(1.0, 1.0),
    );
    let unit = corners[vi];

    // Scene space is y-down; (scene + offset) * scale gives pixels from the
    // viewport center. This matches Viewport::scene_to_screen exactly, which
    // is what keeps hit testing aligned with what is drawn.
    let scene_pos = u.quad_pos + unit * u.quad_size;
    let world = (scene_pos + u.view_offset) * u.view_scale;
    let ndc = vec2<f32>(
        world.x * 2.0 / u.viewport_size.x,
        -world.y * 2.0 / u.viewport_size.y,
    );

    var out: VertexOutput;
    out.position = vec4<f32>(ndc, 0.0, 1.0);
    out.uv = unit;
    return out;
}

@fragment
fn fs_scene(in: VertexOutput) -> @location(0) vec4<f32> {
    // Stage one: the palette index, read as red in [0,1] (i/255 for index i).
    let index = textureSample(sprite_tex, sprite_samp, in.uv).r;
    // Stage two: palette texel i spans [i/256, (i+1)/256) in u, and
    // i/255 lands inside texel i for every i (255 reaches the last texel
    // via clamp-to-edge), so sampling at u = index is exact.
    let color = textureSample(palette_tex, palette_samp, vec2<f32>(index, 0.5));
    return color * u.tint;
}
"#;
