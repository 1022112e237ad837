use eframe::egui;
use egui::{ColorImage, TextureHandle, TextureOptions, Vec2};
use std::collections::HashMap;

use crate::components::tools::Tool;
use crate::palette;
use crate::surface::Surface;

// ============================================================================
// BUILT-IN ART
// ============================================================================
//
// All UI art ships as ASCII grids decoded at startup: `X` is an opaque
// white pixel, anything else is transparent. Brushes double as stamp masks,
// so they stay at native resolution; icons are upscaled for the toolbar.

const DRAW_ICON: &str = "
________
_____X__
____X_X_
___X_X__
__XXX___
_X_X____
_XX_____
________
";

const LINE_ICON: &str = "
________
______X_
_____XX_
____XX__
___XX___
__XX____
_XX_____
________
";

const FILL_ICON: &str = "
________
_X_____X
_X____X_
_X__XXX_
_XXX__X_
_X____X_
__XXXX__
________
";

const MOVE_ICON: &str = "
___XX___
__XXXX__
_X_XX_X_
XXXXXXXX
XXXXXXXX
_X_XX_X_
__XXXX__
___XX___
";

const BRUSH_ART: [&str; 5] = [
    "
X
",
    "
XX
XX
",
    "
_X_
XXX
_X_
",
    "
_XX_
XXXX
XXXX
_XX_
",
    "
_XXX_
XXXXX
XXXXX
XXXXX
_XXX_
",
];

/// Decode an ASCII grid into a surface: `X` cells become opaque white.
pub fn decode_ascii(art: &str) -> Surface {
    let rows: Vec<&str> = art.lines().map(str::trim_end).filter(|l| !l.is_empty()).collect();
    let height = rows.len() as u32;
    let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0) as u32;
    let mut surface = Surface::new(width, height);
    surface.with_pixels(|px| {
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                if ch == 'X' {
                    px[y * width as usize + x] = 0xFFFF_FFFF;
                }
            }
        }
    });
    surface
}

/// The built-in brush masks, smallest first.
pub fn brush_catalog() -> Vec<Surface> {
    BRUSH_ART.iter().map(|art| decode_ascii(art)).collect()
}

/// Nearest-neighbor upscale of a surface into an egui image.
fn icon_image(surface: &Surface, scale: u32) -> ColorImage {
    let w = surface.width() as usize * scale as usize;
    let h = surface.height() as usize * scale as usize;
    let mut rgba = vec![0u8; w * h * 4];
    for y in 0..h {
        for x in 0..w {
            let src = surface
                .get((x as u32 / scale) as i32, (y as u32 / scale) as i32)
                .unwrap_or(0);
            let dst = (y * w + x) * 4;
            rgba[dst..dst + 4].copy_from_slice(&palette::unpack(src));
        }
    }
    ColorImage::from_rgba_unmultiplied([w, h], &rgba)
}

/// Raw RGBA for the window icon (the draw tool art, upscaled).
pub fn app_icon_rgba() -> (Vec<u8>, u32, u32) {
    let surface = decode_ascii(DRAW_ICON);
    let image = icon_image(&surface, 8);
    let [w, h] = image.size;
    let mut rgba = Vec::with_capacity(w * h * 4);
    for px in &image.pixels {
        rgba.extend_from_slice(&px.to_array());
    }
    (rgba, w as u32, h as u32)
}

// ============================================================================
// ASSET MANAGER
// ============================================================================

/// Owns the UI textures for tool and brush buttons.
pub struct Assets {
    tool_textures: HashMap<Tool, TextureHandle>,
    brush_textures: Vec<TextureHandle>,
}

impl Assets {
    /// Decode and upload every built-in texture. Cheap; called once at
    /// startup.
    pub fn load(ctx: &egui::Context) -> Self {
        let mut tool_textures = HashMap::new();
        for (tool, art) in [
            (Tool::Draw, DRAW_ICON),
            (Tool::Line, LINE_ICON),
            (Tool::Fill, FILL_ICON),
            (Tool::Move, MOVE_ICON),
        ] {
            let image = icon_image(&decode_ascii(art), 3);
            tool_textures.insert(
                tool,
                ctx.load_texture(format!("icon_{:?}", tool), image, TextureOptions::NEAREST),
            );
        }

        let brush_textures = brush_catalog()
            .iter()
            .enumerate()
            .map(|(i, mask)| {
                let image = icon_image(mask, 4);
                ctx.load_texture(format!("brush_{}", i), image, TextureOptions::NEAREST)
            })
            .collect();

        Self {
            tool_textures,
            brush_textures,
        }
    }

    /// Selectable tool button; falls back to a text label if the texture is
    /// missing. Returns true when clicked.
    pub fn tool_button(&self, ui: &mut egui::Ui, tool: Tool, selected: bool) -> bool {
        let size = Vec2::splat(32.0);
        let response = if let Some(texture) = self.tool_textures.get(&tool) {
            let sized_texture = egui::load::SizedTexture::from_handle(texture);
            let img = egui::Image::from_texture(sized_texture).fit_to_exact_size(size * 0.75);
            let mut button = egui::Button::image(img);
            if selected {
                button = button.fill(ui.visuals().selection.bg_fill);
            }
            ui.add_sized(size, button)
        } else {
            ui.add_sized(size, egui::SelectableLabel::new(selected, tool.label()))
        };
        response.on_hover_text(tool.label()).clicked()
    }

    /// Selectable brush-size button. Returns true when clicked.
    pub fn brush_button(&self, ui: &mut egui::Ui, index: usize, selected: bool) -> bool {
        let size = Vec2::splat(28.0);
        let response = if let Some(texture) = self.brush_textures.get(index) {
            let sized_texture = egui::load::SizedTexture::from_handle(texture);
            let img = egui::Image::from_texture(sized_texture).fit_to_exact_size(size * 0.75);
            let mut button = egui::Button::image(img);
            if selected {
                button = button.fill(ui.visuals().selection.bg_fill);
            }
            ui.add_sized(size, button)
        } else {
            let label = format!("{}", index + 1);
            ui.add_sized(size, egui::SelectableLabel::new(selected, label))
        };
        response.on_hover_text(format!("Brush {}", index + 1)).clicked()
    }
}
