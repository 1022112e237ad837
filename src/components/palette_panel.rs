use eframe::egui;
use egui::{Color32, Pos2, Sense, Stroke, Vec2};

use crate::editor::Editor;
use crate::palette::{self, PALETTE_SLOTS};

/// The palette side panel: swatch strip, slot editing, and slot-wide erase.
pub struct PalettePanel {
    /// Slot whose color is being edited, if any. Never slot 0.
    editing: Option<usize>,
    hex_field: String,
}

impl PalettePanel {
    pub fn new() -> Self {
        Self {
            editing: None,
            hex_field: String::new(),
        }
    }

    pub fn show(&mut self, ui: &mut egui::Ui, editor: &mut Editor) {
        ui.strong("Palette");
        ui.add_space(4.0);

        // -- swatch strip --
        let mut edit_request = None;
        let mut erase_request = None;
        ui.horizontal_wrapped(|ui| {
            ui.spacing_mut().item_spacing = Vec2::splat(3.0);
            for (i, &color) in editor.palette.colors().iter().enumerate() {
                let selected = editor.color_index as usize == i;
                let response = swatch(ui, to_color32(color), selected, i == 0);
                if response.clicked() {
                    editor.color_index = i as u8;
                }
                if response.double_clicked() && i != 0 {
                    edit_request = Some(i);
                }
                if i != 0 {
                    response.context_menu(|ui| {
                        if ui.button("Edit color").clicked() {
                            edit_request = Some(i);
                            ui.close_menu();
                        }
                        if ui.button("Erase pixels using this slot").clicked() {
                            erase_request = Some(i);
                            ui.close_menu();
                        }
                    });
                } else {
                    response.on_hover_text("Transparent (erase)");
                }
            }
        });
        if let Some(slot) = erase_request {
            editor.erase_slot_usage(slot as u8);
        }
        if let Some(slot) = edit_request {
            self.editing = Some(slot);
            self.hex_field = palette::to_hex(editor.palette.colors()[slot]);
        }

        // -- add slot --
        ui.add_space(4.0);
        ui.horizontal(|ui| {
            let full = editor.palette.len() >= PALETTE_SLOTS;
            if ui.add_enabled(!full, egui::Button::new("+ Add color")).clicked() {
                if let Some(slot) = editor.push_palette_color(palette::pack(255, 255, 255, 255)) {
                    editor.color_index = slot as u8;
                    self.editing = Some(slot);
                    self.hex_field = "#ffffff".to_string();
                }
            }
            ui.label(format!("{} / {}", editor.palette.len(), PALETTE_SLOTS));
        });

        // -- slot editor --
        if let Some(slot) = self.editing {
            if slot == 0 || slot >= editor.palette.len() {
                self.editing = None;
            }
        }
        if let Some(slot) = self.editing {
            ui.separator();
            ui.label(format!("Slot {}", slot));

            let [r, g, b, _] = palette::unpack(editor.palette.colors()[slot]);
            let mut rgb = [r, g, b];
            if ui.color_edit_button_srgb(&mut rgb).changed() {
                let color = palette::pack(rgb[0], rgb[1], rgb[2], 0xFF);
                editor.set_palette_color(slot, color);
                self.hex_field = palette::to_hex(color);
            }

            ui.horizontal(|ui| {
                ui.label("Hex");
                let response =
                    ui.add(egui::TextEdit::singleline(&mut self.hex_field).desired_width(70.0));
                if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                    if let Some(color) = palette::from_hex(&self.hex_field) {
                        editor.set_palette_color(slot, color);
                    }
                    self.hex_field = palette::to_hex(editor.palette.colors()[slot]);
                }
            });

            if ui.button("Done").clicked() {
                self.editing = None;
            }
        }
    }
}

impl Default for PalettePanel {
    fn default() -> Self {
        Self::new()
    }
}

fn to_color32(color: u32) -> Color32 {
    let [r, g, b, a] = palette::unpack(color);
    Color32::from_rgba_unmultiplied(r, g, b, a)
}

/// One palette swatch; the transparent slot gets a checkerboard.
fn swatch(ui: &mut egui::Ui, color: Color32, selected: bool, transparent: bool) -> egui::Response {
    let (rect, response) = ui.allocate_exact_size(Vec2::splat(22.0), Sense::click());
    if ui.is_rect_visible(rect) {
        let p = ui.painter();
        if transparent {
            draw_checkerboard(p, rect, 5.5);
        } else {
            p.rect_filled(rect, 2.0, color);
        }
        let border = if selected {
            Stroke::new(2.0, ui.visuals().selection.stroke.color)
        } else {
            Stroke::new(1.0, ui.visuals().widgets.noninteractive.bg_stroke.color)
        };
        p.rect_stroke(rect, 2.0, border);
    }
    response
}

/// Draw a checkerboard pattern inside `rect` (transparency preview).
fn draw_checkerboard(painter: &egui::Painter, rect: egui::Rect, cell: f32) {
    painter.rect_filled(rect, 0.0, Color32::WHITE);
    let cols = (rect.width() / cell).ceil() as i32;
    let rows = (rect.height() / cell).ceil() as i32;
    for row in 0..rows {
        for col in 0..cols {
            if (row + col) % 2 == 1 {
                let cr = egui::Rect::from_min_size(
                    Pos2::new(rect.min.x + col as f32 * cell, rect.min.y + row as f32 * cell),
                    Vec2::new(cell, cell),
                )
                .intersect(rect);
                painter.rect_filled(cr, 0.0, Color32::from_gray(200));
            }
        }
    }
}
