use eframe::egui;

/// Largest object size offered by the dialog; well under every GPU texture
/// limit and the document loader's cap.
const MAX_OBJECT_DIM: f32 = 1024.0;

/// Modal for creating a new scene object.
pub struct NewObjectDialog {
    pub open: bool,
    width: f32,
    height: f32,
}

impl Default for NewObjectDialog {
    fn default() -> Self {
        Self {
            open: false,
            width: 64.0,
            height: 64.0,
        }
    }
}

impl NewObjectDialog {
    /// Show the dialog and return Some((width, height)) when confirmed.
    /// Enter confirms, Escape cancels.
    pub fn show(&mut self, ctx: &egui::Context) -> Option<(u32, u32)> {
        let mut result = None;
        let mut should_close = false;

        if self.open {
            let enter = ctx.input_mut(|i| i.consume_key(egui::Modifiers::NONE, egui::Key::Enter));
            let esc = ctx.input_mut(|i| i.consume_key(egui::Modifiers::NONE, egui::Key::Escape));
            if enter {
                result = Some(self.size());
                should_close = true;
            }
            if esc {
                should_close = true;
            }

            egui::Window::new("New object")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    egui::Grid::new("new_object_dims")
                        .num_columns(2)
                        .spacing([8.0, 6.0])
                        .show(ui, |ui| {
                            ui.label("Width");
                            ui.add(
                                egui::DragValue::new(&mut self.width)
                                    .speed(1.0)
                                    .clamp_range(1.0..=MAX_OBJECT_DIM),
                            );
                            ui.end_row();

                            ui.label("Height");
                            ui.add(
                                egui::DragValue::new(&mut self.height)
                                    .speed(1.0)
                                    .clamp_range(1.0..=MAX_OBJECT_DIM),
                            );
                            ui.end_row();
                        });

                    ui.add_space(6.0);
                    ui.horizontal(|ui| {
                        if ui.button("Create").clicked() {
                            result = Some(self.size());
                            should_close = true;
                        }
                        if ui.button("Cancel").clicked() {
                            should_close = true;
                        }
                    });
                });
        }

        if should_close {
            self.open = false;
        }
        result
    }

    fn size(&self) -> (u32, u32) {
        (
            self.width.round().max(1.0) as u32,
            self.height.round().max(1.0) as u32,
        )
    }
}
