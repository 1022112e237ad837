use eframe::egui;
use egui::{Color32, ColorImage, TextureHandle, TextureOptions};

use crate::assets::Assets;
use crate::components::dialogs::NewObjectDialog;
use crate::components::palette_panel::PalettePanel;
use crate::components::tools::{PointerInput, Tool};
use crate::editor::Editor;
use crate::gpu::SceneRenderer;
use crate::io;
use crate::scene::Viewport;
use crate::{log_err, log_info};

pub struct PixelPadApp {
    editor: Editor,
    /// `None` when no GPU adapter (hardware or software) could be acquired;
    /// the editor keeps working, the canvas just shows a notice.
    renderer: Option<SceneRenderer>,
    assets: Assets,
    palette_panel: PalettePanel,
    new_object_dialog: NewObjectDialog,

    /// The composited scene, re-presented through egui each frame.
    scene_texture: Option<TextureHandle>,
    /// Canvas size in physical pixels, for keyboard zoom anchoring.
    last_viewport_px: [f32; 2],
    status: String,
}

impl PixelPadApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let renderer = SceneRenderer::create();
        let status = match &renderer {
            Some(r) => format!("Renderer: {}", r.adapter_name()),
            None => {
                log_err!("no usable GPU adapter; scene rendering disabled");
                "GPU unavailable".to_string()
            }
        };

        Self {
            editor: Editor::new(),
            renderer,
            assets: Assets::load(&cc.egui_ctx),
            palette_panel: PalettePanel::new(),
            new_object_dialog: NewObjectDialog::default(),
            scene_texture: None,
            last_viewport_px: [0.0, 0.0],
            status,
        }
    }

    // ------------------------------------------------------------------
    // file operations
    // ------------------------------------------------------------------

    fn open_document(&mut self) {
        let Some(path) = io::pick_open_path() else {
            return;
        };
        // Some platforms treat dialog filters as advisory; anything that is
        // not a document opens as an imported image instead.
        if !io::is_document_path(&path) {
            self.import_from(path);
            return;
        }
        match io::load_document(&path) {
            Ok(loaded) => {
                self.editor.adopt(loaded);
                self.status = format!("Opened {}", path.display());
            }
            Err(e) => {
                log_err!("open {:?} failed: {}", path, e);
                self.status = format!("Open failed: {}", e);
            }
        }
    }

    fn save_document(&mut self) {
        let Some(path) = io::pick_save_path() else {
            return;
        };
        match io::save_document(
            &path,
            &self.editor.palette,
            &self.editor.objects,
            &self.editor.store,
            self.editor.active_object,
        ) {
            Ok(()) => {
                log_info!("saved document to {:?}", path);
                self.status = format!("Saved {}", path.display());
            }
            Err(e) => {
                log_err!("save {:?} failed: {}", path, e);
                self.status = format!("Save failed: {}", e);
            }
        }
    }

    fn import_image(&mut self) {
        let Some(path) = io::pick_import_path() else {
            return;
        };
        self.import_from(path);
    }

    fn import_from(&mut self, path: std::path::PathBuf) {
        match io::import_image(&path, &self.editor.palette) {
            Ok(surface) => {
                self.status = format!(
                    "Imported {} ({}x{})",
                    path.display(),
                    surface.width(),
                    surface.height()
                );
                self.editor.add_imported(surface);
            }
            Err(e) => {
                log_err!("import {:?} failed: {}", path, e);
                self.status = format!("Import failed: {}", e);
            }
        }
    }

    fn export_png(&mut self) {
        let Some(surface) = self.editor.active_surface() else {
            self.status = "Nothing to export".to_string();
            return;
        };
        let Some(path) = io::pick_export_path() else {
            return;
        };
        match io::export_png(&path, surface, &self.editor.palette) {
            Ok(()) => {
                log_info!("exported PNG to {:?}", path);
                self.status = format!("Exported {}", path.display());
            }
            Err(e) => {
                log_err!("export {:?} failed: {}", path, e);
                self.status = format!("Export failed: {}", e);
            }
        }
    }

    // ------------------------------------------------------------------
    // chrome
    // ------------------------------------------------------------------

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        for (key, tool) in [
            (egui::Key::B, Tool::Draw),
            (egui::Key::L, Tool::Line),
            (egui::Key::F, Tool::Fill),
            (egui::Key::V, Tool::Move),
        ] {
            if ctx.input(|i| i.key_pressed(key)) {
                self.editor.tool = tool;
            }
        }
        for (index, key) in [
            egui::Key::Num1,
            egui::Key::Num2,
            egui::Key::Num3,
            egui::Key::Num4,
            egui::Key::Num5,
        ]
        .into_iter()
        .enumerate()
        {
            if ctx.input(|i| i.key_pressed(key)) && index < self.editor.brushes.len() {
                self.editor.brush_index = index;
            }
        }
        if ctx.input(|i| i.key_pressed(egui::Key::Delete)) {
            self.editor.delete_active();
        }
        let vp = self.last_viewport_px;
        if vp[0] > 0.0 {
            let center = [vp[0] * 0.5, vp[1] * 0.5];
            if ctx.input(|i| i.key_pressed(egui::Key::PlusEquals)) {
                self.editor.view.zoom_at(1.25, center, vp);
            }
            if ctx.input(|i| i.key_pressed(egui::Key::Minus)) {
                self.editor.view.zoom_at(0.8, center, vp);
            }
        }
    }

    fn show_menu_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("New").clicked() {
                        self.editor.new_document();
                        ui.close_menu();
                    }
                    if ui.button("Open...").clicked() {
                        self.open_document();
                        ui.close_menu();
                    }
                    if ui.button("Save As...").clicked() {
                        self.save_document();
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.button("Import image...").clicked() {
                        self.import_image();
                        ui.close_menu();
                    }
                    if ui.button("Export PNG...").clicked() {
                        self.export_png();
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });
                ui.menu_button("Object", |ui| {
                    if ui.button("New object...").clicked() {
                        self.new_object_dialog.open = true;
                        ui.close_menu();
                    }
                    let deletable =
                        !self.editor.objects.is_empty() && !self.editor.gesture_active();
                    if ui
                        .add_enabled(deletable, egui::Button::new("Delete object"))
                        .clicked()
                    {
                        self.editor.delete_active();
                        ui.close_menu();
                    }
                });
                ui.menu_button("View", |ui| {
                    if ui.button("Reset view").clicked() {
                        self.editor.view = Viewport::new();
                        ui.close_menu();
                    }
                });
            });
        });
    }

    fn show_toolbar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                for tool in Tool::ALL {
                    if self.assets.tool_button(ui, tool, self.editor.tool == tool) {
                        self.editor.tool = tool;
                    }
                }
                ui.separator();
                for index in 0..self.editor.brushes.len() {
                    if self
                        .assets
                        .brush_button(ui, index, self.editor.brush_index == index)
                    {
                        self.editor.brush_index = index;
                    }
                }
            });
        });
    }

    fn show_side_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::right("side_panel")
            .default_width(200.0)
            .show(ctx, |ui| {
                self.palette_panel.show(ui, &mut self.editor);

                ui.separator();
                ui.strong("Objects");
                let mut select = None;
                for (i, object) in self.editor.objects.iter().enumerate() {
                    let label = match self.editor.store.get(object.surface) {
                        Some(s) => format!("Object {} ({}x{})", i + 1, s.width(), s.height()),
                        None => format!("Object {}", i + 1),
                    };
                    if ui
                        .selectable_label(self.editor.active_object == i, label)
                        .clicked()
                    {
                        select = Some(i);
                    }
                }
                if let Some(i) = select {
                    self.editor.active_object = i;
                }
                if ui.button("+ New object...").clicked() {
                    self.new_object_dialog.open = true;
                }
            });
    }

    fn show_status_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(self.editor.tool.label());
                ui.separator();
                ui.label(format!("{:.0}x", self.editor.view.scale));
                ui.separator();
                if self.renderer.is_none() {
                    ui.colored_label(Color32::LIGHT_RED, "no GPU");
                    ui.separator();
                }
                ui.label(&self.status);
            });
        });
    }

    // ------------------------------------------------------------------
    // canvas
    // ------------------------------------------------------------------

    fn show_canvas(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default()
            .frame(egui::Frame {
                fill: Color32::from_gray(24),
                ..Default::default()
            })
            .show(ctx, |ui| {
                let sense = egui::Sense::click_and_drag().union(egui::Sense::hover());
                let (response, painter) = ui.allocate_painter(ui.available_size(), sense);
                let rect = response.rect;
                let ppp = ctx.pixels_per_point();
                let viewport_px = [rect.width() * ppp, rect.height() * ppp];
                self.last_viewport_px = viewport_px;

                let (middle_down, space_down) = ui.input(|i| {
                    (i.pointer.middle_down(), i.key_down(egui::Key::Space))
                });
                let panning = middle_down || space_down;

                // Pan with middle-button drag, or any drag while Space is
                // held.
                if response.dragged() && panning {
                    let delta = response.drag_delta();
                    self.editor.view.pan_by_screen(delta.x * ppp, delta.y * ppp);
                }

                // Zoom with the scroll wheel, anchored under the pointer.
                if let Some(hover) = response.hover_pos() {
                    let scroll = ui.input(|i| i.scroll_delta.y);
                    if scroll.abs() > 0.1 {
                        let factor = (scroll * 0.005).exp();
                        let anchor = [(hover.x - rect.min.x) * ppp, (hover.y - rect.min.y) * ppp];
                        self.editor.view.zoom_at(factor, anchor, viewport_px);
                    }
                }

                // Route pointer phases to the editor in scene coordinates.
                // `interact_pointer_pos` keeps positions flowing when a drag
                // wanders off the panel.
                let pointer_scene = response
                    .hover_pos()
                    .or_else(|| response.interact_pointer_pos())
                    .map(|pos| {
                        let px = [(pos.x - rect.min.x) * ppp, (pos.y - rect.min.y) * ppp];
                        self.editor.view.screen_to_scene(px, viewport_px)
                    });

                let (pressed, down, released, modifiers) = ui.input(|i| {
                    (
                        i.pointer.primary_pressed(),
                        i.pointer.primary_down(),
                        i.pointer.primary_released(),
                        i.modifiers,
                    )
                });

                if let Some(scene) = pointer_scene {
                    let input = PointerInput {
                        scene,
                        shift: modifiers.shift,
                        alt: modifiers.alt,
                    };
                    if pressed && response.hovered() && !panning {
                        self.editor.pointer_down(input);
                    } else if released {
                        self.editor.pointer_up(input);
                    } else if down || response.hovered() {
                        self.editor.pointer_move(input);
                    }
                } else if !down {
                    self.editor.pointer_left();
                }

                self.present_scene(ctx, rect, viewport_px, &painter);
            });
    }

    /// Drain the editor's flush sets into the renderer, composite, and
    /// paint the result over the canvas rect.
    fn present_scene(
        &mut self,
        ctx: &egui::Context,
        rect: egui::Rect,
        viewport_px: [f32; 2],
        painter: &egui::Painter,
    ) {
        let Some(renderer) = &mut self.renderer else {
            // Keep the sets drained so they don't grow for the whole
            // session.
            self.editor.take_dirty();
            self.editor.take_disposed();
            self.editor.take_palette_dirty();
            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                "GPU unavailable",
                egui::FontId::proportional(16.0),
                Color32::GRAY,
            );
            return;
        };

        for id in self.editor.take_disposed() {
            renderer.dispose_surface(id);
        }
        if self.editor.take_palette_dirty() {
            renderer.set_palette(&self.editor.palette);
        }
        for id in self.editor.take_dirty() {
            if let Some(surface) = self.editor.store.get(id) {
                renderer.flush_surface(id, surface);
            }
        }

        let width = viewport_px[0].round() as u32;
        let height = viewport_px[1].round() as u32;
        let draw_list = self.editor.draw_list();
        let pixels = renderer.render_scene(
            &draw_list,
            &self.editor.store,
            &self.editor.view,
            width,
            height,
        );
        if pixels.len() == (width as usize) * (height as usize) * 4 {
            let image =
                ColorImage::from_rgba_unmultiplied([width as usize, height as usize], &pixels);
            match &mut self.scene_texture {
                Some(texture) => texture.set(image, TextureOptions::NEAREST),
                None => {
                    self.scene_texture = Some(ctx.load_texture("scene", image, TextureOptions::NEAREST))
                }
            }
        }
        if let Some(texture) = &self.scene_texture {
            let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
            painter.image(texture.id(), rect, uv, Color32::WHITE);
        }
    }
}

impl eframe::App for PixelPadApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_shortcuts(ctx);
        self.show_menu_bar(ctx);
        self.show_toolbar(ctx);
        self.show_side_panel(ctx);
        self.show_status_bar(ctx);

        if let Some((width, height)) = self.new_object_dialog.show(ctx) {
            self.editor.add_object(width, height);
        }

        self.show_canvas(ctx);

        // The cursor preview and scene readback refresh every frame, like
        // an animation loop.
        ctx.request_repaint();
    }
}
