//! The editor coordinator.
//!
//! One struct owns the whole document (scene objects, their surfaces, the
//! palette), the viewport, and all tool state. Every mutation funnels
//! through here, which is what keeps the GPU flush set honest: anything
//! that touches pixels lands in the dirty set, anything that drops a
//! surface lands in the dispose set, and the app drains both each frame.
//!
//! The renderer never appears here. The editor works the same with or
//! without a GPU; presentation consumes `draw_list()` and the dirty/dispose
//! sets however it can.

use std::collections::HashMap;

use crate::assets;
use crate::components::tools::{self, Gesture, PointerInput, Tool};
use crate::io::LoadedDocument;
use crate::log_info;
use crate::palette::{self, Palette};
use crate::scene::{self, SceneObject, SurfaceId, SurfaceStore, Viewport};
use crate::surface::Surface;

/// Starter document canvas size.
const STARTER_SIZE: u32 = 64;

/// Tint for the cursor preview overlay.
const PREVIEW_TINT: [f32; 4] = [1.0, 1.0, 1.0, 0.6];

pub struct Editor {
    pub store: SurfaceStore,
    pub objects: Vec<SceneObject>,
    pub palette: Palette,
    pub view: Viewport,

    pub tool: Tool,
    pub brushes: Vec<Surface>,
    pub brush_index: usize,
    /// Palette slot applied by drawing tools; slot 0 erases.
    pub color_index: u8,
    pub active_object: usize,

    gesture: Option<Gesture>,
    /// Final stamp position of the last draw gesture, per surface, for
    /// Shift-connected strokes.
    connect_anchor: HashMap<SurfaceId, (i32, i32)>,
    /// Pointer position in scene space, while the pointer is over the
    /// canvas.
    last_pointer: Option<[f32; 2]>,

    /// Cursor preview overlay: kept out of `objects` so hit testing and
    /// saving never see it.
    preview_surface: Option<SurfaceId>,
    preview_at: Option<usize>,

    dirty: Vec<SurfaceId>,
    disposed: Vec<SurfaceId>,
    palette_dirty: bool,
}

impl Editor {
    /// A fresh session: starter palette and one blank canvas centered on
    /// the origin.
    pub fn new() -> Self {
        let mut editor = Self {
            store: SurfaceStore::new(),
            objects: Vec::new(),
            palette: Palette::starter(),
            view: Viewport::new(),
            tool: Tool::Draw,
            brushes: assets::brush_catalog(),
            brush_index: 0,
            color_index: 1,
            active_object: 0,
            gesture: None,
            connect_anchor: HashMap::new(),
            last_pointer: None,
            preview_surface: None,
            preview_at: None,
            dirty: Vec::new(),
            disposed: Vec::new(),
            palette_dirty: true,
        };
        editor.add_object(STARTER_SIZE, STARTER_SIZE);
        editor
    }

    pub fn current_brush(&self) -> &Surface {
        &self.brushes[self.brush_index.min(self.brushes.len() - 1)]
    }

    pub fn current_color(&self) -> u32 {
        palette::index_color(self.color_index)
    }

    pub fn gesture_active(&self) -> bool {
        self.gesture.is_some()
    }

    pub fn active_surface(&self) -> Option<&Surface> {
        self.objects
            .get(self.active_object)
            .and_then(|object| self.store.get(object.surface))
    }

    // ------------------------------------------------------------------
    // pointer phases
    // ------------------------------------------------------------------

    pub fn pointer_down(&mut self, input: PointerInput) {
        self.last_pointer = Some(input.scene);
        if self.gesture.is_some() {
            return;
        }

        if input.alt {
            self.eyedrop(input.scene);
            self.refresh_preview();
            return;
        }

        let Some(index) = scene::hit_test(&self.objects, &self.store, input.scene[0], input.scene[1])
        else {
            // Empty space swallows the click.
            return;
        };
        self.active_object = index;

        let object = self.objects[index];
        let local = object.local(input.scene[0], input.scene[1]);
        let color = palette::index_color(self.color_index);
        let connect_from = self.connect_anchor.get(&object.surface).copied();

        let brush = &self.brushes[self.brush_index.min(self.brushes.len() - 1)];
        let Some(surface) = self.store.get_mut(object.surface) else {
            return;
        };
        let outcome = tools::start(
            self.tool,
            index,
            surface,
            brush,
            color,
            local,
            &input,
            connect_from,
        );
        if outcome.mutated {
            self.mark_dirty(object.surface);
        }
        self.gesture = outcome.gesture;
        self.refresh_preview();
    }

    pub fn pointer_move(&mut self, input: PointerInput) {
        self.last_pointer = Some(input.scene);

        if let Some(mut gesture) = self.gesture {
            match &mut gesture {
                Gesture::Stroke { object, last } => {
                    if let Some(scene_object) = self.objects.get(*object).copied() {
                        let local = scene_object.local(input.scene[0], input.scene[1]);
                        let color = palette::index_color(self.color_index);
                        let brush = &self.brushes[self.brush_index.min(self.brushes.len() - 1)];
                        if let Some(surface) = self.store.get_mut(scene_object.surface) {
                            if tools::stroke_move(last, surface, brush, color, local) {
                                self.mark_dirty(scene_object.surface);
                            }
                        }
                    }
                }
                Gesture::Line { .. } | Gesture::Fill { .. } => {}
                Gesture::Drag { object, grab } => {
                    if let Some(scene_object) = self.objects.get_mut(*object) {
                        scene_object.x = input.scene[0].floor() as i32 - grab.0;
                        scene_object.y = input.scene[1].floor() as i32 - grab.1;
                    }
                }
            }
            self.gesture = Some(gesture);
        }

        self.refresh_preview();
    }

    pub fn pointer_up(&mut self, input: PointerInput) {
        self.last_pointer = Some(input.scene);

        match self.gesture.take() {
            Some(Gesture::Stroke { object, last }) => {
                if let Some(scene_object) = self.objects.get(object) {
                    self.connect_anchor.insert(scene_object.surface, last);
                }
            }
            Some(Gesture::Line { object, anchor }) => {
                if let Some(scene_object) = self.objects.get(object).copied() {
                    let local = scene_object.local(input.scene[0], input.scene[1]);
                    let color = palette::index_color(self.color_index);
                    let brush = &self.brushes[self.brush_index.min(self.brushes.len() - 1)];
                    if let Some(surface) = self.store.get_mut(scene_object.surface) {
                        if tools::line_commit(anchor, surface, brush, color, local) {
                            self.mark_dirty(scene_object.surface);
                        }
                    }
                }
            }
            Some(Gesture::Fill { .. }) | Some(Gesture::Drag { .. }) | None => {}
        }

        self.refresh_preview();
    }

    /// Pointer left the canvas: hide the preview. An in-flight gesture
    /// stays active until the button is released.
    pub fn pointer_left(&mut self) {
        self.last_pointer = None;
        self.refresh_preview();
    }

    fn eyedrop(&mut self, at: [f32; 2]) {
        let Some(index) = scene::hit_test(&self.objects, &self.store, at[0], at[1]) else {
            return;
        };
        let object = self.objects[index];
        let Some(surface) = self.store.get(object.surface) else {
            return;
        };
        let local = object.local(at[0], at[1]);
        if let Some(px) = surface.get(local.0, local.1) {
            // Transparent pixels pick the erase slot, which is what the
            // pointer is visibly over.
            self.color_index = palette::pixel_index(px);
        }
    }

    // ------------------------------------------------------------------
    // cursor preview overlay
    // ------------------------------------------------------------------

    /// Redraw the preview overlay for the current pointer and tool state.
    /// During a gesture the overlay stays on the gesture's target; hover
    /// retargeting only happens between gestures.
    fn refresh_preview(&mut self) {
        let Some(pointer) = self.last_pointer else {
            self.preview_at = None;
            return;
        };

        let target = if let Some(gesture) = &self.gesture {
            Some(gesture.object())
        } else {
            scene::hit_test(&self.objects, &self.store, pointer[0], pointer[1])
        };
        let Some(index) = target else {
            self.preview_at = None;
            return;
        };
        let Some(object) = self.objects.get(index).copied() else {
            self.preview_at = None;
            return;
        };
        let Some((width, height)) = self
            .store
            .get(object.surface)
            .map(|s| (s.width(), s.height()))
        else {
            self.preview_at = None;
            return;
        };

        let overlay_id = self.ensure_overlay(width, height);
        let local = object.local(pointer[0], pointer[1]);
        let color = palette::index_color(self.color_index);
        let brush = &self.brushes[self.brush_index.min(self.brushes.len() - 1)];
        let gesture = self.gesture;
        if let Some(overlay) = self.store.get_mut(overlay_id) {
            tools::draw_cursor(overlay, gesture.as_ref(), self.tool, brush, color, local);
        }
        self.mark_dirty(overlay_id);
        self.preview_at = Some(index);
    }

    /// The overlay surface matching the target size, recreating it (and
    /// queueing the old one for disposal) when the size changes.
    fn ensure_overlay(&mut self, width: u32, height: u32) -> SurfaceId {
        if let Some(id) = self.preview_surface {
            if let Some(surface) = self.store.get(id) {
                if surface.width() == width && surface.height() == height {
                    return id;
                }
            }
            self.store.remove(id);
            self.disposed.push(id);
        }
        let id = self.store.insert(Surface::new(width, height));
        self.preview_surface = Some(id);
        id
    }

    /// The objects to composite this frame, bottom to top: the document
    /// objects, then the ghost cursor overlay when visible.
    pub fn draw_list(&self) -> Vec<SceneObject> {
        let mut list = self.objects.clone();
        if let (Some(index), Some(overlay)) = (self.preview_at, self.preview_surface) {
            if let Some(object) = self.objects.get(index) {
                list.push(
                    SceneObject::new(overlay, object.x, object.y).with_tint(PREVIEW_TINT),
                );
            }
        }
        list
    }

    // ------------------------------------------------------------------
    // object management
    // ------------------------------------------------------------------

    /// Create a blank object centered in the current view and make it
    /// active.
    pub fn add_object(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.add_surface(Surface::new(width, height));
    }

    /// Add an already-filled surface (an imported image) as a new object.
    pub fn add_imported(&mut self, surface: Surface) {
        self.add_surface(surface);
    }

    fn add_surface(&mut self, surface: Surface) {
        let (width, height) = (surface.width(), surface.height());
        let id = self.store.insert(surface);
        let x = (-self.view.offset[0] - width as f32 / 2.0).floor() as i32;
        let y = (-self.view.offset[1] - height as f32 / 2.0).floor() as i32;
        self.objects.push(SceneObject::new(id, x, y));
        self.active_object = self.objects.len() - 1;
        self.mark_dirty(id);
        log_info!("added {}x{} object as {:?}", width, height, id);
    }

    /// Remove the active object and queue its surface for disposal.
    pub fn delete_active(&mut self) {
        if self.gesture.is_some() || self.active_object >= self.objects.len() {
            return;
        }
        let object = self.objects.remove(self.active_object);
        self.store.remove(object.surface);
        self.connect_anchor.remove(&object.surface);
        self.disposed.push(object.surface);
        if self.active_object >= self.objects.len() && self.active_object > 0 {
            self.active_object -= 1;
        }
        self.preview_at = None;
        log_info!("deleted object {:?}", object.surface);
    }

    // ------------------------------------------------------------------
    // palette operations
    // ------------------------------------------------------------------

    pub fn set_palette_color(&mut self, slot: usize, color: u32) {
        self.palette.set(slot, color);
        self.palette_dirty = true;
    }

    pub fn push_palette_color(&mut self, color: u32) -> Option<usize> {
        let slot = self.palette.push(color);
        if slot.is_some() {
            self.palette_dirty = true;
        }
        slot
    }

    /// Erase every pixel using the given slot across all objects (bulk
    /// reindex to the transparent slot).
    pub fn erase_slot_usage(&mut self, slot: u8) {
        if slot == 0 {
            return;
        }
        let mut table = HashMap::new();
        table.insert(palette::index_color(slot), 0u32);
        let ids: Vec<SurfaceId> = self.objects.iter().map(|o| o.surface).collect();
        for id in ids {
            if let Some(surface) = self.store.get_mut(id) {
                surface.remap(&table);
            }
            self.mark_dirty(id);
        }
    }

    // ------------------------------------------------------------------
    // documents
    // ------------------------------------------------------------------

    /// Throw the scene away and start over with the starter document.
    pub fn new_document(&mut self) {
        self.reset_scene();
        self.palette = Palette::starter();
        self.palette_dirty = true;
        self.view = Viewport::new();
        self.color_index = 1;
        self.add_object(STARTER_SIZE, STARTER_SIZE);
        log_info!("new document");
    }

    /// Replace the scene with a loaded document.
    pub fn adopt(&mut self, loaded: LoadedDocument) {
        self.reset_scene();
        self.palette = loaded.palette;
        self.palette_dirty = true;
        self.view = Viewport::new();
        for object in loaded.objects {
            let id = self.store.insert(object.surface);
            self.objects.push(
                SceneObject::new(id, object.x, object.y).with_tint(object.tint),
            );
            self.mark_dirty(id);
        }
        self.active_object = loaded.active_object.min(self.objects.len().saturating_sub(1));
        log_info!("loaded document with {} objects", self.objects.len());
    }

    /// Drop every surface in the scene, queueing GPU disposal for each.
    /// The store keeps issuing fresh handles, so disposed ids can never
    /// alias the replacement scene.
    fn reset_scene(&mut self) {
        for object in self.objects.drain(..) {
            self.store.remove(object.surface);
            self.disposed.push(object.surface);
        }
        if let Some(id) = self.preview_surface.take() {
            self.store.remove(id);
            self.disposed.push(id);
        }
        self.connect_anchor.clear();
        self.gesture = None;
        self.preview_at = None;
        self.active_object = 0;
    }

    // ------------------------------------------------------------------
    // frame handoff
    // ------------------------------------------------------------------

    fn mark_dirty(&mut self, id: SurfaceId) {
        if !self.dirty.contains(&id) {
            self.dirty.push(id);
        }
    }

    /// Surfaces mutated since the last call; the caller re-uploads each.
    pub fn take_dirty(&mut self) -> Vec<SurfaceId> {
        std::mem::take(&mut self.dirty)
    }

    /// Surfaces dropped since the last call; the caller releases their
    /// textures.
    pub fn take_disposed(&mut self) -> Vec<SurfaceId> {
        std::mem::take(&mut self.disposed)
    }

    /// Whether the palette changed since the last call.
    pub fn take_palette_dirty(&mut self) -> bool {
        std::mem::take(&mut self.palette_dirty)
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::index_color;

    fn down(editor: &mut Editor, x: f32, y: f32) {
        editor.pointer_down(PointerInput {
            scene: [x, y],
            shift: false,
            alt: false,
        });
    }

    fn up(editor: &mut Editor, x: f32, y: f32) {
        editor.pointer_up(PointerInput {
            scene: [x, y],
            shift: false,
            alt: false,
        });
    }

    fn moved(editor: &mut Editor, x: f32, y: f32) {
        editor.pointer_move(PointerInput {
            scene: [x, y],
            shift: false,
            alt: false,
        });
    }

    /// Scene position of the starter object's local pixel (px, py).
    fn at(editor: &Editor, px: i32, py: i32) -> (f32, f32) {
        let object = editor.objects[0];
        ((object.x + px) as f32 + 0.5, (object.y + py) as f32 + 0.5)
    }

    #[test]
    fn starter_session_has_one_blank_object() {
        let editor = Editor::new();
        assert_eq!(editor.objects.len(), 1);
        let surface = editor.active_surface().unwrap();
        assert_eq!((surface.width(), surface.height()), (64, 64));
        assert!(surface.pixels().iter().all(|&px| px == 0));
        assert!(editor.palette.len() > 1);
    }

    #[test]
    fn draw_click_stamps_and_marks_dirty() {
        let mut editor = Editor::new();
        editor.take_dirty();
        let (x, y) = at(&editor, 10, 10);
        down(&mut editor, x, y);
        up(&mut editor, x, y);

        let id = editor.objects[0].surface;
        let surface = editor.store.get(id).unwrap();
        assert_eq!(surface.get(10, 10), Some(index_color(1)));
        assert!(editor.take_dirty().contains(&id));
    }

    #[test]
    fn click_on_empty_space_is_a_no_op() {
        let mut editor = Editor::new();
        editor.take_dirty();
        down(&mut editor, 10_000.0, 10_000.0);
        assert!(!editor.gesture_active());
        let id = editor.objects[0].surface;
        let dirty = editor.take_dirty();
        assert!(!dirty.contains(&id));
    }

    #[test]
    fn drag_keeps_the_grab_offset() {
        let mut editor = Editor::new();
        editor.tool = Tool::Move;
        let before = (editor.objects[0].x, editor.objects[0].y);
        let (x, y) = at(&editor, 5, 7);
        down(&mut editor, x, y);
        moved(&mut editor, x + 10.0, y + 3.0);
        up(&mut editor, x + 10.0, y + 3.0);
        let after = (editor.objects[0].x, editor.objects[0].y);
        assert_eq!(after, (before.0 + 10, before.1 + 3));
    }

    #[test]
    fn line_commits_on_release_only() {
        let mut editor = Editor::new();
        editor.tool = Tool::Line;
        let id = editor.objects[0].surface;
        let (x0, y0) = at(&editor, 2, 2);
        let (x1, y1) = at(&editor, 12, 2);

        down(&mut editor, x0, y0);
        moved(&mut editor, x1, y1);
        assert_eq!(editor.store.get(id).unwrap().get(7, 2), Some(0));

        up(&mut editor, x1, y1);
        let surface = editor.store.get(id).unwrap();
        for px in 2..=12 {
            assert_eq!(surface.get(px, 2), Some(index_color(1)), "pixel {}", px);
        }
    }

    #[test]
    fn shift_click_connects_from_previous_stroke_end() {
        let mut editor = Editor::new();
        let id = editor.objects[0].surface;
        let (x0, y0) = at(&editor, 3, 3);
        down(&mut editor, x0, y0);
        up(&mut editor, x0, y0);

        let (x1, y1) = at(&editor, 13, 3);
        editor.pointer_down(PointerInput {
            scene: [x1, y1],
            shift: true,
            alt: false,
        });
        up(&mut editor, x1, y1);

        let surface = editor.store.get(id).unwrap();
        for px in 3..=13 {
            assert_eq!(surface.get(px, 3), Some(index_color(1)), "pixel {}", px);
        }
    }

    #[test]
    fn alt_click_picks_the_pixel_color() {
        let mut editor = Editor::new();
        editor.color_index = 4;
        let (x, y) = at(&editor, 8, 8);
        down(&mut editor, x, y);
        up(&mut editor, x, y);

        editor.color_index = 9;
        editor.pointer_down(PointerInput {
            scene: [x, y],
            shift: false,
            alt: true,
        });
        up(&mut editor, x, y);
        assert_eq!(editor.color_index, 4);

        // Transparent pixel picks the erase slot.
        let (ex, ey) = at(&editor, 0, 0);
        editor.pointer_down(PointerInput {
            scene: [ex, ey],
            shift: false,
            alt: true,
        });
        up(&mut editor, ex, ey);
        assert_eq!(editor.color_index, 0);
    }

    #[test]
    fn hover_shows_a_ghost_overlay_on_top() {
        let mut editor = Editor::new();
        let (x, y) = at(&editor, 10, 10);
        moved(&mut editor, x, y);

        let list = editor.draw_list();
        assert_eq!(list.len(), 2);
        let overlay = list[1];
        assert_eq!(overlay.tint, PREVIEW_TINT);
        let surface = editor.store.get(overlay.surface).unwrap();
        assert_eq!((surface.width(), surface.height()), (64, 64));
        assert_eq!(surface.get(10, 10), Some(index_color(1)));

        editor.pointer_left();
        assert_eq!(editor.draw_list().len(), 1);
    }

    #[test]
    fn overlay_is_recreated_when_target_size_changes() {
        let mut editor = Editor::new();
        let (x, y) = at(&editor, 10, 10);
        moved(&mut editor, x, y);
        let first = editor.preview_surface.unwrap();

        // A smaller object on top of the pointer becomes the hover target.
        editor.add_object(8, 8);
        let small = editor.objects[1];
        let sx = small.x as f32 + 0.5;
        let sy = small.y as f32 + 0.5;
        moved(&mut editor, sx, sy);

        let second = editor.preview_surface.unwrap();
        assert_ne!(first, second);
        assert!(editor.take_disposed().contains(&first));
    }

    #[test]
    fn delete_disposes_the_surface() {
        let mut editor = Editor::new();
        let id = editor.objects[0].surface;
        editor.delete_active();
        assert!(editor.objects.is_empty());
        assert!(editor.store.get(id).is_none());
        assert!(editor.take_disposed().contains(&id));
    }

    #[test]
    fn new_document_disposes_previous_surfaces_and_never_reuses_ids() {
        let mut editor = Editor::new();
        let old = editor.objects[0].surface;
        editor.new_document();
        let new = editor.objects[0].surface;
        assert_ne!(old, new);
        assert!(editor.take_disposed().contains(&old));
    }

    #[test]
    fn erase_slot_usage_clears_matching_pixels_only() {
        let mut editor = Editor::new();
        let id = editor.objects[0].surface;
        {
            let surface = editor.store.get_mut(id).unwrap();
            surface.put(1, 1, index_color(3));
            surface.put(2, 1, index_color(5));
        }
        editor.erase_slot_usage(3);
        let surface = editor.store.get(id).unwrap();
        assert_eq!(surface.get(1, 1), Some(0));
        assert_eq!(surface.get(2, 1), Some(index_color(5)));
    }

    #[test]
    fn palette_edits_raise_the_palette_flag() {
        let mut editor = Editor::new();
        editor.take_palette_dirty();
        editor.set_palette_color(2, crate::palette::pack(1, 2, 3, 255));
        assert!(editor.take_palette_dirty());
        assert!(!editor.take_palette_dirty());
    }
}
