//! Scene objects, the surface store, hit testing, and the viewport
//! transform.
//!
//! Surfaces live in a store that issues stable integer handles; everything
//! else (scene objects, the renderer's texture cache, the dirty set) refers
//! to surfaces only through those handles. Handles are never reused, so a
//! disposed handle can never silently alias a newer surface.

use std::collections::HashMap;

use crate::surface::Surface;

/// Stable handle for one surface in the [`SurfaceStore`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SurfaceId(u32);

/// Owns every surface in the session and issues handles for them.
pub struct SurfaceStore {
    surfaces: HashMap<SurfaceId, Surface>,
    next_id: u32,
}

impl SurfaceStore {
    pub fn new() -> Self {
        Self {
            surfaces: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn insert(&mut self, surface: Surface) -> SurfaceId {
        let id = SurfaceId(self.next_id);
        self.next_id += 1;
        self.surfaces.insert(id, surface);
        id
    }

    pub fn get(&self, id: SurfaceId) -> Option<&Surface> {
        self.surfaces.get(&id)
    }

    pub fn get_mut(&mut self, id: SurfaceId) -> Option<&mut Surface> {
        self.surfaces.get_mut(&id)
    }

    /// Drop a surface. The caller is responsible for disposing any renderer
    /// cache entry for the same handle.
    pub fn remove(&mut self, id: SurfaceId) -> Option<Surface> {
        self.surfaces.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }
}

impl Default for SurfaceStore {
    fn default() -> Self {
        Self::new()
    }
}

/// A positioned, tinted reference to a surface within the composited scene.
#[derive(Clone, Copy, Debug)]
pub struct SceneObject {
    pub surface: SurfaceId,
    pub x: i32,
    pub y: i32,
    /// RGBA multiplier applied per fragment; opaque white leaves palette
    /// colors untouched.
    pub tint: [f32; 4],
}

impl SceneObject {
    pub fn new(surface: SurfaceId, x: i32, y: i32) -> Self {
        Self {
            surface,
            x,
            y,
            tint: [1.0, 1.0, 1.0, 1.0],
        }
    }

    pub fn with_tint(mut self, tint: [f32; 4]) -> Self {
        self.tint = tint;
        self
    }

    /// Whether a scene-space point lies within this object's bounding box.
    /// Bounds are inclusive on all four edges.
    pub fn contains(&self, surface: &Surface, x: f32, y: f32) -> bool {
        x >= self.x as f32
            && x <= (self.x + surface.width() as i32) as f32
            && y >= self.y as f32
            && y <= (self.y + surface.height() as i32) as f32
    }

    /// Convert a scene-space point to this object's local pixel coordinates
    /// (floored, may be outside the surface).
    pub fn local(&self, x: f32, y: f32) -> (i32, i32) {
        (x.floor() as i32 - self.x, y.floor() as i32 - self.y)
    }
}

/// Index of the topmost object containing the point, or `None`. Later list
/// entries draw on top (painter's algorithm), so the last hit wins — the
/// same rule for hover targeting and gesture targeting.
pub fn hit_test(objects: &[SceneObject], store: &SurfaceStore, x: f32, y: f32) -> Option<usize> {
    let mut hit = None;
    for (i, object) in objects.iter().enumerate() {
        if let Some(surface) = store.get(object.surface) {
            if object.contains(surface, x, y) {
                hit = Some(i);
            }
        }
    }
    hit
}

/// Pan/zoom state mapping scene coordinates to viewport pixels.
///
/// Scene space is y-down like surface rows. A scene point maps to the
/// viewport as `(scene + offset) * scale + viewport/2`; the GPU vertex
/// shader applies the identical transform (then flips y into clip space),
/// so hit testing here and rendering there stay pixel-aligned. The inverse
/// below is exact up to float rounding.
#[derive(Clone, Copy, Debug)]
pub struct Viewport {
    /// Pan, in scene units.
    pub offset: [f32; 2],
    /// Zoom: device pixels per scene pixel.
    pub scale: f32,
}

impl Viewport {
    pub const MIN_SCALE: f32 = 1.0;
    pub const MAX_SCALE: f32 = 32.0;

    pub fn new() -> Self {
        Self {
            offset: [0.0, 0.0],
            scale: 6.0,
        }
    }

    pub fn scene_to_screen(&self, scene: [f32; 2], viewport_px: [f32; 2]) -> [f32; 2] {
        [
            (scene[0] + self.offset[0]) * self.scale + viewport_px[0] * 0.5,
            (scene[1] + self.offset[1]) * self.scale + viewport_px[1] * 0.5,
        ]
    }

    pub fn screen_to_scene(&self, screen: [f32; 2], viewport_px: [f32; 2]) -> [f32; 2] {
        [
            (screen[0] - viewport_px[0] * 0.5) / self.scale - self.offset[0],
            (screen[1] - viewport_px[1] * 0.5) / self.scale - self.offset[1],
        ]
    }

    /// Pan by a screen-pixel delta (drag-the-canvas direction: dragging
    /// right moves the scene right).
    pub fn pan_by_screen(&mut self, dx_px: f32, dy_px: f32) {
        self.offset[0] += dx_px / self.scale;
        self.offset[1] += dy_px / self.scale;
    }

    /// Multiply the zoom by `factor`, keeping the scene point under
    /// `anchor_px` fixed on screen.
    pub fn zoom_at(&mut self, factor: f32, anchor_px: [f32; 2], viewport_px: [f32; 2]) {
        let anchor_scene = self.screen_to_scene(anchor_px, viewport_px);
        self.scale = (self.scale * factor).clamp(Self::MIN_SCALE, Self::MAX_SCALE);
        self.offset = [
            (anchor_px[0] - viewport_px[0] * 0.5) / self.scale - anchor_scene[0],
            (anchor_px[1] - viewport_px[1] * 0.5) / self.scale - anchor_scene[1],
        ];
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(sizes: &[(u32, u32)]) -> (SurfaceStore, Vec<SurfaceId>) {
        let mut store = SurfaceStore::new();
        let ids = sizes
            .iter()
            .map(|&(w, h)| store.insert(Surface::new(w, h)))
            .collect();
        (store, ids)
    }

    #[test]
    fn store_handles_are_unique_and_never_reused() {
        let (mut store, ids) = store_with(&[(1, 1), (1, 1)]);
        assert_ne!(ids[0], ids[1]);
        store.remove(ids[0]);
        let fresh = store.insert(Surface::new(1, 1));
        assert_ne!(fresh, ids[0]);
        assert_ne!(fresh, ids[1]);
        assert!(store.get(ids[0]).is_none());
        assert!(store.get(fresh).is_some());
    }

    #[test]
    fn hit_test_picks_the_topmost_overlap() {
        let (store, ids) = store_with(&[(10, 10), (10, 10)]);
        let objects = vec![
            SceneObject::new(ids[0], 0, 0),
            SceneObject::new(ids[1], 5, 5),
        ];
        // P inside both boxes → the later object wins.
        assert_eq!(hit_test(&objects, &store, 7.0, 7.0), Some(1));
        // Only inside the first.
        assert_eq!(hit_test(&objects, &store, 1.0, 1.0), Some(0));
        // Inside neither.
        assert_eq!(hit_test(&objects, &store, 40.0, 2.0), None);
    }

    #[test]
    fn contains_is_inclusive_on_all_edges() {
        let (store, ids) = store_with(&[(10, 10)]);
        let object = SceneObject::new(ids[0], 2, 3);
        let surface = store.get(ids[0]).unwrap();
        assert!(object.contains(surface, 2.0, 3.0));
        assert!(object.contains(surface, 12.0, 13.0));
        assert!(!object.contains(surface, 12.1, 7.0));
        assert!(!object.contains(surface, 1.9, 7.0));
    }

    #[test]
    fn local_coordinates_floor_toward_negative_infinity() {
        let object = SceneObject::new(SurfaceId(0), -4, 2);
        assert_eq!(object.local(-3.2, 2.9), (0, 0));
        assert_eq!(object.local(-4.0, 2.0), (0, 0));
        assert_eq!(object.local(-4.5, 1.5), (-1, -1));
    }

    #[test]
    fn viewport_transform_round_trips() {
        let view = Viewport {
            offset: [3.0, -2.0],
            scale: 4.0,
        };
        let vp = [800.0, 600.0];
        assert_eq!(view.scene_to_screen([0.0, 0.0], vp), [412.0, 292.0]);

        for point in [[0.0, 0.0], [17.5, -6.25], [-40.0, 33.0]] {
            let screen = view.scene_to_screen(point, vp);
            let back = view.screen_to_scene(screen, vp);
            assert!((back[0] - point[0]).abs() < 1e-4);
            assert!((back[1] - point[1]).abs() < 1e-4);
        }
    }

    #[test]
    fn zoom_keeps_the_anchor_point_fixed() {
        let mut view = Viewport::new();
        let vp = [640.0, 480.0];
        let anchor = [100.0, 350.0];
        let before = view.screen_to_scene(anchor, vp);
        view.zoom_at(2.0, anchor, vp);
        let after = view.screen_to_scene(anchor, vp);
        assert!((before[0] - after[0]).abs() < 1e-3);
        assert!((before[1] - after[1]).abs() < 1e-3);
        assert_eq!(view.scale, 12.0);
    }

    #[test]
    fn zoom_clamps_to_the_scale_range() {
        let mut view = Viewport::new();
        let vp = [100.0, 100.0];
        view.zoom_at(1000.0, [50.0, 50.0], vp);
        assert_eq!(view.scale, Viewport::MAX_SCALE);
        view.zoom_at(0.00001, [50.0, 50.0], vp);
        assert_eq!(view.scale, Viewport::MIN_SCALE);
    }

    #[test]
    fn pan_moves_scene_points_with_the_drag() {
        let mut view = Viewport {
            offset: [0.0, 0.0],
            scale: 2.0,
        };
        let vp = [200.0, 200.0];
        let before = view.scene_to_screen([5.0, 5.0], vp);
        view.pan_by_screen(10.0, -4.0);
        let after = view.scene_to_screen([5.0, 5.0], vp);
        assert!((after[0] - (before[0] + 10.0)).abs() < 1e-4);
        assert!((after[1] - (before[1] - 4.0)).abs() < 1e-4);
    }
}
