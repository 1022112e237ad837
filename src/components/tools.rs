// ============================================================================
// TOOLS — draw/line/fill/move state machines
// ============================================================================
//
// Tools are a tagged enum, not trait objects: the per-gesture transient
// state (stroke anchor, grab offset, ...) is the variant payload of
// `Gesture`, created on pointer-down and dropped on pointer-up. The
// coordinator routes pointer phases here; these functions only ever touch
// the one surface (or object) the gesture targets.

use crate::raster;
use crate::surface::Surface;

/// The selectable tools.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Tool {
    Draw,
    Line,
    Fill,
    Move,
}

impl Tool {
    pub const ALL: [Tool; 4] = [Tool::Draw, Tool::Line, Tool::Fill, Tool::Move];

    pub fn label(&self) -> &'static str {
        match self {
            Tool::Draw => "Draw",
            Tool::Line => "Line",
            Tool::Fill => "Fill",
            Tool::Move => "Move",
        }
    }
}

/// One pointer event in scene coordinates, with the modifier state captured
/// at the event rather than read from any global.
#[derive(Clone, Copy, Debug)]
pub struct PointerInput {
    pub scene: [f32; 2],
    pub shift: bool,
    pub alt: bool,
}

/// Transient state for the one in-flight gesture. `object` is the index of
/// the targeted scene object; the scene list does not change while a gesture
/// is active, so the index stays valid for the gesture's lifetime.
#[derive(Clone, Copy, Debug)]
pub enum Gesture {
    /// Freehand stroke: remembers the last stamped local position so fast
    /// pointer motion is connected by rasterized segments.
    Stroke { object: usize, last: (i32, i32) },
    /// Pending straight line: anchored on down, committed on up.
    Line { object: usize, anchor: (i32, i32) },
    /// Fill already happened on down; the gesture only swallows move/up.
    Fill { object: usize },
    /// Object drag: `grab` is the pointer's local position at grab time, so
    /// the object keeps its offset under the pointer.
    Drag { object: usize, grab: (i32, i32) },
}

impl Gesture {
    pub fn object(&self) -> usize {
        match *self {
            Gesture::Stroke { object, .. }
            | Gesture::Line { object, .. }
            | Gesture::Fill { object }
            | Gesture::Drag { object, .. } => object,
        }
    }
}

/// What a pointer phase did: the gesture to carry forward, and whether the
/// target surface was mutated (the coordinator flushes on `true`).
pub struct PhaseOutcome {
    pub gesture: Option<Gesture>,
    pub mutated: bool,
}

/// Brush pivot: subtracted from the target coordinate so the pointer
/// addresses the stamp's visual center. Odd dimensions center exactly;
/// even dimensions bias one cell toward the lower-right.
pub fn pivot(brush: &Surface) -> (i32, i32) {
    ((brush.width() / 2) as i32, (brush.height() / 2) as i32)
}

/// Stamp the brush centered on (x, y).
pub fn stamp_at(surface: &mut Surface, brush: &Surface, x: i32, y: i32, color: u32) {
    let (px, py) = pivot(brush);
    surface.stamp(brush, x - px, y - py, color);
}

/// Stamp the brush at every pixel of the line from `from` to `to`.
pub fn stroke(surface: &mut Surface, brush: &Surface, from: (i32, i32), to: (i32, i32), color: u32) {
    raster::bresenham(from.0, from.1, to.0, to.1, |x, y| {
        stamp_at(surface, brush, x, y, color);
    });
}

/// Pointer-down for the active tool against the hit object's surface.
///
/// `connect_from` is the final stamp position of the previous draw gesture
/// on the same object; with Shift held, the draw tool strokes from there to
/// the new position instead of just stamping.
pub fn start(
    tool: Tool,
    object: usize,
    surface: &mut Surface,
    brush: &Surface,
    color: u32,
    local: (i32, i32),
    input: &PointerInput,
    connect_from: Option<(i32, i32)>,
) -> PhaseOutcome {
    match tool {
        Tool::Draw => {
            if input.shift && let Some(prev) = connect_from {
                stroke(surface, brush, prev, local, color);
            } else {
                stamp_at(surface, brush, local.0, local.1, color);
            }
            PhaseOutcome {
                gesture: Some(Gesture::Stroke {
                    object,
                    last: local,
                }),
                mutated: true,
            }
        }
        Tool::Line => PhaseOutcome {
            gesture: Some(Gesture::Line {
                object,
                anchor: local,
            }),
            mutated: false,
        },
        Tool::Fill => {
            surface.flood_fill(local.0, local.1, color);
            PhaseOutcome {
                gesture: Some(Gesture::Fill { object }),
                mutated: true,
            }
        }
        Tool::Move => PhaseOutcome {
            gesture: Some(Gesture::Drag {
                object,
                grab: local,
            }),
            mutated: false,
        },
    }
}

/// Pointer-move for an active stroke: connect from the last stamped position
/// and advance it. Returns whether anything was stamped.
pub fn stroke_move(
    last: &mut (i32, i32),
    surface: &mut Surface,
    brush: &Surface,
    color: u32,
    local: (i32, i32),
) -> bool {
    if *last == local {
        // Pointer is still on the same pixel; the stamp is already there.
        return false;
    }
    stroke(surface, brush, *last, local, color);
    *last = local;
    true
}

/// Pointer-up for a pending line: commit the anchored stroke.
pub fn line_commit(
    anchor: (i32, i32),
    surface: &mut Surface,
    brush: &Surface,
    color: u32,
    local: (i32, i32),
) -> bool {
    stroke(surface, brush, anchor, local, color);
    true
}

/// Redraw the cursor preview into the overlay surface: the pending line
/// while a line gesture is anchored, otherwise the would-be stamp (or fill
/// seed cell) under the pointer. The overlay is cleared first, so calling
/// this every hovered frame is the whole preview protocol.
pub fn draw_cursor(
    preview: &mut Surface,
    gesture: Option<&Gesture>,
    tool: Tool,
    brush: &Surface,
    color: u32,
    local: (i32, i32),
) {
    preview.clear();
    if let Some(Gesture::Line { anchor, .. }) = gesture {
        stroke(preview, brush, *anchor, local, color);
        return;
    }
    match tool {
        Tool::Draw | Tool::Line => stamp_at(preview, brush, local.0, local.1, color),
        Tool::Fill => preview.put(local.0, local.1, color),
        Tool::Move => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INK: u32 = 0xFF00_0003;

    fn solid_brush(size: u32) -> Surface {
        let mut brush = Surface::new(size, size);
        brush.with_pixels(|pixels| pixels.fill(0xFFFF_FFFF));
        brush
    }

    fn input_at(x: f32, y: f32) -> PointerInput {
        PointerInput {
            scene: [x, y],
            shift: false,
            alt: false,
        }
    }

    #[test]
    fn odd_brush_stamps_centered_on_the_target() {
        let mut surface = Surface::new(20, 20);
        stamp_at(&mut surface, &solid_brush(5), 10, 10, INK);
        // The 5x5 stamp covers 8..=12 in both axes, center pixel at (10,10).
        assert_eq!(surface.get(10, 10), Some(INK));
        for (x, y) in [(8, 8), (12, 12), (8, 12), (12, 8)] {
            assert_eq!(surface.get(x, y), Some(INK), "corner ({}, {})", x, y);
        }
        for (x, y) in [(7, 10), (13, 10), (10, 7), (10, 13)] {
            assert_eq!(surface.get(x, y), Some(0), "outside ({}, {})", x, y);
        }
    }

    #[test]
    fn pivot_for_common_brush_sizes() {
        assert_eq!(pivot(&solid_brush(1)), (0, 0));
        assert_eq!(pivot(&solid_brush(3)), (1, 1));
        assert_eq!(pivot(&solid_brush(4)), (2, 2));
        assert_eq!(pivot(&solid_brush(5)), (2, 2));
    }

    #[test]
    fn stroke_leaves_no_gaps() {
        let mut surface = Surface::new(16, 16);
        stroke(&mut surface, &solid_brush(1), (0, 0), (9, 4), INK);
        let walked: Vec<_> = crate::raster::LineWalk::new(0, 0, 9, 4).collect();
        for (x, y) in walked {
            assert_eq!(surface.get(x, y), Some(INK), "missing stamp at ({}, {})", x, y);
        }
    }

    #[test]
    fn draw_start_stamps_and_opens_a_stroke() {
        let mut surface = Surface::new(8, 8);
        let brush = solid_brush(1);
        let outcome = start(
            Tool::Draw,
            0,
            &mut surface,
            &brush,
            INK,
            (3, 3),
            &input_at(3.0, 3.0),
            None,
        );
        assert!(outcome.mutated);
        assert_eq!(surface.get(3, 3), Some(INK));
        match outcome.gesture {
            Some(Gesture::Stroke { object: 0, last }) => assert_eq!(last, (3, 3)),
            other => panic!("expected stroke gesture, got {:?}", other),
        }
    }

    #[test]
    fn shift_draw_connects_from_the_previous_stamp() {
        let mut surface = Surface::new(16, 16);
        let brush = solid_brush(1);
        let input = PointerInput {
            scene: [6.0, 0.0],
            shift: true,
            alt: false,
        };
        start(Tool::Draw, 0, &mut surface, &brush, INK, (6, 0), &input, Some((0, 0)));
        for x in 0..=6 {
            assert_eq!(surface.get(x, 0), Some(INK), "x = {}", x);
        }
    }

    #[test]
    fn line_start_defers_all_drawing_to_commit() {
        let mut surface = Surface::new(16, 16);
        let brush = solid_brush(1);
        let outcome = start(
            Tool::Line,
            0,
            &mut surface,
            &brush,
            INK,
            (1, 1),
            &input_at(1.0, 1.0),
            None,
        );
        assert!(!outcome.mutated);
        assert!(surface.pixels().iter().all(|&p| p == 0));

        let anchor = match outcome.gesture {
            Some(Gesture::Line { anchor, .. }) => anchor,
            other => panic!("expected line gesture, got {:?}", other),
        };
        assert!(line_commit(anchor, &mut surface, &brush, INK, (5, 1)));
        for x in 1..=5 {
            assert_eq!(surface.get(x, 1), Some(INK));
        }
    }

    #[test]
    fn fill_start_fills_immediately() {
        let mut surface = Surface::new(4, 4);
        let brush = solid_brush(1);
        let outcome = start(
            Tool::Fill,
            2,
            &mut surface,
            &brush,
            INK,
            (1, 1),
            &input_at(1.0, 1.0),
            None,
        );
        assert!(outcome.mutated);
        assert!(surface.pixels().iter().all(|&p| p == INK));
        assert_eq!(outcome.gesture.map(|g| g.object()), Some(2));
    }

    #[test]
    fn stroke_move_skips_repeats_and_connects_jumps() {
        let mut surface = Surface::new(16, 16);
        let brush = solid_brush(1);
        let mut last = (2, 2);
        assert!(!stroke_move(&mut last, &mut surface, &brush, INK, (2, 2)));
        assert!(stroke_move(&mut last, &mut surface, &brush, INK, (7, 2)));
        assert_eq!(last, (7, 2));
        for x in 2..=7 {
            assert_eq!(surface.get(x, 2), Some(INK));
        }
    }

    #[test]
    fn cursor_preview_shows_pending_line() {
        let mut preview = Surface::new(16, 16);
        let brush = solid_brush(1);
        // Stale preview content must be cleared on every redraw.
        preview.put(15, 15, INK);

        let gesture = Gesture::Line {
            object: 0,
            anchor: (0, 0),
        };
        draw_cursor(&mut preview, Some(&gesture), Tool::Line, &brush, INK, (4, 0));
        for x in 0..=4 {
            assert_eq!(preview.get(x, 0), Some(INK));
        }
        assert_eq!(preview.get(15, 15), Some(0));
    }

    #[test]
    fn cursor_preview_for_fill_marks_the_seed_cell() {
        let mut preview = Surface::new(8, 8);
        let brush = solid_brush(3);
        draw_cursor(&mut preview, None, Tool::Fill, &brush, INK, (5, 5));
        assert_eq!(preview.get(5, 5), Some(INK));
        assert_eq!(preview.get(4, 5), Some(0));
    }
}
