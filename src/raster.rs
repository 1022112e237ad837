//! Software rasterization core: the Bresenham line walk used by the draw and
//! line tools, and the flood-fill engine used by the fill tool.
//!
//! Everything here operates on integer coordinates and raw `u32` pixel
//! buffers. Nothing in this module knows about surfaces, tools, or the GPU,
//! which keeps it trivially unit-testable.

/// Lazy walk over the pixels of a line segment.
///
/// Integer-only Bresenham: steep lines (|dy| > |dx|) are walked in transposed
/// space and swapped back on output, and the walk is normalized to ascending
/// transposed-x, so the coordinates may come out in reverse order relative to
/// the endpoints given. Every produced pair of consecutive coordinates
/// differs by at most one in each axis (8-connected), and both endpoints are
/// produced exactly once.
///
/// The walk is `Clone`, so a pending line can be re-traced (the line tool
/// previews the same segment every frame before committing it).
#[derive(Clone, Debug)]
pub struct LineWalk {
    steep: bool,
    x: i32,
    x_end: i32,
    y: i32,
    y_step: i32,
    dx: i32,
    dy: i32,
    err: i32,
    done: bool,
}

impl LineWalk {
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        let steep = (y1 - y0).abs() > (x1 - x0).abs();
        let (mut x0, mut y0, mut x1, mut y1) = if steep {
            (y0, x0, y1, x1)
        } else {
            (x0, y0, x1, y1)
        };
        if x0 > x1 {
            std::mem::swap(&mut x0, &mut x1);
            std::mem::swap(&mut y0, &mut y1);
        }

        let dx = x1 - x0;
        let dy = (y1 - y0).abs();
        Self {
            steep,
            x: x0,
            x_end: x1,
            y: y0,
            y_step: if y0 < y1 { 1 } else { -1 },
            dx,
            dy,
            // Start the accumulator at half a step so y transitions land
            // mid-pixel rather than at pixel edges.
            err: dx / 2,
            done: false,
        }
    }
}

impl Iterator for LineWalk {
    type Item = (i32, i32);

    fn next(&mut self) -> Option<(i32, i32)> {
        if self.done {
            return None;
        }
        let out = if self.steep {
            (self.y, self.x)
        } else {
            (self.x, self.y)
        };
        if self.x == self.x_end {
            self.done = true;
        } else {
            self.x += 1;
            self.err -= self.dy;
            if self.err < 0 {
                self.y += self.y_step;
                self.err += self.dx;
            }
        }
        Some(out)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            (0, Some(0))
        } else {
            let n = (self.x_end - self.x) as usize + 1;
            (n, Some(n))
        }
    }
}

/// Walk the line from (x0, y0) to (x1, y1), invoking `plot` for every pixel.
///
/// This is the form the tools use: the draw tool's `plot` stamps the brush,
/// the line tool's `plot` stamps into the preview overlay.
pub fn bresenham(x0: i32, y0: i32, x1: i32, y1: i32, mut plot: impl FnMut(i32, i32)) {
    for (x, y) in LineWalk::new(x0, y0, x1, y1) {
        plot(x, y);
    }
}

/// Replace the 4-connected region around `(seed_x, seed_y)` whose pixels
/// equal the seed pixel's color with `fill`.
///
/// Iterative DFS over an explicit stack of packed linear indices, with a flat
/// visited array (O(1) per pixel). An out-of-bounds seed is a no-op, as is
/// filling a region that already has the fill color.
pub fn flood_fill(pixels: &mut [u32], width: u32, height: u32, seed_x: i32, seed_y: i32, fill: u32) {
    if width == 0 || height == 0 {
        return;
    }
    if seed_x < 0 || seed_y < 0 || seed_x >= width as i32 || seed_y >= height as i32 {
        return;
    }
    let w = width as usize;
    let h = height as usize;
    debug_assert_eq!(pixels.len(), w * h);

    let seed = seed_y as usize * w + seed_x as usize;
    let initial = pixels[seed];
    if initial == fill {
        // The region is already the fill color; rewriting it would change
        // nothing observable.
        return;
    }

    let mut visited = vec![false; w * h];
    let mut stack: Vec<u32> = Vec::with_capacity(256);
    visited[seed] = true;
    stack.push(seed as u32);

    while let Some(idx) = stack.pop() {
        let idx = idx as usize;
        pixels[idx] = fill;

        let x = idx % w;
        let y = idx / w;

        // 4-connected neighbors, bounds-checked before any buffer access.
        if x > 0 {
            let n = idx - 1;
            if !visited[n] && pixels[n] == initial {
                visited[n] = true;
                stack.push(n as u32);
            }
        }
        if x + 1 < w {
            let n = idx + 1;
            if !visited[n] && pixels[n] == initial {
                visited[n] = true;
                stack.push(n as u32);
            }
        }
        if y > 0 {
            let n = idx - w;
            if !visited[n] && pixels[n] == initial {
                visited[n] = true;
                stack.push(n as u32);
            }
        }
        if y + 1 < h {
            let n = idx + w;
            if !visited[n] && pixels[n] == initial {
                visited[n] = true;
                stack.push(n as u32);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn walk(x0: i32, y0: i32, x1: i32, y1: i32) -> Vec<(i32, i32)> {
        LineWalk::new(x0, y0, x1, y1).collect()
    }

    fn assert_connected(points: &[(i32, i32)]) {
        for pair in points.windows(2) {
            let (ax, ay) = pair[0];
            let (bx, by) = pair[1];
            assert!(
                (ax - bx).abs() <= 1 && (ay - by).abs() <= 1,
                "gap between {:?} and {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn line_covers_endpoints_exactly_once() {
        let cases = [
            (0, 0, 10, 3),
            (0, 0, 3, 10),   // steep
            (10, 3, 0, 0),   // reversed
            (5, 5, 5, -5),   // vertical
            (-4, 2, 9, 2),   // horizontal
            (7, -3, -2, 8),  // both negative deltas
        ];
        for (x0, y0, x1, y1) in cases {
            let points = walk(x0, y0, x1, y1);
            assert_connected(&points);

            let unique: HashSet<_> = points.iter().copied().collect();
            assert_eq!(unique.len(), points.len(), "duplicate pixel in walk");

            let ends: HashSet<_> = [points[0], *points.last().unwrap()].into_iter().collect();
            let expected: HashSet<_> = [(x0, y0), (x1, y1)].into_iter().collect();
            assert_eq!(ends, expected, "walk must start/end on the endpoints");
        }
    }

    #[test]
    fn zero_length_line_is_a_single_pixel() {
        assert_eq!(walk(4, -7, 4, -7), vec![(4, -7)]);
    }

    #[test]
    fn line_is_restartable() {
        let first: Vec<_> = LineWalk::new(0, 0, 9, 4).collect();
        let again: Vec<_> = LineWalk::new(0, 0, 9, 4).collect();
        assert_eq!(first, again);

        let mut partial = LineWalk::new(0, 0, 9, 4);
        let saved = partial.clone();
        partial.next();
        partial.next();
        assert_eq!(saved.collect::<Vec<_>>(), first);
    }

    #[test]
    fn line_symmetry_as_sets() {
        let cases = [(0, 0, 13, 5), (2, 9, 11, 1), (0, 0, 5, 13), (-3, -3, 3, 4)];
        for (x0, y0, x1, y1) in cases {
            let forward: HashSet<_> = walk(x0, y0, x1, y1).into_iter().collect();
            let backward: HashSet<_> = walk(x1, y1, x0, y0).into_iter().collect();
            assert_eq!(forward, backward);
        }
    }

    #[test]
    fn bresenham_callback_sees_every_pixel() {
        let mut plotted = Vec::new();
        bresenham(1, 1, 6, 3, |x, y| plotted.push((x, y)));
        assert_eq!(plotted, walk(1, 1, 6, 3));
    }

    const BLACK: u32 = 0xFF00_0000;
    const BLUE: u32 = 0xFF00_00FF;
    const WHITE: u32 = 0xFFFF_FFFF;

    /// 10x10 black bitmap with a blue rectangle over rows/cols 2..=7.
    fn framed_rect() -> Vec<u32> {
        let mut pixels = vec![BLACK; 100];
        for y in 2..8 {
            for x in 2..8 {
                pixels[y * 10 + x] = BLUE;
            }
        }
        pixels
    }

    #[test]
    fn fill_replaces_exactly_the_enclosed_rectangle() {
        let mut pixels = framed_rect();
        flood_fill(&mut pixels, 10, 10, 4, 4, WHITE);
        for y in 0..10 {
            for x in 0..10 {
                let expect = if (2..8).contains(&x) && (2..8).contains(&y) {
                    WHITE
                } else {
                    BLACK
                };
                assert_eq!(pixels[y * 10 + x], expect, "pixel ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn fill_with_existing_color_changes_nothing() {
        let mut pixels = vec![BLUE; 64];
        let before = pixels.clone();
        flood_fill(&mut pixels, 8, 8, 3, 3, BLUE);
        assert_eq!(pixels, before);
    }

    #[test]
    fn fill_out_of_bounds_seed_is_a_no_op() {
        let mut pixels = framed_rect();
        let before = pixels.clone();
        flood_fill(&mut pixels, 10, 10, -1, 4, WHITE);
        flood_fill(&mut pixels, 10, 10, 4, 10, WHITE);
        flood_fill(&mut pixels, 10, 10, 10, 4, WHITE);
        assert_eq!(pixels, before);
    }

    #[test]
    fn fill_does_not_cross_diagonal_gaps() {
        // Two blue cells meeting only at a corner: filling one must not
        // leak into the other (4-connectivity).
        let mut pixels = vec![BLACK; 16];
        pixels[0] = BLUE; // (0, 0)
        pixels[5] = BLUE; // (1, 1)
        flood_fill(&mut pixels, 4, 4, 0, 0, WHITE);
        assert_eq!(pixels[0], WHITE);
        assert_eq!(pixels[5], BLUE);
    }

    #[test]
    fn fill_spans_the_whole_buffer_when_uniform() {
        let mut pixels = vec![BLACK; 7 * 3];
        flood_fill(&mut pixels, 7, 3, 6, 2, WHITE);
        assert!(pixels.iter().all(|&p| p == WHITE));
    }

    #[test]
    fn fill_respects_arbitrary_dimensions() {
        // A 1-pixel-tall strip with a break in the middle.
        let mut pixels = vec![BLACK, BLACK, BLUE, BLACK, BLACK];
        flood_fill(&mut pixels, 5, 1, 0, 0, WHITE);
        assert_eq!(pixels, vec![WHITE, WHITE, BLUE, BLACK, BLACK]);
    }
}
