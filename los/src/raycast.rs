/// Opacity value of a cell that completely stops sight.
pub const OPAQUE: u8 = 0;

/// Opacity value of a fully see-through cell.
///
/// Values in between attenuate rays proportionally; the units are
/// arbitrary, chosen so that a ray through a couple of half-opaque cells
/// still dies off quickly.
pub const TRANSPARENT: u8 = 12;

/// Line-of-sight engine over a fixed-size square window.
///
/// The viewer sits at the center cell. Input is a row-major opacity buffer
/// for the window, output a row-major visibility bitmap (0 = hidden, 1 =
/// visible) of the same size.
///
/// The output buffer is scratch space reused across `compute` calls.
/// Callers that want to keep the result must copy it out before calling
/// `compute` again.
pub struct Los {
    width: usize,
    vis: Vec<u8>,
}

impl Los {
    /// Create an engine for a `width` × `width` window.
    ///
    /// Width must be odd so the window has a center cell.
    pub fn new(width: usize) -> Los {
        assert!(width % 2 == 1, "window width must be odd");
        Los {
            width,
            vis: vec![0; width * width],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Compute visibility for an opacity window.
    ///
    /// Casts a ray from the center to every window cell, attenuating ray
    /// strength through intervening cells. A cell is visible when a ray
    /// reaches it with nonzero strength; an opaque cell is itself visible
    /// but stops the ray.
    pub fn compute(&mut self, alpha: &[u8]) -> &[u8] {
        assert_eq!(alpha.len(), self.width * self.width);

        let w = self.width as i32;
        let c = w / 2;

        self.vis.fill(0);
        // The viewer always sees its own cell.
        self.vis[(c * w + c) as usize] = 1;

        // Rays to interior cells are prefixes of rays to perimeter cells,
        // so casting only to the perimeter covers the whole window.
        for x in 0..w {
            self.cast(alpha, c, c, x, 0);
            self.cast(alpha, c, c, x, w - 1);
        }
        for y in 1..(w - 1) {
            self.cast(alpha, c, c, 0, y);
            self.cast(alpha, c, c, w - 1, y);
        }

        &self.vis
    }

    /// March one Bresenham ray, marking cells it reaches.
    fn cast(&mut self, alpha: &[u8], x0: i32, y0: i32, x1: i32, y1: i32) {
        let w = self.width as i32;

        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };

        let (mut x, mut y) = (x0, y0);
        let mut err = dx + dy;
        // Remaining ray strength in opacity units.
        let mut strength = TRANSPARENT as u32;

        loop {
            if x == x1 && y == y1 {
                break;
            }

            // Attenuate through the cell being left behind, except for the
            // origin. Sight out of an opaque cell is allowed so a viewer
            // standing in a doorway is not blind.
            if (x, y) != (x0, y0) {
                strength =
                    strength * alpha[(y * w + x) as usize] as u32
                        / TRANSPARENT as u32;
                if strength == 0 {
                    return;
                }
            }

            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }

            self.vis[(y * w + x) as usize] = 1;
        }
    }
}
