/// Axis-aligned face rectangle in pixel coordinates.
///
/// `x`/`y` is the top-left corner. Width and height are kept signed so
/// boxes reported partly or fully outside the frame survive conversion
/// from tracker coordinates without wrapping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds a box from corner coordinates, truncating toward zero.
    ///
    /// Coordinates are clamped to half the `i32` range first, so width,
    /// height and the far corner stay representable for any model output.
    pub fn from_ltrb(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        const LIMIT: f64 = (i32::MAX / 2) as f64;
        let coord = |v: f64| v.clamp(-LIMIT, LIMIT) as i32;
        let (x, y) = (coord(left), coord(top));
        Self {
            x,
            y,
            width: coord(right) - x,
            height: coord(bottom) - y,
        }
    }

    pub fn to_ltrb(&self) -> [f64; 4] {
        [
            self.x as f64,
            self.y as f64,
            self.right() as f64,
            self.bottom() as f64,
        ]
    }

    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    pub fn area(&self) -> i64 {
        self.width.max(0) as i64 * self.height.max(0) as i64
    }

    /// Non-strict rectangle intersection: boxes sharing only an edge or a
    /// corner still overlap.
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        !(self.x > other.right()
            || self.right() < other.x
            || self.y > other.bottom()
            || self.bottom() < other.y)
    }

    /// Intersection with the `[0, width) x [0, height)` frame rectangle.
    ///
    /// Boxes lying entirely outside the frame collapse to zero area.
    pub fn clip_to(&self, frame_width: u32, frame_height: u32) -> BoundingBox {
        let fw = frame_width as i32;
        let fh = frame_height as i32;
        let x1 = self.x.clamp(0, fw);
        let y1 = self.y.clamp(0, fh);
        let x2 = self.right().clamp(0, fw).max(x1);
        let y2 = self.bottom().clamp(0, fh).max(y1);
        BoundingBox::new(x1, y1, x2 - x1, y2 - y1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn bbox(x: i32, y: i32, w: i32, h: i32) -> BoundingBox {
        BoundingBox::new(x, y, w, h)
    }

    // ── Overlap ──────────────────────────────────────────────────────

    #[test]
    fn test_overlapping_boxes() {
        assert!(bbox(0, 0, 10, 10).overlaps(&bbox(5, 5, 10, 10)));
    }

    #[test]
    fn test_disjoint_boxes() {
        assert!(!bbox(0, 0, 10, 10).overlaps(&bbox(20, 20, 5, 5)));
    }

    #[rstest]
    #[case::shared_vertical_edge(bbox(0, 0, 10, 10), bbox(10, 0, 10, 10), true)]
    #[case::shared_corner(bbox(0, 0, 10, 10), bbox(10, 10, 5, 5), true)]
    #[case::one_pixel_gap(bbox(0, 0, 10, 10), bbox(11, 0, 10, 10), false)]
    #[case::contained(bbox(0, 0, 100, 100), bbox(40, 40, 5, 5), true)]
    #[case::below(bbox(0, 0, 10, 10), bbox(0, 30, 10, 10), false)]
    fn test_overlap_edges(
        #[case] a: BoundingBox,
        #[case] b: BoundingBox,
        #[case] expected: bool,
    ) {
        assert_eq!(a.overlaps(&b), expected);
        assert_eq!(b.overlaps(&a), expected);
    }

    // ── Conversion ───────────────────────────────────────────────────

    #[test]
    fn test_from_ltrb_truncates() {
        let b = BoundingBox::from_ltrb(10.7, 20.2, 50.9, 80.5);
        assert_eq!(b, bbox(10, 20, 40, 60));
    }

    #[test]
    fn test_from_ltrb_extreme_coordinates_saturate() {
        let b = BoundingBox::from_ltrb(-1e12, -5.0, 1e12, f64::INFINITY);
        assert_eq!(b.x, -(i32::MAX / 2));
        assert_eq!(b.right(), i32::MAX / 2);
        assert_eq!(b.bottom(), i32::MAX / 2);
        assert_eq!(b.clip_to(100, 50), bbox(0, 0, 100, 50));
    }

    #[test]
    fn test_far_corner_saturates_instead_of_overflowing() {
        let b = bbox(i32::MAX - 10, 0, 100, 100);
        assert_eq!(b.right(), i32::MAX);
        assert!(b.clip_to(100, 100).area() == 0);
    }

    #[test]
    fn test_to_ltrb() {
        assert_eq!(bbox(5, 6, 10, 20).to_ltrb(), [5.0, 6.0, 15.0, 26.0]);
    }

    // ── Clipping ─────────────────────────────────────────────────────

    #[test]
    fn test_clip_inside_frame_is_identity() {
        assert_eq!(bbox(10, 10, 20, 20).clip_to(100, 100), bbox(10, 10, 20, 20));
    }

    #[test]
    fn test_clip_partial() {
        assert_eq!(bbox(-5, 90, 20, 20).clip_to(100, 100), bbox(0, 90, 15, 10));
    }

    #[test]
    fn test_clip_outside_frame_is_empty() {
        let clipped = bbox(150, 150, 20, 20).clip_to(100, 100);
        assert_eq!(clipped.area(), 0);
    }
}
