//! Box geometry shared by the detector and tracker backends.
//!
//! Both work in corner form `[x1, y1, x2, y2]` with `f64` coordinates.

/// IoU between two bounding boxes represented as `[x1, y1, x2, y2]`.
pub fn bbox_iou(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }

    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    inter / (area_a + area_b - inter)
}

/// Greedy non-maximum suppression.
///
/// Boxes scoring at or below `score_threshold` are discarded, the rest are
/// visited in descending score order (ties keep input order) and a box is
/// dropped when its IoU with an already-kept box exceeds `iou_threshold`.
/// Returns indices into `boxes`, highest score first.
pub fn non_max_suppression(
    boxes: &[[f64; 4]],
    scores: &[f64],
    score_threshold: f64,
    iou_threshold: f64,
) -> Vec<usize> {
    let mut order: Vec<usize> = (0..boxes.len().min(scores.len()))
        .filter(|&i| scores[i] > score_threshold)
        .collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<usize> = Vec::with_capacity(order.len());
    for i in order {
        if keep
            .iter()
            .all(|&k| bbox_iou(&boxes[k], &boxes[i]) <= iou_threshold)
        {
            keep.push(i);
        }
    }
    keep
}
