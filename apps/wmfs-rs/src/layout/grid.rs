use super::split_even;
use crate::geometry::Rect;

/// Columns of `per` clients filled left to right; the last column takes the remainder
/// and stretches its clients over the full height.
pub(super) fn arrange(area: Rect, n: usize) -> Vec<Rect> {
    if n == 0 {
        return Vec::new();
    }

    let cols = (n as f64).sqrt().ceil() as usize;
    let per = n.div_ceil(cols);
    let used = n.div_ceil(per);

    let mut rects = Vec::with_capacity(n);
    for (col, (x, width)) in split_even(area.x, area.width, used).into_iter().enumerate() {
        let count = per.min(n - col * per);
        for (y, height) in split_even(area.y, area.height, count) {
            rects.push(Rect::new(x, y, width, height));
        }
    }
    rects
}
