use super::{split_even, LayoutParams, TileSide, MWFACT_MAX, MWFACT_MIN};
use crate::geometry::Rect;

/// Full-length band of `area` along the split axis.
fn band(area: Rect, splits_width: bool, offset: i32, len: u32) -> Rect {
    if splits_width {
        Rect::new(offset, area.y, len, area.height)
    } else {
        Rect::new(area.x, offset, area.width, len)
    }
}

/// Stack `count` clients inside `rect`, perpendicular to the split axis.
fn stack(rect: Rect, splits_width: bool, count: usize) -> impl Iterator<Item = Rect> {
    let parts = if splits_width {
        split_even(rect.y, rect.height, count)
    } else {
        split_even(rect.x, rect.width, count)
    };
    parts.into_iter().map(move |(offset, len)| {
        if splits_width {
            Rect::new(rect.x, offset, rect.width, len)
        } else {
            Rect::new(offset, rect.y, len, rect.height)
        }
    })
}

pub(super) fn arrange(side: TileSide, params: &LayoutParams, area: Rect, n: usize) -> Vec<Rect> {
    let splits_width = side.splits_width();
    let (start, dim) = if splits_width { (area.x, area.width) } else { (area.y, area.height) };
    let nmaster = params.nmaster.min(n);
    let nstack = n - nmaster;

    // One group only: it spans the whole area.
    if nmaster == 0 || nstack == 0 || dim < 2 {
        return stack(area, splits_width, n).collect();
    }

    let mwfact = params.mwfact.clamp(MWFACT_MIN, MWFACT_MAX);
    let master_len = |max: u32| ((dim as f64 * mwfact).round() as u32).clamp(1, max);

    if params.mirror && nstack > 1 && dim >= 3 {
        return mirrored(side, area, start, dim, master_len(dim - 2), nmaster, nstack);
    }

    let m = master_len(dim - 1);
    let master_first = matches!(side, TileSide::Left | TileSide::Top);
    let (master_at, stack_at) = if master_first {
        (start, start + m as i32)
    } else {
        (start + (dim - m) as i32, start)
    };

    let master = band(area, splits_width, master_at, m);
    let rest = band(area, splits_width, stack_at, dim - m);
    stack(master, splits_width, nmaster)
        .chain(stack(rest, splits_width, nstack))
        .collect()
}

/// Master group in a centered band, stack clients alternating between the flanks.
fn mirrored(side: TileSide, area: Rect, start: i32, dim: u32, m: u32, nmaster: usize, nstack: usize) -> Vec<Rect> {
    let splits_width = side.splits_width();
    let before_len = (dim - m) / 2;
    let after_len = dim - m - before_len;

    let before = band(area, splits_width, start, before_len);
    let master = band(area, splits_width, start + before_len as i32, m);
    let after = band(area, splits_width, start + (before_len + m) as i32, after_len);

    // The band opposite the master's nominal side takes the first stack client.
    let (first, second) = match side {
        TileSide::Left | TileSide::Top => (after, before),
        TileSide::Right | TileSide::Bottom => (before, after),
    };
    let first_count = (nstack + 1) / 2;
    let mut first_slots = stack(first, splits_width, first_count);
    let mut second_slots = stack(second, splits_width, nstack - first_count);

    let mut rects: Vec<Rect> = stack(master, splits_width, nmaster).collect();
    for i in 0..nstack {
        let slot = if i % 2 == 0 { first_slots.next() } else { second_slots.next() };
        rects.extend(slot);
    }
    rects
}
