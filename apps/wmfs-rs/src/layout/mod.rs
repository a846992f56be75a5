//! Layout engine: a pure mapping from tiled clients to frame rectangles.

mod grid;
mod tile;

use crate::geometry::{Padding, Rect};
use crate::window::client::SizeHints;

pub const MWFACT_MIN: f64 = 0.05;
pub const MWFACT_MAX: f64 = 0.95;

/// Side of the usable area the master group occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileSide {
    Left,
    Right,
    Top,
    Bottom,
}

impl TileSide {
    /// Whether the master/stack split runs along the x axis.
    fn splits_width(self) -> bool {
        matches!(self, TileSide::Left | TileSide::Right)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Tile(TileSide),
    Grid,
    Max,
    Free,
}

impl Layout {
    /// Cycle order for `layout_next` / `layout_prev`.
    pub const ALL: [Layout; 7] = [
        Layout::Tile(TileSide::Left),
        Layout::Tile(TileSide::Right),
        Layout::Tile(TileSide::Top),
        Layout::Tile(TileSide::Bottom),
        Layout::Grid,
        Layout::Max,
        Layout::Free,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|layout| layout.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Layout::Tile(TileSide::Left) => "tile_left",
            Layout::Tile(TileSide::Right) => "tile_right",
            Layout::Tile(TileSide::Top) => "tile_top",
            Layout::Tile(TileSide::Bottom) => "tile_bottom",
            Layout::Grid => "grid",
            Layout::Max => "max",
            Layout::Free => "free",
        }
    }

    /// Short marker shown in the infobar.
    pub fn symbol(self) -> &'static str {
        match self {
            Layout::Tile(TileSide::Left) => "[]=",
            Layout::Tile(TileSide::Right) => "=[]",
            Layout::Tile(TileSide::Top) => "[^]",
            Layout::Tile(TileSide::Bottom) => "[_]",
            Layout::Grid => "###",
            Layout::Max => "[M]",
            Layout::Free => "><>",
        }
    }

    fn position(self) -> usize {
        Self::ALL.iter().position(|l| *l == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.position() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.position() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutParams {
    /// Master share of the split axis, within `MWFACT_MIN..=MWFACT_MAX`
    pub mwfact: f64,
    pub nmaster: usize,
    pub mirror: bool,
    /// Shrink slots to honour increment and aspect hints
    pub resizehint: bool,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self { mwfact: 0.65, nmaster: 1, mirror: false, resizehint: false }
    }
}

impl LayoutParams {
    pub fn with_mwfact(self, mwfact: f64) -> Self {
        Self { mwfact: mwfact.clamp(MWFACT_MIN, MWFACT_MAX), ..self }
    }
}

/// What the layout needs to know about one tiled client.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Slot {
    pub hints: SizeHints,
    pub padding: Padding,
}

/// Outer frame rectangles for `clients`, index-aligned to the input.
///
/// `Free` produces nothing: floating clients keep their geometry.
pub fn arrange(layout: Layout, params: &LayoutParams, area: Rect, clients: &[Slot]) -> Vec<Rect> {
    let n = clients.len();
    if n == 0 {
        return Vec::new();
    }

    let rects = match layout {
        Layout::Free => return Vec::new(),
        Layout::Max => vec![area; n],
        Layout::Grid => grid::arrange(area, n),
        Layout::Tile(side) => tile::arrange(side, params, area, n),
    };

    if !params.resizehint {
        return rects;
    }

    rects
        .into_iter()
        .zip(clients)
        .map(|(rect, slot)| apply_hints(rect, slot))
        .collect()
}

/// Shrink a slot so the client inside satisfies its size hints.
fn apply_hints(rect: Rect, slot: &Slot) -> Rect {
    let inner = rect.shrink(slot.padding);
    let (w, h) = slot.hints.constrain(inner.width as i32, inner.height as i32, true);
    Rect::new(inner.x, inner.y, w.min(inner.width), h.min(inner.height)).grow(slot.padding)
}

/// Split `len` starting at `start` into `count` even parts; the last absorbs the remainder.
pub(crate) fn split_even(start: i32, len: u32, count: usize) -> Vec<(i32, u32)> {
    if count == 0 {
        return Vec::new();
    }
    let each = (len / count as u32).max(1);
    (0..count)
        .map(|i| {
            let offset = start + (each * i as u32) as i32;
            let size = if i + 1 == count {
                len.saturating_sub(each * i as u32).max(1)
            } else {
                each
            };
            (offset, size)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const AREA: Rect = Rect::new(0, 0, 1000, 800);

    fn slots(n: usize) -> Vec<Slot> {
        vec![Slot::default(); n]
    }

    fn params(mwfact: f64, nmaster: usize) -> LayoutParams {
        LayoutParams { mwfact, nmaster, ..LayoutParams::default() }
    }

    fn area_sum(rects: &[Rect]) -> u64 {
        rects.iter().map(|r| r.width as u64 * r.height as u64).sum()
    }

    fn disjoint(rects: &[Rect]) -> bool {
        rects
            .iter()
            .enumerate()
            .all(|(i, a)| rects[i + 1..].iter().all(|b| a.intersection(b).is_none()))
    }

    #[test]
    fn test_one_rect_per_client() {
        for layout in [Layout::Tile(TileSide::Left), Layout::Tile(TileSide::Bottom), Layout::Grid, Layout::Max] {
            for n in 0..12 {
                assert_eq!(arrange(layout, &params(0.6, 1), AREA, &slots(n)).len(), n, "{:?} n={}", layout, n);
            }
        }
    }

    #[test]
    fn test_free_produces_nothing() {
        assert!(arrange(Layout::Free, &params(0.6, 1), AREA, &slots(3)).is_empty());
    }

    #[test]
    fn test_tiling_layouts_partition_area() {
        let layouts = [
            Layout::Tile(TileSide::Left),
            Layout::Tile(TileSide::Right),
            Layout::Tile(TileSide::Top),
            Layout::Tile(TileSide::Bottom),
            Layout::Grid,
        ];
        for layout in layouts {
            for mirror in [false, true] {
                for n in 1..10 {
                    let p = LayoutParams { mirror, ..params(0.6, 2) };
                    let rects = arrange(layout, &p, AREA, &slots(n));
                    assert!(rects.iter().all(|r| AREA.contains(r)), "{:?} n={}", layout, n);
                    assert!(disjoint(&rects), "{:?} mirror={} n={} overlap", layout, mirror, n);
                    assert_eq!(area_sum(&rects), 1000 * 800, "{:?} mirror={} n={}", layout, mirror, n);
                }
            }
        }
    }

    #[test]
    fn test_arrange_is_idempotent() {
        let p = LayoutParams { mirror: true, ..params(0.55, 2) };
        let first = arrange(Layout::Tile(TileSide::Top), &p, AREA, &slots(5));
        let second = arrange(Layout::Tile(TileSide::Top), &p, AREA, &slots(5));
        assert_eq!(first, second);
    }

    #[test]
    fn test_max_fills_area() {
        let rects = arrange(Layout::Max, &params(0.6, 1), AREA, &slots(3));
        assert!(rects.iter().all(|r| *r == AREA));
    }

    #[test]
    fn test_resizehint_shrinks_within_slot() {
        let hints = SizeHints { increment: Some((7, 13)), ..SizeHints::default() };
        let padding = Padding { left: 1, right: 1, top: 10, bottom: 1 };
        let clients = vec![Slot { hints, padding }; 2];
        let p = LayoutParams { resizehint: true, ..params(0.6, 1) };
        let plain = arrange(Layout::Tile(TileSide::Left), &params(0.6, 1), AREA, &clients);
        let hinted = arrange(Layout::Tile(TileSide::Left), &p, AREA, &clients);
        for (slot, rect) in plain.iter().zip(&hinted) {
            assert!(slot.contains(rect));
            assert_eq!((rect.width - 2) % 7, 0);
            assert_eq!((rect.height - 11) % 13, 0);
        }
    }

    #[test]
    fn test_layout_cycle_wraps() {
        assert_eq!(Layout::Free.next(), Layout::Tile(TileSide::Left));
        assert_eq!(Layout::Tile(TileSide::Left).prev(), Layout::Free);
        assert_eq!(Layout::from_name("grid"), Some(Layout::Grid));
        assert_eq!(Layout::from_name("spiral"), None);
    }

    #[test]
    fn test_split_even_absorbs_remainder() {
        assert_eq!(split_even(0, 800, 3), vec![(0, 266), (266, 266), (532, 268)]);
        assert_eq!(split_even(10, 5, 1), vec![(10, 5)]);
    }
}
