use crate::tilemap::Tilemap;

/// Variant used for lone tiles and neighbour sets with no dedicated piece.
pub const DEFAULT_VARIANT: usize = 1;

/// Same-kind neighbour presence on the four sides (y grows downward).
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct NeighborMask {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl NeighborMask {
    /// 4-bit key: up=1, down=2, left=4, right=8.
    pub fn bits(self) -> u8 {
        (self.up as u8) | (self.down as u8) << 1 | (self.left as u8) << 2 | (self.right as u8) << 3
    }
}

const UP: u8 = 1;
const DOWN: u8 = 2;
const LEFT: u8 = 4;
const RIGHT: u8 = 8;

/// Nine-slice layout of a terrain sheet: corners, edges and the fill piece.
const VARIANTS: [(u8, usize); 9] = [
    (RIGHT | DOWN, 0),
    (LEFT | RIGHT | DOWN, 1),
    (LEFT | DOWN, 2),
    (LEFT | UP | DOWN, 3),
    (LEFT | UP, 4),
    (LEFT | UP | RIGHT, 5),
    (RIGHT | UP, 6),
    (RIGHT | UP | DOWN, 7),
    (LEFT | RIGHT | UP | DOWN, 8),
];

pub fn classify(mask: NeighborMask) -> usize {
    let bits = mask.bits();
    VARIANTS
        .iter()
        .find(|(key, _)| *key == bits)
        .map_or(DEFAULT_VARIANT, |(_, variant)| *variant)
}

pub fn neighbor_mask(tilemap: &Tilemap, cell: (i32, i32)) -> NeighborMask {
    let Some(tile) = tilemap.get(cell) else {
        return NeighborMask::default();
    };
    let same = |dx: i32, dy: i32| {
        tilemap
            .get((cell.0 + dx, cell.1 + dy))
            .is_some_and(|n| n.kind == tile.kind && n.kind.is_solid())
    };
    NeighborMask {
        up: same(0, -1),
        down: same(0, 1),
        left: same(-1, 0),
        right: same(1, 0),
    }
}

/// Re-pick the variant of every autotiled grid tile. Returns the number changed.
pub fn autotile(tilemap: &mut Tilemap) -> usize {
    let updates: Vec<((i32, i32), usize)> = tilemap
        .tiles()
        .filter(|t| t.kind.is_autotiled())
        .map(|t| (t.pos, classify(neighbor_mask(tilemap, t.pos))))
        .filter(|&(cell, variant)| tilemap.get(cell).is_some_and(|t| t.variant != variant))
        .collect();
    for &(cell, variant) in &updates {
        if let Some(tile) = tilemap.get(cell).copied() {
            tilemap.set(cell, tile.kind, variant);
        }
    }
    updates.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::TileKind;

    #[test]
    fn classify_is_total_over_all_sixteen_masks() {
        let mut seen = std::collections::HashSet::new();
        for bits in 0u8..16 {
            let mask = NeighborMask {
                up: bits & UP != 0,
                down: bits & DOWN != 0,
                left: bits & LEFT != 0,
                right: bits & RIGHT != 0,
            };
            assert_eq!(mask.bits(), bits);
            let variant = classify(mask);
            assert!(variant <= 8);
            seen.insert(variant);
        }
        assert_eq!(seen.len(), 9);
        assert_eq!(classify(NeighborMask::default()), DEFAULT_VARIANT);
    }

    #[test]
    fn autotile_shapes_a_block() {
        let mut map = Tilemap::new(48);
        for x in 0..3 {
            for y in 0..3 {
                map.set((x, y), TileKind::Grass, 0);
            }
        }
        map.set((5, 5), TileKind::Pink, 7);
        autotile(&mut map);
        assert_eq!(map.get((0, 0)).unwrap().variant, 0);
        assert_eq!(map.get((1, 0)).unwrap().variant, 1);
        assert_eq!(map.get((2, 0)).unwrap().variant, 2);
        assert_eq!(map.get((1, 1)).unwrap().variant, 8);
        assert_eq!(map.get((2, 2)).unwrap().variant, 4);
        assert_eq!(map.get((5, 5)).unwrap().variant, 7);
        assert_eq!(autotile(&mut map), 0);
    }

    #[test]
    fn different_kinds_do_not_join() {
        let mut map = Tilemap::new(48);
        map.set((0, 0), TileKind::Grass, 0);
        map.set((1, 0), TileKind::Stone, 0);
        assert_eq!(neighbor_mask(&map, (0, 0)), NeighborMask::default());
    }
}
