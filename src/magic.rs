use bevy::math::Vec2;

use crate::components::{Element, TileKind};
use crate::tilemap::Tilemap;

/// Open the gates of `active` and close the other element's gates.
///
/// Returns how many tiles were rewritten.
pub fn toggle(tilemap: &mut Tilemap, active: Element) -> usize {
    let open_from = active.gate();
    let open_to = active.border();
    let close_from = active.other().border();
    let close_to = active.other().gate();
    let mut changed = 0;
    for tile in tilemap.tiles_mut() {
        if tile.kind == open_from {
            tile.kind = open_to;
            changed += 1;
        } else if tile.kind == close_from {
            tile.kind = close_to;
            changed += 1;
        }
    }
    changed
}

/// A body standing in an open gate would be sealed inside it by a switch.
pub fn can_switch(tilemap: &Tilemap, pos: Vec2, entity_height: f32) -> bool {
    !tilemap
        .tile_at(pos, entity_height)
        .is_some_and(TileKind::is_border)
}
