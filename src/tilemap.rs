use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use bevy::math::Vec2;
use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::components::TileKind;
use crate::draw::{DrawCommand, DrawList};
use crate::physics_core::{Rect, SolidGeometry};

/// The cell itself plus its 8 compass neighbours.
const NEIGHBOR_OFFSETS: [(i32, i32); 9] = [
    (-1, 0),
    (-1, -1),
    (0, -1),
    (0, 0),
    (0, 1),
    (1, 1),
    (1, 0),
    (-1, 1),
    (1, -1),
];

/// Cells outside the viewport still drawn, so tiles slide in instead of popping.
const RENDER_MARGIN: i32 = 4;

/// Max gap in pixels between a body's bottom and the floor for `solid_below`.
const FLOOR_PROBE: f32 = 4.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    #[serde(rename = "type")]
    pub kind: TileKind,
    pub variant: usize,
    pub pos: (i32, i32),
}

/// Decorative tile at an arbitrary pixel position. Never collides.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OffgridTile {
    #[serde(rename = "type")]
    pub kind: TileKind,
    pub variant: usize,
    pub pos: (f32, f32),
}

/// What rescuing a given enemy hands the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reward {
    Key,
    Heart,
}

#[derive(Serialize, Deserialize)]
struct LevelFile {
    tilemap: BTreeMap<String, Tile>,
    tile_size: i32,
    offgrid: Vec<OffgridTile>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    rewards: BTreeMap<String, Reward>,
}

pub fn format_key(cell: (i32, i32)) -> String {
    format!("{};{}", cell.0, cell.1)
}

pub fn parse_key(key: &str) -> Result<(i32, i32), String> {
    let (x, y) = key
        .split_once(';')
        .ok_or_else(|| format!("Tile key '{key}' is not of the form x;y"))?;
    let x = x
        .trim()
        .parse::<i32>()
        .map_err(|e| format!("Tile key '{key}': bad x: {e}"))?;
    let y = y
        .trim()
        .parse::<i32>()
        .map_err(|e| format!("Tile key '{key}': bad y: {e}"))?;
    Ok((x, y))
}

/// Sparse tile store: grid tiles keyed by cell, plus ordered off-grid decor.
#[derive(Resource, Clone, Debug, PartialEq)]
pub struct Tilemap {
    pub tile_size: i32,
    tiles: HashMap<(i32, i32), Tile>,
    offgrid: Vec<OffgridTile>,
    /// Enemy id -> reward granted on rescue.
    pub rewards: BTreeMap<u32, Reward>,
}

impl Default for Tilemap {
    fn default() -> Self {
        Self::new(48)
    }
}

impl Tilemap {
    pub fn new(tile_size: i32) -> Self {
        Self {
            tile_size: tile_size.max(1),
            tiles: HashMap::new(),
            offgrid: Vec::new(),
            rewards: BTreeMap::new(),
        }
    }

    fn ts(&self) -> f32 {
        self.tile_size as f32
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty() && self.offgrid.is_empty()
    }

    pub fn set(&mut self, cell: (i32, i32), kind: TileKind, variant: usize) {
        self.tiles.insert(
            cell,
            Tile {
                kind,
                variant,
                pos: cell,
            },
        );
    }

    pub fn remove(&mut self, cell: (i32, i32)) -> Option<Tile> {
        self.tiles.remove(&cell)
    }

    pub fn get(&self, cell: (i32, i32)) -> Option<&Tile> {
        self.tiles.get(&cell)
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.values()
    }

    /// Only `kind`/`variant` may be changed through this; the cell is the key.
    pub fn tiles_mut(&mut self) -> impl Iterator<Item = &mut Tile> {
        self.tiles.values_mut()
    }

    pub fn offgrid(&self) -> &[OffgridTile] {
        &self.offgrid
    }

    pub fn push_offgrid(&mut self, kind: TileKind, variant: usize, pos: Vec2) {
        self.offgrid.push(OffgridTile {
            kind,
            variant,
            pos: (pos.x, pos.y),
        });
    }

    /// Remove the most recently painted off-grid tile whose rect holds `point`.
    /// `size_of` reports a tile's drawn size; tiles without one can't be hit.
    pub fn remove_last_offgrid_at(
        &mut self,
        point: Vec2,
        size_of: impl Fn(&OffgridTile) -> Option<Vec2>,
    ) -> Option<OffgridTile> {
        let idx = self.offgrid.iter().rposition(|tile| {
            size_of(tile).is_some_and(|size| {
                Rect::new(tile.pos.0, tile.pos.1, size.x, size.y).contains_point(point)
            })
        })?;
        Some(self.offgrid.remove(idx))
    }

    pub fn grid_cell(&self, pixel: Vec2) -> (i32, i32) {
        let ts = self.ts();
        ((pixel.x / ts).floor() as i32, (pixel.y / ts).floor() as i32)
    }

    /// Top cell of a body, plus the cell holding its lower part when the body
    /// is taller than one tile.
    pub fn body_cells(&self, pos: Vec2, entity_height: f32) -> Vec<(i32, i32)> {
        let ts = self.ts();
        let mut cells = vec![self.grid_cell(pos)];
        if entity_height > ts {
            cells.push(self.grid_cell(Vec2::new(pos.x, pos.y + entity_height - ts)));
        }
        cells
    }

    fn lower_cell(&self, pos: Vec2, entity_height: f32) -> (i32, i32) {
        let cells = self.body_cells(pos, entity_height);
        cells[cells.len() - 1]
    }

    /// Tiles in the 9-neighbourhood of each body cell. A tile seen from both
    /// cells is returned twice.
    pub fn neighbors(&self, pos: Vec2, entity_height: f32) -> Vec<&Tile> {
        let cells = self.body_cells(pos, entity_height);
        let mut out = Vec::new();
        for (ox, oy) in NEIGHBOR_OFFSETS {
            for &(cx, cy) in &cells {
                if let Some(tile) = self.tiles.get(&(cx + ox, cy + oy)) {
                    out.push(tile);
                }
            }
        }
        out
    }

    pub fn tile_rect(&self, cell: (i32, i32)) -> Rect {
        let ts = self.ts();
        Rect::new(cell.0 as f32 * ts, cell.1 as f32 * ts, ts, ts)
    }

    pub fn rects_around(&self, pos: Vec2, entity_height: f32) -> Vec<Rect> {
        self.neighbors(pos, entity_height)
            .into_iter()
            .filter(|tile| tile.kind.is_solid())
            .map(|tile| self.tile_rect(tile.pos))
            .collect()
    }

    /// Kind of the tile occupying the body's lower cell.
    pub fn tile_at(&self, pos: Vec2, entity_height: f32) -> Option<TileKind> {
        self.get(self.lower_cell(pos, entity_height)).map(|t| t.kind)
    }

    /// Whether solid ground sits right under the body.
    pub fn solid_below(&self, pos: Vec2, size: Vec2) -> bool {
        let (cx, cy) = self.lower_cell(pos, size.y);
        let below = (cx, cy + 1);
        match self.get(below) {
            Some(tile) if tile.kind.is_solid() => {
                let floor_top = below.1 as f32 * self.ts();
                floor_top - (pos.y + size.y) < FLOOR_PROBE
            }
            _ => false,
        }
    }

    pub fn is_solid_at(&self, pixel: Vec2) -> bool {
        self.get(self.grid_cell(pixel))
            .is_some_and(|tile| tile.kind.is_solid())
    }

    /// Delete every grid tile of `kind`, returning how many went.
    pub fn remove_kind(&mut self, kind: TileKind) -> usize {
        let before = self.tiles.len();
        self.tiles.retain(|_, tile| tile.kind != kind);
        before - self.tiles.len()
    }

    /// Pull out tiles matching any `(kind, variant)` pair, grid tiles converted
    /// to pixel space. Off-grid matches come first, in paint order; grid
    /// matches follow in row-major order.
    pub fn extract(&mut self, pairs: &[(TileKind, usize)], keep: bool) -> Vec<OffgridTile> {
        let matches = |kind: TileKind, variant: usize| pairs.contains(&(kind, variant));
        let mut out: Vec<OffgridTile> = self
            .offgrid
            .iter()
            .filter(|t| matches(t.kind, t.variant))
            .copied()
            .collect();
        if !keep {
            self.offgrid.retain(|t| !matches(t.kind, t.variant));
        }

        let mut cells: Vec<(i32, i32)> = self
            .tiles
            .values()
            .filter(|t| matches(t.kind, t.variant))
            .map(|t| t.pos)
            .collect();
        cells.sort_by_key(|&(x, y)| (y, x));
        let ts = self.ts();
        for cell in cells {
            let Some(tile) = self.tiles.get(&cell).copied() else {
                continue;
            };
            out.push(OffgridTile {
                kind: tile.kind,
                variant: tile.variant,
                pos: (cell.0 as f32 * ts, cell.1 as f32 * ts),
            });
            if !keep {
                self.tiles.remove(&cell);
            }
        }
        out
    }

    /// Emit off-grid tiles in paint order, then grid tiles in view.
    pub fn render(&self, viewport: Vec2, offset: Vec2, draw: &mut DrawList) {
        for tile in &self.offgrid {
            draw.push(DrawCommand::new(
                tile.kind.as_str(),
                tile.variant,
                Vec2::new(tile.pos.0, tile.pos.1) - offset,
            ));
        }

        let ts = self.ts();
        let size = Vec2::splat(ts);
        let min_x = (offset.x / ts).floor() as i32 - RENDER_MARGIN;
        let max_x = ((offset.x + viewport.x) / ts).floor() as i32 + RENDER_MARGIN;
        let min_y = (offset.y / ts).floor() as i32 - RENDER_MARGIN;
        let max_y = ((offset.y + viewport.y) / ts).floor() as i32 + RENDER_MARGIN;
        for x in min_x..max_x {
            for y in min_y..max_y {
                if let Some(tile) = self.tiles.get(&(x, y)) {
                    let at = Vec2::new(x as f32 * ts, y as f32 * ts) - offset;
                    draw.push(DrawCommand::new(tile.kind.as_str(), tile.variant, at).sized(size));
                }
            }
        }
    }

    pub fn to_json(&self) -> Result<String, String> {
        let file = LevelFile {
            tilemap: self
                .tiles
                .iter()
                .map(|(cell, tile)| (format_key(*cell), *tile))
                .collect(),
            tile_size: self.tile_size,
            offgrid: self.offgrid.clone(),
            rewards: self
                .rewards
                .iter()
                .map(|(id, reward)| (id.to_string(), *reward))
                .collect(),
        };
        serde_json::to_string(&file).map_err(|e| format!("Failed to encode level: {e}"))
    }

    pub fn from_json(text: &str) -> Result<Self, String> {
        let file: LevelFile =
            serde_json::from_str(text).map_err(|e| format!("Malformed level file: {e}"))?;
        if file.tile_size <= 0 {
            return Err(format!("Malformed level file: tile_size {} must be positive", file.tile_size));
        }
        let mut tiles = HashMap::with_capacity(file.tilemap.len());
        for (key, tile) in file.tilemap {
            let cell = parse_key(&key)?;
            if cell != tile.pos {
                return Err(format!(
                    "Tile key '{key}' does not match its pos [{}, {}]",
                    tile.pos.0, tile.pos.1
                ));
            }
            tiles.insert(cell, tile);
        }
        let mut rewards = BTreeMap::new();
        for (id, reward) in file.rewards {
            let id = id
                .parse::<u32>()
                .map_err(|e| format!("Reward key '{id}' is not an enemy id: {e}"))?;
            rewards.insert(id, reward);
        }
        Ok(Self {
            tile_size: file.tile_size,
            tiles,
            offgrid: file.offgrid,
            rewards,
        })
    }

    /// `Ok(None)` when the file does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>, String> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(format!("Failed to read {}: {e}", path.display())),
        };
        Self::from_json(&text)
            .map(Some)
            .map_err(|e| format!("{}: {e}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<(), String> {
        let json = self.to_json()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {e}", parent.display()))?;
        }
        std::fs::write(path, json).map_err(|e| format!("Failed to write {}: {e}", path.display()))
    }
}

impl SolidGeometry for Tilemap {
    fn solid_rects_near(&self, pos: Vec2, entity_height: f32) -> Vec<Rect> {
        self.rects_around(pos, entity_height)
    }
}
