use std::path::Path;

use bevy::math::Vec2;

use crate::components::TileKind;
use crate::tilemap::OffgridTile;

pub const PLAYER_SPAWN_VARIANT: usize = 0;
pub const ENEMY_SPAWN_VARIANT: usize = 1;

/// Spawn points persisted next to the level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaveData {
    pub enemies: Vec<(i32, i32)>,
    pub player: (i32, i32),
}

impl SaveData {
    pub fn player_spawn(&self) -> Vec2 {
        Vec2::new(self.player.0 as f32, self.player.1 as f32)
    }

    pub fn enemy_spawns(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.enemies
            .iter()
            .map(|&(x, y)| Vec2::new(x as f32, y as f32))
    }

    /// Build from spawner markers pulled out of a level. `None` without a
    /// player marker.
    pub fn from_markers(markers: &[OffgridTile]) -> Option<Self> {
        let to_point = |t: &OffgridTile| (t.pos.0.floor() as i32, t.pos.1.floor() as i32);
        let player = markers
            .iter()
            .find(|t| t.kind == TileKind::Spawners && t.variant == PLAYER_SPAWN_VARIANT)
            .map(to_point)?;
        let enemies = markers
            .iter()
            .filter(|t| t.kind == TileKind::Spawners && t.variant == ENEMY_SPAWN_VARIANT)
            .map(to_point)
            .collect();
        Some(Self { enemies, player })
    }
}

fn parse_point(text: &str) -> Result<(i32, i32), String> {
    let (x, y) = text
        .split_once(',')
        .ok_or_else(|| format!("Spawn point '{text}' is not of the form x,y"))?;
    let x = x
        .trim()
        .parse::<i32>()
        .map_err(|e| format!("Spawn point '{text}': bad x: {e}"))?;
    let y = y
        .trim()
        .parse::<i32>()
        .map_err(|e| format!("Spawn point '{text}': bad y: {e}"))?;
    Ok((x, y))
}

pub fn parse_save(text: &str) -> Result<SaveData, String> {
    let mut lines = text.lines();
    let enemy_line = lines.next().unwrap_or("");
    let player_line = lines
        .next()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .ok_or_else(|| "Save file has no player spawn line".to_string())?;
    let enemies = enemy_line
        .split("__")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_point)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(SaveData {
        enemies,
        player: parse_point(player_line)?,
    })
}

pub fn format_save(save: &SaveData) -> String {
    let enemies: Vec<String> = save
        .enemies
        .iter()
        .map(|(x, y)| format!("{x},{y}"))
        .collect();
    format!("{}\n{},{}", enemies.join("__"), save.player.0, save.player.1)
}

/// `Ok(None)` when the file does not exist.
pub fn load_save(path: &Path) -> Result<Option<SaveData>, String> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(format!("Failed to read {}: {e}", path.display())),
    };
    parse_save(&text)
        .map(Some)
        .map_err(|e| format!("{}: {e}", path.display()))
}

pub fn write_save(path: &Path, save: &SaveData) -> Result<(), String> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create {}: {e}", parent.display()))?;
    }
    std::fs::write(path, format_save(save))
        .map_err(|e| format!("Failed to write {}: {e}", path.display()))
}
