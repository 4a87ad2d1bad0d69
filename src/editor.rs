use std::path::PathBuf;

use bevy::input::mouse::MouseWheel;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use crate::autotile;
use crate::components::{GameConfig, TileKind};
use crate::draw::{DrawCommand, DrawList};
use crate::render::{FrameDraw, SpriteAssets};
use crate::save_file::{self, SaveData, ENEMY_SPAWN_VARIANT, PLAYER_SPAWN_VARIANT};
use crate::tilemap::{OffgridTile, Tilemap};

/// Pixels scrolled per tick while a WASD key is held.
pub const SCROLL_SPEED: f32 = 4.0;
const PREVIEW_ALPHA: f32 = 100.0 / 255.0;
const PREVIEW_CORNER: Vec2 = Vec2::new(5.0, 5.0);

/// Level editor state. Mouse positions are in display pixels.
#[derive(Resource, Clone, Debug)]
pub struct EditorState {
    pub group: usize,
    pub variant: usize,
    pub on_grid: bool,
    pub scroll: Vec2,
    pub shift: bool,
    pub clicking: bool,
    pub right_clicking: bool,
    pub cursor: Option<Vec2>,
    pub level_path: PathBuf,
    pub save_path: PathBuf,
    /// Why the level could not be opened; the editor then starts empty.
    pub load_error: Option<String>,
}

impl EditorState {
    pub fn new(level_path: PathBuf, save_path: PathBuf) -> Self {
        Self {
            group: 0,
            variant: 0,
            on_grid: true,
            scroll: Vec2::ZERO,
            shift: false,
            clicking: false,
            right_clicking: false,
            cursor: None,
            level_path,
            save_path,
            load_error: None,
        }
    }

    pub fn kind(&self) -> TileKind {
        TileKind::PALETTE[self.group % TileKind::PALETTE.len()]
    }

    pub fn world_point(&self, mouse: Vec2) -> Vec2 {
        mouse + self.scroll
    }

    pub fn cursor_cell(&self, tilemap: &Tilemap, mouse: Vec2) -> (i32, i32) {
        tilemap.grid_cell(self.world_point(mouse))
    }

    /// Overwrite the cell under the cursor with the selected tile.
    pub fn paint(&self, tilemap: &mut Tilemap, mouse: Vec2) {
        let cell = self.cursor_cell(tilemap, mouse);
        tilemap.set(cell, self.kind(), self.variant);
    }

    /// Drop one off-grid tile at the exact cursor position.
    pub fn place_offgrid(&self, tilemap: &mut Tilemap, mouse: Vec2) {
        tilemap.push_offgrid(self.kind(), self.variant, self.world_point(mouse));
    }

    /// Clear the grid cell under the cursor and the most recently painted
    /// off-grid tile covering it.
    pub fn erase(
        &self,
        tilemap: &mut Tilemap,
        mouse: Vec2,
        size_of: impl Fn(&OffgridTile) -> Option<Vec2>,
    ) {
        let cell = self.cursor_cell(tilemap, mouse);
        tilemap.remove(cell);
        tilemap.remove_last_offgrid_at(self.world_point(mouse), size_of);
    }

    pub fn cycle_group(&mut self, step: i32) {
        let len = TileKind::PALETTE.len() as i32;
        self.group = (self.group as i32 + step).rem_euclid(len) as usize;
        self.variant = 0;
    }

    /// Step through the `count` variants of the selected group. No-op for a
    /// group without images.
    pub fn cycle_variant(&mut self, step: i32, count: usize) {
        if count == 0 {
            return;
        }
        self.variant = (self.variant as i32 + step).rem_euclid(count as i32) as usize;
    }

    pub fn toggle_grid(&mut self) {
        self.on_grid = !self.on_grid;
    }

    pub fn scroll_by(&mut self, direction: Vec2) {
        self.scroll += direction * SCROLL_SPEED;
    }

    pub fn autotile(&self, tilemap: &mut Tilemap) -> usize {
        autotile::autotile(tilemap)
    }

    /// Write the level file, then the save file built from spawner markers.
    /// Returns the spawn points written, or `None` when the level has no
    /// player marker (the save file is left alone).
    pub fn save(&self, tilemap: &mut Tilemap) -> Result<Option<SaveData>, String> {
        tilemap.save(&self.level_path)?;
        let markers = tilemap.extract(
            &[
                (TileKind::Spawners, PLAYER_SPAWN_VARIANT),
                (TileKind::Spawners, ENEMY_SPAWN_VARIANT),
            ],
            true,
        );
        let Some(save) = SaveData::from_markers(&markers) else {
            return Ok(None);
        };
        save_file::write_save(&self.save_path, &save)?;
        Ok(Some(save))
    }

    /// Map, then the selected tile ghosted in the corner and under the cursor.
    pub fn render(&self, tilemap: &Tilemap, viewport: Vec2, draw: &mut DrawList) {
        let offset = self.scroll.floor();
        tilemap.render(viewport, offset, draw);

        let group = self.kind().as_str();
        let ghost = |at: Vec2| DrawCommand::new(group, self.variant, at).with_alpha(PREVIEW_ALPHA);
        draw.push(ghost(PREVIEW_CORNER));
        let Some(mouse) = self.cursor else {
            return;
        };
        if self.on_grid {
            let cell = self.cursor_cell(tilemap, mouse);
            let ts = tilemap.tile_size as f32;
            let at = Vec2::new(cell.0 as f32 * ts, cell.1 as f32 * ts) - offset;
            draw.push(ghost(at).sized(Vec2::splat(ts)));
        } else {
            draw.push(ghost(mouse));
        }
    }
}

pub struct EditorPlugin;

impl Plugin for EditorPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, report_load_error).add_systems(
            Update,
            (editor_events, editor_hold_actions, editor_draw).chain(),
        );
    }
}

fn report_load_error(editor: Res<EditorState>) {
    if let Some(e) = &editor.load_error {
        error!("[Witchlink editor] {}; starting with an empty level", e);
    }
}

/// Cursor in display pixels, from the window cursor scaled down to the
/// logical display.
fn display_cursor(window: &Window, display: (f32, f32)) -> Option<Vec2> {
    let scale = window.width() / display.0;
    if scale <= 0.0 {
        return None;
    }
    window.cursor_position().map(|p| p / scale)
}

#[allow(clippy::too_many_arguments)]
fn editor_events(
    mut editor: ResMut<EditorState>,
    mut tilemap: ResMut<Tilemap>,
    keyboard: Res<ButtonInput<KeyCode>>,
    mouse: Res<ButtonInput<MouseButton>>,
    mut wheel: EventReader<MouseWheel>,
    windows: Query<&Window, With<PrimaryWindow>>,
    sprites: Res<SpriteAssets>,
    config: Res<GameConfig>,
) {
    editor.cursor = windows
        .get_single()
        .ok()
        .and_then(|w| display_cursor(w, config.display_size));
    editor.shift = keyboard.any_pressed([KeyCode::ShiftLeft, KeyCode::ShiftRight]);

    for ev in wheel.read() {
        let step = if ev.y > 0.0 {
            -1
        } else if ev.y < 0.0 {
            1
        } else {
            continue;
        };
        if editor.shift {
            let count = sprites.variant_count(editor.kind().as_str());
            editor.cycle_variant(step, count);
        } else {
            editor.cycle_group(step);
        }
    }

    if mouse.just_pressed(MouseButton::Left) {
        editor.clicking = true;
        if let (false, Some(at)) = (editor.on_grid, editor.cursor) {
            editor.place_offgrid(&mut tilemap, at);
        }
    }
    if mouse.just_released(MouseButton::Left) {
        editor.clicking = false;
    }
    if mouse.just_pressed(MouseButton::Right) {
        editor.right_clicking = true;
    }
    if mouse.just_released(MouseButton::Right) {
        editor.right_clicking = false;
    }

    if keyboard.just_pressed(KeyCode::KeyG) {
        editor.toggle_grid();
    }
    if keyboard.just_pressed(KeyCode::KeyT) {
        let changed = editor.autotile(&mut tilemap);
        info!("[Witchlink editor] Autotiled {} tiles", changed);
    }
    if keyboard.just_pressed(KeyCode::KeyO) {
        match editor.save(&mut tilemap) {
            Ok(Some(save)) => info!(
                "[Witchlink editor] Saved {} and {} ({} enemy spawns)",
                editor.level_path.display(),
                editor.save_path.display(),
                save.enemies.len()
            ),
            Ok(None) => warn!(
                "[Witchlink editor] Saved {}; no player spawn marker, {} not written",
                editor.level_path.display(),
                editor.save_path.display()
            ),
            Err(e) => error!("[Witchlink editor] Save failed: {}", e),
        }
    }
}

fn editor_hold_actions(
    mut editor: ResMut<EditorState>,
    mut tilemap: ResMut<Tilemap>,
    keyboard: Res<ButtonInput<KeyCode>>,
    sprites: Res<SpriteAssets>,
    images: Res<Assets<Image>>,
) {
    let axis = |neg: KeyCode, pos: KeyCode| {
        keyboard.pressed(pos) as i32 as f32 - keyboard.pressed(neg) as i32 as f32
    };
    let direction = Vec2::new(axis(KeyCode::KeyA, KeyCode::KeyD), axis(KeyCode::KeyW, KeyCode::KeyS));
    if direction != Vec2::ZERO {
        editor.scroll_by(direction);
    }

    let Some(mouse) = editor.cursor else {
        return;
    };
    if editor.clicking && editor.on_grid {
        editor.paint(&mut tilemap, mouse);
    }
    if editor.right_clicking {
        editor.erase(&mut tilemap, mouse, |tile| {
            sprites.size_of(tile.kind.as_str(), tile.variant, &images)
        });
    }
}

fn editor_draw(
    editor: Res<EditorState>,
    tilemap: Res<Tilemap>,
    config: Res<GameConfig>,
    mut frame: ResMut<FrameDraw>,
) {
    frame.0.clear();
    let viewport = Vec2::new(config.display_size.0, config.display_size.1);
    editor.render(&tilemap, viewport, &mut frame.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor() -> EditorState {
        EditorState::new(PathBuf::from("map.json"), PathBuf::from("save.txt"))
    }

    #[test]
    fn cursor_cell_accounts_for_scroll() {
        let map = Tilemap::new(48);
        let mut ed = editor();
        assert_eq!(ed.cursor_cell(&map, Vec2::new(47.0, 10.0)), (0, 0));
        ed.scroll_by(Vec2::new(1.0, 0.0));
        assert_eq!(ed.cursor_cell(&map, Vec2::new(47.0, 10.0)), (1, 0));
        ed.scroll = Vec2::new(-100.0, 0.0);
        assert_eq!(ed.cursor_cell(&map, Vec2::new(10.0, 10.0)), (-2, 0));
    }

    #[test]
    fn paint_overwrites_cell() {
        let mut map = Tilemap::new(48);
        let mut ed = editor();
        ed.paint(&mut map, Vec2::new(50.0, 50.0));
        assert_eq!(map.get((1, 1)).unwrap().kind, TileKind::Grass);
        ed.cycle_group(1);
        ed.variant = 3;
        ed.paint(&mut map, Vec2::new(60.0, 60.0));
        let tile = map.get((1, 1)).unwrap();
        assert_eq!((tile.kind, tile.variant), (TileKind::Stone, 3));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn erase_takes_last_painted_offgrid_tile_only() {
        let mut map = Tilemap::new(48);
        let mut ed = editor();
        ed.toggle_grid();
        ed.group = TileKind::PALETTE.iter().position(|k| *k == TileKind::Decor).unwrap();
        ed.place_offgrid(&mut map, Vec2::new(10.0, 10.0));
        ed.variant = 1;
        ed.place_offgrid(&mut map, Vec2::new(12.0, 12.0));
        map.set((0, 0), TileKind::Stone, 0);

        ed.erase(&mut map, Vec2::new(20.0, 20.0), |_| Some(Vec2::splat(16.0)));
        assert!(map.get((0, 0)).is_none());
        assert_eq!(map.offgrid().len(), 1);
        assert_eq!(map.offgrid()[0].variant, 0);

        ed.erase(&mut map, Vec2::new(100.0, 100.0), |_| Some(Vec2::splat(16.0)));
        assert_eq!(map.offgrid().len(), 1);
    }

    #[test]
    fn group_and_variant_cycling_wrap() {
        let mut ed = editor();
        ed.variant = 2;
        ed.cycle_group(-1);
        assert_eq!(ed.kind(), *TileKind::PALETTE.last().unwrap());
        assert_eq!(ed.variant, 0);
        ed.cycle_variant(-1, 9);
        assert_eq!(ed.variant, 8);
        ed.cycle_variant(1, 9);
        assert_eq!(ed.variant, 0);
        ed.cycle_variant(1, 0);
        assert_eq!(ed.variant, 0);
    }

    #[test]
    fn render_ghosts_selection_on_grid_cell() {
        let map = Tilemap::new(48);
        let mut ed = editor();
        ed.cursor = Some(Vec2::new(100.0, 60.0));
        let mut draw = DrawList::default();
        ed.render(&map, Vec2::new(480.0, 270.0), &mut draw);
        assert_eq!(draw.len(), 2);
        assert_eq!(draw.commands[0].position, PREVIEW_CORNER);
        assert_eq!(draw.commands[1].position, Vec2::new(96.0, 48.0));
        assert!(draw.commands[1].alpha < 1.0);
    }

    #[test]
    fn save_writes_level_and_spawns_from_markers() {
        let dir = std::env::temp_dir().join(format!("witchlink-editor-{}", std::process::id()));
        let ed = EditorState::new(dir.join("map.json"), dir.join("saves").join("save.txt"));
        let mut map = Tilemap::new(48);
        map.set((0, 3), TileKind::Grass, 1);
        map.push_offgrid(TileKind::Spawners, PLAYER_SPAWN_VARIANT, Vec2::new(50.5, 80.0));
        map.set((4, 2), TileKind::Spawners, ENEMY_SPAWN_VARIANT);

        let save = ed.save(&mut map).unwrap().unwrap();
        assert_eq!(save.player, (50, 80));
        assert_eq!(save.enemies, vec![(192, 96)]);
        assert_eq!(map.offgrid().len(), 1);
        assert!(map.get((4, 2)).is_some());

        let reloaded = Tilemap::load(&ed.level_path).unwrap().unwrap();
        assert_eq!(reloaded, map);
        assert_eq!(save_file::load_save(&ed.save_path).unwrap(), Some(save));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn save_without_player_marker_skips_save_file() {
        let dir = std::env::temp_dir().join(format!("witchlink-editor-np-{}", std::process::id()));
        let ed = EditorState::new(dir.join("map.json"), dir.join("save.txt"));
        let mut map = Tilemap::new(48);
        map.set((0, 0), TileKind::Stone, 0);
        assert_eq!(ed.save(&mut map).unwrap(), None);
        assert!(ed.level_path.exists());
        assert!(!ed.save_path.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
