use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use bevy::prelude::*;
use bevy::sprite::Anchor;

use crate::components::{DrawSlot, GameConfig, MainCamera};
use crate::draw::{DrawCommand, DrawList};

/// Sprite directory under the assets root.
const IMAGE_DIR: &str = "images";
/// Depth step between consecutive draw commands.
const Z_STEP: f32 = 0.001;

/// Image file names per sprite group, e.g. `"player/idle"` -> frames in
/// name order. Built from the assets directory before the app starts.
#[derive(Resource, Clone, Default, Debug, PartialEq)]
pub struct SpriteIndex {
    pub groups: BTreeMap<String, Vec<String>>,
}

impl SpriteIndex {
    /// Every directory below `<root>/images` holding at least one `.png`
    /// becomes a group named by its relative path.
    pub fn scan(root: &Path) -> Result<Self, String> {
        let mut index = Self::default();
        let images = root.join(IMAGE_DIR);
        if images.is_dir() {
            scan_dir(&images, "", &mut index.groups)?;
        }
        Ok(index)
    }

    pub fn frame_count(&self, group: &str) -> usize {
        self.groups.get(group).map_or(0, Vec::len)
    }
}

fn scan_dir(dir: &Path, prefix: &str, out: &mut BTreeMap<String, Vec<String>>) -> Result<(), String> {
    let entries =
        std::fs::read_dir(dir).map_err(|e| format!("Failed to list {}: {e}", dir.display()))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| format!("Failed to list {}: {e}", dir.display()))?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if path.is_dir() {
            let child = if prefix.is_empty() {
                name
            } else {
                format!("{prefix}/{name}")
            };
            scan_dir(&path, &child, out)?;
        } else if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
        {
            files.push(name);
        }
    }
    if !files.is_empty() && !prefix.is_empty() {
        files.sort();
        out.insert(prefix.to_string(), files);
    }
    Ok(())
}

/// Loaded image handles per sprite group.
#[derive(Resource, Default)]
pub struct SpriteAssets {
    groups: HashMap<String, Vec<Handle<Image>>>,
}

impl SpriteAssets {
    pub fn get(&self, group: &str, index: usize) -> Option<&Handle<Image>> {
        self.groups.get(group)?.get(index)
    }

    pub fn variant_count(&self, group: &str) -> usize {
        self.groups.get(group).map_or(0, Vec::len)
    }

    /// Pixel size of a loaded image; `None` while it is still loading.
    pub fn size_of(&self, group: &str, index: usize, images: &Assets<Image>) -> Option<Vec2> {
        let handle = self.get(group, index)?;
        images.get(handle).map(|image| image.size().as_vec2())
    }
}

/// Draw list produced by the active mode this frame.
#[derive(Resource, Default)]
pub struct FrameDraw(pub DrawList);

#[derive(Resource, Default)]
struct MissingSprites(HashSet<(String, usize)>);

pub struct RenderPlugin;

impl Plugin for RenderPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SpriteAssets>()
            .init_resource::<FrameDraw>()
            .init_resource::<MissingSprites>()
            .add_systems(Startup, (spawn_camera, load_sprites))
            .add_systems(PostUpdate, sync_sprites);
    }
}

fn spawn_camera(mut commands: Commands) {
    commands.spawn((
        MainCamera,
        Camera2d,
        OrthographicProjection {
            scale: 0.5,
            ..OrthographicProjection::default_2d()
        },
        Transform::from_xyz(0.0, 0.0, 100.0),
    ));
}

fn load_sprites(
    asset_server: Res<AssetServer>,
    index: Res<SpriteIndex>,
    mut sprites: ResMut<SpriteAssets>,
) {
    for (group, files) in &index.groups {
        let handles = files
            .iter()
            .map(|file| asset_server.load(format!("{IMAGE_DIR}/{group}/{file}")))
            .collect();
        sprites.groups.insert(group.clone(), handles);
    }
    println!("[Witchlink] Loaded {} sprite groups", index.groups.len());
}

/// Top-left display position to a world translation for a top-left anchored
/// sprite, with the display centred on the camera.
pub fn display_to_world(position: Vec2, display: (f32, f32)) -> Vec2 {
    Vec2::new(position.x - display.0 * 0.5, display.1 * 0.5 - position.y)
}

fn apply_command(
    sprite: &mut Sprite,
    transform: &mut Transform,
    cmd: &DrawCommand,
    image: Handle<Image>,
    z: f32,
    display: (f32, f32),
) {
    sprite.image = image;
    sprite.custom_size = cmd.size;
    sprite.flip_x = cmd.flip_x;
    sprite.anchor = Anchor::TopLeft;
    sprite.color = Color::srgba(1.0, 1.0, 1.0, cmd.alpha);
    let at = display_to_world(cmd.position.floor(), display);
    transform.translation = Vec3::new(at.x, at.y, z);
}

/// Mirror the frame's draw list onto a pool of sprite entities. Commands
/// naming an absent image are skipped and warned about once.
fn sync_sprites(
    mut commands: Commands,
    frame: Res<FrameDraw>,
    sprites: Res<SpriteAssets>,
    config: Res<GameConfig>,
    mut missing: ResMut<MissingSprites>,
    mut pool: Query<(&DrawSlot, &mut Sprite, &mut Transform, &mut Visibility)>,
) {
    let mut visible = Vec::with_capacity(frame.0.len());
    for cmd in &frame.0.commands {
        match sprites.get(&cmd.group, cmd.index) {
            Some(handle) => visible.push((cmd, handle.clone())),
            None => {
                if missing.0.insert((cmd.group.clone(), cmd.index)) {
                    warn!("[Witchlink render] No sprite for {} #{}", cmd.group, cmd.index);
                }
            }
        }
    }

    let display = config.display_size;
    let mut pooled = 0;
    for (slot, mut sprite, mut transform, mut visibility) in &mut pool {
        pooled += 1;
        match visible.get(slot.0) {
            Some((cmd, image)) => {
                let z = slot.0 as f32 * Z_STEP;
                apply_command(&mut sprite, &mut transform, cmd, image.clone(), z, display);
                *visibility = Visibility::Inherited;
            }
            None => *visibility = Visibility::Hidden,
        }
    }

    for (i, (cmd, image)) in visible.iter().enumerate().skip(pooled) {
        let mut sprite = Sprite::default();
        let mut transform = Transform::default();
        let z = i as f32 * Z_STEP;
        apply_command(&mut sprite, &mut transform, cmd, image.clone(), z, display);
        commands.spawn((DrawSlot(i), sprite, transform, Visibility::Inherited));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_origin_maps_to_top_left_of_view() {
        assert_eq!(display_to_world(Vec2::ZERO, (480.0, 270.0)), Vec2::new(-240.0, 135.0));
        assert_eq!(display_to_world(Vec2::new(480.0, 270.0), (480.0, 270.0)), Vec2::new(240.0, -135.0));
    }

    #[test]
    fn scan_groups_nested_dirs_in_name_order() {
        let root = std::env::temp_dir().join(format!("witchlink-sprites-{}", std::process::id()));
        let idle = root.join("images").join("player").join("idle");
        let grass = root.join("images").join("grass");
        std::fs::create_dir_all(&idle).unwrap();
        std::fs::create_dir_all(&grass).unwrap();
        for name in ["02.png", "00.png", "01.png", "notes.txt"] {
            std::fs::write(idle.join(name), b"").unwrap();
        }
        std::fs::write(grass.join("0.PNG"), b"").unwrap();

        let index = SpriteIndex::scan(&root).unwrap();
        assert_eq!(index.groups["player/idle"], vec!["00.png", "01.png", "02.png"]);
        assert_eq!(index.frame_count("grass"), 1);
        assert_eq!(index.frame_count("player"), 0);
        assert_eq!(index.frame_count("enemy/idle"), 0);
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn missing_assets_dir_is_an_empty_index() {
        let root = std::env::temp_dir().join("witchlink-no-such-assets-dir");
        assert_eq!(SpriteIndex::scan(&root).unwrap(), SpriteIndex::default());
    }
}
