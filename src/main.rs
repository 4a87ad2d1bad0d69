mod animation;
mod audio;
mod autotile;
mod components;
mod draw;
mod editor;
mod enemy;
mod entity;
mod events;
mod game;
mod input;
mod magic;
mod physics_core;
mod player;
mod projectile;
mod render;
mod save_file;
mod session;
mod tilemap;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use bevy::prelude::*;
use components::{AssetsDir, GameConfig, HeadlessMode};

#[derive(serde::Deserialize, Default)]
struct StartupConfig {
    window_title: Option<String>,
    window_width: Option<f32>,
    window_height: Option<f32>,
    background_color: Option<[f32; 3]>,
    assets_dir: Option<String>,
    level_path: Option<String>,
    save_path: Option<String>,
    seed: Option<u64>,
    #[serde(default)]
    gameplay: GameConfig,
    #[serde(default)]
    animations: HashMap<String, animation::AnimationClipDef>,
    #[serde(default)]
    sfx: HashMap<String, audio::SfxDefinition>,
}

fn load_startup_config() -> StartupConfig {
    let path = std::env::var("WITCHLINK_GAME_CONFIG")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "game.json".to_string());
    match std::fs::read_to_string(&path) {
        Ok(contents) => match serde_json::from_str::<StartupConfig>(&contents) {
            Ok(cfg) => {
                println!("[Witchlink] Loaded startup config from {}", path);
                cfg
            }
            Err(e) => {
                eprintln!("[Witchlink] Failed to parse {}: {}", path, e);
                StartupConfig::default()
            }
        },
        Err(_) => StartupConfig::default(),
    }
}

/// Configured clips over the defaults, then image counts found on disk
/// folded into the clip lengths.
fn animation_library(
    clips: HashMap<String, animation::AnimationClipDef>,
    index: &render::SpriteIndex,
) -> animation::AnimationLibrary {
    let mut library = animation::AnimationLibrary::default();
    library.merge(clips);
    for group in index.groups.keys() {
        library.set_frame_count(group, index.frame_count(group));
    }
    library
}

/// Level and save file for a play session. Both must exist and parse.
fn load_game_files(
    level_path: &Path,
    save_path: &Path,
) -> Result<(tilemap::Tilemap, save_file::SaveData), String> {
    let level = tilemap::Tilemap::load(level_path)?
        .ok_or_else(|| format!("Level file {} not found", level_path.display()))?;
    let save = save_file::load_save(save_path)?
        .ok_or_else(|| format!("Save file {} not found", save_path.display()))?;
    Ok((level, save))
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let headless = args.iter().any(|a| a == "--headless");
    let editor_mode = args.iter().any(|a| a == "--editor");
    if headless && editor_mode {
        eprintln!("[Witchlink] The editor needs a window; drop --headless");
        std::process::exit(2);
    }

    let startup_config = load_startup_config();
    let assets_dir = std::env::var("WITCHLINK_ASSETS_DIR")
        .ok()
        .filter(|s| !s.is_empty())
        .or(startup_config.assets_dir)
        .unwrap_or_else(|| "assets".to_string());
    if assets_dir != "assets" {
        println!("[Witchlink] Using game assets dir: {}", assets_dir);
    }
    let level_path = PathBuf::from(
        startup_config
            .level_path
            .unwrap_or_else(|| "data/map.json".to_string()),
    );
    let save_path = PathBuf::from(
        startup_config
            .save_path
            .unwrap_or_else(|| "data/saves/save.txt".to_string()),
    );
    let mut config = startup_config.gameplay;

    let sprite_index = match render::SpriteIndex::scan(Path::new(&assets_dir)) {
        Ok(index) => index,
        Err(e) => {
            eprintln!("[Witchlink] {}", e);
            render::SpriteIndex::default()
        }
    };

    let mut app = App::new();
    app.insert_resource(HeadlessMode(headless))
        .insert_resource(AssetsDir(PathBuf::from(&assets_dir)))
        .insert_resource(Time::<Fixed>::from_hz(60.0));

    if editor_mode {
        let mut state = editor::EditorState::new(level_path, save_path);
        let tilemap = match tilemap::Tilemap::load(&state.level_path) {
            Ok(Some(map)) => map,
            Ok(None) => tilemap::Tilemap::new(config.tile_size),
            Err(e) => {
                state.load_error = Some(e);
                tilemap::Tilemap::new(config.tile_size)
            }
        };
        println!(
            "[Witchlink] Editing {} ({} tiles)",
            state.level_path.display(),
            tilemap.len()
        );
        app.insert_resource(tilemap).insert_resource(state);
    } else {
        let (tilemap, save) = match load_game_files(&level_path, &save_path) {
            Ok(files) => files,
            Err(e) => {
                eprintln!("[Witchlink] {}", e);
                std::process::exit(2);
            }
        };
        config.tile_size = tilemap.tile_size;
        let seed = startup_config.seed.unwrap_or_else(rand::random);
        println!(
            "[Witchlink] Level {} loaded: {} tiles, {} enemies (seed {})",
            level_path.display(),
            tilemap.len(),
            save.enemies.len(),
            seed
        );
        let session = session::GameSession::new(
            tilemap,
            &save,
            config.clone(),
            animation_library(startup_config.animations, &sprite_index),
            seed,
        );
        app.insert_resource(session);
    }

    if headless {
        app.add_plugins(MinimalPlugins)
            .add_plugins(bevy::log::LogPlugin::default());
        println!("[Witchlink] Starting in HEADLESS mode");
    } else {
        let window_title = startup_config.window_title.unwrap_or_else(|| {
            if editor_mode {
                "Witchlink editor".to_string()
            } else {
                "Connect a Witch!".to_string()
            }
        });
        let window_width = startup_config.window_width.unwrap_or(960.0);
        let window_height = startup_config.window_height.unwrap_or(540.0);

        let plugins = DefaultPlugins
            .set(WindowPlugin {
                primary_window: Some(Window {
                    title: window_title,
                    resolution: (window_width, window_height).into(),
                    present_mode: bevy::window::PresentMode::AutoVsync,
                    ..default()
                }),
                ..default()
            })
            .set(bevy::asset::AssetPlugin {
                file_path: assets_dir,
                ..default()
            })
            .set(bevy::render::texture::ImagePlugin::default_nearest());

        app.add_plugins(plugins);
        let bg = startup_config.background_color.unwrap_or([0.0, 0.0, 0.0]);
        app.insert_resource(ClearColor(Color::srgb(bg[0], bg[1], bg[2])))
            .insert_resource(sprite_index)
            .add_plugins(render::RenderPlugin);
        if !editor_mode {
            app.insert_resource(audio::AudioCues::with_sfx(startup_config.sfx))
                .add_plugins(audio::AudioPlugin);
        }
        println!("[Witchlink] Starting in WINDOWED mode");
    }

    app.insert_resource(config);
    if editor_mode {
        app.add_plugins(editor::EditorPlugin);
    } else {
        app.add_plugins(input::InputPlugin)
            .add_plugins(game::GamePlugin);
    }

    app.run();
}
