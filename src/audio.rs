use std::collections::HashMap;

use bevy::audio::Volume;
use bevy::prelude::*;
use serde::Deserialize;

use crate::components::AssetsDir;
use crate::events::GameEvent;
use crate::session::GameSession;

fn default_volume() -> f32 {
    1.0
}

/// One sound effect; `game.json` may override or add these under `sfx`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SfxDefinition {
    pub path: String,
    #[serde(default = "default_volume")]
    pub volume: f32,
}

/// Maps gameplay event names to sound effects.
#[derive(Resource)]
pub struct AudioCues {
    pub sfx: HashMap<String, SfxDefinition>,
    pub triggers: HashMap<String, String>,
    pub master_volume: f32,
    handles: HashMap<String, Handle<AudioSource>>,
    last_frame: u64,
}

impl Default for AudioCues {
    fn default() -> Self {
        let sfx = [
            ("jump", "sfx/jump.wav", 0.7),
            ("shoot", "sfx/shoot.wav", 0.6),
            ("hit", "sfx/hit.wav", 0.9),
            ("switch", "sfx/switch.wav", 0.6),
            ("enemy_hit", "sfx/enemy_hit.wav", 0.8),
            ("rescue", "sfx/rescue.wav", 1.0),
            ("pickup", "sfx/pickup.wav", 0.8),
            ("door", "sfx/door.wav", 0.8),
        ]
        .into_iter()
        .map(|(name, path, volume)| {
            (
                name.to_string(),
                SfxDefinition {
                    path: path.to_string(),
                    volume,
                },
            )
        })
        .collect();
        let triggers = [
            ("player_jump", "jump"),
            ("player_shoot", "shoot"),
            ("player_hit", "hit"),
            ("element_switched", "switch"),
            ("enemy_weakened", "enemy_hit"),
            ("enemy_reset", "enemy_hit"),
            ("enemy_rescued", "rescue"),
            ("reward_key", "pickup"),
            ("reward_heart", "pickup"),
            ("door_opened", "door"),
        ]
        .into_iter()
        .map(|(event, sfx)| (event.to_string(), sfx.to_string()))
        .collect();
        Self {
            sfx,
            triggers,
            master_volume: 1.0,
            handles: HashMap::new(),
            last_frame: 0,
        }
    }
}

impl AudioCues {
    /// Default cues with configured sound effects layered on top.
    pub fn with_sfx(overrides: HashMap<String, SfxDefinition>) -> Self {
        let mut cues = Self::default();
        cues.sfx.extend(overrides);
        cues
    }

    /// Sound and final volume for an event, if one is mapped.
    pub fn cue_for(&self, event: &GameEvent) -> Option<(&str, f32)> {
        let name = self.triggers.get(event.name)?;
        let def = self.sfx.get(name)?;
        Some((name.as_str(), def.volume * self.master_volume))
    }
}

pub struct AudioPlugin;

impl Plugin for AudioPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<AudioCues>()
            .add_systems(Startup, load_cues)
            .add_systems(Update, play_cues.run_if(resource_exists::<GameSession>));
    }
}

/// Load every sound whose file exists under the assets root; the rest stay
/// silent.
fn load_cues(asset_server: Res<AssetServer>, mut cues: ResMut<AudioCues>, root: Res<AssetsDir>) {
    let AudioCues { sfx, handles, .. } = &mut *cues;
    for (name, def) in sfx.iter() {
        if root.0.join(&def.path).is_file() {
            handles.insert(name.clone(), asset_server.load(def.path.clone()));
        } else {
            warn!("[Witchlink audio] Missing sound {} ({})", name, def.path);
        }
    }
}

fn play_cues(mut commands: Commands, session: Res<GameSession>, mut cues: ResMut<AudioCues>) {
    let mut newest = cues.last_frame;
    for ev in session.events.since(cues.last_frame) {
        newest = newest.max(ev.frame);
        let Some((name, volume)) = cues.cue_for(ev) else {
            continue;
        };
        if let Some(handle) = cues.handles.get(name) {
            commands.spawn((
                AudioPlayer::new(handle.clone()),
                PlaybackSettings::DESPAWN.with_volume(Volume::new(volume)),
            ));
        }
    }
    cues.last_frame = newest;
}
