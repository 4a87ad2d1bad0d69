use bevy::prelude::*;

/// Whether the app runs without a window
#[derive(Resource, Clone, Copy, Default)]
pub struct HeadlessMode(pub bool);

/// Projectile / gate element. The player holds exactly one at a time.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    Pink,
    Blue,
}

impl Element {
    pub const ALL: [Element; 2] = [Element::Pink, Element::Blue];

    pub fn other(self) -> Self {
        match self {
            Element::Pink => Element::Blue,
            Element::Blue => Element::Pink,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Element::Pink => "pink",
            Element::Blue => "blue",
        }
    }

    /// Closed gate tile of this element.
    pub fn gate(self) -> TileKind {
        match self {
            Element::Pink => TileKind::Pink,
            Element::Blue => TileKind::Blue,
        }
    }

    /// Open (bordered) gate tile of this element.
    pub fn border(self) -> TileKind {
        match self {
            Element::Pink => TileKind::PinkBorder,
            Element::Blue => TileKind::BlueBorder,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileKind {
    Grass,
    Stone,
    Pink,
    Blue,
    PinkBorder,
    BlueBorder,
    YellowKeyDoor,
    RedKeyDoor,
    Decor,
    Spawners,
}

impl TileKind {
    /// Editor palette order.
    pub const PALETTE: [TileKind; 10] = [
        TileKind::Grass,
        TileKind::Stone,
        TileKind::Pink,
        TileKind::Blue,
        TileKind::PinkBorder,
        TileKind::BlueBorder,
        TileKind::YellowKeyDoor,
        TileKind::RedKeyDoor,
        TileKind::Decor,
        TileKind::Spawners,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TileKind::Grass => "grass",
            TileKind::Stone => "stone",
            TileKind::Pink => "pink",
            TileKind::Blue => "blue",
            TileKind::PinkBorder => "pink_border",
            TileKind::BlueBorder => "blue_border",
            TileKind::YellowKeyDoor => "yellow_key_door",
            TileKind::RedKeyDoor => "red_key_door",
            TileKind::Decor => "decor",
            TileKind::Spawners => "spawners",
        }
    }

    pub fn is_solid(self) -> bool {
        matches!(
            self,
            TileKind::Grass
                | TileKind::Stone
                | TileKind::Pink
                | TileKind::Blue
                | TileKind::YellowKeyDoor
        )
    }

    pub fn is_border(self) -> bool {
        matches!(self, TileKind::PinkBorder | TileKind::BlueBorder)
    }

    pub fn is_autotiled(self) -> bool {
        matches!(self, TileKind::Grass | TileKind::Stone)
    }
}

/// Gameplay tuning. Units are pixels and ticks (one tick per 60 Hz frame).
#[derive(Resource, Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub tile_size: i32,
    pub gravity: f32,
    pub terminal_velocity: f32,
    pub jump_velocity: f32,
    pub jump_cap: u32,
    pub run_speed: f32,
    pub player_size: (f32, f32),
    pub player_health: u32,
    pub player_max_health: u32,
    pub invincibility_ticks: u32,
    pub shoot_cooldown: u32,
    pub shoot_release_at: u32,
    pub projectile_size: (f32, f32),
    pub projectile_step: f32,
    pub projectile_range: f32,
    pub enemy_size: (f32, f32),
    pub enemy_health: usize,
    pub enemy_sight: f32,
    pub enemy_reach: f32,
    pub enemy_attack_cooldown: u32,
    pub enemy_lunge_speed: f32,
    pub enemy_lunge_start: u32,
    pub enemy_patrol_speed: f32,
    pub kill_plane_y: f32,
    pub display_size: (f32, f32),
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tile_size: 48,
            gravity: 0.3,
            terminal_velocity: 5.0,
            jump_velocity: -7.0,
            jump_cap: 1,
            run_speed: 3.0,
            player_size: (48.0, 64.0),
            player_health: 3,
            player_max_health: 5,
            invincibility_ticks: 60,
            shoot_cooldown: 25,
            shoot_release_at: 10,
            projectile_size: (32.0, 32.0),
            projectile_step: 5.0,
            projectile_range: 150.0,
            enemy_size: (48.0, 64.0),
            enemy_health: 3,
            enemy_sight: 260.0,
            enemy_reach: 20.0,
            enemy_attack_cooldown: 120,
            enemy_lunge_speed: 5.0,
            enemy_lunge_start: 60,
            enemy_patrol_speed: 0.5,
            kill_plane_y: 2400.0,
            display_size: (480.0, 270.0),
        }
    }
}

/// Root the asset server reads images and sounds from
#[derive(Resource, Clone, Debug)]
pub struct AssetsDir(pub std::path::PathBuf);

/// Pooled sprite slot used by the draw-list presenter
#[derive(Component)]
pub struct DrawSlot(pub usize);

#[derive(Component)]
pub struct MainCamera;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_kind_serializes_as_snake_case_tag() {
        let json = serde_json::to_string(&TileKind::YellowKeyDoor).unwrap();
        assert_eq!(json, "\"yellow_key_door\"");
        let kind: TileKind = serde_json::from_str("\"pink_border\"").unwrap();
        assert_eq!(kind, TileKind::PinkBorder);
        for kind in TileKind::PALETTE {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn gates_block_only_in_closed_state() {
        assert!(TileKind::Pink.is_solid());
        assert!(!TileKind::PinkBorder.is_solid());
        assert!(Element::Blue.border().is_border());
        assert_eq!(Element::Pink.other(), Element::Blue);
    }

    #[test]
    fn partial_config_uses_defaults() {
        let cfg: GameConfig = serde_json::from_str(r#"{ "run_speed": 4.0 }"#).unwrap();
        assert_eq!(cfg.run_speed, 4.0);
        assert_eq!(cfg.tile_size, 48);
    }
}
