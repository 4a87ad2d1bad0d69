use std::collections::BTreeMap;

use bevy::prelude::*;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde_json::json;

use crate::animation::AnimationLibrary;
use crate::components::{Element, GameConfig, TileKind};
use crate::draw::DrawList;
use crate::enemy::{Enemy, Villager};
use crate::entity::{Actor, ActorRef, WorldContext};
use crate::events::GameEventBus;
use crate::magic;
use crate::physics_core::Rect;
use crate::player::Player;
use crate::projectile::Projectile;
use crate::save_file::{SaveData, ENEMY_SPAWN_VARIANT, PLAYER_SPAWN_VARIANT};
use crate::tilemap::{Reward, Tilemap};

/// Reach, in pixels, at which a key-holding player opens a door.
const DOOR_REACH: f32 = 2.0;
/// Camera easing divisor: the scroll closes 1/30 of the gap per tick, in
/// whole pixels, so it settles once the gap is under 30 px.
const SCROLL_EASE: f32 = 30.0;

/// Input for one tick. Held directions plus edge-triggered actions; the
/// input layer drains its queue into this once per tick.
#[derive(Clone, Copy, Default, Debug)]
pub struct TickInput {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub shoot: bool,
    pub switch_element: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SessionStatus {
    Playing,
    GameOver,
    Victory,
}

fn default_rewards() -> BTreeMap<u32, Reward> {
    BTreeMap::from([(0, Reward::Key), (6, Reward::Heart)])
}

/// One play-through of a level: owns the map and every live actor.
#[derive(Resource)]
pub struct GameSession {
    pub tilemap: Tilemap,
    pub config: GameConfig,
    pub animations: AnimationLibrary,
    pub player: Player,
    pub enemies: Vec<Enemy>,
    pub projectiles: Vec<Projectile>,
    pub villagers: Vec<Villager>,
    pub events: GameEventBus,
    pub scroll: Vec2,
    pub status: SessionStatus,
    pub frame: u64,
    rewards: BTreeMap<u32, Reward>,
    spawned_enemies: usize,
}

impl GameSession {
    pub fn new(
        mut tilemap: Tilemap,
        save: &SaveData,
        config: GameConfig,
        animations: AnimationLibrary,
        seed: u64,
    ) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        // Spawn markers are editor-only; the save file already carries them.
        tilemap.extract(
            &[
                (TileKind::Spawners, PLAYER_SPAWN_VARIANT),
                (TileKind::Spawners, ENEMY_SPAWN_VARIANT),
            ],
            false,
        );
        let player = Player::new(save.player_spawn(), &config, &animations);
        magic::toggle(&mut tilemap, player.element);
        let enemies: Vec<Enemy> = save
            .enemy_spawns()
            .enumerate()
            .map(|(id, spawn)| Enemy::new(id as u32, spawn, &config, &animations, &mut rng))
            .collect();
        let rewards = if tilemap.rewards.is_empty() {
            default_rewards()
        } else {
            tilemap.rewards.clone()
        };
        Self {
            spawned_enemies: enemies.len(),
            tilemap,
            config,
            animations,
            player,
            enemies,
            projectiles: Vec::new(),
            villagers: Vec::new(),
            events: GameEventBus::default(),
            scroll: Vec2::ZERO,
            status: SessionStatus::Playing,
            frame: 0,
            rewards,
        }
    }

    pub fn tick(&mut self, input: TickInput) {
        if self.status != SessionStatus::Playing {
            return;
        }
        self.frame += 1;
        self.events.frame = self.frame;

        self.apply_input(input);
        {
            let ctx = WorldContext {
                tilemap: &self.tilemap,
                config: &self.config,
                animations: &self.animations,
                player: None,
            };
            self.player.update(&ctx);
        }
        self.try_open_doors();
        self.update_projectiles();
        self.update_enemies();
        self.update_villagers();
        self.follow_player();
        self.update_status();
    }

    fn apply_input(&mut self, input: TickInput) {
        self.player.intent = (input.right as i32 - input.left as i32) as f32;
        if input.jump && self.player.jump(&self.config) {
            self.events.emit("player_jump", json!({}));
        }
        if input.shoot {
            if let Some(projectile) = self.player.shoot(&self.config, &self.animations) {
                self.events.emit(
                    "player_shoot",
                    json!({ "element": projectile.element, "flip": projectile.flip }),
                );
                self.projectiles.push(projectile);
            }
        }
        if input.switch_element {
            if self.player.switch_element(&mut self.tilemap) {
                self.events
                    .emit("element_switched", json!({ "element": self.player.element }));
            } else {
                warn!("Element switch refused: player is inside an open gate");
            }
        }
    }

    fn try_open_doors(&mut self) {
        if self.player.keys == 0 {
            return;
        }
        let reach = self.player.rect().inflate(DOOR_REACH, DOOR_REACH);
        let touching = self
            .tilemap
            .neighbors(self.player.body.position, self.player.body.size.y)
            .into_iter()
            .any(|tile| {
                tile.kind == TileKind::YellowKeyDoor
                    && self.tilemap.tile_rect(tile.pos).overlaps(&reach)
            });
        if touching {
            let removed = self.tilemap.remove_kind(TileKind::YellowKeyDoor);
            self.player.keys -= 1;
            self.events.emit("door_opened", json!({ "tiles": removed }));
        }
    }

    fn update_projectiles(&mut self) {
        let mut strikes = Vec::new();
        {
            let ctx = WorldContext {
                tilemap: &self.tilemap,
                config: &self.config,
                animations: &self.animations,
                player: Some(self.player.view()),
            };
            // Walk a taken snapshot; survivors are pushed back into the live list.
            for mut projectile in std::mem::take(&mut self.projectiles) {
                if projectile.update(&ctx).expired {
                    continue;
                }
                let rect = projectile.rect();
                if let Some(enemy) = self.enemies.iter().find(|e| e.rect().overlaps(&rect)) {
                    strikes.push((enemy.id, projectile.element));
                    continue;
                }
                self.projectiles.push(projectile);
            }
        }
        for (id, element) in strikes {
            self.strike_enemy(id, element);
        }
    }

    /// Apply a projectile landing on enemy `id`. A no-op if that enemy is
    /// already gone.
    pub fn strike_enemy(&mut self, id: u32, element: Element) {
        let Some(idx) = self.enemies.iter().position(|e| e.id == id) else {
            return;
        };
        let enemy = &mut self.enemies[idx];
        if enemy.front_element() != Some(element) {
            enemy.reset();
            self.events.emit("enemy_reset", json!({ "id": id }));
            return;
        }
        if !enemy.hit() {
            let left = enemy.weaknesses().len();
            self.events
                .emit("enemy_weakened", json!({ "id": id, "remaining": left }));
            return;
        }
        let enemy = self.enemies.remove(idx);
        self.villagers
            .push(Villager::from_enemy(&enemy, &self.animations));
        self.events.emit("enemy_rescued", json!({ "id": id }));
        match self.rewards.get(&id) {
            Some(Reward::Key) => {
                self.player.keys += 1;
                self.events.emit("reward_key", json!({ "keys": self.player.keys }));
            }
            Some(Reward::Heart) => {
                self.player.heal(&self.config);
                self.events
                    .emit("reward_heart", json!({ "health": self.player.health }));
            }
            None => {}
        }
    }

    fn update_enemies(&mut self) {
        let ctx = WorldContext {
            tilemap: &self.tilemap,
            config: &self.config,
            animations: &self.animations,
            player: Some(self.player.view()),
        };
        let mut damaged = false;
        for enemy in &mut self.enemies {
            damaged |= enemy.update(&ctx).damage_player;
        }
        if damaged && self.player.hit(&self.config) {
            self.events
                .emit("player_hit", json!({ "health": self.player.health }));
        }
    }

    fn update_villagers(&mut self) {
        let ctx = WorldContext {
            tilemap: &self.tilemap,
            config: &self.config,
            animations: &self.animations,
            player: None,
        };
        for villager in &mut self.villagers {
            villager.update(&ctx);
        }
    }

    fn follow_player(&mut self) {
        let target = self.player.rect().center().x - self.config.display_size.0 / 3.0;
        self.scroll.x += ((target - self.scroll.x) / SCROLL_EASE).trunc();
    }

    fn update_status(&mut self) {
        if self.player.body.position.y > self.config.kill_plane_y {
            self.player.health = 0;
        }
        if self.player.health == 0 {
            self.status = SessionStatus::GameOver;
            self.events.emit("game_over", json!({ "frame": self.frame }));
        } else if self.spawned_enemies > 0 && self.enemies.is_empty() {
            self.status = SessionStatus::Victory;
            self.events
                .emit("victory", json!({ "rescued": self.villagers.len() }));
        }
    }

    /// Integer camera offset, as the display is pixel-snapped.
    pub fn render_offset(&self) -> Vec2 {
        self.scroll.floor()
    }

    /// Map first, then villagers, enemies, player and projectiles on top.
    pub fn render(&self, draw: &mut DrawList) {
        let viewport = Vec2::new(self.config.display_size.0, self.config.display_size.1);
        let offset = self.render_offset();
        self.tilemap.render(viewport, offset, draw);

        let view = Rect::new(offset.x, offset.y, viewport.x, viewport.y).inflate(64.0, 64.0);
        let actors = self
            .villagers
            .iter()
            .map(ActorRef::Villager)
            .chain(self.enemies.iter().map(ActorRef::Enemy))
            .chain(std::iter::once(ActorRef::Player(&self.player)))
            .chain(self.projectiles.iter().map(ActorRef::Projectile));
        for actor in actors.filter(|a| a.rect().overlaps(&view)) {
            actor.render(offset, draw);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floor_map() -> Tilemap {
        let mut map = Tilemap::new(48);
        for x in -5..60 {
            map.set((x, 4), TileKind::Stone, 0);
        }
        map
    }

    fn session(map: Tilemap, enemies: Vec<(i32, i32)>) -> GameSession {
        let save = SaveData {
            enemies,
            player: (48, 128),
        };
        GameSession::new(map, &save, GameConfig::default(), AnimationLibrary::default(), 1)
    }

    fn force_weaknesses(session: &mut GameSession, id: u32, elements: &[Element]) {
        let idx = session.enemies.iter().position(|e| e.id == id).unwrap();
        let old = &session.enemies[idx];
        session.enemies[idx] = Enemy::with_weaknesses(
            id,
            old.body.position,
            elements,
            &session.config,
            &session.animations,
        );
    }

    #[test]
    fn enemies_spawn_in_save_order() {
        let s = session(floor_map(), vec![(400, 128), (800, 128)]);
        assert_eq!(s.enemies.len(), 2);
        assert_eq!(s.enemies[0].id, 0);
        assert_eq!(s.enemies[1].body.position, Vec2::new(800.0, 128.0));
        assert_eq!(s.status, SessionStatus::Playing);
    }

    #[test]
    fn gates_start_open_for_the_starting_element() {
        let mut map = floor_map();
        map.set((3, 3), TileKind::Pink, 0);
        map.set((4, 3), TileKind::BlueBorder, 0);
        let s = session(map, vec![]);
        assert_eq!(s.tilemap.get((3, 3)).unwrap().kind, TileKind::PinkBorder);
        assert_eq!(s.tilemap.get((4, 3)).unwrap().kind, TileKind::Blue);
    }

    #[test]
    fn two_right_hits_then_wrong_hit_restores_all_weaknesses() {
        let mut s = session(floor_map(), vec![(900, 128)]);
        force_weaknesses(&mut s, 0, &[Element::Pink, Element::Blue, Element::Pink]);
        s.strike_enemy(0, Element::Pink);
        s.strike_enemy(0, Element::Blue);
        assert_eq!(s.enemies[0].weaknesses().len(), 1);
        s.strike_enemy(0, Element::Blue);
        assert_eq!(s.enemies[0].weaknesses().len(), 3);
        assert_eq!(s.events.count("enemy_reset"), 1);
    }

    #[test]
    fn rescuing_grants_reward_and_spawns_villager() {
        let mut s = session(floor_map(), vec![(900, 128), (1200, 128)]);
        force_weaknesses(&mut s, 0, &[Element::Blue]);
        s.strike_enemy(0, Element::Blue);
        assert_eq!(s.enemies.len(), 1);
        assert_eq!(s.villagers.len(), 1);
        assert_eq!(s.villagers[0].id, 0);
        assert_eq!(s.player.keys, 1);
        s.strike_enemy(0, Element::Blue);
        assert_eq!(s.villagers.len(), 1);
    }

    #[test]
    fn level_rewards_override_defaults() {
        let mut map = floor_map();
        map.rewards.insert(1, Reward::Heart);
        let mut s = session(map, vec![(900, 128), (1200, 128)]);
        s.player.health = 1;
        force_weaknesses(&mut s, 0, &[Element::Pink]);
        force_weaknesses(&mut s, 1, &[Element::Pink]);
        s.strike_enemy(0, Element::Pink);
        assert_eq!(s.player.keys, 0);
        s.strike_enemy(1, Element::Pink);
        assert_eq!(s.player.health, 2);
    }

    #[test]
    fn projectile_is_consumed_on_any_enemy_hit() {
        let mut s = session(floor_map(), vec![(120, 128)]);
        force_weaknesses(&mut s, 0, &[Element::Blue, Element::Blue]);
        s.enemies[0].flip = true;
        s.tick(TickInput {
            shoot: true,
            ..TickInput::default()
        });
        assert_eq!(s.projectiles.len(), 0);
        assert_eq!(s.enemies.len(), 1);
        assert_eq!(s.enemies[0].weaknesses().len(), 2);
        assert_eq!(s.events.count("enemy_reset"), 1);
    }

    #[test]
    fn projectile_expires_in_open_air() {
        let mut s = session(floor_map(), vec![]);
        s.tick(TickInput {
            shoot: true,
            ..TickInput::default()
        });
        assert_eq!(s.projectiles.len(), 1);
        for _ in 0..29 {
            s.tick(TickInput::default());
        }
        assert_eq!(s.projectiles.len(), 1);
        s.tick(TickInput::default());
        assert!(s.projectiles.is_empty());
    }

    #[test]
    fn key_opens_adjacent_yellow_doors() {
        let mut map = floor_map();
        map.set((3, 3), TileKind::YellowKeyDoor, 0);
        map.set((3, 2), TileKind::YellowKeyDoor, 0);
        map.set((20, 3), TileKind::YellowKeyDoor, 0);
        let mut s = session(map, vec![]);
        s.player.body.position = Vec2::new(96.0, 128.0);
        s.tick(TickInput::default());
        assert!(s.tilemap.get((3, 3)).is_some());

        s.player.keys = 1;
        s.tick(TickInput::default());
        assert!(s.tilemap.get((3, 3)).is_none());
        assert!(s.tilemap.get((20, 3)).is_none());
        assert_eq!(s.player.keys, 0);
        assert_eq!(s.events.count("door_opened"), 1);
    }

    #[test]
    fn switch_flips_gates_and_is_refused_inside_open_gate() {
        let mut map = floor_map();
        map.set((1, 2), TileKind::Pink, 0);
        map.set((1, 3), TileKind::Pink, 0);
        map.set((8, 3), TileKind::Blue, 0);
        let mut s = session(map, vec![]);
        // Standing in the opened pink gate.
        s.player.body.position = Vec2::new(48.0, 128.0);
        s.tick(TickInput {
            switch_element: true,
            ..TickInput::default()
        });
        assert_eq!(s.player.element, Element::Pink);

        s.player.body.position = Vec2::new(200.0, 128.0);
        s.tick(TickInput {
            switch_element: true,
            ..TickInput::default()
        });
        assert_eq!(s.player.element, Element::Blue);
        assert_eq!(s.tilemap.get((1, 3)).unwrap().kind, TileKind::Pink);
        assert_eq!(s.tilemap.get((8, 3)).unwrap().kind, TileKind::BlueBorder);
    }

    #[test]
    fn death_and_victory_end_the_session() {
        let mut s = session(floor_map(), vec![]);
        s.player.health = 0;
        s.tick(TickInput::default());
        assert_eq!(s.status, SessionStatus::GameOver);
        let frame = s.frame;
        s.tick(TickInput::default());
        assert_eq!(s.frame, frame);

        let mut s = session(floor_map(), vec![(900, 128)]);
        force_weaknesses(&mut s, 0, &[Element::Pink]);
        s.strike_enemy(0, Element::Pink);
        s.tick(TickInput::default());
        assert_eq!(s.status, SessionStatus::Victory);
    }

    #[test]
    fn falling_out_of_the_world_is_fatal() {
        let mut s = session(Tilemap::new(48), vec![]);
        for _ in 0..1000 {
            s.tick(TickInput::default());
        }
        assert_eq!(s.status, SessionStatus::GameOver);
    }

    #[test]
    fn camera_eases_toward_player() {
        let mut s = session(floor_map(), vec![]);
        s.player.body.position.x = 1000.0;
        s.tick(TickInput::default());
        let first = s.scroll.x;
        assert!(first > 0.0);
        s.tick(TickInput::default());
        assert!(s.scroll.x > first);
    }

    #[test]
    fn camera_settles_within_one_ease_step() {
        let mut s = session(floor_map(), vec![]);
        s.tick(TickInput::default());
        let target = s.player.rect().center().x - s.config.display_size.0 / 3.0;
        s.scroll.x = target - 20.0;
        s.tick(TickInput::default());
        assert_eq!(s.scroll.x, target - 20.0);

        s.scroll.x = target - 95.0;
        s.tick(TickInput::default());
        assert_eq!(s.scroll.x, target - 92.0);
    }

    #[test]
    fn spawn_markers_are_not_part_of_the_played_level() {
        let mut map = floor_map();
        map.push_offgrid(TileKind::Spawners, PLAYER_SPAWN_VARIANT, Vec2::new(48.0, 128.0));
        map.push_offgrid(TileKind::Spawners, ENEMY_SPAWN_VARIANT, Vec2::new(150.0, 128.0));
        map.push_offgrid(TileKind::Decor, 0, Vec2::new(60.0, 100.0));
        map.set((2, 3), TileKind::Spawners, ENEMY_SPAWN_VARIANT);
        let s = session(map, vec![(150, 128)]);
        let mut draw = DrawList::default();
        s.render(&mut draw);
        assert!(draw.commands.iter().all(|c| c.group != "spawners"));
        assert!(draw.commands.iter().any(|c| c.group == "decor"));
        assert!(s.tilemap.get((2, 3)).is_none());
    }

    #[test]
    fn render_draws_map_then_actors() {
        let s = session(floor_map(), vec![(150, 128)]);
        let mut draw = DrawList::default();
        s.render(&mut draw);
        let groups: Vec<&str> = draw.commands.iter().map(|c| c.group.as_str()).collect();
        assert_eq!(groups[0], "stone");
        let enemy_at = groups.iter().position(|g| *g == "enemy/idle").unwrap();
        let player_at = groups.iter().position(|g| *g == "player/idle").unwrap();
        assert!(enemy_at < player_at);
        assert!(groups.iter().any(|g| g.starts_with("weakness/")));
    }
}
