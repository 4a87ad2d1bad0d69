use bevy::math::Vec2;

use crate::animation::AnimationLibrary;
use crate::components::GameConfig;
use crate::draw::DrawList;
use crate::enemy::{Enemy, Villager};
use crate::physics_core::Rect;
use crate::player::Player;
use crate::projectile::Projectile;
use crate::tilemap::Tilemap;

/// What other actors need to know about the player.
#[derive(Clone, Copy, Debug)]
pub struct PlayerView {
    pub rect: Rect,
    pub invincible: bool,
}

/// Shared read-only state handed to every actor each tick.
pub struct WorldContext<'a> {
    pub tilemap: &'a Tilemap,
    pub config: &'a GameConfig,
    pub animations: &'a AnimationLibrary,
    pub player: Option<PlayerView>,
}

/// Outcome of one actor update, applied by the session afterwards.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct Effects {
    /// The actor is finished and should be dropped.
    pub expired: bool,
    pub damage_player: bool,
}

pub trait Actor {
    fn rect(&self) -> Rect;
    fn update(&mut self, ctx: &WorldContext) -> Effects;
    fn render(&self, offset: Vec2, draw: &mut DrawList);
}

/// Borrowed handle over any concrete actor, for ordered rendering.
pub enum ActorRef<'a> {
    Player(&'a Player),
    Enemy(&'a Enemy),
    Projectile(&'a Projectile),
    Villager(&'a Villager),
}

impl ActorRef<'_> {
    pub fn rect(&self) -> Rect {
        match self {
            ActorRef::Player(p) => p.rect(),
            ActorRef::Enemy(e) => e.rect(),
            ActorRef::Projectile(p) => p.rect(),
            ActorRef::Villager(v) => v.rect(),
        }
    }

    pub fn render(&self, offset: Vec2, draw: &mut DrawList) {
        match self {
            ActorRef::Player(p) => p.render(offset, draw),
            ActorRef::Enemy(e) => e.render(offset, draw),
            ActorRef::Projectile(p) => p.render(offset, draw),
            ActorRef::Villager(v) => v.render(offset, draw),
        }
    }
}
