use bevy::math::Vec2;

use crate::animation::{ActionState, AnimationLibrary};
use crate::components::{Element, GameConfig};
use crate::draw::{DrawCommand, DrawList};
use crate::entity::{Actor, Effects, PlayerView, WorldContext};
use crate::magic;
use crate::physics_core::{step_body, PhysicsBody, Rect};
use crate::projectile::Projectile;
use crate::tilemap::Tilemap;

#[derive(Clone, Debug)]
pub struct Player {
    pub body: PhysicsBody,
    pub health: u32,
    pub state: ActionState,
    pub invincibility: u32,
    pub shoot_cooldown: u32,
    /// Locked in a non-interruptible pose (shooting).
    pub busy: bool,
    pub jumps: u32,
    pub element: Element,
    pub flip: bool,
    /// Horizontal intent for the next update: -1, 0 or 1.
    pub intent: f32,
    pub keys: u32,
}

impl Player {
    pub fn new(spawn: Vec2, config: &GameConfig, library: &AnimationLibrary) -> Self {
        Self {
            body: PhysicsBody::new(spawn, Vec2::new(config.player_size.0, config.player_size.1)),
            health: config.player_health,
            state: ActionState::new("player", "idle", library),
            invincibility: 0,
            shoot_cooldown: 0,
            busy: false,
            jumps: config.jump_cap,
            element: Element::Pink,
            flip: false,
            intent: 0.0,
            keys: 0,
        }
    }

    pub fn view(&self) -> PlayerView {
        PlayerView {
            rect: self.rect(),
            invincible: self.invincibility > 0,
        }
    }

    /// Spend a jump charge. Returns false when none is left.
    pub fn jump(&mut self, config: &GameConfig) -> bool {
        if self.jumps == 0 {
            return false;
        }
        self.jumps -= 1;
        self.body.velocity.y = config.jump_velocity;
        true
    }

    pub fn shoot(&mut self, config: &GameConfig, library: &AnimationLibrary) -> Option<Projectile> {
        if self.shoot_cooldown != 0 {
            return None;
        }
        self.shoot_cooldown = config.shoot_cooldown;
        self.busy = true;
        self.state.set("shooting", library);
        let rect = self.rect();
        let edge = if self.flip { rect.left() } else { rect.right() };
        Some(Projectile::new(
            Vec2::new(edge, rect.center().y),
            self.flip,
            self.element,
            config,
            library,
        ))
    }

    /// Take one point of damage unless still invincible.
    pub fn hit(&mut self, config: &GameConfig) -> bool {
        if self.invincibility > 0 {
            return false;
        }
        self.health = self.health.saturating_sub(1);
        self.invincibility = config.invincibility_ticks;
        true
    }

    pub fn heal(&mut self, config: &GameConfig) {
        self.health = (self.health + 1).min(config.player_max_health);
    }

    /// Swap to the other element and re-gate the map. Refused while standing
    /// in an open gate.
    pub fn switch_element(&mut self, tilemap: &mut Tilemap) -> bool {
        if !magic::can_switch(tilemap, self.body.position, self.body.size.y) {
            return false;
        }
        self.element = self.element.other();
        magic::toggle(tilemap, self.element);
        true
    }
}

impl Actor for Player {
    fn rect(&self) -> Rect {
        self.body.rect()
    }

    fn update(&mut self, ctx: &WorldContext) -> Effects {
        let config = ctx.config;
        if self.intent != 0.0 {
            self.flip = self.intent < 0.0;
        }
        let movement = Vec2::new(self.intent * config.run_speed, 0.0);
        step_body(&mut self.body, movement, ctx.tilemap, config);
        if self.body.position.x < 0.0 {
            self.body.position.x = 0.0;
        }
        if self.body.collisions.down {
            self.jumps = config.jump_cap;
        }

        self.invincibility = self.invincibility.saturating_sub(1);
        if self.shoot_cooldown > 0 {
            self.shoot_cooldown -= 1;
            if self.shoot_cooldown == config.shoot_release_at {
                self.busy = false;
            }
        }
        if !self.busy {
            self.state.set("idle", ctx.animations);
        }
        self.state.animation.update();
        Effects::default()
    }

    fn render(&self, offset: Vec2, draw: &mut DrawList) {
        // Blink while invincible.
        let alpha = if self.invincibility / 4 % 2 == 1 { 0.4 } else { 1.0 };
        draw.push(
            DrawCommand::new(
                self.state.animation.group.clone(),
                self.state.animation.frame(),
                self.body.position - offset,
            )
            .sized(self.body.size)
            .flipped(self.flip)
            .with_alpha(alpha),
        );
    }
}
