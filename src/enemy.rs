use std::collections::VecDeque;

use bevy::math::Vec2;
use rand::Rng;

use crate::animation::{ActionState, AnimationLibrary};
use crate::components::{Element, GameConfig};
use crate::draw::{DrawCommand, DrawList};
use crate::entity::{Actor, Effects, WorldContext};
use crate::physics_core::{step_body, PhysicsBody, Rect};

/// Spacing between weakness markers drawn over an enemy's head.
const MARKER_SPACING: f32 = 12.0;
const MARKER_SIZE: f32 = 10.0;

/// One hit point, only removable by a projectile of the same element.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Weakness {
    pub element: Element,
    /// Marker position relative to the enemy's top-left corner.
    pub offset: Vec2,
}

#[derive(Clone, Debug)]
pub struct Enemy {
    pub id: u32,
    pub body: PhysicsBody,
    pub state: ActionState,
    /// Ordered queue; only the front can be damaged.
    weaknesses: VecDeque<Weakness>,
    full: Vec<Weakness>,
    pub attack_cooldown: u32,
    /// Facing -x.
    pub flip: bool,
}

impl Enemy {
    pub fn new(
        id: u32,
        spawn: Vec2,
        config: &GameConfig,
        library: &AnimationLibrary,
        rng: &mut impl Rng,
    ) -> Self {
        let elements: Vec<Element> = (0..config.enemy_health)
            .map(|_| Element::ALL[rng.gen_range(0..Element::ALL.len())])
            .collect();
        Self::with_weaknesses(id, spawn, &elements, config, library)
    }

    pub fn with_weaknesses(
        id: u32,
        spawn: Vec2,
        elements: &[Element],
        config: &GameConfig,
        library: &AnimationLibrary,
    ) -> Self {
        let size = Vec2::new(config.enemy_size.0, config.enemy_size.1);
        let row_width = elements.len() as f32 * MARKER_SPACING;
        let full: Vec<Weakness> = elements
            .iter()
            .enumerate()
            .map(|(i, &element)| Weakness {
                element,
                offset: Vec2::new(
                    (size.x - row_width) * 0.5 + i as f32 * MARKER_SPACING,
                    -MARKER_SPACING - MARKER_SIZE,
                ),
            })
            .collect();
        Self {
            id,
            body: PhysicsBody::new(spawn, size),
            state: ActionState::new("enemy", "idle", library),
            weaknesses: full.iter().copied().collect(),
            full,
            attack_cooldown: 0,
            flip: false,
        }
    }

    pub fn weaknesses(&self) -> &VecDeque<Weakness> {
        &self.weaknesses
    }

    /// Element that currently damages this enemy.
    pub fn front_element(&self) -> Option<Element> {
        self.weaknesses.front().map(|w| w.element)
    }

    /// Consume the front weakness. True when none are left.
    pub fn hit(&mut self) -> bool {
        self.weaknesses.pop_front();
        self.weaknesses.is_empty()
    }

    /// Restore every weakness (wrong-element hit).
    pub fn reset(&mut self) {
        self.weaknesses = self.full.iter().copied().collect();
    }

    pub fn attack(&mut self, config: &GameConfig, library: &AnimationLibrary) {
        self.attack_cooldown = config.enemy_attack_cooldown;
        self.state.set("attack", library);
    }

    pub fn is_attacking(&self) -> bool {
        self.attack_cooldown > 0
    }

    fn facing(&self) -> f32 {
        if self.flip {
            -1.0
        } else {
            1.0
        }
    }

    /// Horizontal player offset if the player stands within sight on the
    /// facing side.
    fn sighted(&self, ctx: &WorldContext) -> Option<f32> {
        let player = ctx.player?;
        let dx = player.rect.x - self.body.position.x;
        let sight = ctx.config.enemy_sight;
        let visible = if self.flip {
            dx <= 0.0 && dx > -sight
        } else {
            dx >= 0.0 && dx < sight
        };
        visible.then_some(dx)
    }

    /// Walk the facing direction, turning at walls and ledges.
    fn patrol(&mut self, ctx: &WorldContext) -> f32 {
        let rect = self.body.rect();
        let floor_y = rect.bottom() + 1.0;
        let ahead_x = if self.flip { rect.left() - 1.0 } else { rect.right() + 1.0 };
        let grounded = ctx.tilemap.solid_below(self.body.position, self.body.size);
        let ledge = grounded && !ctx.tilemap.is_solid_at(Vec2::new(ahead_x, floor_y));
        if ledge || self.body.collisions.horizontal() {
            self.flip = !self.flip;
        }
        self.state.set("run", ctx.animations);
        self.facing() * ctx.config.enemy_patrol_speed
    }
}

impl Actor for Enemy {
    fn rect(&self) -> Rect {
        self.body.rect()
    }

    fn update(&mut self, ctx: &WorldContext) -> Effects {
        let config = ctx.config;
        let mut movement = Vec2::ZERO;
        if !self.is_attacking() {
            match self.sighted(ctx) {
                Some(dx) if dx.abs() < config.enemy_reach => self.attack(config, ctx.animations),
                Some(_) => {
                    movement.x = self.facing();
                    self.state.set("run", ctx.animations);
                }
                None => movement.x = self.patrol(ctx),
            }
        }

        if self.is_attacking() {
            self.attack_cooldown -= 1;
            let start = config.enemy_lunge_start.max(1);
            if self.attack_cooldown <= start {
                self.body.velocity.x = self.facing()
                    * config.enemy_lunge_speed
                    * (self.attack_cooldown as f32 / start as f32);
            }
            if self.attack_cooldown == 0 {
                self.body.velocity.x = 0.0;
                self.state.set("idle", ctx.animations);
            }
        }

        step_body(&mut self.body, movement, ctx.tilemap, config);

        let mut effects = Effects::default();
        if let Some(player) = ctx.player {
            effects.damage_player = self.attack_cooldown > 0
                && self.attack_cooldown < config.enemy_lunge_start
                && !player.invincible
                && self.rect().overlaps(&player.rect);
        }
        self.state.animation.update();
        effects
    }

    fn render(&self, offset: Vec2, draw: &mut DrawList) {
        let at = self.body.position - offset;
        draw.push(
            DrawCommand::new(self.state.animation.group.clone(), self.state.animation.frame(), at)
                .sized(self.body.size)
                .flipped(self.flip),
        );
        for weakness in &self.weaknesses {
            draw.push(
                DrawCommand::new(format!("weakness/{}", weakness.element.as_str()), 0, at + weakness.offset)
                    .sized(Vec2::splat(MARKER_SIZE)),
            );
        }
    }
}

/// A rescued enemy. Stands around under gravity and is never hostile.
#[derive(Clone, Debug)]
pub struct Villager {
    pub id: u32,
    pub body: PhysicsBody,
    pub state: ActionState,
    pub flip: bool,
}

impl Villager {
    pub fn from_enemy(enemy: &Enemy, library: &AnimationLibrary) -> Self {
        let mut body = PhysicsBody::new(enemy.body.position, enemy.body.size);
        body.velocity.y = enemy.body.velocity.y;
        Self {
            id: enemy.id,
            body,
            state: ActionState::new("villager", "idle", library),
            flip: enemy.flip,
        }
    }
}

impl Actor for Villager {
    fn rect(&self) -> Rect {
        self.body.rect()
    }

    fn update(&mut self, ctx: &WorldContext) -> Effects {
        step_body(&mut self.body, Vec2::ZERO, ctx.tilemap, ctx.config);
        self.state.animation.update();
        Effects::default()
    }

    fn render(&self, offset: Vec2, draw: &mut DrawList) {
        draw.push(
            DrawCommand::new(
                self.state.animation.group.clone(),
                self.state.animation.frame(),
                self.body.position - offset,
            )
            .sized(self.body.size)
            .flipped(self.flip),
        );
    }
}
