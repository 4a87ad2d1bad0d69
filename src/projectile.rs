use bevy::math::Vec2;

use crate::animation::{Animation, AnimationLibrary};
use crate::components::{Element, GameConfig};
use crate::draw::{DrawCommand, DrawList};
use crate::entity::{Actor, Effects, WorldContext};
use crate::physics_core::Rect;

/// Straight-flying spell. Ignores terrain.
#[derive(Clone, Debug)]
pub struct Projectile {
    pub position: Vec2,
    pub size: Vec2,
    pub element: Element,
    /// Travelling toward -x.
    pub flip: bool,
    pub travelled: f32,
    animation: Animation,
}

impl Projectile {
    /// `origin` is the edge of the shooter it leaves from; the projectile is
    /// placed fully outside that edge and centred on `origin.y`.
    pub fn new(
        origin: Vec2,
        flip: bool,
        element: Element,
        config: &GameConfig,
        library: &AnimationLibrary,
    ) -> Self {
        let size = Vec2::new(config.projectile_size.0, config.projectile_size.1);
        let x = if flip { origin.x - size.x } else { origin.x };
        Self {
            position: Vec2::new(x, origin.y - size.y * 0.5),
            size,
            element,
            flip,
            travelled: 0.0,
            animation: library.play(&format!("projectile/{}", element.as_str())),
        }
    }
}

impl Actor for Projectile {
    fn rect(&self) -> Rect {
        Rect::new(self.position.x, self.position.y, self.size.x, self.size.y)
    }

    fn update(&mut self, ctx: &WorldContext) -> Effects {
        let step = ctx.config.projectile_step;
        self.position.x += if self.flip { -step } else { step };
        self.travelled += step;
        self.animation.update();
        Effects {
            expired: self.travelled > ctx.config.projectile_range,
            ..Effects::default()
        }
    }

    fn render(&self, offset: Vec2, draw: &mut DrawList) {
        draw.push(
            DrawCommand::new(self.animation.group.clone(), self.animation.frame(), self.position - offset)
                .sized(self.size)
                .flipped(self.flip),
        );
    }
}
