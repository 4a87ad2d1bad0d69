use bevy::math::Vec2;

use crate::components::GameConfig;

/// Axis-aligned rectangle in pixel space, y grows downward.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w * 0.5, self.y + self.h * 0.5)
    }

    /// Strict overlap: touching edges do not collide.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.left() < other.right()
            && self.right() > other.left()
            && self.top() < other.bottom()
            && self.bottom() > other.top()
    }

    pub fn contains_point(&self, p: Vec2) -> bool {
        p.x >= self.left() && p.x < self.right() && p.y >= self.top() && p.y < self.bottom()
    }

    pub fn inflate(&self, dx: f32, dy: f32) -> Rect {
        Rect::new(self.x - dx, self.y - dy, self.w + dx * 2.0, self.h + dy * 2.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Axis {
    Horizontal,
    Vertical,
}

#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct CollisionFlags {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl CollisionFlags {
    pub fn merge(&mut self, other: CollisionFlags) {
        self.up |= other.up;
        self.down |= other.down;
        self.left |= other.left;
        self.right |= other.right;
    }

    pub fn horizontal(&self) -> bool {
        self.left || self.right
    }

    pub fn vertical(&self) -> bool {
        self.up || self.down
    }
}

/// Anything that can hand out the solid rectangles around a body.
pub trait SolidGeometry {
    fn solid_rects_near(&self, pos: Vec2, entity_height: f32) -> Vec<Rect>;
}

/// Shared physics state of every actor.
#[derive(Clone, Debug)]
pub struct PhysicsBody {
    pub position: Vec2,
    pub size: Vec2,
    pub velocity: Vec2,
    pub collisions: CollisionFlags,
}

impl PhysicsBody {
    pub fn new(position: Vec2, size: Vec2) -> Self {
        Self {
            position,
            size,
            velocity: Vec2::ZERO,
            collisions: CollisionFlags::default(),
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.position.x, self.position.y, self.size.x, self.size.y)
    }
}

/// Displace `rect` along one axis and clip it against every overlapping candidate.
///
/// Candidates are processed in order; clipping against the same rectangle twice
/// is a no-op, so duplicated candidates are harmless.
pub fn resolve(rect: Rect, delta: f32, axis: Axis, candidates: &[Rect]) -> (Rect, CollisionFlags) {
    let mut out = rect;
    let mut flags = CollisionFlags::default();
    match axis {
        Axis::Horizontal => out.x += delta,
        Axis::Vertical => out.y += delta,
    }
    for tile in candidates {
        if !out.overlaps(tile) {
            continue;
        }
        match axis {
            Axis::Horizontal => {
                if delta > 0.0 {
                    out.x = tile.left() - out.w;
                    flags.right = true;
                }
                if delta < 0.0 {
                    out.x = tile.right();
                    flags.left = true;
                }
            }
            Axis::Vertical => {
                if delta > 0.0 {
                    out.y = tile.top() - out.h;
                    flags.down = true;
                }
                if delta < 0.0 {
                    out.y = tile.bottom();
                    flags.up = true;
                }
            }
        }
    }
    (out, flags)
}

/// Move a body one tick: horizontal first, then vertical against freshly
/// queried geometry, then gravity.
pub fn step_body<G: SolidGeometry + ?Sized>(
    body: &mut PhysicsBody,
    movement: Vec2,
    geometry: &G,
    config: &GameConfig,
) {
    body.collisions = CollisionFlags::default();
    let frame_movement = movement + body.velocity;

    let moved_x = Rect {
        x: body.position.x + frame_movement.x,
        ..body.rect()
    };
    let candidates = geometry.solid_rects_near(Vec2::new(moved_x.x, moved_x.y), body.size.y);
    let (rect, flags) = resolve(body.rect(), frame_movement.x, Axis::Horizontal, &candidates);
    body.position.x = rect.x;
    body.collisions.merge(flags);

    let moved_y = Rect {
        y: body.position.y + frame_movement.y,
        ..body.rect()
    };
    let candidates = geometry.solid_rects_near(Vec2::new(moved_y.x, moved_y.y), body.size.y);
    let (rect, flags) = resolve(body.rect(), frame_movement.y, Axis::Vertical, &candidates);
    body.position.y = rect.y;
    body.collisions.merge(flags);

    apply_gravity(&mut body.velocity, body.collisions, config);
}

/// Gravity runs after resolution; a blocked axis loses its velocity.
pub fn apply_gravity(velocity: &mut Vec2, collisions: CollisionFlags, config: &GameConfig) {
    velocity.y = (velocity.y + config.gravity).min(config.terminal_velocity);
    if collisions.vertical() {
        velocity.y = 0.0;
    }
    if collisions.horizontal() {
        velocity.x = 0.0;
    }
}
