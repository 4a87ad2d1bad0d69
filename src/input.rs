use bevy::prelude::*;
use std::collections::HashSet;

use crate::session::TickInput;

/// Abstraction layer between raw input and the fixed-rate game tick.
/// Held actions are refreshed every frame; presses are latched until the
/// next tick drains them so a fast tap is never lost between ticks.
#[derive(Resource, Default, Clone)]
pub struct VirtualInput {
    pub active: HashSet<&'static str>,
    pub just_pressed: HashSet<&'static str>,
}

impl VirtualInput {
    pub fn pressed(&self, action: &str) -> bool {
        self.active.contains(action)
    }

    pub fn just_pressed(&self, action: &str) -> bool {
        self.just_pressed.contains(action)
    }

    /// Snapshot for one tick, consuming latched presses.
    pub fn drain(&mut self) -> TickInput {
        let input = TickInput {
            left: self.pressed("left"),
            right: self.pressed("right"),
            jump: self.just_pressed("jump"),
            shoot: self.just_pressed("shoot"),
            switch_element: self.just_pressed("switch"),
        };
        self.just_pressed.clear();
        input
    }
}

const BINDINGS: [(&str, &[KeyCode]); 5] = [
    ("left", &[KeyCode::ArrowLeft, KeyCode::KeyA]),
    ("right", &[KeyCode::ArrowRight, KeyCode::KeyD]),
    ("jump", &[KeyCode::Space, KeyCode::ArrowUp, KeyCode::KeyW]),
    ("shoot", &[KeyCode::KeyX, KeyCode::KeyJ]),
    ("switch", &[KeyCode::KeyC, KeyCode::KeyK]),
];

pub struct InputPlugin;

impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(VirtualInput::default()).add_systems(
            PreUpdate,
            keyboard_to_virtual.run_if(resource_exists::<ButtonInput<KeyCode>>),
        );
    }
}

/// Translate keyboard input to VirtualInput action names
fn keyboard_to_virtual(keyboard: Res<ButtonInput<KeyCode>>, mut vinput: ResMut<VirtualInput>) {
    vinput.active.clear();
    for (action, keys) in BINDINGS {
        if keyboard.any_pressed(keys.iter().copied()) {
            vinput.active.insert(action);
        }
        if keyboard.any_just_pressed(keys.iter().copied()) {
            vinput.just_pressed.insert(action);
        }
    }
}
