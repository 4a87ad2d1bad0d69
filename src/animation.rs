use std::collections::HashMap;

use bevy::prelude::*;

/// Clip timing, overridable per group from `game.json` under `animations`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Deserialize)]
pub struct AnimationClipDef {
    pub frame_count: usize,
    #[serde(default = "default_ticks_per_frame")]
    pub ticks_per_frame: usize,
    #[serde(default = "default_true")]
    pub looping: bool,
}

fn default_ticks_per_frame() -> usize {
    5
}

fn default_true() -> bool {
    true
}

impl AnimationClipDef {
    pub fn new(frame_count: usize, ticks_per_frame: usize, looping: bool) -> Self {
        Self {
            frame_count,
            ticks_per_frame,
            looping,
        }
    }

    fn total_ticks(&self) -> usize {
        self.frame_count.max(1) * self.ticks_per_frame.max(1)
    }
}

/// Clip definitions keyed by asset group (`player/idle`, `enemy/attack`, ...).
#[derive(Resource, Clone, Debug)]
pub struct AnimationLibrary {
    pub clips: HashMap<String, AnimationClipDef>,
}

impl Default for AnimationLibrary {
    fn default() -> Self {
        let clips = HashMap::from([
            ("player/idle".to_string(), AnimationClipDef::new(4, 5, true)),
            ("player/shooting".to_string(), AnimationClipDef::new(3, 5, false)),
            ("enemy/idle".to_string(), AnimationClipDef::new(4, 6, true)),
            ("enemy/run".to_string(), AnimationClipDef::new(6, 4, true)),
            ("enemy/attack".to_string(), AnimationClipDef::new(6, 5, false)),
            ("villager/idle".to_string(), AnimationClipDef::new(4, 8, true)),
            ("projectile/pink".to_string(), AnimationClipDef::new(4, 4, true)),
            ("projectile/blue".to_string(), AnimationClipDef::new(4, 4, true)),
        ]);
        Self { clips }
    }
}

impl AnimationLibrary {
    pub fn clip(&self, name: &str) -> Option<&AnimationClipDef> {
        self.clips.get(name)
    }

    /// Replace or add clips from config.
    pub fn merge(&mut self, clips: HashMap<String, AnimationClipDef>) {
        self.clips.extend(clips);
    }

    /// Keep clip timing but match the number of images actually on disk.
    pub fn set_frame_count(&mut self, name: &str, frame_count: usize) {
        if let Some(clip) = self.clips.get_mut(name) {
            clip.frame_count = frame_count.max(1);
        }
    }

    pub fn play(&self, name: &str) -> Animation {
        let clip = self
            .clip(name)
            .copied()
            .unwrap_or(AnimationClipDef::new(1, 1, true));
        Animation {
            group: name.to_string(),
            clip,
            tick: 0,
            done: false,
        }
    }
}

/// Running clip instance.
#[derive(Clone, Debug, PartialEq)]
pub struct Animation {
    pub group: String,
    clip: AnimationClipDef,
    tick: usize,
    pub done: bool,
}

impl Animation {
    pub fn update(&mut self) {
        let total = self.clip.total_ticks();
        if self.clip.looping {
            self.tick = (self.tick + 1) % total;
        } else {
            self.tick = (self.tick + 1).min(total - 1);
            if self.tick >= total - 1 {
                self.done = true;
            }
        }
    }

    pub fn frame(&self) -> usize {
        self.tick / self.clip.ticks_per_frame.max(1)
    }
}

/// Action tag plus its running clip. Re-selecting the current action keeps
/// the clip position.
#[derive(Clone, Debug)]
pub struct ActionState {
    prefix: &'static str,
    pub action: String,
    pub animation: Animation,
}

impl ActionState {
    pub fn new(prefix: &'static str, action: &str, library: &AnimationLibrary) -> Self {
        Self {
            prefix,
            action: action.to_string(),
            animation: library.play(&format!("{prefix}/{action}")),
        }
    }

    pub fn set(&mut self, action: &str, library: &AnimationLibrary) {
        if self.action != action {
            self.action = action.to_string();
            self.animation = library.play(&format!("{}/{action}", self.prefix));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_clips_override_defaults() {
        let clips: HashMap<String, AnimationClipDef> = serde_json::from_str(
            r#"{ "player/idle": { "frame_count": 2 }, "boss/idle": { "frame_count": 3, "ticks_per_frame": 2, "looping": false } }"#,
        )
        .unwrap();
        let mut library = AnimationLibrary::default();
        library.merge(clips);
        assert_eq!(library.clip("player/idle"), Some(&AnimationClipDef::new(2, 5, true)));
        assert_eq!(library.clip("boss/idle"), Some(&AnimationClipDef::new(3, 2, false)));
        assert_eq!(library.clip("enemy/run"), Some(&AnimationClipDef::new(6, 4, true)));
    }

    #[test]
    fn looping_clip_wraps() {
        let mut lib = AnimationLibrary::default();
        lib.clips.insert("t/loop".into(), AnimationClipDef::new(2, 3, true));
        let mut anim = lib.play("t/loop");
        let frames: Vec<usize> = (0..7)
            .map(|_| {
                anim.update();
                anim.frame()
            })
            .collect();
        assert_eq!(frames, vec![0, 0, 1, 1, 1, 0, 0]);
        assert!(!anim.done);
    }

    #[test]
    fn non_looping_clip_stops_at_last_frame() {
        let mut lib = AnimationLibrary::default();
        lib.clips.insert("t/once".into(), AnimationClipDef::new(2, 2, false));
        let mut anim = lib.play("t/once");
        for _ in 0..10 {
            anim.update();
        }
        assert!(anim.done);
        assert_eq!(anim.frame(), 1);
    }

    #[test]
    fn unknown_clip_holds_first_frame() {
        let lib = AnimationLibrary::default();
        let mut anim = lib.play("nobody/dance");
        anim.update();
        anim.update();
        assert_eq!(anim.frame(), 0);
    }

    #[test]
    fn set_action_only_restarts_on_change() {
        let lib = AnimationLibrary::default();
        let mut state = ActionState::new("enemy", "run", &lib);
        for _ in 0..5 {
            state.animation.update();
        }
        state.set("run", &lib);
        assert_eq!(state.animation.frame(), 1);
        state.set("attack", &lib);
        assert_eq!(state.animation.group, "enemy/attack");
        assert_eq!(state.animation.frame(), 0);
    }
}
