use bevy::app::AppExit;
use bevy::prelude::*;

use crate::components::HeadlessMode;
use crate::draw::{DrawCommand, DrawList};
use crate::input::VirtualInput;
use crate::render::FrameDraw;
use crate::session::{GameSession, SessionStatus};

const HUD_MARGIN: f32 = 5.0;
const HUD_ICON: f32 = 16.0;

/// Runs a `GameSession` at the fixed 60 Hz tick.
pub struct GamePlugin;

impl Plugin for GamePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<LastStatus>()
            .add_systems(FixedUpdate, (tick_session, report_status).chain())
            .add_systems(Update, draw_session.run_if(resource_exists::<FrameDraw>));
    }
}

#[derive(Resource)]
struct LastStatus(SessionStatus);

impl Default for LastStatus {
    fn default() -> Self {
        Self(SessionStatus::Playing)
    }
}

fn tick_session(mut session: ResMut<GameSession>, mut vinput: ResMut<VirtualInput>) {
    let input = vinput.drain();
    session.tick(input);
}

fn report_status(
    session: Res<GameSession>,
    headless: Res<HeadlessMode>,
    mut last: ResMut<LastStatus>,
    mut exit: EventWriter<AppExit>,
) {
    if session.status == last.0 {
        return;
    }
    last.0 = session.status;
    match session.status {
        SessionStatus::GameOver => info!(
            "[Witchlink] Game over at frame {} ({} villagers rescued)",
            session.frame,
            session.villagers.len()
        ),
        SessionStatus::Victory => info!(
            "[Witchlink] Victory at frame {}: all {} enemies rescued",
            session.frame,
            session.villagers.len()
        ),
        SessionStatus::Playing => {}
    }
    if headless.0 && session.status != SessionStatus::Playing {
        exit.send(AppExit::Success);
    }
}

/// Hearts then keys along the top-left corner.
pub fn draw_hud(session: &GameSession, draw: &mut DrawList) {
    let icons = std::iter::repeat("ui/heart")
        .take(session.player.health as usize)
        .chain(std::iter::repeat("ui/key").take(session.player.keys as usize));
    for (i, group) in icons.enumerate() {
        let at = Vec2::new(HUD_MARGIN + i as f32 * (HUD_ICON + 2.0), HUD_MARGIN);
        draw.push(DrawCommand::new(group, 0, at).sized(Vec2::splat(HUD_ICON)));
    }
}

fn draw_session(session: Res<GameSession>, mut frame: ResMut<FrameDraw>) {
    frame.0.clear();
    session.render(&mut frame.0);
    draw_hud(&session, &mut frame.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::AnimationLibrary;
    use crate::components::GameConfig;
    use crate::save_file::SaveData;
    use crate::tilemap::Tilemap;

    #[test]
    fn hud_shows_health_then_keys() {
        let save = SaveData {
            enemies: vec![],
            player: (0, 0),
        };
        let mut session = GameSession::new(
            Tilemap::new(48),
            &save,
            GameConfig::default(),
            AnimationLibrary::default(),
            3,
        );
        session.player.keys = 2;
        let mut draw = DrawList::default();
        draw_hud(&session, &mut draw);
        let groups: Vec<&str> = draw.commands.iter().map(|c| c.group.as_str()).collect();
        assert_eq!(groups, vec!["ui/heart", "ui/heart", "ui/heart", "ui/key", "ui/key"]);
        assert_eq!(draw.commands[1].position, Vec2::new(23.0, 5.0));
    }
}
