//! # 舞台处理器
//!
//! 背景、角色与屏幕效果。
//!
//! 背景过渡期间设置 `is_transitioning`，由 `EndTransition` 回调清除后推进；
//! 角色的进场/退场与覆盖层使用同样的生命周期。

use tracing::warn;

use crate::command::{
    FlashCommand, HideCharacterCommand, SetBackgroundCommand, ShakeScreenCommand,
    ShowCharacterCommand,
};
use crate::project::AssetKind;
use crate::runtime::handlers::HandlerContext;
use crate::runtime::result::{Continuation, HandlerResult, StatePatch};
use crate::state::{BackgroundState, CharacterPresentation, FlashEffect, PlayerState, ScreenEffect};
use crate::transition::{self, OverlayAction};

pub fn set_background(
    command_id: &str,
    cmd: &SetBackgroundCommand,
    state: &PlayerState,
    ctx: &HandlerContext,
) -> HandlerResult {
    let Some(url) = ctx.assets.resolve(&cmd.asset_id, AssetKind::Image) else {
        warn!(command_id = %command_id, asset_id = %cmd.asset_id, "背景资源不存在，跳过");
        return HandlerResult::advance();
    };
    let metadata = ctx
        .assets
        .metadata(&cmd.asset_id, AssetKind::Image)
        .unwrap_or_default();

    let transition = transition::effective(cmd.transition);
    let mut stage = state.stage_state.clone();
    stage.background = Some(BackgroundState {
        asset_id: cmd.asset_id.clone(),
        url,
        is_video: metadata.is_video,
        looping: metadata.looping,
        transition,
        duration: cmd.duration,
    });

    match transition {
        Some(_) => {
            let mut ui = state.ui_state.clone();
            ui.is_transitioning = true;
            HandlerResult::defer(
                Some(StatePatch::stage(stage).with_ui(ui)),
                ctx.transition_delay(cmd.duration),
                Continuation::EndTransition,
            )
        }
        None => HandlerResult::advance_with(StatePatch::stage(stage)),
    }
}

pub fn show_character(
    command_id: &str,
    cmd: &ShowCharacterCommand,
    state: &PlayerState,
    ctx: &HandlerContext,
) -> HandlerResult {
    let Some(character) = ctx.project.character(&cmd.character_id) else {
        warn!(command_id = %command_id, character_id = %cmd.character_id, "角色未定义，跳过");
        return HandlerResult::advance();
    };
    let sprite_url = character
        .sprite_asset(cmd.sprite_id.as_deref())
        .and_then(|asset_id| ctx.assets.resolve(asset_id, AssetKind::Image));
    let Some(sprite_url) = sprite_url else {
        warn!(
            command_id = %command_id,
            character_id = %cmd.character_id,
            sprite_id = ?cmd.sprite_id,
            "角色立绘资源不存在，跳过"
        );
        return HandlerResult::advance();
    };

    let transition = transition::effective(cmd.transition);
    let mut stage = state.stage_state.clone();
    stage.characters.insert(
        cmd.character_id.clone(),
        CharacterPresentation {
            character_id: cmd.character_id.clone(),
            sprite_url,
            position: cmd.position,
            transition,
            duration: cmd.duration,
            action: OverlayAction::Show,
        },
    );

    match transition {
        Some(_) => HandlerResult::defer(
            Some(StatePatch::stage(stage)),
            ctx.transition_delay(cmd.duration),
            Continuation::Advance,
        ),
        None => HandlerResult::advance_with(StatePatch::stage(stage)),
    }
}

pub fn hide_character(
    cmd: &HideCharacterCommand,
    state: &PlayerState,
    ctx: &HandlerContext,
) -> HandlerResult {
    if !state.stage_state.characters.contains_key(&cmd.character_id) {
        return HandlerResult::advance();
    }

    let mut stage = state.stage_state.clone();
    match transition::effective(cmd.transition) {
        Some(exit) => {
            if let Some(presentation) = stage.characters.get_mut(&cmd.character_id) {
                presentation.action = OverlayAction::Hide;
                presentation.transition = Some(exit);
                presentation.duration = cmd.duration;
            }
            HandlerResult::defer(
                Some(StatePatch::stage(stage)),
                ctx.transition_delay(cmd.duration),
                Continuation::RemoveCharacter {
                    id: cmd.character_id.clone(),
                },
            )
        }
        None => {
            stage.characters.remove(&cmd.character_id);
            HandlerResult::advance_with(StatePatch::stage(stage))
        }
    }
}

/// 闪屏：交给宿主消费，不等待
pub fn flash(cmd: &FlashCommand, state: &PlayerState) -> HandlerResult {
    let mut ui = state.ui_state.clone();
    ui.pending_flash = Some(FlashEffect {
        color: cmd.color.clone(),
        duration: cmd.duration.max(0.0),
    });
    HandlerResult::advance_with(StatePatch::ui(ui))
}

/// 震屏：交给宿主消费，不等待
pub fn shake_screen(cmd: &ShakeScreenCommand, state: &PlayerState) -> HandlerResult {
    let mut stage = state.stage_state.clone();
    stage.screen_effect = Some(ScreenEffect {
        intensity: cmd.intensity.max(0.0),
        duration: cmd.duration.max(0.0),
    });
    HandlerResult::advance_with(StatePatch::stage(stage))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandKind;
    use crate::config::PlayerConfig;
    use crate::geometry::StagePosition;
    use crate::project::{Asset, CharacterDefinition, Project, Sprite};
    use crate::runtime::handlers::test_support::{SILENT, context, project_with_assets, state_after};
    use crate::transition::TransitionKind;

    fn project_with_character() -> Project {
        let mut project = project_with_assets();
        project.assets.push(Asset {
            id: "ann_smile".to_string(),
            kind: AssetKind::Image,
            url: "img/ann_smile.png".to_string(),
            looping: false,
        });
        project.characters.push(CharacterDefinition {
            id: "ann".to_string(),
            name: "Ann".to_string(),
            sprites: vec![Sprite {
                id: "smile".to_string(),
                asset_id: "ann_smile".to_string(),
            }],
            default_sprite_id: None,
        });
        project
    }

    #[test]
    fn test_background_transition_sets_and_schedules_end() {
        let project = project_with_assets();
        let config = PlayerConfig::default();
        let ctx = context(&project, &SILENT, &config);
        let cmd = SetBackgroundCommand {
            asset_id: "bg".to_string(),
            transition: Some(TransitionKind::Fade),
            duration: 1.0,
        };
        let (_, state) = state_after(CommandKind::SetBackground(cmd.clone()));

        let result = set_background("bg1", &cmd, &state, &ctx);
        assert!(!result.advance);
        assert_eq!(result.delay, 1100);
        assert_eq!(result.callback, Some(Continuation::EndTransition));
        let patch = result.updates.unwrap();
        assert!(patch.ui.unwrap().is_transitioning);
        assert_eq!(patch.stage.unwrap().background.unwrap().url, "img/bg.png");
    }

    #[test]
    fn test_video_background_metadata() {
        let project = project_with_assets();
        let config = PlayerConfig::default();
        let ctx = context(&project, &SILENT, &config);
        let cmd = SetBackgroundCommand {
            asset_id: "intro".to_string(),
            transition: None,
            duration: 0.5,
        };
        let (_, state) = state_after(CommandKind::SetBackground(cmd.clone()));

        let result = set_background("bg1", &cmd, &state, &ctx);
        assert!(result.advance);
        let background = result.updates.unwrap().stage.unwrap().background.unwrap();
        assert!(background.is_video);
    }

    #[test]
    fn test_missing_background_is_noop() {
        let project = project_with_assets();
        let config = PlayerConfig::default();
        let ctx = context(&project, &SILENT, &config);
        let cmd = SetBackgroundCommand {
            asset_id: "missing".to_string(),
            transition: Some(TransitionKind::Fade),
            duration: 1.0,
        };
        let (_, state) = state_after(CommandKind::SetBackground(cmd.clone()));
        assert_eq!(set_background("bg1", &cmd, &state, &ctx), HandlerResult::advance());
    }

    #[test]
    fn test_character_show_and_hide() {
        let project = project_with_character();
        let config = PlayerConfig::default();
        let ctx = context(&project, &SILENT, &config);
        let show = ShowCharacterCommand {
            character_id: "ann".to_string(),
            sprite_id: None,
            position: StagePosition::Left,
            transition: None,
            duration: 0.5,
        };
        let (_, mut state) = state_after(CommandKind::ShowCharacter(show.clone()));

        let result = show_character("c1", &show, &state, &ctx);
        assert!(result.advance);
        state.stage_state = result.updates.unwrap().stage.unwrap();
        let ann = &state.stage_state.characters["ann"];
        assert_eq!(ann.sprite_url, "img/ann_smile.png");
        assert_eq!(ann.position, StagePosition::Left);

        let hide = HideCharacterCommand {
            character_id: "ann".to_string(),
            transition: Some(TransitionKind::Fade),
            duration: 0.2,
        };
        let result = hide_character(&hide, &state, &ctx);
        assert_eq!(result.delay, 300);
        assert_eq!(
            result.callback,
            Some(Continuation::RemoveCharacter {
                id: "ann".to_string()
            })
        );
        let stage = result.updates.unwrap().stage.unwrap();
        assert_eq!(stage.characters["ann"].action, OverlayAction::Hide);
    }

    #[test]
    fn test_unknown_character_is_noop() {
        let project = project_with_character();
        let config = PlayerConfig::default();
        let ctx = context(&project, &SILENT, &config);
        let show = ShowCharacterCommand {
            character_id: "bob".to_string(),
            sprite_id: None,
            position: StagePosition::Center,
            transition: None,
            duration: 0.5,
        };
        let (_, state) = state_after(CommandKind::ShowCharacter(show.clone()));
        assert_eq!(show_character("c1", &show, &state, &ctx), HandlerResult::advance());

        let hide = HideCharacterCommand {
            character_id: "bob".to_string(),
            transition: None,
            duration: 0.5,
        };
        assert_eq!(hide_character(&hide, &state, &ctx), HandlerResult::advance());
    }

    #[test]
    fn test_effects_do_not_block() {
        let (_, state) = state_after(CommandKind::StopMusic);
        let result = flash(
            &FlashCommand {
                color: "#000000".to_string(),
                duration: 0.3,
            },
            &state,
        );
        assert!(result.advance);
        let ui = result.updates.unwrap().ui.unwrap();
        assert!(!ui.is_blocking());
        assert!(ui.pending_flash.is_some());

        let result = shake_screen(
            &ShakeScreenCommand {
                intensity: 5.0,
                duration: 0.5,
            },
            &state,
        );
        assert!(result.advance);
    }
}
