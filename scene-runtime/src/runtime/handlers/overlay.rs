//! # 覆盖层处理器
//!
//! 文字/图片/按钮覆盖层的显示与隐藏。
//!
//! ## 显示
//!
//! - 显示条件不满足时不创建覆盖层，直接推进
//! - 新覆盖层 `action = show`，过渡字段取自指令（`instant` 视为无过渡）
//! - 有过渡：停下，`duration * 1000 + grace` 毫秒后推进
//! - 无过渡：立即推进
//! - 按钮 `wait_for_click`：无过渡时立即进入等待点击；有过渡时在过渡结束后进入
//!
//! ## 隐藏
//!
//! - 目标不存在：空操作，立即推进（隐藏是幂等的）
//! - 有过渡：原地改为 `action = hide` 保留渲染，延迟后移除并推进
//! - 无过渡：立即移除并推进

use tracing::{debug, warn};

use crate::command::{HideOverlayCommand, ShowButtonCommand, ShowImageCommand, ShowTextCommand};
use crate::logic::evaluate_conditions;
use crate::project::AssetKind;
use crate::runtime::handlers::HandlerContext;
use crate::runtime::result::{Continuation, HandlerResult, StatePatch};
use crate::state::{
    ButtonOverlay, ImageOverlay, OverlayKind, PlayerState, StageState, TextOverlay,
};
use crate::transition::{self, OverlayAction, TransitionKind};

/// 三类覆盖层的共同操作
trait OverlayEntry {
    fn id(&self) -> &str;
    fn begin_exit(&mut self, transition: TransitionKind, duration: f64);
}

macro_rules! impl_overlay_entry {
    ($($ty:ty),*) => {
        $(
            impl OverlayEntry for $ty {
                fn id(&self) -> &str {
                    &self.id
                }

                fn begin_exit(&mut self, transition: TransitionKind, duration: f64) {
                    self.action = OverlayAction::Hide;
                    self.transition = Some(transition);
                    self.duration = duration;
                }
            }
        )*
    };
}

impl_overlay_entry!(TextOverlay, ImageOverlay, ButtonOverlay);

/// 同 id 的覆盖层原地替换，否则追加到末尾
fn upsert<T: OverlayEntry>(list: &mut Vec<T>, entry: T) {
    match list.iter().position(|o| o.id() == entry.id()) {
        Some(pos) => list[pos] = entry,
        None => list.push(entry),
    }
}

fn begin_exit<T: OverlayEntry>(list: &mut [T], id: &str, transition: TransitionKind, duration: f64) {
    if let Some(entry) = list.iter_mut().find(|o| o.id() == id) {
        entry.begin_exit(transition, duration);
    }
}

/// 显示类指令的统一收尾
fn finish_show(
    ctx: &HandlerContext,
    stage: StageState,
    transition: Option<TransitionKind>,
    duration: f64,
) -> HandlerResult {
    match transition {
        Some(_) => HandlerResult::defer(
            Some(StatePatch::stage(stage)),
            ctx.transition_delay(duration),
            Continuation::Advance,
        ),
        None => HandlerResult::advance_with(StatePatch::stage(stage)),
    }
}

fn conditions_hold(
    command_id: &str,
    conditions: &[crate::logic::Condition],
    state: &PlayerState,
    ctx: &HandlerContext,
) -> bool {
    let visible = evaluate_conditions(conditions, &state.variables, ctx.project);
    if !visible {
        debug!(command_id = %command_id, "显示条件不满足，跳过覆盖层");
    }
    visible
}

/// 显示文字覆盖层
pub fn show_text(
    command_id: &str,
    cmd: &ShowTextCommand,
    state: &PlayerState,
    ctx: &HandlerContext,
) -> HandlerResult {
    if !conditions_hold(command_id, &cmd.conditions, state, ctx) {
        return HandlerResult::advance();
    }

    let transition = transition::effective(cmd.transition);
    let mut style = cmd.style.clone();
    if style.font_family.is_none() {
        style.font_family = ctx.project.font_family(None).map(str::to_string);
    }

    let mut stage = state.stage_state.clone();
    upsert(
        &mut stage.text_overlays,
        TextOverlay {
            id: command_id.to_string(),
            text: ctx.interpolate(&cmd.text, state),
            rect: cmd.rect,
            style,
            transition,
            duration: cmd.duration,
            action: OverlayAction::Show,
        },
    );

    finish_show(ctx, stage, transition, cmd.duration)
}

/// 显示图片覆盖层
pub fn show_image(
    command_id: &str,
    cmd: &ShowImageCommand,
    state: &PlayerState,
    ctx: &HandlerContext,
) -> HandlerResult {
    if !conditions_hold(command_id, &cmd.conditions, state, ctx) {
        return HandlerResult::advance();
    }

    let Some(url) = ctx.assets.resolve(&cmd.asset_id, AssetKind::Image) else {
        warn!(command_id = %command_id, asset_id = %cmd.asset_id, "图片资源不存在，跳过");
        return HandlerResult::advance();
    };

    let transition = transition::effective(cmd.transition);
    let mut stage = state.stage_state.clone();
    upsert(
        &mut stage.image_overlays,
        ImageOverlay {
            id: command_id.to_string(),
            asset_id: cmd.asset_id.clone(),
            url,
            rect: cmd.rect,
            opacity: cmd.opacity.clamp(0.0, 1.0),
            rotation: cmd.rotation,
            transition,
            duration: cmd.duration,
            action: OverlayAction::Show,
        },
    );

    finish_show(ctx, stage, transition, cmd.duration)
}

/// 显示按钮覆盖层
pub fn show_button(
    command_id: &str,
    cmd: &ShowButtonCommand,
    state: &PlayerState,
    ctx: &HandlerContext,
) -> HandlerResult {
    if !conditions_hold(command_id, &cmd.conditions, state, ctx) {
        return HandlerResult::advance();
    }

    // 按钮底图缺失时仍显示文字按钮
    let image_url = cmd.image_asset_id.as_deref().and_then(|asset_id| {
        let url = ctx.assets.resolve(asset_id, AssetKind::Image);
        if url.is_none() {
            warn!(command_id = %command_id, asset_id = %asset_id, "按钮图片资源不存在");
        }
        url
    });

    let transition = transition::effective(cmd.transition);
    let mut stage = state.stage_state.clone();
    upsert(
        &mut stage.button_overlays,
        ButtonOverlay {
            id: command_id.to_string(),
            text: ctx.interpolate(&cmd.text, state),
            rect: cmd.rect,
            style: cmd.style.clone(),
            image_url,
            actions: cmd.actions.clone(),
            wait_for_click: cmd.wait_for_click,
            click_sound_id: cmd.click_sound_id.clone(),
            transition,
            duration: cmd.duration,
            action: OverlayAction::Show,
        },
    );

    if !cmd.wait_for_click {
        return finish_show(ctx, stage, transition, cmd.duration);
    }

    match transition {
        // 过渡结束后才进入等待点击
        Some(_) => HandlerResult::defer(
            Some(StatePatch::stage(stage)),
            ctx.transition_delay(cmd.duration),
            Continuation::BlockForButton {
                id: command_id.to_string(),
            },
        ),
        None => {
            let mut ui = state.ui_state.clone();
            ui.is_waiting_for_input = true;
            ui.waiting_button_id = Some(command_id.to_string());
            HandlerResult::block(StatePatch::stage(stage).with_ui(ui))
        }
    }
}

/// 隐藏覆盖层（文字/图片/按钮共用）
pub fn hide_overlay(
    kind: OverlayKind,
    cmd: &HideOverlayCommand,
    state: &PlayerState,
    ctx: &HandlerContext,
) -> HandlerResult {
    let id = cmd.target_command_id.as_str();
    if !state.stage_state.has_overlay(kind, id) {
        debug!(target_command_id = %id, ?kind, "隐藏目标不存在，忽略");
        return HandlerResult::advance();
    }

    let mut stage = state.stage_state.clone();
    match transition::effective(cmd.transition) {
        Some(exit) => {
            match kind {
                OverlayKind::Text => begin_exit(&mut stage.text_overlays, id, exit, cmd.duration),
                OverlayKind::Image => begin_exit(&mut stage.image_overlays, id, exit, cmd.duration),
                OverlayKind::Button => {
                    begin_exit(&mut stage.button_overlays, id, exit, cmd.duration)
                }
            }
            HandlerResult::defer(
                Some(StatePatch::stage(stage)),
                ctx.transition_delay(cmd.duration),
                Continuation::RemoveOverlay {
                    kind,
                    id: id.to_string(),
                },
            )
        }
        None => {
            stage.remove_overlay(kind, id);
            HandlerResult::advance_with(StatePatch::stage(stage))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{ButtonAction, CommandKind, TextStyle};
    use crate::config::PlayerConfig;
    use crate::geometry::Rect;
    use crate::logic::{Condition, ConditionOperator};
    use crate::runtime::handlers::test_support::{SILENT, context, project_with_assets, state_after};
    use crate::state::VarValue;

    fn show_text_cmd(transition: Option<TransitionKind>, duration: f64) -> ShowTextCommand {
        ShowTextCommand {
            text: "Hello {name}".to_string(),
            rect: Rect::new(0.0, 0.0, 100.0, 20.0),
            style: TextStyle::default(),
            transition,
            duration,
            conditions: Vec::new(),
        }
    }

    fn hide_cmd(target: &str, transition: Option<TransitionKind>) -> HideOverlayCommand {
        HideOverlayCommand {
            target_command_id: target.to_string(),
            transition,
            duration: 0.5,
        }
    }

    fn button_cmd(wait_for_click: bool, transition: Option<TransitionKind>) -> ShowButtonCommand {
        ShowButtonCommand {
            text: "Go".to_string(),
            rect: Rect::new(0.0, 0.0, 80.0, 30.0),
            style: TextStyle::default(),
            image_asset_id: None,
            actions: vec![ButtonAction::PlaySound {
                asset_id: "click".to_string(),
            }],
            wait_for_click,
            click_sound_id: None,
            transition,
            duration: 0.3,
            conditions: Vec::new(),
        }
    }

    fn apply_stage(state: &mut PlayerState, result: &HandlerResult) {
        if let Some(stage) = result.updates.as_ref().and_then(|p| p.stage.clone()) {
            state.stage_state = stage;
        }
    }

    #[test]
    fn test_show_text_instant_advances() {
        let project = project_with_assets();
        let config = PlayerConfig::default();
        let ctx = context(&project, &SILENT, &config);
        let cmd = show_text_cmd(Some(TransitionKind::Instant), 0.5);
        let (_, mut state) = state_after(CommandKind::ShowText(cmd.clone()));
        state.set_var("name", VarValue::from("Ann"));

        let result = show_text("t1", &cmd, &state, &ctx);
        assert!(result.advance);
        assert_eq!(result.delay, 0);
        assert!(result.callback.is_none());

        let stage = result.updates.unwrap().stage.unwrap();
        assert_eq!(stage.text_overlays.len(), 1);
        let overlay = &stage.text_overlays[0];
        assert_eq!(overlay.id, "t1");
        assert_eq!(overlay.text, "Hello Ann");
        assert_eq!(overlay.transition, None);
        assert_eq!(overlay.action, OverlayAction::Show);
    }

    #[test]
    fn test_show_text_with_transition_defers() {
        let project = project_with_assets();
        let config = PlayerConfig::default();
        let ctx = context(&project, &SILENT, &config);
        let cmd = show_text_cmd(Some(TransitionKind::Fade), 0.5);
        let (_, state) = state_after(CommandKind::ShowText(cmd.clone()));

        let result = show_text("t1", &cmd, &state, &ctx);
        assert!(!result.advance);
        assert_eq!(result.delay, 600);
        assert_eq!(result.callback, Some(Continuation::Advance));
        // 不设置阻塞标记
        assert!(result.updates.unwrap().ui.is_none());
    }

    #[test]
    fn test_grace_period_is_configurable() {
        let project = project_with_assets();
        let config = PlayerConfig {
            transition_grace_ms: 0,
            ..PlayerConfig::default()
        };
        let ctx = context(&project, &SILENT, &config);
        let cmd = show_text_cmd(Some(TransitionKind::SlideUp), 1.0);
        let (_, state) = state_after(CommandKind::ShowText(cmd.clone()));

        assert_eq!(show_text("t1", &cmd, &state, &ctx).delay, 1000);
    }

    #[test]
    fn test_show_text_condition_false_creates_nothing() {
        let project = project_with_assets();
        let config = PlayerConfig::default();
        let ctx = context(&project, &SILENT, &config);
        let mut cmd = show_text_cmd(None, 0.5);
        cmd.conditions = vec![Condition::new("flag", ConditionOperator::Eq, true)];
        let (_, state) = state_after(CommandKind::ShowText(cmd.clone()));

        let result = show_text("t1", &cmd, &state, &ctx);
        assert_eq!(result, HandlerResult::advance());
    }

    #[test]
    fn test_show_same_id_replaces_in_place() {
        let project = project_with_assets();
        let config = PlayerConfig::default();
        let ctx = context(&project, &SILENT, &config);
        let cmd = show_text_cmd(None, 0.0);
        let (_, mut state) = state_after(CommandKind::ShowText(cmd.clone()));

        let first = show_text("t1", &cmd, &state, &ctx);
        apply_stage(&mut state, &first);
        let second = show_text("t1", &cmd, &state, &ctx);
        apply_stage(&mut state, &second);
        assert_eq!(state.stage_state.text_overlays.len(), 1);
    }

    #[test]
    fn test_hide_missing_is_idempotent() {
        let project = project_with_assets();
        let config = PlayerConfig::default();
        let ctx = context(&project, &SILENT, &config);
        let cmd = hide_cmd("ghost", Some(TransitionKind::Fade));
        let (_, state) = state_after(CommandKind::HideText(cmd.clone()));
        let before = state.stage_state.clone();

        for kind in [OverlayKind::Text, OverlayKind::Image, OverlayKind::Button] {
            let result = hide_overlay(kind, &cmd, &state, &ctx);
            assert_eq!(result, HandlerResult::advance());
        }
        assert_eq!(state.stage_state, before);
    }

    #[test]
    fn test_show_hide_instant_round_trip() {
        let project = project_with_assets();
        let config = PlayerConfig::default();
        let ctx = context(&project, &SILENT, &config);
        let show = show_text_cmd(None, 0.5);
        let (_, mut state) = state_after(CommandKind::ShowText(show.clone()));
        let before = state.stage_state.text_overlays.clone();

        let shown = show_text("t1", &show, &state, &ctx);
        apply_stage(&mut state, &shown);
        assert_eq!(state.stage_state.text_overlays.len(), 1);

        let hidden = hide_overlay(OverlayKind::Text, &hide_cmd("t1", None), &state, &ctx);
        assert!(hidden.advance);
        apply_stage(&mut state, &hidden);
        assert_eq!(state.stage_state.text_overlays, before);
    }

    #[test]
    fn test_hide_with_transition_keeps_overlay_until_removed() {
        let project = project_with_assets();
        let config = PlayerConfig::default();
        let ctx = context(&project, &SILENT, &config);
        let show = show_text_cmd(None, 0.5);
        let (_, mut state) = state_after(CommandKind::ShowText(show.clone()));
        let shown = show_text("t1", &show, &state, &ctx);
        apply_stage(&mut state, &shown);

        let result = hide_overlay(
            OverlayKind::Text,
            &hide_cmd("t1", Some(TransitionKind::Dissolve)),
            &state,
            &ctx,
        );
        assert!(!result.advance);
        assert_eq!(result.delay, 600);
        assert_eq!(
            result.callback,
            Some(Continuation::RemoveOverlay {
                kind: OverlayKind::Text,
                id: "t1".to_string()
            })
        );
        let stage = result.updates.unwrap().stage.unwrap();
        assert_eq!(stage.text_overlays[0].action, OverlayAction::Hide);
        assert_eq!(stage.text_overlays[0].transition, Some(TransitionKind::Dissolve));
    }

    #[test]
    fn test_show_image_missing_asset_is_noop() {
        let project = project_with_assets();
        let config = PlayerConfig::default();
        let ctx = context(&project, &SILENT, &config);
        let cmd = ShowImageCommand {
            asset_id: "nope".to_string(),
            rect: Rect::default(),
            opacity: 1.0,
            rotation: 0.0,
            transition: Some(TransitionKind::Fade),
            duration: 0.5,
            conditions: Vec::new(),
        };
        let (_, state) = state_after(CommandKind::ShowImage(cmd.clone()));

        assert_eq!(show_image("i1", &cmd, &state, &ctx), HandlerResult::advance());
    }

    #[test]
    fn test_show_image_resolves_url() {
        let project = project_with_assets();
        let config = PlayerConfig::default();
        let ctx = context(&project, &SILENT, &config);
        let cmd = ShowImageCommand {
            asset_id: "logo".to_string(),
            rect: Rect::default(),
            opacity: 2.0,
            rotation: 15.0,
            transition: None,
            duration: 0.5,
            conditions: Vec::new(),
        };
        let (_, state) = state_after(CommandKind::ShowImage(cmd.clone()));

        let result = show_image("i1", &cmd, &state, &ctx);
        let stage = result.updates.unwrap().stage.unwrap();
        assert_eq!(stage.image_overlays[0].url, "img/logo.png");
        assert_eq!(stage.image_overlays[0].opacity, 1.0);
    }

    #[test]
    fn test_button_wait_for_click_instant_blocks() {
        let project = project_with_assets();
        let config = PlayerConfig::default();
        let ctx = context(&project, &SILENT, &config);
        let cmd = button_cmd(true, None);
        let (_, state) = state_after(CommandKind::ShowButton(cmd.clone()));

        let result = show_button("b1", &cmd, &state, &ctx);
        assert!(!result.advance);
        assert!(result.callback.is_none());
        let ui = result.updates.unwrap().ui.unwrap();
        assert!(ui.is_waiting_for_input);
        assert_eq!(ui.waiting_button_id.as_deref(), Some("b1"));
    }

    #[test]
    fn test_button_wait_for_click_blocks_after_transition() {
        let project = project_with_assets();
        let config = PlayerConfig::default();
        let ctx = context(&project, &SILENT, &config);
        let cmd = button_cmd(true, Some(TransitionKind::Fade));
        let (_, state) = state_after(CommandKind::ShowButton(cmd.clone()));

        let result = show_button("b1", &cmd, &state, &ctx);
        assert!(!result.advance);
        assert_eq!(result.delay, 400);
        assert_eq!(
            result.callback,
            Some(Continuation::BlockForButton {
                id: "b1".to_string()
            })
        );
        // 过渡期间不设置阻塞标记
        assert!(result.updates.unwrap().ui.is_none());
    }

    #[test]
    fn test_button_without_wait_advances() {
        let project = project_with_assets();
        let config = PlayerConfig::default();
        let ctx = context(&project, &SILENT, &config);
        let cmd = button_cmd(false, None);
        let (_, state) = state_after(CommandKind::ShowButton(cmd.clone()));

        let result = show_button("b1", &cmd, &state, &ctx);
        assert!(result.advance);
        let stage = result.updates.unwrap().stage.unwrap();
        assert!(stage.button("b1").is_some());
    }
}
