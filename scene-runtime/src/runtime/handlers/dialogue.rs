//! # 交互处理器
//!
//! 对话、选择、文本输入、视频。这是仅有的几类会设置阻塞闸门的指令，
//! 每一类都有唯一对应的解除事件（见 `GameSession` 的 `finish_dialogue`、
//! `select_choice`、`submit_text_input`、`finish_movie`）。

use tracing::warn;

use crate::command::{ChoiceCommand, DialogueCommand, PlayMovieCommand, TextInputCommand};
use crate::history::HistoryEvent;
use crate::logic::{evaluate_conditions, resolve_variable_id};
use crate::project::AssetKind;
use crate::runtime::handlers::HandlerContext;
use crate::runtime::result::{HandlerResult, StatePatch};
use crate::state::{ChoiceSet, ChoiceView, DialogueLine, PlayerState, TextInputRequest};

/// 显示对话并等待玩家确认
pub fn dialogue(
    command_id: &str,
    cmd: &DialogueCommand,
    state: &PlayerState,
    ctx: &HandlerContext,
) -> HandlerResult {
    // 未定义的角色直接显示 id
    let speaker = cmd.character_id.as_deref().map(|id| {
        ctx.project
            .character(id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| id.to_string())
    });
    let text = ctx.interpolate(&cmd.text, state);

    let mut ui = state.ui_state.clone();
    ui.dialogue = Some(DialogueLine {
        command_id: command_id.to_string(),
        speaker: speaker.clone(),
        character_id: cmd.character_id.clone(),
        text: text.clone(),
    });
    ui.is_waiting_for_input = true;

    HandlerResult::block(StatePatch::ui(ui).with_history(HistoryEvent::dialogue(speaker, text)))
}

/// 显示满足条件的选项
pub fn choice(
    command_id: &str,
    cmd: &ChoiceCommand,
    state: &PlayerState,
    ctx: &HandlerContext,
) -> HandlerResult {
    let options: Vec<ChoiceView> = cmd
        .options
        .iter()
        .enumerate()
        .filter(|(_, option)| evaluate_conditions(&option.conditions, &state.variables, ctx.project))
        .map(|(option_index, option)| ChoiceView {
            option_index,
            text: ctx.interpolate(&option.text, state),
        })
        .collect();

    if options.is_empty() {
        warn!(command_id = %command_id, "没有可显示的选项，跳过选择");
        return HandlerResult::advance();
    }

    let mut ui = state.ui_state.clone();
    ui.choices = Some(ChoiceSet {
        command_id: command_id.to_string(),
        prompt: cmd.prompt.as_deref().map(|p| ctx.interpolate(p, state)),
        options,
    });
    HandlerResult::block(StatePatch::ui(ui))
}

/// 请求玩家输入文本
pub fn text_input(
    command_id: &str,
    cmd: &TextInputCommand,
    state: &PlayerState,
    ctx: &HandlerContext,
) -> HandlerResult {
    let mut ui = state.ui_state.clone();
    ui.text_input = Some(TextInputRequest {
        command_id: command_id.to_string(),
        variable_id: resolve_variable_id(&cmd.variable_id, ctx.project),
        prompt: ctx.interpolate(&cmd.prompt, state),
        placeholder: cmd.placeholder.clone(),
        max_length: cmd.max_length,
    });
    ui.is_waiting_for_input = true;
    HandlerResult::block(StatePatch::ui(ui))
}

/// 播放视频并等待播放结束
pub fn play_movie(
    command_id: &str,
    cmd: &PlayMovieCommand,
    state: &PlayerState,
    ctx: &HandlerContext,
) -> HandlerResult {
    let Some(url) = ctx.assets.resolve(&cmd.asset_id, AssetKind::Video) else {
        warn!(command_id = %command_id, asset_id = %cmd.asset_id, "视频资源不存在，跳过");
        return HandlerResult::advance();
    };

    let mut ui = state.ui_state.clone();
    ui.movie_url = Some(url);
    ui.is_waiting_for_input = true;
    HandlerResult::block(StatePatch::ui(ui))
}
