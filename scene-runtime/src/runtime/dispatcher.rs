//! # Dispatcher 模块
//!
//! 把一条指令路由到对应的处理器。

use tracing::{debug, warn};

use crate::command::{Command, CommandKind};
use crate::runtime::handlers::{HandlerContext, audio, dialogue, flow, overlay, stage};
use crate::runtime::result::HandlerResult;
use crate::state::{OverlayKind, PlayerState};

/// 执行单条指令
///
/// 调用前 `state.current_index` 必须已经越过该指令。
pub fn dispatch(command: &Command, state: &PlayerState, ctx: &HandlerContext) -> HandlerResult {
    let id = command.id.as_str();
    debug!(command_id = %id, kind = command.kind.name(), index = state.current_index.saturating_sub(1), "执行指令");

    match &command.kind {
        CommandKind::Dialogue(cmd) => dialogue::dialogue(id, cmd, state, ctx),
        CommandKind::Choice(cmd) => dialogue::choice(id, cmd, state, ctx),
        CommandKind::TextInput(cmd) => dialogue::text_input(id, cmd, state, ctx),
        CommandKind::PlayMovie(cmd) => dialogue::play_movie(id, cmd, state, ctx),

        CommandKind::Wait(cmd) => flow::wait(cmd),
        CommandKind::SetVariable(cmd) => flow::set_variable(id, cmd, state, ctx),

        CommandKind::SetBackground(cmd) => stage::set_background(id, cmd, state, ctx),
        CommandKind::ShowCharacter(cmd) => stage::show_character(id, cmd, state, ctx),
        CommandKind::HideCharacter(cmd) => stage::hide_character(cmd, state, ctx),
        CommandKind::Flash(cmd) => stage::flash(cmd, state),
        CommandKind::ShakeScreen(cmd) => stage::shake_screen(cmd, state),

        CommandKind::PlayMusic(cmd) => audio::play_music(id, cmd, state, ctx),
        CommandKind::StopMusic => audio::stop_music(state),
        CommandKind::PlaySound(cmd) => audio::play_sound(id, cmd, ctx),

        CommandKind::ShowText(cmd) => overlay::show_text(id, cmd, state, ctx),
        CommandKind::HideText(cmd) => overlay::hide_overlay(OverlayKind::Text, cmd, state, ctx),
        CommandKind::ShowImage(cmd) => overlay::show_image(id, cmd, state, ctx),
        CommandKind::HideImage(cmd) => overlay::hide_overlay(OverlayKind::Image, cmd, state, ctx),
        CommandKind::ShowButton(cmd) => overlay::show_button(id, cmd, state, ctx),
        CommandKind::HideButton(cmd) => overlay::hide_overlay(OverlayKind::Button, cmd, state, ctx),

        CommandKind::JumpToScene(cmd) => flow::jump_to_scene(cmd),
        CommandKind::CallScene(cmd) => flow::call_scene(cmd),
        CommandKind::Return => flow::return_from_scene(),
        CommandKind::JumpToLabel(cmd) => flow::jump_to_label(id, cmd, state),
        CommandKind::BranchStart(cmd) => flow::branch_start(id, cmd, state, ctx),
        // 标签与分支结束只是标记
        CommandKind::Label(_) | CommandKind::BranchEnd => HandlerResult::advance(),

        CommandKind::Unknown => {
            warn!(command_id = %id, "未知指令类型，跳过");
            HandlerResult::advance()
        }
    }
}
