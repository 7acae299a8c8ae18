//! # 音频处理器
//!
//! 背景音乐只修改 `music_state`，实际播放由宿主根据状态完成。
//! 音效通过 [`SoundPlayer`](crate::project::SoundPlayer) 立即播放，失败只记录警告。

use tracing::warn;

use crate::command::{PlayMusicCommand, PlaySoundCommand};
use crate::project::AssetKind;
use crate::runtime::handlers::HandlerContext;
use crate::runtime::result::{HandlerResult, StatePatch};
use crate::state::{MusicState, PlayerState};

pub fn play_music(
    command_id: &str,
    cmd: &PlayMusicCommand,
    state: &PlayerState,
    ctx: &HandlerContext,
) -> HandlerResult {
    if ctx.assets.resolve(&cmd.asset_id, AssetKind::Audio).is_none() {
        warn!(command_id = %command_id, asset_id = %cmd.asset_id, "音乐资源不存在，跳过");
        return HandlerResult::advance();
    }

    // 同一首曲目继续播放，不重置播放头
    let same_track = state.music_state.is_playing
        && state.music_state.current_music_id.as_deref() == Some(cmd.asset_id.as_str());
    let position = if same_track {
        state.music_state.position
    } else {
        0.0
    };

    HandlerResult::advance_with(StatePatch::music(MusicState {
        current_music_id: Some(cmd.asset_id.clone()),
        looping: cmd.looping,
        position,
        is_playing: true,
    }))
}

pub fn stop_music(state: &PlayerState) -> HandlerResult {
    if !state.music_state.is_playing && state.music_state.current_music_id.is_none() {
        return HandlerResult::advance();
    }
    HandlerResult::advance_with(StatePatch::music(MusicState::default()))
}

pub fn play_sound(command_id: &str, cmd: &PlaySoundCommand, ctx: &HandlerContext) -> HandlerResult {
    if ctx.assets.resolve(&cmd.asset_id, AssetKind::Audio).is_none() {
        warn!(command_id = %command_id, asset_id = %cmd.asset_id, "音效资源不存在，跳过");
        return HandlerResult::advance();
    }
    ctx.play_sound(Some(&cmd.asset_id));
    HandlerResult::advance()
}
