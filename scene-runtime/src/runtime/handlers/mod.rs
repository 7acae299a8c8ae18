//! # Handlers 模块
//!
//! 每类指令一个处理函数：读取指令与当前状态，返回 [`HandlerResult`]。
//!
//! 处理器从不返回错误。资源缺失、目标不存在等情况记录警告后按空操作推进。
//!
//! 调用处理器时 `state.current_index` 已经指向下一条指令。

pub mod audio;
pub mod dialogue;
pub mod flow;
pub mod overlay;
pub mod stage;

use crate::config::PlayerConfig;
use crate::logic::interpolate_variables;
use crate::project::{AssetResolver, Project, SoundPlayer};
use crate::state::PlayerState;
use crate::transition;

/// 处理器可用的协作者
pub struct HandlerContext<'a> {
    pub project: &'a Project,
    pub assets: &'a dyn AssetResolver,
    pub sound: &'a dyn SoundPlayer,
    pub config: &'a PlayerConfig,
}

impl HandlerContext<'_> {
    /// 按当前变量插值文本
    pub fn interpolate(&self, text: &str, state: &PlayerState) -> String {
        interpolate_variables(text, &state.variables, self.project)
    }

    /// 过渡回调延迟
    pub fn transition_delay(&self, duration_secs: f64) -> u64 {
        transition::continuation_delay_ms(duration_secs, self.config.transition_grace_ms)
    }

    /// 播放音效，失败只记录警告
    pub fn play_sound(&self, sound_id: Option<&str>) {
        if let Err(e) = self.sound.play(sound_id) {
            tracing::warn!(sound_id = ?sound_id, error = %e, "音效播放失败");
        }
    }
}
