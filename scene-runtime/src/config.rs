//! # Config 模块
//!
//! 播放器核心的可调参数。宿主负责从配置文件读取并传入。

use serde::{Deserialize, Serialize};

use crate::history::DEFAULT_MAX_EVENTS;

/// 播放器配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// 过渡动画结束后的额外等待（毫秒）
    ///
    /// 所有过渡回调的延迟为 `duration * 1000 + transition_grace_ms`。
    #[serde(default = "default_transition_grace_ms")]
    pub transition_grace_ms: u64,

    /// 历史记录上限
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_transition_grace_ms() -> u64 {
    100
}

fn default_history_limit() -> usize {
    DEFAULT_MAX_EVENTS
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            transition_grace_ms: default_transition_grace_ms(),
            history_limit: default_history_limit(),
        }
    }
}
