//! # Sound 模块
//!
//! 无头环境下的音效播放器：不发声，只记录日志。

use scene_runtime::{SoundError, SoundPlayer};
use tracing::info;

/// 把音效请求写入日志的播放器
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingSoundPlayer;

impl SoundPlayer for LoggingSoundPlayer {
    fn play(&self, sound_id: Option<&str>) -> Result<(), SoundError> {
        match sound_id {
            Some("") => Err(SoundError::InvalidSound(String::new())),
            Some(id) => {
                info!(sound_id = %id, "播放音效");
                Ok(())
            }
            None => Ok(()),
        }
    }
}
