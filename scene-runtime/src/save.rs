//! # Save 模块
//!
//! 存档数据模型。
//!
//! ## 设计原则
//!
//! - 只保存可恢复的持久状态：场景游标、调用栈、变量、舞台、音乐
//! - `ui_state` 与 `history` 属于临时状态，不进存档
//! - 在对话/选择/输入/视频/按钮等待处存档时，游标回退一步，
//!   读档后重新执行该指令，玩家会再次看到同一个提示

use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::error::SaveError;
use crate::state::{
    CommandFrame, MusicState, PlayerMode, PlayerState, StageState, UiState, VariableStore,
};

/// 存档中的玩家状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStateData {
    pub current_scene_id: String,
    pub current_commands: Vec<Command>,
    pub current_index: usize,
    #[serde(default)]
    pub command_stack: Vec<CommandFrame>,
    #[serde(default)]
    pub variables: VariableStore,
    #[serde(default)]
    pub stage_state: StageState,
    #[serde(default)]
    pub music_state: MusicState,
}

impl PlayerStateData {
    /// 从运行中的状态截取持久部分
    pub fn capture(state: &PlayerState) -> Self {
        let current_index = if awaiting_prompt(&state.ui_state) {
            state.current_index.saturating_sub(1)
        } else {
            state.current_index
        };

        Self {
            current_scene_id: state.current_scene_id.clone(),
            current_commands: state.current_commands.clone(),
            current_index,
            command_stack: state.command_stack.clone(),
            variables: state.variables.clone(),
            stage_state: state.stage_state.clone(),
            music_state: state.music_state.clone(),
        }
    }

    /// 还原为新的玩家状态（临时状态全部重置）
    pub fn restore(self) -> PlayerState {
        let mut state = PlayerState::new(self.current_scene_id, self.current_commands);
        state.mode = PlayerMode::Playing;
        state.current_index = self.current_index;
        state.command_stack = self.command_stack;
        state.variables = self.variables;
        state.stage_state = self.stage_state;
        state.music_state = self.music_state;
        state
    }
}

/// 当前是否停在需要玩家响应的指令上
fn awaiting_prompt(ui: &UiState) -> bool {
    ui.dialogue.is_some()
        || ui.choices.is_some()
        || ui.text_input.is_some()
        || ui.movie_url.is_some()
        || ui.waiting_button_id.is_some()
}

/// 存档
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateSave {
    /// 保存时间（Unix 毫秒）
    pub timestamp: u64,
    /// 存档时的场景名（用于 UI 显示）
    pub scene_name: String,
    pub player_state_data: PlayerStateData,
}

impl GameStateSave {
    pub fn new(scene_name: impl Into<String>, player_state_data: PlayerStateData) -> Self {
        Self {
            timestamp: current_timestamp_ms(),
            scene_name: scene_name.into(),
            player_state_data,
        }
    }

    /// 序列化为 JSON 字符串
    pub fn to_json(&self) -> Result<String, SaveError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SaveError::SerializationFailed(e.to_string()))
    }

    /// 从 JSON 字符串反序列化
    pub fn from_json(json: &str) -> Result<Self, SaveError> {
        serde_json::from_str(json).map_err(|e| SaveError::DeserializationFailed(e.to_string()))
    }
}

fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandKind, DialogueCommand};
    use crate::state::{DialogueLine, VarValue};

    fn dialogue(id: &str, text: &str) -> Command {
        Command::new(
            id,
            CommandKind::Dialogue(DialogueCommand {
                character_id: None,
                text: text.to_string(),
            }),
        )
    }

    #[test]
    fn test_save_round_trip() {
        let mut state = PlayerState::new("s1", vec![dialogue("d1", "Hi")]);
        state.current_index = 1;
        state.set_var("gold", VarValue::Number(5.0));
        state.music_state.current_music_id = Some("bgm".to_string());

        let save = GameStateSave::new("Opening", PlayerStateData::capture(&state));
        let json = save.to_json().unwrap();
        assert!(json.contains("\"playerStateData\""));
        assert!(json.contains("\"currentSceneId\": \"s1\""));
        assert!(json.contains("\"sceneName\": \"Opening\""));

        let loaded = GameStateSave::from_json(&json).unwrap();
        assert_eq!(loaded, save);

        let restored = loaded.player_state_data.restore();
        assert_eq!(restored.current_index, 1);
        assert_eq!(restored.get_var("gold"), Some(&VarValue::Number(5.0)));
        assert_eq!(restored.ui_state, UiState::default());
        assert!(restored.history.is_empty());
    }

    #[test]
    fn test_save_while_awaiting_steps_back() {
        let mut state = PlayerState::new("s1", vec![dialogue("d1", "Hi"), dialogue("d2", "Bye")]);
        state.current_index = 1;
        state.ui_state.dialogue = Some(DialogueLine {
            command_id: "d1".to_string(),
            speaker: None,
            character_id: None,
            text: "Hi".to_string(),
        });
        state.ui_state.is_waiting_for_input = true;

        let data = PlayerStateData::capture(&state);
        assert_eq!(data.current_index, 0);
    }

    #[test]
    fn test_ui_state_not_persisted() {
        let mut state = PlayerState::new("s1", Vec::new());
        state.ui_state.show_history = true;
        let json = GameStateSave::new("x", PlayerStateData::capture(&state))
            .to_json()
            .unwrap();
        assert!(!json.contains("uiState"));
        assert!(!json.contains("history"));
    }

    #[test]
    fn test_invalid_json() {
        let result = GameStateSave::from_json("{ not json");
        assert!(matches!(result, Err(SaveError::DeserializationFailed(_))));
    }
}
