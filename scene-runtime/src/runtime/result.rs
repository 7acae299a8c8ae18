//! # 处理结果
//!
//! 每个指令处理器返回一个 [`HandlerResult`]：
//!
//! - `advance`：是否立即执行下一条指令
//! - `updates`：要应用到玩家状态上的补丁
//! - `delay` + `callback`：延迟若干毫秒后执行的后续动作
//!
//! 处理器只读取状态、不直接修改；补丁由会话统一应用。

use crate::history::HistoryEvent;
use crate::state::{MusicState, OverlayKind, StageState, UiState, VariableStore};

/// 游标跳转
#[derive(Debug, Clone, PartialEq)]
pub enum Navigation {
    /// 在当前场景内跳到指定下标
    Goto(usize),
    /// 替换为另一场景（调用栈保持不变）
    JumpToScene { scene_id: String },
    /// 压栈后进入另一场景
    CallScene { scene_id: String },
    /// 弹出一层调用栈；栈空则播放结束
    Return,
}

/// 计时器到期后执行的后续动作
///
/// 每种动作执行完自身的状态修改后都会调用一次推进（`BlockForButton` 除外）。
#[derive(Debug, Clone, PartialEq)]
pub enum Continuation {
    /// 直接推进
    Advance,
    /// 等待结束；`skippable` 为真时玩家点击可提前结束
    EndWait { skippable: bool },
    /// 没有超时的等待：不登记计时器，只由玩家点击结束
    AwaitClick,
    /// 清除 `is_transitioning` 后推进
    EndTransition,
    /// 退场动画结束，移除覆盖层后推进
    RemoveOverlay { kind: OverlayKind, id: String },
    /// 退场动画结束，移除角色后推进
    RemoveCharacter { id: String },
    /// 按钮进场动画结束，进入等待点击状态（不推进）
    BlockForButton { id: String },
}

/// 状态补丁
///
/// 为 `Some` 的部分整体替换对应字段。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatePatch {
    pub stage: Option<StageState>,
    pub ui: Option<UiState>,
    pub music: Option<MusicState>,
    pub variables: Option<VariableStore>,
    pub navigation: Option<Navigation>,
    pub history: Option<HistoryEvent>,
}

impl StatePatch {
    pub fn stage(stage: StageState) -> Self {
        Self {
            stage: Some(stage),
            ..Self::default()
        }
    }

    pub fn ui(ui: UiState) -> Self {
        Self {
            ui: Some(ui),
            ..Self::default()
        }
    }

    pub fn music(music: MusicState) -> Self {
        Self {
            music: Some(music),
            ..Self::default()
        }
    }

    pub fn variables(variables: VariableStore) -> Self {
        Self {
            variables: Some(variables),
            ..Self::default()
        }
    }

    pub fn navigate(navigation: Navigation) -> Self {
        Self {
            navigation: Some(navigation),
            ..Self::default()
        }
    }

    pub fn with_ui(mut self, ui: UiState) -> Self {
        self.ui = Some(ui);
        self
    }

    pub fn with_history(mut self, event: HistoryEvent) -> Self {
        self.history = Some(event);
        self
    }
}

/// 处理器结果
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerResult {
    pub advance: bool,
    pub updates: Option<StatePatch>,
    /// 延迟（毫秒），仅在有 `callback` 时有意义
    pub delay: u64,
    pub callback: Option<Continuation>,
}

impl HandlerResult {
    /// 无状态变化，立即推进
    pub fn advance() -> Self {
        Self {
            advance: true,
            updates: None,
            delay: 0,
            callback: None,
        }
    }

    /// 应用补丁后立即推进
    pub fn advance_with(patch: StatePatch) -> Self {
        Self {
            advance: true,
            updates: Some(patch),
            delay: 0,
            callback: None,
        }
    }

    /// 应用补丁后停下，由补丁设置的阻塞闸门等待外部事件
    pub fn block(patch: StatePatch) -> Self {
        Self {
            advance: false,
            updates: Some(patch),
            delay: 0,
            callback: None,
        }
    }

    /// 应用补丁后停下，`delay` 毫秒后执行 `callback`
    pub fn defer(patch: Option<StatePatch>, delay: u64, callback: Continuation) -> Self {
        Self {
            advance: false,
            updates: patch,
            delay,
            callback: Some(callback),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        let r = HandlerResult::advance();
        assert!(r.advance);
        assert!(r.updates.is_none() && r.callback.is_none());

        let r = HandlerResult::defer(None, 600, Continuation::Advance);
        assert!(!r.advance);
        assert_eq!(r.delay, 600);
        assert_eq!(r.callback, Some(Continuation::Advance));

        let r = HandlerResult::block(StatePatch::ui(UiState::default()));
        assert!(!r.advance);
        assert!(r.callback.is_none());
    }

    #[test]
    fn test_patch_builders() {
        let patch = StatePatch::navigate(Navigation::Return)
            .with_history(HistoryEvent::dialogue(None, "x".to_string()));
        assert_eq!(patch.navigation, Some(Navigation::Return));
        assert!(patch.history.is_some());
        assert!(patch.stage.is_none());
    }
}
