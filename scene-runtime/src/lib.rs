//! # Scene Runtime
//!
//! 场景式视觉小说播放器的核心运行时库。
//!
//! ## 架构概述
//!
//! `scene-runtime` 不做任何 IO 与渲染。工程数据（场景、变量、角色、资源）由宿主
//! 解析后交给 [`GameSession`]，会话逐条执行场景中的指令，把结果写进
//! [`PlayerState`]，宿主读取状态进行展示，并把玩家输入转交回会话：
//!
//! ```text
//! Host                               Runtime
//!   │                                   │
//!   │── start / click / select_choice ─►│ advance()
//!   │── advance_clock(ms) ─────────────►│ 触发计时器
//!   │◄── state() / status() ────────────│
//!   │                                   │
//! ```
//!
//! 时间是虚拟的毫秒时钟，完全由宿主推动，同样的输入序列总会得到同样的结果。
//!
//! ## 核心类型
//!
//! - [`Project`]：只读的工程数据
//! - [`Command`]：场景中的一条指令
//! - [`GameSession`]：推进循环、计时器与阻塞解除事件
//! - [`PlayerState`]：可观察的玩家状态
//! - [`GameStateSave`]：存档
//!
//! ## 使用示例
//!
//! ```ignore
//! use scene_runtime::{GameSession, PlayerConfig, PlayerStatus, Project};
//!
//! let project = Project::from_json(&json)?;
//! let mut session = GameSession::new(project, PlayerConfig::default());
//! session.start("opening")?;
//!
//! loop {
//!     match session.status() {
//!         PlayerStatus::Blocked => {
//!             // 展示对话 / 选项 / 输入框，收集输入后调用对应事件
//!             session.click()?;
//!         }
//!         PlayerStatus::Running => session.advance_clock(16),
//!         PlayerStatus::Finished | PlayerStatus::Idle => break,
//!     }
//! }
//! ```
//!
//! ## 模块结构
//!
//! - [`command`]：指令定义
//! - [`project`]：工程数据与宿主协作接口
//! - [`state`]：玩家状态
//! - [`logic`]：条件求值与文本插值
//! - [`transition`]：过渡效果与进场/退场姿态
//! - [`runtime`]：调度核心
//! - [`save`]：存档
//! - [`history`]：历史记录
//! - [`config`]：播放器参数
//! - [`error`]：错误类型定义

pub mod command;
pub mod config;
pub mod error;
pub mod geometry;
pub mod history;
pub mod logic;
pub mod project;
pub mod runtime;
pub mod save;
pub mod state;
pub mod transition;

// 重导出核心类型
pub use command::{ButtonAction, ChoiceOption, ChoiceTarget, Command, CommandKind};
pub use config::PlayerConfig;
pub use error::{PlayerError, PlayerResult, ProjectError, SaveError, SoundError};
pub use geometry::{Rect, StagePosition};
pub use history::{History, HistoryEvent};
pub use logic::{Condition, ConditionOperator, evaluate_conditions, interpolate_variables};
pub use project::{
    AssetKind, AssetMetadata, AssetResolver, Project, Scene, SilentSoundPlayer, SoundPlayer,
};
pub use runtime::{GameSession, HandlerResult, StatePatch};
pub use save::{GameStateSave, PlayerStateData};
pub use state::{
    OverlayKind, PlayerMode, PlayerState, PlayerStatus, StageState, UiState, VarValue,
    VariableStore,
};
pub use transition::{EntryPhases, OverlayAction, RenderPhase, TransitionKind};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_api_accessible() {
        // 验证所有公共类型都可以正常使用
        let _cmd = Command::new("c1", CommandKind::StopMusic);

        let _state = PlayerState::new("main", Vec::new());

        let _status = PlayerStatus::Idle;

        let session = GameSession::new(Project::default(), PlayerConfig::default());
        assert!(session.state().is_none());
    }
}
