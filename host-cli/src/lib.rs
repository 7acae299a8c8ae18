//! # Host CLI
//!
//! 场景播放器的无头宿主层。
//!
//! ## 架构说明
//!
//! Host 层负责：
//! - 读取配置与工程文件
//! - 日志输出
//! - 代替玩家回应对话、选项、输入等阻塞提示
//! - 推动虚拟时钟（或按真实时间等待）
//! - 存档槽位的读写
//!
//! Host 层不包含指令逻辑，只驱动 `scene-runtime` 的 [`GameSession`](scene_runtime::GameSession)。

pub mod config;
pub mod driver;
pub mod error;
pub mod save_manager;
pub mod sound;

pub use config::{AnswerScript, AppConfig, ConfigOverrides};
pub use driver::{HeadlessDriver, RunSummary, Step};
pub use error::{HostError, HostResult};
pub use save_manager::{SaveInfo, SaveManager};
pub use sound::LoggingSoundPlayer;
