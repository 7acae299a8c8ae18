//! # Config 模块
//!
//! 无头播放器的配置。
//!
//! ## 配置优先级
//!
//! 1. 命令行参数（最高）
//! 2. 配置文件 (config.json)
//! 3. 默认值（最低）

use std::fs;
use std::path::{Path, PathBuf};

use scene_runtime::PlayerConfig;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{HostError, HostResult};

/// 应用配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// 工程文件（project.json）路径
    #[serde(default = "default_project_path")]
    pub project_path: PathBuf,

    /// 存档目录
    #[serde(default = "default_saves_dir")]
    pub saves_dir: PathBuf,

    /// 起始场景；未配置时使用工程的起始场景
    #[serde(default)]
    pub start_scene: Option<String>,

    /// 日志级别（trace/debug/info/warn/error）
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// 按真实时间推进虚拟时钟
    #[serde(default)]
    pub realtime: bool,

    /// 单次运行最多处理的调度步数
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,

    /// 预先写好的玩家回答
    #[serde(default)]
    pub answers: AnswerScript,

    /// 播放器核心参数
    #[serde(default)]
    pub player: PlayerConfig,
}

/// 预先写好的玩家回答，按出现顺序消费
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnswerScript {
    /// 选择的选项下标（展示列表中的位置）
    #[serde(default)]
    pub choices: Vec<usize>,

    /// 文本输入内容
    #[serde(default)]
    pub text_inputs: Vec<String>,
}

/// 命令行提供的覆盖项，`None` 表示沿用配置文件
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub project_path: Option<PathBuf>,
    pub saves_dir: Option<PathBuf>,
    pub start_scene: Option<String>,
    pub log_level: Option<String>,
    pub realtime: bool,
    pub max_steps: Option<usize>,
}

// 默认值函数
fn default_project_path() -> PathBuf {
    PathBuf::from("project.json")
}

fn default_saves_dir() -> PathBuf {
    PathBuf::from("saves")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_steps() -> usize {
    10_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            project_path: default_project_path(),
            saves_dir: default_saves_dir(),
            start_scene: None,
            log_level: default_log_level(),
            realtime: false,
            max_steps: default_max_steps(),
            answers: AnswerScript::default(),
            player: PlayerConfig::default(),
        }
    }
}

impl AppConfig {
    /// 加载配置文件
    ///
    /// 如果文件不存在或解析失败，返回默认配置并记录警告。
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            warn!(path = %path.display(), "配置文件不存在，使用默认配置");
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => {
                    info!(path = %path.display(), "配置文件加载成功");
                    config
                }
                Err(e) => {
                    warn!(error = %e, "配置文件解析失败，使用默认配置");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(error = %e, "配置文件读取失败，使用默认配置");
                Self::default()
            }
        }
    }

    /// 保存配置到文件
    pub fn save(&self, path: impl AsRef<Path>) -> HostResult<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| HostError::ConfigSerialization(e.to_string()))?;
        fs::write(path, json).map_err(|e| HostError::io(path, e))
    }

    /// 用命令行参数覆盖配置
    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(project_path) = overrides.project_path {
            self.project_path = project_path;
        }
        if let Some(saves_dir) = overrides.saves_dir {
            self.saves_dir = saves_dir;
        }
        if let Some(start_scene) = overrides.start_scene {
            self.start_scene = Some(start_scene);
        }
        if let Some(log_level) = overrides.log_level {
            self.log_level = log_level;
        }
        if overrides.realtime {
            self.realtime = true;
        }
        if let Some(max_steps) = overrides.max_steps {
            self.max_steps = max_steps;
        }
    }

    /// 验证配置有效性
    pub fn validate(&self) -> HostResult<()> {
        if !self.project_path.exists() {
            return Err(HostError::InvalidConfig(format!(
                "工程文件不存在: {}",
                self.project_path.display()
            )));
        }

        if self.max_steps == 0 {
            return Err(HostError::InvalidConfig(
                "max_steps 必须大于 0".to_string(),
            ));
        }

        if self.log_level.parse::<tracing::Level>().is_err() {
            return Err(HostError::InvalidConfig(format!(
                "无效的日志级别: {}",
                self.log_level
            )));
        }

        Ok(())
    }
}
