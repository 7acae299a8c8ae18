//! # Error 模块
//!
//! 定义 scene-runtime 中使用的错误类型。
//!
//! 指令处理器本身不返回错误（缺失资源、未知指令等一律降级为带警告的空操作），
//! 这里的错误只出现在宿主主动调用的 API 上。

use thiserror::Error;

/// 播放器错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlayerError {
    /// 场景未找到
    #[error("场景 '{scene_id}' 未找到")]
    SceneNotFound { scene_id: String },

    /// UI 界面未找到
    #[error("UI 界面 '{screen_id}' 未找到")]
    ScreenNotFound { screen_id: String },

    /// 当前没有运行中的会话
    #[error("当前没有运行中的会话")]
    NoSession,

    /// 无效的选择索引
    #[error("无效的选择索引 {index}，有效范围是 0..{max}")]
    InvalidChoiceIndex { index: usize, max: usize },

    /// 当前状态不接受此输入
    #[error("当前状态不接受此输入：{expected}")]
    NotAwaiting { expected: &'static str },

    /// 存档错误
    #[error("存档错误: {0}")]
    Save(#[from] SaveError),
}

/// 工程数据错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProjectError {
    /// 工程 JSON 无法解析
    #[error("工程文件解析失败: {0}")]
    Parse(String),

    /// 场景 id 重复
    #[error("场景 id '{0}' 重复")]
    DuplicateScene(String),
}

/// 存档错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SaveError {
    /// 序列化失败
    #[error("序列化失败: {0}")]
    SerializationFailed(String),

    /// 反序列化失败
    #[error("反序列化失败: {0}")]
    DeserializationFailed(String),

    /// 存档引用的场景不在当前工程中
    #[error("存档引用的场景 '{0}' 不存在")]
    UnknownScene(String),
}

/// 音效播放错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SoundError {
    /// 音效 id 无效
    #[error("无效的音效 '{0}'")]
    InvalidSound(String),

    /// 音频后端不可用
    #[error("音频后端不可用: {0}")]
    Backend(String),
}

/// Result 类型别名
pub type PlayerResult<T> = Result<T, PlayerError>;
