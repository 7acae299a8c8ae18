//! # Error 模块
//!
//! 宿主层错误类型。运行时错误通过 `#[from]` 包装后向上传递。

use scene_runtime::{PlayerError, ProjectError, SaveError};
use thiserror::Error;

/// 宿主层错误
#[derive(Error, Debug)]
pub enum HostError {
    #[error("IO 错误 {path}: {message}")]
    Io { path: String, message: String },

    #[error("存档不存在: {0}")]
    SaveNotFound(String),

    #[error("配置验证失败: {0}")]
    InvalidConfig(String),

    #[error("配置序列化失败: {0}")]
    ConfigSerialization(String),

    #[error(transparent)]
    Project(#[from] ProjectError),

    #[error(transparent)]
    Save(#[from] SaveError),

    #[error(transparent)]
    Player(#[from] PlayerError),
}

impl HostError {
    pub(crate) fn io(path: impl AsRef<std::path::Path>, error: std::io::Error) -> Self {
        HostError::Io {
            path: path.as_ref().display().to_string(),
            message: error.to_string(),
        }
    }
}

/// 宿主层 Result 别名
pub type HostResult<T> = Result<T, HostError>;
