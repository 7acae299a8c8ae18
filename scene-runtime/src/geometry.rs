//! # Geometry 模块
//!
//! 覆盖层与立绘的几何信息。坐标以舞台左上角为原点，单位与编辑器一致（像素）。

use serde::{Deserialize, Serialize};

/// 舞台上的矩形区域
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// 点是否落在矩形内（含左上边界，不含右下边界）
    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px < self.x + self.width && py >= self.y && py < self.y + self.height
    }

    /// 矩形中心点
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// 平移后的矩形
    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }
}

/// 立绘站位
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum StagePosition {
    Left,
    #[default]
    Center,
    Right,
    /// 自定义水平位置（舞台宽度的比例，0.0 - 1.0）
    Custom { x: f32 },
}

impl StagePosition {
    /// 站位对应的水平锚点（舞台宽度比例）
    pub fn anchor_x(&self) -> f32 {
        match self {
            StagePosition::Left => 0.25,
            StagePosition::Center => 0.5,
            StagePosition::Right => 0.75,
            StagePosition::Custom { x } => x.clamp(0.0, 1.0),
        }
    }
}
