//! # Transition 模块
//!
//! 覆盖层/立绘/背景共享的过渡效果定义与计时规则。
//!
//! ## 计时
//!
//! 非 instant 过渡的后续回调在 `duration * 1000 + grace` 毫秒后触发，
//! grace 由 [`PlayerConfig::transition_grace_ms`](crate::config::PlayerConfig) 提供，
//! 保证画面动画已经完全结束再推进指令。
//!
//! ## 两阶段渲染
//!
//! 新出现的元素先以过渡前姿态（[`RenderPhase::Initial`]）渲染一个调度周期，
//! 之后翻转为 [`RenderPhase::Animating`]，由渲染层在两个姿态间插值。
//! [`EntryPhases`] 负责记录每个元素处于哪个阶段。

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::geometry::Rect;

/// 过渡效果类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransitionKind {
    /// 无动画
    Instant,
    Fade,
    Dissolve,
    SlideUp,
    SlideDown,
    SlideLeft,
    SlideRight,
    Wipe,
    Iris,
}

impl TransitionKind {
    pub fn is_instant(&self) -> bool {
        matches!(self, TransitionKind::Instant)
    }
}

/// 归一化指令上的过渡字段：`instant` 等价于没有过渡
pub fn effective(kind: Option<TransitionKind>) -> Option<TransitionKind> {
    kind.filter(|k| !k.is_instant())
}

/// 过渡结束后回调的延迟（毫秒）
///
/// 负数或非有限的时长按 0 处理，过大的时长饱和到 `u64::MAX`。
pub fn continuation_delay_ms(duration_secs: f64, grace_ms: u64) -> u64 {
    let millis = if duration_secs.is_finite() && duration_secs > 0.0 {
        (duration_secs * 1000.0).round() as u64
    } else {
        0
    };
    millis.saturating_add(grace_ms)
}

/// 覆盖层/立绘的动作标记，仅用于选择进场或退场动画
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OverlayAction {
    #[default]
    Show,
    Hide,
}

/// 渲染阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPhase {
    /// 过渡前姿态（进场时为隐藏姿态，退场时为静止姿态）
    Initial,
    /// 目标姿态，渲染层向其插值
    Animating,
}

/// 元素在某一阶段的视觉姿态
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub opacity: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    /// 可见区域比例（wipe/iris 使用，1.0 为完全可见）
    pub reveal: f32,
}

impl Pose {
    /// 静止、完全可见
    pub const REST: Pose = Pose {
        opacity: 1.0,
        offset_x: 0.0,
        offset_y: 0.0,
        reveal: 1.0,
    };
}

/// 过渡效果的"隐藏端"姿态
fn hidden_pose(kind: TransitionKind, rect: &Rect) -> Pose {
    match kind {
        TransitionKind::Instant => Pose::REST,
        TransitionKind::Fade | TransitionKind::Dissolve => Pose {
            opacity: 0.0,
            ..Pose::REST
        },
        TransitionKind::SlideUp => Pose {
            opacity: 0.0,
            offset_y: rect.height,
            ..Pose::REST
        },
        TransitionKind::SlideDown => Pose {
            opacity: 0.0,
            offset_y: -rect.height,
            ..Pose::REST
        },
        TransitionKind::SlideLeft => Pose {
            opacity: 0.0,
            offset_x: rect.width,
            ..Pose::REST
        },
        TransitionKind::SlideRight => Pose {
            opacity: 0.0,
            offset_x: -rect.width,
            ..Pose::REST
        },
        TransitionKind::Wipe | TransitionKind::Iris => Pose {
            reveal: 0.0,
            ..Pose::REST
        },
    }
}

/// 计算元素在给定阶段的姿态
///
/// 进场：Initial = 隐藏端，Animating = 静止。退场反之。
pub fn pose_for(
    kind: Option<TransitionKind>,
    action: OverlayAction,
    phase: RenderPhase,
    rect: &Rect,
) -> Pose {
    let Some(kind) = effective(kind) else {
        return Pose::REST;
    };
    let hidden = hidden_pose(kind, rect);
    match (action, phase) {
        (OverlayAction::Show, RenderPhase::Initial) => hidden,
        (OverlayAction::Show, RenderPhase::Animating) => Pose::REST,
        (OverlayAction::Hide, RenderPhase::Initial) => Pose::REST,
        (OverlayAction::Hide, RenderPhase::Animating) => hidden,
    }
}

/// 两阶段渲染记录
///
/// 以 `(元素 id, 动作)` 为键：退场会重新走一遍 Initial → Animating。
#[derive(Debug, Default)]
pub struct EntryPhases {
    phases: HashMap<(String, OverlayAction), RenderPhase>,
}

impl EntryPhases {
    pub fn new() -> Self {
        Self::default()
    }

    /// 查询元素当前阶段；首次出现的元素处于 Initial
    pub fn phase(&mut self, id: &str, action: OverlayAction) -> RenderPhase {
        *self
            .phases
            .entry((id.to_string(), action))
            .or_insert(RenderPhase::Initial)
    }

    /// 一个调度周期结束：所有 Initial 翻转为 Animating
    pub fn tick(&mut self) {
        for phase in self.phases.values_mut() {
            *phase = RenderPhase::Animating;
        }
    }

    /// 丢弃已不在舞台上的元素
    pub fn retain_live<'a>(&mut self, live_ids: impl IntoIterator<Item = &'a str>) {
        let live: std::collections::HashSet<&str> = live_ids.into_iter().collect();
        self.phases.retain(|(id, _), _| live.contains(id.as_str()));
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }
}
