//! # History 模块
//!
//! 回看（backlog）用的历史记录。
//!
//! ## 设计原则
//!
//! - 只追加，按发生顺序排列
//! - 只记录对话、选择、文本输入这类玩家可回看的事件
//! - 不进存档（属于一次运行的临时状态）

use serde::{Deserialize, Serialize};

/// 默认最大记录数
pub const DEFAULT_MAX_EVENTS: usize = 1000;

/// 历史事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HistoryEvent {
    /// 对话事件
    Dialogue {
        /// 说话者（None 表示旁白）
        speaker: Option<String>,
        /// 插值后的对话内容
        text: String,
        /// 时间戳（Unix 秒）
        timestamp: u64,
    },

    /// 选择事件
    ChoiceMade {
        /// 展示给玩家的全部选项
        options: Vec<String>,
        /// 选择的索引（展示列表中的位置）
        selected_index: usize,
        timestamp: u64,
    },

    /// 文本输入事件
    TextInput {
        prompt: String,
        value: String,
        timestamp: u64,
    },
}

impl HistoryEvent {
    /// 获取事件时间戳
    pub fn timestamp(&self) -> u64 {
        match self {
            HistoryEvent::Dialogue { timestamp, .. } => *timestamp,
            HistoryEvent::ChoiceMade { timestamp, .. } => *timestamp,
            HistoryEvent::TextInput { timestamp, .. } => *timestamp,
        }
    }

    /// 创建对话事件
    pub fn dialogue(speaker: Option<String>, text: String) -> Self {
        HistoryEvent::Dialogue {
            speaker,
            text,
            timestamp: current_timestamp(),
        }
    }

    /// 创建选择事件
    pub fn choice_made(options: Vec<String>, selected_index: usize) -> Self {
        HistoryEvent::ChoiceMade {
            options,
            selected_index,
            timestamp: current_timestamp(),
        }
    }

    /// 创建文本输入事件
    pub fn text_input(prompt: String, value: String) -> Self {
        HistoryEvent::TextInput {
            prompt,
            value,
            timestamp: current_timestamp(),
        }
    }
}

/// 历史记录容器
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct History {
    /// 事件列表（按时间顺序）
    events: Vec<HistoryEvent>,
    /// 最大记录数（防止内存无限增长）
    max_events: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            max_events: DEFAULT_MAX_EVENTS,
        }
    }

    /// 设置最大记录数
    pub fn with_max_events(mut self, max: usize) -> Self {
        self.max_events = max;
        self
    }

    /// 添加事件，超出上限时丢弃最早的事件
    pub fn push(&mut self, event: HistoryEvent) {
        self.events.push(event);
        if self.events.len() > self.max_events {
            let overflow = self.events.len() - self.max_events;
            self.events.drain(..overflow);
        }
    }

    pub fn events(&self) -> &[HistoryEvent] {
        &self.events
    }

    /// 对话事件数量
    pub fn dialogue_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, HistoryEvent::Dialogue { .. }))
            .count()
    }

    /// 所有对话文本（按顺序）
    pub fn dialogue_texts(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                HistoryEvent::Dialogue { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// 获取当前时间戳（Unix 秒）
fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
