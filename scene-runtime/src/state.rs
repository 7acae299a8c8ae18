//! # State 模块
//!
//! 定义一次游玩过程的全部状态。
//!
//! ## 设计原则
//!
//! - [`PlayerState`] 是**唯一可变状态**，只有调度器和它派发出的回调会修改它
//! - 除 `ui_state` / `history` 外的字段都可序列化进存档
//! - 不允许隐式全局状态

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::command::{ButtonAction, Command, TextStyle};
use crate::geometry::{Rect, StagePosition};
use crate::history::History;
use crate::transition::{OverlayAction, TransitionKind};

/// 变量值
///
/// JSON 中直接对应字符串、数字、布尔值。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VarValue {
    Bool(bool),
    Number(f64),
    String(String),
}

impl VarValue {
    /// 数值视图：数字直接返回，可解析的字符串按数字处理
    pub fn as_number(&self) -> Option<f64> {
        match self {
            VarValue::Number(n) => Some(*n),
            VarValue::String(s) => s.trim().parse().ok(),
            VarValue::Bool(_) => None,
        }
    }

    /// 真值判断（用于 toggle）
    pub fn is_truthy(&self) -> bool {
        match self {
            VarValue::Bool(b) => *b,
            VarValue::Number(n) => *n != 0.0,
            VarValue::String(s) => !s.is_empty(),
        }
    }
}

impl fmt::Display for VarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarValue::Bool(b) => write!(f, "{}", b),
            // 整数不带小数部分
            VarValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            VarValue::Number(n) => write!(f, "{}", n),
            VarValue::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for VarValue {
    fn from(s: &str) -> Self {
        VarValue::String(s.to_string())
    }
}

impl From<String> for VarValue {
    fn from(s: String) -> Self {
        VarValue::String(s)
    }
}

impl From<f64> for VarValue {
    fn from(n: f64) -> Self {
        VarValue::Number(n)
    }
}

impl From<i32> for VarValue {
    fn from(n: i32) -> Self {
        VarValue::Number(n as f64)
    }
}

impl From<bool> for VarValue {
    fn from(b: bool) -> Self {
        VarValue::Bool(b)
    }
}

/// 变量表：变量 id -> 值
pub type VariableStore = HashMap<String, VarValue>;

/// 播放器模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlayerMode {
    /// 处于 UI 界面（标题、菜单等）
    Menu,
    #[default]
    Playing,
    Paused,
}

/// 调度器的派生状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerStatus {
    /// 尚未开始（没有会话）
    Idle,
    /// 可以继续执行指令（可能在等待自带回调的计时器）
    Running,
    /// 被对话/选择/输入/视频/过渡阻塞
    Blocked,
    /// 指令序列与调用栈都已耗尽
    Finished,
}

/// 调用栈帧：被挂起的场景游标
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandFrame {
    pub scene_id: String,
    pub commands: Vec<Command>,
    /// 返回后要执行的下一条指令
    pub index: usize,
}

/// 背景
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundState {
    pub asset_id: String,
    pub url: String,
    /// 视频背景
    #[serde(default)]
    pub is_video: bool,
    #[serde(rename = "loop", default)]
    pub looping: bool,
    #[serde(default)]
    pub transition: Option<TransitionKind>,
    #[serde(default)]
    pub duration: f64,
}

/// 舞台上的角色
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterPresentation {
    pub character_id: String,
    pub sprite_url: String,
    pub position: StagePosition,
    #[serde(default)]
    pub transition: Option<TransitionKind>,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub action: OverlayAction,
}

/// 文字覆盖层
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextOverlay {
    /// 创建它的指令 id
    pub id: String,
    /// 插值后的文本
    pub text: String,
    pub rect: Rect,
    pub style: TextStyle,
    #[serde(default)]
    pub transition: Option<TransitionKind>,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub action: OverlayAction,
}

/// 图片覆盖层
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageOverlay {
    pub id: String,
    pub asset_id: String,
    pub url: String,
    pub rect: Rect,
    pub opacity: f32,
    pub rotation: f32,
    #[serde(default)]
    pub transition: Option<TransitionKind>,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub action: OverlayAction,
}

/// 按钮覆盖层
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonOverlay {
    pub id: String,
    pub text: String,
    pub rect: Rect,
    pub style: TextStyle,
    #[serde(default)]
    pub image_url: Option<String>,
    pub actions: Vec<ButtonAction>,
    pub wait_for_click: bool,
    #[serde(default)]
    pub click_sound_id: Option<String>,
    #[serde(default)]
    pub transition: Option<TransitionKind>,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub action: OverlayAction,
}

/// 覆盖层类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayKind {
    Text,
    Image,
    Button,
}

/// 屏幕效果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenEffect {
    pub intensity: f32,
    pub duration: f64,
}

/// 舞台状态：当前可见的一切
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageState {
    #[serde(default)]
    pub background: Option<BackgroundState>,
    #[serde(default)]
    pub characters: BTreeMap<String, CharacterPresentation>,
    #[serde(default)]
    pub text_overlays: Vec<TextOverlay>,
    #[serde(default)]
    pub image_overlays: Vec<ImageOverlay>,
    #[serde(default)]
    pub button_overlays: Vec<ButtonOverlay>,
    #[serde(default)]
    pub screen_effect: Option<ScreenEffect>,
}

impl StageState {
    /// 是否存在指定 id 的覆盖层
    pub fn has_overlay(&self, kind: OverlayKind, id: &str) -> bool {
        match kind {
            OverlayKind::Text => self.text_overlays.iter().any(|o| o.id == id),
            OverlayKind::Image => self.image_overlays.iter().any(|o| o.id == id),
            OverlayKind::Button => self.button_overlays.iter().any(|o| o.id == id),
        }
    }

    /// 移除指定 id 的覆盖层，返回是否确有移除
    pub fn remove_overlay(&mut self, kind: OverlayKind, id: &str) -> bool {
        fn remove_by_id<T>(list: &mut Vec<T>, id: &str, get: impl Fn(&T) -> &str) -> bool {
            let before = list.len();
            list.retain(|o| get(o) != id);
            list.len() != before
        }
        match kind {
            OverlayKind::Text => remove_by_id(&mut self.text_overlays, id, |o| &o.id),
            OverlayKind::Image => remove_by_id(&mut self.image_overlays, id, |o| &o.id),
            OverlayKind::Button => remove_by_id(&mut self.button_overlays, id, |o| &o.id),
        }
    }

    /// 清掉所有停留在退场动画中的元素
    ///
    /// 进入新场景时调用：对应的移除计时器已被取消，不会再有人移除它们。
    pub fn finalize_exits(&mut self) {
        self.text_overlays.retain(|o| o.action == OverlayAction::Show);
        self.image_overlays.retain(|o| o.action == OverlayAction::Show);
        self.button_overlays.retain(|o| o.action == OverlayAction::Show);
        self.characters
            .retain(|_, c| c.action == OverlayAction::Show);
    }

    pub fn button(&self, id: &str) -> Option<&ButtonOverlay> {
        self.button_overlays.iter().find(|b| b.id == id)
    }
}

/// 音乐状态
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MusicState {
    #[serde(default)]
    pub current_music_id: Option<String>,
    #[serde(default)]
    pub looping: bool,
    /// 播放头位置（秒）
    #[serde(default)]
    pub position: f64,
    #[serde(default)]
    pub is_playing: bool,
}

/// 当前对话
#[derive(Debug, Clone, PartialEq)]
pub struct DialogueLine {
    pub command_id: String,
    /// 说话者显示名（None 为旁白）
    pub speaker: Option<String>,
    pub character_id: Option<String>,
    /// 插值后的文本
    pub text: String,
}

/// 展示给玩家的选项
#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceView {
    /// 在指令原始选项列表中的下标
    pub option_index: usize,
    pub text: String,
}

/// 当前选择
#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceSet {
    pub command_id: String,
    pub prompt: Option<String>,
    pub options: Vec<ChoiceView>,
}

/// 文本输入请求
#[derive(Debug, Clone, PartialEq)]
pub struct TextInputRequest {
    pub command_id: String,
    pub variable_id: String,
    pub prompt: String,
    pub placeholder: Option<String>,
    pub max_length: Option<usize>,
}

/// 待播放的闪屏
#[derive(Debug, Clone, PartialEq)]
pub struct FlashEffect {
    pub color: String,
    pub duration: f64,
}

/// 交互相关的临时状态（不进存档）
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UiState {
    pub dialogue: Option<DialogueLine>,
    pub choices: Option<ChoiceSet>,
    pub text_input: Option<TextInputRequest>,
    pub movie_url: Option<String>,
    /// 阻塞标记：只允许对话/选择/视频/文本输入/按钮等待设置
    pub is_waiting_for_input: bool,
    pub is_transitioning: bool,
    pub pending_flash: Option<FlashEffect>,
    pub show_history: bool,
    /// 打开 UI 界面时所在的场景
    pub screen_return_scene_id: Option<String>,
    pub active_screen: Option<String>,
    /// 当前持有阻塞标记的按钮
    pub waiting_button_id: Option<String>,
}

impl UiState {
    /// 调度器的唯一阻塞闸门
    pub fn is_blocking(&self) -> bool {
        self.is_waiting_for_input || self.is_transitioning || self.choices.is_some()
    }
}

/// 一次游玩的完整状态
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub mode: PlayerMode,
    pub current_scene_id: String,
    pub current_commands: Vec<Command>,
    /// 下一条要执行的指令；序列耗尽时越过末尾
    pub current_index: usize,
    pub command_stack: Vec<CommandFrame>,
    pub variables: VariableStore,
    pub stage_state: StageState,
    pub music_state: MusicState,
    pub ui_state: UiState,
    pub history: History,
}

impl PlayerState {
    /// 在指定场景开头创建状态
    pub fn new(scene_id: impl Into<String>, commands: Vec<Command>) -> Self {
        Self {
            mode: PlayerMode::Playing,
            current_scene_id: scene_id.into(),
            current_commands: commands,
            current_index: 0,
            command_stack: Vec::new(),
            variables: VariableStore::new(),
            stage_state: StageState::default(),
            music_state: MusicState::default(),
            ui_state: UiState::default(),
            history: History::new(),
        }
    }

    /// 下一条要执行的指令
    pub fn current_command(&self) -> Option<&Command> {
        self.current_commands.get(self.current_index)
    }

    /// 当前序列与调用栈是否都已耗尽
    pub fn is_exhausted(&self) -> bool {
        self.current_index >= self.current_commands.len() && self.command_stack.is_empty()
    }

    pub fn set_var(&mut self, id: impl Into<String>, value: VarValue) {
        self.variables.insert(id.into(), value);
    }

    pub fn get_var(&self, id: &str) -> Option<&VarValue> {
        self.variables.get(id)
    }
}
