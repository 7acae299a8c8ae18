//! # Command 模块
//!
//! 定义编辑器产出、播放器逐条执行的场景指令。
//!
//! ## 设计原则
//!
//! - **声明式**：指令只描述"做什么"，由 `runtime::handlers` 决定状态如何变化
//! - **可序列化**：JSON 形如 `{ "id": "...", "type": "showText", ... }`
//! - **容错**：未知的 `type` 反序列化为 [`CommandKind::Unknown`]，执行时按空操作处理

use serde::{Deserialize, Serialize};

use crate::geometry::{Rect, StagePosition};
use crate::logic::condition::Condition;
use crate::state::VarValue;
use crate::transition::TransitionKind;

fn default_transition_duration() -> f64 {
    0.5
}

fn default_true() -> bool {
    true
}

/// 一条场景指令
///
/// `id` 在场景内唯一；覆盖层以创建它的指令 id 作为自身 id。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub id: String,
    #[serde(flatten)]
    pub kind: CommandKind,
}

impl Command {
    pub fn new(id: impl Into<String>, kind: CommandKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }
}

/// 指令类型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CommandKind {
    Dialogue(DialogueCommand),
    Choice(ChoiceCommand),
    TextInput(TextInputCommand),
    PlayMovie(PlayMovieCommand),
    Wait(WaitCommand),
    SetVariable(SetVariableCommand),
    SetBackground(SetBackgroundCommand),
    ShowCharacter(ShowCharacterCommand),
    HideCharacter(HideCharacterCommand),
    PlayMusic(PlayMusicCommand),
    StopMusic,
    PlaySound(PlaySoundCommand),
    Flash(FlashCommand),
    ShakeScreen(ShakeScreenCommand),
    ShowText(ShowTextCommand),
    HideText(HideOverlayCommand),
    ShowImage(ShowImageCommand),
    HideImage(HideOverlayCommand),
    ShowButton(ShowButtonCommand),
    HideButton(HideOverlayCommand),
    JumpToScene(SceneTargetCommand),
    CallScene(SceneTargetCommand),
    Return,
    JumpToLabel(JumpToLabelCommand),
    Label(LabelCommand),
    BranchStart(BranchStartCommand),
    BranchEnd,
    /// 无法识别的指令类型
    #[serde(other)]
    Unknown,
}

impl CommandKind {
    /// 指令类型名（用于日志）
    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::Dialogue(_) => "dialogue",
            CommandKind::Choice(_) => "choice",
            CommandKind::TextInput(_) => "textInput",
            CommandKind::PlayMovie(_) => "playMovie",
            CommandKind::Wait(_) => "wait",
            CommandKind::SetVariable(_) => "setVariable",
            CommandKind::SetBackground(_) => "setBackground",
            CommandKind::ShowCharacter(_) => "showCharacter",
            CommandKind::HideCharacter(_) => "hideCharacter",
            CommandKind::PlayMusic(_) => "playMusic",
            CommandKind::StopMusic => "stopMusic",
            CommandKind::PlaySound(_) => "playSound",
            CommandKind::Flash(_) => "flash",
            CommandKind::ShakeScreen(_) => "shakeScreen",
            CommandKind::ShowText(_) => "showText",
            CommandKind::HideText(_) => "hideText",
            CommandKind::ShowImage(_) => "showImage",
            CommandKind::HideImage(_) => "hideImage",
            CommandKind::ShowButton(_) => "showButton",
            CommandKind::HideButton(_) => "hideButton",
            CommandKind::JumpToScene(_) => "jumpToScene",
            CommandKind::CallScene(_) => "callScene",
            CommandKind::Return => "return",
            CommandKind::JumpToLabel(_) => "jumpToLabel",
            CommandKind::Label(_) => "label",
            CommandKind::BranchStart(_) => "branchStart",
            CommandKind::BranchEnd => "branchEnd",
            CommandKind::Unknown => "unknown",
        }
    }
}

/// 对话
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueCommand {
    /// 说话角色（None 表示旁白）
    #[serde(default)]
    pub character_id: Option<String>,
    /// 对话文本，支持 `{变量}` 插值
    pub text: String,
}

/// 选项跳转目标
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ChoiceTarget {
    /// 继续执行选择指令之后的内容
    #[default]
    Continue,
    Scene { scene_id: String },
    Label { label: String },
}

/// 选项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceOption {
    pub text: String,
    #[serde(default)]
    pub target: ChoiceTarget,
    /// 显示条件（全部满足才显示）
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// 选择分支
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceCommand {
    #[serde(default)]
    pub prompt: Option<String>,
    pub options: Vec<ChoiceOption>,
}

/// 文本输入
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextInputCommand {
    /// 输入结果写入的变量
    pub variable_id: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub max_length: Option<usize>,
}

/// 播放视频
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayMovieCommand {
    pub asset_id: String,
}

/// 等待
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitCommand {
    pub duration_ms: u64,
    /// 玩家点击可提前结束等待
    #[serde(default)]
    pub wait_for_input: bool,
}

/// 变量运算
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VariableOperation {
    #[default]
    Set,
    Add,
    Subtract,
    Multiply,
    Divide,
    Toggle,
}

/// 设置变量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetVariableCommand {
    pub variable_id: String,
    #[serde(default)]
    pub operation: VariableOperation,
    pub value: VarValue,
}

/// 切换背景
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBackgroundCommand {
    pub asset_id: String,
    #[serde(default)]
    pub transition: Option<TransitionKind>,
    #[serde(default = "default_transition_duration")]
    pub duration: f64,
}

/// 显示角色
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowCharacterCommand {
    pub character_id: String,
    /// 立绘 id（None 使用角色默认立绘）
    #[serde(default)]
    pub sprite_id: Option<String>,
    #[serde(default)]
    pub position: StagePosition,
    #[serde(default)]
    pub transition: Option<TransitionKind>,
    #[serde(default = "default_transition_duration")]
    pub duration: f64,
}

/// 隐藏角色
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HideCharacterCommand {
    pub character_id: String,
    #[serde(default)]
    pub transition: Option<TransitionKind>,
    #[serde(default = "default_transition_duration")]
    pub duration: f64,
}

/// 播放背景音乐
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayMusicCommand {
    pub asset_id: String,
    #[serde(rename = "loop", default = "default_true")]
    pub looping: bool,
}

/// 播放音效
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaySoundCommand {
    pub asset_id: String,
}

/// 闪屏
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashCommand {
    #[serde(default = "default_flash_color")]
    pub color: String,
    #[serde(default = "default_effect_duration")]
    pub duration: f64,
}

fn default_flash_color() -> String {
    "#ffffff".to_string()
}

fn default_effect_duration() -> f64 {
    0.3
}

/// 震屏
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShakeScreenCommand {
    #[serde(default = "default_shake_intensity")]
    pub intensity: f32,
    #[serde(default = "default_effect_duration")]
    pub duration: f64,
}

fn default_shake_intensity() -> f32 {
    10.0
}

/// 文字对齐
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// 文字样式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    #[serde(default = "default_text_color")]
    pub color: String,
    /// None 使用工程 UI 配置中的默认字体
    #[serde(default)]
    pub font_family: Option<String>,
    #[serde(default)]
    pub align: TextAlign,
    #[serde(default)]
    pub bold: bool,
}

fn default_font_size() -> f32 {
    24.0
}

fn default_text_color() -> String {
    "#ffffff".to_string()
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: default_font_size(),
            color: default_text_color(),
            font_family: None,
            align: TextAlign::default(),
            bold: false,
        }
    }
}

/// 显示文字覆盖层
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowTextCommand {
    pub text: String,
    pub rect: Rect,
    #[serde(default)]
    pub style: TextStyle,
    #[serde(default)]
    pub transition: Option<TransitionKind>,
    #[serde(default = "default_transition_duration")]
    pub duration: f64,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// 显示图片覆盖层
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowImageCommand {
    pub asset_id: String,
    pub rect: Rect,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    #[serde(default)]
    pub rotation: f32,
    #[serde(default)]
    pub transition: Option<TransitionKind>,
    #[serde(default = "default_transition_duration")]
    pub duration: f64,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

fn default_opacity() -> f32 {
    1.0
}

/// 按钮点击动作
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ButtonAction {
    SetVariable(SetVariableCommand),
    JumpToScene { target_scene_id: String },
    JumpToLabel { label: String },
    PlaySound { asset_id: String },
}

/// 显示按钮覆盖层
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowButtonCommand {
    pub text: String,
    pub rect: Rect,
    #[serde(default)]
    pub style: TextStyle,
    #[serde(default)]
    pub image_asset_id: Option<String>,
    #[serde(default)]
    pub actions: Vec<ButtonAction>,
    /// 按钮出现后阻塞指令推进，直到被点击
    #[serde(default)]
    pub wait_for_click: bool,
    #[serde(default)]
    pub click_sound_id: Option<String>,
    #[serde(default)]
    pub transition: Option<TransitionKind>,
    #[serde(default = "default_transition_duration")]
    pub duration: f64,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// 隐藏覆盖层（文字/图片/按钮共用）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HideOverlayCommand {
    /// 创建该覆盖层的指令 id
    pub target_command_id: String,
    #[serde(default)]
    pub transition: Option<TransitionKind>,
    #[serde(default = "default_transition_duration")]
    pub duration: f64,
}

/// 场景跳转/调用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneTargetCommand {
    pub target_scene_id: String,
}

/// 跳转到标签
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JumpToLabelCommand {
    pub label: String,
}

/// 标签定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelCommand {
    pub name: String,
}

/// 条件分支开始，与之后匹配的 `branchEnd` 构成区域
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchStartCommand {
    #[serde(default)]
    pub conditions: Vec<Condition>,
}
