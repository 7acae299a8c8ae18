//! # Project 模块
//!
//! 播放器只读取的工程数据，以及宿主需要提供的协作接口。
//!
//! - [`Project`]：场景、变量定义、角色、资源、UI 配置
//! - [`AssetResolver`]：资源 id -> URL / 元数据，缺失时返回 `None`，从不 panic
//! - [`SoundPlayer`]：音效播放，失败返回错误，由调用方记录日志后吞掉

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::error::{ProjectError, SoundError};
use crate::state::{VarValue, VariableStore};

/// 资源类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssetKind {
    Image,
    Audio,
    Video,
    Font,
}

impl AssetKind {
    /// 请求某类资源时可以接受的实际资源类别
    ///
    /// 图片位（背景、图片覆盖层）允许放视频。
    pub fn accepts(&self, actual: AssetKind) -> bool {
        match self {
            AssetKind::Image => matches!(actual, AssetKind::Image | AssetKind::Video),
            other => *other == actual,
        }
    }
}

/// 资源元数据
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AssetMetadata {
    pub is_video: bool,
    pub looping: bool,
}

/// 资源解析接口
pub trait AssetResolver {
    /// 解析资源 URL，资源不存在或类别不符时返回 `None`
    fn resolve(&self, asset_id: &str, kind: AssetKind) -> Option<String>;

    /// 资源元数据
    fn metadata(&self, asset_id: &str, kind: AssetKind) -> Option<AssetMetadata>;
}

/// 音效播放接口
pub trait SoundPlayer {
    /// 播放音效；`None` 表示停止/无声
    fn play(&self, sound_id: Option<&str>) -> Result<(), SoundError>;
}

/// 不发声的音效播放器
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentSoundPlayer;

impl SoundPlayer for SilentSoundPlayer {
    fn play(&self, _sound_id: Option<&str>) -> Result<(), SoundError> {
        Ok(())
    }
}

/// 资源定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: String,
    pub kind: AssetKind,
    pub url: String,
    #[serde(rename = "loop", default)]
    pub looping: bool,
}

/// 场景
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub commands: Vec<Command>,
}

/// 变量定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableDefinition {
    pub id: String,
    /// 显示名，插值时也可以用它引用变量
    pub name: String,
    pub default_value: VarValue,
}

/// 角色立绘
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sprite {
    pub id: String,
    pub asset_id: String,
}

/// 角色定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub sprites: Vec<Sprite>,
    #[serde(default)]
    pub default_sprite_id: Option<String>,
}

impl CharacterDefinition {
    /// 查找立绘对应的资源 id；未指定时使用默认立绘，再退回第一张
    pub fn sprite_asset(&self, sprite_id: Option<&str>) -> Option<&str> {
        let wanted = sprite_id.or(self.default_sprite_id.as_deref());
        match wanted {
            Some(id) => self.sprites.iter().find(|s| s.id == id),
            None => self.sprites.first(),
        }
        .map(|s| s.asset_id.as_str())
    }
}

/// 字体定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontDefinition {
    pub id: String,
    pub family: String,
    #[serde(default)]
    pub asset_id: Option<String>,
}

/// UI 界面定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// UI 配置
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiConfig {
    /// 默认字体 id
    #[serde(default)]
    pub default_font_id: Option<String>,
    #[serde(default)]
    pub fonts: Vec<FontDefinition>,
    #[serde(default)]
    pub screens: Vec<ScreenDefinition>,
}

/// 工程数据
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub start_scene_id: Option<String>,
    #[serde(default)]
    pub scenes: Vec<Scene>,
    #[serde(default)]
    pub variables: Vec<VariableDefinition>,
    #[serde(default)]
    pub characters: Vec<CharacterDefinition>,
    #[serde(default)]
    pub assets: Vec<Asset>,
    #[serde(default)]
    pub ui: UiConfig,
}

impl Project {
    /// 从 JSON 解析工程，并检查场景 id 唯一
    pub fn from_json(json: &str) -> Result<Self, ProjectError> {
        let project: Project =
            serde_json::from_str(json).map_err(|e| ProjectError::Parse(e.to_string()))?;

        let mut seen = HashSet::new();
        for scene in &project.scenes {
            if !seen.insert(scene.id.as_str()) {
                return Err(ProjectError::DuplicateScene(scene.id.clone()));
            }
        }
        Ok(project)
    }

    pub fn scene(&self, id: &str) -> Option<&Scene> {
        self.scenes.iter().find(|s| s.id == id)
    }

    /// 起始场景：显式配置优先，否则第一个场景
    pub fn start_scene(&self) -> Option<&Scene> {
        match &self.start_scene_id {
            Some(id) => self.scene(id),
            None => self.scenes.first(),
        }
    }

    pub fn variable(&self, id: &str) -> Option<&VariableDefinition> {
        self.variables.iter().find(|v| v.id == id)
    }

    pub fn variable_by_name(&self, name: &str) -> Option<&VariableDefinition> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// 变量默认值
    pub fn default_value(&self, id: &str) -> Option<&VarValue> {
        self.variable(id).map(|v| &v.default_value)
    }

    /// 按默认值初始化的变量表
    pub fn initial_variables(&self) -> VariableStore {
        self.variables
            .iter()
            .map(|v| (v.id.clone(), v.default_value.clone()))
            .collect()
    }

    pub fn character(&self, id: &str) -> Option<&CharacterDefinition> {
        self.characters.iter().find(|c| c.id == id)
    }

    pub fn screen(&self, id: &str) -> Option<&ScreenDefinition> {
        self.ui.screens.iter().find(|s| s.id == id)
    }

    /// 字体族；`font_id` 为 None 时使用 UI 配置的默认字体
    pub fn font_family(&self, font_id: Option<&str>) -> Option<&str> {
        let id = font_id.or(self.ui.default_font_id.as_deref())?;
        self.ui
            .fonts
            .iter()
            .find(|f| f.id == id)
            .map(|f| f.family.as_str())
    }

    fn asset(&self, asset_id: &str, kind: AssetKind) -> Option<&Asset> {
        self.assets
            .iter()
            .find(|a| a.id == asset_id && kind.accepts(a.kind))
    }
}

impl AssetResolver for Project {
    fn resolve(&self, asset_id: &str, kind: AssetKind) -> Option<String> {
        self.asset(asset_id, kind).map(|a| a.url.clone())
    }

    fn metadata(&self, asset_id: &str, kind: AssetKind) -> Option<AssetMetadata> {
        self.asset(asset_id, kind).map(|a| AssetMetadata {
            is_video: a.kind == AssetKind::Video,
            looping: a.looping,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_project() -> Project {
        Project::from_json(
            r#"{
                "id": "p",
                "name": "Demo",
                "scenes": [{ "id": "s1", "name": "Opening", "commands": [] }],
                "variables": [{ "id": "v1", "name": "name", "defaultValue": "Player" }],
                "characters": [{
                    "id": "ann",
                    "name": "Ann",
                    "sprites": [
                        { "id": "normal", "assetId": "ann_normal" },
                        { "id": "smile", "assetId": "ann_smile" }
                    ],
                    "defaultSpriteId": "smile"
                }],
                "assets": [
                    { "id": "bg", "kind": "image", "url": "img/bg.png" },
                    { "id": "intro", "kind": "video", "url": "mov/intro.mp4", "loop": true },
                    { "id": "bgm", "kind": "audio", "url": "audio/bgm.ogg" }
                ],
                "ui": {
                    "defaultFontId": "main",
                    "fonts": [{ "id": "main", "family": "Noto Sans" }]
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_asset_resolution_by_kind() {
        let project = sample_project();
        assert_eq!(
            project.resolve("bg", AssetKind::Image),
            Some("img/bg.png".to_string())
        );
        // 图片位可以接受视频
        assert_eq!(
            project.resolve("intro", AssetKind::Image),
            Some("mov/intro.mp4".to_string())
        );
        // 类别不符
        assert_eq!(project.resolve("bgm", AssetKind::Image), None);
        assert_eq!(project.resolve("missing", AssetKind::Audio), None);
    }

    #[test]
    fn test_asset_metadata() {
        let project = sample_project();
        assert_eq!(
            project.metadata("intro", AssetKind::Video),
            Some(AssetMetadata {
                is_video: true,
                looping: true
            })
        );
        assert_eq!(project.metadata("nope", AssetKind::Video), None);
    }

    #[test]
    fn test_variable_lookup_and_defaults() {
        let project = sample_project();
        assert_eq!(project.variable_by_name("name").unwrap().id, "v1");
        assert_eq!(
            project.default_value("v1"),
            Some(&VarValue::String("Player".to_string()))
        );
        let vars = project.initial_variables();
        assert_eq!(vars.len(), 1);
    }

    #[test]
    fn test_character_sprite_fallbacks() {
        let project = sample_project();
        let ann = project.character("ann").unwrap();
        assert_eq!(ann.sprite_asset(Some("normal")), Some("ann_normal"));
        assert_eq!(ann.sprite_asset(None), Some("ann_smile"));
        assert_eq!(ann.sprite_asset(Some("angry")), None);
    }

    #[test]
    fn test_font_family_default() {
        let project = sample_project();
        assert_eq!(project.font_family(None), Some("Noto Sans"));
        assert_eq!(project.font_family(Some("other")), None);
    }

    #[test]
    fn test_duplicate_scene_rejected() {
        let result = Project::from_json(
            r#"{ "scenes": [{ "id": "a" }, { "id": "a" }] }"#,
        );
        assert_eq!(result, Err(ProjectError::DuplicateScene("a".to_string())));
    }

    #[test]
    fn test_start_scene() {
        let project = sample_project();
        assert_eq!(project.start_scene().unwrap().id, "s1");
    }
}
