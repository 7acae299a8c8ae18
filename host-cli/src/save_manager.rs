//! # SaveManager 模块
//!
//! 存档文件管理，负责存档的读写和 slot 管理。
//!
//! ## 文件布局
//!
//! ```text
//! saves/
//! ├── slot_001.json
//! ├── slot_002.json
//! └── ...
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use scene_runtime::GameStateSave;
use tracing::info;

use crate::error::{HostError, HostResult};

/// 最大存档槽位数
pub const MAX_SAVE_SLOTS: u32 = 99;

/// 存档管理器
pub struct SaveManager {
    /// 存档目录
    saves_dir: PathBuf,
}

impl SaveManager {
    pub fn new(saves_dir: impl AsRef<Path>) -> Self {
        let saves_dir = saves_dir.as_ref().to_path_buf();
        Self { saves_dir }
    }

    /// 确保存档目录存在
    pub fn ensure_dir(&self) -> HostResult<()> {
        if !self.saves_dir.exists() {
            fs::create_dir_all(&self.saves_dir).map_err(|e| HostError::io(&self.saves_dir, e))?;
        }
        Ok(())
    }

    /// 获取存档文件路径
    pub fn slot_path(&self, slot: u32) -> PathBuf {
        self.saves_dir.join(format!("slot_{:03}.json", slot))
    }

    /// 保存存档
    pub fn save(&self, slot: u32, data: &GameStateSave) -> HostResult<()> {
        self.ensure_dir()?;

        let path = self.slot_path(slot);
        let json = data.to_json()?;
        fs::write(&path, json).map_err(|e| HostError::io(&path, e))?;

        info!(slot, path = %path.display(), "存档保存成功");
        Ok(())
    }

    /// 读取存档
    pub fn load(&self, slot: u32) -> HostResult<GameStateSave> {
        let path = self.slot_path(slot);

        if !path.exists() {
            return Err(HostError::SaveNotFound(path.display().to_string()));
        }

        let json = fs::read_to_string(&path).map_err(|e| HostError::io(&path, e))?;
        let data = GameStateSave::from_json(&json)?;

        info!(slot, path = %path.display(), "存档读取成功");
        Ok(data)
    }

    /// 删除存档
    pub fn delete(&self, slot: u32) -> HostResult<()> {
        let path = self.slot_path(slot);

        if path.exists() {
            fs::remove_file(&path).map_err(|e| HostError::io(&path, e))?;
            info!(slot, "存档删除成功");
        }

        Ok(())
    }

    /// 检查存档是否存在
    pub fn exists(&self, slot: u32) -> bool {
        self.slot_path(slot).exists()
    }

    /// 列出所有存档
    pub fn list_saves(&self) -> Vec<(u32, PathBuf)> {
        let Ok(entries) = fs::read_dir(&self.saves_dir) else {
            return Vec::new();
        };

        let mut saves: Vec<(u32, PathBuf)> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter_map(|path| {
                // 解析 slot_XXX.json
                let name = path.file_name()?.to_str()?;
                let slot = name
                    .strip_prefix("slot_")?
                    .strip_suffix(".json")?
                    .parse::<u32>()
                    .ok()?;
                Some((slot, path))
            })
            .collect();

        saves.sort_by_key(|(slot, _)| *slot);
        saves
    }

    /// 获取下一个可用的存档槽位
    pub fn next_available_slot(&self) -> Option<u32> {
        (1..=MAX_SAVE_SLOTS).find(|slot| !self.exists(*slot))
    }

    /// 获取存档信息（用于列表显示）
    pub fn get_save_info(&self, slot: u32) -> Option<SaveInfo> {
        let data = self.load(slot).ok()?;
        Some(SaveInfo {
            slot,
            display_time: format_timestamp(data.timestamp),
            scene_name: data.scene_name,
            scene_id: data.player_state_data.current_scene_id,
        })
    }
}

/// 毫秒时间戳转为本地时间文本
pub fn format_timestamp(timestamp_ms: u64) -> String {
    i64::try_from(timestamp_ms)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .map(|utc| {
            utc.with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| "-".to_string())
}

/// 存档信息
#[derive(Debug, Clone, PartialEq)]
pub struct SaveInfo {
    pub slot: u32,
    pub display_time: String,
    pub scene_name: String,
    pub scene_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use scene_runtime::{PlayerState, PlayerStateData};

    fn sample_save(scene: &str) -> GameStateSave {
        let state = PlayerState::new(scene, Vec::new());
        GameStateSave::new("测试章节", PlayerStateData::capture(&state))
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let manager = SaveManager::new(dir.path().join("saves"));

        manager.save(1, &sample_save("main")).unwrap();
        assert!(manager.exists(1));
        assert!(manager.slot_path(1).ends_with("slot_001.json"));

        let loaded = manager.load(1).unwrap();
        assert_eq!(loaded.scene_name, "测试章节");
        assert_eq!(loaded.player_state_data.current_scene_id, "main");
    }

    #[test]
    fn test_slot_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let manager = SaveManager::new(dir.path());

        let result = manager.load(99);
        assert!(matches!(result, Err(HostError::SaveNotFound(_))));
        assert!(manager.get_save_info(99).is_none());
    }

    #[test]
    fn test_list_saves_and_next_slot() {
        let dir = tempfile::tempdir().unwrap();
        let manager = SaveManager::new(dir.path());
        assert!(manager.list_saves().is_empty());

        for slot in [1, 3, 5] {
            manager.save(slot, &sample_save("main")).unwrap();
        }
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let slots: Vec<u32> = manager.list_saves().iter().map(|(slot, _)| *slot).collect();
        assert_eq!(slots, vec![1, 3, 5]);
        assert_eq!(manager.next_available_slot(), Some(2));

        manager.delete(3).unwrap();
        assert!(!manager.exists(3));
        // 删除不存在的存档不报错
        manager.delete(3).unwrap();
    }

    #[test]
    fn test_save_info() {
        let dir = tempfile::tempdir().unwrap();
        let manager = SaveManager::new(dir.path());
        manager.save(2, &sample_save("chapter1")).unwrap();

        let info = manager.get_save_info(2).unwrap();
        assert_eq!(info.slot, 2);
        assert_eq!(info.scene_id, "chapter1");
        assert_eq!(info.display_time.len(), "2024-01-01 00:00:00".len());
    }

    #[test]
    fn test_format_invalid_timestamp() {
        assert_eq!(format_timestamp(u64::MAX), "-");
    }
}
