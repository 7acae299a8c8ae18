//! # 按钮点击
//!
//! 把按钮的动作列表整理为执行步骤：连续的 `setVariable` 合并成一次提交，
//! 并保证在下一个非变量动作执行之前（或列表结束时）提交完毕。
//! 跳转类动作因此总能读到完整写入后的变量。
//!
//! 跳转动作自行完成导航与推进；`wait_for_click` 按钮只有在没有发生跳转时
//! 才由点击本身解除等待并推进。

use crate::command::{ButtonAction, SetVariableCommand};

/// 按钮动作的执行步骤
#[derive(Debug, Clone, PartialEq)]
pub enum ButtonStep {
    /// 一次性提交的一批变量写入
    Commit(Vec<SetVariableCommand>),
    PlaySound { asset_id: String },
    JumpToScene { scene_id: String },
    JumpToLabel { label: String },
}

/// 整理执行步骤
pub fn plan_actions(actions: &[ButtonAction]) -> Vec<ButtonStep> {
    let mut steps = Vec::new();
    let mut batch: Vec<SetVariableCommand> = Vec::new();

    for action in actions {
        let step = match action {
            ButtonAction::SetVariable(set) => {
                batch.push(set.clone());
                continue;
            }
            ButtonAction::PlaySound { asset_id } => ButtonStep::PlaySound {
                asset_id: asset_id.clone(),
            },
            ButtonAction::JumpToScene { target_scene_id } => ButtonStep::JumpToScene {
                scene_id: target_scene_id.clone(),
            },
            ButtonAction::JumpToLabel { label } => ButtonStep::JumpToLabel {
                label: label.clone(),
            },
        };
        if !batch.is_empty() {
            steps.push(ButtonStep::Commit(std::mem::take(&mut batch)));
        }
        steps.push(step);
    }
    if !batch.is_empty() {
        steps.push(ButtonStep::Commit(batch));
    }
    steps
}
