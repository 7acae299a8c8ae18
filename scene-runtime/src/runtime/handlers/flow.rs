//! # 流程处理器
//!
//! 等待、变量、跳转、调用/返回、标签与条件分支。
//!
//! `wait` 从不设置阻塞标记：它返回 `advance = false` 并登记自己的计时器，
//! 由计时器回调继续推进。时长为 0 且等待点击时不登记计时器，只能由点击结束。

use tracing::warn;

use crate::command::{
    BranchStartCommand, Command, CommandKind, JumpToLabelCommand, SceneTargetCommand,
    SetVariableCommand, VariableOperation, WaitCommand,
};
use crate::logic::{evaluate_conditions, lookup, resolve_variable_id};
use crate::project::Project;
use crate::runtime::handlers::HandlerContext;
use crate::runtime::result::{Continuation, HandlerResult, Navigation, StatePatch};
use crate::state::{PlayerState, VarValue, VariableStore};

pub fn wait(cmd: &WaitCommand) -> HandlerResult {
    if cmd.duration_ms == 0 {
        if cmd.wait_for_input {
            return HandlerResult::defer(None, 0, Continuation::AwaitClick);
        }
        return HandlerResult::advance();
    }
    HandlerResult::defer(
        None,
        cmd.duration_ms,
        Continuation::EndWait {
            skippable: cmd.wait_for_input,
        },
    )
}

pub fn set_variable(
    command_id: &str,
    cmd: &SetVariableCommand,
    state: &PlayerState,
    ctx: &HandlerContext,
) -> HandlerResult {
    let mut variables = state.variables.clone();
    if apply_set_variable(cmd, &mut variables, ctx.project) {
        HandlerResult::advance_with(StatePatch::variables(variables))
    } else {
        warn!(
            command_id = %command_id,
            variable_id = %cmd.variable_id,
            operation = ?cmd.operation,
            "变量运算无效，保持原值"
        );
        HandlerResult::advance()
    }
}

/// 把一次变量运算写入变量表，运算无效时不修改并返回 false
///
/// 按钮动作批量提交变量时也使用这里。
pub fn apply_set_variable(
    cmd: &SetVariableCommand,
    variables: &mut VariableStore,
    project: &Project,
) -> bool {
    let id = resolve_variable_id(&cmd.variable_id, project);
    let current = lookup(&id, variables, project).cloned();
    match apply_operation(current.as_ref(), cmd.operation, &cmd.value) {
        Some(value) => {
            variables.insert(id, value);
            true
        }
        None => false,
    }
}

/// 计算变量运算结果
///
/// - `add`：两边都是数字时相加，否则按字符串拼接
/// - `subtract` / `multiply` / `divide`：只接受数字，除数为 0 无效
/// - `toggle`：对当前值取反（忽略操作数）
/// - 未设置的变量在算术运算中视为 0
pub fn apply_operation(
    current: Option<&VarValue>,
    operation: VariableOperation,
    operand: &VarValue,
) -> Option<VarValue> {
    let zero = VarValue::Number(0.0);
    let current = current.unwrap_or(&zero);

    let numeric = |f: fn(f64, f64) -> Option<f64>| -> Option<VarValue> {
        let a = current.as_number()?;
        let b = operand.as_number()?;
        f(a, b).filter(|n| n.is_finite()).map(VarValue::Number)
    };

    match operation {
        VariableOperation::Set => Some(operand.clone()),
        VariableOperation::Add => numeric(|a, b| Some(a + b))
            .or_else(|| Some(VarValue::String(format!("{}{}", current, operand)))),
        VariableOperation::Subtract => numeric(|a, b| Some(a - b)),
        VariableOperation::Multiply => numeric(|a, b| Some(a * b)),
        VariableOperation::Divide => numeric(|a, b| (b != 0.0).then(|| a / b)),
        VariableOperation::Toggle => Some(VarValue::Bool(!current.is_truthy())),
    }
}

pub fn jump_to_scene(cmd: &SceneTargetCommand) -> HandlerResult {
    HandlerResult::advance_with(StatePatch::navigate(Navigation::JumpToScene {
        scene_id: cmd.target_scene_id.clone(),
    }))
}

pub fn call_scene(cmd: &SceneTargetCommand) -> HandlerResult {
    HandlerResult::advance_with(StatePatch::navigate(Navigation::CallScene {
        scene_id: cmd.target_scene_id.clone(),
    }))
}

pub fn return_from_scene() -> HandlerResult {
    HandlerResult::advance_with(StatePatch::navigate(Navigation::Return))
}

pub fn jump_to_label(command_id: &str, cmd: &JumpToLabelCommand, state: &PlayerState) -> HandlerResult {
    match find_label(&state.current_commands, &cmd.label) {
        Some(index) => HandlerResult::advance_with(StatePatch::navigate(Navigation::Goto(index))),
        None => {
            warn!(command_id = %command_id, label = %cmd.label, "标签不存在，继续执行");
            HandlerResult::advance()
        }
    }
}

pub fn branch_start(
    command_id: &str,
    cmd: &BranchStartCommand,
    state: &PlayerState,
    ctx: &HandlerContext,
) -> HandlerResult {
    if evaluate_conditions(&cmd.conditions, &state.variables, ctx.project) {
        return HandlerResult::advance();
    }

    // 游标已越过 branchStart，从下一条开始找匹配的 branchEnd
    let target = match find_branch_end(&state.current_commands, state.current_index) {
        Some(end) => end + 1,
        None => {
            warn!(command_id = %command_id, "分支缺少匹配的 branchEnd，跳到场景末尾");
            state.current_commands.len()
        }
    };
    HandlerResult::advance_with(StatePatch::navigate(Navigation::Goto(target)))
}

/// 线性查找标签所在下标
pub fn find_label(commands: &[Command], label: &str) -> Option<usize> {
    commands
        .iter()
        .position(|c| matches!(&c.kind, CommandKind::Label(l) if l.name == label))
}

/// 从 `from` 开始查找与外层 `branchStart` 匹配的 `branchEnd`（考虑嵌套）
pub fn find_branch_end(commands: &[Command], from: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, command) in commands.iter().enumerate().skip(from) {
        match command.kind {
            CommandKind::BranchStart(_) => depth += 1,
            CommandKind::BranchEnd if depth == 0 => return Some(offset),
            CommandKind::BranchEnd => depth -= 1,
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{DialogueCommand, LabelCommand};
    use crate::config::PlayerConfig;
    use crate::logic::{Condition, ConditionOperator};
    use crate::runtime::handlers::test_support::{SILENT, context, project_with_assets};

    fn say(id: &str) -> Command {
        Command::new(
            id,
            CommandKind::Dialogue(DialogueCommand {
                character_id: None,
                text: id.to_string(),
            }),
        )
    }

    fn branch(id: &str, conditions: Vec<Condition>) -> Command {
        Command::new(id, CommandKind::BranchStart(BranchStartCommand { conditions }))
    }

    fn end(id: &str) -> Command {
        Command::new(id, CommandKind::BranchEnd)
    }

    fn set(op: VariableOperation, value: impl Into<VarValue>) -> SetVariableCommand {
        SetVariableCommand {
            variable_id: "x".to_string(),
            operation: op,
            value: value.into(),
        }
    }

    #[test]
    fn test_wait_never_blocks() {
        let result = wait(&WaitCommand {
            duration_ms: 1000,
            wait_for_input: false,
        });
        assert!(!result.advance);
        assert!(result.updates.is_none());
        assert_eq!(result.delay, 1000);
        assert_eq!(
            result.callback,
            Some(Continuation::EndWait { skippable: false })
        );

        let zero = wait(&WaitCommand {
            duration_ms: 0,
            wait_for_input: false,
        });
        assert_eq!(zero, HandlerResult::advance());
    }

    #[test]
    fn test_click_only_wait_schedules_no_timer() {
        let result = wait(&WaitCommand {
            duration_ms: 0,
            wait_for_input: true,
        });
        assert!(!result.advance);
        assert!(result.updates.is_none());
        assert_eq!(result.callback, Some(Continuation::AwaitClick));

        let timed = wait(&WaitCommand {
            duration_ms: 300,
            wait_for_input: true,
        });
        assert_eq!(
            timed.callback,
            Some(Continuation::EndWait { skippable: true })
        );
    }

    #[test]
    fn test_arithmetic_operations() {
        let five = VarValue::Number(5.0);
        let op = |o, v: VarValue| apply_operation(Some(&five), o, &v);

        assert_eq!(op(VariableOperation::Add, 2.into()), Some(VarValue::Number(7.0)));
        assert_eq!(op(VariableOperation::Subtract, 2.into()), Some(VarValue::Number(3.0)));
        assert_eq!(op(VariableOperation::Multiply, 2.into()), Some(VarValue::Number(10.0)));
        assert_eq!(op(VariableOperation::Divide, 2.into()), Some(VarValue::Number(2.5)));
        assert_eq!(op(VariableOperation::Divide, 0.into()), None);
        assert_eq!(op(VariableOperation::Subtract, "abc".into()), None);
        assert_eq!(op(VariableOperation::Set, "abc".into()), Some(VarValue::from("abc")));
    }

    #[test]
    fn test_add_concatenates_strings_and_defaults_to_zero() {
        let name = VarValue::from("Ann");
        assert_eq!(
            apply_operation(Some(&name), VariableOperation::Add, &"!".into()),
            Some(VarValue::from("Ann!"))
        );
        assert_eq!(
            apply_operation(None, VariableOperation::Add, &3.into()),
            Some(VarValue::Number(3.0))
        );
    }

    #[test]
    fn test_toggle() {
        assert_eq!(
            apply_operation(Some(&VarValue::Bool(true)), VariableOperation::Toggle, &false.into()),
            Some(VarValue::Bool(false))
        );
        assert_eq!(
            apply_operation(None, VariableOperation::Toggle, &false.into()),
            Some(VarValue::Bool(true))
        );
    }

    #[test]
    fn test_set_variable_handler() {
        let project = project_with_assets();
        let config = PlayerConfig::default();
        let ctx = context(&project, &SILENT, &config);
        let mut state = PlayerState::new("s", Vec::new());
        state.set_var("x", VarValue::Number(1.0));

        let result = set_variable("v1", &set(VariableOperation::Add, 4), &state, &ctx);
        assert!(result.advance);
        let vars = result.updates.unwrap().variables.unwrap();
        assert_eq!(vars["x"], VarValue::Number(5.0));

        let invalid = set_variable("v2", &set(VariableOperation::Divide, 0), &state, &ctx);
        assert_eq!(invalid, HandlerResult::advance());
    }

    #[test]
    fn test_find_label() {
        let commands = vec![
            say("a"),
            Command::new(
                "l",
                CommandKind::Label(LabelCommand {
                    name: "end".to_string(),
                }),
            ),
        ];
        assert_eq!(find_label(&commands, "end"), Some(1));
        assert_eq!(find_label(&commands, "start"), None);
    }

    #[test]
    fn test_branch_false_skips_region() {
        let project = project_with_assets();
        let config = PlayerConfig::default();
        let ctx = context(&project, &SILENT, &config);
        let falsy = vec![Condition::new("flag", ConditionOperator::Eq, true)];
        let commands = vec![branch("b", falsy.clone()), say("A"), say("B"), end("e"), say("C")];
        let mut state = PlayerState::new("s", commands);
        state.current_index = 1;

        let cmd = BranchStartCommand { conditions: falsy };
        let result = branch_start("b", &cmd, &state, &ctx);
        assert!(result.advance);
        assert_eq!(
            result.updates.unwrap().navigation,
            Some(Navigation::Goto(4))
        );
    }

    #[test]
    fn test_branch_true_enters_region() {
        let project = project_with_assets();
        let config = PlayerConfig::default();
        let ctx = context(&project, &SILENT, &config);
        let commands = vec![branch("b", Vec::new()), say("A"), end("e")];
        let mut state = PlayerState::new("s", commands);
        state.current_index = 1;

        let cmd = BranchStartCommand {
            conditions: Vec::new(),
        };
        assert_eq!(branch_start("b", &cmd, &state, &ctx), HandlerResult::advance());
    }

    #[test]
    fn test_nested_branch_end_matching() {
        let commands = vec![
            branch("outer", Vec::new()),
            branch("inner", Vec::new()),
            say("A"),
            end("inner_end"),
            say("B"),
            end("outer_end"),
            say("C"),
        ];
        assert_eq!(find_branch_end(&commands, 1), Some(5));
        assert_eq!(find_branch_end(&commands, 2), Some(3));
        assert_eq!(find_branch_end(&commands[..5], 1), None);
    }
}
