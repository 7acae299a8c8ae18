//! # Logic 模块
//!
//! 变量相关的纯函数：文本插值与条件求值。
//!
//! 两者都只读取变量表与工程定义，没有副作用，结果确定。
//!
//! ## 变量查找顺序
//!
//! 1. 变量表中以该 id 存储的值
//! 2. 工程中该 id 的变量定义的默认值
//! 3. 把引用当作显示名：按名字找到变量定义，再重复 1、2

pub mod condition;
pub mod interpolate;

pub use condition::{Condition, ConditionOperator, evaluate_condition, evaluate_conditions};
pub use interpolate::interpolate_variables;

use crate::project::Project;
use crate::state::{VarValue, VariableStore};

/// 按 id 或显示名查找变量的当前值
pub fn lookup<'a>(
    reference: &str,
    variables: &'a VariableStore,
    project: &'a Project,
) -> Option<&'a VarValue> {
    lookup_by_id(reference, variables, project).or_else(|| {
        project
            .variable_by_name(reference)
            .and_then(|def| lookup_by_id(&def.id, variables, project))
    })
}

/// 把引用（id 或显示名）规范为写入变量表时使用的 id
///
/// 工程中找不到定义时原样返回，允许脚本使用未声明的临时变量。
pub fn resolve_variable_id(reference: &str, project: &Project) -> String {
    if project.variable(reference).is_some() {
        return reference.to_string();
    }
    project
        .variable_by_name(reference)
        .map(|def| def.id.clone())
        .unwrap_or_else(|| reference.to_string())
}

fn lookup_by_id<'a>(
    id: &str,
    variables: &'a VariableStore,
    project: &'a Project,
) -> Option<&'a VarValue> {
    variables.get(id).or_else(|| project.default_value(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::VariableDefinition;

    #[test]
    fn test_lookup_order() {
        let project = Project {
            variables: vec![VariableDefinition {
                id: "v_gold".to_string(),
                name: "gold".to_string(),
                default_value: VarValue::Number(10.0),
            }],
            ..Project::default()
        };
        let mut vars = VariableStore::new();

        // 未设置：使用默认值，id 与显示名都能找到
        assert_eq!(lookup("v_gold", &vars, &project), Some(&VarValue::Number(10.0)));
        assert_eq!(lookup("gold", &vars, &project), Some(&VarValue::Number(10.0)));

        vars.insert("v_gold".to_string(), VarValue::Number(3.0));
        assert_eq!(lookup("gold", &vars, &project), Some(&VarValue::Number(3.0)));

        assert_eq!(lookup("silver", &vars, &project), None);
    }

    #[test]
    fn test_resolve_variable_id() {
        let project = Project {
            variables: vec![VariableDefinition {
                id: "v_gold".to_string(),
                name: "gold".to_string(),
                default_value: VarValue::Number(0.0),
            }],
            ..Project::default()
        };
        assert_eq!(resolve_variable_id("v_gold", &project), "v_gold");
        assert_eq!(resolve_variable_id("gold", &project), "v_gold");
        assert_eq!(resolve_variable_id("temp", &project), "temp");
    }
}
