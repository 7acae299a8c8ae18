//! # 条件求值
//!
//! 覆盖层显示条件、选项显示条件与 `branchStart` 区域都使用这里的规则。
//!
//! - 条件列表为**与**关系，空列表为真
//! - 引用的变量无法解析时，该条件为假
//! - 数值比较会把可解析的字符串当作数字；无法转换为数字时比较结果为假

use serde::{Deserialize, Serialize};

use crate::logic::lookup;
use crate::project::Project;
use crate::state::{VarValue, VariableStore};

/// 比较运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionOperator {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    NotEq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "contains")]
    Contains,
}

/// 单个条件：`变量 运算符 值`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub variable_id: String,
    pub operator: ConditionOperator,
    pub value: VarValue,
}

impl Condition {
    pub fn new(
        variable_id: impl Into<String>,
        operator: ConditionOperator,
        value: impl Into<VarValue>,
    ) -> Self {
        Self {
            variable_id: variable_id.into(),
            operator,
            value: value.into(),
        }
    }
}

/// 求值单个条件
pub fn evaluate_condition(
    condition: &Condition,
    variables: &VariableStore,
    project: &Project,
) -> bool {
    let Some(current) = lookup(&condition.variable_id, variables, project) else {
        return false;
    };
    let expected = &condition.value;

    match condition.operator {
        ConditionOperator::Eq => values_equal(current, expected),
        ConditionOperator::NotEq => !values_equal(current, expected),
        ConditionOperator::Gt => compare(current, expected, |a, b| a > b),
        ConditionOperator::Gte => compare(current, expected, |a, b| a >= b),
        ConditionOperator::Lt => compare(current, expected, |a, b| a < b),
        ConditionOperator::Lte => compare(current, expected, |a, b| a <= b),
        ConditionOperator::Contains => current.to_string().contains(&expected.to_string()),
    }
}

/// 求值条件列表（与关系）
pub fn evaluate_conditions(
    conditions: &[Condition],
    variables: &VariableStore,
    project: &Project,
) -> bool {
    conditions
        .iter()
        .all(|c| evaluate_condition(c, variables, project))
}

/// 相等判断：同类型直接比较，异类型按显示文本比较（`3` 等于 `"3"`）
fn values_equal(left: &VarValue, right: &VarValue) -> bool {
    match (left, right) {
        (VarValue::Number(a), VarValue::Number(b)) => a == b,
        (VarValue::Bool(a), VarValue::Bool(b)) => a == b,
        (VarValue::String(a), VarValue::String(b)) => a == b,
        _ => left.to_string() == right.to_string(),
    }
}

fn compare(left: &VarValue, right: &VarValue, op: impl Fn(f64, f64) -> bool) -> bool {
    match (left.as_number(), right.as_number()) {
        (Some(a), Some(b)) => op(a, b),
        _ => false,
    }
}
