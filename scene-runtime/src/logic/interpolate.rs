//! # 文本插值
//!
//! 把文本中的 `{引用}` 替换为变量的当前值。
//!
//! - 引用按 id、再按显示名查找（见 [`lookup`]）
//! - 已定义但未赋值的变量使用工程默认值
//! - 无法解析的引用原样保留（包括花括号）
//! - 未闭合的 `{` 原样保留

use crate::logic::lookup;
use crate::project::Project;
use crate::state::VariableStore;

/// 插值文本中的变量引用
pub fn interpolate_variables(text: &str, variables: &VariableStore, project: &Project) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];

        let Some(close) = after_open.find('}') else {
            // 没有闭合括号，剩余部分原样输出
            out.push_str(&rest[open..]);
            return out;
        };

        let inner = &after_open[..close];
        // `{a {b}` 这种情况：外层 `{` 当作普通字符，从内层重新开始
        if let Some(nested) = inner.rfind('{') {
            out.push_str(&rest[open..open + 1 + nested]);
            rest = &after_open[nested..];
            continue;
        }

        let reference = inner.trim();
        match (!reference.is_empty())
            .then(|| lookup(reference, variables, project))
            .flatten()
        {
            Some(value) => out.push_str(&value.to_string()),
            None => out.push_str(&rest[open..open + close + 2]),
        }
        rest = &after_open[close + 1..];
    }

    out.push_str(rest);
    out
}
