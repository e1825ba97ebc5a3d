//! 遍历计划：根据起点、数量与白名单算出本次要处理的课时序列。

use tracing::warn;

use super::models::{ItemRef, WalkPlan};

/// 计算工作子序列（不考虑 `count`，数量上限在遍历时执行）。
///
/// - `only` 非空：按原顺序取序号在白名单中的课时，未知序号忽略；
/// - `start == 0`：只取 `current` 指向的课时；
/// - 否则：从第 `start` 个课时到末尾。
pub(crate) fn select_items(
    items: &[ItemRef],
    plan: &WalkPlan,
    current: Option<usize>,
) -> Vec<ItemRef> {
    if !plan.only.is_empty() {
        for ordinal in &plan.only {
            if !items.iter().any(|item| item.ordinal == *ordinal) {
                warn!(target: "download", ordinal, "白名单中的课时不存在，已忽略");
            }
        }
        return items
            .iter()
            .filter(|item| plan.only.contains(&item.ordinal))
            .cloned()
            .collect();
    }

    if plan.start == 0 {
        let Some(current) = current else {
            warn!(target: "download", "页面没有选中的课时，无法只处理当前课时");
            return Vec::new();
        };
        return items
            .iter()
            .filter(|item| item.ordinal == current)
            .take(1)
            .cloned()
            .collect();
    }

    if plan.start > items.len() {
        warn!(
            target: "download",
            start = plan.start,
            total = items.len(),
            "起始课时超出范围"
        );
        return Vec::new();
    }

    items[plan.start - 1..].to_vec()
}

/// 数量上限仅在没有白名单时生效。
pub(crate) fn count_limit(plan: &WalkPlan) -> Option<usize> {
    if plan.only.is_empty() { plan.count } else { None }
}

/// 解析形如 `3,5,7` 或 `10-12` 的序号列表（保持输入顺序，去重）。
pub fn parse_ordinal_list(raw: &str) -> Result<Vec<usize>, String> {
    let mut out = Vec::new();
    for part in raw.split([',', ' ']).map(str::trim).filter(|p| !p.is_empty()) {
        let values = match part.split_once('-') {
            Some((a, b)) => {
                let a = parse_ordinal(a)?;
                let b = parse_ordinal(b)?;
                if a > b {
                    return Err(format!("invalid range: {part}"));
                }
                (a..=b).collect::<Vec<_>>()
            }
            None => vec![parse_ordinal(part)?],
        };
        for v in values {
            if !out.contains(&v) {
                out.push(v);
            }
        }
    }
    Ok(out)
}

fn parse_ordinal(raw: &str) -> Result<usize, String> {
    match raw.trim().parse::<usize>() {
        Ok(0) => Err("ordinals start at 1".to_string()),
        Ok(v) => Ok(v),
        Err(_) => Err(format!("invalid ordinal: {raw}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(n: usize) -> Vec<ItemRef> {
        (1..=n)
            .map(|ordinal| ItemRef {
                ordinal,
                group_index: (ordinal - 1) / 3,
                title: format!("Lesson {ordinal}"),
            })
            .collect()
    }

    fn ordinals(v: &[ItemRef]) -> Vec<usize> {
        v.iter().map(|i| i.ordinal).collect()
    }

    #[test]
    fn offset_selects_tail() {
        let plan = WalkPlan {
            start: 5,
            count: Some(3),
            ..WalkPlan::default()
        };
        assert_eq!(ordinals(&select_items(&items(10), &plan, None)), (5..=10).collect::<Vec<_>>());
        assert_eq!(count_limit(&plan), Some(3));
    }

    #[test]
    fn allow_list_overrides_offset_and_keeps_page_order() {
        let plan = WalkPlan {
            start: 9,
            count: Some(1),
            only: vec![7, 3, 5, 42],
            ..WalkPlan::default()
        };
        assert_eq!(ordinals(&select_items(&items(10), &plan, Some(2))), vec![3, 5, 7]);
        assert_eq!(count_limit(&plan), None);
    }

    #[test]
    fn zero_start_means_current_only() {
        let plan = WalkPlan {
            start: 0,
            ..WalkPlan::default()
        };
        assert_eq!(ordinals(&select_items(&items(10), &plan, Some(4))), vec![4]);
        assert!(select_items(&items(10), &plan, None).is_empty());
    }

    #[test]
    fn start_past_end_is_empty() {
        let plan = WalkPlan {
            start: 11,
            ..WalkPlan::default()
        };
        assert!(select_items(&items(10), &plan, None).is_empty());
        let plan = WalkPlan {
            start: 10,
            ..WalkPlan::default()
        };
        assert_eq!(ordinals(&select_items(&items(10), &plan, None)), vec![10]);
    }

    #[test]
    fn parses_ordinal_lists() {
        assert_eq!(parse_ordinal_list("3,5,7").unwrap(), vec![3, 5, 7]);
        assert_eq!(parse_ordinal_list("10-12, 3 3").unwrap(), vec![10, 11, 12, 3]);
        assert!(parse_ordinal_list("0").is_err());
        assert!(parse_ordinal_list("5-2").is_err());
        assert!(parse_ordinal_list("x").is_err());
        assert!(parse_ordinal_list("").unwrap().is_empty());
    }
}
