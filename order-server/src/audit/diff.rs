//! 订单行 diff 计算
//!
//! 按 productId 比较编辑前后的订单行，生成类型化的 [`LineChange`]：
//! - 仅新行存在 → `Added`
//! - 仅旧行存在 → `Removed`
//! - 两边都有且数量不同 → `Modified`
//! - 数量未变 → 不产生记录（单价变化不计入）
//!
//! 输出按 productId 升序，保证同一输入得到同一审计内容（参与哈希链）。

use std::collections::BTreeMap;

use shared::order::{LineChange, OrderLine};

/// Sum quantities per product
fn quantities(lines: &[OrderLine]) -> BTreeMap<i64, i32> {
    let mut map = BTreeMap::new();
    for line in lines {
        *map.entry(line.product_id).or_insert(0) += line.quantity;
    }
    map
}

/// Diff two line lists by product id
pub fn diff_lines(old: &[OrderLine], new: &[OrderLine]) -> Vec<LineChange> {
    let old_qty = quantities(old);
    let new_qty = quantities(new);

    let mut product_ids: Vec<i64> = old_qty.keys().chain(new_qty.keys()).copied().collect();
    product_ids.sort_unstable();
    product_ids.dedup();

    product_ids
        .into_iter()
        .filter_map(|product_id| {
            match (old_qty.get(&product_id), new_qty.get(&product_id)) {
                (None, Some(&to_qty)) => Some(LineChange::Added { product_id, to_qty }),
                (Some(&from_qty), None) => Some(LineChange::Removed {
                    product_id,
                    from_qty,
                }),
                (Some(&from_qty), Some(&to_qty)) if from_qty != to_qty => {
                    Some(LineChange::Modified {
                        product_id,
                        from_qty,
                        to_qty,
                    })
                }
                _ => None,
            }
        })
        .collect()
}

/// Changes recorded for a newly created order: every line as `Added`
pub fn all_added(lines: &[OrderLine]) -> Vec<LineChange> {
    diff_lines(&[], lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(product_id: i64, quantity: i32) -> OrderLine {
        OrderLine::new(product_id, quantity, dec!(10))
    }

    #[test]
    fn test_diff_added_removed_modified() {
        let old = vec![line(1, 5), line(2, 1), line(3, 4)];
        let new = vec![line(1, 3), line(3, 4), line(4, 2)];

        let changes = diff_lines(&old, &new);
        assert_eq!(
            changes,
            vec![
                LineChange::Modified {
                    product_id: 1,
                    from_qty: 5,
                    to_qty: 3
                },
                LineChange::Removed {
                    product_id: 2,
                    from_qty: 1
                },
                LineChange::Added {
                    product_id: 4,
                    to_qty: 2
                },
            ]
        );
    }

    #[test]
    fn test_diff_no_changes() {
        let lines = vec![line(1, 5), line(2, 1)];
        assert!(diff_lines(&lines, &lines).is_empty());
    }

    #[test]
    fn test_price_only_change_is_not_recorded() {
        let old = vec![OrderLine::new(1, 2, dec!(10))];
        let new = vec![OrderLine::new(1, 2, dec!(12))];
        assert!(diff_lines(&old, &new).is_empty());
    }

    #[test]
    fn test_all_added() {
        let changes = all_added(&[line(2, 2), line(1, 3)]);
        assert_eq!(
            changes,
            vec![
                LineChange::Added {
                    product_id: 1,
                    to_qty: 3
                },
                LineChange::Added {
                    product_id: 2,
                    to_qty: 2
                },
            ]
        );
    }
}
