//! 放量筛选
//!
//! 无状态的纯函数：输入本周期所有快照，输出排序后的前 N 只股票

use crate::models::{ScreenResult, ScreenRow, SymbolSnapshot};

/// 1 crore = 10,000,000
pub const CRORE: f64 = 1e7;

/// 筛选条件
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenCriteria {
    /// 最小放量倍数（含）
    pub min_spike_ratio: f64,
    /// 最小市值（不含），单位卢比
    pub min_market_cap: f64,
    /// 返回数量上限
    pub top_n: usize,
}

impl Default for ScreenCriteria {
    fn default() -> Self {
        Self {
            min_spike_ratio: 10.0,
            min_market_cap: 1000.0 * CRORE,
            top_n: 10,
        }
    }
}

/// 使用默认条件筛选：放量 >= 10 倍，市值 > 1000 亿卢比（crore），取前 10
pub fn screen(snapshots: &[SymbolSnapshot]) -> ScreenResult {
    screen_with(snapshots, &ScreenCriteria::default())
}

/// 按指定条件筛选
pub fn screen_with(snapshots: &[SymbolSnapshot], criteria: &ScreenCriteria) -> ScreenResult {
    let mut rows: Vec<ScreenRow> = snapshots
        .iter()
        .filter_map(|s| {
            // 基准为 0 视为不合格，而不是无穷大
            let spike_ratio = s.spike_ratio()?;
            if spike_ratio >= criteria.min_spike_ratio && s.market_cap > criteria.min_market_cap {
                Some(ScreenRow {
                    symbol: s.symbol.clone(),
                    name: s.name.clone(),
                    current_volume: s.current_volume,
                    baseline_volume: s.baseline_volume,
                    spike_ratio,
                    market_cap: s.market_cap,
                })
            } else {
                None
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.current_volume
            .cmp(&a.current_volume)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
    rows.truncate(criteria.top_n);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(symbol: &str, baseline: f64, current: u64, cap: f64) -> SymbolSnapshot {
        SymbolSnapshot {
            symbol: symbol.to_string(),
            name: format!("{} Ltd", symbol),
            baseline_volume: baseline,
            current_volume: current,
            market_cap: cap,
        }
    }

    #[test]
    fn test_concrete_scenario() {
        println!("\n========== 测试筛选示例 ==========");
        let snapshots = vec![
            snap("A", 100.0, 1500, 2e10),
            snap("B", 50.0, 400, 2e10),
            snap("C", 0.0, 900, 2e10),
            snap("D", 100.0, 1200, 5e9),
        ];

        let result = screen(&snapshots);
        for row in &result {
            println!("  {} ratio={:.2} cap={}", row.symbol, row.spike_ratio, row.market_cap);
        }

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].symbol, "A");
        assert_eq!(result[0].spike_ratio, 15.0);
        println!("✅ 筛选示例测试通过！");
    }

    #[test]
    fn test_empty_input() {
        assert!(screen(&[]).is_empty());
    }

    #[test]
    fn test_zero_and_negative_baseline_excluded() {
        let snapshots = vec![
            snap("ZERO", 0.0, 1_000_000, 1e12),
            snap("NEG", -1.0, 1_000_000, 1e12),
        ];
        assert!(screen(&snapshots).is_empty());
    }

    #[test]
    fn test_thresholds_are_exact() {
        let snapshots = vec![
            // 恰好 10 倍：保留
            snap("EXACT", 100.0, 1000, 2e10),
            // 略低于 10 倍：排除
            snap("UNDER", 100.0, 999, 2e10),
            // 市值恰好 1000 crore：排除（要求严格大于）
            snap("CAPEQ", 100.0, 5000, 1e10),
        ];
        let result = screen(&snapshots);
        let symbols: Vec<&str> = result.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["EXACT"]);

        for row in &result {
            assert!(row.current_volume as f64 / row.baseline_volume >= 10.0);
            assert!(row.market_cap > 1e10);
        }
    }

    #[test]
    fn test_sort_and_tie_break() {
        let snapshots = vec![
            snap("ZEE", 10.0, 500, 2e10),
            snap("ABB", 10.0, 500, 2e10),
            snap("MID", 10.0, 700, 2e10),
            snap("TOP", 10.0, 900, 2e10),
        ];
        let result = screen(&snapshots);
        let symbols: Vec<&str> = result.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["TOP", "MID", "ABB", "ZEE"]);
    }

    #[test]
    fn test_truncates_to_top_ten() {
        let snapshots: Vec<SymbolSnapshot> = (0..25)
            .map(|i| snap(&format!("S{:02}", i), 10.0, 100 + i as u64, 2e10))
            .collect();

        let result = screen(&snapshots);
        assert_eq!(result.len(), 10);
        assert_eq!(result[0].symbol, "S24");
        assert_eq!(result[9].symbol, "S15");
        assert!(result.windows(2).all(|w| w[0].current_volume >= w[1].current_volume));
    }

    #[test]
    fn test_length_is_min_of_ten_and_qualifying() {
        let mut snapshots: Vec<SymbolSnapshot> = (0..4)
            .map(|i| snap(&format!("Q{}", i), 10.0, 200 + i as u64, 2e10))
            .collect();
        snapshots.push(snap("LOW", 10.0, 50, 2e10));
        assert_eq!(screen(&snapshots).len(), 4);
    }

    #[test]
    fn test_custom_criteria() {
        let criteria = ScreenCriteria {
            min_spike_ratio: 5.0,
            min_market_cap: 0.0,
            top_n: 1,
        };
        let snapshots = vec![snap("B", 50.0, 400, 1.0), snap("A", 100.0, 600, 1.0)];
        let result = screen_with(&snapshots, &criteria);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].symbol, "A");
    }

    #[test]
    fn test_idempotent() {
        let snapshots = vec![snap("A", 100.0, 1500, 2e10), snap("B", 100.0, 1500, 2e10)];
        assert_eq!(screen(&snapshots), screen(&snapshots));
    }
}
