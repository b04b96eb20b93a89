//! 击中拆分 / 合并
//!
//! 拆分：按份额 f 与 1-f 缩放全部能量与权重，两个子击中继承原始击中与 MC 权重；
//! 合并：同一原始击中的两个碎片相加。两者都要求能量守恒（在配置容差内）。

pub mod ledger;

pub use ledger::{FragmentKind, FragmentLedger, LedgerEntry};

/// 各部分之和与总量的相对偏差是否在容差内
pub fn conserves_energy(parts: &[f32], total: f32, tolerance: f32) -> bool {
    let sum: f32 = parts.iter().sum();
    (sum - total).abs() <= tolerance * total.abs().max(1.0)
}

/// 拆分比例须严格落在 (eps, 1 - eps)
pub fn is_valid_fraction(fraction: f32, epsilon: f32) -> bool {
    fraction.is_finite() && fraction > epsilon && fraction < 1.0 - epsilon
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraction_bounds() {
        assert!(is_valid_fraction(0.5, 1e-6));
        assert!(!is_valid_fraction(0.0, 1e-6));
        assert!(!is_valid_fraction(1.0, 1e-6));
        assert!(!is_valid_fraction(f32::NAN, 1e-6));
        assert!(!is_valid_fraction(0.05, 0.1));
    }

    #[test]
    fn test_conserves_energy() {
        assert!(conserves_energy(&[3.0, 7.0], 10.0, 1e-4));
        assert!(!conserves_energy(&[3.0, 6.0], 10.0, 1e-4));
    }
}
