//! Bin-step and `Q64.64` price helpers for the Pool Reader (§4.3): concentrated
//! liquidity pools quote price as a function of the active bin index and a
//! per-pool basis-point step between adjacent bins.

use rust_decimal::Decimal;
use types::Q64_64;

/// `1 + binStepBps / 10_000`: the per-bin price ratio.
pub fn bin_step_multiplier(bin_step_bps: u16) -> Decimal {
    Decimal::ONE + Decimal::from(bin_step_bps) / Decimal::from(10_000u32)
}

/// `multiplier ^ activeBin`, quote-per-base. Exponentiation by squaring keeps
/// this exact in `Decimal` for any bin magnitude actually seen on-chain.
pub fn price_at_bin(active_bin: i32, bin_step_bps: u16) -> Decimal {
    decimal_pow(bin_step_multiplier(bin_step_bps), active_bin)
}

/// Same as [`price_at_bin`] but encoded as the on-chain `Q64.64` wire format.
pub fn q64_64_at_bin(active_bin: i32, bin_step_bps: u16) -> Option<Q64_64> {
    Q64_64::from_decimal(price_at_bin(active_bin, bin_step_bps)).ok()
}

fn decimal_pow(base: Decimal, exp: i32) -> Decimal {
    if exp == 0 {
        return Decimal::ONE;
    }
    let negative = exp < 0;
    let mut e = exp.unsigned_abs();
    let mut result = Decimal::ONE;
    let mut b = base;
    while e > 0 {
        if e & 1 == 1 {
            result *= b;
        }
        b *= b;
        e >>= 1;
    }
    if negative {
        Decimal::ONE / result
    } else {
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn zero_bin_is_price_one() {
        assert_eq!(price_at_bin(0, 25), Decimal::ONE);
    }

    #[test]
    fn positive_bin_increases_price() {
        let p = price_at_bin(1, 10_000); // 100% step: price doubles
        assert_eq!(p, dec!(2));
    }

    #[test]
    fn negative_bin_is_reciprocal() {
        let up = price_at_bin(3, 100);
        let down = price_at_bin(-3, 100);
        assert!((up * down - Decimal::ONE).abs() < dec!(0.0000000001));
    }
}
