//! Conversions between [`types::Atoms`] (arbitrary-precision, `BigUint`) and
//! the `NUMERIC` columns atoms are stored in, plus the UI-scale `Decimal` <->
//! `NUMERIC` conversions aggregators need. Both routed through the decimal
//! string representation so no intermediate float ever appears.

use bigdecimal::BigDecimal;
use rust_decimal::Decimal;
use std::str::FromStr;
use types::Atoms;

pub fn atoms_to_numeric(atoms: &Atoms) -> BigDecimal {
    BigDecimal::from_str(&atoms.to_string()).expect("Atoms always renders as a valid decimal integer")
}

pub fn numeric_to_atoms(value: &BigDecimal) -> Option<Atoms> {
    Atoms::parse(&value.to_string()).ok()
}

/// UI-scale `Decimal` (candle OHLC, fee UI balances) to the `NUMERIC` a
/// Postgres column holds. `Decimal` always renders as a plain decimal
/// string, so this cannot fail.
pub fn decimal_to_numeric(value: Decimal) -> BigDecimal {
    BigDecimal::from_str(&value.to_string()).expect("Decimal always renders as a valid decimal string")
}

pub fn numeric_to_decimal(value: &BigDecimal) -> Option<Decimal> {
    Decimal::from_str(&value.to_string()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn round_trips_through_numeric() {
        let atoms = Atoms::parse("123456789012345678901234567890").unwrap();
        let numeric = atoms_to_numeric(&atoms);
        assert_eq!(numeric_to_atoms(&numeric).unwrap(), atoms);
    }

    #[test]
    fn decimal_round_trips_through_numeric() {
        let value = dec!(123.456);
        let numeric = decimal_to_numeric(value);
        assert_eq!(numeric_to_decimal(&numeric).unwrap(), value);
    }
}
