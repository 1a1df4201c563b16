//! Typed quantities for grid data.
//!
//! Line ratings (MVA), set-points (MW/Mvar), nominal voltages (kV), route
//! lengths (km) are all plain `f64` in the input tables. Wrapping
//! them keeps a MW value from being compared against an MVA rating by
//! accident.
//!
//! ```
//! use hq_core::units::{Kilometers, Kilovolts, Megawatts};
//!
//! let flow = Megawatts(1200.0) + Megawatts(300.0);
//! assert_eq!(flow.value(), 1500.0);
//!
//! let z_base = Kilovolts(735.0).base_impedance(100.0);
//! assert!((z_base - 5402.25).abs() < 1e-9);
//!
//! assert_eq!(Kilometers(232.6).rounded(), 233);
//! ```

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

/// Declares an `f64` newtype with additive arithmetic, scaling,
/// summation and a `value <symbol>` Display (two decimals by default).
macro_rules! quantity {
    ($(#[$meta:meta])* $name:ident, $symbol:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub f64);

        impl $name {
            #[inline]
            pub const fn value(self) -> f64 {
                self.0
            }
        }

        impl Add for $name {
            type Output = Self;
            fn add(self, rhs: Self) -> Self {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $name {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self {
                Self(self.0 - rhs.0)
            }
        }

        impl Mul<f64> for $name {
            type Output = Self;
            fn mul(self, factor: f64) -> Self {
                Self(self.0 * factor)
            }
        }

        impl Sum for $name {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                Self(iter.map(|q| q.0).sum())
            }
        }

        impl<'a> Sum<&'a $name> for $name {
            fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
                Self(iter.map(|q| q.0).sum())
            }
        }

        impl From<$name> for f64 {
            fn from(q: $name) -> f64 {
                q.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let digits = f.precision().unwrap_or(2);
                write!(f, "{:.*} {}", digits, self.0, $symbol)
            }
        }
    };
}

quantity!(
    /// Active power: set-points, capacities, line flows.
    Megawatts,
    "MW"
);
quantity!(
    /// Reactive power and its generator limits.
    Megavars,
    "Mvar"
);
quantity!(
    /// Apparent power, the unit of line ratings (`s_nom`).
    MegavoltAmperes,
    "MVA"
);
quantity!(
    /// Voltage magnitude on the bus nominal base.
    PerUnit,
    "pu"
);
quantity!(
    /// Nominal bus voltage.
    Kilovolts,
    "kV"
);
quantity!(
    /// Route length of a line.
    Kilometers,
    "km"
);

impl Kilovolts {
    /// Z_base = V² / S_base in ohms.
    pub fn base_impedance(self, base_mva: f64) -> f64 {
        self.0 * self.0 / base_mva
    }
}

impl Kilometers {
    /// Whole kilometres, as line tables report them.
    pub fn rounded(self) -> i64 {
        self.0.round() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flows_add_and_scale() {
        let total = Megawatts(1900.0) + Megawatts(300.0) - Megawatts(200.0);
        assert_eq!(total.value(), 2000.0);
        assert_eq!((total * 0.1).value(), 200.0);
    }

    #[test]
    fn base_impedance_of_735_kv() {
        assert!((Kilovolts(735.0).base_impedance(100.0) - 5402.25).abs() < 1e-9);
        assert!((Kilovolts(315.0).base_impedance(1000.0) - 99.225).abs() < 1e-9);
    }

    #[test]
    fn route_lengths_round_to_whole_km() {
        assert_eq!(Kilometers(232.6).rounded(), 233);
        assert_eq!(Kilometers(0.4).rounded(), 0);
        let route: Kilometers = [Kilometers(450.0), Kilometers(230.0)].iter().sum();
        assert_eq!(route.value(), 680.0);
    }

    #[test]
    fn display_uses_symbol_and_precision() {
        assert_eq!(Megawatts(100.0).to_string(), "100.00 MW");
        assert_eq!(format!("{:.0}", Kilometers(233.4)), "233 km");
        assert_eq!(format!("{:.3}", PerUnit(1.02)), "1.020 pu");
    }
}
