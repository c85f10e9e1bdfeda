//! Missing-value policy for capacity estimates.
//!
//! Source tables use `0` and empty cells interchangeably for "no estimate".
//! Everything here works on `Option<f64>` where `None` is missing; zero is
//! folded into `None` only where a fallback is allowed to fire.

/// Statistical tier of an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scenario {
    Conservative,
    Neutral,
    Optimistic,
}

impl Scenario {
    pub const ALL: [Scenario; 3] = [
        Scenario::Conservative,
        Scenario::Neutral,
        Scenario::Optimistic,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Scenario::Conservative => "conservative",
            Scenario::Neutral => "neutral",
            Scenario::Optimistic => "optimistic",
        }
    }

    /// Suffix/prefix used by the source columns for this tier.
    pub fn stat(self) -> &'static str {
        match self {
            Scenario::Conservative => "MIN",
            Scenario::Neutral => "MEAN",
            Scenario::Optimistic => "MAX",
        }
    }

    /// Output column holding the tier total, e.g. `neutral estimate Mt`.
    pub fn column(self) -> String {
        format!("{} estimate Mt", self.label())
    }

    /// Output column holding one substance of the tier, e.g. `neutral estimate OIL Mt`.
    pub fn component_column(self, substance: Substance) -> String {
        format!("{} estimate {} Mt", self.label(), substance.label())
    }
}

/// Reservoir content a trap estimate is split into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Substance {
    Aquifer,
    Oil,
    Gas,
}

impl Substance {
    pub const ALL: [Substance; 3] = [Substance::Aquifer, Substance::Oil, Substance::Gas];

    pub fn label(self) -> &'static str {
        match self {
            Substance::Aquifer => "aquifer",
            Substance::Oil => "OIL",
            Substance::Gas => "GAS",
        }
    }
}

/// One value per scenario tier.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Tiers<T> {
    pub conservative: T,
    pub neutral: T,
    pub optimistic: T,
}

impl<T> Tiers<T> {
    pub fn from_fn(mut f: impl FnMut(Scenario) -> T) -> Self {
        Tiers {
            conservative: f(Scenario::Conservative),
            neutral: f(Scenario::Neutral),
            optimistic: f(Scenario::Optimistic),
        }
    }

    pub fn get(&self, s: Scenario) -> &T {
        match s {
            Scenario::Conservative => &self.conservative,
            Scenario::Neutral => &self.neutral,
            Scenario::Optimistic => &self.optimistic,
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> Tiers<U> {
        Tiers {
            conservative: f(&self.conservative),
            neutral: f(&self.neutral),
            optimistic: f(&self.optimistic),
        }
    }
}

/// Zero and NaN count as missing.
#[inline]
pub fn present(v: Option<f64>) -> Option<f64> {
    v.filter(|x| *x != 0.0 && !x.is_nan())
}

/// `primary` unless it is zero or missing, otherwise `secondary` as is.
#[inline]
pub fn resolve(primary: Option<f64>, secondary: Option<f64>) -> Option<f64> {
    present(primary).or_else(|| secondary.filter(|x| !x.is_nan()))
}

/// Sum that stays missing when either side is missing.
#[inline]
pub fn add_strict(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    Some(a? + b?).filter(|x| !x.is_nan())
}

/// Sum over the present values; all-missing sums to zero.
#[inline]
pub fn sum_present(values: &[Option<f64>]) -> f64 {
    values.iter().flatten().filter(|x| !x.is_nan()).sum()
}

/// Cross-tier fill, then floor to zero.
///
/// A zero or missing neutral takes the conservative value; afterwards a zero or
/// missing optimistic takes the (possibly just filled) neutral value. Ordering
/// between tiers is not checked.
pub fn cascade(t: Tiers<Option<f64>>) -> Tiers<f64> {
    let conservative = t.conservative.filter(|x| !x.is_nan());
    let neutral = present(t.neutral).or(conservative);
    let optimistic = present(t.optimistic).or(neutral);

    Tiers {
        conservative: conservative.unwrap_or(0.0),
        neutral: neutral.unwrap_or(0.0),
        optimistic: optimistic.unwrap_or(0.0),
    }
}
