//! Variance of generic positions.
//!
//! Variance determines how subtyping of a generic type relates to
//! subtyping of its type arguments:
//!
//! - **Covariant**: `Box[Dog] <: Box[Animal]` if `Dog <: Animal`
//! - **Contravariant**: `Writer[Animal] <: Writer[Dog]` if `Dog <: Animal`
//! - **Invariant**: arguments must match exactly
//! - **Bivariant**: the position is unused; anything goes
//!
//! The rewriting engine threads a current variance through recursion and
//! composes it with the declared variance of each position it enters.

use serde::Serialize;
use std::fmt;
use std::ops::Mul;

/// Variance of a type-parameter position.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Variance {
    /// Position is unused; compatible with everything.
    Bivariant,
    /// Position preserves subtyping.
    Covariant,
    /// Position reverses subtyping.
    Contravariant,
    /// Position requires exact equality.
    Invariant,
}

impl Variance {
    /// Reverse the direction of a position. Invariant and Bivariant are
    /// their own flips.
    #[must_use]
    pub const fn flip(self) -> Variance {
        match self {
            Variance::Covariant => Variance::Contravariant,
            Variance::Contravariant => Variance::Covariant,
            other => other,
        }
    }

    /// Compose the ambient variance with the declared variance of a
    /// position being entered.
    ///
    /// - Bivariant absorbs everything (the position is unused)
    /// - Invariant absorbs next (no subtyping possible)
    /// - Same direction preserves, double negation restores, mixed flips
    #[must_use]
    pub const fn compose(self, other: Variance) -> Variance {
        match (self, other) {
            (Variance::Bivariant, _) | (_, Variance::Bivariant) => Variance::Bivariant,
            (Variance::Invariant, _) | (_, Variance::Invariant) => Variance::Invariant,
            (Variance::Covariant, Variance::Covariant)
            | (Variance::Contravariant, Variance::Contravariant) => Variance::Covariant,
            _ => Variance::Contravariant,
        }
    }

    /// True for covariant positions.
    #[inline]
    pub const fn is_positive(self) -> bool {
        matches!(self, Variance::Covariant)
    }

    /// True for contravariant positions.
    #[inline]
    pub const fn is_negative(self) -> bool {
        matches!(self, Variance::Contravariant)
    }

    #[inline]
    pub const fn is_invariant(self) -> bool {
        matches!(self, Variance::Invariant)
    }

    #[inline]
    pub const fn is_bivariant(self) -> bool {
        matches!(self, Variance::Bivariant)
    }
}

impl Mul for Variance {
    type Output = Variance;

    fn mul(self, rhs: Variance) -> Variance {
        self.compose(rhs)
    }
}

impl fmt::Display for Variance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Variance::Bivariant => "*",
            Variance::Covariant => "+",
            Variance::Contravariant => "-",
            Variance::Invariant => "=",
        };
        f.write_str(symbol)
    }
}

#[cfg(test)]
#[path = "../tests/variance_tests.rs"]
mod tests;
