//! `AlignedNumber`: a scalar that carries an over-alignment requirement.
//!
//! Wrapping a number as `AlignedNumber<f64, Align16>` raises its alignment
//! to 16 bytes while arithmetic keeps behaving like the bare `f64`. This
//! makes code that assumes "a scalar is 8-byte aligned" trip over the
//! stricter requirement, and gives the misalignment harness an over-aligned
//! numeric type to exercise.
//!
//! # Memory layout
//! `#[repr(C)]` with the value first and a zero-length `[A; 0]` after it:
//! `align_of` is `max(align_of::<T>(), A::ALIGNMENT)` and `size_of` is
//! `size_of::<T>()` rounded up to that alignment.

use core::cmp::Ordering;
use core::fmt;
use core::iter::{Product, Sum};
use core::ops::{
    Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Rem, RemAssign, Sub, SubAssign,
};

use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};

use crate::align::{Align16, Alignment};

/// A number of type `T` aligned to at least `A::ALIGNMENT` bytes.
#[derive(Copy, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: Deserialize<'de>"))]
#[repr(C)]
pub struct AlignedNumber<T, A: Alignment = Align16> {
    value: T,
    #[serde(skip)]
    _align: [A; 0],
}

impl<T, A: Alignment> AlignedNumber<T, A> {
    /// Combined alignment of the wrapper.
    pub const ALIGNMENT: usize = core::mem::align_of::<Self>();

    #[inline]
    pub const fn new(value: T) -> Self {
        AlignedNumber { value, _align: [] }
    }

    #[inline]
    pub fn value(&self) -> &T {
        &self.value
    }

    #[inline]
    pub fn value_mut(&mut self) -> &mut T {
        &mut self.value
    }

    #[inline]
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T, A: Alignment> From<T> for AlignedNumber<T, A> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: fmt::Debug, A: Alignment> fmt::Debug for AlignedNumber<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AlignedNumber").field(&self.value).finish()
    }
}

impl<T: fmt::Display, A: Alignment> fmt::Display for AlignedNumber<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value.fmt(f)
    }
}

impl<T: PartialEq, A: Alignment> PartialEq for AlignedNumber<T, A> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T: Eq, A: Alignment> Eq for AlignedNumber<T, A> {}

impl<T: PartialOrd, A: Alignment> PartialOrd for AlignedNumber<T, A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.value.partial_cmp(&other.value)
    }
}

impl<T: Ord, A: Alignment> Ord for AlignedNumber<T, A> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.cmp(&other.value)
    }
}

// -----------------------------------------------------------------------------
// Arithmetic
// -----------------------------------------------------------------------------

macro_rules! binary_op {
    ($($Op:ident::$op:ident, $OpAssign:ident::$op_assign:ident);* $(;)?) => { $(
        impl<T: $Op<Output = T>, A: Alignment> $Op for AlignedNumber<T, A> {
            type Output = Self;
            #[inline]
            fn $op(self, rhs: Self) -> Self {
                Self::new($Op::$op(self.value, rhs.value))
            }
        }

        impl<T: $Op<Output = T>, A: Alignment> $Op<T> for AlignedNumber<T, A> {
            type Output = Self;
            #[inline]
            fn $op(self, rhs: T) -> Self {
                Self::new($Op::$op(self.value, rhs))
            }
        }

        impl<T: $OpAssign, A: Alignment> $OpAssign for AlignedNumber<T, A> {
            #[inline]
            fn $op_assign(&mut self, rhs: Self) {
                $OpAssign::$op_assign(&mut self.value, rhs.value);
            }
        }

        impl<T: $OpAssign, A: Alignment> $OpAssign<T> for AlignedNumber<T, A> {
            #[inline]
            fn $op_assign(&mut self, rhs: T) {
                $OpAssign::$op_assign(&mut self.value, rhs);
            }
        }
    )* };
}

binary_op!(
    Add::add, AddAssign::add_assign;
    Sub::sub, SubAssign::sub_assign;
    Mul::mul, MulAssign::mul_assign;
    Div::div, DivAssign::div_assign;
    Rem::rem, RemAssign::rem_assign;
);

impl<T: Neg<Output = T>, A: Alignment> Neg for AlignedNumber<T, A> {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.value)
    }
}

impl<T: Zero, A: Alignment> Zero for AlignedNumber<T, A> {
    fn zero() -> Self {
        Self::new(T::zero())
    }

    fn is_zero(&self) -> bool {
        self.value.is_zero()
    }
}

impl<T: One, A: Alignment> One for AlignedNumber<T, A> {
    fn one() -> Self {
        Self::new(T::one())
    }
}

impl<T: Zero, A: Alignment> Sum for AlignedNumber<T, A> {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, x| acc + x)
    }
}

impl<T: One, A: Alignment> Product for AlignedNumber<T, A> {
    fn product<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::one(), |acc, x| acc * x)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::{is_aligned, Align32};

    type A64 = AlignedNumber<f64>;

    #[test]
    fn arithmetic_matches_inner() {
        let a = A64::new(6.0);
        let b = A64::from(1.5);
        assert_eq!((a + b).into_inner(), 7.5);
        assert_eq!((a - b).into_inner(), 4.5);
        assert_eq!((a * b).into_inner(), 9.0);
        assert_eq!((a / b).into_inner(), 4.0);
        assert_eq!((a % b).into_inner(), 0.0);
        assert_eq!((-a).into_inner(), -6.0);
        assert_eq!((a * 2.0_f64).into_inner(), 12.0);
    }

    #[test]
    fn assign_ops() {
        let mut x = AlignedNumber::<i32, Align32>::new(10);
        x += AlignedNumber::new(5);
        x -= 3_i32;
        x *= 2_i32;
        x /= AlignedNumber::new(4);
        x %= 4_i32;
        assert_eq!(*x.value(), 2);
        *x.value_mut() = 9;
        assert_eq!(x.into_inner(), 9);
    }

    #[test]
    fn zero_one_sum_product() {
        assert!(A64::zero().is_zero());
        assert_eq!(A64::one().into_inner(), 1.0);
        let v: Vec<A64> = [1.0, 2.0, 3.0].into_iter().map(A64::new).collect();
        assert_eq!(v.iter().copied().sum::<A64>().into_inner(), 6.0);
        assert_eq!(v.into_iter().product::<A64>().into_inner(), 6.0);
    }

    #[test]
    fn comparisons_and_formatting() {
        let a = A64::new(1.0);
        let b = A64::new(2.0);
        assert!(a < b);
        assert_eq!(a, A64::new(1.0));
        assert_eq!(format!("{a}"), "1");
        assert_eq!(format!("{b:?}"), "AlignedNumber(2.0)");
        let mut ints = vec![AlignedNumber::<u8, Align16>::new(3), AlignedNumber::new(1)];
        ints.sort();
        assert_eq!(*ints[0].value(), 1);
    }

    #[test]
    fn values_and_arrays_are_aligned() {
        let x = A64::new(0.5);
        assert!(is_aligned(&x as *const A64, 16));
        let arr = [A64::new(1.0); 3];
        for item in &arr {
            assert!(is_aligned(item as *const A64, 16));
        }
    }

    #[test]
    fn serde_is_transparent() {
        let x = A64::new(2.25);
        let json = serde_json::to_string(&x).unwrap();
        assert_eq!(json, "2.25");
        let back: A64 = serde_json::from_str(&json).unwrap();
        assert_eq!(back, x);
    }
}
