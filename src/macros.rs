/// Implements `From<T>` in both directions for a newtype over an integer primitive.
#[macro_export]
macro_rules! impl_from_primitive {
    ($wrapper:ident, $primitive:ty) => {
        impl From<$primitive> for $wrapper {
            fn from(value: $primitive) -> Self {
                Self(value)
            }
        }

        impl From<$wrapper> for $primitive {
            fn from(wrapper: $wrapper) -> Self {
                wrapper.0
            }
        }
    };
}

/// Implements the arithmetic the ledger needs on integer newtypes:
/// `Add`, `Sub`, `AddAssign`, `SubAssign` (with `Self` and with the raw primitive),
/// `Mul<primitive>` for scaling by a share count, and `Sum`.
#[macro_export]
macro_rules! impl_ledger_arithmetic {
    ($wrapper:ident, $primitive:ty) => {
        impl std::ops::Add for $wrapper {
            type Output = Self;

            fn add(self, other: Self) -> Self {
                Self(self.0 + other.0)
            }
        }

        impl std::ops::Add<$primitive> for $wrapper {
            type Output = Self;

            fn add(self, rhs: $primitive) -> Self::Output {
                Self(self.0 + rhs)
            }
        }

        impl std::ops::AddAssign for $wrapper {
            fn add_assign(&mut self, rhs: Self) {
                self.0 += rhs.0;
            }
        }

        impl std::ops::AddAssign<$primitive> for $wrapper {
            fn add_assign(&mut self, rhs: $primitive) {
                self.0 += rhs;
            }
        }

        impl std::ops::Sub for $wrapper {
            type Output = Self;

            fn sub(self, other: Self) -> Self {
                Self(self.0 - other.0)
            }
        }

        impl std::ops::SubAssign for $wrapper {
            fn sub_assign(&mut self, rhs: Self) {
                self.0 -= rhs.0;
            }
        }

        impl std::ops::SubAssign<$primitive> for $wrapper {
            fn sub_assign(&mut self, rhs: $primitive) {
                self.0 -= rhs;
            }
        }

        impl std::ops::Mul<$primitive> for $wrapper {
            type Output = Self;

            fn mul(self, rhs: $primitive) -> Self::Output {
                Self(self.0 * rhs)
            }
        }

        impl std::iter::Sum for $wrapper {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                iter.fold(Self(0 as $primitive), |acc, x| Self(acc.0 + x.0))
            }
        }
    };
}

/// Implements the `Neg` trait for newtype wrappers around signed numeric types.
#[macro_export]
macro_rules! impl_neg_primitive {
    ($wrapper:ident) => {
        impl std::ops::Neg for $wrapper {
            type Output = Self;

            fn neg(self) -> Self::Output {
                Self(-self.0)
            }
        }
    };
}

/// Forwards `Display` to the wrapped primitive so newtypes print as plain numbers in logs.
#[macro_export]
macro_rules! impl_display_primitive {
    ($wrapper:ident) => {
        impl std::fmt::Display for $wrapper {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(&self.0, f)
            }
        }
    };
}
