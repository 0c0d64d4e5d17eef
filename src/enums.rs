// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Mirrors of native enumerations.
//!
//! Each enum carries its native integer value as the discriminant and an
//! `ALL` table listing every variant. Integers with no matching variant are
//! rejected with [`UnknownValue`].

use core::fmt;

/// An integer with no matching variant in a native enum mirror.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{value} is not a valid {kind}")]
pub struct UnknownValue {
    pub kind: &'static str,
    pub value: i32,
}

macro_rules! native_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $value:expr,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
        #[repr(i32)]
        pub enum $name {
            $($(#[$vmeta])* $variant = $value,)+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            pub const fn value(self) -> i32 {
                self as i32
            }
        }

        impl TryFrom<i32> for $name {
            type Error = UnknownValue;

            fn try_from(value: i32) -> Result<Self, UnknownValue> {
                $(
                    if value == $value {
                        return Ok($name::$variant);
                    }
                )+
                Err(UnknownValue {
                    kind: stringify!($name),
                    value,
                })
            }
        }

        impl From<$name> for i32 {
            fn from(value: $name) -> i32 {
                value.value()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                fmt::Debug::fmt(self, f)
            }
        }
    };
}

native_enum! {
    /// How the values in an image should be interpreted.
    ///
    /// The gaps in numbering are historical.
    pub enum Interpretation {
        Error = -1,
        /// generic many-band image
        Multiband = 0,
        /// some kind of single-band image
        BW = 1,
        /// a 1D image, eg. histogram or lookup table
        Histogram = 10,
        Xyz = 12,
        Lab = 13,
        Cmyk = 15,
        Labq = 16,
        Rgb = 17,
        Cmc = 18,
        Lch = 19,
        Labs = 21,
        Srgb = 22,
        Yxy = 23,
        Fourier = 24,
        Rgb16 = 25,
        Grey16 = 26,
        Matrix = 27,
        Scrgb = 28,
        Hsv = 29,
        Oklab = 30,
        Oklch = 31,
    }
}

native_enum! {
    /// Pixel coding of an image.
    pub enum Coding {
        Error = -1,
        None = 0,
        /// 32-bit packed Lab
        Labq = 2,
        /// Radiance RGBE
        Rad = 6,
    }
}

native_enum! {
    /// Resampling kernels.
    pub enum Kernel {
        Nearest = 0,
        Linear = 1,
        Cubic = 2,
        Mitchell = 3,
        Lanczos2 = 4,
        Lanczos3 = 5,
        Mks2013 = 6,
        Mks2021 = 7,
    }
}

native_enum! {
    /// How to generate pixels outside an image.
    pub enum Extend {
        Black = 0,
        Copy = 1,
        Repeat = 2,
        Mirror = 3,
        White = 4,
        Background = 5,
    }
}

native_enum! {
    pub enum Align {
        Low = 0,
        Centre = 1,
        High = 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn check_table<T>(all: &[T], expected_len: usize)
    where
        T: Copy + Eq + fmt::Debug + Into<i32> + TryFrom<i32, Error = UnknownValue>,
    {
        assert_eq!(all.len(), expected_len);
        let values: HashSet<i32> = all.iter().map(|v| (*v).into()).collect();
        assert_eq!(values.len(), all.len(), "duplicate native values");
        for v in all {
            let raw: i32 = (*v).into();
            assert_eq!(T::try_from(raw), Ok(*v));
        }
    }

    #[test]
    fn tables_are_complete() {
        check_table(Interpretation::ALL, 22);
        check_table(Coding::ALL, 4);
        check_table(Kernel::ALL, 8);
        check_table(Extend::ALL, 6);
        check_table(Align::ALL, 3);
    }

    #[test]
    fn native_values() {
        assert_eq!(Interpretation::Srgb.value(), 22);
        assert_eq!(Interpretation::Error.value(), -1);
        assert_eq!(Coding::Rad.value(), 6);
        assert_eq!(Kernel::Lanczos3.value(), 5);
        assert_eq!(i32::from(Extend::Background), 5);
        assert_eq!(Align::Centre.to_string(), "Centre");
    }

    #[test]
    fn unknown_values_are_rejected() {
        assert_eq!(
            Interpretation::try_from(11),
            Err(UnknownValue {
                kind: "Interpretation",
                value: 11
            })
        );
        assert!(Coding::try_from(1).is_err());
        assert!(Kernel::try_from(8).is_err());
        assert!(Align::try_from(-1).is_err());
        assert_eq!(
            Extend::try_from(42).unwrap_err().to_string(),
            "42 is not a valid Extend"
        );
    }
}
