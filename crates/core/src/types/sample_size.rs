//! Cohort width for a channel's selection.

use core::fmt;
use core::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`SampleSize`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SampleSizeError {
    /// The value is zero or negative.
    #[error("sample size must be at least 1, got {0}")]
    NotPositive(i64),
    /// The value is larger than the supported maximum.
    #[error("sample size must be at most {max}")]
    TooLarge {
        /// Maximum allowed value.
        max: u32,
    },
    /// The input is not an integer.
    #[error("sample size must be a whole number: {0:?}")]
    NotANumber(String),
}

/// How many of the least-recently-picked candidates are eligible for a pick.
///
/// `1` means strict oldest-first; larger values trade fairness for
/// unpredictability. A `SampleSize` is always at least 1.
///
/// ## Examples
///
/// ```
/// use pickem_core::SampleSize;
///
/// assert_eq!(SampleSize::new(3).unwrap().get(), 3);
/// assert!(SampleSize::new(0).is_err());
/// assert!("-2".parse::<SampleSize>().is_err());
/// assert_eq!(SampleSize::default().get(), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SampleSize(NonZeroU32);

impl SampleSize {
    /// Strict oldest-first selection.
    pub const ONE: Self = Self(NonZeroU32::MIN);

    /// Create a sample size, rejecting values below 1.
    ///
    /// # Errors
    ///
    /// Returns `SampleSizeError::NotPositive` for values < 1 and
    /// `SampleSizeError::TooLarge` for values that do not fit in a `u32`.
    pub fn new(value: i64) -> Result<Self, SampleSizeError> {
        if value < 1 {
            return Err(SampleSizeError::NotPositive(value));
        }
        let value = u32::try_from(value).map_err(|_| SampleSizeError::TooLarge { max: u32::MAX })?;
        NonZeroU32::new(value)
            .map(Self)
            .ok_or(SampleSizeError::NotPositive(0))
    }

    /// Create a sample size, clamping anything below 1 up to 1.
    #[must_use]
    pub fn clamped(value: i64) -> Self {
        Self::new(value).unwrap_or_else(|err| match err {
            SampleSizeError::TooLarge { .. } => Self(NonZeroU32::MAX),
            SampleSizeError::NotPositive(_) | SampleSizeError::NotANumber(_) => Self::ONE,
        })
    }

    /// Returns the value as a `u32`.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// Returns the value as a `usize`, for slicing candidate lists.
    #[must_use]
    pub fn as_usize(self) -> usize {
        usize::try_from(self.0.get()).unwrap_or(usize::MAX)
    }
}

impl Default for SampleSize {
    fn default() -> Self {
        Self::ONE
    }
}

impl fmt::Display for SampleSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SampleSize {
    type Err = SampleSizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: i64 = s
            .trim()
            .parse()
            .map_err(|_| SampleSizeError::NotANumber(s.to_owned()))?;
        Self::new(value)
    }
}

impl From<SampleSize> for u32 {
    fn from(size: SampleSize) -> Self {
        size.get()
    }
}
