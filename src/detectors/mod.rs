//! Candlestick pattern detectors
//!
//! One detector per pattern family. Families whose bullish and bearish forms
//! are mutually exclusive on the same bars (engulfing, harami, marubozu, ...)
//! share a detector that reports whichever form matched.
//!
//! # Pattern Categories
//!
//! - **Single-bar (10 kinds)**: Doji family, Hammer family, Spinning Top, Marubozu
//! - **Two-bar (8 kinds)**: Engulfing, Piercing/Dark Cloud, Harami, Tweezers
//! - **Three-bar (6 kinds)**: Morning/Evening Star, Soldiers/Crows, Three Inside
//! - **Five-bar (2 kinds)**: Rising/Falling Three Methods

pub mod helpers;

/// Generate `with_defaults()` -> `Self::default()` for multiple detector types.
macro_rules! impl_with_defaults {
  ($($detector:ty),* $(,)?) => {
    $(impl $detector {
      pub fn with_defaults() -> Self { Self::default() }
    })*
  };
}

pub mod multi_bar;
pub mod single_bar;
pub mod three_bar;
pub mod two_bar;

// Re-export all detectors for convenience
pub use helpers::*;
pub use multi_bar::*;
pub use single_bar::*;
pub use three_bar::*;
pub use two_bar::*;
