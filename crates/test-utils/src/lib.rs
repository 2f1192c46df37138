//! Shared test utilities for the chunked-data-view workspace.
//!
//! This crate provides common testing infrastructure including:
//! - A synthetic GRIB2 message builder
//! - Predictable record payloads
//! - Memory and directory stores seeded from a request
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! ```ignore
//! use test_utils::{assert_approx_eq, seeded_memory_store};
//! ```

pub mod fixtures;
pub mod generators;
pub mod grib;

pub use fixtures::*;
pub use generators::*;
pub use grib::Grib2Builder;

/// Macro for approximate floating-point equality assertions.
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f32, 1.0_f32, 0.001_f32);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Element-wise approximate equality of two float slices.
///
/// `NaN` only equals `NaN`.
///
/// ```ignore
/// use test_utils::assert_slice_approx_eq;
///
/// assert_slice_approx_eq!(&[1.0, f32::NAN], &[1.00001, f32::NAN], 1e-3);
/// ```
#[macro_export]
macro_rules! assert_slice_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left = $left;
        let right = $right;
        assert_eq!(left.len(), right.len(), "slice lengths differ");
        for (i, (l, r)) in left.iter().zip(right.iter()).enumerate() {
            let (l, r) = (*l as f64, *r as f64);
            if l.is_nan() || r.is_nan() {
                if !(l.is_nan() && r.is_nan()) {
                    panic!("assertion failed at index {}: `{:?}` vs `{:?}`", i, l, r);
                }
                continue;
            }
            if (l - r).abs() > $epsilon as f64 {
                panic!(
                    "assertion failed at index {}: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`",
                    i, l, r
                );
            }
        }
    }};
}
