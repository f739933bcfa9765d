//! Colorimetric conversion through a CIE XYZ (D65) pivot space.
//!
//! - [`math`] — 3×3 matrices and per-channel transfer functions
//! - [`space`] — the fixed registry of convertible color spaces
//! - [`engine`] — parse / convert / format front-end

pub mod engine;
pub mod math;
pub mod space;

pub use engine::ConversionEngine;
pub use math::{Mat3, Transfer};
pub use space::{ColorSpaceDescriptor, D65, InputMode, SpaceRegistry, SpaceTransform, Xyz};
