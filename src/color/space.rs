//! Color space registry: the fixed set of spaces the engine converts
//! between, each defined by its transforms to and from the CIE XYZ pivot.
//!
//! Descriptors are immutable and constructed once at registry build time.
//! Gamma-encoded RGB spaces share one code path (per-channel EOTF plus a
//! 3×3 matrix); CIE L\*u\*v\* and the raw-XYZ passthrough carry their own
//! transforms.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::color::math::{Mat3, Transfer};
use crate::error::BeamError;

// ── Pivot ────────────────────────────────────────────────────────

/// A point in the pivot space: CIE XYZ with a D65 white point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Xyz {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Xyz {
    pub const ZERO: Xyz = Xyz::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// D65 reference white.
pub const D65: Xyz = Xyz::new(0.95047, 1.0, 1.08883);

// CIE 1976 constants, exact rational forms (κ ≈ 903.296296, ε ≈ 0.008856).
const KAPPA: f64 = 24389.0 / 27.0;
const EPSILON: f64 = 216.0 / 24389.0;

// ── InputMode ────────────────────────────────────────────────────

/// How the operator entered a color value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputMode {
    /// `#RRGGBB` or `#RGB`, case-insensitive, leading `#` optional.
    #[serde(rename = "hex")]
    Hex,
    /// Per-component floats in the space's native scale.
    #[serde(rename = "float")]
    Float,
    /// Per-component 8-bit integers, scaled from `[0, 255]`.
    #[serde(rename = "0-255")]
    EightBit,
}

impl fmt::Display for InputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputMode::Hex => f.write_str("hex"),
            InputMode::Float => f.write_str("float"),
            InputMode::EightBit => f.write_str("0-255"),
        }
    }
}

// ── SpaceTransform ───────────────────────────────────────────────

/// The pivot transform pair of one registered space.
#[derive(Debug, Clone, Copy)]
pub enum SpaceTransform {
    /// Gamma-encoded RGB: EOTF per channel, then a linear-to-XYZ matrix.
    /// `from_xyz` is derived from `to_xyz` at compile time.
    GammaRgb {
        transfer: Transfer,
        to_xyz: Mat3,
        from_xyz: Mat3,
    },
    /// CIE 1976 L*u*v*, D65 white.
    CieLuv,
    /// Raw XYZ in, raw XYZ out.
    Passthrough,
}

// ── ColorSpaceDescriptor ─────────────────────────────────────────

/// One registered color space. Immutable after registry construction.
#[derive(Debug, Clone)]
pub struct ColorSpaceDescriptor {
    pub id: &'static str,
    pub name: &'static str,
    /// Ordered component labels, used verbatim in validation errors.
    pub components: [&'static str; 3],
    /// Allowed per-component range in `float` mode, if declared.
    pub float_range: Option<(f64, f64)>,
    /// Allowed per-component range in `0-255` mode, if declared.
    pub int_range: Option<(f64, f64)>,
    pub modes: &'static [InputMode],
    transform: SpaceTransform,
}

impl ColorSpaceDescriptor {
    pub fn supports(&self, mode: InputMode) -> bool {
        self.modes.contains(&mode)
    }

    /// The declared range for a numeric input mode, if any.
    pub fn range_for(&self, mode: InputMode) -> Option<(f64, f64)> {
        match mode {
            InputMode::Float => self.float_range,
            InputMode::EightBit => self.int_range,
            InputMode::Hex => None,
        }
    }

    /// Space-native tuple → pivot.
    pub fn to_pivot(&self, tuple: [f64; 3]) -> Xyz {
        match &self.transform {
            SpaceTransform::GammaRgb { transfer, to_xyz, .. } => {
                let linear = tuple.map(|c| transfer.decode(c));
                let [x, y, z] = to_xyz.mul_vec(linear);
                Xyz::new(x, y, z)
            }
            SpaceTransform::CieLuv => luv_to_xyz(tuple),
            SpaceTransform::Passthrough => Xyz::new(tuple[0], tuple[1], tuple[2]),
        }
    }

    /// Pivot → space-native tuple.
    ///
    /// RGB spaces clamp each linear channel to `[0, 1]` before the gamma
    /// encode. Out-of-gamut pivot points therefore come back displayable;
    /// the loss is deliberate policy, not a defect.
    pub fn from_pivot(&self, pivot: Xyz) -> [f64; 3] {
        match &self.transform {
            SpaceTransform::GammaRgb { transfer, from_xyz, .. } => {
                let linear = from_xyz.mul_vec(pivot.as_array());
                linear.map(|c| transfer.encode(c.clamp(0.0, 1.0)))
            }
            SpaceTransform::CieLuv => xyz_to_luv(pivot),
            SpaceTransform::Passthrough => pivot.as_array(),
        }
    }
}

// ── CIELUV transforms ────────────────────────────────────────────

fn white_chromaticity() -> (f64, f64) {
    let denom = D65.x + 15.0 * D65.y + 3.0 * D65.z;
    (4.0 * D65.x / denom, 9.0 * D65.y / denom)
}

/// XYZ → L*u*v*. Returns the zero vector when the chromaticity denominator
/// `(X + 15Y + 3Z)` is zero or when the computed `L` is zero.
pub fn xyz_to_luv(p: Xyz) -> [f64; 3] {
    let denom = p.x + 15.0 * p.y + 3.0 * p.z;
    if denom == 0.0 {
        return [0.0; 3];
    }
    let yr = p.y / D65.y;
    let l = if yr > EPSILON {
        116.0 * yr.cbrt() - 16.0
    } else {
        KAPPA * yr
    };
    if l == 0.0 {
        return [0.0; 3];
    }
    let (un, vn) = white_chromaticity();
    let u_prime = 4.0 * p.x / denom;
    let v_prime = 9.0 * p.y / denom;
    [l, 13.0 * l * (u_prime - un), 13.0 * l * (v_prime - vn)]
}

/// L*u*v* → XYZ. Returns the zero vector when `L = 0`.
pub fn luv_to_xyz(tuple: [f64; 3]) -> Xyz {
    let [l, u, v] = tuple;
    if l == 0.0 {
        return Xyz::ZERO;
    }
    let (un, vn) = white_chromaticity();
    let u_prime = u / (13.0 * l) + un;
    let v_prime = v / (13.0 * l) + vn;
    // κ·ε == 8 exactly in the rational forms.
    let y = if l > KAPPA * EPSILON {
        ((l + 16.0) / 116.0).powi(3)
    } else {
        l / KAPPA
    } * D65.y;
    if v_prime == 0.0 {
        return Xyz::ZERO;
    }
    let x = y * 9.0 * u_prime / (4.0 * v_prime);
    let z = y * (12.0 - 3.0 * u_prime - 20.0 * v_prime) / (4.0 * v_prime);
    Xyz::new(x, y, z)
}

// ── SpaceRegistry ────────────────────────────────────────────────

const RGB_MODES: &[InputMode] = &[InputMode::Hex, InputMode::Float, InputMode::EightBit];
const FLOAT_ONLY: &[InputMode] = &[InputMode::Float];

// Linear-RGB → XYZ matrices. Every matrix is normalized to the same
// [`D65`] white as the CIELUV transforms: each row sums to the matching
// white component, so `[1, 1, 1]` maps to [`D65`] in every RGB space.
const SRGB_TO_XYZ: Mat3 = Mat3::new([
    [0.4124564, 0.3575761, 0.1804375],
    [0.2126729, 0.7151522, 0.0721750],
    [0.0193339, 0.1191920, 0.9503041],
]);

const DISPLAY_P3_TO_XYZ: Mat3 = Mat3::new([
    [0.4866326, 0.2656632, 0.1981742],
    [0.2290036, 0.6917267, 0.0792697],
    [0.0000000, 0.0451126, 1.0437174],
]);

const REC2020_TO_XYZ: Mat3 = Mat3::new([
    [0.6370102, 0.1446150, 0.1688448],
    [0.2627217, 0.6779893, 0.0592890],
    [0.0000000, 0.0280723, 1.0607577],
]);

const ADOBE_RGB_TO_XYZ: Mat3 = Mat3::new([
    [0.5767309, 0.1855540, 0.1881852],
    [0.2973769, 0.6273491, 0.0752741],
    [0.0270343, 0.0706872, 0.9911085],
]);

/// Invert a forward matrix at compile time. A singular table fails the
/// build rather than panicking at runtime.
const fn invert(m: Mat3) -> Mat3 {
    match m.inverse() {
        Some(inv) => inv,
        None => panic!("registry matrix is not invertible"),
    }
}

const SRGB_FROM_XYZ: Mat3 = invert(SRGB_TO_XYZ);
const DISPLAY_P3_FROM_XYZ: Mat3 = invert(DISPLAY_P3_TO_XYZ);
const REC2020_FROM_XYZ: Mat3 = invert(REC2020_TO_XYZ);
const ADOBE_RGB_FROM_XYZ: Mat3 = invert(ADOBE_RGB_TO_XYZ);

/// Fixed set of spaces known to the engine. Built once at process start.
#[derive(Debug)]
pub struct SpaceRegistry {
    spaces: Vec<ColorSpaceDescriptor>,
}

impl SpaceRegistry {
    /// The built-in registry: four gamma-encoded RGB spaces, CIELUV, and a
    /// raw-XYZ passthrough.
    pub fn builtin() -> Self {
        let rgb = |id, name, transfer, to_xyz, from_xyz| ColorSpaceDescriptor {
            id,
            name,
            components: ["R", "G", "B"],
            float_range: Some((0.0, 1.0)),
            int_range: Some((0.0, 255.0)),
            modes: RGB_MODES,
            transform: SpaceTransform::GammaRgb {
                transfer,
                to_xyz,
                from_xyz,
            },
        };

        Self {
            spaces: vec![
                rgb("srgb", "sRGB", Transfer::Srgb, SRGB_TO_XYZ, SRGB_FROM_XYZ),
                rgb(
                    "display-p3",
                    "Display P3",
                    Transfer::Srgb,
                    DISPLAY_P3_TO_XYZ,
                    DISPLAY_P3_FROM_XYZ,
                ),
                rgb(
                    "rec2020",
                    "Rec. 2020",
                    Transfer::Rec2020,
                    REC2020_TO_XYZ,
                    REC2020_FROM_XYZ,
                ),
                rgb(
                    "adobe-rgb",
                    "Adobe RGB (1998)",
                    Transfer::Gamma22,
                    ADOBE_RGB_TO_XYZ,
                    ADOBE_RGB_FROM_XYZ,
                ),
                ColorSpaceDescriptor {
                    id: "cieluv",
                    name: "CIE L*u*v*",
                    components: ["L", "u", "v"],
                    float_range: None,
                    int_range: None,
                    modes: FLOAT_ONLY,
                    transform: SpaceTransform::CieLuv,
                },
                ColorSpaceDescriptor {
                    id: "xyz",
                    name: "CIE XYZ",
                    components: ["X", "Y", "Z"],
                    float_range: None,
                    int_range: None,
                    modes: FLOAT_ONLY,
                    transform: SpaceTransform::Passthrough,
                },
            ],
        }
    }

    pub fn get(&self, id: &str) -> Result<&ColorSpaceDescriptor, BeamError> {
        self.spaces
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| BeamError::UnknownSpace(id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColorSpaceDescriptor> {
        self.spaces.iter()
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.spaces.iter().map(|s| s.id).collect()
    }
}
