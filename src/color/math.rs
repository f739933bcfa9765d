//! Small numeric kernel for the conversion engine: 3×3 matrices and the
//! per-channel transfer functions of the gamma-encoded RGB spaces.

// ── Mat3 ─────────────────────────────────────────────────────────

/// Row-major 3×3 matrix over `f64`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat3(pub [[f64; 3]; 3]);

impl Mat3 {
    pub const IDENTITY: Mat3 = Mat3([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);

    pub const fn new(rows: [[f64; 3]; 3]) -> Self {
        Self(rows)
    }

    /// Matrix-vector product.
    pub fn mul_vec(&self, v: [f64; 3]) -> [f64; 3] {
        let m = &self.0;
        [
            m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
            m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
            m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
        ]
    }

    pub const fn determinant(&self) -> f64 {
        let m = &self.0;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }

    /// Cofactor inverse. Returns `None` for a singular matrix.
    ///
    /// Const-evaluable, so the registry's XYZ→RGB matrices are derived
    /// from the forward data at compile time and stay exactly consistent
    /// with it.
    pub const fn inverse(&self) -> Option<Mat3> {
        let det = self.determinant();
        if det < 1e-12 && det > -1e-12 {
            return None;
        }
        let m = &self.0;
        let inv_det = 1.0 / det;
        Some(Mat3([
            [
                (m[1][1] * m[2][2] - m[1][2] * m[2][1]) * inv_det,
                (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv_det,
                (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv_det,
            ],
            [
                (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * inv_det,
                (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv_det,
                (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv_det,
            ],
            [
                (m[1][0] * m[2][1] - m[1][1] * m[2][0]) * inv_det,
                (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv_det,
                (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv_det,
            ],
        ]))
    }
}

// ── Transfer functions ───────────────────────────────────────────

/// Electro-optical transfer function of a gamma-encoded RGB space.
///
/// `decode` maps an encoded channel value to linear light, `encode` is the
/// exact inverse. Inputs are expected in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    /// sRGB / Display-P3 piecewise curve, breakpoint 0.04045.
    Srgb,
    /// Rec.2020 piecewise curve, breakpoint 0.08145.
    Rec2020,
    /// Pure power 2.2 curve (Adobe RGB).
    Gamma22,
}

// sRGB piecewise constants.
const SRGB_ENCODED_CUT: f64 = 0.04045;
const SRGB_LINEAR_CUT: f64 = 0.003_130_8;

// Rec.2020 piecewise constants (4.5 · 0.0181 = 0.08145).
const REC2020_ENCODED_CUT: f64 = 0.08145;
const REC2020_LINEAR_CUT: f64 = 0.0181;
const REC2020_ALPHA: f64 = 1.0993;

impl Transfer {
    /// Encoded value → linear light.
    pub fn decode(self, c: f64) -> f64 {
        match self {
            Transfer::Srgb => {
                if c <= SRGB_ENCODED_CUT {
                    c / 12.92
                } else {
                    ((c + 0.055) / 1.055).powf(2.4)
                }
            }
            Transfer::Rec2020 => {
                if c < REC2020_ENCODED_CUT {
                    c / 4.5
                } else {
                    ((c + (REC2020_ALPHA - 1.0)) / REC2020_ALPHA).powf(1.0 / 0.45)
                }
            }
            Transfer::Gamma22 => c.powf(2.2),
        }
    }

    /// Linear light → encoded value.
    pub fn encode(self, l: f64) -> f64 {
        match self {
            Transfer::Srgb => {
                if l <= SRGB_LINEAR_CUT {
                    l * 12.92
                } else {
                    1.055 * l.powf(1.0 / 2.4) - 0.055
                }
            }
            Transfer::Rec2020 => {
                if l < REC2020_LINEAR_CUT {
                    l * 4.5
                } else {
                    REC2020_ALPHA * l.powf(0.45) - (REC2020_ALPHA - 1.0)
                }
            }
            Transfer::Gamma22 => l.powf(1.0 / 2.2),
        }
    }
}
