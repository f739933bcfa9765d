//! Conversion engine: parses operator input, routes it through the pivot
//! space, and formats the result for any registered space and input mode.
//!
//! All conversions are space → XYZ → space; no pairwise transforms exist.

use crate::color::space::{InputMode, SpaceRegistry, Xyz};
use crate::error::BeamError;

// ── ConversionEngine ─────────────────────────────────────────────

/// Stateless front-end over the [`SpaceRegistry`].
#[derive(Debug)]
pub struct ConversionEngine {
    registry: SpaceRegistry,
}

impl Default for ConversionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversionEngine {
    pub fn new() -> Self {
        Self {
            registry: SpaceRegistry::builtin(),
        }
    }

    pub fn registry(&self) -> &SpaceRegistry {
        &self.registry
    }

    // ── Parsing ──────────────────────────────────────────────────

    /// Parse raw operator input into the space's native component tuple.
    ///
    /// Numeric modes accept components separated by commas and/or
    /// whitespace; every component must be present and finite, and must
    /// fall inside the range the space declares for the mode. `0-255`
    /// input is scaled to the native `[0, 1]` encoding after validation.
    pub fn parse(&self, space: &str, mode: InputMode, raw: &str) -> Result<[f64; 3], BeamError> {
        let desc = self.registry.get(space)?;
        if !desc.supports(mode) {
            return Err(BeamError::UnsupportedMode {
                space: space.to_string(),
                mode: mode.to_string(),
            });
        }

        match mode {
            InputMode::Hex => parse_hex(raw),
            InputMode::Float | InputMode::EightBit => {
                let parts: Vec<&str> = raw
                    .split(|c: char| c == ',' || c.is_whitespace())
                    .filter(|s| !s.is_empty())
                    .collect();
                if parts.len() < 3 {
                    return Err(BeamError::MissingComponent {
                        label: desc.components[parts.len()],
                        expected: 3,
                        actual: parts.len(),
                    });
                }
                if parts.len() > 3 {
                    return Err(BeamError::TooManyComponents {
                        expected: 3,
                        actual: parts.len(),
                    });
                }

                let range = desc.range_for(mode);
                let mut tuple = [0.0; 3];
                for (i, part) in parts.iter().enumerate() {
                    let label = desc.components[i];
                    let value: f64 = part.parse().map_err(|_| BeamError::InvalidComponent {
                        label,
                        raw: part.to_string(),
                    })?;
                    if !value.is_finite() {
                        return Err(BeamError::InvalidComponent {
                            label,
                            raw: part.to_string(),
                        });
                    }
                    if let Some((min, max)) = range {
                        if value < min || value > max {
                            return Err(BeamError::ComponentOutOfRange {
                                label,
                                value,
                                min,
                                max,
                            });
                        }
                    }
                    tuple[i] = if mode == InputMode::EightBit {
                        value / 255.0
                    } else {
                        value
                    };
                }
                Ok(tuple)
            }
        }
    }

    // ── Pivot conversions ────────────────────────────────────────

    /// Space-native tuple → pivot, rejecting non-finite results.
    pub fn to_pivot(&self, space: &str, tuple: [f64; 3]) -> Result<Xyz, BeamError> {
        let desc = self.registry.get(space)?;
        let pivot = desc.to_pivot(tuple);
        if !pivot.is_finite() {
            return Err(BeamError::NonFinitePivot {
                space: space.to_string(),
            });
        }
        Ok(pivot)
    }

    /// Pivot → space-native tuple, rejecting non-finite results.
    pub fn from_pivot(&self, space: &str, pivot: Xyz) -> Result<[f64; 3], BeamError> {
        let desc = self.registry.get(space)?;
        if !pivot.is_finite() {
            return Err(BeamError::NonFinitePivot {
                space: space.to_string(),
            });
        }
        let tuple = desc.from_pivot(pivot);
        if tuple.iter().any(|c| !c.is_finite()) {
            return Err(BeamError::NonFinitePivot {
                space: space.to_string(),
            });
        }
        Ok(tuple)
    }

    // ── Formatting ───────────────────────────────────────────────

    /// Render a native tuple in the given mode.
    ///
    /// Hex rounds each channel to the nearest of 256 levels and renders
    /// uppercase `#RRGGBB`; float renders 4 decimal places with trailing
    /// zeros trimmed; `0-255` rounds to the nearest whole number.
    pub fn format(&self, tuple: [f64; 3], mode: InputMode) -> String {
        match mode {
            InputMode::Hex => {
                let [r, g, b] = tuple.map(to_byte);
                format!("#{r:02X}{g:02X}{b:02X}")
            }
            InputMode::Float => tuple
                .map(format_float)
                .join(", "),
            InputMode::EightBit => tuple
                .map(|c| to_byte(c).to_string())
                .join(", "),
        }
    }

    /// Full conversion: parse in one space/mode, render in another.
    pub fn convert(
        &self,
        from_space: &str,
        from_mode: InputMode,
        raw: &str,
        to_space: &str,
        to_mode: InputMode,
    ) -> Result<String, BeamError> {
        let tuple = self.parse(from_space, from_mode, raw)?;
        let pivot = self.to_pivot(from_space, tuple)?;
        self.rederive(to_space, to_mode, pivot)
    }

    /// Render a stored pivot value in a target space and mode. Used to
    /// refresh control-panel fields when the operator switches space or
    /// mode without re-entering the color.
    pub fn rederive(
        &self,
        space: &str,
        mode: InputMode,
        pivot: Xyz,
    ) -> Result<String, BeamError> {
        let desc = self.registry.get(space)?;
        if !desc.supports(mode) {
            return Err(BeamError::UnsupportedMode {
                space: space.to_string(),
                mode: mode.to_string(),
            });
        }
        let tuple = self.from_pivot(space, pivot)?;
        Ok(self.format(tuple, mode))
    }
}

// ── Helpers ──────────────────────────────────────────────────────

fn to_byte(c: f64) -> u8 {
    (c * 255.0).round().clamp(0.0, 255.0) as u8
}

fn format_float(v: f64) -> String {
    let s = format!("{v:.4}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_string() } else { s.to_string() }
}

/// Accepts `#RGB`, `#RRGGBB`, `RGB`, `RRGGBB`; case-insensitive. Short
/// form doubles each digit.
fn parse_hex(raw: &str) -> Result<[f64; 3], BeamError> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(BeamError::InvalidHex(raw.to_string()));
    }
    let expanded: String = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect(),
        6 => digits.to_string(),
        _ => return Err(BeamError::InvalidHex(raw.to_string())),
    };
    let channel = |range: std::ops::Range<usize>| -> Result<f64, BeamError> {
        u8::from_str_radix(&expanded[range], 16)
            .map(|b| b as f64 / 255.0)
            .map_err(|_| BeamError::InvalidHex(raw.to_string()))
    };
    Ok([channel(0..2)?, channel(2..4)?, channel(4..6)?])
}
