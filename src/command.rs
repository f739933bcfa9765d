//! Display command model and the wire envelope exchanged across contexts.
//!
//! The command set is closed: a surface can show a full-screen color, an
//! image, or a templated layout. Commands are immutable once constructed
//! and travel inside an [`Envelope`] that tags them with the issuing
//! context's [`OriginId`] plus a one-hop forwarding marker.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::BeamError;

// ── OriginId ─────────────────────────────────────────────────────

/// Session-unique identifier of one execution context.
///
/// Freshly generated when the context starts; receivers compare it against
/// their own id to detect echoes of their own dispatches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OriginId(String);

impl OriginId {
    /// Generate a new session-unique id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OriginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
impl From<&str> for OriginId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ── Command ──────────────────────────────────────────────────────

/// All display commands understood by the protocol.
///
/// The payload shape must match the declared kind; [`Command::validate`]
/// enforces this before any dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Command {
    /// Fill the surface with a CSS color string (canonically `#RRGGBB`).
    Color(String),
    /// Show an image by URL.
    Image(String),
    /// Show a templated layout by template id.
    Template(String),
}

impl Command {
    /// The wire name of this command's kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Command::Color(_) => "color",
            Command::Image(_) => "image",
            Command::Template(_) => "template",
        }
    }

    /// Check that the value's shape matches the declared kind.
    ///
    /// Color values that look like hex (leading `#`) must actually be
    /// 3- or 6-digit hex; other CSS color strings pass through untouched.
    pub fn validate(&self) -> Result<(), BeamError> {
        match self {
            Command::Color(value) => {
                let value = value.trim();
                if value.is_empty() {
                    return Err(BeamError::InvalidCommand("color value is empty"));
                }
                if let Some(hex) = value.strip_prefix('#') {
                    let shape_ok = (hex.len() == 3 || hex.len() == 6)
                        && hex.chars().all(|c| c.is_ascii_hexdigit());
                    if !shape_ok {
                        return Err(BeamError::InvalidHex(value.to_string()));
                    }
                }
                Ok(())
            }
            Command::Image(url) => {
                if url.trim().is_empty() {
                    return Err(BeamError::InvalidCommand("image URL is empty"));
                }
                Ok(())
            }
            Command::Template(id) => {
                if id.trim().is_empty() {
                    return Err(BeamError::InvalidCommand("template id is empty"));
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Color(v) | Command::Image(v) | Command::Template(v) => {
                write!(f, "{}: {}", self.kind(), v)
            }
        }
    }
}

// ── Envelope ─────────────────────────────────────────────────────

/// The only structured message exchanged across contexts.
///
/// Wire shape:
///
/// ```text
/// { "type": "color" | "image" | "template",
///   "value": string,
///   "originId": string,
///   "alreadyForwarded"?: boolean }
/// ```
///
/// `alreadyForwarded` is a transit-only marker: a relaying context sets it
/// so the command is forwarded at most one hop beyond its origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(flatten)]
    pub command: Command,
    #[serde(rename = "originId")]
    pub origin_id: OriginId,
    #[serde(rename = "alreadyForwarded", default, skip_serializing_if = "is_false")]
    pub already_forwarded: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Envelope {
    /// Wrap a locally issued command.
    pub fn local(command: Command, origin_id: OriginId) -> Self {
        Self {
            command,
            origin_id,
            already_forwarded: false,
        }
    }

    /// A copy of this envelope marked as forwarded.
    pub fn forwarded(&self) -> Self {
        Self {
            command: self.command.clone(),
            origin_id: self.origin_id.clone(),
            already_forwarded: true,
        }
    }

    /// Encode to the JSON wire format.
    pub fn to_json(&self) -> Result<String, BeamError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from the JSON wire format.
    pub fn from_json(raw: &str) -> Result<Self, BeamError> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_shape_matches_contract() {
        let env = Envelope::local(Command::Color("#FF0000".into()), "ctx-1".into());
        let json = env.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "color");
        assert_eq!(value["value"], "#FF0000");
        assert_eq!(value["originId"], "ctx-1");
        // omitted while false
        assert!(value.get("alreadyForwarded").is_none());
    }

    #[test]
    fn forwarded_flag_survives_roundtrip() {
        let env = Envelope::local(Command::Template("session-intro".into()), "ctx-2".into());
        let fwd = env.forwarded();
        assert!(fwd.already_forwarded);

        let json = fwd.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["alreadyForwarded"], true);

        let back = Envelope::from_json(&json).unwrap();
        assert_eq!(back, fwd);
    }

    #[test]
    fn missing_flag_defaults_to_false() {
        let raw = r#"{"type":"image","value":"https://example.com/a.png","originId":"x"}"#;
        let env = Envelope::from_json(raw).unwrap();
        assert!(!env.already_forwarded);
        assert_eq!(env.command, Command::Image("https://example.com/a.png".into()));
    }

    #[test]
    fn validate_rejects_empty_values() {
        assert!(Command::Color("  ".into()).validate().is_err());
        assert!(Command::Image(String::new()).validate().is_err());
        assert!(Command::Template("".into()).validate().is_err());
    }

    #[test]
    fn validate_rejects_malformed_hex() {
        assert!(Command::Color("#12".into()).validate().is_err());
        assert!(Command::Color("#GGGGGG".into()).validate().is_err());
        assert!(Command::Color("#abc".into()).validate().is_ok());
        assert!(Command::Color("#A1B2C3".into()).validate().is_ok());
    }

    #[test]
    fn validate_accepts_css_keywords() {
        // Non-hex CSS strings are passed through to the surface untouched.
        assert!(Command::Color("rebeccapurple".into()).validate().is_ok());
    }

    #[test]
    fn origin_ids_are_unique() {
        assert_ne!(OriginId::generate(), OriginId::generate());
    }
}
