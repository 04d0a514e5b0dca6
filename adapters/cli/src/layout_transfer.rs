use std::{error::Error, fmt};

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use gemfall_core::{GridLayout, LayoutError};
use serde::{Deserialize, Serialize};

const LAYOUT_DOMAIN: &str = "grid";
const LAYOUT_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded layout payload.
pub(crate) const LAYOUT_HEADER: &str = "grid:v1";
/// Delimiter used to separate the prefix, grid dimensions and payload.
const FIELD_DELIMITER: char = ':';

/// Encodes the layout into a single-line string suitable for clipboard transfer.
pub(crate) fn encode(layout: &GridLayout) -> Result<String, LayoutTransferError> {
    let payload = SerializableLayout {
        rows: layout.to_lines(),
    };
    let json = serde_json::to_vec(&payload).map_err(LayoutTransferError::InvalidPayload)?;
    let encoded = STANDARD_NO_PAD.encode(json);
    Ok(format!(
        "{LAYOUT_HEADER}:{}x{}:{encoded}",
        layout.columns(),
        layout.rows()
    ))
}

/// Decodes a layout from the provided string representation.
pub(crate) fn decode(value: &str) -> Result<GridLayout, LayoutTransferError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LayoutTransferError::EmptyPayload);
    }

    let mut parts = trimmed.split(FIELD_DELIMITER);
    let domain = parts.next().ok_or(LayoutTransferError::MissingPrefix)?;
    let version = parts.next().ok_or(LayoutTransferError::MissingVersion)?;
    let dimensions = parts.next().ok_or(LayoutTransferError::MissingDimensions)?;
    let payload = parts.next().ok_or(LayoutTransferError::MissingPayload)?;

    if domain != LAYOUT_DOMAIN {
        return Err(LayoutTransferError::InvalidPrefix(domain.to_owned()));
    }
    if version != LAYOUT_VERSION {
        return Err(LayoutTransferError::UnsupportedVersion(version.to_owned()));
    }

    let (columns, rows) = parse_dimensions(dimensions)?;
    let bytes = STANDARD_NO_PAD
        .decode(payload.as_bytes())
        .map_err(LayoutTransferError::InvalidEncoding)?;
    let decoded: SerializableLayout =
        serde_json::from_slice(&bytes).map_err(LayoutTransferError::InvalidPayload)?;

    let lines: Vec<&str> = decoded.rows.iter().map(String::as_str).collect();
    let layout = GridLayout::parse(&lines).map_err(LayoutTransferError::InvalidLayout)?;
    if layout.columns() != columns || layout.rows() != rows {
        return Err(LayoutTransferError::DimensionMismatch {
            header: (columns, rows),
            payload: (layout.columns(), layout.rows()),
        });
    }

    Ok(layout)
}

/// Payload stored after the header: one glyph row per grid row, top row first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct SerializableLayout {
    rows: Vec<String>,
}

/// Errors that can occur while converting layout transfer strings.
#[derive(Debug)]
pub(crate) enum LayoutTransferError {
    /// The provided string was empty or contained only whitespace.
    EmptyPayload,
    /// The prefix segment was missing from the encoded layout.
    MissingPrefix,
    /// The encoded layout did not contain a version segment.
    MissingVersion,
    /// The encoded layout did not include grid dimensions.
    MissingDimensions,
    /// The encoded layout did not include the payload segment.
    MissingPayload,
    /// The encoded layout used an unexpected prefix segment.
    InvalidPrefix(String),
    /// The encoded layout used an unsupported version identifier.
    UnsupportedVersion(String),
    /// The grid dimensions could not be parsed from the encoded layout.
    InvalidDimensions(String),
    /// The base64 payload could not be decoded.
    InvalidEncoding(base64::DecodeError),
    /// The payload could not be serialised or deserialised.
    InvalidPayload(serde_json::Error),
    /// The glyph rows do not describe a valid layout.
    InvalidLayout(LayoutError),
    /// The header dimensions disagree with the decoded rows.
    DimensionMismatch {
        /// Dimensions announced by the header.
        header: (u32, u32),
        /// Dimensions of the decoded rows.
        payload: (u32, u32),
    },
}

impl fmt::Display for LayoutTransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPayload => write!(f, "layout string was empty"),
            Self::MissingPrefix => write!(f, "layout string is missing the prefix"),
            Self::MissingVersion => write!(f, "layout string is missing the version"),
            Self::MissingDimensions => write!(f, "layout string is missing the grid dimensions"),
            Self::MissingPayload => write!(f, "layout string is missing the payload"),
            Self::InvalidPrefix(prefix) => write!(f, "layout prefix '{prefix}' is not supported"),
            Self::UnsupportedVersion(version) => {
                write!(f, "layout version '{version}' is not supported")
            }
            Self::InvalidDimensions(dimensions) => {
                write!(f, "could not parse grid dimensions '{dimensions}'")
            }
            Self::InvalidEncoding(error) => {
                write!(f, "could not decode layout payload: {error}")
            }
            Self::InvalidPayload(error) => {
                write!(f, "could not process layout payload: {error}")
            }
            Self::InvalidLayout(error) => write!(f, "layout payload is malformed: {error}"),
            Self::DimensionMismatch { header, payload } => write!(
                f,
                "layout header announces {}x{} but the payload holds {}x{}",
                header.0, header.1, payload.0, payload.1
            ),
        }
    }
}

impl Error for LayoutTransferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidEncoding(error) => Some(error),
            Self::InvalidPayload(error) => Some(error),
            Self::InvalidLayout(error) => Some(error),
            _ => None,
        }
    }
}

fn parse_dimensions(dimensions: &str) -> Result<(u32, u32), LayoutTransferError> {
    let invalid = || LayoutTransferError::InvalidDimensions(dimensions.to_owned());
    let (columns, rows) = dimensions.split_once(['x', 'X']).ok_or_else(invalid)?;

    let columns = columns.trim().parse::<u32>().map_err(|_| invalid())?;
    let rows = rows.trim().parse::<u32>().map_err(|_| invalid())?;

    if columns == 0 || rows == 0 {
        return Err(invalid());
    }

    Ok((columns, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_layout() -> GridLayout {
        GridLayout::parse(&["ABCA", "C.AB", "BCAD"]).expect("layout parses")
    }

    #[test]
    fn encoded_layout_carries_header_and_decodes_back() {
        let layout = sample_layout();

        let encoded = encode(&layout).expect("layout encodes");
        assert!(encoded.starts_with(&format!("{LAYOUT_HEADER}:4x3:")));

        let decoded = decode(&format!("  {encoded}\n")).expect("layout decodes");
        assert_eq!(decoded, layout);
    }

    #[test]
    fn highest_palette_color_survives_transfer() {
        let mut layout = GridLayout::empty(3, 1).expect("layout fits");
        let last = u8::try_from(gemfall_core::MAX_PALETTE_COLORS - 1).expect("index fits");
        layout
            .set(gemfall_core::CellCoord::new(2, 0), Some(gemfall_core::CellColor::new(last)))
            .expect("slot in bounds");

        let encoded = encode(&layout).expect("layout encodes");

        assert_eq!(decode(&encoded).expect("layout decodes"), layout);
    }

    #[test]
    fn rejects_foreign_prefix_and_version() {
        assert!(matches!(
            decode("maze:v1:4x3:e30"),
            Err(LayoutTransferError::InvalidPrefix(prefix)) if prefix == "maze"
        ));
        assert!(matches!(
            decode("grid:v2:4x3:e30"),
            Err(LayoutTransferError::UnsupportedVersion(version)) if version == "v2"
        ));
        assert!(matches!(decode("   "), Err(LayoutTransferError::EmptyPayload)));
        assert!(matches!(
            decode("grid:v1:4x3"),
            Err(LayoutTransferError::MissingPayload)
        ));
    }

    #[test]
    fn rejects_zero_or_garbled_dimensions() {
        assert!(matches!(
            decode("grid:v1:0x3:e30"),
            Err(LayoutTransferError::InvalidDimensions(_))
        ));
        assert!(matches!(
            decode("grid:v1:four:e30"),
            Err(LayoutTransferError::InvalidDimensions(_))
        ));
    }

    #[test]
    fn rejects_header_that_disagrees_with_rows() {
        let encoded = encode(&sample_layout()).expect("layout encodes");
        let tampered = encoded.replacen(":4x3:", ":3x4:", 1);

        assert!(matches!(
            decode(&tampered),
            Err(LayoutTransferError::DimensionMismatch {
                header: (3, 4),
                payload: (4, 3),
            })
        ));
    }

    #[test]
    fn rejects_unknown_glyphs_in_payload() {
        let json = br#"{"rows":["AB?","ABC"]}"#;
        let value = format!("{LAYOUT_HEADER}:3x2:{}", STANDARD_NO_PAD.encode(json));

        assert!(matches!(
            decode(&value),
            Err(LayoutTransferError::InvalidLayout(_))
        ));
    }
}
