//! Landmark extraction from the entity lump
//!
//! The entity lump is a sequence of blocks like
//!
//! ```text
//! {
//! "origin" "-1024 512 64"
//! "targetname" "landmark_a"
//! "classname" "info_landmark"
//! }
//! ```
//!
//! Only `info_landmark` entities are of interest, so rather than parse every
//! entity this module searches for the class-name pair and then widens to the
//! enclosing block.

use glam::Vec3;
use memchr::memmem;

use crate::error::{BspError, Result};

/// Key/value pair that marks a landmark entity
const LANDMARK_CLASS: &[u8] = br#""classname" "info_landmark""#;

/// A named reference point used to line up two maps
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Landmark {
    /// Entity `targetname`
    pub name: String,
    /// Entity `origin`
    pub origin: Vec3,
}

impl Landmark {
    /// Create a landmark
    pub fn new(name: impl Into<String>, origin: Vec3) -> Self {
        Self {
            name: name.into(),
            origin,
        }
    }
}

/// Find every named landmark entity in an entity lump, in file order
///
/// Landmarks without a `targetname` are skipped; a missing `origin` leaves
/// the position at zero. A landmark whose block never closes makes the whole
/// lump unusable.
pub fn scan_landmarks(lump: &[u8]) -> Result<Vec<Landmark>> {
    let end_of_text = lump.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    let text = &lump[..end_of_text];

    let finder = memmem::Finder::new(LANDMARK_CLASS);
    let mut landmarks = Vec::new();
    let mut cursor = 0;

    while cursor < text.len() {
        let Some(found) = finder.find(&text[cursor..]) else {
            break;
        };
        let at = cursor + found;

        let block_start = block_start_before(&text[..at]);
        let block_end = memmem::find(&text[at..], b"\n}")
            .map(|p| at + p)
            .ok_or(BspError::MalformedEntityLump(at))?;

        match parse_landmark_block(&text[block_start..block_end]) {
            Some(landmark) => {
                log::debug!("Landmark '{}' at {}", landmark.name, landmark.origin);
                landmarks.push(landmark);
            }
            None => log::debug!("Skipping unnamed landmark at byte {}", at),
        }

        cursor = block_end + 2;
    }

    Ok(landmarks)
}

/// Offset just past the last `{` + newline before `before`, or 0
fn block_start_before(before: &[u8]) -> usize {
    let lf = memmem::rfind(before, b"{\n").map(|p| p + 2);
    let crlf = memmem::rfind(before, b"{\r\n").map(|p| p + 3);
    lf.max(crlf).unwrap_or(0)
}

fn parse_landmark_block(block: &[u8]) -> Option<Landmark> {
    let mut origin = None;
    let mut name = None;

    for line in block.split(|&b| b == b'\n') {
        if origin.is_some() && name.is_some() {
            break;
        }
        let line = String::from_utf8_lossy(line);
        let Some((key, value)) = parse_key_value(&line) else {
            continue;
        };
        match key {
            "origin" if origin.is_none() => origin = parse_vec3(value),
            "targetname" if name.is_none() && !value.is_empty() => name = Some(value.to_owned()),
            _ => {}
        }
    }

    name.map(|name| Landmark {
        name,
        origin: origin.unwrap_or(Vec3::ZERO),
    })
}

/// Split a `"key" "value"` line
fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    let rest = line.strip_prefix('"')?;
    let (key, rest) = rest.split_once('"')?;
    let rest = rest.trim_start().strip_prefix('"')?;
    let value = rest.split_once('"').map_or(rest, |(value, _)| value);
    Some((key, value))
}

fn parse_vec3(value: &str) -> Option<Vec3> {
    let mut parts = value.split_whitespace().map(str::parse::<f32>);
    let x = parts.next()?.ok()?;
    let y = parts.next()?.ok()?;
    let z = parts.next()?.ok()?;
    Some(Vec3::new(x, y, z))
}
