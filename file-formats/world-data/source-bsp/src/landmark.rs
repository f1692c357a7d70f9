//! Landmark alignment
//!
//! A map loaded for the overlay can differ from the map the engine is
//! running. Levels that connect through a transition share `info_landmark`
//! entities, and the difference between a shared landmark's positions in
//! the two maps is the offset that lines the overlay up.

use glam::Vec3;

use crate::entities::Landmark;

/// Read access to the map the engine currently has loaded
pub trait LoadedMapInfo {
    /// Name of the running map, empty if none
    fn loaded_map_name(&self) -> &str;

    /// Landmarks of the running map, in entity order
    fn loaded_map_landmarks(&self) -> &[Landmark];
}

/// A fixed [`LoadedMapInfo`], for tools and tests
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedMap {
    /// Map name
    pub name: String,
    /// Map landmarks
    pub landmarks: Vec<Landmark>,
}

impl LoadedMap {
    /// Describe a running map
    pub fn new(name: impl Into<String>, landmarks: Vec<Landmark>) -> Self {
        Self {
            name: name.into(),
            landmarks,
        }
    }
}

impl LoadedMapInfo for LoadedMap {
    fn loaded_map_name(&self) -> &str {
        &self.name
    }

    fn loaded_map_landmarks(&self) -> &[Landmark] {
        &self.landmarks
    }
}

/// Offset that moves the file's coordinates into the running map's space
///
/// Zero when nothing is loaded on either side, when both sides are the same
/// map (one name contains the other and the landmark lists are equal), or
/// when no landmark name is shared. Otherwise the first landmark of the
/// running map whose name also occurs in the file decides the offset.
pub fn resolve_offset(
    file_name: &str,
    file_landmarks: &[Landmark],
    engine_name: &str,
    engine_landmarks: &[Landmark],
) -> Vec3 {
    if file_name.is_empty() || engine_name.is_empty() {
        return Vec3::ZERO;
    }

    let names_overlap = engine_name.contains(file_name) || file_name.contains(engine_name);
    if names_overlap && file_landmarks == engine_landmarks {
        return Vec3::ZERO;
    }

    engine_landmarks
        .iter()
        .find_map(|current| {
            file_landmarks
                .iter()
                .find(|own| own.name == current.name)
                .map(|own| {
                    log::debug!(
                        "Aligning on landmark '{}': {} -> {}",
                        current.name,
                        own.origin,
                        current.origin
                    );
                    current.origin - own.origin
                })
        })
        .unwrap_or(Vec3::ZERO)
}

/// Last resolved offset, keyed on the running map's name
#[derive(Debug, Clone, Default)]
pub struct OffsetCache {
    entry: Option<(String, Vec3)>,
}

impl OffsetCache {
    /// Empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached offset for `engine_name`, computing it on a miss
    pub fn get_or_compute(&mut self, engine_name: &str, compute: impl FnOnce() -> Vec3) -> Vec3 {
        match &self.entry {
            Some((name, offset)) if name == engine_name => *offset,
            _ => {
                let offset = compute();
                self.entry = Some((engine_name.to_owned(), offset));
                offset
            }
        }
    }

    /// Forget the cached offset
    pub fn reset(&mut self) {
        self.entry = None;
    }

    /// Map name the cached offset belongs to
    pub fn cached_for(&self) -> Option<&str> {
        self.entry.as_ref().map(|(name, _)| name.as_str())
    }
}
