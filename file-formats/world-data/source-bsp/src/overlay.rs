//! Map overlay controller
//!
//! [`MapOverlay`] owns the brush geometry of one map file and the landmark
//! state needed to place it over whatever map the engine is running. It is
//! shared between a load path (console or UI) and a per-frame draw path, so
//! all mutable state sits behind one mutex and the geometry set is replaced
//! as a whole.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use glam::Vec3;
use parking_lot::Mutex;

use crate::brush::{BrushGeometry, ShapeStyle, build_map_geometry};
use crate::entities::Landmark;
use crate::error::{BspError, Result};
use crate::landmark::{LoadedMapInfo, OffsetCache, resolve_offset};
use crate::parser::BspParser;

/// Where map files live and how they are read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayConfig {
    /// Directory map names are resolved against
    pub maps_dir: PathBuf,
    /// File extension appended to map names
    pub extension: String,
    /// Accept the vendor-packed version field
    pub accept_packed_version: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            maps_dir: PathBuf::from("maps"),
            extension: "bsp".to_string(),
            accept_packed_version: false,
        }
    }
}

impl OverlayConfig {
    /// Set the maps directory
    pub fn with_maps_dir(mut self, maps_dir: impl Into<PathBuf>) -> Self {
        self.maps_dir = maps_dir.into();
        self
    }

    /// Set the map file extension, without the dot
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Accept or reject the vendor-packed version field
    pub fn with_packed_version(mut self, accept: bool) -> Self {
        self.accept_packed_version = accept;
        self
    }

    /// Path of the file for map `name`
    ///
    /// The extension is only appended when `name` does not already carry it.
    pub fn map_path(&self, name: &str) -> PathBuf {
        let has_extension = Path::new(name)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(self.extension.as_str()));
        if has_extension {
            self.maps_dir.join(name)
        } else {
            self.maps_dir.join(format!("{}.{}", name, self.extension))
        }
    }
}

/// Receives overlay geometry each frame
pub trait OverlaySink {
    /// Whether geometry handed out earlier is still usable
    ///
    /// Renderers that lose their resources (device reset, level change)
    /// return `false`, which makes the overlay drop its geometry.
    fn handles_valid(&self) -> bool {
        true
    }

    /// Draw one brush translated by `offset`
    fn draw_brush(&mut self, geometry: &BrushGeometry, style: ShapeStyle, offset: Vec3);
}

/// Result of a successful [`MapOverlay::load`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The file was read and its geometry installed
    Loaded {
        /// Number of brushes built
        brushes: usize,
        /// Number of landmarks found
        landmarks: usize,
    },
    /// Same map and mode as the current geometry; nothing was read
    AlreadyLoaded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LoadIdentity {
    name: String,
    depth_test: bool,
}

#[derive(Debug)]
struct OverlayState {
    loaded: Option<LoadIdentity>,
    geometry: Arc<[BrushGeometry]>,
    landmarks: Vec<Landmark>,
    offset_cache: OffsetCache,
    offset_override: Option<Vec3>,
}

impl OverlayState {
    fn new() -> Self {
        Self {
            loaded: None,
            geometry: Vec::new().into(),
            landmarks: Vec::new(),
            offset_cache: OffsetCache::new(),
            offset_override: None,
        }
    }

    fn is_current(&self, name: &str, depth_test: bool) -> bool {
        !self.geometry.is_empty()
            && self
                .loaded
                .as_ref()
                .is_some_and(|id| id.name == name && id.depth_test == depth_test)
    }

    fn landmark_offset<E: LoadedMapInfo + ?Sized>(&mut self, engine: &E) -> Vec3 {
        let file_name = self.loaded.as_ref().map_or("", |id| id.name.as_str());
        let engine_name = engine.loaded_map_name();
        let landmarks = &self.landmarks;
        self.offset_cache.get_or_compute(engine_name, || {
            resolve_offset(
                file_name,
                landmarks,
                engine_name,
                engine.loaded_map_landmarks(),
            )
        })
    }

    fn render_offset<E: LoadedMapInfo + ?Sized>(&mut self, engine: &E) -> Vec3 {
        match self.offset_override {
            Some(offset) => offset,
            None => self.landmark_offset(engine),
        }
    }

    fn clear(&mut self) {
        self.loaded = None;
        self.geometry = Vec::new().into();
        self.landmarks.clear();
        self.offset_cache.reset();
    }
}

/// Brush overlay for one map
///
/// # Examples
///
/// ```rust,no_run
/// use source_bsp::{LoadedMap, MapOverlay, OverlayConfig};
///
/// let overlay = MapOverlay::with_config(OverlayConfig::default().with_maps_dir("hl2/maps"));
/// overlay.load("d1_canals_01", true).unwrap();
///
/// let engine = LoadedMap::new("d1_canals_02", Vec::new());
/// println!("offset: {}", overlay.landmark_offset(&engine));
/// ```
#[derive(Debug)]
pub struct MapOverlay {
    config: OverlayConfig,
    state: Mutex<OverlayState>,
}

impl Default for MapOverlay {
    fn default() -> Self {
        Self::new()
    }
}

impl MapOverlay {
    /// Create an empty overlay with the default configuration
    pub fn new() -> Self {
        Self::with_config(OverlayConfig::default())
    }

    /// Create an empty overlay
    pub fn with_config(config: OverlayConfig) -> Self {
        Self {
            config,
            state: Mutex::new(OverlayState::new()),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    /// Load map `name` from the maps directory
    ///
    /// Loading the map and depth-test mode that are already shown does no
    /// I/O. On failure the previous geometry and landmarks stay in place.
    pub fn load(&self, name: &str, depth_test: bool) -> Result<LoadOutcome> {
        let mut state = self.state.lock();
        if state.is_current(name, depth_test) {
            log::trace!("'{}' is already loaded", name);
            return Ok(LoadOutcome::AlreadyLoaded);
        }

        let path = self.config.map_path(name);
        log::debug!("Loading overlay from {}", path.display());
        let file = File::open(&path).map_err(BspError::Io)?;
        self.install(&mut state, name, depth_test, &mut BufReader::new(file))
    }

    /// Load map `name` from an already opened stream
    pub fn load_from_reader<R: Read + Seek>(
        &self,
        name: &str,
        depth_test: bool,
        reader: &mut R,
    ) -> Result<LoadOutcome> {
        let mut state = self.state.lock();
        if state.is_current(name, depth_test) {
            log::trace!("'{}' is already loaded", name);
            return Ok(LoadOutcome::AlreadyLoaded);
        }
        self.install(&mut state, name, depth_test, reader)
    }

    fn install<R: Read + Seek>(
        &self,
        state: &mut OverlayState,
        name: &str,
        depth_test: bool,
        reader: &mut R,
    ) -> Result<LoadOutcome> {
        let data = BspParser::new()
            .with_packed_version(self.config.accept_packed_version)
            .parse(reader)?;
        let landmarks = data.landmarks()?;
        let geometry = build_map_geometry(&data)?;

        log::info!(
            "Loaded '{}' (version {}): {} brushes, {} landmarks",
            name,
            data.header.version,
            geometry.len(),
            landmarks.len()
        );

        let outcome = LoadOutcome::Loaded {
            brushes: geometry.len(),
            landmarks: landmarks.len(),
        };
        state.geometry = geometry.into();
        state.landmarks = landmarks;
        state.loaded = Some(LoadIdentity {
            name: name.to_string(),
            depth_test,
        });
        state.offset_cache.reset();
        Ok(outcome)
    }

    /// Drop all geometry and forget the loaded map
    pub fn clear(&self) {
        self.state.lock().clear();
    }

    /// Name of the loaded map, if any
    pub fn loaded_name(&self) -> Option<String> {
        self.state.lock().loaded.as_ref().map(|id| id.name.clone())
    }

    /// Snapshot of the current geometry
    pub fn geometry(&self) -> Arc<[BrushGeometry]> {
        Arc::clone(&self.state.lock().geometry)
    }

    /// Landmarks of the loaded map
    pub fn landmarks(&self) -> Vec<Landmark> {
        self.state.lock().landmarks.clone()
    }

    /// Offset aligning the loaded map to the engine's running map
    pub fn landmark_offset<E: LoadedMapInfo + ?Sized>(&self, engine: &E) -> Vec3 {
        self.state.lock().landmark_offset(engine)
    }

    /// Replace the landmark offset with a fixed one, or go back to landmarks
    pub fn set_offset_override(&self, offset: Option<Vec3>) {
        self.state.lock().offset_override = offset;
    }

    /// Manual offset, if set
    pub fn offset_override(&self) -> Option<Vec3> {
        self.state.lock().offset_override
    }

    /// Offset the geometry is drawn with
    pub fn render_offset<E: LoadedMapInfo + ?Sized>(&self, engine: &E) -> Vec3 {
        self.state.lock().render_offset(engine)
    }

    /// Hand every brush to `sink`, returning how many were drawn
    ///
    /// If the sink reports stale handles the overlay is cleared instead.
    pub fn draw<E, S>(&self, engine: &E, sink: &mut S) -> usize
    where
        E: LoadedMapInfo + ?Sized,
        S: OverlaySink + ?Sized,
    {
        if !sink.handles_valid() {
            let mut state = self.state.lock();
            if state.loaded.is_some() {
                log::debug!("Overlay handles are stale, clearing");
            }
            state.clear();
            return 0;
        }

        let (geometry, offset, depth_test) = {
            let mut state = self.state.lock();
            let Some(depth_test) = state.loaded.as_ref().map(|id| id.depth_test) else {
                return 0;
            };
            let offset = state.render_offset(engine);
            (Arc::clone(&state.geometry), offset, depth_test)
        };

        for brush in geometry.iter() {
            sink.draw_brush(brush, ShapeStyle::new(brush.shape, depth_test), offset);
        }
        geometry.len()
    }
}
