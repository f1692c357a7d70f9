//! # Source BSP brush overlay
//!
//! Reads Source engine `VBSP` map files (versions 19 and 20) and rebuilds
//! their solid brushes as closed convex polyhedra, ready to be drawn as an
//! overlay on top of a running level. Landmark entities in the map are used
//! to shift the overlay into the coordinate space of a neighbouring map.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::BufReader;
//! use source_bsp::{build_map_geometry, parse_bsp};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let file = File::open("maps/d1_trainstation_01.bsp")?;
//! let data = parse_bsp(&mut BufReader::new(file))?;
//!
//! println!("Version: {}", data.header.version);
//! println!("Landmarks: {:?}", data.landmarks()?);
//!
//! for brush in build_map_geometry(&data)? {
//!     println!(
//!         "brush {} ({:?}): {} vertices",
//!         brush.brush_index,
//!         brush.shape,
//!         brush.polyhedron.vertices().len()
//!     );
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Overlay
//!
//! [`MapOverlay`] wraps the whole pipeline for a host that loads maps by
//! name and draws every frame. The host describes its running map through
//! [`LoadedMapInfo`] and receives geometry through [`OverlaySink`].
//!
//! ## Modules
//!
//! - [`header`]: File header, lump directory and version handling
//! - [`records`]: Fixed-size lump records
//! - [`parser`]: Lump reader producing [`BspData`]
//! - [`entities`]: Landmark scanning in the entity lump
//! - [`tree`]: Brush discovery through the BSP tree
//! - [`polyhedron`]: Convex polyhedra from half-spaces
//! - [`brush`]: Brush classification and geometry
//! - [`landmark`]: Landmark alignment between maps
//! - [`overlay`]: Load controller and per-frame drawing
//! - [`error`]: Error types

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod brush;
pub mod entities;
pub mod error;
pub mod header;
pub mod landmark;
pub mod overlay;
pub mod parser;
pub mod polyhedron;
pub mod records;
pub mod tree;

pub use brush::{
    BrushGeometry, BrushPlanes, BrushShape, ShapeStyle, build_brush_geometry, build_map_geometry,
    collect_brush_planes,
};
pub use entities::{Landmark, scan_landmarks};
pub use error::{BspError, Result};
pub use header::{BspHeader, BspVersion, HEADER_SIZE, LumpDescriptor, LumpKind, VBSP_MAGIC};
pub use landmark::{LoadedMap, LoadedMapInfo, OffsetCache, resolve_offset};
pub use overlay::{LoadOutcome, MapOverlay, OverlayConfig, OverlaySink};
pub use parser::{BspData, BspParser};
pub use polyhedron::{HalfSpace, ON_EPSILON, PolyFace, Polyhedron};
pub use records::{
    Brush, BrushSide, Contents, Leaf, LeafBrushRange, LeafLayout, LeafV0, Leaves, Node, NodeRef,
    Plane,
};
pub use tree::collect_brush_indices;

/// Parse a BSP file from a reader, accepting versions 19 and 20
pub fn parse_bsp<R: std::io::Read + std::io::Seek>(reader: &mut R) -> Result<BspData> {
    BspParser::new().parse(reader)
}

/// Read only the header of a BSP file
pub fn read_header<R: std::io::Read + std::io::Seek>(reader: &mut R) -> Result<BspHeader> {
    BspParser::new().parse_header(reader)
}
