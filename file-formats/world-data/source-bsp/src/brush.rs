//! Brush geometry
//!
//! Turns the brush records reachable through the tree into closed polyhedra
//! tagged with a display shape.

use crate::error::{BspError, Result};
use crate::parser::BspData;
use crate::polyhedron::{HalfSpace, Polyhedron};
use crate::records::{Brush, BrushSide, Plane};
use crate::tree::collect_brush_indices;

/// Display classification of a brush
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BrushShape {
    /// Six sides, all axis-aligned
    Box,
    /// Anything else
    Complex,
}

impl BrushShape {
    /// Outline colour (RGBA) the shape is drawn with
    pub const fn color(self) -> [u8; 4] {
        match self {
            Self::Box => [0, 255, 255, 20],
            Self::Complex => [255, 0, 255, 20],
        }
    }
}

/// Style handed to the renderer along with each brush
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeStyle {
    /// RGBA outline colour
    pub color: [u8; 4],
    /// Whether the overlay is occluded by world geometry
    pub depth_test: bool,
}

impl ShapeStyle {
    /// Style for `shape` drawn with or without depth testing
    pub const fn new(shape: BrushShape, depth_test: bool) -> Self {
        Self {
            color: shape.color(),
            depth_test,
        }
    }
}

/// A brush rebuilt as a closed solid
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BrushGeometry {
    /// Index into the brush lump
    pub brush_index: u16,
    /// Display classification
    pub shape: BrushShape,
    /// The solid itself
    pub polyhedron: Polyhedron,
}

/// Non-bevel half-spaces of a brush and its shape
#[derive(Debug, Clone, PartialEq)]
pub struct BrushPlanes {
    /// One entry per non-bevel side, in side order
    pub half_spaces: Vec<HalfSpace>,
    /// Box if the raw side count is six and no non-bevel side is oblique
    pub shape: BrushShape,
}

/// Gather the half-spaces of a brush's non-bevel sides
///
/// The box test starts from the raw side count, bevels included, and is
/// then cleared by any non-bevel side on a non-axial plane.
pub fn collect_brush_planes(
    brush: &Brush,
    planes: &[Plane],
    sides: &[BrushSide],
) -> Result<BrushPlanes> {
    let first = usize::try_from(brush.first_side).map_err(|_| BspError::InvalidReference {
        field: "brush first side",
        value: i64::from(brush.first_side),
        max: sides.len(),
    })?;
    let count = usize::try_from(brush.num_sides).map_err(|_| BspError::InvalidReference {
        field: "brush side count",
        value: i64::from(brush.num_sides),
        max: sides.len(),
    })?;
    let range_end = || BspError::InvalidReference {
        field: "brush side range end",
        value: i64::from(brush.first_side) + i64::from(brush.num_sides),
        max: sides.len(),
    };
    let end = first.checked_add(count).ok_or_else(range_end)?;
    let brush_sides = sides.get(first..end).ok_or_else(range_end)?;

    let mut is_box = brush.num_sides == 6;
    let mut half_spaces = Vec::with_capacity(count);

    for side in brush_sides.iter().filter(|s| !s.is_bevel()) {
        let plane = planes
            .get(usize::from(side.plane))
            .ok_or(BspError::InvalidReference {
                field: "brush side plane",
                value: i64::from(side.plane),
                max: planes.len(),
            })?;
        if !plane.is_axial() {
            is_box = false;
        }
        half_spaces.push(HalfSpace::new(plane.normal, plane.dist));
    }

    Ok(BrushPlanes {
        half_spaces,
        shape: if is_box {
            BrushShape::Box
        } else {
            BrushShape::Complex
        },
    })
}

/// Rebuild one brush
///
/// Returns `Ok(None)` for non-solid brushes and for brushes whose planes do
/// not close around a volume. Broken side or plane references are errors.
pub fn build_brush_geometry(
    brush_index: u16,
    brush: &Brush,
    planes: &[Plane],
    sides: &[BrushSide],
) -> Result<Option<BrushGeometry>> {
    if !brush.is_solid() {
        return Ok(None);
    }

    let BrushPlanes { half_spaces, shape } = collect_brush_planes(brush, planes, sides)?;
    let Some(polyhedron) = Polyhedron::from_half_spaces(&half_spaces) else {
        log::debug!(
            "Brush {} ({} planes) does not enclose a volume, skipping",
            brush_index,
            half_spaces.len()
        );
        return Ok(None);
    };

    Ok(Some(BrushGeometry {
        brush_index,
        shape,
        polyhedron,
    }))
}

/// Rebuild every solid brush reachable through the map's tree
pub fn build_map_geometry(data: &BspData) -> Result<Vec<BrushGeometry>> {
    let indices = collect_brush_indices(&data.nodes, &data.leaves, &data.leaf_brushes)?;

    let mut geometry = Vec::with_capacity(indices.len());
    let mut skipped = 0usize;
    for index in indices {
        let brush = data
            .brushes
            .get(usize::from(index))
            .ok_or(BspError::InvalidReference {
                field: "brush index",
                value: i64::from(index),
                max: data.brushes.len(),
            })?;
        match build_brush_geometry(index, brush, &data.planes, &data.brush_sides)? {
            Some(built) => geometry.push(built),
            None => skipped += 1,
        }
    }

    log::debug!(
        "Built {} brushes, skipped {} non-solid or degenerate",
        geometry.len(),
        skipped
    );
    Ok(geometry)
}
