//! Convex polyhedra from half-space planes
//!
//! # Algorithm
//!
//! 1. For each plane, build a square "base winding" lying in the plane and
//!    much larger than any map.
//! 2. Clip that winding against every other plane, keeping the part behind
//!    it. What survives is the face the plane contributes to the solid.
//! 3. Weld vertices that ended up within [`ON_EPSILON`] of each other and
//!    drop faces that collapsed to fewer than three distinct corners.
//! 4. Reject the result if it is open (a surviving face still reaches the
//!    base winding's edge), has fewer than four faces, or encloses no volume.
//!
//! Clipping runs in `f64`; the finished polyhedron stores `f32` vertices.

use glam::{DVec3, Vec3};
use std::collections::BTreeSet;

/// Distance below which a point is considered to lie on a plane
pub const ON_EPSILON: f64 = 1e-4;

/// Largest coordinate magnitude a closed map brush can have
pub const MAX_MAP_EXTENT: f64 = 65536.0;

/// Half-size of the square each face starts from
const BASE_WINDING_EXTENT: f64 = 4.0 * MAX_MAP_EXTENT;

/// Two normals closer than this per component are treated as equal
const NORMAL_EPSILON: f64 = 1e-5;

/// The set of points `p` with `normal · p <= dist`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HalfSpace {
    /// Outward-facing unit normal
    pub normal: DVec3,
    /// Plane distance along the normal
    pub dist: f64,
}

impl HalfSpace {
    /// Half-space behind the plane `normal · p = dist`
    pub fn new(normal: Vec3, dist: f32) -> Self {
        Self {
            normal: normal.as_dvec3(),
            dist: f64::from(dist),
        }
    }

    fn distance_to(&self, point: DVec3) -> f64 {
        self.normal.dot(point) - self.dist
    }

    fn coincides_with(&self, other: &Self) -> bool {
        (self.normal - other.normal).abs().max_element() < NORMAL_EPSILON
            && (self.dist - other.dist).abs() < ON_EPSILON
    }

    /// Rescale to a unit normal; `None` for zero or non-finite planes
    fn normalized(&self) -> Option<Self> {
        let length = self.normal.length();
        if !length.is_finite() || length < NORMAL_EPSILON || !self.dist.is_finite() {
            return None;
        }
        Some(Self {
            normal: self.normal / length,
            dist: self.dist / length,
        })
    }
}

/// One polygonal face of a [`Polyhedron`]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PolyFace {
    /// Outward normal of the face's plane
    pub normal: Vec3,
    /// Vertex indices, counter-clockwise seen from outside
    pub indices: Vec<u32>,
}

/// A closed convex polyhedron with shared vertices
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Polyhedron {
    vertices: Vec<Vec3>,
    faces: Vec<PolyFace>,
}

impl Polyhedron {
    /// Intersect half-spaces into a closed polyhedron
    ///
    /// Returns `None` when the planes do not enclose a finite, non-empty
    /// volume: too few planes, contradictory planes, or an open side.
    /// Coincident duplicate planes contribute a single face.
    pub fn from_half_spaces(planes: &[HalfSpace]) -> Option<Self> {
        let planes = planes
            .iter()
            .map(HalfSpace::normalized)
            .collect::<Option<Vec<_>>>()?;
        if planes.len() < 4 {
            return None;
        }

        let mut windings = Vec::with_capacity(planes.len());
        for (i, plane) in planes.iter().enumerate() {
            if planes[..i].iter().any(|p| p.coincides_with(plane)) {
                continue;
            }

            let mut winding = base_winding(plane);
            for (j, other) in planes.iter().enumerate() {
                if j == i || other.coincides_with(plane) {
                    continue;
                }
                winding = clip_winding(&winding, other);
                if winding.len() < 3 {
                    break;
                }
            }

            if winding.len() >= 3 {
                windings.push((plane.normal, winding));
            }
        }

        let polyhedron = weld(&windings)?;
        (polyhedron.volume() > ON_EPSILON).then_some(polyhedron)
    }

    /// Vertex positions
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    /// Faces, each indexing into [`Self::vertices`]
    pub fn faces(&self) -> &[PolyFace] {
        &self.faces
    }

    /// Unique undirected edges as sorted index pairs
    pub fn edges(&self) -> Vec<(u32, u32)> {
        let mut edges = BTreeSet::new();
        for face in &self.faces {
            let n = face.indices.len();
            for k in 0..n {
                let a = face.indices[k];
                let b = face.indices[(k + 1) % n];
                edges.insert((a.min(b), a.max(b)));
            }
        }
        edges.into_iter().collect()
    }

    /// Enclosed volume
    pub fn volume(&self) -> f64 {
        let mut six_volume = 0.0;
        for face in &self.faces {
            let corner = |k: usize| self.vertices[face.indices[k] as usize].as_dvec3();
            let v0 = corner(0);
            for k in 1..face.indices.len() - 1 {
                six_volume += v0.dot(corner(k).cross(corner(k + 1)));
            }
        }
        six_volume / 6.0
    }

    /// Axis-aligned bounds as `(min, max)`
    pub fn bounds(&self) -> (Vec3, Vec3) {
        self.vertices.iter().fold(
            (Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY)),
            |(min, max), &v| (min.min(v), max.max(v)),
        )
    }
}

/// A large square on `plane`, wound counter-clockwise around its normal
fn base_winding(plane: &HalfSpace) -> Vec<DVec3> {
    let n = plane.normal;
    let abs = n.abs();
    let up = if abs.z >= abs.x && abs.z >= abs.y {
        DVec3::X
    } else {
        DVec3::Z
    };

    let up = (up - n * up.dot(n)).normalize() * BASE_WINDING_EXTENT;
    let right = n.cross(up);
    let origin = n * plane.dist;

    vec![
        origin - right + up,
        origin + right + up,
        origin + right - up,
        origin - right - up,
    ]
}

/// Keep the part of `winding` behind `plane`
fn clip_winding(winding: &[DVec3], plane: &HalfSpace) -> Vec<DVec3> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Side {
        Front,
        Back,
        On,
    }

    let dists: Vec<f64> = winding.iter().map(|&p| plane.distance_to(p)).collect();
    let sides: Vec<Side> = dists
        .iter()
        .map(|&d| {
            if d > ON_EPSILON {
                Side::Front
            } else if d < -ON_EPSILON {
                Side::Back
            } else {
                Side::On
            }
        })
        .collect();

    if !sides.contains(&Side::Front) {
        return winding.to_vec();
    }
    if !sides.contains(&Side::Back) {
        return Vec::new();
    }

    let n = winding.len();
    let mut clipped = Vec::with_capacity(n + 4);
    for i in 0..n {
        let p1 = winding[i];
        match sides[i] {
            Side::On => {
                clipped.push(p1);
                continue;
            }
            Side::Back => clipped.push(p1),
            Side::Front => {}
        }

        let next = (i + 1) % n;
        if sides[next] == Side::On || sides[next] == sides[i] {
            continue;
        }

        let p2 = winding[next];
        let t = dists[i] / (dists[i] - dists[next]);
        let mut mid = p1 + (p2 - p1) * t;
        // Snap axial planes exactly
        for axis in 0..3 {
            if plane.normal[axis] == 1.0 {
                mid[axis] = plane.dist;
            } else if plane.normal[axis] == -1.0 {
                mid[axis] = -plane.dist;
            }
        }
        clipped.push(mid);
    }
    clipped
}

/// Merge face windings into shared vertices and validate closure
fn weld(windings: &[(DVec3, Vec<DVec3>)]) -> Option<Polyhedron> {
    let mut points: Vec<DVec3> = Vec::new();
    let mut faces = Vec::with_capacity(windings.len());

    for (normal, winding) in windings {
        let mut indices: Vec<u32> = Vec::with_capacity(winding.len());
        for &p in winding {
            if p.abs().max_element() > MAX_MAP_EXTENT {
                // Still touching the base winding: the solid is open
                return None;
            }
            let index = match points.iter().position(|q| q.distance(p) < ON_EPSILON) {
                Some(existing) => existing,
                None => {
                    points.push(p);
                    points.len() - 1
                }
            } as u32;
            if indices.last() != Some(&index) {
                indices.push(index);
            }
        }
        if indices.len() > 1 && indices.first() == indices.last() {
            indices.pop();
        }
        if indices.len() >= 3 {
            faces.push(PolyFace {
                normal: normal.as_vec3(),
                indices,
            });
        }
    }

    if faces.len() < 4 {
        return None;
    }

    Some(Polyhedron {
        vertices: points.iter().map(DVec3::as_vec3).collect(),
        faces,
    })
}
