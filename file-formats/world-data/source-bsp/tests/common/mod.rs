//! Synthetic BSP files for integration tests

#![allow(dead_code)]

use source_bsp::{Contents, HEADER_SIZE, LumpKind, VBSP_MAGIC};

/// Route library log output through the test harness
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Plane as written to disk
#[derive(Debug, Clone, Copy)]
pub struct RawPlane {
    pub normal: [f32; 3],
    pub dist: f32,
    pub kind: i32,
}

/// Builder for a minimal but well-formed BSP file
#[derive(Debug, Clone)]
pub struct BspBuilder {
    pub version: i32,
    pub entities: String,
    pub planes: Vec<RawPlane>,
    /// `(front, back)` child references
    pub nodes: Vec<[i32; 2]>,
    /// `(first_leaf_brush, num_leaf_brushes)`
    pub leaves: Vec<(u16, u16)>,
    pub leaf_brushes: Vec<u16>,
    /// `(first_side, num_sides, contents)`
    pub brushes: Vec<(i32, i32, Contents)>,
    /// `(plane, bevel)`
    pub brush_sides: Vec<(u16, bool)>,
}

impl Default for BspBuilder {
    fn default() -> Self {
        Self {
            version: 20,
            entities: String::new(),
            planes: Vec::new(),
            nodes: Vec::new(),
            leaves: Vec::new(),
            leaf_brushes: Vec::new(),
            brushes: Vec::new(),
            brush_sides: Vec::new(),
        }
    }
}

impl BspBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an axis-aligned box brush spanning `min..max`, returning its index
    pub fn add_box(&mut self, min: [f32; 3], max: [f32; 3], contents: Contents) -> u16 {
        let first_side = self.brush_sides.len() as i32;
        for axis in 0..3 {
            let mut normal = [0.0; 3];
            normal[axis] = 1.0;
            self.add_side(normal, max[axis], axis as i32, false);
            normal[axis] = -1.0;
            self.add_side(normal, -min[axis], axis as i32, false);
        }
        self.brushes.push((first_side, 6, contents));
        (self.brushes.len() - 1) as u16
    }

    /// Add a side on a new plane to the brush being assembled
    pub fn add_side(&mut self, normal: [f32; 3], dist: f32, kind: i32, bevel: bool) {
        self.planes.push(RawPlane { normal, dist, kind });
        self.brush_sides
            .push(((self.planes.len() - 1) as u16, bevel));
    }

    /// One node whose two leaves each reference every brush
    pub fn with_single_node_tree(mut self) -> Self {
        let all: Vec<u16> = (0..self.brushes.len() as u16).collect();
        self.leaf_brushes = all.iter().chain(all.iter()).copied().collect();
        let count = all.len() as u16;
        self.leaves = vec![(0, count), (count, count)];
        self.nodes = vec![[-1, -2]];
        self
    }

    pub fn with_landmark(mut self, name: &str, origin: [f32; 3]) -> Self {
        self.entities.push_str(&format!(
            "{{\n\"origin\" \"{} {} {}\"\n\"targetname\" \"{}\"\n\"classname\" \"info_landmark\"\n}}\n",
            origin[0], origin[1], origin[2], name
        ));
        self
    }

    pub fn with_version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut entities = format!(
            "{{\n\"classname\" \"worldspawn\"\n}}\n{}",
            self.entities
        )
        .into_bytes();
        entities.push(0);

        let planes = self.planes.iter().fold(Vec::new(), |mut out, p| {
            for v in p.normal {
                out.extend_from_slice(&v.to_le_bytes());
            }
            out.extend_from_slice(&p.dist.to_le_bytes());
            out.extend_from_slice(&p.kind.to_le_bytes());
            out
        });

        let nodes = self.nodes.iter().fold(Vec::new(), |mut out, children| {
            out.extend_from_slice(&0i32.to_le_bytes());
            out.extend_from_slice(&children[0].to_le_bytes());
            out.extend_from_slice(&children[1].to_le_bytes());
            out.extend_from_slice(&[0u8; 20]);
            out
        });

        let leaves = self.leaves.iter().fold(Vec::new(), |mut out, &(first, count)| {
            out.extend_from_slice(&1u32.to_le_bytes());
            out.extend_from_slice(&[0u8; 20]);
            out.extend_from_slice(&first.to_le_bytes());
            out.extend_from_slice(&count.to_le_bytes());
            out.extend_from_slice(&(-1i16).to_le_bytes());
            if self.version < 20 {
                out.extend_from_slice(&[0u8; 24]);
            }
            out.extend_from_slice(&[0u8; 2]);
            out
        });

        let leaf_brushes: Vec<u8> = self
            .leaf_brushes
            .iter()
            .flat_map(|b| b.to_le_bytes())
            .collect();

        let brushes = self
            .brushes
            .iter()
            .fold(Vec::new(), |mut out, &(first, count, contents)| {
                out.extend_from_slice(&first.to_le_bytes());
                out.extend_from_slice(&count.to_le_bytes());
                out.extend_from_slice(&contents.bits().to_le_bytes());
                out
            });

        let brush_sides = self
            .brush_sides
            .iter()
            .fold(Vec::new(), |mut out, &(plane, bevel)| {
                out.extend_from_slice(&plane.to_le_bytes());
                out.extend_from_slice(&0i16.to_le_bytes());
                out.extend_from_slice(&(-1i16).to_le_bytes());
                out.push(u8::from(bevel));
                out.push(0);
                out
            });

        let lumps = [
            (LumpKind::Entities, entities),
            (LumpKind::Planes, planes),
            (LumpKind::Nodes, nodes),
            (LumpKind::Leaves, leaves),
            (LumpKind::LeafBrushes, leaf_brushes),
            (LumpKind::Brushes, brushes),
            (LumpKind::BrushSides, brush_sides),
        ];

        let mut data = Vec::new();
        data.extend_from_slice(&VBSP_MAGIC.to_le_bytes());
        data.extend_from_slice(&self.version.to_le_bytes());
        data.resize(HEADER_SIZE, 0);
        data[HEADER_SIZE - 4..].copy_from_slice(&7i32.to_le_bytes());

        for (kind, payload) in lumps {
            let slot = 8 + kind.index() * 16;
            let offset = data.len() as i32;
            data[slot..slot + 4].copy_from_slice(&offset.to_le_bytes());
            data[slot + 4..slot + 8].copy_from_slice(&(payload.len() as i32).to_le_bytes());
            data.extend_from_slice(&payload);
        }
        data
    }
}

/// A map with one solid box, one water box and a landmark
pub fn box_map(landmark: (&str, [f32; 3])) -> BspBuilder {
    let mut builder = BspBuilder::new();
    builder.add_box([-64.0, -64.0, 0.0], [64.0, 64.0, 128.0], Contents::SOLID);
    builder.add_box([0.0, 0.0, 0.0], [32.0, 32.0, 32.0], Contents::WATER);
    builder
        .with_single_node_tree()
        .with_landmark(landmark.0, landmark.1)
}
