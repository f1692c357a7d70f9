//! Fixed-size lump records
//!
//! Every record type implements [`LumpRecord`], which gives its on-disk size
//! and a little-endian decoder. Field layouts follow the Source engine's
//! `bspfile.h` for BSP versions 19 and 20.

use bitflags::bitflags;
use byteorder::{LittleEndian, ReadBytesExt};
use glam::Vec3;
use std::io::{self, Read};

/// A record stored as a flat array inside a lump
pub trait LumpRecord: Sized {
    /// Size of one record on disk
    const SIZE: usize;

    /// Decode one record
    fn read<R: Read>(reader: &mut R) -> io::Result<Self>;
}

fn read_vec3<R: Read>(reader: &mut R) -> io::Result<Vec3> {
    Ok(Vec3::new(
        reader.read_f32::<LittleEndian>()?,
        reader.read_f32::<LittleEndian>()?,
        reader.read_f32::<LittleEndian>()?,
    ))
}

fn read_short3<R: Read>(reader: &mut R) -> io::Result<[i16; 3]> {
    Ok([
        reader.read_i16::<LittleEndian>()?,
        reader.read_i16::<LittleEndian>()?,
        reader.read_i16::<LittleEndian>()?,
    ])
}

bitflags! {
    /// Brush and leaf content flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Contents: u32 {
        /// Blocks everything
        const SOLID = 0x1;
        /// Translucent but not watery
        const WINDOW = 0x2;
        /// Alpha-tested "grate" textures
        const GRATE = 0x8;
        /// Slime volume
        const SLIME = 0x10;
        /// Water volume
        const WATER = 0x20;
        /// Blocks line of sight
        const BLOCKLOS = 0x40;
        /// Blocks lighting
        const OPAQUE = 0x80;
        /// Blocks players only
        const PLAYERCLIP = 0x10000;
        /// Blocks NPCs only
        const MONSTERCLIP = 0x20000;
        /// Detail brush, not part of the vis hull
        const DETAIL = 0x0800_0000;
        /// Climbable
        const LADDER = 0x2000_0000;
    }
}

/// A plane equation: points `p` on the plane satisfy `normal · p == dist`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unit normal
    pub normal: Vec3,
    /// Distance from the origin along the normal
    pub dist: f32,
    /// Axis classification: 0..=2 for X/Y/Z-aligned normals, 3..=5 otherwise
    pub kind: i32,
}

impl Plane {
    /// Whether the normal is aligned with a coordinate axis
    pub fn is_axial(&self) -> bool {
        (0..=2).contains(&self.kind)
    }
}

impl LumpRecord for Plane {
    const SIZE: usize = 20;

    fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            normal: read_vec3(reader)?,
            dist: reader.read_f32::<LittleEndian>()?,
            kind: reader.read_i32::<LittleEndian>()?,
        })
    }
}

/// Decoded child reference of a tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRef {
    /// Index into the node lump
    Internal(usize),
    /// Index into the leaf lump
    Leaf(usize),
}

impl NodeRef {
    /// Decode a raw child value: negative values `c` refer to leaf `-c - 1`
    pub fn from_raw(raw: i32) -> Self {
        if raw >= 0 {
            Self::Internal(raw as usize)
        } else {
            // -(c + 1) cannot overflow for any negative i32
            Self::Leaf((-(raw + 1)) as usize)
        }
    }
}

/// Internal node of the BSP tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node {
    /// Splitting plane
    pub plane: i32,
    /// Raw child references (front, back)
    pub children: [i32; 2],
    /// Bounding box minimum
    pub mins: [i16; 3],
    /// Bounding box maximum
    pub maxs: [i16; 3],
    /// First face index
    pub first_face: u16,
    /// Number of faces
    pub num_faces: u16,
    /// Area index
    pub area: i16,
}

impl Node {
    /// Decoded child `side` (0 = front, 1 = back)
    pub fn child(&self, side: usize) -> NodeRef {
        NodeRef::from_raw(self.children[side])
    }
}

impl LumpRecord for Node {
    const SIZE: usize = 32;

    fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let node = Self {
            plane: reader.read_i32::<LittleEndian>()?,
            children: [
                reader.read_i32::<LittleEndian>()?,
                reader.read_i32::<LittleEndian>()?,
            ],
            mins: read_short3(reader)?,
            maxs: read_short3(reader)?,
            first_face: reader.read_u16::<LittleEndian>()?,
            num_faces: reader.read_u16::<LittleEndian>()?,
            area: reader.read_i16::<LittleEndian>()?,
        };
        reader.read_i16::<LittleEndian>()?; // padding
        Ok(node)
    }
}

/// The leaf-brush window of a leaf, shared by every leaf layout
pub trait LeafBrushRange {
    /// First entry in the leaf-brush lump
    fn first_leaf_brush(&self) -> u16;

    /// Number of consecutive leaf-brush entries
    fn num_leaf_brushes(&self) -> u16;
}

/// Leaf record layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafLayout {
    /// Version 19 leaves, carrying an inline ambient light cube
    V0,
    /// Version 20 leaves
    V1,
}

impl LeafLayout {
    /// Record size on disk
    pub const fn record_size(self) -> usize {
        match self {
            Self::V0 => LeafV0::SIZE,
            Self::V1 => Leaf::SIZE,
        }
    }
}

/// Leaf record (version 20 layout)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Leaf {
    /// Contents of the leaf volume
    pub contents: Contents,
    /// Visibility cluster
    pub cluster: i16,
    /// Packed area (9 bits) and flags (7 bits)
    pub area_flags: i16,
    /// Bounding box minimum
    pub mins: [i16; 3],
    /// Bounding box maximum
    pub maxs: [i16; 3],
    /// First entry in the leaf-face lump
    pub first_leaf_face: u16,
    /// Number of leaf faces
    pub num_leaf_faces: u16,
    /// First entry in the leaf-brush lump
    pub first_leaf_brush: u16,
    /// Number of leaf brushes
    pub num_leaf_brushes: u16,
    /// Water data index, -1 if none
    pub leaf_water_data_id: i16,
}

impl Leaf {
    fn read_fields<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            contents: Contents::from_bits_retain(reader.read_u32::<LittleEndian>()?),
            cluster: reader.read_i16::<LittleEndian>()?,
            area_flags: reader.read_i16::<LittleEndian>()?,
            mins: read_short3(reader)?,
            maxs: read_short3(reader)?,
            first_leaf_face: reader.read_u16::<LittleEndian>()?,
            num_leaf_faces: reader.read_u16::<LittleEndian>()?,
            first_leaf_brush: reader.read_u16::<LittleEndian>()?,
            num_leaf_brushes: reader.read_u16::<LittleEndian>()?,
            leaf_water_data_id: reader.read_i16::<LittleEndian>()?,
        })
    }
}

impl LumpRecord for Leaf {
    const SIZE: usize = 32;

    fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let leaf = Self::read_fields(reader)?;
        reader.read_i16::<LittleEndian>()?; // padding
        Ok(leaf)
    }
}

impl LeafBrushRange for Leaf {
    fn first_leaf_brush(&self) -> u16 {
        self.first_leaf_brush
    }

    fn num_leaf_brushes(&self) -> u16 {
        self.num_leaf_brushes
    }
}

/// Leaf record (version 19 layout)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafV0 {
    /// Fields shared with the version 20 layout
    pub leaf: Leaf,
    /// Six RGBE samples of the compressed ambient light cube
    pub ambient_lighting: [u8; 24],
}

impl LumpRecord for LeafV0 {
    const SIZE: usize = 56;

    fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let leaf = Leaf::read_fields(reader)?;
        let mut ambient_lighting = [0u8; 24];
        reader.read_exact(&mut ambient_lighting)?;
        reader.read_i16::<LittleEndian>()?; // padding
        Ok(Self {
            leaf,
            ambient_lighting,
        })
    }
}

impl LeafBrushRange for LeafV0 {
    fn first_leaf_brush(&self) -> u16 {
        self.leaf.first_leaf_brush
    }

    fn num_leaf_brushes(&self) -> u16 {
        self.leaf.num_leaf_brushes
    }
}

/// The leaf lump in whichever layout the file uses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Leaves {
    /// Version 19 leaves
    V0(Vec<LeafV0>),
    /// Version 20 leaves
    V1(Vec<Leaf>),
}

impl Leaves {
    /// Number of leaves
    pub fn len(&self) -> usize {
        match self {
            Self::V0(leaves) => leaves.len(),
            Self::V1(leaves) => leaves.len(),
        }
    }

    /// Whether the lump holds no leaves
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Layout of the stored records
    pub fn layout(&self) -> LeafLayout {
        match self {
            Self::V0(_) => LeafLayout::V0,
            Self::V1(_) => LeafLayout::V1,
        }
    }

    /// Leaf-brush window of leaf `index`
    pub fn get(&self, index: usize) -> Option<&dyn LeafBrushRange> {
        match self {
            Self::V0(leaves) => leaves.get(index).map(|l| l as &dyn LeafBrushRange),
            Self::V1(leaves) => leaves.get(index).map(|l| l as &dyn LeafBrushRange),
        }
    }
}

impl LumpRecord for u16 {
    const SIZE: usize = 2;

    fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        reader.read_u16::<LittleEndian>()
    }
}

/// A convex solid: the intersection of the half-spaces behind its sides
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Brush {
    /// First entry in the brush-side lump
    pub first_side: i32,
    /// Number of sides, bevels included
    pub num_sides: i32,
    /// Content flags
    pub contents: Contents,
}

impl Brush {
    /// Whether the brush is built into overlay geometry
    pub fn is_solid(&self) -> bool {
        self.contents.contains(Contents::SOLID)
    }
}

impl LumpRecord for Brush {
    const SIZE: usize = 12;

    fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            first_side: reader.read_i32::<LittleEndian>()?,
            num_sides: reader.read_i32::<LittleEndian>()?,
            contents: Contents::from_bits_retain(reader.read_u32::<LittleEndian>()?),
        })
    }
}

/// One bounding plane of a brush
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrushSide {
    /// Plane index; the brush lies behind this plane
    pub plane: u16,
    /// Texture info index
    pub texinfo: i16,
    /// Displacement info index
    pub dispinfo: i16,
    /// Non-zero for collision-only bevel planes
    pub bevel: u8,
    /// Non-zero for thin sides
    pub thin: u8,
}

impl BrushSide {
    /// Whether this side only exists for collision smoothing
    pub fn is_bevel(&self) -> bool {
        self.bevel != 0
    }
}

impl LumpRecord for BrushSide {
    const SIZE: usize = 8;

    fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            plane: reader.read_u16::<LittleEndian>()?,
            texinfo: reader.read_i16::<LittleEndian>()?,
            dispinfo: reader.read_i16::<LittleEndian>()?,
            bevel: reader.read_u8()?,
            thin: reader.read_u8()?,
        })
    }
}
