//! BSP header structures and parsing

use byteorder::{LittleEndian, ReadBytesExt};
use std::fmt;
use std::io::{Cursor, Read};

use crate::error::{BspError, Result};
use crate::records::LeafLayout;

/// BSP header signature ('VBSP')
pub const VBSP_MAGIC: u32 = 0x5053_4256;

/// Number of lump slots in the header directory
pub const HEADER_LUMPS: usize = 64;

/// Size of one lump descriptor (offset, length, version, fourCC)
pub const LUMP_DESCRIPTOR_SIZE: usize = 16;

/// Total size of the fixed header
pub const HEADER_SIZE: usize = 4 + 4 + HEADER_LUMPS * LUMP_DESCRIPTOR_SIZE + 4;

/// Lump slots this crate reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LumpKind {
    /// Entity key/value text
    Entities,
    /// Plane equations
    Planes,
    /// Internal tree nodes
    Nodes,
    /// Tree leaves
    Leaves,
    /// Leaf to brush index list
    LeafBrushes,
    /// Brushes
    Brushes,
    /// Brush sides
    BrushSides,
}

impl LumpKind {
    /// Every lump needed to build an overlay, in file-directory order
    pub const ALL: [Self; 7] = [
        Self::Entities,
        Self::Planes,
        Self::Nodes,
        Self::Leaves,
        Self::LeafBrushes,
        Self::Brushes,
        Self::BrushSides,
    ];

    /// Slot of this lump in the header directory
    pub const fn index(self) -> usize {
        match self {
            Self::Entities => 0,
            Self::Planes => 1,
            Self::Nodes => 5,
            Self::Leaves => 10,
            Self::LeafBrushes => 17,
            Self::Brushes => 18,
            Self::BrushSides => 19,
        }
    }

    /// Lump name as used by the engine's tools
    pub const fn name(self) -> &'static str {
        match self {
            Self::Entities => "LUMP_ENTITIES",
            Self::Planes => "LUMP_PLANES",
            Self::Nodes => "LUMP_NODES",
            Self::Leaves => "LUMP_LEAFS",
            Self::LeafBrushes => "LUMP_LEAFBRUSHES",
            Self::Brushes => "LUMP_BRUSHES",
            Self::BrushSides => "LUMP_BRUSHSIDES",
        }
    }
}

impl fmt::Display for LumpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One entry of the header's lump directory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LumpDescriptor {
    /// Byte offset from the start of the file
    pub offset: i32,
    /// Length in bytes
    pub length: i32,
    /// Per-lump format version
    pub version: i32,
    /// Uncompressed size marker, zero for plain lumps
    pub four_cc: [u8; 4],
}

impl LumpDescriptor {
    /// Returns `(offset, length)` if the lump lies entirely within a stream of `stream_len` bytes
    pub fn byte_range(&self, stream_len: u64) -> Option<(u64, usize)> {
        let offset = u64::try_from(self.offset).ok()?;
        let length = u64::try_from(self.length).ok()?;
        let end = offset.checked_add(length)?;
        if end > stream_len {
            return None;
        }
        Some((offset, usize::try_from(length).ok()?))
    }
}

/// Recognised header versions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BspVersion {
    /// Version 19, with the older leaf layout
    V19,
    /// Version 20
    V20,
    /// Vendor build that packs extra data into the high bits of the version field
    Packed(i32),
}

impl BspVersion {
    /// Classify a raw header version
    ///
    /// Packed versions are only accepted when `accept_packed` is set, which the
    /// caller derives from its own check of which game it is running under.
    pub fn from_raw(raw: i32, accept_packed: bool) -> Result<Self> {
        match raw {
            19 => Ok(Self::V19),
            20 => Ok(Self::V20),
            _ if accept_packed && (raw >> 16) != 20 => Ok(Self::Packed(raw)),
            _ => Err(BspError::UnsupportedVersion(raw)),
        }
    }

    /// The version number as stored in the file
    pub fn raw(self) -> i32 {
        match self {
            Self::V19 => 19,
            Self::V20 => 20,
            Self::Packed(raw) => raw,
        }
    }

    /// Leaf record layout used by this version
    pub fn leaf_layout(self) -> LeafLayout {
        if self.raw() < 20 {
            LeafLayout::V0
        } else {
            LeafLayout::V1
        }
    }
}

impl fmt::Display for BspVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V19 => write!(f, "19"),
            Self::V20 => write!(f, "20"),
            Self::Packed(raw) => write!(f, "{} (packed 0x{:08X})", raw & 0xFFFF, raw),
        }
    }
}

/// The fixed-size file header
#[derive(Debug, Clone)]
pub struct BspHeader {
    /// Header version
    pub version: BspVersion,
    /// Lump directory, indexed by slot
    pub lumps: [LumpDescriptor; HEADER_LUMPS],
    /// Map revision counter written by the compiler
    pub map_revision: i32,
}

impl BspHeader {
    /// Read and validate the header from the start of `reader`
    pub fn read<R: Read>(reader: &mut R, accept_packed: bool) -> Result<Self> {
        let mut raw = [0u8; HEADER_SIZE];
        reader
            .read_exact(&mut raw)
            .map_err(|e| BspError::from_io(e, "header"))?;
        let mut cursor = Cursor::new(&raw[..]);

        let ident = cursor.read_u32::<LittleEndian>()?;
        if ident != VBSP_MAGIC {
            return Err(BspError::NotThisFormat {
                expected: VBSP_MAGIC,
                found: ident,
            });
        }

        let version = BspVersion::from_raw(cursor.read_i32::<LittleEndian>()?, accept_packed)?;

        let mut lumps = [LumpDescriptor::default(); HEADER_LUMPS];
        for lump in &mut lumps {
            lump.offset = cursor.read_i32::<LittleEndian>()?;
            lump.length = cursor.read_i32::<LittleEndian>()?;
            lump.version = cursor.read_i32::<LittleEndian>()?;
            cursor.read_exact(&mut lump.four_cc)?;
        }
        let map_revision = cursor.read_i32::<LittleEndian>()?;

        log::debug!(
            "BSP header: version {}, map revision {}",
            version,
            map_revision
        );

        Ok(Self {
            version,
            lumps,
            map_revision,
        })
    }

    /// Directory entry for a lump
    pub fn lump(&self, kind: LumpKind) -> &LumpDescriptor {
        &self.lumps[kind.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(magic: u32, version: i32) -> Vec<u8> {
        let mut data = Vec::with_capacity(HEADER_SIZE);
        data.extend_from_slice(&magic.to_le_bytes());
        data.extend_from_slice(&version.to_le_bytes());
        data.resize(HEADER_SIZE, 0);
        data
    }

    #[test]
    fn test_header_size() {
        assert_eq!(HEADER_SIZE, 1036);
    }

    #[test]
    fn test_read_valid_header() {
        let mut data = header_bytes(VBSP_MAGIC, 20);
        let planes = 8 + LumpKind::Planes.index() * LUMP_DESCRIPTOR_SIZE;
        data[planes..planes + 4].copy_from_slice(&1036i32.to_le_bytes());
        data[planes + 4..planes + 8].copy_from_slice(&40i32.to_le_bytes());

        let header = BspHeader::read(&mut data.as_slice(), false).unwrap();
        assert_eq!(header.version, BspVersion::V20);
        assert_eq!(header.lump(LumpKind::Planes).offset, 1036);
        assert_eq!(header.lump(LumpKind::Planes).length, 40);
        assert_eq!(header.lump(LumpKind::Nodes).length, 0);
    }

    #[test]
    fn test_bad_magic() {
        let data = header_bytes(0x5053_4249, 38);
        let err = BspHeader::read(&mut data.as_slice(), false).unwrap_err();
        assert!(matches!(err, BspError::NotThisFormat { found: 0x5053_4249, .. }));
    }

    #[test]
    fn test_short_header() {
        let data = header_bytes(VBSP_MAGIC, 20);
        let err = BspHeader::read(&mut &data[..100], false).unwrap_err();
        assert!(matches!(err, BspError::TruncatedFile(_)));
    }

    #[test]
    fn test_version_classification() {
        assert_eq!(BspVersion::from_raw(19, false).unwrap(), BspVersion::V19);
        assert_eq!(BspVersion::from_raw(20, true).unwrap(), BspVersion::V20);
        assert!(matches!(
            BspVersion::from_raw(21, false),
            Err(BspError::UnsupportedVersion(21))
        ));

        let packed = (4 << 16) | 20;
        assert_eq!(
            BspVersion::from_raw(packed, true).unwrap(),
            BspVersion::Packed(packed)
        );
        assert!(BspVersion::from_raw(packed, false).is_err());
        assert!(BspVersion::from_raw(20 << 16, true).is_err());
    }

    #[test]
    fn test_leaf_layout_by_version() {
        assert_eq!(BspVersion::V19.leaf_layout(), LeafLayout::V0);
        assert_eq!(BspVersion::V20.leaf_layout(), LeafLayout::V1);
        assert_eq!(BspVersion::Packed((4 << 16) | 20).leaf_layout(), LeafLayout::V1);
    }

    #[test]
    fn test_lump_byte_range() {
        let lump = LumpDescriptor {
            offset: 100,
            length: 20,
            ..Default::default()
        };
        assert_eq!(lump.byte_range(120), Some((100, 20)));
        assert_eq!(lump.byte_range(119), None);

        let negative = LumpDescriptor {
            offset: -4,
            length: 20,
            ..Default::default()
        };
        assert_eq!(negative.byte_range(1000), None);
    }
}
