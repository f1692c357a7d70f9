//! Lump reader for BSP files
//!
//! [`BspParser`] validates the header and pulls every lump the overlay needs
//! into an owned [`BspData`]. Nothing is shared with the caller until the
//! whole file has been read, so a failed parse has no side effects.

use std::io::{Read, Seek, SeekFrom};

use crate::entities::{Landmark, scan_landmarks};
use crate::error::{BspError, Result};
use crate::header::{BspHeader, LumpKind};
use crate::records::{Brush, BrushSide, Leaf, LeafLayout, LeafV0, Leaves, LumpRecord, Node, Plane};

/// Every lump needed to rebuild a map's brushes, decoded
#[derive(Debug, Clone)]
pub struct BspData {
    /// File header
    pub header: BspHeader,
    /// Raw entity text
    pub entities: Vec<u8>,
    /// Plane equations
    pub planes: Vec<Plane>,
    /// Tree nodes
    pub nodes: Vec<Node>,
    /// Tree leaves, in the file's layout
    pub leaves: Leaves,
    /// Brush indices referenced by leaves
    pub leaf_brushes: Vec<u16>,
    /// Brushes
    pub brushes: Vec<Brush>,
    /// Brush sides
    pub brush_sides: Vec<BrushSide>,
}

impl BspData {
    /// Landmark entities found in the entity lump, in file order
    pub fn landmarks(&self) -> Result<Vec<Landmark>> {
        scan_landmarks(&self.entities)
    }
}

/// Reader for BSP files
///
/// # Examples
///
/// ```rust,no_run
/// use std::fs::File;
/// use std::io::BufReader;
/// use source_bsp::parser::BspParser;
///
/// let file = File::open("maps/d1_trainstation_01.bsp").unwrap();
/// let mut reader = BufReader::new(file);
/// let data = BspParser::new().parse(&mut reader).unwrap();
/// println!("{} brushes", data.brushes.len());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct BspParser {
    accept_packed_version: bool,
}

impl BspParser {
    /// Create a parser that accepts versions 19 and 20
    pub fn new() -> Self {
        Self::default()
    }

    /// Also accept the vendor-packed version field
    ///
    /// Only enable this when running under the game that writes such files;
    /// the packed field is otherwise indistinguishable from garbage.
    pub fn with_packed_version(mut self, accept: bool) -> Self {
        self.accept_packed_version = accept;
        self
    }

    /// Read just the header
    pub fn parse_header<R: Read + Seek>(&self, reader: &mut R) -> Result<BspHeader> {
        reader.seek(SeekFrom::Start(0))?;
        BspHeader::read(reader, self.accept_packed_version)
    }

    /// Read the header and every overlay lump
    pub fn parse<R: Read + Seek>(&self, reader: &mut R) -> Result<BspData> {
        let stream_len = reader.seek(SeekFrom::End(0))?;
        let header = self.parse_header(reader)?;

        let entities = read_lump_bytes(reader, &header, LumpKind::Entities, stream_len)?;
        let planes = read_records::<Plane, _>(reader, &header, LumpKind::Planes, stream_len)?;
        let nodes = read_records::<Node, _>(reader, &header, LumpKind::Nodes, stream_len)?;
        let leaves = match header.version.leaf_layout() {
            LeafLayout::V0 => Leaves::V0(read_records::<LeafV0, _>(
                reader,
                &header,
                LumpKind::Leaves,
                stream_len,
            )?),
            LeafLayout::V1 => Leaves::V1(read_records::<Leaf, _>(
                reader,
                &header,
                LumpKind::Leaves,
                stream_len,
            )?),
        };
        let leaf_brushes = read_records::<u16, _>(reader, &header, LumpKind::LeafBrushes, stream_len)?;
        let brushes = read_records::<Brush, _>(reader, &header, LumpKind::Brushes, stream_len)?;
        let brush_sides = read_records::<BrushSide, _>(reader, &header, LumpKind::BrushSides, stream_len)?;

        log::debug!(
            "Read {} planes, {} nodes, {} leaves ({:?}), {} leaf brushes, {} brushes, {} brush sides",
            planes.len(),
            nodes.len(),
            leaves.len(),
            leaves.layout(),
            leaf_brushes.len(),
            brushes.len(),
            brush_sides.len()
        );

        Ok(BspData {
            header,
            entities,
            planes,
            nodes,
            leaves,
            leaf_brushes,
            brushes,
            brush_sides,
        })
    }
}

/// Read the raw bytes of one lump
fn read_lump_bytes<R: Read + Seek>(
    reader: &mut R,
    header: &BspHeader,
    kind: LumpKind,
    stream_len: u64,
) -> Result<Vec<u8>> {
    let lump = header.lump(kind);
    let (offset, length) = lump
        .byte_range(stream_len)
        .ok_or_else(|| BspError::truncated(kind.name()))?;

    reader
        .seek(SeekFrom::Start(offset))
        .map_err(|e| BspError::from_io(e, kind.name()))?;

    let mut bytes = vec![0u8; length];
    reader
        .read_exact(&mut bytes)
        .map_err(|e| BspError::from_io(e, kind.name()))?;

    log::trace!("{}: {} bytes at offset {}", kind, length, offset);
    Ok(bytes)
}

/// Read one lump as an array of fixed-size records
fn read_records<T: LumpRecord, R: Read + Seek>(
    reader: &mut R,
    header: &BspHeader,
    kind: LumpKind,
    stream_len: u64,
) -> Result<Vec<T>> {
    let bytes = read_lump_bytes(reader, header, kind, stream_len)?;
    if bytes.len() % T::SIZE != 0 {
        return Err(BspError::MisalignedLump {
            lump: kind,
            length: bytes.len(),
            record_size: T::SIZE,
        });
    }

    bytes
        .chunks_exact(T::SIZE)
        .map(|mut record| T::read(&mut record))
        .collect::<std::io::Result<Vec<T>>>()
        .map_err(|e| BspError::from_io(e, kind.name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{HEADER_SIZE, LUMP_DESCRIPTOR_SIZE, VBSP_MAGIC};
    use std::io::Cursor;

    fn file_with_lump(kind: LumpKind, payload: &[u8]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&VBSP_MAGIC.to_le_bytes());
        data.extend_from_slice(&20i32.to_le_bytes());
        data.resize(HEADER_SIZE, 0);
        let slot = 8 + kind.index() * LUMP_DESCRIPTOR_SIZE;
        data[slot..slot + 4].copy_from_slice(&(HEADER_SIZE as i32).to_le_bytes());
        data[slot + 4..slot + 8].copy_from_slice(&(payload.len() as i32).to_le_bytes());
        data.extend_from_slice(payload);
        data
    }

    #[test]
    fn test_parse_empty_lumps() {
        let data = file_with_lump(LumpKind::Entities, b"");
        let parsed = BspParser::new().parse(&mut Cursor::new(data)).unwrap();
        assert!(parsed.planes.is_empty());
        assert!(parsed.nodes.is_empty());
        assert!(parsed.leaves.is_empty());
        assert_eq!(parsed.leaves.layout(), LeafLayout::V1);
    }

    #[test]
    fn test_leaf_brush_lump() {
        let payload: Vec<u8> = [3u16, 5, 7].iter().flat_map(|v| v.to_le_bytes()).collect();
        let data = file_with_lump(LumpKind::LeafBrushes, &payload);
        let parsed = BspParser::new().parse(&mut Cursor::new(data)).unwrap();
        assert_eq!(parsed.leaf_brushes, vec![3, 5, 7]);
    }

    #[test]
    fn test_misaligned_lump() {
        let data = file_with_lump(LumpKind::Brushes, &[0u8; 13]);
        let err = BspParser::new().parse(&mut Cursor::new(data)).unwrap_err();
        assert!(matches!(
            err,
            BspError::MisalignedLump {
                lump: LumpKind::Brushes,
                length: 13,
                record_size: 12
            }
        ));
    }

    #[test]
    fn test_lump_past_end_is_truncated() {
        let mut data = file_with_lump(LumpKind::Planes, &[0u8; 40]);
        data.truncate(data.len() - 1);
        let err = BspParser::new().parse(&mut Cursor::new(data)).unwrap_err();
        assert!(matches!(err, BspError::TruncatedFile(lump) if lump == "LUMP_PLANES"));
    }
}
