use crate::varint::VarIntReader;
use schem_common::{BlockPos, BlockState, SchemError};
use schem_nbt::Compound;
use std::collections::HashMap;

/// Largest extent on any axis; dimensions are stored as unsigned 16-bit values.
pub const MAX_DIMENSION: i32 = u16::MAX as i32;

/// A palette-compressed snapshot of a cuboid region.
///
/// Cells are stored as one VarInt palette id per cell, x varying fastest, then z,
/// then y. Block entities are keyed by absolute position.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schematic {
    size: BlockPos,
    offset: BlockPos,
    palette: Vec<BlockState>,
    cells: Vec<u8>,
    block_entities: HashMap<BlockPos, Compound>,
}

impl Schematic {
    pub fn new(
        size: BlockPos,
        offset: BlockPos,
        palette: Vec<BlockState>,
        cells: Vec<u8>,
        block_entities: HashMap<BlockPos, Compound>,
    ) -> Self {
        Self {
            size,
            offset,
            palette,
            cells,
            block_entities,
        }
    }

    /// The canonical empty schematic: zero size, no palette, no cells.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn size(&self) -> BlockPos {
        self.size
    }

    pub fn offset(&self) -> BlockPos {
        self.offset
    }

    pub fn palette(&self) -> &[BlockState] {
        &self.palette
    }

    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    pub fn block_entities(&self) -> &HashMap<BlockPos, Compound> {
        &self.block_entities
    }

    pub fn block_entity(&self, pos: BlockPos) -> Option<&Compound> {
        self.block_entities.get(&pos)
    }

    /// Number of cells in the region.
    pub fn volume(&self) -> usize {
        self.size.volume()
    }

    pub fn is_empty(&self) -> bool {
        self.volume() == 0
    }

    /// Position inside the region of the cell at linear `index`.
    pub fn local_position(&self, index: usize) -> BlockPos {
        local_position(self.size, index)
    }

    /// Decodes every cell id, checking that there are exactly `volume()` of them and
    /// that each one indexes the palette.
    pub fn validate(&self) -> Result<Vec<u32>, SchemError> {
        decode_cells(&self.cells, self.volume(), self.palette.len())
    }

    /// Iterates cells in storage order as `(local position, block state)`.
    ///
    /// Stops at the first undecodable cell; call [`validate`](Self::validate) first
    /// when the schematic did not come from the builder or reader.
    pub fn blocks(&self) -> impl Iterator<Item = (BlockPos, &BlockState)> + '_ {
        VarIntReader::new(&self.cells)
            .take(self.volume())
            .map_while(Result::ok)
            .enumerate()
            .filter_map(move |(index, id)| {
                let state = self.palette.get(id as usize)?;
                Some((self.local_position(index), state))
            })
    }

    pub fn into_parts(
        self,
    ) -> (
        BlockPos,
        BlockPos,
        Vec<BlockState>,
        Vec<u8>,
        HashMap<BlockPos, Compound>,
    ) {
        (
            self.size,
            self.offset,
            self.palette,
            self.cells,
            self.block_entities,
        )
    }
}

/// Linear index to (x, y, z) for x-fastest, then z, then y ordering.
pub(crate) fn local_position(size: BlockPos, index: usize) -> BlockPos {
    let width = size.x.max(1) as usize;
    let length = size.z.max(1) as usize;

    let y = index / (width * length);
    let remainder = index - y * width * length;
    let z = remainder / width;
    let x = remainder - z * width;
    BlockPos::new(x as i32, y as i32, z as i32)
}

pub(crate) fn decode_cells(
    cells: &[u8],
    volume: usize,
    palette_len: usize,
) -> Result<Vec<u32>, SchemError> {
    // Each cell takes at least one byte
    if cells.len() < volume {
        return Err(SchemError::MalformedDocument(format!(
            "Block data holds {} bytes, too few for {} cells",
            cells.len(),
            volume
        )));
    }

    let mut reader = VarIntReader::new(cells);
    let mut ids = Vec::with_capacity(volume);

    while ids.len() < volume {
        if reader.is_empty() {
            return Err(SchemError::MalformedDocument(format!(
                "Block data holds {} cells, expected {}",
                ids.len(),
                volume
            )));
        }
        let id = reader.read_varint()?;
        if id as usize >= palette_len {
            return Err(SchemError::EncodingInvariant(format!(
                "Cell {} references palette id {} but the palette has {} entries",
                ids.len(),
                id,
                palette_len
            )));
        }
        ids.push(id);
    }

    if !reader.is_empty() {
        return Err(SchemError::MalformedDocument(format!(
            "{} trailing bytes after {} cells of block data",
            reader.remaining(),
            volume
        )));
    }
    Ok(ids)
}
