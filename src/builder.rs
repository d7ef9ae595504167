use crate::registry::{BlockRegistry, StateRegistry};
use crate::schematic::{local_position, Schematic, MAX_DIMENSION};
use crate::varint::write_varint;
use bytes::BytesMut;
use schem_common::{Block, BlockPos, BlockState, Position, Result, SchemError};
use schem_logger::log;
use schem_logger::LogSeverity::Debug;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Collects sparse block placements and packs them into a [`Schematic`].
///
/// Placement methods take `&self`, so one builder can be shared between threads;
/// the last write to a coordinate wins.
#[derive(Debug)]
pub struct SchematicBuilder<R: BlockRegistry = StateRegistry> {
    registry: R,
    // Point -> Block, a missing value is air
    blocks: Mutex<HashMap<BlockPos, Block>>,
    offset: Mutex<BlockPos>,
}

impl SchematicBuilder<StateRegistry> {
    pub fn new() -> Self {
        Self::with_registry(StateRegistry::new())
    }
}

impl Default for SchematicBuilder<StateRegistry> {
    fn default() -> Self {
        Self::new()
    }
}

// Map inserts are atomic, a poisoned lock still holds consistent data.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<R: BlockRegistry> SchematicBuilder<R> {
    pub fn with_registry(registry: R) -> Self {
        Self {
            registry,
            blocks: Mutex::new(HashMap::new()),
            offset: Mutex::new(BlockPos::ZERO),
        }
    }

    /// Places `block` in the cell containing `(x, y, z)`.
    pub fn add_block(&self, x: f64, y: f64, z: f64, block: impl Into<Block>) {
        self.add_block_at(Position::new(x, y, z).floor(), block);
    }

    pub fn add_block_at(&self, pos: BlockPos, block: impl Into<Block>) {
        lock(&self.blocks).insert(pos, block.into());
    }

    pub fn set_offset(&self, x: f64, y: f64, z: f64) {
        self.set_offset_at(Position::new(x, y, z).floor());
    }

    /// Base offset added to the minimum placed corner when building.
    pub fn set_offset_at(&self, offset: BlockPos) {
        *lock(&self.offset) = offset;
    }

    /// Number of distinct coordinates placed so far.
    pub fn len(&self) -> usize {
        lock(&self.blocks).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Packs the placements into a schematic.
    ///
    /// Fails with [`SchemError::EncodingInvariant`] when the placed region is wider
    /// than [`MAX_DIMENSION`] on some axis, or when the configured offset pushes its
    /// corner outside the `i32` range.
    pub fn build(&self) -> Result<Schematic> {
        // Held for the whole build so concurrent placements cannot tear the snapshot.
        let blocks = lock(&self.blocks);
        let configured_offset = *lock(&self.offset);

        let mut points = blocks.keys().copied();
        let Some(first) = points.next() else {
            return Ok(Schematic::empty());
        };
        let (min, max) = points.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));

        let size = BlockPos::new(
            extent(min.x, max.x, "x")?,
            extent(min.y, max.y, "y")?,
            extent(min.z, max.z, "z")?,
        );
        let offset = configured_offset.checked_add(min).ok_or_else(|| {
            SchemError::EncodingInvariant(format!(
                "Offset {} plus minimum corner {} overflows",
                configured_offset, min
            ))
        })?;
        let block_count = size.volume();

        // Air is always palette id 0, unplaced cells encode as 0
        let air = self.registry.default_state();
        let mut palette_ids: HashMap<BlockState, u32> = HashMap::new();
        let mut palette: Vec<BlockState> = Vec::new();
        palette_ids.insert(air.clone(), 0);
        palette.push(air);

        let mut block_entities = HashMap::new();
        // Sized for a palette under 128 entries, i.e. one byte per cell. Covers the
        // whole bounding box, so widely spread placements allocate that much too.
        let mut cells = BytesMut::with_capacity(block_count);

        for index in 0..block_count {
            let block_pos = local_position(size, index) + min;

            let Some(block) = blocks.get(&block_pos) else {
                write_varint(&mut cells, 0);
                continue;
            };

            let block_id = match palette_ids.get(&block.state) {
                Some(&id) => id,
                None => {
                    let id = palette.len() as u32;
                    palette_ids.insert(block.state.clone(), id);
                    palette.push(block.state.clone());
                    id
                }
            };

            if self.registry.has_extra_state(block) {
                if let Some(nbt) = self.registry.extra_state(block) {
                    block_entities.insert(block_pos, nbt);
                }
            }

            write_varint(&mut cells, block_id);
        }

        log(
            format!(
                "Built schematic {}x{}x{} at {} from {} placements ({} palette entries, {} block entities)",
                size.x,
                size.y,
                size.z,
                offset,
                blocks.len(),
                palette.len(),
                block_entities.len()
            ),
            Debug,
        );

        Ok(Schematic::new(size, offset, palette, cells.to_vec(), block_entities))
    }
}

/// Number of cells from `min` to `max` inclusive on one axis.
fn extent(min: i32, max: i32, axis: &str) -> Result<i32> {
    let span = i64::from(max) - i64::from(min) + 1;
    if span > i64::from(MAX_DIMENSION) {
        return Err(SchemError::EncodingInvariant(format!(
            "Placements span {} blocks on the {} axis, at most {} fit",
            span, axis, MAX_DIMENSION
        )));
    }
    Ok(span as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::varint::VarIntReader;
    use assert_matches::assert_matches;
    use schem_nbt::{Compound, Tag};
    use std::sync::Arc;
    use std::thread;

    fn stone() -> BlockState {
        BlockState::new("minecraft:stone")
    }

    fn chest_with_items() -> Block {
        let mut nbt = Compound::new();
        nbt.insert("Items".to_owned(), Tag::List(vec![]));
        Block::new(BlockState::new("minecraft:chest").with_property("facing", "north"))
            .with_nbt(nbt)
    }

    #[test]
    fn test_empty_builder() {
        let builder = SchematicBuilder::new();
        assert!(builder.is_empty());
        assert_eq!(builder.build().unwrap(), Schematic::empty());
    }

    #[test]
    fn test_single_block() {
        let builder = SchematicBuilder::new();
        builder.add_block(5.0, 5.0, 5.0, stone());

        let schematic = builder.build().unwrap();
        assert_eq!(schematic.size(), BlockPos::ONE);
        assert_eq!(schematic.offset(), BlockPos::new(5, 5, 5));
        assert_eq!(schematic.palette(), &[BlockState::air(), stone()]);
        assert_eq!(schematic.cells(), &[1]);
        assert!(schematic.block_entities().is_empty());
    }

    #[test]
    fn test_coordinates_are_floored() {
        let builder = SchematicBuilder::new();
        builder.add_block(-0.5, 2.9, 0.1, stone());
        assert_eq!(builder.build().unwrap().offset(), BlockPos::new(-1, 2, 0));
    }

    #[test]
    fn test_last_write_wins() {
        let builder = SchematicBuilder::new();
        builder.add_block_at(BlockPos::ZERO, stone());
        builder.add_block_at(BlockPos::ZERO, BlockState::new("minecraft:dirt"));

        let schematic = builder.build().unwrap();
        assert_eq!(builder.len(), 1);
        assert_eq!(schematic.palette()[1], BlockState::new("minecraft:dirt"));
        assert_eq!(schematic.palette().len(), 2);
    }

    #[test]
    fn test_holes_are_air() {
        let builder = SchematicBuilder::new();
        builder.add_block_at(BlockPos::new(0, 0, 0), stone());
        builder.add_block_at(BlockPos::new(2, 0, 0), stone());

        let schematic = builder.build().unwrap();
        assert_eq!(schematic.size(), BlockPos::new(3, 1, 1));
        assert_eq!(schematic.cells(), &[1, 0, 1]);
    }

    #[test]
    fn test_explicit_air_shares_id_zero() {
        let builder = SchematicBuilder::new();
        builder.add_block_at(BlockPos::new(0, 0, 0), stone());
        builder.add_block_at(BlockPos::new(1, 0, 0), Block::air());

        let schematic = builder.build().unwrap();
        assert_eq!(schematic.palette(), &[BlockState::air(), stone()]);
        assert_eq!(schematic.cells(), &[1, 0]);
    }

    #[test]
    fn test_configured_offset_added_to_min() {
        let builder = SchematicBuilder::new();
        builder.set_offset(10.0, -20.0, 0.0);
        builder.add_block_at(BlockPos::new(3, 4, -5), stone());
        builder.add_block_at(BlockPos::new(4, 6, -5), stone());

        let schematic = builder.build().unwrap();
        assert_eq!(schematic.size(), BlockPos::new(2, 3, 1));
        assert_eq!(schematic.offset(), BlockPos::new(13, -16, -5));
    }

    #[test]
    fn test_block_entities_recorded_at_absolute_position() {
        let builder = SchematicBuilder::new();
        builder.add_block_at(BlockPos::new(-2, 70, 4), stone());
        builder.add_block_at(BlockPos::new(-1, 71, 4), chest_with_items());

        let schematic = builder.build().unwrap();
        assert_eq!(schematic.block_entities().len(), 1);
        assert_eq!(
            schematic.block_entity(BlockPos::new(-1, 71, 4)),
            chest_with_items().nbt.as_ref()
        );
    }

    #[test]
    fn test_same_state_different_nbt_shares_palette_entry() {
        let builder = SchematicBuilder::new();
        let mut other = chest_with_items();
        other.nbt = Some(Compound::new());
        builder.add_block_at(BlockPos::new(0, 0, 0), chest_with_items());
        builder.add_block_at(BlockPos::new(1, 0, 0), other);

        let schematic = builder.build().unwrap();
        assert_eq!(schematic.palette().len(), 2);
        assert_eq!(schematic.cells(), &[1, 1]);
        assert_eq!(schematic.block_entities().len(), 2);
    }

    #[test]
    fn test_large_palette_uses_multi_byte_ids() {
        let builder = SchematicBuilder::new();
        for x in 0..200 {
            builder.add_block_at(BlockPos::new(x, 0, 0), BlockState::new(format!("test:b{}", x)));
        }

        let schematic = builder.build().unwrap();
        assert_eq!(schematic.palette().len(), 201);
        let ids: Vec<u32> = VarIntReader::new(schematic.cells())
            .map(|id| id.unwrap())
            .collect();
        assert_eq!(ids, (1..=200).collect::<Vec<u32>>());
        assert_eq!(schematic.cells().len(), 127 + 2 * 73);
    }

    #[test]
    fn test_extent_too_wide() {
        let builder = SchematicBuilder::new();
        builder.add_block_at(BlockPos::new(i32::MIN, 0, 0), stone());
        builder.add_block_at(BlockPos::new(i32::MAX, 0, 0), stone());
        assert_matches!(builder.build(), Err(SchemError::EncodingInvariant(msg)) if msg.contains("x axis"));

        let builder = SchematicBuilder::new();
        builder.add_block_at(BlockPos::new(0, 0, 0), stone());
        builder.add_block_at(BlockPos::new(0, 0, MAX_DIMENSION), stone());
        assert_matches!(builder.build(), Err(SchemError::EncodingInvariant(_)));

        let builder = SchematicBuilder::new();
        builder.add_block_at(BlockPos::new(0, 0, 0), stone());
        builder.add_block_at(BlockPos::new(0, 0, MAX_DIMENSION - 1), stone());
        assert_eq!(builder.build().unwrap().size(), BlockPos::new(1, 1, MAX_DIMENSION));
    }

    #[test]
    fn test_offset_overflow() {
        let builder = SchematicBuilder::new();
        builder.set_offset_at(BlockPos::new(0, i32::MAX, 0));
        builder.add_block_at(BlockPos::new(0, 1, 0), stone());
        assert_matches!(builder.build(), Err(SchemError::EncodingInvariant(_)));
    }

    #[test]
    fn test_concurrent_placement() {
        let builder = Arc::new(SchematicBuilder::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let builder = Arc::clone(&builder);
                thread::spawn(move || {
                    for x in 0..16 {
                        builder.add_block_at(BlockPos::new(x, t, 0), stone());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let schematic = builder.build().unwrap();
        assert_eq!(schematic.size(), BlockPos::new(16, 4, 1));
        assert!(schematic.cells().iter().all(|&id| id == 1));
    }
}
