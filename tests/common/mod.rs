use schem::{Block, BlockPos, BlockState, SchematicBuilder};
use schem_nbt::{Compound, Tag};

pub fn stone() -> BlockState {
    BlockState::new("minecraft:stone")
}

pub fn chest(item: &str) -> Block {
    let mut slot = Compound::new();
    slot.insert("id".to_string(), Tag::String(item.to_string()));
    slot.insert("Count".to_string(), Tag::Byte(3));
    slot.insert("Slot".to_string(), Tag::Byte(0));

    let mut nbt = Compound::new();
    nbt.insert("Id".to_string(), Tag::String("minecraft:chest".to_string()));
    nbt.insert("Items".to_string(), Tag::List(vec![Tag::Compound(slot)]));

    Block::new(BlockState::new("minecraft:chest").with_property("facing", "west")).with_nbt(nbt)
}

/// A small build with a hole, a repeated block and one chest.
pub fn sample_builder() -> SchematicBuilder {
    let builder = SchematicBuilder::new();
    builder.add_block_at(BlockPos::new(10, 64, -3), stone());
    builder.add_block_at(BlockPos::new(11, 64, -3), stone());
    builder.add_block_at(BlockPos::new(10, 65, -2), BlockState::new("minecraft:glass"));
    builder.add_block_at(BlockPos::new(12, 66, -2), chest("minecraft:diamond"));
    builder
}

/// Palette and cells shared by the hand-built v1/v2/v3 documents.
pub fn palette_compound() -> Compound {
    let mut palette = Compound::new();
    palette.insert("minecraft:air".to_string(), Tag::Int(0));
    palette.insert("minecraft:stone".to_string(), Tag::Int(1));
    palette.insert("minecraft:oak_log[axis=y]".to_string(), Tag::Int(2));
    palette
}

pub fn block_data() -> Tag {
    Tag::ByteArray(vec![1, 2, 0, 1])
}

pub fn dimensions(tag: &mut Compound) {
    tag.insert("Width".to_string(), Tag::Short(2));
    tag.insert("Height".to_string(), Tag::Short(2));
    tag.insert("Length".to_string(), Tag::Short(1));

    let mut metadata = Compound::new();
    metadata.insert("WEOffsetX".to_string(), Tag::Int(100));
    metadata.insert("WEOffsetY".to_string(), Tag::Int(-60));
    metadata.insert("WEOffsetZ".to_string(), Tag::Int(7));
    tag.insert("Metadata".to_string(), Tag::Compound(metadata));
}

pub fn sign_entity(pos: [i32; 3]) -> Tag {
    let mut entity = Compound::new();
    entity.insert("Id".to_string(), Tag::String("minecraft:sign".to_string()));
    entity.insert("Text1".to_string(), Tag::String("hello".to_string()));
    entity.insert("Pos".to_string(), Tag::IntArray(pos.to_vec()));
    Tag::Compound(entity)
}

pub fn wrap(payload: Compound) -> Compound {
    let mut root = Compound::new();
    root.insert("Schematic".to_string(), Tag::Compound(payload));
    root
}
