use crate::config::SchemConfig;
use crate::reader::WRAPPER_TAG;
use crate::registry::{BlockRegistry, StateRegistry};
use crate::schematic::Schematic;
use flate2::Compression;
use schem_common::{BlockPos, Result, SchemError};
use schem_logger::log;
use schem_logger::LogSeverity::Debug;
use schem_nbt::{Compound, NbtDocument, Tag};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Version stamped into every written document.
pub const WRITE_VERSION: i32 = 2;

/// Writes schematics as gzip compressed version 2 documents.
///
/// The on-disk shape is an unnamed root compound holding a single `Schematic`
/// compound with an explicit `Version`, which [`SchematicReader`] reads back
/// unchanged.
///
/// [`SchematicReader`]: crate::reader::SchematicReader
#[derive(Debug, Clone)]
pub struct SchematicWriter<R: BlockRegistry = StateRegistry> {
    registry: R,
    compression: Compression,
}

impl SchematicWriter<StateRegistry> {
    pub fn new() -> Self {
        Self::with_registry(StateRegistry::new())
    }

    pub fn from_config(config: &SchemConfig) -> Self {
        Self::new().with_compression(config.compression())
    }
}

impl Default for SchematicWriter<StateRegistry> {
    fn default() -> Self {
        Self::new()
    }
}

fn dimension(value: i32, axis: &str) -> Result<Tag> {
    u16::try_from(value)
        .map(|v| Tag::Short(v as i16))
        .map_err(|_| {
            SchemError::EncodingInvariant(format!("{} {} does not fit in 16 bits", axis, value))
        })
}

fn pos_tag(pos: BlockPos) -> Tag {
    Tag::IntArray(pos.to_array().to_vec())
}

impl<R: BlockRegistry> SchematicWriter<R> {
    pub fn with_registry(registry: R) -> Self {
        Self {
            registry,
            compression: Compression::default(),
        }
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Builds the tag tree without serializing it.
    pub fn to_document(&self, schematic: &Schematic) -> Result<NbtDocument> {
        let size = schematic.size();
        let mut tag = Compound::new();
        tag.insert("Version".to_owned(), Tag::Int(WRITE_VERSION));
        tag.insert("Width".to_owned(), dimension(size.x, "Width")?);
        tag.insert("Height".to_owned(), dimension(size.y, "Height")?);
        tag.insert("Length".to_owned(), dimension(size.z, "Length")?);

        let offset = schematic.offset();
        let mut metadata = Compound::new();
        metadata.insert("WEOffsetX".to_owned(), Tag::Int(offset.x));
        metadata.insert("WEOffsetY".to_owned(), Tag::Int(offset.y));
        metadata.insert("WEOffsetZ".to_owned(), Tag::Int(offset.z));
        tag.insert("Metadata".to_owned(), Tag::Compound(metadata));

        let block_data = schematic.cells().iter().map(|&b| b as i8).collect();
        tag.insert("BlockData".to_owned(), Tag::ByteArray(block_data));

        let blocks = schematic.palette();
        let palette_max = i32::try_from(blocks.len())
            .map_err(|_| SchemError::EncodingInvariant("Palette too large".to_owned()))?;
        tag.insert("PaletteMax".to_owned(), Tag::Int(palette_max));

        let mut palette = Compound::new();
        for (i, block) in blocks.iter().enumerate() {
            palette.insert(self.registry.format(block), Tag::Int(i as i32));
        }
        tag.insert("Palette".to_owned(), Tag::Compound(palette));

        let block_entities = schematic
            .block_entities()
            .iter()
            .map(|(&pos, tile)| {
                let mut with_pos = tile.clone();
                with_pos.insert("Pos".to_owned(), pos_tag(pos));
                Tag::Compound(with_pos)
            })
            .collect();
        tag.insert("BlockEntities".to_owned(), Tag::List(block_entities));

        let mut root = Compound::new();
        root.insert(WRAPPER_TAG.to_owned(), Tag::Compound(tag));
        Ok(NbtDocument::new("", Tag::Compound(root)))
    }

    pub fn write(&self, schematic: &Schematic) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write_to(schematic, &mut out)?;
        Ok(out)
    }

    pub fn write_to<W: Write>(&self, schematic: &Schematic, mut writer: W) -> Result<()> {
        let document = self.to_document(schematic)?;
        document.write_gzip(&mut writer, self.compression)?;

        log(
            format!(
                "Wrote schematic {} with {} palette entries",
                schematic.size(),
                schematic.palette().len()
            ),
            Debug,
        );
        Ok(())
    }

    pub fn write_path(&self, schematic: &Schematic, path: impl AsRef<Path>) -> Result<()> {
        let mut file = BufWriter::new(File::create(path.as_ref())?);
        self.write_to(schematic, &mut file)?;
        file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SchematicBuilder;
    use assert_matches::assert_matches;
    use schem_common::BlockState;
    use schem_nbt::CompoundExt;
    use std::collections::HashMap;

    fn payload(document: &NbtDocument) -> &Compound {
        document
            .compound()
            .and_then(|root| root.get_compound(WRAPPER_TAG))
            .unwrap()
    }

    #[test]
    fn test_document_layout() {
        let builder = SchematicBuilder::new();
        builder.add_block_at(BlockPos::new(-1, 0, 2), BlockState::new("minecraft:stone"));
        builder.add_block_at(BlockPos::new(0, 1, 2), BlockState::new("minecraft:dirt"));
        let schematic = builder.build().unwrap();

        let document = SchematicWriter::new().to_document(&schematic).unwrap();
        assert_eq!(document.name, "");
        let tag = payload(&document);

        assert_eq!(tag.get_int("Version"), Some(2));
        assert_eq!(tag.get_short("Width"), Some(2));
        assert_eq!(tag.get_short("Height"), Some(2));
        assert_eq!(tag.get_short("Length"), Some(1));
        assert_eq!(tag.get_int("PaletteMax"), Some(3));
        assert_eq!(tag.get_byte_array("BlockData"), Some(&[1i8, 0, 0, 2][..]));

        let metadata = tag.get_compound("Metadata").unwrap();
        assert_eq!(metadata.get_int("WEOffsetX"), Some(-1));
        assert_eq!(metadata.get_int("WEOffsetY"), Some(0));
        assert_eq!(metadata.get_int("WEOffsetZ"), Some(2));

        let palette = tag.get_compound("Palette").unwrap();
        assert_eq!(palette.get_int("minecraft:air"), Some(0));
        assert_eq!(palette.get_int("minecraft:stone"), Some(1));
        assert_eq!(palette.get_int("minecraft:dirt"), Some(2));
        assert_eq!(tag.get_list("BlockEntities"), Some(&[][..]));
    }

    #[test]
    fn test_zero_offset_still_written() {
        let document = SchematicWriter::new()
            .to_document(&Schematic::empty())
            .unwrap();
        let metadata = payload(&document).get_compound("Metadata").unwrap();
        assert_eq!(metadata.len(), 3);
        assert_eq!(metadata.get_int("WEOffsetX"), Some(0));
    }

    #[test]
    fn test_block_entity_gets_pos() {
        let mut tile = Compound::new();
        tile.insert("Id".to_owned(), Tag::String("minecraft:sign".to_owned()));
        let mut entities = HashMap::new();
        entities.insert(BlockPos::new(4, -5, 6), tile);
        let schematic = Schematic::new(
            BlockPos::ONE,
            BlockPos::new(4, -5, 6),
            vec![BlockState::air(), BlockState::new("minecraft:oak_sign")],
            vec![1],
            entities,
        );

        let document = SchematicWriter::new().to_document(&schematic).unwrap();
        let list = payload(&document).get_list("BlockEntities").unwrap();
        let entry = list[0].as_compound().unwrap();
        assert_eq!(entry.get_int_array("Pos"), Some(&[4, -5, 6][..]));
        assert_eq!(entry.get_string("Id"), Some("minecraft:sign"));
    }

    #[test]
    fn test_oversized_dimension_rejected() {
        let schematic = Schematic::new(
            BlockPos::new(70_000, 1, 1),
            BlockPos::ZERO,
            vec![BlockState::air()],
            vec![],
            HashMap::new(),
        );
        assert_matches!(
            SchematicWriter::new().write(&schematic),
            Err(SchemError::EncodingInvariant(_))
        );
    }

    #[test]
    fn test_output_is_gzip() {
        let bytes = SchematicWriter::new()
            .with_compression(Compression::best())
            .write(&Schematic::empty())
            .unwrap();
        assert_eq!(&bytes[..2], &[0x1f, 0x8b]);
    }
}
