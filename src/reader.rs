//! Decodes Sponge-style schematic documents, versions 1 to 3.
//!
//! | version | wrapper              | palette / cells                  | block entities |
//! |---------|----------------------|----------------------------------|----------------|
//! | 1       | none (root payload)  | `Palette`, `PaletteMax`, `BlockData` | rejected   |
//! | 2       | `Schematic` child    | `Palette`, `PaletteMax`, `BlockData` | `BlockEntities` |
//! | 3       | `Schematic` child    | `Blocks.Palette`, `Blocks.Data`  | `BlockEntities` |

use crate::registry::{BlockRegistry, StateRegistry};
use crate::schematic::{decode_cells, Schematic};
use schem_common::{BlockPos, BlockState, SchemError, SchematicReadError};
use schem_logger::log;
use schem_logger::LogSeverity::{Debug, Warning};
use schem_nbt::{Compound, CompoundExt, NbtDocument, Tag};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

const READ_NBT: &str = "failed to read schematic NBT";
const INVALID_SCHEMATIC: &str = "Invalid schematic file";

pub const WRAPPER_TAG: &str = "Schematic";

type ReadResult = Result<Schematic, SchematicReadError>;

/// Reads schematics, resolving palette strings through a [`BlockRegistry`].
#[derive(Debug, Default, Clone)]
pub struct SchematicReader<R: BlockRegistry = StateRegistry> {
    registry: R,
}

impl SchematicReader<StateRegistry> {
    pub fn new() -> Self {
        Self::default()
    }
}

fn missing(field: &str) -> SchemError {
    SchemError::MalformedDocument(format!("Missing required field '{}'", field))
}

impl<R: BlockRegistry> SchematicReader<R> {
    pub fn with_registry(registry: R) -> Self {
        Self { registry }
    }

    /// Reads a (usually gzip compressed) document from a stream.
    pub fn read<S: Read>(&self, mut stream: S) -> ReadResult {
        let mut bytes = Vec::new();
        stream
            .read_to_end(&mut bytes)
            .map_err(|e| SchematicReadError::new(READ_NBT, e.into()))?;
        self.read_bytes(&bytes)
    }

    pub fn read_bytes(&self, bytes: &[u8]) -> ReadResult {
        let document =
            NbtDocument::from_bytes(bytes).map_err(|e| SchematicReadError::new(READ_NBT, e.into()))?;
        self.read_document(&document)
    }

    pub fn read_path(&self, path: impl AsRef<Path>) -> ReadResult {
        let file = File::open(path.as_ref()).map_err(|e| SchematicReadError::new(READ_NBT, e.into()))?;
        self.read(BufReader::new(file))
    }

    pub fn read_document(&self, document: &NbtDocument) -> ReadResult {
        let root = document.compound().ok_or_else(|| {
            SchematicReadError::new(
                INVALID_SCHEMATIC,
                SchemError::MalformedDocument("Root tag is not a compound".to_owned()),
            )
        })?;
        self.read_compound(root)
    }

    pub fn read_compound(&self, root: &Compound) -> ReadResult {
        self.read_root(root)
            .map_err(|cause| SchematicReadError::new(INVALID_SCHEMATIC, cause))
    }

    fn read_root(&self, root: &Compound) -> Result<Schematic, SchemError> {
        // A Schematic child means sponge v2 or v3 with an explicit version
        if let Some(schematic) = root.get(WRAPPER_TAG) {
            let schematic = schematic
                .as_compound()
                .ok_or_else(|| missing("Schematic"))?;
            let version = schematic
                .get_int("Version")
                .ok_or_else(|| missing("Schematic.Version"))?;
            return self.read_payload(schematic, version);
        }

        // Otherwise it is hopefully v1
        self.read_payload(root, 1)
    }

    fn read_payload(&self, tag: &Compound, version: i32) -> Result<Schematic, SchemError> {
        if !(1..=3).contains(&version) {
            return Err(SchemError::UnsupportedVersion(format!(
                "Schematic version {} is not supported",
                version
            )));
        }

        let width = read_dimension(tag, "Width")?;
        let height = read_dimension(tag, "Height")?;
        let length = read_dimension(tag, "Length")?;
        let size = BlockPos::new(width, height, length);

        let offset = read_offset(tag)?;

        let (palette_tag, block_data, palette_size) = if version == 3 {
            let blocks = tag.get_compound("Blocks").ok_or_else(|| missing("Blocks"))?;
            let palette = blocks
                .get_compound("Palette")
                .ok_or_else(|| missing("Blocks.Palette"))?;
            let data = blocks
                .get_byte_array("Data")
                .ok_or_else(|| missing("Blocks.Data"))?;
            (palette, data, palette.len())
        } else {
            let palette = tag.get_compound("Palette").ok_or_else(|| missing("Palette"))?;
            let data = tag
                .get_byte_array("BlockData")
                .ok_or_else(|| missing("BlockData"))?;
            let palette_max = tag.get_int("PaletteMax").ok_or_else(|| missing("PaletteMax"))?;
            let palette_max = usize::try_from(palette_max).map_err(|_| {
                SchemError::MalformedDocument(format!("Negative PaletteMax {}", palette_max))
            })?;
            (palette, data, palette_max)
        };

        // Every slot beyond the named entries must be paid for by a cell byte
        let palette_limit = palette_tag.len() + block_data.len();
        if palette_size > palette_limit {
            return Err(SchemError::MalformedDocument(format!(
                "PaletteMax {} exceeds {} palette entries plus {} bytes of block data",
                palette_size,
                palette_tag.len(),
                block_data.len()
            )));
        }

        let palette = self.read_palette(palette_tag, palette_size)?;
        let cells: Vec<u8> = block_data.iter().map(|&b| b as u8).collect();
        decode_cells(&cells, size.volume(), palette.len())?;

        let block_entities = read_block_entities(tag, version)?;

        log(
            format!(
                "Read schematic v{} {}x{}x{} ({} palette entries, {} block entities)",
                version,
                width,
                height,
                length,
                palette.len(),
                block_entities.len()
            ),
            Debug,
        );

        Ok(Schematic::new(size, offset, palette, cells, block_entities))
    }

    fn read_palette(&self, palette: &Compound, size: usize) -> Result<Vec<BlockState>, SchemError> {
        let mut blocks = vec![self.registry.default_state(); size];

        for (state, id) in palette {
            let id = id.as_i32().ok_or_else(|| {
                SchemError::MalformedDocument(format!("Palette entry '{}' is not an int", state))
            })?;
            let slot = usize::try_from(id)
                .ok()
                .filter(|&slot| slot < size)
                .ok_or_else(|| {
                    SchemError::MalformedDocument(format!(
                        "Palette id {} for '{}' outside palette of {} entries",
                        id, state, size
                    ))
                })?;
            blocks[slot] = self.registry.parse(state)?;
        }
        Ok(blocks)
    }
}

/// Dimensions are stored as shorts but are unsigned on the wire.
fn read_dimension(tag: &Compound, field: &str) -> Result<i32, SchemError> {
    let value = tag.get_short(field).ok_or_else(|| missing(field))?;
    Ok(value as u16 as i32)
}

fn read_offset(tag: &Compound) -> Result<BlockPos, SchemError> {
    let metadata = match tag.get_compound("Metadata") {
        Some(metadata) if metadata.contains_key("WEOffsetX") => metadata,
        _ => return Ok(BlockPos::ZERO),
    };

    let axis = |field: &str| {
        metadata
            .get_int(field)
            .ok_or_else(|| missing(&format!("Metadata.{}", field)))
    };
    Ok(BlockPos::new(
        axis("WEOffsetX")?,
        axis("WEOffsetY")?,
        axis("WEOffsetZ")?,
    ))
}

fn read_block_entities(
    tag: &Compound,
    version: i32,
) -> Result<HashMap<BlockPos, Compound>, SchemError> {
    let mut block_entities = HashMap::new();

    if version == 1 {
        if let Some(field) = ["BlockEntities", "TileEntities"]
            .into_iter()
            .find(|field| tag.contains_key(*field))
        {
            return Err(SchemError::UnsupportedVersion(format!(
                "Version 1 schematics cannot contain '{}'",
                field
            )));
        }
        return Ok(block_entities);
    }

    let list = match tag.get("BlockEntities") {
        Some(list) => Some(list),
        None if version == 3 => tag
            .get_compound("Blocks")
            .and_then(|blocks| blocks.get("BlockEntities")),
        None => None,
    };
    let Some(list) = list else {
        return Ok(block_entities);
    };
    let entries = list
        .as_list()
        .ok_or_else(|| SchemError::MalformedDocument("'BlockEntities' is not a list".to_owned()))?;

    for (index, entry) in entries.iter().enumerate() {
        let Tag::Compound(entry) = entry else {
            return Err(SchemError::MalformedDocument(format!(
                "Block entity {} is not a compound",
                index
            )));
        };

        let Some(pos) = entry.get("Pos") else {
            log(format!("Skipping block entity {} without a Pos", index), Warning);
            continue;
        };
        let pos = match pos.as_int_array() {
            Some(&[x, y, z]) => BlockPos::new(x, y, z),
            _ => {
                return Err(SchemError::MalformedDocument(format!(
                    "Block entity {} has a malformed Pos",
                    index
                )))
            }
        };

        let mut payload = entry.clone();
        payload.remove("Pos");
        block_entities.insert(pos, payload);
    }
    Ok(block_entities)
}
