pub mod builder;
pub mod config;
pub mod reader;
pub mod registry;
pub mod schematic;
pub mod varint;
pub mod writer;

// Re-export commonly used items
pub use builder::SchematicBuilder;
pub use config::SchemConfig;
pub use reader::SchematicReader;
pub use registry::{BlockRegistry, StateRegistry};
pub use schem_common::{Block, BlockPos, BlockState, Position, SchemError, SchematicReadError};
pub use schematic::Schematic;
pub use writer::SchematicWriter;
