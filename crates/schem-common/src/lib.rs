pub mod block;
pub mod error;
pub mod types;

pub use block::{Block, BlockState};
pub use error::{SchemError, SchematicReadError, VarIntError};
pub use types::{BlockPos, Position, Result};
