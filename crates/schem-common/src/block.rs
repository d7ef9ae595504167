use schem_nbt::Compound;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const AIR: &str = "minecraft:air";

/// A block type plus its property values, e.g. `minecraft:chest[facing=north]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockState {
    pub name: String,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl BlockState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn air() -> Self {
        Self::new(AIR)
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn is_air(&self) -> bool {
        self.name == AIR
    }
}

impl Default for BlockState {
    fn default() -> Self {
        Self::air()
    }
}

/// Canonical state string: name, then properties sorted by key in brackets.
impl fmt::Display for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if self.properties.is_empty() {
            return Ok(());
        }
        f.write_str("[")?;
        for (i, (key, value)) in self.properties.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}={}", key, value)?;
        }
        f.write_str("]")
    }
}

/// A placed block: its state and, for blocks like chests or signs, the extra
/// state stored out-of-band as a block entity.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub state: BlockState,
    pub nbt: Option<Compound>,
}

impl Block {
    pub fn new(state: BlockState) -> Self {
        Self { state, nbt: None }
    }

    pub fn air() -> Self {
        Self::new(BlockState::air())
    }

    pub fn with_nbt(mut self, nbt: Compound) -> Self {
        self.nbt = Some(nbt);
        self
    }

    pub fn has_nbt(&self) -> bool {
        self.nbt.is_some()
    }
}

impl From<BlockState> for Block {
    fn from(state: BlockState) -> Self {
        Block::new(state)
    }
}
