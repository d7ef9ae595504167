use schem_common::{Block, BlockState, SchemError};
use schem_nbt::Compound;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

/// Converts between block-state strings and [`BlockState`] values and decides which
/// blocks carry extra state.
pub trait BlockRegistry {
    fn parse(&self, state: &str) -> Result<BlockState, SchemError>;

    /// Canonical string for `state`; must round-trip through [`parse`](Self::parse).
    fn format(&self, state: &BlockState) -> String;

    /// The block unplaced cells and unfilled palette slots resolve to.
    fn default_state(&self) -> BlockState {
        BlockState::air()
    }

    fn has_extra_state(&self, block: &Block) -> bool {
        block.has_nbt()
    }

    fn extra_state(&self, block: &Block) -> Option<Compound> {
        block.nbt.clone()
    }
}

impl<R: BlockRegistry + ?Sized> BlockRegistry for &R {
    fn parse(&self, state: &str) -> Result<BlockState, SchemError> {
        (**self).parse(state)
    }

    fn format(&self, state: &BlockState) -> String {
        (**self).format(state)
    }

    fn default_state(&self) -> BlockState {
        (**self).default_state()
    }

    fn has_extra_state(&self, block: &Block) -> bool {
        (**self).has_extra_state(block)
    }

    fn extra_state(&self, block: &Block) -> Option<Compound> {
        (**self).extra_state(block)
    }
}

/// One entry of a block list, in the shape of the usual `blocks.json` data dumps.
#[derive(Deserialize, Debug)]
struct BlockDefinition {
    name: String,
    #[serde(default)]
    states: Vec<PropertyDefinition>,
}

#[derive(Deserialize, Debug)]
struct PropertyDefinition {
    name: String,
    #[serde(default)]
    values: Vec<String>,
}

/// Allowed values per property name. An empty value list accepts anything.
type PropertyTable = HashMap<String, Vec<String>>;

/// Parses `namespace:path[key=value,...]` strings.
///
/// Without a block list any syntactically valid identifier is accepted. With one
/// (see [`StateRegistry::from_json`]) unknown blocks, property names and property
/// values are rejected too.
#[derive(Debug, Default, Clone)]
pub struct StateRegistry {
    known: Option<HashMap<String, PropertyTable>>,
}

impl StateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a block list: a JSON array of `{ "name": ..., "states": [{ "name": ...,
    /// "values": [...] }] }`. Names without a namespace get `minecraft:`.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let blocks: Vec<BlockDefinition> = serde_json::from_str(json)?;
        let known = blocks
            .into_iter()
            .map(|block| {
                let properties = block
                    .states
                    .into_iter()
                    .map(|property| (property.name, property.values))
                    .collect();
                (qualify(&block.name), properties)
            })
            .collect();
        Ok(Self { known: Some(known) })
    }

    pub fn is_restricted(&self) -> bool {
        self.known.is_some()
    }

    fn check_known(&self, state: &BlockState, input: &str) -> Result<(), SchemError> {
        let Some(known) = &self.known else {
            return Ok(());
        };

        let properties = known
            .get(&state.name)
            .ok_or_else(|| parse_error(input, "unknown block"))?;

        for (key, value) in &state.properties {
            let values = properties
                .get(key)
                .ok_or_else(|| parse_error(input, format!("unknown property '{}'", key)))?;
            if !values.is_empty() && !values.contains(value) {
                return Err(parse_error(
                    input,
                    format!("invalid value '{}' for property '{}'", value, key),
                ));
            }
        }
        Ok(())
    }
}

impl BlockRegistry for StateRegistry {
    fn parse(&self, input: &str) -> Result<BlockState, SchemError> {
        let input_trimmed = input.trim();
        let (id, properties) = match input_trimmed.find('[') {
            Some(open) => {
                let body = input_trimmed[open + 1..]
                    .strip_suffix(']')
                    .ok_or_else(|| parse_error(input, "unterminated property list"))?;
                (&input_trimmed[..open], parse_properties(input, body)?)
            }
            None => (input_trimmed, BTreeMap::new()),
        };

        let name = qualify(id);
        validate_identifier(input, &name)?;

        let state = BlockState { name, properties };
        self.check_known(&state, input)?;
        Ok(state)
    }

    fn format(&self, state: &BlockState) -> String {
        state.to_string()
    }
}

fn parse_error(input: &str, reason: impl Into<String>) -> SchemError {
    SchemError::RegistryParse {
        state: input.to_owned(),
        reason: reason.into(),
    }
}

fn qualify(id: &str) -> String {
    if id.contains(':') {
        id.to_owned()
    } else {
        format!("minecraft:{}", id)
    }
}

fn validate_identifier(input: &str, name: &str) -> Result<(), SchemError> {
    let (namespace, path) = name
        .split_once(':')
        .ok_or_else(|| parse_error(input, "missing namespace"))?;

    let namespace_ok = !namespace.is_empty()
        && namespace
            .chars()
            .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '_' | '-' | '.'));
    let path_ok = !path.is_empty()
        && path
            .chars()
            .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '_' | '-' | '.' | '/'));

    if namespace_ok && path_ok {
        Ok(())
    } else {
        Err(parse_error(input, "invalid identifier"))
    }
}

fn parse_properties(input: &str, body: &str) -> Result<BTreeMap<String, String>, SchemError> {
    let mut properties = BTreeMap::new();
    if body.trim().is_empty() {
        return Ok(properties);
    }

    for pair in body.split(',') {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| parse_error(input, format!("malformed property '{}'", pair)))?;
        let (key, value) = (key.trim(), value.trim());

        let valid = |s: &str| {
            !s.is_empty()
                && s.chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        };
        if !valid(key) || !valid(value) {
            return Err(parse_error(input, format!("malformed property '{}'", pair)));
        }
        if properties.insert(key.to_owned(), value.to_owned()).is_some() {
            return Err(parse_error(input, format!("duplicate property '{}'", key)));
        }
    }
    Ok(properties)
}
