use byteorder::{BigEndian, ByteOrder, ReadBytesExt, WriteBytesExt};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::HashMap;
use std::io::{self, Read, Write};

/// Named children of a compound tag.
pub type Compound = HashMap<String, Tag>;

/// Nested compounds/lists deeper than this are rejected while reading.
pub const MAX_DEPTH: usize = 512;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    End,
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<i8>),
    String(String),
    List(Vec<Tag>),
    Compound(Compound),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

fn invalid_data<E>(error: E) -> io::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    io::Error::new(io::ErrorKind::InvalidData, error)
}

/// Reads an i32 length prefix, rejecting negative values.
fn read_length<R: Read>(reader: &mut R) -> io::Result<usize> {
    let length = reader.read_i32::<BigEndian>()?;
    usize::try_from(length).map_err(|_| invalid_data(format!("Negative length: {}", length)))
}

fn write_length<W: Write>(writer: &mut W, length: usize) -> io::Result<()> {
    let length = i32::try_from(length)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "Array too long for NBT"))?;
    writer.write_i32::<BigEndian>(length)
}

/// Reads exactly `length` bytes without trusting `length` for the up-front allocation.
fn read_bytes<R: Read>(reader: &mut R, length: usize) -> io::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    reader.by_ref().take(length as u64).read_to_end(&mut bytes)?;
    if bytes.len() != length {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "NBT array shorter than its length prefix",
        ));
    }
    Ok(bytes)
}

fn read_utf8<R: Read>(reader: &mut R) -> io::Result<String> {
    let length = reader.read_u16::<BigEndian>()?;
    let mut bytes = vec![0u8; length as usize];
    reader.read_exact(&mut bytes)?;
    String::from_utf8(bytes).map_err(invalid_data)
}

fn write_utf8<W: Write>(writer: &mut W, value: &str) -> io::Result<()> {
    let length = u16::try_from(value.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "String too long for NBT"))?;
    writer.write_u16::<BigEndian>(length)?;
    writer.write_all(value.as_bytes())
}

impl Tag {
    pub fn get_type_id(&self) -> u8 {
        match self {
            Tag::End => 0,
            Tag::Byte(_) => 1,
            Tag::Short(_) => 2,
            Tag::Int(_) => 3,
            Tag::Long(_) => 4,
            Tag::Float(_) => 5,
            Tag::Double(_) => 6,
            Tag::ByteArray(_) => 7,
            Tag::String(_) => 8,
            Tag::List(_) => 9,
            Tag::Compound(_) => 10,
            Tag::IntArray(_) => 11,
            Tag::LongArray(_) => 12,
        }
    }

    /// Reads a named tag. A lone TAG_End yields an empty name.
    pub fn read<R: Read>(reader: &mut R) -> io::Result<(String, Tag)> {
        Tag::read_named(reader, 0)
    }

    fn read_named<R: Read>(reader: &mut R, depth: usize) -> io::Result<(String, Tag)> {
        let type_id = reader.read_u8()?;
        if type_id == 0 {
            return Ok((String::new(), Tag::End));
        }

        let name = read_utf8(reader)?;
        let tag = Tag::read_payload(reader, type_id, depth)?;
        Ok((name, tag))
    }

    fn read_payload<R: Read>(reader: &mut R, type_id: u8, depth: usize) -> io::Result<Tag> {
        if depth > MAX_DEPTH {
            return Err(invalid_data("NBT nesting too deep"));
        }

        match type_id {
            0 => Ok(Tag::End),
            1 => Ok(Tag::Byte(reader.read_i8()?)),
            2 => Ok(Tag::Short(reader.read_i16::<BigEndian>()?)),
            3 => Ok(Tag::Int(reader.read_i32::<BigEndian>()?)),
            4 => Ok(Tag::Long(reader.read_i64::<BigEndian>()?)),
            5 => Ok(Tag::Float(reader.read_f32::<BigEndian>()?)),
            6 => Ok(Tag::Double(reader.read_f64::<BigEndian>()?)),
            7 => {
                let length = read_length(reader)?;
                let bytes = read_bytes(reader, length)?;
                Ok(Tag::ByteArray(bytes.into_iter().map(|b| b as i8).collect()))
            }
            8 => Ok(Tag::String(read_utf8(reader)?)),
            9 => {
                let list_type = reader.read_u8()?;
                let length = read_length(reader)?;
                // Untrusted length, cap the preallocation.
                let mut list = Vec::with_capacity(length.min(1024));
                for _ in 0..length {
                    list.push(Tag::read_payload(reader, list_type, depth + 1)?);
                }
                Ok(Tag::List(list))
            }
            10 => {
                let mut compound = Compound::new();
                loop {
                    let (name, tag) = Tag::read_named(reader, depth + 1)?;
                    if let Tag::End = tag {
                        break;
                    }
                    compound.insert(name, tag);
                }
                Ok(Tag::Compound(compound))
            }
            11 => {
                let length = read_length(reader)?;
                let bytes = read_bytes(reader, length.saturating_mul(4))?;
                Ok(Tag::IntArray(
                    bytes.chunks_exact(4).map(BigEndian::read_i32).collect(),
                ))
            }
            12 => {
                let length = read_length(reader)?;
                let bytes = read_bytes(reader, length.saturating_mul(8))?;
                Ok(Tag::LongArray(
                    bytes.chunks_exact(8).map(BigEndian::read_i64).collect(),
                ))
            }
            _ => Err(invalid_data(format!("Invalid tag type: {}", type_id))),
        }
    }

    pub fn write<W: Write>(&self, writer: &mut W, name: &str) -> io::Result<()> {
        writer.write_u8(self.get_type_id())?;

        if !matches!(self, Tag::End) {
            write_utf8(writer, name)?;
        }

        self.write_payload(writer)
    }

    fn write_payload<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        match self {
            Tag::End => Ok(()),
            Tag::Byte(v) => writer.write_i8(*v),
            Tag::Short(v) => writer.write_i16::<BigEndian>(*v),
            Tag::Int(v) => writer.write_i32::<BigEndian>(*v),
            Tag::Long(v) => writer.write_i64::<BigEndian>(*v),
            Tag::Float(v) => writer.write_f32::<BigEndian>(*v),
            Tag::Double(v) => writer.write_f64::<BigEndian>(*v),
            Tag::ByteArray(v) => {
                write_length(writer, v.len())?;
                let bytes: Vec<u8> = v.iter().map(|&b| b as u8).collect();
                writer.write_all(&bytes)
            }
            Tag::String(v) => write_utf8(writer, v),
            Tag::List(v) => {
                let element_type = v.first().map_or(0, Tag::get_type_id);
                if v.iter().any(|tag| tag.get_type_id() != element_type) {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "NBT list elements must share one type",
                    ));
                }
                writer.write_u8(element_type)?;
                write_length(writer, v.len())?;
                for tag in v {
                    tag.write_payload(writer)?;
                }
                Ok(())
            }
            Tag::Compound(v) => {
                for (name, tag) in v {
                    tag.write(writer, name)?;
                }
                writer.write_u8(0)
            }
            Tag::IntArray(v) => {
                write_length(writer, v.len())?;
                for &i in v {
                    writer.write_i32::<BigEndian>(i)?;
                }
                Ok(())
            }
            Tag::LongArray(v) => {
                write_length(writer, v.len())?;
                for &l in v {
                    writer.write_i64::<BigEndian>(l)?;
                }
                Ok(())
            }
        }
    }

    pub fn as_compound(&self) -> Option<&Compound> {
        match self {
            Tag::Compound(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Vec<Tag>> {
        match self {
            Tag::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&String> {
        match self {
            Tag::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_byte_array(&self) -> Option<&[i8]> {
        match self {
            Tag::ByteArray(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_int_array(&self) -> Option<&[i32]> {
        match self {
            Tag::IntArray(ints) => Some(ints),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Tag::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_i16(&self) -> Option<i16> {
        match self {
            Tag::Short(n) => Some(*n),
            _ => None,
        }
    }
}

/// Typed lookups on a compound. Each returns `None` when the key is absent or holds
/// a tag of a different type.
pub trait CompoundExt {
    fn get_short(&self, key: &str) -> Option<i16>;
    fn get_int(&self, key: &str) -> Option<i32>;
    fn get_string(&self, key: &str) -> Option<&str>;
    fn get_compound(&self, key: &str) -> Option<&Compound>;
    fn get_list(&self, key: &str) -> Option<&[Tag]>;
    fn get_byte_array(&self, key: &str) -> Option<&[i8]>;
    fn get_int_array(&self, key: &str) -> Option<&[i32]>;
}

impl CompoundExt for Compound {
    fn get_short(&self, key: &str) -> Option<i16> {
        self.get(key).and_then(Tag::as_i16)
    }

    fn get_int(&self, key: &str) -> Option<i32> {
        self.get(key).and_then(Tag::as_i32)
    }

    fn get_string(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Tag::as_string).map(String::as_str)
    }

    fn get_compound(&self, key: &str) -> Option<&Compound> {
        self.get(key).and_then(Tag::as_compound)
    }

    fn get_list(&self, key: &str) -> Option<&[Tag]> {
        self.get(key).and_then(Tag::as_list).map(Vec::as_slice)
    }

    fn get_byte_array(&self, key: &str) -> Option<&[i8]> {
        self.get(key).and_then(Tag::as_byte_array)
    }

    fn get_int_array(&self, key: &str) -> Option<&[i32]> {
        self.get(key).and_then(Tag::as_int_array)
    }
}

/// A complete NBT document: one named root tag, optionally gzip framed on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct NbtDocument {
    pub name: String,
    pub root: Tag,
}

impl NbtDocument {
    pub fn new(name: impl Into<String>, root: Tag) -> Self {
        NbtDocument {
            name: name.into(),
            root,
        }
    }

    /// Root compound, if the document has one.
    pub fn compound(&self) -> Option<&Compound> {
        self.root.as_compound()
    }

    pub fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let (name, root) = Tag::read(reader)?;
        if let Tag::End = root {
            return Err(invalid_data("Empty NBT document"));
        }
        Ok(NbtDocument { name, root })
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.root.write(writer, &self.name)
    }

    pub fn read_gzip<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut decoder = GzDecoder::new(reader);
        Self::read(&mut decoder)
    }

    pub fn write_gzip<W: Write>(&self, writer: &mut W, level: Compression) -> io::Result<()> {
        let mut encoder = GzEncoder::new(writer, level);
        self.write(&mut encoder)?;
        encoder.finish()?;
        Ok(())
    }

    /// Parses a document, gunzipping first when the input carries the gzip magic.
    pub fn from_bytes(bytes: &[u8]) -> io::Result<Self> {
        let mut input = bytes;
        if bytes.starts_with(&GZIP_MAGIC) {
            Self::read_gzip(&mut input)
        } else {
            Self::read(&mut input)
        }
    }

    pub fn to_gzip_bytes(&self, level: Compression) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write_gzip(&mut out, level)?;
        Ok(out)
    }
}
