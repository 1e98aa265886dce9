// Binary layer - Avro binary encoding of schema-typed values

use crate::data::{Record, Value};
use crate::error::{CodecError, Result, ShredError};
use crate::schema::Schema;
use bstr::ByteVec;
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::sync::Arc;

/// Longest zig-zag varint that fits in 64 bits.
const MAX_VARINT_LEN: usize = 10;

/// Upper bound on the items of one decoded array or map. Zero-width items
/// (null, empty records) cost no input, so the block count alone is not
/// bounded by the payload size.
const MAX_COLLECTION_ITEMS: u64 = 1 << 24;

/// Serialize a value to bytes
///
/// `encrypted-string` values must be in the encrypted state; a plain one
/// fails with [`crate::error::SchemaTypeError::PlainSerialization`] and
/// nothing is returned.
pub fn encode(schema: &Schema, value: &Value) -> Result<Vec<u8>> {
    let mut writer = Vec::new();
    write_to(&mut writer, schema, value)?;
    Ok(writer)
}

/// Deserialize a value, rejecting input with bytes left over
pub fn decode(schema: &Schema, data: &[u8]) -> Result<Value> {
    let mut cursor = data;
    let value = read_from(&mut cursor, schema)?;
    if !cursor.is_empty() {
        return Err(CodecError::TrailingBytes(cursor.len()).into());
    }
    Ok(value)
}

/// Write a value to a writer
///
/// Layout follows the Avro specification:
/// ```text
/// int/long      zig-zag varint
/// float/double  little-endian IEEE 754
/// bytes/string  [len: long][data]
/// record        fields in declaration order, no framing
/// array/map     blocks of [count: long][items...], terminated by a 0 count
/// union         [branch index: long][member value]
/// enum          [symbol index: int]
/// fixed         [data: size bytes]
/// ```
pub fn write_to<W: Write>(writer: &mut W, schema: &Schema, value: &Value) -> Result<()> {
    match (schema, value) {
        (Schema::Null, Value::Null) => {}
        (Schema::Boolean, Value::Boolean(b)) => write_u8(writer, *b as u8)?,
        (Schema::Int, Value::Int(n)) => write_long(writer, i64::from(*n))?,
        (Schema::Long, Value::Long(n)) => write_long(writer, *n)?,
        (Schema::Float, Value::Float(f)) => writer.write_all(&f.to_le_bytes()).map_err(CodecError::from)?,
        (Schema::Double, Value::Double(f)) => writer.write_all(&f.to_le_bytes()).map_err(CodecError::from)?,
        (Schema::Bytes, Value::Bytes(bytes)) => write_bytes(writer, bytes)?,
        (Schema::String { logical: Some(logical) }, value) => {
            let wire = logical.to_wire(value)?;
            write_bytes(writer, wire.as_bytes())?;
        }
        (Schema::String { logical: None }, Value::String(s)) => write_bytes(writer, s.as_bytes())?,
        (Schema::Record(record_schema), Value::Record(record)) => {
            if record.schema().fullname() != record_schema.fullname() {
                return Err(mismatch(schema, value));
            }
            for field in &record_schema.fields {
                let field_value = record
                    .get(field.position)
                    .ok_or_else(|| CodecError::MissingField(field.name.clone()))?;
                write_to(writer, &field.schema, field_value)?;
            }
        }
        (Schema::Array(items), Value::Array(elements)) => {
            if !elements.is_empty() {
                write_long(writer, elements.len() as i64)?;
                for element in elements {
                    write_to(writer, items, element)?;
                }
            }
            write_long(writer, 0)?;
        }
        (Schema::Map(values), Value::Map(entries)) => {
            if !entries.is_empty() {
                write_long(writer, entries.len() as i64)?;
                for (key, entry) in entries {
                    write_bytes(writer, key.as_bytes())?;
                    write_to(writer, values, entry)?;
                }
            }
            write_long(writer, 0)?;
        }
        (Schema::Union(members), value) => {
            let index = members
                .iter()
                .position(|member| member.accepts(value))
                .ok_or_else(|| CodecError::InvalidUnionBranch(value.kind_name().to_string()))?;
            write_long(writer, index as i64)?;
            write_to(writer, &members[index], value)?;
        }
        (Schema::Enum(enum_schema), Value::Enum(symbol)) => {
            let index = enum_schema
                .symbols
                .iter()
                .position(|s| s == symbol)
                .ok_or_else(|| CodecError::UnknownSymbol(symbol.clone()))?;
            write_long(writer, index as i64)?;
        }
        (Schema::Fixed(fixed), Value::Fixed(bytes)) if bytes.len() == fixed.size => {
            writer.write_all(bytes).map_err(CodecError::from)?;
        }
        (schema, value) => return Err(mismatch(schema, value)),
    }
    Ok(())
}

/// Read a value from a reader
///
/// Strings under `encrypted-string` come back in the encrypted state.
pub fn read_from<R: Read>(reader: &mut R, schema: &Schema) -> Result<Value> {
    let value = match schema {
        Schema::Null => Value::Null,
        Schema::Boolean => match read_u8(reader)? {
            0 => Value::Boolean(false),
            1 => Value::Boolean(true),
            other => {
                return Err(CodecError::TypeMismatch {
                    expected: "boolean".to_string(),
                    actual: format!("byte {}", other),
                }
                .into())
            }
        },
        Schema::Int => {
            let n = read_long(reader)?;
            Value::Int(i32::try_from(n).map_err(|_| CodecError::InvalidVarint)?)
        }
        Schema::Long => Value::Long(read_long(reader)?),
        Schema::Float => {
            let mut buf = [0u8; 4];
            reader.read_exact(&mut buf).map_err(CodecError::from)?;
            Value::Float(f32::from_le_bytes(buf))
        }
        Schema::Double => {
            let mut buf = [0u8; 8];
            reader.read_exact(&mut buf).map_err(CodecError::from)?;
            Value::Double(f64::from_le_bytes(buf))
        }
        Schema::Bytes => Value::Bytes(read_bytes(reader)?),
        Schema::String { logical } => {
            let text = read_string(reader)?;
            match logical {
                Some(logical) => logical.to_logical(text),
                None => Value::String(text),
            }
        }
        Schema::Record(record_schema) => {
            let fields = record_schema
                .fields
                .iter()
                .map(|field| read_from(reader, &field.schema))
                .collect::<Result<Vec<_>>>()?;
            let record = Record::with_values(Arc::clone(record_schema), fields)
                .ok_or_else(|| CodecError::MissingField(record_schema.fullname()))?;
            Value::Record(record)
        }
        Schema::Array(items) => {
            let mut elements = Vec::new();
            while let Some(count) = read_block_count(reader, elements.len())? {
                for _ in 0..count {
                    elements.push(read_from(reader, items)?);
                }
            }
            Value::Array(elements)
        }
        Schema::Map(values) => {
            let mut entries = BTreeMap::new();
            let mut seen = 0;
            while let Some(count) = read_block_count(reader, seen)? {
                seen += count as usize;
                for _ in 0..count {
                    let key = read_string(reader)?;
                    let entry = read_from(reader, values)?;
                    entries.insert(key, entry);
                }
            }
            Value::Map(entries)
        }
        Schema::Union(members) => {
            let index = read_long(reader)?;
            let member = usize::try_from(index)
                .ok()
                .and_then(|i| members.get(i))
                .ok_or_else(|| CodecError::InvalidUnionBranch(format!("index {}", index)))?;
            read_from(reader, member)?
        }
        Schema::Enum(enum_schema) => {
            let index = read_long(reader)?;
            let symbol = usize::try_from(index)
                .ok()
                .and_then(|i| enum_schema.symbols.get(i))
                .ok_or_else(|| CodecError::UnknownSymbol(format!("index {}", index)))?;
            Value::Enum(symbol.clone())
        }
        Schema::Fixed(fixed) => {
            let mut buf = vec![0u8; fixed.size];
            reader.read_exact(&mut buf).map_err(CodecError::from)?;
            Value::Fixed(buf)
        }
    };
    Ok(value)
}

fn mismatch(schema: &Schema, value: &Value) -> ShredError {
    CodecError::TypeMismatch {
        expected: schema.type_name(),
        actual: value.kind_name().to_string(),
    }
    .into()
}

// Basic I/O primitives

fn write_u8<W: Write>(writer: &mut W, value: u8) -> std::result::Result<(), CodecError> {
    writer.write_all(&[value])?;
    Ok(())
}

fn read_u8<R: Read>(reader: &mut R) -> std::result::Result<u8, CodecError> {
    let mut buf = [0u8; 1];
    reader.read_exact(&mut buf)?;
    Ok(buf[0])
}

/// Zig-zag varint: (n << 1) ^ (n >> 63), then 7 bits per byte, low first
fn write_long<W: Write>(writer: &mut W, n: i64) -> std::result::Result<(), CodecError> {
    let mut zigzag = ((n as u64) << 1) ^ ((n >> 63) as u64);
    let mut buf = [0u8; MAX_VARINT_LEN];
    let mut len = 0;
    loop {
        let byte = (zigzag & 0x7f) as u8;
        zigzag >>= 7;
        if zigzag == 0 {
            buf[len] = byte;
            len += 1;
            break;
        }
        buf[len] = byte | 0x80;
        len += 1;
    }
    writer.write_all(&buf[..len])?;
    Ok(())
}

fn read_long<R: Read>(reader: &mut R) -> std::result::Result<i64, CodecError> {
    let mut zigzag: u64 = 0;
    for i in 0..MAX_VARINT_LEN {
        let byte = read_u8(reader)?;
        // The tenth byte holds only bit 63.
        if i == MAX_VARINT_LEN - 1 && byte > 1 {
            return Err(CodecError::InvalidVarint);
        }
        zigzag |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(((zigzag >> 1) as i64) ^ -((zigzag & 1) as i64));
        }
    }
    Err(CodecError::InvalidVarint)
}

fn write_bytes<W: Write>(writer: &mut W, data: &[u8]) -> std::result::Result<(), CodecError> {
    write_long(writer, data.len() as i64)?;
    writer.write_all(data)?;
    Ok(())
}

fn read_bytes<R: Read>(reader: &mut R) -> std::result::Result<Vec<u8>, CodecError> {
    let len = read_long(reader)?;
    let len = usize::try_from(len).map_err(|_| CodecError::InvalidVarint)?;
    // Read through `take` so a corrupt length cannot force a huge allocation.
    let mut buf = Vec::new();
    reader.by_ref().take(len as u64).read_to_end(&mut buf)?;
    if buf.len() != len {
        return Err(CodecError::UnexpectedEof);
    }
    Ok(buf)
}

fn read_string<R: Read>(reader: &mut R) -> std::result::Result<String, CodecError> {
    read_bytes(reader)?
        .into_string()
        .map_err(|_| CodecError::InvalidUtf8)
}

/// Item count of the next array/map block, `None` at the terminating block.
///
/// A negative count is followed by the block's byte size, which is skipped.
/// `seen` is the number of items already read from earlier blocks.
fn read_block_count<R: Read>(
    reader: &mut R,
    seen: usize,
) -> std::result::Result<Option<u64>, CodecError> {
    let count = read_long(reader)?;
    if count == 0 {
        return Ok(None);
    }
    if count < 0 {
        let _block_size = read_long(reader)?;
    }
    let count = count.unsigned_abs();
    match (seen as u64).checked_add(count) {
        Some(total) if total <= MAX_COLLECTION_ITEMS => Ok(Some(count)),
        _ => Err(CodecError::CollectionTooLarge(count)),
    }
}
