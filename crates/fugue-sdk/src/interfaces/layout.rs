//! Fixed-layout codecs
//!
//! Contract entries exchange packed little-endian structs. `LayoutCodec`
//! describes such a struct declaratively (ordered named fields) and
//! implements [`ContractCodec`] over JSON objects, so typed callers never
//! hand-pack buffers.
//!
//! # Example
//!
//! ```rust
//! use fugue_sdk::interfaces::{FieldType, LayoutCodec};
//!
//! let codec = LayoutCodec::new()
//!     .input_field("assetName", FieldType::AssetName)
//!     .input_field("price", FieldType::I64)
//!     .output_field("orderCount", FieldType::U32);
//!
//! assert_eq!(codec.encoded_input_size(), Some(16));
//! assert_eq!(codec.encoded_output_size(), Some(4));
//! ```

use serde_json::{Map, Value};

use fugue_primitives::{Identity, PublicKey};

use super::codec::{CodecError, ContractCodec};
use super::InterfaceEntry;
use crate::assets::AssetName;

/// Wire type of one layout field, packed little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Unsigned 8-bit integer
    U8,
    /// Unsigned 16-bit integer
    U16,
    /// Unsigned 32-bit integer
    U32,
    /// Unsigned 64-bit integer
    U64,
    /// Signed 64-bit integer
    I64,
    /// Boolean as one byte (0 or 1)
    Bool,
    /// 32-byte public key, as hex in JSON
    PublicKey,
    /// 32-byte public key, as a 60-character identity in JSON
    Identity,
    /// Asset name, zero-padded to 8 bytes on the wire
    AssetName,
    /// Fixed-length raw bytes, as hex in JSON
    Bytes(usize),
}

impl FieldType {
    /// Encoded width in bytes.
    pub fn size(&self) -> usize {
        match self {
            FieldType::U8 | FieldType::Bool => 1,
            FieldType::U16 => 2,
            FieldType::U32 => 4,
            FieldType::U64 | FieldType::I64 | FieldType::AssetName => 8,
            FieldType::PublicKey | FieldType::Identity => 32,
            FieldType::Bytes(len) => *len,
        }
    }
}

#[derive(Debug, Clone)]
struct Field {
    name: String,
    ty: FieldType,
}

/// A declarative packed-struct codec for one interface entry.
#[derive(Debug, Clone, Default)]
pub struct LayoutCodec {
    input: Vec<Field>,
    output: Vec<Field>,
}

impl LayoutCodec {
    /// An empty layout (zero-size input and output).
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an input field.
    pub fn input_field(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.input.push(Field {
            name: name.into(),
            ty,
        });
        self
    }

    /// Append an output field.
    pub fn output_field(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.output.push(Field {
            name: name.into(),
            ty,
        });
        self
    }

    /// Total encoded input size; usable as an entry's `input_size`.
    pub fn encoded_input_size(&self) -> Option<u32> {
        let total: usize = self.input.iter().map(|f| f.ty.size()).sum();
        u32::try_from(total).ok()
    }

    /// Total encoded output size; usable as an entry's `output_size`.
    pub fn encoded_output_size(&self) -> Option<u32> {
        let total: usize = self.output.iter().map(|f| f.ty.size()).sum();
        u32::try_from(total).ok()
    }

    fn encode_fields(fields: &[Field], value: &Value) -> Result<Vec<u8>, CodecError> {
        let object = value
            .as_object()
            .ok_or("layout input must be a JSON object")?;

        let mut bytes = Vec::with_capacity(fields.iter().map(|f| f.ty.size()).sum());
        for field in fields {
            let value = object
                .get(&field.name)
                .ok_or_else(|| format!("missing field {:?}", field.name))?;
            encode_field(field, value, &mut bytes)?;
        }
        Ok(bytes)
    }

    fn decode_fields(fields: &[Field], bytes: &[u8]) -> Result<Value, CodecError> {
        let expected: usize = fields.iter().map(|f| f.ty.size()).sum();
        if bytes.len() < expected {
            return Err(format!(
                "response too short: {} bytes, layout needs {expected}",
                bytes.len()
            )
            .into());
        }

        let mut object = Map::new();
        let mut offset = 0usize;
        for field in fields {
            let width = field.ty.size();
            let slice = &bytes[offset..offset + width];
            object.insert(field.name.clone(), decode_field(field.ty, slice)?);
            offset += width;
        }
        Ok(Value::Object(object))
    }
}

fn encode_field(field: &Field, value: &Value, out: &mut Vec<u8>) -> Result<(), CodecError> {
    let unsigned = |value: &Value| -> Result<u64, CodecError> {
        value
            .as_u64()
            .ok_or_else(|| format!("field {:?} expects an unsigned integer", field.name).into())
    };

    match field.ty {
        FieldType::U8 => {
            let v = unsigned(value)?;
            let v = u8::try_from(v).map_err(|_| format!("field {:?} overflows u8", field.name))?;
            out.push(v);
        }
        FieldType::U16 => {
            let v = unsigned(value)?;
            let v =
                u16::try_from(v).map_err(|_| format!("field {:?} overflows u16", field.name))?;
            out.extend_from_slice(&v.to_le_bytes());
        }
        FieldType::U32 => {
            let v = unsigned(value)?;
            let v =
                u32::try_from(v).map_err(|_| format!("field {:?} overflows u32", field.name))?;
            out.extend_from_slice(&v.to_le_bytes());
        }
        FieldType::U64 => {
            out.extend_from_slice(&unsigned(value)?.to_le_bytes());
        }
        FieldType::I64 => {
            let v = value
                .as_i64()
                .ok_or_else(|| format!("field {:?} expects an integer", field.name))?;
            out.extend_from_slice(&v.to_le_bytes());
        }
        FieldType::Bool => {
            let v = value
                .as_bool()
                .ok_or_else(|| format!("field {:?} expects a boolean", field.name))?;
            out.push(u8::from(v));
        }
        FieldType::PublicKey => {
            let hex_key = value
                .as_str()
                .ok_or_else(|| format!("field {:?} expects a hex string", field.name))?;
            let key = PublicKey::from_hex(hex_key).map_err(|e| e.to_string())?;
            out.extend_from_slice(key.as_bytes());
        }
        FieldType::Identity => {
            let text = value
                .as_str()
                .ok_or_else(|| format!("field {:?} expects an identity", field.name))?;
            let identity = Identity::parse(text).map_err(|e| e.to_string())?;
            let key = fugue_crypto::public_key_from_identity(&identity)
                .map_err(|e| e.to_string())?;
            out.extend_from_slice(key.as_bytes());
        }
        FieldType::AssetName => {
            let text = value
                .as_str()
                .ok_or_else(|| format!("field {:?} expects an asset name", field.name))?;
            let name = AssetName::new(text).map_err(|e| e.to_string())?;
            out.extend_from_slice(&name.to_wire());
        }
        FieldType::Bytes(len) => {
            let hex_bytes = value
                .as_str()
                .ok_or_else(|| format!("field {:?} expects a hex string", field.name))?;
            let raw = hex::decode(hex_bytes).map_err(|e| e.to_string())?;
            if raw.len() != len {
                return Err(format!(
                    "field {:?} expects {len} bytes, got {}",
                    field.name,
                    raw.len()
                )
                .into());
            }
            out.extend_from_slice(&raw);
        }
    }
    Ok(())
}

fn decode_field(ty: FieldType, bytes: &[u8]) -> Result<Value, CodecError> {
    let value = match ty {
        FieldType::U8 => Value::from(bytes[0]),
        FieldType::U16 => Value::from(u16::from_le_bytes(bytes.try_into().expect("2 bytes"))),
        FieldType::U32 => Value::from(u32::from_le_bytes(bytes.try_into().expect("4 bytes"))),
        FieldType::U64 => Value::from(u64::from_le_bytes(bytes.try_into().expect("8 bytes"))),
        FieldType::I64 => Value::from(i64::from_le_bytes(bytes.try_into().expect("8 bytes"))),
        FieldType::Bool => Value::from(bytes[0] != 0),
        FieldType::PublicKey => Value::from(hex::encode(bytes)),
        FieldType::Identity => {
            let key = PublicKey::from_slice(bytes).map_err(|e| e.to_string())?;
            Value::from(fugue_crypto::identity_from_public_key(&key).as_str().to_string())
        }
        FieldType::AssetName => {
            let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
            Value::from(
                std::str::from_utf8(&bytes[..end])
                    .map_err(|e| e.to_string())?
                    .to_string(),
            )
        }
        FieldType::Bytes(_) => Value::from(hex::encode(bytes)),
    };
    Ok(value)
}

impl ContractCodec for LayoutCodec {
    fn encode(&self, _entry: &InterfaceEntry, value: &Value) -> Result<Vec<u8>, CodecError> {
        Self::encode_fields(&self.input, value)
    }

    fn decode(&self, _entry: &InterfaceEntry, bytes: &[u8]) -> Result<Value, CodecError> {
        Self::decode_fields(&self.output, bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::EntryKind;
    use serde_json::json;

    fn entry() -> InterfaceEntry {
        InterfaceEntry {
            kind: EntryKind::Function,
            name: "Demo".to_string(),
            input_type: 1,
            input_size: None,
            output_size: None,
        }
    }

    #[test]
    fn test_sizes() {
        let codec = LayoutCodec::new()
            .input_field("a", FieldType::U16)
            .input_field("b", FieldType::PublicKey)
            .output_field("c", FieldType::I64);
        assert_eq!(codec.encoded_input_size(), Some(34));
        assert_eq!(codec.encoded_output_size(), Some(8));
    }

    #[test]
    fn test_encode_integers_little_endian() {
        let codec = LayoutCodec::new()
            .input_field("price", FieldType::I64)
            .input_field("units", FieldType::U16);

        let bytes = codec
            .encode(&entry(), &json!({ "price": -2, "units": 600 }))
            .unwrap();
        assert_eq!(&bytes[..8], &(-2i64).to_le_bytes());
        assert_eq!(&bytes[8..10], &600u16.to_le_bytes());
    }

    #[test]
    fn test_identity_field_writes_public_key() {
        let key = PublicKey::from_bytes([3u8; 32]);
        let identity = fugue_crypto::identity_from_public_key(&key);

        let codec = LayoutCodec::new().input_field("owner", FieldType::Identity);
        let bytes = codec
            .encode(&entry(), &json!({ "owner": identity.as_str() }))
            .unwrap();
        assert_eq!(bytes, [3u8; 32]);
    }

    #[test]
    fn test_decode_round_trip() {
        let codec = LayoutCodec::new()
            .output_field("issuer", FieldType::Identity)
            .output_field("assetName", FieldType::AssetName)
            .output_field("price", FieldType::I64)
            .output_field("open", FieldType::Bool);

        let key = PublicKey::from_bytes([5u8; 32]);
        let mut bytes = Vec::new();
        bytes.extend_from_slice(key.as_bytes());
        bytes.extend_from_slice(b"QX\0\0\0\0\0\0");
        bytes.extend_from_slice(&42i64.to_le_bytes());
        bytes.push(1);

        let decoded = codec.decode(&entry(), &bytes).unwrap();
        assert_eq!(
            decoded["issuer"],
            fugue_crypto::identity_from_public_key(&key).as_str()
        );
        assert_eq!(decoded["assetName"], "QX");
        assert_eq!(decoded["price"], 42);
        assert_eq!(decoded["open"], true);
    }

    #[test]
    fn test_missing_field_is_an_error() {
        let codec = LayoutCodec::new().input_field("price", FieldType::I64);
        let err = codec.encode(&entry(), &json!({})).unwrap_err();
        assert!(err.to_string().contains("price"));
    }

    #[test]
    fn test_overflow_is_an_error() {
        let codec = LayoutCodec::new().input_field("small", FieldType::U8);
        let err = codec.encode(&entry(), &json!({ "small": 300 })).unwrap_err();
        assert!(err.to_string().contains("overflows"));
    }

    #[test]
    fn test_short_response_is_an_error() {
        let codec = LayoutCodec::new().output_field("value", FieldType::U64);
        let err = codec.decode(&entry(), &[1, 2, 3]).unwrap_err();
        assert!(err.to_string().contains("too short"));
    }

    #[test]
    fn test_fixed_bytes_field() {
        let codec = LayoutCodec::new().input_field("digest", FieldType::Bytes(4));
        let bytes = codec
            .encode(&entry(), &json!({ "digest": "deadbeef" }))
            .unwrap();
        assert_eq!(bytes, [0xde, 0xad, 0xbe, 0xef]);

        let err = codec
            .encode(&entry(), &json!({ "digest": "dead" }))
            .unwrap_err();
        assert!(err.to_string().contains("expects 4 bytes"));
    }
}
