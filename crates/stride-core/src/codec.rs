//! Element codecs
//!
//! An [`ElementCodec`] turns one element [`Value`] into its fixed-width byte
//! encoding and back. Views and arrays only ever see `dyn ElementCodec`, so a
//! new element type is added by registering another codec in a
//! [`CodecRegistry`], without touching address arithmetic.
//!
//! Built-in codecs cover every [`ScalarKind`]; [`RecordCodec`] packs a fixed
//! list of scalar fields back to back.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Byte order used by scalar codecs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    #[default]
    Little,
    Big,
}

impl ByteOrder {
    pub(crate) fn from_env_value(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "little" | "le" => Some(Self::Little),
            "big" | "be" => Some(Self::Big),
            _ => None,
        }
    }
}

/// A single element value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    /// Fields of a record element, in declaration order
    Record(Vec<Value>),
}

impl Value {
    /// Scalar kind of this value, `None` for records
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        Some(match self {
            Self::Bool(_) => ScalarKind::Bool,
            Self::I8(_) => ScalarKind::I8,
            Self::I16(_) => ScalarKind::I16,
            Self::I32(_) => ScalarKind::I32,
            Self::I64(_) => ScalarKind::I64,
            Self::U8(_) => ScalarKind::U8,
            Self::U16(_) => ScalarKind::U16,
            Self::U32(_) => ScalarKind::U32,
            Self::U64(_) => ScalarKind::U64,
            Self::F32(_) => ScalarKind::F32,
            Self::F64(_) => ScalarKind::F64,
            Self::Record(_) => return None,
        })
    }

    /// Integer payload widened to `i128`, `None` for non-integer values
    pub fn as_integer(&self) -> Option<i128> {
        match *self {
            Self::I8(v) => Some(v.into()),
            Self::I16(v) => Some(v.into()),
            Self::I32(v) => Some(v.into()),
            Self::I64(v) => Some(v.into()),
            Self::U8(v) => Some(v.into()),
            Self::U16(v) => Some(v.into()),
            Self::U32(v) => Some(v.into()),
            Self::U64(v) => Some(v.into()),
            _ => None,
        }
    }

    fn variant_name(&self) -> &'static str {
        match self.scalar_kind() {
            Some(kind) => kind.name(),
            None => "record",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::I8(v) => write!(f, "{v}"),
            Self::I16(v) => write!(f, "{v}"),
            Self::I32(v) => write!(f, "{v}"),
            Self::I64(v) => write!(f, "{v}"),
            Self::U8(v) => write!(f, "{v}"),
            Self::U16(v) => write!(f, "{v}"),
            Self::U32(v) => write!(f, "{v}"),
            Self::U64(v) => write!(f, "{v}"),
            Self::F32(v) => write!(f, "{v:?}"),
            Self::F64(v) => write!(f, "{v:?}"),
            Self::Record(fields) => {
                write!(f, "(")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{field}")?;
                }
                write!(f, ")")
            }
        }
    }
}

macro_rules! impl_value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

impl_value_from!(
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
);

/// Built-in scalar element kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
}

impl ScalarKind {
    pub const ALL: [ScalarKind; 11] = [
        Self::Bool,
        Self::I8,
        Self::I16,
        Self::I32,
        Self::I64,
        Self::U8,
        Self::U16,
        Self::U32,
        Self::U64,
        Self::F32,
        Self::F64,
    ];

    pub const fn size_bytes(self) -> usize {
        match self {
            Self::Bool | Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
        }
    }

    pub const fn is_integer(self) -> bool {
        !matches!(self, Self::Bool | Self::F32 | Self::F64)
    }

    /// Registry name of the kind
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "int8",
            Self::I16 => "int16",
            Self::I32 => "int32",
            Self::I64 => "int64",
            Self::U8 => "uint8",
            Self::U16 => "uint16",
            Self::U32 => "uint32",
            Self::U64 => "uint64",
            Self::F32 => "float32",
            Self::F64 => "float64",
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fixed-width encoding of one element type
///
/// Implementations must be deterministic: `decode(encode(v)) == v` for every
/// value the codec accepts, and every encoding is exactly `size()` bytes.
pub trait ElementCodec: fmt::Debug + Send + Sync {
    /// Element type name
    fn name(&self) -> &str;

    /// Encoded width in bytes
    fn size(&self) -> usize;

    /// Encode `value` into `dest`, which must be exactly `size()` bytes
    ///
    /// # Errors
    ///
    /// `CodecMismatch` if the value has the wrong variant or `dest` the wrong length.
    fn encode(&self, value: &Value, dest: &mut [u8]) -> Result<()>;

    /// Decode one element from exactly `size()` bytes
    fn decode(&self, src: &[u8]) -> Result<Value>;

    /// Whether decoded values can serve as indices
    fn is_integer(&self) -> bool;
}

fn check_width(codec: &dyn ElementCodec, len: usize) -> Result<()> {
    if len == codec.size() {
        Ok(())
    } else {
        Err(Error::codec(format!(
            "{} expects {} bytes, got {}",
            codec.name(),
            codec.size(),
            len
        )))
    }
}

macro_rules! put_scalar {
    ($order:expr, $dest:expr, $v:expr) => {{
        let bytes = match $order {
            ByteOrder::Little => $v.to_le_bytes(),
            ByteOrder::Big => $v.to_be_bytes(),
        };
        $dest.copy_from_slice(&bytes);
    }};
}

macro_rules! get_scalar {
    ($order:expr, $src:expr, $ty:ty) => {{
        let mut raw = [0u8; std::mem::size_of::<$ty>()];
        raw.copy_from_slice($src);
        match $order {
            ByteOrder::Little => <$ty>::from_le_bytes(raw),
            ByteOrder::Big => <$ty>::from_be_bytes(raw),
        }
    }};
}

/// Codec for one built-in scalar kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalarCodec {
    kind: ScalarKind,
    order: ByteOrder,
}

impl ScalarCodec {
    pub const fn new(kind: ScalarKind, order: ByteOrder) -> Self {
        Self { kind, order }
    }

    /// Little-endian 4-byte signed integer
    pub const fn i32() -> Self {
        Self::new(ScalarKind::I32, ByteOrder::Little)
    }

    pub const fn kind(&self) -> ScalarKind {
        self.kind
    }

    pub const fn order(&self) -> ByteOrder {
        self.order
    }
}

impl ElementCodec for ScalarCodec {
    fn name(&self) -> &str {
        self.kind.name()
    }

    fn size(&self) -> usize {
        self.kind.size_bytes()
    }

    fn encode(&self, value: &Value, dest: &mut [u8]) -> Result<()> {
        check_width(self, dest.len())?;
        let order = self.order;
        match (self.kind, value) {
            (ScalarKind::Bool, Value::Bool(v)) => dest[0] = u8::from(*v),
            (ScalarKind::I8, Value::I8(v)) => put_scalar!(order, dest, v),
            (ScalarKind::I16, Value::I16(v)) => put_scalar!(order, dest, v),
            (ScalarKind::I32, Value::I32(v)) => put_scalar!(order, dest, v),
            (ScalarKind::I64, Value::I64(v)) => put_scalar!(order, dest, v),
            (ScalarKind::U8, Value::U8(v)) => put_scalar!(order, dest, v),
            (ScalarKind::U16, Value::U16(v)) => put_scalar!(order, dest, v),
            (ScalarKind::U32, Value::U32(v)) => put_scalar!(order, dest, v),
            (ScalarKind::U64, Value::U64(v)) => put_scalar!(order, dest, v),
            (ScalarKind::F32, Value::F32(v)) => put_scalar!(order, dest, v),
            (ScalarKind::F64, Value::F64(v)) => put_scalar!(order, dest, v),
            (kind, other) => {
                return Err(Error::codec(format!(
                    "cannot encode {} value with {kind} codec",
                    other.variant_name()
                )))
            }
        }
        Ok(())
    }

    fn decode(&self, src: &[u8]) -> Result<Value> {
        check_width(self, src.len())?;
        let order = self.order;
        Ok(match self.kind {
            ScalarKind::Bool => Value::Bool(src[0] != 0),
            ScalarKind::I8 => Value::I8(get_scalar!(order, src, i8)),
            ScalarKind::I16 => Value::I16(get_scalar!(order, src, i16)),
            ScalarKind::I32 => Value::I32(get_scalar!(order, src, i32)),
            ScalarKind::I64 => Value::I64(get_scalar!(order, src, i64)),
            ScalarKind::U8 => Value::U8(get_scalar!(order, src, u8)),
            ScalarKind::U16 => Value::U16(get_scalar!(order, src, u16)),
            ScalarKind::U32 => Value::U32(get_scalar!(order, src, u32)),
            ScalarKind::U64 => Value::U64(get_scalar!(order, src, u64)),
            ScalarKind::F32 => Value::F32(get_scalar!(order, src, f32)),
            ScalarKind::F64 => Value::F64(get_scalar!(order, src, f64)),
        })
    }

    fn is_integer(&self) -> bool {
        self.kind.is_integer()
    }
}

/// Named field of a [`RecordCodec`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordField {
    pub name: String,
    pub codec: ScalarCodec,
    /// Byte offset of the field inside the record
    pub offset: usize,
}

/// Fixed-layout record of scalar fields, packed without padding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordCodec {
    name: String,
    fields: Vec<RecordField>,
    size: usize,
}

impl RecordCodec {
    /// Lay out `fields` back to back in declaration order
    ///
    /// # Errors
    ///
    /// `CodecMismatch` if a field name repeats.
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        fields: impl IntoIterator<Item = (S, ScalarKind)>,
        order: ByteOrder,
    ) -> Result<Self> {
        let name = name.into();
        let mut laid_out: Vec<RecordField> = Vec::new();
        let mut offset = 0;

        for (field_name, kind) in fields {
            let field_name = field_name.into();
            if laid_out.iter().any(|f| f.name == field_name) {
                return Err(Error::codec(format!("duplicate field '{field_name}' in record {name}")));
            }
            laid_out.push(RecordField {
                name: field_name,
                codec: ScalarCodec::new(kind, order),
                offset,
            });
            offset += kind.size_bytes();
        }

        Ok(Self {
            name,
            fields: laid_out,
            size: offset,
        })
    }

    pub fn fields(&self) -> &[RecordField] {
        &self.fields
    }

    /// Position of the field called `name`
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Borrow the named field out of a decoded record value
    pub fn field<'v>(&self, value: &'v Value, name: &str) -> Result<&'v Value> {
        let index = self
            .field_index(name)
            .ok_or_else(|| Error::codec(format!("record {} has no field '{name}'", self.name)))?;
        match value {
            Value::Record(values) if values.len() == self.fields.len() => Ok(&values[index]),
            other => Err(Error::codec(format!(
                "expected {} record, got {} value",
                self.name,
                other.variant_name()
            ))),
        }
    }
}

impl ElementCodec for RecordCodec {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> usize {
        self.size
    }

    fn encode(&self, value: &Value, dest: &mut [u8]) -> Result<()> {
        check_width(self, dest.len())?;
        let values = match value {
            Value::Record(values) if values.len() == self.fields.len() => values,
            Value::Record(values) => {
                return Err(Error::codec(format!(
                    "record {} has {} fields, got {}",
                    self.name,
                    self.fields.len(),
                    values.len()
                )))
            }
            other => {
                return Err(Error::codec(format!(
                    "cannot encode {} value with record codec {}",
                    other.variant_name(),
                    self.name
                )))
            }
        };

        for (field, value) in self.fields.iter().zip(values) {
            let end = field.offset + field.codec.size();
            field.codec.encode(value, &mut dest[field.offset..end])?;
        }
        Ok(())
    }

    fn decode(&self, src: &[u8]) -> Result<Value> {
        check_width(self, src.len())?;
        self.fields
            .iter()
            .map(|field| field.codec.decode(&src[field.offset..field.offset + field.codec.size()]))
            .collect::<Result<Vec<_>>>()
            .map(Value::Record)
    }

    fn is_integer(&self) -> bool {
        false
    }
}

/// Element type name to codec lookup
#[derive(Debug, Clone, Default)]
pub struct CodecRegistry {
    codecs: HashMap<String, Arc<dyn ElementCodec>>,
}

impl CodecRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding a codec for every built-in scalar kind
    pub fn builtin(order: ByteOrder) -> Self {
        let mut registry = Self::new();
        for kind in ScalarKind::ALL {
            registry.register(Arc::new(ScalarCodec::new(kind, order)));
        }
        registry
    }

    /// Add a codec under its own name, returning any codec it replaces
    pub fn register(&mut self, codec: Arc<dyn ElementCodec>) -> Option<Arc<dyn ElementCodec>> {
        tracing::debug!(name = codec.name(), size = codec.size(), "registering codec");
        self.codecs.insert(codec.name().to_string(), codec)
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn ElementCodec>> {
        self.codecs
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownCodec(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.codecs.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.codecs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
