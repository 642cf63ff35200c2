//! Dynamically shaped values produced by generators.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::{DateTime, TimeDelta, Utc};
use num_bigint::BigInt;

use crate::context::GenerationContext;
use crate::error::GenerationError;
use crate::generator::Generator;
use crate::rng::SourceOfRandomness;

/// A generated value.
///
/// Floats compare and hash by bit pattern, which makes `Value` a lawful `Eq`
/// key for the map and set generators.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    BigInt(BigInt),
    F32(f32),
    F64(f64),
    Decimal(BigDecimal),
    Char(char),
    Str(String),
    List(Vec<Value>),
    /// Distinct elements in generation order
    Set(Vec<Value>),
    /// Unique keys in insertion order
    Map(Vec<(Value, Value)>),
    Array(Vec<Value>),
    Tuple(Vec<Value>),
    Optional(Option<Box<Value>>),
    Enum {
        type_name: String,
        variant: String,
        ordinal: usize,
    },
    Instant(DateTime<Utc>),
    Duration(TimeDelta),
    Function(GeneratedFunction),
    Struct {
        name: String,
        fields: Vec<(String, Value)>,
    },
}

impl Value {
    /// Elements of any sequence-shaped value
    pub fn elements(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) | Value::Set(items) | Value::Array(items) | Value::Tuple(items) => {
                Some(items)
            }
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I8(v) => Some(i64::from(*v)),
            Value::I16(v) => Some(i64::from(*v)),
            Value::I32(v) => Some(i64::from(*v)),
            Value::I64(v) => Some(*v),
            Value::U8(v) => Some(i64::from(*v)),
            Value::U16(v) => Some(i64::from(*v)),
            Value::U32(v) => Some(i64::from(*v)),
            Value::U64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Insert into an insertion-ordered map, overwriting the entry of an equal key.
    pub fn insert_entry(entries: &mut Vec<(Value, Value)>, key: Value, value: Value) {
        match entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = value,
            None => entries.push((key, value)),
        }
    }

    fn discriminant(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::I8(_) => 2,
            Value::I16(_) => 3,
            Value::I32(_) => 4,
            Value::I64(_) => 5,
            Value::U8(_) => 6,
            Value::U16(_) => 7,
            Value::U32(_) => 8,
            Value::U64(_) => 9,
            Value::BigInt(_) => 10,
            Value::F32(_) => 11,
            Value::F64(_) => 12,
            Value::Decimal(_) => 13,
            Value::Char(_) => 14,
            Value::Str(_) => 15,
            Value::List(_) => 16,
            Value::Set(_) => 17,
            Value::Map(_) => 18,
            Value::Array(_) => 19,
            Value::Tuple(_) => 20,
            Value::Optional(_) => 21,
            Value::Enum { .. } => 22,
            Value::Instant(_) => 23,
            Value::Duration(_) => 24,
            Value::Function(_) => 25,
            Value::Struct { .. } => 26,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::I8(a), Value::I8(b)) => a == b,
            (Value::I16(a), Value::I16(b)) => a == b,
            (Value::I32(a), Value::I32(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::U8(a), Value::U8(b)) => a == b,
            (Value::U16(a), Value::U16(b)) => a == b,
            (Value::U32(a), Value::U32(b)) => a == b,
            (Value::U64(a), Value::U64(b)) => a == b,
            (Value::BigInt(a), Value::BigInt(b)) => a == b,
            (Value::F32(a), Value::F32(b)) => a.to_bits() == b.to_bits(),
            (Value::F64(a), Value::F64(b)) => a.to_bits() == b.to_bits(),
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b))
            | (Value::Array(a), Value::Array(b))
            | (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::Set(a), Value::Set(b)) => {
                a.len() == b.len() && a.iter().all(|item| b.contains(item))
            }
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(key, value)| {
                        b.iter()
                            .any(|(other_key, other_value)| key == other_key && value == other_value)
                    })
            }
            (Value::Optional(a), Value::Optional(b)) => a == b,
            (
                Value::Enum {
                    type_name: a_type,
                    ordinal: a_ordinal,
                    ..
                },
                Value::Enum {
                    type_name: b_type,
                    ordinal: b_ordinal,
                    ..
                },
            ) => a_type == b_type && a_ordinal == b_ordinal,
            (Value::Instant(a), Value::Instant(b)) => a == b,
            (Value::Duration(a), Value::Duration(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a == b,
            (
                Value::Struct {
                    name: a_name,
                    fields: a_fields,
                },
                Value::Struct {
                    name: b_name,
                    fields: b_fields,
                },
            ) => a_name == b_name && a_fields == b_fields,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.discriminant().hash(state);
        match self {
            Value::Null => {}
            Value::Bool(v) => v.hash(state),
            Value::I8(v) => v.hash(state),
            Value::I16(v) => v.hash(state),
            Value::I32(v) => v.hash(state),
            Value::I64(v) => v.hash(state),
            Value::U8(v) => v.hash(state),
            Value::U16(v) => v.hash(state),
            Value::U32(v) => v.hash(state),
            Value::U64(v) => v.hash(state),
            Value::BigInt(v) => v.hash(state),
            Value::F32(v) => v.to_bits().hash(state),
            Value::F64(v) => v.to_bits().hash(state),
            Value::Decimal(v) => v.hash(state),
            Value::Char(v) => v.hash(state),
            Value::Str(v) => v.hash(state),
            Value::List(items) | Value::Array(items) | Value::Tuple(items) => items.hash(state),
            // Order-insensitive equality needs an order-insensitive hash.
            Value::Set(items) => items.len().hash(state),
            Value::Map(entries) => entries.len().hash(state),
            Value::Optional(inner) => inner.hash(state),
            Value::Enum {
                type_name, ordinal, ..
            } => {
                type_name.hash(state);
                ordinal.hash(state);
            }
            Value::Instant(v) => v.hash(state),
            Value::Duration(v) => v.hash(state),
            Value::Function(f) => f.seed.hash(state),
            Value::Struct { name, fields } => {
                name.hash(state);
                fields.hash(state);
            }
        }
    }
}

fn write_sequence(
    f: &mut fmt::Formatter<'_>,
    open: &str,
    close: &str,
    items: &[Value],
) -> fmt::Result {
    write!(f, "{}", open)?;
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    write!(f, "{}", close)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::I8(v) => write!(f, "{}", v),
            Value::I16(v) => write!(f, "{}", v),
            Value::I32(v) => write!(f, "{}", v),
            Value::I64(v) => write!(f, "{}", v),
            Value::U8(v) => write!(f, "{}", v),
            Value::U16(v) => write!(f, "{}", v),
            Value::U32(v) => write!(f, "{}", v),
            Value::U64(v) => write!(f, "{}", v),
            Value::BigInt(v) => write!(f, "{}", v),
            Value::F32(v) => write!(f, "{:?}", v),
            Value::F64(v) => write!(f, "{:?}", v),
            Value::Decimal(v) => write!(f, "{}", v),
            Value::Char(v) => write!(f, "{:?}", v),
            Value::Str(v) => write!(f, "{:?}", v),
            Value::List(items) | Value::Array(items) => write_sequence(f, "[", "]", items),
            Value::Set(items) => write_sequence(f, "{", "}", items),
            Value::Tuple(items) => write_sequence(f, "(", ")", items),
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (index, (key, value)) in entries.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}={}", key, value)?;
                }
                write!(f, "}}")
            }
            Value::Optional(None) => write!(f, "None"),
            Value::Optional(Some(inner)) => write!(f, "Some({})", inner),
            Value::Enum {
                type_name, variant, ..
            } => write!(f, "{}::{}", type_name, variant),
            Value::Instant(v) => write!(f, "{}", v.to_rfc3339()),
            Value::Duration(v) => write!(f, "{}", v),
            Value::Function(func) => write!(f, "{}", func),
            Value::Struct { name, fields } => {
                write!(f, "{} {{ ", name)?;
                for (index, (field, value)) in fields.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", field, value)?;
                }
                write!(f, " }}")
            }
        }
    }
}

/// Render an argument list the way failure reports show it
pub fn render_arguments(values: &[Value]) -> String {
    let rendered: Vec<String> = values.iter().map(ToString::to_string).collect();
    format!("[{}]", rendered.join(", "))
}

/// A generated pure function.
///
/// Calling it hashes the arguments together with the function's seed, reseeds
/// a private source of randomness with the result and asks the codomain
/// generator for a value, so equal arguments always map to equal results.
#[derive(Clone)]
pub struct GeneratedFunction {
    seed: i64,
    arity: usize,
    size: usize,
    codomain: Arc<dyn Generator>,
}

impl GeneratedFunction {
    pub fn new(seed: i64, arity: usize, size: usize, codomain: Arc<dyn Generator>) -> Self {
        Self {
            seed,
            arity,
            size,
            codomain,
        }
    }

    pub fn seed(&self) -> i64 {
        self.seed
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Apply the function to `args`
    pub fn apply(&self, args: &[Value]) -> Result<Value, GenerationError> {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.seed.hash(&mut hasher);
        args.hash(&mut hasher);
        let mut random = SourceOfRandomness::new(hasher.finish() as i64);
        let mut context = GenerationContext::new(self.size);
        self.codomain.generate(&mut random, &mut context)
    }
}

impl PartialEq for GeneratedFunction {
    fn eq(&self, other: &Self) -> bool {
        self.seed == other.seed
            && self.arity == other.arity
            && self.size == other.size
            && self.codomain.types() == other.codomain.types()
    }
}

impl fmt::Debug for GeneratedFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedFunction")
            .field("seed", &self.seed)
            .field("arity", &self.arity)
            .finish()
    }
}

impl fmt::Display for GeneratedFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<function/{} seed={}>", self.arity, self.seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_float_equality_by_bits() {
        assert_eq!(Value::F64(f64::NAN), Value::F64(f64::NAN));
        assert_ne!(Value::F64(0.0), Value::F64(-0.0));
        assert_ne!(Value::I32(1), Value::I64(1));
    }

    #[test]
    fn test_values_key_hash_sets() {
        let mut set = HashSet::new();
        set.insert(Value::Str("a".to_string()));
        set.insert(Value::Str("a".to_string()));
        set.insert(Value::List(vec![Value::I32(1)]));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_functions_compare_by_recipe() {
        use crate::primitives::BoolGenerator;
        let first = GeneratedFunction::new(7, 1, 10, Arc::new(BoolGenerator));
        let second = GeneratedFunction::new(7, 1, 10, Arc::new(BoolGenerator));
        assert_eq!(Value::Function(first.clone()), Value::Function(second));
        assert_ne!(first, GeneratedFunction::new(8, 1, 10, Arc::new(BoolGenerator)));
        assert_ne!(first, GeneratedFunction::new(7, 1, 11, Arc::new(BoolGenerator)));
    }

    #[test]
    fn test_set_and_map_equality_ignore_order() {
        let first = Value::Set(vec![Value::I32(1), Value::I32(2)]);
        let second = Value::Set(vec![Value::I32(2), Value::I32(1)]);
        assert_eq!(first, second);

        let first = Value::Map(vec![
            (Value::I32(1), Value::Bool(true)),
            (Value::I32(2), Value::Bool(false)),
        ]);
        let second = Value::Map(vec![
            (Value::I32(2), Value::Bool(false)),
            (Value::I32(1), Value::Bool(true)),
        ]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_insert_entry_overwrites_duplicate_keys() {
        let mut entries = Vec::new();
        Value::insert_entry(&mut entries, Value::I32(1), Value::Str("a".into()));
        Value::insert_entry(&mut entries, Value::I32(2), Value::Str("b".into()));
        Value::insert_entry(&mut entries, Value::I32(1), Value::Str("c".into()));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].1, Value::Str("c".into()));
    }

    #[test]
    fn test_deep_rendering() {
        let value = Value::Map(vec![(
            Value::Str("k".into()),
            Value::List(vec![Value::I32(1), Value::Optional(None)]),
        )]);
        assert_eq!(value.to_string(), "{\"k\"=[1, None]}");
        assert_eq!(
            render_arguments(&[Value::I32(50), Value::Bool(false)]),
            "[50, false]"
        );
    }
}
