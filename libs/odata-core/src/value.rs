//! Typed primitive values and the URI literal grammar.
//!
//! Literal syntax follows the OData v1-v3 conventions: quoted strings with
//! `''` escaping, integer suffix `L`, decimal suffix `m`/`M`, single suffix
//! `f`/`F`, double suffix `d`/`D`, and the typed prefixes `guid'...'`,
//! `datetime'...'` and `binary'...'` / `X'...'`.

use std::cmp::Ordering;

use bigdecimal::{BigDecimal, FromPrimitive, Zero};
use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::error::{ODataError, ODataResult};
use crate::types::PrimitiveKind;

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Binary(Vec<u8>),
    Boolean(bool),
    Byte(u8),
    DateTime(NaiveDateTime),
    Decimal(BigDecimal),
    Double(f64),
    Guid(Uuid),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    SByte(i8),
    Single(f32),
    String(String),
}

impl Value {
    #[must_use]
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Value::Binary(_) => PrimitiveKind::Binary,
            Value::Boolean(_) => PrimitiveKind::Boolean,
            Value::Byte(_) => PrimitiveKind::Byte,
            Value::DateTime(_) => PrimitiveKind::DateTime,
            Value::Decimal(_) => PrimitiveKind::Decimal,
            Value::Double(_) => PrimitiveKind::Double,
            Value::Guid(_) => PrimitiveKind::Guid,
            Value::Int16(_) => PrimitiveKind::Int16,
            Value::Int32(_) => PrimitiveKind::Int32,
            Value::Int64(_) => PrimitiveKind::Int64,
            Value::SByte(_) => PrimitiveKind::SByte,
            Value::Single(_) => PrimitiveKind::Single,
            Value::String(_) => PrimitiveKind::String,
        }
    }

    /// Lex a standalone URI literal, inferring its kind from the syntax.
    ///
    /// # Errors
    /// Returns `ODataError::Syntax` for malformed literals. The keyword
    /// `null` is not a value and is rejected here; callers that accept null
    /// handle it before lexing.
    pub fn lex(raw: &str) -> ODataResult<Value> {
        let s = raw.trim();
        if s.is_empty() {
            return Err(ODataError::syntax("Expression expected; found an empty literal"));
        }
        if let Some(rest) = s.strip_prefix('\'') {
            let inner = rest
                .strip_suffix('\'')
                .ok_or_else(|| bad_literal(s, "unterminated string literal"))?;
            return Ok(Value::String(unescape_quotes(inner, s)?));
        }
        match s {
            "true" => return Ok(Value::Boolean(true)),
            "false" => return Ok(Value::Boolean(false)),
            "null" => {
                return Err(bad_literal(s, "null is not a valid value in this context"));
            }
            _ => {}
        }
        if let Some(inner) = strip_typed(s, "guid") {
            let u = Uuid::parse_str(inner).map_err(|_| bad_literal(s, "invalid guid"))?;
            return Ok(Value::Guid(u));
        }
        if let Some(inner) = strip_typed(s, "datetime") {
            return parse_datetime(inner)
                .map(Value::DateTime)
                .ok_or_else(|| bad_literal(s, "invalid datetime"));
        }
        if let Some(inner) = strip_typed(s, "binary").or_else(|| strip_typed(s, "X")) {
            let bytes = hex::decode(inner).map_err(|_| bad_literal(s, "invalid binary"))?;
            return Ok(Value::Binary(bytes));
        }
        lex_number(s)
    }

    /// Parse a URI literal that is expected to have the given kind, widening
    /// numeric literals where the literal syntax is less specific than the
    /// declared property type (`42` against an `Edm.Int64` key, etc.).
    ///
    /// # Errors
    /// Returns `ODataError::Syntax` on malformed input or a kind mismatch.
    pub fn parse_literal(kind: PrimitiveKind, raw: &str) -> ODataResult<Value> {
        Value::lex(raw)?.convert_to(kind)
    }

    /// Render the value back into its URI literal form. Round-trips through
    /// [`Value::parse_literal`] with the same kind.
    #[must_use]
    pub fn to_literal(&self) -> String {
        match self {
            Value::Binary(b) => format!("binary'{}'", hex::encode_upper(b)),
            Value::Boolean(b) => b.to_string(),
            Value::Byte(v) => v.to_string(),
            Value::DateTime(dt) => format!("datetime'{}'", dt.format("%Y-%m-%dT%H:%M:%S%.f")),
            Value::Decimal(d) => format!("{d}M"),
            Value::Double(v) => v.to_string(),
            Value::Guid(u) => format!("guid'{u}'"),
            Value::Int16(v) => v.to_string(),
            Value::Int32(v) => v.to_string(),
            Value::Int64(v) => format!("{v}L"),
            Value::SByte(v) => v.to_string(),
            Value::Single(v) => format!("{v}f"),
            Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        }
    }

    /// Convert into the target kind. Identity conversions always succeed;
    /// numeric values convert when representable; everything else must
    /// match exactly.
    ///
    /// # Errors
    /// Returns `ODataError::Syntax` when the value cannot represent `kind`.
    pub fn convert_to(self, kind: PrimitiveKind) -> ODataResult<Value> {
        if self.kind() == kind {
            return Ok(self);
        }
        let mismatch = |v: &Value| {
            ODataError::syntax(format!(
                "Cannot convert a literal of type '{}' to type '{}'",
                v.kind(),
                kind
            ))
        };
        if let Some(i) = self.as_i64() {
            return from_i64(i, kind).ok_or_else(|| mismatch(&self));
        }
        match (&self, kind) {
            (Value::Single(v), PrimitiveKind::Double) => Ok(Value::Double(f64::from(*v))),
            (Value::Double(v), PrimitiveKind::Single) => Ok(Value::Single(*v as f32)),
            (Value::Double(v), PrimitiveKind::Decimal) => BigDecimal::from_f64(*v)
                .map(Value::Decimal)
                .ok_or_else(|| mismatch(&self)),
            _ => Err(mismatch(&self)),
        }
    }

    /// Ordering comparison with numeric cross-kind promotion.
    /// `None` when the kinds are not comparable (or a float is NaN).
    #[must_use]
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        use Value as V;
        match (self, other) {
            (V::Binary(a), V::Binary(b)) => Some(a.cmp(b)),
            (V::Boolean(a), V::Boolean(b)) => Some(a.cmp(b)),
            (V::DateTime(a), V::DateTime(b)) => Some(a.cmp(b)),
            (V::Guid(a), V::Guid(b)) => Some(a.cmp(b)),
            (V::String(a), V::String(b)) => Some(a.cmp(b)),
            _ => {
                if !self.kind().is_numeric() || !other.kind().is_numeric() {
                    return None;
                }
                if matches!(self, V::Decimal(_)) || matches!(other, V::Decimal(_)) {
                    return Some(self.to_bigdecimal()?.cmp(&other.to_bigdecimal()?));
                }
                if self.kind().is_floating() || other.kind().is_floating() {
                    return self.as_f64()?.partial_cmp(&other.as_f64()?);
                }
                Some(self.as_i64()?.cmp(&other.as_i64()?))
            }
        }
    }

    pub fn checked_add(&self, other: &Value) -> Option<Value> {
        self.arith(other, i64::checked_add, |a, b| Some(a + b), |a, b| Some(a + b))
    }

    pub fn checked_sub(&self, other: &Value) -> Option<Value> {
        self.arith(other, i64::checked_sub, |a, b| Some(a - b), |a, b| Some(a - b))
    }

    pub fn checked_mul(&self, other: &Value) -> Option<Value> {
        self.arith(other, i64::checked_mul, |a, b| Some(a * b), |a, b| Some(a * b))
    }

    pub fn checked_div(&self, other: &Value) -> Option<Value> {
        self.arith(
            other,
            i64::checked_div,
            |a, b| Some(a / b),
            |a, b| if b.is_zero() { None } else { Some(a / b) },
        )
    }

    pub fn checked_rem(&self, other: &Value) -> Option<Value> {
        self.arith(
            other,
            i64::checked_rem,
            |a, b| Some(a % b),
            |a, b| if b.is_zero() { None } else { Some(a % b) },
        )
    }

    /// Numeric promotion: decimal wins over floating, floating over
    /// integral; integral math is done in `i64` and narrows back to `Int32`
    /// when both operands were 32-bit or narrower.
    fn arith(
        &self,
        other: &Value,
        fi: fn(i64, i64) -> Option<i64>,
        ff: fn(f64, f64) -> Option<f64>,
        fd: fn(&BigDecimal, &BigDecimal) -> Option<BigDecimal>,
    ) -> Option<Value> {
        use Value as V;
        if !self.kind().is_numeric() || !other.kind().is_numeric() {
            return None;
        }
        if matches!(self, V::Decimal(_)) || matches!(other, V::Decimal(_)) {
            return fd(&self.to_bigdecimal()?, &other.to_bigdecimal()?).map(V::Decimal);
        }
        if self.kind().is_floating() || other.kind().is_floating() {
            let r = ff(self.as_f64()?, other.as_f64()?)?;
            let single =
                !matches!(self, V::Double(_)) && !matches!(other, V::Double(_));
            return Some(if single { V::Single(r as f32) } else { V::Double(r) });
        }
        let r = fi(self.as_i64()?, other.as_i64()?)?;
        let narrow = !matches!(self, V::Int64(_)) && !matches!(other, V::Int64(_));
        if narrow {
            if let Ok(v) = i32::try_from(r) {
                return Some(V::Int32(v));
            }
        }
        Some(V::Int64(r))
    }

    fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Byte(v) => Some(i64::from(*v)),
            Value::SByte(v) => Some(i64::from(*v)),
            Value::Int16(v) => Some(i64::from(*v)),
            Value::Int32(v) => Some(i64::from(*v)),
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Single(v) => Some(f64::from(*v)),
            Value::Double(v) => Some(*v),
            _ => self.as_i64().map(|i| i as f64),
        }
    }

    fn to_bigdecimal(&self) -> Option<BigDecimal> {
        match self {
            Value::Decimal(d) => Some(d.clone()),
            Value::Single(v) => BigDecimal::from_f64(f64::from(*v)),
            Value::Double(v) => BigDecimal::from_f64(*v),
            _ => self.as_i64().map(BigDecimal::from),
        }
    }
}

fn from_i64(i: i64, kind: PrimitiveKind) -> Option<Value> {
    match kind {
        PrimitiveKind::Byte => u8::try_from(i).ok().map(Value::Byte),
        PrimitiveKind::SByte => i8::try_from(i).ok().map(Value::SByte),
        PrimitiveKind::Int16 => i16::try_from(i).ok().map(Value::Int16),
        PrimitiveKind::Int32 => i32::try_from(i).ok().map(Value::Int32),
        PrimitiveKind::Int64 => Some(Value::Int64(i)),
        PrimitiveKind::Single => Some(Value::Single(i as f32)),
        PrimitiveKind::Double => Some(Value::Double(i as f64)),
        PrimitiveKind::Decimal => Some(Value::Decimal(BigDecimal::from(i))),
        _ => None,
    }
}

fn bad_literal(raw: &str, why: &str) -> ODataError {
    ODataError::syntax(format!("Malformed literal '{raw}': {why}"))
}

fn unescape_quotes(inner: &str, raw: &str) -> ODataResult<String> {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\'' {
            match chars.next() {
                Some('\'') => out.push('\''),
                _ => return Err(bad_literal(raw, "unescaped quote in string literal")),
            }
        } else {
            out.push(c);
        }
    }
    Ok(out)
}

fn strip_typed<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    s.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('\''))
        .and_then(|rest| rest.strip_suffix('\''))
}

fn parse_datetime(inner: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(inner, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(inner, "%Y-%m-%dT%H:%M"))
        .ok()
}

fn lex_number(s: &str) -> ODataResult<Value> {
    let (body, suffix) = match s.chars().last() {
        Some(c @ ('L' | 'l' | 'm' | 'M' | 'f' | 'F' | 'd' | 'D')) => (&s[..s.len() - 1], Some(c)),
        _ => (s, None),
    };
    let err = || bad_literal(s, "invalid numeric literal");
    match suffix {
        Some('L' | 'l') => body.parse::<i64>().map(Value::Int64).map_err(|_| err()),
        Some('m' | 'M') => body.parse::<BigDecimal>().map(Value::Decimal).map_err(|_| err()),
        Some('f' | 'F') => body.parse::<f32>().map(Value::Single).map_err(|_| err()),
        Some('d' | 'D') => body.parse::<f64>().map(Value::Double).map_err(|_| err()),
        _ => {
            if body.contains(['.', 'e', 'E']) {
                body.parse::<f64>().map(Value::Double).map_err(|_| err())
            } else if let Ok(v) = body.parse::<i32>() {
                Ok(Value::Int32(v))
            } else {
                body.parse::<i64>().map(Value::Int64).map_err(|_| err())
            }
        }
    }
}
