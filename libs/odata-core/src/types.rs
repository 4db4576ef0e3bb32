use serde::{Deserialize, Serialize};

/// Primitive EDM type kinds understood by the URI grammar.
///
/// Every literal in a request URI (key predicates, `$filter` operands,
/// `$skiptoken` values) resolves to one of these kinds, and every primitive
/// resource property declares one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveKind {
    Binary,
    Boolean,
    Byte,
    DateTime,
    Decimal,
    Double,
    Guid,
    Int16,
    Int32,
    Int64,
    SByte,
    Single,
    String,
}

impl PrimitiveKind {
    #[must_use]
    pub fn edm_name(self) -> &'static str {
        match self {
            PrimitiveKind::Binary => "Edm.Binary",
            PrimitiveKind::Boolean => "Edm.Boolean",
            PrimitiveKind::Byte => "Edm.Byte",
            PrimitiveKind::DateTime => "Edm.DateTime",
            PrimitiveKind::Decimal => "Edm.Decimal",
            PrimitiveKind::Double => "Edm.Double",
            PrimitiveKind::Guid => "Edm.Guid",
            PrimitiveKind::Int16 => "Edm.Int16",
            PrimitiveKind::Int32 => "Edm.Int32",
            PrimitiveKind::Int64 => "Edm.Int64",
            PrimitiveKind::SByte => "Edm.SByte",
            PrimitiveKind::Single => "Edm.Single",
            PrimitiveKind::String => "Edm.String",
        }
    }

    #[must_use]
    pub fn is_integral(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Byte
                | PrimitiveKind::SByte
                | PrimitiveKind::Int16
                | PrimitiveKind::Int32
                | PrimitiveKind::Int64
        )
    }

    #[must_use]
    pub fn is_floating(self) -> bool {
        matches!(self, PrimitiveKind::Single | PrimitiveKind::Double)
    }

    #[must_use]
    pub fn is_numeric(self) -> bool {
        self.is_integral() || self.is_floating() || self == PrimitiveKind::Decimal
    }

    /// Whether `<`/`>`-style ordering comparisons are defined between the
    /// two kinds. Numeric kinds compare across each other; everything else
    /// only against itself.
    #[must_use]
    pub fn comparable_with(self, other: PrimitiveKind) -> bool {
        self == other || (self.is_numeric() && other.is_numeric())
    }
}

impl std::fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.edm_name())
    }
}
