//! Typed expression tree for `$filter`.
//!
//! Every node carries the static type the parser resolved for it; the
//! predicate compiler never re-derives types at evaluation time.

use std::sync::Arc;

use odata_core::{PrimitiveKind, ResourceProperty, ResourceType};
use odata_core::Value;

#[derive(Clone, Debug)]
pub struct Expr {
    pub node: ExprNode,
    pub ty: ExprType,
}

#[derive(Clone, Debug)]
pub enum ExprNode {
    Literal(Value),
    Null,
    Property(PropertyPath),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Function(Function, Vec<Expr>),
}

/// Static type of an expression node.
#[derive(Clone, Debug)]
pub enum ExprType {
    Primitive(PrimitiveKind),
    Complex(Arc<ResourceType>),
    Entity(Arc<ResourceType>),
    /// The `null` literal before it is pinned against an operand.
    Null,
}

impl ExprType {
    #[must_use]
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self {
            ExprType::Primitive(k) => Some(*k),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_boolean(&self) -> bool {
        matches!(self, ExprType::Primitive(PrimitiveKind::Boolean))
    }

    /// Display name used in operator-mismatch diagnostics.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            ExprType::Primitive(k) => k.edm_name().to_owned(),
            ExprType::Complex(ty) | ExprType::Entity(ty) => ty.name.clone(),
            ExprType::Null => "null".to_owned(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
}

impl UnaryOp {
    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            UnaryOp::Not => "not",
            UnaryOp::Negate => "-",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            BinaryOp::Or => "or",
            BinaryOp::And => "and",
            BinaryOp::Eq => "eq",
            BinaryOp::Ne => "ne",
            BinaryOp::Gt => "gt",
            BinaryOp::Ge => "ge",
            BinaryOp::Lt => "lt",
            BinaryOp::Le => "le",
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
            BinaryOp::Mod => "mod",
        }
    }

    #[must_use]
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Gt | BinaryOp::Ge | BinaryOp::Lt | BinaryOp::Le
        )
    }

    #[must_use]
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod
        )
    }
}

/// Metadata-resolved property access path, for example `Address/City`.
/// Intermediate steps are complex properties or singular navigations; the
/// final step may be any primitive property.
#[derive(Clone, Debug)]
pub struct PropertyPath {
    pub steps: Vec<Arc<ResourceProperty>>,
}

impl PropertyPath {
    /// Names of the navigation properties the path traverses, in order.
    pub fn navigations(&self) -> impl Iterator<Item = &str> {
        self.steps
            .iter()
            .filter(|p| p.kind.is_navigation())
            .map(|p| p.name.as_str())
    }
}

/// Argument class for the built-in function table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgClass {
    Text,
    Integer,
    Numeric,
    Timestamp,
}

/// The canonical `$filter` function set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Function {
    SubstringOf,
    EndsWith,
    StartsWith,
    Length,
    IndexOf,
    Replace,
    Substring,
    ToLower,
    ToUpper,
    Trim,
    Concat,
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    Round,
    Floor,
    Ceiling,
}

impl Function {
    #[must_use]
    pub fn resolve(name: &str) -> Option<Function> {
        Some(match name {
            "substringof" => Function::SubstringOf,
            "endswith" => Function::EndsWith,
            "startswith" => Function::StartsWith,
            "length" => Function::Length,
            "indexof" => Function::IndexOf,
            "replace" => Function::Replace,
            "substring" => Function::Substring,
            "tolower" => Function::ToLower,
            "toupper" => Function::ToUpper,
            "trim" => Function::Trim,
            "concat" => Function::Concat,
            "year" => Function::Year,
            "month" => Function::Month,
            "day" => Function::Day,
            "hour" => Function::Hour,
            "minute" => Function::Minute,
            "second" => Function::Second,
            "round" => Function::Round,
            "floor" => Function::Floor,
            "ceiling" => Function::Ceiling,
            _ => return None,
        })
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Function::SubstringOf => "substringof",
            Function::EndsWith => "endswith",
            Function::StartsWith => "startswith",
            Function::Length => "length",
            Function::IndexOf => "indexof",
            Function::Replace => "replace",
            Function::Substring => "substring",
            Function::ToLower => "tolower",
            Function::ToUpper => "toupper",
            Function::Trim => "trim",
            Function::Concat => "concat",
            Function::Year => "year",
            Function::Month => "month",
            Function::Day => "day",
            Function::Hour => "hour",
            Function::Minute => "minute",
            Function::Second => "second",
            Function::Round => "round",
            Function::Floor => "floor",
            Function::Ceiling => "ceiling",
        }
    }

    /// Accepted signatures as argument-class rows. `substring` is the
    /// only overloaded entry.
    #[must_use]
    pub fn signatures(self) -> &'static [&'static [ArgClass]] {
        use ArgClass::{Integer, Numeric, Text, Timestamp};
        match self {
            Function::SubstringOf | Function::EndsWith | Function::StartsWith => {
                &[&[Text, Text]]
            }
            Function::Length | Function::ToLower | Function::ToUpper | Function::Trim => {
                &[&[Text]]
            }
            Function::IndexOf => &[&[Text, Text]],
            Function::Replace => &[&[Text, Text, Text]],
            Function::Substring => &[&[Text, Integer], &[Text, Integer, Integer]],
            Function::Concat => &[&[Text, Text]],
            Function::Year
            | Function::Month
            | Function::Day
            | Function::Hour
            | Function::Minute
            | Function::Second => &[&[Timestamp]],
            Function::Round | Function::Floor | Function::Ceiling => &[&[Numeric]],
        }
    }

    /// Result kind, given the checked argument list.
    #[must_use]
    pub fn return_kind(self, args: &[Expr]) -> PrimitiveKind {
        match self {
            Function::SubstringOf | Function::EndsWith | Function::StartsWith => {
                PrimitiveKind::Boolean
            }
            Function::Length
            | Function::IndexOf
            | Function::Year
            | Function::Month
            | Function::Day
            | Function::Hour
            | Function::Minute
            | Function::Second => PrimitiveKind::Int32,
            Function::Replace
            | Function::Substring
            | Function::ToLower
            | Function::ToUpper
            | Function::Trim
            | Function::Concat => PrimitiveKind::String,
            Function::Round | Function::Floor | Function::Ceiling => {
                match args.first().and_then(|a| a.ty.primitive_kind()) {
                    Some(PrimitiveKind::Decimal) => PrimitiveKind::Decimal,
                    _ => PrimitiveKind::Double,
                }
            }
        }
    }
}
