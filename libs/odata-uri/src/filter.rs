//! Recursive-descent parser for `$filter`.
//!
//! Precedence, loosest first: `or`, `and`, comparisons, `add`/`sub`,
//! `mul`/`div`/`mod`, unary `not`/`-`, primary. Property names are
//! resolved against the target type as the tree is built, so the produced
//! [`Expr`] is fully typed and the whole expression is checked to be
//! boolean before it leaves this module.

use std::sync::Arc;

use odata_core::{ODataError, ODataResult, PrimitiveKind, ResourcePropertyKind, ResourceType};

use crate::ast::{ArgClass, BinaryOp, Expr, ExprNode, ExprType, Function, PropertyPath, UnaryOp};
use crate::lexer::{tokenize, SpannedToken, Token};

pub fn parse_filter(raw: &str, target: &Arc<ResourceType>) -> ODataResult<Expr> {
    let tokens = tokenize(raw)?;
    let mut parser = FilterParser {
        tokens,
        pos: 0,
        target,
        input: raw,
    };
    let expr = parser.parse_or()?;
    if let Some(t) = parser.peek() {
        let pos = t.pos;
        return Err(parser.syntax_at(pos));
    }
    if !expr.ty.is_boolean() {
        return Err(ODataError::syntax(format!(
            "The $filter expression must evaluate to a boolean value, not to type '{}'",
            expr.ty.name()
        )));
    }
    Ok(expr)
}

struct FilterParser<'a> {
    tokens: Vec<SpannedToken>,
    pos: usize,
    target: &'a Arc<ResourceType>,
    input: &'a str,
}

impl FilterParser<'_> {
    fn peek(&self) -> Option<&SpannedToken> {
        self.tokens.get(self.pos)
    }

    fn peek_keyword(&self) -> Option<&str> {
        match self.peek() {
            Some(SpannedToken {
                token: Token::Identifier(word),
                ..
            }) => Some(word.as_str()),
            _ => None,
        }
    }

    fn bump(&mut self) -> Option<SpannedToken> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn current_pos(&self) -> usize {
        self.peek().map_or(self.input.len(), |t| t.pos)
    }

    fn syntax_at(&self, pos: usize) -> ODataError {
        ODataError::syntax(format!("Syntax error at position {pos} in '{}'", self.input))
    }

    fn expect(&mut self, expected: &Token) -> ODataResult<()> {
        match self.peek() {
            Some(t) if &t.token == expected => {
                self.pos += 1;
                Ok(())
            }
            _ => Err(self.syntax_at(self.current_pos())),
        }
    }

    fn parse_or(&mut self) -> ODataResult<Expr> {
        let mut left = self.parse_and()?;
        while self.peek_keyword() == Some("or") {
            let pos = self.current_pos();
            self.pos += 1;
            let right = self.parse_and()?;
            left = self.logical(BinaryOp::Or, left, right, pos)?;
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> ODataResult<Expr> {
        let mut left = self.parse_comparison()?;
        while self.peek_keyword() == Some("and") {
            let pos = self.current_pos();
            self.pos += 1;
            let right = self.parse_comparison()?;
            left = self.logical(BinaryOp::And, left, right, pos)?;
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> ODataResult<Expr> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek_keyword() {
                Some("eq") => BinaryOp::Eq,
                Some("ne") => BinaryOp::Ne,
                Some("gt") => BinaryOp::Gt,
                Some("ge") => BinaryOp::Ge,
                Some("lt") => BinaryOp::Lt,
                Some("le") => BinaryOp::Le,
                _ => return Ok(left),
            };
            let pos = self.current_pos();
            self.pos += 1;
            let right = self.parse_additive()?;
            left = self.comparison(op, left, right, pos)?;
        }
    }

    fn parse_additive(&mut self) -> ODataResult<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_keyword() {
                Some("add") => BinaryOp::Add,
                Some("sub") => BinaryOp::Sub,
                _ => return Ok(left),
            };
            let pos = self.current_pos();
            self.pos += 1;
            let right = self.parse_multiplicative()?;
            left = self.arithmetic(op, left, right, pos)?;
        }
    }

    fn parse_multiplicative(&mut self) -> ODataResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_keyword() {
                Some("mul") => BinaryOp::Mul,
                Some("div") => BinaryOp::Div,
                Some("mod") => BinaryOp::Mod,
                _ => return Ok(left),
            };
            let pos = self.current_pos();
            self.pos += 1;
            let right = self.parse_unary()?;
            left = self.arithmetic(op, left, right, pos)?;
        }
    }

    fn parse_unary(&mut self) -> ODataResult<Expr> {
        match self.peek() {
            Some(SpannedToken {
                token: Token::Minus,
                pos,
            }) => {
                let pos = *pos;
                self.pos += 1;
                let operand = self.parse_unary()?;
                match operand.ty.primitive_kind() {
                    Some(k) if k.is_numeric() => Ok(Expr {
                        ty: ExprType::Primitive(k),
                        node: ExprNode::Unary(UnaryOp::Negate, Box::new(operand)),
                    }),
                    _ => Err(self.operand_mismatch_unary(UnaryOp::Negate, &operand, pos)),
                }
            }
            Some(SpannedToken {
                token: Token::Identifier(word),
                pos,
            }) if word == "not" => {
                let pos = *pos;
                self.pos += 1;
                let operand = self.parse_unary()?;
                if operand.ty.is_boolean() {
                    Ok(Expr {
                        ty: ExprType::Primitive(PrimitiveKind::Boolean),
                        node: ExprNode::Unary(UnaryOp::Not, Box::new(operand)),
                    })
                } else {
                    Err(self.operand_mismatch_unary(UnaryOp::Not, &operand, pos))
                }
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> ODataResult<Expr> {
        let pos = self.current_pos();
        match self.bump() {
            Some(SpannedToken {
                token: Token::OpenParen,
                ..
            }) => {
                let inner = self.parse_or()?;
                self.expect(&Token::CloseParen)?;
                Ok(inner)
            }
            Some(SpannedToken {
                token: Token::Literal(value),
                ..
            }) => Ok(Expr {
                ty: ExprType::Primitive(value.kind()),
                node: ExprNode::Literal(value),
            }),
            Some(SpannedToken {
                token: Token::Null, ..
            }) => Ok(Expr {
                ty: ExprType::Null,
                node: ExprNode::Null,
            }),
            Some(SpannedToken {
                token: Token::Identifier(word),
                ..
            }) => {
                if matches!(
                    self.peek(),
                    Some(SpannedToken {
                        token: Token::OpenParen,
                        ..
                    })
                ) {
                    self.parse_function(&word, pos)
                } else {
                    self.parse_property_path(&word, pos)
                }
            }
            _ => Err(self.syntax_at(pos)),
        }
    }

    fn parse_function(&mut self, name: &str, pos: usize) -> ODataResult<Expr> {
        let function = Function::resolve(name)
            .ok_or_else(|| ODataError::syntax(format!("Unknown function '{name}'")))?;
        self.expect(&Token::OpenParen)?;
        let mut args = Vec::new();
        if !matches!(
            self.peek(),
            Some(SpannedToken {
                token: Token::CloseParen,
                ..
            })
        ) {
            loop {
                args.push(self.parse_or()?);
                match self.peek() {
                    Some(SpannedToken {
                        token: Token::Comma,
                        ..
                    }) => {
                        self.pos += 1;
                    }
                    _ => break,
                }
            }
        }
        self.expect(&Token::CloseParen)?;
        self.check_function_args(function, &args, pos)?;
        let kind = function.return_kind(&args);
        Ok(Expr {
            ty: ExprType::Primitive(kind),
            node: ExprNode::Function(function, args),
        })
    }

    fn check_function_args(
        &self,
        function: Function,
        args: &[Expr],
        pos: usize,
    ) -> ODataResult<()> {
        let matched = function.signatures().iter().any(|sig| {
            sig.len() == args.len()
                && sig
                    .iter()
                    .zip(args)
                    .all(|(class, arg)| arg_matches(*class, arg))
        });
        if matched {
            Ok(())
        } else {
            Err(ODataError::syntax(format!(
                "No applicable function found for '{}' at position {pos} with the specified arguments",
                function.name()
            )))
        }
    }

    fn parse_property_path(&mut self, first: &str, pos: usize) -> ODataResult<Expr> {
        let mut steps = Vec::new();
        let mut container = Arc::clone(self.target);
        let mut name = first.to_owned();
        loop {
            let property = container.property(&name).cloned().ok_or_else(|| {
                ODataError::not_found(format!(
                    "Type '{}' does not have a property named '{name}'",
                    container.name
                ))
            })?;
            if property.kind.is_bag() {
                return Err(ODataError::syntax(format!(
                    "The bag property '{name}' cannot be used in a $filter expression"
                )));
            }
            if property.kind == ResourcePropertyKind::ResourceSetReference {
                return Err(ODataError::syntax(format!(
                    "The set-valued navigation property '{name}' cannot be traversed in a $filter expression"
                )));
            }
            steps.push(Arc::clone(&property));

            let more = matches!(
                self.peek(),
                Some(SpannedToken {
                    token: Token::Slash,
                    ..
                })
            );
            if !more {
                let ty = match property.kind {
                    ResourcePropertyKind::Primitive(k) => ExprType::Primitive(k),
                    ResourcePropertyKind::ComplexType => ExprType::Complex(
                        property.target_type.clone().ok_or_else(|| self.syntax_at(pos))?,
                    ),
                    ResourcePropertyKind::ResourceReference => ExprType::Entity(
                        property.target_type.clone().ok_or_else(|| self.syntax_at(pos))?,
                    ),
                    _ => return Err(self.syntax_at(pos)),
                };
                return Ok(Expr {
                    ty,
                    node: ExprNode::Property(PropertyPath { steps }),
                });
            }
            self.pos += 1; // the slash

            container = match (&property.kind, &property.target_type) {
                (
                    ResourcePropertyKind::ComplexType | ResourcePropertyKind::ResourceReference,
                    Some(target),
                ) => Arc::clone(target),
                _ => {
                    return Err(ODataError::syntax(format!(
                        "The primitive property '{name}' cannot be further composed in a $filter expression"
                    )))
                }
            };
            name = match self.bump() {
                Some(SpannedToken {
                    token: Token::Identifier(word),
                    ..
                }) => word,
                _ => return Err(self.syntax_at(self.current_pos())),
            };
        }
    }

    fn logical(
        &self,
        op: BinaryOp,
        left: Expr,
        right: Expr,
        pos: usize,
    ) -> ODataResult<Expr> {
        if left.ty.is_boolean() && right.ty.is_boolean() {
            Ok(Expr {
                ty: ExprType::Primitive(PrimitiveKind::Boolean),
                node: ExprNode::Binary(op, Box::new(left), Box::new(right)),
            })
        } else {
            Err(self.operand_mismatch(op, &left, &right, pos))
        }
    }

    fn comparison(
        &self,
        op: BinaryOp,
        left: Expr,
        right: Expr,
        pos: usize,
    ) -> ODataResult<Expr> {
        let ok = match (&left.ty, &right.ty) {
            (ExprType::Null, _) | (_, ExprType::Null) => true,
            (ExprType::Primitive(l), ExprType::Primitive(r)) => {
                if matches!(op, BinaryOp::Eq | BinaryOp::Ne) {
                    l.comparable_with(*r)
                } else {
                    l.comparable_with(*r) && is_ordered(*l) && is_ordered(*r)
                }
            }
            _ => false,
        };
        if ok {
            Ok(Expr {
                ty: ExprType::Primitive(PrimitiveKind::Boolean),
                node: ExprNode::Binary(op, Box::new(left), Box::new(right)),
            })
        } else {
            Err(self.operand_mismatch(op, &left, &right, pos))
        }
    }

    fn arithmetic(
        &self,
        op: BinaryOp,
        left: Expr,
        right: Expr,
        pos: usize,
    ) -> ODataResult<Expr> {
        let kind = match (&left.ty, &right.ty) {
            (ExprType::Primitive(l), ExprType::Primitive(r))
                if l.is_numeric() && r.is_numeric() =>
            {
                Some(promote(*l, *r))
            }
            (ExprType::Null, ExprType::Primitive(k)) | (ExprType::Primitive(k), ExprType::Null)
                if k.is_numeric() =>
            {
                Some(*k)
            }
            _ => None,
        };
        match kind {
            Some(k) => Ok(Expr {
                ty: ExprType::Primitive(k),
                node: ExprNode::Binary(op, Box::new(left), Box::new(right)),
            }),
            None => Err(self.operand_mismatch(op, &left, &right, pos)),
        }
    }

    fn operand_mismatch(&self, op: BinaryOp, left: &Expr, right: &Expr, pos: usize) -> ODataError {
        ODataError::syntax(format!(
            "Operator '{}' incompatible with operand types '{}' and '{}' at position {pos}",
            op.keyword(),
            left.ty.name(),
            right.ty.name()
        ))
    }

    fn operand_mismatch_unary(&self, op: UnaryOp, operand: &Expr, pos: usize) -> ODataError {
        ODataError::syntax(format!(
            "Operator '{}' incompatible with operand type '{}' at position {pos}",
            op.keyword(),
            operand.ty.name()
        ))
    }
}

fn arg_matches(class: ArgClass, arg: &Expr) -> bool {
    match (class, arg.ty.primitive_kind()) {
        (ArgClass::Text, Some(PrimitiveKind::String)) => true,
        (ArgClass::Integer, Some(k)) => k.is_integral(),
        (ArgClass::Numeric, Some(k)) => k.is_numeric(),
        (ArgClass::Timestamp, Some(PrimitiveKind::DateTime)) => true,
        _ => false,
    }
}

/// Kinds with a total order usable by the relational operators.
fn is_ordered(kind: PrimitiveKind) -> bool {
    kind.is_numeric() || matches!(kind, PrimitiveKind::String | PrimitiveKind::DateTime)
}

/// Arithmetic result kind for a pair of numeric operands.
fn promote(left: PrimitiveKind, right: PrimitiveKind) -> PrimitiveKind {
    use PrimitiveKind::{Decimal, Double, Int64, Single};
    for kind in [Decimal, Double, Single, Int64] {
        if left == kind || right == kind {
            return kind;
        }
    }
    PrimitiveKind::Int32
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;
