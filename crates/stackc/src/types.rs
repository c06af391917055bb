//! The closed base-type set, the `TypeDesc` value type, and the directed
//! conversion / binary-operator compatibility tables that drive the checker.

use std::fmt;

use crate::ast::BinOp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseType {
    Void,
    Int,
    Float,
    Bool,
    Str,
}

impl BaseType {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Str => "string",
        }
    }

    /// `"int"`, `"float"`, `"bool"`, `"string"`, `"void"` -> base type; anything
    /// else is an unknown-type name.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "void" => Some(Self::Void),
            "int" => Some(Self::Int),
            "float" => Some(Self::Float),
            "bool" => Some(Self::Bool),
            "string" => Some(Self::Str),
            _ => None,
        }
    }
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A simple base type, or a function signature (`return_type` + `params`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDesc {
    base_type: Option<BaseType>,
    return_type: Option<Box<TypeDesc>>,
    params: Vec<TypeDesc>,
}

impl TypeDesc {
    pub const fn simple(base_type: BaseType) -> Self {
        Self { base_type: Some(base_type), return_type: None, params: Vec::new() }
    }

    pub fn func(return_type: TypeDesc, params: Vec<TypeDesc>) -> Self {
        Self { base_type: None, return_type: Some(Box::new(return_type)), params }
    }

    pub const VOID: Self = Self::simple(BaseType::Void);
    pub const INT: Self = Self::simple(BaseType::Int);
    pub const FLOAT: Self = Self::simple(BaseType::Float);
    pub const BOOL: Self = Self::simple(BaseType::Bool);
    pub const STR: Self = Self::simple(BaseType::Str);

    pub fn from_name(name: &str) -> Option<Self> {
        BaseType::parse(name).map(Self::simple)
    }

    pub const fn base_type(&self) -> Option<BaseType> {
        self.base_type
    }

    pub fn return_type(&self) -> Option<&TypeDesc> {
        self.return_type.as_deref()
    }

    pub fn params(&self) -> &[TypeDesc] {
        &self.params
    }

    pub const fn is_func(&self) -> bool {
        self.return_type.is_some()
    }

    /// A plain, non-function, non-void base type — the only kind of type the
    /// conversion table and binary-operator table operate over.
    pub fn is_simple(&self) -> bool {
        !self.is_func() && !matches!(self.base_type, Some(BaseType::Void) | None)
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ret) = &self.return_type {
            write!(f, "{ret}(")?;
            for (i, p) in self.params.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{p}")?;
            }
            write!(f, ")")
        } else {
            match self.base_type {
                Some(b) => write!(f, "{b}"),
                None => write!(f, "?"),
            }
        }
    }
}

/// Directed implicit-conversion edges between simple types: `from -> to`.
const TYPE_CONVERTIBILITY: &[(BaseType, BaseType)] = &[
    (BaseType::Int, BaseType::Float),
    (BaseType::Int, BaseType::Bool),
    (BaseType::Bool, BaseType::Int),
];

/// Whether an implicit conversion `from -> to` exists in the table.
pub fn is_convertible(from: BaseType, to: BaseType) -> bool {
    TYPE_CONVERTIBILITY.contains(&(from, to))
}

/// Every type `from` can be implicitly widened to, in table order.
pub fn outgoing_conversions(from: BaseType) -> impl Iterator<Item = BaseType> + '_ {
    TYPE_CONVERTIBILITY.iter().filter(move |(f, _)| *f == from).map(|(_, t)| *t)
}

/// `(lhs, rhs) -> result` for the literal (no widening) case of a binary
/// operator; `None` means the checker must attempt widening.
pub fn binop_result(op: BinOp, lhs: BaseType, rhs: BaseType) -> Option<BaseType> {
    use BaseType::{Bool, Float, Int, Str};
    use BinOp::{Add, And, BitAnd, BitOr, Div, Eq, Ge, Gt, Le, Lt, Mod, Mul, Ne, Or, Sub};

    match op {
        Add => match (lhs, rhs) {
            (Int, Int) => Some(Int),
            (Float, Float) => Some(Float),
            (Str, Str) => Some(Str),
            _ => None,
        },
        Sub | Mul | Div | Mod => match (lhs, rhs) {
            (Int, Int) => Some(Int),
            (Float, Float) => Some(Float),
            _ => None,
        },
        Eq | Ne | Lt | Gt | Le | Ge => match (lhs, rhs) {
            (Int, Int) | (Float, Float) | (Str, Str) => Some(Bool),
            _ => None,
        },
        And | Or | BitAnd | BitOr => match (lhs, rhs) {
            (Bool, Bool) => Some(Bool),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_type_names() {
        assert_eq!(TypeDesc::from_name("int"), Some(TypeDesc::INT));
        assert_eq!(TypeDesc::from_name("string"), Some(TypeDesc::STR));
        assert_eq!(TypeDesc::from_name("nope"), None);
    }

    #[test]
    fn simple_excludes_void_and_functions() {
        assert!(TypeDesc::INT.is_simple());
        assert!(!TypeDesc::VOID.is_simple());
        let f = TypeDesc::func(TypeDesc::INT, vec![TypeDesc::INT]);
        assert!(!f.is_simple());
        assert!(f.is_func());
    }

    #[test]
    fn conversion_table_matches_spec() {
        assert!(is_convertible(BaseType::Int, BaseType::Float));
        assert!(is_convertible(BaseType::Int, BaseType::Bool));
        assert!(!is_convertible(BaseType::Float, BaseType::Int));
        assert!(!is_convertible(BaseType::Str, BaseType::Int));
    }

    #[test]
    fn binop_widens_via_outgoing_edges() {
        assert_eq!(binop_result(BinOp::Add, BaseType::Int, BaseType::Int), Some(BaseType::Int));
        assert_eq!(binop_result(BinOp::Add, BaseType::Bool, BaseType::Int), None);
        assert!(outgoing_conversions(BaseType::Bool).any(|t| t == BaseType::Int));
    }
}
