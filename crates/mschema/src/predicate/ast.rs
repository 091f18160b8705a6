//! Abstract syntax tree for assertion expressions.
//!
//! Names are resolved while parsing: the tree only ever refers to the
//! bound parameter, builtins, or registered predicates.

use std::fmt;

use regex::Regex;
use serde_json::Value;

use super::PredicateFn;

/// An expression node.
#[derive(Debug, Clone)]
pub enum Expr {
    /// Literal value.
    Literal(Value),
    /// The candidate value the assertion is applied to.
    Param,
    /// List literal (`[a, b]`).
    List(Vec<Expr>),
    /// Unary negation (`-e`).
    Negate(Box<Expr>),
    /// Logical not (`not e`, `!e`).
    Not(Box<Expr>),
    /// Short-circuit `and` / `or`, yielding the deciding operand.
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Arithmetic.
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Comparison chain: `a < b <= c` holds when every adjacent pair holds.
    Compare {
        first: Box<Expr>,
        rest: Vec<(CompareOp, Expr)>,
    },
    /// Index access (`e[0]`, `e["key"]`).
    Index { object: Box<Expr>, index: Box<Expr> },
    /// Function call.
    Call { function: Function, args: Vec<Expr> },
    /// `matches(e, "pattern")` with the pattern compiled up front.
    Matches { subject: Box<Expr>, pattern: Regex },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    FloorDivide,
    Modulo,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::FloorDivide => "//",
            BinaryOp::Modulo => "%",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
    In,
    NotIn,
}

impl CompareOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Less => "<",
            CompareOp::LessEqual => "<=",
            CompareOp::Greater => ">",
            CompareOp::GreaterEqual => ">=",
            CompareOp::Equal => "==",
            CompareOp::NotEqual => "!=",
            CompareOp::In => "in",
            CompareOp::NotIn => "not in",
        }
    }
}

/// Built-in functions available to every assertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Len,
    Abs,
    Min,
    Max,
    Lower,
    Upper,
    StartsWith,
    EndsWith,
    Contains,
}

/// Name of the regex builtin, which is lowered to [`Expr::Matches`].
pub const MATCHES: &str = "matches";

impl Builtin {
    pub fn lookup(name: &str) -> Option<Self> {
        let builtin = match name {
            "len" => Builtin::Len,
            "abs" => Builtin::Abs,
            "min" => Builtin::Min,
            "max" => Builtin::Max,
            "lower" => Builtin::Lower,
            "upper" => Builtin::Upper,
            "startswith" => Builtin::StartsWith,
            "endswith" => Builtin::EndsWith,
            "contains" => Builtin::Contains,
            _ => return None,
        };
        Some(builtin)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Len => "len",
            Builtin::Abs => "abs",
            Builtin::Min => "min",
            Builtin::Max => "max",
            Builtin::Lower => "lower",
            Builtin::Upper => "upper",
            Builtin::StartsWith => "startswith",
            Builtin::EndsWith => "endswith",
            Builtin::Contains => "contains",
        }
    }

    /// Human-readable arity, or `None` when `count` arguments are accepted.
    pub fn arity_mismatch(&self, count: usize) -> Option<&'static str> {
        match self {
            Builtin::Len | Builtin::Abs | Builtin::Lower | Builtin::Upper => {
                (count != 1).then_some("1")
            }
            Builtin::StartsWith | Builtin::EndsWith | Builtin::Contains => {
                (count != 2).then_some("2")
            }
            Builtin::Min | Builtin::Max => (count == 0).then_some("at least 1"),
        }
    }

    /// Whether a bare reference to this builtin can stand for the whole
    /// assertion (`assertion: len`).
    pub fn is_unary(&self) -> bool {
        self.arity_mismatch(1).is_none()
    }
}

/// Call target resolved at parse time.
#[derive(Clone)]
pub enum Function {
    Builtin(Builtin),
    Registered { name: String, predicate: PredicateFn },
}

impl Function {
    pub fn name(&self) -> &str {
        match self {
            Function::Builtin(builtin) => builtin.name(),
            Function::Registered { name, .. } => name,
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::Builtin(builtin) => f.debug_tuple("Builtin").field(builtin).finish(),
            Function::Registered { .. } => f.debug_tuple("Registered").field(&self.name()).finish(),
        }
    }
}
