use std::collections::BTreeSet;
use std::fmt;

use txseed_core::DataType;

use super::Function;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Long(i64),
    Double(f64),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::NotEq
                | BinaryOp::Lt
                | BinaryOp::LtEq
                | BinaryOp::Gt
                | BinaryOp::GtEq
        )
    }
}

/// Parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Column(String),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
    /// `CASE [operand] WHEN .. THEN .. [ELSE ..] END`. With an operand each
    /// `WHEN` value is compared for equality against it.
    Case {
        operand: Option<Box<Expr>>,
        branches: Vec<(Expr, Expr)>,
        otherwise: Option<Box<Expr>>,
    },
    Cast {
        expr: Box<Expr>,
        to: DataType,
    },
    Call {
        function: Function,
        args: Vec<Expr>,
    },
}

impl Expr {
    /// Column names referenced anywhere in the expression, as written.
    pub fn columns(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Column(name) => {
                out.insert(name.clone());
            }
            Expr::Unary { expr, .. } | Expr::IsNull { expr, .. } | Expr::Cast { expr, .. } => {
                expr.collect_columns(out)
            }
            Expr::Binary { left, right, .. } => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
            Expr::Case {
                operand,
                branches,
                otherwise,
            } => {
                if let Some(operand) = operand {
                    operand.collect_columns(out);
                }
                for (when, then) in branches {
                    when.collect_columns(out);
                    then.collect_columns(out);
                }
                if let Some(otherwise) = otherwise {
                    otherwise.collect_columns(out);
                }
            }
            Expr::Call { args, .. } => {
                for arg in args {
                    arg.collect_columns(out);
                }
            }
        }
    }

    /// Conservative check whether evaluation can produce `NULL`.
    ///
    /// `column_nullable` reports whether a referenced column may hold nulls.
    /// Failed casts are not considered.
    pub fn may_yield_null(&self, column_nullable: &dyn Fn(&str) -> bool) -> bool {
        match self {
            Expr::Literal(literal) => matches!(literal, Literal::Null),
            Expr::Column(name) => column_nullable(name),
            Expr::Unary { expr, .. } | Expr::Cast { expr, .. } => {
                expr.may_yield_null(column_nullable)
            }
            Expr::IsNull { .. } => false,
            Expr::Binary { op, left, right } => {
                // division by zero yields null
                let divisor_may_be_zero = matches!(op, BinaryOp::Div | BinaryOp::Mod)
                    && !matches!(
                        right.as_ref(),
                        Expr::Literal(Literal::Long(value)) if *value != 0
                    )
                    && !matches!(
                        right.as_ref(),
                        Expr::Literal(Literal::Double(value)) if *value != 0.0
                    );
                divisor_may_be_zero
                    || left.may_yield_null(column_nullable)
                    || right.may_yield_null(column_nullable)
            }
            Expr::Case {
                branches,
                otherwise,
                ..
            } => {
                branches
                    .iter()
                    .any(|(_, then)| then.may_yield_null(column_nullable))
                    || otherwise
                        .as_ref()
                        .is_none_or(|expr| expr.may_yield_null(column_nullable))
            }
            Expr::Call { function, args } => match function {
                Function::Rand => false,
                Function::ElementAt => true,
                Function::Array | Function::NamedStruct => false,
                Function::Coalesce => args.iter().all(|arg| arg.may_yield_null(column_nullable)),
                _ => args.iter().any(|arg| arg.may_yield_null(column_nullable)),
            },
        }
    }

    /// Whether the expression calls `rand()` anywhere.
    pub fn is_random(&self) -> bool {
        match self {
            Expr::Literal(_) | Expr::Column(_) => false,
            Expr::Unary { expr, .. } | Expr::IsNull { expr, .. } | Expr::Cast { expr, .. } => {
                expr.is_random()
            }
            Expr::Binary { left, right, .. } => left.is_random() || right.is_random(),
            Expr::Case {
                operand,
                branches,
                otherwise,
            } => {
                operand.as_ref().is_some_and(|expr| expr.is_random())
                    || branches
                        .iter()
                        .any(|(when, then)| when.is_random() || then.is_random())
                    || otherwise.as_ref().is_some_and(|expr| expr.is_random())
            }
            Expr::Call { function, args } => {
                *function == Function::Rand || args.iter().any(Expr::is_random)
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(Literal::Null) => f.write_str("NULL"),
            Expr::Literal(Literal::Bool(value)) => write!(f, "{}", value.to_string().to_uppercase()),
            Expr::Literal(Literal::Long(value)) => write!(f, "{value}"),
            Expr::Literal(Literal::Double(value)) => write!(f, "{value:?}"),
            Expr::Literal(Literal::String(value)) => write!(f, "'{}'", value.replace('\'', "''")),
            Expr::Column(name) => f.write_str(name),
            Expr::Unary {
                op: UnaryOp::Neg,
                expr,
            } => write!(f, "(-{expr})"),
            Expr::Unary {
                op: UnaryOp::Not,
                expr,
            } => write!(f, "(NOT {expr})"),
            Expr::Binary { op, left, right } => write!(f, "({left} {} {right})", op.symbol()),
            Expr::IsNull { expr, negated } => {
                let not = if *negated { " NOT" } else { "" };
                write!(f, "({expr} IS{not} NULL)")
            }
            Expr::Case {
                operand,
                branches,
                otherwise,
            } => {
                f.write_str("CASE")?;
                if let Some(operand) = operand {
                    write!(f, " {operand}")?;
                }
                for (when, then) in branches {
                    write!(f, " WHEN {when} THEN {then}")?;
                }
                if let Some(otherwise) = otherwise {
                    write!(f, " ELSE {otherwise}")?;
                }
                f.write_str(" END")
            }
            Expr::Cast { expr, to } => write!(f, "CAST({expr} AS {to})"),
            Expr::Call { function, args } => {
                write!(f, "{function}(")?;
                for (idx, arg) in args.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
        }
    }
}
