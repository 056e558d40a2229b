use txseed_core::DataType;

use super::ast::{BinaryOp, Expr, Literal, UnaryOp};
use super::lexer::{Token, TokenKind, tokenize};
use super::{ExprError, Function};

const KEYWORDS: [&str; 14] = [
    "and", "or", "not", "case", "when", "then", "else", "end", "is", "null", "true", "false",
    "cast", "as",
];

/// Default precision and scale for a bare `DECIMAL` cast.
const DEFAULT_DECIMAL: (u32, u32) = (10, 0);

/// Nesting limit for parentheses, calls, prefix operators and operator
/// chains. Parsing and evaluation both recurse on the tree.
pub const MAX_DEPTH: usize = 256;

/// Parse an expression string into an [`Expr`] tree.
///
/// Function names are resolved and argument counts checked here, so a
/// successfully parsed expression only needs column names bound.
pub fn parse_expr(source: &str) -> Result<Expr, ExprError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        cursor: 0,
        depth: 0,
    };
    let expr = parser.parse_or()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(unexpected(token, "end of expression")),
    }
}

struct Parser {
    tokens: Vec<Token>,
    cursor: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|token| &token.kind)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.cursor).cloned();
        if token.is_some() {
            self.cursor += 1;
        }
        token
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek_kind(), Some(TokenKind::Ident(name)) if name.eq_ignore_ascii_case(keyword))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.at_keyword(keyword) {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), ExprError> {
        if self.eat_keyword(keyword) {
            return Ok(());
        }
        Err(self.error_here(&keyword.to_ascii_uppercase()))
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek_kind() == Some(kind) {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), ExprError> {
        if self.eat(&kind) {
            return Ok(());
        }
        Err(self.error_here(&format!("'{}'", kind.describe())))
    }

    /// Count one more level of nesting. Callers reset `depth` to the value
    /// they started with once their subtree is complete.
    fn descend(&mut self) -> Result<(), ExprError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExprError::TooDeep { limit: MAX_DEPTH });
        }
        Ok(())
    }

    fn error_here(&self, expected: &str) -> ExprError {
        match self.peek() {
            Some(token) => unexpected(token, expected),
            None => ExprError::UnexpectedEnd {
                expected: expected.to_string(),
            },
        }
    }

    fn parse_or(&mut self) -> Result<Expr, ExprError> {
        let start = self.depth;
        self.descend()?;
        let mut left = self.parse_and()?;
        while self.eat_keyword("or") {
            self.descend()?;
            let right = self.parse_and()?;
            left = binary(BinaryOp::Or, left, right);
        }
        self.depth = start;
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ExprError> {
        let start = self.depth;
        let mut left = self.parse_not()?;
        while self.eat_keyword("and") {
            self.descend()?;
            let right = self.parse_not()?;
            left = binary(BinaryOp::And, left, right);
        }
        self.depth = start;
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, ExprError> {
        if self.eat_keyword("not") {
            let start = self.depth;
            self.descend()?;
            let expr = self.parse_not()?;
            self.depth = start;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                expr: Box::new(expr),
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ExprError> {
        let start = self.depth;
        let mut left = self.parse_additive()?;
        loop {
            if self.eat_keyword("is") {
                let negated = self.eat_keyword("not");
                self.expect_keyword("null")?;
                self.descend()?;
                left = Expr::IsNull {
                    expr: Box::new(left),
                    negated,
                };
                continue;
            }
            let op = match self.peek_kind() {
                Some(TokenKind::Eq) => BinaryOp::Eq,
                Some(TokenKind::NotEq) => BinaryOp::NotEq,
                Some(TokenKind::Lt) => BinaryOp::Lt,
                Some(TokenKind::LtEq) => BinaryOp::LtEq,
                Some(TokenKind::Gt) => BinaryOp::Gt,
                Some(TokenKind::GtEq) => BinaryOp::GtEq,
                _ => {
                    self.depth = start;
                    return Ok(left);
                }
            };
            self.cursor += 1;
            self.descend()?;
            let right = self.parse_additive()?;
            left = binary(op, left, right);
        }
    }

    fn parse_additive(&mut self) -> Result<Expr, ExprError> {
        let start = self.depth;
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => BinaryOp::Add,
                Some(TokenKind::Minus) => BinaryOp::Sub,
                _ => {
                    self.depth = start;
                    return Ok(left);
                }
            };
            self.cursor += 1;
            self.descend()?;
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ExprError> {
        let start = self.depth;
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Star) => BinaryOp::Mul,
                Some(TokenKind::Slash) => BinaryOp::Div,
                Some(TokenKind::Percent) => BinaryOp::Mod,
                _ => {
                    self.depth = start;
                    return Ok(left);
                }
            };
            self.cursor += 1;
            self.descend()?;
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, ExprError> {
        if self.eat(&TokenKind::Minus) {
            let start = self.depth;
            self.descend()?;
            let expr = self.parse_unary()?;
            self.depth = start;
            return Ok(match expr {
                Expr::Literal(Literal::Long(value)) => Expr::Literal(Literal::Long(-value)),
                Expr::Literal(Literal::Double(value)) => Expr::Literal(Literal::Double(-value)),
                other => Expr::Unary {
                    op: UnaryOp::Neg,
                    expr: Box::new(other),
                },
            });
        }
        if self.eat(&TokenKind::Plus) {
            let start = self.depth;
            self.descend()?;
            let expr = self.parse_unary()?;
            self.depth = start;
            return Ok(expr);
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ExprError> {
        let Some(token) = self.advance() else {
            return Err(ExprError::UnexpectedEnd {
                expected: "an expression".to_string(),
            });
        };

        match token.kind {
            TokenKind::Int(value) => Ok(Expr::Literal(Literal::Long(value))),
            TokenKind::Float(value) => Ok(Expr::Literal(Literal::Double(value))),
            TokenKind::Str(value) => Ok(Expr::Literal(Literal::String(value))),
            TokenKind::QuotedIdent(name) => Ok(Expr::Column(name)),
            TokenKind::LParen => {
                let expr = self.parse_or()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::Ident(name) => self.parse_identifier(name, token.pos),
            _ => Err(unexpected(&token, "an expression")),
        }
    }

    fn parse_identifier(&mut self, name: String, pos: usize) -> Result<Expr, ExprError> {
        let lowered = name.to_ascii_lowercase();
        match lowered.as_str() {
            "null" => return Ok(Expr::Literal(Literal::Null)),
            "true" => return Ok(Expr::Literal(Literal::Bool(true))),
            "false" => return Ok(Expr::Literal(Literal::Bool(false))),
            "case" => return self.parse_case(),
            "cast" => return self.parse_cast(),
            _ => {}
        }

        if self.peek_kind() == Some(&TokenKind::LParen) {
            self.cursor += 1;
            return self.parse_call(&name);
        }

        if KEYWORDS.contains(&lowered.as_str()) {
            return Err(ExprError::UnexpectedToken {
                found: name,
                expected: "an expression".to_string(),
                pos,
            });
        }
        Ok(Expr::Column(name))
    }

    fn parse_case(&mut self) -> Result<Expr, ExprError> {
        let operand = if self.at_keyword("when") {
            None
        } else {
            Some(Box::new(self.parse_or()?))
        };

        let mut branches = Vec::new();
        while self.eat_keyword("when") {
            let when = self.parse_or()?;
            self.expect_keyword("then")?;
            let then = self.parse_or()?;
            branches.push((when, then));
        }
        if branches.is_empty() {
            return Err(self.error_here("WHEN"));
        }

        let otherwise = if self.eat_keyword("else") {
            Some(Box::new(self.parse_or()?))
        } else {
            None
        };
        self.expect_keyword("end")?;

        Ok(Expr::Case {
            operand,
            branches,
            otherwise,
        })
    }

    fn parse_cast(&mut self) -> Result<Expr, ExprError> {
        self.expect(TokenKind::LParen)?;
        let expr = self.parse_or()?;
        self.expect_keyword("as")?;
        let to = self.parse_type()?;
        self.expect(TokenKind::RParen)?;
        Ok(Expr::Cast {
            expr: Box::new(expr),
            to,
        })
    }

    fn parse_type(&mut self) -> Result<DataType, ExprError> {
        let name = match self.advance() {
            Some(Token {
                kind: TokenKind::Ident(name),
                ..
            }) => name,
            Some(token) => return Err(unexpected(&token, "a type name")),
            None => {
                return Err(ExprError::UnexpectedEnd {
                    expected: "a type name".to_string(),
                });
            }
        };

        let lowered = name.to_ascii_lowercase();
        let data_type = match lowered.as_str() {
            "int" | "integer" | "bigint" | "long" | "smallint" | "tinyint" => DataType::Long,
            "double" | "float" | "real" => DataType::Double,
            "string" | "text" => DataType::String,
            "varchar" | "char" => {
                // length is accepted and ignored
                if self.eat(&TokenKind::LParen) {
                    self.parse_type_param()?;
                    self.expect(TokenKind::RParen)?;
                }
                DataType::String
            }
            "boolean" | "bool" => DataType::Boolean,
            "timestamp" => DataType::Timestamp,
            "date" => DataType::Date,
            "decimal" | "numeric" | "dec" => {
                let (mut precision, mut scale) = DEFAULT_DECIMAL;
                if self.eat(&TokenKind::LParen) {
                    precision = self.parse_type_param()?;
                    scale = if self.eat(&TokenKind::Comma) {
                        self.parse_type_param()?
                    } else {
                        0
                    };
                    self.expect(TokenKind::RParen)?;
                }
                DataType::Decimal { precision, scale }
            }
            _ => return Err(ExprError::UnsupportedType(name)),
        };
        Ok(data_type)
    }

    fn parse_type_param(&mut self) -> Result<u32, ExprError> {
        match self.advance() {
            Some(Token {
                kind: TokenKind::Int(value),
                pos,
            }) => u32::try_from(value).map_err(|_| ExprError::InvalidNumber {
                text: value.to_string(),
                pos,
            }),
            Some(token) => Err(unexpected(&token, "an integer type parameter")),
            None => Err(ExprError::UnexpectedEnd {
                expected: "an integer type parameter".to_string(),
            }),
        }
    }

    fn parse_call(&mut self, name: &str) -> Result<Expr, ExprError> {
        let function =
            Function::lookup(name).ok_or_else(|| ExprError::UnknownFunction(name.to_string()))?;

        let mut args = Vec::new();
        if !self.eat(&TokenKind::RParen) {
            loop {
                args.push(self.parse_or()?);
                if self.eat(&TokenKind::Comma) {
                    continue;
                }
                self.expect(TokenKind::RParen)?;
                break;
            }
        }

        if !function.accepts(args.len()) {
            return Err(ExprError::Arity {
                function: function.name().to_string(),
                expected: function.arity_label(),
                found: args.len(),
            });
        }

        if function == Function::NamedStruct {
            check_named_struct(&args)?;
        }

        Ok(Expr::Call { function, args })
    }
}

fn check_named_struct(args: &[Expr]) -> Result<(), ExprError> {
    if args.len() % 2 != 0 {
        return Err(ExprError::Arity {
            function: Function::NamedStruct.name().to_string(),
            expected: "an even number of".to_string(),
            found: args.len(),
        });
    }
    for pair in args.chunks(2) {
        if !matches!(pair[0], Expr::Literal(Literal::String(_))) {
            return Err(ExprError::InvalidArgument {
                function: Function::NamedStruct.name().to_string(),
                message: format!("field names must be string literals, found {}", pair[0]),
            });
        }
    }
    Ok(())
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn unexpected(token: &Token, expected: &str) -> ExprError {
    ExprError::UnexpectedToken {
        found: token.kind.describe(),
        expected: expected.to_string(),
        pos: token.pos,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str) -> Expr {
        Expr::Column(name.to_string())
    }

    #[test]
    fn respects_operator_precedence() {
        let expr = parse_expr("rand() * 5 + 1").expect("parse");
        assert_eq!(expr.to_string(), "((rand() * 5) + 1)");

        let expr = parse_expr("a = 1 OR b = 2 AND NOT c").expect("parse");
        assert_eq!(expr.to_string(), "((a = 1) OR ((b = 2) AND (NOT c)))");
    }

    #[test]
    fn folds_negative_literals() {
        let expr = parse_expr("rand() * 180 - 90").expect("parse");
        assert_eq!(expr.to_string(), "((rand() * 180) - 90)");
        assert_eq!(
            parse_expr("-90").expect("parse"),
            Expr::Literal(Literal::Long(-90))
        );
    }

    #[test]
    fn parses_searched_case() {
        let expr = parse_expr(
            "CASE WHEN rand() < 0.2 THEN concat('SAVE', cast(rand() * 100 as INT)) ELSE NULL END",
        )
        .expect("parse");
        let Expr::Case {
            operand,
            branches,
            otherwise,
        } = expr
        else {
            panic!("expected CASE");
        };
        assert!(operand.is_none());
        assert_eq!(branches.len(), 1);
        assert_eq!(otherwise.as_deref(), Some(&Expr::Literal(Literal::Null)));
    }

    #[test]
    fn parses_simple_case_and_is_null() {
        let expr = parse_expr("case status when 'a' then 1 else 0 end").expect("parse");
        assert!(matches!(expr, Expr::Case { operand: Some(_), .. }));

        let expr = parse_expr("coupon IS NOT NULL").expect("parse");
        assert_eq!(
            expr,
            Expr::IsNull {
                expr: Box::new(column("coupon")),
                negated: true
            }
        );
    }

    #[test]
    fn parses_cast_types() {
        let expr = parse_expr("CAST(amount * 0.08 AS DECIMAL(5, 2))").expect("parse");
        assert!(matches!(
            expr,
            Expr::Cast {
                to: DataType::Decimal {
                    precision: 5,
                    scale: 2
                },
                ..
            }
        ));
        assert!(matches!(
            parse_expr("cast(x as varchar(10))"),
            Ok(Expr::Cast {
                to: DataType::String,
                ..
            })
        ));
        assert_eq!(
            parse_expr("cast(x as geometry)"),
            Err(ExprError::UnsupportedType("geometry".to_string()))
        );
    }

    #[test]
    fn collects_referenced_columns() {
        let expr = parse_expr(
            "CASE WHEN user_id % 2 = 0 THEN cast(transaction_amount / 10 as INT) ELSE 0 END",
        )
        .expect("parse");
        let columns: Vec<String> = expr.columns().into_iter().collect();
        assert_eq!(columns, vec!["transaction_amount", "user_id"]);
    }

    #[test]
    fn rejects_unknown_functions_and_bad_arity() {
        assert_eq!(
            parse_expr("explode(tags)"),
            Err(ExprError::UnknownFunction("explode".to_string()))
        );
        assert!(matches!(
            parse_expr("rand(1)"),
            Err(ExprError::Arity { found: 1, .. })
        ));
        assert!(matches!(
            parse_expr("named_struct('a', 1, 'b')"),
            Err(ExprError::Arity { .. })
        ));
        assert!(matches!(
            parse_expr("named_struct(a, 1)"),
            Err(ExprError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn reports_trailing_and_missing_tokens() {
        assert!(matches!(
            parse_expr("a b"),
            Err(ExprError::UnexpectedToken { pos: 2, .. })
        ));
        assert!(matches!(
            parse_expr("concat(a,"),
            Err(ExprError::UnexpectedEnd { .. })
        ));
        assert!(matches!(
            parse_expr("CASE WHEN a THEN 1"),
            Err(ExprError::UnexpectedEnd { .. })
        ));
    }

    #[test]
    fn deep_nesting_is_an_error_not_a_crash() {
        let deep = format!("{}1{}", "(".repeat(20_000), ")".repeat(20_000));
        assert!(matches!(
            parse_expr(&deep),
            Err(ExprError::TooDeep { limit: MAX_DEPTH })
        ));

        let negations = format!("{}1", "- ".repeat(20_000));
        assert!(matches!(parse_expr(&negations), Err(ExprError::TooDeep { .. })));

        let nots = format!("{}true", "NOT ".repeat(20_000));
        assert!(matches!(parse_expr(&nots), Err(ExprError::TooDeep { .. })));

        let calls = format!("{}1{}", "abs(".repeat(20_000), ")".repeat(20_000));
        assert!(matches!(parse_expr(&calls), Err(ExprError::TooDeep { .. })));

        let chain = vec!["1"; 20_000].join(" + ");
        assert!(matches!(parse_expr(&chain), Err(ExprError::TooDeep { .. })));
    }

    #[test]
    fn moderate_nesting_still_parses() {
        let nested = format!("{}a{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(parse_expr(&nested).expect("parse"), column("a"));

        let chain = vec!["a"; 100].join(" + ");
        assert!(parse_expr(&chain).is_ok());

        // Depth is released after each sibling subtree.
        let siblings = vec!["((a))"; 100].join(" * ");
        assert!(parse_expr(&siblings).is_ok());
    }

    #[test]
    fn random_detection() {
        assert!(parse_expr("cast(rand() * 7 as INT)").expect("parse").is_random());
        assert!(!parse_expr("amount * 0.08").expect("parse").is_random());
    }
}
