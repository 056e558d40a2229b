use super::ExprError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Ident(String),
    /// Backtick-quoted identifier; never treated as a keyword.
    QuotedIdent(String),
    Int(i64),
    Float(f64),
    Str(String),
    LParen,
    RParen,
    Comma,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl TokenKind {
    pub(crate) fn describe(&self) -> String {
        match self {
            TokenKind::Ident(name) => name.clone(),
            TokenKind::QuotedIdent(name) => format!("`{name}`"),
            TokenKind::Int(value) => value.to_string(),
            TokenKind::Float(value) => value.to_string(),
            TokenKind::Str(value) => format!("'{value}'"),
            TokenKind::LParen => "(".to_string(),
            TokenKind::RParen => ")".to_string(),
            TokenKind::Comma => ",".to_string(),
            TokenKind::Plus => "+".to_string(),
            TokenKind::Minus => "-".to_string(),
            TokenKind::Star => "*".to_string(),
            TokenKind::Slash => "/".to_string(),
            TokenKind::Percent => "%".to_string(),
            TokenKind::Eq => "=".to_string(),
            TokenKind::NotEq => "!=".to_string(),
            TokenKind::Lt => "<".to_string(),
            TokenKind::LtEq => "<=".to_string(),
            TokenKind::Gt => ">".to_string(),
            TokenKind::GtEq => ">=".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    /// Byte offset of the token in the source text.
    pub pos: usize,
}

pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, ExprError> {
    let chars: Vec<(usize, char)> = source.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (pos, ch) = chars[i];
        if ch.is_whitespace() {
            i += 1;
            continue;
        }

        let next = chars.get(i + 1).map(|(_, c)| *c);
        let (kind, width) = match ch {
            '(' => (TokenKind::LParen, 1),
            ')' => (TokenKind::RParen, 1),
            ',' => (TokenKind::Comma, 1),
            '+' => (TokenKind::Plus, 1),
            '-' => (TokenKind::Minus, 1),
            '*' => (TokenKind::Star, 1),
            '/' => (TokenKind::Slash, 1),
            '%' => (TokenKind::Percent, 1),
            '=' if next == Some('=') => (TokenKind::Eq, 2),
            '=' => (TokenKind::Eq, 1),
            '!' if next == Some('=') => (TokenKind::NotEq, 2),
            '<' if next == Some('=') => (TokenKind::LtEq, 2),
            '<' if next == Some('>') => (TokenKind::NotEq, 2),
            '<' => (TokenKind::Lt, 1),
            '>' if next == Some('=') => (TokenKind::GtEq, 2),
            '>' => (TokenKind::Gt, 1),
            '\'' | '"' => {
                let (text, consumed) = read_string(&chars, i, ch)?;
                (TokenKind::Str(text), consumed)
            }
            '`' => {
                let (text, consumed) = read_quoted_ident(&chars, i)?;
                (TokenKind::QuotedIdent(text), consumed)
            }
            c if c.is_ascii_digit()
                || (c == '.' && next.is_some_and(|n| n.is_ascii_digit())) =>
            {
                read_number(source, &chars, i)?
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut end = i;
                while end < chars.len() && (chars[end].1.is_alphanumeric() || chars[end].1 == '_') {
                    end += 1;
                }
                let text: String = chars[i..end].iter().map(|(_, c)| *c).collect();
                (TokenKind::Ident(text), end - i)
            }
            other => return Err(ExprError::UnexpectedChar { ch: other, pos }),
        };

        tokens.push(Token { kind, pos });
        i += width;
    }

    Ok(tokens)
}

/// Read a quoted string; a doubled quote or a backslash escapes the quote.
fn read_string(
    chars: &[(usize, char)],
    start: usize,
    quote: char,
) -> Result<(String, usize), ExprError> {
    let mut text = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        let ch = chars[i].1;
        if ch == '\\' {
            if let Some((_, escaped)) = chars.get(i + 1) {
                text.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    other => *other,
                });
                i += 2;
                continue;
            }
        } else if ch == quote {
            if chars.get(i + 1).map(|(_, c)| *c) == Some(quote) {
                text.push(quote);
                i += 2;
                continue;
            }
            return Ok((text, i + 1 - start));
        } else {
            text.push(ch);
        }
        i += 1;
    }
    Err(ExprError::UnterminatedString {
        pos: chars[start].0,
    })
}

fn read_quoted_ident(chars: &[(usize, char)], start: usize) -> Result<(String, usize), ExprError> {
    let mut i = start + 1;
    let mut text = String::new();
    while i < chars.len() {
        if chars[i].1 == '`' {
            return Ok((text, i + 1 - start));
        }
        text.push(chars[i].1);
        i += 1;
    }
    Err(ExprError::UnterminatedString {
        pos: chars[start].0,
    })
}

fn read_number(
    source: &str,
    chars: &[(usize, char)],
    start: usize,
) -> Result<(TokenKind, usize), ExprError> {
    let mut end = start;
    let mut is_float = false;
    while end < chars.len() && chars[end].1.is_ascii_digit() {
        end += 1;
    }
    if end < chars.len() && chars[end].1 == '.' {
        is_float = true;
        end += 1;
        while end < chars.len() && chars[end].1.is_ascii_digit() {
            end += 1;
        }
    }
    if end < chars.len() && matches!(chars[end].1, 'e' | 'E') {
        let mut exp_end = end + 1;
        if exp_end < chars.len() && matches!(chars[exp_end].1, '+' | '-') {
            exp_end += 1;
        }
        if exp_end < chars.len() && chars[exp_end].1.is_ascii_digit() {
            is_float = true;
            end = exp_end;
            while end < chars.len() && chars[end].1.is_ascii_digit() {
                end += 1;
            }
        }
    }

    let begin = chars[start].0;
    let finish = chars.get(end).map_or(source.len(), |(pos, _)| *pos);
    let text = &source[begin..finish];
    let invalid = || ExprError::InvalidNumber {
        text: text.to_string(),
        pos: begin,
    };

    let kind = if is_float {
        TokenKind::Float(text.parse::<f64>().map_err(|_| invalid())?)
    } else {
        TokenKind::Int(text.parse::<i64>().map_err(|_| invalid())?)
    };
    Ok((kind, end - start))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .expect("tokenize")
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn tokenizes_operators_and_literals() {
        assert_eq!(
            kinds("rand() * 0.08 <> 'a''b'"),
            vec![
                TokenKind::Ident("rand".to_string()),
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::Star,
                TokenKind::Float(0.08),
                TokenKind::NotEq,
                TokenKind::Str("a'b".to_string()),
            ]
        );
    }

    #[test]
    fn numbers_with_exponents() {
        assert_eq!(kinds("1e3 42"), vec![TokenKind::Float(1000.0), TokenKind::Int(42)]);
    }

    #[test]
    fn reports_positions() {
        let tokens = tokenize("a  +  `b c`").expect("tokenize");
        assert_eq!(tokens[1].pos, 3);
        assert_eq!(tokens[2].kind, TokenKind::QuotedIdent("b c".to_string()));
    }

    #[test]
    fn rejects_unterminated_strings() {
        assert_eq!(
            tokenize("concat('SAVE"),
            Err(ExprError::UnterminatedString { pos: 7 })
        );
        assert!(matches!(
            tokenize("a # b"),
            Err(ExprError::UnexpectedChar { ch: '#', pos: 2 })
        ));
    }

    #[test]
    fn rejects_oversized_integers() {
        assert!(matches!(
            tokenize("99999999999999999999"),
            Err(ExprError::InvalidNumber { .. })
        ));
    }
}
