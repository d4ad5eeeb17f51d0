//! Marker expression parsing.
//!
//! Grammar (PEP 508):
//!   marker      = and_expr ('or' and_expr)*
//!   and_expr    = atom ('and' atom)*
//!   atom        = '(' marker ')' | operand op operand
//!   operand     = variable | quoted string
//!   op          = '==' | '!=' | '<' | '<=' | '>' | '>=' | '~=' | '==='
//!               | 'in' | 'not' 'in'

use super::{MarkerExpr, MarkerOp, MarkerOperand, MarkerVariable};

/// Parse a marker expression, e.g. `platform_machine != "aarch64"`.
pub fn parse_marker(input: &str) -> Result<MarkerExpr, String> {
    let tokens = tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.marker()?;
    if let Some(token) = parser.peek() {
        return Err(format!("unexpected '{}' after marker expression", token));
    }
    Ok(expr)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Op(MarkerOp),
    LParen,
    RParen,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Ident(name) => f.write_str(name),
            Token::Str(text) => write!(f, "\"{}\"", text),
            Token::Op(op) => f.write_str(op.symbol()),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '\'' | '"' => {
                chars.next();
                let mut text = String::new();
                let mut closed = false;
                for (_, inner) in chars.by_ref() {
                    if inner == c {
                        closed = true;
                        break;
                    }
                    text.push(inner);
                }
                if !closed {
                    return Err(format!("unterminated string starting at column {}", pos + 1));
                }
                tokens.push(Token::Str(text));
            }
            '=' | '!' | '<' | '>' | '~' => {
                let op_text: String = input[pos..]
                    .chars()
                    .take_while(|&ch| matches!(ch, '=' | '!' | '<' | '>' | '~'))
                    .collect();
                for _ in 0..op_text.len() {
                    chars.next();
                }
                let op = match op_text.as_str() {
                    "==" => MarkerOp::Equal,
                    "!=" => MarkerOp::NotEqual,
                    "<" => MarkerOp::Less,
                    "<=" => MarkerOp::LessEqual,
                    ">" => MarkerOp::Greater,
                    ">=" => MarkerOp::GreaterEqual,
                    "~=" => MarkerOp::Compatible,
                    "===" => MarkerOp::ArbitraryEqual,
                    other => return Err(format!("invalid operator '{}'", other)),
                };
                tokens.push(Token::Op(op));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let ident: String = input[pos..]
                    .chars()
                    .take_while(|&ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '.')
                    .collect();
                for _ in 0..ident.len() {
                    chars.next();
                }
                tokens.push(Token::Ident(ident));
            }
            other => return Err(format!("unexpected character '{}' in marker", other)),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Some(Token::Ident(name)) if name == keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn marker(&mut self) -> Result<MarkerExpr, String> {
        let first = self.and_expr()?;
        if !self.eat_keyword("or") {
            return Ok(first);
        }
        let mut terms = vec![first, self.and_expr()?];
        while self.eat_keyword("or") {
            terms.push(self.and_expr()?);
        }
        Ok(MarkerExpr::Or(terms))
    }

    fn and_expr(&mut self) -> Result<MarkerExpr, String> {
        let first = self.atom()?;
        if !self.eat_keyword("and") {
            return Ok(first);
        }
        let mut terms = vec![first, self.atom()?];
        while self.eat_keyword("and") {
            terms.push(self.atom()?);
        }
        Ok(MarkerExpr::And(terms))
    }

    fn atom(&mut self) -> Result<MarkerExpr, String> {
        if matches!(self.peek(), Some(Token::LParen)) {
            self.pos += 1;
            let expr = self.marker()?;
            match self.next() {
                Some(Token::RParen) => return Ok(expr),
                _ => return Err("missing closing parenthesis".to_string()),
            }
        }

        let lhs = self.operand()?;
        let op = self.comparison_op()?;
        let rhs = self.operand()?;
        Ok(MarkerExpr::Comparison { lhs, op, rhs })
    }

    fn operand(&mut self) -> Result<MarkerOperand, String> {
        match self.next() {
            Some(Token::Str(text)) => Ok(MarkerOperand::Literal(text)),
            Some(Token::Ident(name)) => MarkerVariable::from_name(&name)
                .map(MarkerOperand::Variable)
                .ok_or_else(|| format!("unknown marker variable '{}'", name)),
            Some(token) => Err(format!("expected a marker variable or string, got '{}'", token)),
            None => Err("marker expression ended unexpectedly".to_string()),
        }
    }

    fn comparison_op(&mut self) -> Result<MarkerOp, String> {
        if self.eat_keyword("in") {
            return Ok(MarkerOp::In);
        }
        if self.eat_keyword("not") {
            if self.eat_keyword("in") {
                return Ok(MarkerOp::NotIn);
            }
            return Err("expected 'in' after 'not'".to_string());
        }
        match self.next() {
            Some(Token::Op(op)) => Ok(op),
            Some(token) => Err(format!("expected a comparison operator, got '{}'", token)),
            None => Err("marker expression ended unexpectedly".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_comparison() {
        let expr = parse_marker("platform_machine != \"aarch64\"").unwrap();
        assert_eq!(
            expr,
            MarkerExpr::Comparison {
                lhs: MarkerOperand::Variable(MarkerVariable::PlatformMachine),
                op: MarkerOp::NotEqual,
                rhs: MarkerOperand::Literal("aarch64".to_string()),
            }
        );
    }

    #[test]
    fn test_parse_single_quotes() {
        let expr = parse_marker("sys_platform == 'win32'").unwrap();
        assert!(matches!(expr, MarkerExpr::Comparison { .. }));
    }

    #[test]
    fn test_parse_literal_on_left() {
        let expr = parse_marker("'arm' in platform_machine").unwrap();
        assert_eq!(
            expr,
            MarkerExpr::Comparison {
                lhs: MarkerOperand::Literal("arm".to_string()),
                op: MarkerOp::In,
                rhs: MarkerOperand::Variable(MarkerVariable::PlatformMachine),
            }
        );
    }

    #[test]
    fn test_parse_not_in() {
        let expr = parse_marker("platform_machine not in 'aarch64 arm64'").unwrap();
        match expr {
            MarkerExpr::Comparison { op, .. } => assert_eq!(op, MarkerOp::NotIn),
            other => panic!("expected comparison, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_and_or_tree() {
        let expr = parse_marker(
            "python_version >= '3.8' and sys_platform == 'linux' or sys_platform == 'darwin'",
        )
        .unwrap();
        match expr {
            MarkerExpr::Or(terms) => {
                assert_eq!(terms.len(), 2);
                assert!(matches!(terms[0], MarkerExpr::And(_)));
            }
            other => panic!("expected or-expression, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_parentheses() {
        let expr = parse_marker(
            "python_version >= '3.8' and (sys_platform == 'linux' or sys_platform == 'darwin')",
        )
        .unwrap();
        match expr {
            MarkerExpr::And(terms) => {
                assert_eq!(terms.len(), 2);
                assert!(matches!(terms[1], MarkerExpr::Or(_)));
            }
            other => panic!("expected and-expression, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_unknown_variable() {
        let err = parse_marker("machine == 'x86_64'").unwrap_err();
        assert!(err.contains("unknown marker variable"), "{}", err);
    }

    #[test]
    fn test_parse_unterminated_string() {
        assert!(parse_marker("sys_platform == 'linux").is_err());
    }

    #[test]
    fn test_parse_missing_paren() {
        assert!(parse_marker("(sys_platform == 'linux'").is_err());
    }

    #[test]
    fn test_parse_trailing_tokens() {
        assert!(parse_marker("sys_platform == 'linux' banana").is_err());
    }

    #[test]
    fn test_parse_bad_operator() {
        assert!(parse_marker("sys_platform =! 'linux'").is_err());
        assert!(parse_marker("sys_platform not 'linux'").is_err());
    }

    #[test]
    fn test_hash_inside_string_is_not_a_comment() {
        let expr = parse_marker("platform_release != '#buggy'").unwrap();
        match expr {
            MarkerExpr::Comparison { rhs, .. } => {
                assert_eq!(rhs, MarkerOperand::Literal("#buggy".to_string()));
            }
            other => panic!("expected comparison, got {:?}", other),
        }
    }
}
