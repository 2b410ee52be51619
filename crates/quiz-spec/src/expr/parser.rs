use serde_json::{Number, Value};
use thiserror::Error;

use super::{BinaryOp, Expr};

const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    #[error("expression is empty")]
    Empty,
    #[error("unexpected character '{ch}' at {pos}")]
    UnexpectedChar { ch: char, pos: usize },
    #[error("unterminated string starting at {pos}")]
    UnterminatedString { pos: usize },
    #[error("invalid number '{text}' at {pos}")]
    InvalidNumber { text: String, pos: usize },
    #[error("unexpected {found} at {pos}")]
    UnexpectedToken { found: String, pos: usize },
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unknown identifier '{name}' at {pos}; only `answers` is in scope")]
    UnknownIdentifier { name: String, pos: usize },
    #[error("unsupported call '{name}' at {pos}")]
    UnsupportedCall { name: String, pos: usize },
    #[error("expression nests deeper than {} levels", MAX_DEPTH)]
    TooDeep,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Num(f64),
    Dot,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Not,
    And,
    Or,
    Eq,
    StrictEq,
    Ne,
    StrictNe,
    Lt,
    Lte,
    Gt,
    Gte,
    Plus,
    Minus,
    Star,
    Slash,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("identifier '{name}'"),
            Token::Str(text) => format!("string '{text}'"),
            Token::Num(number) => format!("number {number}"),
            other => format!("'{}'", other.symbol()),
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Token::Dot => ".",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::Not => "!",
            Token::And => "&&",
            Token::Or => "||",
            Token::Eq => "==",
            Token::StrictEq => "===",
            Token::Ne => "!=",
            Token::StrictNe => "!==",
            Token::Lt => "<",
            Token::Lte => "<=",
            Token::Gt => ">",
            Token::Gte => ">=",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Ident(_) | Token::Str(_) | Token::Num(_) => "",
        }
    }
}

pub(super) fn parse(source: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.expression()?;
    match parser.tokens.get(parser.pos) {
        None => Ok(expr),
        Some((token, pos)) => Err(ParseError::UnexpectedToken {
            found: token.describe(),
            pos: *pos,
        }),
    }
}

fn tokenize(source: &str) -> Result<Vec<(Token, usize)>, ParseError> {
    let chars: Vec<(usize, char)> = source.char_indices().collect();
    let mut tokens = Vec::new();
    let mut idx = 0;

    let peek = |at: usize| chars.get(at).map(|(_, ch)| *ch);

    while let Some(&(pos, ch)) = chars.get(idx) {
        if ch.is_whitespace() {
            idx += 1;
            continue;
        }

        if ch == '\'' || ch == '"' {
            let (text, next) = read_string(&chars, idx, ch)?;
            tokens.push((Token::Str(text), pos));
            idx = next;
            continue;
        }

        if ch.is_ascii_digit() || (ch == '.' && peek(idx + 1).is_some_and(|c| c.is_ascii_digit()))
        {
            let start = idx;
            while peek(idx).is_some_and(|c| c.is_ascii_digit() || c == '.') {
                idx += 1;
            }
            let text: String = chars[start..idx].iter().map(|(_, c)| *c).collect();
            let number = text
                .parse::<f64>()
                .map_err(|_| ParseError::InvalidNumber {
                    text: text.clone(),
                    pos,
                })?;
            tokens.push((Token::Num(number), pos));
            continue;
        }

        if ch.is_alphabetic() || ch == '_' || ch == '$' {
            let start = idx;
            while peek(idx).is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '$') {
                idx += 1;
            }
            let name: String = chars[start..idx].iter().map(|(_, c)| *c).collect();
            tokens.push((Token::Ident(name), pos));
            continue;
        }

        let next = peek(idx + 1);
        let third = peek(idx + 2);
        let (token, width) = match (ch, next, third) {
            ('=', Some('='), Some('=')) => (Token::StrictEq, 3),
            ('=', Some('='), _) => (Token::Eq, 2),
            ('!', Some('='), Some('=')) => (Token::StrictNe, 3),
            ('!', Some('='), _) => (Token::Ne, 2),
            ('!', _, _) => (Token::Not, 1),
            ('&', Some('&'), _) => (Token::And, 2),
            ('|', Some('|'), _) => (Token::Or, 2),
            ('<', Some('='), _) => (Token::Lte, 2),
            ('<', _, _) => (Token::Lt, 1),
            ('>', Some('='), _) => (Token::Gte, 2),
            ('>', _, _) => (Token::Gt, 1),
            ('.', _, _) => (Token::Dot, 1),
            ('[', _, _) => (Token::LBracket, 1),
            (']', _, _) => (Token::RBracket, 1),
            ('(', _, _) => (Token::LParen, 1),
            (')', _, _) => (Token::RParen, 1),
            ('+', _, _) => (Token::Plus, 1),
            ('-', _, _) => (Token::Minus, 1),
            ('*', _, _) => (Token::Star, 1),
            ('/', _, _) => (Token::Slash, 1),
            _ => return Err(ParseError::UnexpectedChar { ch, pos }),
        };
        tokens.push((token, pos));
        idx += width;
    }

    Ok(tokens)
}

fn read_string(
    chars: &[(usize, char)],
    start: usize,
    quote: char,
) -> Result<(String, usize), ParseError> {
    let pos = chars[start].0;
    let mut text = String::new();
    let mut idx = start + 1;
    while let Some(&(_, ch)) = chars.get(idx) {
        match ch {
            '\\' => {
                let escaped = chars
                    .get(idx + 1)
                    .map(|(_, c)| *c)
                    .ok_or(ParseError::UnterminatedString { pos })?;
                text.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    other => other,
                });
                idx += 2;
            }
            c if c == quote => return Ok((text, idx + 1)),
            c => {
                text.push(c);
                idx += 1;
            }
        }
    }
    Err(ParseError::UnterminatedString { pos })
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(token, _)| token)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|(token, _)| token)
    }

    fn advance(&mut self) -> Option<(Token, usize)> {
        let item = self.tokens.get(self.pos).cloned();
        if item.is_some() {
            self.pos += 1;
        }
        item
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParseError> {
        match self.advance() {
            Some((token, _)) if token == expected => Ok(()),
            Some((token, pos)) => Err(ParseError::UnexpectedToken {
                found: token.describe(),
                pos,
            }),
            None => Err(ParseError::UnexpectedEnd),
        }
    }

    fn expression(&mut self) -> Result<Expr, ParseError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ParseError::TooDeep);
        }
        let expr = self.or();
        self.depth -= 1;
        expr
    }

    fn binary_level(
        &mut self,
        operand: fn(&mut Self) -> Result<Expr, ParseError>,
        ops: &[(Token, BinaryOp)],
    ) -> Result<Expr, ParseError> {
        let mut left = operand(self)?;
        while let Some(op) = self
            .peek()
            .and_then(|token| ops.iter().find(|(candidate, _)| candidate == token))
            .map(|(_, op)| *op)
        {
            self.pos += 1;
            let right = operand(self)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn or(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(Self::and, &[(Token::Or, BinaryOp::Or)])
    }

    fn and(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(Self::equality, &[(Token::And, BinaryOp::And)])
    }

    fn equality(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(
            Self::relational,
            &[
                (Token::Eq, BinaryOp::Eq),
                (Token::StrictEq, BinaryOp::StrictEq),
                (Token::Ne, BinaryOp::Ne),
                (Token::StrictNe, BinaryOp::StrictNe),
            ],
        )
    }

    fn relational(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(
            Self::additive,
            &[
                (Token::Lt, BinaryOp::Lt),
                (Token::Lte, BinaryOp::Lte),
                (Token::Gt, BinaryOp::Gt),
                (Token::Gte, BinaryOp::Gte),
            ],
        )
    }

    fn additive(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(
            Self::multiplicative,
            &[(Token::Plus, BinaryOp::Add), (Token::Minus, BinaryOp::Sub)],
        )
    }

    fn multiplicative(&mut self) -> Result<Expr, ParseError> {
        self.binary_level(
            Self::unary,
            &[(Token::Star, BinaryOp::Mul), (Token::Slash, BinaryOp::Div)],
        )
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        match self.peek() {
            Some(Token::Not) => {
                self.pos += 1;
                let expression = Box::new(self.nested(Self::unary)?);
                Ok(Expr::Not { expression })
            }
            Some(Token::Minus) => {
                self.pos += 1;
                let expression = Box::new(self.nested(Self::unary)?);
                Ok(Expr::Neg { expression })
            }
            _ => {
                let primary = self.primary()?;
                self.postfix(primary)
            }
        }
    }

    fn nested(
        &mut self,
        rule: fn(&mut Self) -> Result<Expr, ParseError>,
    ) -> Result<Expr, ParseError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ParseError::TooDeep);
        }
        let expr = rule(self);
        self.depth -= 1;
        expr
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let (token, pos) = self.advance().ok_or(ParseError::UnexpectedEnd)?;
        match token {
            Token::Num(number) => Ok(Expr::Literal {
                value: Number::from_f64(number)
                    .map(Value::Number)
                    .ok_or(ParseError::InvalidNumber {
                        text: number.to_string(),
                        pos,
                    })?,
            }),
            Token::Str(text) => Ok(Expr::Literal {
                value: Value::String(text),
            }),
            Token::LParen => {
                let expr = self.expression()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Token::Ident(name) => match name.as_str() {
                "true" => Ok(Expr::Literal {
                    value: Value::Bool(true),
                }),
                "false" => Ok(Expr::Literal {
                    value: Value::Bool(false),
                }),
                "null" | "undefined" => Ok(Expr::Literal { value: Value::Null }),
                "answers" => self.answer_path(),
                _ => Err(ParseError::UnknownIdentifier {
                    name: name.clone(),
                    pos,
                }),
            },
            other => Err(ParseError::UnexpectedToken {
                found: other.describe(),
                pos,
            }),
        }
    }

    /// Member accesses after `answers`; stops before `.includes(`.
    fn answer_path(&mut self) -> Result<Expr, ParseError> {
        let mut path = Vec::new();
        loop {
            match (self.peek(), self.peek_at(1), self.peek_at(2)) {
                (Some(Token::Dot), Some(Token::Ident(_)), Some(Token::LParen)) => break,
                (Some(Token::Dot), Some(Token::Ident(name)), _) => {
                    path.push(name.clone());
                    self.pos += 2;
                }
                (Some(Token::LBracket), _, _) => {
                    self.pos += 1;
                    let segment = match self.advance() {
                        Some((Token::Str(text), _)) => text,
                        Some((Token::Num(number), pos)) => {
                            if number < 0.0 || number.fract() != 0.0 {
                                return Err(ParseError::InvalidNumber {
                                    text: number.to_string(),
                                    pos,
                                });
                            }
                            format!("{}", number as u64)
                        }
                        Some((token, pos)) => {
                            return Err(ParseError::UnexpectedToken {
                                found: token.describe(),
                                pos,
                            });
                        }
                        None => return Err(ParseError::UnexpectedEnd),
                    };
                    self.expect(Token::RBracket)?;
                    path.push(segment);
                }
                _ => break,
            }
        }
        Ok(Expr::Answer { path })
    }

    fn postfix(&mut self, mut target: Expr) -> Result<Expr, ParseError> {
        while let Some(Token::Dot) = self.peek() {
            self.pos += 1;
            let (token, pos) = self.advance().ok_or(ParseError::UnexpectedEnd)?;
            let Token::Ident(name) = token else {
                return Err(ParseError::UnexpectedToken {
                    found: token.describe(),
                    pos,
                });
            };
            let is_call = matches!(self.peek(), Some(Token::LParen));
            target = match (name.as_str(), is_call) {
                ("includes", true) => {
                    self.pos += 1;
                    let needle = self.expression()?;
                    self.expect(Token::RParen)?;
                    Expr::Includes {
                        target: Box::new(target),
                        needle: Box::new(needle),
                    }
                }
                ("length", false) => Expr::Length {
                    target: Box::new(target),
                },
                (_, true) => {
                    return Err(ParseError::UnsupportedCall {
                        name: name.clone(),
                        pos,
                    });
                }
                (_, false) => {
                    return Err(ParseError::UnexpectedToken {
                        found: format!("property '{name}'"),
                        pos,
                    });
                }
            };
        }
        Ok(target)
    }
}
