//! CQL/ECQL subset parser
//!
//! Grants carry their read/write filters as text. This parser accepts the
//! subset rule authors use in practice:
//!
//! ```text
//! expr      := or
//! or        := and ("OR" and)*
//! and       := unary ("AND" unary)*
//! unary     := "NOT" unary | primary
//! primary   := "(" expr ")" | "INCLUDE" | "EXCLUDE"
//!            | "INTERSECTS" "(" ident "," geometry ")"
//!            | ident predicate
//! predicate := cmp literal
//!            | ["NOT"] "IN" "(" literal ("," literal)* ")"
//!            | ["NOT"] "LIKE" string
//!            | ["NOT"] "BETWEEN" literal "AND" literal
//!            | "IS" ["NOT"] "NULL"
//! ```

use super::{CompareOp, Filter, Literal};
use crate::error::CqlError;
use crate::geometry::{Geometry, WGS84};
use regex::Regex;
use std::sync::LazyLock;

static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?x)
        \A\s*(?:
            (?P<num>-?\d+(?:\.\d+)?(?:[eE][-+]?\d+)?)
          | (?P<str>'(?:[^']|'')*')
          | (?P<quoted>"[^"]+")
          | (?P<ident>[A-Za-z_][A-Za-z0-9_.:]*)
          | (?P<op><>|!=|<=|>=|=|<|>|\(|\)|,|;)
        )"#,
    )
    .expect("token regex is valid")
});

#[derive(Debug, Clone, PartialEq)]
enum Kind {
    Number(String),
    Str(String),
    Ident(String),
    Quoted(String),
    Op(&'static str),
}

#[derive(Debug, Clone)]
struct Token {
    kind: Kind,
    start: usize,
    end: usize,
}

fn tokenize(input: &str) -> Result<Vec<Token>, CqlError> {
    const OPS: &[&str] = &["<>", "!=", "<=", ">=", "=", "<", ">", "(", ")", ",", ";"];

    let mut tokens = Vec::new();
    let mut pos = 0;
    while pos < input.len() {
        if input[pos..].trim().is_empty() {
            break;
        }
        // Anchored at the slice start, so a failed match never scans ahead
        let rest = &input[pos..];
        let caps = TOKEN.captures(rest).ok_or_else(|| unexpected_at(input, pos))?;

        let (kind, m) = if let Some(m) = caps.name("num") {
            (Kind::Number(m.as_str().to_string()), m)
        } else if let Some(m) = caps.name("str") {
            let raw = m.as_str();
            let unquoted = raw[1..raw.len() - 1].replace("''", "'");
            (Kind::Str(unquoted), m)
        } else if let Some(m) = caps.name("quoted") {
            let raw = m.as_str();
            (Kind::Quoted(raw[1..raw.len() - 1].to_string()), m)
        } else if let Some(m) = caps.name("ident") {
            (Kind::Ident(m.as_str().to_string()), m)
        } else if let Some(m) = caps.name("op") {
            let op = OPS
                .iter()
                .find(|op| **op == m.as_str())
                .copied()
                .ok_or_else(|| unexpected_at(input, pos + m.start()))?;
            (Kind::Op(op), m)
        } else {
            return Err(unexpected_at(input, pos));
        };

        tokens.push(Token {
            kind,
            start: pos + m.start(),
            end: pos + m.end(),
        });
        pos += m.end();
    }
    Ok(tokens)
}

fn unexpected_at(input: &str, pos: usize) -> CqlError {
    let found = input[pos..]
        .trim_start()
        .chars()
        .next()
        .map(String::from)
        .unwrap_or_default();
    CqlError::UnexpectedToken {
        position: pos,
        found,
    }
}

/// Parse a CQL expression into a [`Filter`]
pub fn parse(input: &str) -> Result<Filter, CqlError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        input,
        tokens,
        pos: 0,
    };
    let filter = parser.expr()?;
    match parser.peek() {
        None => Ok(filter),
        Some(token) => Err(parser.unexpected(token)),
    }
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<Token, CqlError> {
        let token = self.tokens.get(self.pos).cloned().ok_or(CqlError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(token)
    }

    fn unexpected(&self, token: &Token) -> CqlError {
        CqlError::UnexpectedToken {
            position: token.start,
            found: self.input[token.start..token.end].to_string(),
        }
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token { kind: Kind::Ident(id), .. }) if id.eq_ignore_ascii_case(keyword))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        let found = self.peek_keyword(keyword);
        if found {
            self.pos += 1;
        }
        found
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), CqlError> {
        let token = self.next()?;
        match &token.kind {
            Kind::Ident(id) if id.eq_ignore_ascii_case(keyword) => Ok(()),
            _ => Err(self.unexpected(&token)),
        }
    }

    fn expect_op(&mut self, op: &str) -> Result<Token, CqlError> {
        let token = self.next()?;
        match token.kind {
            Kind::Op(found) if found == op => Ok(token),
            _ => Err(self.unexpected(&token)),
        }
    }

    fn eat_op(&mut self, op: &str) -> bool {
        let found = matches!(self.peek(), Some(Token { kind: Kind::Op(found), .. }) if *found == op);
        if found {
            self.pos += 1;
        }
        found
    }

    fn expr(&mut self) -> Result<Filter, CqlError> {
        let mut children = vec![self.and()?];
        while self.eat_keyword("OR") {
            children.push(self.and()?);
        }
        Ok(single_or(children, Filter::Or))
    }

    fn and(&mut self) -> Result<Filter, CqlError> {
        let mut children = vec![self.unary()?];
        while self.eat_keyword("AND") {
            children.push(self.unary()?);
        }
        Ok(single_or(children, Filter::And))
    }

    fn unary(&mut self) -> Result<Filter, CqlError> {
        if self.eat_keyword("NOT") {
            return Ok(Filter::not(self.unary()?));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Filter, CqlError> {
        if self.eat_op("(") {
            let inner = self.expr()?;
            self.expect_op(")")?;
            return Ok(inner);
        }
        if self.eat_keyword("INCLUDE") {
            return Ok(Filter::Include);
        }
        if self.eat_keyword("EXCLUDE") {
            return Ok(Filter::Exclude);
        }
        if self.eat_keyword("INTERSECTS") {
            return self.intersects();
        }

        let property = self.property()?;
        self.predicate(property)
    }

    fn property(&mut self) -> Result<String, CqlError> {
        let token = self.next()?;
        match token.kind {
            Kind::Ident(id) | Kind::Quoted(id) => Ok(id),
            _ => Err(self.unexpected(&token)),
        }
    }

    fn predicate(&mut self, property: String) -> Result<Filter, CqlError> {
        if self.eat_keyword("IS") {
            let negated = self.eat_keyword("NOT");
            self.expect_keyword("NULL")?;
            let filter = Filter::is_null(property);
            return Ok(if negated { Filter::not(filter) } else { filter });
        }

        let negated = self.eat_keyword("NOT");
        let filter = if self.eat_keyword("IN") {
            self.expect_op("(")?;
            let mut values = vec![self.literal()?];
            while self.eat_op(",") {
                values.push(self.literal()?);
            }
            self.expect_op(")")?;
            Filter::In { property, values }
        } else if self.eat_keyword("LIKE") {
            let token = self.next()?;
            match token.kind {
                Kind::Str(pattern) => Filter::Like { property, pattern },
                _ => return Err(self.unexpected(&token)),
            }
        } else if self.eat_keyword("BETWEEN") {
            let low = self.literal()?;
            self.expect_keyword("AND")?;
            let high = self.literal()?;
            Filter::and([
                Filter::Compare {
                    property: property.clone(),
                    op: CompareOp::Ge,
                    value: low,
                },
                Filter::Compare {
                    property,
                    op: CompareOp::Le,
                    value: high,
                },
            ])
        } else if negated {
            let token = self.next()?;
            return Err(self.unexpected(&token));
        } else {
            let op = self.compare_op()?;
            let value = self.literal()?;
            Filter::Compare {
                property,
                op,
                value,
            }
        };

        Ok(if negated { Filter::not(filter) } else { filter })
    }

    fn compare_op(&mut self) -> Result<CompareOp, CqlError> {
        let token = self.next()?;
        match token.kind {
            Kind::Op("=") => Ok(CompareOp::Eq),
            Kind::Op("<>") | Kind::Op("!=") => Ok(CompareOp::NotEq),
            Kind::Op("<") => Ok(CompareOp::Lt),
            Kind::Op("<=") => Ok(CompareOp::Le),
            Kind::Op(">") => Ok(CompareOp::Gt),
            Kind::Op(">=") => Ok(CompareOp::Ge),
            _ => Err(self.unexpected(&token)),
        }
    }

    fn literal(&mut self) -> Result<Literal, CqlError> {
        let token = self.next()?;
        match token.kind {
            Kind::Str(s) => Ok(Literal::String(s)),
            Kind::Number(n) => {
                if n.contains(['.', 'e', 'E']) {
                    n.parse::<f64>()
                        .map(Literal::Float)
                        .map_err(|_| CqlError::InvalidNumber(n))
                } else {
                    n.parse::<i64>()
                        .map(Literal::Integer)
                        .map_err(|_| CqlError::InvalidNumber(n))
                }
            }
            Kind::Ident(id) if id.eq_ignore_ascii_case("TRUE") => Ok(Literal::Boolean(true)),
            Kind::Ident(id) if id.eq_ignore_ascii_case("FALSE") => Ok(Literal::Boolean(false)),
            _ => Err(self.unexpected(&token)),
        }
    }

    /// `INTERSECTS(attr, <wkt>)`: the geometry literal is sliced from the
    /// source text up to the matching closing parenthesis.
    fn intersects(&mut self) -> Result<Filter, CqlError> {
        self.expect_op("(")?;
        let property = self.property()?;
        self.expect_op(",")?;

        let first = self.peek().cloned().ok_or(CqlError::UnexpectedEnd)?;
        let mut depth = 0usize;
        let close = loop {
            let token = self.next()?;
            match token.kind {
                Kind::Op("(") => depth += 1,
                Kind::Op(")") if depth == 0 => break token,
                Kind::Op(")") => depth -= 1,
                _ => {}
            }
        };

        let text = &self.input[first.start..close.start];
        let geometry =
            Geometry::parse(text, WGS84).map_err(|e| CqlError::InvalidGeometry(e.to_string()))?;
        Ok(Filter::Intersects {
            property: Some(property),
            geometry,
        })
    }
}

fn single_or(mut children: Vec<Filter>, wrap: fn(Vec<Filter>) -> Filter) -> Filter {
    if children.len() == 1 {
        children.remove(0)
    } else {
        wrap(children)
    }
}
