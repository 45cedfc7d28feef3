//! Text expression criteria
//!
//! `status = open AND (age >= 21 OR name LIKE 'A%')` is tokenized and
//! parsed by recursive descent into the same tree the tree engine
//! resolves. AND binds tighter than OR.
//!
//! ```text
//! expr       := and_expr (OR and_expr)*
//! and_expr   := primary (AND primary)*
//! primary    := '(' expr ')' | comparison
//! comparison := field operator [value | list]
//! list       := '(' [value (',' value)*] ')'
//! ```

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::clause::CommitLog;
use crate::config::FilterConfig;
use crate::dissector::{json_type_name, ClauseKeys};
use crate::errors::{FilterError, FilterResult};
use crate::mapping::Operator;
use crate::target::QueryTarget;

use super::tree::{Node, TreeEngine};
use super::Engine;

const EXPRESSION_FIELD: &str = "$expression";

/// Deepest parenthesised group the parser descends into
pub const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Quoted(String),
    Symbol(&'static str),
    LParen,
    RParen,
    Comma,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Word(w) => format!("'{}'", w),
            Token::Quoted(q) => format!("quoted '{}'", q),
            Token::Symbol(s) => format!("'{}'", s),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::Comma => "','".to_string(),
        }
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Word(w) if w.eq_ignore_ascii_case(keyword))
    }
}

fn syntax_error(position: usize, message: impl Into<String>) -> FilterError {
    FilterError::data_shape(
        EXPRESSION_FIELD,
        format!("{} at position {}", message.into(), position),
    )
}

fn tokenize(input: &str) -> FilterResult<Vec<(usize, Token)>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push((pos, Token::LParen));
            }
            ')' => {
                chars.next();
                tokens.push((pos, Token::RParen));
            }
            ',' => {
                chars.next();
                tokens.push((pos, Token::Comma));
            }
            '\'' | '"' => {
                chars.next();
                let mut text = String::new();
                let mut closed = false;
                while let Some((_, ch)) = chars.next() {
                    match ch {
                        '\\' => {
                            if let Some((_, escaped)) = chars.next() {
                                text.push(escaped);
                            }
                        }
                        ch if ch == c => {
                            closed = true;
                            break;
                        }
                        ch => text.push(ch),
                    }
                }
                if !closed {
                    return Err(syntax_error(pos, "unterminated quoted value"));
                }
                tokens.push((pos, Token::Quoted(text)));
            }
            '=' | '!' | '<' | '>' => {
                chars.next();
                let next = chars.peek().map(|&(_, n)| n);
                let symbol = match (c, next) {
                    ('!', Some('=')) => "!=",
                    ('<', Some('>')) => "<>",
                    ('<', Some('=')) => "<=",
                    ('>', Some('=')) => ">=",
                    ('=', _) => "=",
                    ('<', _) => "<",
                    ('>', _) => ">",
                    _ => return Err(syntax_error(pos, "unexpected '!'")),
                };
                if symbol.len() == 2 {
                    chars.next();
                }
                tokens.push((pos, Token::Symbol(symbol)));
            }
            _ => {
                let mut word = String::new();
                while let Some(&(_, ch)) = chars.peek() {
                    if ch.is_whitespace()
                        || matches!(ch, '(' | ')' | ',' | '\'' | '"' | '=' | '!' | '<' | '>')
                    {
                        break;
                    }
                    word.push(ch);
                    chars.next();
                }
                tokens.push((pos, Token::Word(word)));
            }
        }
    }
    Ok(tokens)
}

fn symbol_operator(symbol: &str) -> Option<Operator> {
    match symbol {
        "=" => Some(Operator::Eq),
        "!=" | "<>" => Some(Operator::Ne),
        ">" => Some(Operator::Gt),
        "<" => Some(Operator::Lt),
        ">=" => Some(Operator::Gte),
        "<=" => Some(Operator::Lte),
        _ => None,
    }
}

/// Bare words become numbers, booleans or null where they read as one
fn bare_value(word: &str) -> Value {
    if word.eq_ignore_ascii_case("null") {
        return Value::Null;
    }
    if word.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if word.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if let Ok(i) = word.parse::<i64>() {
        return Value::from(i);
    }
    word.parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(word.to_string()))
}

struct Parser<'k> {
    tokens: Vec<(usize, Token)>,
    cursor: usize,
    end: usize,
    depth: usize,
    keys: &'k ClauseKeys,
}

impl<'k> Parser<'k> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor).map(|(_, t)| t)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.cursor)
            .map(|(p, _)| *p)
            .unwrap_or(self.end)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.cursor).map(|(_, t)| t.clone());
        if token.is_some() {
            self.cursor += 1;
        }
        token
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek().is_some_and(|t| t.is_keyword(keyword)) {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> FilterResult<()> {
        let position = self.position();
        match self.advance() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(syntax_error(
                position,
                format!("expected {}, found {}", expected.describe(), token.describe()),
            )),
            None => Err(syntax_error(
                position,
                format!("expected {}, found end of input", expected.describe()),
            )),
        }
    }

    fn expr(&mut self) -> FilterResult<Node> {
        let mut children = vec![self.and_expr()?];
        while self.eat_keyword("or") {
            children.push(self.and_expr()?);
        }
        Ok(if children.len() == 1 {
            children.remove(0)
        } else {
            Node::or(children)
        })
    }

    fn and_expr(&mut self) -> FilterResult<Node> {
        let mut children = vec![self.primary()?];
        while self.eat_keyword("and") {
            children.push(self.primary()?);
        }
        Ok(if children.len() == 1 {
            children.remove(0)
        } else {
            Node::and(children)
        })
    }

    fn primary(&mut self) -> FilterResult<Node> {
        if self.peek() == Some(&Token::LParen) {
            if self.depth >= MAX_DEPTH {
                return Err(syntax_error(self.position(), "expression nested too deeply"));
            }
            self.cursor += 1;
            self.depth += 1;
            let node = self.expr()?;
            self.expect(Token::RParen)?;
            self.depth -= 1;
            return Ok(node);
        }
        self.comparison()
    }

    fn comparison(&mut self) -> FilterResult<Node> {
        let position = self.position();
        let field = match self.advance() {
            Some(Token::Word(w)) if !is_reserved(&w) => w,
            Some(token) => {
                return Err(syntax_error(
                    position,
                    format!("expected field name, found {}", token.describe()),
                ))
            }
            None => return Err(syntax_error(position, "expected field name, found end of input")),
        };

        let alias = self.operator()?;
        let value = match Operator::from_alias(&alias) {
            Some(op) if op.is_nullary() => Value::Null,
            Some(op) if op.is_list() => self.list()?,
            // Unknown aliases still carry a value; resolution reports them
            _ if self.peek() == Some(&Token::LParen) => self.list()?,
            _ => self.value()?,
        };

        let mut entry = Map::new();
        entry.insert(self.keys.operator.clone(), Value::String(alias));
        entry.insert(self.keys.value.clone(), value);
        Ok(Node::leaf(field, Value::Object(entry)))
    }

    /// Operator alias for the next token(s)
    fn operator(&mut self) -> FilterResult<String> {
        let position = self.position();
        let alias = match self.advance() {
            Some(Token::Symbol(s)) => symbol_operator(s)
                .map(|op| op.alias().to_string())
                .ok_or_else(|| syntax_error(position, format!("unknown symbol '{}'", s)))?,
            Some(Token::Word(w)) if w.eq_ignore_ascii_case("like") => {
                Operator::Like.alias().to_string()
            }
            Some(Token::Word(w)) if w.eq_ignore_ascii_case("in") => {
                Operator::In.alias().to_string()
            }
            Some(Token::Word(w)) if w.eq_ignore_ascii_case("not") => {
                if self.eat_keyword("like") {
                    Operator::NotLike.alias().to_string()
                } else if self.eat_keyword("in") {
                    Operator::NotIn.alias().to_string()
                } else {
                    return Err(syntax_error(position, "expected LIKE or IN after NOT"));
                }
            }
            Some(Token::Word(w)) if w.eq_ignore_ascii_case("is") => {
                let negated = self.eat_keyword("not");
                if !self.eat_keyword("null") {
                    return Err(syntax_error(position, "expected NULL after IS"));
                }
                if negated {
                    Operator::IsNotNull.alias().to_string()
                } else {
                    Operator::IsNull.alias().to_string()
                }
            }
            Some(Token::Word(w)) if !is_reserved(&w) => w.to_ascii_lowercase(),
            Some(token) => {
                return Err(syntax_error(
                    position,
                    format!("expected operator, found {}", token.describe()),
                ))
            }
            None => return Err(syntax_error(position, "expected operator, found end of input")),
        };
        Ok(alias)
    }

    fn value(&mut self) -> FilterResult<Value> {
        let position = self.position();
        match self.advance() {
            Some(Token::Quoted(text)) => Ok(Value::String(text)),
            Some(Token::Word(w))
                if !w.eq_ignore_ascii_case("and") && !w.eq_ignore_ascii_case("or") =>
            {
                Ok(bare_value(&w))
            }
            Some(token) => Err(syntax_error(
                position,
                format!("expected value, found {}", token.describe()),
            )),
            None => Err(syntax_error(position, "expected value, found end of input")),
        }
    }

    fn list(&mut self) -> FilterResult<Value> {
        self.expect(Token::LParen)?;
        let mut items = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.cursor += 1;
            return Ok(Value::Array(items));
        }
        loop {
            items.push(self.value()?);
            if self.peek() == Some(&Token::Comma) {
                self.cursor += 1;
                continue;
            }
            self.expect(Token::RParen)?;
            return Ok(Value::Array(items));
        }
    }
}

fn is_reserved(word: &str) -> bool {
    ["and", "or", "not", "like", "in", "is", "null"]
        .iter()
        .any(|k| word.eq_ignore_ascii_case(k))
}

/// Parse an expression into a criteria tree
pub fn parse_expression(input: &str, keys: &ClauseKeys) -> FilterResult<Node> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Ok(Node::and(Vec::new()));
    }

    let mut parser = Parser {
        tokens,
        cursor: 0,
        end: input.len(),
        depth: 0,
        keys,
    };
    let node = parser.expr()?;
    if let Some(token) = parser.peek() {
        return Err(syntax_error(
            parser.position(),
            format!("unexpected {}", token.describe()),
        ));
    }
    Ok(node)
}

/// Resolves text expressions through the tree engine
#[derive(Debug)]
pub struct ExpressionEngine {
    tree: TreeEngine,
}

impl ExpressionEngine {
    pub const NAME: &'static str = "expression";

    pub fn new(config: Arc<FilterConfig>) -> Self {
        Self {
            tree: TreeEngine::new(config),
        }
    }
}

impl Engine for ExpressionEngine {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn is_strict(&self) -> bool {
        self.tree.is_strict()
    }

    fn apply(&mut self, input: &Value, target: &mut dyn QueryTarget) -> FilterResult<()> {
        let Value::String(text) = input else {
            return Err(FilterError::data_shape(
                EXPRESSION_FIELD,
                format!("expression must be text, got {}", json_type_name(input)),
            ));
        };
        let node = parse_expression(text, self.tree.keys())?;
        self.tree.apply_node(&node, target)
    }

    fn commits(&self) -> &CommitLog {
        self.tree.commits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause::Clause;
    use crate::target::{Boolean, Condition, QueryBuilder};
    use serde_json::json;

    fn parse(text: &str) -> FilterResult<Node> {
        parse_expression(text, &ClauseKeys::default())
    }

    fn leaf(field: &str, op: &str, value: Value) -> Node {
        Node::leaf(field, json!({"operator": op, "value": value}))
    }

    #[test]
    fn test_precedence() {
        let node = parse("a = 1 OR b = 2 AND c = 3").unwrap();
        assert_eq!(
            node,
            Node::or(vec![
                leaf("a", "eq", json!(1)),
                Node::and(vec![leaf("b", "eq", json!(2)), leaf("c", "eq", json!(3))]),
            ])
        );
    }

    #[test]
    fn test_parentheses_and_keywords() {
        let node = parse(
            "(status = 'open' or status <> closed) and name not like \"A%\" and age is not null",
        )
        .unwrap();
        assert_eq!(
            node,
            Node::and(vec![
                Node::or(vec![
                    leaf("status", "eq", json!("open")),
                    leaf("status", "ne", json!("closed")),
                ]),
                leaf("name", "not_like", json!("A%")),
                leaf("age", "is_not_null", Value::Null),
            ])
        );
    }

    #[test]
    fn test_lists_and_aliases() {
        assert_eq!(
            parse("tag IN (a, 'b c', 3)").unwrap(),
            leaf("tag", "in", json!(["a", "b c", 3]))
        );
        assert_eq!(parse("tag not in ()").unwrap(), leaf("tag", "not_in", json!([])));
        assert_eq!(parse("age gte 21").unwrap(), leaf("age", "gte", json!(21)));
        assert_eq!(parse("age approx 21").unwrap(), leaf("age", "approx", json!(21)));
    }

    #[test]
    fn test_syntax_errors() {
        for text in [
            "a =", "(a = 1", "a = 1 b = 2", "= 1", "a 'x' 1", "a = 'open", "a is 1", "a ! 1",
        ] {
            let err = parse(text).unwrap_err();
            assert_eq!(err.code(), "SIFTER_DATA_SHAPE_INVALID", "{}", text);
        }
    }

    #[test]
    fn test_nesting_limit() {
        let nested = |depth: usize| {
            format!("{}status = open{}", "(".repeat(depth), ")".repeat(depth))
        };
        assert!(parse(&nested(MAX_DEPTH)).is_ok());
        assert_eq!(
            parse(&nested(MAX_DEPTH + 1)).unwrap_err().code(),
            "SIFTER_DATA_SHAPE_INVALID"
        );

        let err = parse(&format!("{}status = open", "(".repeat(10_000))).unwrap_err();
        assert_eq!(err.code(), "SIFTER_DATA_SHAPE_INVALID");
        assert!(err.to_string().contains("nested too deeply"));
    }

    #[test]
    fn test_engine_resolves_expression() {
        let config = FilterConfig::builder()
            .allow_fields(["status", "age"])
            .build()
            .unwrap();
        let mut engine = ExpressionEngine::new(Arc::new(config));
        let mut target = QueryBuilder::new();
        engine
            .apply(
                &json!("status = open AND (age < 18 OR age > 65 OR secret = 1)"),
                &mut target,
            )
            .unwrap();

        assert_eq!(target.conditions().len(), 2);
        assert!(matches!(
            &target.conditions()[1],
            Condition::Group { boolean: Boolean::Or, conditions } if conditions.len() == 2
        ));
        assert_eq!(
            engine.commits().get("status"),
            Some(&Clause::new("status", Operator::Eq, json!("open")))
        );
    }

    #[test]
    fn test_unknown_alias_is_unresolvable() {
        let config = FilterConfig::builder().allow("age").build().unwrap();
        let mut engine = ExpressionEngine::new(Arc::new(config));
        let mut target = QueryBuilder::new();
        let err = engine.apply(&json!("age approx 3"), &mut target).unwrap_err();
        assert_eq!(err, FilterError::operator_unresolvable("age", "approx"));
    }

    #[test]
    fn test_rejects_non_text() {
        let config = FilterConfig::builder().build().unwrap();
        let mut engine = ExpressionEngine::new(Arc::new(config));
        let mut target = QueryBuilder::new();
        assert!(engine.apply(&json!({"a": 1}), &mut target).is_err());
    }
}
