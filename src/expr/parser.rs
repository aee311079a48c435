//! Recursive-descent parser producing the expression AST
//!
//! Precedence, lowest first: `?:`, `||`, `&&`, relations (including `in`),
//! `+ -`, `* / %`, unary `! -`, then member access, indexing and calls.

use super::lexer::{tokenize, Spanned, Token};
use super::value::Value;
use super::ExprError;

/// Depth limit for the syntax tree: nesting plus operator and member chains
const MAX_DEPTH: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
}

impl BinaryOp {
    pub(crate) fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::In => "in",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Literal(Value),
    Ident(String),
    Select {
        operand: Box<Expr>,
        field: String,
    },
    Index {
        operand: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        target: Option<Box<Expr>>,
        function: String,
        args: Vec<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Conditional {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    List(Vec<Expr>),
    Map(Vec<(Expr, Expr)>),
}

pub(crate) fn parse(source: &str) -> Result<Expr, ExprError> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(ExprError::syntax(0, "empty expression"));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        end: source.len(),
    };
    let expr = parser.expression()?;
    if let Some(extra) = parser.tokens.get(parser.pos) {
        return Err(ExprError::syntax(
            extra.offset,
            format!("unexpected {}", extra.token.describe()),
        ));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |s| s.offset)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|s| s.token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), ExprError> {
        if self.eat(&expected) {
            Ok(())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn unexpected(&self, what: &str) -> ExprError {
        match self.peek() {
            Some(token) => ExprError::syntax(self.offset(), format!("expected {what}, found {}", token.describe())),
            None => ExprError::syntax(self.end, format!("expected {what}, found end of expression")),
        }
    }

    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, ExprError>) -> Result<T, ExprError> {
        self.deepen()?;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Each operator or member link wraps the tree built so far one level deeper.
    /// Callers reset `depth` once their chain ends.
    fn deepen(&mut self) -> Result<(), ExprError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExprError::syntax(self.offset(), "expression nested too deeply"));
        }
        Ok(())
    }

    fn expression(&mut self) -> Result<Expr, ExprError> {
        self.nested(|p| {
            let condition = p.or()?;
            if !p.eat(&Token::Question) {
                return Ok(condition);
            }
            let then = p.or()?;
            p.expect(Token::Colon, "':'")?;
            let otherwise = p.expression()?;
            Ok(Expr::Conditional {
                condition: Box::new(condition),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            })
        })
    }

    fn or(&mut self) -> Result<Expr, ExprError> {
        let base = self.depth;
        let mut lhs = self.and()?;
        while self.eat(&Token::OrOr) {
            self.deepen()?;
            let rhs = self.and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        self.depth = base;
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Expr, ExprError> {
        let base = self.depth;
        let mut lhs = self.relation()?;
        while self.eat(&Token::AndAnd) {
            self.deepen()?;
            let rhs = self.relation()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        self.depth = base;
        Ok(lhs)
    }

    fn relation(&mut self) -> Result<Expr, ExprError> {
        let base = self.depth;
        let mut lhs = self.additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::EqEq) => BinaryOp::Eq,
                Some(Token::NotEq) => BinaryOp::Ne,
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::Le) => BinaryOp::Le,
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::Ge) => BinaryOp::Ge,
                Some(Token::In) => BinaryOp::In,
                _ => break,
            };
            self.pos += 1;
            self.deepen()?;
            let rhs = self.additive()?;
            lhs = binary(op, lhs, rhs);
        }
        self.depth = base;
        Ok(lhs)
    }

    fn additive(&mut self) -> Result<Expr, ExprError> {
        let base = self.depth;
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.pos += 1;
            self.deepen()?;
            let rhs = self.multiplicative()?;
            lhs = binary(op, lhs, rhs);
        }
        self.depth = base;
        Ok(lhs)
    }

    fn multiplicative(&mut self) -> Result<Expr, ExprError> {
        let base = self.depth;
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Mod,
                _ => break,
            };
            self.pos += 1;
            self.deepen()?;
            let rhs = self.unary()?;
            lhs = binary(op, lhs, rhs);
        }
        self.depth = base;
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        let op = match self.peek() {
            Some(Token::Bang) => UnaryOp::Not,
            Some(Token::Minus) => UnaryOp::Neg,
            _ => return self.member(),
        };
        self.pos += 1;
        if op == UnaryOp::Neg {
            if let Some(Token::Int(_)) = self.peek() {
                if let Some(Token::Int(i)) = self.advance() {
                    let literal = Expr::Literal(Value::Int(i.wrapping_neg()));
                    return self.member_suffix(literal);
                }
            }
        }
        let operand = self.nested(|p| p.unary())?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn member(&mut self) -> Result<Expr, ExprError> {
        let primary = self.primary()?;
        self.member_suffix(primary)
    }

    fn member_suffix(&mut self, mut expr: Expr) -> Result<Expr, ExprError> {
        let base = self.depth;
        loop {
            if self.eat(&Token::Dot) {
                self.deepen()?;
                let field = match self.peek() {
                    Some(Token::Ident(field)) => field.clone(),
                    _ => return Err(self.unexpected("field name")),
                };
                self.pos += 1;
                if self.eat(&Token::LParen) {
                    let args = self.arguments(Token::RParen)?;
                    expr = Expr::Call {
                        target: Some(Box::new(expr)),
                        function: field,
                        args,
                    };
                } else {
                    expr = Expr::Select {
                        operand: Box::new(expr),
                        field,
                    };
                }
            } else if self.eat(&Token::LBracket) {
                self.deepen()?;
                let index = self.expression()?;
                self.expect(Token::RBracket, "']'")?;
                expr = Expr::Index {
                    operand: Box::new(expr),
                    index: Box::new(index),
                };
            } else {
                self.depth = base;
                return Ok(expr);
            }
        }
    }

    /// Comma-separated expressions up to `close`, which is consumed
    fn arguments(&mut self, close: Token) -> Result<Vec<Expr>, ExprError> {
        let mut args = Vec::new();
        if self.eat(&close) {
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            if self.eat(&close) {
                return Ok(args);
            }
            self.expect(Token::Comma, "','")?;
            // trailing comma
            if self.eat(&close) {
                return Ok(args);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        let offset = self.offset();
        let Some(token) = self.advance() else {
            return Err(self.unexpected("expression"));
        };
        match token {
            Token::Int(i) => Ok(Expr::Literal(Value::Int(i))),
            Token::Double(d) => Ok(Expr::Literal(Value::Double(d))),
            Token::Str(s) => Ok(Expr::Literal(Value::String(s))),
            Token::True => Ok(Expr::Literal(Value::Bool(true))),
            Token::False => Ok(Expr::Literal(Value::Bool(false))),
            Token::Null => Ok(Expr::Literal(Value::Null)),
            Token::Ident(name) => {
                if self.eat(&Token::LParen) {
                    let args = self.arguments(Token::RParen)?;
                    Ok(Expr::Call {
                        target: None,
                        function: name,
                        args,
                    })
                } else {
                    Ok(Expr::Ident(name))
                }
            }
            Token::LParen => {
                let inner = self.expression()?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            Token::LBracket => self.nested(|p| p.arguments(Token::RBracket)).map(Expr::List),
            Token::LBrace => self.nested(|p| p.map_entries()).map(Expr::Map),
            other => Err(ExprError::syntax(offset, format!("unexpected {}", other.describe()))),
        }
    }

    fn map_entries(&mut self) -> Result<Vec<(Expr, Expr)>, ExprError> {
        let mut entries = Vec::new();
        if self.eat(&Token::RBrace) {
            return Ok(entries);
        }
        loop {
            let key = self.expression()?;
            self.expect(Token::Colon, "':'")?;
            let value = self.expression()?;
            entries.push((key, value));
            if self.eat(&Token::RBrace) {
                return Ok(entries);
            }
            self.expect(Token::Comma, "','")?;
            if self.eat(&Token::RBrace) {
                return Ok(entries);
            }
        }
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Box<Expr> {
        Box::new(Expr::Ident(name.into()))
    }

    #[test]
    fn test_precedence() {
        let expr = parse("a + b * c").unwrap();
        assert_eq!(
            expr,
            Expr::Binary {
                op: BinaryOp::Add,
                lhs: ident("a"),
                rhs: Box::new(binary(BinaryOp::Mul, Expr::Ident("b".into()), Expr::Ident("c".into()))),
            }
        );
    }

    #[test]
    fn test_logical_binds_looser_than_relations() {
        let expr = parse("a < 1 || b").unwrap();
        assert!(matches!(expr, Expr::Or(lhs, _) if matches!(*lhs, Expr::Binary { op: BinaryOp::Lt, .. })));
    }

    #[test]
    fn test_member_chain() {
        let expr = parse("files[0].problems.size()").unwrap();
        let Expr::Call { target: Some(target), function, args } = expr else {
            panic!("expected method call");
        };
        assert_eq!(function, "size");
        assert!(args.is_empty());
        assert!(matches!(*target, Expr::Select { ref field, .. } if field == "problems"));
    }

    #[test]
    fn test_conditional_is_right_associative() {
        let expr = parse("a ? 1 : b ? 2 : 3").unwrap();
        let Expr::Conditional { otherwise, .. } = expr else {
            panic!("expected conditional");
        };
        assert!(matches!(*otherwise, Expr::Conditional { .. }));
    }

    #[test]
    fn test_negative_literal() {
        assert_eq!(parse("-5").unwrap(), Expr::Literal(Value::Int(-5)));
        assert!(matches!(parse("-x").unwrap(), Expr::Unary { op: UnaryOp::Neg, .. }));
    }

    #[test]
    fn test_list_and_map_literals() {
        assert!(matches!(parse("[1, 2, 3,]").unwrap(), Expr::List(items) if items.len() == 3));
        assert!(matches!(parse("{'a': 1, 'b': 2}").unwrap(), Expr::Map(entries) if entries.len() == 2));
        assert!(matches!(parse("[]").unwrap(), Expr::List(items) if items.is_empty()));
    }

    #[test]
    fn test_syntax_errors() {
        for source in ["", "a +", "(a", "a b", "f(a,", "a ? b", "x.", "{1 2}"] {
            assert!(
                matches!(parse(source), Err(ExprError::Syntax { .. })),
                "{source:?} should fail"
            );
        }
    }

    #[test]
    fn test_depth_limit() {
        let source = format!("{}1{}", "(".repeat(500), ")".repeat(500));
        assert!(matches!(parse(&source), Err(ExprError::Syntax { .. })));
    }

    #[test]
    fn test_long_chains_hit_depth_limit() {
        let sum = format!("1{}", " + 1".repeat(10_000));
        let conjunction = format!("true{}", " && true".repeat(10_000));
        let fields = format!("a{}", ".b".repeat(10_000));
        let indexes = format!("a{}", "[0]".repeat(10_000));
        for source in [sum, conjunction, fields, indexes] {
            assert!(matches!(parse(&source), Err(ExprError::Syntax { .. })));
        }
    }

    #[test]
    fn test_short_chains_parse() {
        let sum = format!("1{}", " + 1".repeat(50));
        assert!(parse(&sum).is_ok());
        // sibling chains don't accumulate depth
        let terms = vec!["a.b.c * 2"; 40].join(" + ");
        assert!(parse(&terms).is_ok());
        assert!(parse("f(a + b + c, d.e.f) && g[0][1] || h").is_ok());
    }
}
