//! Recursive-descent parser producing the Prolog-subset AST
//!
//! Clauses parse as `[head predicate, body predicates…]`. A query has the
//! same shape; its head predicate is synthesized, named `Query`, with one
//! argument per distinct variable of the goals in first-occurrence order, so
//! that the emitted top-level module exposes the query's variables as ports
//! under their source names.

use crate::ast::{Node, NodeId, NodeKind, Value};
use crate::error::{CompileError, Result};
use crate::lexer::{tokenize, SpannedToken, Token};
use crate::span::{LineIndex, Span};

/// Parse a whole source file into a `Program` node
pub fn parse(source: &str) -> Result<Node> {
    let index = LineIndex::new(source);
    let tokens = tokenize(source).map_err(|range| CompileError::Lex {
        text: source[range.clone()].to_string(),
        span: Span::from_range(range, &index),
    })?;
    Parser {
        source,
        tokens,
        pos: 0,
        index,
        next_id: 0,
    }
    .program()
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<SpannedToken>,
    pos: usize,
    index: LineIndex,
    next_id: u32,
}

impl<'a> Parser<'a> {
    fn program(mut self) -> Result<Node> {
        let start = self.here();
        let mut children = Vec::new();
        while self.peek().is_some() {
            children.push(self.clause_or_query()?);
        }
        let span = start.to(self.here());
        Ok(self.node(NodeKind::Program, None, span, children))
    }

    fn clause_or_query(&mut self) -> Result<Node> {
        match self.peek() {
            Some(Token::Neck) | Some(Token::QueryNeck) => self.query(),
            _ => self.clause(),
        }
    }

    /// `head.` or `head :- body, body, ….`
    fn clause(&mut self) -> Result<Node> {
        let start = self.here();
        let head = self.head_predicate()?;
        let mut children = vec![head];
        if self.eat(&Token::Neck) {
            children.extend(self.predicate_list()?);
        }
        self.expect(&Token::Dot)?;
        let name = children[0].children[0].str_value()?.to_string();
        let arity = children[0].children.len() - 1;
        let span = start.to(self.here_before());
        Ok(self.node(
            NodeKind::Clause,
            Some(Value::Str(format!("{}/{}", name, arity))),
            span,
            children,
        ))
    }

    /// `:- goal, goal, ….` — the head predicate is synthesized from the
    /// goals' distinct variables
    fn query(&mut self) -> Result<Node> {
        let start = self.here();
        self.advance();
        let goals = self.predicate_list()?;
        self.expect(&Token::Dot)?;

        let mut vars: Vec<(String, Span)> = Vec::new();
        for goal in &goals {
            goal.for_each_variable(&mut |var| {
                if let Some(Value::Str(name)) = &var.value {
                    if !vars.iter().any(|(n, _)| n == name) {
                        vars.push((name.clone(), var.span));
                    }
                }
            });
        }

        let arity = vars.len();
        let head_name = self.synth(NodeKind::Atom, Some(Value::Str("Query".into())), "Query", start);
        let mut head_children = vec![head_name];
        for (name, span) in vars {
            let var = self.synth(
                NodeKind::Variable,
                Some(Value::Str(name.clone())),
                &name,
                span,
            );
            let term = self.synth_with_children(
                NodeKind::Term,
                Some(Value::Str(name.clone())),
                &name,
                span,
                vec![var],
            );
            head_children.push(term);
        }
        let head = self.synth_with_children(NodeKind::Predicate, None, "", start, head_children);

        let mut children = vec![head];
        children.extend(goals);
        let span = start.to(self.here_before());
        Ok(self.node(
            NodeKind::Query,
            Some(Value::Str(format!("Query/{}", arity))),
            span,
            children,
        ))
    }

    /// An atom, optionally applied to parenthesized argument terms
    fn head_predicate(&mut self) -> Result<Node> {
        let start = self.here();
        let name = self.atom_node("a clause head")?;
        let mut children = vec![name];
        if self.eat(&Token::LParen) {
            children.extend(self.term_list()?);
            self.expect(&Token::RParen)?;
        }
        let span = start.to(self.here_before());
        Ok(self.node(NodeKind::Predicate, None, span, children))
    }

    fn predicate_list(&mut self) -> Result<Vec<Node>> {
        let mut predicates = vec![self.body_predicate()?];
        while self.eat(&Token::Comma) {
            predicates.push(self.body_predicate()?);
        }
        Ok(predicates)
    }

    /// A predicate call `name(args…)`, or an expression wrapped in a
    /// single-child `Predicate` node
    fn body_predicate(&mut self) -> Result<Node> {
        let start = self.here();
        let children = if matches!(self.peek(), Some(Token::Atom(_)))
            && matches!(self.peek2(), Some(Token::LParen))
        {
            let name = self.atom_node("a predicate name")?;
            self.expect(&Token::LParen)?;
            let mut children = vec![name];
            children.extend(self.term_list()?);
            self.expect(&Token::RParen)?;
            children
        } else {
            vec![self.relation_or_term()?]
        };
        let span = start.to(self.here_before());
        Ok(self.node(NodeKind::Predicate, None, span, children))
    }

    fn term_list(&mut self) -> Result<Vec<Node>> {
        let mut terms = vec![self.term()?];
        while self.eat(&Token::Comma) {
            terms.push(self.term()?);
        }
        Ok(terms)
    }

    /// `term relop term`, or a bare term
    fn relation_or_term(&mut self) -> Result<Node> {
        let start = self.here();
        let lhs = self.term()?;
        let op = match self.peek() {
            Some(Token::LessEq) => Some("=<"),
            Some(Token::GreaterEq) => Some(">="),
            Some(Token::Less) => Some("<"),
            Some(Token::Greater) => Some(">"),
            Some(Token::NotUnify) => Some("\\="),
            Some(Token::Unify) => Some("="),
            Some(Token::Is) => Some("is"),
            _ => None,
        };
        match op {
            Some(spelling) => {
                let op_span = self.here();
                self.advance();
                let op_node = self.node(
                    NodeKind::RelationOp,
                    Some(Value::Str(spelling.to_string())),
                    op_span,
                    Vec::new(),
                );
                let rhs = self.term()?;
                let span = start.to(self.here_before());
                Ok(self.node(NodeKind::Relation, None, span, vec![lhs, op_node, rhs]))
            }
            None => Ok(lhs),
        }
    }

    /// An additive expression wrapped in a `Term` node carrying its source
    /// text
    fn term(&mut self) -> Result<Node> {
        let start = self.here();
        let expr = self.additive()?;
        let span = start.to(self.here_before());
        let text = self.slice(span);
        Ok(self.node(NodeKind::Term, Some(Value::Str(text)), span, vec![expr]))
    }

    fn additive(&mut self) -> Result<Node> {
        let start = self.here();
        let mut lhs = self.multiplicative()?;
        loop {
            let spelling = match self.peek() {
                Some(Token::Plus) => "+",
                Some(Token::Minus) => "-",
                _ => break,
            };
            let op_span = self.here();
            self.advance();
            let op = self.node(
                NodeKind::AdditiveOp,
                Some(Value::Str(spelling.to_string())),
                op_span,
                Vec::new(),
            );
            let rhs = self.multiplicative()?;
            let span = start.to(self.here_before());
            lhs = self.node(NodeKind::AdditiveExpr, None, span, vec![lhs, op, rhs]);
        }
        Ok(lhs)
    }

    fn multiplicative(&mut self) -> Result<Node> {
        let start = self.here();
        let mut lhs = self.unary()?;
        while matches!(self.peek(), Some(Token::Star)) {
            let op_span = self.here();
            self.advance();
            let op = self.node(
                NodeKind::MultiplicativeOp,
                Some(Value::Str("*".to_string())),
                op_span,
                Vec::new(),
            );
            let rhs = self.unary()?;
            let span = start.to(self.here_before());
            lhs = self.node(NodeKind::MultiplicativeExpr, None, span, vec![lhs, op, rhs]);
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Node> {
        if matches!(self.peek(), Some(Token::Minus)) {
            let start = self.here();
            self.advance();
            let op = self.node(
                NodeKind::UnaryOp,
                Some(Value::Str("-".to_string())),
                start,
                Vec::new(),
            );
            let operand = self.unary()?;
            let span = start.to(self.here_before());
            return Ok(self.node(NodeKind::UnaryExpr, None, span, vec![op, operand]));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Node> {
        let start = self.here();
        match self.peek().cloned() {
            Some(Token::Numeral(n)) => {
                self.advance();
                Ok(self.node(
                    NodeKind::Numeral,
                    Some(Value::Int(n)),
                    start,
                    Vec::new(),
                ))
            }
            Some(Token::Variable(name)) => {
                self.advance();
                Ok(self.node(
                    NodeKind::Variable,
                    Some(Value::Str(name)),
                    start,
                    Vec::new(),
                ))
            }
            Some(Token::Atom(name)) => {
                self.advance();
                let atom = self.node(
                    NodeKind::Atom,
                    Some(Value::Str(name.clone())),
                    start,
                    Vec::new(),
                );
                if self.eat(&Token::LParen) {
                    // A compound structure inside an expression; parsed so
                    // the preprocessor can reject it with a position.
                    let mut children = vec![atom];
                    children.extend(self.term_list()?);
                    self.expect(&Token::RParen)?;
                    let span = start.to(self.here_before());
                    return Ok(self.node(
                        NodeKind::Structure,
                        Some(Value::Str(name)),
                        span,
                        children,
                    ));
                }
                Ok(atom)
            }
            Some(Token::LParen) => {
                self.advance();
                let inner = self.additive()?;
                self.expect(&Token::RParen)?;
                let span = start.to(self.here_before());
                Ok(self.node(
                    NodeKind::PrimaryExpr,
                    Some(Value::Str("()".to_string())),
                    span,
                    vec![inner],
                ))
            }
            Some(Token::LBracket) => {
                self.advance();
                let mut children = Vec::new();
                if !matches!(self.peek(), Some(Token::RBracket)) {
                    children.extend(self.term_list()?);
                    if self.eat(&Token::Bar) {
                        children.push(self.term()?);
                    }
                }
                self.expect(&Token::RBracket)?;
                let span = start.to(self.here_before());
                Ok(self.node(NodeKind::List, None, span, children))
            }
            found => Err(self.unexpected("a term", found)),
        }
    }

    fn atom_node(&mut self, expected: &str) -> Result<Node> {
        match self.peek().cloned() {
            Some(Token::Atom(name)) => {
                let span = self.here();
                self.advance();
                Ok(self.node(NodeKind::Atom, Some(Value::Str(name)), span, Vec::new()))
            }
            found => Err(self.unexpected(expected, found)),
        }
    }

    // Token-stream plumbing.

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek2(&self) -> Option<&Token> {
        self.tokens.get(self.pos + 1).map(|(t, _)| t)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token) -> Result<()> {
        if self.eat(token) {
            Ok(())
        } else {
            let found = self.peek().cloned();
            Err(self.unexpected(&token.to_string(), found))
        }
    }

    fn unexpected(&self, expected: &str, found: Option<Token>) -> CompileError {
        CompileError::Parse {
            expected: expected.to_string(),
            found: match found {
                Some(token) => token.to_string(),
                None => "end of input".to_string(),
            },
            span: self.here(),
        }
    }

    /// Span of the current token, or of the end of input
    fn here(&self) -> Span {
        match self.tokens.get(self.pos) {
            Some((_, range)) => Span::from_range(range.clone(), &self.index),
            None => Span::from_range(self.source.len()..self.source.len(), &self.index),
        }
    }

    /// Span of the most recently consumed token
    fn here_before(&self) -> Span {
        match self.pos.checked_sub(1).and_then(|i| self.tokens.get(i)) {
            Some((_, range)) => Span::from_range(range.clone(), &self.index),
            None => self.here(),
        }
    }

    fn slice(&self, span: Span) -> String {
        self.source.get(span.start..span.end).unwrap_or("").to_string()
    }

    fn node(&mut self, kind: NodeKind, value: Option<Value>, span: Span, children: Vec<Node>) -> Node {
        let text = self.slice(span);
        self.node_with_text(kind, value, text, span, children)
    }

    /// A node whose text is not a source slice (synthesized query heads)
    fn synth(&mut self, kind: NodeKind, value: Option<Value>, text: &str, span: Span) -> Node {
        self.node_with_text(kind, value, text.to_string(), span, Vec::new())
    }

    fn synth_with_children(
        &mut self,
        kind: NodeKind,
        value: Option<Value>,
        text: &str,
        span: Span,
        children: Vec<Node>,
    ) -> Node {
        self.node_with_text(kind, value, text.to_string(), span, children)
    }

    fn node_with_text(
        &mut self,
        kind: NodeKind,
        value: Option<Value>,
        text: String,
        span: Span,
        children: Vec<Node>,
    ) -> Node {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        Node {
            id,
            kind,
            value,
            text,
            span,
            children,
        }
    }
}
