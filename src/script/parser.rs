//! Recursive-descent parser: lines → statements, tokens → expressions.
//!
//! Block structure:
//!
//! ```text
//! if COND then          loop I from A to B      loop while COND
//!   ...                   ...                     ...
//! else if COND then     end loop                end loop
//!   ...
//! else
//!   ...
//! end if
//! ```

use super::ast::{BinOp, Expr, InputTarget, Stmt, UnOp};
use super::lexer::{self, Line, Token};
use crate::error::{ScriptError, ScriptResult};

const RESERVED: &[&str] = &[
    "output", "input", "if", "then", "else", "end", "loop", "from", "to", "while", "until", "and",
    "or", "not", "mod", "div", "true", "false",
];

/// Deepest allowed nesting of blocks, and of parentheses and unary operators
/// within one expression.
pub const MAX_NESTING: usize = 100;

/// Most binary operators allowed in one statement's expressions.
pub const MAX_OPERATORS: usize = 1024;

fn is_reserved(word: &str) -> bool {
    RESERVED.contains(&word)
}

fn syntax(line: usize, message: impl Into<String>) -> ScriptError {
    ScriptError::Syntax {
        line,
        message: message.into(),
    }
}

/// Parse a whole program.
pub fn parse(source: &str) -> ScriptResult<Vec<Stmt>> {
    let lines = lexer::lex(source)?;
    let mut parser = Parser {
        lines,
        pos: 0,
        depth: 0,
    };
    let program = parser.block()?;
    if let Some(line) = parser.lines.get(parser.pos) {
        return Err(syntax(line.number, "unexpected block terminator"));
    }
    Ok(program)
}

// =============================================================================
// Statements
// =============================================================================

struct Parser {
    lines: Vec<Line>,
    pos: usize,
    depth: usize,
}

fn keyword(tokens: &[Token], idx: usize) -> Option<&str> {
    match tokens.get(idx) {
        Some(Token::Ident(word)) => Some(word.as_str()),
        _ => None,
    }
}

impl Parser {
    /// Statements up to (not including) the next `else`/`end` line or EOF.
    fn block(&mut self) -> ScriptResult<Vec<Stmt>> {
        let mut stmts = Vec::new();
        while let Some(line) = self.lines.get(self.pos) {
            if matches!(keyword(&line.tokens, 0), Some("end" | "else")) {
                break;
            }
            self.pos += 1;
            let line = line.clone();
            stmts.push(self.statement(&line)?);
        }
        Ok(stmts)
    }

    /// Run `f` one block level deeper.
    fn nested<T>(
        &mut self,
        line: usize,
        f: impl FnOnce(&mut Self) -> ScriptResult<T>,
    ) -> ScriptResult<T> {
        if self.depth >= MAX_NESTING {
            return Err(syntax(line, "blocks nested too deeply"));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Consume an `end <what>` line.
    fn expect_end(&mut self, what: &str, opened_at: usize) -> ScriptResult<()> {
        match self.lines.get(self.pos) {
            Some(line)
                if keyword(&line.tokens, 0) == Some("end")
                    && keyword(&line.tokens, 1) == Some(what)
                    && line.tokens.len() == 2 =>
            {
                self.pos += 1;
                Ok(())
            }
            Some(line) => Err(syntax(line.number, format!("expected `end {what}`"))),
            None => Err(syntax(opened_at, format!("missing `end {what}`"))),
        }
    }

    fn statement(&mut self, line: &Line) -> ScriptResult<Stmt> {
        let n = line.number;
        let tokens = &line.tokens;
        match keyword(tokens, 0) {
            Some("output") => {
                let mut exprs = ExprParser::new(&tokens[1..], n);
                let mut args = vec![exprs.expr()?];
                while exprs.eat(&Token::Comma) {
                    args.push(exprs.expr()?);
                }
                exprs.finish()?;
                Ok(Stmt::Output { line: n, args })
            }
            Some("input") => {
                let target = match &tokens[1..] {
                    [Token::Ident(name)] if !is_reserved(name) => {
                        InputTarget::Variable(name.clone())
                    }
                    [] => return Err(syntax(n, "expected `input NAME` or `input \"prompt\"`")),
                    prompt => {
                        let mut exprs = ExprParser::new(prompt, n);
                        let prompt = exprs.expr()?;
                        exprs.finish()?;
                        InputTarget::Prompt(prompt)
                    }
                };
                Ok(Stmt::Input { line: n, target })
            }
            Some("if") => self.nested(n, |p| p.if_statement(line)),
            Some("loop") => self.nested(n, |p| p.loop_statement(line)),
            Some(name) if !is_reserved(name) && tokens.get(1) == Some(&Token::Eq) => {
                let mut exprs = ExprParser::new(&tokens[2..], n);
                let value = exprs.expr()?;
                exprs.finish()?;
                Ok(Stmt::Assign {
                    line: n,
                    name: name.to_string(),
                    value,
                })
            }
            _ => Err(syntax(n, "unrecognized statement")),
        }
    }

    /// Condition between `start` and a trailing `then`.
    fn condition_then(tokens: &[Token], start: usize, line: usize) -> ScriptResult<Expr> {
        let mut exprs = ExprParser::new(&tokens[start..], line);
        let cond = exprs.expr()?;
        if !exprs.eat_keyword("then") {
            return Err(syntax(line, "expected `then`"));
        }
        exprs.finish()?;
        Ok(cond)
    }

    fn if_statement(&mut self, line: &Line) -> ScriptResult<Stmt> {
        let n = line.number;
        let mut branches = vec![(Self::condition_then(&line.tokens, 1, n)?, self.block()?)];
        let mut otherwise = Vec::new();

        while let Some(next) = self.lines.get(self.pos).cloned() {
            if keyword(&next.tokens, 0) != Some("else") {
                break;
            }
            self.pos += 1;
            if keyword(&next.tokens, 1) == Some("if") {
                let cond = Self::condition_then(&next.tokens, 2, next.number)?;
                branches.push((cond, self.block()?));
            } else if next.tokens.len() == 1 {
                otherwise = self.block()?;
                break;
            } else {
                return Err(syntax(next.number, "expected `else` or `else if ... then`"));
            }
        }

        self.expect_end("if", n)?;
        Ok(Stmt::If {
            line: n,
            branches,
            otherwise,
        })
    }

    fn loop_statement(&mut self, line: &Line) -> ScriptResult<Stmt> {
        let n = line.number;
        let tokens = &line.tokens;
        let stmt = match keyword(tokens, 1) {
            Some(kind @ ("while" | "until")) => {
                let mut exprs = ExprParser::new(&tokens[2..], n);
                let cond = exprs.expr()?;
                exprs.finish()?;
                let body = self.block()?;
                Stmt::LoopCond {
                    line: n,
                    cond,
                    until: kind == "until",
                    body,
                }
            }
            Some(var) if !is_reserved(var) && keyword(tokens, 2) == Some("from") => {
                let mut exprs = ExprParser::new(&tokens[3..], n);
                let from = exprs.expr()?;
                if !exprs.eat_keyword("to") {
                    return Err(syntax(n, "expected `to`"));
                }
                let to = exprs.expr()?;
                exprs.finish()?;
                let var = var.to_string();
                let body = self.block()?;
                Stmt::LoopRange {
                    line: n,
                    var,
                    from,
                    to,
                    body,
                }
            }
            _ => {
                return Err(syntax(
                    n,
                    "expected `loop NAME from A to B`, `loop while` or `loop until`",
                ));
            }
        };
        self.expect_end("loop", n)?;
        Ok(stmt)
    }
}

// =============================================================================
// Expressions
// =============================================================================

struct ExprParser<'t> {
    tokens: &'t [Token],
    pos: usize,
    line: usize,
    depth: usize,
    operators: usize,
}

impl<'t> ExprParser<'t> {
    fn new(tokens: &'t [Token], line: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            line,
            depth: 0,
            operators: 0,
        }
    }

    /// Parse with `f` one nesting level deeper.
    fn nested(&mut self, f: impl FnOnce(&mut Self) -> ScriptResult<Expr>) -> ScriptResult<Expr> {
        if self.depth >= MAX_NESTING {
            return Err(syntax(self.line, "expression nested too deeply"));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn binary(&mut self, op: BinOp, lhs: Expr, rhs: Expr) -> ScriptResult<Expr> {
        self.operators += 1;
        if self.operators > MAX_OPERATORS {
            return Err(syntax(self.line, "expression has too many operators"));
        }
        Ok(Expr::Binary(op, Box::new(lhs), Box::new(rhs)))
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, word: &str) -> bool {
        match self.peek() {
            Some(Token::Ident(w)) if w == word => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn finish(&self) -> ScriptResult<()> {
        match self.peek() {
            None => Ok(()),
            Some(tok) => Err(syntax(self.line, format!("unexpected {tok:?}"))),
        }
    }

    fn expr(&mut self) -> ScriptResult<Expr> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> ScriptResult<Expr> {
        let mut lhs = self.and_expr()?;
        while self.eat_keyword("or") {
            let rhs = self.and_expr()?;
            lhs = self.binary(BinOp::Or, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> ScriptResult<Expr> {
        let mut lhs = self.not_expr()?;
        while self.eat_keyword("and") {
            let rhs = self.not_expr()?;
            lhs = self.binary(BinOp::And, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn not_expr(&mut self) -> ScriptResult<Expr> {
        if self.eat_keyword("not") {
            let inner = self.nested(|p| p.not_expr())?;
            return Ok(Expr::Unary(UnOp::Not, Box::new(inner)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> ScriptResult<Expr> {
        let mut lhs = self.additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Eq) => BinOp::Eq,
                Some(Token::NotEq) => BinOp::NotEq,
                Some(Token::Less) => BinOp::Less,
                Some(Token::LessEq) => BinOp::LessEq,
                Some(Token::Greater) => BinOp::Greater,
                Some(Token::GreaterEq) => BinOp::GreaterEq,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.additive()?;
            lhs = self.binary(op, lhs, rhs)?;
        }
    }

    fn additive(&mut self) -> ScriptResult<Expr> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.multiplicative()?;
            lhs = self.binary(op, lhs, rhs)?;
        }
    }

    fn multiplicative(&mut self) -> ScriptResult<Expr> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                Some(Token::Ident(w)) if w == "mod" => BinOp::Mod,
                Some(Token::Ident(w)) if w == "div" => BinOp::IntDiv,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = self.binary(op, lhs, rhs)?;
        }
    }

    fn unary(&mut self) -> ScriptResult<Expr> {
        if self.eat(&Token::Minus) {
            let inner = self.nested(|p| p.unary())?;
            return Ok(Expr::Unary(UnOp::Neg, Box::new(inner)));
        }
        self.primary()
    }

    fn primary(&mut self) -> ScriptResult<Expr> {
        let tok = self
            .peek()
            .ok_or_else(|| syntax(self.line, "expected an expression"))?;
        self.pos += 1;
        match tok {
            Token::Number(n) => Ok(Expr::Number(*n)),
            Token::Str(s) => Ok(Expr::Text(s.clone())),
            Token::Ident(w) if w == "true" => Ok(Expr::Bool(true)),
            Token::Ident(w) if w == "false" => Ok(Expr::Bool(false)),
            Token::Ident(w) if !is_reserved(w) => Ok(Expr::Var(w.clone())),
            Token::Ident(w) if w == "input" => {
                if !self.eat(&Token::LParen) {
                    return Err(syntax(self.line, "expected `(` after `input`"));
                }
                let prompt = self.nested(|p| p.expr())?;
                if !self.eat(&Token::RParen) {
                    return Err(syntax(self.line, "expected `)`"));
                }
                Ok(Expr::Input(Box::new(prompt)))
            }
            Token::LParen => {
                let inner = self.nested(|p| p.expr())?;
                if !self.eat(&Token::RParen) {
                    return Err(syntax(self.line, "expected `)`"));
                }
                Ok(inner)
            }
            other => Err(syntax(self.line, format!("unexpected {other:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> Box<Expr> {
        Box::new(Expr::Var(name.into()))
    }

    #[test]
    fn test_precedence() {
        let program = parse("X = A + B * 2").unwrap();
        assert_eq!(
            program,
            vec![Stmt::Assign {
                line: 1,
                name: "X".into(),
                value: Expr::Binary(
                    BinOp::Add,
                    var("A"),
                    Box::new(Expr::Binary(BinOp::Mul, var("B"), Box::new(Expr::Number(2.0)))),
                ),
            }]
        );
    }

    #[test]
    fn test_input_forms() {
        let program = parse("input NAME\ninput \"Your value:\"").unwrap();
        assert_eq!(
            program,
            vec![
                Stmt::Input {
                    line: 1,
                    target: InputTarget::Variable("NAME".into())
                },
                Stmt::Input {
                    line: 2,
                    target: InputTarget::Prompt(Expr::Text("Your value:".into()))
                },
            ]
        );
    }

    #[test]
    fn test_if_else_chain() {
        let src =
            "if X > 1 then\n output 1\nelse if X = 1 then\n output 2\nelse\n output 3\nend if";
        let program = parse(src).unwrap();
        match &program[0] {
            Stmt::If {
                branches, otherwise, ..
            } => {
                assert_eq!(branches.len(), 2);
                assert_eq!(otherwise.len(), 1);
                assert_eq!(otherwise[0].line(), 6);
            }
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn test_loops() {
        let src = "loop I from 1 to 3\n output I\nend loop\nloop until I > 5\n I = I + 1\nend loop";
        let program = parse(src).unwrap();
        assert!(matches!(
            &program[0],
            Stmt::LoopRange { var, body, .. } if var == "I" && body.len() == 1
        ));
        assert!(matches!(&program[1], Stmt::LoopCond { until: true, line: 4, .. }));
    }

    #[test]
    fn test_missing_end() {
        let err = parse("loop while true\n output 1").unwrap_err();
        assert_eq!(
            err,
            ScriptError::Syntax {
                line: 1,
                message: "missing `end loop`".into()
            }
        );
    }

    #[test]
    fn test_stray_end() {
        let err = parse("output 1\nend if").unwrap_err();
        assert!(matches!(err, ScriptError::Syntax { line: 2, .. }));
    }

    #[test]
    fn test_mismatched_end() {
        let err = parse("if true then\n output 1\nend loop").unwrap_err();
        assert!(matches!(err, ScriptError::Syntax { line: 3, .. }));
    }

    #[test]
    fn test_reserved_word_is_not_a_variable() {
        assert!(parse("output then").is_err());
        assert!(parse("input loop").is_err());
    }

    #[test]
    fn test_input_expression() {
        let program = parse("X = input(\"Your value:\")\ninput(\"Again\")").unwrap();
        assert_eq!(
            program[0],
            Stmt::Assign {
                line: 1,
                name: "X".into(),
                value: Expr::Input(Box::new(Expr::Text("Your value:".into()))),
            }
        );
        assert!(matches!(&program[1], Stmt::Input { target: InputTarget::Prompt(_), .. }));
        assert!(parse("X = input \"no parens\"").is_err());
    }

    fn syntax_message(source: &str) -> (usize, String) {
        match parse(source).unwrap_err() {
            ScriptError::Syntax { line, message } => (line, message),
            other => panic!("expected a syntax error, got {other:?}"),
        }
    }

    #[test]
    fn test_deep_parentheses_are_rejected() {
        let src = format!("X = 1\noutput {}1{}", "(".repeat(200_000), ")".repeat(200_000));
        assert_eq!(syntax_message(&src), (2, "expression nested too deeply".to_string()));

        let ok = format!("output {}1{}", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
        assert!(parse(&ok).is_ok());
    }

    #[test]
    fn test_deep_unary_chains_are_rejected() {
        let (_, message) = syntax_message(&format!("output {}true", "not ".repeat(10_000)));
        assert_eq!(message, "expression nested too deeply");
        let (_, message) = syntax_message(&format!("output {}1", "-".repeat(10_000)));
        assert_eq!(message, "expression nested too deeply");
    }

    #[test]
    fn test_long_operator_chain_is_rejected() {
        let src = format!("output 1{}", " + 1".repeat(MAX_OPERATORS + 1));
        assert_eq!(syntax_message(&src).1, "expression has too many operators");
        let src = format!("output 1{}", " + 1".repeat(MAX_OPERATORS));
        assert!(parse(&src).is_ok());
    }

    #[test]
    fn test_deep_blocks_are_rejected() {
        let depth = 10_000;
        let src = format!("{}{}", "loop while true\n".repeat(depth), "end loop\n".repeat(depth));
        let (line, message) = syntax_message(&src);
        assert_eq!(message, "blocks nested too deeply");
        assert_eq!(line, MAX_NESTING + 1);
    }
}
