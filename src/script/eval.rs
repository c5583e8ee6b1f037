//! Tree-walking evaluator.

use std::collections::HashMap;

use tracing::debug;

use super::ast::{BinOp, Expr, InputTarget, Stmt, UnOp};
use super::value::Value;
use super::{FINISHED_TEXT, Host, Interpreter, parser};
use crate::error::{ScriptError, ScriptResult};

/// 2^53: every integer with a smaller magnitude is exact as `f64`.
const MAX_LOOP_BOUND: f64 = 9_007_199_254_740_992.0;

/// Interpreter for the bundled pseudocode dialect.
///
/// Variables live for one run; every `run` starts from an empty scope.
#[derive(Debug, Default)]
pub struct ScriptInterpreter {
    vars: HashMap<String, Value>,
}

impl ScriptInterpreter {
    pub fn new() -> Self {
        Self::default()
    }

    fn exec_block(&mut self, stmts: &[Stmt], host: &mut dyn Host) -> ScriptResult<()> {
        for stmt in stmts {
            self.exec(stmt, host)?;
        }
        Ok(())
    }

    fn exec(&mut self, stmt: &Stmt, host: &mut dyn Host) -> ScriptResult<()> {
        if host.is_canceled() {
            return Err(ScriptError::Canceled);
        }
        match stmt {
            Stmt::Output { line, args } => {
                let mut text = String::new();
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        text.push(' ');
                    }
                    text.push_str(&self.eval(arg, *line, host)?.to_string());
                }
                host.write_output(&text);
            }
            Stmt::Input { line, target } => match target {
                InputTarget::Variable(name) => {
                    let answer = host.request_input(name);
                    self.vars.insert(name.clone(), Value::from_input(&answer));
                }
                InputTarget::Prompt(prompt) => {
                    let prompt = self.eval(prompt, *line, host)?.to_string();
                    host.request_input(&prompt);
                }
            },
            Stmt::Assign { line, name, value } => {
                let value = self.eval(value, *line, host)?;
                self.vars.insert(name.clone(), value);
            }
            Stmt::If {
                line,
                branches,
                otherwise,
            } => {
                for (cond, body) in branches {
                    if self.truthy(cond, *line, host)? {
                        return self.exec_block(body, host);
                    }
                }
                self.exec_block(otherwise, host)?;
            }
            Stmt::LoopRange {
                line,
                var,
                from,
                to,
                body,
            } => {
                let start = self.loop_bound(from, *line, host)?;
                let end = self.loop_bound(to, *line, host)?;
                for i in start..=end {
                    if host.is_canceled() {
                        return Err(ScriptError::Canceled);
                    }
                    self.vars.insert(var.clone(), Value::Number(i as f64));
                    self.exec_block(body, host)?;
                }
            }
            Stmt::LoopCond {
                line,
                cond,
                until,
                body,
            } => loop {
                if host.is_canceled() {
                    return Err(ScriptError::Canceled);
                }
                if self.truthy(cond, *line, host)? == *until {
                    break;
                }
                self.exec_block(body, host)?;
            },
        }
        Ok(())
    }

    fn truthy(&self, expr: &Expr, line: usize, host: &mut dyn Host) -> ScriptResult<bool> {
        match self.eval(expr, line, host)? {
            Value::Bool(b) => Ok(b),
            other => Err(ScriptError::TypeMismatch {
                line,
                message: format!("condition must be boolean, got {}", other.type_name()),
            }),
        }
    }

    fn number(&self, expr: &Expr, line: usize, host: &mut dyn Host) -> ScriptResult<f64> {
        match self.eval(expr, line, host)? {
            Value::Number(n) => Ok(n),
            other => Err(ScriptError::TypeMismatch {
                line,
                message: format!("expected a number, got {}", other.type_name()),
            }),
        }
    }

    /// A `loop ... from A to B` bound: a whole number below 2^53 in magnitude.
    fn loop_bound(&self, expr: &Expr, line: usize, host: &mut dyn Host) -> ScriptResult<i64> {
        let n = self.number(expr, line, host)?;
        if n.fract() != 0.0 {
            return Err(ScriptError::Runtime {
                line,
                message: format!("loop bound {} is not a whole number", Value::Number(n)),
            });
        }
        if n.abs() >= MAX_LOOP_BOUND {
            return Err(ScriptError::Runtime {
                line,
                message: format!("loop bound {} is out of range", Value::Number(n)),
            });
        }
        Ok(n as i64)
    }

    fn eval(&self, expr: &Expr, line: usize, host: &mut dyn Host) -> ScriptResult<Value> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Text(s) => Ok(Value::Text(s.clone())),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Var(name) => self
                .vars
                .get(name)
                .cloned()
                .ok_or_else(|| ScriptError::UnknownVariable {
                    line,
                    name: name.clone(),
                }),
            Expr::Input(prompt) => {
                let prompt = self.eval(prompt, line, host)?.to_string();
                Ok(Value::from_input(&host.request_input(&prompt)))
            }
            Expr::Unary(UnOp::Neg, inner) => Ok(Value::Number(-self.number(inner, line, host)?)),
            Expr::Unary(UnOp::Not, inner) => Ok(Value::Bool(!self.truthy(inner, line, host)?)),
            Expr::Binary(BinOp::And, lhs, rhs) => {
                Ok(Value::Bool(self.truthy(lhs, line, host)? && self.truthy(rhs, line, host)?))
            }
            Expr::Binary(BinOp::Or, lhs, rhs) => {
                Ok(Value::Bool(self.truthy(lhs, line, host)? || self.truthy(rhs, line, host)?))
            }
            Expr::Binary(op, lhs, rhs) => {
                let lhs = self.eval(lhs, line, host)?;
                let rhs = self.eval(rhs, line, host)?;
                binary(*op, lhs, rhs, line)
            }
        }
    }
}

fn binary(op: BinOp, lhs: Value, rhs: Value, line: usize) -> ScriptResult<Value> {
    use Value::{Bool, Number, Text};

    match (op, lhs, rhs) {
        (BinOp::Add, Number(a), Number(b)) => Ok(Number(a + b)),
        (BinOp::Add, a @ Text(_), b) | (BinOp::Add, a, b @ Text(_)) => Ok(Text(format!("{a}{b}"))),
        (BinOp::Eq, a, b) => Ok(Bool(a == b)),
        (BinOp::NotEq, a, b) => Ok(Bool(a != b)),
        (BinOp::Div | BinOp::Mod | BinOp::IntDiv, Number(_), Number(b)) if b == 0.0 => {
            Err(ScriptError::DivisionByZero { line })
        }
        (BinOp::Sub, Number(a), Number(b)) => Ok(Number(a - b)),
        (BinOp::Mul, Number(a), Number(b)) => Ok(Number(a * b)),
        (BinOp::Div, Number(a), Number(b)) => Ok(Number(a / b)),
        (BinOp::Mod, Number(a), Number(b)) => Ok(Number(a % b)),
        (BinOp::IntDiv, Number(a), Number(b)) => Ok(Number((a / b).floor())),
        (BinOp::Less, Number(a), Number(b)) => Ok(Bool(a < b)),
        (BinOp::LessEq, Number(a), Number(b)) => Ok(Bool(a <= b)),
        (BinOp::Greater, Number(a), Number(b)) => Ok(Bool(a > b)),
        (BinOp::GreaterEq, Number(a), Number(b)) => Ok(Bool(a >= b)),
        (BinOp::Less, Text(a), Text(b)) => Ok(Bool(a < b)),
        (BinOp::LessEq, Text(a), Text(b)) => Ok(Bool(a <= b)),
        (BinOp::Greater, Text(a), Text(b)) => Ok(Bool(a > b)),
        (BinOp::GreaterEq, Text(a), Text(b)) => Ok(Bool(a >= b)),
        (op, a, b) => Err(ScriptError::TypeMismatch {
            line,
            message: format!("cannot apply {op:?} to {} and {}", a.type_name(), b.type_name()),
        }),
    }
}

impl Interpreter for ScriptInterpreter {
    fn run(&mut self, source: &str, host: &mut dyn Host) -> ScriptResult<String> {
        self.vars.clear();
        let program = parser::parse(source)?;
        debug!(statements = program.len(), "program parsed");
        self.exec_block(&program, host)?;
        Ok(FINISHED_TEXT.to_string())
    }
}
