//! Syntax tree for the pseudocode subset.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    IntDiv,
    Eq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Text(String),
    Bool(bool),
    Var(String),
    Unary(UnOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    /// `input(prompt)`: asks the user and yields the parsed answer.
    Input(Box<Expr>),
}

/// Where an `input` statement stores the answer.
#[derive(Debug, Clone, PartialEq)]
pub enum InputTarget {
    /// `input NAME`: prompt is the name, answer is assigned to it.
    Variable(String),
    /// `input "Prompt"` or `input(expr)` as a statement: answer is discarded.
    Prompt(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Output {
        line: usize,
        args: Vec<Expr>,
    },
    Input {
        line: usize,
        target: InputTarget,
    },
    Assign {
        line: usize,
        name: String,
        value: Expr,
    },
    If {
        line: usize,
        branches: Vec<(Expr, Vec<Stmt>)>,
        otherwise: Vec<Stmt>,
    },
    LoopRange {
        line: usize,
        var: String,
        from: Expr,
        to: Expr,
        body: Vec<Stmt>,
    },
    /// `loop while c` (`until == false`) or `loop until c` (`until == true`).
    LoopCond {
        line: usize,
        cond: Expr,
        until: bool,
        body: Vec<Stmt>,
    },
}

impl Stmt {
    pub fn line(&self) -> usize {
        match self {
            Stmt::Output { line, .. }
            | Stmt::Input { line, .. }
            | Stmt::Assign { line, .. }
            | Stmt::If { line, .. }
            | Stmt::LoopRange { line, .. }
            | Stmt::LoopCond { line, .. } => *line,
        }
    }
}
