//! Line-oriented tokenizer.
//!
//! Statements never span lines, so each source line is tokenized on its own
//! and carries its 1-based line number for diagnostics.

use crate::error::{ScriptError, ScriptResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Str(String),
    /// Identifiers and keywords; the parser tells them apart.
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Comma,
    Eq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
}

/// One non-empty source line.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub number: usize,
    pub tokens: Vec<Token>,
}

/// Tokenize `source`, dropping blank lines and `//` comments.
pub fn lex(source: &str) -> ScriptResult<Vec<Line>> {
    let mut lines = Vec::new();
    for (idx, text) in source.lines().enumerate() {
        let number = idx + 1;
        let tokens = LineLexer::new(text, number).run()?;
        if !tokens.is_empty() {
            lines.push(Line { number, tokens });
        }
    }
    Ok(lines)
}

struct LineLexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    tokens: Vec<Token>,
}

impl<'a> LineLexer<'a> {
    fn new(src: &'a str, line: usize) -> Self {
        Self {
            chars: src.chars().peekable(),
            line,
            tokens: Vec::new(),
        }
    }

    fn error(&self, message: impl Into<String>) -> ScriptError {
        ScriptError::Syntax {
            line: self.line,
            message: message.into(),
        }
    }

    fn run(mut self) -> ScriptResult<Vec<Token>> {
        while let Some(&ch) = self.chars.peek() {
            match ch {
                c if c.is_whitespace() => {
                    self.chars.next();
                }
                '/' => {
                    self.chars.next();
                    if self.chars.peek() == Some(&'/') {
                        break; // comment runs to end of line
                    }
                    self.tokens.push(Token::Slash);
                }
                '"' => self.lex_string()?,
                c if c.is_ascii_digit() || c == '.' => self.lex_number()?,
                c if c.is_alphabetic() || c == '_' => self.lex_ident(),
                _ => self.lex_symbol(ch)?,
            }
        }
        Ok(self.tokens)
    }

    fn lex_string(&mut self) -> ScriptResult<()> {
        self.chars.next(); // opening quote
        let mut text = String::new();
        loop {
            match self.chars.next() {
                Some('"') => break,
                Some(c) => text.push(c),
                None => return Err(self.error("unterminated string literal")),
            }
        }
        self.tokens.push(Token::Str(text));
        Ok(())
    }

    fn lex_number(&mut self) -> ScriptResult<()> {
        let mut text = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() || c == '.' {
                text.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        let value = text
            .parse::<f64>()
            .map_err(|_| self.error(format!("invalid number `{text}`")))?;
        self.tokens.push(Token::Number(value));
        Ok(())
    }

    fn lex_ident(&mut self) {
        let mut text = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_alphanumeric() || c == '_' {
                text.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        self.tokens.push(Token::Ident(text));
    }

    fn eat_eq(&mut self) -> bool {
        if self.chars.peek() == Some(&'=') {
            self.chars.next();
            true
        } else {
            false
        }
    }

    fn lex_symbol(&mut self, ch: char) -> ScriptResult<()> {
        self.chars.next();
        let token = match ch {
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            '=' => {
                self.eat_eq(); // `=` and `==` are the same operator
                Token::Eq
            }
            '!' if self.eat_eq() => Token::NotEq,
            '≠' => Token::NotEq,
            '<' if self.eat_eq() => Token::LessEq,
            '<' => Token::Less,
            '>' if self.eat_eq() => Token::GreaterEq,
            '>' => Token::Greater,
            '≤' => Token::LessEq,
            '≥' => Token::GreaterEq,
            other => return Err(self.error(format!("unexpected character `{other}`"))),
        };
        self.tokens.push(token);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lex_output_line() {
        let lines = lex("output \"Total:\", X + 1").unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(
            lines[0].tokens,
            vec![
                Token::Ident("output".into()),
                Token::Str("Total:".into()),
                Token::Comma,
                Token::Ident("X".into()),
                Token::Plus,
                Token::Number(1.0),
            ]
        );
    }

    #[test]
    fn test_skips_blank_and_comment_lines() {
        let lines = lex("\n// header\n  \nX = 2 // trailing\n").unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].number, 4);
        assert_eq!(lines[0].tokens.len(), 3);
    }

    #[test]
    fn test_comparison_operators() {
        let lines = lex("A <= B >= C != D == E ≠ F < G > H").unwrap();
        let ops: Vec<_> = lines[0]
            .tokens
            .iter()
            .filter(|t| !matches!(t, Token::Ident(_)))
            .cloned()
            .collect();
        assert_eq!(
            ops,
            vec![
                Token::LessEq,
                Token::GreaterEq,
                Token::NotEq,
                Token::Eq,
                Token::NotEq,
                Token::Less,
                Token::Greater,
            ]
        );
    }

    #[test]
    fn test_unterminated_string() {
        let err = lex("output \"oops").unwrap_err();
        assert_eq!(
            err,
            ScriptError::Syntax {
                line: 1,
                message: "unterminated string literal".into()
            }
        );
    }

    #[test]
    fn test_bad_character_reports_line() {
        let err = lex("X = 1\nY = 2 # 3").unwrap_err();
        assert!(matches!(err, ScriptError::Syntax { line: 2, .. }));
    }
}
