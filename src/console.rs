//! Terminal presentation of worker events.

use std::io::{self, Write};

use crossterm::queue;
use crossterm::style::{Print, PrintStyledContent, Stylize};

use crate::config::RunnerFlags;

/// Writes prompts, program output and run summaries to `W`.
pub struct Console<W: Write> {
    out: W,
    flags: RunnerFlags,
}

impl<W: Write> Console<W> {
    pub fn new(out: W, flags: RunnerFlags) -> Self {
        Self { out, flags }
    }

    fn color(&self) -> bool {
        self.flags.contains(RunnerFlags::COLOR)
    }

    /// Show an input prompt. No newline: the answer is typed on the same line.
    pub fn prompt(&mut self, prompt: &str) -> io::Result<()> {
        let text = format!("{prompt} ");
        if self.color() {
            queue!(self.out, PrintStyledContent(text.cyan().bold()))?;
        } else {
            queue!(self.out, Print(text))?;
        }
        self.out.flush()
    }

    /// Echo a submitted answer (when stdin is not an interactive terminal).
    pub fn echo(&mut self, answer: &str) -> io::Result<()> {
        if self.flags.contains(RunnerFlags::ECHO_INPUT) {
            writeln!(self.out, "{answer}")?;
        }
        Ok(())
    }

    pub fn output(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{text}")?;
        self.out.flush()
    }

    pub fn finished(&mut self, text: &str) -> io::Result<()> {
        if !self.flags.contains(RunnerFlags::SHOW_SUMMARY) {
            return Ok(());
        }
        if self.color() {
            queue!(self.out, PrintStyledContent(text.green()), Print("\n"))?;
        } else {
            writeln!(self.out, "{text}")?;
        }
        self.out.flush()
    }

    pub fn failed(&mut self, message: &str) -> io::Result<()> {
        let text = format!("Error: {message}");
        if self.color() {
            queue!(self.out, PrintStyledContent(text.red().bold()), Print("\n"))?;
        } else {
            writeln!(self.out, "{text}")?;
        }
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(flags: RunnerFlags) -> Console<Vec<u8>> {
        Console::new(Vec::new(), flags - RunnerFlags::COLOR)
    }

    fn text(console: Console<Vec<u8>>) -> String {
        String::from_utf8(console.into_inner()).unwrap()
    }

    #[test]
    fn test_plain_transcript() {
        let mut console = plain(RunnerFlags::default());
        console.output("Welcome").unwrap();
        console.prompt("NAME").unwrap();
        console.echo("Ada").unwrap();
        console.finished("Program finished successfully").unwrap();
        console.failed("line 2: division by zero").unwrap();

        assert_eq!(
            text(console),
            "Welcome\nNAME Program finished successfully\nError: line 2: division by zero\n"
        );
    }

    #[test]
    fn test_echo_and_summary_flags() {
        let mut console = plain(RunnerFlags::ECHO_INPUT);
        console.prompt("X").unwrap();
        console.echo("5").unwrap();
        console.finished("done").unwrap();
        assert_eq!(text(console), "X 5\n");
    }

    #[test]
    fn test_color_wraps_in_escapes() {
        let mut console = Console::new(Vec::new(), RunnerFlags::default());
        console.failed("boom").unwrap();
        let out = text(console);
        assert!(out.contains("Error: boom"));
        if std::env::var_os("NO_COLOR").is_none() {
            assert!(out.contains('\u{1b}'));
        }
    }
}
