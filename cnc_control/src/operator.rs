//! Operator directives.
//!
//! In `Idle` the execution FSM asks a [`DirectiveSource`] what to do next.
//! The console source reads single-character codes `1`..`4`; tests and
//! batch runs use a scripted source.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

/// One operator decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// `1`: execute the program.
    Run,
    /// `2`: take the current position as the work offset.
    CaptureOffset,
    /// `3`: log positions and offset.
    ShowStatus,
    /// `4`: leave the session.
    Quit,
    /// Anything else, as typed.
    Unrecognized(String),
}

impl Directive {
    /// Map console input to a directive; surrounding whitespace is ignored.
    pub fn from_code(input: &str) -> Self {
        match input.trim() {
            "1" => Self::Run,
            "2" => Self::CaptureOffset,
            "3" => Self::ShowStatus,
            "4" => Self::Quit,
            other => Self::Unrecognized(other.to_string()),
        }
    }
}

/// Source of operator decisions.
pub trait DirectiveSource {
    /// Next directive. Blocks until one is available.
    fn next_directive(&mut self) -> io::Result<Directive>;
}

const MENU: &str = "\
1: run program
2: capture offset from current position
3: show status
4: quit
> ";

/// Interactive menu on a reader/writer pair. End of input means Quit.
pub struct ConsoleOperator<R, W> {
    input: R,
    prompt: W,
}

impl<R: BufRead, W: Write> ConsoleOperator<R, W> {
    pub fn new(input: R, prompt: W) -> Self {
        Self { input, prompt }
    }
}

impl ConsoleOperator<io::StdinLock<'static>, io::Stderr> {
    /// Prompt on stderr, keeping stdout for tick records.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> DirectiveSource for ConsoleOperator<R, W> {
    fn next_directive(&mut self) -> io::Result<Directive> {
        self.prompt.write_all(MENU.as_bytes())?;
        self.prompt.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(Directive::Quit);
        }
        Ok(Directive::from_code(&line))
    }
}

/// Fixed sequence of directives, then Quit.
#[derive(Debug, Clone, Default)]
pub struct ScriptedOperator {
    script: VecDeque<Directive>,
}

impl ScriptedOperator {
    pub fn new(script: impl IntoIterator<Item = Directive>) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }

    /// Directives not consumed yet.
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl DirectiveSource for ScriptedOperator {
    fn next_directive(&mut self) -> io::Result<Directive> {
        Ok(self.script.pop_front().unwrap_or(Directive::Quit))
    }
}
