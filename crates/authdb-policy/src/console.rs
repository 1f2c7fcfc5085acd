use std::io::{self, BufRead, Stdout, Write};

/// Operator channel used for status lines and the confirmation prompt.
pub trait Console {
    /// Writes one line of output.
    fn say(&mut self, line: &str) -> io::Result<()>;

    /// Shows `prompt` and reads one line of input. `None` means end of input.
    fn ask(&mut self, prompt: &str) -> io::Result<Option<String>>;
}

/// Console over any reader/writer pair.
pub struct TermConsole<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> TermConsole<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

impl TermConsole<io::StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Console for TermConsole<R, W> {
    fn say(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.output, "{}", line)
    }

    fn ask(&mut self, prompt: &str) -> io::Result<Option<String>> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;

        let mut answer = String::new();
        if self.input.read_line(&mut answer)? == 0 {
            return Ok(None);
        }
        Ok(Some(answer))
    }
}

/// A reply confirms when its first non-blank character is `y` or `Y`.
pub fn is_affirmative(answer: &str) -> bool {
    answer
        .trim_start()
        .chars()
        .next()
        .is_some_and(|c| c.eq_ignore_ascii_case(&'y'))
}
