use specpilot_core::{prompt::Prompter, Result, SpecpilotError};
use std::io::{BufRead, Stderr, StdinLock, Write};

/// Asks on the terminal. Questions go to stderr so `--json` output on stdout
/// stays parseable. End of input counts as cancelling.
pub struct TerminalPrompter<R, W> {
    input: R,
    output: W,
}

impl TerminalPrompter<StdinLock<'static>, Stderr> {
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stderr())
    }
}

impl<R: BufRead, W: Write> TerminalPrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, question: &str) -> Result<String> {
        write!(self.output, "{question}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.output)?;
            return Err(SpecpilotError::Cancelled);
        }
        Ok(line.trim().to_string())
    }
}

impl<R: BufRead, W: Write> Prompter for TerminalPrompter<R, W> {
    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool> {
        let hint = if default { "Y/n" } else { "y/N" };
        loop {
            let answer = self.ask(&format!("{prompt} ({hint}): "))?;
            match answer.to_lowercase().as_str() {
                "" => return Ok(default),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => writeln!(self.output, "Please answer y or n.")?,
            }
        }
    }

    fn select(&mut self, prompt: &str, options: &[String], default: usize) -> Result<usize> {
        writeln!(self.output, "{prompt}:")?;
        for (i, option) in options.iter().enumerate() {
            writeln!(self.output, "  {}. {option}", i + 1)?;
        }
        let n = options.len();
        loop {
            let answer = self.ask(&format!("Select (1-{n}) [{}]: ", default + 1))?;
            if answer.is_empty() {
                return Ok(default);
            }
            match answer.parse::<usize>() {
                Ok(choice) if (1..=n).contains(&choice) => return Ok(choice - 1),
                _ => writeln!(self.output, "Please select a number from 1 to {n}.")?,
            }
        }
    }

    fn input(&mut self, prompt: &str, default: Option<&str>) -> Result<String> {
        let question = match default {
            Some(d) if !d.is_empty() => format!("{prompt} [{d}]: "),
            _ => format!("{prompt}: "),
        };
        let answer = self.ask(&question)?;
        if answer.is_empty() {
            return Ok(default.unwrap_or_default().to_string());
        }
        Ok(answer)
    }
}
