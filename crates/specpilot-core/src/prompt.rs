use crate::error::Result;

/// Questions the lifecycle asks the person running it.
///
/// The CLI answers from the terminal; `--force` swaps in [`AutoPrompter`].
pub trait Prompter {
    /// Yes/no question. `default` is the answer to an empty reply.
    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool>;

    /// Pick one of `options`, returning its index.
    fn select(&mut self, prompt: &str, options: &[String], default: usize) -> Result<usize>;

    /// Free-form answer; an empty reply yields `default` (or an empty string).
    fn input(&mut self, prompt: &str, default: Option<&str>) -> Result<String>;
}

/// Non-interactive answers: always yes, always the default.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoPrompter;

impl Prompter for AutoPrompter {
    fn confirm(&mut self, prompt: &str, _default: bool) -> Result<bool> {
        tracing::debug!(prompt, "auto-confirmed");
        Ok(true)
    }

    fn select(&mut self, prompt: &str, options: &[String], default: usize) -> Result<usize> {
        tracing::debug!(prompt, choice = ?options.get(default), "auto-selected");
        Ok(default)
    }

    fn input(&mut self, _prompt: &str, default: Option<&str>) -> Result<String> {
        Ok(default.unwrap_or_default().to_string())
    }
}

/// Replays canned answers in order; panics when a question was not expected.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct ScriptedPrompter {
    pub confirms: std::collections::VecDeque<bool>,
    pub selections: std::collections::VecDeque<usize>,
    pub inputs: std::collections::VecDeque<String>,
    pub asked: Vec<String>,
}

#[cfg(test)]
impl ScriptedPrompter {
    pub fn confirming(answers: &[bool]) -> Self {
        Self {
            confirms: answers.iter().copied().collect(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
impl Prompter for ScriptedPrompter {
    fn confirm(&mut self, prompt: &str, _default: bool) -> Result<bool> {
        self.asked.push(prompt.to_string());
        Ok(self
            .confirms
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected confirm: {prompt}")))
    }

    fn select(&mut self, prompt: &str, _options: &[String], _default: usize) -> Result<usize> {
        self.asked.push(prompt.to_string());
        Ok(self
            .selections
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected select: {prompt}")))
    }

    fn input(&mut self, prompt: &str, default: Option<&str>) -> Result<String> {
        self.asked.push(prompt.to_string());
        let answer = self
            .inputs
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected input: {prompt}"));
        if answer.is_empty() {
            return Ok(default.unwrap_or_default().to_string());
        }
        Ok(answer)
    }
}
