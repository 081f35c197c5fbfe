use std::io::{self, BufRead, Stdout, StdinLock, Write};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use crate::prompts;

/// Line-oriented console: prompts on `output`, answers from `input`.
pub struct Console<R, W> {
    input: R,
    output: W,
    colorful: bool,
    spinner: bool,
}

impl Console<StdinLock<'static>, Stdout> {
    pub fn stdio(colorful: bool, spinner: bool) -> Self {
        Console::new(io::stdin().lock(), io::stdout(), colorful, spinner)
    }
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W, colorful: bool, spinner: bool) -> Self {
        Self {
            input,
            output,
            colorful,
            spinner,
        }
    }

    pub fn colorful(&self) -> bool {
        self.colorful
    }

    pub fn say(&mut self, text: &str) -> Result<()> {
        writeln!(self.output, "{}", text).context("Failed to write to console")?;
        Ok(())
    }

    pub fn say_emphasis(&mut self, text: &str) -> Result<()> {
        if self.colorful {
            let styled = text.bright_green().bold().to_string();
            self.say(&styled)
        } else {
            self.say(text)
        }
    }

    /// Print `question`, then the answer prompt, and read one line.
    pub fn ask(&mut self, question: &str) -> Result<String> {
        self.say(question)?;
        write!(self.output, "{}", prompts::ANSWER_PROMPT).context("Failed to write to console")?;
        self.output.flush().context("Failed to flush console")?;

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("Failed to read user input")?;
        if read == 0 {
            bail!("Input closed before an answer was given");
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Spinner on stderr while a long call runs, if enabled.
    pub fn start_spinner(&self, message: &str) -> Option<ProgressBar> {
        if !self.spinner {
            return None;
        }
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            bar.set_style(style);
        }
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        Some(bar)
    }

    #[cfg(test)]
    pub fn into_output(self) -> W {
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn console(input: &str) -> Console<Cursor<Vec<u8>>, Vec<u8>> {
        Console::new(Cursor::new(input.as_bytes().to_vec()), Vec::new(), false, false)
    }

    #[test]
    fn test_ask_reads_one_line() {
        let mut console = console("Alice, 30 ans\r\nsecond line\n");
        let answer = console.ask("Votre profil ?").unwrap();
        assert_eq!(answer, "Alice, 30 ans");
        let output = String::from_utf8(console.into_output()).unwrap();
        assert_eq!(output, "Votre profil ?\nEntrez votre réponse:");
    }

    #[test]
    fn test_ask_on_closed_input_fails() {
        let mut console = console("");
        let err = console.ask("Votre profil ?").unwrap_err();
        assert!(err.to_string().contains("Input closed"));
    }

    #[test]
    fn test_spinner_disabled() {
        assert!(console("").start_spinner("...").is_none());
    }
}
