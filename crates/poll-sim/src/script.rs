//! Scenario scripts
//!
//! One step per line, each starting with the time offset in seconds:
//!
//! ```text
//! # comments and blank lines are ignored
//! @0    poll "Next raid" Siege "Drop pods" Manhunters
//! @1.5  chat alice subscriber/12,vip/1 #2 drop them
//! @2    chat bob - 1
//! @30   close
//! ```
//!
//! Poll titles and choices use shell-style quoting. Chat text is everything
//! after the badge list, verbatim, so `#2` is not mistaken for a comment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// Result type alias for script loading
pub type ScriptResult<T> = Result<T, ScriptError>;

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Failed to read script {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Line {line}: {message}")]
    Syntax { line: usize, message: String },
}

/// What a step does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptAction {
    /// Schedule a poll whose choices record the outcome when they win
    Poll { title: String, choices: Vec<String> },
    /// A chat message from a viewer, with raw badge tags
    Chat {
        user: String,
        badges: Vec<String>,
        text: String,
    },
    /// Operator closes the current poll early
    Close,
}

impl ScriptAction {
    /// Whether the frame driver has to perform this step itself
    pub fn needs_driver(&self) -> bool {
        matches!(self, ScriptAction::Close)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptStep {
    pub at: Duration,
    pub action: ScriptAction,
}

/// A parsed scenario, steps sorted by time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    steps: Vec<ScriptStep>,
}

impl Script {
    pub fn load(path: impl AsRef<Path>) -> ScriptResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&source)
    }

    pub fn parse(source: &str) -> ScriptResult<Self> {
        let mut steps = Vec::new();
        for (index, raw) in source.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let step = parse_line(line).map_err(|message| ScriptError::Syntax {
                line: index + 1,
                message,
            })?;
            steps.push(step);
        }
        // Stable, so same-time steps keep file order
        steps.sort_by_key(|step| step.at);
        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[ScriptStep] {
        &self.steps
    }

    /// Offset of the last step
    pub fn duration(&self) -> Duration {
        self.steps.last().map(|step| step.at).unwrap_or_default()
    }

    /// Number of polls the script schedules
    pub fn poll_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| matches!(step.action, ScriptAction::Poll { .. }))
            .count()
    }

    /// Split into (producer steps, driver steps)
    pub fn split(self) -> (Vec<ScriptStep>, Vec<ScriptStep>) {
        self.steps
            .into_iter()
            .partition(|step| !step.action.needs_driver())
    }
}

/// Split off the first whitespace-delimited word
fn next_word(input: &str) -> Option<(&str, &str)> {
    let input = input.trim_start();
    if input.is_empty() {
        return None;
    }
    match input.find(char::is_whitespace) {
        Some(end) => Some((&input[..end], &input[end..])),
        None => Some((input, "")),
    }
}

fn parse_line(line: &str) -> Result<ScriptStep, String> {
    let (time, rest) = next_word(line).ok_or("empty step")?;
    let seconds: f64 = time
        .strip_prefix('@')
        .ok_or_else(|| format!("expected @<seconds>, got {time:?}"))?
        .parse()
        .map_err(|_| format!("invalid time {time:?}"))?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(format!("invalid time {time:?}"));
    }
    let at = Duration::from_secs_f64(seconds);

    let (command, rest) = next_word(rest).ok_or("missing command")?;
    let action = match command {
        "poll" => {
            let mut words = shlex::split(rest)
                .ok_or("unbalanced quotes")?
                .into_iter();
            let title = words.next().ok_or("poll needs a title")?;
            ScriptAction::Poll {
                title,
                choices: words.collect(),
            }
        }
        "chat" => {
            let (user, rest) = next_word(rest).ok_or("chat needs a user")?;
            let (badges, rest) = next_word(rest).ok_or("chat needs a badge list or '-'")?;
            let text = rest.trim();
            if text.is_empty() {
                return Err("chat needs a message".to_string());
            }
            let badges = match badges {
                "-" => Vec::new(),
                list => list
                    .split(',')
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_string)
                    .collect(),
            };
            ScriptAction::Chat {
                user: user.to_string(),
                badges,
                text: text.to_string(),
            }
        }
        "close" => {
            if !rest.trim().is_empty() {
                return Err("close takes no arguments".to_string());
            }
            ScriptAction::Close
        }
        other => return Err(format!("unknown command {other:?}")),
    };

    Ok(ScriptStep { at, action })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_all_commands() {
        let script = Script::parse(
            r#"
            # a raid vote
            @0 poll "Next raid" Siege "Drop pods"
            @1.5 chat Alice subscriber/12,vip/1 #2 drop them
            @2 chat bob - 1
            @30 close
            "#,
        )
        .unwrap();

        assert_eq!(script.steps().len(), 4);
        assert_eq!(
            script.steps()[0].action,
            ScriptAction::Poll {
                title: "Next raid".to_string(),
                choices: vec!["Siege".to_string(), "Drop pods".to_string()],
            }
        );
        assert_eq!(script.steps()[1].at, Duration::from_millis(1500));
        assert_eq!(
            script.steps()[1].action,
            ScriptAction::Chat {
                user: "Alice".to_string(),
                badges: vec!["subscriber/12".to_string(), "vip/1".to_string()],
                text: "#2 drop them".to_string(),
            }
        );
        assert_eq!(script.steps()[3].action, ScriptAction::Close);
        assert_eq!(script.duration(), Duration::from_secs(30));
        assert_eq!(script.poll_count(), 1);
    }

    #[test]
    fn test_steps_sorted_stably() {
        let script = Script::parse("@5 close\n@1 chat a - first\n@1 chat b - second\n").unwrap();
        let (producer, driver) = script.split();
        assert_eq!(producer.len(), 2);
        assert_eq!(driver.len(), 1);
        assert!(matches!(&producer[0].action, ScriptAction::Chat { user, .. } if user == "a"));
    }

    #[test]
    fn test_syntax_errors_report_line() {
        let cases = [
            "0 close",
            "@-1 close",
            "@1 dance",
            "@1 poll",
            "@1 poll \"unterminated",
            "@1 chat bob -",
            "@1 close now",
        ];
        for case in cases {
            let err = Script::parse(&format!("# header\n{case}")).unwrap_err();
            assert!(
                matches!(err, ScriptError::Syntax { line: 2, .. }),
                "{case:?} gave {err}"
            );
        }
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "@0 poll Weather Rain Sun").unwrap();
        let script = Script::load(file.path()).unwrap();
        assert_eq!(script.poll_count(), 1);

        assert!(matches!(
            Script::load("/definitely/not/here.poll"),
            Err(ScriptError::Io { .. })
        ));
    }
}
