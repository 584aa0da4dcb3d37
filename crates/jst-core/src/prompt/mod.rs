//! Typed questions and the prompting capability
//!
//! Flows describe what they want to ask as [`Question`]s and hand them to a
//! [`Prompter`]. The terminal adapter lives in the `tui` module; tests use
//! [`ScriptedPrompter`].

use crate::validate::ValidationError;
use std::collections::{BTreeMap, VecDeque};
use std::io;
use thiserror::Error;

/// Checks a raw answer before it is accepted
pub type Validator = fn(&str) -> Result<(), ValidationError>;

#[derive(Debug, Error)]
pub enum QuestionError {
    #[error("Question '{key}' has no choices")]
    NoChoices { key: String },

    #[error("Default '{default}' of question '{key}' is not one of its choices")]
    DefaultNotAChoice { key: String, default: String },

    #[error("Default of question '{key}' is invalid: {source}")]
    InvalidDefault {
        key: String,
        #[source]
        source: ValidationError,
    },
}

/// What kind of input a question asks for
#[derive(Debug, Clone)]
pub enum QuestionKind {
    Text {
        default: Option<String>,
        validator: Option<Validator>,
    },
    Password {
        default: Option<String>,
        validator: Option<Validator>,
    },
    Select {
        choices: Vec<String>,
        default: Option<String>,
    },
    Checklist {
        choices: Vec<String>,
        defaults: Vec<String>,
    },
}

/// A question whose default has been checked against its validator or choices
#[derive(Debug, Clone)]
pub struct Question {
    key: String,
    message: String,
    kind: QuestionKind,
}

impl Question {
    pub fn text(
        key: &str,
        message: &str,
        default: Option<&str>,
        validator: Option<Validator>,
    ) -> Result<Self, QuestionError> {
        check_default(key, default, validator)?;
        Ok(Self::new(
            key,
            message,
            QuestionKind::Text {
                default: default.map(str::to_string),
                validator,
            },
        ))
    }

    pub fn password(
        key: &str,
        message: &str,
        default: Option<&str>,
        validator: Option<Validator>,
    ) -> Result<Self, QuestionError> {
        check_default(key, default, validator)?;
        Ok(Self::new(
            key,
            message,
            QuestionKind::Password {
                default: default.map(str::to_string),
                validator,
            },
        ))
    }

    pub fn select(
        key: &str,
        message: &str,
        choices: &[&str],
        default: Option<&str>,
    ) -> Result<Self, QuestionError> {
        let choices = check_choices(key, choices, default.as_slice())?;
        Ok(Self::new(
            key,
            message,
            QuestionKind::Select {
                choices,
                default: default.map(str::to_string),
            },
        ))
    }

    pub fn checklist(
        key: &str,
        message: &str,
        choices: &[&str],
        defaults: &[&str],
    ) -> Result<Self, QuestionError> {
        let choices = check_choices(key, choices, defaults)?;
        Ok(Self::new(
            key,
            message,
            QuestionKind::Checklist {
                choices,
                defaults: defaults.iter().map(|d| d.to_string()).collect(),
            },
        ))
    }

    fn new(key: &str, message: &str, kind: QuestionKind) -> Self {
        Self {
            key: key.to_string(),
            message: message.to_string(),
            kind,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &QuestionKind {
        &self.kind
    }
}

fn check_default(
    key: &str,
    default: Option<&str>,
    validator: Option<Validator>,
) -> Result<(), QuestionError> {
    if let (Some(default), Some(validator)) = (default, validator) {
        validator(default).map_err(|source| QuestionError::InvalidDefault {
            key: key.to_string(),
            source,
        })?;
    }
    Ok(())
}

fn check_choices(key: &str, choices: &[&str], defaults: &[&str]) -> Result<Vec<String>, QuestionError> {
    if choices.is_empty() {
        return Err(QuestionError::NoChoices { key: key.to_string() });
    }
    if let Some(default) = defaults.iter().find(|d| !choices.contains(d)) {
        return Err(QuestionError::DefaultNotAChoice {
            key: key.to_string(),
            default: default.to_string(),
        });
    }
    Ok(choices.iter().map(|c| c.to_string()).collect())
}

/// Result of a single prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompted<T> {
    Value(T),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Text(String),
    Many(Vec<String>),
}

impl Answer {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Answer::Text(value) => Some(value),
            Answer::Many(_) => None,
        }
    }

    pub fn as_many(&self) -> &[String] {
        match self {
            Answer::Many(values) => values,
            Answer::Text(_) => &[],
        }
    }
}

/// Answers keyed by question key
pub type Answers = BTreeMap<String, Answer>;

/// Something that can ask the operator for input
///
/// I/O failures are errors; the operator backing out is [`Prompted::Cancelled`].
pub trait Prompter {
    fn prompt_text(
        &mut self,
        message: &str,
        default: Option<&str>,
        validator: Option<Validator>,
    ) -> io::Result<Prompted<String>>;

    fn prompt_password(
        &mut self,
        message: &str,
        default: Option<&str>,
        validator: Option<Validator>,
    ) -> io::Result<Prompted<String>>;

    fn prompt_select(
        &mut self,
        message: &str,
        choices: &[String],
        default: Option<&str>,
    ) -> io::Result<Prompted<String>>;

    fn prompt_checklist(
        &mut self,
        message: &str,
        choices: &[String],
        defaults: &[String],
    ) -> io::Result<Prompted<Vec<String>>>;

    fn ask(&mut self, question: &Question) -> io::Result<Prompted<Answer>> {
        let message = question.message();
        let answer = match question.kind() {
            QuestionKind::Text { default, validator } => {
                self.prompt_text(message, default.as_deref(), *validator)?
                    .map(Answer::Text)
            }
            QuestionKind::Password { default, validator } => {
                self.prompt_password(message, default.as_deref(), *validator)?
                    .map(Answer::Text)
            }
            QuestionKind::Select { choices, default } => {
                self.prompt_select(message, choices, default.as_deref())?
                    .map(Answer::Text)
            }
            QuestionKind::Checklist { choices, defaults } => {
                self.prompt_checklist(message, choices, defaults)?
                    .map(Answer::Many)
            }
        };
        Ok(answer)
    }
}

impl<T> Prompted<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Prompted<U> {
        match self {
            Prompted::Value(value) => Prompted::Value(f(value)),
            Prompted::Cancelled => Prompted::Cancelled,
        }
    }
}

/// Ask every question in order, stopping at the first cancellation
pub fn ask_all(prompter: &mut dyn Prompter, questions: &[Question]) -> io::Result<Prompted<Answers>> {
    let mut answers = Answers::new();
    for question in questions {
        match prompter.ask(question)? {
            Prompted::Value(answer) => {
                answers.insert(question.key().to_string(), answer);
            }
            Prompted::Cancelled => return Ok(Prompted::Cancelled),
        }
    }
    Ok(Prompted::Value(answers))
}

/// One scripted reply of a [`ScriptedPrompter`]
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Many(Vec<String>),
    /// Accept the question's default
    Default,
    Cancel,
}

/// Replays canned replies in order; used to drive flows in tests
///
/// Replies are validated like terminal input would be, and running out of
/// replies is an error.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    replies: VecDeque<Reply>,
    asked: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: replies.into_iter().collect(),
            asked: Vec::new(),
        }
    }

    /// Messages of every prompt shown so far
    pub fn asked(&self) -> &[String] {
        &self.asked
    }

    fn next(&mut self, message: &str) -> io::Result<Reply> {
        self.asked.push(message.to_string());
        self.replies.pop_front().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("no scripted reply for '{}'", message),
            )
        })
    }

    fn single(
        &mut self,
        message: &str,
        default: Option<&str>,
        accept: impl Fn(&str) -> Result<(), String>,
    ) -> io::Result<Prompted<String>> {
        let value = match self.next(message)? {
            Reply::Text(value) => value,
            Reply::Default => default.map(str::to_string).ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, format!("'{}' has no default", message))
            })?,
            Reply::Many(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("'{}' expects a single value", message),
                ))
            }
            Reply::Cancel => return Ok(Prompted::Cancelled),
        };
        accept(&value).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        Ok(Prompted::Value(value))
    }
}

fn validated(validator: Option<Validator>) -> impl Fn(&str) -> Result<(), String> {
    move |value| match validator {
        Some(validator) => validator(value).map_err(|e| e.to_string()),
        None => Ok(()),
    }
}

impl Prompter for ScriptedPrompter {
    fn prompt_text(
        &mut self,
        message: &str,
        default: Option<&str>,
        validator: Option<Validator>,
    ) -> io::Result<Prompted<String>> {
        self.single(message, default, validated(validator))
    }

    fn prompt_password(
        &mut self,
        message: &str,
        default: Option<&str>,
        validator: Option<Validator>,
    ) -> io::Result<Prompted<String>> {
        self.single(message, default, validated(validator))
    }

    fn prompt_select(
        &mut self,
        message: &str,
        choices: &[String],
        default: Option<&str>,
    ) -> io::Result<Prompted<String>> {
        self.single(message, default, |value| {
            if choices.iter().any(|c| c == value) {
                Ok(())
            } else {
                Err(format!("'{}' is not a choice", value))
            }
        })
    }

    fn prompt_checklist(
        &mut self,
        message: &str,
        choices: &[String],
        defaults: &[String],
    ) -> io::Result<Prompted<Vec<String>>> {
        let values = match self.next(message)? {
            Reply::Many(values) => values,
            Reply::Default => defaults.to_vec(),
            Reply::Text(value) => vec![value],
            Reply::Cancel => return Ok(Prompted::Cancelled),
        };
        if let Some(unknown) = values.iter().find(|v| !choices.contains(v)) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("'{}' is not a choice", unknown),
            ));
        }
        Ok(Prompted::Value(values))
    }
}
