//! cliclack-backed prompter and install reporter

use crate::install::{InstallError, InstallReporter, ModuleName};
use crate::prompt::{Prompted, Prompter, Validator};
use cliclack::ProgressBar;
use std::cell::RefCell;
use std::io;

/// Maps cliclack's interrupt (Esc / Ctrl+C) to a cancelled prompt
fn cancellable<T>(result: io::Result<T>) -> io::Result<Prompted<T>> {
    match result {
        Ok(value) => Ok(Prompted::Value(value)),
        Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(Prompted::Cancelled),
        Err(e) => Err(e),
    }
}

/// Prompts on the terminal
#[derive(Debug, Default, Clone, Copy)]
pub struct ClackPrompter;

impl Prompter for ClackPrompter {
    fn prompt_text(
        &mut self,
        message: &str,
        default: Option<&str>,
        validator: Option<Validator>,
    ) -> io::Result<Prompted<String>> {
        let mut input = cliclack::input(message);
        if let Some(default) = default {
            input = input.placeholder(default).default_input(default);
        }
        if let Some(validator) = validator {
            input = input.validate(move |value: &String| validator(value).map_err(|e| e.to_string()));
        }
        cancellable(input.interact())
    }

    fn prompt_password(
        &mut self,
        message: &str,
        default: Option<&str>,
        validator: Option<Validator>,
    ) -> io::Result<Prompted<String>> {
        let has_default = default.is_some();
        let mut password = cliclack::password(message).mask('▪');
        if let Some(validator) = validator {
            // Empty input falls back to the default, which was checked up front
            password = password.validate(move |value: &String| {
                if value.is_empty() && has_default {
                    return Ok(());
                }
                validator(value).map_err(|e| e.to_string())
            });
        }

        let answer = cancellable(password.interact())?;
        Ok(answer.map(|value| match default {
            Some(default) if value.is_empty() => default.to_string(),
            _ => value,
        }))
    }

    fn prompt_select(
        &mut self,
        message: &str,
        choices: &[String],
        default: Option<&str>,
    ) -> io::Result<Prompted<String>> {
        let mut select = cliclack::select(message);
        for choice in choices {
            select = select.item(choice.clone(), choice, "");
        }
        if let Some(default) = default {
            select = select.initial_value(default.to_string());
        }
        cancellable(select.interact())
    }

    fn prompt_checklist(
        &mut self,
        message: &str,
        choices: &[String],
        defaults: &[String],
    ) -> io::Result<Prompted<Vec<String>>> {
        let mut multi = cliclack::multiselect(message);
        for choice in choices {
            multi = multi.item(choice.clone(), choice, "");
        }
        cancellable(multi.initial_values(defaults.to_vec()).required(false).interact())
    }
}

/// Shows one spinner per module as the batch progresses
#[derive(Default)]
pub struct ClackReporter {
    spinner: RefCell<Option<ProgressBar>>,
}

impl ClackReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl InstallReporter for ClackReporter {
    fn on_version(&self, version: &str) {
        let _ = cliclack::log::info(format!("Version: {}", version));
    }

    fn on_start(&self, module: &ModuleName) {
        let spinner = cliclack::spinner();
        spinner.start(format!("Installing module: {}", module));
        *self.spinner.borrow_mut() = Some(spinner);
    }

    fn on_success(&self, module: &ModuleName) {
        if let Some(spinner) = self.spinner.borrow_mut().take() {
            spinner.stop(format!("Installed module: {}", module));
        }
    }

    fn on_failure(&self, module: &ModuleName, error: &InstallError) {
        let message = format!("Failed to install {}: {}", module, error);
        match self.spinner.borrow_mut().take() {
            Some(spinner) => spinner.error(message),
            None => {
                let _ = cliclack::log::error(message);
            }
        }
    }
}
