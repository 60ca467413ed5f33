use dialoguer::{theme::ColorfulTheme, Confirm};
use once_cell::sync::Lazy;
use rustyline::error::ReadlineError;
use strsim::levenshtein;
use thiserror::Error;
use tracing::warn;

use crate::{
    config::{Config, ConfigManager},
    currency::MoneyFormat,
    errors::PlannerError,
    planner::PlanDocument,
    utils::persistence::{PlanStorage, PlanStore},
    PlannerState,
};

use super::{commands, output, registry::CommandRegistry};

static REGISTRY: Lazy<CommandRegistry> = Lazy::new(commands::registry);

const SUGGESTION_DISTANCE: usize = 3;

/// Fatal shell errors that end the session.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] PlannerError),
    #[error("Line editor error: {0}")]
    Readline(#[from] ReadlineError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-command failures; reported and the shell keeps running.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    InvalidArguments(String),
    #[error(transparent)]
    Planner(#[from] PlannerError),
    #[error("Prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),
    #[error("exit requested")]
    ExitRequested,
}

pub type CommandResult = Result<(), CommandError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMode {
    Interactive,
    Script,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Exit,
}

pub struct ShellContext {
    pub mode: CliMode,
    pub state: PlannerState,
    pub storage: Box<dyn PlanStorage>,
    pub config: Config,
    pub config_manager: ConfigManager,
    pub money: MoneyFormat,
    pub plan_name: Option<String>,
    pub running: bool,
    theme: ColorfulTheme,
}

impl ShellContext {
    pub fn new(mode: CliMode) -> Result<Self, CliError> {
        let config_manager = ConfigManager::new()?;
        let config = config_manager.load()?;
        let storage = PlanStore::new(None, Some(config.backup_retention))?;
        let mut context = Self::with_parts(mode, config, config_manager, Box::new(storage));
        if mode == CliMode::Interactive {
            context.reopen_last_plan();
        }
        Ok(context)
    }

    fn reopen_last_plan(&mut self) {
        let Some(name) = self.config.last_opened_plan.clone() else {
            return;
        };
        match self.storage.load_named(&name) {
            Ok(document) => {
                self.state.replace_document(document);
                output::info(format!("Reopened plan `{name}`."));
                self.plan_name = Some(name);
            }
            Err(err) => warn!(plan = %name, error = %err, "could not reopen last plan"),
        }
    }

    pub fn with_parts(
        mode: CliMode,
        config: Config,
        config_manager: ConfigManager,
        storage: Box<dyn PlanStorage>,
    ) -> Self {
        let state = PlannerState::new(PlanDocument::default(), config.recompute_delay());
        Self {
            mode,
            state,
            storage,
            money: config.money_format(),
            config,
            config_manager,
            plan_name: None,
            running: true,
            theme: ColorfulTheme::default(),
        }
    }

    pub fn registry(&self) -> &'static CommandRegistry {
        &REGISTRY
    }

    pub fn command_names(&self) -> Vec<&'static str> {
        REGISTRY.names().collect()
    }

    pub fn prompt(&self) -> String {
        let name = self.plan_name.as_deref().unwrap_or("untitled");
        let marker = if self.state.is_dirty() { "*" } else { "" };
        format!("planner({name}{marker})> ")
    }

    pub(crate) fn dispatch(&mut self, command: &str, args: &[&str]) -> Result<LoopControl, CommandError> {
        match REGISTRY.handler(command) {
            Some(handler) => match handler(self, args) {
                Ok(()) => Ok(LoopControl::Continue),
                Err(CommandError::ExitRequested) => Ok(LoopControl::Exit),
                Err(err) => Err(err),
            },
            None => {
                self.suggest_command(command);
                Ok(LoopControl::Continue)
            }
        }
    }

    fn suggest_command(&self, input: &str) {
        output::warning(format!(
            "Unknown command `{input}`. Type `help` to see available commands."
        ));
        let closest = REGISTRY
            .names()
            .map(|name| (levenshtein(name, input), name))
            .min_by_key(|(distance, _)| *distance);
        if let Some((distance, name)) = closest {
            if distance <= SUGGESTION_DISTANCE {
                output::hint(format!("Did you mean `{name}`?"));
            }
        }
    }

    /// Asks a yes/no question; script mode never blocks and answers `default`.
    pub fn confirm(&self, prompt: &str, default: bool) -> Result<bool, CommandError> {
        if self.mode == CliMode::Script {
            return Ok(default);
        }
        Ok(Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(default)
            .interact()?)
    }

    pub fn confirm_exit(&self) -> Result<bool, CommandError> {
        if self.mode == CliMode::Script {
            return Ok(true);
        }
        self.confirm("Exit shell?", true)
    }

    pub fn report_error(&self, err: CommandError) {
        match err {
            CommandError::ExitRequested => {}
            CommandError::InvalidArguments(message) => {
                output::error(message);
                output::hint("Use `help <command>` for usage details.");
            }
            other => output::error(other),
        }
    }
}
