//! Binding menu entries to something that can run them

use crate::config::Config;
use crate::context::MacroContext;
use crate::menu_item::MacroEntry;
use crate::params::Params;
use anyhow::{Result, bail};
use serde::Deserialize;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

/// Executes one kind of macro script
pub trait ScriptRunner {
    fn run(&self, script: &Path, ctx: &mut dyn MacroContext, params: &Params) -> Result<()>;
}

/// Runs a script through an external interpreter
///
/// Command line: `program args... <macro script> [<open script>] [params.args...]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommandRunner {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandRunner {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    fn command_line(&self, script: &Path, open_script: Option<&Path>, params: &Params) -> Vec<String> {
        let mut args = self.args.clone();
        args.push(script.to_string_lossy().into_owned());
        if let Some(open_script) = open_script {
            args.push(open_script.to_string_lossy().into_owned());
        }
        args.extend(params.get_str_list("args"));
        args
    }
}

impl ScriptRunner for CommandRunner {
    fn run(&self, script: &Path, ctx: &mut dyn MacroContext, params: &Params) -> Result<()> {
        let args = self.command_line(script, ctx.script_path(), params);
        let output = ctx.run_process(&self.program, &args)?;
        if !output.success {
            let status = output
                .status
                .map_or_else(|| "signal".to_string(), |code| code.to_string());
            bail!(
                "{} exited with status {}: {}",
                self.program,
                status,
                output.stderr.trim()
            );
        }
        Ok(())
    }
}

/// Outcome of invoking one menu entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Completed,
    /// The macro failed; the message was already reported to the user
    Failed(String),
    /// Separators can't be run
    NotInvocable,
}

/// Dispatches menu entries to runners by script extension
#[derive(Default)]
pub struct MacroHost {
    runners: HashMap<String, Box<dyn ScriptRunner>>,
    params: HashMap<String, Params>,
}

impl MacroHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the configured interpreters and per-macro params
    pub fn from_config(config: &Config) -> Self {
        let mut host = Self::new();
        for (extension, runner) in &config.runners {
            host.register_runner(extension, runner.clone());
        }
        for (key, params) in &config.params {
            host.set_params(key, params.clone());
        }
        host
    }

    pub fn register_runner(&mut self, extension: &str, runner: impl ScriptRunner + 'static) {
        let extension = extension.trim_start_matches('.').to_ascii_lowercase();
        log::debug!("Registered runner for .{} scripts", extension);
        self.runners.insert(extension, Box::new(runner));
    }

    /// Params for the macro at `relative_path` (`/`-separated, as in [`MacroEntry::key`])
    pub fn set_params(&mut self, relative_path: &str, params: Params) {
        self.params.insert(relative_path.to_string(), params);
    }

    pub fn params_for(&self, entry: &MacroEntry) -> Params {
        self.params
            .get(&entry.key())
            .cloned()
            .unwrap_or_else(Params::empty)
    }

    fn runner_for(&self, script: &Path) -> Option<&dyn ScriptRunner> {
        let extension = script.extension()?.to_str()?.to_ascii_lowercase();
        self.runners.get(&extension).map(|runner| runner.as_ref())
    }

    /// Run `entry`, reporting any failure through `ctx`
    ///
    /// Never returns an error or unwinds: a failing or panicking macro
    /// must not take the editor down with it.
    pub fn invoke(&self, entry: &MacroEntry, root: &Path, ctx: &mut dyn MacroContext) -> Invocation {
        if entry.is_separator {
            return Invocation::NotInvocable;
        }

        let script = root.join(&entry.relative_path);
        let Some(runner) = self.runner_for(&script) else {
            let message = format!("No runner registered for {}", script.display());
            ctx.report_error(&entry.display_name, &message);
            return Invocation::Failed(message);
        };

        let params = self.params_for(entry);
        if !params.is_empty() {
            log::debug!("Using configured params for {}", entry.key());
        }
        log::info!("Running macro '{}' ({})", entry.display_name, script.display());

        let result = panic::catch_unwind(AssertUnwindSafe(|| runner.run(&script, ctx, &params)));
        let message = match result {
            Ok(Ok(())) => return Invocation::Completed,
            Ok(Err(e)) => format!("{:#}", e),
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                format!("Macro panicked: {}", reason)
            }
        };

        ctx.report_error(&entry.display_name, &message);
        Invocation::Failed(message)
    }
}
