//! Command execution abstraction.
//!
//! Every external tool the workflow touches (git, make.bash, go, toolstash,
//! buildall) is described as a `CommandSpec` and handed to an `Executor`.
//! `SystemExecutor` spawns real processes; `MockExecutor` records what it was
//! asked to run and can be told to fail at a given step.

use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::Mutex;

use tracing::debug;

use crate::core::ToolchainEnv;
use crate::{CheckError, CheckResult};

/// The workflow step a command belongs to. Used to tag errors and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    LocateGoroot,
    ResolveRevision,
    LocateBuildall,
    Clone,
    CheckoutBase,
    BuildBaseline,
    SaveSnapshot,
    CheckoutTarget,
    BuildTarget,
    InstallTarget,
    Compare,
    CompareAll,
}

impl Step {
    pub fn description(&self) -> &'static str {
        match self {
            Step::LocateGoroot => "locate GOROOT",
            Step::ResolveRevision => "resolve revision",
            Step::LocateBuildall => "locate buildall",
            Step::Clone => "clone repository",
            Step::CheckoutBase => "check out base",
            Step::BuildBaseline => "build baseline toolchain",
            Step::SaveSnapshot => "save toolstash",
            Step::CheckoutTarget => "check out target",
            Step::BuildTarget => "build target toolchain",
            Step::InstallTarget => "install target std and cmd",
            Step::Compare => "comparison build",
            Step::CompareAll => "all-platforms comparison build",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A fully assembled external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub step: Step,
    pub program: OsString,
    pub args: Vec<OsString>,
    /// Working directory; `None` inherits ours
    pub dir: Option<PathBuf>,
    /// Variables set on top of the inherited environment
    pub env: Vec<(OsString, OsString)>,
}

impl CommandSpec {
    pub fn new(step: Step, program: impl AsRef<OsStr>) -> Self {
        CommandSpec {
            step,
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            dir: None,
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    /// Point the command at a specific toolchain via `PATH` and `GOROOT`.
    pub fn with_env(mut self, env: &ToolchainEnv) -> Self {
        self.env.extend(env.vars());
        self
    }

    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    /// Arguments as (lossy) strings.
    pub fn arg_strings(&self) -> Vec<String> {
        self.args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    /// Value of an environment override, if this command sets one.
    pub fn env_var(&self, key: &str) -> Option<&OsStr> {
        self.env
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_os_str())
    }

    /// Shell-quoted command line, for logs and error messages.
    pub fn display(&self) -> String {
        std::iter::once(self.program_name())
            .chain(self.arg_strings())
            .map(|s| shlex::try_quote(&s).map(|q| q.into_owned()).unwrap_or(s))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        cmd
    }

    fn failed(&self, status: String, code: Option<i32>) -> CheckError {
        CheckError::StepFailed {
            step: self.step,
            command: self.display(),
            status,
            code,
        }
    }

    fn spawn_failed(&self, source: std::io::Error) -> CheckError {
        CheckError::Spawn {
            step: self.step,
            command: self.display(),
            source,
        }
    }
}

/// Capability to run external commands.
pub trait Executor: Send + Sync {
    /// Run a command to completion, streaming its output to our stderr.
    fn run(&self, cmd: &CommandSpec) -> CheckResult<()>;

    /// Run a command and return its trimmed stdout.
    fn output(&self, cmd: &CommandSpec) -> CheckResult<String>;
}

/// Runs commands as real child processes.
///
/// Child stdout is redirected to our stderr so that stdout carries only the
/// final result line.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemExecutor;

impl SystemExecutor {
    pub fn new() -> Self {
        SystemExecutor
    }
}

fn describe_status(status: ExitStatus) -> (String, Option<i32>) {
    (status.to_string(), status.code())
}

impl Executor for SystemExecutor {
    fn run(&self, cmd: &CommandSpec) -> CheckResult<()> {
        debug!(step = %cmd.step, dir = ?cmd.dir, "+ {}", cmd.display());

        let status = cmd
            .to_command()
            .stdin(Stdio::null())
            .stdout(Stdio::from(std::io::stderr()))
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| cmd.spawn_failed(e))?;

        if !status.success() {
            let (status, code) = describe_status(status);
            return Err(cmd.failed(status, code));
        }
        Ok(())
    }

    fn output(&self, cmd: &CommandSpec) -> CheckResult<String> {
        debug!(step = %cmd.step, dir = ?cmd.dir, "+ {}", cmd.display());

        let output = cmd
            .to_command()
            .stdin(Stdio::null())
            .output()
            .map_err(|e| cmd.spawn_failed(e))?;

        if !output.status.success() {
            let (status, code) = describe_status(output.status);
            let stderr = String::from_utf8_lossy(&output.stderr);
            let status = match stderr.trim() {
                "" => status,
                detail => format!("{status}: {detail}"),
            };
            return Err(cmd.failed(status, code));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Executor for tests: records invocations and returns canned results.
///
/// Revision specs passed to `git rev-parse` are looked up in a table; other
/// captured output is keyed by step. A clone creates its destination
/// directory so later filesystem writes into the checkout succeed.
#[derive(Debug, Default)]
pub struct MockExecutor {
    revisions: HashMap<String, String>,
    outputs: HashMap<Step, String>,
    failures: HashMap<Step, i32>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `git rev-parse <spec>` print `id`.
    pub fn with_revision(mut self, spec: impl Into<String>, id: impl Into<String>) -> Self {
        self.revisions.insert(spec.into(), id.into());
        self
    }

    /// Set the captured output of a non-git step.
    pub fn with_output(mut self, step: Step, output: impl Into<String>) -> Self {
        self.outputs.insert(step, output.into());
        self
    }

    /// Make every command of `step` exit with status 1.
    pub fn failing_at(self, step: Step) -> Self {
        self.failing_at_with_code(step, 1)
    }

    pub fn failing_at_with_code(mut self, step: Step, code: i32) -> Self {
        self.failures.insert(step, code);
        self
    }

    /// Commands seen so far, in order.
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.lock_calls().clone()
    }

    pub fn steps(&self) -> Vec<Step> {
        self.lock_calls().iter().map(|c| c.step).collect()
    }

    fn lock_calls(&self) -> std::sync::MutexGuard<'_, Vec<CommandSpec>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, cmd: &CommandSpec) -> CheckResult<()> {
        self.lock_calls().push(cmd.clone());
        match self.failures.get(&cmd.step) {
            Some(&code) => Err(cmd.failed(format!("exit status: {code}"), Some(code))),
            None => Ok(()),
        }
    }
}

impl Executor for MockExecutor {
    fn run(&self, cmd: &CommandSpec) -> CheckResult<()> {
        self.record(cmd)?;
        if cmd.step == Step::Clone {
            if let Some(dest) = cmd.args.last() {
                std::fs::create_dir_all(Path::new(dest))
                    .map_err(|e| CheckError::io("mock clone", e))?;
            }
        }
        Ok(())
    }

    fn output(&self, cmd: &CommandSpec) -> CheckResult<String> {
        self.record(cmd)?;
        if cmd.step == Step::ResolveRevision {
            let spec = cmd
                .args
                .last()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            return self.revisions.get(&spec).cloned().ok_or_else(|| {
                cmd.failed(
                    format!("exit status: 128: fatal: ambiguous argument '{spec}': unknown revision"),
                    Some(128),
                )
            });
        }
        self.outputs
            .get(&cmd.step)
            .cloned()
            .ok_or_else(|| CheckError::Message(format!("mock: no output configured for {}", cmd.step)))
    }
}
