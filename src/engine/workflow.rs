//! The toolstash-check workflow.
//!
//! A run is a fixed sequence of external steps. Each must succeed before the
//! next starts, and the first failure ends the run:
//!
//! 1. validate options
//! 2. resolve target and base revisions
//! 3. clone the repository into a temporary directory
//! 4. check out the base, build it, and `toolstash save` it
//! 5. check out the target and rebuild (`go install std cmd` or `make.bash`)
//! 6. run the comparison build (or buildall with `--all`)
//!
//! The temporary directory is removed when the run ends, whichever step failed.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::executor::{Executor, Step};
use super::git;
use super::toolchain::{self, GoToolchain};
use crate::core::{AmbientEnv, Options, ToolchainEnv};
use crate::{CheckError, CheckResult};

/// Prefix of the temporary working directory.
pub const WORKDIR_PREFIX: &str = "toolstash-check-";

/// Progress through a run. Logged on each transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validated,
    RevisionsResolved,
    Cloned,
    BaselineBuilt,
    BaselineSnapshotted,
    TargetBuilt,
    Compared,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validated => "validated",
            Stage::RevisionsResolved => "revisions-resolved",
            Stage::Cloned => "cloned",
            Stage::BaselineBuilt => "baseline-built",
            Stage::BaselineSnapshotted => "baseline-snapshotted",
            Stage::TargetBuilt => "target-built",
            Stage::Compared => "compared",
        };
        f.write_str(name)
    }
}

fn enter(stage: Stage) {
    debug!(%stage, "stage reached");
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    /// Resolved target revision
    pub commit: String,
    /// Resolved base revision
    pub base: String,
    /// Whether the base came from `--base` rather than the target's parent
    pub explicit_base: bool,
}

impl CheckOutcome {
    /// The revision or revision range that was checked.
    pub fn range(&self) -> String {
        if self.explicit_base {
            format!("{}..{}", self.base, self.commit)
        } else {
            self.commit.clone()
        }
    }

    /// The line printed to stdout on success.
    pub fn summary(&self) -> String {
        format!("toolstash-check passed for {}", self.range())
    }
}

/// Revisions to compare, resolved against the source repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revisions {
    pub commit: String,
    pub base: String,
}

/// Resolve the target spec, then the base: the explicit spec when given,
/// otherwise the parent of the resolved target.
pub fn resolve_revisions(
    executor: &dyn Executor,
    repo: &Path,
    options: &Options,
) -> CheckResult<Revisions> {
    let commit = git::rev_parse(executor, repo, &options.commit)?;
    let base_spec = match &options.base {
        Some(base) => base.clone(),
        None => git::parent_of(&commit),
    };
    let base = git::rev_parse(executor, repo, &base_spec)?;
    Ok(Revisions { commit, base })
}

/// Pick the source repository: `--repo`, then `$GOROOT`, then `go env GOROOT`.
pub fn resolve_repo(
    executor: &dyn Executor,
    options: &Options,
    ambient: &AmbientEnv,
) -> CheckResult<PathBuf> {
    if let Some(repo) = options.repo.as_ref().or(ambient.goroot.as_ref()) {
        return Ok(repo.clone());
    }
    let goroot = executor.output(&toolchain::locate_goroot_command())?;
    if goroot.is_empty() {
        return Err(CheckError::Message(
            "cannot determine GOROOT; pass --repo".into(),
        ));
    }
    Ok(PathBuf::from(goroot))
}

/// Find the buildall script for `--all`, using the ambient toolchain.
fn resolve_buildall(executor: &dyn Executor, options: &Options) -> CheckResult<Option<PathBuf>> {
    if !options.all {
        return Ok(None);
    }
    if let Some(script) = &options.buildall {
        return Ok(Some(script.clone()));
    }
    let dir = executor.output(&toolchain::locate_toolstash_command())?;
    if dir.is_empty() {
        return Err(CheckError::Message(format!(
            "cannot locate {}; pass --buildall",
            toolchain::TOOLSTASH_PACKAGE
        )));
    }
    Ok(Some(toolchain::buildall_in(Path::new(&dir))))
}

/// Execute a full toolstash-check run.
///
/// Nothing touches the filesystem or spawns a process until the options
/// validate. Every error is returned to the caller after the working
/// directory has been released.
pub fn run(
    options: &Options,
    ambient: &AmbientEnv,
    executor: &dyn Executor,
) -> CheckResult<CheckOutcome> {
    options.validate()?;
    enter(Stage::Validated);

    let repo = resolve_repo(executor, options, ambient)?;
    let revisions = resolve_revisions(executor, &repo, options)?;
    debug!(repo = %repo.display(), commit = %revisions.commit, base = %revisions.base, "resolved");
    enter(Stage::RevisionsResolved);

    let buildall = resolve_buildall(executor, options)?;

    let workdir = tempfile::Builder::new()
        .prefix(WORKDIR_PREFIX)
        .tempdir()
        .map_err(|e| CheckError::io("failed to create working directory", e))?;
    let root = workdir.path().join("go");
    info!(workdir = %workdir.path().display(), "created working directory");

    executor.run(&git::clone(&repo, &root))?;
    enter(Stage::Cloned);

    let go = GoToolchain::new(&root);
    executor.run(&git::checkout(Step::CheckoutBase, &root, &revisions.base))?;
    go.write_version_marker()?;
    executor.run(&go.make_bash(Step::BuildBaseline, None))?;
    enter(Stage::BaselineBuilt);

    let env = ToolchainEnv::for_root(&root, ambient.path.as_deref())?;
    executor.run(&go.toolstash_save(&env))?;
    enter(Stage::BaselineSnapshotted);

    executor.run(&git::checkout(Step::CheckoutTarget, &root, &revisions.commit).with_env(&env))?;
    if options.remake {
        executor.run(&go.make_bash(Step::BuildTarget, Some(&env)))?;
    } else {
        executor.run(&go.install_std_cmd(&env))?;
    }
    enter(Stage::TargetBuilt);

    match &buildall {
        Some(script) => executor.run(&go.buildall(script, &env))?,
        None => executor.run(&go.compare_build(options, &env))?,
    }
    enter(Stage::Compared);

    let workdir_path = workdir.path().to_path_buf();
    workdir.close().map_err(|e| {
        CheckError::io(format!("failed to remove {}", workdir_path.display()), e)
    })?;

    Ok(CheckOutcome {
        commit: revisions.commit,
        base: revisions.base,
        explicit_base: options.base.is_some(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MockExecutor;

    fn ambient() -> AmbientEnv {
        AmbientEnv {
            goroot: Some(PathBuf::from("/src/go")),
            path: Some("/usr/bin".into()),
        }
    }

    fn mock() -> MockExecutor {
        MockExecutor::new()
            .with_revision("HEAD", "abc1234")
            .with_revision("abc1234^", "9f8e7d6")
    }

    #[test]
    fn test_summary_without_base() {
        let outcome = CheckOutcome {
            commit: "abc1234".into(),
            base: "9f8e7d6".into(),
            explicit_base: false,
        };
        assert_eq!(outcome.summary(), "toolstash-check passed for abc1234");
    }

    #[test]
    fn test_summary_with_base_reports_range() {
        let outcome = CheckOutcome {
            commit: "abc1234".into(),
            base: "def4567".into(),
            explicit_base: true,
        };
        assert_eq!(outcome.summary(), "toolstash-check passed for def4567..abc1234");
    }

    #[test]
    fn test_resolve_revisions_defaults_to_parent() {
        let revs = resolve_revisions(&mock(), Path::new("/src/go"), &Options::default()).unwrap();
        assert_eq!(revs.commit, "abc1234");
        assert_eq!(revs.base, "9f8e7d6");
    }

    #[test]
    fn test_resolve_repo_prefers_flag_then_goroot() {
        let exec = MockExecutor::new().with_output(Step::LocateGoroot, "/usr/lib/go");
        let flagged = Options::default().with_repo("/mine/go");
        assert_eq!(
            resolve_repo(&exec, &flagged, &ambient()).unwrap(),
            PathBuf::from("/mine/go")
        );
        assert_eq!(
            resolve_repo(&exec, &Options::default(), &ambient()).unwrap(),
            PathBuf::from("/src/go")
        );
        assert!(exec.calls().is_empty());

        assert_eq!(
            resolve_repo(&exec, &Options::default(), &AmbientEnv::default()).unwrap(),
            PathBuf::from("/usr/lib/go")
        );
        assert_eq!(exec.steps(), vec![Step::LocateGoroot]);
    }

    #[test]
    fn test_run_step_order() {
        let exec = mock();
        run(&Options::default(), &ambient(), &exec).unwrap();
        assert_eq!(
            exec.steps(),
            vec![
                Step::ResolveRevision,
                Step::ResolveRevision,
                Step::Clone,
                Step::CheckoutBase,
                Step::BuildBaseline,
                Step::SaveSnapshot,
                Step::CheckoutTarget,
                Step::InstallTarget,
                Step::Compare,
            ]
        );
    }

    #[test]
    fn test_run_invalid_options_runs_nothing() {
        let exec = mock();
        let err = run(&Options::default().all().race(), &ambient(), &exec).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(exec.calls().is_empty());
    }
}
