//! Git commands: revision resolution, clone, checkout.

use std::path::Path;

use tracing::debug;

use super::executor::{CommandSpec, Executor, Step};
use crate::{CheckError, CheckResult};

/// Spec for the parent of a resolved revision.
pub fn parent_of(rev: &str) -> String {
    format!("{rev}^")
}

/// Build `git -C <repo> rev-parse --verify --short <spec>`.
pub fn rev_parse_command(repo: &Path, spec: &str) -> CommandSpec {
    CommandSpec::new(Step::ResolveRevision, "git")
        .arg("-C")
        .arg(repo)
        .args(["rev-parse", "--verify", "--short", spec])
}

/// Resolve a revision spec to a short, unambiguous commit id.
pub fn rev_parse(executor: &dyn Executor, repo: &Path, spec: &str) -> CheckResult<String> {
    let id = match executor.output(&rev_parse_command(repo, spec)) {
        Ok(id) => id,
        Err(CheckError::StepFailed { status, .. }) => {
            return Err(CheckError::Revision { spec: spec.to_string(), message: status });
        }
        Err(e) => return Err(e),
    };
    // --verify prints exactly one id; anything else is not a usable revision.
    let mut lines = id.lines().map(str::trim).filter(|l| !l.is_empty());
    match (lines.next(), lines.next()) {
        (Some(id), None) => {
            debug!(spec, id, "resolved revision");
            Ok(id.to_string())
        }
        (None, _) => Err(CheckError::Revision {
            spec: spec.to_string(),
            message: "git rev-parse printed nothing".into(),
        }),
        (Some(_), Some(_)) => Err(CheckError::Revision {
            spec: spec.to_string(),
            message: "spec names more than one revision".into(),
        }),
    }
}

/// `git clone <repo> <dest>`
pub fn clone(repo: &Path, dest: &Path) -> CommandSpec {
    CommandSpec::new(Step::Clone, "git").arg("clone").arg(repo).arg(dest)
}

/// `git checkout <rev>` inside `root`.
pub fn checkout(step: Step, root: &Path, rev: &str) -> CommandSpec {
    CommandSpec::new(step, "git").args(["checkout", rev]).current_dir(root)
}
