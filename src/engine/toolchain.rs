//! Go toolchain commands for a checkout.
//!
//! A `GoToolchain` wraps one source tree (the temporary clone) and knows how to
//! build it, snapshot it with toolstash, install over it, and run the
//! comparison build against the snapshot.
//!
//! This module only assembles commands; running them is the executor's job.

use std::path::{Path, PathBuf};

use super::executor::{CommandSpec, Step};
use crate::core::{Options, ToolchainEnv};
use crate::{CheckError, CheckResult};

/// File make.bash reads the toolchain version from.
pub const VERSION_FILE: &str = "VERSION";
/// Placeholder version, so make.bash never needs a tagged release.
pub const VERSION_PLACEHOLDER: &str = "devel";
/// Compile wrapper that compares output against the saved toolchain.
pub const TOOLEXEC: &str = "toolstash -cmp";
/// Package whose source directory contains the buildall script.
pub const TOOLSTASH_PACKAGE: &str = "golang.org/x/tools/cmd/toolstash";

/// `go env GOROOT`, run against the ambient toolchain.
pub fn locate_goroot_command() -> CommandSpec {
    CommandSpec::new(Step::LocateGoroot, "go").args(["env", "GOROOT"])
}

/// `go list -f {{.Dir}} golang.org/x/tools/cmd/toolstash`
pub fn locate_toolstash_command() -> CommandSpec {
    CommandSpec::new(Step::LocateBuildall, "go").args(["list", "-f", "{{.Dir}}", TOOLSTASH_PACKAGE])
}

/// The buildall script inside the toolstash package directory.
pub fn buildall_in(package_dir: &Path) -> PathBuf {
    package_dir.join("buildall")
}

/// A Go source tree checked out at some revision.
#[derive(Debug, Clone)]
pub struct GoToolchain {
    root: PathBuf,
}

impl GoToolchain {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        GoToolchain { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn src_dir(&self) -> PathBuf {
        self.root.join("src")
    }

    /// Write the placeholder VERSION file at the root of the tree.
    pub fn write_version_marker(&self) -> CheckResult<PathBuf> {
        let path = self.root.join(VERSION_FILE);
        std::fs::write(&path, VERSION_PLACEHOLDER)
            .map_err(|e| CheckError::io(format!("failed to write {}", path.display()), e))?;
        Ok(path)
    }

    /// `./make.bash` in `<root>/src`.
    pub fn make_bash(&self, step: Step, env: Option<&ToolchainEnv>) -> CommandSpec {
        let cmd = CommandSpec::new(step, "./make.bash").current_dir(self.src_dir());
        match env {
            Some(env) => cmd.with_env(env),
            None => cmd,
        }
    }

    /// `toolstash save`: record the current compiler binaries.
    pub fn toolstash_save(&self, env: &ToolchainEnv) -> CommandSpec {
        CommandSpec::new(Step::SaveSnapshot, "toolstash").arg("save").with_env(env)
    }

    /// `go install std cmd`: the lighter rebuild for the target.
    pub fn install_std_cmd(&self, env: &ToolchainEnv) -> CommandSpec {
        CommandSpec::new(Step::InstallTarget, "go")
            .args(["install", "std", "cmd"])
            .current_dir(self.src_dir())
            .with_env(env)
    }

    /// `go build -a -toolexec "toolstash -cmp" [flags] std cmd`.
    pub fn compare_build(&self, options: &Options, env: &ToolchainEnv) -> CommandSpec {
        let mut cmd = CommandSpec::new(Step::Compare, "go").args(["build", "-a", "-toolexec", TOOLEXEC]);
        if let Some(gcflags) = options.gcflags() {
            cmd = cmd.arg(format!("-gcflags={gcflags}"));
        }
        if options.race {
            cmd = cmd.arg("-race");
        }
        if options.work {
            cmd = cmd.arg("-work");
        }
        cmd.args(["std", "cmd"]).current_dir(self.src_dir()).with_env(env)
    }

    /// Run the all-platforms comparison script.
    pub fn buildall(&self, script: &Path, env: &ToolchainEnv) -> CommandSpec {
        CommandSpec::new(Step::CompareAll, script)
            .current_dir(self.src_dir())
            .with_env(env)
    }
}
