//! Run options, captured once at startup and never mutated afterwards.

use std::path::PathBuf;

use crate::{CheckError, CheckResult};

/// Default target revision spec.
pub const DEFAULT_COMMIT: &str = "HEAD";

/// Options for a single toolstash-check run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Target revision spec (the commit under test)
    pub commit: String,
    /// Explicit base revision spec; `None` means "parent of the target"
    pub base: Option<String>,
    /// Run the all-platforms build instead of the single comparison build
    pub all: bool,
    /// Extra flags forwarded to the compiler during the comparison build
    pub gcflags: Option<String>,
    /// Build the comparison target with the race detector
    pub race: bool,
    /// Rebuild the target toolchain with make.bash instead of `go install`
    pub remake: bool,
    /// Source repository; `None` means the ambient toolchain root
    pub repo: Option<PathBuf>,
    /// Log each step and command to stderr
    pub verbose: bool,
    /// Keep the comparison build's work directory
    pub work: bool,
    /// Explicit path to the all-platforms build script
    pub buildall: Option<PathBuf>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            commit: DEFAULT_COMMIT.to_string(),
            base: None,
            all: false,
            gcflags: None,
            race: false,
            remake: false,
            repo: None,
            verbose: false,
            work: false,
            buildall: None,
        }
    }
}

impl Options {
    /// Create options targeting the given revision spec.
    pub fn new(commit: impl Into<String>) -> Self {
        Options { commit: commit.into(), ..Default::default() }
    }

    /// Compare against an explicit base instead of the target's parent.
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    /// Set extra compiler flags. An empty string clears them.
    pub fn with_gcflags(mut self, gcflags: impl Into<String>) -> Self {
        let gcflags = gcflags.into();
        self.gcflags = if gcflags.is_empty() { None } else { Some(gcflags) };
        self
    }

    pub fn with_repo(mut self, repo: impl Into<PathBuf>) -> Self {
        self.repo = Some(repo.into());
        self
    }

    pub fn with_buildall(mut self, script: impl Into<PathBuf>) -> Self {
        self.buildall = Some(script.into());
        self
    }

    pub fn all(mut self) -> Self {
        self.all = true;
        self
    }

    pub fn race(mut self) -> Self {
        self.race = true;
        self
    }

    pub fn remake(mut self) -> Self {
        self.remake = true;
        self
    }

    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    pub fn work(mut self) -> Self {
        self.work = true;
        self
    }

    /// Extra compiler flags, ignoring an empty value.
    pub fn gcflags(&self) -> Option<&str> {
        self.gcflags.as_deref().filter(|f| !f.is_empty())
    }

    /// Reject flag combinations that cannot be honored together.
    ///
    /// The all-platforms build takes no per-build arguments, so it excludes
    /// `race`, `work`, and `gcflags`.
    pub fn validate(&self) -> CheckResult<()> {
        if self.commit.trim().is_empty() {
            return Err(CheckError::Usage("commit must not be empty".into()));
        }
        if matches!(&self.base, Some(base) if base.trim().is_empty()) {
            return Err(CheckError::Usage("--base must not be empty".into()));
        }
        if self.all {
            let mut conflicts = Vec::new();
            if self.race {
                conflicts.push("--race");
            }
            if self.work {
                conflicts.push("--work");
            }
            if self.gcflags().is_some() {
                conflicts.push("--gcflags");
            }
            if !conflicts.is_empty() {
                return Err(CheckError::Usage(format!(
                    "--all cannot be used with {}",
                    conflicts.join(", ")
                )));
            }
        } else if self.buildall.is_some() {
            return Err(CheckError::Usage("--buildall requires --all".into()));
        }
        Ok(())
    }
}
