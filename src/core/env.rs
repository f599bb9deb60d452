//! Environment snapshot and the toolchain environment derived from it.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use crate::{CheckError, CheckResult};

pub const GOROOT: &str = "GOROOT";
pub const PATH: &str = "PATH";

/// The parts of the process environment the workflow reads, captured once
/// at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AmbientEnv {
    pub goroot: Option<PathBuf>,
    pub path: Option<OsString>,
}

impl AmbientEnv {
    /// Read `GOROOT` and `PATH` from the current process.
    pub fn detect() -> Self {
        AmbientEnv {
            goroot: std::env::var_os(GOROOT)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            path: std::env::var_os(PATH),
        }
    }
}

/// Environment overrides that point commands at a freshly built toolchain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainEnv {
    goroot: PathBuf,
    path: OsString,
}

impl ToolchainEnv {
    /// Put `<root>/bin` in front of the ambient search path and use `root` as
    /// `GOROOT`.
    pub fn for_root(root: &Path, ambient_path: Option<&OsStr>) -> CheckResult<Self> {
        let mut entries = vec![root.join("bin")];
        if let Some(existing) = ambient_path.filter(|p| !p.is_empty()) {
            entries.extend(std::env::split_paths(existing));
        }
        let path = std::env::join_paths(entries)
            .map_err(|e| CheckError::Message(format!("cannot build PATH for {}: {e}", root.display())))?;
        Ok(ToolchainEnv { goroot: root.to_path_buf(), path })
    }

    pub fn goroot(&self) -> &Path {
        &self.goroot
    }

    pub fn path(&self) -> &OsStr {
        &self.path
    }

    /// The variables to set on a child process.
    pub fn vars(&self) -> Vec<(OsString, OsString)> {
        vec![
            (OsString::from(PATH), self.path.clone()),
            (OsString::from(GOROOT), self.goroot.clone().into_os_string()),
        ]
    }
}
