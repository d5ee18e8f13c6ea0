//! Environment configuration, read once at driver entry.
//!
//! Nothing in the encoders touches the environment directly; everything
//! they need (the pseudo-Boolean encoder binary, the project checkout for
//! provenance, the machine name, the scratch directory for temporary
//! files) travels in a [`Config`] built before the first phase starts.

use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the external pseudo-Boolean cardinality encoder binary.
    pub pb_encoder: Option<PathBuf>,
    /// Checkout whose git metadata is embedded in output headers.
    pub project_dir: Option<PathBuf>,
    /// Machine name for the reproducibility header.
    pub hostname: String,
    /// Directory in which temporary OPB/CNF files are created.
    pub scratch_dir: PathBuf,
}

impl Config {
    /// Reads `PBLIB_DIR` and `PROJECT_DIR`, resolves the hostname and
    /// pins the scratch directory to the current working directory.
    pub fn from_env() -> Config {
        let pb_encoder = env::var_os("PBLIB_DIR")
            .map(|dir| PathBuf::from(dir).join("pbencoder"));
        let project_dir = env::var_os("PROJECT_DIR").map(PathBuf::from);
        Config {
            pb_encoder,
            project_dir,
            hostname: resolve_hostname(),
            scratch_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Queries git in the configured project directory. Returns
    /// `(remote url, branch, commit)` when all three are discoverable.
    pub fn git_provenance(&self) -> Option<(String, String, String)> {
        let dir = self.project_dir.as_deref()?;
        let git_dir = dir.join(".git");
        if !git_dir.exists() {
            return None;
        }
        let remote = git_output(&git_dir, &["config", "--get", "remote.origin.url"])?;
        let branch = git_output(&git_dir, &["rev-parse", "--abbrev-ref", "HEAD"])?;
        let commit = git_output(&git_dir, &["log", "--format=%H", "-n", "1"])?;
        Some((remote, branch, commit))
    }
}

fn git_output(git_dir: &Path, args: &[&str]) -> Option<String> {
    let output = Command::new("git")
        .arg("--git-dir")
        .arg(git_dir)
        .args(args)
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn resolve_hostname() -> String {
    if let Ok(name) = env::var("HOSTNAME") {
        if !name.is_empty() {
            return name;
        }
    }
    Command::new("hostname")
        .output()
        .ok()
        .and_then(|out| String::from_utf8(out.stdout).ok())
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hostname_is_never_empty() {
        assert!(!resolve_hostname().is_empty());
    }

    #[test]
    fn provenance_absent_without_project_dir() {
        let config = Config {
            pb_encoder: None,
            project_dir: None,
            hostname: "test".into(),
            scratch_dir: PathBuf::from("."),
        };
        assert!(config.git_provenance().is_none());
    }
}
