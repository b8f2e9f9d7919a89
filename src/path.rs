// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine where the policy file lives, and read it.
//!
//! # Policy File Lookup
//!
//! The policy file is always named `conventions.toml`. Lookup starts at a
//! given directory, usually the current working directory, and walks up
//! through each parent directory until a policy file is found. Thus, the
//! policy file at the root of a multi-unit build is found from any unit
//! directory nested inside of it.
//!
//! If no policy file is found that way, then the user-level policy file at
//! `$XDG_CONFIG_HOME/convres/conventions.toml` is used instead, if it exists.
//!
//! # See Also
//!
//! - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)

use crate::config::{ConfigError, PolicyDefinition};

use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
};
use tracing::{debug, instrument};

/// File name of policy file.
pub const POLICY_FILE_NAME: &str = "conventions.toml";

/// Find policy file starting from target directory.
///
/// Checks `start` and each of its ancestors in order, and falls back to the
/// user-level policy file.
///
/// # Errors
///
/// - Return [`PathError::NoPolicyFile`] if no policy file exists.
#[instrument(skip(start), level = "debug")]
pub fn find_policy_file(start: impl AsRef<Path>) -> Result<PathBuf> {
    let start = start.as_ref();
    for dir in start.ancestors() {
        let candidate = dir.join(POLICY_FILE_NAME);
        debug!("check for policy file at {:?}", candidate.display());
        if candidate.is_file() {
            return Ok(candidate);
        }
    }

    if let Some(candidate) = user_policy_file().filter(|path| path.is_file()) {
        debug!("use user-level policy file at {:?}", candidate.display());
        return Ok(candidate);
    }

    Err(PathError::NoPolicyFile {
        start: start.to_path_buf(),
    })
}

/// Determine absolute path to user-level policy file.
///
/// Uses `$XDG_CONFIG_HOME/convres/conventions.toml`. Does not check if the
/// path returned actually exists. Returns [`None`] if the configuration
/// directory of the user cannot be determined.
pub fn user_policy_file() -> Option<PathBuf> {
    dirs::config_dir().map(|path| path.join("convres").join(POLICY_FILE_NAME))
}

/// Read and parse policy file at target path.
///
/// # Errors
///
/// - Return [`PathError::ReadPolicyFile`] if policy file cannot be read.
/// - Return [`PathError::ParsePolicyFile`] if policy file is invalid.
pub fn read_policy_file(path: impl AsRef<Path>) -> Result<PolicyDefinition> {
    let path = path.as_ref();
    debug!("read policy file at {:?}", path.display());
    let content = read_to_string(path).map_err(|err| PathError::ReadPolicyFile {
        source: err,
        policy_path: path.to_path_buf(),
    })?;

    content.parse().map_err(|err| PathError::ParsePolicyFile {
        source: err,
        policy_path: path.to_path_buf(),
    })
}

/// Policy file path error types.
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    /// No policy file in target directory, its ancestors, or user directory.
    #[error("cannot find conventions.toml in {:?} or any parent directory", start.display())]
    NoPolicyFile { start: PathBuf },

    /// Policy file cannot be read from.
    #[error("failed to read policy file at {:?}", policy_path.display())]
    ReadPolicyFile {
        #[source]
        source: std::io::Error,
        policy_path: PathBuf,
    },

    /// Policy file cannot be parsed.
    #[error("failed to parse policy file at {:?}", policy_path.display())]
    ParsePolicyFile {
        #[source]
        source: ConfigError,
        policy_path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = PathError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;
    use std::{env::current_dir, fs};

    #[sealed_test]
    fn find_policy_file_in_ancestor() -> anyhow::Result<()> {
        let root = current_dir()?;
        let unit_dir = root.join("modules").join("one");
        fs::create_dir_all(&unit_dir)?;
        fs::write(root.join(POLICY_FILE_NAME), "[conventions]\n")?;

        let result = find_policy_file(&unit_dir)?;
        assert_eq!(result, root.join(POLICY_FILE_NAME));

        Ok(())
    }

    #[sealed_test]
    fn find_policy_file_prefers_closest() -> anyhow::Result<()> {
        let root = current_dir()?;
        let nested = root.join("nested");
        fs::create_dir_all(&nested)?;
        fs::write(root.join(POLICY_FILE_NAME), "[conventions]\n")?;
        fs::write(nested.join(POLICY_FILE_NAME), "[conventions]\n")?;

        let result = find_policy_file(&nested)?;
        assert_eq!(result, nested.join(POLICY_FILE_NAME));

        Ok(())
    }

    #[sealed_test(env = [("XDG_CONFIG_HOME", "/nonexistent/convres-test")])]
    fn find_policy_file_missing() -> anyhow::Result<()> {
        let root = current_dir()?;
        let result = find_policy_file(&root);
        assert!(matches!(result, Err(PathError::NoPolicyFile { .. })));

        Ok(())
    }

    #[sealed_test]
    fn read_policy_file_reports_path() -> anyhow::Result<()> {
        let path = current_dir()?.join(POLICY_FILE_NAME);
        fs::write(&path, "[conventions]\ndefault = 42\n")?;

        let result = read_policy_file(&path);
        assert!(matches!(
            result,
            Err(PathError::ParsePolicyFile { policy_path, .. }) if policy_path == path
        ));

        let result = read_policy_file(current_dir()?.join("missing.toml"));
        assert!(matches!(result, Err(PathError::ReadPolicyFile { .. })));

        Ok(())
    }
}
