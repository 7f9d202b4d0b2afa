use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::db::IN_MEMORY;
use crate::error::{MergeError, Result};

/// Checks run before any input is staged
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Validate the output path against the resolved inputs
    pub fn validate_output_path(output: &Path, inputs: &BTreeSet<PathBuf>) -> Result<()> {
        if output.as_os_str().is_empty() {
            return Err(MergeError::InvalidOutput("output path cannot be empty".to_string()));
        }

        if output.is_dir() {
            return Err(MergeError::InvalidOutput(format!("{} is a directory", output.display())));
        }

        if inputs.contains(output) {
            return Err(MergeError::InvalidOutput(format!(
                "{} is also an input file",
                output.display()
            )));
        }

        match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => Err(MergeError::InvalidOutput(
                format!("parent directory {} does not exist", parent.display()),
            )),
            _ => Ok(()),
        }
    }

    /// Validate the staging store location
    pub fn validate_staging_path(database_path: &str, output: &Path, inputs: &BTreeSet<PathBuf>) -> Result<()> {
        if database_path.trim().is_empty() {
            return Err(MergeError::InvalidConfig("staging database path cannot be empty".to_string()));
        }
        if database_path == IN_MEMORY {
            return Ok(());
        }

        let staging = Path::new(database_path);
        if staging == output || inputs.iter().any(|input| input == staging) {
            return Err(MergeError::InvalidConfig(format!(
                "staging database {database_path} would overwrite an input or the output"
            )));
        }

        Ok(())
    }
}
