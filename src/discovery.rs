//! Input path discovery.
//!
//! Turns command-line path arguments into the concrete, de-duplicated set of
//! export files to merge.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Component, Path, PathBuf};

use regex::{Captures, Regex};
use tracing::{debug, warn};

use crate::error::{MergeError, Result};

/// Expands and filters input arguments
pub struct InputResolver {
    extension: String,
    variable: Regex,
}

impl InputResolver {
    /// Resolver that keeps files ending in `.{extension}`
    pub fn new(extension: &str) -> Result<Self> {
        Ok(Self {
            extension: extension.trim_start_matches('.').to_string(),
            variable: Regex::new(r"\$(?:\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*))")?,
        })
    }

    /// Resolve every argument. Fails when nothing matches at all.
    pub fn resolve<S: AsRef<str>>(&self, arguments: &[S]) -> Result<BTreeSet<PathBuf>> {
        let mut inputs = BTreeSet::new();

        for argument in arguments {
            let path = self.expand_path(argument.as_ref())?;
            let candidates = if path.is_dir() {
                list_directory(&path)?
            } else {
                glob_paths(&path)?
            };
            let before = inputs.len();
            inputs.extend(candidates.into_iter().filter(|candidate| self.has_extension(candidate)));
            debug!(argument = argument.as_ref(), matched = inputs.len() - before, "Resolved input argument");
        }

        if inputs.is_empty() {
            let joined = arguments.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(", ");
            return Err(MergeError::NoInputFiles(joined));
        }
        Ok(inputs)
    }

    /// Expand `~` and environment variables, then make the path absolute.
    pub fn expand_path(&self, raw: &str) -> Result<PathBuf> {
        let expanded = self.expand_variables(raw);
        let expanded = expand_home(&expanded);
        let path = if expanded.is_absolute() {
            expanded
        } else {
            env::current_dir()?.join(expanded)
        };
        Ok(normalize(&path))
    }

    fn expand_variables<'a>(&self, raw: &'a str) -> Cow<'a, str> {
        self.variable.replace_all(raw, |captures: &Captures<'_>| {
            let name = captures.get(1).or_else(|| captures.get(2)).map_or("", |m| m.as_str());
            env::var(name).unwrap_or_else(|_| captures[0].to_string())
        })
    }

    fn has_extension(&self, path: &Path) -> bool {
        path.is_file() && path.extension().is_some_and(|extension| extension == self.extension.as_str())
    }
}

fn expand_home(path: &str) -> PathBuf {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => return PathBuf::from(path),
    };
    match dirs::home_dir() {
        Some(home) if rest.is_empty() => home,
        Some(home) => home.join(rest),
        None => PathBuf::from(path),
    }
}

/// Lexically resolve `.` and `..` components
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

fn list_directory(directory: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(directory)? {
        entries.push(normalize(&entry?.path()));
    }
    Ok(entries)
}

fn glob_paths(pattern: &Path) -> Result<Vec<PathBuf>> {
    let mut matches = Vec::new();
    for entry in glob::glob(&pattern.to_string_lossy())? {
        match entry {
            Ok(path) => matches.push(path),
            Err(err) => warn!(error = %err, "Skipping unreadable path"),
        }
    }
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_parent_components() {
        assert_eq!(normalize(Path::new("/a/b/../c/./d.xml")), PathBuf::from("/a/c/d.xml"));
    }

    #[test]
    fn test_expand_variables() {
        let resolver = InputResolver::new("xml").unwrap();
        env::set_var("SMS_MERGE_DISCOVERY_TEST_DIR", "/data/backups");
        assert_eq!(
            resolver.expand_variables("$SMS_MERGE_DISCOVERY_TEST_DIR/a.xml"),
            "/data/backups/a.xml"
        );
        assert_eq!(
            resolver.expand_variables("${SMS_MERGE_DISCOVERY_TEST_DIR}/b.xml"),
            "/data/backups/b.xml"
        );
        assert_eq!(resolver.expand_variables("$SMS_MERGE_UNSET_VARIABLE/c.xml"), "$SMS_MERGE_UNSET_VARIABLE/c.xml");
    }

    #[test]
    fn test_extension_is_normalized() {
        let resolver = InputResolver::new(".xml").unwrap();
        assert_eq!(resolver.extension, "xml");
    }
}
