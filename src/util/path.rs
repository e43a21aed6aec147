use std::path::{Path, PathBuf};

use crate::application::{ApplicationError, ApplicationResult};

/// Expand `~` and `$VAR` / `${VAR}` in a user supplied path.
pub fn expand_path(path: &Path) -> ApplicationResult<PathBuf> {
    let raw = path.to_string_lossy();
    let expanded = shellexpand::full(&raw).map_err(|e| ApplicationError::OperationFailed {
        context: format!("expand path {}", raw),
        source: Box::new(e),
    })?;
    Ok(PathBuf::from(expanded.into_owned()))
}
