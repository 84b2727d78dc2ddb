//! `.env` file loading and in-place updates

use std::fs;
use std::io;
use std::path::Path;

use crate::{ConfigError, ConfigResult};

/// Load `.env` from the working directory into the process environment
///
/// A missing file is not an error; existing variables are not overridden.
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Set `key=value` in the env file at `path`
///
/// Rewrites the first line assigning `key`, or appends one. The file is
/// created if it does not exist.
pub fn upsert_env_var(path: &Path, key: &str, value: &str) -> ConfigResult<()> {
    let env_err = |source: io::Error| ConfigError::EnvFile {
        path: path.display().to_string(),
        source,
    };

    let assignment = format!("{}={}", key, value);
    let prefix = format!("{}=", key);

    let existing = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(env_err(e)),
    };

    let mut updated = false;
    let mut lines: Vec<String> = existing
        .lines()
        .map(|line| {
            if !updated && line.trim_start().starts_with(&prefix) {
                updated = true;
                assignment.clone()
            } else {
                line.to_string()
            }
        })
        .collect();

    if !updated {
        lines.push(assignment);
    }

    let mut content = lines.join("\n");
    content.push('\n');
    fs::write(path, content).map_err(env_err)
}
