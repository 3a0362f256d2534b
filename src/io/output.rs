use std::path::Path;
use tokio::fs;

use crate::error::OutputError;

/// Write the processed subscription as UTF-8, creating parent directories.
pub async fn write_output(path: &str, content: &str) -> Result<(), OutputError> {
    let io_err = |source| OutputError::Io { path: path.to_string(), source };

    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    fs::write(path, content).await.map_err(io_err)?;
    Ok(())
}
