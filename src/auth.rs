use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Where the opaque bearer credential lives between runs. The credential is
/// whatever the login endpoint handed back; the client never inspects it.
pub fn token_path() -> PathBuf {
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "apptrack") {
        proj_dirs.data_dir().join("token")
    } else {
        // Fallback to current directory
        PathBuf::from(".apptrack-token")
    }
}

pub fn load_token() -> Result<Option<String>> {
    read_token_file(&token_path())
}

pub fn save_token(token: &str) -> Result<()> {
    write_token_file(&token_path(), token)
}

/// Removes the stored credential. Used by logout and whenever the server
/// answers 401, so the next command starts from a clean slate.
pub fn clear_token() -> Result<()> {
    remove_token_file(&token_path())
}

fn read_token_file(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let token = fs::read_to_string(path)
        .with_context(|| format!("Failed to read credential file: {}", path.display()))?;
    let token = token.trim().to_string();
    Ok(if token.is_empty() { None } else { Some(token) })
}

fn write_token_file(path: &Path, token: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, token.trim())
        .with_context(|| format!("Failed to write credential file: {}", path.display()))
}

fn remove_token_file(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path)
            .with_context(|| format!("Failed to remove credential file: {}", path.display()))?;
    }
    Ok(())
}
