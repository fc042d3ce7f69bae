use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

pub const CACHE_FILE_NAME: &str = "event_mappings_cache.json";

/// `$INKCAL_HOME`, else `$HOME/.inkcal`.
pub fn inkcal_home() -> Result<PathBuf> {
    resolve_home(std::env::var("INKCAL_HOME").ok(), std::env::var("HOME").ok())
}

fn resolve_home(inkcal_home: Option<String>, home: Option<String>) -> Result<PathBuf> {
    if let Some(dir) = inkcal_home.filter(|d| !d.trim().is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let home = home.context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".inkcal"))
}

pub fn ensure_inkcal_home() -> Result<PathBuf> {
    let dir = inkcal_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn default_cache_path() -> Result<PathBuf> {
    Ok(inkcal_home()?.join(CACHE_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_home_wins() {
        let p = resolve_home(Some("/srv/inkcal".into()), Some("/home/pi".into())).unwrap();
        assert_eq!(p, PathBuf::from("/srv/inkcal"));
    }

    #[test]
    fn falls_back_to_dot_dir_in_home() {
        let p = resolve_home(Some("  ".into()), Some("/home/pi".into())).unwrap();
        assert_eq!(p, PathBuf::from("/home/pi/.inkcal"));
        assert!(resolve_home(None, None).is_err());
    }
}
