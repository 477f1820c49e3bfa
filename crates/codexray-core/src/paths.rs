use std::env;
use std::path::PathBuf;

/// `$HOME`, then `%USERPROFILE%`, then `%HOMEDRIVE%%HOMEPATH%`.
pub fn home_dir() -> Option<PathBuf> {
    let non_empty = |name: &str| env::var(name).ok().filter(|v| !v.is_empty());
    if let Some(home) = non_empty("HOME") {
        return Some(PathBuf::from(home));
    }
    if let Some(profile) = non_empty("USERPROFILE") {
        return Some(PathBuf::from(profile));
    }
    match (non_empty("HOMEDRIVE"), non_empty("HOMEPATH")) {
        (Some(drive), Some(path)) => Some(PathBuf::from(format!("{drive}{path}"))),
        _ => None,
    }
}

/// `~/.codexray`, or `./.codexray` when no home directory is known. Holds
/// the default config file and stored analyses.
pub fn codexray_home() -> PathBuf {
    home_dir()
        .map(|home| home.join(".codexray"))
        .unwrap_or_else(|| PathBuf::from(".codexray"))
}
