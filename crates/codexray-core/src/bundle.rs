//! Turning a repository snapshot into one text blob for analysis.

use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read};
use tracing::debug;

use crate::error::RepoError;

pub const DEFAULT_MAX_FILE_BYTES: usize = 300 * 1024;
pub const DEFAULT_MAX_ARCHIVE_BYTES: usize = 50 * 1024 * 1024;

/// Directory names whose contents never reach the prompt.
pub const IGNORED_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    "dist",
    "build",
    "coverage",
    ".next",
    "out",
    "vendor",
];

/// Source/text extensions kept from an archive (compared case-insensitively).
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "js", "jsx", "ts", "tsx", "mjs", "mjsx", "mts", "mtsx", "json", "md", "yaml", "yml", "py",
    "rb", "php", "java", "kt", "go", "rs", "cs", "cpp", "c", "h", "swift", "scala", "dart",
    "html", "css", "scss", "less", "vue", "svelte",
];

/// `owner/repo` pair parsed from a GitHub URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    /// Accepts `http(s)://github.com/{owner}/{repo}` with an optional trailing
    /// slash, `.git` suffix or `#fragment`.
    pub fn parse(url: &str) -> Result<Self, RepoError> {
        let invalid = || RepoError::InvalidUrl(url.to_string());
        let trimmed = url.trim();
        let without_fragment = trimmed.split_once('#').map_or(trimmed, |(head, _)| head);

        let lower = without_fragment.to_ascii_lowercase();
        let prefix_len = ["https://github.com/", "http://github.com/"]
            .iter()
            .find(|p| lower.starts_with(*p))
            .map(|p| p.len())
            .ok_or_else(invalid)?;

        let path = &without_fragment[prefix_len..];
        let path = path.strip_suffix('/').unwrap_or(path);
        let path = path.strip_suffix(".git").unwrap_or(path);

        let mut parts = path.split('/');
        let owner = parts.next().unwrap_or_default();
        let repo = parts.next().unwrap_or_default();
        if parts.next().is_some() || owner.is_empty() || repo.is_empty() || repo.contains('?') {
            return Err(invalid());
        }
        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveFilter {
    pub max_file_bytes: usize,
    pub ignored_dirs: Vec<String>,
    pub extensions: Vec<String>,
}

impl Default for ArchiveFilter {
    fn default() -> Self {
        Self {
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            ignored_dirs: IGNORED_DIRS.iter().map(|s| s.to_string()).collect(),
            extensions: SUPPORTED_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ArchiveFilter {
    /// Whether an archive entry path passes the directory and extension rules.
    pub fn accepts_path(&self, path: &str) -> bool {
        let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let Some(file_name) = segments.pop() else {
            return false;
        };
        if segments
            .iter()
            .any(|seg| self.ignored_dirs.iter().any(|dir| dir == seg))
        {
            return false;
        }
        match file_name.rsplit_once('.') {
            Some((_, ext)) => self
                .extensions
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(ext)),
            None => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct BundleStats {
    pub file_count: usize,
    pub skipped: usize,
    pub total_bytes: usize,
    pub estimated_tokens: usize,
}

#[derive(Debug, Clone)]
pub struct RepoBundle {
    pub text: String,
    pub stats: BundleStats,
}

/// Extracts every accepted entry of a zip archive into one string, each file
/// preceded by a `// FILE: <path>` marker line.
pub fn bundle_archive(bytes: &[u8], filter: &ArchiveFilter) -> Result<RepoBundle, RepoError> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| RepoError::Archive(e.to_string()))?;

    let mut text = String::new();
    let mut stats = BundleStats::default();

    for idx in 0..archive.len() {
        let mut entry = archive
            .by_index(idx)
            .map_err(|e| RepoError::Archive(e.to_string()))?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        if !filter.accepts_path(&name) || entry.size() as usize > filter.max_file_bytes {
            stats.skipped += 1;
            continue;
        }

        let Some(data) = read_capped(&mut entry, filter.max_file_bytes)
            .map_err(|e| RepoError::Archive(format!("{name}: {e}")))?
        else {
            stats.skipped += 1;
            continue;
        };

        text.push_str("\n// FILE: ");
        text.push_str(&name);
        text.push('\n');
        text.push_str(&String::from_utf8_lossy(&data));
        text.push('\n');

        stats.file_count += 1;
        stats.total_bytes += data.len();
    }

    if stats.file_count == 0 {
        return Err(RepoError::EmptyRepository);
    }
    stats.estimated_tokens = estimate_tokens(text.len());
    debug!(
        files = stats.file_count,
        skipped = stats.skipped,
        bytes = stats.total_bytes,
        "bundled repository archive"
    );
    Ok(RepoBundle { text, stats })
}

/// Reads at most `cap + 1` bytes whatever the entry declares. `None` when the
/// content exceeds `cap`.
fn read_capped(reader: impl Read, cap: usize) -> std::io::Result<Option<Vec<u8>>> {
    let mut data = Vec::new();
    reader.take(cap as u64 + 1).read_to_end(&mut data)?;
    Ok((data.len() <= cap).then_some(data))
}

pub fn estimate_tokens(chars: usize) -> usize {
    // Rough heuristic: 4 chars per token.
    chars.div_ceil(4)
}
