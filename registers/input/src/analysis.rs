// Licensed under the Apache-2.0 license

//! Batch analysis: discover sources, parse them, resolve every module.

use std::fmt;
use std::path::{Path, PathBuf};

use axion_registers_generator::{resolve_all, Module, ModuleDef, ResolutionError, ResolveConfig};
use walkdir::WalkDir;

use crate::error::InputError;
use crate::structured::{parse_structured_file, Format};
use crate::vhdl::parse_vhdl_file;

/// Kind of source file, by extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    Vhdl,
    Structured(Format),
}

impl SourceKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "vhd" | "vhdl" => Some(SourceKind::Vhdl),
            _ => Format::from_path(path).map(SourceKind::Structured),
        }
    }
}

/// A front-end failure tied to the file (or directory) that caused it.
#[derive(Debug)]
pub struct SourceError {
    pub path: PathBuf,
    pub error: InputError,
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error {
            // These already carry the file name.
            InputError::Io { .. }
            | InputError::Syntax { .. }
            | InputError::Schema { .. }
            | InputError::MissingEntity { .. } => write!(f, "{}", self.error),
            _ => write!(f, "{}: {}", self.path.display(), self.error),
        }
    }
}

/// Outcome of [`analyze_sources`].
#[derive(Debug, Default)]
pub struct Analysis {
    pub modules: Vec<Module>,
    pub errors: Vec<SourceError>,
}

impl Analysis {
    /// True when no file failed and no module carries an error.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.modules.iter().all(|m| !m.has_errors())
    }
}

/// `*` and `?` wildcard match over a whole name.
fn glob_match(pattern: &str, name: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let n: Vec<char> = name.chars().collect();
    let (mut pi, mut ni) = (0, 0);
    let mut star: Option<(usize, usize)> = None;
    while ni < n.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == n[ni]) {
            pi += 1;
            ni += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ni));
            pi += 1;
        } else if let Some((sp, sn)) = star {
            pi = sp + 1;
            ni = sn + 1;
            star = Some((sp, sn + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|&c| c == '*')
}

/// A pattern excludes a file when it equals the file name or any directory
/// component of its path, or matches the file name as a glob.
pub fn is_excluded(path: &Path, excludes: &[String]) -> bool {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    excludes.iter().any(|pattern| {
        glob_match(pattern, &file_name)
            || path
                .components()
                .any(|c| c.as_os_str().to_string_lossy() == pattern.as_str())
    })
}

/// Every supported, non-excluded file under `dirs`, in a stable order.
pub fn discover_sources<P: AsRef<Path>>(
    dirs: &[P],
    excludes: &[String],
) -> (Vec<PathBuf>, Vec<SourceError>) {
    let mut files = vec![];
    let mut errors = vec![];
    for dir in dirs {
        let dir = dir.as_ref();
        if !dir.exists() {
            errors.push(SourceError {
                path: dir.to_path_buf(),
                error: InputError::Io {
                    path: dir.to_path_buf(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "source directory not found",
                    ),
                },
            });
            continue;
        }
        let walker = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_excluded(Path::new(e.file_name()), excludes));
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().unwrap_or(dir).to_path_buf();
                    errors.push(SourceError {
                        path: path.clone(),
                        error: InputError::Io {
                            path,
                            source: e.into(),
                        },
                    });
                    continue;
                }
            };
            let path = entry.path();
            let relative = path.strip_prefix(dir).unwrap_or(path);
            if !entry.file_type().is_file()
                || SourceKind::from_path(path).is_none()
                || is_excluded(relative, excludes)
            {
                continue;
            }
            files.push(path.to_path_buf());
        }
    }
    (files, errors)
}

/// Runs the matching front-end on one file. `Ok(None)` means the file had
/// nothing to contribute.
pub fn parse_source(path: &Path) -> Result<Option<ModuleDef>, InputError> {
    match SourceKind::from_path(path) {
        Some(SourceKind::Vhdl) => parse_vhdl_file(path),
        Some(SourceKind::Structured(_)) => parse_structured_file(path).map(Some),
        None => Ok(None),
    }
}

/// Analyzes every source under `dirs` with the partial policy: problems are
/// recorded, never raised.
pub fn analyze_sources<P: AsRef<Path>>(dirs: &[P], excludes: &[String]) -> Analysis {
    let config = ResolveConfig::new().partial();
    match analyze_sources_with_config(dirs, excludes, &config) {
        Ok(analysis) => analysis,
        // Unreachable with the partial policy; kept as a recorded error.
        Err(e) => Analysis {
            modules: vec![],
            errors: vec![SourceError {
                path: PathBuf::new(),
                error: e.into(),
            }],
        },
    }
}

/// Analyzes every source under `dirs`. Front-end errors are always collected
/// per file; resolution follows `config.policy`, so a strict policy returns
/// the first conflict instead of recording it.
pub fn analyze_sources_with_config<P: AsRef<Path>>(
    dirs: &[P],
    excludes: &[String],
    config: &ResolveConfig,
) -> Result<Analysis, ResolutionError> {
    let (files, mut errors) = discover_sources(dirs, excludes);
    let mut defs = vec![];
    for path in &files {
        match parse_source(path) {
            Ok(Some(def)) => defs.push(def),
            Ok(None) => {}
            Err(error) => {
                log::warn!("{error}");
                errors.push(SourceError {
                    path: path.clone(),
                    error,
                });
            }
        }
    }
    log::info!(
        "analyzed {} files: {} modules, {} unreadable",
        files.len(),
        defs.len(),
        errors.len()
    );
    let modules = resolve_all(&defs, config)?;
    Ok(Analysis { modules, errors })
}
