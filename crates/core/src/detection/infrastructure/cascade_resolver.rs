use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::shared::constants::{APP_DIR_NAME, CASCADE_SEARCH_DIRS};

#[derive(Error, Debug)]
pub enum CascadeResolveError {
    #[error("cascade {name} not found (searched: {})", display_dirs(.searched))]
    NotFound { name: String, searched: Vec<PathBuf> },
}

fn display_dirs(dirs: &[PathBuf]) -> String {
    dirs.iter()
        .map(|d| d.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Resolve a cascade file by name from the standard locations.
///
/// Resolution order:
/// 1. User data directory (`<data_dir>/FaceCam/cascades/`)
/// 2. `cascades/` next to the executable
/// 3. OpenCV install locations
pub fn resolve(name: &str) -> Result<PathBuf, CascadeResolveError> {
    resolve_in(name, &search_dirs())
}

/// Returns the first directory in `dirs` containing `name`.
pub fn resolve_in(name: &str, dirs: &[PathBuf]) -> Result<PathBuf, CascadeResolveError> {
    dirs.iter()
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| CascadeResolveError::NotFound {
            name: name.to_string(),
            searched: dirs.to_vec(),
        })
}

pub fn search_dirs() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(data) = dirs::data_dir() {
        candidates.push(data.join(APP_DIR_NAME).join("cascades"));
    }
    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .as_deref()
        .and_then(Path::parent)
    {
        candidates.push(exe_dir.join("cascades"));
    }
    candidates.extend(CASCADE_SEARCH_DIRS.iter().map(PathBuf::from));
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::infrastructure::haar_cascade::HaarCascade;
    use crate::shared::constants::CASCADE_FILE_NAME;

    #[test]
    fn test_first_matching_directory_wins() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        std::fs::write(first.path().join("a.xml"), "").unwrap();
        std::fs::write(second.path().join("a.xml"), "").unwrap();

        let dirs = vec![first.path().to_path_buf(), second.path().to_path_buf()];
        assert_eq!(resolve_in("a.xml", &dirs).unwrap(), first.path().join("a.xml"));
    }

    #[test]
    fn test_later_directory_is_used_when_earlier_lacks_file() {
        let empty = tempfile::tempdir().unwrap();
        let full = tempfile::tempdir().unwrap();
        std::fs::write(full.path().join("a.xml"), "").unwrap();

        let dirs = vec![empty.path().to_path_buf(), full.path().to_path_buf()];
        assert_eq!(resolve_in("a.xml", &dirs).unwrap(), full.path().join("a.xml"));
    }

    #[test]
    fn test_directory_with_cascade_name_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("a.xml")).unwrap();
        assert!(resolve_in("a.xml", &[dir.path().to_path_buf()]).is_err());
    }

    #[test]
    fn test_not_found_lists_searched_directories() {
        let dir = tempfile::tempdir().unwrap();
        let dirs = vec![dir.path().to_path_buf(), PathBuf::from("/nonexistent/cascades")];
        let err = resolve_in("missing.xml", &dirs).unwrap_err();

        let CascadeResolveError::NotFound { name, searched } = &err;
        assert_eq!(name, "missing.xml");
        assert_eq!(searched, &dirs);
        assert!(err.to_string().contains("/nonexistent/cascades"));
    }

    #[test]
    fn test_search_dirs_end_with_opencv_locations() {
        let dirs = search_dirs();
        let tail: Vec<PathBuf> = CASCADE_SEARCH_DIRS.iter().map(PathBuf::from).collect();
        assert!(dirs.ends_with(&tail));
    }

    #[test]
    #[ignore] // Requires OpenCV's frontal face cascade installed
    fn test_installed_frontal_face_cascade_loads() {
        let path = resolve(CASCADE_FILE_NAME).unwrap();
        let cascade = HaarCascade::load(&path).unwrap();
        assert_eq!(cascade.window_width(), 24);
        assert_eq!(cascade.window_height(), 24);
        assert_eq!(cascade.stage_count(), 25);
    }
}
