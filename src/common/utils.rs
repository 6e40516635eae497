use std::path::{Component, Path, PathBuf};

/// Resolve a relative file name inside `base`.
///
/// Returns `None` for names that are empty, absolute, or that would escape
/// `base` through `..` components.
pub fn enclosed_path(base: &Path, name: &str) -> Option<PathBuf> {
    let relative = Path::new(name);
    let mut depth = 0usize;
    let mut has_file = false;

    for component in relative.components() {
        match component {
            Component::Normal(_) => {
                depth += 1;
                has_file = true;
            }
            Component::CurDir => {}
            Component::ParentDir => {
                depth = depth.checked_sub(1)?;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    if !has_file || depth == 0 {
        return None;
    }

    Some(base.join(relative))
}

/// Keep only the paths whose extension equals `extension` (without the dot)
pub fn filter_by_extension(paths: &[PathBuf], extension: &str) -> Vec<PathBuf> {
    paths
        .iter()
        .filter(|path| path.extension().is_some_and(|ext| ext == extension))
        .cloned()
        .collect()
}
