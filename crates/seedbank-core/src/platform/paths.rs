use std::path::{Path, PathBuf, MAIN_SEPARATOR};

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var_os(name)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

#[cfg(unix)]
pub fn home_dir() -> Option<PathBuf> {
    env_path("HOME").or_else(|| {
        use nix::unistd::{Uid, User};
        User::from_uid(Uid::effective())
            .ok()
            .flatten()
            .map(|u| u.dir)
    })
}

#[cfg(windows)]
pub fn home_dir() -> Option<PathBuf> {
    env_path("USERPROFILE").or_else(|| {
        let home_drive = std::env::var_os("HOMEDRIVE")?;
        let home_path = std::env::var_os("HOMEPATH")?;
        let mut path = PathBuf::from(home_drive);
        path.push(home_path);
        Some(path)
    })
}

/// Expand a leading `~` or `~/` to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = home_dir() {
            return home;
        }
    }
    if let Some(suffix) = path.strip_prefix("~/") {
        if let Some(home) = home_dir() {
            return home.join(suffix);
        }
    }
    PathBuf::from(path)
}

/// Expand `~`, anchor relative paths at `base` and drop `.` components.
pub fn absolute_from(path: &str, base: &Path) -> PathBuf {
    let expanded = expand_tilde(path);
    let joined = if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    };
    joined
        .components()
        .filter(|c| !matches!(c, std::path::Component::CurDir))
        .collect()
}

/// Absolute form of `path` (relative to the current directory).
pub fn absolute(path: &str) -> std::io::Result<PathBuf> {
    Ok(absolute_from(path, &std::env::current_dir()?))
}

/// Absolute directory path as a string that always ends in a separator.
pub fn normalize_dir(path: &str) -> std::io::Result<String> {
    let mut s = absolute(path)?.to_string_lossy().to_string();
    if !s.ends_with(MAIN_SEPARATOR) {
        s.push(MAIN_SEPARATOR);
    }
    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_tilde_home_only() {
        let home = home_dir().unwrap();
        assert_eq!(expand_tilde("~"), home);
        assert_eq!(expand_tilde("~/x"), home.join("x"));
        assert_eq!(expand_tilde("rel/~"), PathBuf::from("rel/~"));
    }

    #[cfg(unix)]
    #[test]
    fn absolute_from_anchors_relative_paths() {
        let base = Path::new("/srv/bank");
        assert_eq!(absolute_from("data", base), PathBuf::from("/srv/bank/data"));
        assert_eq!(absolute_from("./data/./x", base), PathBuf::from("/srv/bank/data/x"));
        assert_eq!(absolute_from("/etc", base), PathBuf::from("/etc"));
    }

    #[test]
    fn normalize_dir_has_trailing_separator() {
        let tmp = tempfile::tempdir().unwrap();
        let s = normalize_dir(&tmp.path().to_string_lossy()).unwrap();
        assert!(s.ends_with(MAIN_SEPARATOR));
        assert!(Path::new(&s).is_absolute());
        assert_eq!(normalize_dir(&s).unwrap(), s);
    }
}
