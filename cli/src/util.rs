use std::{
    path::{Path, PathBuf},
    process::exit,
};

pub fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|e| {
        eprintln!("Failed to get current dir: {}", e);
        exit(1);
    })
}

/// Resolves `path` against the directory of `config_file`, or keeps it as is when there is no
/// config file or `path` is absolute.
pub fn relative_to_config(path: &Path, config_file: Option<&Path>) -> PathBuf {
    match config_file.and_then(Path::parent) {
        Some(base) if path.is_relative() => base.join(path),
        _ => path.to_owned(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn resolves_against_config_dir() {
        let cfg = Path::new("/work/abc/judgebox.toml");
        assert_eq!(
            relative_to_config(Path::new("./testcase"), Some(cfg)),
            Path::new("/work/abc/./testcase")
        );
        assert_eq!(
            relative_to_config(Path::new("/tmp/t"), Some(cfg)),
            Path::new("/tmp/t")
        );
        assert_eq!(
            relative_to_config(Path::new("testcase"), None),
            Path::new("testcase")
        );
    }
}
