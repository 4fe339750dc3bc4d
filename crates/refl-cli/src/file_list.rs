//! Loads the `--list` file: one path per line, UTF-8, LF or CRLF, `#`-comments and blank lines
//! allowed.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::CliError;

pub fn load(path: &Path) -> Result<Vec<PathBuf>, CliError> {
    let text = fs::read_to_string(path).map_err(|err| CliError::Io(err, path.to_path_buf()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(PathBuf::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn skips_comments_and_blank_lines_on_either_line_ending() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "a.h\r\n# comment\r\n\r\nb.h\nc.h\n").unwrap();

        let files = load(file.path()).unwrap();
        assert_eq!(
            files,
            vec![PathBuf::from("a.h"), PathBuf::from("b.h"), PathBuf::from("c.h")]
        );
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load(Path::new("/nonexistent/does-not-exist.list")).unwrap_err();
        assert!(matches!(err, CliError::Io(_, _)));
    }
}
