//! Dropped-file parsing
//!
//! Terminals have no drop event. Dropping files onto the window pastes
//! their paths instead, in whatever shape the emulator prefers: quoted
//! (`'/tmp/my cv.pdf'`), shell-escaped (`/tmp/my\ cv.pdf`), `file://` URIs,
//! one per line or several on a line.

use std::path::{Path, PathBuf};

/// Turn pasted text into the list of paths it names, in order.
pub fn parse_dropped_paths(text: &str) -> Vec<PathBuf> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .flat_map(|line| {
            // An unquoted path with spaces is ambiguous; trust the filesystem
            if Path::new(line).exists() {
                vec![line.to_string()]
            } else {
                split_words(line)
            }
        })
        .filter_map(|word| to_path(&word))
        .collect()
}

/// Shell-like word splitting: whitespace separates words, quotes group,
/// backslash escapes the next character outside single quotes.
fn split_words(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some('\''), c) => current.push(c),
            (_, '\\') => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
                in_word = true;
            }
            (Some(_), c) => current.push(c),
            (None, '\'' | '"') => {
                quote = Some(c);
                in_word = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if in_word {
        words.push(current);
    }
    words
}

fn to_path(word: &str) -> Option<PathBuf> {
    if word.is_empty() {
        return None;
    }

    if word.starts_with("file://") {
        return url::Url::parse(word).ok()?.to_file_path().ok();
    }

    if let Some(rest) = word.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return Some(home.join(rest));
        }
    }

    Some(PathBuf::from(word))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_paste() {
        assert!(parse_dropped_paths("").is_empty());
        assert!(parse_dropped_paths("  \n\n").is_empty());
    }

    #[test]
    fn test_plain_path() {
        assert_eq!(
            parse_dropped_paths("/home/me/cv.pdf\n"),
            vec![PathBuf::from("/home/me/cv.pdf")]
        );
    }

    #[test]
    fn test_quoted_and_escaped() {
        assert_eq!(
            parse_dropped_paths("'/tmp/my cv.pdf' \"/tmp/other one.docx\""),
            vec![
                PathBuf::from("/tmp/my cv.pdf"),
                PathBuf::from("/tmp/other one.docx"),
            ]
        );
        assert_eq!(
            parse_dropped_paths(r"/tmp/my\ cv.pdf /tmp/b.txt"),
            vec![PathBuf::from("/tmp/my cv.pdf"), PathBuf::from("/tmp/b.txt")]
        );
    }

    #[test]
    fn test_file_uri() {
        assert_eq!(
            parse_dropped_paths("file:///tmp/My%20Resume.pdf\r\nfile:///tmp/b.txt"),
            vec![
                PathBuf::from("/tmp/My Resume.pdf"),
                PathBuf::from("/tmp/b.txt"),
            ]
        );
    }

    #[test]
    fn test_existing_path_with_spaces_is_kept_whole() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("my resume.txt");
        std::fs::write(&path, "x").unwrap();

        let pasted = path.to_string_lossy().to_string();
        assert_eq!(parse_dropped_paths(&pasted), vec![path]);
    }

    #[test]
    fn test_split_words() {
        assert_eq!(split_words(r#"a "b c" 'd\e' f\"g"#), vec!["a", "b c", r"d\e", "f\"g"]);
        assert_eq!(split_words("''"), vec![""]);
    }
}
