//! Stored filenames and the public URLs they are reachable under.

use crate::config::FilenameStrategy;
use chrono::{DateTime, Utc};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use std::path::Path;
use uuid::Uuid;

/// Longest client extension kept by [`FilenameStrategy::Random`]
const MAX_EXTENSION_LEN: usize = 10;

/// Bytes escaped in the filename segment of a public URL. Non-ASCII is always escaped.
const FILENAME_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

/// Last path component of a client-supplied filename.
///
/// Both `/` and `\` count as separators and trailing separators are ignored, so
/// `../../etc/passwd` gives `passwd` and `C:\photos\cat.png` gives `cat.png`. Nothing else is
/// filtered.
pub fn basename(name: &str) -> &str {
    name.trim_end_matches(is_separator).rsplit(is_separator).next().unwrap_or_default()
}

/// Extension of the client basename, lowercased, if it is short plain ASCII alphanumerics
fn safe_extension(name: &str) -> Option<String> {
    Path::new(basename(name))
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= MAX_EXTENSION_LEN && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase())
}

/// Name the upload is stored under inside the upload directory
pub fn destination_filename(strategy: FilenameStrategy, original_name: &str, now: DateTime<Utc>) -> String {
    match strategy {
        FilenameStrategy::Timestamped => format!("{}_{}", now.timestamp(), basename(original_name)),
        FilenameStrategy::Random => match safe_extension(original_name) {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        },
    }
}

/// Directory part of a request path, without a trailing slash.
///
/// `/server/upload` gives `/server`; a path directly under the root gives an empty string.
pub fn request_dir(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[..idx],
        None => "",
    }
}

/// Absolute URL of a stored upload.
///
/// Always `http`: the scheme a TLS-terminating proxy saw is not taken into account. The
/// filename is percent-encoded so names like `100%.png` or `a#b.png` resolve to the stored file;
/// the host and the configured path parts are used as they are.
pub fn public_url(host: &str, request_path: &str, upload_segment: &str, filename: &str) -> String {
    format!(
        "http://{}{}/{}/{}",
        host,
        request_dir(request_path),
        upload_segment,
        utf8_percent_encode(filename, FILENAME_SEGMENT)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_basename() {
        assert_eq!(basename("cat.png"), "cat.png");
        assert_eq!(basename("photos/2024/cat.png"), "cat.png");
        assert_eq!(basename("../../etc/passwd"), "passwd");
        assert_eq!(basename("C:\\Users\\me\\cat.png"), "cat.png");
        assert_eq!(basename("dir/"), "dir");
        assert_eq!(basename("/"), "");
        assert_eq!(basename(""), "");
        // Only directories are stripped; odd names pass through
        assert_eq!(basename("cat.png.exe"), "cat.png.exe");
        assert_eq!(basename(".."), "..");
    }

    #[test]
    fn test_timestamped_filename() {
        let name = destination_filename(FilenameStrategy::Timestamped, "cat.png", at(1_700_000_000));
        assert_eq!(name, "1700000000_cat.png");

        let name = destination_filename(FilenameStrategy::Timestamped, "../secret/cat.png", at(1_700_000_000));
        assert_eq!(name, "1700000000_cat.png");

        let name = destination_filename(FilenameStrategy::Timestamped, "", at(5));
        assert_eq!(name, "5_");
    }

    #[test]
    fn test_same_second_same_name_collides() {
        let a = destination_filename(FilenameStrategy::Timestamped, "cat.png", at(42));
        let b = destination_filename(FilenameStrategy::Timestamped, "other/cat.png", at(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_random_filename() {
        let a = destination_filename(FilenameStrategy::Random, "../Cat.PNG", at(0));
        let b = destination_filename(FilenameStrategy::Random, "../Cat.PNG", at(0));
        assert_ne!(a, b);
        assert!(a.ends_with(".png"), "{a}");
        assert!(Uuid::parse_str(a.trim_end_matches(".png")).is_ok());

        let no_ext = destination_filename(FilenameStrategy::Random, "cat", at(0));
        assert!(Uuid::parse_str(&no_ext).is_ok());

        let weird = destination_filename(FilenameStrategy::Random, "cat.p%g", at(0));
        assert!(Uuid::parse_str(&weird).is_ok());

        let long = destination_filename(FilenameStrategy::Random, "cat.abcdefghijk", at(0));
        assert!(Uuid::parse_str(&long).is_ok());
    }

    #[test]
    fn test_request_dir() {
        assert_eq!(request_dir("/server/upload"), "/server");
        assert_eq!(request_dir("/app/server/upload.php"), "/app/server");
        assert_eq!(request_dir("/server/upload/"), "/server");
        assert_eq!(request_dir("/upload"), "");
        assert_eq!(request_dir("/"), "");
        assert_eq!(request_dir(""), "");
    }

    #[test]
    fn test_public_url() {
        assert_eq!(
            public_url("example.com", "/server/upload", "uploads/chat_images", "1700000000_cat.png"),
            "http://example.com/server/uploads/chat_images/1700000000_cat.png"
        );
        assert_eq!(
            public_url("localhost:8080", "/upload", "uploads/chat_images", "1_a.png"),
            "http://localhost:8080/uploads/chat_images/1_a.png"
        );
    }

    #[test]
    fn test_public_url_escapes_filename() {
        assert_eq!(
            public_url("example.com", "/server/upload", "uploads/chat_images", "1_100%.png"),
            "http://example.com/server/uploads/chat_images/1_100%25.png"
        );
        assert_eq!(
            public_url("example.com", "/server/upload", "uploads/chat_images", "1_my cat#2?.png"),
            "http://example.com/server/uploads/chat_images/1_my%20cat%232%3F.png"
        );
        assert_eq!(
            public_url("example.com", "/server/upload", "uploads/chat_images", "1_katze-\u{e4}.png"),
            "http://example.com/server/uploads/chat_images/1_katze-%C3%A4.png"
        );
        // Characters that are valid in a path segment stay readable
        assert_eq!(
            public_url("example.com", "/server/upload", "uploads/chat_images", "1_cat_(1)+a=b.png"),
            "http://example.com/server/uploads/chat_images/1_cat_(1)+a=b.png"
        );
    }
}
