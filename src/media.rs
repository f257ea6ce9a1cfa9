//! Media retrieval.
//!
//! Attachments are written to `<download_dir>/<title>_media_<n><ext>`.  The
//! title comes from the publisher, so it is sanitized before it gets anywhere
//! near a path.  Files are fetched again on every run; an existing file with
//! the same name is overwritten.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::MediaError;
use crate::reconcile::AnnotatedItem;
use crate::source::HttpClient;

const MAX_TITLE_CHARS: usize = 100;
const MAX_EXTENSION_CHARS: usize = 8;
const UNTITLED: &str = "untitled";

/// Outcome of fetching one attachment.
#[derive(Debug)]
pub struct MediaOutcome {
    pub url: String,
    pub path: PathBuf,
    /// Bytes written on success.
    pub result: Result<u64, MediaError>,
}

/// Local file name for attachment `index` of an item titled `title`.
///
/// Pure and deterministic: the same inputs always give the same name, and the
/// result never contains a path separator.
pub fn media_filename(title: &str, index: usize, url: &str) -> String {
    format!("{}_media_{}{}", sanitize_title(title), index, url_extension(url))
}

/// Make a publisher-supplied title safe to use as a single path component.
pub fn sanitize_title(title: &str) -> String {
    let replaced: String = title
        .chars()
        .map(|c| {
            if c.is_control() || matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') {
                '_'
            } else {
                c
            }
        })
        .collect();

    // Truncate before trimming so a cut never leaves a trailing dot behind.
    let truncated: String = replaced.chars().take(MAX_TITLE_CHARS).collect();
    let safe = truncated.trim_matches(|c: char| c == '.' || c.is_whitespace());
    if safe.is_empty() {
        UNTITLED.to_string()
    } else {
        safe.to_string()
    }
}

/// Extension (with the dot) of the last path segment of `url`, or `""`.
///
/// Query strings and fragments are ignored, and anything that is not a
/// short alphanumeric run is dropped.
fn url_extension(url: &str) -> String {
    let path = match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    };

    let segment = path.rsplit('/').next().unwrap_or_default();
    match segment.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_CHARS
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            format!(".{}", ext.to_ascii_lowercase())
        }
        _ => String::new(),
    }
}

/// Stream `url` into `dest`.
///
/// The response body and the file are both dropped before this returns, on
/// every path.  A partially written file is removed.
pub fn download(client: &dyn HttpClient, url: &str, dest: &Path) -> Result<u64, MediaError> {
    let mut body = client.get(url)?;

    let result = File::create(dest)
        .map_err(|source| disk_error(dest, source))
        .and_then(|mut file| copy_body(body.as_mut(), &mut file, dest));

    if result.is_err() {
        let _ = fs::remove_file(dest);
    }
    result
}

/// Like `io::copy`, but keeps read and write failures apart.
fn copy_body(body: &mut dyn Read, file: &mut File, dest: &Path) -> Result<u64, MediaError> {
    let mut buf = [0u8; 8 * 1024];
    let mut written = 0u64;

    loop {
        let n = match body.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(MediaError::Network(format!("failed to read body: {e}"))),
        };

        file.write_all(&buf[..n])
            .map_err(|source| disk_error(dest, source))?;
        written += n as u64;
    }

    file.flush().map_err(|source| disk_error(dest, source))?;
    Ok(written)
}

fn disk_error(path: &Path, source: io::Error) -> MediaError {
    MediaError::DiskWrite {
        path: path.to_path_buf(),
        source,
    }
}

/// Download every attachment of `item` into `dir`.
///
/// A failed attachment is logged and reported in its outcome; it never stops
/// the remaining ones.
pub fn fetch_item_media(
    client: &dyn HttpClient,
    dir: &Path,
    item: &AnnotatedItem<'_>,
) -> Vec<MediaOutcome> {
    if !item.has_media {
        return Vec::new();
    }

    let dir_ready = fs::create_dir_all(dir);

    item.item
        .media
        .iter()
        .enumerate()
        .map(|(index, media)| {
            let path = dir.join(media_filename(&item.item.title, index, &media.url));

            let result = match &dir_ready {
                Ok(()) => download(client, &media.url, &path),
                Err(e) => Err(disk_error(dir, io::Error::new(e.kind(), e.to_string()))),
            };

            match &result {
                Ok(bytes) => debug!(url = %media.url, path = %path.display(), bytes, "downloaded media"),
                Err(e) => warn!(title = %item.item.title, url = %media.url, "media download failed: {e}"),
            }

            MediaOutcome {
                url: media.url.clone(),
                path,
                result,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::Status;
    use crate::source::testing::FakeClient;
    use crate::source::{Item, Media};
    use tempfile::TempDir;

    fn item_with_media(title: &str, urls: &[&str]) -> Item {
        Item {
            title: title.to_string(),
            media: urls
                .iter()
                .map(|u| Media {
                    url: u.to_string(),
                    ..Media::default()
                })
                .collect(),
            ..Item::default()
        }
    }

    fn annotate(item: &Item) -> AnnotatedItem<'_> {
        AnnotatedItem {
            item,
            status: Status::Unread,
            has_media: item.has_media(),
        }
    }

    // -- naming --------------------------------------------------------------

    #[test]
    fn filename_combines_title_index_and_extension() {
        assert_eq!(
            media_filename("Cats", 0, "https://cdn.example.com/img/cat.JPG"),
            "Cats_media_0.jpg"
        );
        assert_eq!(
            media_filename("Cats", 2, "https://cdn.example.com/img/cat.png?w=640#x"),
            "Cats_media_2.png"
        );
    }

    #[test]
    fn filename_is_deterministic() {
        let url = "https://cdn.example.com/a/b/clip.mp4";
        assert_eq!(
            media_filename("Some: Title?", 1, url),
            media_filename("Some: Title?", 1, url)
        );
    }

    #[test]
    fn filename_differs_per_attachment_index() {
        let url = "https://cdn.example.com/a.jpg";
        assert_ne!(media_filename("t", 0, url), media_filename("t", 1, url));
    }

    #[test]
    fn path_separators_and_traversal_are_neutralised() {
        let name = media_filename("../../etc/passwd", 0, "http://x/a.txt");
        assert!(!name.contains('/'));
        assert!(!name.starts_with('.'));
        assert_eq!(name, "_.._etc_passwd_media_0.txt");

        let name = media_filename(r"..\..\windows\system32", 0, "http://x/a");
        assert!(!name.contains('\\'));
    }

    #[test]
    fn control_characters_are_replaced() {
        assert_eq!(sanitize_title("line\nbreak\ttab\0nul"), "line_break_tab_nul");
    }

    #[test]
    fn empty_or_dot_titles_fall_back() {
        assert_eq!(sanitize_title(""), "untitled");
        assert_eq!(sanitize_title("   "), "untitled");
        assert_eq!(sanitize_title(".."), "untitled");
        assert_eq!(sanitize_title("."), "untitled");
        assert_eq!(sanitize_title(". . ."), "untitled");
        assert_eq!(sanitize_title(". .hidden"), "hidden");
        assert_eq!(sanitize_title("  notes. "), "notes");
    }

    #[test]
    fn long_titles_are_truncated() {
        let long = "x".repeat(500);
        assert_eq!(sanitize_title(&long).chars().count(), 100);

        let cut_at_dot = format!("{}. tail", "x".repeat(99));
        assert_eq!(sanitize_title(&cut_at_dot), "x".repeat(99));
    }

    #[test]
    fn odd_extensions_are_dropped() {
        assert_eq!(url_extension("https://x/no-extension"), "");
        assert_eq!(url_extension("https://x/dir.d/file"), "");
        assert_eq!(url_extension("https://x/.hidden"), "");
        assert_eq!(url_extension("https://x/file.tar%2Fgz"), "");
        assert_eq!(url_extension("https://x/file.waytoolongext"), "");
        assert_eq!(url_extension("not a url/pic.gif?x=1"), ".gif");
    }

    // -- retrieval -----------------------------------------------------------

    #[test]
    fn download_writes_body_to_file() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out.bin");
        let client = FakeClient::new().with_body("http://x/a.bin", b"payload".to_vec());

        let written = download(&client, "http://x/a.bin", &dest).unwrap();

        assert_eq!(written, 7);
        assert_eq!(fs::read(&dest).unwrap(), b"payload");
    }

    #[test]
    fn network_failure_creates_no_file() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out.bin");
        let client = FakeClient::new().with_failure("http://x/a.bin", "timed out");

        let err = download(&client, "http://x/a.bin", &dest).unwrap_err();

        assert!(matches!(err, MediaError::Network(_)));
        assert!(!dest.exists());
    }

    #[test]
    fn broken_body_removes_partial_file() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("out.bin");
        let client = FakeClient::new().with_broken_body("http://x/a.bin", b"half".to_vec());

        let err = download(&client, "http://x/a.bin", &dest).unwrap_err();

        assert!(matches!(err, MediaError::Network(_)));
        assert!(!dest.exists());
    }

    #[test]
    fn unwritable_destination_is_disk_error() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("missing-dir").join("out.bin");
        let client = FakeClient::new().with_body("http://x/a.bin", b"payload".to_vec());

        let err = download(&client, "http://x/a.bin", &dest).unwrap_err();
        assert!(matches!(err, MediaError::DiskWrite { ref path, .. } if path == &dest));
    }

    #[test]
    fn one_failed_attachment_does_not_stop_siblings() {
        let dir = TempDir::new().unwrap();
        let item = item_with_media(
            "Gallery",
            &["http://x/one.jpg", "http://x/two.jpg", "http://x/three.png"],
        );
        let client = FakeClient::new()
            .with_body("http://x/one.jpg", b"1".to_vec())
            .with_failure("http://x/two.jpg", "boom")
            .with_body("http://x/three.png", b"333".to_vec());

        let outcomes = fetch_item_media(&client, dir.path(), &annotate(&item));

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].result.is_ok());
        assert!(outcomes[1].result.is_err());
        assert!(matches!(outcomes[2].result, Ok(3)));
        assert!(dir.path().join("Gallery_media_0.jpg").exists());
        assert!(!dir.path().join("Gallery_media_1.jpg").exists());
        assert!(dir.path().join("Gallery_media_2.png").exists());
    }

    #[test]
    fn each_attachment_is_requested_once() {
        let dir = TempDir::new().unwrap();
        let item = item_with_media("Pics", &["http://x/a.jpg", "http://x/b.jpg"]);
        let client = FakeClient::new()
            .with_body("http://x/a.jpg", b"a".to_vec())
            .with_body("http://x/b.jpg", b"b".to_vec());

        fetch_item_media(&client, dir.path(), &annotate(&item));

        assert_eq!(client.request_count("http://x/a.jpg"), 1);
        assert_eq!(client.request_count("http://x/b.jpg"), 1);
    }

    #[test]
    fn creates_download_dir_on_demand() {
        let dir = TempDir::new().unwrap();
        let downloads = dir.path().join("downloads");
        let item = item_with_media("Pic", &["http://x/a.jpg"]);
        let client = FakeClient::new().with_body("http://x/a.jpg", b"a".to_vec());

        let outcomes = fetch_item_media(&client, &downloads, &annotate(&item));

        assert!(outcomes[0].result.is_ok());
        assert!(downloads.join("Pic_media_0.jpg").exists());
    }

    #[test]
    fn items_without_media_are_skipped() {
        let dir = TempDir::new().unwrap();
        let item = item_with_media("Text only", &[]);
        let client = FakeClient::new();

        assert!(fetch_item_media(&client, dir.path(), &annotate(&item)).is_empty());
        assert!(client.requests.borrow().is_empty());
    }
}
