use std::path::{Path, PathBuf};

/// Maps a URL path to its destination file under `root`
///
/// A path ending in `/` denotes a directory and maps to `index_name` inside
/// it; any other path maps to itself, with no extension added. Empty, `.` and
/// `..` segments are skipped so the result never escapes `root`.
///
/// # Examples
///
/// ```
/// use site_freezer::materializer::map_path;
/// use std::path::Path;
///
/// let root = Path::new("/srv/site");
/// assert_eq!(map_path(root, "/", "index.html"), root.join("index.html"));
/// assert_eq!(map_path(root, "/docs/", "index.html"), root.join("docs/index.html"));
/// assert_eq!(map_path(root, "/docs/api", "index.html"), root.join("docs/api"));
/// ```
pub fn map_path(root: &Path, url_path: &str, index_name: &str) -> PathBuf {
    let mut destination = root.to_path_buf();

    for segment in url_path.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            continue;
        }
        destination.push(segment);
    }

    if url_path.is_empty() || url_path.ends_with('/') {
        destination.push(index_name);
    }

    destination
}
