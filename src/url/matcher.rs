/// Checks if a host matches an allow-list pattern
///
/// Patterns are compared case-sensitively and must match the whole host;
/// [`HostFilter`](crate::url::HostFilter) lowercases its patterns to line up
/// with parsed hosts.
/// A `*` matches any run of characters, including an empty one and
/// including dots, and may appear anywhere in the pattern.
///
/// # Arguments
///
/// * `pattern` - The host pattern, e.g. `example.com` or `*.example.com`
/// * `host` - The host to check against the pattern
///
/// # Examples
///
/// ```
/// use site_freezer::url::matches_pattern;
///
/// assert!(matches_pattern("example.com", "example.com"));
/// assert!(matches_pattern("*.example.com", "blog.example.com"));
/// assert!(matches_pattern("*", "anything.at.all"));
/// assert!(!matches_pattern("*.example.com", "example.com"));
/// assert!(!matches_pattern("example.com", "EXAMPLE.COM"));
/// ```
pub fn matches_pattern(pattern: &str, host: &str) -> bool {
    let pattern = pattern.as_bytes();
    let host = host.as_bytes();

    let (mut p, mut h) = (0, 0);
    // Position of the last `*` seen and the host index it was tried at
    let mut backtrack: Option<(usize, usize)> = None;

    while h < host.len() {
        if p < pattern.len() && pattern[p] == b'*' {
            backtrack = Some((p, h));
            p += 1;
        } else if p < pattern.len() && pattern[p] == host[h] {
            p += 1;
            h += 1;
        } else if let Some((star, tried)) = backtrack {
            p = star + 1;
            h = tried + 1;
            backtrack = Some((star, tried + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&c| c == b'*')
}
