//! Last path segment of a mirror URL.

/// Extracts the last non-empty path segment of `url`.
///
/// Returns `None` if the URL cannot be parsed, has no path segments (e.g.
/// `file:` without a path, or the bare host), or ends in `.`/`..`.
pub fn filename_from_url_path(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    match segment {
        "." | ".." => None,
        s => Some(s.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_asset_urls() {
        assert_eq!(
            filename_from_url_path(
                "https://github.com/yxlao/nerfmirror/releases/download/20220618/nerf_synthetic.zip"
            )
            .as_deref(),
            Some("nerf_synthetic.zip")
        );
        assert_eq!(
            filename_from_url_path("file:///srv/mirror/lego.tar.gz").as_deref(),
            Some("lego.tar.gz")
        );
    }

    #[test]
    fn trailing_slash_and_query_ignored() {
        assert_eq!(
            filename_from_url_path("https://mirror.example/datasets/fern/").as_deref(),
            Some("fern")
        );
        assert_eq!(
            filename_from_url_path("https://mirror.example/fern.zip?sig=abc#frag").as_deref(),
            Some("fern.zip")
        );
    }

    #[test]
    fn root_or_unparseable() {
        assert_eq!(filename_from_url_path("https://mirror.example/"), None);
        assert_eq!(filename_from_url_path("https://mirror.example"), None);
        assert_eq!(filename_from_url_path("nerf_synthetic.zip"), None);
    }
}
