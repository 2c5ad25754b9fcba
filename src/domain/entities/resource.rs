//! Resolution strategy for identifiers.

/// Prefixes that name content readable from the local device.
pub const LOCAL_CONTENT_PREFIXES: [&str; 2] = ["content://", "file://"];

/// How an identifier is turned into raw bytes.
///
/// Selected purely from the identifier's syntax; no I/O is involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Non-empty, all-digit key looked up in the host's blob provider.
    ProviderBlob,
    /// Local content reference opened as a stream.
    LocalStream,
    /// Anything else, fetched over HTTP.
    RemoteHttp,
}

impl ResourceKind {
    /// Classifies an identifier string.
    #[must_use]
    pub fn classify(id: &str) -> Self {
        if !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) {
            Self::ProviderBlob
        } else if LOCAL_CONTENT_PREFIXES.iter().any(|p| id.starts_with(p)) {
            Self::LocalStream
        } else {
            Self::RemoteHttp
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProviderBlob => write!(f, "provider"),
            Self::LocalStream => write!(f, "local"),
            Self::RemoteHttp => write!(f, "http"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("42", ResourceKind::ProviderBlob ; "digits")]
    #[test_case("0007", ResourceKind::ProviderBlob ; "leading_zeros")]
    #[test_case("", ResourceKind::RemoteHttp ; "empty")]
    #[test_case("42a", ResourceKind::RemoteHttp ; "digits_with_suffix")]
    #[test_case("content://contacts/photo/1", ResourceKind::LocalStream ; "content_uri")]
    #[test_case("file:///tmp/a.png", ResourceKind::LocalStream ; "file_uri")]
    #[test_case("https://x/img.png", ResourceKind::RemoteHttp ; "https")]
    #[test_case("http://x/123", ResourceKind::RemoteHttp ; "http_numeric_path")]
    fn test_classify(id: &str, expected: ResourceKind) {
        assert_eq!(ResourceKind::classify(id), expected);
    }
}
