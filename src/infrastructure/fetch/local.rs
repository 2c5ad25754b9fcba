//! Local content image source.

use std::path::{Component, Path, PathBuf};

use bytes::BytesMut;
use futures_util::{StreamExt, stream};
use reqwest::Url;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::domain::errors::FetchError;
use crate::domain::ports::ByteStream;

const CHUNK_SIZE: usize = 16 * 1024;

/// Decodes `content://authority/path` into the relative path `authority/path`.
///
/// Percent escapes are decoded by rebasing onto a `file://` URL; the result
/// may only contain normal components.
fn content_relative_path(url: &Url, reference: &str) -> Result<PathBuf, FetchError> {
    let escapes = || FetchError::invalid_identifier(reference, "path escapes content root");

    let authority = url.host_str().unwrap_or_default();
    if !Path::new(authority)
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
    {
        return Err(escapes());
    }

    let mut rebased = Url::parse("file:///")
        .map_err(|e| FetchError::invalid_identifier(reference, e.to_string()))?;
    rebased.set_path(&format!("/{authority}{}", url.path()));

    let decoded = rebased
        .to_file_path()
        .map_err(|()| FetchError::invalid_identifier(reference, "not a local path"))?;

    let mut relative = PathBuf::new();
    for component in decoded.components() {
        match component {
            Component::RootDir => {}
            Component::Normal(part) => relative.push(part),
            _ => return Err(escapes()),
        }
    }
    if relative.as_os_str().is_empty() {
        return Err(FetchError::invalid_identifier(reference, "empty content path"));
    }
    Ok(relative)
}

/// Opens `file://` paths directly and resolves `content://authority/path`
/// references below a content root.
#[derive(Debug, Clone, Default)]
pub struct LocalSource {
    content_root: Option<PathBuf>,
}

impl LocalSource {
    /// Creates a source. Without a content root, `content://` references fail.
    #[must_use]
    pub const fn new(content_root: Option<PathBuf>) -> Self {
        Self { content_root }
    }

    /// Maps a local reference to a filesystem path.
    ///
    /// # Errors
    /// Returns error for malformed references, references escaping the
    /// content root, or `content://` without a configured root.
    pub fn resolve(&self, reference: &str) -> Result<PathBuf, FetchError> {
        let url = Url::parse(reference)
            .map_err(|e| FetchError::invalid_identifier(reference, e.to_string()))?;

        match url.scheme() {
            "file" => url
                .to_file_path()
                .map_err(|()| FetchError::invalid_identifier(reference, "not a local path")),
            "content" => {
                let Some(root) = &self.content_root else {
                    return Err(FetchError::provider("no content root configured"));
                };
                Ok(root.join(content_relative_path(&url, reference)?))
            }
            other => Err(FetchError::invalid_identifier(
                reference,
                format!("unsupported scheme {other}"),
            )),
        }
    }

    /// Opens the referenced file as a chunked stream.
    ///
    /// # Errors
    /// Returns error if the reference cannot be resolved or opened.
    pub async fn open(&self, reference: &str) -> Result<ByteStream, FetchError> {
        let path = self.resolve(reference)?;
        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FetchError::not_found(reference));
            }
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), "Opened local content");

        let body = stream::try_unfold(file, |mut file| async move {
            let mut buf = BytesMut::with_capacity(CHUNK_SIZE);
            let read = file.read_buf(&mut buf).await?;
            Ok::<_, FetchError>((read > 0).then(|| (buf.freeze(), file)))
        });
        Ok(body.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::TryStreamExt;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_content_reference() {
        let source = LocalSource::new(Some(PathBuf::from("/data")));
        let path = source.resolve("content://contacts/photos/7.png").unwrap();
        assert_eq!(path, PathBuf::from("/data/contacts/photos/7.png"));
    }

    #[test]
    fn test_resolve_stays_inside_root() {
        let source = LocalSource::new(Some(PathBuf::from("/data")));

        // dot segments in the path are normalised by URL parsing
        let path = source.resolve("content://contacts/a/../../b").unwrap();
        assert_eq!(path, PathBuf::from("/data/contacts/b"));

        let err = source.resolve("content://../secret").err().unwrap();
        assert!(matches!(err, FetchError::InvalidIdentifier { .. }));
    }

    #[test]
    fn test_resolve_decodes_escapes() {
        let source = LocalSource::new(Some(PathBuf::from("/data")));

        let path = source.resolve("content://media/my%20pic.png").unwrap();
        assert_eq!(path, PathBuf::from("/data/media/my pic.png"));

        let path = source.resolve("content://media/caf%C3%A9/a%23b.png").unwrap();
        assert_eq!(path, PathBuf::from("/data/media/café/a#b.png"));
    }

    #[tokio::test]
    async fn test_open_escaped_content_reference() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("media")).unwrap();
        std::fs::write(temp.path().join("media/my pic.png"), b"pixels").unwrap();

        let source = LocalSource::new(Some(temp.path().to_path_buf()));
        let chunks: Vec<_> = source
            .open("content://media/my%20pic.png")
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(chunks.concat(), b"pixels");
    }

    #[test]
    fn test_content_without_root_fails() {
        let source = LocalSource::default();
        let err = source.resolve("content://contacts/1").err().unwrap();
        assert!(matches!(err, FetchError::Provider { .. }));
    }

    #[tokio::test]
    async fn test_open_streams_whole_file() {
        let temp = TempDir::new().unwrap();
        let data: Vec<u8> = (0..40_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::create_dir_all(temp.path().join("media")).unwrap();
        std::fs::write(temp.path().join("media/pic.png"), &data).unwrap();

        let source = LocalSource::new(Some(temp.path().to_path_buf()));
        let chunks: Vec<_> = source
            .open("content://media/pic.png")
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        assert!(chunks.len() > 1);
        let joined: Vec<u8> = chunks.iter().flat_map(|c| c.iter().copied()).collect();
        assert_eq!(joined, data);
    }

    #[tokio::test]
    async fn test_open_missing_file_is_not_found() {
        let temp = TempDir::new().unwrap();
        let source = LocalSource::new(Some(temp.path().to_path_buf()));
        let err = source.open("content://media/none.png").await.err().unwrap();
        assert!(err.is_not_found());
    }
}
