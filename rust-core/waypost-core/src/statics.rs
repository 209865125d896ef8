//! # Static Files
//!
//! Serves files from the configured `statics` directories for GET and HEAD
//! requests that no route matched. Directories are searched in order; a
//! directory path serves its `index.html`.

use crate::response::Response;
use hyper::Method;
use std::path::{Component, Path, PathBuf};

/// Static asset directories
#[derive(Debug, Clone, Default)]
pub struct StaticFiles {
    dirs: Vec<PathBuf>,
}

impl StaticFiles {
    /// Serve from `dirs`, first match wins
    #[must_use]
    pub const fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    /// Whether no directory is configured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    /// Map a URL path under `base`, rejecting anything that escapes it
    fn map_path(base: &Path, url_path: &str) -> Option<PathBuf> {
        let mut pb = base.to_path_buf();
        for comp in Path::new(url_path.trim_start_matches('/')).components() {
            match comp {
                Component::Normal(s) => pb.push(s),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(pb)
    }

    fn content_type(path: &Path) -> &'static str {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str()
        {
            "html" | "htm" => "text/html; charset=utf-8",
            "css" => "text/css; charset=utf-8",
            "js" | "mjs" => "application/javascript; charset=utf-8",
            "json" => "application/json",
            "txt" => "text/plain; charset=utf-8",
            "svg" => "image/svg+xml",
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "ico" => "image/x-icon",
            "wasm" => "application/wasm",
            _ => "application/octet-stream",
        }
    }

    /// Look the request up in the static directories
    ///
    /// Returns `None` when nothing matches, leaving the 404 to the caller.
    pub async fn serve(&self, method: &Method, url_path: &str) -> Option<Response> {
        if *method != Method::GET && *method != Method::HEAD {
            return None;
        }

        for dir in &self.dirs {
            let Some(mut path) = Self::map_path(dir, url_path) else {
                continue;
            };
            if tokio::fs::metadata(&path).await.is_ok_and(|m| m.is_dir()) {
                path.push("index.html");
            }
            if let Ok(bytes) = tokio::fs::read(&path).await {
                return Some(Response::with_body(200, Self::content_type(&path), bytes));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hello.txt"), "Hello\n").unwrap();
        std::fs::create_dir(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs/index.html"), "<h1>docs</h1>").unwrap();
        dir
    }

    #[test]
    fn test_map_path_prevents_traversal() {
        let base = Path::new("public");
        assert!(StaticFiles::map_path(base, "../Cargo.toml").is_none());
        assert!(StaticFiles::map_path(base, "/a/../../etc/passwd").is_none());
        assert_eq!(
            StaticFiles::map_path(base, "/css/./site.css"),
            Some(PathBuf::from("public/css/site.css"))
        );
    }

    #[tokio::test]
    async fn test_serves_plain_file() {
        let dir = fixture();
        let statics = StaticFiles::new(vec![dir.path().to_path_buf()]);

        let res = statics.serve(&Method::GET, "/hello.txt").await.unwrap();
        assert_eq!(res.status, 200);
        assert_eq!(res.header("content-type"), Some("text/plain; charset=utf-8"));
        assert_eq!(res.body_str(), Some("Hello\n"));
    }

    #[tokio::test]
    async fn test_directory_serves_index() {
        let dir = fixture();
        let statics = StaticFiles::new(vec![dir.path().to_path_buf()]);

        let res = statics.serve(&Method::HEAD, "/docs").await.unwrap();
        assert_eq!(res.body_str(), Some("<h1>docs</h1>"));
    }

    #[tokio::test]
    async fn test_misses_and_other_methods() {
        let dir = fixture();
        let statics = StaticFiles::new(vec![dir.path().to_path_buf()]);

        assert!(statics.serve(&Method::GET, "/nope.txt").await.is_none());
        assert!(statics.serve(&Method::POST, "/hello.txt").await.is_none());
    }
}
