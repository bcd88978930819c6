//! Delivery policy: size limits, MIME labeling, and response headers.
//!
//! Policy runs after resolution and before any file byte is read. It never
//! touches the filesystem; it only inspects the [`ResolvedFile`] metadata.

use std::collections::BTreeMap;

use crate::error::AccessError;
use crate::resolve::ResolvedFile;

/// Cache directive sent with every successful delivery.
pub const CACHE_CONTROL: &str = "private, no-cache, no-store, must-revalidate";

/// Static security headers applied identically to every success response.
pub const SECURITY_HEADERS: &[(&str, &str)] = &[
    ("X-Content-Type-Options", "nosniff"),
    ("X-Frame-Options", "DENY"),
    ("X-XSS-Protection", "1; mode=block"),
    ("Referrer-Policy", "strict-origin-when-cross-origin"),
    ("Content-Security-Policy", "default-src 'self'"),
    ("Strict-Transport-Security", "max-age=31536000; includeSubDomains"),
];

/// Fallback MIME type for extensions outside the whitelist. The whitelist
/// is a labeling table, not a gate: unknown extensions are still served.
pub const GENERIC_BINARY_MIME: &str = "application/octet-stream";

/// Extension-to-MIME labeling table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeWhitelist {
    map: BTreeMap<String, String>,
}

impl MimeWhitelist {
    /// The built-in table covering web assets, documents, images, and
    /// archives.
    pub fn with_defaults() -> Self {
        Self {
            map: default_mime_types(),
        }
    }

    pub fn from_map(map: BTreeMap<String, String>) -> Self {
        Self { map }
    }

    /// Look up a lowercased extension; unknown extensions get the generic
    /// binary type.
    pub fn lookup(&self, extension: &str) -> &str {
        self.map
            .get(extension)
            .map(String::as_str)
            .unwrap_or(GENERIC_BINARY_MIME)
    }
}

/// The default extension-to-MIME table.
pub fn default_mime_types() -> BTreeMap<String, String> {
    let entries = [
        ("html", "text/html"),
        ("pdf", "application/pdf"),
        ("css", "text/css"),
        ("js", "application/javascript"),
        ("png", "image/png"),
        ("jpg", "image/jpeg"),
        ("jpeg", "image/jpeg"),
        ("gif", "image/gif"),
        ("svg", "image/svg+xml"),
        ("webp", "image/webp"),
        ("doc", "application/msword"),
        (
            "docx",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        ),
        ("xls", "application/vnd.ms-excel"),
        (
            "xlsx",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        ),
        ("ppt", "application/vnd.ms-powerpoint"),
        (
            "pptx",
            "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        ),
        ("zip", "application/zip"),
        ("rar", "application/x-rar-compressed"),
        ("7z", "application/x-7z-compressed"),
    ];
    entries
        .iter()
        .map(|(ext, mime)| (ext.to_string(), mime.to_string()))
        .collect()
}

/// Size limits plus the MIME table.
#[derive(Debug, Clone)]
pub struct DeliveryPolicy {
    /// Hard cap; larger files are refused outright.
    pub max_file_size: u64,

    /// Files at or below this size are read whole; larger files stream.
    pub direct_download_threshold: u64,

    mime: MimeWhitelist,
}

/// How an approved file will be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryPlan {
    pub mime: String,
    pub size: u64,
    pub chunked: bool,
}

impl DeliveryPolicy {
    pub fn new(max_file_size: u64, direct_download_threshold: u64, mime: MimeWhitelist) -> Self {
        Self {
            max_file_size,
            direct_download_threshold,
            mime,
        }
    }

    /// Evaluate a resolved file against the policy.
    ///
    /// Oversized files fail with [`AccessError::TooLarge`] before any byte
    /// is read.
    pub fn evaluate(&self, file: &ResolvedFile) -> Result<DeliveryPlan, AccessError> {
        if file.size > self.max_file_size {
            tracing::warn!(
                path = %file.path.display(),
                size = file.size,
                limit = self.max_file_size,
                "file exceeds size limit"
            );
            return Err(AccessError::TooLarge {
                size: file.size,
                limit: self.max_file_size,
            });
        }

        let extension = file
            .path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();

        Ok(DeliveryPlan {
            mime: self.mime.lookup(&extension).to_string(),
            size: file.size,
            chunked: file.size > self.direct_download_threshold,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn policy() -> DeliveryPolicy {
        DeliveryPolicy::new(1024 * 1024 * 1024, 1024 * 1024, MimeWhitelist::with_defaults())
    }

    fn file(path: &str, size: u64) -> ResolvedFile {
        ResolvedFile {
            path: PathBuf::from(path),
            size,
        }
    }

    #[test]
    fn test_known_extensions_map() {
        let policy = policy();
        let plan = policy.evaluate(&file("/v/g/report.pdf", 100)).unwrap();
        assert_eq!(plan.mime, "application/pdf");

        let plan = policy.evaluate(&file("/v/g/page.html", 100)).unwrap();
        assert_eq!(plan.mime, "text/html");

        let plan = policy.evaluate(&file("/v/g/archive.7z", 100)).unwrap();
        assert_eq!(plan.mime, "application/x-7z-compressed");
    }

    #[test]
    fn test_extension_is_case_insensitive() {
        let plan = policy().evaluate(&file("/v/g/SCAN.PDF", 100)).unwrap();
        assert_eq!(plan.mime, "application/pdf");
    }

    #[test]
    fn test_unknown_or_missing_extension_is_octet_stream() {
        let policy = policy();
        let plan = policy.evaluate(&file("/v/g/data.xyz", 100)).unwrap();
        assert_eq!(plan.mime, GENERIC_BINARY_MIME);

        let plan = policy.evaluate(&file("/v/g/README", 100)).unwrap();
        assert_eq!(plan.mime, GENERIC_BINARY_MIME);
    }

    #[test]
    fn test_threshold_selects_direct_or_chunked() {
        let policy = policy();
        let threshold = policy.direct_download_threshold;

        assert!(!policy.evaluate(&file("/v/g/a", 0)).unwrap().chunked);
        assert!(!policy.evaluate(&file("/v/g/a", threshold)).unwrap().chunked);
        assert!(policy.evaluate(&file("/v/g/a", threshold + 1)).unwrap().chunked);
    }

    #[test]
    fn test_oversized_file_rejected() {
        let policy = policy();
        let size = policy.max_file_size + 1;
        let err = policy.evaluate(&file("/v/g/huge.bin", size)).unwrap_err();
        assert!(matches!(err, AccessError::TooLarge { .. }));
        assert_eq!(err.status(), 413);
    }

    #[test]
    fn test_limit_sized_file_allowed() {
        let policy = policy();
        let plan = policy
            .evaluate(&file("/v/g/huge.bin", policy.max_file_size))
            .unwrap();
        assert!(plan.chunked);
    }

    #[test]
    fn test_custom_mime_table() {
        let mut map = BTreeMap::new();
        map.insert("md".to_string(), "text/markdown".to_string());
        let policy = DeliveryPolicy::new(1000, 100, MimeWhitelist::from_map(map));

        let plan = policy.evaluate(&file("/v/g/notes.md", 10)).unwrap();
        assert_eq!(plan.mime, "text/markdown");
        // Defaults are replaced, not merged.
        let plan = policy.evaluate(&file("/v/g/a.pdf", 10)).unwrap();
        assert_eq!(plan.mime, GENERIC_BINARY_MIME);
    }
}
