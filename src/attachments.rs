//! Attachment resolution shared by every importer
//!
//! A note's rendered HTML references resources through a format-specific
//! scheme (`:/<id>` for Joplin, `<en-media hash>` for Evernote, relative paths
//! for Zoho). [`resolve_attachments`] finds each referenced resource, hashes
//! its bytes, and rewrites every reference to a canonical embed keyed by that
//! hash. Resources nothing references are dropped.

use std::collections::HashSet;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::hasher::Hasher;
use crate::models::Attachment;

/// Media elements or embeds nested inside a link
static NESTED_MEDIA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<(?:img|source|embed)\b|\bdata-hash\s*="#).unwrap());

/// MIME type used when a resource does not declare one
pub const DEFAULT_MIME: &str = "application/octet-stream";

/// Extension → MIME pairs for resources that only have a file name
const MIME_TYPES: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("svg", "image/svg+xml"),
    ("bmp", "image/bmp"),
    ("pdf", "application/pdf"),
    ("txt", "text/plain"),
    ("html", "text/html"),
    ("json", "application/json"),
    ("zip", "application/zip"),
    ("mp3", "audio/mpeg"),
    ("m4a", "audio/mp4"),
    ("wav", "audio/wav"),
    ("mp4", "video/mp4"),
    ("mov", "video/quicktime"),
    ("webm", "video/webm"),
];

/// MIME type for a file name based on its extension
pub fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    MIME_TYPES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
}

/// What an importer knows about one resource before its payload is loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    pub id: String,
    pub filename: Option<String>,
    pub mime: Option<String>,
}

/// How resource ids appear inside rendered content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceScheme {
    /// `src=":/<id>"` or `href=":/<id>"`
    Joplin,
    /// `<en-media hash="<id>" ... />`
    EnexMedia,
    /// `src="<id>"` or `href="<id>"` where the id is a relative path
    RelativePath,
}

impl ReferenceScheme {
    /// Pattern matching every element that references `id`
    fn pattern(self, id: &str) -> Result<Regex, regex::Error> {
        match self {
            Self::Joplin => element_pattern(&format!(":/{}", id)),
            Self::RelativePath => element_pattern(id),
            Self::EnexMedia => Regex::new(&format!(
                r#"(?is)<en-media\b[^>]*?\bhash\s*=\s*["']{}["'][^>]*?(?:/>|>\s*</en-media>|>)"#,
                regex::escape(id)
            )),
        }
    }
}

/// `<img|source|embed src=target>` or `<a href=target>…</a>`, with the
/// link body captured as `inner`
fn element_pattern(target: &str) -> Result<Regex, regex::Error> {
    let target = regex::escape(target);
    Regex::new(&format!(
        r#"(?is)<(?:img|source|embed)\b[^>]*?\bsrc\s*=\s*["']{target}["'][^>]*>|<a\b[^>]*?\bhref\s*=\s*["']{target}["'][^>]*>(?P<inner>.*?)</a>"#
    ))
}

/// Resolve every descriptor referenced from `content` into an [`Attachment`].
///
/// `lookup` loads a descriptor's payload (inline decode or sibling file).
/// Each referencing element is replaced in place by [`embed_html`], so the
/// attachment hash always appears in the content. A link whose body holds
/// media keeps that body ahead of its embed, so a thumbnail linking to a
/// document survives either resolution order. A descriptor id is resolved
/// at most once per call.
pub fn resolve_attachments<F>(
    content: &mut String,
    descriptors: &[ResourceDescriptor],
    scheme: ReferenceScheme,
    mut lookup: F,
    hasher: &dyn Hasher,
) -> Vec<Attachment>
where
    F: FnMut(&ResourceDescriptor) -> Option<Vec<u8>>,
{
    let mut attachments = Vec::new();
    let mut resolved: HashSet<&str> = HashSet::new();

    for descriptor in descriptors {
        if descriptor.id.is_empty() || resolved.contains(descriptor.id.as_str()) {
            continue;
        }

        let pattern = match scheme.pattern(&descriptor.id) {
            Ok(pattern) => pattern,
            Err(e) => {
                log::warn!("Skipping resource {}: {}", descriptor.id, e);
                continue;
            }
        };
        if !pattern.is_match(content.as_str()) {
            continue;
        }

        let Some(data) = lookup(descriptor) else {
            log::warn!("Payload for referenced resource {} not found", descriptor.id);
            continue;
        };

        let hash = hasher.hash(&data);
        let attachment = Attachment {
            size: data.len(),
            filename: descriptor
                .filename
                .clone()
                .filter(|f| !f.is_empty())
                .unwrap_or_else(|| hash.clone()),
            mime: descriptor
                .mime
                .clone()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_MIME.to_string()),
            hash_type: hasher.kind().to_string(),
            hash,
            data,
        };

        let embed = embed_html(&attachment);
        let rewritten = pattern
            .replace_all(content.as_str(), |caps: &Captures| match caps.name("inner") {
                Some(inner) if NESTED_MEDIA_RE.is_match(inner.as_str()) => {
                    format!("{}{}", inner.as_str(), embed)
                }
                _ => embed.clone(),
            })
            .into_owned();
        *content = rewritten;

        resolved.insert(descriptor.id.as_str());
        attachments.push(attachment);
    }

    attachments
}

/// Canonical embed element for an attachment
pub fn embed_html(attachment: &Attachment) -> String {
    let filename = html_escape::encode_double_quoted_attribute(&attachment.filename);
    let mime = html_escape::encode_double_quoted_attribute(&attachment.mime);

    if attachment.mime.starts_with("image/") {
        format!(
            r#"<img data-hash="{}" data-mime="{}" data-filename="{}" data-size="{}" />"#,
            attachment.hash, mime, filename, attachment.size
        )
    } else {
        format!(
            r#"<span class="attachment" contenteditable="false" data-hash="{}" data-mime="{}" data-filename="{}" data-size="{}">{}</span>"#,
            attachment.hash,
            mime,
            filename,
            attachment.size,
            html_escape::encode_text(&attachment.filename)
        )
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::hasher::Md5Hasher;

    fn payloads() -> HashMap<&'static str, Vec<u8>> {
        HashMap::from([
            ("aaa", b"first".to_vec()),
            ("bbb", b"second".to_vec()),
            ("ccc", b"third".to_vec()),
        ])
    }

    fn descriptor(id: &str, mime: Option<&str>) -> ResourceDescriptor {
        ResourceDescriptor {
            id: id.to_string(),
            filename: None,
            mime: mime.map(str::to_string),
        }
    }

    #[test]
    fn test_each_referenced_resource_becomes_one_attachment() {
        let payloads = payloads();
        let mut content = concat!(
            r#"<p><img src=":/aaa" alt="a" /></p>"#,
            r#"<p><a href=":/bbb">doc</a></p>"#
        )
        .to_string();
        let descriptors = vec![
            descriptor("aaa", Some("image/png")),
            descriptor("bbb", Some("application/pdf")),
            descriptor("ccc", None),
        ];

        let attachments = resolve_attachments(
            &mut content,
            &descriptors,
            ReferenceScheme::Joplin,
            |d| payloads.get(d.id.as_str()).cloned(),
            &Md5Hasher,
        );

        assert_eq!(attachments.len(), 2);
        for attachment in &attachments {
            assert!(!attachment.hash.is_empty());
            assert!(content.contains(&attachment.hash));
        }
        assert!(!content.contains(":/aaa"));
        assert!(!content.contains(":/bbb"));
        assert!(content.contains(r#"<span class="attachment""#));
        assert_eq!(attachments[0].mime, "image/png");
        assert_eq!(attachments[0].filename, attachments[0].hash);
        assert_eq!(attachments[0].size, 5);
        assert_eq!(attachments[0].hash_type, "md5");
    }

    #[test]
    fn test_unreferenced_resource_yields_nothing() {
        let payloads = payloads();
        let mut content = "<p>no resources here</p>".to_string();
        let attachments = resolve_attachments(
            &mut content,
            &[descriptor("aaa", None)],
            ReferenceScheme::Joplin,
            |d| payloads.get(d.id.as_str()).cloned(),
            &Md5Hasher,
        );

        assert!(attachments.is_empty());
        assert_eq!(content, "<p>no resources here</p>");
    }

    #[test]
    fn test_repeated_reference_is_resolved_once() {
        let payloads = payloads();
        let mut content = r#"<img src=":/aaa"><p>again</p><img src=":/aaa" />"#.to_string();
        let descriptors = vec![descriptor("aaa", Some("image/png")), descriptor("aaa", None)];

        let mut lookups = 0;
        let attachments = resolve_attachments(
            &mut content,
            &descriptors,
            ReferenceScheme::Joplin,
            |d| {
                lookups += 1;
                payloads.get(d.id.as_str()).cloned()
            },
            &Md5Hasher,
        );

        assert_eq!(attachments.len(), 1);
        assert_eq!(lookups, 1);
        let hash_attr = format!("data-hash=\"{}\"", attachments[0].hash);
        assert_eq!(content.matches(&hash_attr).count(), 2);
    }

    #[test]
    fn test_missing_payload_is_dropped() {
        let mut content = r#"<img src=":/zzz">"#.to_string();
        let attachments = resolve_attachments(
            &mut content,
            &[descriptor("zzz", None)],
            ReferenceScheme::Joplin,
            |_| None,
            &Md5Hasher,
        );

        assert!(attachments.is_empty());
        assert_eq!(content, r#"<img src=":/zzz">"#);
    }

    #[test]
    fn test_en_media_reference() {
        let data = b"pixels".to_vec();
        let id = Md5Hasher.hash(&data);
        let mut content = format!(
            r#"<div>before<en-media type="image/png" hash="{}"/>after<en-media hash="{}" type="image/png"></en-media></div>"#,
            id, id
        );

        let attachments = resolve_attachments(
            &mut content,
            &[descriptor(&id, Some("image/png"))],
            ReferenceScheme::EnexMedia,
            |_| Some(data.clone()),
            &Md5Hasher,
        );

        assert_eq!(attachments.len(), 1);
        assert!(!content.contains("en-media"));
        assert!(content.starts_with("<div>before<img data-hash="));
        assert!(content.contains("after<img data-hash="));
        assert!(content.ends_with("/></div>"));
    }

    #[test]
    fn test_relative_path_reference() {
        let mut content = r#"<img src="files/photo.png"><a href="https://example.com">x</a>"#.to_string();
        let attachments = resolve_attachments(
            &mut content,
            &[ResourceDescriptor {
                id: "files/photo.png".to_string(),
                filename: Some("photo.png".to_string()),
                mime: Some("image/png".to_string()),
            }],
            ReferenceScheme::RelativePath,
            |_| Some(vec![0u8; 4]),
            &Md5Hasher,
        );

        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].filename, "photo.png");
        assert!(content.contains(r#"data-filename="photo.png""#));
        assert!(content.contains("https://example.com"));
    }

    #[test]
    fn test_thumbnail_inside_document_link_keeps_both_embeds() {
        let payloads = payloads();
        let descriptors = vec![
            descriptor("aaa", Some("image/png")),
            descriptor("bbb", Some("application/pdf")),
        ];
        let html = r#"<p><a href=":/bbb"><img src=":/aaa" alt="thumb" /></a></p>"#;

        for order in [descriptors.clone(), descriptors.iter().rev().cloned().collect()] {
            let mut content = html.to_string();
            let attachments = resolve_attachments(
                &mut content,
                &order,
                ReferenceScheme::Joplin,
                |d| payloads.get(d.id.as_str()).cloned(),
                &Md5Hasher,
            );

            assert_eq!(attachments.len(), 2);
            for attachment in &attachments {
                assert!(
                    content.contains(&format!("data-hash=\"{}\"", attachment.hash)),
                    "{} missing from {}",
                    attachment.mime,
                    content
                );
            }
            assert!(!content.contains(":/"));
        }
    }

    #[test]
    fn test_mime_from_extension() {
        assert_eq!(mime_from_extension(Path::new("a/Photo.JPG")), Some("image/jpeg"));
        assert_eq!(mime_from_extension(Path::new("doc.pdf")), Some("application/pdf"));
        assert_eq!(mime_from_extension(Path::new("noext")), None);
        assert_eq!(mime_from_extension(Path::new("x.unknown")), None);
    }

    #[test]
    fn test_embed_escapes_filename() {
        let attachment = Attachment {
            data: Vec::new(),
            size: 0,
            hash: "h".to_string(),
            hash_type: "md5".to_string(),
            filename: r#"a "quoted" <name>.pdf"#.to_string(),
            mime: DEFAULT_MIME.to_string(),
        };
        let html = embed_html(&attachment);
        assert!(html.contains("data-filename=\"a &quot;quoted&quot; &lt;name&gt;.pdf\""));
        assert!(html.contains(r#"data-hash="h""#));
    }
}
