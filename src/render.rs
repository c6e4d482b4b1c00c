//! Markdown and plain-text to HTML rendering

use once_cell::sync::Lazy;
use pulldown_cmark::{html, Options, Parser};
use regex::Regex;

static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<h[12](?:\s[^>]*)?>(.*?)</h[12]>").unwrap());
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Render markdown to HTML
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(markdown, options);
    let mut output = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut output, parser);
    output
}

/// Render plain text to HTML
///
/// Blank lines separate paragraphs; single line breaks become `<br>`.
pub fn text_to_html(text: &str) -> String {
    let mut output = String::new();
    let mut paragraph: Vec<&str> = Vec::new();

    for line in text.lines().chain(std::iter::once("")) {
        if line.trim().is_empty() {
            if !paragraph.is_empty() {
                let escaped: Vec<String> = paragraph
                    .iter()
                    .map(|l| html_escape::encode_text(l).to_string())
                    .collect();
                output.push_str("<p>");
                output.push_str(&escaped.join("<br>"));
                output.push_str("</p>\n");
                paragraph.clear();
            }
            continue;
        }
        paragraph.push(line);
    }

    output
}

/// Text content of the first `<h1>` or `<h2>` in rendered HTML
pub fn first_heading_text(html: &str) -> Option<String> {
    let caps = HEADING_RE.captures(html)?;
    let inner = TAG_RE.replace_all(&caps[1], "");
    let text = html_escape::decode_html_entities(&inner).trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_to_html_renders_images_and_links() {
        let html = markdown_to_html("# Title\n\n![pic](:/abc) and [doc](:/def)");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains(r#"src=":/abc""#));
        assert!(html.contains(r#"href=":/def""#));
    }

    #[test]
    fn test_text_to_html_paragraphs() {
        let html = text_to_html("line one\nline two\n\n<b>bold?</b>");
        assert_eq!(
            html,
            "<p>line one<br>line two</p>\n<p>&lt;b&gt;bold?&lt;/b&gt;</p>\n"
        );
        assert_eq!(text_to_html(""), "");
    }

    #[test]
    fn test_first_heading_text() {
        assert_eq!(
            first_heading_text(
                "<p>intro</p><h2 id=\"x\">Sub <em>title</em> &amp; more</h2><h1>Later</h1>"
            ),
            Some("Sub title & more".to_string())
        );
        assert_eq!(first_heading_text("<h3>Too deep</h3>"), None);
        assert_eq!(first_heading_text("<h1>  </h1>"), None);
    }
}
