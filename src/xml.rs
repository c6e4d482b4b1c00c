//! Immutable XML element tree
//!
//! Parsing only builds the tree. Typed values are read through accessor
//! functions each time they are asked for, so one malformed field does not
//! prevent reading the others.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
    /// Concatenated text and CDATA directly inside this element
    pub text: String,
}

impl XmlElement {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Trimmed text of the first child called `name`, if non-empty
    pub fn text_of(&self, name: &str) -> Option<&str> {
        self.child(name)
            .map(|c| c.text.trim())
            .filter(|t| !t.is_empty())
    }

    pub fn number_of(&self, name: &str) -> Option<f64> {
        self.text_of(name).and_then(|t| t.parse::<f64>().ok())
    }

    /// Accepts `true`/`false` and `1`/`0`
    pub fn bool_of(&self, name: &str) -> Option<bool> {
        match self.text_of(name)?.to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        }
    }
}

/// Parse a document and return its root element
pub fn parse_document(text: &str) -> Result<XmlElement, String> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => stack.push(element_from(e)?),
            Ok(Event::Empty(ref e)) => {
                let element = element_from(e)?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| "unexpected closing tag".to_string())?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::Text(e)) => {
                if let Some(current) = stack.last_mut() {
                    let text = e
                        .unescape()
                        .map(|t| t.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&e).to_string());
                    current.text.push_str(&text);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!(
                    "XML parse error at position {}: {}",
                    reader.buffer_position(),
                    e
                ));
            }
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(format!("unexpected end of document inside <{}>", open.name));
    }
    root.ok_or_else(|| "document has no root element".to_string())
}

fn element_from(start: &BytesStart) -> Result<XmlElement, String> {
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| format!("invalid attribute: {}", e))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr
            .unescape_value()
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).to_string());
        attributes.push((key, value));
    }

    Ok(XmlElement {
        name: String::from_utf8_lossy(start.name().as_ref()).to_string(),
        attributes,
        children: Vec::new(),
        text: String::new(),
    })
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), String> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
    } else if root.is_none() {
        *root = Some(element);
    } else {
        return Err("document has more than one root element".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tree_and_accessors() {
        let root = parse_document(
            r#"<?xml version="1.0"?>
            <root kind="demo">
                <name> Widget </name>
                <width>640</width>
                <flag>true</flag>
                <item>a</item><item>b</item>
                <body><![CDATA[<p>raw & markup</p>]]></body>
                <empty/>
            </root>"#,
        )
        .unwrap();

        assert_eq!(root.name, "root");
        assert_eq!(root.attribute("kind"), Some("demo"));
        assert_eq!(root.text_of("name"), Some("Widget"));
        assert_eq!(root.number_of("width"), Some(640.0));
        assert_eq!(root.bool_of("flag"), Some(true));
        assert_eq!(root.children_named("item").count(), 2);
        assert_eq!(root.text_of("body"), Some("<p>raw & markup</p>"));
        assert!(root.child("empty").is_some());
        assert_eq!(root.text_of("empty"), None);
        assert_eq!(root.text_of("missing"), None);
    }

    #[test]
    fn test_malformed_field_does_not_hide_others() {
        let root = parse_document("<r><width>wide</width><height>10</height></r>").unwrap();
        assert_eq!(root.number_of("width"), None);
        assert_eq!(root.number_of("height"), Some(10.0));
    }

    #[test]
    fn test_entities_are_unescaped() {
        let root = parse_document("<r><t>a &amp; b</t></r>").unwrap();
        assert_eq!(root.text_of("t"), Some("a & b"));
    }

    #[test]
    fn test_unclosed_document_is_an_error() {
        assert!(parse_document("<r><note><title>x</title>").is_err());
        assert!(parse_document("<r></other>").is_err());
        assert!(parse_document("").is_err());
    }
}
