//! XML parsing into [`Element`] trees

use crate::element::{Element, Node};
use crate::{Error, Result};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

const FRAGMENT_ROOT: &str = "csync-fragment";

/// How whitespace-only text runs are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Whitespace {
    /// Runs spanning a line break are indentation and are dropped.
    DropLayout,
    Keep,
}

impl Whitespace {
    fn drops(self, text: &str) -> bool {
        self == Self::DropLayout && text.contains(['\n', '\r'])
    }
}

/// Parse a complete document and return its root element.
///
/// Declarations, comments, and processing instructions are skipped.
/// Whitespace-only text spanning a line break is layout and is dropped;
/// other text, including a space between two inline elements, is kept
/// verbatim.
pub fn parse_document(input: &str) -> Result<Element> {
    parse_root(input, Whitespace::DropLayout)
}

/// Parse a markup fragment (zero or more sibling nodes). All text is kept.
pub fn parse_fragment(input: &str) -> Result<Vec<Node>> {
    let body = strip_declaration(input);
    let wrapped = format!("<{FRAGMENT_ROOT}>{body}</{FRAGMENT_ROOT}>");
    let root = parse_root(&wrapped, Whitespace::Keep)?;
    Ok(root.children)
}

fn parse_root(input: &str, whitespace: Whitespace) -> Result<Element> {
    let mut roots = parse_nodes(input, whitespace)?;
    let mut elements = roots.drain(..).filter_map(|n| match n {
        Node::Element(e) => Some(e),
        Node::Text(_) => None,
    });
    let root = elements
        .next()
        .ok_or_else(|| Error::xml("document has no root element"))?;
    if elements.next().is_some() {
        return Err(Error::xml("document has more than one root element"));
    }
    Ok(root)
}

/// Whether text looks like embedded markup: its first non-whitespace
/// character is `<`.
pub fn looks_like_markup(text: &str) -> bool {
    text.trim_start().starts_with('<')
}

fn strip_declaration(input: &str) -> &str {
    let trimmed = input.trim_start();
    if trimmed.starts_with("<?xml") {
        if let Some(end) = trimmed.find("?>") {
            return &trimmed[end + 2..];
        }
    }
    input
}

fn parse_nodes(input: &str, whitespace: Whitespace) -> Result<Vec<Node>> {
    let mut reader = Reader::from_str(input);
    let mut stack: Vec<Element> = Vec::new();
    let mut top: Vec<Node> = Vec::new();

    loop {
        match reader.read_event().map_err(Error::xml)? {
            Event::Start(start) => stack.push(element_from_start(&start)?),
            Event::Empty(start) => {
                let element = element_from_start(&start)?;
                attach(&mut stack, &mut top, Node::Element(element));
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| Error::xml("unexpected closing tag"))?;
                attach(&mut stack, &mut top, Node::Element(element));
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(Error::xml)?;
                push_text(&mut stack, &text, whitespace)?;
            }
            Event::CData(cdata) => {
                let text = String::from_utf8(cdata.into_inner().into_owned()).map_err(Error::xml)?;
                push_text(&mut stack, &text, Whitespace::Keep)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(Error::xml(format!("unclosed element <{}>", open.name)));
    }
    Ok(top)
}

fn push_text(stack: &mut [Element], text: &str, whitespace: Whitespace) -> Result<()> {
    let blank = text.trim().is_empty();
    match stack.last_mut() {
        Some(_) if blank && whitespace.drops(text) => Ok(()),
        Some(parent) => {
            parent.push_text(text);
            Ok(())
        }
        None if blank => Ok(()),
        None => Err(Error::xml("text outside of the root element")),
    }
}

fn attach(stack: &mut [Element], top: &mut Vec<Node>, node: Node) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => top.push(node),
    }
}

fn element_from_start(start: &BytesStart<'_>) -> Result<Element> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(Error::xml)?
        .to_string();
    let mut element = Element::new(name);
    for attribute in start.attributes() {
        let attribute = attribute.map_err(Error::xml)?;
        let key = std::str::from_utf8(attribute.key.as_ref())
            .map_err(Error::xml)?
            .to_string();
        let value = attribute.unescape_value().map_err(Error::xml)?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_nested_document() {
        let root = parse_document(
            r#"<?xml version="1.0"?>
<template key="/a/t">
  <!-- comment -->
  <description>Tom &amp; Jerry</description>
  <body><![CDATA[<raw>]]></body>
</template>"#,
        )
        .unwrap();

        assert_eq!(root.name, "template");
        assert_eq!(root.attribute("key"), Some("/a/t"));
        assert_eq!(root.child("description").unwrap().text(), "Tom & Jerry");
        assert_eq!(root.child("body").unwrap().text(), "<raw>");
    }

    #[test]
    fn rejects_mismatched_tags() {
        assert!(parse_document("<a><b></a>").is_err());
        assert!(parse_document("<a>").is_err());
        assert!(parse_document("").is_err());
    }

    #[test]
    fn fragment_keeps_siblings() {
        let nodes = parse_fragment("<p>one</p><p>two</p>").unwrap();
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn fragment_keeps_space_between_elements() {
        let nodes = parse_fragment("<p>a</p> <p>b</p>\n<p>c</p>").unwrap();
        assert_eq!(nodes.len(), 5);
        assert_eq!(nodes[1], Node::Text(" ".to_string()));
        assert_eq!(nodes[3], Node::Text("\n".to_string()));
    }

    #[test]
    fn document_drops_indentation_only() {
        let root = parse_document("<body>\n  <p>a</p> <p>b</p>\n</body>").unwrap();
        assert_eq!(root.children.len(), 3);
        assert_eq!(root.children[1], Node::Text(" ".to_string()));
    }

    #[test]
    fn markup_detection() {
        assert!(looks_like_markup("  \n<p/>"));
        assert!(!looks_like_markup("a < b"));
    }
}
