//! Streaming XML writer with scoped element frames

use crate::element::{Element, Node};
use crate::{Error, Result};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io::Write;

/// Streaming XML writer.
///
/// Elements are written through [`XmlSink::element`], which opens the start
/// tag, runs the body, and writes the matching end tag on every exit path,
/// including when the body fails. Output is never left with a dangling
/// open element.
pub struct XmlSink<W: Write> {
    writer: Writer<W>,
    depth: usize,
}

impl<W: Write> XmlSink<W> {
    /// Compact writer.
    pub fn new(inner: W) -> Self {
        Self {
            writer: Writer::new(inner),
            depth: 0,
        }
    }

    /// Writer indenting nested elements by two spaces.
    pub fn pretty(inner: W) -> Self {
        Self {
            writer: Writer::new_with_indent(inner, b' ', 2),
            depth: 0,
        }
    }

    /// Writer that indents when `pretty` is set.
    pub fn with_pretty(inner: W, pretty: bool) -> Self {
        if pretty {
            Self::pretty(inner)
        } else {
            Self::new(inner)
        }
    }

    /// Current element nesting depth.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn declaration(&mut self) -> Result<()> {
        self.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
    }

    /// Write `<name attrs>`, the body, then `</name>`.
    pub fn element<F>(&mut self, name: &str, attributes: &[(String, String)], body: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.event(Event::Start(start_tag(name, attributes)))?;
        self.depth += 1;
        let result = body(self);
        self.depth -= 1;
        let closed = self.event(Event::End(BytesEnd::new(name)));
        result.and(closed)
    }

    /// Write `<name attrs/>`.
    pub fn empty(&mut self, name: &str, attributes: &[(String, String)]) -> Result<()> {
        self.event(Event::Empty(start_tag(name, attributes)))
    }

    /// Write escaped text.
    pub fn text(&mut self, text: &str) -> Result<()> {
        self.event(Event::Text(BytesText::new(text)))
    }

    /// Write `<name>text</name>`, or `<name/>` for empty text.
    pub fn text_element(&mut self, name: &str, text: &str) -> Result<()> {
        if text.is_empty() {
            return self.empty(name, &[]);
        }
        self.element(name, &[], |sink| sink.text(text))
    }

    /// Write a whole element tree.
    pub fn write_element(&mut self, element: &Element) -> Result<()> {
        if element.children.is_empty() {
            return self.empty(&element.name, &element.attributes);
        }
        self.element(&element.name, &element.attributes, |sink| {
            sink.write_nodes(&element.children)
        })
    }

    pub fn write_nodes(&mut self, nodes: &[Node]) -> Result<()> {
        for node in nodes {
            match node {
                Node::Element(e) => self.write_element(e)?,
                Node::Text(t) => self.text(t)?,
            }
        }
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn event(&mut self, event: Event<'_>) -> Result<()> {
        self.writer.write_event(event).map_err(Error::write)
    }
}

fn start_tag<'a>(name: &'a str, attributes: &'a [(String, String)]) -> BytesStart<'a> {
    let mut start = BytesStart::new(name);
    for (key, value) in attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }
    start
}

/// Serialize an element tree to a string.
pub fn element_to_string(element: &Element, pretty: bool) -> Result<String> {
    let mut sink = XmlSink::with_pretty(Vec::new(), pretty);
    sink.write_element(element)?;
    String::from_utf8(sink.into_inner()).map_err(Error::write)
}

/// Serialize sibling nodes to a compact string.
pub fn nodes_to_string(nodes: &[Node]) -> Result<String> {
    let mut sink = XmlSink::new(Vec::new());
    sink.write_nodes(nodes)?;
    String::from_utf8(sink.into_inner()).map_err(Error::write)
}
