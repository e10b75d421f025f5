//! Envelope framing shared by every transport

use crate::{Error, Result};
use csync_binding::{Element, element_to_string, parse_document};

pub const ENVELOPE_NAMESPACE: &str = "urn:csync:envelope";
pub const CONTENT_NAMESPACE: &str = "urn:csync:content";

/// Wrap a method element in a request envelope.
pub fn request_envelope(method: &Element) -> Result<String> {
    let mut method = method.clone();
    if !method.attributes.iter().any(|(name, _)| name == "xmlns") {
        method.attributes.insert(0, ("xmlns".into(), CONTENT_NAMESPACE.into()));
    }
    envelope(method)
}

/// Wrap a response payload in an envelope.
pub fn response_envelope(payload: Element) -> Result<String> {
    envelope(payload)
}

pub fn fault_envelope(message: &str) -> Result<String> {
    envelope(Element::new("Fault").with_child(Element::new("message").with_text(message)))
}

fn envelope(body: Element) -> Result<String> {
    let root = Element::new("Envelope")
        .with_attribute("xmlns", ENVELOPE_NAMESPACE)
        .with_child(Element::new("Body").with_child(body));
    Ok(element_to_string(&root, false)?)
}

/// Unwrap a response envelope for `method`.
///
/// # Errors
///
/// A fault body becomes [`Error::Fault`], classified from its message.
/// Anything other than `<method>Response` is a protocol error.
pub fn parse_response(method: &str, text: &str) -> Result<Element> {
    let protocol = |message: String| Error::Protocol {
        method: method.to_string(),
        message,
    };
    let root = parse_document(text).map_err(|e| protocol(e.to_string()))?;
    let body = root
        .child("Body")
        .ok_or_else(|| protocol("envelope has no body".into()))?;
    let payload = body
        .elements()
        .next()
        .ok_or_else(|| protocol("empty body".into()))?;

    if payload.local_name() == "Fault" {
        let message = payload
            .child("message")
            .or_else(|| payload.child("faultstring"))
            .map(Element::text)
            .unwrap_or_else(|| payload.text());
        return Err(Error::fault(message.trim()));
    }

    let expected = format!("{method}Response");
    if payload.local_name() != expected {
        return Err(protocol(format!(
            "expected <{expected}>, found <{}>",
            payload.name
        )));
    }
    Ok(payload.clone())
}
