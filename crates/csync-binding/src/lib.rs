//! Template-driven XML binding for content objects
//!
//! A [`BindingTemplate`] is a declarative, tree-shaped descriptor built once
//! per (type, source, version). The same descriptor drives both directions:
//!
//! - **marshal**: walk the template, writing attributes and child elements
//!   from the object into a streaming [`XmlSink`] in declared order
//! - **unmarshal**: walk the template, locating nodes in a parsed
//!   [`Element`] tree, coercing values, and setting them on a fresh object
//!
//! Conditional branches are guarded by tests over a per-invocation
//! [`Params`] bag.

pub mod coerce;
pub mod element;
pub mod error;
pub mod marshal;
pub mod params;
pub mod parse;
pub mod template;
pub mod unmarshal;
pub mod writer;

pub use element::{Element, Node};
pub use error::{Error, Result};
pub use marshal::{marshal, marshal_to_element, marshal_to_string};
pub use params::{Guard, ParamValue, Params};
pub use parse::{parse_document, parse_fragment};
pub use template::{
    Binding, BindingTemplate, DefaultValue, Identity, ItemKind, Presence, Target, TemplateBuilder,
    ValueKind,
};
pub use unmarshal::{unmarshal, unmarshal_str};
pub use writer::{XmlSink, element_to_string};
