//! In-memory live server speaking the envelope protocol

use super::{Transport, fault_envelope, parse_response, request_envelope, response_envelope};
use crate::{Error, Result};
use csync_binding::{Element, parse_document};
use csync_model::ContentType;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

const FIRST_ID: u64 = 100;

/// An in-process stand-in for the live server.
///
/// Requests and replies are serialized to envelope text and parsed back, so
/// callers exercise the same framing as over HTTP. Clones share one server.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    server: Arc<Mutex<MemoryServer>>,
}

struct MemoryServer {
    objects: BTreeMap<String, Vec<Element>>,
    next_id: u64,
    unavailable: HashSet<String>,
    no_fetch: HashSet<String>,
    calls: Vec<String>,
}

impl Default for MemoryServer {
    fn default() -> Self {
        Self {
            objects: BTreeMap::new(),
            next_id: FIRST_ID,
            unavailable: HashSet::new(),
            // The platform offers no per-object fetch for message models.
            no_fetch: HashSet::from([ContentType::MessageModel.config_key().to_string()]),
            calls: Vec::new(),
        }
    }
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call for `ty` fail with a "service is unavailable" fault.
    pub fn set_unavailable(&self, ty: ContentType, unavailable: bool) {
        let mut server = self.lock();
        let key = ty.config_key().to_string();
        if unavailable {
            server.unavailable.insert(key);
        } else {
            server.unavailable.remove(&key);
        }
    }

    /// Store an object directly, assigning an id unless it carries one.
    /// Returns the id.
    pub fn seed(&self, ty: ContentType, mut element: Element) -> String {
        let mut server = self.lock();
        let id = match element.attribute("id") {
            Some(id) => id.to_string(),
            None => {
                let id = server.allocate_id();
                set_attribute(&mut element, "id", &id);
                id
            }
        };
        server
            .objects
            .entry(ty.config_key().to_string())
            .or_default()
            .push(element);
        id
    }

    /// Stored objects of one type, in creation order.
    pub fn objects(&self, ty: ContentType) -> Vec<Element> {
        self.lock()
            .objects
            .get(ty.config_key())
            .cloned()
            .unwrap_or_default()
    }

    /// `method:type` of every call received so far.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryServer> {
        self.server.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for MemoryTransport {
    fn call(&self, request: &Element) -> Result<Element> {
        let method = request.local_name().to_string();
        let wire = request_envelope(request)?;
        let received = parse_document(&wire).map_err(Error::transport)?;
        let payload = received
            .descend("Body")
            .and_then(|body| body.elements().next())
            .ok_or_else(|| Error::transport("request envelope has no method"))?;

        let reply = match self.lock().handle(&method, payload) {
            Ok(response) => response_envelope(response)?,
            Err(message) => fault_envelope(&message)?,
        };
        parse_response(&method, &reply)
    }
}

impl MemoryServer {
    fn allocate_id(&mut self) -> String {
        let id = self.next_id;
        self.next_id += 1;
        id.to_string()
    }

    fn handle(&mut self, method: &str, request: &Element) -> std::result::Result<Element, String> {
        let ty = request
            .attribute("type")
            .ok_or_else(|| format!("Request '{method}' has no content type"))?
            .to_string();
        self.calls.push(format!("{method}:{ty}"));
        debug!(method, content_type = %ty, "Memory server call");

        if self.unavailable.contains(&ty) {
            return Err(format!("The service is unavailable for {ty}"));
        }

        let full = request.attribute("full") != Some("false");
        let response = Element::new(format!("{method}Response"));
        match method {
            "list" => Ok(tuples(response, self.stored(&ty).iter(), full)),
            "children" => {
                let parent = request.attribute("parent");
                let recursive = request.attribute("recursive") == Some("true");
                let folders = self.folder_parents();
                let matches = self
                    .stored(&ty)
                    .iter()
                    .filter(|e| in_scope(e.attribute("parent"), parent, recursive, &folders));
                Ok(tuples(response, matches, full))
            }
            "get" => {
                if self.no_fetch.contains(&ty) {
                    return Err(format!("Operation 'get' is not supported for {ty}"));
                }
                let id = request.attribute("id").unwrap_or_default();
                let found = self.stored(&ty).iter().filter(|e| e.attribute("id") == Some(id));
                Ok(tuples(response, found, true))
            }
            "create" => {
                let mut object = first_child(request)?;
                if let Some(key) = object.attribute("key").filter(|k| !k.is_empty()) {
                    if self.stored(&ty).iter().any(|e| e.attribute("key") == Some(key)) {
                        return Err(format!("Object '{key}' already exists"));
                    }
                }
                let id = self.allocate_id();
                set_attribute(&mut object, "id", &id);
                self.objects.entry(ty).or_default().push(object.clone());
                Ok(response.with_child(Element::new("tuple").with_child(object)))
            }
            "update" => {
                let id = request.attribute("id").unwrap_or_default().to_string();
                let mut object = first_child(request)?;
                set_attribute(&mut object, "id", &id);
                let slot = self
                    .objects
                    .get_mut(&ty)
                    .and_then(|objects| objects.iter_mut().find(|e| e.attribute("id") == Some(id.as_str())))
                    .ok_or_else(|| format!("Object #{id} not found"))?;
                *slot = object.clone();
                Ok(response.with_child(Element::new("tuple").with_child(object)))
            }
            "delete" => {
                let id = request.attribute("id").unwrap_or_default();
                let objects = self.objects.entry(ty).or_default();
                let before = objects.len();
                objects.retain(|e| e.attribute("id") != Some(id));
                if objects.len() == before {
                    return Err(format!("Object #{id} not found"));
                }
                Ok(response)
            }
            other => Err(format!("Unknown method '{other}'")),
        }
    }

    fn stored(&self, ty: &str) -> &[Element] {
        self.objects.get(ty).map(Vec::as_slice).unwrap_or_default()
    }

    fn folder_parents(&self) -> HashMap<String, Option<String>> {
        self.stored(ContentType::Folder.config_key())
            .iter()
            .filter_map(|f| {
                let id = f.attribute("id")?.to_string();
                Some((id, f.attribute("parent").map(str::to_string)))
            })
            .collect()
    }
}

fn in_scope(
    own_parent: Option<&str>,
    wanted: Option<&str>,
    recursive: bool,
    folders: &HashMap<String, Option<String>>,
) -> bool {
    if own_parent == wanted {
        return true;
    }
    if !recursive {
        return false;
    }
    if wanted.is_none() {
        return true;
    }
    let mut current = own_parent.map(str::to_string);
    let mut steps = 0;
    while let Some(id) = current {
        if Some(id.as_str()) == wanted {
            return true;
        }
        steps += 1;
        if steps > folders.len() {
            return false;
        }
        current = folders.get(&id).cloned().flatten();
    }
    false
}

fn tuples<'a>(
    mut response: Element,
    objects: impl Iterator<Item = &'a Element>,
    full: bool,
) -> Element {
    for object in objects {
        let object = if full { object.clone() } else { partial(object) };
        response.push_child(Element::new("tuple").with_child(object));
    }
    response
}

/// Attributes and name only.
fn partial(object: &Element) -> Element {
    let mut out = Element::new(object.name.clone());
    out.attributes = object.attributes.clone();
    if let Some(name) = object.child("name") {
        out.push_child(name.clone());
    }
    out
}

fn first_child(request: &Element) -> std::result::Result<Element, String> {
    request
        .elements()
        .next()
        .cloned()
        .ok_or_else(|| format!("Request '{}' has no object", request.name))
}

fn set_attribute(element: &mut Element, name: &str, value: &str) {
    match element.attributes.iter_mut().find(|(k, _)| k == name) {
        Some((_, existing)) => *existing = value.to_string(),
        None => element.attributes.insert(0, (name.to_string(), value.to_string())),
    }
}
