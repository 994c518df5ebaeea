//! A narrow XML DOM built over `quick-xml`'s event API, providing only
//! the capability the Extended-XMP codec needs: parse, namespace-aware
//! lookup, attribute/child mutation, cross-document node moves, and a
//! throwaway-buffer byte count. `quick-xml`'s owned-event model has no
//! arena, so "moving" a node is a structural clone-and-reparent, not a
//! pointer swap.

use std::collections::HashMap;
use std::io::Cursor;

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{Error, Result};

/// An expanded (namespace-resolved) qualified name. `prefix` is kept
/// purely for round-tripping the original serialization; equality and
/// lookups are always done on `(uri, local)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QName {
    pub prefix: Option<String>,
    pub uri: Option<String>,
    pub local: String,
}

impl QName {
    pub fn matches(&self, uri: Option<&str>, local: &str) -> bool {
        self.uri.as_deref() == uri && self.local == local
    }
}

#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: QName,
    pub value: String,
}

#[derive(Debug, Clone)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
pub struct Element {
    pub name: QName,
    /// `xmlns` / `xmlns:prefix` declarations physically present on this
    /// element, as `(prefix, uri)` pairs (`prefix = None` for the
    /// default namespace).
    pub namespace_decls: Vec<(Option<String>, String)>,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(uri: Option<&str>, prefix: Option<&str>, local: &str) -> Self {
        Self {
            name: QName {
                prefix: prefix.map(str::to_string),
                uri: uri.map(str::to_string),
                local: local.to_string(),
            },
            namespace_decls: Vec::new(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    pub fn child_elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    pub fn children_by_name(&self, uri: Option<&str>, local: &str) -> Vec<&Element> {
        self.child_elements()
            .filter(|e| e.name.matches(uri, local))
            .collect()
    }

    pub fn first_child_by_name(&self, uri: Option<&str>, local: &str) -> Option<&Element> {
        self.child_elements().find(|e| e.name.matches(uri, local))
    }

    pub fn first_child_by_name_mut(
        &mut self,
        uri: Option<&str>,
        local: &str,
    ) -> Option<&mut Element> {
        self.child_elements_mut()
            .find(|e| e.name.matches(uri, local))
    }

    pub fn attribute(&self, uri: Option<&str>, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.matches(uri, local))
            .map(|a| a.value.as_str())
    }

    /// Sets an attribute, overwriting any existing value at the same
    /// `(uri, local)`.
    pub fn set_attribute(&mut self, prefix: &str, uri: &str, local: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(existing) = self
            .attributes
            .iter_mut()
            .find(|a| a.name.matches(Some(uri), local))
        {
            existing.value = value;
            existing.name.prefix = Some(prefix.to_string());
        } else {
            self.attributes.push(Attribute {
                name: QName {
                    prefix: Some(prefix.to_string()),
                    uri: Some(uri.to_string()),
                    local: local.to_string(),
                },
                value,
            });
        }
    }

    pub fn remove_attribute(&mut self, uri: Option<&str>, local: &str) -> Option<Attribute> {
        let index = self
            .attributes
            .iter()
            .position(|a| a.name.matches(uri, local))?;
        Some(self.attributes.remove(index))
    }

    pub fn add_child(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    /// Every attribute/element name this subtree references by URI
    /// (paired with the literal prefix it was serialized with), used to
    /// carry along whatever `xmlns` bindings a moved subtree needs so it
    /// stays resolvable in a document that didn't originally declare
    /// them.
    fn required_bindings(&self, out: &mut Vec<(Option<String>, String)>) {
        if let Some(uri) = &self.name.uri {
            push_binding(out, self.name.prefix.clone(), uri.clone());
        }
        for attr in &self.attributes {
            if let (Some(prefix), Some(uri)) = (&attr.name.prefix, &attr.name.uri) {
                push_binding(out, Some(prefix.clone()), uri.clone());
            }
        }
        for child in self.child_elements() {
            child.required_bindings(out);
        }
    }

    /// Serializes just this element (and its subtree) to UTF-8 bytes,
    /// with no XML declaration and no indentation.
    pub fn byte_len(&self) -> usize {
        serialize_element(self).len()
    }

    pub fn to_utf8_bytes(&self) -> Vec<u8> {
        serialize_element(self).into_bytes()
    }
}

fn push_binding(out: &mut Vec<(Option<String>, String)>, prefix: Option<String>, uri: String) {
    if !out.iter().any(|(p, u)| *p == prefix && *u == uri) {
        out.push((prefix, uri));
    }
}

/// An XML document: just its root element. XMP packets and Extended-XMP
/// portions are always single-rooted.
#[derive(Debug, Clone)]
pub struct XmpDocument {
    pub root: Element,
}

impl XmpDocument {
    pub fn parse(xml: &str) -> Result<Self> {
        let root = parse_document(xml)?;
        Ok(Self { root })
    }

    pub fn to_utf8_bytes(&self) -> Vec<u8> {
        self.root.to_utf8_bytes()
    }

    /// Serializes to a UTF-16 string with no byte-order mark, matching
    /// the Adobe XMP packet convention for the base packet written back
    /// into the `APP1` XMP segment.
    pub fn to_string_utf16_no_bom(&self) -> String {
        serialize_element(&self.root)
    }

    pub fn byte_len(&self) -> usize {
        self.root.byte_len()
    }

    /// Adds an `xmlns:prefix="uri"` declaration to the root element if
    /// no identical binding is already present.
    pub fn ensure_namespace(&mut self, prefix: &str, uri: &str) {
        let already = self
            .root
            .namespace_decls
            .iter()
            .any(|(p, u)| p.as_deref() == Some(prefix) && u == uri);
        if !already {
            self.root
                .namespace_decls
                .push((Some(prefix.to_string()), uri.to_string()));
        }
    }

    /// Removes redundant `xmlns` declarations: a declaration on a
    /// descendant that repeats a binding already in scope from an
    /// ancestor is dropped.
    pub fn optimize_namespaces(&mut self) {
        let mut scope = HashMap::new();
        optimize_namespaces_rec(&mut self.root, &mut scope);
    }
}

fn optimize_namespaces_rec(element: &mut Element, scope: &mut HashMap<Option<String>, String>) {
    let mut pushed = Vec::new();
    element.namespace_decls.retain(|(prefix, uri)| {
        if scope.get(prefix) == Some(uri) {
            false
        } else {
            pushed.push(prefix.clone());
            scope.insert(prefix.clone(), uri.clone());
            true
        }
    });
    for child in element.child_elements_mut() {
        optimize_namespaces_rec(child, scope);
    }
    for prefix in pushed {
        scope.remove(&prefix);
    }
}

/// Clones `source.children[index]` into `dest`'s children, carrying
/// along whatever `xmlns` bindings the moved subtree needs to stay
/// resolvable, and removes it from `source`.
pub fn move_child(dest: &mut Element, source: &mut Element, index: usize) -> Result<()> {
    let Node::Element(_) = &source.children[index] else {
        return Err(Error::ShapeMismatch {
            reason: "cannot move a text node across documents".to_string(),
        });
    };
    let node = source.children.remove(index);
    let Node::Element(mut moved) = node else {
        unreachable!("checked above");
    };
    let mut needed = Vec::new();
    moved.required_bindings(&mut needed);
    for (prefix, uri) in needed {
        if !moved
            .namespace_decls
            .iter()
            .any(|(p, u)| *p == prefix && *u == uri)
        {
            moved.namespace_decls.push((prefix, uri));
        }
    }
    dest.children.push(Node::Element(moved));
    Ok(())
}

/// Clones `source.attributes[index]` onto `dest`, carrying along a
/// namespace binding for the attribute's prefix if `dest` doesn't
/// already provide one, and removes it from `source`.
pub fn move_attribute(dest: &mut Element, source: &mut Element, index: usize) {
    let attr = source.attributes.remove(index);
    if let (Some(prefix), Some(uri)) = (&attr.name.prefix, &attr.name.uri) {
        if !dest
            .namespace_decls
            .iter()
            .any(|(p, u)| p.as_deref() == Some(prefix.as_str()) && u == uri)
        {
            dest.namespace_decls
                .push((Some(prefix.clone()), uri.clone()));
        }
    }
    dest.attributes.push(attr);
}

fn split_name(raw: &str) -> (Option<String>, String) {
    match raw.split_once(':') {
        Some((prefix, local)) => (Some(prefix.to_string()), local.to_string()),
        None => (None, raw.to_string()),
    }
}

fn parse_document(xml: &str) -> Result<Element> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut base_scope = HashMap::new();
    base_scope.insert(
        Some("xml".to_string()),
        "http://www.w3.org/XML/1998/namespace".to_string(),
    );
    let mut scope_stack: Vec<HashMap<Option<String>, String>> = vec![base_scope];
    let mut element_stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let (namespace_decls, attrs) = split_attributes(&e, &reader)?;
                let mut scope = scope_stack.last().cloned().unwrap_or_default();
                for (prefix, uri) in &namespace_decls {
                    scope.insert(prefix.clone(), uri.clone());
                }
                let (prefix, local) = split_name(std::str::from_utf8(e.name().as_ref())?);
                let uri = scope.get(&prefix).cloned();
                let attributes = resolve_attributes(attrs, &scope);
                let element = Element {
                    name: QName { prefix, uri, local },
                    namespace_decls,
                    attributes,
                    children: Vec::new(),
                };
                scope_stack.push(scope);
                element_stack.push(element);
            }
            Event::Empty(e) => {
                let (namespace_decls, attrs) = split_attributes(&e, &reader)?;
                let mut scope = scope_stack.last().cloned().unwrap_or_default();
                for (prefix, uri) in &namespace_decls {
                    scope.insert(prefix.clone(), uri.clone());
                }
                let (prefix, local) = split_name(std::str::from_utf8(e.name().as_ref())?);
                let uri = scope.get(&prefix).cloned();
                let attributes = resolve_attributes(attrs, &scope);
                let element = Element {
                    name: QName { prefix, uri, local },
                    namespace_decls,
                    attributes,
                    children: Vec::new(),
                };
                attach(&mut element_stack, &mut root, element)?;
            }
            Event::End(_) => {
                let finished = element_stack.pop().ok_or_else(|| Error::BadXmpRoot {
                    reason: "unbalanced end tag while parsing XMP".to_string(),
                })?;
                scope_stack.pop();
                attach(&mut element_stack, &mut root, finished)?;
            }
            Event::Text(t) => {
                if let Some(parent) = element_stack.last_mut() {
                    let text = t.unescape()?.into_owned();
                    if !text.trim().is_empty() {
                        parent.children.push(Node::Text(text));
                    }
                }
            }
            Event::CData(t) => {
                if let Some(parent) = element_stack.last_mut() {
                    let text = String::from_utf8_lossy(t.as_ref()).into_owned();
                    parent.children.push(Node::Text(text));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    root.ok_or_else(|| Error::BadXmpRoot {
        reason: "XMP document has no root element".to_string(),
    })
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Node::Element(element));
    } else {
        *root = Some(element);
    }
    Ok(())
}

type RawAttr = (String, String);

fn split_attributes(
    e: &quick_xml::events::BytesStart<'_>,
    reader: &Reader<&[u8]>,
) -> Result<(Vec<(Option<String>, String)>, Vec<RawAttr>)> {
    let mut namespace_decls = Vec::new();
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| Error::Xml(err.into()))?;
        let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
        let value = attr.decode_and_unescape_value(reader.decoder())?.into_owned();
        if key == "xmlns" {
            namespace_decls.push((None, value));
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            namespace_decls.push((Some(prefix.to_string()), value));
        } else {
            attrs.push((key, value));
        }
    }
    Ok((namespace_decls, attrs))
}

fn resolve_attributes(
    attrs: Vec<RawAttr>,
    scope: &HashMap<Option<String>, String>,
) -> Vec<Attribute> {
    attrs
        .into_iter()
        .map(|(key, value)| {
            let (prefix, local) = split_name(&key);
            let uri = prefix.as_ref().and_then(|p| scope.get(&Some(p.clone())).cloned());
            Attribute {
                name: QName { prefix, uri, local },
                value,
            }
        })
        .collect()
}

fn qualified_name(name: &QName) -> String {
    match &name.prefix {
        Some(prefix) => format!("{prefix}:{}", name.local),
        None => name.local.clone(),
    }
}

fn serialize_element(element: &Element) -> String {
    let mut out = String::new();
    write_element(element, &mut out);
    out
}

fn write_element(element: &Element, out: &mut String) {
    let tag = qualified_name(&element.name);
    out.push('<');
    out.push_str(&tag);
    for (prefix, uri) in &element.namespace_decls {
        match prefix {
            Some(p) => {
                out.push_str(" xmlns:");
                out.push_str(p);
            }
            None => out.push_str(" xmlns"),
        }
        out.push_str("=\"");
        out.push_str(&escape(uri.as_str()));
        out.push('"');
    }
    for attr in &element.attributes {
        out.push(' ');
        out.push_str(&qualified_name(&attr.name));
        out.push_str("=\"");
        out.push_str(&escape(attr.value.as_str()));
        out.push('"');
    }
    if element.children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    for child in &element.children {
        match child {
            Node::Element(e) => write_element(e, out),
            Node::Text(t) => out.push_str(&escape(t.as_str())),
        }
    }
    out.push_str("</");
    out.push_str(&tag);
    out.push('>');
}

/// Approximate serialized byte length of a single attribute, as it
/// would appear inside its owning element's start tag. Used only to
/// rank attributes against elements by size during greedy Extended-XMP
/// extraction; does not need to match `write_element`'s output
/// byte-for-byte.
pub(crate) fn attribute_byte_len(attr: &Attribute) -> usize {
    1 + qualified_name(&attr.name).len() + 2 + escape(attr.value.as_str()).len() + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_namespaced_attribute() {
        let xml = r#"<x:xmpmeta xmlns:x="adobe:ns:meta/"><rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"><rdf:Description rdf:about="" /></rdf:RDF></x:xmpmeta>"#;
        let doc = XmpDocument::parse(xml).unwrap();
        assert_eq!(doc.root.name.local, "xmpmeta");
        let rdf = doc
            .root
            .first_child_by_name(Some("http://www.w3.org/1999/02/22-rdf-syntax-ns#"), "RDF")
            .unwrap();
        let description = rdf
            .first_child_by_name(
                Some("http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
                "Description",
            )
            .unwrap();
        assert_eq!(
            description.attribute(Some("http://www.w3.org/1999/02/22-rdf-syntax-ns#"), "about"),
            Some("")
        );
    }

    #[test]
    fn ensure_namespace_is_idempotent() {
        let mut doc = XmpDocument {
            root: Element::new(Some("adobe:ns:meta/"), Some("x"), "xmpmeta"),
        };
        doc.ensure_namespace("x", "adobe:ns:meta/");
        doc.ensure_namespace("x", "adobe:ns:meta/");
        assert_eq!(doc.root.namespace_decls.len(), 1);
    }

    #[test]
    fn optimize_namespaces_drops_redundant_child_decl() {
        let mut root = Element::new(Some("ns-root"), Some("r"), "root");
        root.namespace_decls.push((Some("a".to_string()), "uri-a".to_string()));
        let mut child = Element::new(None, None, "child");
        child
            .namespace_decls
            .push((Some("a".to_string()), "uri-a".to_string()));
        root.add_child(child);

        let mut doc = XmpDocument { root };
        doc.optimize_namespaces();
        let child = doc.root.child_elements().next().unwrap();
        assert!(child.namespace_decls.is_empty());
    }

    #[test]
    fn move_child_carries_required_namespace_binding() {
        let mut source = Element::new(None, None, "rdf:Description");
        let mut moved = Element::new(Some("ns-foo"), Some("foo"), "Bar");
        moved.attributes.push(Attribute {
            name: QName {
                prefix: Some("foo".to_string()),
                uri: Some("ns-foo".to_string()),
                local: "baz".to_string(),
            },
            value: "1".to_string(),
        });
        source.add_child(moved);

        let mut dest = Element::new(None, None, "rdf:Description");
        move_child(&mut dest, &mut source, 0).unwrap();

        assert!(source.children.is_empty());
        let moved = dest.child_elements().next().unwrap();
        assert!(moved
            .namespace_decls
            .iter()
            .any(|(p, u)| p.as_deref() == Some("foo") && u == "ns-foo"));
    }

    #[test]
    fn byte_len_matches_serialized_length() {
        let element = Element::new(None, None, "a");
        assert_eq!(element.byte_len(), element.to_utf8_bytes().len());
    }
}
