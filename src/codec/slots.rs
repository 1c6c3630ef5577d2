//! Recording an element's layout on decode, and replaying it on encode.

use quick_xml::escape::{escape, unescape};

use super::names::IDENTIFIER;
use crate::{
    domain::{AttributeSlot, ChildSlot, OpaqueExtra, REQIF_NAMESPACE, parse_boolean},
    xml::{Attribute, Element, Node, QName, Text},
};

/// Whether an element belongs to the ReqIF vocabulary, rather than to a
/// vendor namespace.
pub(super) fn is_reqif(element: &Element) -> bool {
    element.name().prefix().is_none() || element.namespace() == Some(REQIF_NAMESPACE)
}

/// Records the layout of `element`.
///
/// The first occurrence of each name in `attributes` and `children` is a
/// known slot. With `text`, the element's character data is recorded as text
/// slots; otherwise it is unrecognised content like everything else.
pub(super) fn capture(
    element: &Element,
    attributes: &[&'static str],
    children: &[&'static str],
    text: bool,
) -> OpaqueExtra {
    let mut extra = capture_tag(element, attributes);
    let mut seen: Vec<&'static str> = Vec::new();
    for node in element.children() {
        let slot = match node {
            Node::Element(child) if is_reqif(child) => {
                match children.iter().find(|name| **name == child.local_name()) {
                    Some(&name) if !seen.contains(&name) => {
                        seen.push(name);
                        ChildSlot::Known(name)
                    }
                    _ => ChildSlot::Extra(node.clone()),
                }
            }
            Node::Text(run) if text => ChildSlot::Text(run.raw().to_owned()),
            _ => ChildSlot::Extra(node.clone()),
        };
        extra.children.push(slot);
    }
    extra
}

/// What identifies a list item among its siblings: its `IDENTIFIER`, the
/// definition an attribute value is for, or the target of a reference.
pub(super) fn item_key(element: &Element) -> Option<String> {
    if let Some(identifier) = element.attribute(IDENTIFIER) {
        return Some(identifier.value().into_owned());
    }
    if let Some(definition) = element.child("DEFINITION") {
        return definition
            .elements()
            .next()
            .map(|target| target.text().trim().to_owned());
    }
    if element.elements().next().is_some() {
        return None;
    }
    let text = element.text();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_owned())
}

/// Records the tag and attributes of `element`, but none of its children.
pub(super) fn capture_tag(element: &Element, attributes: &[&'static str]) -> OpaqueExtra {
    let mut seen: Vec<&'static str> = Vec::new();
    let attributes = element
        .attributes()
        .iter()
        .map(|attribute| {
            let known = attribute
                .name()
                .prefix()
                .is_none()
                .then(|| {
                    attributes
                        .iter()
                        .find(|name| **name == attribute.name().local())
                        .copied()
                })
                .flatten()
                .filter(|name| !seen.contains(name));
            match known {
                Some(name) => {
                    seen.push(name);
                    AttributeSlot::Known {
                        name,
                        quote: attribute.quote(),
                        raw: attribute.raw().to_owned(),
                    }
                }
                None => AttributeSlot::Extra(attribute.clone()),
            }
        })
        .collect();
    OpaqueExtra {
        tag: Some(element.name().clone()),
        attributes,
        children: Vec::new(),
        self_closing: element.is_self_closing(),
    }
}

/// How a value is spelled, for deciding whether its source spelling still
/// holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Lexical {
    /// Compared exactly.
    Text,
    /// Compared ignoring surrounding whitespace.
    Token,
    /// `xsd:boolean`
    Boolean,
    /// `xsd:integer`
    Integer,
    /// `xsd:double`
    Real,
}

impl Lexical {
    /// Whether `source` (unescaped) spells `value`.
    fn spells(self, source: &str, value: &str) -> bool {
        match self {
            Self::Text => source == value,
            Self::Token => source.trim() == value,
            Self::Boolean => parse_boolean(source).is_some_and(|b| Some(b) == parse_boolean(value)),
            Self::Integer => source
                .trim()
                .parse::<i64>()
                .is_ok_and(|i| value.parse::<i64>() == Ok(i)),
            Self::Real => match (parse_real(source), parse_real(value)) {
                (Some(a), Some(b)) => a == b || (a.is_nan() && b.is_nan()),
                _ => false,
            },
        }
    }
}

/// Reads an `xsd:double`.
pub(super) fn parse_real(value: &str) -> Option<f64> {
    match value.trim() {
        "INF" | "+INF" => Some(f64::INFINITY),
        "-INF" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        other => other.parse().ok(),
    }
}

/// Writes an `xsd:double`.
pub(super) fn format_real(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_owned()
    } else if value == f64::INFINITY {
        "INF".to_owned()
    } else if value == f64::NEG_INFINITY {
        "-INF".to_owned()
    } else {
        format!("{value:?}")
    }
}

/// Builds an element from typed content and a recorded layout.
///
/// Typed attributes and children are matched to their slots by name; known
/// slots with no value are dropped, values without a slot are appended in
/// the order they were given. Unchanged values keep their source spelling.
pub(super) struct Emit<'a> {
    name: &'static str,
    extra: &'a OpaqueExtra,
    attributes: Vec<(&'static str, String, Lexical)>,
    children: Vec<(&'static str, Element)>,
    items: Vec<Element>,
    text: Option<(String, Lexical)>,
}

impl<'a> Emit<'a> {
    pub(super) const fn new(name: &'static str, extra: &'a OpaqueExtra) -> Self {
        Self {
            name,
            extra,
            attributes: Vec::new(),
            children: Vec::new(),
            items: Vec::new(),
            text: None,
        }
    }

    pub(super) fn attr(&mut self, name: &'static str, value: Option<String>, lexical: Lexical) {
        if let Some(value) = value {
            self.attributes.push((name, value, lexical));
        }
    }

    pub(super) fn child(&mut self, name: &'static str, element: Option<Element>) {
        if let Some(element) = element {
            self.children.push((name, element));
        }
    }

    pub(super) fn item(&mut self, element: Element) {
        self.items.push(element);
    }

    pub(super) fn text(&mut self, value: String, lexical: Lexical) {
        self.text = Some((value, lexical));
    }

    pub(super) fn finish(self) -> Element {
        let Self {
            name,
            extra,
            mut attributes,
            children,
            items,
            text,
        } = self;

        let tag = match &extra.tag {
            Some(tag) if tag.local() == name => tag.clone(),
            _ => QName::new(name),
        };
        let mut element = Element::new(tag);
        element.set_self_closing(extra.tag.is_none() || extra.self_closing);

        for slot in &extra.attributes {
            match slot {
                AttributeSlot::Known { name, quote, raw } => {
                    let Some(position) = attributes.iter().position(|(n, ..)| n == name) else {
                        continue;
                    };
                    let (_, value, lexical) = attributes.remove(position);
                    let unchanged = unescape(raw).is_ok_and(|source| lexical.spells(&source, &value));
                    let raw = if unchanged {
                        raw.clone()
                    } else {
                        escape(value.as_str()).into_owned()
                    };
                    element.push_attribute(Attribute::from_raw(QName::new(*name), raw, *quote));
                }
                AttributeSlot::Extra(attribute) => element.push_attribute(attribute.clone()),
            }
        }
        for (name, value, _) in attributes {
            element.push_attribute(Attribute::new(QName::new(name), &value));
        }

        let has_items = extra
            .children
            .iter()
            .any(|slot| matches!(slot, ChildSlot::Item(_)));
        if has_items || !items.is_empty() {
            *element.children_mut() = arrange_items(&extra.children, items);
            return element;
        }

        let text_unchanged = text
            .as_ref()
            .is_some_and(|(value, lexical)| lexical.spells(&source_text(extra), value));
        let mut text = text.filter(|_| !text_unchanged).map(|(value, _)| value);

        let mut children = children.into_iter().map(Some).collect::<Vec<_>>();
        let mut nodes = Vec::new();
        for slot in &extra.children {
            match slot {
                ChildSlot::Known(name) => {
                    let found = children
                        .iter_mut()
                        .find(|child| child.as_ref().is_some_and(|(n, _)| n == name))
                        .and_then(Option::take);
                    if let Some((_, child)) = found {
                        nodes.push(Node::Element(child));
                    }
                }
                ChildSlot::Text(raw) => {
                    if text_unchanged {
                        nodes.push(Node::Text(Text::from_raw(raw.clone())));
                    } else if let Some(value) = text.take() {
                        nodes.push(Node::Text(Text::new(&value)));
                    }
                }
                ChildSlot::Item(_) => {}
                ChildSlot::Extra(Node::CData(_)) if !text_unchanged && has_text_slots(extra) => {}
                ChildSlot::Extra(node) => nodes.push(node.clone()),
            }
        }
        if let Some(value) = text.filter(|value| !value.is_empty()) {
            nodes.push(Node::Text(Text::new(&value)));
        }
        nodes.extend(children.into_iter().flatten().map(|(_, child)| Node::Element(child)));

        *element.children_mut() = nodes;
        element
    }
}

/// Lays out list items with the unrecognised nodes recorded around them.
///
/// A run of unrecognised nodes stays in front of the item that followed it
/// in the source, wherever that item now stands. The run of a removed item
/// joins the run of the next item in the source, or the end of the list.
/// Items with no recorded position are written where they stand.
fn arrange_items(slots: &[ChildSlot], items: Vec<Element>) -> Vec<Node> {
    let mut runs: Vec<(Vec<&Node>, Option<&str>)> = Vec::new();
    let mut lead = Vec::new();
    for slot in slots {
        match slot {
            ChildSlot::Item(key) => runs.push((std::mem::take(&mut lead), key.as_deref())),
            ChildSlot::Extra(node) => lead.push(node),
            ChildSlot::Known(_) | ChildSlot::Text(_) => {}
        }
    }
    let mut tail = lead;

    let mut claimed = vec![false; runs.len()];
    let placed: Vec<Option<usize>> = items
        .iter()
        .map(|item| {
            let key = item_key(item);
            let run = (0..runs.len()).find(|&i| !claimed[i] && runs[i].1 == key.as_deref())?;
            claimed[run] = true;
            Some(run)
        })
        .collect();

    let mut carried = Vec::new();
    for ((lead, _), kept) in runs.iter_mut().zip(&claimed) {
        carried.append(lead);
        if *kept {
            *lead = std::mem::take(&mut carried);
        }
    }
    carried.append(&mut tail);

    let mut nodes = Vec::new();
    for (item, run) in items.into_iter().zip(placed) {
        if let Some(run) = run {
            nodes.extend(runs[run].0.iter().map(|node| (*node).clone()));
        }
        nodes.push(Node::Element(item));
    }
    nodes.extend(carried.into_iter().cloned());
    nodes
}

fn has_text_slots(extra: &OpaqueExtra) -> bool {
    extra
        .children
        .iter()
        .any(|slot| matches!(slot, ChildSlot::Text(_)))
}

/// The character data recorded in text slots, with any CDATA sections among
/// them.
fn source_text(extra: &OpaqueExtra) -> String {
    let mut out = String::new();
    if !has_text_slots(extra) {
        return out;
    }
    for slot in &extra.children {
        match slot {
            ChildSlot::Text(raw) => match unescape(raw) {
                Ok(value) => out.push_str(&value),
                Err(_) => out.push_str(raw),
            },
            ChildSlot::Extra(Node::CData(data)) => out.push_str(data),
            _ => {}
        }
    }
    out
}
