// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A flat view of a rendered report, for structural assertions in tests.

use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};
use std::collections::BTreeMap;

/// An element from the document, in document order.
///
/// `text` is the unescaped text directly inside the element. Text inside child elements
/// belongs to the children.
#[derive(Clone, Debug)]
pub struct Element {
    pub name: String,
    pub attrs: BTreeMap<String, String>,
    pub text: String,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }
}

/// Parses `html`, panicking if it is not well-formed.
pub fn parse(html: &str) -> Vec<Element> {
    let mut reader = Reader::from_str(html);
    reader.config_mut().trim_text(true);

    let mut elements = Vec::new();
    let mut stack: Vec<usize> = Vec::new();
    loop {
        match reader.read_event().expect("document is well-formed") {
            Event::Start(start) => {
                elements.push(element(&start));
                stack.push(elements.len() - 1);
            }
            Event::Empty(start) => elements.push(element(&start)),
            Event::End(_) => {
                stack.pop();
            }
            Event::Text(text) => {
                let text = text.unescape().expect("valid escape");
                if let Some(&index) = stack.last() {
                    elements[index].text.push_str(&text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    elements
}

fn element(start: &BytesStart<'_>) -> Element {
    let attrs = start
        .attributes()
        .map(|attr| {
            let attr = attr.expect("valid attribute");
            (
                String::from_utf8(attr.key.as_ref().to_vec()).expect("attribute name is UTF-8"),
                attr.unescape_value().expect("valid escape").into_owned(),
            )
        })
        .collect();
    Element {
        name: String::from_utf8(start.name().as_ref().to_vec()).expect("tag name is UTF-8"),
        attrs,
        text: String::new(),
    }
}

/// Returns the elements named `name`.
pub fn find<'a>(elements: &'a [Element], name: &str) -> impl Iterator<Item = &'a Element> {
    elements.iter().filter(move |e| e.name == name)
}

/// Returns the element with the given `id`, panicking if there is none.
pub fn by_id<'a>(elements: &'a [Element], id: &str) -> &'a Element {
    elements
        .iter()
        .find(|e| e.attr("id") == Some(id))
        .unwrap_or_else(|| panic!("element with id {id} exists"))
}
