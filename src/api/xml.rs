//! XML into a compact JSON tree: attributes under `_attributes`, text under `_text`,
//! repeated child elements collected into an array.

use quick_xml::{Reader, events::Event};
use serde_json::{Map, Value};

use crate::prelude::*;

struct Frame {
    name: String,
    object: Map<String, Value>,
}

impl Frame {
    fn new(name: String) -> Self {
        Self { name, object: Map::new() }
    }

    fn append_child(&mut self, name: String, child: Value) {
        match self.object.get_mut(&name) {
            Some(Value::Array(siblings)) => siblings.push(child),
            Some(sibling) => {
                let first = sibling.take();
                *sibling = Value::Array(vec![first, child]);
            }
            None => {
                self.object.insert(name, child);
            }
        }
    }

    fn append_text(&mut self, text: &str) {
        match self.object.get_mut("_text") {
            Some(Value::String(existing)) => existing.push_str(text),
            _ => {
                self.object.insert("_text".to_string(), Value::String(text.to_string()));
            }
        }
    }
}

pub fn to_json(xml: &str) -> Result<Value> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack = vec![Frame::new(String::new())];
    loop {
        match reader.read_event().context("malformed XML")? {
            Event::Start(start) => {
                stack.push(open(&start)?);
            }
            Event::Empty(start) => {
                let frame = open(&start)?;
                close(&mut stack, frame);
            }
            Event::End(_) => {
                let frame = stack.pop().context("unbalanced closing tag")?;
                ensure!(!stack.is_empty(), "unbalanced closing tag `{}`", frame.name);
                close(&mut stack, frame);
            }
            Event::Text(text) => {
                let text = text.unescape().context("malformed text")?;
                if !text.trim().is_empty()
                    && let Some(frame) = stack.last_mut()
                {
                    frame.append_text(&text);
                }
            }
            Event::CData(data) => {
                let text = String::from_utf8_lossy(&data).into_owned();
                if let Some(frame) = stack.last_mut() {
                    frame.append_text(&text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    ensure!(stack.len() == 1, "unclosed element `{}`", stack.last().map_or("", |frame| frame.name.as_str()));
    Ok(Value::Object(stack.pop().map(|root| root.object).unwrap_or_default()))
}

fn open(start: &quick_xml::events::BytesStart<'_>) -> Result<Frame> {
    let mut frame = Frame::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    let mut attributes = Map::new();
    for attribute in start.attributes() {
        let attribute = attribute.context("malformed attribute")?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute.unescape_value().context("malformed attribute value")?;
        attributes.insert(key, Value::String(value.into_owned()));
    }
    if !attributes.is_empty() {
        frame.object.insert("_attributes".to_string(), Value::Object(attributes));
    }
    Ok(frame)
}

fn close(stack: &mut [Frame], frame: Frame) {
    if let Some(parent) = stack.last_mut() {
        parent.append_child(frame.name, Value::Object(frame.object));
    }
}
