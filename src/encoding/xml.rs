//! HL7 v2 XML encoding.
//!
//! The document root is named after the message structure (`ADT_A01`), each segment becomes an
//! element, fields are `<PID.5>` and, when a field carries more than one value, components and
//! subcomponents nest as `<PID.5.1>` and `<PID.5.1.1>`. A repeating field repeats its element.
//!
//! This is a positional dialect, not the v2.xml schema: the schema names components after their
//! data type (`<XPN.1>`, `<FN.1>`), which needs per-field type tables this crate does not carry.
//! Only the namespace and the segment/field element names match the schema. Documents written
//! here read back losslessly, but a schema-validating consumer will reject them.

use std::io::Cursor;

use log::trace;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{Hl7Error, Result};
use crate::message::{Component, Field, Message, Repetition, Segment};

/// Default namespace of HL7 v2 XML documents.
pub const NAMESPACE: &str = "urn:hl7-org:v2xml";

type XmlWriter = Writer<Cursor<Vec<u8>>>;

fn write(writer: &mut XmlWriter, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Hl7Error::encoding(format!("failed to write XML: {}", e)))
}

fn write_leaf(writer: &mut XmlWriter, name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return write(writer, Event::Empty(BytesStart::new(name)));
    }
    write(writer, Event::Start(BytesStart::new(name)))?;
    write(writer, Event::Text(BytesText::new(value)))?;
    write(writer, Event::End(BytesEnd::new(name)))
}

pub(super) fn encode(message: &Message) -> Result<String> {
    let root_name = message
        .structure()
        .ok_or_else(|| Hl7Error::encoding("MSH-9 is required to name the XML document"))?;

    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    write(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;

    let mut root = BytesStart::new(root_name.as_str());
    root.push_attribute(("xmlns", NAMESPACE));
    write(&mut writer, Event::Start(root))?;

    for segment in message.segments() {
        write_segment(&mut writer, segment)?;
    }

    write(&mut writer, Event::End(BytesEnd::new(root_name.as_str())))?;

    let bytes = writer.into_inner().into_inner();
    trace!("Encoded {} segments as XML", message.segments().len());
    String::from_utf8(bytes).map_err(|e| Hl7Error::encoding(e.to_string()))
}

fn write_segment(writer: &mut XmlWriter, segment: &Segment) -> Result<()> {
    let name = segment.name();
    write(writer, Event::Start(BytesStart::new(name)))?;

    for (index, field) in segment.fields().iter().enumerate() {
        if field.is_empty() {
            continue;
        }
        let field_name = format!("{}.{}", name, index + 1);
        let repetitions = field.repetitions();
        let last = repetitions
            .iter()
            .rposition(|r| !r.is_empty())
            .unwrap_or_default();

        for repetition in &repetitions[..=last] {
            write_repetition(writer, &field_name, repetition)?;
        }
    }

    write(writer, Event::End(BytesEnd::new(name)))
}

fn write_repetition(writer: &mut XmlWriter, field_name: &str, repetition: &Repetition) -> Result<()> {
    let components = repetition.components();
    if is_simple(components) {
        let value = components
            .first()
            .and_then(|c| c.subcomponents().first())
            .map(String::as_str)
            .unwrap_or_default();
        return write_leaf(writer, field_name, value);
    }

    write(writer, Event::Start(BytesStart::new(field_name)))?;
    for (c, component) in components.iter().enumerate() {
        if component.is_empty() {
            continue;
        }
        let component_name = format!("{}.{}", field_name, c + 1);
        let subcomponents = component.subcomponents();
        if subcomponents.len() <= 1 {
            write_leaf(writer, &component_name, &subcomponents[0])?;
            continue;
        }

        write(writer, Event::Start(BytesStart::new(component_name.as_str())))?;
        for (s, value) in subcomponents.iter().enumerate() {
            if !value.is_empty() {
                write_leaf(writer, &format!("{}.{}", component_name, s + 1), value)?;
            }
        }
        write(writer, Event::End(BytesEnd::new(component_name.as_str())))?;
    }
    write(writer, Event::End(BytesEnd::new(field_name)))
}

/// A repetition holding at most one plain value is written as text of the field element.
fn is_simple(components: &[Component]) -> bool {
    match components {
        [] => true,
        [only] => only.subcomponents().len() <= 1,
        _ => false,
    }
}

/// Minimal element tree used while reading.
#[derive(Debug, Default)]
struct Node {
    name: String,
    text: String,
    children: Vec<Node>,
}

fn element_name(start: &BytesStart<'_>) -> Result<String> {
    std::str::from_utf8(start.local_name().as_ref())
        .map(str::to_string)
        .map_err(|e| Hl7Error::encoding(format!("element name is not UTF-8: {}", e)))
}

fn read_tree(text: &str) -> Result<Node> {
    let mut reader = Reader::from_str(text);
    let mut stack: Vec<Node> = Vec::new();
    let mut root = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            Hl7Error::encoding(format!(
                "XML error at position {}: {}",
                reader.buffer_position(),
                e
            ))
        })?;

        match event {
            Event::Start(start) => stack.push(Node {
                name: element_name(&start)?,
                ..Node::default()
            }),
            Event::Empty(start) => {
                let node = Node {
                    name: element_name(&start)?,
                    ..Node::default()
                };
                attach(&mut stack, &mut root, node)?;
            }
            Event::End(_) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| Hl7Error::encoding("unbalanced closing tag"))?;
                attach(&mut stack, &mut root, node)?;
            }
            Event::Text(t) => {
                if let Some(node) = stack.last_mut() {
                    let value = t
                        .unescape()
                        .map_err(|e| Hl7Error::encoding(format!("bad XML text: {}", e)))?;
                    node.text.push_str(&value);
                }
            }
            Event::CData(data) => {
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(Hl7Error::encoding("XML document ended inside an element"));
    }
    root.ok_or_else(|| Hl7Error::encoding("XML document has no root element"))
}

fn attach(stack: &mut [Node], root: &mut Option<Node>, node: Node) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None if root.is_none() => *root = Some(node),
        None => return Err(Hl7Error::encoding("XML document has more than one root")),
    }
    Ok(())
}

/// Position suffix of an element name, e.g. `5` for `PID.5` under prefix `PID`.
fn position(name: &str, prefix: &str) -> Result<usize> {
    name.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('.'))
        .and_then(|n| n.parse::<usize>().ok())
        .filter(|n| *n >= 1)
        .ok_or_else(|| {
            Hl7Error::encoding(format!("unexpected element <{}> inside <{}>", name, prefix))
        })
}

pub(super) fn decode(text: &str) -> Result<Message> {
    let root = read_tree(text)?;

    let mut message = Message::new();
    for segment_node in &root.children {
        message.push(decode_segment(segment_node)?);
    }

    match message.segments().first() {
        Some(first) if first.name() == "MSH" => Ok(message),
        _ => Err(Hl7Error::encoding("message must start with an MSH segment")),
    }
}

fn decode_segment(node: &Node) -> Result<Segment> {
    let name = node.name.as_str();
    if name.len() != 3 {
        return Err(Hl7Error::encoding(format!("invalid segment element <{}>", name)));
    }

    let mut fields: Vec<Field> = Vec::new();
    let mut repetitions: Vec<Vec<Repetition>> = Vec::new();
    for field_node in &node.children {
        let index = position(&field_node.name, name)? - 1;
        if repetitions.len() <= index {
            repetitions.resize_with(index + 1, Vec::new);
        }
        repetitions[index].push(decode_repetition(field_node)?);
    }
    fields.extend(repetitions.into_iter().map(Field::from_repetitions));

    Ok(Segment::with_fields(name, fields))
}

fn decode_repetition(node: &Node) -> Result<Repetition> {
    if node.children.is_empty() {
        if node.text.is_empty() {
            return Ok(Repetition::default());
        }
        return Ok(Repetition::from_components(vec![
            Component::from_subcomponents(vec![node.text.clone()]),
        ]));
    }

    let mut components: Vec<Component> = Vec::new();
    for component_node in &node.children {
        let index = position(&component_node.name, &node.name)? - 1;
        if components.len() <= index {
            components.resize_with(index + 1, Component::default);
        }
        components[index] = decode_component(component_node)?;
    }
    Ok(Repetition::from_components(components))
}

fn decode_component(node: &Node) -> Result<Component> {
    if node.children.is_empty() {
        if node.text.is_empty() {
            return Ok(Component::default());
        }
        return Ok(Component::from_subcomponents(vec![node.text.clone()]));
    }

    let mut subcomponents: Vec<String> = Vec::new();
    for sub_node in &node.children {
        let index = position(&sub_node.name, &node.name)? - 1;
        if subcomponents.len() <= index {
            subcomponents.resize_with(index + 1, String::new);
        }
        subcomponents[index] = sub_node.text.clone();
    }
    Ok(Component::from_subcomponents(subcomponents))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Message {
        let mut msh = Segment::new("MSH");
        msh.set(1, 1, "|");
        msh.set(2, 1, "^~\\&");
        msh.set(3, 1, "Connect Care <--Sending System");
        msh.set(9, 1, "ADT");
        msh.set(9, 2, "A01");
        msh.set(9, 3, "ADT_A01");
        let mut pid = Segment::new("PID");
        pid.set(3, 1, "378785433211");
        pid.set(5, 1, "Mouse");
        pid.set(5, 2, "Mickey");
        pid.set_at(5, 1, 1, 1, "Duck");
        pid.set_at(11, 0, 1, 2, "Main Street");
        let mut msg = Message::new();
        msg.push(msh);
        msg.push(pid);
        msg
    }

    #[test]
    fn writes_hl7_xml_layout() {
        let xml = encode(&sample()).unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<ADT_A01 xmlns=\"urn:hl7-org:v2xml\">"));
        assert!(xml.contains("<MSH.1>|</MSH.1>"));
        assert!(xml.contains("<MSH.2>^~\\&amp;</MSH.2>"));
        assert!(xml.contains("<MSH.3>Connect Care &lt;--Sending System</MSH.3>"));
        assert!(xml.contains("<PID.3>378785433211</PID.3>"));
        assert!(xml.contains("<PID.5.1>Mouse</PID.5.1>"));
        assert!(xml.contains("<PID.5.2>Mickey</PID.5.2>"));
        assert!(xml.contains("<PID.11.1.2>Main Street</PID.11.1.2>"));
        assert!(xml.trim_end().ends_with("</ADT_A01>"));
    }

    #[test]
    fn reads_back_what_it_writes() {
        let msg = sample();
        let decoded = decode(&encode(&msg).unwrap()).unwrap();

        assert_eq!(decoded, msg);
        assert_eq!(decoded.segment("PID").unwrap().get_at(5, 1, 1, 1), Some("Duck"));
    }

    #[test]
    fn reads_unindented_documents() {
        let xml = "<ACK xmlns=\"urn:hl7-org:v2xml\"><MSH><MSH.1>|</MSH.1><MSH.2>^~\\&amp;</MSH.2><MSH.9><MSH.9.1>ACK</MSH.9.1></MSH.9></MSH><MSA><MSA.1>AA</MSA.1><MSA.2>ABCC1</MSA.2></MSA></ACK>";
        let msg = decode(xml).unwrap();

        assert_eq!(msg.segment_names(), vec!["MSH", "MSA"]);
        assert_eq!(msg.get("MSH-2"), Some("^~\\&"));
        assert_eq!(msg.get("MSA-1"), Some("AA"));
    }

    #[test]
    fn rejects_foreign_elements() {
        let xml = "<ADT_A01><MSH><MSH.1>|</MSH.1><PID.3>1</PID.3></MSH></ADT_A01>";
        assert!(matches!(decode(xml), Err(Hl7Error::Encoding(_))));
    }

    #[test]
    fn rejects_documents_without_header() {
        let xml = "<ADT_A01><PID><PID.3>1</PID.3></PID></ADT_A01>";
        assert!(matches!(decode(xml), Err(Hl7Error::Encoding(_))));
    }

    #[test]
    fn requires_message_type_to_encode() {
        let mut msg = Message::new();
        msg.push(Segment::new("MSH"));
        assert!(matches!(encode(&msg), Err(Hl7Error::Encoding(_))));
    }
}
