//! In-memory HL7 v2 message tree.
//!
//! A [`Message`] is an ordered list of [`Segment`]s. Fields are addressed the way HL7 numbers
//! them: 1-based, with `MSH-1` holding the field separator and `MSH-2` the encoding characters.
//! Below a field sit repetitions, components and subcomponents; values are stored unescaped and
//! the wire encodings in [`crate::encoding`] take care of delimiters.

use std::fmt;

use log::warn;

/// A complete HL7 v2 message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    segments: Vec<Segment>,
}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a segment after the ones already present.
    pub fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// First segment with the given name.
    pub fn segment(&self, name: &str) -> Option<&Segment> {
        self.segments.iter().find(|s| s.name == name)
    }

    pub fn segment_names(&self) -> Vec<&str> {
        self.segments.iter().map(|s| s.name()).collect()
    }

    /// Looks up a value by terser-style path, `SEG-FIELD[-COMPONENT[-SUBCOMPONENT]]`.
    ///
    /// Only the first repetition of the field is reachable this way.
    /// ```
    /// # use hl7_adt_client::message::{Message, Segment};
    /// let mut pid = Segment::new("PID");
    /// pid.set(5, 1, "Mouse");
    /// pid.set(5, 2, "Mickey");
    /// let mut msg = Message::new();
    /// msg.push(pid);
    /// assert_eq!(msg.get("PID-5-2"), Some("Mickey"));
    /// assert_eq!(msg.get("PID-5"), Some("Mouse"));
    /// ```
    pub fn get(&self, path: &str) -> Option<&str> {
        let mut parts = path.split('-');
        let name = parts.next()?;
        let field = parts.next()?.parse().ok()?;
        let component = match parts.next() {
            Some(c) => c.parse().ok()?,
            None => 1,
        };
        let subcomponent = match parts.next() {
            Some(s) => s.parse().ok()?,
            None => 1,
        };
        if parts.next().is_some() {
            return None;
        }
        self.segment(name)?
            .get_at(field, 0, component, subcomponent)
    }

    /// MSH-10.
    pub fn control_id(&self) -> Option<&str> {
        self.get("MSH-10")
    }

    /// MSH-9 message code and trigger event, e.g. `("ADT", "A01")`.
    pub fn message_type(&self) -> Option<(&str, &str)> {
        Some((self.get("MSH-9-1")?, self.get("MSH-9-2")?))
    }

    /// Message structure name such as `ADT_A01`.
    ///
    /// Taken from MSH-9-3 when present, otherwise derived from the message type.
    pub fn structure(&self) -> Option<String> {
        if let Some(structure) = self.get("MSH-9-3").filter(|s| !s.is_empty()) {
            return Some(structure.to_string());
        }
        self.message_type()
            .map(|(code, event)| format!("{}_{}", code, event))
    }

    /// Human readable outline of the segments and their populated fields.
    pub fn print_structure(&self) -> String {
        let mut out = self.structure().unwrap_or_else(|| "UNKNOWN".to_string());
        out.push('\n');
        for segment in &self.segments {
            let populated: Vec<String> = segment
                .fields
                .iter()
                .enumerate()
                .filter(|(_, f)| !f.is_empty())
                .map(|(i, _)| (i + 1).to_string())
                .collect();
            out.push_str(&format!(
                "   {} - populated fields [{}]\n",
                segment.name,
                populated.join(", ")
            ));
        }
        out
    }
}

/// A named segment holding 1-based fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    name: String,
    fields: Vec<Field>,
}

impl Segment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub(crate) fn with_fields(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// All fields, index 0 being field 1.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Field by its HL7 position (1-based).
    pub fn field(&self, position: usize) -> Option<&Field> {
        position.checked_sub(1).and_then(|i| self.fields.get(i))
    }

    /// Sets the first subcomponent of a component in the first repetition of a field.
    pub fn set(&mut self, field: usize, component: usize, value: impl Into<String>) {
        self.set_at(field, 0, component, 1, value);
    }

    /// Sets a value at an exact position, growing the segment with empty elements as needed.
    ///
    /// `field`, `component` and `subcomponent` are 1-based, `repetition` is 0-based. A zero
    /// position addresses nothing, so the call is ignored, the same way [`Segment::get_at`]
    /// returns `None` for it.
    pub fn set_at(
        &mut self,
        field: usize,
        repetition: usize,
        component: usize,
        subcomponent: usize,
        value: impl Into<String>,
    ) {
        if field == 0 || component == 0 || subcomponent == 0 {
            warn!(
                "Ignoring write to {}-{}-{}-{}, HL7 positions are 1-based",
                self.name, field, component, subcomponent
            );
            return;
        }
        let field = grow(&mut self.fields, field - 1);
        let repetition = grow(&mut field.repetitions, repetition);
        let component = grow(&mut repetition.components, component - 1);
        let slot = grow(&mut component.subcomponents, subcomponent - 1);
        *slot = value.into();
    }

    pub fn get(&self, field: usize, component: usize) -> Option<&str> {
        self.get_at(field, 0, component, 1)
    }

    pub fn get_at(
        &self,
        field: usize,
        repetition: usize,
        component: usize,
        subcomponent: usize,
    ) -> Option<&str> {
        self.field(field)?
            .repetitions
            .get(repetition)?
            .components
            .get(component.checked_sub(1)?)?
            .subcomponents
            .get(subcomponent.checked_sub(1)?)
            .map(String::as_str)
    }
}

fn grow<T: Default>(items: &mut Vec<T>, index: usize) -> &mut T {
    if items.len() <= index {
        items.resize_with(index + 1, T::default);
    }
    &mut items[index]
}

/// One field; may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Field {
    repetitions: Vec<Repetition>,
}

impl Field {
    pub(crate) fn from_repetitions(repetitions: Vec<Repetition>) -> Self {
        Self { repetitions }
    }

    /// A single-valued field.
    pub fn from_value(value: impl Into<String>) -> Self {
        Self {
            repetitions: vec![Repetition {
                components: vec![Component {
                    subcomponents: vec![value.into()],
                }],
            }],
        }
    }

    pub fn repetitions(&self) -> &[Repetition] {
        &self.repetitions
    }

    /// First value of the first repetition.
    pub fn value(&self) -> Option<&str> {
        self.repetitions
            .first()?
            .components
            .first()?
            .subcomponents
            .first()
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.repetitions.iter().all(Repetition::is_empty)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Repetition {
    components: Vec<Component>,
}

impl Repetition {
    pub(crate) fn from_components(components: Vec<Component>) -> Self {
        Self { components }
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn is_empty(&self) -> bool {
        self.components.iter().all(Component::is_empty)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Component {
    subcomponents: Vec<String>,
}

impl Component {
    pub(crate) fn from_subcomponents(subcomponents: Vec<String>) -> Self {
        Self { subcomponents }
    }

    pub fn subcomponents(&self) -> &[String] {
        &self.subcomponents
    }

    pub fn is_empty(&self) -> bool {
        self.subcomponents.iter().all(String::is_empty)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segment_names().join(" "))
    }
}
