//! ER7, the pipe-delimited encoding.

use log::trace;

use crate::error::{Hl7Error, Result};
use crate::message::{Component, Field, Message, Repetition, Segment};

/// Segments are terminated by a carriage return.
pub const SEGMENT_TERMINATOR: char = '\r';

/// The separator characters announced in MSH-1 and MSH-2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiters {
    pub field: char,
    pub component: char,
    pub repetition: char,
    pub escape: char,
    pub subcomponent: char,
    /// Fifth MSH-2 character introduced in v2.7, kept so a reply re-encodes as received.
    pub truncation: Option<char>,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            field: '|',
            component: '^',
            repetition: '~',
            escape: '\\',
            subcomponent: '&',
            truncation: None,
        }
    }
}

impl Delimiters {
    /// Reads the delimiters from MSH-1 and MSH-2 values.
    pub fn from_msh(field_separator: &str, encoding_characters: &str) -> Result<Self> {
        let mut sep = field_separator.chars();
        let field = match (sep.next(), sep.next()) {
            (Some(c), None) => c,
            _ => {
                return Err(Hl7Error::encoding(format!(
                    "MSH-1 must be a single character, got '{}'",
                    field_separator
                )))
            }
        };

        let chars: Vec<char> = encoding_characters.chars().collect();
        if !matches!(chars.len(), 4 | 5) {
            return Err(Hl7Error::encoding(format!(
                "MSH-2 must hold four or five encoding characters, got '{}'",
                encoding_characters
            )));
        }

        Ok(Self {
            field,
            component: chars[0],
            repetition: chars[1],
            escape: chars[2],
            subcomponent: chars[3],
            truncation: chars.get(4).copied(),
        })
    }

    /// The MSH-2 value for these delimiters.
    pub fn encoding_characters(&self) -> String {
        [self.component, self.repetition, self.escape, self.subcomponent]
            .iter()
            .chain(self.truncation.iter())
            .collect()
    }

    fn escape(&self, value: &str) -> String {
        let mut out = String::with_capacity(value.len());
        for c in value.chars() {
            let code = if c == self.escape {
                "E"
            } else if c == self.field {
                "F"
            } else if c == self.component {
                "S"
            } else if c == self.subcomponent {
                "T"
            } else if c == self.repetition {
                "R"
            } else if Some(c) == self.truncation {
                "P"
            } else if c == '\r' {
                "X0D"
            } else if c == '\n' {
                "X0A"
            } else {
                out.push(c);
                continue;
            };
            out.push(self.escape);
            out.push_str(code);
            out.push(self.escape);
        }
        out
    }

    fn unescape(&self, value: &str) -> String {
        if !value.contains(self.escape) {
            return value.to_string();
        }

        let mut out = String::with_capacity(value.len());
        let mut rest = value;
        while let Some(start) = rest.find(self.escape) {
            out.push_str(&rest[..start]);
            let after = &rest[start + self.escape.len_utf8()..];
            let Some(end) = after.find(self.escape) else {
                // unterminated sequence, keep it as text
                out.push_str(&rest[start..]);
                return out;
            };
            let sequence = &after[..end];
            match sequence {
                "E" => out.push(self.escape),
                "F" => out.push(self.field),
                "S" => out.push(self.component),
                "T" => out.push(self.subcomponent),
                "R" => out.push(self.repetition),
                "P" if self.truncation.is_some() => out.extend(self.truncation),
                "X0D" => out.push('\r'),
                "X0A" => out.push('\n'),
                other => {
                    out.push(self.escape);
                    out.push_str(other);
                    out.push(self.escape);
                }
            }
            rest = &after[end + self.escape.len_utf8()..];
        }
        out.push_str(rest);
        out
    }
}

pub(super) fn encode(message: &Message) -> Result<String> {
    let msh = match message.segments().first() {
        Some(segment) if segment.name() == "MSH" => segment,
        _ => return Err(Hl7Error::encoding("message must start with an MSH segment")),
    };

    let field_separator = msh
        .field(1)
        .and_then(Field::value)
        .ok_or_else(|| Hl7Error::encoding("MSH-1 is missing"))?;
    let encoding_characters = msh
        .field(2)
        .and_then(Field::value)
        .ok_or_else(|| Hl7Error::encoding("MSH-2 is missing"))?;
    let delimiters = Delimiters::from_msh(field_separator, encoding_characters)?;

    let mut out = String::new();
    for segment in message.segments() {
        out.push_str(segment.name());

        let fields = trim_trailing(segment.fields(), Field::is_empty);
        let skip = if segment.name() == "MSH" {
            // MSH-1 is the separator itself and MSH-2 goes out unescaped
            out.push(delimiters.field);
            out.push_str(encoding_characters);
            2
        } else {
            0
        };

        for field in fields.iter().skip(skip) {
            out.push(delimiters.field);
            encode_field(field, &delimiters, &mut out);
        }
        out.push(SEGMENT_TERMINATOR);
    }

    trace!("Encoded {} segments as ER7", message.segments().len());
    Ok(out)
}

fn encode_field(field: &Field, delimiters: &Delimiters, out: &mut String) {
    let repetitions = trim_trailing(field.repetitions(), Repetition::is_empty);
    for (r, repetition) in repetitions.iter().enumerate() {
        if r > 0 {
            out.push(delimiters.repetition);
        }
        let components = trim_trailing(repetition.components(), Component::is_empty);
        for (c, component) in components.iter().enumerate() {
            if c > 0 {
                out.push(delimiters.component);
            }
            let subcomponents = trim_trailing(component.subcomponents(), |s| s.is_empty());
            for (s, value) in subcomponents.iter().enumerate() {
                if s > 0 {
                    out.push(delimiters.subcomponent);
                }
                out.push_str(&delimiters.escape(value));
            }
        }
    }
}

fn trim_trailing<T>(items: &[T], is_empty: impl Fn(&T) -> bool) -> &[T] {
    let len = items
        .iter()
        .rposition(|item| !is_empty(item))
        .map_or(0, |last| last + 1);
    &items[..len]
}

pub(super) fn decode(text: &str) -> Result<Message> {
    let mut lines = text
        .split(|c: char| c == '\r' || c == '\n')
        .filter(|line| !line.trim().is_empty());

    let header = lines
        .next()
        .ok_or_else(|| Hl7Error::encoding("empty message"))?;
    if !header.starts_with("MSH") {
        return Err(Hl7Error::encoding("message must start with an MSH segment"));
    }

    let field_separator = header[3..]
        .chars()
        .next()
        .ok_or_else(|| Hl7Error::encoding("MSH segment is truncated"))?;
    let after_separator = &header[3 + field_separator.len_utf8()..];
    let (encoding_characters, remainder) = match after_separator.find(field_separator) {
        Some(end) => (
            &after_separator[..end],
            Some(&after_separator[end + field_separator.len_utf8()..]),
        ),
        None => (after_separator, None),
    };
    let delimiters =
        Delimiters::from_msh(&field_separator.to_string(), encoding_characters)?;

    let mut message = Message::new();

    let mut msh_fields = vec![
        Field::from_value(field_separator.to_string()),
        Field::from_value(encoding_characters),
    ];
    if let Some(remainder) = remainder {
        msh_fields.extend(
            remainder
                .split(delimiters.field)
                .map(|f| decode_field(f, &delimiters)),
        );
    }
    message.push(Segment::with_fields("MSH", msh_fields));

    for line in lines {
        let mut parts = line.split(delimiters.field);
        let name = parts.next().unwrap_or_default();
        if name.len() != 3 || !name.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()) {
            return Err(Hl7Error::encoding(format!("invalid segment name '{}'", name)));
        }
        let fields = parts.map(|f| decode_field(f, &delimiters)).collect();
        message.push(Segment::with_fields(name, fields));
    }

    Ok(message)
}

fn decode_field(text: &str, delimiters: &Delimiters) -> Field {
    if text.is_empty() {
        return Field::default();
    }
    Field::from_repetitions(
        text.split(delimiters.repetition)
            .map(|r| decode_repetition(r, delimiters))
            .collect(),
    )
}

fn decode_repetition(text: &str, delimiters: &Delimiters) -> Repetition {
    if text.is_empty() {
        return Repetition::default();
    }
    Repetition::from_components(
        text.split(delimiters.component)
            .map(|c| decode_component(c, delimiters))
            .collect(),
    )
}

fn decode_component(text: &str, delimiters: &Delimiters) -> Component {
    if text.is_empty() {
        return Component::default();
    }
    Component::from_subcomponents(
        text.split(delimiters.subcomponent)
            .map(|s| delimiters.unescape(s))
            .collect(),
    )
}
