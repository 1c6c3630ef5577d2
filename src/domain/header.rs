use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use super::{Identifier, OpaqueExtra};
use crate::xml::Element;

/// The `REQ-IF-HEADER`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    identifier: Identifier,
    /// `COMMENT`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// `CREATION-TIME`, as written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<String>,
    /// `REPOSITORY-ID`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository_id: Option<String>,
    /// `REQ-IF-TOOL-ID`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub req_if_tool_id: Option<String>,
    /// `REQ-IF-VERSION`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub req_if_version: Option<String>,
    /// `SOURCE-TOOL-ID`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_tool_id: Option<String>,
    /// `TITLE`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip)]
    pub(crate) extra: OpaqueExtra,
    /// One entry per header field that was present, for the field's own
    /// element.
    #[serde(skip)]
    pub(crate) fields: Vec<(&'static str, OpaqueExtra)>,
    /// The enclosing `THE-HEADER`.
    #[serde(skip)]
    pub(crate) wrapper: OpaqueExtra,
}

impl Header {
    /// A header with only an identifier.
    #[must_use]
    pub fn new(identifier: Identifier) -> Self {
        Self {
            identifier,
            comment: None,
            creation_time: None,
            repository_id: None,
            req_if_tool_id: None,
            req_if_version: None,
            source_tool_id: None,
            title: None,
            extra: OpaqueExtra::default(),
            fields: Vec::new(),
            wrapper: OpaqueExtra::default(),
        }
    }

    /// The header's identifier.
    #[must_use]
    pub const fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// `CREATION-TIME` parsed as an RFC 3339 timestamp.
    #[must_use]
    pub fn created(&self) -> Option<DateTime<FixedOffset>> {
        self.creation_time
            .as_deref()
            .and_then(|value| DateTime::parse_from_rfc3339(value).ok())
    }

    pub(crate) fn field_extra(&self, name: &str) -> Option<&OpaqueExtra> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, extra)| extra)
    }

    /// The header fields in schema order, with their element names.
    pub(crate) fn field_values(&self) -> [(&'static str, Option<&str>); 7] {
        [
            ("COMMENT", self.comment.as_deref()),
            ("CREATION-TIME", self.creation_time.as_deref()),
            ("REPOSITORY-ID", self.repository_id.as_deref()),
            ("REQ-IF-TOOL-ID", self.req_if_tool_id.as_deref()),
            ("REQ-IF-VERSION", self.req_if_version.as_deref()),
            ("SOURCE-TOOL-ID", self.source_tool_id.as_deref()),
            ("TITLE", self.title.as_deref()),
        ]
    }

    pub(crate) fn field_mut(&mut self, name: &str) -> Option<&mut Option<String>> {
        Some(match name {
            "COMMENT" => &mut self.comment,
            "CREATION-TIME" => &mut self.creation_time,
            "REPOSITORY-ID" => &mut self.repository_id,
            "REQ-IF-TOOL-ID" => &mut self.req_if_tool_id,
            "REQ-IF-VERSION" => &mut self.req_if_version,
            "SOURCE-TOOL-ID" => &mut self.source_tool_id,
            "TITLE" => &mut self.title,
            _ => return None,
        })
    }
}

/// A `REQ-IF-TOOL-EXTENSION`, kept exactly as read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolExtension {
    pub(crate) element: Element,
}

impl ToolExtension {
    /// Wraps an element.
    #[must_use]
    pub const fn new(element: Element) -> Self {
        Self { element }
    }

    /// The extension's content.
    #[must_use]
    pub const fn element(&self) -> &Element {
        &self.element
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_are_listed_in_schema_order() {
        let mut header = Header::new(Identifier::new("H").unwrap());
        *header.field_mut("TITLE").unwrap() = Some("Demo".into());
        header.creation_time = Some("2024-05-01T10:00:00+02:00".into());

        let present: Vec<_> = header
            .field_values()
            .into_iter()
            .filter_map(|(name, value)| value.map(|value| (name, value)))
            .collect();
        assert_eq!(
            present,
            [("CREATION-TIME", "2024-05-01T10:00:00+02:00"), ("TITLE", "Demo")]
        );
        assert_eq!(header.created().unwrap().timestamp(), 1_714_550_400);
        assert!(header.field_mut("OTHER").is_none());
    }
}
