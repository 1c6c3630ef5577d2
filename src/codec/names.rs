use crate::domain::{SpecTypeKind, ValueKind};

pub(super) const IDENTIFIER: &str = "IDENTIFIER";
pub(super) const LAST_CHANGE: &str = "LAST-CHANGE";
pub(super) const LONG_NAME: &str = "LONG-NAME";
pub(super) const DESC: &str = "DESC";

/// The attributes of every identifiable element.
pub(super) const METADATA: [&str; 4] = [DESC, IDENTIFIER, LAST_CHANGE, LONG_NAME];

pub(super) const HEADER_FIELDS: [&str; 7] = [
    "COMMENT",
    "CREATION-TIME",
    "REPOSITORY-ID",
    "REQ-IF-TOOL-ID",
    "REQ-IF-VERSION",
    "SOURCE-TOOL-ID",
    "TITLE",
];

pub(super) const CONTENT_SECTIONS: [&str; 6] = [
    "DATATYPES",
    "SPEC-TYPES",
    "SPEC-OBJECTS",
    "SPEC-RELATIONS",
    "SPECIFICATIONS",
    "SPEC-RELATION-GROUPS",
];

const fn suffix(kind: ValueKind) -> &'static str {
    match kind {
        ValueKind::Boolean => "BOOLEAN",
        ValueKind::Integer => "INTEGER",
        ValueKind::Real => "REAL",
        ValueKind::String => "STRING",
        ValueKind::Date => "DATE",
        ValueKind::Enumeration => "ENUMERATION",
        ValueKind::Xhtml => "XHTML",
    }
}

fn kind_after(local: &str, prefix: &str) -> Option<ValueKind> {
    let suffix_part = local.strip_prefix(prefix)?;
    ValueKind::ALL
        .into_iter()
        .find(|kind| suffix(*kind) == suffix_part)
}

pub(super) const fn datatype(kind: ValueKind) -> &'static str {
    match kind {
        ValueKind::Boolean => "DATATYPE-DEFINITION-BOOLEAN",
        ValueKind::Integer => "DATATYPE-DEFINITION-INTEGER",
        ValueKind::Real => "DATATYPE-DEFINITION-REAL",
        ValueKind::String => "DATATYPE-DEFINITION-STRING",
        ValueKind::Date => "DATATYPE-DEFINITION-DATE",
        ValueKind::Enumeration => "DATATYPE-DEFINITION-ENUMERATION",
        ValueKind::Xhtml => "DATATYPE-DEFINITION-XHTML",
    }
}

pub(super) const fn datatype_ref(kind: ValueKind) -> &'static str {
    match kind {
        ValueKind::Boolean => "DATATYPE-DEFINITION-BOOLEAN-REF",
        ValueKind::Integer => "DATATYPE-DEFINITION-INTEGER-REF",
        ValueKind::Real => "DATATYPE-DEFINITION-REAL-REF",
        ValueKind::String => "DATATYPE-DEFINITION-STRING-REF",
        ValueKind::Date => "DATATYPE-DEFINITION-DATE-REF",
        ValueKind::Enumeration => "DATATYPE-DEFINITION-ENUMERATION-REF",
        ValueKind::Xhtml => "DATATYPE-DEFINITION-XHTML-REF",
    }
}

pub(super) const fn attribute_definition(kind: ValueKind) -> &'static str {
    match kind {
        ValueKind::Boolean => "ATTRIBUTE-DEFINITION-BOOLEAN",
        ValueKind::Integer => "ATTRIBUTE-DEFINITION-INTEGER",
        ValueKind::Real => "ATTRIBUTE-DEFINITION-REAL",
        ValueKind::String => "ATTRIBUTE-DEFINITION-STRING",
        ValueKind::Date => "ATTRIBUTE-DEFINITION-DATE",
        ValueKind::Enumeration => "ATTRIBUTE-DEFINITION-ENUMERATION",
        ValueKind::Xhtml => "ATTRIBUTE-DEFINITION-XHTML",
    }
}

pub(super) const fn attribute_definition_ref(kind: ValueKind) -> &'static str {
    match kind {
        ValueKind::Boolean => "ATTRIBUTE-DEFINITION-BOOLEAN-REF",
        ValueKind::Integer => "ATTRIBUTE-DEFINITION-INTEGER-REF",
        ValueKind::Real => "ATTRIBUTE-DEFINITION-REAL-REF",
        ValueKind::String => "ATTRIBUTE-DEFINITION-STRING-REF",
        ValueKind::Date => "ATTRIBUTE-DEFINITION-DATE-REF",
        ValueKind::Enumeration => "ATTRIBUTE-DEFINITION-ENUMERATION-REF",
        ValueKind::Xhtml => "ATTRIBUTE-DEFINITION-XHTML-REF",
    }
}

pub(super) const fn attribute_value(kind: ValueKind) -> &'static str {
    match kind {
        ValueKind::Boolean => "ATTRIBUTE-VALUE-BOOLEAN",
        ValueKind::Integer => "ATTRIBUTE-VALUE-INTEGER",
        ValueKind::Real => "ATTRIBUTE-VALUE-REAL",
        ValueKind::String => "ATTRIBUTE-VALUE-STRING",
        ValueKind::Date => "ATTRIBUTE-VALUE-DATE",
        ValueKind::Enumeration => "ATTRIBUTE-VALUE-ENUMERATION",
        ValueKind::Xhtml => "ATTRIBUTE-VALUE-XHTML",
    }
}

/// The kind of a `DATATYPE-DEFINITION-*` element.
pub(super) fn datatype_kind(local: &str) -> Option<ValueKind> {
    kind_after(local, "DATATYPE-DEFINITION-")
}

/// The kind of an `ATTRIBUTE-DEFINITION-*` element.
pub(super) fn attribute_definition_kind(local: &str) -> Option<ValueKind> {
    kind_after(local, "ATTRIBUTE-DEFINITION-")
}

/// The kind of an `ATTRIBUTE-VALUE-*` element.
pub(super) fn attribute_value_kind(local: &str) -> Option<ValueKind> {
    kind_after(local, "ATTRIBUTE-VALUE-")
}

pub(super) const fn spec_type(kind: SpecTypeKind) -> &'static str {
    match kind {
        SpecTypeKind::SpecObject => "SPEC-OBJECT-TYPE",
        SpecTypeKind::SpecRelation => "SPEC-RELATION-TYPE",
        SpecTypeKind::Specification => "SPECIFICATION-TYPE",
        SpecTypeKind::RelationGroup => "RELATION-GROUP-TYPE",
    }
}

pub(super) const fn spec_type_ref(kind: SpecTypeKind) -> &'static str {
    match kind {
        SpecTypeKind::SpecObject => "SPEC-OBJECT-TYPE-REF",
        SpecTypeKind::SpecRelation => "SPEC-RELATION-TYPE-REF",
        SpecTypeKind::Specification => "SPECIFICATION-TYPE-REF",
        SpecTypeKind::RelationGroup => "RELATION-GROUP-TYPE-REF",
    }
}

/// The kind of a spec type element.
pub(super) fn spec_type_kind(local: &str) -> Option<SpecTypeKind> {
    [
        SpecTypeKind::SpecObject,
        SpecTypeKind::SpecRelation,
        SpecTypeKind::Specification,
        SpecTypeKind::RelationGroup,
    ]
    .into_iter()
    .find(|kind| spec_type(*kind) == local)
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("ATTRIBUTE-VALUE-XHTML", Some(ValueKind::Xhtml))]
    #[test_case("ATTRIBUTE-VALUE-BOOLEAN", Some(ValueKind::Boolean))]
    #[test_case("ATTRIBUTE-VALUE-", None)]
    #[test_case("ATTRIBUTE-VALUE-COLOUR", None)]
    #[test_case("DATATYPE-DEFINITION-REAL", None; "other element family")]
    fn value_kinds_are_read_from_tags(local: &str, expected: Option<ValueKind>) {
        assert_eq!(attribute_value_kind(local), expected);
    }

    #[test]
    fn tags_and_kinds_agree() {
        for kind in ValueKind::ALL {
            assert_eq!(datatype_kind(datatype(kind)), Some(kind));
            assert_eq!(attribute_definition_kind(attribute_definition(kind)), Some(kind));
            assert_eq!(datatype_ref(kind), format!("{}-REF", datatype(kind)));
            assert_eq!(
                attribute_definition_ref(kind),
                format!("{}-REF", attribute_definition(kind))
            );
        }
        assert_eq!(
            spec_type_kind("SPECIFICATION-TYPE"),
            Some(SpecTypeKind::Specification)
        );
        assert_eq!(spec_type_kind("SPECIFICATION-TYPE-REF"), None);
    }
}
