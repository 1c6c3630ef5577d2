use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use serde::Serialize;

use super::Identifier;

/// The attributes shared by every identifiable ReqIF element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metadata {
    identifier: Identifier,
    /// `LONG-NAME`: the human readable name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_name: Option<String>,
    /// `DESC`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    /// `LAST-CHANGE`, as written.
    ///
    /// ReqIF requires an `xsd:dateTime`, but producers are inconsistent, so
    /// the value is kept as text. [`Metadata::last_changed`] parses it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_change: Option<String>,
}

impl Metadata {
    /// Metadata for a new element.
    #[must_use]
    pub const fn new(identifier: Identifier) -> Self {
        Self {
            identifier,
            long_name: None,
            desc: None,
            last_change: None,
        }
    }

    /// Sets the long name.
    #[must_use]
    pub fn with_long_name(mut self, long_name: impl Into<String>) -> Self {
        self.long_name = Some(long_name.into());
        self
    }

    /// The element's identifier.
    #[must_use]
    pub const fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// `LAST-CHANGE` parsed as an RFC 3339 timestamp.
    #[must_use]
    pub fn last_changed(&self) -> Option<DateTime<FixedOffset>> {
        self.last_change
            .as_deref()
            .and_then(|value| DateTime::parse_from_rfc3339(value).ok())
    }

    /// Records a modification at `now`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_change = Some(now.to_rfc3339_opts(SecondsFormat::Millis, false));
    }
}

/// An entity with an `IDENTIFIER`.
pub trait Identifiable {
    /// The shared metadata.
    fn metadata(&self) -> &Metadata;

    /// The element's identifier.
    fn identifier(&self) -> &Identifier {
        self.metadata().identifier()
    }

    /// The long name, or the identifier when there is none.
    fn display_name(&self) -> &str {
        self.metadata()
            .long_name
            .as_deref()
            .unwrap_or_else(|| self.identifier().as_str())
    }
}

macro_rules! identifiable {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::domain::Identifiable for $ty {
                fn metadata(&self) -> &$crate::domain::Metadata {
                    &self.metadata
                }
            }
        )+
    };
}
pub(crate) use identifiable;
