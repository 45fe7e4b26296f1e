use super::ModelError;

/// Macro to generate a status enum with `as_str`, strict `FromStr` and a
/// lenient wire decoder.
///
/// The backend is loosely typed (LLM output, hand-written Python dicts), so
/// deserialization goes through `from_wire`: known spellings and aliases match
/// case-insensitively and anything else becomes the fallback variant.
/// `FromStr` stays strict for callers that need to reject bad input.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident fallback $fallback:ident {
            $($variant:ident => $s:literal $(| $alias:literal)*),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }

            pub fn from_wire(raw: &str) -> Self {
                let raw = raw.trim();
                $(
                    if raw.eq_ignore_ascii_case($s) $(|| raw.eq_ignore_ascii_case($alias))* {
                        return Self::$variant;
                    }
                )+
                Self::$fallback
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$fallback
            }
        }

        impl std::str::FromStr for $name {
            type Err = ModelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ModelError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = <Option<String> as serde::Deserialize>::deserialize(deserializer)?;
                Ok(raw.map(|raw| Self::from_wire(&raw)).unwrap_or_default())
            }
        }
    };
}

wire_enum!(
    /// Lifecycle of a case as reported by the backend.
    ///
    /// The backend writes `uploaded` right after the file lands and `error`
    /// when processing blows up.
    CaseStatus fallback Queued {
        Queued => "queued" | "uploaded",
        Processing => "processing",
        Completed => "completed",
        Failed => "failed" | "error",
    }
);

wire_enum!(
    /// Per-phase progress. Stage states the catalogue has no slot for
    /// (e.g. `error`) render as pending.
    PhaseStatus fallback Pending {
        Pending => "pending",
        InProgress => "in_progress",
        Completed => "completed",
    }
);

wire_enum!(
    /// Evidence status of one checklist item.
    ChecklistStatus fallback Unknown {
        Present => "present",
        Missing => "missing",
        Partial => "partial",
        Unknown => "unknown",
    }
);

impl PhaseStatus {
    /// Short badge shown next to a phase.
    pub fn badge(&self) -> &'static str {
        match self {
            Self::Completed => "Done",
            Self::InProgress => "Running",
            Self::Pending => "Pending",
        }
    }
}
