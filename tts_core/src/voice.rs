//! Voice parameter enumerations and per-request resolution.
//!
//! The four style knobs select which model sample/style the backend uses.
//! Resolution happens exactly once per request and the result is immutable
//! afterwards, so every chunk of one job is rendered with the same voice
//! and no shared configuration is ever mutated per request.

use serde::{Deserialize, Serialize};

use crate::error::TtsError;

macro_rules! voice_enum {
    ($name:ident, { $($variant:ident => $wire:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant,)+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }

            pub fn parse(s: &str) -> Option<Self> {
                match s {
                    $($wire => Some($name::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

voice_enum!(Gender, {
    Male => "male",
    Female => "female",
});

voice_enum!(Area, {
    Northern => "northern",
    Southern => "southern",
    Central => "central",
});

voice_enum!(Group, {
    Story => "story",
    News => "news",
    Audiobook => "audiobook",
    Interview => "interview",
    Review => "review",
});

voice_enum!(Emotion, {
    Neutral => "neutral",
    Serious => "serious",
    Monotone => "monotone",
    Sad => "sad",
    Surprised => "surprised",
    Happy => "happy",
    Angry => "angry",
});

/// Raw, unvalidated voice values from a request. `None` means the caller
/// left the field unspecified.
#[derive(Debug, Clone, Default)]
pub struct VoiceSelection {
    pub gender: Option<String>,
    pub area: Option<String>,
    pub group: Option<String>,
    pub emotion: Option<String>,
}

/// Resolved voice parameters. `None` is the "unspecified" sentinel: the
/// backend is free to pick any matching sample for that field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoiceParameters {
    pub gender: Option<Gender>,
    pub area: Option<Area>,
    pub group: Option<Group>,
    pub emotion: Option<Emotion>,
}

impl VoiceParameters {
    /// Merge explicit request values with configured defaults, field by
    /// field: explicit wins over default, default over unspecified. An
    /// explicit value outside its enumeration fails with
    /// [`TtsError::InvalidParameter`] naming the field.
    pub fn resolve(explicit: &VoiceSelection, defaults: &VoiceParameters) -> Result<Self, TtsError> {
        Ok(Self {
            gender: resolve_field("gender", explicit.gender.as_deref(), Gender::parse, defaults.gender)?,
            area: resolve_field("area", explicit.area.as_deref(), Area::parse, defaults.area)?,
            group: resolve_field("group", explicit.group.as_deref(), Group::parse, defaults.group)?,
            emotion: resolve_field(
                "emotion",
                explicit.emotion.as_deref(),
                Emotion::parse,
                defaults.emotion,
            )?,
        })
    }
}

fn resolve_field<T>(
    field: &'static str,
    explicit: Option<&str>,
    parse: fn(&str) -> Option<T>,
    default: Option<T>,
) -> Result<Option<T>, TtsError> {
    match explicit {
        Some(raw) => parse(raw)
            .map(Some)
            .ok_or_else(|| TtsError::InvalidParameter { field, value: raw.to_string() }),
        None => Ok(default),
    }
}
