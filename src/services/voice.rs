//! Voice presets offered by the text-to-speech service.

use serde::{Deserialize, Serialize};

/// The closed set of synthesis voices.
///
/// Serialised lowercase, matching the wire value sent to the speech
/// endpoint (`"alloy"`, `"echo"`, …).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceType {
    Alloy,
    Echo,
    Fable,
    Onyx,
    Nova,
    Shimmer,
}

impl VoiceType {
    /// Every preset, in picker order.
    pub const ALL: [VoiceType; 6] = [
        VoiceType::Alloy,
        VoiceType::Echo,
        VoiceType::Fable,
        VoiceType::Onyx,
        VoiceType::Nova,
        VoiceType::Shimmer,
    ];

    /// Wire value sent to the speech endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            VoiceType::Alloy => "alloy",
            VoiceType::Echo => "echo",
            VoiceType::Fable => "fable",
            VoiceType::Onyx => "onyx",
            VoiceType::Nova => "nova",
            VoiceType::Shimmer => "shimmer",
        }
    }

    /// Capitalised label for the UI picker.
    pub fn label(&self) -> &'static str {
        match self {
            VoiceType::Alloy => "Alloy",
            VoiceType::Echo => "Echo",
            VoiceType::Fable => "Fable",
            VoiceType::Onyx => "Onyx",
            VoiceType::Nova => "Nova",
            VoiceType::Shimmer => "Shimmer",
        }
    }
}

impl Default for VoiceType {
    fn default() -> Self {
        VoiceType::Alloy
    }
}

impl std::fmt::Display for VoiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_contains_six_distinct_voices() {
        let mut wire: Vec<&str> = VoiceType::ALL.iter().map(VoiceType::as_str).collect();
        wire.sort_unstable();
        wire.dedup();
        assert_eq!(wire.len(), 6);
    }

    #[test]
    fn serialises_lowercase() {
        assert_eq!(
            serde_json::to_string(&VoiceType::Shimmer).unwrap(),
            "\"shimmer\""
        );
    }

    #[test]
    fn deserialises_from_wire_value() {
        let voice: VoiceType = serde_json::from_str("\"onyx\"").unwrap();
        assert_eq!(voice, VoiceType::Onyx);
    }

    #[test]
    fn default_voice_is_alloy() {
        assert_eq!(VoiceType::default(), VoiceType::Alloy);
    }
}
