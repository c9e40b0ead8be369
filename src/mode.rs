use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::timer::Millis;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GameMode {
    #[default]
    Default,
    Reverse,
    DoubleTrouble,
    Speedrun,
}

/// How an evaluation gets started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationTrigger {
    /// A validate button in the kitchen
    Manual,
    /// A confirm gesture (wink) while the code is shown
    Automatic,
}

/// Which form of the true code the player is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    Bits,
    Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModePolicy {
    pub duration_ms: Millis,
    pub trigger: ValidationTrigger,
    pub inputs_required: u8,
    pub exposed_as: Representation,
    pub instructions: &'static str,
}

impl GameMode {
    pub const ALL: [GameMode; 4] = [
        GameMode::Default,
        GameMode::Reverse,
        GameMode::DoubleTrouble,
        GameMode::Speedrun,
    ];

    pub fn policy(self) -> ModePolicy {
        match self {
            GameMode::Default => ModePolicy {
                duration_ms: 20_000,
                trigger: ValidationTrigger::Manual,
                inputs_required: 1,
                exposed_as: Representation::Bits,
                instructions: "Show the order's code in binary with one hand, then press validate.",
            },
            GameMode::Reverse => ModePolicy {
                duration_ms: 20_000,
                trigger: ValidationTrigger::Automatic,
                inputs_required: 2,
                exposed_as: Representation::Decimal,
                instructions: "The order shows a decimal number: show it in binary and wink to confirm.",
            },
            GameMode::DoubleTrouble => ModePolicy {
                duration_ms: 60_000,
                trigger: ValidationTrigger::Automatic,
                inputs_required: 2,
                exposed_as: Representation::Bits,
                instructions: "Use both hands to show the code, then wink to confirm.",
            },
            GameMode::Speedrun => ModePolicy {
                duration_ms: 10_000,
                trigger: ValidationTrigger::Manual,
                inputs_required: 1,
                exposed_as: Representation::Bits,
                instructions: "Half the time. Show the code and press validate, fast.",
            },
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            GameMode::Default => "default",
            GameMode::Reverse => "reverse",
            GameMode::DoubleTrouble => "double trouble",
            GameMode::Speedrun => "speedrun",
        }
    }

    pub fn validate_label(self) -> &'static str {
        match self.policy().trigger {
            ValidationTrigger::Manual => "Validate",
            ValidationTrigger::Automatic => "Wink to validate",
        }
    }

    pub fn hands_label(self) -> &'static str {
        match self.policy().inputs_required {
            1 => "one hand",
            _ => "both hands",
        }
    }

    pub fn is_automatic(self) -> bool {
        self.policy().trigger == ValidationTrigger::Automatic
    }

    /// Next mode in menu order, wrapping around
    pub fn next(self) -> GameMode {
        let idx = Self::ALL.iter().position(|m| *m == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}
