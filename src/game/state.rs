use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier shared by the two cards of a memory pair.
pub type PairId = u8;

/// The fixed symbol set used by both game variants. Images themselves live in
/// the frontend; the engine only tracks which kind a card carries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Scientist,
    Microscope,
    Robot,
    Gear,
    Lock,
    Key,
    Girl,
    Earth,
    Cloud,
    Shield,
    Knight,
    Rainbow,
}

impl ImageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageKind::Scientist => "scientist",
            ImageKind::Microscope => "microscope",
            ImageKind::Robot => "robot",
            ImageKind::Gear => "gear",
            ImageKind::Lock => "lock",
            ImageKind::Key => "key",
            ImageKind::Girl => "girl",
            ImageKind::Earth => "earth",
            ImageKind::Cloud => "cloud",
            ImageKind::Shield => "shield",
            ImageKind::Knight => "knight",
            ImageKind::Rainbow => "rainbow",
        }
    }

    /// Display name shown to the player. The UI is entirely in Arabic.
    pub fn arabic_label(self) -> &'static str {
        match self {
            ImageKind::Scientist => "العالم",
            ImageKind::Microscope => "المجهر",
            ImageKind::Robot => "الروبوت",
            ImageKind::Gear => "الترس",
            ImageKind::Lock => "القفل",
            ImageKind::Key => "المفتاح",
            ImageKind::Girl => "البنت",
            ImageKind::Earth => "الأرض",
            ImageKind::Cloud => "السحابة",
            ImageKind::Shield => "الدرع",
            ImageKind::Knight => "الفارس",
            ImageKind::Rainbow => "قوس قزح",
        }
    }
}

impl FromStr for ImageKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "scientist" => Ok(ImageKind::Scientist),
            "microscope" => Ok(ImageKind::Microscope),
            "robot" => Ok(ImageKind::Robot),
            "gear" => Ok(ImageKind::Gear),
            "lock" => Ok(ImageKind::Lock),
            "key" => Ok(ImageKind::Key),
            "girl" => Ok(ImageKind::Girl),
            "earth" => Ok(ImageKind::Earth),
            "cloud" => Ok(ImageKind::Cloud),
            "shield" => Ok(ImageKind::Shield),
            "knight" => Ok(ImageKind::Knight),
            "rainbow" => Ok(ImageKind::Rainbow),
            other => Err(format!("unknown image kind: {other}")),
        }
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Difficulty tier. Pair counts per level are fixed at 2 / 4 / 6.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(try_from = "u8", into = "u8")]
pub enum Level {
    One,
    Two,
    Three,
}

impl Level {
    pub const FIRST: Level = Level::One;
    pub const LAST: Level = Level::Three;

    pub fn pair_count(self) -> usize {
        match self {
            Level::One => 2,
            Level::Two => 4,
            Level::Three => 6,
        }
    }

    /// The next tier, or `None` past the last one.
    pub fn next(self) -> Option<Level> {
        match self {
            Level::One => Some(Level::Two),
            Level::Two => Some(Level::Three),
            Level::Three => None,
        }
    }
}

impl TryFrom<u8> for Level {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Level::One),
            2 => Ok(Level::Two),
            3 => Ok(Level::Three),
            other => Err(format!("level out of range: {other}")),
        }
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> u8 {
        match level {
            Level::One => 1,
            Level::Two => 2,
            Level::Three => 3,
        }
    }
}

/// A memory-flip card. Identity is fixed at deck creation; only the two state
/// flags mutate. `is_matched` implies `is_flipped`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub image_kind: ImageKind,
    pub pair_id: PairId,
    pub is_flipped: bool,
    pub is_matched: bool,
}

/// A slot-matching card. `position` is only used by the presentation layer for
/// staggered entry animation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameCard {
    pub id: String,
    pub image_kind: ImageKind,
    pub position: usize,
}

/// A target slot awaiting exactly one correct card. Write-once: a placed card
/// is never cleared.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub id: String,
    pub expected_image_kind: ImageKind,
    pub placed_card: Option<GameCard>,
    pub is_correct: bool,
}

impl Slot {
    pub fn is_filled(&self) -> bool {
        self.placed_card.is_some()
    }
}

/// Transient placement feedback shown while a resolution window is open.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Feedback {
    Correct,
    Incorrect,
}

/// Coarse screen state of the slot-matching session flow.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScreenPhase {
    ModeSelection,
    LevelSelection,
    CharacterSelection,
    Playing,
    GameOver,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    Single,
    TwoPlayer,
}

impl FromStr for GameMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "single" => Ok(GameMode::Single),
            "two_player" => Ok(GameMode::TwoPlayer),
            other => Err(format!("unknown game mode: {other}")),
        }
    }
}

/// Sound effects the engine asks the presentation layer to play.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SoundCue {
    Hit,
    Success,
    Celebration,
}

impl SoundCue {
    pub fn as_str(self) -> &'static str {
        match self {
            SoundCue::Hit => "hit",
            SoundCue::Success => "success",
            SoundCue::Celebration => "celebration",
        }
    }
}

/// Observable state transitions, returned by every engine operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum GameEvent {
    RoundInitialized {
        level: Level,
    },
    CardFlipped {
        card_id: String,
    },
    MatchFound {
        pair_id: PairId,
    },
    CardsReverted {
        card_ids: Vec<String>,
    },
    CardSelected {
        card_id: String,
    },
    CardDeselected {
        card_id: String,
    },
    CardPlaced {
        slot_id: String,
        card_id: String,
        correct: bool,
    },
    CardReturned {
        card_id: String,
    },
    FeedbackCleared,
    RoundCompleted {
        level: Level,
    },
    SessionReset,
}
