//! Game core: shared data model, deck/slot generation, the unified turn
//! state machine and the two variant engines.

pub mod audio;
pub mod deck;
pub mod matching;
pub mod memory;
pub mod state;
pub mod turn;

pub use audio::{AudioChannel, PlaybackError, SoundSink};
pub use deck::{kinds_for_level, CHARACTER_KINDS, PAIR_TABLE};
pub use matching::{MatchingGame, MatchingSnapshot};
pub use memory::{MemoryGame, MemorySnapshot};
pub use state::{
    Card, Feedback, GameCard, GameEvent, GameMode, ImageKind, Level, PairId, ScreenPhase, Slot,
    SoundCue,
};
pub use turn::{TerminalPolicy, TurnEngine, TurnPhase, TurnRules};
