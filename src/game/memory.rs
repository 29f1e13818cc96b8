//! Memory-flip variant: a shuffled deck of paired face-down cards, two
//! sequential flips compared by pair identity. Matches stay revealed; a
//! mismatch flips both back after a delay.

use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::Serialize;

use super::audio::AudioChannel;
use super::deck::create_memory_deck;
use super::state::{Card, GameEvent, Level, PairId, SoundCue};
use super::turn::{TerminalPolicy, TurnEngine, TurnRules};

pub const MATCH_DELAY_MS: u32 = 600;
pub const MISMATCH_DELAY_MS: u32 = 1200;
pub const COMPLETION_DELAY_MS: u32 = 500;

#[derive(Debug, Clone)]
enum MemoryResolution {
    Match { first: String, second: String },
    Mismatch { first: String, second: String },
    Complete,
}

/// Read-only snapshot handed to the presentation layer. Field names follow
/// the frontend store shape.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemorySnapshot {
    pub level: Level,
    pub cards: Vec<Card>,
    pub flipped_cards: Vec<Card>,
    pub matched_pairs: usize,
    pub moves: u32,
    pub is_processing: bool,
    pub game_complete: bool,
}

pub struct MemoryGame {
    level: Level,
    cards: Vec<Card>,
    /// Ids of the in-flight flipped cards, 0 to 2 entries.
    flipped: Vec<String>,
    turn: TurnEngine<MemoryResolution>,
    rng: SmallRng,
    audio: AudioChannel,
}

fn rules_for(level: Level) -> TurnRules {
    TurnRules {
        total_pairs: level.pair_count(),
        match_delay_ms: MATCH_DELAY_MS,
        mismatch_delay_ms: MISMATCH_DELAY_MS,
        completion_delay_ms: COMPLETION_DELAY_MS,
        allow_deselect: false,
        count_moves: true,
        terminal: TerminalPolicy::WrapToFirstLevel,
    }
}

impl Default for MemoryGame {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGame {
    pub fn new() -> Self {
        let mut game = Self {
            level: Level::FIRST,
            cards: Vec::new(),
            flipped: Vec::new(),
            turn: TurnEngine::new(rules_for(Level::FIRST)),
            rng: SmallRng::from_entropy(),
            audio: AudioChannel::new(),
        };
        game.initialize(Level::FIRST);
        game
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn matched_pairs(&self) -> usize {
        self.turn.matched_pairs()
    }

    pub fn moves(&self) -> u32 {
        self.turn.moves()
    }

    pub fn is_processing(&self) -> bool {
        self.turn.is_processing()
    }

    pub fn game_complete(&self) -> bool {
        self.turn.is_complete()
    }

    pub fn generation(&self) -> u64 {
        self.turn.generation()
    }

    /// The armed timer to schedule, if any: `(generation, delay_ms)`.
    pub fn pending_timer(&self) -> Option<(u64, u32)> {
        self.turn.pending_timer()
    }

    pub fn audio_mut(&mut self) -> &mut AudioChannel {
        &mut self.audio
    }

    pub fn is_muted(&self) -> bool {
        self.audio.is_muted()
    }

    pub fn snapshot(&self) -> MemorySnapshot {
        let flipped_cards = self
            .flipped
            .iter()
            .filter_map(|id| self.cards.iter().find(|card| &card.id == id))
            .cloned()
            .collect();
        MemorySnapshot {
            level: self.level,
            cards: self.cards.clone(),
            flipped_cards,
            matched_pairs: self.turn.matched_pairs(),
            moves: self.turn.moves(),
            is_processing: self.turn.is_processing(),
            game_complete: self.turn.is_complete(),
        }
    }

    /// Replaces the round wholesale with a fresh shuffled deck for `level`.
    pub fn initialize(&mut self, level: Level) -> Vec<GameEvent> {
        self.level = level;
        self.cards = create_memory_deck(level, &mut self.rng);
        self.flipped.clear();
        self.turn.reset_round(level.pair_count());
        vec![GameEvent::RoundInitialized { level }]
    }

    /// Same level, new shuffle, counters zeroed.
    pub fn restart(&mut self) -> Vec<GameEvent> {
        self.initialize(self.level)
    }

    /// Advances to the next level; wraps back to level 1 past the last one
    /// (this variant's terminal policy).
    pub fn next_level(&mut self) -> Vec<GameEvent> {
        let next = self.level.next().unwrap_or(Level::FIRST);
        self.initialize(next)
    }

    /// Flips a card face up. Silent no-op while a resolution window is open,
    /// once the round is complete, or when the card is unknown, already
    /// face-up or matched. A flip is permanent for the turn; there is no
    /// deselect in this variant.
    pub fn flip_card(&mut self, card_id: &str) -> Vec<GameEvent> {
        if !self.turn.accepts_input() || self.flipped.len() >= 2 {
            return Vec::new();
        }
        let Some(card) = self.cards.iter_mut().find(|card| card.id == card_id) else {
            return Vec::new();
        };
        if card.is_flipped || card.is_matched {
            return Vec::new();
        }

        card.is_flipped = true;
        let card_id = card.id.clone();
        let pair_id = card.pair_id;
        self.flipped.push(card_id.clone());
        self.audio.play(SoundCue::Hit);

        let events = vec![GameEvent::CardFlipped { card_id }];

        if self.flipped.len() == 1 {
            self.turn.begin_turn();
            return events;
        }

        let first = self.flipped[0].clone();
        let second = self.flipped[1].clone();
        let first_pair = self.pair_of(&first).unwrap_or(pair_id);
        let rules = *self.turn.rules();
        if first_pair == pair_id {
            self.turn.schedule_resolution(
                MemoryResolution::Match { first, second },
                rules.match_delay_ms,
            );
        } else {
            self.turn.schedule_resolution(
                MemoryResolution::Mismatch { first, second },
                rules.mismatch_delay_ms,
            );
        }
        events
    }

    /// Applies the armed resolution for `generation`. A stale generation (the
    /// round was replaced after the timer was scheduled) is a silent no-op.
    pub fn resolve(&mut self, generation: u64) -> Vec<GameEvent> {
        let Some(action) = self.turn.take_due(generation) else {
            return Vec::new();
        };

        match action {
            MemoryResolution::Match { first, second } => {
                let pair_id = self.pair_of(&first).unwrap_or_default();
                for id in [&first, &second] {
                    if let Some(card) = self.cards.iter_mut().find(|card| &card.id == id) {
                        card.is_matched = true;
                    }
                }
                self.flipped.clear();
                let complete = self.turn.record_match();
                self.turn.finish_turn();
                self.audio.play(SoundCue::Success);

                if complete {
                    let delay = self.turn.rules().completion_delay_ms;
                    self.turn
                        .schedule_followup(MemoryResolution::Complete, delay);
                }
                vec![GameEvent::MatchFound { pair_id }]
            }
            MemoryResolution::Mismatch { first, second } => {
                for id in [&first, &second] {
                    if let Some(card) = self.cards.iter_mut().find(|card| &card.id == id) {
                        card.is_flipped = false;
                    }
                }
                self.flipped.clear();
                self.turn.finish_turn();
                vec![GameEvent::CardsReverted {
                    card_ids: vec![first, second],
                }]
            }
            MemoryResolution::Complete => {
                self.turn.mark_complete();
                self.audio.play(SoundCue::Celebration);
                vec![GameEvent::RoundCompleted { level: self.level }]
            }
        }
    }

    fn pair_of(&self, card_id: &str) -> Option<PairId> {
        self.cards
            .iter()
            .find(|card| card.id == card_id)
            .map(|card| card.pair_id)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::game::audio::test_support::RecordingSink;

    fn resolve_pending(game: &mut MemoryGame) -> Vec<GameEvent> {
        let (generation, _delay) = game.pending_timer().expect("a timer should be armed");
        game.resolve(generation)
    }

    #[test]
    fn mismatched_flips_revert_after_the_delay() {
        let mut game = MemoryGame::new();
        game.initialize(Level::One);

        // card-1-a (scientist) and card-2-a (robot) belong to different pairs.
        game.flip_card("card-1-a");
        game.flip_card("card-2-a");
        assert!(game.is_processing());
        assert_eq!(game.moves(), 1);
        assert_eq!(game.pending_timer().map(|(_, delay)| delay), Some(MISMATCH_DELAY_MS));

        resolve_pending(&mut game);
        assert_eq!(game.matched_pairs(), 0);
        assert!(!game.is_processing());
        assert!(game
            .cards()
            .iter()
            .all(|card| !card.is_flipped && !card.is_matched));
    }

    #[test]
    fn true_pair_stays_revealed_permanently() {
        let mut game = MemoryGame::new();
        game.initialize(Level::One);

        game.flip_card("card-1-a");
        game.flip_card("card-1-b");
        assert_eq!(game.pending_timer().map(|(_, delay)| delay), Some(MATCH_DELAY_MS));

        let events = resolve_pending(&mut game);
        assert!(matches!(events[0], GameEvent::MatchFound { pair_id: 1 }));
        assert_eq!(game.matched_pairs(), 1);
        assert_eq!(game.moves(), 1);

        let matched: Vec<_> = game
            .cards()
            .iter()
            .filter(|card| card.is_matched)
            .collect();
        assert_eq!(matched.len(), 2);
        assert!(matched.iter().all(|card| card.is_flipped), "matched implies flipped");
    }

    #[test]
    fn picks_during_a_resolution_window_are_no_ops() {
        let mut game = MemoryGame::new();
        game.initialize(Level::One);

        game.flip_card("card-1-a");
        game.flip_card("card-2-a");
        let before = game.snapshot();

        let events = game.flip_card("card-2-b");
        assert!(events.is_empty());
        let after = game.snapshot();
        assert_eq!(before.cards, after.cards);
        assert_eq!(before.moves, after.moves);
    }

    #[test]
    fn reflipping_a_face_up_card_is_a_no_op() {
        let mut game = MemoryGame::new();
        game.initialize(Level::One);

        game.flip_card("card-1-a");
        let events = game.flip_card("card-1-a");
        assert!(events.is_empty());
        assert_eq!(game.moves(), 1);
        assert!(!game.is_processing(), "still waiting for a second card");
    }

    #[test]
    fn completing_all_pairs_chains_into_round_completion() {
        let mut game = MemoryGame::new();
        game.initialize(Level::One);

        game.flip_card("card-1-a");
        game.flip_card("card-1-b");
        resolve_pending(&mut game);

        game.flip_card("card-2-a");
        game.flip_card("card-2-b");
        resolve_pending(&mut game);
        assert!(!game.game_complete(), "completion waits for the chained delay");
        assert_eq!(
            game.pending_timer().map(|(_, delay)| delay),
            Some(COMPLETION_DELAY_MS)
        );

        let events = resolve_pending(&mut game);
        assert!(matches!(events[0], GameEvent::RoundCompleted { .. }));
        assert!(game.game_complete());
        assert_eq!(game.matched_pairs(), 2);

        assert!(game.flip_card("card-1-a").is_empty(), "complete round rejects picks");
    }

    #[test]
    fn completion_triggers_exactly_once() {
        let mut game = MemoryGame::new();
        game.initialize(Level::One);

        game.flip_card("card-1-a");
        game.flip_card("card-1-b");
        resolve_pending(&mut game);
        game.flip_card("card-2-a");
        game.flip_card("card-2-b");
        resolve_pending(&mut game);

        let (generation, _) = game.pending_timer().expect("completion timer armed");
        assert_eq!(game.resolve(generation).len(), 1);
        assert!(game.resolve(generation).is_empty(), "second fire finds nothing");
    }

    #[test]
    fn stale_timer_cannot_touch_a_replaced_round() {
        let mut game = MemoryGame::new();
        game.initialize(Level::One);

        game.flip_card("card-1-a");
        game.flip_card("card-2-a");
        let (stale_generation, _) = game.pending_timer().expect("mismatch timer armed");

        game.restart();
        let events = game.resolve(stale_generation);
        assert!(events.is_empty());
        assert!(game.cards().iter().all(|card| !card.is_flipped));
        assert_eq!(game.moves(), 0);
    }

    #[test]
    fn restart_rebuilds_the_same_level_from_scratch() {
        let mut game = MemoryGame::new();
        game.initialize(Level::Two);

        game.flip_card("card-1-a");
        game.flip_card("card-1-b");
        resolve_pending(&mut game);
        assert_eq!(game.matched_pairs(), 1);

        game.restart();
        assert_eq!(game.level(), Level::Two);
        assert_eq!(game.matched_pairs(), 0);
        assert_eq!(game.moves(), 0);
        assert_eq!(game.cards().len(), 8);
        assert!(game.cards().iter().all(|card| !card.is_flipped));
    }

    #[test]
    fn next_level_advances_and_wraps_after_the_last() {
        let mut game = MemoryGame::new();
        game.initialize(Level::One);

        game.next_level();
        assert_eq!(game.level(), Level::Two);
        game.next_level();
        assert_eq!(game.level(), Level::Three);
        game.next_level();
        assert_eq!(game.level(), Level::One, "wraps back to the first level");
    }

    #[test]
    fn audio_cues_follow_flips_and_matches() {
        let cues = Rc::new(RefCell::new(Vec::new()));
        let mut game = MemoryGame::new();
        game.initialize(Level::One);
        game.audio_mut()
            .set_sink(Some(Box::new(RecordingSink(Rc::clone(&cues)))));

        game.flip_card("card-1-a");
        game.flip_card("card-1-b");
        resolve_pending(&mut game);

        assert_eq!(
            *cues.borrow(),
            vec![SoundCue::Hit, SoundCue::Hit, SoundCue::Success]
        );
    }

    #[test]
    fn muted_game_plays_nothing() {
        let cues = Rc::new(RefCell::new(Vec::new()));
        let mut game = MemoryGame::new();
        game.initialize(Level::One);
        game.audio_mut()
            .set_sink(Some(Box::new(RecordingSink(Rc::clone(&cues)))));
        game.audio_mut().set_muted(true);

        game.flip_card("card-1-a");
        game.flip_card("card-1-b");
        resolve_pending(&mut game);

        assert!(cues.borrow().is_empty());
        assert_eq!(game.matched_pairs(), 1, "mute never affects game state");
    }
}
