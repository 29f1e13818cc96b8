//! Slot-matching variant: a shuffled pool of single cards and a stable row of
//! labeled slots. A selection is held, committed into a slot, and checked
//! against the slot's expected kind; mismatches return to the pool after the
//! feedback window. Also owns the surrounding screen flow (mode, level and
//! character selection) of this variant.

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;

use super::audio::AudioChannel;
use super::deck::{create_matching_cards, create_slots, kinds_for_level, CHARACTER_KINDS};
use super::state::{
    Feedback, GameCard, GameEvent, GameMode, ImageKind, Level, ScreenPhase, Slot, SoundCue,
};
use super::turn::{TerminalPolicy, TurnEngine, TurnRules};

pub const FEEDBACK_DELAY_MS: u32 = 800;
pub const COMPLETION_DELAY_MS: u32 = 500;

#[derive(Debug, Clone)]
enum MatchingResolution {
    ClearFeedback { complete: bool },
    ReturnCard { card_id: String },
    Complete,
}

/// Read-only snapshot handed to the presentation layer. Field names follow
/// the frontend store shape.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingSnapshot {
    pub phase: ScreenPhase,
    pub game_mode: Option<GameMode>,
    pub level: Level,
    pub player1_character: Option<ImageKind>,
    pub player2_character: Option<ImageKind>,
    pub shuffled_cards: Vec<GameCard>,
    pub slots: Vec<Slot>,
    pub selected_card: Option<GameCard>,
    pub matches_found: usize,
    pub feedback: Option<Feedback>,
    pub feedback_slot_id: Option<String>,
    pub is_processing: bool,
}

pub struct MatchingGame {
    phase: ScreenPhase,
    game_mode: Option<GameMode>,
    level: Level,
    player1_character: Option<ImageKind>,
    player2_character: Option<ImageKind>,
    cards: Vec<GameCard>,
    slots: Vec<Slot>,
    selected: Option<String>,
    feedback: Option<Feedback>,
    feedback_slot_id: Option<String>,
    turn: TurnEngine<MatchingResolution>,
    rng: SmallRng,
    audio: AudioChannel,
}

fn rules_for(level: Level) -> TurnRules {
    TurnRules {
        total_pairs: level.pair_count(),
        match_delay_ms: FEEDBACK_DELAY_MS,
        mismatch_delay_ms: FEEDBACK_DELAY_MS,
        completion_delay_ms: COMPLETION_DELAY_MS,
        allow_deselect: true,
        count_moves: false,
        terminal: TerminalPolicy::ReturnToMenu,
    }
}

impl Default for MatchingGame {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchingGame {
    pub fn new() -> Self {
        Self {
            phase: ScreenPhase::ModeSelection,
            game_mode: None,
            level: Level::FIRST,
            player1_character: None,
            player2_character: None,
            cards: Vec::new(),
            slots: Vec::new(),
            selected: None,
            feedback: None,
            feedback_slot_id: None,
            turn: TurnEngine::new(rules_for(Level::FIRST)),
            rng: SmallRng::from_entropy(),
            audio: AudioChannel::new(),
        }
    }

    pub fn phase(&self) -> ScreenPhase {
        self.phase
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn game_mode(&self) -> Option<GameMode> {
        self.game_mode
    }

    pub fn player1_character(&self) -> Option<ImageKind> {
        self.player1_character
    }

    pub fn player2_character(&self) -> Option<ImageKind> {
        self.player2_character
    }

    pub fn cards(&self) -> &[GameCard] {
        &self.cards
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn selected_card_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn feedback(&self) -> Option<Feedback> {
        self.feedback
    }

    pub fn matches_found(&self) -> usize {
        self.turn.matched_pairs()
    }

    pub fn is_processing(&self) -> bool {
        self.turn.is_processing()
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

    pub fn snapshot(&self) -> MatchingSnapshot {
        let selected_card = self
            .selected
            .as_deref()
            .and_then(|id| self.cards.iter().find(|card| card.id == id))
            .cloned();
        MatchingSnapshot {
            phase: self.phase,
            game_mode: self.game_mode,
            level: self.level,
            player1_character: self.player1_character,
            player2_character: self.player2_character,
            shuffled_cards: self.cards.clone(),
            slots: self.slots.clone(),
            selected_card,
            matches_found: self.turn.matched_pairs(),
            feedback: self.feedback,
            feedback_slot_id: self.feedback_slot_id.clone(),
            is_processing: self.turn.is_processing(),
        }
    }

    pub fn select_mode(&mut self, mode: GameMode) {
        if self.phase != ScreenPhase::ModeSelection {
            return;
        }
        self.game_mode = Some(mode);
        self.phase = ScreenPhase::LevelSelection;
    }

    pub fn select_level(&mut self, level: Level) {
        if self.phase != ScreenPhase::LevelSelection {
            return;
        }
        self.level = level;
        self.phase = ScreenPhase::CharacterSelection;
    }

    /// First pick sets player 1. In single mode player 2 is drawn at random
    /// from the remaining kinds and the round starts; in two-player mode the
    /// second pick must differ from the first. Kinds outside the playable
    /// roster are silent no-ops.
    pub fn select_character(&mut self, character: ImageKind) -> Vec<GameEvent> {
        if self.phase != ScreenPhase::CharacterSelection {
            return Vec::new();
        }
        if !CHARACTER_KINDS.contains(&character) {
            return Vec::new();
        }
        match self.player1_character {
            None => {
                self.player1_character = Some(character);
                if self.game_mode == Some(GameMode::Single) {
                    let others: Vec<ImageKind> = CHARACTER_KINDS
                        .iter()
                        .copied()
                        .filter(|kind| *kind != character)
                        .collect();
                    self.player2_character = others.choose(&mut self.rng).copied();
                    return self.initialize_round();
                }
                Vec::new()
            }
            Some(player1) => {
                if character == player1 {
                    return Vec::new();
                }
                self.player2_character = Some(character);
                self.initialize_round()
            }
        }
    }

    /// Replaces the round wholesale for the current level: fresh shuffled
    /// pool, pristine slots, zeroed counters.
    pub fn initialize_round(&mut self) -> Vec<GameEvent> {
        self.cards = create_matching_cards(self.level, &mut self.rng);
        self.slots = create_slots(self.level);
        self.selected = None;
        self.feedback = None;
        self.feedback_slot_id = None;
        self.turn.reset_round(kinds_for_level(self.level).len());
        self.phase = ScreenPhase::Playing;
        vec![GameEvent::RoundInitialized { level: self.level }]
    }

    /// Holds a card from the pool. Re-picking the held card deselects it;
    /// picking another card moves the hold. Placed cards and picks during a
    /// feedback window are silent no-ops.
    pub fn select_card(&mut self, card_id: &str) -> Vec<GameEvent> {
        if self.phase != ScreenPhase::Playing || !self.turn.accepts_input() {
            return Vec::new();
        }
        if !self.cards.iter().any(|card| card.id == card_id) {
            return Vec::new();
        }
        let placed = self.slots.iter().any(|slot| {
            slot.placed_card
                .as_ref()
                .is_some_and(|card| card.id == card_id)
        });
        if placed {
            return Vec::new();
        }

        if self.selected.as_deref() == Some(card_id) {
            if self.turn.rules().allow_deselect {
                self.selected = None;
                self.turn.clear_selection();
                return vec![GameEvent::CardDeselected {
                    card_id: card_id.to_string(),
                }];
            }
            return Vec::new();
        }

        if self.selected.is_none() {
            self.turn.begin_turn();
        }
        self.selected = Some(card_id.to_string());
        self.audio.play(SoundCue::Hit);
        vec![GameEvent::CardSelected {
            card_id: card_id.to_string(),
        }]
    }

    /// Commits the held card into a slot. The commit is immediate on a
    /// correct kind; either way a feedback window opens and further input is
    /// rejected until it elapses.
    pub fn place_card(&mut self, slot_id: &str) -> Vec<GameEvent> {
        if self.phase != ScreenPhase::Playing || !self.turn.accepts_input() {
            return Vec::new();
        }
        let Some(card_id) = self.selected.clone() else {
            return Vec::new();
        };
        let Some(card) = self
            .cards
            .iter()
            .find(|card| card.id == card_id)
            .cloned()
        else {
            return Vec::new();
        };
        let Some(slot) = self.slots.iter_mut().find(|slot| slot.id == slot_id) else {
            return Vec::new();
        };
        if slot.is_filled() {
            return Vec::new();
        }

        let correct = slot.expected_image_kind == card.image_kind;
        let rules = *self.turn.rules();
        self.feedback_slot_id = Some(slot.id.clone());

        if correct {
            slot.placed_card = Some(card.clone());
            slot.is_correct = true;
            self.selected = None;
            self.feedback = Some(Feedback::Correct);
            let complete = self.turn.record_match();
            self.turn.schedule_resolution(
                MatchingResolution::ClearFeedback { complete },
                rules.match_delay_ms,
            );
            self.audio.play(SoundCue::Success);
        } else {
            self.feedback = Some(Feedback::Incorrect);
            self.turn.schedule_resolution(
                MatchingResolution::ReturnCard {
                    card_id: card_id.clone(),
                },
                rules.mismatch_delay_ms,
            );
            self.audio.play(SoundCue::Hit);
        }

        vec![GameEvent::CardPlaced {
            slot_id: slot_id.to_string(),
            card_id,
            correct,
        }]
    }

    /// Applies the armed resolution for `generation`. A stale generation (the
    /// round was replaced after the timer was scheduled) is a silent no-op.
    pub fn resolve(&mut self, generation: u64) -> Vec<GameEvent> {
        let Some(action) = self.turn.take_due(generation) else {
            return Vec::new();
        };

        match action {
            MatchingResolution::ClearFeedback { complete } => {
                self.feedback = None;
                self.feedback_slot_id = None;
                self.turn.finish_turn();
                if complete {
                    let delay = self.turn.rules().completion_delay_ms;
                    self.turn
                        .schedule_followup(MatchingResolution::Complete, delay);
                }
                vec![GameEvent::FeedbackCleared]
            }
            MatchingResolution::ReturnCard { card_id } => {
                self.feedback = None;
                self.feedback_slot_id = None;
                self.selected = None;
                self.turn.finish_turn();
                vec![GameEvent::CardReturned { card_id }]
            }
            MatchingResolution::Complete => {
                self.turn.mark_complete();
                self.phase = ScreenPhase::GameOver;
                self.audio.play(SoundCue::Success);
                vec![GameEvent::RoundCompleted { level: self.level }]
            }
        }
    }

    /// Next level with fresh cards, or — past the last level — the terminal
    /// policy of this variant: back to mode selection.
    pub fn advance_level(&mut self) -> Vec<GameEvent> {
        if !matches!(self.phase, ScreenPhase::Playing | ScreenPhase::GameOver) {
            return Vec::new();
        }
        match self.level.next() {
            Some(next) => {
                self.level = next;
                self.initialize_round()
            }
            None => match self.turn.rules().terminal {
                TerminalPolicy::ReturnToMenu => self.reset_to_start(),
                TerminalPolicy::WrapToFirstLevel => {
                    self.level = Level::FIRST;
                    self.initialize_round()
                }
            },
        }
    }

    /// Same level, new shuffle; level, mode and characters are untouched.
    pub fn restart(&mut self) -> Vec<GameEvent> {
        if !matches!(self.phase, ScreenPhase::Playing | ScreenPhase::GameOver) {
            return Vec::new();
        }
        self.initialize_round()
    }

    /// Clears the whole session back to the initial pre-game phase.
    pub fn reset_to_start(&mut self) -> Vec<GameEvent> {
        self.phase = ScreenPhase::ModeSelection;
        self.game_mode = None;
        self.level = Level::FIRST;
        self.player1_character = None;
        self.player2_character = None;
        self.cards.clear();
        self.slots.clear();
        self.selected = None;
        self.feedback = None;
        self.feedback_slot_id = None;
        self.turn.reset_round(Level::FIRST.pair_count());
        vec![GameEvent::SessionReset]
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::game::audio::test_support::RecordingSink;

    fn start_round(level: Level) -> MatchingGame {
        let mut game = MatchingGame::new();
        game.select_mode(GameMode::Single);
        game.select_level(level);
        game.select_character(ImageKind::Cloud);
        assert_eq!(game.phase(), ScreenPhase::Playing);
        game
    }

    fn card_id_for(game: &MatchingGame, kind: ImageKind) -> String {
        game.cards()
            .iter()
            .find(|card| card.image_kind == kind)
            .map(|card| card.id.clone())
            .expect("card for kind should exist")
    }

    fn slot_id_for(game: &MatchingGame, kind: ImageKind) -> String {
        game.slots()
            .iter()
            .find(|slot| slot.expected_image_kind == kind)
            .map(|slot| slot.id.clone())
            .expect("slot for kind should exist")
    }

    fn resolve_pending(game: &mut MatchingGame) -> Vec<GameEvent> {
        let (generation, _delay) = game.pending_timer().expect("a timer should be armed");
        game.resolve(generation)
    }

    fn place_correctly(game: &mut MatchingGame, kind: ImageKind) {
        let card_id = card_id_for(game, kind);
        let slot_id = slot_id_for(game, kind);
        game.select_card(&card_id);
        game.place_card(&slot_id);
        resolve_pending(game);
    }

    #[test]
    fn two_player_flow_reaches_playing() {
        let mut game = MatchingGame::new();
        game.select_mode(GameMode::TwoPlayer);
        assert_eq!(game.phase(), ScreenPhase::LevelSelection);
        game.select_level(Level::Two);
        assert_eq!(game.phase(), ScreenPhase::CharacterSelection);

        game.select_character(ImageKind::Robot);
        assert_eq!(game.phase(), ScreenPhase::CharacterSelection);
        assert!(game.select_character(ImageKind::Robot).is_empty(), "same pick twice");

        game.select_character(ImageKind::Girl);
        assert_eq!(game.phase(), ScreenPhase::Playing);
        assert_eq!(game.player2_character(), Some(ImageKind::Girl));
        assert_eq!(game.cards().len(), 4);
        assert_eq!(game.slots().len(), 4);
    }

    #[test]
    fn single_mode_draws_a_distinct_partner() {
        let mut game = MatchingGame::new();
        game.select_mode(GameMode::Single);
        game.select_level(Level::One);
        game.select_character(ImageKind::Girl);

        assert_eq!(game.phase(), ScreenPhase::Playing);
        let partner = game.player2_character().expect("partner should be drawn");
        assert_ne!(partner, ImageKind::Girl);
    }

    #[test]
    fn non_roster_character_pick_is_a_no_op() {
        let mut game = MatchingGame::new();
        game.select_mode(GameMode::Single);
        game.select_level(Level::One);

        assert!(game.select_character(ImageKind::Rainbow).is_empty());
        assert_eq!(game.phase(), ScreenPhase::CharacterSelection);
        assert_eq!(game.player1_character(), None);

        game.select_character(ImageKind::Robot);
        assert_eq!(game.phase(), ScreenPhase::Playing);
        assert_eq!(game.player1_character(), Some(ImageKind::Robot));
    }

    #[test]
    fn screen_flow_operations_out_of_phase_are_no_ops() {
        let mut game = MatchingGame::new();
        assert!(game.select_character(ImageKind::Robot).is_empty());
        game.select_level(Level::Three);
        assert_eq!(game.phase(), ScreenPhase::ModeSelection);
        assert_eq!(game.level(), Level::One);
        assert!(game.restart().is_empty(), "no round exists yet");
    }

    #[test]
    fn repicking_the_held_card_deselects_it() {
        let mut game = start_round(Level::One);
        let card_id = card_id_for(&game, ImageKind::Robot);

        game.select_card(&card_id);
        assert_eq!(game.selected_card_id(), Some(card_id.as_str()));

        let events = game.select_card(&card_id);
        assert!(matches!(events[0], GameEvent::CardDeselected { .. }));
        assert_eq!(game.selected_card_id(), None);
    }

    #[test]
    fn picking_another_card_moves_the_hold() {
        let mut game = start_round(Level::One);
        let robot = card_id_for(&game, ImageKind::Robot);
        let girl = card_id_for(&game, ImageKind::Girl);

        game.select_card(&robot);
        game.select_card(&girl);
        assert_eq!(game.selected_card_id(), Some(girl.as_str()));
    }

    #[test]
    fn wrong_placement_shows_feedback_and_returns_the_card() {
        let mut game = start_round(Level::Two);
        let robot = card_id_for(&game, ImageKind::Robot);
        let lock_slot = slot_id_for(&game, ImageKind::Lock);

        game.select_card(&robot);
        let events = game.place_card(&lock_slot);
        assert!(matches!(events[0], GameEvent::CardPlaced { correct: false, .. }));
        assert_eq!(game.feedback(), Some(Feedback::Incorrect));
        assert!(game.is_processing());
        assert_eq!(
            game.pending_timer().map(|(_, delay)| delay),
            Some(FEEDBACK_DELAY_MS)
        );

        resolve_pending(&mut game);
        assert_eq!(game.feedback(), None);
        assert_eq!(game.selected_card_id(), None, "card returned to the pool");
        assert!(game.slots().iter().all(|slot| !slot.is_filled()));
        assert_eq!(game.matches_found(), 0);
    }

    #[test]
    fn correct_placement_commits_immediately_and_is_write_once() {
        let mut game = start_round(Level::One);
        let robot = card_id_for(&game, ImageKind::Robot);
        let girl = card_id_for(&game, ImageKind::Girl);
        let robot_slot = slot_id_for(&game, ImageKind::Robot);

        game.select_card(&robot);
        game.place_card(&robot_slot);

        let slot = game
            .slots()
            .iter()
            .find(|slot| slot.id == robot_slot)
            .expect("slot exists");
        assert!(slot.is_correct);
        assert_eq!(
            slot.placed_card.as_ref().map(|card| card.image_kind),
            Some(ImageKind::Robot)
        );
        assert_eq!(game.matches_found(), 1);
        resolve_pending(&mut game);

        // The filled slot never accepts another card.
        game.select_card(&girl);
        assert!(game.place_card(&robot_slot).is_empty());
        assert_eq!(game.matches_found(), 1);
    }

    #[test]
    fn input_is_gated_while_feedback_is_pending() {
        let mut game = start_round(Level::Two);
        let robot = card_id_for(&game, ImageKind::Robot);
        let girl = card_id_for(&game, ImageKind::Girl);
        let lock_slot = slot_id_for(&game, ImageKind::Lock);

        game.select_card(&robot);
        game.place_card(&lock_slot);
        assert!(game.is_processing());

        assert!(game.select_card(&girl).is_empty());
        assert!(game.place_card(&lock_slot).is_empty());
    }

    #[test]
    fn completing_the_round_chains_into_game_over() {
        let mut game = start_round(Level::One);

        place_correctly(&mut game, ImageKind::Robot);
        assert_eq!(game.phase(), ScreenPhase::Playing);

        let girl = card_id_for(&game, ImageKind::Girl);
        let girl_slot = slot_id_for(&game, ImageKind::Girl);
        game.select_card(&girl);
        game.place_card(&girl_slot);
        resolve_pending(&mut game);

        assert_eq!(game.phase(), ScreenPhase::Playing, "completion waits for the chained delay");
        assert_eq!(
            game.pending_timer().map(|(_, delay)| delay),
            Some(COMPLETION_DELAY_MS)
        );

        let events = resolve_pending(&mut game);
        assert!(matches!(events[0], GameEvent::RoundCompleted { .. }));
        assert_eq!(game.phase(), ScreenPhase::GameOver);
        assert_eq!(game.matches_found(), 2);
    }

    #[test]
    fn advance_level_keeps_characters_and_regenerates() {
        let mut game = start_round(Level::One);
        let player1 = game.player1_character();

        game.advance_level();
        assert_eq!(game.level(), Level::Two);
        assert_eq!(game.phase(), ScreenPhase::Playing);
        assert_eq!(game.player1_character(), player1);
        assert_eq!(game.cards().len(), 4);
        assert_eq!(game.matches_found(), 0);
    }

    #[test]
    fn advancing_past_the_last_level_returns_to_mode_selection() {
        let mut game = start_round(Level::Three);

        for kind in kinds_for_level(Level::Three).to_vec() {
            place_correctly(&mut game, kind);
        }
        resolve_pending(&mut game);
        assert_eq!(game.phase(), ScreenPhase::GameOver);

        let events = game.advance_level();
        assert!(matches!(events[0], GameEvent::SessionReset));
        assert_eq!(game.phase(), ScreenPhase::ModeSelection);
        assert_eq!(game.level(), Level::One);
        assert_eq!(game.game_mode(), None);
        assert_eq!(game.player1_character(), None);
        assert!(game.cards().is_empty() && game.slots().is_empty());
    }

    #[test]
    fn restart_reshuffles_the_same_level() {
        let mut game = start_round(Level::Two);
        place_correctly(&mut game, ImageKind::Robot);
        assert_eq!(game.matches_found(), 1);

        game.restart();
        assert_eq!(game.level(), Level::Two);
        assert_eq!(game.phase(), ScreenPhase::Playing);
        assert_eq!(game.matches_found(), 0);
        assert!(game.slots().iter().all(|slot| !slot.is_filled()));
    }

    #[test]
    fn stale_timer_cannot_touch_a_replaced_round() {
        let mut game = start_round(Level::Two);
        let robot = card_id_for(&game, ImageKind::Robot);
        let lock_slot = slot_id_for(&game, ImageKind::Lock);

        game.select_card(&robot);
        game.place_card(&lock_slot);
        let (stale_generation, _) = game.pending_timer().expect("feedback timer armed");

        game.restart();
        assert!(game.resolve(stale_generation).is_empty());
        assert_eq!(game.feedback(), None);
        assert!(!game.is_processing());
    }

    #[test]
    fn audio_cues_follow_selections_and_placements() {
        let cues = Rc::new(RefCell::new(Vec::new()));
        let mut game = start_round(Level::One);
        game.audio_mut()
            .set_sink(Some(Box::new(RecordingSink(Rc::clone(&cues)))));

        let robot = card_id_for(&game, ImageKind::Robot);
        let girl_slot = slot_id_for(&game, ImageKind::Girl);
        let robot_slot = slot_id_for(&game, ImageKind::Robot);

        game.select_card(&robot);
        game.place_card(&girl_slot);
        resolve_pending(&mut game);
        game.select_card(&robot);
        game.place_card(&robot_slot);

        assert_eq!(
            *cues.borrow(),
            vec![
                SoundCue::Hit,
                SoundCue::Hit,
                SoundCue::Hit,
                SoundCue::Success
            ]
        );
    }
}
