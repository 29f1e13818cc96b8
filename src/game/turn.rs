//! The two-step selection / resolution state machine shared by both game
//! variants. The variants differ only in their resolution predicate and
//! commit target; everything here — the selection phases, the processing
//! lock, the deferred-resolution descriptor and its generation guard, the
//! round counters — is common and configured through [`TurnRules`].

/// What happens when a round finishes on the last level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalPolicy {
    /// Start over at level 1 with a fresh deck.
    WrapToFirstLevel,
    /// Leave the round and return to the top-level mode selection.
    ReturnToMenu,
}

/// Per-variant policy: timing constants, pair total and selection behavior.
#[derive(Debug, Clone, Copy)]
pub struct TurnRules {
    pub total_pairs: usize,
    pub match_delay_ms: u32,
    pub mismatch_delay_ms: u32,
    pub completion_delay_ms: u32,
    /// Re-picking the buffered item clears the buffer instead of being a
    /// no-op. Slot matching allows this; a memory flip is permanent.
    pub allow_deselect: bool,
    /// Whether first picks tick the move counter. Only the memory variant
    /// surfaces a move count; slot matching keeps it at zero.
    pub count_moves: bool,
    pub terminal: TerminalPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    OneSelected,
    Resolving,
}

#[derive(Debug, Clone)]
struct Pending<A> {
    generation: u64,
    delay_ms: u32,
    action: A,
}

/// Round-scoped state machine. A deferred action scheduled here carries the
/// round generation at scheduling time; `take_due` refuses to hand it back
/// once the round has been replaced, so a late-firing timer can never corrupt
/// a newer round.
#[derive(Debug, Clone)]
pub struct TurnEngine<A> {
    rules: TurnRules,
    phase: TurnPhase,
    generation: u64,
    matched_pairs: usize,
    moves: u32,
    complete: bool,
    pending: Option<Pending<A>>,
}

impl<A> TurnEngine<A> {
    pub fn new(rules: TurnRules) -> Self {
        Self {
            rules,
            phase: TurnPhase::Idle,
            generation: 0,
            matched_pairs: 0,
            moves: 0,
            complete: false,
            pending: None,
        }
    }

    pub fn rules(&self) -> &TurnRules {
        &self.rules
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn matched_pairs(&self) -> usize {
        self.matched_pairs
    }

    pub fn moves(&self) -> u32 {
        self.moves
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// True while a resolution window is open. New picks are gated on this,
    /// not on disabling individual items.
    pub fn is_processing(&self) -> bool {
        self.phase == TurnPhase::Resolving
    }

    pub fn accepts_input(&self) -> bool {
        !self.is_processing() && !self.complete
    }

    /// First pick of a two-step turn. When the variant counts moves, the
    /// counter increments here, never on the second pick.
    pub fn begin_turn(&mut self) {
        self.phase = TurnPhase::OneSelected;
        if self.rules.count_moves {
            self.moves += 1;
        }
    }

    /// Deselect: drops the single buffered pick without counting anything
    /// back down.
    pub fn clear_selection(&mut self) {
        self.phase = TurnPhase::Idle;
    }

    /// Arms the resolution window for a completed two-step selection and
    /// closes input until it runs.
    pub fn schedule_resolution(&mut self, action: A, delay_ms: u32) {
        self.phase = TurnPhase::Resolving;
        self.pending = Some(Pending {
            generation: self.generation,
            delay_ms,
            action,
        });
    }

    /// Arms a chained timer (the post-completion delay) without holding the
    /// processing lock.
    pub fn schedule_followup(&mut self, action: A, delay_ms: u32) {
        self.pending = Some(Pending {
            generation: self.generation,
            delay_ms,
            action,
        });
    }

    /// Generation and delay of the armed timer, if any. The driver schedules
    /// a fire-once callback from this and passes the generation back into
    /// `take_due`.
    pub fn pending_timer(&self) -> Option<(u64, u32)> {
        self.pending
            .as_ref()
            .map(|pending| (pending.generation, pending.delay_ms))
    }

    /// Hands back the armed action if `generation` still names the current
    /// round. Stale timers get `None` and must not touch state.
    pub fn take_due(&mut self, generation: u64) -> Option<A> {
        if self.pending.as_ref()?.generation != generation
            || generation != self.generation
        {
            return None;
        }
        self.pending.take().map(|pending| pending.action)
    }

    /// Closes the resolution window and returns to `Idle`.
    pub fn finish_turn(&mut self) {
        self.phase = TurnPhase::Idle;
    }

    /// Counts a resolved pair; true exactly when the round total is reached.
    pub fn record_match(&mut self) -> bool {
        self.matched_pairs += 1;
        self.matched_pairs == self.rules.total_pairs
    }

    pub fn mark_complete(&mut self) {
        self.complete = true;
    }

    /// Replaces the round: bumps the generation, drops any armed timer and
    /// zeroes every counter.
    pub fn reset_round(&mut self, total_pairs: usize) {
        self.generation = self.generation.wrapping_add(1);
        self.rules.total_pairs = total_pairs;
        self.phase = TurnPhase::Idle;
        self.matched_pairs = 0;
        self.moves = 0;
        self.complete = false;
        self.pending = None;
    }
}
