use rand::seq::SliceRandom;
use rand::Rng;

use super::state::{Card, GameCard, ImageKind, Level, PairId, Slot};

/// The six concept pairs of the memory-flip variant, in fixed order. Level N
/// uses the first `pair_count` entries; pairing assignments are data, never
/// computed.
pub const PAIR_TABLE: [(ImageKind, ImageKind); 6] = [
    (ImageKind::Scientist, ImageKind::Microscope),
    (ImageKind::Robot, ImageKind::Gear),
    (ImageKind::Lock, ImageKind::Key),
    (ImageKind::Shield, ImageKind::Knight),
    (ImageKind::Girl, ImageKind::Earth),
    (ImageKind::Cloud, ImageKind::Rainbow),
];

/// Kinds selectable as player characters in the slot-matching flow.
pub const CHARACTER_KINDS: [ImageKind; 6] = [
    ImageKind::Robot,
    ImageKind::Scientist,
    ImageKind::Girl,
    ImageKind::Lock,
    ImageKind::Earth,
    ImageKind::Cloud,
];

/// Kind set for a slot-matching level. Distinct kinds are reused across
/// levels; the sets are fixed data.
pub fn kinds_for_level(level: Level) -> &'static [ImageKind] {
    match level {
        Level::One => &[ImageKind::Robot, ImageKind::Girl],
        Level::Two => &[
            ImageKind::Robot,
            ImageKind::Scientist,
            ImageKind::Girl,
            ImageKind::Lock,
        ],
        Level::Three => &[
            ImageKind::Robot,
            ImageKind::Scientist,
            ImageKind::Girl,
            ImageKind::Lock,
            ImageKind::Earth,
            ImageKind::Cloud,
        ],
    }
}

/// Builds the shuffled memory deck for a level: two cards per pair, ids
/// assigned before the shuffle so `card-{n}-a` / `card-{n}-b` are stable
/// across runs.
pub fn create_memory_deck<R: Rng>(level: Level, rng: &mut R) -> Vec<Card> {
    let pair_count = level.pair_count();
    let mut cards = Vec::with_capacity(pair_count * 2);

    for (index, (first, second)) in PAIR_TABLE.iter().take(pair_count).enumerate() {
        let pair_id = (index + 1) as PairId;
        cards.push(Card {
            id: format!("card-{pair_id}-a"),
            image_kind: *first,
            pair_id,
            is_flipped: false,
            is_matched: false,
        });
        cards.push(Card {
            id: format!("card-{pair_id}-b"),
            image_kind: *second,
            pair_id,
            is_flipped: false,
            is_matched: false,
        });
    }

    cards.shuffle(rng);
    cards
}

/// Builds the shuffled card pool for a slot-matching level, one card per
/// target kind.
pub fn create_matching_cards<R: Rng>(level: Level, rng: &mut R) -> Vec<GameCard> {
    let mut cards: Vec<GameCard> = kinds_for_level(level)
        .iter()
        .enumerate()
        .map(|(index, kind)| GameCard {
            id: format!("card-{index}"),
            image_kind: *kind,
            position: index,
        })
        .collect();

    cards.shuffle(rng);
    cards
}

/// Builds the slot row for a level. Slot order is stable; only the card pool
/// is randomized.
pub fn create_slots(level: Level) -> Vec<Slot> {
    kinds_for_level(level)
        .iter()
        .enumerate()
        .map(|(index, kind)| Slot {
            id: format!("slot-{index}"),
            expected_image_kind: *kind,
            placed_card: None,
            is_correct: false,
        })
        .collect()
}
