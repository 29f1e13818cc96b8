pub mod game;

use std::cell::RefCell;
use std::rc::Rc;
use std::str::FromStr;

use gloo_timers::future::TimeoutFuture;
use serde::Serialize;
use serde_wasm_bindgen::to_value;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::js_sys::Function;

pub use game::{
    AudioChannel, Card, Feedback, GameCard, GameEvent, GameMode, ImageKind, Level, MatchingGame,
    MatchingSnapshot, MemoryGame, MemorySnapshot, PairId, PlaybackError, ScreenPhase, Slot,
    SoundCue, SoundSink, TerminalPolicy, TurnEngine, TurnPhase, TurnRules,
};

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    set_panic_hook();
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

/// State + events bundle returned by every mutating operation, so the
/// frontend can update its store and react to transitions in one call.
#[derive(Serialize)]
struct EngineResolution<S: Serialize> {
    state: S,
    events: Vec<GameEvent>,
}

fn make_resolution<S: Serialize>(state: S, events: Vec<GameEvent>) -> Result<JsValue, JsValue> {
    to_value(&EngineResolution { state, events }).map_err(serde_to_js_error)
}

/// Forwards sound cues to a JS callback. A throwing callback is reported as a
/// playback error, which the engine swallows.
struct JsSoundSink {
    callback: Function,
}

impl SoundSink for JsSoundSink {
    fn play(&self, cue: SoundCue) -> Result<(), PlaybackError> {
        self.callback
            .call1(&JsValue::NULL, &JsValue::from_str(cue.as_str()))
            .map(|_| ())
            .map_err(|error| PlaybackError(format!("{error:?}")))
    }
}

type ChangeListener = Rc<RefCell<Option<Function>>>;

/// Invokes the subscriber with an already-built snapshot. No borrow is held
/// while the callback runs, so it may call straight back into the engine.
fn notify<S: Serialize>(snapshot: S, listener: &ChangeListener) {
    let callback = listener.borrow().clone();
    let Some(callback) = callback else {
        return;
    };
    if let Ok(value) = to_value(&snapshot) {
        let _ = callback.call1(&JsValue::NULL, &value);
    }
}

fn log_completion(events: &[GameEvent]) {
    if events
        .iter()
        .any(|event| matches!(event, GameEvent::RoundCompleted { .. }))
    {
        web_sys::console::log_1(&"Level complete!".into());
    }
}

/// Schedules the engine's armed resolution window as a fire-once deferred
/// callback, then keeps following chained timers (the post-completion delay)
/// until none is armed. The generation guard inside `resolve` makes a timer
/// that outlives its round a no-op.
fn arm_memory_timer(game: &Rc<RefCell<MemoryGame>>, listener: &ChangeListener) {
    let Some(first) = game.borrow().pending_timer() else {
        return;
    };
    let game = Rc::clone(game);
    let listener = Rc::clone(listener);
    spawn_local(async move {
        let mut next = Some(first);
        while let Some((generation, delay_ms)) = next.take() {
            TimeoutFuture::new(delay_ms).await;
            let events = game.borrow_mut().resolve(generation);
            if events.is_empty() {
                break;
            }
            log_completion(&events);
            let snapshot = game.borrow().snapshot();
            notify(snapshot, &listener);
            next = game.borrow().pending_timer();
        }
    });
}

fn arm_matching_timer(game: &Rc<RefCell<MatchingGame>>, listener: &ChangeListener) {
    let Some(first) = game.borrow().pending_timer() else {
        return;
    };
    let game = Rc::clone(game);
    let listener = Rc::clone(listener);
    spawn_local(async move {
        let mut next = Some(first);
        while let Some((generation, delay_ms)) = next.take() {
            TimeoutFuture::new(delay_ms).await;
            let events = game.borrow_mut().resolve(generation);
            if events.is_empty() {
                break;
            }
            log_completion(&events);
            let snapshot = game.borrow().snapshot();
            notify(snapshot, &listener);
            next = game.borrow().pending_timer();
        }
    });
}

/// Memory-flip engine exposed to the frontend. Presentation code reads
/// snapshots and calls operations; it never mutates state directly.
#[wasm_bindgen]
pub struct MemoryEngine {
    game: Rc<RefCell<MemoryGame>>,
    on_change: ChangeListener,
}

#[wasm_bindgen]
impl MemoryEngine {
    #[wasm_bindgen(constructor)]
    pub fn new() -> MemoryEngine {
        MemoryEngine {
            game: Rc::new(RefCell::new(MemoryGame::new())),
            on_change: Rc::new(RefCell::new(None)),
        }
    }

    /// Registers the subscriber called with a fresh snapshot after every
    /// state change, including changes applied by deferred timers.
    pub fn set_on_change(&self, callback: Option<Function>) {
        *self.on_change.borrow_mut() = callback;
    }

    pub fn set_sound_sink(&self, callback: Option<Function>) {
        let sink = callback.map(|callback| Box::new(JsSoundSink { callback }) as Box<dyn SoundSink>);
        self.game.borrow_mut().audio_mut().set_sink(sink);
    }

    pub fn toggle_mute(&self) -> bool {
        self.game.borrow_mut().audio_mut().toggle_mute()
    }

    pub fn set_muted(&self, muted: bool) {
        self.game.borrow_mut().audio_mut().set_muted(muted);
    }

    pub fn is_muted(&self) -> bool {
        self.game.borrow().is_muted()
    }

    pub fn state(&self) -> Result<JsValue, JsValue> {
        to_value(&self.snapshot()).map_err(serde_to_js_error)
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.snapshot()).map_err(serde_to_js_error)
    }

    pub fn initialize_game(&self, level: u8) -> Result<JsValue, JsValue> {
        let level = Level::try_from(level).map_err(serde_to_js_error)?;
        let events = self.game.borrow_mut().initialize(level);
        web_sys::console::log_1(
            &format!("Memory game initialized - Level {}", u8::from(level)).into(),
        );
        notify(self.snapshot(), &self.on_change);
        make_resolution(self.snapshot(), events)
    }

    pub fn flip_card(&self, card_id: &str) -> Result<JsValue, JsValue> {
        let events = self.game.borrow_mut().flip_card(card_id);
        if !events.is_empty() {
            arm_memory_timer(&self.game, &self.on_change);
            notify(self.snapshot(), &self.on_change);
        }
        make_resolution(self.snapshot(), events)
    }

    pub fn reset_game(&self) -> Result<JsValue, JsValue> {
        let events = self.game.borrow_mut().restart();
        notify(self.snapshot(), &self.on_change);
        make_resolution(self.snapshot(), events)
    }

    pub fn next_level(&self) -> Result<JsValue, JsValue> {
        let events = self.game.borrow_mut().next_level();
        notify(self.snapshot(), &self.on_change);
        make_resolution(self.snapshot(), events)
    }
}

impl MemoryEngine {
    /// Owned snapshot; the engine borrow ends before the caller hands it to a
    /// subscriber.
    fn snapshot(&self) -> MemorySnapshot {
        self.game.borrow().snapshot()
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Slot-matching engine plus its screen-flow session, exposed to the
/// frontend.
#[wasm_bindgen]
pub struct MatchingEngine {
    game: Rc<RefCell<MatchingGame>>,
    on_change: ChangeListener,
}

#[wasm_bindgen]
impl MatchingEngine {
    #[wasm_bindgen(constructor)]
    pub fn new() -> MatchingEngine {
        MatchingEngine {
            game: Rc::new(RefCell::new(MatchingGame::new())),
            on_change: Rc::new(RefCell::new(None)),
        }
    }

    pub fn set_on_change(&self, callback: Option<Function>) {
        *self.on_change.borrow_mut() = callback;
    }

    pub fn set_sound_sink(&self, callback: Option<Function>) {
        let sink = callback.map(|callback| Box::new(JsSoundSink { callback }) as Box<dyn SoundSink>);
        self.game.borrow_mut().audio_mut().set_sink(sink);
    }

    pub fn toggle_mute(&self) -> bool {
        self.game.borrow_mut().audio_mut().toggle_mute()
    }

    pub fn set_muted(&self, muted: bool) {
        self.game.borrow_mut().audio_mut().set_muted(muted);
    }

    pub fn is_muted(&self) -> bool {
        self.game.borrow().is_muted()
    }

    pub fn state(&self) -> Result<JsValue, JsValue> {
        to_value(&self.snapshot()).map_err(serde_to_js_error)
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.snapshot()).map_err(serde_to_js_error)
    }

    pub fn select_mode(&self, mode: &str) -> Result<JsValue, JsValue> {
        let mode = GameMode::from_str(mode).map_err(serde_to_js_error)?;
        self.game.borrow_mut().select_mode(mode);
        notify(self.snapshot(), &self.on_change);
        make_resolution(self.snapshot(), Vec::new())
    }

    pub fn select_level(&self, level: u8) -> Result<JsValue, JsValue> {
        let level = Level::try_from(level).map_err(serde_to_js_error)?;
        self.game.borrow_mut().select_level(level);
        notify(self.snapshot(), &self.on_change);
        make_resolution(self.snapshot(), Vec::new())
    }

    pub fn select_character(&self, character: &str) -> Result<JsValue, JsValue> {
        let character = ImageKind::from_str(character).map_err(serde_to_js_error)?;
        let events = self.game.borrow_mut().select_character(character);
        if events
            .iter()
            .any(|event| matches!(event, GameEvent::RoundInitialized { .. }))
        {
            let level = self.game.borrow().level();
            web_sys::console::log_1(
                &format!("Game initialized with level {}", u8::from(level)).into(),
            );
        }
        notify(self.snapshot(), &self.on_change);
        make_resolution(self.snapshot(), events)
    }

    pub fn select_card(&self, card_id: &str) -> Result<JsValue, JsValue> {
        let events = self.game.borrow_mut().select_card(card_id);
        if !events.is_empty() {
            notify(self.snapshot(), &self.on_change);
        }
        make_resolution(self.snapshot(), events)
    }

    pub fn place_card(&self, slot_id: &str) -> Result<JsValue, JsValue> {
        let events = self.game.borrow_mut().place_card(slot_id);
        if !events.is_empty() {
            arm_matching_timer(&self.game, &self.on_change);
            notify(self.snapshot(), &self.on_change);
        }
        make_resolution(self.snapshot(), events)
    }

    pub fn advance_level(&self) -> Result<JsValue, JsValue> {
        let events = self.game.borrow_mut().advance_level();
        notify(self.snapshot(), &self.on_change);
        make_resolution(self.snapshot(), events)
    }

    pub fn restart(&self) -> Result<JsValue, JsValue> {
        let events = self.game.borrow_mut().restart();
        notify(self.snapshot(), &self.on_change);
        make_resolution(self.snapshot(), events)
    }

    pub fn reset_to_start(&self) -> Result<JsValue, JsValue> {
        let events = self.game.borrow_mut().reset_to_start();
        notify(self.snapshot(), &self.on_change);
        make_resolution(self.snapshot(), events)
    }
}

impl MatchingEngine {
    /// Owned snapshot; the engine borrow ends before the caller hands it to a
    /// subscriber.
    fn snapshot(&self) -> MatchingSnapshot {
        self.game.borrow().snapshot()
    }
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Arabic display label for an image kind, for frontend debugging and
/// accessibility text.
#[wasm_bindgen(js_name = "imageLabel")]
pub fn image_label(kind: &str) -> Result<String, JsValue> {
    ImageKind::from_str(kind)
        .map(|kind| kind.arabic_label().to_string())
        .map_err(serde_to_js_error)
}

/// Builds a standalone shuffled memory deck, for frontend debugging.
#[wasm_bindgen(js_name = "createMemoryDeck")]
pub fn create_memory_deck(level: u8) -> Result<JsValue, JsValue> {
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    let level = Level::try_from(level).map_err(serde_to_js_error)?;
    let mut rng = SmallRng::from_entropy();
    let deck = game::deck::create_memory_deck(level, &mut rng);
    to_value(&deck).map_err(serde_to_js_error)
}

#[cfg(feature = "console_error_panic_hook")]
fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

#[cfg(not(feature = "console_error_panic_hook"))]
fn set_panic_hook() {}
