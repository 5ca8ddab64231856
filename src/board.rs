use crate::audio::{NoTimers, WebAudio, WebTimers};
use crate::core::{AudioSession, EffectKind, SessionStatus, SoundConfig, TimerHost};
use crate::{dom, events};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;

/// JS-facing handle to the page's audio session. Clones share the session.
#[wasm_bindgen]
#[derive(Clone)]
pub struct SoundBoard {
    session: Rc<RefCell<AudioSession<WebAudio>>>,
}

impl SoundBoard {
    pub fn play(&self, kind: EffectKind) {
        self.session.borrow_mut().play_effect(kind);
    }

    /// Observe a pending resume settling after `activate` has returned.
    pub fn on_status_change(&self, listener: impl Fn(SessionStatus) + 'static) {
        self.session.borrow().on_status_change(listener);
    }
}

#[wasm_bindgen]
impl SoundBoard {
    #[wasm_bindgen(constructor)]
    pub fn new() -> SoundBoard {
        let timers: Rc<dyn TimerHost> = match WebTimers::new() {
            Some(t) => Rc::new(t),
            None => {
                log::warn!("no window; ambient melody disabled");
                Rc::new(NoTimers)
            }
        };
        SoundBoard {
            session: Rc::new(RefCell::new(AudioSession::new(SoundConfig::default(), timers))),
        }
    }

    /// Open audio output. Call from a click/tap handler only.
    pub fn activate(&self) {
        self.session.borrow_mut().activate(WebAudio::open);
    }

    #[wasm_bindgen(js_name = toggleMute)]
    pub fn toggle_mute(&self) {
        self.session.borrow_mut().toggle_mute();
    }

    /// Play the named effect; unknown names are logged and ignored.
    #[wasm_bindgen(js_name = playEffect)]
    pub fn play_effect(&self, kind: &str) {
        match kind.parse::<EffectKind>() {
            Ok(k) => self.play(k),
            Err(e) => log::warn!("{}", e),
        }
    }

    pub fn teardown(&self) {
        self.session.borrow_mut().teardown();
    }

    #[wasm_bindgen(getter, js_name = isReady)]
    pub fn is_ready(&self) -> bool {
        self.session.borrow().is_ready()
    }

    #[wasm_bindgen(getter, js_name = isMuted)]
    pub fn is_muted(&self) -> bool {
        self.session.borrow().is_muted()
    }

    /// Hook the board into the page: first gesture activates, `#sound-toggle`
    /// mutes, `data-sfx` / `data-sfx-hover` elements trigger effects.
    #[wasm_bindgen(js_name = attachToDocument)]
    pub fn attach_to_document(&self) -> Result<(), JsValue> {
        let document = dom::window_document().ok_or_else(|| JsValue::from_str("no document"))?;
        events::wire_activation(&document, self);
        events::wire_sound_toggle(&document, self);
        events::wire_effect_triggers(&document, self);
        Ok(())
    }
}

impl Default for SoundBoard {
    fn default() -> Self {
        Self::new()
    }
}
