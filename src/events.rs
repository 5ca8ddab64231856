use crate::board::SoundBoard;
use crate::core::{is_hover_entry, EffectKind};
use crate::dom;
use web_sys as web;

pub const SOUND_TOGGLE_ID: &str = "sound-toggle";
pub const MUTED_CLASS: &str = "muted";
pub const SFX_ATTR: &str = "data-sfx";
pub const SFX_HOVER_ATTR: &str = "data-sfx-hover";

// Browsers only allow audio to start inside a gesture, so the first
// pointer or key press opens the session; later presses are no-ops
pub fn wire_activation(document: &web::Document, board: &SoundBoard) {
    for event in ["pointerdown", "keydown"] {
        let board = board.clone();
        let doc = document.clone();
        dom::add_document_listener(document, event, move |ev| {
            // The toggle button activates on its own click
            if board.is_ready() || dom::event_within(ev, &format!("#{}", SOUND_TOGGLE_ID)) {
                return;
            }
            board.activate();
            sync_toggle(&doc, &board);
        });
    }
}

pub fn wire_sound_toggle(document: &web::Document, board: &SoundBoard) {
    let toggle_board = board.clone();
    let doc = document.clone();
    dom::add_click_listener(document, SOUND_TOGGLE_ID, move || {
        if toggle_board.is_ready() {
            toggle_board.toggle_mute();
        } else {
            toggle_board.activate();
        }
        sync_toggle(&doc, &toggle_board);
    });
    let status_doc = document.clone();
    board.on_status_change(move |status| {
        dom::set_class(&status_doc, SOUND_TOGGLE_ID, MUTED_CLASS, status.muted);
    });
    sync_toggle(document, board);
}

pub fn wire_effect_triggers(document: &web::Document, board: &SoundBoard) {
    let click_board = board.clone();
    dom::add_document_listener(document, "click", move |ev| {
        if let Some(name) = dom::closest_attribute(ev, SFX_ATTR) {
            play_named(&click_board, &name);
        }
    });

    let hover_board = board.clone();
    dom::add_document_listener(document, "pointerover", move |ev| {
        // pointerover bubbles from every child; play once per entry
        let (over, from) = dom::pointer_anchors(ev, SFX_HOVER_ATTR);
        if is_hover_entry(over.as_ref(), from.as_ref()) {
            hover_board.play(EffectKind::Hover);
        }
    });
}

fn play_named(board: &SoundBoard, name: &str) {
    match name.parse::<EffectKind>() {
        Ok(kind) => board.play(kind),
        Err(e) => log::warn!("{}", e),
    }
}

fn sync_toggle(document: &web::Document, board: &SoundBoard) {
    dom::set_class(document, SOUND_TOGGLE_ID, MUTED_CLASS, board.is_muted());
}
