//! Procedural sound for the oracle site: synthesized UI effects and a
//! generative ambient bed, all built from oscillators and noise.
//!
//! `core` is platform independent and carries all the logic. The WebAudio
//! backend, DOM wiring and the exported `SoundBoard` only exist on wasm32.

pub mod core;

#[cfg(target_arch = "wasm32")]
mod audio;
#[cfg(target_arch = "wasm32")]
mod board;
#[cfg(target_arch = "wasm32")]
mod dom;
#[cfg(target_arch = "wasm32")]
mod events;

#[cfg(target_arch = "wasm32")]
pub use board::SoundBoard;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();
    log::info!("oracle-sound loaded");
    Ok(())
}

/// Build a board and attach it to the current document in one call.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(js_name = installSoundBoard)]
pub fn install_sound_board() -> Result<SoundBoard, JsValue> {
    let board = SoundBoard::new();
    init(&board).map_err(|e| {
        log::error!("init error: {:?}", e);
        JsValue::from_str(&e.to_string())
    })?;
    Ok(board)
}

#[cfg(target_arch = "wasm32")]
fn init(board: &SoundBoard) -> anyhow::Result<()> {
    let window = web_sys::window().ok_or_else(|| anyhow::anyhow!("no window"))?;
    window
        .document()
        .ok_or_else(|| anyhow::anyhow!("no document"))?;
    board
        .attach_to_document()
        .map_err(|e| anyhow::anyhow!("{:?}", e))
}
