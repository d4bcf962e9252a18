//! Property-based test generators using proptest.
//!
//! Provides strategies for generating response orders, message patterns and
//! payloads the way a controller would send them.

use pixsync_protocol::{Command, GuiState, ImageBuffer};
use proptest::prelude::*;

/// Strategy for generating every command exactly once, in random order.
pub fn response_order_strategy() -> impl Strategy<Value = Vec<Command>> {
    Just(Command::ALL.to_vec()).prop_shuffle()
}

/// Strategy for generating message patterns no command uses.
pub fn unknown_pattern_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][A-Z_]{0,23}")
        .expect("Invalid regex")
        .prop_filter("Pattern must not name a command", |p| {
            Command::parse(p).is_none()
        })
}

/// Strategy for generating UI-state entries.
pub fn gui_state_strategy() -> impl Strategy<Value = GuiState> {
    prop::collection::vec(
        (
            prop::string::string_regex("[A-Z][A-Z_]{0,15}").expect("Invalid regex"),
            0u32..100,
        ),
        0..12,
    )
    .prop_map(|entries| {
        GuiState(
            entries
                .into_iter()
                .map(|(key, value)| format!("{key} {value}"))
                .collect(),
        )
    })
}

/// Strategy for generating image buffers of `outputs` and `visuals`
/// buffers, each of `pixels` pixels.
pub fn image_buffer_strategy(
    outputs: usize,
    visuals: usize,
    pixels: usize,
) -> impl Strategy<Value = ImageBuffer> {
    let buffer = prop::collection::vec(any::<u32>(), pixels);
    (
        prop::collection::vec(buffer.clone(), outputs),
        prop::collection::vec(buffer, visuals),
    )
        .prop_map(|(output_buffers, visual_buffers)| ImageBuffer {
            output_buffers,
            visual_buffers,
        })
}
