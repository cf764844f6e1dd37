//! Color conversion between 0–255 triples and the renderer's unit range
//!
//! The render surface expects colors as three floats in [-1, 1] while
//! experiment configs describe them as familiar 0–255 triples. The
//! conversion is linear and rounded to two decimals, so middle grey (128)
//! lands on 0.0 only after rounding (128/127.5 - 1 = 0.0039...). That
//! asymmetry is part of the contract; downstream stimulus code depends on
//! the rounded values.

/// Convert a 0–255 color triple to the renderer's [-1, 1] unit range.
///
/// Each channel maps as `v / 127.5 - 1`, rounded to two decimals.
pub fn color_triple_to_unit_range(color: [u8; 3]) -> [f64; 3] {
    [
        channel_to_unit(color[0]),
        channel_to_unit(color[1]),
        channel_to_unit(color[2]),
    ]
}

fn channel_to_unit(v: u8) -> f64 {
    let unit = f64::from(v) / 127.5 - 1.0;
    (unit * 100.0).round() / 100.0
}

/// Pick a readable text color for the given unit-range background.
///
/// Bright backgrounds (every channel >= 0.5) get black text, everything
/// else gets white. Both device adapters use this when the caller does not
/// supply an explicit text color.
pub fn contrast_text_color(bg: [f64; 3]) -> [f64; 3] {
    if bg.iter().all(|&c| c >= 0.5) {
        [-1.0, -1.0, -1.0]
    } else {
        [1.0, 1.0, 1.0]
    }
}
