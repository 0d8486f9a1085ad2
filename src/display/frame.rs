use super::art::{
    BUTTON_ART, BUTTON_LINES, GREEN, INVERT_CYAN, INVERT_YELLOW, KNOB_ART, KNOB_LINES,
    NOTE_NAMES, NOTE_NAME_BASE, RESET,
};
use super::{ControlState, LogBuffer};

pub const LOG_WINDOW: usize = 9;
const KNOB_PERCENT: f32 = 655.35;
const KNOB_BUCKET_PERCENT: f32 = 25.0;

pub fn knob_bucket(value: f32) -> usize {
    ((value / KNOB_PERCENT / KNOB_BUCKET_PERCENT + 0.5) as usize).min(KNOB_ART.len() - 1)
}

pub fn knob_glyph(value: f32) -> [&'static str; KNOB_LINES] {
    KNOB_ART[knob_bucket(value)]
}

pub fn button_glyph(pressed: bool) -> [&'static str; BUTTON_LINES] {
    BUTTON_ART[pressed as usize]
}

pub fn note_name(note: u8) -> &'static str {
    note.checked_sub(NOTE_NAME_BASE)
        .and_then(|index| NOTE_NAMES.get(index as usize))
        .copied()
        .unwrap_or("--")
}

pub fn transpose_label(transpose: i32) -> String {
    if transpose == 0 {
        "----".to_string()
    } else {
        format!("up {transpose}")
    }
}

/// The newest `LOG_WINDOW` log lines, oldest first, blank rows on top.
pub fn log_window(log: &LogBuffer) -> [String; LOG_WINDOW] {
    let visible: Vec<&str> = log.tail(LOG_WINDOW).collect();
    let blank_rows = LOG_WINDOW - visible.len();
    std::array::from_fn(|row| {
        let text = row
            .checked_sub(blank_rows)
            .map(|index| visible[index])
            .unwrap_or("");
        format!("{INVERT_YELLOW}{text:<20.20}{RESET}")
    })
}

/// Formats one full status frame. Pure; the caller positions the cursor.
pub fn render_frame(state: &ControlState, log: &LogBuffer) -> String {
    let nte = format!("{GREEN}{:^5}{RESET}", note_name(state.note));
    let tmp = format!("{GREEN}{:^5}{RESET}", state.tempo);
    let arpeggio__ = format!("{INVERT_CYAN}{:^12.12}{RESET}", state.arpeggio);
    let transpose_ = format!(
        "{INVERT_CYAN}{:^12.12}{RESET}",
        transpose_label(state.transpose)
    );
    let [ka0__, ka1__, ka2__, ka3__, ka4__] = knob_glyph(state.knob1);
    let [kb0__, kb1__, kb2__, kb3__, kb4__] = knob_glyph(state.knob2);
    let [ba0__, ba1__, ba2__, ba3__] = button_glyph(state.button1_on);
    let [bb0__, bb1__, bb2__, bb3__] = button_glyph(state.button2_on);
    let [
        log0______________,
        log1______________,
        log2______________,
        log3______________,
        log4______________,
        log5______________,
        log6______________,
        log7______________,
        log8______________,
    ] = log_window(log);

    // Placeholder names are as wide as the text they render to.
    format!(
        r"+------------------------------------------------------------------+.
|`.                                                                  `.
|  `+------------------------------------------------------------------+
|   |  █████  ██████  ██████   ____ _   _ _  _ ___ _  _ ██████████████ |
|   | ██   ██ ██   ██ ██   ██  [__   \_/  |\ |  |  |__| ████████████   |
|   | ███████ ██████  ██████   ___|   |   | \|  |  |  | ██████████     |
|   | ██   ██ ██   ██ ██                        ____________________   |
|   | ██   ██ ██   ██ ██       ███████████████ [{log0______________}]  |
|   |   _____    _____     ____________        [{log1______________}]  |
|   |  ({nte})  ({tmp})   [{arpeggio__}]       [{log2______________}]  |
|   |   ‾‾‾‾‾    ‾‾‾‾‾    [{transpose_}]       [{log3______________}]  |
|   |   ♪NOTE    TEMPO     ‾‾‾‾‾‾‾‾‾‾‾‾        [{log4______________}]  |
|   |  {ka0__}  {kb0__}   ARPG     TRNS        [{log5______________}]  |
|   |  {ka1__}  {kb1__}  {ba0__}  {bb0__}      [{log6______________}]  |
|   |  {ka2__}  {kb2__}  {ba1__}  {bb1__}      [{log7______________}]  |
+   |  {ka3__}  {kb3__}  {ba2__}  {bb2__}      [{log8______________}]  |
 `. |  {ka4__}  {kb4__}  {ba3__}  {bb3__}       ‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾‾   |
   `+------------------------------------------------------------------+"
    )
}
