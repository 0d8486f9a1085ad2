pub const GREEN: &str = "\x1b[32m";
pub const INVERT_CYAN: &str = "\x1b[97;46m";
pub const INVERT_YELLOW: &str = "\x1b[30;43m";
pub const RESET: &str = "\x1b[0m";

pub const CLEAR_SCREEN: &str = "\x1b[H\x1b[J";
pub const CURSOR_HOME: &str = "\x1b[0;0H";

pub const KNOB_LINES: usize = 5;
pub const BUTTON_LINES: usize = 4;

// Pointer positions, left to right: 0-12%, 13-37%, 38-62%, 63-87%, 88-100%.
pub const KNOB_ART: [[&str; KNOB_LINES]; 5] = [
    [r" ~~~~~ ", r":     :", r":---- :", r":     :", r" ~~~~~ "],
    [r" ~~~~~ ", r": \   :", r":  \  :", r":   ` :", r" ~~~~~ "],
    [r" ~~~~~ ", r":  |  :", r":  |  :", r":  `  :", r" ~~~~~ "],
    [r" ~~~~~ ", r":   / :", r":  /  :", r": '   :", r" ~~~~~ "],
    [r" ~~~~~ ", r":     :", r": ----:", r":     :", r" ~~~~~ "],
];

// Indexed by `pressed as usize`.
pub const BUTTON_ART: [[&str; BUTTON_LINES]; 2] = [
    ["...... ", ":`+---+", ": |   |", " `+---+"],
    ["+---+  ", "|:::|: ", "+---+: ", " `---` "],
];

/// Names for MIDI notes 24..=83; index with `note - NOTE_NAME_BASE`.
pub const NOTE_NAME_BASE: u8 = 24;
pub const NOTE_NAMES: [&str; 60] = [
    "C0", "C#0", "D0", "D#0", "E0", "F0", "F#0", "G0", "G#0", "A0", "A#0", "B0", //
    "C1", "C#1", "D1", "D#1", "E1", "F1", "F#1", "G1", "G#1", "A1", "A#1", "B1", //
    "C2", "C#2", "D2", "D#2", "E2", "F2", "F#2", "G2", "G#2", "A2", "A#2", "B2", //
    "C3", "C#3", "D3", "D#3", "E3", "F3", "F#3", "G3", "G#3", "A3", "A#3", "B3", //
    "C4", "C#4", "D4", "D#4", "E4", "F4", "F#4", "G4", "G#4", "A4", "A#4", "B4", //
];
