//! CEC user-control code table
//!
//! Maps the operand of a `<User Control Pressed>` frame to a key name.

/// Name reported for codes missing from the table
pub const UNKNOWN_KEY: &str = "unknown";

/// Look up the key name for a user-control code
pub fn key_name(code: u8) -> &'static str {
    match code {
        0x00 => "SELECT",
        0x01 => "UP",
        0x02 => "DOWN",
        0x03 => "LEFT",
        0x04 => "RIGHT",
        0x05 => "RIGHT_UP",
        0x06 => "RIGHT_DOWN",
        0x07 => "LEFT_UP",
        0x08 => "LEFT_DOWN",
        0x09 => "ROOT_MENU",
        0x0A => "SETUP_MENU",
        0x0B => "CONTENTS_MENU",
        0x0C => "FAVORITE_MENU",
        0x0D => "EXIT",
        0x10 => "TOP_MENU",
        0x11 => "DVD_MENU",
        0x1D => "NUMBER_ENTRY_MODE",
        0x1E => "NUMBER_11",
        0x1F => "NUMBER_12",
        0x20 => "NUMBER_0",
        0x21 => "NUMBER_1",
        0x22 => "NUMBER_2",
        0x23 => "NUMBER_3",
        0x24 => "NUMBER_4",
        0x25 => "NUMBER_5",
        0x26 => "NUMBER_6",
        0x27 => "NUMBER_7",
        0x28 => "NUMBER_8",
        0x29 => "NUMBER_9",
        0x2A => "DOT",
        0x2B => "ENTER",
        0x2C => "CLEAR",
        0x2F => "NEXT_FAVORITE",
        0x30 => "CHANNEL_UP",
        0x31 => "CHANNEL_DOWN",
        0x32 => "PREVIOUS_CHANNEL",
        0x33 => "SOUND_SELECT",
        0x34 => "INPUT_SELECT",
        0x35 => "DISPLAY_INFORMATION",
        0x36 => "HELP",
        0x37 => "PAGE_UP",
        0x38 => "PAGE_DOWN",
        0x40 => "POWER",
        0x41 => "VOLUME_UP",
        0x42 => "VOLUME_DOWN",
        0x43 => "MUTE",
        0x44 => "PLAY",
        0x45 => "STOP",
        0x46 => "PAUSE",
        0x47 => "RECORD",
        0x48 => "REWIND",
        0x49 => "FAST_FORWARD",
        0x4A => "EJECT",
        0x4B => "FORWARD",
        0x4C => "BACKWARD",
        0x4D => "STOP_RECORD",
        0x4E => "PAUSE_RECORD",
        0x50 => "ANGLE",
        0x51 => "SUB_PICTURE",
        0x52 => "VIDEO_ON_DEMAND",
        0x53 => "ELECTRONIC_PROGRAM_GUIDE",
        0x54 => "TIMER_PROGRAMMING",
        0x55 => "INITIAL_CONFIGURATION",
        0x56 => "SELECT_BROADCAST_TYPE",
        0x57 => "SELECT_SOUND_PRESENTATION",
        0x60 => "PLAY_FUNCTION",
        0x61 => "PAUSE_PLAY_FUNCTION",
        0x62 => "RECORD_FUNCTION",
        0x63 => "PAUSE_RECORD_FUNCTION",
        0x64 => "STOP_FUNCTION",
        0x65 => "MUTE_FUNCTION",
        0x66 => "RESTORE_VOLUME_FUNCTION",
        0x67 => "TUNE_FUNCTION",
        0x68 => "SELECT_MEDIA_FUNCTION",
        0x69 => "SELECT_AV_INPUT_FUNCTION",
        0x6A => "SELECT_AUDIO_INPUT_FUNCTION",
        0x6B => "POWER_TOGGLE_FUNCTION",
        0x6C => "POWER_OFF_FUNCTION",
        0x6D => "POWER_ON_FUNCTION",
        0x71 => "F1_BLUE",
        0x72 => "F2_RED",
        0x73 => "F3_GREEN",
        0x74 => "F4_YELLOW",
        0x75 => "F5",
        0x76 => "DATA",
        _ => UNKNOWN_KEY,
    }
}
