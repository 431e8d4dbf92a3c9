//! Character cooking: raw element codes plus modifier state to character codes.
//!
//! Raw codes follow the Linux input-event numbering (KEY_A = 30 and so on),
//! which is also what the synthetic source uses on every platform. Only a
//! US layout is cooked here; codes with no mapping cook to
//! [`COOKED_UNMAPPED`] so consumers can still see the raw transition.

use crate::event::COOKED_UNMAPPED;
use crate::state::ModifierState;

/// Raw code of the interrupt key (KEY_C); Ctrl plus this key triggers an
/// out-of-band console interrupt notification.
pub const INTERRUPT_CODE: u16 = 46;

/// Whether this transition is the Ctrl+interrupt-key combination.
pub fn is_interrupt_combo(code: u16, pressed: bool, modifiers: &ModifierState) -> bool {
    pressed && code == INTERRUPT_CODE && modifiers.ctrl()
}

/// Map a raw element code to a cooked character code under the given
/// modifier state. Returns [`COOKED_UNMAPPED`] when no mapping exists.
pub fn cook(code: u16, modifiers: &ModifierState) -> i32 {
    if let Some(ch) = letter(code) {
        // Shift and Caps Lock cancel each other for letters.
        let upper = modifiers.shift() != modifiers.caps_lock();
        return if upper {
            ch.to_ascii_uppercase() as i32
        } else {
            ch as i32
        };
    }

    if let Some((plain, shifted)) = symbol(code) {
        return if modifiers.shift() {
            shifted as i32
        } else {
            plain as i32
        };
    }

    match code {
        1 => 0x1B,  // KEY_ESC
        14 => 0x08, // KEY_BACKSPACE
        15 => b'\t' as i32,
        28 => b'\n' as i32, // KEY_ENTER
        57 => b' ' as i32,  // KEY_SPACE
        _ => COOKED_UNMAPPED,
    }
}

/// Letter rows (KEY_Q..KEY_P, KEY_A..KEY_L, KEY_Z..KEY_M).
fn letter(code: u16) -> Option<char> {
    let ch = match code {
        16 => 'q',
        17 => 'w',
        18 => 'e',
        19 => 'r',
        20 => 't',
        21 => 'y',
        22 => 'u',
        23 => 'i',
        24 => 'o',
        25 => 'p',
        30 => 'a',
        31 => 's',
        32 => 'd',
        33 => 'f',
        34 => 'g',
        35 => 'h',
        36 => 'j',
        37 => 'k',
        38 => 'l',
        44 => 'z',
        45 => 'x',
        46 => 'c',
        47 => 'v',
        48 => 'b',
        49 => 'n',
        50 => 'm',
        _ => return None,
    };
    Some(ch)
}

/// Digit row and punctuation, as (plain, shifted) pairs.
fn symbol(code: u16) -> Option<(char, char)> {
    let pair = match code {
        2 => ('1', '!'),
        3 => ('2', '@'),
        4 => ('3', '#'),
        5 => ('4', '$'),
        6 => ('5', '%'),
        7 => ('6', '^'),
        8 => ('7', '&'),
        9 => ('8', '*'),
        10 => ('9', '('),
        11 => ('0', ')'),
        12 => ('-', '_'),
        13 => ('=', '+'),
        26 => ('[', '{'),
        27 => (']', '}'),
        39 => (';', ':'),
        40 => ('\'', '"'),
        41 => ('`', '~'),
        43 => ('\\', '|'),
        51 => (',', '<'),
        52 => ('.', '>'),
        53 => ('/', '?'),
        _ => return None,
    };
    Some(pair)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{MASK_CAPS_LOCK, MASK_CTRL, MASK_SHIFT};

    #[test]
    fn test_cook_letters() {
        let mut mods = ModifierState::new();
        assert_eq!(cook(30, &mods), 'a' as i32);

        mods.set(MASK_SHIFT);
        assert_eq!(cook(30, &mods), 'A' as i32);
    }

    #[test]
    fn test_caps_lock_cancels_shift_for_letters() {
        let mut mods = ModifierState::new();
        mods.set(MASK_CAPS_LOCK);
        assert_eq!(cook(30, &mods), 'A' as i32);

        mods.set(MASK_SHIFT);
        assert_eq!(cook(30, &mods), 'a' as i32);
    }

    #[test]
    fn test_cook_digits_and_symbols() {
        let mut mods = ModifierState::new();
        assert_eq!(cook(2, &mods), '1' as i32);
        assert_eq!(cook(53, &mods), '/' as i32);

        mods.set(MASK_SHIFT);
        assert_eq!(cook(2, &mods), '!' as i32);
        assert_eq!(cook(53, &mods), '?' as i32);
    }

    #[test]
    fn test_cook_unmapped() {
        let mods = ModifierState::new();
        assert_eq!(cook(200, &mods), COOKED_UNMAPPED);
    }

    #[test]
    fn test_interrupt_combo() {
        let mut mods = ModifierState::new();
        assert!(!is_interrupt_combo(INTERRUPT_CODE, true, &mods));

        mods.set(MASK_CTRL);
        assert!(is_interrupt_combo(INTERRUPT_CODE, true, &mods));
        assert!(!is_interrupt_combo(INTERRUPT_CODE, false, &mods));
        assert!(!is_interrupt_combo(30, true, &mods));
    }
}
