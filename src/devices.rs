use std::sync::Arc;

use hashbrown::HashMap;
use once_cell::sync::Lazy;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{
    definitions::{display, keyboard},
    KeyError,
};

#[cfg_attr(test, mockall::automock)]
/// The traits responsible for the display based code
pub trait DisplayCommands {
    /// Will clear the display
    fn clear_display(&mut self);
    /// Will display all from the pixels
    fn display(&mut self, screen: &Screen);
}

#[cfg_attr(test, mockall::automock)]
/// The trait responsible for reading the host keyboard
pub trait KeyboardCommands {
    /// A snapshot of all the logical keys, indexed `0x0-0xF`.
    fn get_keyboard(&self) -> [bool; keyboard::SIZE];
}

/// The graphics of the Chip 8 are black and white and the screen has a total of `2048` pixels
/// `(64 x 32)`. The pixels are stored row-major, so a pixel lives at `y * 64 + x`.
#[derive(Clone, PartialEq, Eq)]
pub struct Screen {
    pixels: Box<[bool; display::RESOLUTION]>,
}

impl Default for Screen {
    fn default() -> Self {
        Self {
            pixels: Box::new([false; display::RESOLUTION]),
        }
    }
}

impl std::fmt::Debug for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Screen")
            .field("lit", &self.pixels.iter().filter(|&&p| p).count())
            .finish()
    }
}

impl Screen {
    pub fn new() -> Self {
        Screen::default()
    }

    /// All pixels in row-major order.
    pub fn pixels(&self) -> &[bool] {
        &self.pixels[..]
    }

    /// Iterates over the rows from top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[bool]> {
        self.pixels.chunks(display::WIDTH)
    }

    /// Will return the state of the pixel, the coordinates wrap around the screen edges.
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.pixels[Self::index(x, y)]
    }

    pub fn clear(&mut self) {
        self.pixels.iter_mut().for_each(|pixel| *pixel = false);
    }

    /// Flips the pixel and reports if a lit pixel was turned off.
    pub fn toggle(&mut self, x: usize, y: usize) -> bool {
        let pixel = &mut self.pixels[Self::index(x, y)];
        let collision = *pixel;
        *pixel = !*pixel;
        collision
    }

    fn index(x: usize, y: usize) -> usize {
        (y % display::HEIGHT) * display::WIDTH + (x % display::WIDTH)
    }
}

/// Input is done with a hex keyboard that has 16 keys ranging `0-F`. The `8`, `4`, `6`, and
/// `2` keys are typically used for directional input. Three opcodes are used to detect input.
/// One skips an instruction if a specific key is pressed, while another does the same if a
/// specific key is not pressed. The third waits for a key press, and then stores it in one of
/// the data registers.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keyboard {
    keys: [bool; keyboard::SIZE],
}

impl Keyboard {
    pub fn new() -> Self {
        Keyboard::default()
    }

    pub fn release_all(&mut self) {
        self.keys = [false; keyboard::SIZE];
    }

    pub fn set_key(&mut self, key: usize, to: bool) -> Result<(), KeyError> {
        let slot = self.keys.get_mut(key).ok_or(KeyError::OutOfRange(key))?;
        *slot = to;
        Ok(())
    }

    pub fn set_keys(&mut self, keys: &[bool; keyboard::SIZE]) {
        self.keys = *keys;
    }

    pub fn get_keys(&self) -> &[bool; keyboard::SIZE] {
        &self.keys
    }

    /// Keys outside of the keypad are never pressed.
    pub fn is_pressed(&self, key: usize) -> bool {
        self.keys.get(key).copied().unwrap_or(false)
    }

    /// The lowest pressed key.
    pub fn first_pressed(&self) -> Option<usize> {
        self.keys.iter().position(|&pressed| pressed)
    }
}

/// A keyboard that can be written by an input thread while the
/// runner reads it.
#[derive(Debug, Clone, Default)]
pub struct SharedKeyboard {
    keyboard: Arc<RwLock<Keyboard>>,
}

impl SharedKeyboard {
    pub fn new() -> Self {
        Default::default()
    }

    fn get_keyboard_read(&self) -> RwLockReadGuard<'_, Keyboard> {
        self.keyboard.read()
    }

    fn get_keyboard_write(&self) -> RwLockWriteGuard<'_, Keyboard> {
        self.keyboard.write()
    }

    pub fn set_key(&self, key: usize, to: bool) -> Result<(), KeyError> {
        self.get_keyboard_write().set_key(key, to)
    }

    /// Sets the key bound to the given host character, returns false if
    /// the character is not bound.
    pub fn set_host_key(&self, key: char, to: bool) -> bool {
        match map_key(key) {
            Some(index) => self.set_key(index, to).is_ok(),
            None => false,
        }
    }

    pub fn release_all(&self) {
        self.get_keyboard_write().release_all();
    }
}

impl KeyboardCommands for SharedKeyboard {
    fn get_keyboard(&self) -> [bool; keyboard::SIZE] {
        *self.get_keyboard_read().get_keys()
    }
}

/// Maps a host key onto the hex keypad using the
/// [`QWERTY_LAYOUT`](crate::definitions::keyboard::QWERTY_LAYOUT).
pub fn map_key(key: char) -> Option<usize> {
    /// maps the external keyboard layout to the internaly given.
    static LAYOUT_MAP: Lazy<HashMap<char, usize>> = Lazy::new(|| {
        let mut map = HashMap::new();

        for (host_row, chip_row) in keyboard::QWERTY_LAYOUT
            .iter()
            .zip(keyboard::LAYOUT.iter())
        {
            for (&host, &chip) in host_row.iter().zip(chip_row.iter()) {
                map.insert(host, chip);
            }
        }

        map
    });

    LAYOUT_MAP.get(&key.to_ascii_lowercase()).copied()
}
