/// The definitions

pub mod memory {
    /// The size of the chipset ram
    pub const SIZE: usize = 0x1000; // 4096

    /// Every address bearing field of an opcode is 12 bits wide.
    pub const ADDRESS_MASK: usize = SIZE - 1;

    /// opcode information
    pub mod opcodes {
        /// The step used for calculating the program counter increments
        pub const SIZE: usize = 2;
    }
}

/// The definitions for the cpu
pub mod cpu {
    /// The starting point for the program
    pub const PROGRAM_COUNTER: usize = 0x0200;

    /// The definitions needed for the register
    pub mod register {
        /// The size of the chip set registers
        pub const SIZE: usize = 16;
        /// The last entry of the registers, doubles as the flag register `VF`
        pub const LAST: usize = SIZE - 1;
    }

    /// The stack definitions
    pub mod stack {
        /// The count of nesting entries
        pub const SIZE: usize = 16;
    }
}

/// The largest rom that fits behind the program start.
pub const MAX_PROGRAM_SIZE: usize = memory::SIZE - cpu::PROGRAM_COUNTER;

/// The timer definitions
pub mod timer {
    /// The amount of hertz the clocks run at
    pub const HERTZ: u64 = 60;
    /// The interval of a single timer tick in milliseconds
    pub const INTERVAL: u64 = 1000 / HERTZ;
}

/// The host frame definitions
pub mod runner {
    /// How many instructions are run per host frame.
    pub const CYCLES_PER_FRAME: usize = 10;
}

/// The display definitions
pub mod display {
    /// The amount of pixels per row
    pub const WIDTH: usize = 64;
    /// The amount of rows
    pub const HEIGHT: usize = 32;
    /// The amount of pixels the display has
    pub const RESOLUTION: usize = WIDTH * HEIGHT;
    /// The width of a sprite row in pixels
    pub const SPRITE_WIDTH: usize = 8;

    /// The fontset information
    pub mod fontset {
        /// Is the location of the beginning to the font in memory
        pub const LOCATION: usize = 0x50;
        /// The amount of bytes a single glyph takes up
        pub const GLYPH_SIZE: usize = 5;
        /// The font set character to be rendered on the screen
        pub const FONTSET: [u8; 80] = [
            0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
            0x20, 0x60, 0x20, 0x20, 0x70, // 1
            0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
            0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
            0x90, 0x90, 0xF0, 0x10, 0x10, // 4
            0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
            0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
            0xF0, 0x10, 0x20, 0x40, 0x40, // 7
            0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
            0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
            0xF0, 0x90, 0xF0, 0x90, 0x90, // A
            0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
            0xF0, 0x80, 0x80, 0x80, 0xF0, // C
            0xE0, 0x90, 0x90, 0x90, 0xE0, // D
            0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
            0xF0, 0x80, 0xF0, 0x80, 0x80, // F
        ];
    }
}

/// The definitions needed for correct keyboard definitions.
pub mod keyboard {
    /// all the different keyboard entries
    pub const SIZE: usize = 16;
    /// The keyboard layout requested by the chipset
    pub const LAYOUT: [[usize; 4]; 4] = [
        [0x1, 0x2, 0x3, 0xC],
        [0x4, 0x5, 0x6, 0xD],
        [0x7, 0x8, 0x9, 0xE],
        [0xA, 0x0, 0xB, 0xF],
    ];
    /// The host keys laid over [`LAYOUT`](LAYOUT), cell by cell.
    pub const QWERTY_LAYOUT: [[char; 4]; 4] = [
        ['1', '2', '3', '4'],
        ['q', 'w', 'e', 'r'],
        ['a', 's', 'd', 'f'],
        ['z', 'x', 'c', 'v'],
    ];
}
