use std::convert::TryFrom;

use rand::RngCore;
use tinyvec::ArrayVec;

use crate::{
    definitions::{cpu, display, keyboard, memory, MAX_PROGRAM_SIZE},
    devices::{Keyboard, Screen},
    opcode::{self, Instruction, Opcode, Operation},
    timer::Timer,
    KeyError, LoadError, OpcodeError, ProcessError, StackError,
};

/// Decides who counts the timers down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCadence {
    /// The host calls [`Machine::tick_timers`](Machine::tick_timers) at 60Hz,
    /// [`Machine::step`](Machine::step) never touches the timers.
    Host,
    /// Both timers count down once at the end of every executed instruction.
    Instruction,
}

impl Default for TimerCadence {
    fn default() -> Self {
        TimerCadence::Host
    }
}

/// Decides what happens to opcodes outside of the instruction set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownOpcodes {
    /// Unknown opcodes are logged and stepped over, `5XYN` and `9XYN` ignore
    /// their low nibble.
    Skip,
    /// Unknown opcodes are fatal and halt the machine.
    Halt,
}

impl Default for UnknownOpcodes {
    fn default() -> Self {
        UnknownOpcodes::Skip
    }
}

/// The tunables of a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MachineConfig {
    pub timer_cadence: TimerCadence,
    pub unknown_opcodes: UnknownOpcodes,
}

/// The execution state of the machine between two steps.
#[derive(Debug, Clone, PartialEq)]
pub enum RunState {
    /// The next step will fetch and execute an instruction.
    Running,
    /// A `FX0A` is repeated until a key is pressed, the key will be stored in
    /// the given register.
    AwaitingKey { register: usize },
    /// A fatal error occurred, nothing will be executed until the machine is
    /// initialized again.
    Halted(ProcessError),
}

impl Default for RunState {
    fn default() -> Self {
        RunState::Running
    }
}

/// The Machine struct represents the current state
/// of the system, it contains all the structures
/// needed for emulating an instant on the
/// Chip8 CPU.
pub struct Machine {
    pub(super) config: MachineConfig,
    /// all two bytes long and stored big-endian
    pub(super) opcode: Opcode,
    /// - `0x000-0x1FF` - Chip 8 interpreter (contains font set in emu)
    /// - `0x050-0x0A0` - Used for the built in `4x5` pixel font set (`0-F`)
    /// - `0x200-0xFFF` - Program ROM and work RAM
    pub(super) memory: Box<[u8; memory::SIZE]>,
    /// `8-bit` data registers named `V0` to `VF`. The `VF` register doubles as a flag for some
    /// instructions; thus, it should be avoided. In an addition operation, `VF` is the carry flag,
    /// while in subtraction, it is the "no borrow" flag. In the draw instruction `VF` is set upon
    /// pixel collision.
    pub(super) registers: [u8; cpu::register::SIZE],
    /// The index for the register, this is a special register entry
    /// called index `I`
    pub(super) index_register: u16,
    /// The program counter holds the address of the next instruction to be executed from memory.
    pub(super) program_counter: u16,
    /// The stack is only used to store return addresses when subroutines are called. The first
    /// [RCA 1802](https://de.wikipedia.org/wiki/RCA1802) version allocated `48` bytes for up to
    /// `12` levels of nesting; modern implementations usually have more.
    /// (here we are using `16`)
    pub(super) stack: ArrayVec<[u16; cpu::stack::SIZE]>,
    /// Delay timer: This timer is intended to be used for timing the events of games. Its value
    /// can be set and read.
    pub(super) delay_timer: Timer,
    /// Sound timer: This timer is used for sound effects. When its value is nonzero, a beeping
    /// sound is made.
    pub(super) sound_timer: Timer,
    pub(super) screen: Screen,
    pub(super) keyboard: Keyboard,
    pub(super) state: RunState,
    /// This stores the random number generator, used by the machine.
    /// It is stored into the machine, so as to enable simple mocking
    /// of the given type.
    pub(super) rng: Box<dyn RngCore + Send>,
}

impl Default for Machine {
    fn default() -> Self {
        Machine::new()
    }
}

impl Machine {
    /// will create a new initialized machine
    pub fn new() -> Self {
        Machine::with_config(MachineConfig::default())
    }

    pub fn with_config(config: MachineConfig) -> Self {
        let mut machine = Self {
            config,
            opcode: 0,
            memory: Box::new([0; memory::SIZE]),
            registers: [0; cpu::register::SIZE],
            index_register: 0,
            program_counter: 0,
            stack: ArrayVec::new(),
            delay_timer: Timer::default(),
            sound_timer: Timer::default(),
            screen: Screen::new(),
            keyboard: Keyboard::new(),
            state: RunState::Running,
            rng: Box::new(rand::rngs::OsRng),
        };
        machine.initialize();
        machine
    }

    /// Initializes a new machine and loads the rom into it.
    pub fn with_program(rom: &[u8]) -> Result<Self, LoadError> {
        let mut machine = Machine::new();
        machine.load_program(rom)?;
        Ok(machine)
    }

    /// Resets the machine into the power on state, the configuration and the
    /// random number generator are kept.
    pub fn initialize(&mut self) {
        // initialize all the memory with 0
        self.memory.iter_mut().for_each(|byte| *byte = 0);

        // load fonts
        let fonts = display::fontset::LOCATION
            ..(display::fontset::LOCATION + display::fontset::FONTSET.len());
        self.memory[fonts].copy_from_slice(&display::fontset::FONTSET);

        self.opcode = 0;
        self.registers = [0; cpu::register::SIZE];
        self.index_register = 0;
        self.program_counter = cpu::PROGRAM_COUNTER as u16;
        self.stack.clear();
        self.delay_timer.set_value(0);
        self.sound_timer.set_value(0);
        self.screen.clear();
        self.keyboard.release_all();
        self.state = RunState::Running;
    }

    /// Writes the rom into memory behind the program start. Nothing else is
    /// reset, call [`initialize`](Self::initialize) before for a clean run.
    pub fn load_program(&mut self, rom: &[u8]) -> Result<(), LoadError> {
        if rom.len() > MAX_PROGRAM_SIZE {
            log::warn!("Rejected a rom of {} bytes.", rom.len());
            return Err(LoadError::RomTooLarge {
                size: rom.len(),
                max: MAX_PROGRAM_SIZE,
            });
        }

        self.memory[cpu::PROGRAM_COUNTER..(cpu::PROGRAM_COUNTER + rom.len())]
            .copy_from_slice(rom);
        log::debug!("Loaded a rom of {} bytes.", rom.len());
        Ok(())
    }

    pub fn set_rng(&mut self, rng: Box<dyn RngCore + Send>) {
        self.rng = rng;
    }

    /// will advance the program by a single instruction
    ///
    /// A fatal error halts the machine, every further step returns the same
    /// error until the machine is initialized again.
    pub fn step(&mut self) -> Result<Operation, ProcessError> {
        if let RunState::Halted(err) = &self.state {
            return Err(err.clone());
        }

        match self.cycle() {
            Ok(operation) => {
                if self.config.timer_cadence == TimerCadence::Instruction {
                    self.tick_timers();
                }
                Ok(operation)
            }
            Err(err) => {
                log::error!(
                    "Halting at {:#06X} after '{}'.",
                    self.program_counter,
                    err
                );
                self.state = RunState::Halted(err.clone());
                Err(err)
            }
        }
    }

    /// fetch, decode and execute
    fn cycle(&mut self) -> Result<Operation, ProcessError> {
        let pointer = self.program_counter as usize;
        self.opcode = opcode::build_opcode(&self.memory[..], pointer)?;
        let decoded = self.decode()?;

        // the counter points to the next instruction during execution
        self.program_counter = (pointer + memory::opcodes::SIZE) as u16;

        let instruction = match decoded {
            Some(instruction) => instruction,
            None => {
                log::warn!(
                    "Skipping the unknown opcode {:#06X} at {:#06X}.",
                    self.opcode,
                    pointer
                );
                return Ok(Operation::None);
            }
        };
        log::trace!("{:#06X}: {:#06X} {}", pointer, self.opcode, instruction);

        match self.execute(instruction) {
            Ok((step, operation)) => {
                self.program_counter = step.apply(pointer) as u16;
                Ok(operation)
            }
            Err(err) => {
                // leave the counter on the faulting instruction
                self.program_counter = pointer as u16;
                Err(err)
            }
        }
    }

    /// Decodes the current opcode, `None` is an unknown opcode that will be
    /// skipped.
    pub(super) fn decode(&self) -> Result<Option<Instruction>, OpcodeError> {
        match self.config.unknown_opcodes {
            UnknownOpcodes::Skip => Ok(Instruction::decode_relaxed(self.opcode)),
            UnknownOpcodes::Halt => Instruction::try_from(self.opcode).map(Some),
        }
    }

    /// Counts both timers down by one.
    pub fn tick_timers(&mut self) {
        self.delay_timer.tick();
        self.sound_timer.tick();
    }

    /// Will write the key state into the internal keyboard.
    pub fn set_key(&mut self, key: usize, to: bool) -> Result<(), KeyError> {
        self.keyboard.set_key(key, to)
    }

    /// Will write keyboard data into interncal keyboard representation.
    pub fn set_keys(&mut self, keys: &[bool; keyboard::SIZE]) {
        self.keyboard.set_keys(keys);
    }

    pub fn keyboard(&self) -> &Keyboard {
        &self.keyboard
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer.get_value()
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer.get_value()
    }

    /// The host shall emit a tone while this is true.
    pub fn is_sound_active(&self) -> bool {
        self.sound_timer.is_active()
    }

    pub fn registers(&self) -> &[u8; cpu::register::SIZE] {
        &self.registers
    }

    pub fn index_register(&self) -> u16 {
        self.index_register
    }

    pub fn program_counter(&self) -> u16 {
        self.program_counter
    }

    pub fn stack(&self) -> &[u16] {
        &self.stack
    }

    pub fn memory(&self) -> &[u8] {
        &self.memory[..]
    }

    /// The last fetched opcode.
    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn config(&self) -> MachineConfig {
        self.config
    }

    /// Will push the pointer to the stack
    pub(super) fn push_stack(&mut self, pointer: u16) -> Result<(), StackError> {
        if self.stack.len() == self.stack.capacity() {
            Err(StackError::Full)
        } else {
            self.stack.push(pointer);
            Ok(())
        }
    }

    /// Will pop from the stack
    pub(super) fn pop_stack(&mut self) -> Result<u16, StackError> {
        self.stack.pop().ok_or(StackError::Empty)
    }

    /// The memory address `offset` bytes behind the index register, wrapped
    /// into the 12 bit address space.
    pub(super) fn index_address(&self, offset: usize) -> usize {
        (self.index_register as usize + offset) & memory::ADDRESS_MASK
    }
}
