use crate::{
    definitions::{cpu, display},
    opcode::{ArithmeticOp, Instruction, KeyOp, MiscOp, Operation, ProgramCounterStep},
    ProcessError,
};

use super::{Machine, RunState};

/// the flag register `VF`
const FLAG: usize = cpu::register::LAST;

impl Machine {
    /// Runs a single decoded instruction. The program counter already points
    /// behind the instruction, the returned step is applied to the address of
    /// the instruction itself.
    pub(super) fn execute(
        &mut self,
        instruction: Instruction,
    ) -> Result<(ProgramCounterStep, Operation), ProcessError> {
        let mut operation = Operation::None;
        let step = match instruction {
            Instruction::Sys { nnn } => {
                // 0NNN
                // machine code routines of the COSMAC VIP are not emulated
                log::debug!("Ignoring machine code routine at {:#05X}", nnn);
                ProgramCounterStep::Next
            }
            Instruction::Clear => {
                // 00E0
                self.screen.clear();
                operation = Operation::Draw;
                ProgramCounterStep::Next
            }
            Instruction::Return => {
                // 00EE
                // Return from sub routine => pop from stack
                let pc = self.pop_stack()?;
                log::debug!("return to {:#06X}", pc);
                ProgramCounterStep::Jump(pc as usize)
            }
            Instruction::Jump { nnn } => ProgramCounterStep::Jump(nnn),
            Instruction::Call { nnn } => {
                // 2NNN
                // the counter already points to the instruction after the call
                self.push_stack(self.program_counter)?;
                ProgramCounterStep::Jump(nnn)
            }
            Instruction::SkipIfEqual { x, nn } => ProgramCounterStep::cond(self.registers[x] == nn),
            Instruction::SkipIfNotEqual { x, nn } => {
                ProgramCounterStep::cond(self.registers[x] != nn)
            }
            Instruction::SkipIfRegistersEqual { x, y } => {
                ProgramCounterStep::cond(self.registers[x] == self.registers[y])
            }
            Instruction::Load { x, nn } => {
                self.registers[x] = nn;
                ProgramCounterStep::Next
            }
            Instruction::Add { x, nn } => {
                // let VX overflow, but ignore carry
                self.registers[x] = self.registers[x].wrapping_add(nn);
                ProgramCounterStep::Next
            }
            Instruction::Arithmetic { op, x, y } => {
                self.arithmetic(op, x, y);
                ProgramCounterStep::Next
            }
            Instruction::SkipIfRegistersNotEqual { x, y } => {
                ProgramCounterStep::cond(self.registers[x] != self.registers[y])
            }
            Instruction::SetIndex { nnn } => {
                self.index_register = nnn as u16;
                ProgramCounterStep::Next
            }
            Instruction::JumpWithOffset { nnn } => {
                // BNNN
                // an address past the memory is caught by the next fetch
                ProgramCounterStep::Jump(nnn + self.registers[0] as usize)
            }
            Instruction::Random { x, nn } => {
                // using a fill bytes call here, as the trait RngCore does not
                // support random u8.
                let mut rand = [0u8; 1];
                self.rng.fill_bytes(&mut rand);
                self.registers[x] = rand[0] & nn;
                ProgramCounterStep::Next
            }
            Instruction::Draw { x, y, n } => {
                self.draw(x, y, n);
                operation = Operation::Draw;
                ProgramCounterStep::Next
            }
            Instruction::Key { op, x } => {
                let pressed = self.keyboard.is_pressed(self.registers[x] as usize);
                match op {
                    KeyOp::Pressed => ProgramCounterStep::cond(pressed),
                    KeyOp::NotPressed => ProgramCounterStep::cond(!pressed),
                }
            }
            Instruction::Misc { op, x } => {
                let (step, op) = self.misc(op, x);
                operation = op;
                step
            }
        };
        Ok((step, operation))
    }

    fn arithmetic(&mut self, op: ArithmeticOp, x: usize, y: usize) {
        let (vx, vy) = (self.registers[x], self.registers[y]);
        match op {
            ArithmeticOp::Assign => self.registers[x] = vy,
            ArithmeticOp::Or => self.registers[x] = vx | vy,
            ArithmeticOp::And => self.registers[x] = vx & vy,
            ArithmeticOp::Xor => self.registers[x] = vx ^ vy,
            ArithmeticOp::Add => {
                // VF is written last, so it wins if X is VF
                let (res, carry) = vx.overflowing_add(vy);
                self.registers[x] = res;
                self.registers[FLAG] = carry as u8;
            }
            ArithmeticOp::Sub => {
                // VF is the "no borrow" flag, it is only set on a strict greater than
                self.registers[FLAG] = (vx > vy) as u8;
                self.registers[x] = vx.wrapping_sub(vy);
            }
            ArithmeticOp::ShiftRight => {
                self.registers[FLAG] = vx & 1;
                self.registers[x] = vx >> 1;
            }
            ArithmeticOp::SubReversed => {
                self.registers[FLAG] = (vy > vx) as u8;
                self.registers[x] = vy.wrapping_sub(vx);
            }
            ArithmeticOp::ShiftLeft => {
                self.registers[FLAG] = (vx >> 7) & 1;
                self.registers[x] = vx << 1;
            }
        }
    }

    /// DXYN
    /// Draws a sprite at coordinate (VX, VY) that has a width of 8 pixels and a height of N
    /// pixels. Each row of 8 pixels is read as bit-coded starting from memory location I; I
    /// value doesn’t change after the execution of this instruction. VF is set to 1 if any
    /// screen pixels are flipped from set to unset when the sprite is drawn, and to 0 if that
    /// doesn’t happen. Pixels leaving the screen wrap around to the opposite edge.
    fn draw(&mut self, reg_x: usize, reg_y: usize, n: usize) {
        let coorx = self.registers[reg_x] as usize % display::WIDTH;
        let coory = self.registers[reg_y] as usize % display::HEIGHT;

        let mut collision = false;

        for row in 0..n {
            let sprite = self.memory[self.index_address(row)];
            let y = coory + row;

            for column in 0..display::SPRITE_WIDTH {
                // most significant bit first
                let mask = 0x80 >> column;
                if sprite & mask == 0 {
                    continue;
                }

                collision |= self.screen.toggle(coorx + column, y);
            }
        }

        self.registers[FLAG] = collision as u8;
    }

    fn misc(&mut self, op: MiscOp, x: usize) -> (ProgramCounterStep, Operation) {
        match op {
            MiscOp::GetDelayTimer => {
                self.registers[x] = self.delay_timer.get_value();
            }
            MiscOp::AwaitKeyPress => {
                // FX0A
                // the instruction is fetched again until a key is pressed
                match self.keyboard.first_pressed() {
                    Some(key) => {
                        self.registers[x] = key as u8;
                        self.state = RunState::Running;
                    }
                    None => {
                        self.state = RunState::AwaitingKey { register: x };
                        return (ProgramCounterStep::Rewind, Operation::Wait);
                    }
                }
            }
            MiscOp::SetDelayTimer => {
                self.delay_timer.set_value(self.registers[x]);
            }
            MiscOp::SetSoundTimer => {
                self.sound_timer.set_value(self.registers[x]);
            }
            MiscOp::AddToIndex => {
                // VF is not affected
                self.index_register = self.index_register.wrapping_add(self.registers[x] as u16);
            }
            MiscOp::SetIndexToGlyph => {
                let glyph = display::fontset::LOCATION
                    + display::fontset::GLYPH_SIZE * self.registers[x] as usize;
                self.index_register = glyph as u16;
            }
            MiscOp::StoreBcd => {
                let r = self.registers[x];
                let digits = [r / 100, r / 10 % 10, r % 10];
                for (offset, &digit) in digits.iter().enumerate() {
                    let address = self.index_address(offset);
                    self.memory[address] = digit;
                }
            }
            MiscOp::StoreRegisters => {
                // I itself is left unmodified
                for offset in 0..=x {
                    let address = self.index_address(offset);
                    self.memory[address] = self.registers[offset];
                }
            }
            MiscOp::LoadRegisters => {
                for offset in 0..=x {
                    self.registers[offset] = self.memory[self.index_address(offset)];
                }
            }
        }
        (ProgramCounterStep::Next, Operation::None)
    }
}
