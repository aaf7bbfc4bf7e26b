//! The pretty print implementation written for the [`Machine`](super::Machine).
//! This implementation was split up into this file for smaller file sizes and higher
//! cohesion.

use std::fmt::{self, Write};

use num_traits::Unsigned;
use once_cell::sync::Lazy;

use super::{Machine, RunState};
use crate::{
    definitions::memory,
    opcode::{self, Opcode},
};

/// How many entries are printed per row
const HEX_PRINT_STEP: usize = 8;

const END_OF_LINE: char = '\n';
const INDENT_FILLAMENT: char = '\t';

/// The width of a formatted integer, 2 sysbols for the prefix (0x) and 4 for the rest.
const INTEGER_LEN: usize = 6;

/// The values that are used when there are at lease two rows of zeros.
const FILLER_BASE: &str = "...";

/// Prepares the row content that will be used for rows of only zeros.
static ZERO_FILLER: Lazy<String> = Lazy::new(|| {
    let length = INTEGER_LEN * (HEX_PRINT_STEP - 2) + (HEX_PRINT_STEP - 1) - FILLER_BASE.len();
    format!(
        "{zero:#06X}{filler}{base}{filler}{zero:#06X}",
        zero = 0u16,
        filler = " ".repeat(length / 2),
        base = FILLER_BASE
    )
});

/// will formatt all integer types the same way
fn integer_formatter<T>(line: &mut String, data: T) -> fmt::Result
where
    T: fmt::UpperHex + Unsigned + Copy,
{
    write!(line, "{:#06X}", data)
}

/// will formatt the pointers according to definition
fn pointer_formatter(line: &mut String, from: usize, to: usize) -> fmt::Result {
    write!(line, "{:#06X} - {:#06X} :", from, to)
}

fn indent_helper(text: &mut String, indent: usize) {
    for _ in 0..indent {
        text.push(INDENT_FILLAMENT);
    }
}

/// will pretty print all the integer data given
fn integer_printer<T>(data: &[T], indent: usize) -> Result<String, fmt::Error>
where
    T: fmt::UpperHex + Unsigned + Copy,
{
    let mut res = String::new();
    for (row, chunk) in data.chunks(HEX_PRINT_STEP).enumerate() {
        let from = row * HEX_PRINT_STEP;
        indent_helper(&mut res, indent);
        pointer_formatter(&mut res, from, from + chunk.len() - 1)?;
        for &entry in chunk {
            res.push(' ');
            integer_formatter(&mut res, entry)?;
        }
        res.push(END_OF_LINE);
    }
    Ok(res)
}

/// will pretty print the boolean data given, padded to the integer width
fn bool_printer(data: &[bool], indent: usize) -> Result<String, fmt::Error> {
    let mut res = String::new();
    for (row, chunk) in data.chunks(HEX_PRINT_STEP).enumerate() {
        let from = row * HEX_PRINT_STEP;
        indent_helper(&mut res, indent);
        pointer_formatter(&mut res, from, from + chunk.len() - 1)?;
        for &entry in chunk {
            write!(res, " {:<width$}", entry, width = INTEGER_LEN)?;
        }
        // remove the padding of the last entry
        res.truncate(res.trim_end().len());
        res.push(END_OF_LINE);
    }
    Ok(res)
}

/// this struct will simulate a single row of opcodes (only in this context)
struct Row {
    from: usize,
    to: usize,
    data: [Opcode; HEX_PRINT_STEP],
    only_null: bool,
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut res = String::new();
        pointer_formatter(&mut res, self.from, self.to)?;
        res.push(' ');

        if self.only_null {
            res.push_str(&ZERO_FILLER);
        } else {
            for (i, &entry) in self.data.iter().enumerate() {
                if i > 0 {
                    res.push(' ');
                }
                integer_formatter(&mut res, entry)?;
            }
        }
        write!(f, "{}", res)
    }
}

/// will pretty print the content of the raw memory, neighbouring rows of only
/// zeros are merged into one
fn memory_printer(data: &[u8], indent: usize) -> Result<String, fmt::Error> {
    const POINTER_INCREMENT: usize = HEX_PRINT_STEP * memory::opcodes::SIZE;

    let mut rows: Vec<Row> = Vec::with_capacity(data.len() / POINTER_INCREMENT);
    for from in (0..data.len()).step_by(POINTER_INCREMENT) {
        let to = (from + POINTER_INCREMENT - 1).min(data.len() - 1);

        let mut row = Row {
            from,
            to,
            data: [0; HEX_PRINT_STEP],
            only_null: true,
        };

        for (slot, index) in (from..=to).step_by(memory::opcodes::SIZE).enumerate() {
            // an odd trailing byte is shown as the high byte of the opcode
            let opcode = opcode::build_opcode(data, index)
                .unwrap_or_else(|_| Opcode::from(data[index]) << 8);
            row.data[slot] = opcode;
            row.only_null &= opcode == 0;
        }

        if row.only_null {
            if let Some(last) = rows.last() {
                if last.only_null {
                    row.from = last.from;
                    rows.pop();
                }
            }
        }
        rows.push(row);
    }

    let mut res = String::new();
    for row in rows {
        indent_helper(&mut res, indent);
        write!(res, "{}{}", row, END_OF_LINE)?;
    }
    Ok(res)
}

/// will print the screen, a lit pixel is a `#`
fn screen_printer(machine: &Machine, indent: usize) -> String {
    let mut res = String::new();
    for row in machine.screen.rows() {
        indent_helper(&mut res, indent);
        res.extend(row.iter().map(|&lit| if lit { '#' } else { '.' }));
        res.push(END_OF_LINE);
    }
    res
}

impl Machine {
    fn dump(&self) -> Result<String, fmt::Error> {
        let mut res = String::new();

        write!(res, "Program Counter: ")?;
        integer_formatter(&mut res, self.program_counter)?;
        res.push(END_OF_LINE);

        write!(res, "Opcode: ")?;
        integer_formatter(&mut res, self.opcode)?;
        match self.decode() {
            Ok(Some(instruction)) => writeln!(res, " ({})", instruction)?,
            Ok(None) | Err(_) => writeln!(res, " (invalid)")?,
        }

        write!(res, "Index Register: ")?;
        integer_formatter(&mut res, self.index_register)?;
        res.push(END_OF_LINE);

        match &self.state {
            RunState::Running => writeln!(res, "State: running")?,
            RunState::AwaitingKey { register } => {
                writeln!(res, "State: awaiting key for V{:X}", register)?
            }
            RunState::Halted(err) => writeln!(res, "State: halted ({})", err)?,
        }

        writeln!(res, "Registers:")?;
        res.push_str(&integer_printer(&self.registers[..], 1)?);

        write!(res, "Stack:")?;
        for &entry in self.stack.iter() {
            res.push(' ');
            integer_formatter(&mut res, entry)?;
        }
        res.push(END_OF_LINE);

        write!(res, "Delay Timer: ")?;
        integer_formatter(&mut res, self.delay_timer.get_value())?;
        res.push(END_OF_LINE);
        write!(res, "Sound Timer: ")?;
        integer_formatter(&mut res, self.sound_timer.get_value())?;
        res.push(END_OF_LINE);

        writeln!(res, "Keyboard:")?;
        res.push_str(&bool_printer(self.keyboard.get_keys(), 1)?);

        writeln!(res, "Memory:")?;
        res.push_str(&memory_printer(&self.memory[..], 1)?);

        writeln!(res, "Screen:")?;
        res.push_str(&screen_printer(self, 1));

        // Remove unneded new line
        if res.ends_with(END_OF_LINE) {
            res.pop();
        }
        Ok(res)
    }
}

impl fmt::Display for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dump()?)
    }
}
