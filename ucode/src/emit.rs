use std::{collections::HashSet, io::Write};

use common::Opcode;

use crate::*;

/// The canonical image line for one word, without the terminator:
/// opcode and step as the 7-bit tag, a space, then the 36-bit word.
pub fn line(opcode: Opcode, step: u8, word: &ControlWord) -> String {
    assert!((step as usize) < MAX_STEPS, "{:?} step {} does not fit in {} bits", opcode, step, STEP_BITS);
    format!("{:05b}{:02b} {:036b}", opcode.bits(), step, word.to_bits())
}

/// Appends entries to an image in the order they are written.
pub struct Emitter<W: Write> {
    out: W,
    emitted: HashSet<(Opcode, u8)>,
}

impl<W: Write> Emitter<W> {
    pub fn new(out: W) -> Emitter<W> {
        Emitter {
            out,
            emitted: HashSet::new(),
        }
    }

    pub fn write_entry(&mut self, entry: &MicrocodeEntry) -> Result<(), UcodeError> {
        for (step, word) in entry.words().iter().enumerate() {
            let step = step as u8;
            assert!(self.emitted.insert((entry.opcode(), step)), "{:?} step {} emitted twice", entry.opcode(), step);
            writeln!(self.out, "{}", line(entry.opcode(), step, word))?;
        }
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

pub fn write_table<W: Write>(table: &MicrocodeTable, out: W) -> Result<(), UcodeError> {
    let mut emitter = Emitter::new(out);
    for entry in table.entries() {
        emitter.write_entry(entry)?;
    }
    emitter.into_inner().flush()?;
    Ok(())
}
