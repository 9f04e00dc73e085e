use std::io::{BufRead, BufReader, Read};

use packed_struct::PrimitiveEnum;

use common::Opcode;

use crate::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UcodeLine {
    pub opcode: Opcode,
    pub step: u8,
    pub word: ControlWord,
}

/// A microcode image read back from its text form.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UcodeImage {
    pub lines: Vec<UcodeLine>,
}

fn binary(field: &str, width: usize, line: usize, what: &str) -> Result<u64, UcodeError> {
    if field.len() != width || !field.chars().all(|c| c == '0' || c == '1') {
        return Err(UcodeError::parse(line, &format!("{} must be {} binary digits, got '{}'", what, width, field)));
    }
    u64::from_str_radix(field, 2).map_err(|e| UcodeError::parse(line, &e.to_string()))
}

impl UcodeImage {
    pub fn read<R: Read>(r: R) -> Result<UcodeImage, UcodeError> {
        let mut lines = Vec::new();

        for (index, text) in BufReader::new(r).lines().enumerate() {
            let number = index + 1;
            let text = text?;
            let text = text.trim();
            if text.is_empty() {
                continue;
            }

            let mut fields = text.split_whitespace();
            let (tag, word) = match (fields.next(), fields.next(), fields.next()) {
                (Some(tag), Some(word), None) => (tag, word),
                _ => return Err(UcodeError::parse(number, "expected '<tag> <word>'")),
            };

            let tag = binary(tag, Opcode::BITS + STEP_BITS, number, "tag")? as u8;
            let opcode = tag >> STEP_BITS;
            let opcode = Opcode::from_primitive(opcode).ok_or(UcodeError::UnknownOpcode(opcode))?;
            let step = tag & (MAX_STEPS as u8 - 1);

            let word = ControlWord::from_bits(binary(word, ControlWord::BITS, number, "word")?)?;

            lines.push(UcodeLine { opcode, step, word });
        }

        Ok(UcodeImage { lines })
    }

    pub fn get(&self, opcode: Opcode, step: u8) -> Option<&ControlWord> {
        self.lines
            .iter()
            .find(|l| l.opcode == opcode && l.step == step)
            .map(|l| &l.word)
    }
}
