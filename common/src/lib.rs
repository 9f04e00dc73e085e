extern crate strum;
#[macro_use]
extern crate strum_macros;

extern crate packed_struct;
extern crate packed_struct_codegen;

use packed_struct::prelude::*;

#[derive(Clone, Copy, Display, Debug, Default, PartialEq, Eq)]
#[derive(EnumCount, EnumIter, EnumString)]
#[derive(PrimitiveEnum_u8)]
#[strum(serialize_all = "lowercase")]
pub enum AluOpcode {
    #[default]
    And = 0,
    Or = 1,
    Xor = 2,
    Add = 3,
    Sub = 4,
    Imul = 5,
    Lsr = 6,
    Asr = 7,
    Asl = 8,
    Not = 9,
    Cmp = 0xF,
}

impl AluOpcode {
    pub const BITS: usize = 4;
}

// operand styles as the assembler encodes them:
//   A: op1, op2, op3/imm5
//   B: op1, op2/imm8
//   C: imm11
#[derive(Clone, Copy, Display, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(EnumCount, EnumIter, EnumString)]
#[derive(PrimitiveEnum_u8)]
#[strum(serialize_all = "lowercase")]
pub enum Opcode {
    Init = 0b00000, // reset the sequencer and fetch
    Jmp = 0b00010,  // pc <- op1 | imm11
    Mov = 0b01000,  // op1 <- op2 | imm8
    Ld = 0b01001,   // op1 <- MEM[op2 | imm8]
    // FIXME: the assembler still encodes st as 0b01001 (same as ld); this tag
    // exists only in the microcode image until the assembler is updated.
    St = 0b01010,   // MEM[op2 | imm8] <- mdr

    Add = 0b10000, // op1 <- op2 + (op3 | imm5)
    Sub = 0b10001, // op1 <- op2 - (op3 | imm5)
    Mul = 0b10010, // op1 <- op2 * (op3 | imm5)
    And = 0b10011, // op1 <- op2 & (op3 | imm5)
    Or = 0b10100,  // op1 <- op2 | (op3 | imm5)
    Xor = 0b10101, // op1 <- op2 ^ (op3 | imm5)
    // FIXME: the assembler writes lsr as 0b100110, which older images truncated
    // to 0b00110. Needs the assembler to agree on 0b10110.
    Lsr = 0b10110, // op1 <- op2 >> (op3 | imm5)
    Asr = 0b10111, // op1 <- op2 >>> (op3 | imm5)
    Asl = 0b11000, // op1 <- op2 << (op3 | imm5)

    Int = 0b11100, // pc <- trap base
}

impl Opcode {
    pub const BITS: usize = 5;
    pub const MASK: u8 = (1 << Opcode::BITS) - 1;

    pub fn bits(self) -> u8 {
        let bits = self.to_primitive();
        assert_eq!(bits & !Opcode::MASK, 0, "{:?} does not fit in {} bits", self, Opcode::BITS);
        bits
    }
}
