use packed_struct::prelude::*;

use common::AluOpcode;

use crate::UcodeError;

#[derive(Clone, Copy, Display, Debug, Default, PartialEq, Eq)]
#[derive(EnumCount, EnumIter, EnumString)]
#[derive(PrimitiveEnum_u8)]
#[strum(serialize_all = "lowercase")]
pub enum SeqControl {
    #[default]
    End = 0,
    Next = 1,
    IfOp12W = 2,
}

#[derive(Clone, Copy, Display, Debug, Default, PartialEq, Eq)]
#[derive(EnumCount, EnumIter, EnumString)]
#[derive(PrimitiveEnum_u8)]
#[strum(serialize_all = "lowercase")]
pub enum AddressBusSource {
    #[default]
    None = 0,
    Mar = 1,
    WBus = 2,
    Pc = 3,
    PcInc = 4,
    TrapBase = 5,
}

#[derive(Clone, Copy, Display, Debug, Default, PartialEq, Eq)]
#[derive(EnumCount, EnumIter, EnumString)]
#[derive(PrimitiveEnum_u8)]
#[strum(serialize_all = "lowercase")]
pub enum RegAbControl {
    #[default]
    None = 0,
    Op2AOp3B = 1,   // add op1, op2, op3 / add op1, op2, imm5
    Op2B = 2,       // mov op1, op2 / mov op1, imm8
    Op1B = 3,       // jmp op1 / jmp imm11
    Op12DirectA = 4,
}

#[derive(Clone, Copy, Display, Debug, Default, PartialEq, Eq)]
#[derive(EnumCount, EnumIter, EnumString)]
#[derive(PrimitiveEnum_u8)]
#[strum(serialize_all = "lowercase")]
pub enum RegWriteControl {
    #[default]
    None = 0,
    Op1 = 1,
    R7 = 2,
    R6Link = 3,
}

#[derive(Clone, Copy, Display, Debug, Default, PartialEq, Eq)]
#[derive(EnumCount, EnumIter, EnumString)]
#[derive(PrimitiveEnum_u8)]
#[strum(serialize_all = "lowercase")]
pub enum ImmMode {
    #[default]
    Disable = 0,
    Imm5 = 1,
    Imm11 = 2,
    Imm8 = 3,
}

#[derive(Clone, Copy, Display, Debug, Default, PartialEq, Eq)]
#[derive(EnumCount, EnumIter, EnumString)]
#[derive(PrimitiveEnum_u8)]
#[strum(serialize_all = "lowercase")]
pub enum AluWriteControl {
    #[default]
    Disable = 0,
    Result = 1,
    Eflags = 2,
}

/// One microinstruction: every datapath control line for a single clock.
///
/// Packed into 5 bytes, most significant bit first. The top 4 bits are
/// always zero, leaving the 36-bit word with the sequencer in its high bits
/// and the memory interface in its low bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[derive(PackedStruct)]
#[packed_struct(size_bytes = "5", endian = "msb", bit_numbering = "msb0")]
pub struct ControlWord {
    // sequencer
    #[packed_field(bits = "4..=5", ty = "enum")]
    pub seq_control: SeqControl,

    // bus control
    #[packed_field(bits = "6")]
    pub pc_write_enable: bool,
    /// Must be set whenever `seq_control` is `End`, or the sequencer stalls.
    #[packed_field(bits = "7")]
    pub fetch_enable: bool,
    #[packed_field(bits = "8..=10", ty = "enum")]
    pub addr_bus_source: AddressBusSource,
    #[packed_field(bits = "11")]
    pub pc_out_to_a: bool,

    // register file
    #[packed_field(bits = "12..=14", ty = "enum")]
    pub reg_ab_control: RegAbControl,
    #[packed_field(bits = "15..=16", ty = "enum")]
    pub reg_write_control: RegWriteControl,

    // immediate
    #[packed_field(bits = "18")]
    pub imm_enable: bool,
    #[packed_field(bits = "19..=20", ty = "enum")]
    pub imm_mode: ImmMode,

    // alu
    #[packed_field(bits = "22")]
    pub alu_latch_a: bool,
    #[packed_field(bits = "23")]
    pub alu_latch_b: bool,
    #[packed_field(bits = "24..=27", ty = "enum")]
    pub alu_op: AluOpcode,
    #[packed_field(bits = "28..=29", ty = "enum")]
    pub alu_write_control: AluWriteControl,
    #[packed_field(bits = "30")]
    pub alu_flags_enable: bool,

    // memory
    #[packed_field(bits = "33")]
    pub data_bus_direction_b: bool,
    #[packed_field(bits = "34")]
    pub data_bus_rw: bool,
    #[packed_field(bits = "35")]
    pub data_bus_in_w: bool,
    #[packed_field(bits = "36")]
    pub mar_in: bool,
    #[packed_field(bits = "37")]
    pub mdr_in: bool,
}

impl ControlWord {
    pub const BITS: usize = 36;
    pub const MASK: u64 = (1 << ControlWord::BITS) - 1;

    /// Bits of the 36-bit word that no field owns.
    pub const PADDING_MASK: u64 = (1 << 22) | (1 << 18) | (1 << 8) | (1 << 7) | (1 << 1) | 1;

    /// Terminal step: hand control back to the sequencer and fetch.
    pub fn end() -> ControlWord {
        ControlWord {
            seq_control: SeqControl::End,
            fetch_enable: true,
            ..ControlWord::default()
        }
    }

    /// Non-terminal step: advance to the next microstep without fetching.
    pub fn next() -> ControlWord {
        ControlWord {
            seq_control: SeqControl::Next,
            fetch_enable: false,
            ..ControlWord::default()
        }
    }

    pub fn with<F: FnOnce(&mut ControlWord)>(mut self, overrides: F) -> ControlWord {
        overrides(&mut self);
        self
    }

    pub fn with_alu_opcode(self, alu_op: AluOpcode) -> ControlWord {
        self.with(|w| w.alu_op = alu_op)
    }

    pub fn to_bits(&self) -> u64 {
        let bytes = self.pack().unwrap();
        let mut wide = [0u8; 8];
        wide[3..].copy_from_slice(&bytes);
        let bits = u64::from_be_bytes(wide);
        assert_eq!(bits & !ControlWord::MASK, 0);
        assert_eq!(bits & ControlWord::PADDING_MASK, 0);
        bits
    }

    pub fn from_bits(bits: u64) -> Result<ControlWord, UcodeError> {
        if bits & !ControlWord::MASK != 0 {
            return Err(UcodeError::WordTooWide(bits));
        }
        if bits & ControlWord::PADDING_MASK != 0 {
            return Err(UcodeError::NonZeroPadding(bits));
        }

        let wide = bits.to_be_bytes();
        let mut bytes = [0u8; 5];
        bytes.copy_from_slice(&wide[3..]);
        ControlWord::unpack(&bytes).map_err(UcodeError::Decode)
    }

    /// Byte-reversed packing for little-endian consumers. The text image
    /// does not use it.
    pub fn pack_lsb(&self) -> [u8; 5] {
        let mut bytes = self.pack().unwrap();
        bytes.reverse();
        bytes
    }

    pub fn changed_fields(&self, base: &ControlWord) -> Vec<&'static str> {
        let mut changed = Vec::new();

        macro_rules! compare {
            ($($field:ident),+) => {
                $(
                    if self.$field != base.$field {
                        changed.push(stringify!($field));
                    }
                )+
            };
        }

        compare!(
            seq_control,
            pc_write_enable,
            fetch_enable,
            addr_bus_source,
            pc_out_to_a,
            reg_ab_control,
            reg_write_control,
            imm_enable,
            imm_mode,
            alu_latch_a,
            alu_latch_b,
            alu_op,
            alu_write_control,
            alu_flags_enable,
            data_bus_direction_b,
            data_bus_rw,
            data_bus_in_w,
            mar_in,
            mdr_in
        );

        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    fn every_field_set() -> ControlWord {
        ControlWord {
            seq_control: SeqControl::IfOp12W,
            pc_write_enable: true,
            fetch_enable: true,
            addr_bus_source: AddressBusSource::TrapBase,
            pc_out_to_a: true,
            reg_ab_control: RegAbControl::Op12DirectA,
            reg_write_control: RegWriteControl::R6Link,
            imm_enable: true,
            imm_mode: ImmMode::Imm8,
            alu_latch_a: true,
            alu_latch_b: true,
            alu_op: AluOpcode::Cmp,
            alu_write_control: AluWriteControl::Eflags,
            alu_flags_enable: true,
            data_bus_direction_b: true,
            data_bus_rw: true,
            data_bus_in_w: true,
            mar_in: true,
            mdr_in: true,
        }
    }

    #[test]
    fn default_is_zero() {
        assert_eq!(0, ControlWord::default().to_bits());
        assert_eq!(ControlWord::default(), ControlWord::from_bits(0).unwrap());
    }

    #[test]
    fn sequencer_is_most_significant() {
        let w = ControlWord { seq_control: SeqControl::Next, ..ControlWord::default() };
        assert_eq!(0b01 << 34, w.to_bits());

        let w = ControlWord { mdr_in: true, ..ControlWord::default() };
        assert_eq!(0b100, w.to_bits());

        assert_eq!(
            format!("{:036b}", ControlWord::end().to_bits()),
            "000100000000000000000000000000000000"
        );
    }

    #[test]
    fn fields_do_not_touch_padding() {
        let bits = every_field_set().to_bits();
        assert_eq!(0, bits & ControlWord::PADDING_MASK);
        // zero bits within the seq_control, addr_bus_source, reg_ab_control and alu_write_control values
        let unset = (1 << 34) | (1 << 30) | (1 << 26) | (1 << 25) | (1 << 10);
        assert_eq!(ControlWord::MASK, bits | ControlWord::PADDING_MASK | unset);
    }

    #[test]
    fn decode_matches_encode() {
        let w = every_field_set();
        assert_eq!(w, ControlWord::from_bits(w.to_bits()).unwrap());

        let w = ControlWord::next().with(|w| {
            w.addr_bus_source = AddressBusSource::WBus;
            w.imm_mode = ImmMode::Imm11;
            w.alu_op = AluOpcode::Sub;
        });
        assert_eq!(w, ControlWord::from_bits(w.to_bits()).unwrap());
    }

    #[test]
    fn decode_rejects() {
        assert!(matches!(ControlWord::from_bits(1 << 36), Err(UcodeError::WordTooWide(_))));
        for bit in 0..ControlWord::BITS {
            let mask = 1u64 << bit;
            if mask & ControlWord::PADDING_MASK != 0 {
                assert!(matches!(ControlWord::from_bits(mask), Err(UcodeError::NonZeroPadding(_))));
            }
        }
        // seq_control = 0b11
        assert!(matches!(ControlWord::from_bits(0b11 << 34), Err(UcodeError::Decode(_))));
        // alu_op = 0b1010
        assert!(matches!(ControlWord::from_bits(0b1010 << 12), Err(UcodeError::Decode(_))));
    }

    #[test]
    fn enums_fit_their_fields() {
        for v in SeqControl::iter() { assert!(v.to_primitive() < 1 << 2); }
        for v in AddressBusSource::iter() { assert!(v.to_primitive() < 1 << 3); }
        for v in RegAbControl::iter() { assert!(v.to_primitive() < 1 << 3); }
        for v in RegWriteControl::iter() { assert!(v.to_primitive() < 1 << 2); }
        for v in ImmMode::iter() { assert!(v.to_primitive() < 1 << 2); }
        for v in AluWriteControl::iter() { assert!(v.to_primitive() < 1 << 2); }
    }

    #[test]
    fn with_only_changes_overrides() {
        let base = every_field_set();
        let derived = base.with_alu_opcode(AluOpcode::Not);
        assert_eq!(vec!["alu_op"], derived.changed_fields(&base));
        assert_eq!((0xF ^ 0x9) << 12, base.to_bits() ^ derived.to_bits());

        let derived = base.with(|w| {
            w.mar_in = false;
            w.reg_write_control = RegWriteControl::R7;
        });
        assert_eq!(vec!["reg_write_control", "mar_in"], derived.changed_fields(&base));
        assert!(base.changed_fields(&base).is_empty());
    }

    #[test]
    fn pack_lsb() {
        let w = ControlWord { mdr_in: true, ..ControlWord::end() };
        assert_eq!([0x04, 0x00, 0x00, 0x00, 0x01], w.pack_lsb());
        assert_eq!([0x01, 0x00, 0x00, 0x00, 0x04], w.pack().unwrap());
    }
}
