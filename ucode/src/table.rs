use common::{AluOpcode, Opcode};

use crate::*;

pub const STEP_BITS: usize = 2;
pub const MAX_STEPS: usize = 1 << STEP_BITS;

/// The microprogram for one opcode: 1 to `MAX_STEPS` words, run in order.
///
/// Every step but the last hands off to the next microstep without
/// fetching; the last one ends the sequence and fetches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MicrocodeEntry {
    opcode: Opcode,
    words: Vec<ControlWord>,
    source: Option<(&'static str, u32)>,
}

impl MicrocodeEntry {
    pub fn new(opcode: Opcode, words: Vec<ControlWord>) -> MicrocodeEntry {
        assert!(
            !words.is_empty() && words.len() <= MAX_STEPS,
            "{:?} has {} steps, expected 1..={}", opcode, words.len(), MAX_STEPS);

        let last = words.len() - 1;
        for (step, w) in words.iter().enumerate() {
            if step == last {
                assert_eq!(SeqControl::End, w.seq_control, "{:?} step {} is the last step", opcode, step);
                assert!(w.fetch_enable, "{:?} step {} ends without fetch, the sequencer would stall", opcode, step);
            } else {
                assert_eq!(SeqControl::Next, w.seq_control, "{:?} step {} is not the last step", opcode, step);
                assert!(!w.fetch_enable, "{:?} step {} fetches before the last step", opcode, step);
            }
        }

        MicrocodeEntry {
            opcode,
            words,
            source: None,
        }
    }

    fn located(mut self, file: &'static str, line: u32) -> MicrocodeEntry {
        self.source = Some((file, line));
        self
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn words(&self) -> &[ControlWord] {
        &self.words
    }

    /// Where in the builder this entry was defined, if it came from one.
    pub fn source(&self) -> Option<(&'static str, u32)> {
        self.source
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MicrocodeTable {
    entries: Vec<MicrocodeEntry>,
}

impl MicrocodeTable {
    pub fn entries(&self) -> &[MicrocodeEntry] {
        &self.entries
    }

    pub fn get(&self, opcode: Opcode) -> Option<&MicrocodeEntry> {
        self.entries.iter().find(|e| e.opcode == opcode)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every word in emission order, tagged with its opcode and step.
    pub fn words(&self) -> impl Iterator<Item = (Opcode, u8, &ControlWord)> + '_ {
        self.entries.iter().flat_map(|e| {
            e.words.iter().enumerate().map(move |(step, w)| (e.opcode, step as u8, w))
        })
    }
}

pub struct Ucode {
    entries: Vec<MicrocodeEntry>,
}

macro_rules! add {
    ($self:expr, $opcode:expr, $($word:expr),+ $(,)?) => {
        $self.add_with_source($opcode, vec![$($word),+], file!(), line!());
    };
}

impl Ucode {
    fn new() -> Ucode {
        Ucode {
            entries: Vec::new(),
        }
    }

    fn add_with_source(&mut self, opcode: Opcode, words: Vec<ControlWord>, file: &'static str, line: u32) {
        assert!(self.entries.iter().all(|e| e.opcode != opcode), "{:?} defined twice", opcode);

        self.entries.push(MicrocodeEntry::new(opcode, words).located(file, line));
    }

    fn build(mut self) -> MicrocodeTable {
        add!(self, Opcode::Init, ControlWord::end());

        // op1 <- op2 (alu) op3/imm5
        let add = ControlWord::end().with(|w| {
            w.reg_ab_control = RegAbControl::Op2AOp3B;
            w.reg_write_control = RegWriteControl::Op1;
            w.imm_mode = ImmMode::Imm5;
            w.imm_enable = true;
            w.alu_latch_a = true;
            w.alu_latch_b = true;
            w.alu_op = AluOpcode::Add;
            w.alu_write_control = AluWriteControl::Result;
        });
        add!(self, Opcode::Add, add);
        add!(self, Opcode::Sub, add.with_alu_opcode(AluOpcode::Sub));
        add!(self, Opcode::Mul, add.with_alu_opcode(AluOpcode::Imul));
        add!(self, Opcode::And, add.with_alu_opcode(AluOpcode::And));
        add!(self, Opcode::Or, add.with_alu_opcode(AluOpcode::Or));
        // FIXME: the ROM has always selected OR for xor and ASR for asl. Left
        // as-is until the ALU select semantics for those are confirmed.
        add!(self, Opcode::Xor, add.with_alu_opcode(AluOpcode::Or));
        add!(self, Opcode::Lsr, add.with_alu_opcode(AluOpcode::Lsr));
        add!(self, Opcode::Asr, add.with_alu_opcode(AluOpcode::Asr));
        add!(self, Opcode::Asl, add.with_alu_opcode(AluOpcode::Asr));

        // op1 <- op2/imm8
        let mov = add.with(|w| {
            w.reg_ab_control = RegAbControl::Op2B;
            w.imm_mode = ImmMode::Imm8;
        });
        add!(self, Opcode::Mov, mov);

        // effective address op2/imm8 goes out on the W bus and into MAR/MDR
        let ld_addr = mov.with(|w| {
            w.seq_control = SeqControl::Next;
            w.fetch_enable = false;
            w.addr_bus_source = AddressBusSource::WBus;
            w.reg_write_control = RegWriteControl::None;
            w.mar_in = true;
            w.mdr_in = true;
        });
        let ld_load = ControlWord::end().with(|w| {
            w.reg_write_control = RegWriteControl::Op1;
            w.alu_latch_b = true;
            w.alu_op = AluOpcode::Add;
            w.alu_write_control = AluWriteControl::Result;
            w.data_bus_direction_b = true;
        });
        add!(self, Opcode::Ld, ld_addr, ld_load);

        let st_addr = ld_addr.with(|w| w.mdr_in = false);
        let st_store = ControlWord::end().with(|w| {
            w.addr_bus_source = AddressBusSource::Mar;
            w.data_bus_rw = true;
            w.data_bus_in_w = true;
        });
        add!(self, Opcode::St, st_addr, st_store);

        MicrocodeTable {
            entries: self.entries,
        }
    }
}

pub fn table() -> MicrocodeTable {
    let ucode = Ucode::new();
    ucode.build()
}
