extern crate strum;
#[macro_use]
extern crate strum_macros;

extern crate packed_struct;
extern crate packed_struct_codegen;

mod emit;
mod error;
mod image;
mod table;
mod word;

pub use emit::*;
pub use error::UcodeError;
pub use image::*;
pub use table::*;
pub use word::*;

pub use common::{AluOpcode, Opcode};

use lazy_static::lazy_static;
lazy_static! {
    pub static ref UCODE: MicrocodeTable = table();
}

/// Where the app writes the microcode image.
pub const UCODE_TXT: &str = "ucode.txt";
