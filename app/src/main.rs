use std::{
    fs::File,
    io::{BufWriter, Read},
};

use ucode::*;

fn main() -> Result<(), UcodeError> {
    write_table(&UCODE, BufWriter::new(File::create(UCODE_TXT)?))?;

    let mut image = String::new();
    File::open(UCODE_TXT)?.read_to_string(&mut image)?;
    print!("{}", image);

    Ok(())
}
