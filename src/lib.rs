pub mod adaptive;
pub mod bitio;
pub mod driver;
pub mod error;
pub mod header;
pub mod mtf;
pub mod window;

use std::io::{Read, Write};

use bitio::BitWriter;
use driver::Driver;
use error::Error;
use header::FileStamp;

/// Compress all of `input` into `output`, writing the fixed header first and
/// rewriting it with the final plaintext size once the bitstream completes.
/// `output` only needs `Write`; the header's `file_size` field is computed
/// entirely in memory and passed back to the caller for binaries (like
/// `bin/lzuf.rs`) that can seek their own output file and rewrite it.
pub fn compress<R: Read, W: Write>(
    num_pos_bits: u32,
    input: &mut R,
    output: &mut W,
) -> Result<FileStamp, Error> {
    let mut stamp = FileStamp::new(num_pos_bits as i32);
    stamp.write_to(output)?;

    let mut driver = Driver::new(num_pos_bits, input)?;
    let mut bw = BitWriter::new(output);
    let file_size = driver.compress(input, &mut bw)?;
    stamp.file_size = file_size as i64;
    Ok(stamp)
}
