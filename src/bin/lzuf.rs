extern crate getopts;
extern crate lzuf;

use std::env;
use std::fs::File;
use std::io::{BufReader, BufWriter, Seek, SeekFrom};
use std::process;

use getopts::Options;

const DEFAULT_NUM_POS_BITS: u32 = 17;
const MIN_NUM_POS_BITS: u32 = 12;
const MAX_NUM_POS_BITS: u32 = 20;

fn print_usage(program: &str, opts: &Options) {
    let brief = format!("Usage: {} [-N bits] INFILE OUTFILE", program);
    print!("{}", opts.usage(&brief));
}

fn do_compress(input: &str, output: &str, num_pos_bits: u32, stats: bool) -> Result<(), String> {
    let mut inf = BufReader::new(File::open(input).map_err(|e| e.to_string())?);
    let mut outf = File::create(output).map_err(|e| e.to_string())?;

    let stamp = lzuf::compress(num_pos_bits, &mut inf, &mut BufWriter::new(&mut outf))
        .map_err(|e| e.to_string())?;

    outf.seek(SeekFrom::Start(0)).map_err(|e| e.to_string())?;
    stamp.rewrite(&mut outf).map_err(|e| e.to_string())?;

    if stats {
        let in_size = stamp.file_size as u64;
        let out_size = outf.metadata().map_err(|e| e.to_string())?.len();
        println!("Window bits used    : {}", num_pos_bits);
        println!("Original size       : {}", in_size);
        println!("Compressed size     : {}", out_size);
        if in_size > 0 {
            println!("Ratio               : {:.2}%", out_size as f64 / in_size as f64 * 100.0);
        }
    }
    Ok(())
}

fn parse_num_pos_bits(s: &str) -> Result<u32, ()> {
    match s.parse::<i32>() {
        Ok(n) if n < MIN_NUM_POS_BITS as i32 => Ok(MIN_NUM_POS_BITS),
        Ok(n) if n > MAX_NUM_POS_BITS as i32 => Ok(MAX_NUM_POS_BITS),
        Ok(n) => Ok(n as u32),
        Err(_) => Err(()),
    }
}

pub fn main() {
    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("N", "bits", "window size exponent, 12..20 (default 17)", "BITS");
    opts.optflag("s", "stats", "print compression statistics");
    opts.optflag("h", "help", "print this help");

    let matches = match opts.parse(&args[1..]) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage(&program, &opts);
            process::exit(1);
        }
    };

    if matches.opt_present("h") {
        print_usage(&program, &opts);
        return;
    }

    let num_pos_bits = match matches.opt_str("N") {
        None => DEFAULT_NUM_POS_BITS,
        Some(s) => match parse_num_pos_bits(&s) {
            Ok(n) => n,
            Err(()) => {
                eprintln!("Error: -N must be an integer");
                print_usage(&program, &opts);
                process::exit(1);
            }
        },
    };

    if matches.free.len() != 2 {
        print_usage(&program, &opts);
        process::exit(1);
    }

    let input = &matches.free[0];
    let output = &matches.free[1];
    let stats = matches.opt_present("s");

    if let Err(msg) = do_compress(input, output, num_pos_bits, stats) {
        eprintln!("Error: {}", msg);
        process::exit(1);
    }
}
