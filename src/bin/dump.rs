//! Dump tool for extracting the decompressed header region
//!
//! Usage: cargo run --bin dump <game.mgx> [output.bin]

use std::env;
use std::fs;

use mgx_parser::{detect, Streams};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <game.mgx> [output.bin]", args[0]);
        eprintln!("  If output.bin is not specified, writes to header.bin");
        std::process::exit(1);
    }

    let input_path = &args[1];
    let output_path = if args.len() > 2 {
        args[2].clone()
    } else {
        "header.bin".to_string()
    };

    eprintln!("Reading: {input_path}");
    let data = fs::read(input_path).expect("Failed to read input file");
    eprintln!("File size: {} bytes", data.len());

    let streams = Streams::split(&data).expect("Failed to split file");
    eprintln!("Header region: {} bytes decompressed", streams.header().len());
    eprintln!("Body offset: 0x{:X}", streams.body_offset());
    eprintln!("Body size: {} bytes", streams.body(&data).len());
    eprintln!("Next chapter: 0x{:X}", streams.next_chapter());

    let version = detect(streams.header()).expect("Failed to sniff version");
    eprintln!("Stamp: {:?}", version.stamp);
    eprintln!("Family: {}", version.family.label());
    eprintln!("Sub-version: {}", version.sub_version);
    eprintln!("Structured header starts at: 0x{:X}", version.header_start);
    if !version.recognized {
        eprintln!("(stamp not recognized, using closest family)");
    }

    fs::write(&output_path, streams.header()).expect("Failed to write output file");
    eprintln!("Wrote to: {output_path}");
}
