//! Read an XML document from stdin and write it back re-indented.
//!
//! Set `RUST_LOG=nsdom=trace` to watch the codec at work.
use std::io;
use std::process;

use tracing_subscriber::EnvFilter;

use nsdom::{DecodeOptions, Decoder, EncodeOptions, Encoder, Error, Indent};

fn main() {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::from_default_env())
		.with_writer(io::stderr)
		.init();

	let tabs = std::env::args().any(|arg| arg == "--tabs");
	let result = Decoder::new()
		.with_options(DecodeOptions::new().with_outer_whitespace(true))
		.decode_reader(io::stdin().lock())
		.and_then(|doc| {
			let indent = if tabs { Indent::Tabs } else { Indent::TwoSpaces };
			let encoder = Encoder::new(
				EncodeOptions::new()
					.with_declaration(true)
					.with_indent(indent),
			);
			encoder.encode_to_writer(&doc, io::stdout().lock())
		});
	match result {
		Ok(()) => println!(),
		Err(Error::Io(e)) => {
			eprintln!("I/O error: {}", e);
			process::exit(2);
		}
		Err(e) => {
			eprintln!("invalid XML on input: {}", e);
			process::exit(1);
		}
	}
}
