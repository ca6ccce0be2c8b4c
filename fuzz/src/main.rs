#[macro_use]
extern crate afl;
extern crate nsdom;

use nsdom::{Document, EncodeOptions, Indent};

fn main() {
	fuzz!(|data: &[u8]| {
		let doc = match Document::parse_bytes(data) {
			Ok(doc) => doc,
			Err(_) => return,
		};
		for opts in &[
			EncodeOptions::new(),
			EncodeOptions::new().with_declaration(true).with_indent(Indent::Tabs),
		] {
			let xml = doc.to_xml_string(opts).expect("decoded document failed to encode");
			let copy = Document::parse_str(&xml).expect("encoded document failed to decode");
			let again = copy.to_xml_string(opts).expect("re-decoded document failed to encode");
			assert_eq!(xml, again);
		}
	});
}
