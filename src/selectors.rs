/*!
# Codepoint classes of XML 1.0 and Namespaces in XML 1.0

The classes here exclude the colon from the name classes: every name which
ends up in the tree is an `NCName`, and the lexer splits qualified names at
the colon before validating either half.
*/
use std::fmt;

/**
# Predicate trait for matching chars
*/
pub trait CharSelector {
	/// Return true if the given char is selected by the selector
	fn select(&self, c: char) -> bool;
}

impl CharSelector for char {
	fn select(&self, c: char) -> bool {
		*self == c
	}
}

impl CharSelector for &'_ [char] {
	fn select(&self, c: char) -> bool {
		self.contains(&c)
	}
}

/// Selects all chars from a range, including both ends.
#[derive(Debug, Clone, Copy)]
pub struct CodepointRange(pub char, pub char);

impl CodepointRange {
	pub const fn contains(&self, c: char) -> bool {
		self.0 <= c && c <= self.1
	}
}

impl CharSelector for CodepointRange {
	fn select(&self, c: char) -> bool {
		self.contains(c)
	}
}

/// Valid codepoints for character data (XML 1.0 § 2.2 \[2\])
const XML_CHAR_RANGES: &[CodepointRange] = &[
	CodepointRange('\x09', '\x0a'),
	CodepointRange('\x0d', '\x0d'),
	CodepointRange('\u{0020}', '\u{d7ff}'),
	CodepointRange('\u{e000}', '\u{fffd}'),
	CodepointRange('\u{10000}', '\u{10ffff}'),
];

/// NameStartChar (XML 1.0 § 2.3 \[4\]) without the colon
const NC_NAME_START_RANGES: &[CodepointRange] = &[
	CodepointRange('A', 'Z'),
	CodepointRange('_', '_'),
	CodepointRange('a', 'z'),
	CodepointRange('\u{c0}', '\u{d6}'),
	CodepointRange('\u{d8}', '\u{f6}'),
	CodepointRange('\u{f8}', '\u{2ff}'),
	CodepointRange('\u{370}', '\u{37d}'),
	CodepointRange('\u{37f}', '\u{1fff}'),
	CodepointRange('\u{200c}', '\u{200d}'),
	CodepointRange('\u{2070}', '\u{218f}'),
	CodepointRange('\u{2c00}', '\u{2fef}'),
	CodepointRange('\u{3001}', '\u{d7ff}'),
	CodepointRange('\u{f900}', '\u{fdcf}'),
	CodepointRange('\u{fdf0}', '\u{fffd}'),
	CodepointRange('\u{10000}', '\u{effff}'),
];

/// NameChar (XML 1.0 § 2.3 \[4a\]) without the colon, minus the
/// NameStartChar ranges (which are checked first)
const NC_NAME_EXTRA_RANGES: &[CodepointRange] = &[
	CodepointRange('-', '.'),
	CodepointRange('0', '9'),
	CodepointRange('\u{b7}', '\u{b7}'),
	CodepointRange('\u{300}', '\u{36f}'),
	CodepointRange('\u{203f}', '\u{2040}'),
];

/// Selects all chars from any of the contained ranges
#[derive(Clone, Copy)]
pub struct CodepointRanges(pub &'static [CodepointRange]);

impl CharSelector for CodepointRanges {
	fn select(&self, c: char) -> bool {
		self.0.iter().any(|r| r.contains(c))
	}
}

impl fmt::Debug for CodepointRanges {
	fn fmt<'f>(&self, f: &'f mut fmt::Formatter) -> fmt::Result {
		write!(f, "CodepointRanges(<{} ranges>)", self.0.len())
	}
}

/// First character of an NCName
#[derive(Debug, Clone, Copy)]
pub struct NCNameStart;

impl CharSelector for NCNameStart {
	fn select(&self, c: char) -> bool {
		CodepointRanges(NC_NAME_START_RANGES).select(c)
	}
}

/// Any non-first character of an NCName
#[derive(Debug, Clone, Copy)]
pub struct NCNameChar;

impl CharSelector for NCNameChar {
	fn select(&self, c: char) -> bool {
		// ASCII fast path; the bulk of real-world names never leaves it
		if c.is_ascii() {
			return c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.';
		}
		CodepointRanges(NC_NAME_START_RANGES).select(c)
			|| CodepointRanges(NC_NAME_EXTRA_RANGES).select(c)
	}
}

/// Valid first characters for an NCName
pub static CLASS_NCNAME_START: NCNameStart = NCNameStart;

/// Valid non-first characters for an NCName
pub static CLASS_NCNAME: NCNameChar = NCNameChar;

/// Valid XML 1.0 `Char`s
pub static CLASS_XML_CHAR: CodepointRanges = CodepointRanges(XML_CHAR_RANGES);

/// The `S` production (XML 1.0 § 2.3 \[3\])
pub static CLASS_XML_SPACES: &[char] = &[' ', '\t', '\r', '\n'];

/// Return true if `s` consists only of `S` characters (or is empty).
pub fn is_xml_whitespace(s: &str) -> bool {
	s.chars().all(|c| CLASS_XML_SPACES.select(c))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn colon_is_not_part_of_any_ncname_class() {
		assert!(!CLASS_NCNAME_START.select(':'));
		assert!(!CLASS_NCNAME.select(':'));
	}

	#[test]
	fn name_chars_include_name_start_chars() {
		for cp in 0x0..=0x10ffffu32 {
			if let Some(ch) = std::char::from_u32(cp) {
				if CLASS_NCNAME_START.select(ch) && !CLASS_NCNAME.select(ch) {
					panic!("U+{:x} may start a name but not continue one", cp)
				}
			}
		}
	}

	#[test]
	fn digits_and_dashes_only_continue_names() {
		for ch in &['0', '9', '-', '.', '\u{b7}'] {
			assert!(!CLASS_NCNAME_START.select(*ch));
			assert!(CLASS_NCNAME.select(*ch));
		}
	}

	#[test]
	fn control_chars_are_not_xml_chars() {
		assert!(!CLASS_XML_CHAR.select('\x00'));
		assert!(!CLASS_XML_CHAR.select('\x0b'));
		assert!(!CLASS_XML_CHAR.select('\u{fffe}'));
		assert!(CLASS_XML_CHAR.select('\t'));
		assert!(CLASS_XML_CHAR.select('\u{10ffff}'));
	}

	#[test]
	fn whitespace_detection() {
		assert!(is_xml_whitespace(""));
		assert!(is_xml_whitespace(" \r\n\t"));
		assert!(!is_xml_whitespace(" x "));
		assert!(!is_xml_whitespace("\u{a0}"));
	}
}
