/*!
# Lexer for restricted XML 1.0

The [`Lexer`] turns a complete UTF-8 string into [`RawToken`]s. Names are
still prefixed at this stage; resolving prefixes to namespace URIs is the
job of the [`NamespaceResolver`](crate::resolver::NamespaceResolver).

Entity and character references are expanded, CDATA sections are folded
into the surrounding text and line ends are normalised, so that the text in
a token is the logical character data. DTDs are not supported.
*/
use std::convert::TryFrom;

use crate::error::{Error, NWFError, Result, WFError};
use crate::selectors::{CharSelector, CLASS_NCNAME, CLASS_NCNAME_START, CLASS_XML_CHAR, CLASS_XML_SPACES};
use crate::strings::NCName;

const CDATA_START: &str = "<![CDATA[";
const CDATA_END: &str = "]]>";
const COMMENT_START: &str = "<!--";
const COMMENT_END: &str = "-->";
const PI_START: &str = "<?";
const PI_END: &str = "?>";

/// A name as it appears in the document, split at the colon.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawName {
	pub prefix: Option<NCName>,
	pub local_name: NCName,
}

impl RawName {
	/// Reassemble the name as it was written.
	pub fn to_written(&self) -> String {
		match self.prefix.as_ref() {
			Some(prefix) => self.local_name.with_prefix(prefix),
			None => self.local_name.to_string(),
		}
	}
}

/// A lexical unit of an XML document with unresolved prefixes.
#[derive(Debug, Clone, PartialEq)]
pub enum RawToken {
	/// A complete start tag.
	ElementHead {
		name: RawName,
		/// Attributes (including namespace declarations) in document order,
		/// with references expanded and whitespace normalised.
		attributes: Vec<(RawName, String)>,
		/// True for `<name/>`.
		empty: bool,
	},
	/// An end tag.
	ElementFoot(RawName),
	/// A run of character data, possibly spanning CDATA sections.
	Text(String),
	/// Comment content between `<!--` and `-->`.
	Comment(String),
}

fn split_name(raw: &str) -> Result<RawName> {
	let mut parts = raw.split(':');
	let first = parts.next().unwrap_or("");
	let second = parts.next();
	if parts.next().is_some() {
		return Err(NWFError::MultiColonName.into());
	}
	let (prefix, local_name) = match second {
		Some(local_name) => (Some(first), local_name),
		None => (None, first),
	};
	if local_name.is_empty() || prefix.map(str::is_empty).unwrap_or(false) {
		return Err(NWFError::EmptyNamePart.into());
	}
	let local_name = NCName::try_from(local_name).map_err(|_| NWFError::InvalidLocalName)?;
	let prefix = match prefix {
		Some(prefix) => Some(NCName::try_from(prefix).map_err(|_| NWFError::InvalidLocalName)?),
		None => None,
	};
	Ok(RawName { prefix, local_name })
}

/// Append character data from the document to `out`, normalising line ends
/// and (for attribute values) whitespace.
fn push_literal(segment: &str, attribute: bool, out: &mut String) -> Result<()> {
	let mut chars = segment.chars().peekable();
	while let Some(c) = chars.next() {
		match c {
			'\r' => {
				if chars.peek() == Some(&'\n') {
					chars.next();
				}
				out.push(if attribute { ' ' } else { '\n' });
			}
			'\n' | '\t' if attribute => out.push(' '),
			c if !CLASS_XML_CHAR.select(c) => {
				return Err(WFError::InvalidChar(c as u32, false).into())
			}
			c => out.push(c),
		}
	}
	Ok(())
}

/// Parse the digits of a character reference.
///
/// Only ASCII digits of the radix are allowed, so signs are rejected.
fn parse_codepoint(digits: &str, radix: u32) -> Result<u32> {
	if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
		return Err(WFError::InvalidSyntax("malformed character reference").into());
	}
	u32::from_str_radix(digits, radix)
		.map_err(|_| WFError::InvalidSyntax("malformed character reference").into())
}

fn resolve_reference(name: &str) -> Result<char> {
	let cp = if let Some(hex) = name.strip_prefix("#x") {
		parse_codepoint(hex, 16)?
	} else if let Some(dec) = name.strip_prefix('#') {
		parse_codepoint(dec, 10)?
	} else {
		return match name {
			"amp" => Ok('&'),
			"lt" => Ok('<'),
			"gt" => Ok('>'),
			"quot" => Ok('"'),
			"apos" => Ok('\''),
			_ if crate::strings::validate_ncname(name).is_ok() => Err(WFError::UndeclaredEntity.into()),
			_ => Err(WFError::InvalidSyntax("malformed entity reference").into()),
		};
	};
	match std::char::from_u32(cp) {
		Some(c) if CLASS_XML_CHAR.select(c) => Ok(c),
		_ => Err(WFError::InvalidChar(cp, true).into()),
	}
}

/// Expand all references in `raw` into `out`.
fn expand(raw: &str, attribute: bool, out: &mut String) -> Result<()> {
	let mut rest = raw;
	while let Some(amp) = rest.find('&') {
		push_literal(&rest[..amp], attribute, out)?;
		rest = &rest[amp + 1..];
		let semicolon = rest
			.find(';')
			.ok_or(WFError::InvalidSyntax("unterminated reference"))?;
		out.push(resolve_reference(&rest[..semicolon])?);
		rest = &rest[semicolon + 1..];
	}
	push_literal(rest, attribute, out)
}

/**
# Restricted XML 1.0 lexer

The lexer works on a complete `&str`; the decoder reads byte sources to
the end and checks UTF-8 up front before creating one.

```rust
use nsdom::lexer::{Lexer, RawToken};

let mut lexer = Lexer::new("<a x='1'>hi &amp; bye</a>");
match lexer.lex().unwrap() {
	Some(RawToken::ElementHead { name, attributes, empty }) => {
		assert_eq!(name.local_name, "a");
		assert_eq!(attributes[0].1, "1");
		assert!(!empty);
	}
	other => panic!("unexpected token: {:?}", other),
}
assert_eq!(lexer.lex().unwrap(), Some(RawToken::Text("hi & bye".to_string())));
```
*/
pub struct Lexer<'x> {
	input: &'x str,
	pos: usize,
	at_start: bool,
}

impl<'x> Lexer<'x> {
	pub fn new(input: &'x str) -> Self {
		Self {
			input: input.strip_prefix('\u{feff}').unwrap_or(input),
			pos: 0,
			at_start: true,
		}
	}

	fn rest(&self) -> &'x str {
		let input = self.input;
		&input[self.pos..]
	}

	fn peek(&self) -> Option<char> {
		self.rest().chars().next()
	}

	fn skip_spaces(&mut self) -> bool {
		let rest = self.rest();
		let trimmed = rest.trim_start_matches(CLASS_XML_SPACES);
		self.pos += rest.len() - trimmed.len();
		rest.len() != trimmed.len()
	}

	fn expect(&mut self, ch: char, ctx: &'static str) -> Result<()> {
		match self.peek() {
			Some(c) if c == ch => {
				self.pos += c.len_utf8();
				Ok(())
			}
			Some(c) => Err(WFError::UnexpectedChar(ctx, c).into()),
			None => Err(WFError::InvalidEof(ctx).into()),
		}
	}

	/// Consume everything up to and including `delim`, returning what came
	/// before it.
	fn take_until(&mut self, delim: &str, ctx: &'static str) -> Result<&'x str> {
		let rest = self.rest();
		let end = rest.find(delim).ok_or(WFError::InvalidEof(ctx))?;
		self.pos += end + delim.len();
		Ok(&rest[..end])
	}

	fn take_name(&mut self, ctx: &'static str) -> Result<RawName> {
		let rest = self.rest();
		match rest.chars().next() {
			None => return Err(WFError::InvalidEof(ctx).into()),
			Some(c) if c != ':' && !CLASS_NCNAME_START.select(c) => {
				return Err(WFError::UnexpectedChar(ctx, c).into())
			}
			Some(_) => (),
		}
		let end = rest
			.find(|c: char| c != ':' && !CLASS_NCNAME.select(c))
			.unwrap_or_else(|| rest.len());
		self.pos += end;
		split_name(&rest[..end])
	}

	/// Return the next token, or `None` at the end of the input.
	pub fn lex(&mut self) -> Result<Option<RawToken>> {
		loop {
			let rest = self.rest();
			if rest.is_empty() {
				return Ok(None);
			}
			let at_start = self.at_start;
			self.at_start = false;
			if !rest.starts_with('<') || rest.starts_with(CDATA_START) {
				return self.lex_text().map(Some);
			}
			if rest.starts_with(COMMENT_START) {
				self.pos += COMMENT_START.len();
				return self.lex_comment().map(Some);
			}
			if rest.starts_with(PI_START) {
				self.pos += PI_START.len();
				self.skip_processing_instruction(at_start)?;
				continue;
			}
			if rest.starts_with("<!DOCTYPE") {
				return Err(Error::RestrictedXml("document type declarations"));
			}
			if rest.starts_with("<!") {
				return Err(WFError::InvalidSyntax("unknown markup declaration").into());
			}
			if rest.starts_with("</") {
				self.pos += 2;
				return self.lex_element_foot().map(Some);
			}
			self.pos += 1;
			return self.lex_element_head().map(Some);
		}
	}

	fn lex_text(&mut self) -> Result<RawToken> {
		let mut text = String::new();
		loop {
			let rest = self.rest();
			if let Some(after) = rest.strip_prefix(CDATA_START) {
				let end = after
					.find(CDATA_END)
					.ok_or(WFError::InvalidEof("in CDATA section"))?;
				push_literal(&after[..end], false, &mut text)?;
				self.pos += CDATA_START.len() + end + CDATA_END.len();
				continue;
			}
			let end = rest.find('<').unwrap_or_else(|| rest.len());
			if end == 0 {
				break;
			}
			let raw = &rest[..end];
			if raw.contains(CDATA_END) {
				return Err(WFError::InvalidSyntax("']]>' in character data").into());
			}
			expand(raw, false, &mut text)?;
			self.pos += end;
		}
		Ok(RawToken::Text(text))
	}

	fn lex_comment(&mut self) -> Result<RawToken> {
		let body = self.take_until(COMMENT_END, "in comment")?;
		if body.contains("--") || body.ends_with('-') {
			return Err(WFError::InvalidSyntax("'--' in comment").into());
		}
		let mut text = String::with_capacity(body.len());
		push_literal(body, false, &mut text)?;
		Ok(RawToken::Comment(text))
	}

	fn skip_processing_instruction(&mut self, at_start: bool) -> Result<()> {
		let target = self.take_name("in processing instruction")?;
		if target.prefix.is_none() && target.local_name.eq_ignore_ascii_case("xml") {
			if !at_start || target.local_name != "xml" {
				return Err(WFError::InvalidSyntax("XML declaration not at start of document").into());
			}
		}
		let body = self.take_until(PI_END, "in processing instruction")?;
		if !body.is_empty() && !body.starts_with(CLASS_XML_SPACES) {
			return Err(WFError::InvalidSyntax("processing instruction target").into());
		}
		tracing::trace!(pi = %target.to_written(), "skipped processing instruction");
		Ok(())
	}

	fn lex_element_foot(&mut self) -> Result<RawToken> {
		let name = self.take_name("in element foot")?;
		self.skip_spaces();
		self.expect('>', "in element foot")?;
		Ok(RawToken::ElementFoot(name))
	}

	fn lex_element_head(&mut self) -> Result<RawToken> {
		let name = self.take_name("in element head")?;
		let mut attributes: Vec<(RawName, String)> = Vec::new();
		loop {
			let had_space = self.skip_spaces();
			match self.peek() {
				None => return Err(WFError::InvalidEof("in element head").into()),
				Some('>') => {
					self.pos += 1;
					return Ok(RawToken::ElementHead {
						name,
						attributes,
						empty: false,
					});
				}
				Some('/') => {
					self.pos += 1;
					self.expect('>', "after '/' in element head")?;
					return Ok(RawToken::ElementHead {
						name,
						attributes,
						empty: true,
					});
				}
				Some(c) if !had_space => {
					return Err(WFError::UnexpectedChar("in element head, expected whitespace", c).into())
				}
				Some(_) => (),
			}
			let attr_name = self.take_name("in attribute name")?;
			self.skip_spaces();
			self.expect('=', "after attribute name")?;
			self.skip_spaces();
			let value = self.lex_attribute_value()?;
			if attributes.iter().any(|(existing, _)| *existing == attr_name) {
				return Err(WFError::DuplicateAttribute.into());
			}
			attributes.push((attr_name, value));
		}
	}

	fn lex_attribute_value(&mut self) -> Result<String> {
		let quote = match self.peek() {
			Some(c @ '"') | Some(c @ '\'') => c,
			Some(c) => return Err(WFError::UnexpectedChar("at start of attribute value", c).into()),
			None => return Err(WFError::InvalidEof("at start of attribute value").into()),
		};
		self.pos += 1;
		let rest = self.rest();
		let end = rest.find(quote).ok_or(WFError::InvalidEof("in attribute value"))?;
		let raw = &rest[..end];
		if raw.contains('<') {
			return Err(WFError::UnexpectedChar("in attribute value", '<').into());
		}
		let mut value = String::with_capacity(raw.len());
		expand(raw, true, &mut value)?;
		self.pos += end + 1;
		Ok(value)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn lex_all(input: &str) -> Result<Vec<RawToken>> {
		let mut lexer = Lexer::new(input);
		let mut out = Vec::new();
		while let Some(tok) = lexer.lex()? {
			out.push(tok);
		}
		Ok(out)
	}

	fn name(s: &str) -> RawName {
		split_name(s).unwrap()
	}

	#[test]
	fn lexes_element_with_prefixed_attribute() {
		let toks = lex_all("<svg:rect xlink:href=\"#a\" x='1'/>").unwrap();
		assert_eq!(
			toks,
			vec![RawToken::ElementHead {
				name: name("svg:rect"),
				attributes: vec![
					(name("xlink:href"), "#a".to_string()),
					(name("x"), "1".to_string())
				],
				empty: true,
			}]
		);
	}

	#[test]
	fn skips_declaration_and_processing_instructions() {
		let toks = lex_all("<?xml version=\"1.0\"?><?php echo 1; ?><a></a>").unwrap();
		assert_eq!(toks.len(), 2);
		match &toks[1] {
			RawToken::ElementFoot(n) => assert_eq!(n.local_name, "a"),
			other => panic!("unexpected token: {:?}", other),
		}
	}

	#[test]
	fn rejects_late_declaration() {
		match lex_all("<a/><?xml version='1.0'?>") {
			Err(Error::NotWellFormed(WFError::InvalidSyntax(_))) => (),
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn rejects_doctype() {
		match lex_all("<!DOCTYPE html><html/>") {
			Err(Error::RestrictedXml(_)) => (),
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn expands_references() {
		let toks = lex_all("<a>&lt;&#x41;&#66;&quot;&apos;&gt;</a>").unwrap();
		assert_eq!(toks[1], RawToken::Text("<AB\"'>".to_string()));
	}

	#[test]
	fn rejects_undeclared_entity() {
		match lex_all("<a>&nbsp;</a>") {
			Err(Error::NotWellFormed(WFError::UndeclaredEntity)) => (),
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn rejects_malformed_character_references() {
		for input in &[
			"<a>&#+65;</a>",
			"<a>&#x+42;</a>",
			"<a>&#-1;</a>",
			"<a>&#;</a>",
			"<a>&#x;</a>",
			"<a>&#x4g;</a>",
			"<a>&#X41;</a>",
			"<a>&#99999999999;</a>",
		] {
			match lex_all(input) {
				Err(Error::NotWellFormed(WFError::InvalidSyntax(_))) => (),
				other => panic!("unexpected result for {:?}: {:?}", input, other),
			}
		}
	}

	#[test]
	fn rejects_reference_to_invalid_char() {
		match lex_all("<a>&#0;</a>") {
			Err(Error::NotWellFormed(WFError::InvalidChar(0, true))) => (),
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn merges_cdata_into_text() {
		let toks = lex_all("<a>x<![CDATA[<&>]]>y</a>").unwrap();
		assert_eq!(toks[1], RawToken::Text("x<&>y".to_string()));
		assert_eq!(toks.len(), 3);
	}

	#[test]
	fn rejects_cdata_end_in_text() {
		match lex_all("<a>]]></a>") {
			Err(Error::NotWellFormed(WFError::InvalidSyntax(_))) => (),
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn normalises_line_ends_in_text() {
		let toks = lex_all("<a>x\r\ny\rz</a>").unwrap();
		assert_eq!(toks[1], RawToken::Text("x\ny\nz".to_string()));
	}

	#[test]
	fn normalises_whitespace_in_attribute_values() {
		let toks = lex_all("<a v='x\r\ny\tz&#10;'/>").unwrap();
		match &toks[0] {
			RawToken::ElementHead { attributes, .. } => assert_eq!(attributes[0].1, "x y z\n"),
			other => panic!("unexpected token: {:?}", other),
		}
	}

	#[test]
	fn lexes_comments() {
		let toks = lex_all("<!-- a --><a/>").unwrap();
		assert_eq!(toks[0], RawToken::Comment(" a ".to_string()));
	}

	#[test]
	fn rejects_double_dash_in_comment() {
		for input in &["<!-- a -- b --><a/>", "<!-- a ---><a/>"] {
			match lex_all(input) {
				Err(Error::NotWellFormed(WFError::InvalidSyntax(_))) => (),
				other => panic!("unexpected result for {:?}: {:?}", input, other),
			}
		}
	}

	#[test]
	fn rejects_duplicate_attributes() {
		match lex_all("<a x='1' x='2'/>") {
			Err(Error::NotWellFormed(WFError::DuplicateAttribute)) => (),
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn rejects_lt_in_attribute_value() {
		match lex_all("<a x='<'/>") {
			Err(Error::NotWellFormed(WFError::UnexpectedChar(_, '<'))) => (),
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn requires_whitespace_between_attributes() {
		match lex_all("<a x='1'y='2'/>") {
			Err(Error::NotWellFormed(WFError::UnexpectedChar(_, 'y'))) => (),
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn truncated_input_is_invalid_eof() {
		for input in &["<a", "<a x='1", "<!-- x", "<a><![CDATA[x", "</a"] {
			match lex_all(input) {
				Err(Error::NotWellFormed(WFError::InvalidEof(_))) => (),
				other => panic!("unexpected result for {:?}: {:?}", input, other),
			}
		}
	}

	#[test]
	fn name_errors() {
		match lex_all("<a:b:c/>") {
			Err(Error::NotNamespaceWellFormed(NWFError::MultiColonName)) => (),
			other => panic!("unexpected result: {:?}", other),
		}
		match lex_all("<a:/>") {
			Err(Error::NotNamespaceWellFormed(NWFError::EmptyNamePart)) => (),
			other => panic!("unexpected result: {:?}", other),
		}
		match lex_all("<:a/>") {
			Err(Error::NotNamespaceWellFormed(NWFError::EmptyNamePart)) => (),
			other => panic!("unexpected result: {:?}", other),
		}
		match lex_all("<a:1b/>") {
			Err(Error::NotNamespaceWellFormed(NWFError::InvalidLocalName)) => (),
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn rejects_invalid_chars_in_text() {
		match lex_all("<a>\x01</a>") {
			Err(Error::NotWellFormed(WFError::InvalidChar(1, false))) => (),
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[test]
	fn skips_byte_order_mark() {
		let toks = lex_all("\u{feff}<?xml version='1.0'?><a/>").unwrap();
		assert_eq!(toks.len(), 1);
	}
}
