use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use nsdom::{Document, EncodeOptions, Encoder, Indent};

const SVG: &str = "http://www.w3.org/2000/svg";
const XLINK: &str = "http://www.w3.org/1999/xlink";

fn table(rows: usize) -> Document {
	let mut doc = Document::new("table", "").unwrap();
	let root = doc.root();
	let tbody = doc.create_element("tbody", "").unwrap();
	doc.add_child(root, tbody).unwrap();
	for i in 0..rows {
		let tr = doc.create_element("tr", "").unwrap();
		for j in 0..4 {
			let td = doc.create_element("td", "").unwrap();
			let text = doc.create_text(format!("{} & {}", i, j)).unwrap();
			doc.add_child(td, text).unwrap();
			doc.add_child(tr, td).unwrap();
		}
		doc.add_child(tbody, tr).unwrap();
	}
	doc
}

fn drawing(shapes: usize) -> String {
	let mut doc = Document::new("svg", SVG).unwrap();
	let root = doc.root();
	doc.set_attribute(root, "version", "", "1.1").unwrap();
	let title = doc.create_element("title", SVG).unwrap();
	let text = doc.create_text("benchmark").unwrap();
	doc.add_child(title, text).unwrap();
	doc.add_child(root, title).unwrap();
	for i in 0..shapes {
		let u = doc.create_element("use", SVG).unwrap();
		doc.set_attribute(u, "id", "", format!("u{}", i)).unwrap();
		doc.set_attribute(u, "href", XLINK, "#dot").unwrap();
		doc.set_attribute(u, "x", "", i.to_string()).unwrap();
		doc.set_attribute(u, "style", "", "fill:#f00;stroke:none").unwrap();
		doc.add_child(root, u).unwrap();
	}
	doc.to_xml_string(&EncodeOptions::new().with_indent(Indent::TwoSpaces))
		.unwrap()
}

fn encode(c: &mut Criterion) {
	let mut group = c.benchmark_group("encode table");
	for rows in [10usize, 100, 1000].iter() {
		let doc = table(*rows);
		let encoder = Encoder::new(EncodeOptions::new().with_indent(Indent::Tabs));
		group.bench_with_input(BenchmarkId::new("Encoder::encode_to_bytes", rows), &doc, |b, doc| {
			b.iter(|| encoder.encode_to_bytes(black_box(doc)).unwrap().len())
		});
	}
	group.finish();
}

fn decode(c: &mut Criterion) {
	let mut group = c.benchmark_group("decode drawing");
	for shapes in [10usize, 100, 1000].iter() {
		let xml = drawing(*shapes);
		group.bench_with_input(BenchmarkId::new("Document::parse_str", shapes), &xml, |b, xml| {
			b.iter(|| Document::parse_str(black_box(xml)).unwrap().node_count())
		});
	}
	group.finish();
}

fn nested(c: &mut Criterion) {
	let mut group = c.benchmark_group("nested");
	for depth in [100usize, 10_000].iter() {
		let xml = format!("{}{}", "<a>".repeat(*depth), "</a>".repeat(*depth));
		group.bench_with_input(BenchmarkId::new("decode and encode", depth), &xml, |b, xml| {
			b.iter(|| {
				Document::parse_str(black_box(xml))
					.unwrap()
					.to_xml_string(&EncodeOptions::new())
					.unwrap()
					.len()
			})
		});
	}
	group.finish();
}

fn mutate(c: &mut Criterion) {
	c.bench_function("rotate children", |b| {
		b.iter(|| {
			let mut doc = table(100);
			let tbody = doc.first_child(doc.root()).unwrap();
			let rows: Vec<_> = doc.children(tbody).collect();
			for row in rows {
				doc.add_child(tbody, row).unwrap();
			}
			doc.children(tbody).count()
		})
	});
}

criterion_group!(benches, encode, decode, nested, mutate);
criterion_main!(benches);
