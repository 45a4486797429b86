use std::path::Path;

use lopdf::{Document, Object, Stream, dictionary};

use highlighter_core::phrases::MockPhraseSource;
use highlighter_core::{
    Color, DocumentError, HighlightOptions, PdfDocument, highlight_document,
};
use highlighter_pdf::PdfFile;

/// Write a PDF with one Helvetica text block per page. Lines start at
/// (72, 700) in user space and step down 14pt.
fn write_pdf(path: &Path, pages: &[&[&str]], rotate: i64) {
    write_pdf_with(path, pages, rotate, 1.0);
}

fn write_pdf_with(path: &Path, pages: &[&[&str]], rotate: i64, user_unit: f32) {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids = Vec::new();
    for lines in pages {
        let mut ops = String::from("BT /F1 12 Tf 14 TL 72 700 Td\n");
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                ops.push_str("T*\n");
            }
            ops.push_str(&format!("({}) Tj\n", line));
        }
        ops.push_str("ET\n");
        let content_id = doc.add_object(Stream::new(dictionary! {}, ops.into_bytes()));
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "Contents" => Object::Reference(content_id),
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => Object::Reference(font_id) },
            },
        };
        if user_unit != 1.0 {
            page.set("UserUnit", Object::Real(user_unit));
        }
        let page_id = doc.add_object(page);
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Rotate" => rotate,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));
    doc.save(path).unwrap();
}

struct SavedHighlight {
    page: usize,
    contents: String,
    color: Vec<f32>,
    rect: Vec<f32>,
    quad_points: usize,
}

fn saved_highlights(path: &Path) -> Vec<SavedHighlight> {
    let doc = Document::load(path).unwrap();
    let mut out = Vec::new();
    for (n, (_, page_id)) in doc.get_pages().into_iter().enumerate() {
        let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
        let Ok(annots) = page.get(b"Annots") else {
            continue;
        };
        for entry in annots.as_array().unwrap() {
            let annot = doc
                .get_object(entry.as_reference().unwrap())
                .unwrap()
                .as_dict()
                .unwrap();
            if annot.get(b"Subtype").unwrap().as_name().unwrap() != b"Highlight" {
                continue;
            }
            let floats = |key: &[u8]| -> Vec<f32> {
                annot
                    .get(key)
                    .unwrap()
                    .as_array()
                    .unwrap()
                    .iter()
                    .map(|o| o.as_float().unwrap())
                    .collect()
            };
            let contents = match annot.get(b"Contents") {
                Ok(Object::String(bytes, _)) => String::from_utf8_lossy(bytes).into_owned(),
                _ => String::new(),
            };
            out.push(SavedHighlight {
                page: n,
                contents,
                color: floats(b"C"),
                rect: floats(b"Rect"),
                quad_points: floats(b"QuadPoints").len(),
            });
        }
    }
    out
}

#[test]
fn extracts_positioned_text() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.pdf");
    write_pdf(&input, &[&["Hello transformer world."], &["Second page."]], 0);

    let doc = PdfFile::open(&input).unwrap();
    assert_eq!(doc.page_count().unwrap(), 2);
    let page = doc.page_text(0).unwrap();
    assert!(page.plain_text().contains("Hello transformer world."));
    assert!(page.bounds.width() > 600.0);
    assert!(matches!(
        doc.page_text(2),
        Err(DocumentError::PageOutOfRange { index: 2, count: 2 })
    ));
}

#[test]
fn missing_input_is_an_open_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = PdfFile::open(&dir.path().join("nope.pdf")).unwrap_err();
    assert!(matches!(err, DocumentError::Open(_)));
}

#[test]
fn closed_file_rejects_operations() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.pdf");
    write_pdf(&input, &[&["text"]], 0);

    let mut doc = PdfFile::open(&input).unwrap();
    doc.close();
    assert!(doc.is_closed());
    assert!(matches!(doc.page_count(), Err(DocumentError::Closed)));
    assert!(matches!(
        doc.save(&dir.path().join("out.pdf")),
        Err(DocumentError::Closed)
    ));
}

async fn run(input: &Path, output: &Path, phrases: &[&str]) -> highlighter_core::HighlightReport {
    let source = MockPhraseSource::returning(phrases);
    highlight_document(
        PdfFile::open(input).unwrap(),
        output,
        &source,
        &HighlightOptions::default(),
        |_| {},
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn highlights_land_on_the_right_pages() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.pdf");
    let output = dir.path().join("out.pdf");
    write_pdf(
        &input,
        &[&["Nothing here."], &["architecture matters."], &["Nothing here."]],
        0,
    );

    let report = run(&input, &output, &[]).await;
    assert_eq!(report.per_page, vec![0, 1, 0]);

    let saved = saved_highlights(&output);
    assert_eq!(saved.len(), 1);
    let hl = &saved[0];
    assert_eq!(hl.page, 1);
    assert_eq!(hl.contents, "architecture");
    assert_eq!(hl.color, Color::GREEN.components().to_vec());
    assert_eq!(hl.quad_points, 8);

    // text starts at x=72 with its baseline at y=700
    assert!((hl.rect[0] - 72.0).abs() < 1.0, "rect {:?}", hl.rect);
    assert!(hl.rect[1] < 700.5 && hl.rect[1] > 690.0, "rect {:?}", hl.rect);
    assert!(hl.rect[3] > 706.0 && hl.rect[3] < 720.0, "rect {:?}", hl.rect);

    // page count unchanged
    assert_eq!(Document::load(&output).unwrap().get_pages().len(), 3);
}

#[tokio::test]
async fn rotated_page_maps_back_to_user_space() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.pdf");
    let output = dir.path().join("out.pdf");
    write_pdf(&input, &[&["architecture matters."]], 90);

    run(&input, &output, &[]).await;

    let saved = saved_highlights(&output);
    assert_eq!(saved.len(), 1);
    let rect = &saved[0].rect;
    assert!((rect[0] - 72.0).abs() < 1.0, "rect {:?}", rect);
    assert!(rect[1] < 700.5 && rect[3] > 706.0, "rect {:?}", rect);
}

#[tokio::test]
async fn user_unit_scaled_page_maps_back_to_user_space() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.pdf");
    let output = dir.path().join("out.pdf");
    write_pdf_with(&input, &[&["architecture matters."]], 0, 2.0);

    run(&input, &output, &[]).await;

    let saved = saved_highlights(&output);
    assert_eq!(saved.len(), 1);
    let rect = &saved[0].rect;
    assert!((rect[0] - 72.0).abs() < 1.0, "rect {:?}", rect);
    assert!(rect[1] < 700.5 && rect[1] > 690.0, "rect {:?}", rect);
    assert!(rect[3] > 706.0 && rect[3] < 720.0, "rect {:?}", rect);
}

#[tokio::test]
async fn hyphenated_term_becomes_one_two_fragment_highlight() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.pdf");
    let output = dir.path().join("out.pdf");
    write_pdf(&input, &[&["The trans-", "former works."]], 0);

    let report = run(&input, &output, &[]).await;
    let hits: Vec<_> = report
        .records
        .iter()
        .filter(|r| r.term == "transformer")
        .collect();
    assert_eq!(hits.len(), 1);

    let saved = saved_highlights(&output);
    let hl = saved.iter().find(|h| h.contents == "transformer").unwrap();
    assert_eq!(hl.quad_points, 16);
}

#[tokio::test]
async fn output_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.pdf");
    write_pdf(
        &input,
        &[&["A transformer model with attention."], &["Benchmark results."]],
        0,
    );

    let a = run(&input, &dir.path().join("a.pdf"), &["attention"]).await;
    let b = run(&input, &dir.path().join("b.pdf"), &["attention"]).await;
    assert_eq!(a.records, b.records);
    assert_eq!(
        saved_highlights(&dir.path().join("a.pdf")).len(),
        a.total_annotations()
    );
}
