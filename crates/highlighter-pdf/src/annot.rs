//! Writing `/Highlight` annotations with lopdf.

use highlighter_core::{Highlight, Quad, Rect};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};

/// Add one highlight annotation to `page_id`.
///
/// `quads` are already in user space. The annotation carries its own
/// appearance stream, so viewers do not have to synthesize one.
pub fn write_highlight(
    doc: &mut Document,
    page_id: ObjectId,
    quads: &[Quad],
    highlight: &Highlight,
) -> lopdf::Result<ObjectId> {
    let rect = enclosing_rect(quads);
    let appearance = doc.add_object(appearance_stream(&rect, quads, highlight));

    let mut annot = dictionary! {
        "Type" => "Annot",
        "Subtype" => "Highlight",
        "Rect" => rect_array(&rect),
        "QuadPoints" => quad_points(quads),
        "C" => color_array(highlight),
        "CA" => Object::Real(highlight.opacity),
        // print
        "F" => 4,
        "P" => Object::Reference(page_id),
        "NM" => text_string(&highlight.name),
        "AP" => dictionary! { "N" => Object::Reference(appearance) },
    };
    if let Some(contents) = &highlight.contents {
        annot.set("Contents", text_string(contents));
    }
    if let Some(author) = &highlight.author {
        annot.set("T", text_string(author));
    }

    let annot_id = doc.add_object(annot);
    attach_to_page(doc, page_id, annot_id)?;
    Ok(annot_id)
}

fn enclosing_rect(quads: &[Quad]) -> Rect {
    let mut rects = quads.iter().map(Quad::bounds);
    let first = rects.next().unwrap_or_default();
    rects.fold(first, |acc, r| acc.union(&r))
}

fn rect_array(r: &Rect) -> Object {
    Object::Array(vec![
        Object::Real(r.x0),
        Object::Real(r.y0),
        Object::Real(r.x1),
        Object::Real(r.y1),
    ])
}

/// Eight numbers per quad in the order viewers expect: upper-left,
/// upper-right, lower-left, lower-right.
fn quad_points(quads: &[Quad]) -> Object {
    Object::Array(
        quads
            .iter()
            .flat_map(|q| q.corners())
            .flat_map(|p| [Object::Real(p.x), Object::Real(p.y)])
            .collect(),
    )
}

fn color_array(highlight: &Highlight) -> Object {
    Object::Array(
        highlight
            .color
            .components()
            .into_iter()
            .map(Object::Real)
            .collect(),
    )
}

/// Form XObject filling each quad with the highlight color, multiplied onto
/// the page so the text underneath stays readable.
fn appearance_stream(bbox: &Rect, quads: &[Quad], highlight: &Highlight) -> Stream {
    let [r, g, b] = highlight.color.components();
    let mut ops = format!("/GS0 gs\n{:.4} {:.4} {:.4} rg\n", r, g, b);
    for q in quads {
        // ul → ur → lr → ll traces the outline without crossing
        ops.push_str(&format!(
            "{:.3} {:.3} m {:.3} {:.3} l {:.3} {:.3} l {:.3} {:.3} l h f\n",
            q.ul.x, q.ul.y, q.ur.x, q.ur.y, q.lr.x, q.lr.y, q.ll.x, q.ll.y
        ));
    }

    let gs = dictionary! {
        "Type" => "ExtGState",
        "BM" => "Multiply",
        "ca" => Object::Real(highlight.opacity),
        "CA" => Object::Real(highlight.opacity),
    };
    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Form",
        "BBox" => rect_array(bbox),
        "Resources" => dictionary! {
            "ExtGState" => dictionary! { "GS0" => gs },
        },
    };
    Stream::new(dict, ops.into_bytes())
}

/// PDF text string: literal for ASCII, UTF-16BE with BOM otherwise.
fn text_string(s: &str) -> Object {
    if s.is_ascii() {
        return Object::String(s.as_bytes().to_vec(), StringFormat::Literal);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in s.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// Append `annot_id` to the page's `/Annots`, which may be inline, an
/// indirect array, or absent.
fn attach_to_page(doc: &mut Document, page_id: ObjectId, annot_id: ObjectId) -> lopdf::Result<()> {
    enum Annots {
        Inline,
        Indirect(ObjectId),
        Missing,
    }

    let page: &Dictionary = doc.get_object(page_id)?.as_dict()?;
    let existing = match page.get(b"Annots") {
        Ok(Object::Array(_)) => Annots::Inline,
        Ok(Object::Reference(id)) => Annots::Indirect(*id),
        _ => Annots::Missing,
    };

    let entry = Object::Reference(annot_id);
    match existing {
        Annots::Inline => {
            doc.get_object_mut(page_id)?
                .as_dict_mut()?
                .get_mut(b"Annots")?
                .as_array_mut()?
                .push(entry);
        }
        Annots::Indirect(id) => {
            doc.get_object_mut(id)?.as_array_mut()?.push(entry);
        }
        Annots::Missing => {
            doc.get_object_mut(page_id)?
                .as_dict_mut()?
                .set("Annots", Object::Array(vec![entry]));
        }
    }
    Ok(())
}
