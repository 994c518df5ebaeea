//! The Adobe XMP / Extended-XMP split-merge codec: the part of this
//! crate where most of the engineering lives.
//!
//! On write, an oversize XMP document is shrunk to fit a single `APP1`
//! XMP segment by greedily relocating bulky content into one or more
//! *extended* documents, each fingerprinted with an MD5 digest and
//! chunked into offset-addressed `APP1` Extended-XMP segments. On read,
//! the inverse: extended portions are grouped by fingerprint, verified
//! for contiguity and digest, and merged back into the base document.

use std::collections::HashMap;

use crate::config::XmpCodecOptions;
use crate::error::{Error, Result};
use crate::key::SegmentKey;
use crate::metadata::JfifMetadata;
use crate::segments::{ExifApp1, ExtendedXmpApp1, JfifApp0, JfxxApp0, Segment, XmpApp1};
use crate::xmp::dom::{attribute_byte_len, Element, Node, XmpDocument};

const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
const X_NS: &str = "adobe:ns:meta/";
const XMP_NOTE_NS: &str = "http://ns.adobe.com/xmp/note/";
const CAMERA_RAW_NS: &str = "http://ns.adobe.com/camera-raw-settings/1.0/";
const PHOTOSHOP_NS: &str = "http://ns.adobe.com/photoshop/1.0/";
const IMG_NS: &str = "http://ns.adobe.com/xap/1.0/g/img/";

fn xmp_key() -> SegmentKey {
    XmpApp1::TEMPLATE.key()
}

fn extended_key() -> SegmentKey {
    ExtendedXmpApp1::TEMPLATE.key()
}

fn toolkit_name() -> String {
    format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

fn md5_hex_upper(bytes: &[u8]) -> String {
    let digest = md5::compute(bytes);
    digest.0.iter().map(|b| format!("{b:02X}")).collect()
}

/// Strips a `<?xpacket begin=...?> ... <?xpacket end=...?>` wrapper,
/// tolerating arbitrary attributes on either processing instruction.
/// Text with no xpacket wrapper at all is returned trimmed, unchanged.
fn strip_xpacket(raw: &str) -> String {
    let begin = raw.find("<?xpacket");
    let end = raw.rfind("<?xpacket");
    if let (Some(begin), Some(end)) = (begin, end) {
        if end > begin {
            if let Some(pi_end) = raw[begin..].find("?>") {
                let body_start = begin + pi_end + 2;
                if body_start <= end {
                    return raw[body_start..end].trim().to_string();
                }
            }
        }
    }
    raw.trim().to_string()
}

fn find_child_index(element: &Element, pred: impl Fn(&Element) -> bool) -> Option<usize> {
    element
        .children
        .iter()
        .position(|n| matches!(n, Node::Element(e) if pred(e)))
}

fn as_element_mut(node: &mut Node) -> Option<&mut Element> {
    match node {
        Node::Element(e) => Some(e),
        Node::Text(_) => None,
    }
}

fn rdf_index(root: &Element) -> Result<usize> {
    find_child_index(root, |e| e.name.matches(Some(RDF_NS), "RDF")).ok_or_else(|| {
        Error::BadXmpRoot {
            reason: "missing rdf:RDF child of x:xmpmeta".to_string(),
        }
    })
}

fn validate_xmp_root(doc: &XmpDocument) -> Result<()> {
    if !doc.root.name.matches(Some(X_NS), "xmpmeta") {
        return Err(Error::BadXmpRoot {
            reason: format!(
                "XMP root element must be {{{X_NS}}}xmpmeta, found {{{:?}}}{}",
                doc.root.name.uri, doc.root.name.local
            ),
        });
    }
    let children: Vec<&Element> = doc.root.child_elements().collect();
    if children.len() != 1 || !children[0].name.matches(Some(RDF_NS), "RDF") {
        return Err(Error::BadXmpRoot {
            reason: "x:xmpmeta must have exactly one rdf:RDF child element".to_string(),
        });
    }
    Ok(())
}

/// Builds a bare `<x:xmpmeta><rdf:RDF><rdf:Description/></rdf:RDF></x:xmpmeta>`
/// skeleton, the container an extended document is assembled into the
/// first time anything is moved out of a given base description.
fn make_extended_skeleton() -> Element {
    let mut root = Element::new(Some(X_NS), Some("x"), "xmpmeta");
    root.set_attribute("x", X_NS, "xmptk", toolkit_name());
    root.namespace_decls.push((Some("x".to_string()), X_NS.to_string()));
    let mut rdf = Element::new(Some(RDF_NS), Some("rdf"), "RDF");
    rdf.namespace_decls
        .push((Some("rdf".to_string()), RDF_NS.to_string()));
    rdf.add_child(Element::new(Some(RDF_NS), Some("rdf"), "Description"));
    root.add_child(rdf);
    root
}

/// Navigates a skeleton built by [`make_extended_skeleton`] to its
/// single `rdf:Description`.
fn extended_description_mut(extended: &mut Element) -> &mut Element {
    let Node::Element(rdf) = &mut extended.children[0] else {
        unreachable!("extended skeleton always has rdf:RDF as its sole child")
    };
    let Node::Element(description) = &mut rdf.children[0] else {
        unreachable!("extended skeleton's rdf:RDF always has rdf:Description as its sole child")
    };
    description
}

// ---------------------------------------------------------------------
// Deserialize
// ---------------------------------------------------------------------

/// Recovers the logical XMP document from `metadata`: the base `APP1`
/// XMP packet with xpacket wrapper stripped, merged with any
/// Extended-XMP portions found and verified. Returns `None` if there is
/// no (non-empty) base XMP packet.
pub fn deserialize_xmp(
    metadata: &JfifMetadata,
    options: XmpCodecOptions,
) -> Result<Option<String>> {
    let Some((Segment::XmpApp1(xmp), _)) = metadata.find_first(&xmp_key()) else {
        return Ok(None);
    };
    let base_body = strip_xpacket(&xmp.packet);
    if base_body.is_empty() {
        return Ok(None);
    }

    let mut groups: HashMap<String, Vec<&ExtendedXmpApp1>> = HashMap::new();
    for segment in metadata.find_all(&extended_key()) {
        if let Segment::ExtendedXmpApp1(portion) = segment {
            groups
                .entry(portion.full_md5_fingerprint.clone())
                .or_default()
                .push(portion);
        }
    }

    let mut extended_docs: HashMap<String, String> = HashMap::new();
    for (fingerprint, mut portions) in groups {
        portions.sort_by_key(|p| p.starting_offset);
        let full_length = portions[0].full_length;
        if full_length > crate::config::MAX_EXTENDED_XMP_FULL_LENGTH {
            if options.throw_on_invalid_samples {
                return Err(Error::BadExtendedXmp {
                    reason: format!(
                        "Extended-XMP group {fingerprint} declares full_length {full_length}, exceeding the {}-byte limit",
                        crate::config::MAX_EXTENDED_XMP_FULL_LENGTH
                    ),
                });
            }
            continue;
        }
        let mut buffer = vec![0u8; full_length as usize];
        let mut expected_offset = 0u32;
        let mut valid = true;
        for portion in &portions {
            let fits = portion.full_length == full_length
                && portion.starting_offset == expected_offset
                && (portion.starting_offset as usize + portion.portion.len()) <= buffer.len();
            if !fits {
                valid = false;
                break;
            }
            let start = portion.starting_offset as usize;
            buffer[start..start + portion.portion.len()].copy_from_slice(&portion.portion);
            expected_offset += portion.portion.len() as u32;
        }
        valid &= expected_offset == full_length;
        if valid {
            valid &= md5_hex_upper(&buffer) == fingerprint;
        }
        if !valid {
            if options.throw_on_invalid_samples {
                return Err(Error::BadExtendedXmp {
                    reason: format!(
                        "Extended-XMP group {fingerprint} failed contiguity or MD5 verification"
                    ),
                });
            }
            continue;
        }
        let text = String::from_utf8(buffer).map_err(|e| Error::BadExtendedXmp {
            reason: format!("Extended-XMP group {fingerprint} is not valid UTF-8: {e}"),
        })?;
        extended_docs.insert(fingerprint, strip_xpacket(&text));
    }

    if extended_docs.is_empty() {
        return Ok(Some(base_body));
    }

    let mut doc = XmpDocument::parse(&base_body)?;
    merge_extended_into_base(&mut doc, &extended_docs)?;
    doc.optimize_namespaces();
    Ok(Some(doc.to_string_utf16_no_bom()))
}

fn merge_extended_into_base(
    doc: &mut XmpDocument,
    extended_docs: &HashMap<String, String>,
) -> Result<()> {
    let rdf_idx = rdf_index(&doc.root)?;
    let Node::Element(rdf) = &mut doc.root.children[rdf_idx] else {
        unreachable!("rdf_index points at an Element")
    };

    let description_indices: Vec<usize> = rdf
        .children
        .iter()
        .enumerate()
        .filter_map(|(i, n)| match n {
            Node::Element(e) if e.name.matches(Some(RDF_NS), "Description") => Some(i),
            _ => None,
        })
        .collect();

    for idx in description_indices {
        let Node::Element(description) = &mut rdf.children[idx] else {
            unreachable!("collected above as an Element")
        };
        let Some(fingerprint) = description
            .attribute(Some(XMP_NOTE_NS), "HasExtendedXMP")
            .map(str::to_string)
        else {
            continue;
        };
        let Some(extended_xml) = extended_docs.get(&fingerprint) else {
            continue;
        };

        let mut extended_doc = XmpDocument::parse(extended_xml)?;
        let ext_rdf_idx = rdf_index(&extended_doc.root).map_err(|_| Error::BadExtendedXmp {
            reason: "extended XMP document is missing rdf:RDF".to_string(),
        })?;
        let Node::Element(ext_rdf) = &mut extended_doc.root.children[ext_rdf_idx] else {
            unreachable!("ext_rdf_idx points at an Element")
        };
        let ext_desc_idx = ext_rdf
            .children
            .iter()
            .position(|n| matches!(n, Node::Element(e) if e.name.matches(Some(RDF_NS), "Description")))
            .ok_or_else(|| Error::BadExtendedXmp {
                reason: "extended XMP document is missing rdf:Description".to_string(),
            })?;
        let Node::Element(ext_description) = &mut ext_rdf.children[ext_desc_idx] else {
            unreachable!("ext_desc_idx points at an Element")
        };

        while !ext_description.attributes.is_empty() {
            crate::xmp::dom::move_attribute(description, ext_description, 0);
        }
        while !ext_description.children.is_empty() {
            crate::xmp::dom::move_child(description, ext_description, 0)?;
        }
        description.remove_attribute(Some(XMP_NOTE_NS), "HasExtendedXMP");
    }
    Ok(())
}

// ---------------------------------------------------------------------
// Serialize
// ---------------------------------------------------------------------

/// Writes `xmp` into `metadata` as a (possibly split) Extended-XMP
/// group. `xmp = None` (or empty) removes all XMP and Extended-XMP
/// segments.
pub fn serialize_xmp(
    metadata: &mut JfifMetadata,
    xmp: Option<&str>,
    options: XmpCodecOptions,
) -> Result<()> {
    metadata.remove_all(&extended_key());

    let Some(xmp) = xmp.filter(|s| !s.is_empty()) else {
        metadata.remove_all(&xmp_key());
        return Ok(());
    };

    let mut doc = XmpDocument::parse(xmp)?;
    validate_xmp_root(&doc)?;

    doc.ensure_namespace("x", X_NS);
    doc.ensure_namespace("rdf", RDF_NS);
    doc.root.set_attribute("x", X_NS, "xmptk", toolkit_name());

    {
        let rdf_idx = rdf_index(&doc.root)?;
        let Node::Element(rdf) = &mut doc.root.children[rdf_idx] else {
            unreachable!("rdf_index points at an Element")
        };
        for description in rdf.children.iter_mut().filter_map(as_element_mut) {
            description.remove_attribute(Some(XMP_NOTE_NS), "HasExtendedXMP");
        }
    }
    doc.optimize_namespaces();

    let max_base = (options.max_base_utf8_bytes as usize).max(1);
    let mut extended_docs: HashMap<usize, Element> = HashMap::new();
    if doc.byte_len() > max_base {
        greedy_extract(&mut doc, max_base, &mut extended_docs)?;
    }

    let mut portions: Vec<(String, Vec<u8>)> = Vec::new();
    if !extended_docs.is_empty() {
        let rdf_idx = rdf_index(&doc.root)?;
        let mut desc_indices: Vec<usize> = extended_docs.keys().copied().collect();
        desc_indices.sort_unstable();
        for desc_idx in desc_indices {
            let extended_element = extended_docs.remove(&desc_idx).expect("just collected");
            let bytes = extended_element.to_utf8_bytes();
            let fingerprint = md5_hex_upper(&bytes);
            let Node::Element(rdf) = &mut doc.root.children[rdf_idx] else {
                unreachable!("rdf_index points at an Element")
            };
            let Node::Element(description) = &mut rdf.children[desc_idx] else {
                unreachable!("desc_idx was collected from this rdf's own children")
            };
            description.set_attribute("xmpNote", XMP_NOTE_NS, "HasExtendedXMP", fingerprint.clone());
            portions.push((fingerprint, bytes));
        }
    }

    let base_text = doc.to_string_utf16_no_bom();
    let anchor_keys = [
        JfifApp0::TEMPLATE.key(),
        JfxxApp0::TEMPLATE.key(),
        ExifApp1::TEMPLATE.key(),
    ];
    let (xmp_index, _) = metadata.get_or_create(&xmp_key(), false, &anchor_keys, || {
        Segment::XmpApp1(XmpApp1::default())
    });
    if let Segment::XmpApp1(segment) = &mut metadata.segments_mut()[xmp_index] {
        segment.packet = base_text;
    }

    let max_portion = (options.max_portion_utf8_bytes as usize).max(1);
    let mut insert_at = xmp_index + 1;
    for (fingerprint, bytes) in portions {
        let full_length =
            u32::try_from(bytes.len()).map_err(|_| Error::OversizedSegment { total: bytes.len() })?;
        let mut offset = 0u32;
        for chunk in bytes.chunks(max_portion) {
            metadata.segments_mut().insert(
                insert_at,
                Segment::ExtendedXmpApp1(ExtendedXmpApp1 {
                    full_md5_fingerprint: fingerprint.clone(),
                    full_length,
                    starting_offset: offset,
                    portion: chunk.to_vec(),
                }),
            );
            insert_at += 1;
            offset += chunk.len() as u32;
        }
    }
    Ok(())
}

/// Candidate content to move out of the base into an extended document
/// during greedy extraction, ranked by serialized byte size.
enum Candidate {
    Attribute { desc_i: usize, attr_i: usize, size: usize },
    Child { desc_i: usize, child_i: usize, size: usize },
}

impl Candidate {
    fn size(&self) -> usize {
        match self {
            Candidate::Attribute { size, .. } | Candidate::Child { size, .. } => *size,
        }
    }
}

/// The greedy loop of §4.J.2: repeatedly move Thumbnails, then camera
/// raw settings, then photoshop History, then the single largest
/// remaining attribute/element, re-measuring after every individual
/// move. Falls through to the next strategy once the current one has
/// nothing left to move; loops back to the top once something moves.
/// Fails if a full pass makes no progress and the base still doesn't
/// fit.
fn greedy_extract(
    doc: &mut XmpDocument,
    max_base: usize,
    extended_docs: &mut HashMap<usize, Element>,
) -> Result<()> {
    loop {
        if doc.byte_len() <= max_base {
            return Ok(());
        }

        let mut progressed = false;

        progressed |= drain_by_predicate(doc, max_base, extended_docs, |e| {
            e.name.matches(Some(IMG_NS), "Thumbnails")
        })?;
        if doc.byte_len() <= max_base {
            return Ok(());
        }

        progressed |= drain_by_predicate(doc, max_base, extended_docs, |e| {
            e.name.uri.as_deref() == Some(CAMERA_RAW_NS)
        })?;
        if doc.byte_len() <= max_base {
            return Ok(());
        }

        progressed |= drain_by_predicate(doc, max_base, extended_docs, |e| {
            e.name.matches(Some(PHOTOSHOP_NS), "History")
        })?;
        if doc.byte_len() <= max_base {
            return Ok(());
        }

        if move_largest(doc, extended_docs)? {
            progressed = true;
        }
        if doc.byte_len() <= max_base {
            return Ok(());
        }

        if !progressed {
            return Err(Error::ShapeMismatch {
                reason: format!(
                    "XMP base packet is {} bytes after extraction, exceeding the {max_base}-byte \
                     budget, and no further content can be moved into Extended-XMP",
                    doc.byte_len()
                ),
            });
        }
    }
}

/// Moves every child element of every `rdf:Description` matching
/// `pred`, one at a time, re-measuring after each move and stopping as
/// soon as the base fits. Returns whether anything moved.
fn drain_by_predicate(
    doc: &mut XmpDocument,
    max_base: usize,
    extended_docs: &mut HashMap<usize, Element>,
    pred: impl Fn(&Element) -> bool,
) -> Result<bool> {
    let mut moved_any = false;
    loop {
        if doc.byte_len() <= max_base {
            return Ok(moved_any);
        }

        let target = {
            let rdf_idx = rdf_index(&doc.root)?;
            let Node::Element(rdf) = &doc.root.children[rdf_idx] else {
                unreachable!("rdf_index points at an Element")
            };
            let mut found = None;
            for (desc_i, node) in rdf.children.iter().enumerate() {
                let Node::Element(description) = node else { continue };
                if !description.name.matches(Some(RDF_NS), "Description") {
                    continue;
                }
                if let Some(child_i) = find_child_index(description, &pred) {
                    found = Some((desc_i, child_i));
                    break;
                }
            }
            found
        };

        let Some((desc_i, child_i)) = target else {
            return Ok(moved_any);
        };

        {
            let rdf_idx = rdf_index(&doc.root)?;
            let extended = extended_docs.entry(desc_i).or_insert_with(make_extended_skeleton);
            let extended_description = extended_description_mut(extended);
            let Node::Element(rdf) = &mut doc.root.children[rdf_idx] else {
                unreachable!("rdf_index points at an Element")
            };
            let Node::Element(description) = &mut rdf.children[desc_i] else {
                unreachable!("desc_i was found in this rdf's own children")
            };
            crate::xmp::dom::move_child(extended_description, description, child_i)?;
        }
        moved_any = true;
        doc.optimize_namespaces();
    }
}

fn find_largest(root: &Element) -> Result<Option<Candidate>> {
    let rdf_idx = rdf_index(root)?;
    let Node::Element(rdf) = &root.children[rdf_idx] else {
        unreachable!("rdf_index points at an Element")
    };

    let mut best: Option<Candidate> = None;
    for (desc_i, node) in rdf.children.iter().enumerate() {
        let Node::Element(description) = node else { continue };
        if !description.name.matches(Some(RDF_NS), "Description") {
            continue;
        }
        for (attr_i, attr) in description.attributes.iter().enumerate() {
            if attr.name.matches(Some(XMP_NOTE_NS), "HasExtendedXMP") {
                continue;
            }
            let size = attribute_byte_len(attr);
            if best.as_ref().map(|b| size > b.size()).unwrap_or(true) {
                best = Some(Candidate::Attribute { desc_i, attr_i, size });
            }
        }
        for (child_i, child) in description.children.iter().enumerate() {
            let Node::Element(e) = child else { continue };
            let size = e.byte_len();
            if best.as_ref().map(|b| size > b.size()).unwrap_or(true) {
                best = Some(Candidate::Child { desc_i, child_i, size });
            }
        }
    }
    Ok(best)
}

/// Moves the single largest non-namespace-declaration attribute or
/// child element across all descriptions into its extended document.
/// Returns whether anything was found to move.
fn move_largest(doc: &mut XmpDocument, extended_docs: &mut HashMap<usize, Element>) -> Result<bool> {
    let Some(candidate) = find_largest(&doc.root)? else {
        return Ok(false);
    };
    match candidate {
        Candidate::Attribute { desc_i, attr_i, .. } => {
            let rdf_idx = rdf_index(&doc.root)?;
            let extended = extended_docs.entry(desc_i).or_insert_with(make_extended_skeleton);
            let extended_description = extended_description_mut(extended);
            let Node::Element(rdf) = &mut doc.root.children[rdf_idx] else {
                unreachable!("rdf_index points at an Element")
            };
            let Node::Element(description) = &mut rdf.children[desc_i] else {
                unreachable!("desc_i came from this rdf's own children")
            };
            crate::xmp::dom::move_attribute(extended_description, description, attr_i);
        }
        Candidate::Child { desc_i, child_i, .. } => {
            let rdf_idx = rdf_index(&doc.root)?;
            let extended = extended_docs.entry(desc_i).or_insert_with(make_extended_skeleton);
            let extended_description = extended_description_mut(extended);
            let Node::Element(rdf) = &mut doc.root.children[rdf_idx] else {
                unreachable!("rdf_index points at an Element")
            };
            let Node::Element(description) = &mut rdf.children[desc_i] else {
                unreachable!("desc_i came from this rdf's own children")
            };
            crate::xmp::dom::move_child(extended_description, description, child_i)?;
        }
    }
    doc.optimize_namespaces();
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_metadata() -> JfifMetadata {
        let mut m = JfifMetadata::new();
        m.push(Segment::Soi);
        m.push(Segment::Eoi);
        m
    }

    fn xmp_doc(description_body: &str) -> String {
        format!(
            r#"<x:xmpmeta xmlns:x="adobe:ns:meta/"><rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"><rdf:Description rdf:about="" xmlns:ex="urn:example">{description_body}</rdf:Description></rdf:RDF></x:xmpmeta>"#
        )
    }

    #[test]
    fn small_document_round_trips_without_splitting() {
        let mut m = base_metadata();
        let xmp = xmp_doc(r#"<ex:Field>value</ex:Field>"#);
        serialize_xmp(&mut m, Some(&xmp), XmpCodecOptions::default()).unwrap();
        assert_eq!(m.find_all(&extended_key()).count(), 0);

        let recovered = deserialize_xmp(&m, XmpCodecOptions::default())
            .unwrap()
            .unwrap();
        assert!(recovered.contains("ex:Field"));
        assert!(recovered.contains("value"));
    }

    #[test]
    fn empty_input_removes_existing_xmp() {
        let mut m = base_metadata();
        let xmp = xmp_doc(r#"<ex:Field>value</ex:Field>"#);
        serialize_xmp(&mut m, Some(&xmp), XmpCodecOptions::default()).unwrap();
        assert!(m.find_first(&xmp_key()).is_some());

        serialize_xmp(&mut m, None, XmpCodecOptions::default()).unwrap();
        assert!(m.find_first(&xmp_key()).is_none());
        assert!(deserialize_xmp(&m, XmpCodecOptions::default()).unwrap().is_none());
    }

    #[test]
    fn invalid_root_is_rejected() {
        let mut m = base_metadata();
        let err = serialize_xmp(&mut m, Some("<not-xmp/>"), XmpCodecOptions::default());
        assert!(matches!(err, Err(Error::BadXmpRoot { .. })));
    }

    /// Scenario S5: three ~64000-byte attributes with a 256-byte base
    /// budget split into Extended-XMP portions that reassemble losslessly.
    #[test]
    fn oversize_attributes_split_and_merge_s5() {
        let mut m = base_metadata();
        let body = format!(
            r#"<rdf:Description rdf:about="" xmlns:ex="urn:example" ex:a="{a}" ex:b="{b}" ex:c="{c}"/>"#,
            a = "y".repeat(64_000),
            b = "y".repeat(64_000),
            c = "y".repeat(64_000),
        );
        let xmp = format!(
            r#"<x:xmpmeta xmlns:x="adobe:ns:meta/"><rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">{body}</rdf:RDF></x:xmpmeta>"#
        );

        let options = XmpCodecOptions::default().with_max_base_utf8_bytes(256);
        serialize_xmp(&mut m, Some(&xmp), options).unwrap();

        assert_eq!(m.find_all(&xmp_key()).count(), 1);
        let extended: Vec<&ExtendedXmpApp1> = m
            .find_all(&extended_key())
            .filter_map(|s| match s {
                Segment::ExtendedXmpApp1(e) => Some(e),
                _ => None,
            })
            .collect();
        assert!(extended.len() >= 2);

        let fingerprint = extended[0].full_md5_fingerprint.clone();
        assert_eq!(fingerprint.len(), 32);
        assert!(fingerprint.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(extended.iter().all(|e| e.full_md5_fingerprint == fingerprint));

        let mut sorted = extended.clone();
        sorted.sort_by_key(|e| e.starting_offset);
        let mut expected_offset = 0u32;
        let mut total = Vec::new();
        for portion in &sorted {
            assert_eq!(portion.starting_offset, expected_offset);
            expected_offset += portion.portion.len() as u32;
            total.extend_from_slice(&portion.portion);
        }
        assert_eq!(expected_offset, sorted[0].full_length);
        assert_eq!(md5_hex_upper(&total), fingerprint);

        let (base, _) = m.find_first(&xmp_key()).unwrap();
        let Segment::XmpApp1(base) = base else { panic!("expected XmpApp1") };
        assert!(base.packet.contains("HasExtendedXMP"));

        let recovered = deserialize_xmp(&m, XmpCodecOptions::default())
            .unwrap()
            .unwrap();
        assert!(recovered.contains("ex:a"));
        assert!(recovered.contains("ex:b"));
        assert!(recovered.contains("ex:c"));
        assert!(!recovered.contains("HasExtendedXMP"));
    }

    #[test]
    fn throw_on_invalid_samples_false_drops_bad_group_but_keeps_base() {
        let mut m = base_metadata();
        m.push(Segment::XmpApp1(XmpApp1 {
            packet: "<?xpacket begin=\"\" id=\"W5M0\"?><x:xmpmeta/><?xpacket end=\"w\"?>"
                .to_string(),
        }));
        m.push(Segment::ExtendedXmpApp1(ExtendedXmpApp1 {
            full_md5_fingerprint: "0".repeat(32),
            full_length: 10,
            starting_offset: 0,
            portion: vec![1, 2, 3],
        }));

        let lenient = XmpCodecOptions::default().with_throw_on_invalid_samples(false);
        let result = deserialize_xmp(&m, lenient).unwrap();
        assert_eq!(result.as_deref(), Some("<x:xmpmeta/>"));

        let strict = XmpCodecOptions::default();
        assert!(deserialize_xmp(&m, strict).is_err());
    }

    #[test]
    fn strip_xpacket_tolerates_arbitrary_attributes() {
        let raw = r#"<?xpacket begin="﻿" id="W5M0MpCehiHzreSzNTczkc9d"?>  <x:xmpmeta>hi</x:xmpmeta>  <?xpacket end="w"?>"#;
        assert_eq!(strip_xpacket(raw), "<x:xmpmeta>hi</x:xmpmeta>");
    }

    #[test]
    fn strip_xpacket_passes_through_unwrapped_text() {
        assert_eq!(strip_xpacket("  <x:xmpmeta/>  "), "<x:xmpmeta/>");
    }

    #[test]
    fn implausible_full_length_is_rejected_before_allocating() {
        let mut m = base_metadata();
        m.push(Segment::XmpApp1(XmpApp1 {
            packet: "<?xpacket begin=\"\" id=\"W5M0\"?><x:xmpmeta/><?xpacket end=\"w\"?>"
                .to_string(),
        }));
        m.push(Segment::ExtendedXmpApp1(ExtendedXmpApp1 {
            full_md5_fingerprint: "0".repeat(32),
            full_length: crate::config::MAX_EXTENDED_XMP_FULL_LENGTH + 1,
            starting_offset: 0,
            portion: vec![1, 2, 3],
        }));

        assert!(deserialize_xmp(&m, XmpCodecOptions::default()).is_err());
        let lenient = XmpCodecOptions::default().with_throw_on_invalid_samples(false);
        assert_eq!(
            deserialize_xmp(&m, lenient).unwrap().as_deref(),
            Some("<x:xmpmeta/>")
        );
    }
}
