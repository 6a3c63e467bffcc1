//! PDF assembly for laid-out report pages
//!
//! Built-in fonts become simple Type1 fonts with WinAnsi encoding. Embedded fonts
//! become composite Type0 fonts whose CIDs are the BMP code points of the text, with
//! an explicit CID to glyph map and widths for every character that was used.

use crate::config::ReportOptions;
use crate::error::ReportResult;
use crate::fonts::{EmbeddedFont, FontFace, FontHandle, FontResolver, REPLACEMENT_CHAR};
use crate::page_flow::{PageLayout, PlacedLine};
use lopdf::{
    content::{Content, Operation},
    Dictionary, Document, Object, ObjectId, Stream, StringFormat,
};
use std::collections::{BTreeMap, BTreeSet};

pub struct ReportDocument<'a> {
    fonts: &'a FontResolver,
    options: &'a ReportOptions,
    document: Document,
    font_objects: BTreeMap<&'static str, ObjectId>,
    pages_id: ObjectId,
}

impl<'a> ReportDocument<'a> {
    pub fn new(fonts: &'a FontResolver, options: &'a ReportOptions) -> Self {
        let mut document = Document::with_version("1.5");
        let pages_id = document.new_object_id();
        Self {
            fonts,
            options,
            document,
            font_objects: BTreeMap::new(),
            pages_id,
        }
    }

    /// Encode every page and serialise the document. Bytes are only returned
    /// when the whole document was written.
    pub fn assemble(mut self, pages: &[PageLayout]) -> ReportResult<Vec<u8>> {
        for (handle, chars) in self.glyph_usage(pages) {
            self.add_font_to_document(handle, &chars)?;
        }
        let resources_id = self.document.add_object(self.create_resources_dict());

        let mut kids = Vec::with_capacity(pages.len());
        for page in pages {
            let page_id = self.create_single_page(page, resources_id)?;
            kids.push(Object::Reference(page_id));
        }

        let mut pages_dict = Dictionary::new();
        pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
        pages_dict.set("Count", Object::Integer(kids.len() as i64));
        pages_dict.set("Kids", Object::Array(kids));
        self.document
            .objects
            .insert(self.pages_id, Object::Dictionary(pages_dict));

        let mut info_dict = Dictionary::new();
        info_dict.set("Producer", Object::string_literal("DopamineLite Issue Reports"));
        info_dict.set("Title", Object::string_literal("Issue Report"));
        let info_id = self.document.add_object(Object::Dictionary(info_dict));

        let mut catalog_dict = Dictionary::new();
        catalog_dict.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog_dict.set("Pages", Object::Reference(self.pages_id));
        let catalog_id = self.document.add_object(Object::Dictionary(catalog_dict));

        self.document.trailer.set("Root", Object::Reference(catalog_id));
        self.document.trailer.set("Info", Object::Reference(info_id));

        self.document.compress();
        let mut bytes = Vec::new();
        self.document.save_to(&mut bytes)?;
        Ok(bytes)
    }

    /// Characters shown with each font, after glyph substitution.
    fn glyph_usage(&self, pages: &[PageLayout]) -> BTreeMap<FontHandle, BTreeSet<char>> {
        let mut usage: BTreeMap<FontHandle, BTreeSet<char>> = BTreeMap::new();
        for run in pages.iter().flat_map(|p| &p.lines).flat_map(|l| &l.runs) {
            let used = usage.entry(run.font).or_default();
            for ch in run.text.chars() {
                if self.fonts.can_encode(ch, run.font) {
                    used.insert(ch);
                } else {
                    used.insert(REPLACEMENT_CHAR);
                }
            }
        }
        usage
    }

    fn create_single_page(&mut self, page: &PageLayout, resources_id: ObjectId) -> ReportResult<ObjectId> {
        let mut content = Content {
            operations: Vec::new(),
        };
        for line in &page.lines {
            self.add_line_to_content(&mut content, line);
        }
        let content_id = self
            .document
            .add_object(Stream::new(Dictionary::new(), content.encode()?));

        let mut page_dict = Dictionary::new();
        page_dict.set("Type", Object::Name(b"Page".to_vec()));
        page_dict.set("Parent", Object::Reference(self.pages_id));
        page_dict.set("Resources", Object::Reference(resources_id));
        page_dict.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(self.options.page_width),
                Object::Real(self.options.page_height),
            ]),
        );
        page_dict.set("Contents", Object::Reference(content_id));
        Ok(self.document.add_object(Object::Dictionary(page_dict)))
    }

    /// One text object per line; runs follow each other on the same baseline.
    fn add_line_to_content(&self, content: &mut Content, line: &PlacedLine) {
        if line.runs.is_empty() {
            return;
        }
        content.operations.push(Operation::new("BT", vec![]));
        content.operations.push(Operation::new(
            "Tm",
            vec![
                Object::Real(1.0),
                Object::Real(0.0),
                Object::Real(0.0),
                Object::Real(1.0),
                Object::Real(line.x),
                Object::Real(line.baseline),
            ],
        ));
        for run in &line.runs {
            content.operations.push(Operation::new(
                "Tf",
                vec![
                    Object::Name(run.font.resource_name().as_bytes().to_vec()),
                    Object::Real(line.size),
                ],
            ));
            content.operations.push(Operation::new(
                "Tj",
                vec![Object::String(
                    self.fonts.encode(&run.text, run.font),
                    StringFormat::Hexadecimal,
                )],
            ));
        }
        content.operations.push(Operation::new("ET", vec![]));
    }

    fn create_resources_dict(&self) -> Object {
        let mut font_dict = Dictionary::new();
        for (name, &font_id) in &self.font_objects {
            font_dict.set(*name, Object::Reference(font_id));
        }
        let mut resources = Dictionary::new();
        resources.set("Font", Object::Dictionary(font_dict));
        Object::Dictionary(resources)
    }

    fn add_font_to_document(&mut self, handle: FontHandle, used: &BTreeSet<char>) -> ReportResult<ObjectId> {
        let font_id = match self.fonts.face(handle) {
            FontFace::Builtin(font) => {
                let mut font_dict = Dictionary::new();
                font_dict.set("Type", Object::Name(b"Font".to_vec()));
                font_dict.set("Subtype", Object::Name(b"Type1".to_vec()));
                font_dict.set("BaseFont", Object::Name(font.base_font().as_bytes().to_vec()));
                font_dict.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
                self.document.add_object(Object::Dictionary(font_dict))
            }
            FontFace::Embedded(font) => {
                let font = font.clone();
                self.add_composite_font(&font, used)
            }
        };
        self.font_objects.insert(handle.resource_name(), font_id);
        Ok(font_id)
    }

    fn add_composite_font(&mut self, font: &EmbeddedFont, used: &BTreeSet<char>) -> ObjectId {
        let base_font_name = font.pdf_name.clone().into_bytes();
        let (ascent, descent) = font.ascent_descent();

        let mut stream_dict = Dictionary::new();
        stream_dict.set("Length1", Object::Integer(font.data().len() as i64));
        let font_file_id = self
            .document
            .add_object(Stream::new(stream_dict, font.data().to_vec()));

        let mut font_descriptor = Dictionary::new();
        font_descriptor.set("Type", Object::Name(b"FontDescriptor".to_vec()));
        font_descriptor.set("FontName", Object::Name(base_font_name.clone()));
        font_descriptor.set("Flags", Object::Integer(4));
        font_descriptor.set(
            "FontBBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Real(descent),
                Object::Integer(1000),
                Object::Real(ascent),
            ]),
        );
        font_descriptor.set("ItalicAngle", Object::Integer(0));
        font_descriptor.set("Ascent", Object::Real(ascent));
        font_descriptor.set("Descent", Object::Real(descent));
        font_descriptor.set("CapHeight", Object::Real(ascent * 0.7));
        font_descriptor.set("StemV", Object::Integer(80));
        font_descriptor.set("FontFile2", Object::Reference(font_file_id));
        let font_descriptor_id = self.document.add_object(Object::Dictionary(font_descriptor));

        let cid_to_gid_map_id = self.document.add_object(create_cid_to_gid_map_stream(font, used));
        let mut cidfont = Dictionary::new();
        cidfont.set("Type", Object::Name(b"Font".to_vec()));
        cidfont.set("Subtype", Object::Name(b"CIDFontType2".to_vec()));
        cidfont.set("BaseFont", Object::Name(base_font_name.clone()));
        cidfont.set("CIDSystemInfo", Object::Dictionary({
            let mut d = Dictionary::new();
            d.set("Registry", Object::string_literal("Adobe"));
            d.set("Ordering", Object::string_literal("Identity"));
            d.set("Supplement", Object::Integer(0));
            d
        }));
        cidfont.set("FontDescriptor", Object::Reference(font_descriptor_id));
        cidfont.set("DW", Object::Integer(1000));
        cidfont.set("W", create_widths_array(font, used));
        cidfont.set("CIDToGIDMap", Object::Reference(cid_to_gid_map_id));
        let cidfont_id = self.document.add_object(Object::Dictionary(cidfont));

        let tounicode_id = self.document.add_object(create_identity_tounicode_cmap_stream());

        let mut type0 = Dictionary::new();
        type0.set("Type", Object::Name(b"Font".to_vec()));
        type0.set("Subtype", Object::Name(b"Type0".to_vec()));
        type0.set("BaseFont", Object::Name(base_font_name));
        type0.set("Encoding", Object::Name(b"Identity-H".to_vec()));
        type0.set("DescendantFonts", Object::Array(vec![Object::Reference(cidfont_id)]));
        type0.set("ToUnicode", Object::Reference(tounicode_id));
        self.document.add_object(Object::Dictionary(type0))
    }
}

/// `[cid [width] ...]` for every used code point.
fn create_widths_array(font: &EmbeddedFont, used: &BTreeSet<char>) -> Object {
    let mut widths = Vec::with_capacity(used.len() * 2);
    for &ch in used {
        widths.push(Object::Integer(ch as i64));
        widths.push(Object::Array(vec![Object::Real(font.advance(ch))]));
    }
    Object::Array(widths)
}

/// Two bytes per CID up to the highest used code point; unused CIDs map to glyph 0.
fn create_cid_to_gid_map_stream(font: &EmbeddedFont, used: &BTreeSet<char>) -> Stream {
    let max_cid = used.iter().next_back().map(|&ch| ch as usize).unwrap_or(0);
    let mut map = vec![0u8; (max_cid + 1) * 2];
    for &ch in used {
        let offset = (ch as usize) * 2;
        map[offset..offset + 2].copy_from_slice(&font.glyph_index(ch).to_be_bytes());
    }
    Stream::new(Dictionary::new(), map)
}

fn create_identity_tounicode_cmap_stream() -> Stream {
    let cmap = b"/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CIDSystemInfo
<< /Registry (Adobe)
/Ordering (UCS)
/Supplement 0
>> def
/CMapName /Adobe-Identity-UCS def
/CMapType 2 def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
1 beginbfrange
<0000> <FFFF> <0000>
endbfrange
endcmap
CMapName currentdict /CMap defineresource pop
end
end"
    .to_vec();
    Stream::new(Dictionary::new(), cmap)
}
