//! PresentationML (PPTX) encoder: one text box per slide.

use super::package::ZipPackage;
use super::xml::{relationships, static_part, PartWriter};
use crate::converter::StrategyError;

const A_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const P_NS: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
const REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

// 16:9 slide, 10in x 5.625in.
const SLIDE_CX: u64 = 9_144_000;
const SLIDE_CY: u64 = 5_143_500;
const INSET: u64 = 457_200;
const FONT_SIZE: u32 = 1400;

const THEME: &str = r#"<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office Theme"><a:themeElements><a:clrScheme name="Office"><a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1><a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1><a:dk2><a:srgbClr val="1F497D"/></a:dk2><a:lt2><a:srgbClr val="EEECE1"/></a:lt2><a:accent1><a:srgbClr val="4F81BD"/></a:accent1><a:accent2><a:srgbClr val="C0504D"/></a:accent2><a:accent3><a:srgbClr val="9BBB59"/></a:accent3><a:accent4><a:srgbClr val="8064A2"/></a:accent4><a:accent5><a:srgbClr val="4BACC6"/></a:accent5><a:accent6><a:srgbClr val="F79646"/></a:accent6><a:hlink><a:srgbClr val="0000FF"/></a:hlink><a:folHlink><a:srgbClr val="800080"/></a:folHlink></a:clrScheme><a:fontScheme name="Office"><a:majorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont><a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont></a:fontScheme><a:fmtScheme name="Office"><a:fillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:fillStyleLst><a:lnStyleLst><a:ln w="9525"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="25400"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="38100"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln></a:lnStyleLst><a:effectStyleLst><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle></a:effectStyleLst><a:bgFillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:bgFillStyleLst></a:fmtScheme></a:themeElements></a:theme>"#;

const EMPTY_TREE: &str = r#"<p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>"#;

/// Groups text blocks into slides of at most `limit` characters.
///
/// A block that would overflow a non-empty slide starts the next one, so a
/// single oversized block still gets a slide of its own.
pub fn chunk_slides(blocks: Vec<String>, limit: usize) -> Vec<Vec<String>> {
    let mut slides = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut count = 0;

    for block in blocks {
        let len = block.chars().count();
        if count + len > limit && count > 0 {
            slides.push(std::mem::take(&mut current));
            count = 0;
        }
        count += len;
        current.push(block);
    }
    if !current.is_empty() {
        slides.push(current);
    }
    slides
}

fn content_types(slide_count: usize) -> Result<String, StrategyError> {
    const PML: &str = "application/vnd.openxmlformats-officedocument.presentationml";

    let mut xml = PartWriter::new()?;
    xml.start(
        "Types",
        &[("xmlns", "http://schemas.openxmlformats.org/package/2006/content-types")],
    )?;
    xml.empty(
        "Default",
        &[
            ("Extension", "rels"),
            ("ContentType", "application/vnd.openxmlformats-package.relationships+xml"),
        ],
    )?;
    xml.empty("Default", &[("Extension", "xml"), ("ContentType", "application/xml")])?;

    let mut overrides = vec![
        ("/ppt/presentation.xml".to_string(), format!("{}.presentation.main+xml", PML)),
        ("/ppt/slideMasters/slideMaster1.xml".to_string(), format!("{}.slideMaster+xml", PML)),
        ("/ppt/slideLayouts/slideLayout1.xml".to_string(), format!("{}.slideLayout+xml", PML)),
        (
            "/ppt/theme/theme1.xml".to_string(),
            "application/vnd.openxmlformats-officedocument.theme+xml".to_string(),
        ),
    ];
    for n in 1..=slide_count {
        overrides.push((format!("/ppt/slides/slide{}.xml", n), format!("{}.slide+xml", PML)));
    }
    for (part, content_type) in &overrides {
        xml.empty(
            "Override",
            &[("PartName", part.as_str()), ("ContentType", content_type.as_str())],
        )?;
    }
    xml.end("Types")?;
    xml.finish()
}

/// Relationships part whose types are all under the officeDocument namespace.
fn rels(entries: &[(&str, &str, &str)]) -> Result<String, StrategyError> {
    let kinds: Vec<String> = entries
        .iter()
        .map(|(_, kind, _)| format!("{}/{}", REL_BASE, kind))
        .collect();
    let entries: Vec<_> = entries
        .iter()
        .zip(&kinds)
        .map(|((id, _, target), kind)| (*id, kind.as_str(), *target, false))
        .collect();
    relationships(&entries)
}

/// Opens a PresentationML root element carrying the shared namespaces.
fn open_root(xml: &mut PartWriter, name: &str, extra: &[(&str, &str)]) -> Result<(), StrategyError> {
    let mut attrs = vec![("xmlns:a", A_NS), ("xmlns:r", R_NS), ("xmlns:p", P_NS)];
    attrs.extend_from_slice(extra);
    xml.start(name, &attrs)
}

fn presentation(slide_count: usize) -> Result<String, StrategyError> {
    let slide_cx = SLIDE_CX.to_string();
    let slide_cy = SLIDE_CY.to_string();

    let mut xml = PartWriter::new()?;
    open_root(&mut xml, "p:presentation", &[])?;
    xml.start("p:sldMasterIdLst", &[])?;
    xml.empty("p:sldMasterId", &[("id", "2147483648"), ("r:id", "rId1")])?;
    xml.end("p:sldMasterIdLst")?;
    xml.start("p:sldIdLst", &[])?;
    for n in 0..slide_count {
        let id = (256 + n).to_string();
        let rel = format!("rId{}", n + 3);
        xml.empty("p:sldId", &[("id", id.as_str()), ("r:id", rel.as_str())])?;
    }
    xml.end("p:sldIdLst")?;
    xml.empty("p:sldSz", &[("cx", slide_cx.as_str()), ("cy", slide_cy.as_str())])?;
    xml.empty("p:notesSz", &[("cx", slide_cy.as_str()), ("cy", slide_cx.as_str())])?;
    xml.end("p:presentation")?;
    xml.finish()
}

fn slide_master() -> Result<String, StrategyError> {
    let mut xml = PartWriter::new()?;
    open_root(&mut xml, "p:sldMaster", &[])?;
    xml.start("p:cSld", &[])?;
    xml.raw(r#"<p:bg><p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef></p:bg>"#)?;
    xml.raw(EMPTY_TREE)?;
    xml.end("p:spTree")?;
    xml.end("p:cSld")?;
    xml.empty(
        "p:clrMap",
        &[
            ("bg1", "lt1"),
            ("tx1", "dk1"),
            ("bg2", "lt2"),
            ("tx2", "dk2"),
            ("accent1", "accent1"),
            ("accent2", "accent2"),
            ("accent3", "accent3"),
            ("accent4", "accent4"),
            ("accent5", "accent5"),
            ("accent6", "accent6"),
            ("hlink", "hlink"),
            ("folHlink", "folHlink"),
        ],
    )?;
    xml.start("p:sldLayoutIdLst", &[])?;
    xml.empty("p:sldLayoutId", &[("id", "2147483649"), ("r:id", "rId1")])?;
    xml.end("p:sldLayoutIdLst")?;
    xml.end("p:sldMaster")?;
    xml.finish()
}

fn slide_layout() -> Result<String, StrategyError> {
    let mut xml = PartWriter::new()?;
    open_root(&mut xml, "p:sldLayout", &[("type", "blank"), ("preserve", "1")])?;
    xml.start("p:cSld", &[("name", "Blank")])?;
    xml.raw(EMPTY_TREE)?;
    xml.end("p:spTree")?;
    xml.end("p:cSld")?;
    xml.raw("<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>")?;
    xml.end("p:sldLayout")?;
    xml.finish()
}

fn paragraph(xml: &mut PartWriter, text: &str) -> Result<(), StrategyError> {
    let size = FONT_SIZE.to_string();
    let props = [("lang", "en-US"), ("sz", size.as_str())];
    xml.start("a:p", &[])?;
    if text.is_empty() {
        xml.empty("a:endParaRPr", &props)?;
    } else {
        xml.start("a:r", &[])?;
        xml.empty("a:rPr", &props)?;
        xml.text_element("a:t", &[], text)?;
        xml.end("a:r")?;
    }
    xml.end("a:p")
}

fn slide(blocks: &[String]) -> Result<String, StrategyError> {
    let inset = INSET.to_string();
    let cx = (SLIDE_CX * 9 / 10).to_string();
    let cy = (SLIDE_CY * 9 / 10).to_string();

    let mut xml = PartWriter::new()?;
    open_root(&mut xml, "p:sld", &[])?;
    xml.start("p:cSld", &[])?;
    xml.raw(EMPTY_TREE)?;

    xml.start("p:sp", &[])?;
    xml.start("p:nvSpPr", &[])?;
    xml.empty("p:cNvPr", &[("id", "2"), ("name", "Text 1")])?;
    xml.empty("p:cNvSpPr", &[("txBox", "1")])?;
    xml.empty("p:nvPr", &[])?;
    xml.end("p:nvSpPr")?;

    xml.start("p:spPr", &[])?;
    xml.start("a:xfrm", &[])?;
    xml.empty("a:off", &[("x", inset.as_str()), ("y", inset.as_str())])?;
    xml.empty("a:ext", &[("cx", cx.as_str()), ("cy", cy.as_str())])?;
    xml.end("a:xfrm")?;
    xml.start("a:prstGeom", &[("prst", "rect")])?;
    xml.empty("a:avLst", &[])?;
    xml.end("a:prstGeom")?;
    xml.end("p:spPr")?;

    xml.start("p:txBody", &[])?;
    xml.empty("a:bodyPr", &[("wrap", "square")])?;
    xml.empty("a:lstStyle", &[])?;
    for (i, block) in blocks.iter().enumerate() {
        if i > 0 {
            paragraph(&mut xml, "")?;
        }
        for line in block.lines() {
            paragraph(&mut xml, line)?;
        }
    }
    xml.end("p:txBody")?;
    xml.end("p:sp")?;

    xml.end("p:spTree")?;
    xml.end("p:cSld")?;
    xml.raw("<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>")?;
    xml.end("p:sld")?;
    xml.finish()
}

/// Encodes slides, each a list of text blocks separated by blank lines.
pub fn render_slides(slides: &[Vec<String>]) -> Result<Vec<u8>, StrategyError> {
    if slides.is_empty() {
        return Err(StrategyError::NoContent);
    }

    let mut package = ZipPackage::new();
    package.add_xml("[Content_Types].xml", &content_types(slides.len())?)?;
    package.add_xml(
        "_rels/.rels",
        &rels(&[("rId1", "officeDocument", "ppt/presentation.xml")])?,
    )?;

    let slide_rels: Vec<(String, String)> = (1..=slides.len())
        .map(|n| (format!("rId{}", n + 2), format!("slides/slide{}.xml", n)))
        .collect();
    let mut presentation_rels = vec![
        ("rId1", "slideMaster", "slideMasters/slideMaster1.xml"),
        ("rId2", "theme", "theme/theme1.xml"),
    ];
    presentation_rels.extend(
        slide_rels
            .iter()
            .map(|(id, target)| (id.as_str(), "slide", target.as_str())),
    );
    package.add_xml("ppt/presentation.xml", &presentation(slides.len())?)?;
    package.add_xml("ppt/_rels/presentation.xml.rels", &rels(&presentation_rels)?)?;

    package.add_xml("ppt/slideMasters/slideMaster1.xml", &slide_master()?)?;
    package.add_xml(
        "ppt/slideMasters/_rels/slideMaster1.xml.rels",
        &rels(&[
            ("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml"),
            ("rId2", "theme", "../theme/theme1.xml"),
        ])?,
    )?;
    package.add_xml("ppt/slideLayouts/slideLayout1.xml", &slide_layout()?)?;
    package.add_xml(
        "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
        &rels(&[("rId1", "slideMaster", "../slideMasters/slideMaster1.xml")])?,
    )?;
    package.add_xml("ppt/theme/theme1.xml", &static_part(THEME)?)?;

    let layout_rels = rels(&[("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml")])?;
    for (n, blocks) in slides.iter().enumerate() {
        package.add_xml(&format!("ppt/slides/slide{}.xml", n + 1), &slide(blocks)?)?;
        package.add_xml(&format!("ppt/slides/_rels/slide{}.xml.rels", n + 1), &layout_rels)?;
    }

    Ok(package.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    fn blocks(sizes: &[usize]) -> Vec<String> {
        sizes.iter().map(|n| "x".repeat(*n)).collect()
    }

    #[test]
    fn test_chunking_respects_limit() {
        let slides = chunk_slides(blocks(&[300, 300, 300, 100]), 750);
        assert_eq!(slides.len(), 2);
        assert_eq!(slides[0].len(), 2);
        assert_eq!(slides[1].len(), 2);
    }

    #[test]
    fn test_oversized_block_gets_own_slide() {
        let slides = chunk_slides(blocks(&[10, 1000, 10]), 750);
        assert_eq!(slides.len(), 3);
        assert_eq!(slides[1][0].len(), 1000);
    }

    #[test]
    fn test_exact_limit_fits() {
        assert_eq!(chunk_slides(blocks(&[375, 375]), 750).len(), 1);
    }

    #[test]
    fn test_package_structure() {
        let slides = vec![
            vec!["Hello & welcome".to_string(), "second".to_string()],
            vec!["third".to_string()],
        ];
        let bytes = render_slides(&slides).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();

        let mut slide1 = String::new();
        archive
            .by_name("ppt/slides/slide1.xml")
            .unwrap()
            .read_to_string(&mut slide1)
            .unwrap();
        assert!(slide1.contains("<a:t>Hello &amp; welcome</a:t>"));
        assert!(slide1.contains("<a:endParaRPr"));

        let mut presentation = String::new();
        archive
            .by_name("ppt/presentation.xml")
            .unwrap()
            .read_to_string(&mut presentation)
            .unwrap();
        assert_eq!(presentation.matches("<p:sldId ").count(), 2);
        assert!(archive.by_name("ppt/slides/slide2.xml").is_ok());
        assert!(archive.by_name("ppt/slides/slide3.xml").is_err());
    }

    #[test]
    fn test_empty_deck_rejected() {
        assert!(matches!(render_slides(&[]), Err(StrategyError::NoContent)));
    }
}
