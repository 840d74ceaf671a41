//! Shared strings table (`xl/sharedStrings.xml`).

use quick_xml::Reader;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::{BytesRef, Event};

use super::error::{Result, WorkbookError};

/// Parses the shared strings part into index order.
///
/// Rich-text items (`<r><t>..</t></r>` runs) are flattened to their plain
/// text; phonetic hints (`<rPh>`) are skipped.
pub(crate) fn parse_shared_strings(part: &str, xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut strings = Vec::new();

    let mut current: Option<String> = None;
    let mut in_text = false;
    let mut phonetic_depth = 0usize;

    loop {
        match reader.read_event().map_err(|e| WorkbookError::xml(part, e))? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"rPh" => phonetic_depth += 1,
                b"t" if phonetic_depth == 0 => in_text = true,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => strings.push(current.take().unwrap_or_default()),
                b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                b"t" => in_text = false,
                _ => {}
            },
            Event::Text(t) if in_text => {
                if let Some(buf) = current.as_mut() {
                    buf.push_str(&t.decode().map_err(|e| WorkbookError::xml(part, e))?);
                }
            }
            Event::CData(t) if in_text => {
                if let Some(buf) = current.as_mut() {
                    buf.push_str(&t.decode().map_err(|e| WorkbookError::xml(part, e))?);
                }
            }
            Event::GeneralRef(r) if in_text => {
                if let Some(buf) = current.as_mut() {
                    push_entity(part, &r, buf)?;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(strings)
}

/// Appends the text an entity or character reference stands for.
pub(crate) fn push_entity(part: &str, reference: &BytesRef<'_>, buf: &mut String) -> Result<()> {
    if let Some(ch) = reference
        .resolve_char_ref()
        .map_err(|e| WorkbookError::xml(part, e))?
    {
        buf.push(ch);
        return Ok(());
    }

    let name = reference.decode().map_err(|e| WorkbookError::xml(part, e))?;
    match resolve_xml_entity(&name) {
        Some(text) => buf.push_str(text),
        None => return Err(WorkbookError::xml(part, format!("unknown entity &{name};"))),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_and_rich_items() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="3" uniqueCount="3">
  <si><t>Owner1</t></si>
  <si><r><rPr><b/></rPr><t>Max </t></r><r><t>Verstappen</t></r></si>
  <si><t xml:space="preserve"> spaced </t></si>
</sst>"#;

        let strings = parse_shared_strings("xl/sharedStrings.xml", xml).unwrap();
        assert_eq!(strings, vec!["Owner1", "Max Verstappen", " spaced "]);
    }

    #[test]
    fn test_entities_are_resolved() {
        let xml = r#"<sst><si><t>R&amp;D &#233;quipe</t></si></sst>"#;
        let strings = parse_shared_strings("xl/sharedStrings.xml", xml).unwrap();
        assert_eq!(strings, vec!["R&D équipe"]);
    }

    #[test]
    fn test_phonetic_runs_are_skipped() {
        let xml = r#"<sst><si><t>Tsunoda</t><rPh sb="0" eb="1"><t>ツノダ</t></rPh></si></sst>"#;
        let strings = parse_shared_strings("xl/sharedStrings.xml", xml).unwrap();
        assert_eq!(strings, vec!["Tsunoda"]);
    }

    #[test]
    fn test_empty_item_keeps_index() {
        let xml = r#"<sst><si/><si><t>second</t></si></sst>"#;
        let strings = parse_shared_strings("xl/sharedStrings.xml", xml).unwrap();
        assert_eq!(strings, vec!["", "second"]);
    }
}
