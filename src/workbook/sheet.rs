//! Worksheet parts: reading cell values and patching numeric cells.

use std::collections::BTreeMap;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use super::cell::{CellRef, CellValue};
use super::error::{Result, WorkbookError};
use super::strings::push_entity;

/// The populated cells of one worksheet.
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    name: String,
    cells: BTreeMap<CellRef, CellValue>,
}

impl Sheet {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, row: u32, column: u32) -> &CellValue {
        self.cells
            .get(&CellRef::new(row, column))
            .unwrap_or(&CellValue::Empty)
    }

    /// Display text of a cell, `None` when blank.
    pub fn text(&self, row: u32, column: u32) -> Option<String> {
        self.get(row, column).as_text()
    }

    /// Last row holding a non-blank value within `columns`, if any.
    pub fn last_row_in(&self, columns: std::ops::RangeInclusive<u32>) -> Option<u32> {
        self.cells
            .iter()
            .filter(|(r, v)| columns.contains(&r.column) && v.as_text().is_some())
            .map(|(r, _)| r.row)
            .max()
    }

    /// Non-blank cells of `row`, from `from_column` rightwards.
    pub fn row_texts(&self, row: u32, from_column: u32) -> Vec<(u32, String)> {
        self.cells
            .range(CellRef::new(row, from_column)..=CellRef::new(row, u32::MAX))
            .filter_map(|(r, v)| v.as_text().map(|t| (r.column, t)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[derive(Default)]
struct PendingCell {
    reference: Option<CellRef>,
    kind: Option<String>,
    raw: String,
    inline: String,
}

/// Parses a worksheet part into its cell values.
///
/// Cells without an `r` attribute take the next position after the previous
/// cell, as Excel does.
pub(crate) fn parse_sheet(name: &str, part: &str, xml: &str, shared: &[String]) -> Result<Sheet> {
    let mut reader = Reader::from_str(xml);
    let mut cells = BTreeMap::new();

    let mut row = 0u32;
    let mut column = 0u32;
    let mut cell: Option<PendingCell> = None;
    let mut in_value = false;
    let mut in_inline_text = false;

    loop {
        let event = reader.read_event().map_err(|e| WorkbookError::xml(part, e))?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                match e.local_name().as_ref() {
                    b"row" => {
                        row = attr(part, e, b"r")?
                            .and_then(|r| r.parse().ok())
                            .unwrap_or(row + 1);
                        column = 0;
                    }
                    b"c" => {
                        let reference = match attr(part, e, b"r")? {
                            Some(r) => r.parse::<CellRef>()?,
                            None => CellRef::new(row.max(1), column + 1),
                        };
                        row = reference.row;
                        column = reference.column;

                        let pending = PendingCell {
                            reference: Some(reference),
                            kind: attr(part, e, b"t")?,
                            ..Default::default()
                        };
                        if !is_empty {
                            cell = Some(pending);
                        }
                    }
                    b"v" if !is_empty => in_value = true,
                    b"t" if !is_empty && cell.is_some() => in_inline_text = true,
                    _ => {}
                }
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"v" => in_value = false,
                b"t" => in_inline_text = false,
                b"c" => {
                    if let Some(done) = cell.take() {
                        if let Some(reference) = done.reference {
                            let value = decode_cell(part, &done, shared)?;
                            if value != CellValue::Empty {
                                cells.insert(reference, value);
                            }
                        }
                    }
                }
                _ => {}
            },
            Event::Text(ref t) if in_value || in_inline_text => {
                let text = t.decode().map_err(|e| WorkbookError::xml(part, e))?;
                if let Some(pending) = cell.as_mut() {
                    target(pending, in_value).push_str(&text);
                }
            }
            Event::CData(ref t) if in_value || in_inline_text => {
                let text = t.decode().map_err(|e| WorkbookError::xml(part, e))?;
                if let Some(pending) = cell.as_mut() {
                    target(pending, in_value).push_str(&text);
                }
            }
            Event::GeneralRef(ref r) if in_value || in_inline_text => {
                if let Some(pending) = cell.as_mut() {
                    push_entity(part, r, target(pending, in_value))?;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(Sheet {
        name: name.to_string(),
        cells,
    })
}

fn target(cell: &mut PendingCell, in_value: bool) -> &mut String {
    if in_value { &mut cell.raw } else { &mut cell.inline }
}

fn decode_cell(part: &str, cell: &PendingCell, shared: &[String]) -> Result<CellValue> {
    let raw = cell.raw.trim();
    let value = match cell.kind.as_deref() {
        Some("s") => {
            let index: usize = raw
                .parse()
                .map_err(|_| WorkbookError::xml(part, format!("bad shared string index '{raw}'")))?;
            let text = shared.get(index).ok_or_else(|| {
                WorkbookError::xml(part, format!("shared string index {index} out of range"))
            })?;
            CellValue::Text(text.clone())
        }
        Some("inlineStr") => CellValue::Text(cell.inline.clone()),
        Some("str") | Some("d") => CellValue::Text(cell.raw.clone()),
        Some("b") => CellValue::Bool(raw == "1" || raw.eq_ignore_ascii_case("true")),
        Some("e") => CellValue::Error(raw.to_string()),
        _ if raw.is_empty() => CellValue::Empty,
        _ => match raw.parse::<f64>() {
            Ok(n) => CellValue::Number(n),
            Err(_) => CellValue::Text(raw.to_string()),
        },
    };
    Ok(value)
}

fn attr(part: &str, e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for a in e.attributes().flatten() {
        if a.key.as_ref() == key {
            let value = a.unescape_value().map_err(|err| WorkbookError::xml(part, err))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// A rewritten worksheet part.
pub(crate) struct PatchedSheet {
    pub xml: Vec<u8>,
    /// Formulas dropped from replaced cells.
    pub formulas_removed: usize,
}

/// Rewrites a worksheet part so each cell in `updates` holds the given
/// number. Everything else in the part is streamed through unchanged.
///
/// A replaced cell keeps its style (`s`); any formula it carried is
/// dropped. Rows and cells that do not exist yet are inserted in order.
///
/// # Errors
///
/// Returns [`WorkbookError::FormulaAnchor`] when a replaced cell holds the
/// master of a shared formula, or of an array formula spanning other cells.
pub(crate) fn patch_sheet(part: &str, xml: &str, updates: &BTreeMap<CellRef, f64>) -> Result<PatchedSheet> {
    let mut pending: BTreeMap<u32, BTreeMap<u32, f64>> = BTreeMap::new();
    for (cell, value) in updates {
        pending.entry(cell.row).or_default().insert(cell.column, *value);
    }

    let mut reader = Reader::from_str(xml);
    let mut out = Patcher {
        part,
        writer: Writer::new(Vec::with_capacity(xml.len() + 256)),
    };

    let mut in_sheet_data = false;
    let mut row = 0u32;
    let mut column = 0u32;
    let mut row_pending: Option<BTreeMap<u32, f64>> = None;
    let mut skip_depth = 0usize;
    let mut replaced = CellRef::new(0, 0);
    let mut formulas_removed = 0usize;

    loop {
        let event = reader.read_event().map_err(|e| WorkbookError::xml(part, e))?;

        if skip_depth > 0 {
            match event {
                Event::Start(ref e) | Event::Empty(ref e) if e.local_name().as_ref() == b"f" => {
                    check_formula_anchor(part, replaced, e)?;
                    formulas_removed += 1;
                    if matches!(event, Event::Start(_)) {
                        skip_depth += 1;
                    }
                }
                Event::Start(_) => skip_depth += 1,
                Event::End(_) => skip_depth -= 1,
                Event::Eof => return Err(WorkbookError::xml(part, "unexpected end of document")),
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(ref e) if e.local_name().as_ref() == b"sheetData" => {
                in_sheet_data = true;
                out.write(event.borrow())?;
            }
            Event::Empty(ref e) if e.local_name().as_ref() == b"sheetData" => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                out.write(Event::Start(e.borrow()))?;
                for (r, cols) in std::mem::take(&mut pending) {
                    out.new_row(r, &cols)?;
                }
                out.write(Event::End(BytesEnd::new(name)))?;
            }
            Event::End(ref e) if e.local_name().as_ref() == b"sheetData" => {
                for (r, cols) in std::mem::take(&mut pending) {
                    out.new_row(r, &cols)?;
                }
                in_sheet_data = false;
                out.write(event.borrow())?;
            }
            Event::Start(ref e) | Event::Empty(ref e)
                if in_sheet_data && e.local_name().as_ref() == b"row" =>
            {
                let is_empty = matches!(event, Event::Empty(_));
                row = attr(part, e, b"r")?
                    .and_then(|r| r.parse().ok())
                    .unwrap_or(row + 1);
                column = 0;

                let earlier: Vec<u32> = pending.range(..row).map(|(r, _)| *r).collect();
                for r in earlier {
                    if let Some(cols) = pending.remove(&r) {
                        out.new_row(r, &cols)?;
                    }
                }

                match pending.remove(&row) {
                    Some(cols) => {
                        // The `spans` hint would no longer cover the new cells.
                        let start = without_attr(e, b"spans");
                        out.write(Event::Start(start.borrow()))?;
                        if is_empty {
                            out.cells(row, &cols)?;
                            out.write(Event::End(BytesEnd::new(name_of(e))))?;
                        } else {
                            row_pending = Some(cols);
                        }
                    }
                    None => out.write(event.borrow())?,
                }
            }
            Event::End(ref e) if in_sheet_data && e.local_name().as_ref() == b"row" => {
                if let Some(cols) = row_pending.take() {
                    out.cells(row, &cols)?;
                }
                out.write(event.borrow())?;
            }
            Event::Start(ref e) | Event::Empty(ref e)
                if in_sheet_data && e.local_name().as_ref() == b"c" =>
            {
                let is_empty = matches!(event, Event::Empty(_));
                let reference = match attr(part, e, b"r")? {
                    Some(r) => r.parse::<CellRef>()?,
                    None => CellRef::new(row.max(1), column + 1),
                };
                column = reference.column;

                let Some(cols) = row_pending.as_mut() else {
                    out.write(event.borrow())?;
                    continue;
                };

                let before: BTreeMap<u32, f64> = cols
                    .range(..reference.column)
                    .map(|(c, v)| (*c, *v))
                    .collect();
                for c in before.keys() {
                    cols.remove(c);
                }
                out.cells(row, &before)?;

                match cols.remove(&reference.column) {
                    Some(value) => {
                        let style = attr(part, e, b"s")?;
                        out.cell(reference, value, style.as_deref())?;
                        if !is_empty {
                            replaced = reference;
                            skip_depth = 1;
                        }
                    }
                    None => out.write(event.borrow())?,
                }
            }
            Event::Eof => break,
            other => out.write(other)?,
        }
    }

    if !pending.is_empty() {
        return Err(WorkbookError::xml(part, "worksheet has no sheetData element"));
    }

    Ok(PatchedSheet {
        xml: out.writer.into_inner(),
        formulas_removed,
    })
}

/// Rejects dropping a formula that other cells depend on.
fn check_formula_anchor(part: &str, cell: CellRef, f: &BytesStart<'_>) -> Result<()> {
    let Some(range) = attr(part, f, b"ref")? else {
        return Ok(());
    };
    let anchors_others = match attr(part, f, b"t")?.as_deref() {
        Some("shared") => true,
        Some("array") => range != cell.to_string() && range != format!("{cell}:{cell}"),
        _ => false,
    };

    if anchors_others {
        return Err(WorkbookError::FormulaAnchor {
            part: part.to_string(),
            cell: cell.to_string(),
            range,
        });
    }
    Ok(())
}

struct Patcher<'a> {
    part: &'a str,
    writer: Writer<Vec<u8>>,
}

impl Patcher<'_> {
    fn write(&mut self, event: Event<'_>) -> Result<()> {
        self.writer
            .write_event(event)
            .map_err(|e| WorkbookError::xml(self.part, e))
    }

    fn new_row(&mut self, row: u32, cols: &BTreeMap<u32, f64>) -> Result<()> {
        let mut start = BytesStart::new("row");
        start.push_attribute(("r", row.to_string().as_str()));
        self.write(Event::Start(start))?;
        self.cells(row, cols)?;
        self.write(Event::End(BytesEnd::new("row")))
    }

    fn cells(&mut self, row: u32, cols: &BTreeMap<u32, f64>) -> Result<()> {
        for (column, value) in cols {
            self.cell(CellRef::new(row, *column), *value, None)?;
        }
        Ok(())
    }

    fn cell(&mut self, reference: CellRef, value: f64, style: Option<&str>) -> Result<()> {
        let reference = reference.to_string();
        let mut start = BytesStart::new("c");
        start.push_attribute(("r", reference.as_str()));
        if let Some(s) = style {
            start.push_attribute(("s", s));
        }

        let number = format_number(value);
        self.write(Event::Start(start))?;
        self.write(Event::Start(BytesStart::new("v")))?;
        self.write(Event::Text(BytesText::new(&number)))?;
        self.write(Event::End(BytesEnd::new("v")))?;
        self.write(Event::End(BytesEnd::new("c")))
    }
}

fn name_of(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn without_attr(e: &BytesStart<'_>, key: &[u8]) -> BytesStart<'static> {
    let mut start = BytesStart::new(name_of(e));
    start.extend_attributes(e.attributes().flatten().filter(|a| a.key.as_ref() != key));
    start.into_owned()
}

/// Shortest decimal form that reads back as the same `f64`.
fn format_number(value: f64) -> String {
    if value == value.trunc() && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
