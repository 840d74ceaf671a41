//! Builds small league workbooks for the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

pub const ROSTER_SHEET: &str = "2024 Draft";
pub const STANDINGS_SHEET: &str = "2024 Standings";

/// Rounds pre-filled in the standings sheet (column A labels).
pub const SEASON_ROUNDS: u32 = 24;

pub struct LeagueFixture<'a> {
    /// Owner name and drafted drivers, in roster column order (B, C, D, ...).
    pub roster: Vec<(&'a str, Vec<&'a str>)>,
    /// Owner headers of the standings sheet, from column B.
    pub standings_owners: Vec<&'a str>,
    /// Scores already present in the standings: (row, column, value).
    pub existing_scores: Vec<(u32, u32, f64)>,
}

impl<'a> LeagueFixture<'a> {
    pub fn new(roster: Vec<(&'a str, Vec<&'a str>)>) -> Self {
        let standings_owners = roster.iter().map(|(o, _)| *o).collect();
        Self {
            roster,
            standings_owners,
            existing_scores: Vec::new(),
        }
    }

    pub fn standings_owners(mut self, owners: Vec<&'a str>) -> Self {
        self.standings_owners = owners;
        self
    }

    pub fn existing_score(mut self, row: u32, column: u32, value: f64) -> Self {
        self.existing_scores.push((row, column, value));
        self
    }

    /// Writes the workbook as `F1 Fantasy.xlsx` inside `dir`.
    pub fn write(&self, dir: &Path) -> PathBuf {
        let path = dir.join("F1 Fantasy.xlsx");
        let mut strings = SharedStrings::default();

        let roster_xml = self.roster_sheet(&mut strings);
        let standings_xml = self.standings_sheet(&mut strings);

        let file = File::create(&path).unwrap();
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default();

        for (name, content) in [
            ("[Content_Types].xml", CONTENT_TYPES.to_string()),
            ("_rels/.rels", ROOT_RELS.to_string()),
            ("xl/workbook.xml", WORKBOOK.to_string()),
            ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.to_string()),
            ("xl/worksheets/sheet1.xml", roster_xml),
            ("xl/worksheets/sheet2.xml", standings_xml),
            ("xl/sharedStrings.xml", strings.to_xml()),
            ("xl/styles.xml", STYLES.to_string()),
        ] {
            zip.start_file(name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();

        path
    }

    fn roster_sheet(&self, strings: &mut SharedStrings) -> String {
        let depth = self.roster.iter().map(|(_, d)| d.len()).max().unwrap_or(0);
        let mut rows = Vec::new();

        let mut header = vec![cell_s(1, 1, strings.index("Pick"))];
        for (i, (owner, _)) in self.roster.iter().enumerate() {
            header.push(cell_s(1, i as u32 + 2, strings.index(owner)));
        }
        rows.push(row(1, &header));

        for pick in 0..depth {
            let r = pick as u32 + 2;
            let mut cells = vec![cell_n(r, 1, (pick + 1) as f64, None)];
            for (i, (_, drivers)) in self.roster.iter().enumerate() {
                if let Some(driver) = drivers.get(pick) {
                    cells.push(cell_s(r, i as u32 + 2, strings.index(driver)));
                }
            }
            rows.push(row(r, &cells));
        }

        // Footer: a formula per owner column, cached as a string.
        let footer = depth as u32 + 2;
        let mut cells = vec![cell_s(footer, 1, strings.index("Average"))];
        for i in 0..self.roster.len() {
            let col = i as u32 + 2;
            cells.push(format!(
                r#"<c r="{}{}" t="str"><f>"avg"</f><v>avg</v></c>"#,
                letters(col),
                footer
            ));
        }
        rows.push(row(footer, &cells));

        worksheet(&rows.concat())
    }

    fn standings_sheet(&self, strings: &mut SharedStrings) -> String {
        let existing: HashMap<(u32, u32), f64> = self
            .existing_scores
            .iter()
            .map(|(r, c, v)| ((*r, *c), *v))
            .collect();

        let mut rows = Vec::new();
        let mut header = vec![cell_s(1, 1, strings.index("Round"))];
        for (i, owner) in self.standings_owners.iter().enumerate() {
            header.push(cell_s(1, i as u32 + 2, strings.index(owner)));
        }
        rows.push(row(1, &header));

        for round in 1..=SEASON_ROUNDS {
            let r = round + 1;
            let mut cells = vec![cell_n(r, 1, round as f64, None)];
            let mut existing_here: Vec<_> = existing
                .iter()
                .filter(|((er, _), _)| *er == r)
                .map(|((_, c), v)| (*c, *v))
                .collect();
            existing_here.sort_by_key(|(c, _)| *c);
            for (c, v) in existing_here {
                cells.push(cell_n(r, c, v, Some(1)));
            }
            rows.push(row(r, &cells));
        }

        worksheet(&rows.concat())
    }
}

#[derive(Default)]
struct SharedStrings {
    strings: Vec<String>,
}

impl SharedStrings {
    fn index(&mut self, s: &str) -> usize {
        match self.strings.iter().position(|x| x == s) {
            Some(i) => i,
            None => {
                self.strings.push(s.to_string());
                self.strings.len() - 1
            }
        }
    }

    fn to_xml(&self) -> String {
        let items: String = self
            .strings
            .iter()
            .map(|s| format!("<si><t>{}</t></si>", escape(s)))
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{n}" uniqueCount="{n}">{items}</sst>"#,
            n = self.strings.len()
        )
    }
}

pub fn letters(mut col: u32) -> String {
    let mut out = Vec::new();
    while col > 0 {
        col -= 1;
        out.push((col % 26) as u8 + b'A');
        col /= 26;
    }
    out.reverse();
    String::from_utf8(out).unwrap()
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn cell_s(r: u32, c: u32, index: usize) -> String {
    format!(r#"<c r="{}{}" t="s"><v>{}</v></c>"#, letters(c), r, index)
}

fn cell_n(r: u32, c: u32, value: f64, style: Option<u32>) -> String {
    let style = style.map(|s| format!(r#" s="{s}""#)).unwrap_or_default();
    format!(r#"<c r="{}{}"{}><v>{}</v></c>"#, letters(c), r, style, value)
}

fn row(r: u32, cells: &[String]) -> String {
    format!(r#"<row r="{}">{}</row>"#, r, cells.concat())
}

fn worksheet(sheet_data: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheetViews><sheetView workbookViewId="0"/></sheetViews><sheetFormatPr defaultRowHeight="15"/><sheetData>{sheet_data}</sheetData><pageMargins left="0.7" right="0.7" top="0.75" bottom="0.75" header="0.3" footer="0.3"/></worksheet>"#
    )
}

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/worksheets/sheet2.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><bookViews><workbookView activeTab="0"/></bookViews><sheets><sheet name="2024 Draft" sheetId="1" r:id="rId1"/><sheet name="2024 Standings" sheetId="2" r:id="rId2"/></sheets></workbook>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet2.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/><Relationship Id="rId4" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><numFmts count="1"><numFmt numFmtId="164" formatCode="0.00"/></numFmts><fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border/></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="164" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/></cellXfs></styleSheet>"#;
