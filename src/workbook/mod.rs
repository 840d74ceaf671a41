//! Read and patch access to xlsx workbooks.
//!
//! Only what the scoring job needs: look sheets up by name, read their cell
//! values, and overwrite individual cells with numbers. Saving copies every
//! other part of the package unchanged, so formatting, formulas and charts
//! elsewhere in the workbook survive.

mod cell;
mod error;
mod package;
mod sheet;
mod strings;

pub use cell::{CellRef, CellValue, column_letters};
pub use error::{Result, WorkbookError};
pub use sheet::Sheet;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::{debug, info};

use package::{Package, has_attr, part_dir, rels_part_for, without_elements};

const OFFICE_DOCUMENT_REL: &str = "/officeDocument";
const SHARED_STRINGS_REL: &str = "/sharedStrings";
const CALC_CHAIN_REL: &str = "/calcChain";
const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
const DEFAULT_WORKBOOK_PART: &str = "xl/workbook.xml";

#[derive(Debug, Clone)]
struct SheetEntry {
    name: String,
    part: String,
}

/// The calculation chain and the relationship pointing at it.
#[derive(Debug, Clone)]
struct CalcChain {
    rel_id: String,
    part: String,
}

/// An opened workbook with pending cell edits.
pub struct Workbook {
    path: PathBuf,
    package: Package,
    sheets: Vec<SheetEntry>,
    shared_strings: Vec<String>,
    workbook_rels_part: String,
    calc_chain: Option<CalcChain>,
    edits: BTreeMap<String, BTreeMap<CellRef, f64>>,
}

impl Workbook {
    /// Opens the workbook at `path` and indexes its sheets.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let package = Package::open(&path)?;

        let workbook_part = workbook_part(&package)?;
        let workbook_rels_part = rels_part_for(&workbook_part);
        let workbook_rels = package.relationships(&workbook_rels_part, part_dir(&workbook_part))?;

        let targets: HashMap<&str, &str> = workbook_rels
            .iter()
            .map(|r| (r.id.as_str(), r.target.as_str()))
            .collect();

        let sheets = parse_sheet_list(&workbook_part, &package.read_part(&workbook_part)?)?
            .into_iter()
            .filter_map(|(name, rel_id)| {
                targets.get(rel_id.as_str()).map(|part| SheetEntry {
                    name,
                    part: part.to_string(),
                })
            })
            .collect::<Vec<_>>();

        let shared_part = workbook_rels
            .iter()
            .find(|r| r.kind.ends_with(SHARED_STRINGS_REL))
            .map(|r| r.target.clone());
        let shared_strings = match shared_part {
            Some(part) if package.contains(&part)? => {
                strings::parse_shared_strings(&part, &package.read_part(&part)?)?
            }
            _ => Vec::new(),
        };

        let calc_chain = workbook_rels
            .iter()
            .find(|r| r.kind.ends_with(CALC_CHAIN_REL))
            .map(|r| CalcChain {
                rel_id: r.id.clone(),
                part: r.target.clone(),
            });

        debug!(
            path = %path.display(),
            sheets = sheets.len(),
            shared_strings = shared_strings.len(),
            "Workbook opened"
        );

        Ok(Self {
            path,
            package,
            sheets,
            shared_strings,
            workbook_rels_part,
            calc_chain,
            edits: BTreeMap::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    /// Reads the sheet called `name`.
    ///
    /// Pending edits are not reflected; they only exist once saved.
    pub fn sheet(&self, name: &str) -> Result<Sheet> {
        let entry = self.entry(name)?;
        let xml = self.package.read_part(&entry.part)?;
        sheet::parse_sheet(&entry.name, &entry.part, &xml, &self.shared_strings)
    }

    /// Queues `value` to be written to `cell` of sheet `name` on save.
    pub fn set_number(&mut self, name: &str, cell: CellRef, value: f64) -> Result<()> {
        let part = self.entry(name)?.part.clone();
        self.edits.entry(part).or_default().insert(cell, value);
        Ok(())
    }

    /// Number of queued cell edits across all sheets.
    pub fn pending_edits(&self) -> usize {
        self.edits.values().map(BTreeMap::len).sum()
    }

    /// Writes queued edits back to the file the workbook was opened from.
    pub fn save(&mut self) -> Result<()> {
        let path = self.path.clone();
        self.save_as(&path)
    }

    /// Writes the workbook with queued edits applied to `path`.
    ///
    /// If a replaced cell held a formula, the calculation chain is dropped
    /// so that it no longer lists that cell; Excel rebuilds it on load.
    pub fn save_as(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let mut replacements = HashMap::new();
        let mut formulas_removed = 0;
        for (part, updates) in &self.edits {
            let xml = self.package.read_part(part)?;
            let patched = sheet::patch_sheet(part, &xml, updates)?;
            formulas_removed += patched.formulas_removed;
            replacements.insert(part.clone(), patched.xml);
        }

        let mut removed = HashSet::new();
        if formulas_removed > 0 {
            if let Some(chain) = &self.calc_chain {
                self.drop_calc_chain(chain, &mut replacements, &mut removed)?;
            }
        }

        self.package.save(path.as_ref(), &replacements, &removed)?;
        info!(
            path = %path.as_ref().display(),
            cells = self.pending_edits(),
            "Workbook saved"
        );

        // The package on disk now holds the edits.
        self.package = Package::open(path.as_ref())?;
        self.path = path.as_ref().to_path_buf();
        if !removed.is_empty() {
            self.calc_chain = None;
        }
        self.edits.clear();
        Ok(())
    }

    /// Leaves the calculation chain out of the next save, along with its
    /// relationship and content type override.
    fn drop_calc_chain(
        &self,
        chain: &CalcChain,
        replacements: &mut HashMap<String, Vec<u8>>,
        removed: &mut HashSet<String>,
    ) -> Result<()> {
        if !self.package.contains(&chain.part)? {
            return Ok(());
        }

        let rels = self.package.read_part(&self.workbook_rels_part)?;
        let rels = without_elements(&self.workbook_rels_part, &rels, |e| {
            e.local_name().as_ref() == b"Relationship" && has_attr(e, b"Id", &chain.rel_id)
        })?;
        replacements.insert(self.workbook_rels_part.clone(), rels);

        if self.package.contains(CONTENT_TYPES_PART)? {
            let part_name = format!("/{}", chain.part);
            let types = self.package.read_part(CONTENT_TYPES_PART)?;
            let types = without_elements(CONTENT_TYPES_PART, &types, |e| {
                e.local_name().as_ref() == b"Override" && has_attr(e, b"PartName", &part_name)
            })?;
            replacements.insert(CONTENT_TYPES_PART.to_string(), types);
        }

        removed.insert(chain.part.clone());
        debug!(part = %chain.part, "Calculation chain dropped");
        Ok(())
    }

    fn entry(&self, name: &str) -> Result<&SheetEntry> {
        self.sheets
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| WorkbookError::SheetNotFound(name.to_string()))
    }
}

#[cfg(test)]
pub(crate) fn parse_test_sheet(xml: &str) -> Sheet {
    sheet::parse_sheet("test", "xl/worksheets/test.xml", xml, &[]).expect("test sheet XML")
}

/// Locates the main workbook part through the package relationships.
fn workbook_part(package: &Package) -> Result<String> {
    if package.contains("_rels/.rels")? {
        let rels = package.relationships("_rels/.rels", "")?;
        if let Some(rel) = rels.iter().find(|r| r.kind.ends_with(OFFICE_DOCUMENT_REL)) {
            return Ok(rel.target.clone());
        }
    }
    Ok(DEFAULT_WORKBOOK_PART.to_string())
}

/// `(sheet name, relationship id)` pairs in workbook order.
fn parse_sheet_list(part: &str, xml: &str) -> Result<Vec<(String, String)>> {
    let mut reader = Reader::from_str(xml);
    let mut sheets = Vec::new();

    loop {
        match reader.read_event().map_err(|e| WorkbookError::xml(part, e))? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let mut name = None;
                let mut rel_id = None;

                for attr in e.attributes().flatten() {
                    let value = attr
                        .unescape_value()
                        .map_err(|err| WorkbookError::xml(part, err))?
                        .into_owned();
                    match attr.key.local_name().as_ref() {
                        b"name" => name = Some(value),
                        b"id" => rel_id = Some(value),
                        _ => {}
                    }
                }

                if let (Some(name), Some(rel_id)) = (name, rel_id) {
                    sheets.push((name, rel_id));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(sheets)
}
