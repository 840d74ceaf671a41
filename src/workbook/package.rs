//! The zip container underneath an xlsx file.
//!
//! Parts are read on demand from an in-memory copy of the archive. Saving
//! copies every untouched entry verbatim (no recompression), writes the
//! replaced parts fresh and leaves removed parts out.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::error::{Result, WorkbookError};

pub(crate) struct Package {
    data: Vec<u8>,
}

impl Package {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(WorkbookError::NotFound(path.to_path_buf()));
        }

        let data = fs::read(path)?;
        // Fail early on anything that is not a zip archive.
        ZipArchive::new(Cursor::new(data.as_slice()))?;
        debug!(path = %path.display(), bytes = data.len(), "Workbook package loaded");

        Ok(Self { data })
    }

    fn archive(&self) -> Result<ZipArchive<Cursor<&[u8]>>> {
        Ok(ZipArchive::new(Cursor::new(self.data.as_slice()))?)
    }

    pub(crate) fn contains(&self, name: &str) -> Result<bool> {
        Ok(self.archive()?.index_for_name(name).is_some())
    }

    /// Reads a part as UTF-8 text.
    pub(crate) fn read_part(&self, name: &str) -> Result<String> {
        let mut archive = self.archive()?;
        let mut file = match archive.by_name(name) {
            Ok(file) => file,
            Err(zip::result::ZipError::FileNotFound) => {
                return Err(WorkbookError::MissingPart(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let mut content = String::new();
        file.read_to_string(&mut content)?;
        Ok(content)
    }

    /// Reads a relationships part into `Id -> resolved part name`.
    ///
    /// `base_dir` is the folder of the part that owns the relationships
    /// (`"xl"` for `xl/_rels/workbook.xml.rels`, `""` for `_rels/.rels`).
    pub(crate) fn relationships(&self, rels_part: &str, base_dir: &str) -> Result<Vec<Relationship>> {
        let xml = self.read_part(rels_part)?;
        let mut reader = Reader::from_str(&xml);
        let mut rels = Vec::new();

        loop {
            match reader.read_event().map_err(|e| WorkbookError::xml(rels_part, e))? {
                Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                    let mut id = None;
                    let mut kind = String::new();
                    let mut target = None;

                    for attr in e.attributes().flatten() {
                        let value = attr
                            .unescape_value()
                            .map_err(|err| WorkbookError::xml(rels_part, err))?
                            .into_owned();
                        match attr.key.local_name().as_ref() {
                            b"Id" => id = Some(value),
                            b"Type" => kind = value,
                            b"Target" => target = Some(value),
                            _ => {}
                        }
                    }

                    if let (Some(id), Some(target)) = (id, target) {
                        rels.push(Relationship {
                            id,
                            kind,
                            target: resolve_target(base_dir, &target),
                        });
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(rels)
    }

    /// Writes the package to `path`, substituting `replacements` (part name
    /// -> new content), leaving out `removed` and copying everything else
    /// unchanged.
    ///
    /// The archive is written and synced to a sibling temporary file first
    /// and renamed over `path` once complete.
    pub(crate) fn save(
        &self,
        path: &Path,
        replacements: &HashMap<String, Vec<u8>>,
        removed: &HashSet<String>,
    ) -> Result<()> {
        let tmp_path = temp_sibling(path);
        let file = File::create(&tmp_path)?;

        let written = self
            .write_to(file, replacements, removed)
            .and_then(|file| Ok(file.sync_all()?))
            .and_then(|()| Ok(fs::rename(&tmp_path, path)?));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        debug!(
            path = %path.display(),
            replaced = replacements.len(),
            removed = removed.len(),
            "Workbook package saved"
        );
        Ok(())
    }

    /// Writes the archive to `out` and hands it back once finished.
    fn write_to<W: Write + Seek>(
        &self,
        out: W,
        replacements: &HashMap<String, Vec<u8>>,
        removed: &HashSet<String>,
    ) -> Result<W> {
        let mut archive = self.archive()?;
        let mut writer = ZipWriter::new(out);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for i in 0..archive.len() {
            let entry = archive.by_index_raw(i)?;
            let name = entry.name().to_string();
            if removed.contains(&name) {
                continue;
            }

            match replacements.get(&name) {
                Some(content) => {
                    drop(entry);
                    writer.start_file(name, options)?;
                    writer.write_all(content)?;
                }
                None => writer.raw_copy_file(entry)?,
            }
        }

        Ok(writer.finish()?)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Relationship {
    pub id: String,
    pub kind: String,
    pub target: String,
}

/// Resolves a relationship target against the owning part's folder.
pub(crate) fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Streams `xml` through unchanged except for the elements matching `drop`,
/// which are left out along with their content.
pub(crate) fn without_elements(
    part: &str,
    xml: &str,
    drop: impl Fn(&BytesStart<'_>) -> bool,
) -> Result<Vec<u8>> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));
    let mut skip_depth = 0usize;

    loop {
        let event = reader.read_event().map_err(|e| WorkbookError::xml(part, e))?;

        if skip_depth > 0 {
            match event {
                Event::Start(_) => skip_depth += 1,
                Event::End(_) => skip_depth -= 1,
                Event::Eof => return Err(WorkbookError::xml(part, "unexpected end of document")),
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(ref e) if drop(e) => skip_depth = 1,
            Event::Empty(ref e) if drop(e) => {}
            Event::Eof => break,
            other => writer
                .write_event(other)
                .map_err(|e| WorkbookError::xml(part, e))?,
        }
    }

    Ok(writer.into_inner())
}

/// True when `e` carries attribute `key` with exactly `value`.
pub(crate) fn has_attr(e: &BytesStart<'_>, key: &[u8], value: &str) -> bool {
    e.attributes()
        .flatten()
        .any(|a| a.key.local_name().as_ref() == key && a.value.as_ref() == value.as_bytes())
}

/// Folder portion of a part name (`"xl/workbook.xml"` -> `"xl"`).
pub(crate) fn part_dir(part: &str) -> &str {
    part.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Relationships part for a given part (`"xl/workbook.xml"` ->
/// `"xl/_rels/workbook.xml.rels"`).
pub(crate) fn rels_part_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
