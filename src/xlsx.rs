//! XLSX Workbook Generator Module
//! Writes the summary tables and KPIs as sheets of one workbook.
//!
//! Uses direct ZIP/XML generation (SpreadsheetML with inline strings), the
//! same way the package parts of any OOXML document are laid out.

use crate::data::Aggregates;
use crate::stats::Kpis;
use polars::prelude::{AnyValue, DataFrame, PolarsError, PolarsResult};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;
use zip::result::{ZipError, ZipResult};
use zip::write::FileOptions;
use zip::ZipWriter;

pub const WORKBOOK_FILE: &str = "sales_summary.xlsx";

#[derive(Error, Debug)]
pub enum XlsxError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write workbook archive {path}: {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: ZipError,
    },
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

/// A single worksheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

/// One worksheet: a header row followed by data rows.
#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    /// Column names become the header; values keep their numeric/text type.
    pub fn from_frame(name: &str, df: &DataFrame) -> PolarsResult<Self> {
        let header = df
            .get_column_names()
            .iter()
            .map(|n| n.to_string())
            .collect();

        let columns = df.get_columns();
        let mut rows = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            let row = columns
                .iter()
                .map(|col| col.get(i).map(Self::cell_from_any))
                .collect::<PolarsResult<Vec<Cell>>>()?;
            rows.push(row);
        }

        Ok(Self {
            name: name.to_string(),
            header,
            rows,
        })
    }

    /// A single-row sheet keyed by KPI names.
    pub fn from_kpis(name: &str, kpis: &Kpis) -> Self {
        let entries = kpis.entries();
        Self {
            name: name.to_string(),
            header: entries.iter().map(|(k, _)| k.to_string()).collect(),
            rows: vec![entries.iter().map(|(_, v)| Cell::Number(*v)).collect()],
        }
    }

    fn cell_from_any(value: AnyValue) -> Cell {
        match value {
            AnyValue::Null => Cell::Empty,
            AnyValue::String(s) => Cell::Text(s.to_string()),
            AnyValue::StringOwned(s) => Cell::Text(s.to_string()),
            AnyValue::Boolean(b) => Cell::Text(b.to_string()),
            other => match other.extract::<f64>() {
                Some(v) => Cell::Number(v),
                None => Cell::Text(other.to_string()),
            },
        }
    }
}

/// Workbook generator for the sales summary
pub struct XlsxGenerator;

impl XlsxGenerator {
    /// Write `sales_summary.xlsx` with Monthly, Region, Top Products and KPIs sheets.
    pub fn export_workbook(
        aggregates: &Aggregates,
        kpis: &Kpis,
        output_dir: &Path,
    ) -> Result<PathBuf, XlsxError> {
        let sheets = [
            Sheet::from_frame("Monthly", &aggregates.monthly)?,
            Sheet::from_frame("Region", &aggregates.region)?,
            Sheet::from_frame("Top Products", &aggregates.products)?,
            Sheet::from_kpis("KPIs", kpis),
        ];
        let path = output_dir.join(WORKBOOK_FILE);
        Self::write_workbook(&sheets, &path, "Sales Summary")?;
        Ok(path)
    }

    /// Write the given sheets as an .xlsx package, overwriting `output_path`.
    pub fn write_workbook(sheets: &[Sheet], output_path: &Path, title: &str) -> Result<(), XlsxError> {
        let file = File::create(output_path).map_err(|source| XlsxError::Io {
            path: output_path.to_path_buf(),
            source,
        })?;
        Self::write_parts(file, sheets, title).map_err(|source| XlsxError::Zip {
            path: output_path.to_path_buf(),
            source,
        })?;

        info!(
            "workbook saved: {} ({} sheets)",
            output_path.display(),
            sheets.len()
        );
        Ok(())
    }

    fn write_parts(file: File, sheets: &[Sheet], title: &str) -> ZipResult<()> {
        let mut zip = ZipWriter::new(file);
        let options = FileOptions::default();

        // 1. [Content_Types].xml
        zip.start_file("[Content_Types].xml", options)?;
        zip.write_all(Self::content_types_xml(sheets.len()).as_bytes())?;

        // 2. _rels/.rels
        zip.start_file("_rels/.rels", options)?;
        zip.write_all(Self::rels_xml().as_bytes())?;

        // 3. xl/workbook.xml and its relationships
        zip.start_file("xl/workbook.xml", options)?;
        zip.write_all(Self::workbook_xml(sheets).as_bytes())?;
        zip.start_file("xl/_rels/workbook.xml.rels", options)?;
        zip.write_all(Self::workbook_rels_xml(sheets.len()).as_bytes())?;

        // 4. Worksheets
        for (idx, sheet) in sheets.iter().enumerate() {
            zip.start_file(format!("xl/worksheets/sheet{}.xml", idx + 1), options)?;
            zip.write_all(Self::sheet_xml(sheet).as_bytes())?;
        }

        // 5. Styles
        zip.start_file("xl/styles.xml", options)?;
        zip.write_all(Self::styles_xml().as_bytes())?;

        // 6. docProps
        zip.start_file("docProps/core.xml", options)?;
        zip.write_all(Self::core_props_xml(title).as_bytes())?;
        zip.start_file("docProps/app.xml", options)?;
        zip.write_all(Self::app_props_xml(sheets).as_bytes())?;

        zip.finish()?;
        Ok(())
    }

    fn content_types_xml(sheet_count: usize) -> String {
        let mut xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>
<Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>
<Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>
"#
        .to_string();

        for i in 1..=sheet_count {
            xml.push_str(&format!(
                r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
                i
            ));
            xml.push('\n');
        }
        xml.push_str("</Types>");
        xml
    }

    fn rels_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/>
</Relationships>"#
    }

    fn workbook_xml(sheets: &[Sheet]) -> String {
        let mut entries = String::new();
        for (idx, sheet) in sheets.iter().enumerate() {
            entries.push_str(&format!(
                r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                escape_xml(&sheet.name),
                idx + 1,
                idx + 1
            ));
        }

        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<bookViews><workbookView/></bookViews>
<sheets>{}</sheets>
</workbook>"#,
            entries
        )
    }

    fn workbook_rels_xml(sheet_count: usize) -> String {
        let mut xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
"#
        .to_string();

        for i in 1..=sheet_count {
            xml.push_str(&format!(
                r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
                i, i
            ));
            xml.push('\n');
        }
        xml.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
            sheet_count + 1
        ));
        xml.push_str("\n</Relationships>");
        xml
    }

    fn sheet_xml(sheet: &Sheet) -> String {
        let mut rows = String::new();

        let header: Vec<Cell> = sheet.header.iter().cloned().map(Cell::Text).collect();
        for (r, cells) in std::iter::once(&header).chain(sheet.rows.iter()).enumerate() {
            let row_num = r + 1;
            rows.push_str(&format!(r#"<row r="{}">"#, row_num));
            for (c, cell) in cells.iter().enumerate() {
                let cell_ref = format!("{}{}", column_letter(c), row_num);
                match cell {
                    Cell::Text(text) => rows.push_str(&format!(
                        r#"<c r="{}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                        cell_ref,
                        escape_xml(text)
                    )),
                    Cell::Number(v) if v.is_finite() => {
                        rows.push_str(&format!(r#"<c r="{}"><v>{}</v></c>"#, cell_ref, v))
                    }
                    Cell::Number(_) | Cell::Empty => {}
                }
            }
            rows.push_str("</row>\n");
        }

        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<sheetData>
{}</sheetData>
</worksheet>"#,
            rows
        )
    }

    fn styles_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts>
<fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills>
<borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>
<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>
<cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs>
<cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>
</styleSheet>"#
    }

    fn core_props_xml(title: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:dcmitype="http://purl.org/dc/dcmitype/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
<dc:title>{}</dc:title>
<dc:creator>Sales Analyser</dc:creator>
<cp:lastModifiedBy>Sales Analyser</cp:lastModifiedBy>
</cp:coreProperties>"#,
            escape_xml(title)
        )
    }

    fn app_props_xml(sheets: &[Sheet]) -> String {
        let names: String = sheets
            .iter()
            .map(|s| format!("<vt:lpstr>{}</vt:lpstr>", escape_xml(&s.name)))
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties" xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes">
<Application>Sales Analyser</Application>
<DocSecurity>0</DocSecurity>
<ScaleCrop>false</ScaleCrop>
<HeadingPairs><vt:vector size="2" baseType="variant"><vt:variant><vt:lpstr>Worksheets</vt:lpstr></vt:variant><vt:variant><vt:i4>{}</vt:i4></vt:variant></vt:vector></HeadingPairs>
<TitlesOfParts><vt:vector size="{}" baseType="lpstr">{}</vt:vector></TitlesOfParts>
<LinksUpToDate>false</LinksUpToDate>
<SharedDoc>false</SharedDoc>
<HyperlinksChanged>false</HyperlinksChanged>
<AppVersion>16.0300</AppVersion>
</Properties>"#,
            sheets.len(),
            sheets.len(),
            names
        )
    }
}

/// Zero-based column index to spreadsheet letters: 0 -> A, 25 -> Z, 26 -> AA.
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Escape text for XML/HTML element content and attribute values.
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
