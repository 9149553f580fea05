//! CILI (Collaborative Interlingual Index) TSV ingestion.
//!
//! The CILI distribution is a tab-separated file, one row per interlingual
//! index entry, with a header row naming columns. Parsed with the `csv`
//! crate's `Delimiter::Tab` mode rather than hand-rolled splitting, the way
//! the rest of the pack reaches for `csv` over manual string work.

use crate::entities::Ili;
use crate::error::{Error, Result};
use std::io::Read;

const REQUIRED_COLUMNS: &[&str] = &["ili", "status"];

/// Parses a CILI TSV document (already decompressed/extracted plain text)
/// into `Ili` rows.
pub fn parse_cili_tsv<R: Read>(reader: R) -> Result<Vec<Ili>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let index_of = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));

    for required in REQUIRED_COLUMNS {
        if index_of(required).is_none() {
            return Err(Error::TsvParse(format!(
                "CILI TSV is missing required column '{}'",
                required
            )));
        }
    }

    let id_idx = index_of("ili").unwrap();
    let status_idx = index_of("status").unwrap();
    let definition_idx = index_of("definition");
    let superseded_idx = index_of("supersededby").or_else(|| index_of("superseded_by"));
    let note_idx = index_of("note");

    let mut ilis = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let id = record
            .get(id_idx)
            .ok_or_else(|| Error::TsvParse("row missing 'ili' column".into()))?
            .to_string();
        if id.is_empty() {
            continue;
        }
        let status = record.get(status_idx).unwrap_or("").to_string();
        let definition = definition_idx
            .and_then(|i| record.get(i))
            .filter(|s| !s.is_empty())
            .map(String::from);
        let superseded_by = superseded_idx
            .and_then(|i| record.get(i))
            .filter(|s| !s.is_empty())
            .map(String::from);
        let note = note_idx
            .and_then(|i| record.get(i))
            .filter(|s| !s.is_empty())
            .map(String::from);

        ilis.push(Ili {
            id,
            status,
            definition,
            superseded_by,
            note,
            meta: None,
        });
    }

    Ok(ilis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_cili_tsv() {
        let tsv = "ili\tstatus\tdefinition\ni12345\tactive\tan act of running\ni12346\tactive\t\n";
        let ilis = parse_cili_tsv(tsv.as_bytes()).unwrap();
        assert_eq!(ilis.len(), 2);
        assert_eq!(ilis[0].id, "i12345");
        assert_eq!(ilis[0].definition.as_deref(), Some("an act of running"));
        assert_eq!(ilis[1].definition, None);
    }

    #[test]
    fn rejects_missing_required_column() {
        let tsv = "foo\tbar\n1\t2\n";
        let err = parse_cili_tsv(tsv.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::TsvParse(_)));
    }

    #[test]
    fn skips_rows_with_empty_id() {
        let tsv = "ili\tstatus\n\tactive\ni1\tactive\n";
        let ilis = parse_cili_tsv(tsv.as_bytes()).unwrap();
        assert_eq!(ilis.len(), 1);
        assert_eq!(ilis[0].id, "i1");
    }
}
