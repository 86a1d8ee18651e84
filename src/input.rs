//! Spreadsheet parsing

use std::io::Read;

use csv::{ReaderBuilder, Trim};

use crate::error::{Error, Result};
use crate::types::InputRow;

/// Columns the uploaded spreadsheet must carry
pub const REQUIRED_COLUMNS: [&str; 3] = ["CityName", "SubLocationName", "Polygon"];

/// Reads input rows from CSV, rejecting files that lack a required column
///
/// Extra columns are ignored and cell values are trimmed.
pub fn read_rows<R: Read>(source: R) -> Result<Vec<InputRow>> {
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(source);

    let headers = reader.headers()?;
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|column| !headers.iter().any(|h| h == **column))
        .map(|column| column.to_string())
        .collect();

    if !missing.is_empty() {
        return Err(Error::MissingColumns(missing));
    }

    reader
        .deserialize()
        .map(|row| row.map_err(Error::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_rows_ignoring_extra_columns() {
        let csv = "Id,CityName,SubLocationName,Polygon\n\
                   1,Pune, MG Road ,_p~iF~ps|U\n\
                   2,Mumbai,Bandra,0\n";
        let rows = read_rows(csv.as_bytes()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], InputRow::new("Pune", "MG Road", "_p~iF~ps|U"));
        assert!(rows[1].is_skip());
    }

    #[test]
    fn test_missing_columns_are_listed() {
        let csv = "CityName,Polygon\nPune,0\n";
        match read_rows(csv.as_bytes()) {
            Err(Error::MissingColumns(missing)) => assert_eq!(missing, vec!["SubLocationName"]),
            other => panic!("expected missing columns, got {:?}", other),
        }
    }

    #[test]
    fn test_header_only_is_empty() {
        let rows = read_rows("CityName,SubLocationName,Polygon\n".as_bytes()).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_quoted_fields() {
        let csv = "CityName,SubLocationName,Polygon\nPune,\"Camp, East\",\"_ulLnnqC\"\n";
        let rows = read_rows(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].sublocation, "Camp, East");
        assert_eq!(rows[0].polygon, "_ulLnnqC");
    }
}
