//! Header-aware reading of dataset samples.
//!
//! Only the header row and the first data row are ever needed: they tell the
//! model what the columns are called and what a value looks like.

use std::path::Path;

/// Column names plus the first data row of a CSV file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetSample {
    pub headers: Vec<String>,
    pub first_row: Option<Vec<String>>,
}

impl DatasetSample {
    /// Headers joined with `,`, as embedded in prompts.
    pub fn header_line(&self) -> String {
        self.headers.join(",")
    }

    /// First row values joined with `,`, if the file has a data row.
    pub fn first_row_line(&self) -> Option<String> {
        self.first_row.as_ref().map(|row| row.join(","))
    }
}

pub fn read_sample(path: &Path) -> Result<DatasetSample, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let headers = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect::<Vec<_>>();

    let first_row = match reader.records().next() {
        Some(record) => Some(record?.iter().map(str::to_string).collect()),
        None => None,
    };

    Ok(DatasetSample { headers, first_row })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn reads_headers_and_first_row() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("sample.csv");
        std::fs::write(
            &path,
            "\u{feff}id,amount,currency\n1,10.5,USD\n2,-3,EUR\n",
        )
        .unwrap();

        let sample = read_sample(&path).unwrap();
        assert_eq!(sample.header_line(), "id,amount,currency");
        assert_eq!(sample.first_row_line().as_deref(), Some("1,10.5,USD"));
    }

    #[test]
    fn header_only_file_has_no_row() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("empty.csv");
        std::fs::write(&path, "a,b\n").unwrap();

        let sample = read_sample(&path).unwrap();
        assert_eq!(sample.headers, vec!["a", "b"]);
        assert_eq!(sample.first_row, None);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(read_sample(Path::new("/no/such/dataset.csv")).is_err());
    }
}
