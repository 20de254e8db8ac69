// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! CSV mapping file parsing
//!
//! The mapping file is a CSV with at least `old` and `new` columns
//! (case-insensitive headers, extra columns ignored). Each row names one
//! old-user/new-user identifier pair; identifiers may be emails or
//! accountIds. Blank cells are kept here and rejected later during
//! resolution, where a per-row warning is more useful than a parse
//! error.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// One row of the mapping file, untrimmed of meaning but trimmed of
/// whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierPair {
    pub old: String,
    pub new: String,
}

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("cannot read mapping file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("mapping file '{}' must have 'old' and 'new' columns", path.display())]
    MissingHeaders { path: PathBuf },
}

/// Read the identifier pairs out of a mapping CSV.
pub fn read_mapping(path: &Path) -> Result<Vec<IdentifierPair>, MappingError> {
    let mut reader = csv::Reader::from_path(path).map_err(|source| MappingError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let headers = reader.headers().map_err(|source| MappingError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let column = |name: &str| {
        headers
            .iter()
            .position(|header| header.trim().eq_ignore_ascii_case(name))
    };
    let (Some(old_column), Some(new_column)) = (column("old"), column("new")) else {
        return Err(MappingError::MissingHeaders {
            path: path.to_path_buf(),
        });
    };

    let mut pairs = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| MappingError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        pairs.push(IdentifierPair {
            old: record.get(old_column).unwrap_or_default().trim().to_string(),
            new: record.get(new_column).unwrap_or_default().trim().to_string(),
        });
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write as _;
    use test_case::test_case;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(content.as_bytes()).expect("write csv");
        file
    }

    fn pair(old: &str, new: &str) -> IdentifierPair {
        IdentifierPair {
            old: old.to_string(),
            new: new.to_string(),
        }
    }

    #[test]
    fn reads_pairs_in_row_order() {
        let file = write_csv("old,new\nmia@example.com,petra@example.com\nA2,B2\n");
        let pairs = read_mapping(file.path()).expect("well-formed csv");
        assert_eq!(
            pairs,
            vec![
                pair("mia@example.com", "petra@example.com"),
                pair("A2", "B2"),
            ]
        );
    }

    #[test]
    fn headers_are_case_insensitive_and_extra_columns_ignored() {
        let file = write_csv("note, OLD ,New\nhandover, mia@example.com , petra@example.com \n");
        let pairs = read_mapping(file.path()).expect("headers found");
        assert_eq!(pairs, vec![pair("mia@example.com", "petra@example.com")]);
    }

    #[test]
    fn blank_cells_survive_to_resolution() {
        let file = write_csv("old,new\n,petra@example.com\n");
        let pairs = read_mapping(file.path()).expect("blank cell is not a parse error");
        assert_eq!(pairs, vec![pair("", "petra@example.com")]);
    }

    #[test_case("from,to\na,b\n" ; "neither column")]
    #[test_case("old,target\na,b\n" ; "no new column")]
    #[test_case("source,new\na,b\n" ; "no old column")]
    fn missing_headers_are_rejected(content: &str) {
        let file = write_csv(content);
        let error = read_mapping(file.path()).expect_err("no old/new columns");
        assert!(matches!(error, MappingError::MissingHeaders { .. }));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let file = write_csv("old,new\na,b,c\n");
        let error = read_mapping(file.path()).expect_err("ragged row");
        assert!(matches!(error, MappingError::Read { .. }));
    }

    #[test]
    fn unreadable_file_is_rejected() {
        let error =
            read_mapping(Path::new("/nonexistent/mapping.csv")).expect_err("missing file");
        assert!(matches!(error, MappingError::Read { .. }));
    }
}
