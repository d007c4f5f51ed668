use std::{collections::HashMap, collections::HashSet, io::Read};

use anyhow::Context;
use csv::{ReaderBuilder, StringRecord, Trim};

use crate::{
    error::{AppError, AppResult},
    validation::missing_headers,
};

/// A parsed CSV upload whose header row has been checked.
#[derive(Debug)]
pub struct CsvTable {
    columns: HashMap<String, usize>,
    records: Vec<(u64, StringRecord)>,
}

/// One data row, addressed by header name.
#[derive(Debug, Clone, Copy)]
pub struct CsvRow<'a> {
    columns: &'a HashMap<String, usize>,
    line: u64,
    record: &'a StringRecord,
}

impl<'a> CsvRow<'a> {
    /// 1-based line in the file; the header is line 1.
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Trimmed cell, empty when the column or the cell is missing.
    pub fn get(&self, header: &str) -> &'a str {
        self.columns
            .get(header)
            .and_then(|&i| self.record.get(i))
            .unwrap_or("")
    }
}

impl CsvTable {
    /// Reads the whole file. Fails with a validation error naming every
    /// missing header, before any row is looked at.
    pub fn read<R: Read>(reader: R, required: &[&str]) -> AppResult<Self> {
        let mut rdr = ReaderBuilder::new()
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()
            .context("Error reading CSV file")?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        let present: HashSet<&str> = headers.iter().map(String::as_str).collect();
        let missing = missing_headers(&present, required);
        if !missing.is_empty() {
            return Err(AppError::validation(format!(
                "Missing or invalid headers: {}",
                missing.join(", ")
            )));
        }

        let mut columns = HashMap::with_capacity(headers.len());
        for (i, h) in headers.into_iter().enumerate() {
            columns.entry(h).or_insert(i);
        }

        let mut records = Vec::new();
        for (idx, rec) in rdr.records().enumerate() {
            let rec = rec.context("Error reading CSV file")?;
            if rec.iter().all(str::is_empty) {
                continue;
            }
            let line = rec
                .position()
                .map(|p| p.line())
                .unwrap_or(idx as u64 + 2);
            records.push((line, rec));
        }

        Ok(Self { columns, records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn rows(&self) -> impl Iterator<Item = CsvRow<'_>> {
        self.records.iter().map(|(line, record)| CsvRow {
            columns: &self.columns,
            line: *line,
            record,
        })
    }
}
