use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, warn};

use crate::domain::{EntityRecord, is_country_code};
use crate::normalize::{Dated, LatestByKey, parse_number, parse_year};

impl Dated for EntityRecord {
    fn key(&self) -> &str {
        &self.iso_code
    }

    fn year(&self) -> i32 {
        self.year
    }
}

struct Columns {
    iso_code: Option<usize>,
    country: Option<usize>,
    year: Option<usize>,
    co2: Option<usize>,
    population: Option<usize>,
    co2_per_capita: Option<usize>,
}

impl Columns {
    fn locate(headers: &StringRecord) -> Self {
        let find = |name: &str| headers.iter().position(|header| header.trim() == name);
        Self {
            iso_code: find("iso_code"),
            country: find("country"),
            year: find("year"),
            co2: find("co2"),
            population: find("population"),
            co2_per_capita: find("co2_per_capita"),
        }
    }
}

fn field<'r>(record: &'r StringRecord, column: Option<usize>) -> &'r str {
    column.and_then(|index| record.get(index)).unwrap_or("")
}

pub fn parse_owid_csv(content: &[u8]) -> Vec<EntityRecord> {
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(content);
    let columns = match reader.headers() {
        Ok(headers) => Columns::locate(headers),
        Err(err) => {
            warn!(error = %err, "OWID CSV has no readable header");
            return Vec::new();
        }
    };

    let mut latest = LatestByKey::new();
    let mut skipped = 0usize;
    for row in reader.records() {
        let record = match row {
            Ok(record) => record,
            Err(err) => {
                debug!(error = %err, "skipping undecodable OWID row");
                skipped += 1;
                continue;
            }
        };
        match parse_row(&record, &columns) {
            Some(entity) => latest.offer(entity),
            None => skipped += 1,
        }
    }

    debug!(retained = latest.len(), skipped, "OWID CSV normalized");
    latest.into_records()
}

fn parse_row(record: &StringRecord, columns: &Columns) -> Option<EntityRecord> {
    let iso_code = field(record, columns.iso_code);
    if !is_country_code(iso_code) {
        return None;
    }
    let year = parse_year(field(record, columns.year))?;

    let co2 = parse_number(field(record, columns.co2));
    let population = parse_number(field(record, columns.population));
    let co2_per_capita = parse_number(field(record, columns.co2_per_capita));
    if co2.is_none() && co2_per_capita.is_none() {
        return None;
    }

    Some(EntityRecord {
        iso_code: iso_code.to_string(),
        country: field(record, columns.country).to_string(),
        year,
        co2,
        population,
        co2_per_capita,
    })
}
