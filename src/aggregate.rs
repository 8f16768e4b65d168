use std::fmt;

use rayon::prelude::*;

use crate::error::ParseError;
use crate::station::{Measurement, NameKey};
use crate::worker::StationTable;

/// Folds partial tables one after another.
#[cfg(test)]
pub(crate) fn merge_sequential<I>(tables: I) -> Result<StationTable, ParseError>
where
    I: IntoIterator<Item = StationTable>,
{
    tables.into_iter().try_fold(StationTable::new(), |mut acc, table| {
        acc.merge(table)?;
        Ok(acc)
    })
}

/// Tree-reduces partial tables on the rayon pool.
///
/// Fails when a station's combined sum leaves the `i64` range.
pub fn merge_parallel(tables: Vec<StationTable>) -> Result<StationTable, ParseError> {
    tables
        .into_par_iter()
        .map(Ok)
        .try_reduce(StationTable::new, |mut acc, mut table| {
            // fold the smaller table into the larger one
            if acc.len() < table.len() {
                table.merge(acc)?;
                return Ok(table);
            }
            acc.merge(table)?;
            Ok(acc)
        })
}

/// One line of the final report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StationSummary {
    pub name: NameKey,
    pub min: Tenths,
    pub mean: Tenths,
    pub max: Tenths,
}

impl StationSummary {
    fn new(name: NameKey, m: &Measurement) -> Self {
        Self {
            name,
            min: Tenths(m.min()),
            mean: Tenths(m.mean_tenths()),
            max: Tenths(m.max()),
        }
    }
}

impl fmt::Display for StationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}/{}/{}", self.name, self.min, self.mean, self.max)
    }
}

/// Fixed-point number with one decimal digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Tenths(pub i64);

impl fmt::Display for Tenths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{}", sign, abs / 10, abs % 10)
    }
}

/// Final result, sorted by name bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    stations: Vec<StationSummary>,
}

impl Report {
    pub fn from_table(table: &StationTable) -> Self {
        let mut stations = table
            .iter()
            .map(|(name, m)| StationSummary::new(*name, m))
            .collect::<Vec<_>>();
        stations.par_sort_unstable_by(|a, b| a.name.cmp(&b.name));
        Self { stations }
    }

    pub fn stations(&self) -> &[StationSummary] {
        &self.stations
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, station) in self.stations.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", station)?;
        }
        f.write_str("}")
    }
}
