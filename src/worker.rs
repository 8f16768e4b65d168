use ahash::RandomState;
use hashbrown::hash_map::Entry;
use hashbrown::HashMap;

use crate::error::{ParseError, SumOverflow};
use crate::station::{Measurement, NameKey};

const DELIMITER: u8 = b';';

/// Per-station aggregates built by a single worker.
#[derive(Debug, Clone, Default)]
pub struct StationTable {
    stations: HashMap<NameKey, Measurement, RandomState>,
}

impl StationTable {
    pub fn new() -> Self {
        Self {
            stations: HashMap::with_capacity_and_hasher(512, RandomState::new()),
        }
    }

    /// Folds one value (in tenths) into the entry for `name`.
    ///
    /// `name` must fit in a [`NameKey`]; the parser checks this before
    /// calling.
    #[inline]
    pub fn record(&mut self, name: &[u8], value: i64) -> Result<(), SumOverflow> {
        if let Some(entry) = self.stations.get_mut(name) {
            entry.add(value)?;
        } else if let Some(key) = NameKey::new(name) {
            self.stations.insert(key, Measurement::new(value));
        }
        Ok(())
    }

    pub fn merge(&mut self, other: StationTable) -> Result<(), ParseError> {
        for (key, value) in other.stations {
            match self.stations.entry(key) {
                Entry::Occupied(mut entry) => {
                    entry
                        .get_mut()
                        .merge(&value)
                        .map_err(|_| ParseError::SumOutOfRange {
                            station: key.to_string(),
                        })?
                }
                Entry::Vacant(entry) => {
                    entry.insert(value);
                }
            }
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn get(&self, name: &[u8]) -> Option<&Measurement> {
        self.stations.get(name)
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn records(&self) -> u64 {
        self.stations.values().map(Measurement::count).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NameKey, &Measurement)> {
        self.stations.iter()
    }
}

impl IntoIterator for StationTable {
    type Item = (NameKey, Measurement);
    type IntoIter = hashbrown::hash_map::IntoIter<NameKey, Measurement>;

    fn into_iter(self) -> Self::IntoIter {
        self.stations.into_iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Name,
    Sign,
    Digits,
}

/// Parses aligned units into a private [`StationTable`].
///
/// A unit is walked byte by byte. The `.` of a value is skipped, so values
/// are read as whole tenths; the number of fractional digits is not checked.
/// The first malformed line aborts parsing with a [`ParseError`].
#[derive(Debug, Default)]
pub struct UnitParser {
    table: StationTable,
    records: u64,
}

impl UnitParser {
    pub fn new() -> Self {
        Self {
            table: StationTable::new(),
            records: 0,
        }
    }

    /// Parses every line of `unit`, returning how many records it held.
    ///
    /// A last line without its `\n` is accepted, which covers the flushed
    /// tail of a file lacking a final terminator.
    pub fn parse(&mut self, unit: &[u8]) -> Result<u64, ParseError> {
        let mut state = State::Name;
        let mut line_start = 0;
        let mut name_end = 0;
        let mut negative = false;
        let mut value: i64 = 0;
        let mut digits = 0usize;
        let mut records = 0;

        for (i, &b) in unit.iter().enumerate() {
            match state {
                State::Name => match b {
                    DELIMITER => {
                        if i - line_start > NameKey::CAPACITY {
                            return Err(ParseError::NameTooLong {
                                capacity: NameKey::CAPACITY,
                                line: line_at(unit, line_start),
                            });
                        }
                        name_end = i;
                        state = State::Sign;
                    }
                    b'\n' => {
                        return Err(ParseError::MissingDelimiter {
                            line: line_at(unit, line_start),
                        })
                    }
                    _ => {}
                },
                State::Sign => {
                    match b {
                        b'-' => negative = true,
                        b'0'..=b'9' => {
                            value = i64::from(b - b'0');
                            digits = 1;
                        }
                        b'\n' => {
                            return Err(ParseError::MissingDigits {
                                line: line_at(unit, line_start),
                            })
                        }
                        _ => {
                            return Err(ParseError::UnexpectedByte {
                                byte: b,
                                line: line_at(unit, line_start),
                            })
                        }
                    }
                    state = State::Digits;
                }
                State::Digits => match b {
                    b'0'..=b'9' => {
                        value = value
                            .checked_mul(10)
                            .and_then(|v| v.checked_add(i64::from(b - b'0')))
                            .ok_or_else(|| ParseError::ValueOutOfRange {
                                line: line_at(unit, line_start),
                            })?;
                        digits += 1;
                    }
                    b'.' => {}
                    b'\n' => {
                        self.commit(unit, line_start, name_end, negative, value, digits)?;
                        records += 1;
                        state = State::Name;
                        line_start = i + 1;
                        negative = false;
                        value = 0;
                        digits = 0;
                    }
                    _ => {
                        return Err(ParseError::UnexpectedByte {
                            byte: b,
                            line: line_at(unit, line_start),
                        })
                    }
                },
            }
        }

        match state {
            State::Name if line_start == unit.len() => {}
            State::Name => {
                return Err(ParseError::MissingDelimiter {
                    line: line_at(unit, line_start),
                })
            }
            State::Sign => {
                return Err(ParseError::MissingDigits {
                    line: line_at(unit, line_start),
                })
            }
            State::Digits => {
                self.commit(unit, line_start, name_end, negative, value, digits)?;
                records += 1;
            }
        }

        self.records += records;
        Ok(records)
    }

    #[inline]
    fn commit(
        &mut self,
        unit: &[u8],
        line_start: usize,
        name_end: usize,
        negative: bool,
        value: i64,
        digits: usize,
    ) -> Result<(), ParseError> {
        if digits == 0 {
            return Err(ParseError::MissingDigits {
                line: line_at(unit, line_start),
            });
        }
        let value = if negative { -value } else { value };
        self.table
            .record(&unit[line_start..name_end], value)
            .map_err(|_| ParseError::ValueOutOfRange {
                line: line_at(unit, line_start),
            })
    }

    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn finish(self) -> StationTable {
        self.table
    }
}

fn line_at(unit: &[u8], start: usize) -> String {
    let end = memchr::memchr(b'\n', &unit[start..]).map_or(unit.len(), |n| start + n);
    String::from_utf8_lossy(&unit[start..end]).into_owned()
}
