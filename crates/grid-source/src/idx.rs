//! GRIB `.idx` sidecar parsing and byte-range planning.
//!
//! NOAA publishes one sidecar per GRIB2 object with a line per message:
//!
//! ```text
//! 47:29887167:d=2026022202:TMP:700 mb:1 hour fcst:
//! ```
//!
//! Message bytes run from a line's offset to the next line's offset, which
//! lets a client subset individual fields with ranged GETs instead of
//! downloading the full multi-hundred-megabyte file.

use crate::selector::FieldSelector;

/// One message entry from a `.idx` sidecar.
#[derive(Debug, Clone, PartialEq)]
pub struct IdxEntry {
    pub message: u32,
    /// Byte offset of the message within the GRIB2 object.
    pub offset: u64,
    /// Byte offset of the next message, or `None` for the last entry
    /// (message runs to end of object).
    pub end: Option<u64>,
    pub variable: String,
    pub level: String,
    pub step: String,
}

/// Parse a sidecar body. Malformed lines are skipped.
pub fn parse_idx(text: &str) -> Vec<IdxEntry> {
    let mut entries: Vec<IdxEntry> = Vec::new();
    for line in text.lines() {
        let parts: Vec<&str> = line.split(':').collect();
        if parts.len() < 6 {
            continue;
        }
        let (Ok(message), Ok(offset)) = (parts[0].parse::<u32>(), parts[1].parse::<u64>()) else {
            continue;
        };
        entries.push(IdxEntry {
            message,
            offset,
            end: None,
            variable: parts[3].to_string(),
            level: parts[4].to_string(),
            step: parts[5].to_string(),
        });
    }
    for i in 0..entries.len() {
        entries[i].end = entries.get(i + 1).map(|next| next.offset);
    }
    entries
}

/// Indices of all entries matching a selector.
pub fn matching_entries(entries: &[IdxEntry], selector: &FieldSelector) -> Vec<usize> {
    entries
        .iter()
        .enumerate()
        .filter(|(_, e)| {
            e.variable == selector.variable
                && e.level == selector.level
                && selector.step.matches(&e.step)
        })
        .map(|(i, _)| i)
        .collect()
}

/// A contiguous run of messages to fetch with one ranged GET.
#[derive(Debug, Clone, PartialEq)]
pub struct ByteRange {
    pub start: u64,
    pub end: Option<u64>,
    /// Entry indices covered by this range, in file order.
    pub entries: Vec<usize>,
}

impl ByteRange {
    /// HTTP Range header value for this run.
    pub fn header_value(&self) -> String {
        match self.end {
            Some(end) => format!("bytes={}-{}", self.start, end - 1),
            None => format!("bytes={}-", self.start),
        }
    }
}

/// Coalesce a set of entry indices into contiguous byte ranges.
///
/// Entries adjacent in the index are adjacent in the file, so a batch of
/// nearby fields (the virga level stack, for instance) collapses into a
/// handful of requests instead of one per message.
pub fn coalesce_ranges(entries: &[IdxEntry], mut wanted: Vec<usize>) -> Vec<ByteRange> {
    wanted.sort_unstable();
    wanted.dedup();

    let mut ranges: Vec<ByteRange> = Vec::new();
    for idx in wanted {
        match ranges.last_mut() {
            Some(run) if *run.entries.last().unwrap() + 1 == idx => {
                run.entries.push(idx);
                run.end = entries[idx].end;
            }
            _ => ranges.push(ByteRange {
                start: entries[idx].offset,
                end: entries[idx].end,
                entries: vec![idx],
            }),
        }
    }
    ranges
}
