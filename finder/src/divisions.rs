use crate::model::Dataset;
use crate::status::{Status, StatusTable, MAX_STATUS};
use serde::Serialize;

/// Cross-tabulation row for one division.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DivisionCounts {
    pub title: String,
    /// Division membership ("all", status 0).
    pub all: usize,
    /// `by_status[st]` for st in 1..=MAX_STATUS; slot 0 is unused.
    pub by_status: [usize; MAX_STATUS + 1],
}

impl DivisionCounts {
    pub fn count(&self, st: Status) -> usize {
        self.by_status[st as usize]
    }

    /// 0 = all, otherwise a status code.
    pub fn count_code(&self, code: u8) -> usize {
        match Status::from_code(code) {
            Some(st) => self.count(st),
            None if code == 0 => self.all,
            None => 0,
        }
    }

    pub fn tallied(&self) -> usize {
        self.by_status[1..].iter().sum()
    }
}

/// Recount every division against the current statuses. Facilities without
/// a status (missing records) count towards `all` only.
pub fn count_divisions(ds: &Dataset, statuses: &StatusTable) -> Vec<DivisionCounts> {
    ds.divisions()
        .iter()
        .map(|d| {
            let mut by_status = [0usize; MAX_STATUS + 1];
            for st in Status::ALL {
                by_status[st as usize] = d.facility_is.iter().filter(|&&i| statuses.is(i, st)).count();
            }
            DivisionCounts { title: d.title.clone(), all: d.facility_is.len(), by_status }
        })
        .collect()
}
