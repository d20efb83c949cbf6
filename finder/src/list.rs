use crate::columns::{ColumnSet, Content};
use crate::format::{format_distance, render_or_dash};
use crate::locale::Locale;
use crate::model::{attr, Dataset, FacilityIndex, Value};
use crate::status::{Status, StatusTable};
use serde::Serialize;

/// Which rows the list shows: a single status, or every row ("all", 0).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ListFilter {
    All,
    Only(Status),
}

impl Default for ListFilter {
    fn default() -> Self {
        ListFilter::Only(Status::Visible)
    }
}

impl ListFilter {
    /// 0 means all, otherwise a status code.
    pub fn from_code(code: u8) -> Option<ListFilter> {
        if code == 0 {
            Some(ListFilter::All)
        } else {
            Status::from_code(code).map(ListFilter::Only)
        }
    }

    pub fn admits(self, st: Option<Status>) -> bool {
        match self {
            ListFilter::All => true,
            ListFilter::Only(want) => st == Some(want),
        }
    }
}

/// Row CSS state. Independent of status; composes additively.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RowFlags {
    pub disabled: bool,
    pub on_alert: bool,
    pub selected: bool,
}

impl RowFlags {
    pub fn for_facility(ds: &Dataset, i: FacilityIndex, selected: Option<FacilityIndex>) -> RowFlags {
        RowFlags {
            disabled: ds.is_closed(i),
            on_alert: ds.is_on_alert(i),
            selected: selected == Some(i),
        }
    }

    pub fn css_class(self) -> String {
        let mut c = String::from("facility");
        if self.disabled {
            c.push_str(" disabled");
        }
        if self.on_alert {
            c.push_str(" on-alert");
        }
        if self.selected {
            c.push_str(" selected");
        }
        c
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Row {
    pub facility: FacilityIndex,
    pub dom_id: String,
    pub title: String,
    pub cells: Vec<Content>,
    pub class: String,
    pub visible: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ListView {
    pub header: Vec<Content>,
    pub rows: Vec<Row>,
    pub visible_count: usize,
    /// Show the "no matching facilities" placeholder row.
    pub show_no_match: bool,
}

impl ListView {
    pub fn visible_rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter().filter(|r| r.visible)
    }
}

/// Everything a row projection reads.
pub struct ListContext<'a> {
    pub ds: &'a Dataset,
    pub statuses: &'a StatusTable,
    pub columns: &'a ColumnSet,
    pub locale: &'a Locale,
    pub selected: Option<FacilityIndex>,
    pub filter: ListFilter,
}

pub fn row_dom_id(i: FacilityIndex) -> String {
    format!("facility-{}", i)
}

pub fn render_row(ctx: &ListContext<'_>, i: FacilityIndex) -> Row {
    let has_record = ctx.ds.facility(i).is_some();
    Row {
        facility: i,
        dom_id: row_dom_id(i),
        title: ctx.ds.title(i),
        cells: ctx.columns.values(ctx.ds, ctx.ds.values(i), has_record, ctx.locale),
        class: RowFlags::for_facility(ctx.ds, i, ctx.selected).css_class(),
        visible: ctx.filter.admits(ctx.statuses.get(i)),
    }
}

/// Rows for `members` in order (a division, or all facilities).
pub fn render_list(ctx: &ListContext<'_>, members: &[FacilityIndex]) -> ListView {
    let mut header = vec![Content::Text(ctx.locale.get("FACILITY"))];
    header.extend(ctx.columns.titles(ctx.locale));
    let rows: Vec<Row> = members.iter().map(|&i| render_row(ctx, i)).collect();
    let visible_count = rows.iter().filter(|r| r.visible).count();
    ListView { header, rows, visible_count, show_no_match: visible_count == 0 }
}

/// One line of the printable list.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PrintRow {
    pub facility: FacilityIndex,
    pub parity: &'static str,
    pub beds_open: String,
    pub beds_total: String,
    pub title: String,
    pub distance: String,
    pub address: String,
    pub general_info: String,
}

/// Printable list: visible facilities only, with distance and contact info.
pub fn render_print_list(ds: &Dataset, statuses: &StatusTable, locale: &Locale, members: &[FacilityIndex]) -> Vec<PrintRow> {
    let text = |i: FacilityIndex, name: &str| -> Option<String> {
        match ds.value(i, name) {
            Some(Value::Str(s)) if s.is_empty() => None,
            Some(v) => Some(render_or_dash(Some(v))),
            None => None,
        }
    };
    let mut out = Vec::new();
    for (n, &i) in members.iter().enumerate() {
        if !statuses.is(i, Status::Visible) {
            continue;
        }
        let mut title = ds.title(i);
        let healthc_id = text(i, attr::HEALTHC_ID);
        let pcode = text(i, attr::PCODE);
        if healthc_id.is_some() || pcode.is_some() {
            let dash = || render_or_dash(None);
            title = format!(
                "{} - {}: {} - {}: {}",
                title,
                locale.get("HEALTHC_ID"),
                healthc_id.unwrap_or_else(dash),
                locale.get("PCODE"),
                pcode.unwrap_or_else(dash)
            );
        }
        let general_info = match (text(i, attr::CONTACT_NAME), text(i, attr::PHONE)) {
            (Some(c), Some(p)) => Some(format!("{} {}", c, locale.message("PHONE_ABBREVIATION", &[("PHONE", p.as_str())]))),
            (None, Some(p)) => Some(locale.message("PHONE_ABBREVIATION", &[("PHONE", p.as_str())])),
            (c, None) => c,
        };
        let distance = ds
            .facility(i)
            .and_then(|f| f.distance_meters)
            .map(|m| format_distance(m, locale));
        out.push(PrintRow {
            facility: i,
            parity: if n % 2 == 0 { "even" } else { "odd" },
            beds_open: render_or_dash(ds.value(i, attr::AVAILABLE_BEDS)),
            beds_total: render_or_dash(ds.value(i, attr::TOTAL_BEDS)),
            title,
            distance: distance.unwrap_or_else(|| render_or_dash(None)),
            address: render_or_dash(ds.value(i, attr::ADDRESS)),
            general_info: general_info.unwrap_or_else(|| render_or_dash(None)),
        });
    }
    out
}

/// Header numbers of the printable page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PrintSummary {
    pub total: usize,
    pub local: usize,
    pub available: usize,
}

pub fn print_summary(ds: &Dataset) -> PrintSummary {
    let available = ds
        .facility_indices()
        .filter(|&i| ds.value(i, attr::AVAILABLE_BEDS).and_then(Value::as_f64).map_or(false, |b| b > 0.0))
        .count();
    PrintSummary {
        total: ds.total_facility_count(),
        local: ds.facility_slots().saturating_sub(1),
        available,
    }
}
