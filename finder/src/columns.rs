use crate::format::{format_attr, render_or_dash, EN_DASH};
use crate::locale::Locale;
use crate::model::{attr, Dataset, FacilityValues, Value};
use serde::Serialize;

/// Cell content: a single line or several stacked lines.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "lowercase")]
pub enum Content {
    Text(String),
    Lines(Vec<String>),
}

impl Content {
    pub fn empty() -> Content {
        Content::Text(String::new())
    }

    /// Flattened text, lines joined by newlines.
    pub fn to_text(&self) -> String {
        match self {
            Content::Text(s) => s.clone(),
            Content::Lines(l) => l.join("\n"),
        }
    }
}

/// A column of the facility list after the title column.
pub trait SummaryColumn {
    fn title(&self, locale: &Locale) -> Content;
    fn value(&self, ds: &Dataset, values: Option<&FacilityValues>, locale: &Locale) -> Content;
}

fn lookup<'a>(ds: &Dataset, values: Option<&'a FacilityValues>, name: &str) -> Option<&'a Value> {
    let i = ds.attribute_index(name)?;
    values?.get(i)
}

/// Translated, comma-separated services of a facility.
pub fn services_text(ds: &Dataset, values: Option<&FacilityValues>) -> String {
    lookup(ds, values, attr::SERVICES)
        .map(|v| {
            v.tokens()
                .iter()
                .map(|t| ds.translate_value(t).to_string())
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default()
}

/// "open / total" beds over the list of services.
#[derive(Clone, Copy, Debug, Default)]
pub struct BedsAndServices;

impl SummaryColumn for BedsAndServices {
    fn title(&self, locale: &Locale) -> Content {
        Content::Lines(vec![locale.get("OPEN_TOTAL_BEDS"), locale.get("SERVICES")])
    }

    fn value(&self, ds: &Dataset, values: Option<&FacilityValues>, _locale: &Locale) -> Content {
        let open = render_or_dash(lookup(ds, values, attr::AVAILABLE_BEDS));
        let total = render_or_dash(lookup(ds, values, attr::TOTAL_BEDS));
        let services = services_text(ds, values);
        // A no-break space keeps the second line's height when there are no services.
        let services = if services.is_empty() { "\u{a0}".to_string() } else { services };
        Content::Lines(vec![format!("{} / {}", open, total), services])
    }
}

/// Renders one named attribute with the type-aware formatter.
#[derive(Clone, Debug)]
pub struct AttributeColumn {
    pub attribute: String,
    pub title_key: String,
}

impl AttributeColumn {
    pub fn new(attribute: impl Into<String>, title_key: impl Into<String>) -> Self {
        AttributeColumn { attribute: attribute.into(), title_key: title_key.into() }
    }
}

impl SummaryColumn for AttributeColumn {
    fn title(&self, locale: &Locale) -> Content {
        Content::Text(locale.get(&self.title_key))
    }

    fn value(&self, ds: &Dataset, values: Option<&FacilityValues>, locale: &Locale) -> Content {
        let text = match ds.attribute_index(&self.attribute).and_then(|i| ds.attribute(i)) {
            Some(a) => format_attr(a, lookup(ds, values, &self.attribute), ds, locale),
            None => EN_DASH.to_string(),
        };
        Content::Text(text)
    }
}

/// Ordered list of registered summary columns.
pub struct ColumnSet {
    columns: Vec<Box<dyn SummaryColumn>>,
}

impl Default for ColumnSet {
    fn default() -> Self {
        ColumnSet { columns: vec![Box::new(BedsAndServices)] }
    }
}

impl ColumnSet {
    pub fn empty() -> Self {
        ColumnSet { columns: Vec::new() }
    }

    pub fn push<C: SummaryColumn + 'static>(&mut self, column: C) -> &mut Self {
        self.columns.push(Box::new(column));
        self
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn titles(&self, locale: &Locale) -> Vec<Content> {
        self.columns.iter().map(|c| c.title(locale)).collect()
    }

    /// Cells for a facility; a missing record gets empty cells.
    pub fn values(&self, ds: &Dataset, values: Option<&FacilityValues>, has_record: bool, locale: &Locale) -> Vec<Content> {
        self.columns
            .iter()
            .map(|c| if has_record { c.value(ds, values, locale) } else { Content::empty() })
            .collect()
    }
}
