use serde::Serialize;

/// Columns of the customer table, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayColumn {
    Customer,
    Status,
    Technician,
    FilterType,
    FilterValue,
    LastService,
    NextService,
}

impl DisplayColumn {
    pub const ALL: [DisplayColumn; 7] = [
        DisplayColumn::Customer,
        DisplayColumn::Status,
        DisplayColumn::Technician,
        DisplayColumn::FilterType,
        DisplayColumn::FilterValue,
        DisplayColumn::LastService,
        DisplayColumn::NextService,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DisplayColumn::Customer => "CUSTOMER",
            DisplayColumn::Status => "STATUS",
            DisplayColumn::Technician => "TECHNICIAN",
            DisplayColumn::FilterType => "FILTER TYPE",
            DisplayColumn::FilterValue => "FILTER VALUE",
            DisplayColumn::LastService => "LAST SERVICE",
            DisplayColumn::NextService => "NEXT SERVICE",
        }
    }
}

/// A customer row formatted for direct display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayRow {
    /// Unformatted name; edit actions refer back to the customer by it.
    pub name: String,
    pub status: String,
    pub technician: String,
    pub filter_type: String,
    pub route_value: String,
    pub filter_value: String,
    pub last_service: String,
    pub next_service: String,
}

impl DisplayRow {
    pub fn cell(&self, column: DisplayColumn) -> &str {
        match column {
            DisplayColumn::Customer => &self.name,
            DisplayColumn::Status => &self.status,
            DisplayColumn::Technician => &self.technician,
            DisplayColumn::FilterType => &self.filter_type,
            DisplayColumn::FilterValue => &self.filter_value,
            DisplayColumn::LastService => &self.last_service,
            DisplayColumn::NextService => &self.next_service,
        }
    }
}

/// Action attached to a rendered row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowAction {
    /// `index` is the row's position in the whole filtered set, not on the
    /// page, so it stays valid whichever page renders it.
    Edit { index: usize, customer: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageRow {
    pub row: DisplayRow,
    pub action: RowAction,
}

/// One page of display rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    /// 1-based page number actually rendered (after clamping).
    pub number: usize,
    pub page_count: usize,
    pub total_rows: usize,
    pub rows: Vec<PageRow>,
}
