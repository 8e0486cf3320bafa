//! Serializable views of analyzer results for the HTTP layer.
//!
//! Rounding happens here and nowhere else; analyzers return full precision.

use serde::Serialize;

use crate::models::{AssociationResult, ContingencyTable, FrequencyTable};

const FREQUENCY_LABEL: &str = "Frequency";
const FREQUENCY_CHART_TITLE: &str = "Frequency Distribution";
const LABEL_ROTATION_DEGREES: u16 = 45;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyRow {
    pub value: String,
    pub frequency: u64,
}

/// Data for a bar chart; drawing it is up to the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub labels: Vec<String>,
    pub counts: Vec<u64>,
    pub label_rotation: u16,
    pub label_align: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyView {
    pub column: String,
    pub rows: Vec<FrequencyRow>,
    pub total: u64,
    pub missing: u64,
    pub chart: BarChart,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContingencyView {
    pub row_column: String,
    pub col_column: String,
    pub row_labels: Vec<String>,
    pub col_labels: Vec<String>,
    pub counts: Vec<Vec<u64>>,
    pub row_totals: Vec<u64>,
    pub col_totals: Vec<u64>,
    pub grand_total: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssociationView {
    pub contingency: ContingencyView,
    pub chi_square: f64,
    pub cramers_v: f64,
    pub degrees_of_freedom: usize,
    pub sample_size: u64,
}

pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

impl From<&FrequencyTable> for FrequencyView {
    fn from(table: &FrequencyTable) -> Self {
        let rows = table
            .entries
            .iter()
            .map(|entry| FrequencyRow {
                value: entry.value.clone(),
                frequency: entry.count,
            })
            .collect();

        let chart = BarChart {
            title: FREQUENCY_CHART_TITLE.to_string(),
            x_label: table.column.clone(),
            y_label: FREQUENCY_LABEL.to_string(),
            labels: table.entries.iter().map(|e| e.value.clone()).collect(),
            counts: table.entries.iter().map(|e| e.count).collect(),
            label_rotation: LABEL_ROTATION_DEGREES,
            label_align: "right",
        };

        FrequencyView {
            column: table.column.clone(),
            rows,
            total: table.total,
            missing: table.missing,
            chart,
        }
    }
}

impl From<&ContingencyTable> for ContingencyView {
    fn from(table: &ContingencyTable) -> Self {
        ContingencyView {
            row_column: table.row_column.clone(),
            col_column: table.col_column.clone(),
            row_labels: table.row_labels.clone(),
            col_labels: table.col_labels.clone(),
            counts: table.counts.clone(),
            row_totals: table.row_totals(),
            col_totals: table.col_totals(),
            grand_total: table.grand_total(),
        }
    }
}

impl AssociationView {
    pub fn new(result: &AssociationResult, decimal_places: u32) -> Self {
        AssociationView {
            contingency: ContingencyView::from(&result.contingency),
            chi_square: round_to(result.chi_square, decimal_places),
            cramers_v: round_to(result.cramers_v, decimal_places),
            degrees_of_freedom: result.degrees_of_freedom,
            sample_size: result.sample_size,
        }
    }
}
