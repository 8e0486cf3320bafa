use serde::Serialize;
use smallvec::SmallVec;

pub const SAMPLE_SIZE: usize = 3;

/// How missing cells take part in counting.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MissingPolicy {
    /// Missing cells are excluded and reported separately.
    #[default]
    Drop,
    /// Missing cells are counted under the given label.
    Category(String),
}

impl MissingPolicy {
    /// Parses `drop` or `category`; `label` names the category.
    pub fn parse(raw: &str, label: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "drop" => Some(MissingPolicy::Drop),
            "category" => Some(MissingPolicy::Category(label.to_string())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    pub missing: MissingPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyEntry {
    pub value: String,
    pub count: u64,
}

/// Distinct values of one column, most frequent first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyTable {
    pub column: String,
    pub entries: Vec<FrequencyEntry>,
    /// Sum of all entry counts.
    pub total: u64,
    /// Cells excluded under [`MissingPolicy::Drop`].
    pub missing: u64,
}

#[cfg(test)]
impl FrequencyTable {
    pub fn count_of(&self, value: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|entry| entry.value == value)
            .map(|entry| entry.count)
    }
}

/// Co-occurrence counts of two columns. Labels are sorted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContingencyTable {
    pub row_column: String,
    pub col_column: String,
    pub row_labels: Vec<String>,
    pub col_labels: Vec<String>,
    /// `counts[i][j]` pairs `row_labels[i]` with `col_labels[j]`.
    pub counts: Vec<Vec<u64>>,
}

impl ContingencyTable {
    pub fn shape(&self) -> (usize, usize) {
        (self.row_labels.len(), self.col_labels.len())
    }

    pub fn row_totals(&self) -> Vec<u64> {
        self.counts.iter().map(|row| row.iter().sum()).collect()
    }

    pub fn col_totals(&self) -> Vec<u64> {
        (0..self.col_labels.len())
            .map(|j| self.counts.iter().map(|row| row[j]).sum())
            .collect()
    }

    pub fn grand_total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }

    #[cfg(test)]
    pub fn get(&self, row: &str, col: &str) -> Option<u64> {
        let i = self.row_labels.iter().position(|label| label == row)?;
        let j = self.col_labels.iter().position(|label| label == col)?;
        Some(self.counts[i][j])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssociationResult {
    pub contingency: ContingencyTable,
    pub chi_square: f64,
    pub cramers_v: f64,
    pub degrees_of_freedom: usize,
    pub sample_size: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub sample_values: SmallVec<[String; SAMPLE_SIZE]>,
    pub null_count: usize,
    pub unique_count: usize,
    pub has_duplicates: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetProfile {
    pub row_count: usize,
    pub column_count: usize,
    pub preview: Vec<Vec<Option<String>>>,
    pub columns: Vec<ColumnInfo>,
}
