use serde::{Deserialize, Serialize};

/// Tabular business data pulled from the cloud spreadsheet store.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub source_name: String,
    /// RFC 3339 modification time reported by the store.
    pub modified_at: Option<String>,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Dataset {
    /// Splits raw records into header + rows and keeps at most `row_limit` rows.
    pub fn from_records(
        source_name: impl Into<String>,
        records: Vec<Vec<String>>,
        row_limit: usize,
    ) -> Self {
        let mut records = records
            .into_iter()
            .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()));
        let headers = records.next().unwrap_or_default();
        let rows = records.take(row_limit).collect();
        Self {
            source_name: source_name.into(),
            modified_at: None,
            headers,
            rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Plain-text table suitable for a model prompt.
    pub fn to_prompt_table(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.headers.join(" | "));
        out.push('\n');
        for row in &self.rows {
            out.push_str(&row.join(" | "));
            out.push('\n');
        }
        out
    }
}

pub fn assistant_prompt(query: &str, dataset: Option<&Dataset>) -> String {
    let context = dataset
        .filter(|data| !data.is_empty())
        .map(|data| {
            format!(
                "\n[Cloud data: {}]\n{}\n",
                data.source_name,
                data.to_prompt_table()
            )
        })
        .unwrap_or_default();
    format!(
        "You are the business assistant of a pressure-vessel fabricator.{context} \
         The user asks: {query}"
    )
}
