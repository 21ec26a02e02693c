use serde_json::{json, Value};

use crate::error::CliError;

/// Command outcome as printed: the payload plus an optional degradation
/// banner carried over from the fetch pipeline.
#[derive(Debug)]
pub struct Report {
    pub data: Value,
    pub advisory: Option<String>,
}

impl Report {
    pub fn new(data: Value) -> Self {
        Self {
            data,
            advisory: None,
        }
    }

    pub fn with_advisory(mut self, advisory: Option<String>) -> Self {
        self.advisory = advisory;
        self
    }
}

pub fn render(report: &Report, pretty: bool) -> Result<(), CliError> {
    let mut envelope = json!({ "data": report.data });
    if let Some(advisory) = &report.advisory {
        envelope["advisory"] = json!(advisory);
    }

    let payload = if pretty {
        serde_json::to_string_pretty(&envelope)?
    } else {
        serde_json::to_string(&envelope)?
    };
    println!("{payload}");

    Ok(())
}
