use serde_json::{Map, Value};

use docscope_core::{AnalysisResult, Error, Result};

use super::ExportSummary;

/// Pretty-printed JSON document: the full [`AnalysisResult`] plus job id,
/// render time and per-label entity totals. Object keys come out sorted.
pub fn render_json(result: &AnalysisResult, summary: &ExportSummary) -> Result<String> {
    let mut document = match serde_json::to_value(result)
        .map_err(|e| Error::Serialization(format!("failed to serialize results: {}", e)))?
    {
        Value::Object(map) => map,
        other => {
            return Err(Error::Serialization(format!(
                "expected an object, got {}",
                other
            )))
        }
    };
    document.insert(
        "entity_totals".to_string(),
        serde_json::to_value(result.data.entity_label_totals())?,
    );
    document.insert(
        "generated_at".to_string(),
        Value::String(summary.generated_at.to_rfc3339()),
    );
    document.insert("job_id".to_string(), Value::String(summary.job_id.to_string()));

    let mut out = serde_json::to_string_pretty(&sort_keys(Value::Object(document)))
        .map_err(|e| Error::Serialization(format!("failed to render JSON: {}", e)))?;
    out.push('\n');
    Ok(out)
}

/// Rebuild every object with its keys in lexicographic order.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sort_keys(v)))
                    .collect::<Map<String, Value>>(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}
