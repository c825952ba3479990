use aurgap_core::Envelope;
use serde_json::Value;

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Print `envelope` to stdout. In table mode, `tables` replace the JSON data dump.
pub fn render(
    envelope: &Envelope<Value>,
    format: OutputFormat,
    pretty: bool,
    tables: &[String],
) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let payload = if pretty {
                serde_json::to_string_pretty(envelope)?
            } else {
                serde_json::to_string(envelope)?
            };
            println!("{payload}");
        }
        OutputFormat::Ndjson => {
            let payload = serde_json::to_string(envelope)?;
            println!("{payload}");
        }
        OutputFormat::Table => print!("{}", render_table(envelope, tables)?),
    }

    Ok(())
}

fn render_table(envelope: &Envelope<Value>, tables: &[String]) -> Result<String, CliError> {
    let mut out = String::new();
    out.push_str(&format!("request_id  : {}\n", envelope.meta.request_id));
    out.push_str(&format!("schema      : {}\n", envelope.meta.schema_version));
    out.push_str(&format!("generated_at: {}\n", envelope.meta.generated_at));
    out.push_str(&format!("latency_ms  : {}\n", envelope.meta.latency_ms));

    if !envelope.meta.warnings.is_empty() {
        out.push_str("warnings:\n");
        for warning in &envelope.meta.warnings {
            out.push_str(&format!("  - {warning}\n"));
        }
    }

    if tables.is_empty() {
        out.push_str("data:\n");
        let pretty_data = serde_json::to_string_pretty(&envelope.data)?;
        for line in pretty_data.lines() {
            out.push_str(&format!("  {line}\n"));
        }
    } else {
        for table in tables {
            out.push('\n');
            out.push_str(table);
            if !table.ends_with('\n') {
                out.push('\n');
            }
        }
    }

    if !envelope.errors.is_empty() {
        out.push_str("errors:\n");
        for error in &envelope.errors {
            match &error.contract {
                Some(contract) => {
                    out.push_str(&format!("  - [{contract}] {}: {}\n", error.code, error.message));
                }
                None => out.push_str(&format!("  - {}: {}\n", error.code, error.message)),
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use aurgap_core::{EnvelopeError, EnvelopeMeta};
    use serde_json::json;

    use super::*;

    fn envelope() -> Envelope<Value> {
        let mut meta = EnvelopeMeta::new("req-00000001", 12).expect("meta");
        meta.push_warning("fx: 2 row(s) rejected");
        let error = EnvelopeError::new("empty_join_result", "no timestamp matched")
            .expect("error")
            .with_contract("AU2412");
        Envelope::with_errors(meta, json!({ "contracts": 1 }), vec![error]).expect("envelope")
    }

    #[test]
    fn table_lists_meta_warnings_and_errors() {
        let text = render_table(&envelope(), &[]).expect("table");
        assert!(text.contains("request_id  : req-00000001"));
        assert!(text.contains("  - fx: 2 row(s) rejected"));
        assert!(text.contains("\"contracts\": 1"));
        assert!(text.contains("[AU2412] empty_join_result: no timestamp matched"));
    }

    #[test]
    fn grids_replace_the_data_dump() {
        let text = render_table(&envelope(), &["+---+\n| x |\n+---+".to_owned()]).expect("table");
        assert!(text.contains("| x |"));
        assert!(!text.contains("\"contracts\""));
    }
}
