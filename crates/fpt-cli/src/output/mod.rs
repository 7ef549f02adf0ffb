use serde::Serialize;

use crate::cli::OutputFormat;

pub mod text;

/// Render a serializable response as pretty JSON.
pub fn render_json<T: Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Print `value` as JSON in JSON mode; otherwise print the lines produced
/// by `text`.
pub fn output<T, F>(value: &T, format: OutputFormat, text: F) -> anyhow::Result<()>
where
    T: Serialize,
    F: FnOnce(&T) -> Vec<String>,
{
    match format {
        OutputFormat::Json => println!("{}", render_json(value)?),
        OutputFormat::Text => {
            for line in text(value) {
                println!("{line}");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde::Serialize;

    use super::render_json;

    #[derive(Serialize)]
    struct Example {
        id: &'static str,
        value: u32,
    }

    #[test]
    fn json_render_is_valid_json() {
        let out = render_json(&Example { id: "x", value: 7 }).expect("json render should work");
        let parsed: serde_json::Value = serde_json::from_str(&out).expect("json should parse");
        assert_eq!(parsed["id"], "x");
        assert_eq!(parsed["value"], 7);
    }
}
