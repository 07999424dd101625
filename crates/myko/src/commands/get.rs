//! Get command - fetch any API path and print the normalized body.

use std::io::Write;

use anyhow::Result;
use clap::Args;
use console::Style;
use myko_client::{ElementQuery, Normalized, RequestDescriptor};
use serde_json::json;

use super::Context;

/// Arguments for the get command.
#[derive(Args, Debug)]
pub struct GetArgs {
    /// Path relative to the base URL, or an absolute URL
    pub path: String,

    /// Query parameter as key=value (repeatable)
    #[arg(short, long = "query", value_parser = parse_key_val)]
    pub query: Vec<(String, String)>,
}

/// Run the get command.
pub async fn run(args: GetArgs, ctx: &Context) -> Result<()> {
    let client = ctx.client()?;
    let GetArgs { path, query } = args;
    let body = client
        .scoped(|c| async move {
            let builder = c.authorized(RequestDescriptor::get(path).query_pairs(query)).await?;
            c.fetch(&builder.build()).await
        })
        .await?;

    print_normalized(body, ctx.json_output)
}

fn print_normalized(body: Normalized, json_output: bool) -> Result<()> {
    match body {
        Normalized::Json(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        Normalized::Html(doc) => {
            let title = doc.title();
            let text = collapse_whitespace(&doc.text());
            if json_output {
                let output = json!({"kind": "html", "title": title, "text": text});
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                let dim = Style::new().dim();
                if let Some(title) = title {
                    println!("{} {}", dim.apply_to("Title:"), title);
                }
                println!("{}", text);
            }
        }
        Normalized::Raw(bytes) => {
            if json_output {
                let output = json!({"kind": "raw", "bytes": bytes.len()});
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(&bytes)?;
                stdout.flush()?;
            }
        }
    }
    Ok(())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse a `key=value` pair.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let Some((key, value)) = s.split_once('=') else {
        return Err(format!("expected key=value, got '{}'", s));
    };
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_val() {
        assert_eq!(
            parse_key_val("expansions=state").unwrap(),
            ("expansions".to_string(), "state".to_string())
        );
        assert_eq!(
            parse_key_val("a=b=c").unwrap(),
            ("a".to_string(), "b=c".to_string())
        );
        assert_eq!(parse_key_val("empty=").unwrap().1, "");
        assert!(parse_key_val("novalue").is_err());
        assert!(parse_key_val("=x").is_err());
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a\n\n  b\tc "), "a b c");
    }
}
