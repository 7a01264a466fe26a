use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::time::Duration;
use terminal_size::{Width, Height, terminal_size};

pub fn print_header(subtitle: &str) {
    let (width, _) = terminal_size().unwrap_or((Width(80), Height(24)));
    let width = (width.0 as usize).min(100);

    let line = "─".repeat(width);
    println!("{}", line.black().bold());

    let name = "vidopt".red().bold();
    let version = format!("v{}", env!("CARGO_PKG_VERSION")).black().bold();
    println!("  ▶ {} {}", name, version);
    println!("  {}", subtitle.cyan());

    println!("{}", line.black().bold());
}

pub fn print_step(msg: &str) {
    println!("  {} {}", "•".green(), msg);
}

pub fn print_success(msg: &str) {
    println!("  {} {}", "✓".green().bold(), msg.green());
}

pub fn print_warning(msg: &str) {
    println!("  {} {}", "⚠️ ".yellow().bold(), msg.yellow());
}

pub fn print_error(msg: &str) {
    println!("  {} {}", "❌".red().bold(), msg.red());
}

pub fn print_thinking(msg: &str) {
    println!("  {} {}...", "∴".magenta(), msg);
}

/// Spinner for an outstanding request
pub fn spinner(msg: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("  {spinner:.magenta} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(msg.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

fn str_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value.pointer(pointer).and_then(Value::as_str)
}

fn joined(value: &Value, pointer: &str) -> Option<String> {
    let items = value.pointer(pointer)?.as_array()?;
    Some(items.iter().filter_map(Value::as_str).collect::<Vec<_>>().join(", "))
}

/// Plain-text rendering of SEO metadata for copy and paste.
///
/// Sections whose fields are missing are skipped. Returns `None` when there
/// is no title, so callers can fall back to raw JSON.
pub fn format_seo_metadata(seo: &Value) -> Option<String> {
    let title = str_at(seo, "/title")?;
    let mut out = format!("TITLE ({} chars):\n{}\n", title.chars().count(), title);

    let hook = str_at(seo, "/description/hook");
    let full = str_at(seo, "/description/fullDescription");
    if hook.is_some() || full.is_some() {
        out.push_str("\nDESCRIPTION:\n");
        if let Some(hook) = hook {
            out.push_str(hook);
            out.push_str("\n\n");
        }
        if let Some(full) = full {
            out.push_str(full);
            out.push('\n');
        }
    }

    if let Some(chapters) = seo.pointer("/description/chapters").and_then(Value::as_array) {
        out.push_str("\nCHAPTERS:\n");
        for chapter in chapters {
            let timestamp = str_at(chapter, "/timestamp").unwrap_or("");
            let name = str_at(chapter, "/title").unwrap_or("");
            out.push_str(&format!("{} {}\n", timestamp, name));
        }
    }

    if let Some(tags) = joined(seo, "/tags") {
        out.push_str(&format!("\nTAGS:\n{}\n", tags));
    }
    if let Some(keywords) = joined(seo, "/thumbnailKeywords") {
        out.push_str(&format!("\nTHUMBNAIL KEYWORDS:\n{}\n", keywords));
    }

    Some(out.trim_end().to_string())
}

/// Best human-readable rendering of an analysis response
pub fn render_analysis(response: &Value) -> String {
    let analysis = response.get("analysis").unwrap_or(response);

    // Some backends return the model output as a JSON string
    let parsed;
    let analysis = match analysis.as_str().map(serde_json::from_str::<Value>) {
        Some(Ok(value)) => {
            parsed = value;
            &parsed
        }
        _ => analysis,
    };

    format_seo_metadata(analysis).unwrap_or_else(|| {
        serde_json::to_string_pretty(analysis).unwrap_or_else(|_| analysis.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_seo_metadata() {
        let seo = json!({
            "title": "Rust in 10 minutes",
            "description": {
                "hook": "Learn Rust fast.",
                "fullDescription": "A tour of ownership.",
                "chapters": [
                    {"timestamp": "0:00", "title": "Intro"},
                    {"timestamp": "1:23", "title": "Borrowing"}
                ]
            },
            "tags": ["rust", "programming"],
            "thumbnailKeywords": ["crab"]
        });

        let text = format_seo_metadata(&seo).unwrap();
        assert!(text.starts_with("TITLE (18 chars):\nRust in 10 minutes"));
        assert!(text.contains("DESCRIPTION:\nLearn Rust fast.\n\nA tour of ownership."));
        assert!(text.contains("CHAPTERS:\n0:00 Intro\n1:23 Borrowing"));
        assert!(text.contains("TAGS:\nrust, programming"));
        assert!(text.ends_with("THUMBNAIL KEYWORDS:\ncrab"));
    }

    #[test]
    fn test_format_seo_needs_title() {
        assert!(format_seo_metadata(&json!({"metadata": {"title": "Blog"}})).is_none());
    }

    #[test]
    fn test_render_analysis_fallbacks() {
        let blog = json!({"analysis": {"metadata": {"title": "Blog"}}});
        let text = render_analysis(&blog);
        assert!(text.contains("\"metadata\""));

        let stringly = json!({"analysis": "{\"title\":\"X\"}"});
        assert_eq!(render_analysis(&stringly), "TITLE (1 chars):\nX");

        let plain = json!({"analysis": "not json"});
        assert_eq!(render_analysis(&plain), "\"not json\"");
    }
}
