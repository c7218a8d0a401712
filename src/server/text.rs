//! Popup text composition
//!
//! The `format` template uses `{summary}`, `{body}` and `{app_name}`
//! placeholders; `{{` and `}}` produce literal braces. Field values are
//! markup-escaped before substitution so client text can never inject tags
//! into the template's own markup.

use crate::config::ConfigError;
use crate::notification::Notification;

const PLACEHOLDERS: [&str; 3] = ["summary", "body", "app_name"];

enum Piece<'a> {
    Literal(&'a str),
    Field(&'a str),
}

fn parse(format: &str) -> Result<Vec<Piece<'_>>, String> {
    let mut pieces = Vec::new();
    let mut rest = format;

    while let Some(pos) = rest.find(['{', '}']) {
        if pos > 0 {
            pieces.push(Piece::Literal(&rest[..pos]));
        }
        let tail = &rest[pos..];
        if tail.starts_with("{{") {
            pieces.push(Piece::Literal("{"));
            rest = &tail[2..];
        } else if tail.starts_with("}}") {
            pieces.push(Piece::Literal("}"));
            rest = &tail[2..];
        } else if tail.starts_with('}') {
            return Err("single '}' encountered".to_string());
        } else {
            let end = tail.find('}').ok_or("unclosed '{'")?;
            let name = &tail[1..end];
            if !PLACEHOLDERS.contains(&name) {
                return Err(format!("unknown placeholder {{{}}}", name));
            }
            pieces.push(Piece::Field(name));
            rest = &tail[end + 1..];
        }
    }
    if !rest.is_empty() {
        pieces.push(Piece::Literal(rest));
    }
    Ok(pieces)
}

/// Check that a template only uses known placeholders and balanced braces
pub fn validate_format(format: &str) -> Result<(), ConfigError> {
    parse(format).map(|_| ()).map_err(|reason| ConfigError::InvalidFormat {
        format: format.to_string(),
        reason,
    })
}

/// Build the display text for a notification
pub fn compose(format: &str, notif: &Notification) -> String {
    let Ok(pieces) = parse(format) else {
        // Templates are validated at startup
        return escape_markup(&notif.summary);
    };

    let mut out = String::new();
    for piece in pieces {
        match piece {
            Piece::Literal(text) => out.push_str(text),
            Piece::Field("summary") => out.push_str(&escape_markup(&notif.summary)),
            Piece::Field("body") => out.push_str(&escape_markup(&notif.body)),
            Piece::Field(_) => out.push_str(&escape_markup(&notif.app_name)),
        }
    }
    out
}

/// Escape text so it renders literally under markup rules
pub fn escape_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&#39;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}

/// Reduce a markup line to the plain text a core-font renderer can draw
pub fn strip_markup(line: &str) -> String {
    let mut plain = String::with_capacity(line.len());
    let mut in_tag = false;
    for c in line.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            c if !in_tag => plain.push(c),
            _ => {}
        }
    }
    unescape_entities(&plain)
}

fn unescape_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        let decoded = tail.find(';').and_then(|end| {
            let entity = &tail[1..end];
            let c = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => entity
                    .strip_prefix("#x")
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            };
            c.map(|c| (c, end + 1))
        });
        match decoded {
            Some((c, len)) => {
                out.push(c);
                rest = &tail[len..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::Urgency;

    fn notif(summary: &str, body: &str, app_name: &str) -> Notification {
        Notification {
            id: 1,
            summary: summary.into(),
            body: body.into(),
            app_name: app_name.into(),
            app_icon: None,
            urgency: Urgency::Normal,
            timeout_ms: None,
            replaces_id: None,
        }
    }

    #[test]
    fn test_compose_default_format() {
        let text = compose("{summary}\n{body}", &notif("Hello", "World", "app"));
        assert_eq!(text, "Hello\nWorld");
    }

    #[test]
    fn test_compose_escapes_each_field() {
        let text = compose(
            "<b>{app_name}</b>: {summary}",
            &notif("a < b & c", "", "\"quoted\""),
        );
        assert_eq!(text, "<b>&quot;quoted&quot;</b>: a &lt; b &amp; c");
    }

    #[test]
    fn test_compose_missing_fields_are_empty() {
        let text = compose("[{app_name}] {summary} {body}", &notif("S", "", ""));
        assert_eq!(text, "[] S ");
    }

    #[test]
    fn test_literal_braces() {
        assert!(validate_format("{{{summary}}}").is_ok());
        assert_eq!(compose("{{{summary}}}", &notif("x", "", "")), "{x}");
    }

    #[test]
    fn test_validate_format_errors() {
        assert!(validate_format("{summary} {icon}").is_err());
        assert!(validate_format("{summary").is_err());
        assert!(validate_format("summary}").is_err());
        assert!(validate_format("no placeholders at all").is_ok());
    }

    #[test]
    fn test_strip_markup() {
        assert_eq!(strip_markup("<b>Title</b> &amp; more"), "Title & more");
        assert_eq!(strip_markup("a &lt;tag&gt;"), "a <tag>");
        assert_eq!(strip_markup("&#65;&#x42;"), "AB");
        assert_eq!(strip_markup("lone & sign"), "lone & sign");
    }

    #[test]
    fn test_escape_then_strip_restores_text() {
        let original = "5 > 3 && 'x' < \"y\"";
        assert_eq!(strip_markup(&escape_markup(original)), original);
    }
}
