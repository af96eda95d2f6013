//! Archive name templating
//!
//! Templates are plain text with `{time}`, `{name}`, and `{extension}`
//! placeholders, compiled once into segments so rendering at rotation time
//! is a straight interpolation. Doubled braces escape literal ones.

use glob::Pattern;
use rotolog_core::{Error, Result};

#[derive(Debug)]
enum Segment {
    Literal(String),
    Time,
    Name,
    Extension,
}

/// A compiled archive name template.
#[derive(Debug)]
pub(crate) struct NameTemplate {
    segments: Vec<Segment>,
}

impl NameTemplate {
    /// Compiles a template, rejecting unknown variables and unclosed braces.
    pub(crate) fn parse(template: &str) -> Result<Self> {
        if template.is_empty() {
            return Err(Error::template("template is empty"));
        }

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            if (c == '{' || c == '}') && chars.peek() == Some(&c) {
                chars.next();
                literal.push(c);
                continue;
            }
            if c != '{' {
                literal.push(c);
                continue;
            }

            let mut var = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '}' {
                    closed = true;
                    break;
                }
                var.push(c);
            }
            if !closed {
                return Err(Error::template(format!(
                    "unclosed '{{' in '{}'",
                    template
                )));
            }

            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(match var.trim() {
                "time" => Segment::Time,
                "name" => Segment::Name,
                "extension" => Segment::Extension,
                other => {
                    return Err(Error::template(format!(
                        "unknown variable '{}' in '{}'",
                        other, template
                    )))
                }
            });
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { segments })
    }

    /// Renders a concrete archive file name for one rotation instant.
    pub(crate) fn render(&self, name: &str, extension: &str, time: &str) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Time => out.push_str(time),
                Segment::Name => out.push_str(name),
                Segment::Extension => out.push_str(extension),
            }
        }
        out
    }

    /// Renders the glob matching every name [`NameTemplate::render`] can
    /// produce for this name and extension. Literal text is escaped so only
    /// `{time}` is wild; a trailing `*` is appended when missing so archives
    /// carrying an extra compression suffix still match.
    pub(crate) fn to_glob(&self, name: &str, extension: &str) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(&Pattern::escape(text)),
                Segment::Time => out.push('*'),
                Segment::Name => out.push_str(&Pattern::escape(name)),
                Segment::Extension => out.push_str(&Pattern::escape(extension)),
            }
        }
        if !out.ends_with('*') {
            out.push('*');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_fixed_name() {
        let template = NameTemplate::parse("log.old").unwrap();
        assert_eq!(template.render("app", ".log", "20060102"), "log.old");
    }

    #[test]
    fn test_render_variables() {
        let template = NameTemplate::parse("{name}{extension}{time}").unwrap();
        assert_eq!(
            template.render("testcase-4", ".log", "20060102"),
            "testcase-4.log20060102"
        );

        let template = NameTemplate::parse("{time}-{name}{extension}").unwrap();
        assert_eq!(
            template.render("app", ".log", "20060102"),
            "20060102-app.log"
        );
    }

    #[test]
    fn test_render_tolerates_spaces_in_braces() {
        let template = NameTemplate::parse("{ name }.old").unwrap();
        assert_eq!(template.render("testcase-2", ".log", ""), "testcase-2.old");
    }

    #[test]
    fn test_glob_trailing_time_is_wild() {
        let template = NameTemplate::parse("{name}{extension}{time}").unwrap();
        assert_eq!(template.to_glob("testcase-4", ".log"), "testcase-4.log*");
    }

    #[test]
    fn test_glob_appends_wildcard() {
        let template = NameTemplate::parse("log.old").unwrap();
        assert_eq!(template.to_glob("app", ".log"), "log.old*");

        let template = NameTemplate::parse("{time}-{name}{extension}").unwrap();
        assert_eq!(template.to_glob("app", ".log"), "*-app.log*");
    }

    #[test]
    fn test_doubled_braces_escape() {
        let template = NameTemplate::parse("{{{name}}}-{time}").unwrap();
        assert_eq!(template.render("app", ".log", "20060102"), "{app}-20060102");
    }

    #[test]
    fn test_parse_rejects_unknown_variable() {
        let err = NameTemplate::parse("{hour}-{name}").unwrap_err();
        assert!(matches!(err, Error::Template(_)));
    }

    #[test]
    fn test_parse_rejects_unclosed_brace() {
        let err = NameTemplate::parse("{name").unwrap_err();
        assert!(matches!(err, Error::Template(_)));
    }

    #[test]
    fn test_parse_rejects_empty() {
        let err = NameTemplate::parse("").unwrap_err();
        assert!(matches!(err, Error::Template(_)));
    }

    #[test]
    fn test_concrete_always_matches_glob() {
        let cases = [
            ("{time}-{name}{extension}", "my-app", ".log"),
            ("{name}{extension}{time}", "my-app", ".log"),
            ("{name}.old", "my-app", ".log"),
            ("archive-{time}", "my-app", ""),
            ("{name}[1]{extension}{time}", "my-app", ".l?g"),
        ];
        for (raw, name, extension) in cases {
            let template = NameTemplate::parse(raw).unwrap();
            let concrete = template.render(name, extension, "20060102T150405.123456789");
            let pattern = Pattern::new(&template.to_glob(name, extension)).unwrap();
            assert!(
                pattern.matches(&concrete),
                "template '{}' produced '{}' not matched by '{}'",
                raw,
                concrete,
                pattern
            );
        }
    }
}
