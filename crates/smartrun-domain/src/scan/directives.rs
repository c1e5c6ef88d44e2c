use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::lexer::LexedLine;
use crate::package::PackageName;

static INLINE_DIRECTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^#\s*(?:smartrun-requires|smartrun|requires|@smartrun)[:\s]+(.+)$")
        .expect("inline directive pattern")
});

static BLOCK_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)smartrun-requirements:[ \t]*(.*)").expect("block header pattern")
});

static COMMENT_BLOCK_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*#\s*smartrun-requirements:[ \t]*(.*)$").expect("comment header pattern")
});

static DOUBLE_DOCSTRING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)"""(.*?)""""#).expect("docstring pattern"));

static SINGLE_DOCSTRING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)'''(.*?)'''").expect("docstring pattern"));

/// An inline `# smartrun: ...` comment and the specs it names.
#[derive(Clone, Debug)]
pub(crate) struct InlineDirective {
    pub(crate) line: usize,
    pub(crate) specs: Vec<PackageName>,
}

/// Finds inline directives in comment text only, so a directive-looking
/// string literal is never picked up.
pub(crate) fn inline_directives(lines: &[LexedLine]) -> Vec<InlineDirective> {
    lines
        .iter()
        .enumerate()
        .filter_map(|(line, lexed)| {
            let comment = lexed.comment.as_deref()?;
            let captures = INLINE_DIRECTIVE.captures(comment.trim())?;
            let specs = parse_spec_list(&captures[1], line);
            (!specs.is_empty()).then_some(InlineDirective { line, specs })
        })
        .collect()
}

/// Requirements listed under a `smartrun-requirements:` header, either inside
/// a triple-quoted string or in a run of `#` comment lines.
pub(crate) fn block_requirements(source: &str) -> Vec<PackageName> {
    let mut specs = Vec::new();

    for pattern in [&*DOUBLE_DOCSTRING, &*SINGLE_DOCSTRING] {
        for captures in pattern.captures_iter(source) {
            let body = &captures[1];
            let Some(header) = BLOCK_HEADER.captures(body) else {
                continue;
            };
            let header_match = header.get(0).map_or(0, |m| m.end());
            specs.extend(parse_spec_list(&header[1], 0));
            for raw in body[header_match..].lines() {
                push_spec(&mut specs, raw.trim(), 0);
            }
        }
    }

    let lines: Vec<&str> = source.lines().collect();
    let mut idx = 0;
    while idx < lines.len() {
        let Some(header) = COMMENT_BLOCK_HEADER.captures(lines[idx]) else {
            idx += 1;
            continue;
        };
        specs.extend(parse_spec_list(&header[1], idx));
        idx += 1;
        while idx < lines.len() {
            let Some(body) = lines[idx].trim_start().strip_prefix('#') else {
                break;
            };
            push_spec(&mut specs, body.trim(), idx);
            idx += 1;
        }
    }

    specs
}

pub(crate) fn parse_spec_list(raw: &str, line: usize) -> Vec<PackageName> {
    let mut specs = Vec::new();
    for part in super::split_name_list(raw) {
        push_spec(&mut specs, &part, line);
    }
    specs
}

fn push_spec(specs: &mut Vec<PackageName>, raw: &str, line: usize) {
    if raw.is_empty() {
        return;
    }
    match PackageName::parse(raw) {
        Ok(spec) => specs.push(spec),
        Err(err) => debug!(%err, spec = raw, line = line + 1, "skipping malformed requirement"),
    }
}
