use super::lexer::LexedLine;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ImportStatement {
    /// Zero-based physical line where the statement starts.
    pub(crate) line: usize,
    /// First dotted segment of the imported module.
    pub(crate) module: String,
}

/// Collects absolute imports from lexed lines in source order.
pub(crate) fn find_imports(lines: &[LexedLine]) -> Vec<ImportStatement> {
    let mut imports = Vec::new();
    let mut idx = 0;
    while idx < lines.len() {
        let start = idx;
        if lines[idx].starts_in_string {
            idx += 1;
            continue;
        }

        let mut logical = lines[idx].code.clone();
        while logical.trim_end().ends_with('\\') && idx + 1 < lines.len() {
            let trimmed = logical.trim_end();
            logical = format!("{} {}", &trimmed[..trimmed.len() - 1], lines[idx + 1].code);
            idx += 1;
        }
        idx += 1;

        for statement in logical.split(';') {
            for module in statement_modules(statement.trim()) {
                imports.push(ImportStatement {
                    line: start,
                    module,
                });
            }
        }
    }
    imports
}

fn statement_modules(statement: &str) -> Vec<String> {
    if let Some(rest) = strip_keyword(statement, "import") {
        return rest
            .split(',')
            .filter_map(|item| {
                let target = item.split(" as ").next().unwrap_or_default().trim();
                first_segment(target)
            })
            .collect();
    }
    if let Some(rest) = strip_keyword(statement, "from") {
        let target = rest.split_whitespace().next().unwrap_or_default();
        if target.starts_with('.') {
            return Vec::new();
        }
        let has_import = rest
            .split_whitespace()
            .nth(1)
            .is_some_and(|word| word == "import");
        if has_import {
            return first_segment(target).into_iter().collect();
        }
    }
    Vec::new()
}

fn strip_keyword<'a>(statement: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = statement.strip_prefix(keyword)?;
    rest.starts_with(char::is_whitespace).then_some(rest.trim_start())
}

fn first_segment(target: &str) -> Option<String> {
    let segment = target.split('.').next()?.trim();
    is_identifier(segment).then(|| segment.to_string())
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if first == '_' || first.is_alphabetic() => {}
        _ => return false,
    }
    chars.all(|ch| ch == '_' || ch.is_alphanumeric())
}
