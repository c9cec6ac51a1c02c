/// Positional template rendering
///
/// Templates reference captured groups as `{0}`, `{1}`, ... or `{}` for the
/// next group in order. `\{` and `\}` (or `{{` and `}}`) produce literal braces.
use crate::error::BuildError;

fn template_error(template: &str, reason: impl Into<String>) -> BuildError {
    BuildError::Template {
        template: template.to_string(),
        reason: reason.into(),
    }
}

/// Escape double quotes so authored text can sit inside a quoted string
#[must_use]
pub fn escape_quotes(text: &str) -> String {
    text.replace('"', "\\\"")
}

/// Substitute `groups` into `template`.
///
/// Referencing a group the pattern did not capture is an error.
pub fn render(template: &str, groups: &[&str]) -> Result<String, BuildError> {
    let mut out = String::with_capacity(template.len() + 16);
    let mut chars = template.chars().peekable();
    let mut next_auto = 0;

    while let Some(c) = chars.next() {
        match c {
            '\\' if matches!(chars.peek(), Some(&('{' | '}'))) => {
                if let Some(brace) = chars.next() {
                    out.push(brace);
                }
            }
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut field = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(f) => field.push(f),
                        None => return Err(template_error(template, "unclosed '{'")),
                    }
                }
                let index = if field.is_empty() {
                    next_auto += 1;
                    next_auto - 1
                } else {
                    field.trim().parse::<usize>().map_err(|_| {
                        template_error(template, format!("unsupported field '{{{field}}}'"))
                    })?
                };
                let value = groups.get(index).ok_or_else(|| {
                    template_error(
                        template,
                        format!(
                            "group {index} referenced but the pattern captured {}",
                            groups.len()
                        ),
                    )
                })?;
                out.push_str(value);
            }
            '}' => return Err(template_error(template, "single '}' encountered")),
            c => out.push(c),
        }
    }

    Ok(out)
}
