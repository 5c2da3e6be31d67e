use super::error::FilterError;

/// Sanitises untrusted input such as incoming cookie values.
pub trait Filter: Send + Sync {
    /// Apply `filters` left to right.
    fn sanitize(&self, value: &str, filters: &[&str]) -> Result<String, FilterError>;
}

/// Built-in filters: `trim`, `lower`, `upper`, `alphanum`, `int`, `email`,
/// `striptags`.
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicFilter;

impl BasicFilter {
    fn apply(value: &str, filter: &str) -> Result<String, FilterError> {
        let out = match filter {
            "trim" => value.trim().to_string(),
            "lower" => value.to_lowercase(),
            "upper" => value.to_uppercase(),
            "alphanum" => value.chars().filter(|c| c.is_ascii_alphanumeric()).collect(),
            "int" => value
                .chars()
                .enumerate()
                .filter(|(i, c)| c.is_ascii_digit() || (*i == 0 && matches!(c, '-' | '+')))
                .map(|(_, c)| c)
                .collect(),
            "email" => value
                .chars()
                .filter(|c| c.is_ascii_alphanumeric() || "!#$%&'*+-=?^_`{|}~@.[]".contains(*c))
                .collect(),
            "striptags" => strip_tags(value),
            other => {
                return Err(FilterError {
                    filter: other.to_string(),
                })
            }
        };
        Ok(out)
    }
}

impl Filter for BasicFilter {
    fn sanitize(&self, value: &str, filters: &[&str]) -> Result<String, FilterError> {
        filters
            .iter()
            .try_fold(value.to_string(), |acc, filter| Self::apply(&acc, filter))
    }
}

fn strip_tags(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_tag = false;
    for c in value.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}
