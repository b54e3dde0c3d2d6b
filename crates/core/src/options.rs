use crate::model::{OTHER_SENTINEL, is_sentinel};

/// Choices offered when picking a category: distinct non-empty names plus the
/// "Other" entry, sorted. Duplicated names in the store collapse here only.
pub fn category_options<'a, I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut options: Vec<String> = Vec::new();
    for name in names {
        if !name.is_empty() && !options.iter().any(|o| o == name) {
            options.push(name.to_string());
        }
    }
    if !options.iter().any(|o| is_sentinel(o)) {
        options.push(OTHER_SENTINEL.to_string());
    }
    options.sort();
    options
}

/// The option a stored value should be shown as, matched case-insensitively.
pub fn display_option<'a>(options: &'a [String], value: &str) -> Option<&'a str> {
    if value.is_empty() {
        return None;
    }
    let wanted = value.to_lowercase();
    options
        .iter()
        .find(|o| o.to_lowercase() == wanted)
        .map(String::as_str)
}
