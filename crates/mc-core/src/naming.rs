//! Name and path helpers. Pure functions over strings; no model state.

use crate::model::Element;

/// Turn a file name into an element name: `my_file-name.h` → `My File-Name`.
///
/// Only the base name of the last path segment is used (everything before
/// the first `.`). Underscores become spaces and every word is title-cased.
pub fn file_name_to_element_name(file_name: &str) -> String {
    let segment = file_name.rsplit('/').next().unwrap_or(file_name);
    let base = segment.split('.').next().unwrap_or(segment).trim();

    let mut name = String::with_capacity(base.len());
    let mut title_case = true;
    let mut pending_space = false;
    for c in base.chars() {
        match c {
            '_' => {
                title_case = true;
                pending_space = true;
            }
            ' ' | '-' => {
                title_case = true;
                pending_space = false;
                name.push(c);
            }
            _ => {
                if pending_space {
                    name.push(' ');
                    pending_space = false;
                }
                if title_case {
                    name.extend(c.to_uppercase());
                    title_case = false;
                } else {
                    name.push(c);
                }
            }
        }
    }
    name
}

/// Turn an element name into a file base name: `My Class` → `my_class`.
///
/// Letters, digits and `_` are kept (lower-cased); every run of other
/// characters collapses to a single `_`, never at the start.
pub fn element_name_to_base_file_name(element_name: &str) -> String {
    let mut base = String::with_capacity(element_name.len());
    let mut pending_underscore = false;
    for c in element_name.chars() {
        if c.is_alphanumeric() || c == '_' {
            if pending_underscore && !base.is_empty() {
                base.push('_');
            }
            pending_underscore = false;
            base.extend(c.to_lowercase());
        } else {
            pending_underscore = true;
        }
    }
    base
}

/// Strip the directory prefix `absolute` shares with `anchor`.
///
/// When nothing but the leading part matches, `absolute` comes back
/// unchanged.
pub fn relative_path(absolute: &str, anchor: &str) -> String {
    let mut second_last_slash = None;
    let mut last_slash = None;
    let mut matched = 0;
    for ((i, a), b) in absolute.char_indices().zip(anchor.chars()) {
        if a != b {
            break;
        }
        if a == '/' {
            second_last_slash = last_slash;
            last_slash = Some(i);
        }
        matched = i + a.len_utf8();
    }

    match last_slash {
        None => absolute.to_string(),
        // `absolute` is itself a prefix of `anchor`.
        Some(slash) if matched >= absolute.len() => {
            if slash + 1 == matched {
                match second_last_slash {
                    None => absolute.to_string(),
                    Some(second) => absolute[second + 1..].to_string(),
                }
            } else {
                absolute[slash + 1..].to_string()
            }
        }
        Some(slash) => absolute[slash + 1..].to_string(),
    }
}

/// Key used for name lookups: lower-cased letters and digits only.
pub fn search_key(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Element names for the directory parts of `file_path`.
///
/// The last part is skipped when `ignore_last` is set or when the path ends
/// in `/`.
pub fn build_elements_path(file_path: &str, ignore_last: bool) -> Vec<String> {
    let mut parts: Vec<&str> = file_path.split('/').collect();
    if ignore_last || parts.last().is_some_and(|p| p.is_empty()) {
        parts.pop();
    }
    parts.into_iter().map(file_name_to_element_name).collect()
}

/// First of `base`, `base 2`, `base 3`, … not present in `existing`.
pub fn unique_name<'a>(base: &str, existing: impl IntoIterator<Item = &'a str>) -> String {
    let taken: Vec<&str> = existing.into_iter().collect();
    if !taken.contains(&base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{base} {n}"))
        .find(|candidate| !taken.contains(&candidate.as_str()))
        .unwrap_or_else(|| base.to_string())
}

/// Label shown for an element in the tree: its name, or `[kind]` when unnamed.
pub fn element_label(element: &Element) -> String {
    if !element.name().is_empty() {
        return element.name().to_string();
    }
    let kind = match element {
        Element::Object(o) => o.kind.name(),
        Element::Relation(r) => r.kind.name(),
    };
    format!("[{kind}]")
}
