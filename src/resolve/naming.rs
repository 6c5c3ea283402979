//! Name normalization shared by every extractor.
//!
//! Keys computed from a species' own definition and from references in other
//! files must collide, so every path that turns a name into a key goes through
//! [`slugify`].

/// Split a name into words on non-alphanumeric characters and case changes.
///
/// `AE_SKYSTONE` → `["AE", "SKYSTONE"]`, `AESkystone` → `["AE", "Skystone"]`,
/// `speciesMeadows` → `["species", "Meadows"]`.
pub fn split_words(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).map_or(false, |n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_lower) {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Short all-caps segments (`AE`, `EB`) are acronyms and keep their case.
fn is_acronym(word: &str) -> bool {
    word.chars().count() <= 2 && word.chars().all(|c| c.is_uppercase())
}

fn title_case(word: &str) -> String {
    if is_acronym(word) {
        return word.to_string();
    }
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
        None => String::new(),
    }
}

/// Title-cased words joined with no separator (`AE_SKYSTONE` → `AESkystone`).
pub fn to_pascal(name: &str) -> String {
    split_words(name).iter().map(|w| title_case(w)).collect()
}

/// Title-cased words joined with spaces (`AE_SKYSTONE` → `AE Skystone`).
pub fn display_name(name: &str) -> String {
    split_words(name)
        .iter()
        .map(|w| title_case(w))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lowercase separator-free slug (`AE Skystone` → `aeskystone`).
pub fn slugify(name: &str) -> String {
    to_pascal(name).to_lowercase()
}

/// Canonical `namespace:slug` key.
pub fn canonical_key(namespace: &str, name: &str) -> String {
    format!("{}:{}", namespace.trim().to_lowercase(), slugify(name))
}
