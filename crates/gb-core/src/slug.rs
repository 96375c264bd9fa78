//! # Slug Normalizer
//!
//! Turns arbitrary titles into lower-case, ASCII, hyphen-joined URL segments.

/// Normalize `text` into a slug. Pure and idempotent.
pub fn normalize(text: &str) -> String {
    ::slug::slugify(text)
}

/// Name→slug auto-fill for an editing form: only fills an empty slug.
pub fn on_change_name(name: &str, slug: Option<&str>) -> Option<String> {
    match slug {
        Some(existing) if !existing.is_empty() => Some(existing.to_string()),
        _ if !name.is_empty() => Some(normalize(name)),
        _ => None,
    }
}

/// Re-normalizes whatever the editor typed into the slug field.
pub fn on_change_slug(slug: &str) -> Option<String> {
    if slug.is_empty() {
        None
    } else {
        Some(normalize(slug))
    }
}

/// Slug given to a duplicated post.
pub fn copy_of(slug: &str) -> String {
    normalize(&format!("{}-copy", slug))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_diacritics_and_punctuation() {
        assert_eq!(normalize("Héllo, Wörld!"), "hello-world");
        assert_eq!(normalize("  Rust   &  Tryton  "), "rust-tryton");
        assert_eq!(normalize("Ça va? Très bien"), "ca-va-tres-bien");
    }

    #[test]
    fn is_idempotent() {
        for input in ["Hello World", "a--b__c", "ÀÉÎÕÜ 123", "already-a-slug", "", "!!!"] {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "input: {:?}", input);
        }
    }

    #[test]
    fn only_fills_missing_slug() {
        assert_eq!(on_change_name("My Post", None).as_deref(), Some("my-post"));
        assert_eq!(on_change_name("My Post", Some("")).as_deref(), Some("my-post"));
        assert_eq!(on_change_name("My Post", Some("kept")).as_deref(), Some("kept"));
        assert_eq!(on_change_name("", None), None);
    }

    #[test]
    fn copy_suffix() {
        assert_eq!(copy_of("hello-world"), "hello-world-copy");
        assert_eq!(copy_of("Hello World"), "hello-world-copy");
        assert_eq!(on_change_slug("Mixed Case"), Some("mixed-case".to_string()));
    }
}
