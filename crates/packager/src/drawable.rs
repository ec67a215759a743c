//! Drawable resource names derived from app labels

/// Derive a resource-safe drawable name from an app name.
///
/// Lower-cases ASCII letters, collapses every run of other characters into a
/// single `_` and trims underscores at both ends. An empty result becomes
/// `icon`; a leading digit gets an `ic_` prefix.
pub fn drawable_name(app_name: &str) -> String {
    let mut name = String::with_capacity(app_name.len());
    let mut pending_separator = false;

    for c in app_name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !name.is_empty() {
                name.push('_');
            }
            pending_separator = false;
            name.push(c.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }

    match name.chars().next() {
        None => "icon".to_string(),
        Some(first) if first.is_ascii_digit() => format!("ic_{}", name),
        Some(_) => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drawable_name() {
        assert_eq!(drawable_name("Camera"), "camera");
        assert_eq!(drawable_name("Google Maps"), "google_maps");
        assert_eq!(drawable_name("  K-9 Mail!! "), "k_9_mail");
        assert_eq!(drawable_name("Ünïcode Äpp"), "n_code_pp");
    }

    #[test]
    fn test_drawable_name_edge_cases() {
        assert_eq!(drawable_name(""), "icon");
        assert_eq!(drawable_name("日本語"), "icon");
        assert_eq!(drawable_name("2048"), "ic_2048");
        assert_eq!(drawable_name("__a__b__"), "a_b");
    }
}
