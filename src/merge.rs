use toml::Table;

/// Overlay `layer` on top of `base`, key by key.
///
/// Settings are flat, so there is nothing to recurse into: a key present in
/// `layer` replaces the whole value in `base`, a key absent from `layer`
/// leaves `base` alone.
pub fn overlay(mut base: Table, layer: Table) -> Table {
    for (key, value) in layer {
        base.insert(key, value);
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(toml_str: &str) -> Table {
        toml_str.parse::<Table>().unwrap()
    }

    #[test]
    fn disjoint_keys_combine() {
        let merged = overlay(table(r#"registry = "quay.io/a""#), table("confirm = true"));
        assert_eq!(merged["registry"].as_str().unwrap(), "quay.io/a");
        assert!(merged["confirm"].as_bool().unwrap());
    }

    #[test]
    fn layer_value_wins() {
        let merged = overlay(
            table(r#"namespace = "team-a""#),
            table(r#"namespace = "team-b""#),
        );
        assert_eq!(merged["namespace"].as_str().unwrap(), "team-b");
    }

    #[test]
    fn empty_string_is_still_a_value() {
        let merged = overlay(table(r#"registry = "quay.io/a""#), table(r#"registry = """#));
        assert_eq!(merged["registry"].as_str().unwrap(), "");
    }

    #[test]
    fn type_change_replaces_whole_value() {
        let merged = overlay(table("confirm = false"), table(r#"confirm = "x""#));
        assert_eq!(merged["confirm"].as_str().unwrap(), "x");
    }

    #[test]
    fn empty_layer_is_identity() {
        let base = table(r#"builder = "s2i""#);
        assert_eq!(overlay(base.clone(), Table::new()), base);
    }

    #[test]
    fn applying_the_same_layer_twice_is_idempotent() {
        let base = table(r#"builder = "pack""#);
        let layer = table(r#"builder = "s2i""#);
        let once = overlay(base, layer.clone());
        let twice = overlay(once.clone(), layer);
        assert_eq!(once, twice);
    }
}
