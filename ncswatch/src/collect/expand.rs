//! Command template expansion.

/// Placeholder replaced by each item.
pub const PLACEHOLDER: &str = "{item}";

/// Cross product of `templates` and `items`, template-major.
///
/// Every occurrence of `{item}` in a template is replaced. Templates without
/// the placeholder pass through unchanged, once per item. The iterator is
/// lazy and `Clone`; a clone starts over from the beginning.
pub fn expand<'a, T, I>(
    templates: &'a [T],
    items: &'a [I],
) -> impl Iterator<Item = String> + Clone + 'a
where
    T: AsRef<str>,
    I: AsRef<str>,
{
    templates.iter().flat_map(move |template| {
        items
            .iter()
            .map(move |item| template.as_ref().replace(PLACEHOLDER, item.as_ref()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_major_order() {
        let commands: Vec<_> = expand(
            &["show controllers optics {item}", "show interface HundredGigE{item}"],
            &["0/0/0/0", "0/1/0/3"],
        )
        .collect();

        assert_eq!(
            commands,
            vec![
                "show controllers optics 0/0/0/0",
                "show controllers optics 0/1/0/3",
                "show interface HundredGigE0/0/0/0",
                "show interface HundredGigE0/1/0/3",
            ]
        );
    }

    #[test]
    fn test_count() {
        let templates = ["a {item}", "b {item}", "c {item}"];
        let items = ["1", "2", "3", "4"];
        assert_eq!(expand(&templates, &items).count(), 12);
    }

    #[test]
    fn test_empty_inputs() {
        let none: [&str; 0] = [];
        assert_eq!(expand(&none, &["0"]).count(), 0);
        assert_eq!(expand(&["x {item}"], &none).count(), 0);
    }

    #[test]
    fn test_literal_template() {
        let commands: Vec<_> = expand(&["show clock"], &["1", "2"]).collect();
        assert_eq!(commands, vec!["show clock", "show clock"]);
    }

    #[test]
    fn test_clone_restarts() {
        let iter = expand(&["t{item}"], &["1", "2"]);
        let mut first = iter.clone();
        assert_eq!(first.next().as_deref(), Some("t1"));
        assert_eq!(iter.collect::<Vec<_>>(), vec!["t1", "t2"]);
    }

    #[test]
    fn test_owned_items() {
        let slots = vec!["0".to_string(), "3".to_string()];
        let commands: Vec<_> = expand(&["location 0/{item}/CPU0"], &slots).collect();
        assert_eq!(commands, vec!["location 0/0/CPU0", "location 0/3/CPU0"]);
    }
}
