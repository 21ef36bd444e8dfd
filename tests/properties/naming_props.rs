use proptest::prelude::*;

use skm::sync::naming::{decode, encode, is_nested};

/// A path segment that cannot contain the separator or start/end with `_`.
fn segment() -> impl Strategy<Value = String> {
    "[a-z0-9][a-z0-9-]{0,10}"
}

fn nested_path() -> impl Strategy<Value = String> {
    (segment(), prop::collection::vec(segment(), 1..4))
        .prop_map(|(repo, rest)| format!("_{repo}/{}", rest.join("/")))
}

proptest! {
    #[test]
    fn nested_paths_round_trip(path in nested_path()) {
        let flat = encode(&path);
        prop_assert!(is_nested(&flat));
        prop_assert!(!flat.contains('/'));
        prop_assert_eq!(decode(&flat), path);
    }

    #[test]
    fn flat_names_are_fixed_points(name in segment()) {
        prop_assert_eq!(encode(&name), name.clone());
        prop_assert_eq!(decode(&name), name.clone());
        prop_assert!(!is_nested(&name));
    }

    #[test]
    fn separators_do_not_change_the_encoding(path in nested_path()) {
        let windows = path.replace('/', "\\");
        let padded = format!("/{path}/");
        prop_assert_eq!(encode(&windows), encode(&path));
        prop_assert_eq!(encode(&padded), encode(&path));
    }
}
