//! Text to value coercions

const TRUE_TOKENS: [&str; 3] = ["true", "on", "1"];
const FALSE_TOKENS: [&str; 3] = ["false", "off", "0"];

/// Parse a boolean token (`true`/`on`/`1`, `false`/`off`/`0`), ignoring
/// case and surrounding whitespace.
pub fn parse_bool(text: &str) -> Option<bool> {
    let token = text.trim().to_ascii_lowercase();
    if TRUE_TOKENS.contains(&token.as_str()) {
        Some(true)
    } else if FALSE_TOKENS.contains(&token.as_str()) {
        Some(false)
    } else {
        None
    }
}

pub fn parse_int(text: &str) -> Option<i64> {
    text.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("true", Some(true))]
    #[case("ON", Some(true))]
    #[case(" 1 ", Some(true))]
    #[case("false", Some(false))]
    #[case("off", Some(false))]
    #[case("0", Some(false))]
    #[case("yes", None)]
    #[case("", None)]
    fn bool_tokens(#[case] input: &str, #[case] expected: Option<bool>) {
        assert_eq!(parse_bool(input), expected);
    }

    proptest! {
        #[test]
        fn bool_display_parses_back(b in any::<bool>()) {
            prop_assert_eq!(parse_bool(&b.to_string()), Some(b));
        }

        #[test]
        fn int_display_parses_back(i in any::<i64>()) {
            prop_assert_eq!(parse_int(&i.to_string()), Some(i));
        }
    }
}
