// Copyright 2025 Cowboy AI, LLC.

//! Human-readable rendering of compound identifiers
//!
//! Guard descriptions and error reports are built from enum variant and
//! rule identifiers such as `TablesAvailable` or `HasCustomerIKO`. These
//! helpers split them into space-separated lower-case words, keeping runs
//! of uppercase letters (acronyms) verbatim.

/// Split camel-case identifiers into space-separated lower-case words.
///
/// Runs of two or more uppercase letters are treated as acronyms and kept
/// verbatim: `HasCustomerIKO` becomes `has customer IKO`. Characters that
/// are not part of an identifier (list separators, spaces) pass through
/// untouched, so already-joined descriptions stay readable.
pub fn split_camel_case(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i].is_alphanumeric() {
            let start = i;
            while i < chars.len() && chars[i].is_alphanumeric() {
                i += 1;
            }
            let segment: String = chars[start..i].iter().collect();
            out.push_str(&humanize_identifier(&segment));
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }

    out
}

fn humanize_identifier(identifier: &str) -> String {
    let chars: Vec<char> = identifier.chars().collect();
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !current.is_empty() && starts_new_word(&chars, i) {
            words.push(current);
            current = String::new();
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
        .into_iter()
        .map(|word| {
            let is_acronym = word.len() > 1 && word.chars().all(|c| c.is_uppercase());
            if is_acronym {
                word
            } else {
                word.to_lowercase()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// Word boundaries: lower/digit followed by upper, and the last letter of an
// uppercase run when the next letter is lowercase ("IKOCheck" -> IKO Check).
fn starts_new_word(chars: &[char], i: usize) -> bool {
    let c = chars[i];
    if !c.is_uppercase() {
        return false;
    }
    let prev = chars[i - 1];
    if prev.is_lowercase() || prev.is_numeric() {
        return true;
    }
    prev.is_uppercase() && matches!(chars.get(i + 1), Some(n) if n.is_lowercase())
}

/// Join rendered items with the list separator used in messages and reports
pub fn join_described<I>(items: I) -> String
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    items
        .into_iter()
        .map(|s| s.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("TablesAvailable", "tables available")]
    #[test_case("NoTablesAvailable", "no tables available")]
    #[test_case("GreetCustomer", "greet customer")]
    #[test_case("OrderPlacedWithWaiter", "order placed with waiter")]
    #[test_case("HasCustomerIKO", "has customer IKO")]
    #[test_case("IKOCheckDone", "IKO check done")]
    #[test_case("Waiter", "waiter")]
    #[test_case("IKO", "IKO")]
    #[test_case("", "")]
    #[test_case("GreetCustomer, ProvideMenu", "greet customer, provide menu")]
    #[test_case("CheckIKO, CheckABC", "check IKO, check ABC")]
    fn test_split_camel_case(input: &str, expected: &str) {
        assert_eq!(split_camel_case(input), expected);
    }

    #[test]
    fn test_join_described() {
        assert_eq!(join_described(["Waiter", "Customer"]), "Waiter, Customer");
        assert_eq!(join_described(Vec::<String>::new()), "");
    }
}
