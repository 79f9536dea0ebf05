//! `${VAR}` / `${VAR:-default}` expansion for configuration text.

/// Expands `${VAR}` and `${VAR:-default}` references against the process
/// environment. Unset variables without a default expand to the empty
/// string. `$VAR` without braces is left untouched.
pub fn expand_env(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let body = &after[..end];
                let (name, default) = match body.split_once(":-") {
                    Some((n, d)) => (n, Some(d)),
                    None => (body, None),
                };
                match std::env::var(name) {
                    Ok(value) => out.push_str(&value),
                    Err(_) => out.push_str(default.unwrap_or("")),
                }
                rest = &after[end + 1..];
            }
            None => {
                // Unterminated reference; keep the literal text.
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Set variables expand; unset ones take the default or empty.
    #[test]
    fn expand_set_unset_and_default() {
        std::env::set_var("OSPREY_EXPAND_SET", "value");
        std::env::remove_var("OSPREY_EXPAND_UNSET");
        assert_eq!(expand_env("a ${OSPREY_EXPAND_SET} b"), "a value b");
        assert_eq!(expand_env("${OSPREY_EXPAND_UNSET:-fallback}"), "fallback");
        assert_eq!(expand_env("${OSPREY_EXPAND_UNSET}"), "");
        std::env::remove_var("OSPREY_EXPAND_SET");
    }

    /// **Scenario**: Text without references and unterminated braces pass through.
    #[test]
    fn expand_passthrough() {
        assert_eq!(expand_env("no refs here"), "no refs here");
        assert_eq!(expand_env("broken ${REF"), "broken ${REF");
        assert_eq!(expand_env("plain $VAR stays"), "plain $VAR stays");
    }

    /// **Scenario**: Multiple references expand in one pass.
    #[test]
    fn expand_multiple() {
        std::env::set_var("OSPREY_EXPAND_A", "1");
        std::env::set_var("OSPREY_EXPAND_B", "2");
        assert_eq!(
            expand_env("${OSPREY_EXPAND_A}-${OSPREY_EXPAND_B}"),
            "1-2"
        );
        std::env::remove_var("OSPREY_EXPAND_A");
        std::env::remove_var("OSPREY_EXPAND_B");
    }
}
