/// Split an already-trimmed line on every literal occurrence of `separator`.
///
/// No quoting or escaping: a field containing the separator is split too.
/// Fields are not trimmed. `separator` must be non-empty (checked by config).
pub fn split_fields<'a>(line: &'a str, separator: &str) -> Vec<&'a str> {
    line.split(separator).collect()
}
