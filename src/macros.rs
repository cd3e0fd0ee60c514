/// A `&'static Regex` compiled on first use.
///
/// Patterns are literals, so a compile failure is a programming error and
/// surfaces on the first call in tests.
#[macro_export]
macro_rules! regex {
    ($pat:literal) => {{
        static RE: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pat).unwrap());
        &*RE
    }};
}
