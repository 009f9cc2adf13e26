#[macro_export]
macro_rules! regex {
    ($pat:literal) => {{
        static RE: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pat).unwrap());
        &*RE
    }};
}

/// Builds the `Vec<String>` pattern list a producer registration expects.
#[macro_export]
macro_rules! patterns {
    ($($pat:expr),* $(,)?) => {
        vec![ $($pat.to_string()),* ]
    };
}
