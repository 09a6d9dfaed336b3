/// Parse and validate an optimizer level flag.
///
/// # Examples
///
/// Valid flags: -O, -O3, -Oz, -g
/// Invalid flags: O3, -, "-O -g", ""
///
/// # Errors
///
/// Returns an error message if the flag is not a single dash-prefixed token.
pub fn parse_opt_level(s: &str) -> Result<String, String> {
    if s.is_empty() {
        return Err("Optimization flag cannot be empty".to_string());
    }

    crate::config::validate_opt_level(s).map_err(|_| {
        format!(
            "Optimization flag must be a single option like -O, -O3, -Oz or -g: '{}'",
            s
        )
    })?;

    Ok(s.to_string())
}
