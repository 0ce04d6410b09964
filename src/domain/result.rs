//! Result type alias for threat-migrate

use super::errors::MigrateError;

/// Result type alias for threat-migrate operations
///
/// # Examples
///
/// ```
/// use threat_migrate::domain::result::Result;
/// use threat_migrate::domain::errors::MigrateError;
///
/// fn failing_function() -> Result<()> {
///     Err(MigrateError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, MigrateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_with_question_mark() -> Result<()> {
        fn inner() -> Result<i32> {
            Ok(42)
        }

        let value = inner()?;
        assert_eq!(value, 42);
        Ok(())
    }
}
