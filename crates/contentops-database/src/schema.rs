//! Site table naming.
//!
//! Table names cannot be bound as query parameters, so every prefix is
//! checked before it is interpolated into SQL.

use contentops_core::error::AppError;
use contentops_core::result::AppResult;

/// Ensure `prefix` only contains ASCII letters, digits and underscores.
pub fn validate_site_prefix(prefix: &str) -> AppResult<()> {
    if prefix.is_empty()
        || !prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(AppError::validation(format!(
            "Invalid site prefix '{prefix}'"
        )));
    }
    Ok(())
}

/// Posts table of the site, e.g. `site1_posts`.
pub fn posts_table(prefix: &str) -> AppResult<String> {
    validate_site_prefix(prefix)?;
    Ok(format!("{prefix}posts"))
}

/// Users table of the site, e.g. `site1_users`.
pub fn users_table(prefix: &str) -> AppResult<String> {
    validate_site_prefix(prefix)?;
    Ok(format!("{prefix}users"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use contentops_core::ErrorKind;

    #[test]
    fn test_table_names() {
        assert_eq!(posts_table("site1_").unwrap(), "site1_posts");
        assert_eq!(users_table("site2_").unwrap(), "site2_users");
    }

    #[test]
    fn test_rejects_injection() {
        for prefix in ["", "site1_; DROP TABLE x; --", "site 1_", "site`1_"] {
            let err = posts_table(prefix).unwrap_err();
            assert_eq!(err.kind, ErrorKind::Validation);
        }
    }
}
