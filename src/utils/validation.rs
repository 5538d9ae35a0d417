use crate::utils::error::{KnotError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// 驗證 bus 位址：不可為空、不可包含空白
pub fn validate_address(field_name: &str, address: &str) -> Result<()> {
    validate_non_empty_string(field_name, address)?;

    if address.chars().any(char::is_whitespace) {
        return Err(KnotError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: address.to_string(),
            reason: "Address cannot contain whitespace".to_string(),
        });
    }
    Ok(())
}

/// 驗證外部服務的 domain 與 port 能組成合法的 http URL
pub fn validate_service_domain(field_name: &str, domain: &str, port: u16) -> Result<()> {
    validate_non_empty_string(field_name, domain)?;
    validate_positive_number(field_name, port as usize, 1)?;

    match Url::parse(&format!("http://{}:{}", domain, port)) {
        Ok(url) if url.host_str().is_some() => Ok(()),
        Ok(_) => Err(KnotError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: domain.to_string(),
            reason: "Domain has no host part".to_string(),
        }),
        Err(e) => Err(KnotError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: domain.to_string(),
            reason: format!("Invalid domain: {}", e),
        }),
    }
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(KnotError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_regex(field_name: &str, pattern: &str) -> Result<regex::Regex> {
    regex::Regex::new(pattern).map_err(|e| KnotError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: pattern.to_string(),
        reason: format!("Invalid regular expression: {}", e),
    })
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(KnotError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_address() {
        assert!(validate_address("address", "knot.service").is_ok());
        assert!(validate_address("address", "").is_err());
        assert!(validate_address("address", "   ").is_err());
        assert!(validate_address("address", "knot service").is_err());
    }

    #[test]
    fn test_validate_service_domain() {
        assert!(validate_service_domain("services[0]", "localhost", 8080).is_ok());
        assert!(validate_service_domain("services[0]", "api.example.com", 443).is_ok());
        assert!(validate_service_domain("services[0]", "", 8080).is_err());
        assert!(validate_service_domain("services[0]", "localhost", 0).is_err());
        assert!(validate_service_domain("services[0]", "bad host", 80).is_err());
    }

    #[test]
    fn test_validate_regex() {
        assert!(validate_regex("path", "/service/.*").is_ok());
        assert!(validate_regex("path", "/service/(").is_err());
    }
}
