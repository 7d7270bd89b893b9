use std::collections::HashMap;

/// Parse query parameters from a URI string
///
/// Values are URL-decoded. Repeated keys keep the last value.
///
/// # Example
/// ```
/// use konekta::core::query_params::parse_query_params;
///
/// let params = parse_query_params("/posts?user=abc&page=2");
/// assert_eq!(params.get("user"), Some(&"abc".to_string()));
/// assert_eq!(params.get("page"), Some(&"2".to_string()));
/// ```
pub fn parse_query_params(uri: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();

    if let Some(query_start) = uri.find('?') {
        let query = &uri[query_start + 1..];
        for param in query.split('&').filter(|p| !p.is_empty()) {
            if let Some(eq_idx) = param.find('=') {
                let key = &param[..eq_idx];
                let encoded_value = &param[eq_idx + 1..];
                let decoded = urlencoding::decode(encoded_value)
                    .unwrap_or(std::borrow::Cow::Borrowed(encoded_value))
                    .to_string();
                params.insert(key.to_string(), decoded);
            } else {
                // Flag parameter without value
                params.insert(param.to_string(), String::new());
            }
        }
    }

    params
}

/// Get a non-empty string parameter
pub fn get_string(params: &HashMap<String, String>, key: &str) -> Option<String> {
    params.get(key).filter(|v| !v.is_empty()).cloned()
}

/// Get a page-style integer parameter, never below 1
pub fn get_int(params: &HashMap<String, String>, key: &str, default: usize) -> usize {
    params
        .get(key)
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(default)
        .max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_values_and_flags() {
        let params = parse_query_params("/notifications?type=like&user=a%20b&all");
        assert_eq!(get_string(&params, "type").as_deref(), Some("like"));
        assert_eq!(get_string(&params, "user").as_deref(), Some("a b"));
        assert!(params.contains_key("all"));
        assert_eq!(get_string(&params, "all"), None);
    }

    #[test]
    fn page_defaults_and_floors() {
        let params = parse_query_params("/posts?page=0");
        assert_eq!(get_int(&params, "page", 1), 1);
        assert_eq!(get_int(&parse_query_params("/posts"), "page", 1), 1);
        assert_eq!(get_int(&parse_query_params("/posts?page=3"), "page", 1), 3);
    }
}
