//! # Signature Base String
//!
//! Canonical construction of the string that OAuth 1.0 signs
//! (RFC 5849 Section 3.4.1):
//!
//! ```text
//! METHOD & encode(normalized URL) & encode(normalized parameters)
//! ```
//!
//! The normalized URL keeps scheme, authority and path only. The normalized
//! parameter string is every request parameter except `oauth_signature`,
//! encoded, sorted by name then value, and joined with `&`.

use super::encoding::percent_encode;
use super::entities::param;
use thiserror::Error;

/// Errors while canonicalizing a request URL.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CanonicalError {
    /// URL has no `scheme://` prefix
    #[error("Request URL has no scheme: {0}")]
    MissingScheme(String),

    /// URL has an empty host
    #[error("Request URL has no host")]
    MissingHost,

    /// Port is present but not a number
    #[error("Request URL has an invalid port: {0}")]
    InvalidPort(String),
}

/// Normalize a request URL for the base string.
///
/// Scheme and host are lowercased, the default port for `http`/`https` is
/// dropped, userinfo, query and fragment are removed, and an empty path
/// becomes `/`. Path case is preserved.
pub fn normalize_url(url: &str) -> Result<String, CanonicalError> {
    let (scheme, rest) = url
        .split_once("://")
        .filter(|(scheme, _)| !scheme.is_empty())
        .ok_or_else(|| CanonicalError::MissingScheme(url.to_string()))?;
    let scheme = scheme.to_ascii_lowercase();

    let rest = match rest.find(['?', '#']) {
        Some(idx) => &rest[..idx],
        None => rest,
    };
    let (authority, path) = match rest.find('/') {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, "/"),
    };
    let authority = match authority.rfind('@') {
        Some(idx) => &authority[idx + 1..],
        None => authority,
    };

    let (host, port) = split_host_port(authority)?;
    if host.is_empty() {
        return Err(CanonicalError::MissingHost);
    }
    let host = host.to_ascii_lowercase();

    let default_port = match scheme.as_str() {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    };

    Ok(match port {
        Some(p) if Some(p) != default_port => format!("{scheme}://{host}:{p}{path}"),
        _ => format!("{scheme}://{host}{path}"),
    })
}

/// Split `host[:port]`, honouring bracketed IPv6 literals.
fn split_host_port(authority: &str) -> Result<(&str, Option<u16>), CanonicalError> {
    let (host, port) = if authority.starts_with('[') {
        match authority.find(']') {
            Some(end) => {
                let host = &authority[..=end];
                match authority[end + 1..].strip_prefix(':') {
                    Some(port) => (host, Some(port)),
                    None => (host, None),
                }
            }
            None => (authority, None),
        }
    } else {
        match authority.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (authority, None),
        }
    };

    match port {
        None | Some("") => Ok((host, None)),
        Some(port) => port
            .parse::<u16>()
            .map(|p| (host, Some(p)))
            .map_err(|_| CanonicalError::InvalidPort(port.to_string())),
    }
}

/// Build the normalized parameter string.
///
/// `oauth_signature` is excluded wherever it appears.
pub fn normalize_parameters<'a, I>(params: I) -> String
where
    I: IntoIterator<Item = &'a (String, String)>,
{
    let mut encoded: Vec<(String, String)> = params
        .into_iter()
        .filter(|(name, _)| name != param::OAUTH_SIGNATURE)
        .map(|(name, value)| (percent_encode(name), percent_encode(value)))
        .collect();
    encoded.sort();

    encoded
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Build the full signature base string.
pub fn signature_base_string<'a, I>(
    method: &str,
    url: &str,
    params: I,
) -> Result<String, CanonicalError>
where
    I: IntoIterator<Item = &'a (String, String)>,
{
    let url = normalize_url(url)?;
    let params = normalize_parameters(params);

    Ok(format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        percent_encode(&url),
        percent_encode(&params)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_normalize_url_lowercases_scheme_and_host() {
        assert_eq!(
            normalize_url("HTTP://Example.COM/Request").unwrap(),
            "http://example.com/Request"
        );
    }

    #[test]
    fn test_normalize_url_drops_default_ports() {
        assert_eq!(
            normalize_url("http://example.com:80/r").unwrap(),
            "http://example.com/r"
        );
        assert_eq!(
            normalize_url("https://www.example.net:443/r").unwrap(),
            "https://www.example.net/r"
        );
    }

    #[test]
    fn test_normalize_url_keeps_custom_port() {
        assert_eq!(
            normalize_url("https://www.example.net:8080/?q=1").unwrap(),
            "https://www.example.net:8080/"
        );
    }

    #[test]
    fn test_normalize_url_strips_query_fragment_userinfo() {
        assert_eq!(
            normalize_url("https://user:pw@example.org/api/lti/1?x=y#frag").unwrap(),
            "https://example.org/api/lti/1"
        );
    }

    #[test]
    fn test_normalize_url_empty_path_becomes_slash() {
        assert_eq!(
            normalize_url("https://example.org").unwrap(),
            "https://example.org/"
        );
    }

    #[test]
    fn test_normalize_url_ipv6() {
        assert_eq!(
            normalize_url("http://[::1]:8080/launch").unwrap(),
            "http://[::1]:8080/launch"
        );
        assert_eq!(normalize_url("http://[::1]/").unwrap(), "http://[::1]/");
    }

    #[test]
    fn test_normalize_url_errors() {
        assert!(matches!(
            normalize_url("example.org/path"),
            Err(CanonicalError::MissingScheme(_))
        ));
        assert_eq!(normalize_url("https:///x"), Err(CanonicalError::MissingHost));
        assert!(matches!(
            normalize_url("https://example.org:abc/"),
            Err(CanonicalError::InvalidPort(_))
        ));
    }

    /// Test: oauth_signature never participates in the parameter string
    #[test]
    fn test_normalize_parameters_excludes_signature() {
        let params = pairs(&[("b", "2"), ("oauth_signature", "zzz"), ("a", "1")]);
        assert_eq!(normalize_parameters(&params), "a=1&b=2");
    }

    /// Test: duplicate names are ordered by encoded value
    #[test]
    fn test_normalize_parameters_sorts_by_name_then_value() {
        let params = pairs(&[("a3", "a"), ("a3", "2 q"), ("a2", "r b")]);
        assert_eq!(normalize_parameters(&params), "a2=r%20b&a3=2%20q&a3=a");
    }

    /// Test: RFC 5849 Section 3.4.1.1 example base string
    #[test]
    fn test_rfc5849_base_string_example() {
        let params = pairs(&[
            ("b5", "=%3D"),
            ("a3", "a"),
            ("c@", ""),
            ("a2", "r b"),
            ("oauth_consumer_key", "9djdj82h48djs9d2"),
            ("oauth_token", "kkk9d7dh3k39sjv7"),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", "137131201"),
            ("oauth_nonce", "7d8f3e4a"),
            ("c2", ""),
            ("a3", "2 q"),
        ]);

        let base = signature_base_string("post", "http://example.com/request", &params).unwrap();

        assert_eq!(
            base,
            "POST&http%3A%2F%2Fexample.com%2Frequest&a2%3Dr%2520b%26a3%3D2%2520q\
             %26a3%3Da%26b5%3D%253D%25253D%26c%2540%3D%26c2%3D%26oauth_consumer_\
             key%3D9djdj82h48djs9d2%26oauth_nonce%3D7d8f3e4a%26oauth_signature_m\
             ethod%3DHMAC-SHA1%26oauth_timestamp%3D137131201%26oauth_token%3Dkkk\
             9d7dh3k39sjv7"
        );
    }
}
