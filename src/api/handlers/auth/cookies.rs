//! Token cookie construction and parsing.
//!
//! Both tokens travel as `HttpOnly` cookies. Production gets `Secure` with
//! `SameSite=None` (the frontend lives on another origin); everything else
//! gets `SameSite=Lax` so local development works over plain HTTP.

use axum::http::header::{InvalidHeaderValue, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

#[derive(Debug, Clone, Copy)]
pub struct CookieOptions {
    pub production: bool,
    pub access_max_age_seconds: i64,
    pub refresh_max_age_seconds: i64,
}

fn build_cookie(
    name: &str,
    value: &str,
    max_age_seconds: i64,
    production: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let same_site = if production { "None" } else { "Lax" };
    let mut cookie =
        format!("{name}={value}; Path=/; HttpOnly; SameSite={same_site}; Max-Age={max_age_seconds}");
    if production {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Attach both token cookies to a response.
pub fn set_token_cookies(
    headers: &mut HeaderMap,
    options: CookieOptions,
    access_token: &str,
    refresh_token: &str,
) -> Result<(), InvalidHeaderValue> {
    headers.append(
        SET_COOKIE,
        build_cookie(
            ACCESS_COOKIE,
            access_token,
            options.access_max_age_seconds,
            options.production,
        )?,
    );
    headers.append(
        SET_COOKIE,
        build_cookie(
            REFRESH_COOKIE,
            refresh_token,
            options.refresh_max_age_seconds,
            options.production,
        )?,
    );
    Ok(())
}

/// Overwrite both token cookies with empty expired values.
pub fn clear_token_cookies(headers: &mut HeaderMap, options: CookieOptions) {
    for name in [ACCESS_COOKIE, REFRESH_COOKIE] {
        if let Ok(cookie) = build_cookie(name, "", 0, options.production) {
            headers.append(SET_COOKIE, cookie);
        }
    }
}

/// Read one cookie value from the request's `Cookie` header.
#[must_use]
pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let mut parts = pair.trim().splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == name && !val.is_empty() {
            return Some(val.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPTIONS: CookieOptions = CookieOptions {
        production: false,
        access_max_age_seconds: 900,
        refresh_max_age_seconds: 2_592_000,
    };

    fn cookie_values(headers: &HeaderMap) -> Vec<&str> {
        headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect()
    }

    #[test]
    fn development_cookies_are_lax_without_secure() {
        let mut headers = HeaderMap::new();
        set_token_cookies(&mut headers, OPTIONS, "acc", "ref").expect("valid cookie values");
        let cookies = cookie_values(&headers);
        assert_eq!(cookies.len(), 2);
        assert!(cookies[0].starts_with("access_token=acc;"));
        assert!(cookies[0].contains("SameSite=Lax"));
        assert!(cookies[0].contains("HttpOnly"));
        assert!(!cookies[0].contains("Secure"));
        assert!(cookies[1].contains("Max-Age=2592000"));
    }

    #[test]
    fn production_cookies_are_secure_same_site_none() {
        let mut headers = HeaderMap::new();
        let options = CookieOptions {
            production: true,
            ..OPTIONS
        };
        set_token_cookies(&mut headers, options, "acc", "ref").expect("valid cookie values");
        for cookie in cookie_values(&headers) {
            assert!(cookie.contains("SameSite=None"));
            assert!(cookie.contains("Secure"));
        }
    }

    #[test]
    fn clearing_writes_empty_expired_values() {
        let mut headers = HeaderMap::new();
        clear_token_cookies(&mut headers, OPTIONS);
        let cookies = cookie_values(&headers);
        assert_eq!(cookies.len(), 2);
        assert!(cookies[0].starts_with("access_token=;"));
        assert!(cookies[0].contains("Max-Age=0"));
        assert!(cookies[1].starts_with("refresh_token=;"));
    }

    #[test]
    fn extract_cookie_picks_the_named_pair() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("other=1; refresh_token=abc.def.ghi; access_token=xyz"),
        );
        assert_eq!(
            extract_cookie(&headers, REFRESH_COOKIE),
            Some("abc.def.ghi".to_string())
        );
        assert_eq!(
            extract_cookie(&headers, ACCESS_COOKIE),
            Some("xyz".to_string())
        );
        assert_eq!(extract_cookie(&headers, "missing"), None);
    }

    #[test]
    fn empty_cookie_value_reads_as_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("refresh_token="));
        assert_eq!(extract_cookie(&headers, REFRESH_COOKIE), None);
    }
}
