use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};

use crate::models::RequestOrigin;

/// First comma-separated value of a header, if it is printable and non-empty.
fn first_header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.chars().any(|c| c.is_control() || c.is_whitespace()))
}

/// Scheme, host and path base as seen by the client, honouring reverse-proxy headers.
pub fn origin_from_parts(parts: &Parts) -> RequestOrigin {
    let headers = &parts.headers;

    let scheme = first_header_value(headers, "x-forwarded-proto")
        .filter(|s| s.eq_ignore_ascii_case("http") || s.eq_ignore_ascii_case("https"))
        .map(str::to_ascii_lowercase)
        .or_else(|| parts.uri.scheme_str().map(str::to_string))
        .unwrap_or_else(|| "http".to_string());

    let host = first_header_value(headers, "x-forwarded-host")
        .or_else(|| first_header_value(headers, header::HOST.as_str()))
        .map(str::to_string)
        .or_else(|| parts.uri.authority().map(|a| a.to_string()))
        .unwrap_or_else(|| "localhost".to_string());

    let path_base = first_header_value(headers, "x-forwarded-prefix")
        .map(|p| p.trim_end_matches('/'))
        .filter(|p| p.starts_with('/'))
        .unwrap_or("")
        .to_string();

    RequestOrigin { scheme, host, path_base }
}

impl<S> FromRequestParts<S> for RequestOrigin
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(origin_from_parts(parts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn plain_host_header() {
        let p = parts(Request::builder().uri("/api/images/upload").header("host", "localhost:8080"));
        let origin = origin_from_parts(&p);
        assert_eq!(origin, RequestOrigin { scheme: "http".into(), host: "localhost:8080".into(), path_base: "".into() });
    }

    #[test]
    fn forwarded_headers_win() {
        let p = parts(
            Request::builder()
                .uri("/api/images/upload")
                .header("host", "10.0.0.5:8080")
                .header("x-forwarded-proto", "HTTPS, http")
                .header("x-forwarded-host", "walks.example.nz")
                .header("x-forwarded-prefix", "/nzwalks/"),
        );
        let origin = origin_from_parts(&p);
        assert_eq!(origin.image_url("sky.jpg"), "https://walks.example.nz/nzwalks/images/sky.jpg");
    }

    #[test]
    fn bogus_scheme_is_ignored() {
        let p = parts(Request::builder().uri("/").header("host", "h").header("x-forwarded-proto", "javascript"));
        assert_eq!(origin_from_parts(&p).scheme, "http");
    }

    #[test]
    fn missing_host_falls_back() {
        let p = parts(Request::builder().uri("/"));
        assert_eq!(origin_from_parts(&p).host, "localhost");
    }
}
