use axum::{extract::Request, middleware::Next, response::Response};

/// Per-request client facts handlers need (resolved once, inserted as an
/// extension by `request_metadata_middleware`)
#[derive(Clone, Debug)]
pub struct RequestMetadata {
    pub ip_address: String,
    pub user_agent: String,
}

impl RequestMetadata {
    pub fn from_request(req: &Request) -> Self {
        let ip_address = req
            .headers()
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.split(',').next())
            .map(|s| s.trim().to_string())
            .or_else(|| {
                req.headers()
                    .get("x-real-ip")
                    .and_then(|h| h.to_str().ok())
                    .map(|s| s.to_string())
            })
            .unwrap_or_else(|| "unknown".to_string());

        let user_agent = req
            .headers()
            .get("user-agent")
            .and_then(|h| h.to_str().ok())
            .unwrap_or("unknown")
            .to_string();

        Self {
            ip_address,
            user_agent,
        }
    }
}

/// Middleware that resolves client metadata and inserts it as an extension
pub async fn request_metadata_middleware(mut req: Request, next: Next) -> Response {
    let metadata = RequestMetadata::from_request(&req);
    req.extensions_mut().insert(metadata);
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;

    #[test]
    fn test_forwarded_for_takes_first_hop() {
        let req = HttpRequest::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .header("user-agent", "curl/8.0")
            .body(Body::empty())
            .unwrap();

        let metadata = RequestMetadata::from_request(&req);
        assert_eq!(metadata.ip_address, "203.0.113.7");
        assert_eq!(metadata.user_agent, "curl/8.0");
    }

    #[test]
    fn test_missing_headers_fall_back_to_unknown() {
        let req = HttpRequest::builder().body(Body::empty()).unwrap();

        let metadata = RequestMetadata::from_request(&req);
        assert_eq!(metadata.ip_address, "unknown");
        assert_eq!(metadata.user_agent, "unknown");
    }

    #[test]
    fn test_real_ip_fallback() {
        let req = HttpRequest::builder()
            .header("x-real-ip", "198.51.100.9")
            .body(Body::empty())
            .unwrap();

        let metadata = RequestMetadata::from_request(&req);
        assert_eq!(metadata.ip_address, "198.51.100.9");
    }
}
