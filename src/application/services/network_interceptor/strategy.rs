use crate::domain::entities::InterceptedRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestCategory {
    /// Network-first; falls back to cache, queues writes.
    Api,
    /// Network-first; falls back to the cached page or the app shell.
    Navigation,
    /// Cache-first.
    Static,
}

/// Picks the caching strategy for a request. API prefixes win over
/// navigation so that API calls made with navigate mode are still queued.
pub fn classify(request: &InterceptedRequest, api_prefixes: &[String]) -> RequestCategory {
    let path = request.path();
    if api_prefixes
        .iter()
        .any(|prefix| path.starts_with(prefix.as_str()))
    {
        RequestCategory::Api
    } else if request.is_navigation() {
        RequestCategory::Navigation
    } else {
        RequestCategory::Static
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefixes() -> Vec<String> {
        vec!["/api/".to_string()]
    }

    #[test]
    fn classifies_by_priority() {
        assert_eq!(
            classify(&InterceptedRequest::get("/api/clients"), &prefixes()),
            RequestCategory::Api
        );
        assert_eq!(
            classify(&InterceptedRequest::navigate("/api/clients"), &prefixes()),
            RequestCategory::Api
        );
        assert_eq!(
            classify(&InterceptedRequest::navigate("/clients"), &prefixes()),
            RequestCategory::Navigation
        );
        assert_eq!(
            classify(&InterceptedRequest::get("/static/app.js"), &prefixes()),
            RequestCategory::Static
        );
        assert_eq!(
            classify(&InterceptedRequest::get("/apiary.png"), &prefixes()),
            RequestCategory::Static
        );
    }
}
