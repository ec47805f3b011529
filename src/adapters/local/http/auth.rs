use crate::domain::Principal;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Static bearer tokens mapped to usernames.
#[derive(Clone, Debug, Default)]
pub struct TokenTable {
    tokens: Arc<HashMap<String, String>>,
}

impl TokenTable {
    pub fn new(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            tokens: Arc::new(pairs.into_iter().collect()),
        }
    }

    /// Parse `token:username` pairs separated by commas. Malformed entries are skipped.
    pub fn parse(raw: &str) -> Self {
        Self::new(raw.split(',').filter_map(|entry| {
            let (token, username) = entry.trim().split_once(':')?;
            let (token, username) = (token.trim(), username.trim());
            if token.is_empty() || username.is_empty() {
                return None;
            }
            Some((token.to_string(), username.to_string()))
        }))
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn resolve(&self, token: &str) -> Option<Principal> {
        self.tokens.get(token).map(Principal::new)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?;
    Some(token.trim())
}

/// Attach the caller's `Principal` to the request when the token is known.
/// Unknown callers pass through without one and are refused by the guard.
pub async fn authenticate(
    State(tokens): State<TokenTable>,
    mut request: Request,
    next: Next,
) -> Response {
    match bearer_token(request.headers()).map(|token| tokens.resolve(token)) {
        Some(Some(principal)) => {
            request.extensions_mut().insert(principal);
        }
        Some(None) => debug!("unknown bearer token"),
        None => {}
    }
    next.run(request).await
}
