// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{fmt, sync::Arc};

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use base64::{Engine, engine::general_purpose::STANDARD};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::error::{ApiError, ApiResult};

type Fingerprint = [u8; 32];

/// HTTP Basic credentials, held only as SHA-256 digests.
#[derive(Clone)]
pub struct Credentials {
    user:     Fingerprint,
    password: Fingerprint,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials").finish_non_exhaustive()
    }
}

impl Credentials {
    #[must_use]
    pub fn new(user: &str, password: &str) -> Self {
        Self {
            user:     fingerprint(user.as_bytes()),
            password: fingerprint(password.as_bytes()),
        }
    }

    /// Checks an `Authorization` header value of the form
    /// `Basic base64(user:password)`.
    #[must_use]
    pub fn verify(&self, authorization: &str) -> bool {
        let Some(encoded) = authorization
            .strip_prefix("Basic ")
            .or_else(|| authorization.strip_prefix("basic "))
        else {
            return false;
        };
        let Ok(decoded) = STANDARD.decode(encoded.trim()) else {
            return false;
        };
        let Some(split) = decoded.iter().position(|b| *b == b':') else {
            return false;
        };
        let (user, password) = (&decoded[..split], &decoded[split + 1..]);

        // Both comparisons always run.
        let user_ok = digests_equal(&fingerprint(user), &self.user);
        let password_ok = digests_equal(&fingerprint(password), &self.password);
        user_ok & password_ok
    }

    fn verify_headers(&self, headers: &HeaderMap) -> bool {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| self.verify(value))
    }
}

fn fingerprint(bytes: &[u8]) -> Fingerprint { Sha256::digest(bytes).into() }

fn digests_equal(a: &Fingerprint, b: &Fingerprint) -> bool {
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Rejects requests without valid Basic credentials.
pub async fn require_basic_auth(
    State(credentials): State<Arc<Credentials>>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    if !credentials.verify_headers(request.headers()) {
        warn!(path = %request.uri().path(), "Rejected unauthenticated request");
        return Err(ApiError::Unauthorized);
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn header_for(user: &str, password: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("{user}:{password}")))
    }

    #[test]
    fn test_accepts_matching_credentials() {
        let credentials = Credentials::new("user", "s3cret:with:colons");
        assert!(credentials.verify(&header_for("user", "s3cret:with:colons")));
    }

    #[test_case(&header_for("user", "wrong") ; "wrong password")]
    #[test_case(&header_for("other", "s3cret") ; "wrong user")]
    #[test_case("Bearer abc" ; "other scheme")]
    #[test_case("Basic !!!notbase64" ; "invalid base64")]
    #[test_case(&format!("Basic {}", STANDARD.encode("nocolon")) ; "missing separator")]
    #[test_case("" ; "empty")]
    fn test_rejects(authorization: &str) {
        let credentials = Credentials::new("user", "s3cret");
        assert!(!credentials.verify(authorization));
    }

    #[test]
    fn test_debug_hides_digests() {
        let credentials = Credentials::new("user", "s3cret");
        assert_eq!(format!("{credentials:?}"), "Credentials { .. }");
    }
}
