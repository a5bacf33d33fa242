use actix_web::{web, FromRequest, HttpRequest};
use futures::future::{ok, Ready};

use super::jwt::JwtService;
use super::models::{SessionIdentity, SessionState};

/// Extracts the caller's session from the `Authorization` header.
///
/// Extraction never fails: a missing, malformed, or expired bearer token
/// yields `LoggedOut`. Routes that require a signed-in caller check the
/// state themselves; routes that merely behave differently for signed-in
/// callers (like the submission path) stay reachable for everyone.
pub struct Session(pub SessionState);

impl FromRequest for Session {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        let state = match req.app_data::<web::Data<JwtService>>() {
            Some(jwt_service) => session_from_request(req, jwt_service),
            None => {
                log::warn!("JwtService not registered; treating caller as logged out");
                SessionState::LoggedOut
            }
        };
        ok(Session(state))
    }
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

pub(crate) fn session_from_request(req: &HttpRequest, jwt_service: &JwtService) -> SessionState {
    let Some(token) = bearer_token(req) else {
        return SessionState::LoggedOut;
    };
    match jwt_service.verify_token(token) {
        Ok(claims) => SessionState::LoggedIn(SessionIdentity {
            user_id: claims.sub,
            email: claims.email,
            display_name: claims.name,
        }),
        Err(err) => {
            log::debug!("discarding invalid bearer token: {err}");
            SessionState::LoggedOut
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn service() -> JwtService {
        JwtService::new("session-test-secret")
    }

    fn identity() -> SessionIdentity {
        SessionIdentity {
            user_id: "uid-7".to_string(),
            email: "c@z.com".to_string(),
            display_name: "Carol".to_string(),
        }
    }

    #[test]
    fn requests_without_a_token_are_logged_out() {
        let req = TestRequest::default().to_http_request();
        assert_eq!(session_from_request(&req, &service()), SessionState::LoggedOut);
    }

    #[test]
    fn requests_with_a_valid_token_carry_the_identity() {
        let jwt = service();
        let token = jwt.generate_token(&identity()).unwrap();
        let req = TestRequest::default()
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_http_request();
        assert_eq!(
            session_from_request(&req, &jwt),
            SessionState::LoggedIn(identity())
        );
    }

    #[test]
    fn garbage_and_foreign_tokens_fall_back_to_logged_out() {
        let jwt = service();
        for header in ["Bearer nonsense", "Basic abc", "Bearer "] {
            let req = TestRequest::default()
                .insert_header(("Authorization", header))
                .to_http_request();
            assert_eq!(session_from_request(&req, &jwt), SessionState::LoggedOut);
        }

        let foreign = JwtService::new("some-other-secret")
            .generate_token(&identity())
            .unwrap();
        let req = TestRequest::default()
            .insert_header(("Authorization", format!("Bearer {foreign}")))
            .to_http_request();
        assert_eq!(session_from_request(&req, &jwt), SessionState::LoggedOut);
    }
}
