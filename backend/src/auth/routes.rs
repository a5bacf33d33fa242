use actix_web::{web, HttpResponse, Result};
use log::{info, warn};

use crate::store::results::ResultStore;

use super::firebase::{AuthError, FirebaseAuthService};
use super::jwt::JwtService;
use super::models::{
    AuthResponse, RefreshForm, RegisterForm, SessionIdentity, SessionState, SignInForm,
    UserProfile,
};
use super::session::Session;

#[derive(serde::Serialize)]
struct ErrorResponse {
    error: String,
}

fn rejected(reason: &AuthError) -> HttpResponse {
    // Provider failures are recoverable by signing in again; none of the
    // raw detail leaks to the caller.
    HttpResponse::Unauthorized().json(ErrorResponse {
        error: match reason {
            AuthError::InvalidCredentials(_) => "invalid email or password".to_string(),
            _ => "authentication is currently unavailable".to_string(),
        },
    })
}

pub async fn sign_in(
    form: web::Json<SignInForm>,
    auth_service: web::Data<FirebaseAuthService>,
    jwt_service: web::Data<JwtService>,
    result_store: web::Data<ResultStore>,
) -> Result<HttpResponse> {
    match perform_sign_in(&form, &auth_service, &jwt_service, &result_store).await {
        Ok(response) => {
            info!("user signed in: {}", response.user.email);
            Ok(HttpResponse::Ok().json(response))
        }
        Err(err) => {
            warn!("sign-in rejected for {}: {err}", form.email);
            Ok(rejected(&err))
        }
    }
}

async fn perform_sign_in(
    form: &SignInForm,
    auth_service: &FirebaseAuthService,
    jwt_service: &JwtService,
    result_store: &ResultStore,
) -> std::result::Result<AuthResponse, AuthError> {
    let user = auth_service.sign_in(&form.email, &form.password).await?;

    let profile = result_store
        .get_profile(&user.local_id)
        .await?
        .ok_or_else(|| AuthError::MissingProfile(user.local_id.clone()))?;

    // Keep the provider-side session fresh before minting our own token.
    auth_service.refresh(&user.refresh_token).await?;

    let identity = SessionIdentity {
        user_id: user.local_id,
        email: user.email,
        display_name: profile.name,
    };
    let token = jwt_service.generate_token(&identity)?;
    Ok(AuthResponse {
        token,
        user: identity,
    })
}

pub async fn register(
    form: web::Json<RegisterForm>,
    auth_service: web::Data<FirebaseAuthService>,
    jwt_service: web::Data<JwtService>,
    result_store: web::Data<ResultStore>,
) -> Result<HttpResponse> {
    match perform_register(&form, &auth_service, &jwt_service, &result_store).await {
        Ok(response) => {
            info!("registered new user: {}", response.user.email);
            Ok(HttpResponse::Ok().json(response))
        }
        Err(err) => {
            warn!("registration rejected for {}: {err}", form.email);
            Ok(rejected(&err))
        }
    }
}

async fn perform_register(
    form: &RegisterForm,
    auth_service: &FirebaseAuthService,
    jwt_service: &JwtService,
    result_store: &ResultStore,
) -> std::result::Result<AuthResponse, AuthError> {
    auth_service
        .create_account(&form.email, &form.password)
        .await?;
    let user = auth_service.sign_in(&form.email, &form.password).await?;

    let profile = UserProfile {
        name: form.name.clone(),
        email: form.email.clone(),
    };
    result_store.put_profile(&user.local_id, &profile).await?;

    auth_service.refresh(&user.refresh_token).await?;

    let identity = SessionIdentity {
        user_id: user.local_id,
        email: user.email,
        display_name: profile.name,
    };
    let token = jwt_service.generate_token(&identity)?;
    Ok(AuthResponse {
        token,
        user: identity,
    })
}

pub async fn refresh(
    session: Session,
    form: web::Json<RefreshForm>,
    auth_service: web::Data<FirebaseAuthService>,
    jwt_service: web::Data<JwtService>,
) -> Result<HttpResponse> {
    let SessionState::LoggedIn(identity) = session.0 else {
        return Ok(HttpResponse::Unauthorized().json(ErrorResponse {
            error: "sign in before refreshing".to_string(),
        }));
    };

    match auth_service.refresh(&form.refresh_token).await {
        Ok(_tokens) => match jwt_service.refresh_token(&identity) {
            Ok(token) => Ok(HttpResponse::Ok().json(AuthResponse {
                token,
                user: identity,
            })),
            Err(err) => {
                warn!("token refresh failed for {}: {err}", identity.user_id);
                Ok(HttpResponse::Unauthorized().json(ErrorResponse {
                    error: "could not refresh session".to_string(),
                }))
            }
        },
        Err(err) => {
            warn!("provider refresh failed for {}: {err}", identity.user_id);
            Ok(rejected(&err))
        }
    }
}

pub async fn me(session: Session) -> Result<HttpResponse> {
    match session.0 {
        SessionState::LoggedIn(identity) => Ok(HttpResponse::Ok().json(identity)),
        SessionState::LoggedOut => Ok(HttpResponse::Unauthorized().json(ErrorResponse {
            error: "not signed in".to_string(),
        })),
    }
}
