use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::{
    models::user::{CurrentUser, UserRole},
    state::AppState,
    utils::jwt::{verify_access_token, Claims},
};

pub async fn auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let user = authenticate_request(request.headers(), &state.config.jwt_secret)?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

// Auth + require teacher role for session and roll management
pub async fn auth_teacher(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let user = authenticate_request(request.headers(), &state.config.jwt_secret)?;
    if !user.is_teacher() {
        return Err(StatusCode::FORBIDDEN);
    }
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

fn authenticate_request(headers: &HeaderMap, secret: &str) -> Result<CurrentUser, StatusCode> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_bearer_token)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let claims = verify_access_token(token, secret).map_err(|_| StatusCode::UNAUTHORIZED)?;
    current_user_from_claims(claims).ok_or(StatusCode::UNAUTHORIZED)
}

fn current_user_from_claims(claims: Claims) -> Option<CurrentUser> {
    let role = claims.role.parse::<UserRole>().ok()?;
    if claims.sub.trim().is_empty() {
        return None;
    }
    Some(CurrentUser {
        id: claims.sub,
        name: claims.name,
        role,
    })
}

fn parse_bearer_token(header: &str) -> Option<&str> {
    let (scheme, rest) = header.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") {
        let token = rest.trim();
        (!token.is_empty()).then_some(token)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        assert_eq!(parse_bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(parse_bearer_token("bearer  abc"), Some("abc"));
        assert_eq!(parse_bearer_token("Basic abc"), None);
        assert_eq!(parse_bearer_token("Bearer "), None);
        assert_eq!(parse_bearer_token("Bearer"), None);
    }

    #[test]
    fn claims_with_unknown_role_are_rejected() {
        let claims = Claims::new("u1".into(), "Ana".into(), "admin".into(), 1);
        assert!(current_user_from_claims(claims).is_none());

        let claims = Claims::new("u1".into(), "Ana".into(), "Student".into(), 1);
        let user = current_user_from_claims(claims).expect("user");
        assert_eq!(user.role, UserRole::Student);
        assert_eq!(user.id, "u1");
    }
}
