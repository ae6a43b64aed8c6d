//! Authentication middleware that checks the bearer token on protected routes.

use axum::{
    RequestPartsExt,
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};

use crate::{AuthConfig, Error, auth::decode_token};

/// Middleware function that checks for a valid `Authorization: Bearer` header.
///
/// The user ID is placed into the request extensions and the request executed
/// normally if the token is valid, otherwise a 401 JSON error is returned.
///
/// **Note**: Route handlers can use the function argument `Extension(user_id): Extension<UserId>` to receive the user ID.
pub async fn auth_guard(State(config): State<AuthConfig>, request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();

    let user_id = match parts.extract::<TypedHeader<Authorization<Bearer>>>().await {
        Ok(TypedHeader(Authorization(bearer))) => decode_token(bearer.token(), &config),
        Err(rejection) => {
            tracing::debug!("missing authorization header: {rejection}");
            Err(Error::InvalidToken)
        }
    };

    match user_id {
        Ok(user_id) => {
            parts.extensions.insert(user_id);
            next.run(Request::from_parts(parts, body)).await
        }
        Err(error) => error.into_response(),
    }
}
