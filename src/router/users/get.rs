//! Get the authenticated user.

use axum::Json;

use crate::middleware::AuthenticatedUser;
use crate::router::Success;
use crate::user::Identity;

pub async fn handler(
    AuthenticatedUser(identity): AuthenticatedUser,
) -> Json<Success<Identity>> {
    Success::json(identity)
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use http_body_util::BodyExt;

    use crate::router::login::tests::login;
    use crate::tests::{NOW, state_at};
    use crate::*;

    #[tokio::test]
    async fn test_get_user_handler() {
        let state = state_at(NOW).await;
        let (status, body) =
            login(app(state.clone()), "test@example.com", "password123").await;
        assert_eq!(status, StatusCode::OK);

        let token = body["data"]["access_token"].as_str().unwrap();
        let response = make_request(
            app(state),
            Method::GET,
            "/users/@me",
            Some(&format!("Bearer {token}")),
            String::default(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["name"], "Test User");
        assert_eq!(body["data"]["email"], "test@example.com");
        assert!(body["data"]["created_at"].is_string());
    }
}
