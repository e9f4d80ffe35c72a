use serde_json::json;

use crate::common::{TestApp, routes};

mod registration {
    use super::*;

    #[tokio::test]
    async fn register_creates_user_with_default_role() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::REGISTER,
                &json!({
                    "name": "Alice Wonder",
                    "email": "alice@example.com",
                    "password": "password123",
                }),
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["user"]["name"], "Alice Wonder");
        assert_eq!(res.body["user"]["email"], "alice@example.com");
        assert_eq!(res.body["user"]["role"], "user");
        assert!(res.body["token"].is_string());
        assert!(res.body["user"].get("password").is_none());
    }

    #[tokio::test]
    async fn email_is_normalized_to_lowercase() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::REGISTER,
                &json!({
                    "name": "Bob",
                    "email": "Bob@Example.COM",
                    "password": "password123",
                }),
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["user"]["email"], "bob@example.com");
    }

    #[tokio::test]
    async fn duplicate_email_is_conflict() {
        let app = TestApp::spawn().await;
        app.create_authenticated_user("dup@example.com", "password123")
            .await;

        let res = app
            .post_without_token(
                routes::REGISTER,
                &json!({
                    "name": "Other",
                    "email": "dup@example.com",
                    "password": "password456",
                }),
            )
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "EMAIL_TAKEN");
    }

    #[tokio::test]
    async fn invalid_email_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::REGISTER,
                &json!({
                    "name": "X",
                    "email": "not-an-email",
                    "password": "password123",
                }),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn short_password_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::REGISTER,
                &json!({
                    "name": "X",
                    "email": "short@example.com",
                    "password": "short",
                }),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

mod login {
    use super::*;

    #[tokio::test]
    async fn login_returns_token_with_permissions() {
        let app = TestApp::spawn().await;
        app.create_authenticated_user("carol@example.com", "password123")
            .await;

        let res = app
            .post_without_token(
                routes::LOGIN,
                &json!({
                    "email": "carol@example.com",
                    "password": "password123",
                }),
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert!(res.body["token"].is_string());
        assert_eq!(res.body["user"]["email"], "carol@example.com");
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let app = TestApp::spawn().await;
        app.create_authenticated_user("dave@example.com", "password123")
            .await;

        let res = app
            .post_without_token(
                routes::LOGIN,
                &json!({
                    "email": "dave@example.com",
                    "password": "wrong-password",
                }),
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn unknown_email_is_unauthorized() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::LOGIN,
                &json!({
                    "email": "ghost@example.com",
                    "password": "password123",
                }),
            )
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "INVALID_CREDENTIALS");
    }
}

mod me {
    use super::*;

    #[tokio::test]
    async fn me_returns_claims() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("erin@example.com", "password123")
            .await;

        let res = app.get_with_token(routes::ME, &token).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["email"], "erin@example.com");
        assert_eq!(res.body["role"], "user");
        let permissions: Vec<String> = res.body["permissions"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p.as_str().unwrap().to_string())
            .collect();
        assert!(permissions.contains(&"news:create".to_string()));
        assert!(!permissions.contains(&"user:manage".to_string()));
    }

    #[tokio::test]
    async fn me_without_token_is_unauthorized() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(routes::ME).await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");
    }

    #[tokio::test]
    async fn me_with_garbage_token_is_unauthorized() {
        let app = TestApp::spawn().await;

        let res = app.get_with_token(routes::ME, "garbage.token.here").await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_INVALID");
    }
}
