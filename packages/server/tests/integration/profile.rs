use reqwest::multipart::Form;
use serde_json::json;

use crate::common::{TestApp, jpeg_part, routes};

mod profile_update {
    use super::*;

    #[tokio::test]
    async fn get_profile_returns_own_account() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("p1@example.com", "password123")
            .await;

        let res = app.get_with_token(routes::PROFILE, &token).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["email"], "p1@example.com");
        assert!(res.body["bio"].is_null());
    }

    #[tokio::test]
    async fn patch_updates_name_and_bio() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("p2@example.com", "password123")
            .await;

        let res = app
            .patch_with_token(
                routes::PROFILE,
                &json!({"name": "Renamed", "bio": "Writes about tech."}),
                &token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["name"], "Renamed");
        assert_eq!(res.body["bio"], "Writes about tech.");
    }

    #[tokio::test]
    async fn bio_supports_three_state_patch() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("p3@example.com", "password123")
            .await;

        app.patch_with_token(routes::PROFILE, &json!({"bio": "set"}), &token)
            .await;

        // Omitted bio stays untouched.
        let res = app
            .patch_with_token(routes::PROFILE, &json!({"name": "Still Here"}), &token)
            .await;
        assert_eq!(res.body["bio"], "set");

        // Explicit null clears it.
        let res = app
            .patch_with_token(routes::PROFILE, &json!({"bio": null}), &token)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert!(res.body["bio"].is_null());
    }

    #[tokio::test]
    async fn password_change_takes_effect() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("p4@example.com", "password123")
            .await;

        let res = app
            .patch_with_token(routes::PROFILE, &json!({"password": "new-password-9"}), &token)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        let old = app
            .post_without_token(
                routes::LOGIN,
                &json!({"email": "p4@example.com", "password": "password123"}),
            )
            .await;
        assert_eq!(old.status, 401);

        let new = app
            .post_without_token(
                routes::LOGIN,
                &json!({"email": "p4@example.com", "password": "new-password-9"}),
            )
            .await;
        assert_eq!(new.status, 200, "{}", new.text);
    }

    #[tokio::test]
    async fn email_collision_is_conflict() {
        let app = TestApp::spawn().await;
        app.create_authenticated_user("taken@example.com", "password123")
            .await;
        let token = app
            .create_authenticated_user("p5@example.com", "password123")
            .await;

        let res = app
            .patch_with_token(routes::PROFILE, &json!({"email": "taken@example.com"}), &token)
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "EMAIL_TAKEN");
    }
}

mod avatar {
    use super::*;

    #[tokio::test]
    async fn upload_stores_avatar_and_serves_it() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("a1@example.com", "password123")
            .await;

        let form = Form::new().part("avatar", jpeg_part("me.jpg"));
        let res = app
            .post_multipart_with_token(routes::AVATAR, form, &token)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        let path = res.body["avatar"].as_str().unwrap().to_string();
        assert!(path.starts_with("avatars/"));
        assert_eq!(app.stored_files("avatars").len(), 1);

        let served = app.get_without_token(&routes::storage(&path)).await;
        assert_eq!(served.status, 200);

        let profile = app.get_with_token(routes::PROFILE, &token).await;
        assert_eq!(profile.body["avatar"], path.as_str());
    }

    #[tokio::test]
    async fn re_upload_replaces_previous_blob() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("a2@example.com", "password123")
            .await;

        let form = Form::new().part("avatar", jpeg_part("one.jpg"));
        let first = app
            .post_multipart_with_token(routes::AVATAR, form, &token)
            .await;
        let first_path = first.body["avatar"].as_str().unwrap().to_string();

        let form = Form::new().part("avatar", jpeg_part("two.jpg"));
        let second = app
            .post_multipart_with_token(routes::AVATAR, form, &token)
            .await;
        let second_path = second.body["avatar"].as_str().unwrap().to_string();

        assert_ne!(first_path, second_path);
        // Only the replacement remains on disk.
        assert_eq!(app.stored_files("avatars").len(), 1);
        let gone = app.get_without_token(&routes::storage(&first_path)).await;
        assert_eq!(gone.status, 404);
    }

    #[tokio::test]
    async fn delete_removes_avatar() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("a3@example.com", "password123")
            .await;

        let form = Form::new().part("avatar", jpeg_part("me.jpg"));
        app.post_multipart_with_token(routes::AVATAR, form, &token)
            .await;

        let res = app.delete_with_token(routes::AVATAR, &token).await;
        assert_eq!(res.status, 204, "{}", res.text);

        assert_eq!(app.stored_files("avatars").len(), 0);
        let profile = app.get_with_token(routes::PROFILE, &token).await;
        assert!(profile.body["avatar"].is_null());
    }

    #[tokio::test]
    async fn non_image_upload_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("a4@example.com", "password123")
            .await;

        let part = reqwest::multipart::Part::bytes(b"just text".to_vec())
            .file_name("avatar.txt")
            .mime_str("text/plain")
            .unwrap();
        let form = Form::new().part("avatar", part);
        let res = app
            .post_multipart_with_token(routes::AVATAR, form, &token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert_eq!(app.stored_files("avatars").len(), 0);
    }

    #[tokio::test]
    async fn mismatched_content_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("a5@example.com", "password123")
            .await;

        // PNG extension over JPEG bytes.
        let part = reqwest::multipart::Part::bytes(crate::common::JPEG_BYTES.to_vec())
            .file_name("fake.png")
            .mime_str("image/png")
            .unwrap();
        let form = Form::new().part("avatar", part);
        let res = app
            .post_multipart_with_token(routes::AVATAR, form, &token)
            .await;

        assert_eq!(res.status, 400);
    }
}
