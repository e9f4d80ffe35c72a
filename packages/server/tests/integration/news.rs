use reqwest::multipart::Form;
use serde_json::json;

use crate::common::{TestApp, jpeg_part, routes};

mod creation {
    use super::*;

    #[tokio::test]
    async fn create_published_news_sets_published_at() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("n1@example.com", "password123")
            .await;

        let form = Form::new()
            .text("title", "Breaking story")
            .text("short_description", "Something happened.")
            .text("is_published", "true");
        let res = app.post_multipart_with_token(routes::NEWS, form, &token).await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["title"], "Breaking story");
        assert_eq!(res.body["is_published"], true);
        assert!(res.body["published_at"].is_string());
        assert_eq!(res.body["user"]["email"], "n1@example.com");
        assert_eq!(res.body["content_blocks"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn create_draft_leaves_published_at_null() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("n2@example.com", "password123")
            .await;

        let form = Form::new()
            .text("title", "Draft")
            .text("short_description", "Not yet.")
            .text("is_published", "false");
        let res = app.post_multipart_with_token(routes::NEWS, form, &token).await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["is_published"], false);
        assert!(res.body["published_at"].is_null());
    }

    #[tokio::test]
    async fn create_with_main_image_stores_blob() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("n3@example.com", "password123")
            .await;

        let form = Form::new()
            .text("title", "Illustrated")
            .text("short_description", "With a cover.")
            .text("is_published", "true")
            .part("image", jpeg_part("cover.jpg"));
        let res = app.post_multipart_with_token(routes::NEWS, form, &token).await;

        assert_eq!(res.status, 201, "{}", res.text);
        let image = res.body["image"].as_str().unwrap();
        assert!(image.starts_with("news/"));
        assert_eq!(app.stored_files("news").len(), 1);

        let served = app.get_without_token(&routes::storage(image)).await;
        assert_eq!(served.status, 200);
    }

    #[tokio::test]
    async fn create_with_blocks_returns_them_in_order() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("n4@example.com", "password123")
            .await;

        let form = Form::new()
            .text("title", "Structured")
            .text("short_description", "Blocks inside.")
            .text("is_published", "true")
            .text("content_blocks[0][type]", "text")
            .text("content_blocks[0][order]", "2")
            .text("content_blocks[0][text_content]", "Second paragraph")
            .text("content_blocks[1][type]", "image")
            .text("content_blocks[1][order]", "1")
            .part("content_blocks[1][image]", jpeg_part("lead.jpg"));
        let res = app.post_multipart_with_token(routes::NEWS, form, &token).await;

        assert_eq!(res.status, 201, "{}", res.text);
        let blocks = res.body["content_blocks"].as_array().unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0]["type"], "image");
        assert_eq!(blocks[0]["order"], 1);
        assert_eq!(blocks[1]["type"], "text");
        assert_eq!(blocks[1]["order"], 2);
        assert_eq!(blocks[1]["text_content"], "Second paragraph");
    }

    #[tokio::test]
    async fn missing_title_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("n5@example.com", "password123")
            .await;

        let form = Form::new()
            .text("short_description", "No title.")
            .text("is_published", "true");
        let res = app.post_multipart_with_token(routes::NEWS, form, &token).await;

        assert_eq!(res.status, 400);
        assert!(res.body["message"].as_str().unwrap().contains("title"));
    }

    #[tokio::test]
    async fn text_block_without_content_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("n6@example.com", "password123")
            .await;

        let form = Form::new()
            .text("title", "Bad blocks")
            .text("short_description", "desc")
            .text("is_published", "true")
            .text("content_blocks[0][type]", "text");
        let res = app.post_multipart_with_token(routes::NEWS, form, &token).await;

        assert_eq!(res.status, 400);
        assert!(
            res.body["message"]
                .as_str()
                .unwrap()
                .contains("content_blocks.0.text_content")
        );
    }

    #[tokio::test]
    async fn without_token_is_unauthorized() {
        let app = TestApp::spawn().await;

        let res = app
            .client
            .post(format!("http://{}{}", app.addr, routes::NEWS))
            .multipart(Form::new().text("title", "x"))
            .send()
            .await
            .unwrap();

        assert_eq!(res.status().as_u16(), 401);
    }
}

mod listing {
    use super::*;

    #[tokio::test]
    async fn lists_only_own_news() {
        let app = TestApp::spawn().await;
        let mine = app
            .create_authenticated_user("own1@example.com", "password123")
            .await;
        let theirs = app
            .create_authenticated_user("own2@example.com", "password123")
            .await;

        app.create_news(&mine, "Mine A").await;
        app.create_news(&mine, "Mine B").await;
        app.create_news(&theirs, "Theirs").await;

        let res = app.get_with_token(routes::NEWS, &mine).await;

        assert_eq!(res.status, 200, "{}", res.text);
        let data = res.body["data"].as_array().unwrap();
        assert_eq!(data.len(), 2);
        assert!(data.iter().all(|n| n["user"]["email"] == "own1@example.com"));
        assert_eq!(res.body["pagination"]["total"], 2);
    }

    #[tokio::test]
    async fn search_matches_title_and_description() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("s1@example.com", "password123")
            .await;

        app.create_news(&token, "Rust ships a release").await;
        app.create_news(&token, "Unrelated").await;

        let res = app
            .get_with_token(&format!("{}?search=rust", routes::NEWS), &token)
            .await;

        let data = res.body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["title"], "Rust ships a release");
    }

    #[tokio::test]
    async fn is_published_filter_works() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("s2@example.com", "password123")
            .await;

        app.create_news(&token, "Published").await;
        let form = Form::new()
            .text("title", "Draft")
            .text("short_description", "d")
            .text("is_published", "false");
        app.post_multipart_with_token(routes::NEWS, form, &token)
            .await;

        let res = app
            .get_with_token(&format!("{}?is_published=false", routes::NEWS), &token)
            .await;
        let data = res.body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["title"], "Draft");
    }

    #[tokio::test]
    async fn invalid_sort_field_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("s3@example.com", "password123")
            .await;

        let res = app
            .get_with_token(&format!("{}?sort_by=password", routes::NEWS), &token)
            .await;

        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn sort_by_title_asc_works() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("s4@example.com", "password123")
            .await;

        app.create_news(&token, "Bravo").await;
        app.create_news(&token, "Alpha").await;

        let res = app
            .get_with_token(
                &format!("{}?sort_by=title&sort_order=asc", routes::NEWS),
                &token,
            )
            .await;
        let data = res.body["data"].as_array().unwrap();
        assert_eq!(data[0]["title"], "Alpha");
        assert_eq!(data[1]["title"], "Bravo");
    }
}

mod retrieval {
    use super::*;

    #[tokio::test]
    async fn get_own_news_works() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("r1@example.com", "password123")
            .await;
        let id = app.create_news(&token, "Readable").await;

        let res = app.get_with_token(&routes::news(id), &token).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["title"], "Readable");
    }

    #[tokio::test]
    async fn someone_elses_news_is_not_found() {
        let app = TestApp::spawn().await;
        let owner = app
            .create_authenticated_user("r2@example.com", "password123")
            .await;
        let other = app
            .create_authenticated_user("r3@example.com", "password123")
            .await;
        let id = app.create_news(&owner, "Private draft").await;

        let res = app.get_with_token(&routes::news(id), &other).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }
}

mod update {
    use super::*;

    #[tokio::test]
    async fn updates_partial_fields() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("u1@example.com", "password123")
            .await;
        let id = app.create_news(&token, "Old title").await;

        let form = Form::new().text("title", "New title");
        let res = app
            .post_multipart_with_token(&routes::news(id), form, &token)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["title"], "New title");
        assert_eq!(res.body["short_description"], "A short description.");
    }

    #[tokio::test]
    async fn new_main_image_replaces_and_deletes_old() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("u2@example.com", "password123")
            .await;

        let form = Form::new()
            .text("title", "Covered")
            .text("short_description", "d")
            .text("is_published", "true")
            .part("image", jpeg_part("old.jpg"));
        let created = app.post_multipart_with_token(routes::NEWS, form, &token).await;
        let id = created.id();
        let old_path = created.body["image"].as_str().unwrap().to_string();

        let form = Form::new().part("image", jpeg_part("new.jpg"));
        let res = app
            .post_multipart_with_token(&routes::news(id), form, &token)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        let new_path = res.body["image"].as_str().unwrap().to_string();
        assert_ne!(old_path, new_path);
        assert_eq!(app.stored_files("news").len(), 1);
    }
}

mod toggle {
    use super::*;

    #[tokio::test]
    async fn toggle_flips_status_and_sets_published_at_once() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("t1@example.com", "password123")
            .await;

        let form = Form::new()
            .text("title", "Toggled")
            .text("short_description", "d")
            .text("is_published", "false");
        let created = app.post_multipart_with_token(routes::NEWS, form, &token).await;
        let id = created.id();
        assert!(created.body["published_at"].is_null());

        // First publish stamps the timestamp.
        let published = app
            .patch_with_token(&routes::news_toggle(id), &json!({}), &token)
            .await;
        assert_eq!(published.status, 200, "{}", published.text);
        assert_eq!(published.body["is_published"], true);
        let first_stamp = published.body["published_at"].as_str().unwrap().to_string();

        // Unpublish keeps it; republish must not refresh it.
        let unpublished = app
            .patch_with_token(&routes::news_toggle(id), &json!({}), &token)
            .await;
        assert_eq!(unpublished.body["is_published"], false);
        assert_eq!(
            unpublished.body["published_at"].as_str().unwrap(),
            first_stamp
        );

        let republished = app
            .patch_with_token(&routes::news_toggle(id), &json!({}), &token)
            .await;
        assert_eq!(republished.body["is_published"], true);
        assert_eq!(
            republished.body["published_at"].as_str().unwrap(),
            first_stamp
        );
    }
}

mod deletion {
    use super::*;

    #[tokio::test]
    async fn delete_removes_rows_and_blobs() {
        let app = TestApp::spawn().await;
        let token = app
            .create_authenticated_user("d1@example.com", "password123")
            .await;

        let form = Form::new()
            .text("title", "Doomed")
            .text("short_description", "d")
            .text("is_published", "true")
            .part("image", jpeg_part("cover.jpg"))
            .text("content_blocks[0][type]", "image")
            .text("content_blocks[0][order]", "1")
            .part("content_blocks[0][image]", jpeg_part("block.jpg"));
        let created = app.post_multipart_with_token(routes::NEWS, form, &token).await;
        assert_eq!(created.status, 201, "{}", created.text);
        let id = created.id();
        assert_eq!(app.stored_files("news").len(), 1);
        assert_eq!(app.stored_files("content_blocks").len(), 1);

        let res = app.delete_with_token(&routes::news(id), &token).await;
        assert_eq!(res.status, 204, "{}", res.text);

        assert_eq!(app.stored_files("news").len(), 0);
        assert_eq!(app.stored_files("content_blocks").len(), 0);

        let gone = app.get_with_token(&routes::news(id), &token).await;
        assert_eq!(gone.status, 404);
    }
}
