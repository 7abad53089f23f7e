//! Catalogue, reviews and moderation through the assembled app.

// Not every suite uses every helper.
#[allow(dead_code)]
mod support;

use actix_web::http::StatusCode;
use actix_web::test::TestRequest;
use rstest::{fixture, rstest};
use serde_json::{Value, json};

use critique::domain::{Role, User};
use support::Api;

struct Catalogue {
    api: Api,
    admin: User,
    title_uri: String,
}

impl Catalogue {
    async fn review(&self, author: &User, score: i64) -> Value {
        let reply = self
            .api
            .send_as(
                author,
                TestRequest::post()
                    .uri(&format!("{}/reviews", self.title_uri))
                    .set_json(json!({"text": "Worth a watch", "score": score})),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED);
        reply.body
    }

    async fn title(&self) -> Value {
        let reply = self.api.send(TestRequest::get().uri(&self.title_uri)).await;
        assert_eq!(reply.status, StatusCode::OK);
        reply.body
    }
}

#[fixture]
async fn catalogue() -> Catalogue {
    let api = Api::new();
    let admin = api.user("root", Role::Admin);
    for (kind, name, slug) in [("categories", "Film", "film"), ("genres", "Crime", "crime")] {
        let reply = api
            .send_as(
                &admin,
                TestRequest::post()
                    .uri(&format!("/api/v1/{kind}"))
                    .set_json(json!({"name": name, "slug": slug})),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED);
    }
    let reply = api
        .send_as(
            &admin,
            TestRequest::post().uri("/api/v1/titles").set_json(json!({
                "name": "Heat",
                "year": 1995,
                "description": "Cops and robbers in Los Angeles",
                "category": "film",
                "genre": ["crime"]
            })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CREATED);
    let title_uri = format!("/api/v1/titles/{}", reply.body["id"]);
    Catalogue {
        api,
        admin,
        title_uri,
    }
}

#[rstest]
#[actix_web::test]
async fn rating_is_the_mean_of_review_scores(#[future] catalogue: Catalogue) {
    let catalogue = catalogue.await;
    assert!(catalogue.title().await["rating"].is_null());

    let ada = catalogue.api.user("ada", Role::User);
    let grace = catalogue.api.user("grace", Role::User);
    catalogue.review(&ada, 7).await;
    catalogue.review(&grace, 9).await;

    let title = catalogue.title().await;
    assert_eq!(title["rating"].as_f64(), Some(8.0));
    assert_eq!(title["category"]["slug"], "film");
    assert_eq!(title["genre"][0]["slug"], "crime");
}

#[rstest]
#[actix_web::test]
async fn moderators_remove_reviews_and_the_rating_follows(#[future] catalogue: Catalogue) {
    let catalogue = catalogue.await;
    let ada = catalogue.api.user("ada", Role::User);
    let mod_user = catalogue.api.user("warden", Role::Moderator);
    let review = catalogue.review(&ada, 3).await;

    let reply = catalogue
        .api
        .send_as(
            &mod_user,
            TestRequest::delete().uri(&format!("{}/reviews/{}", catalogue.title_uri, review["id"])),
        )
        .await;

    assert_eq!(reply.status, StatusCode::NO_CONTENT);
    assert!(catalogue.title().await["rating"].is_null());
}

#[rstest]
#[actix_web::test]
async fn admins_delete_any_comment(#[future] catalogue: Catalogue) {
    let catalogue = catalogue.await;
    let ada = catalogue.api.user("ada", Role::User);
    let review = catalogue.review(&ada, 6).await;
    let comments_uri = format!("{}/reviews/{}/comments", catalogue.title_uri, review["id"]);
    let comment = catalogue
        .api
        .send_as(
            &ada,
            TestRequest::post()
                .uri(&comments_uri)
                .set_json(json!({"text": "On reflection, a bit long"})),
        )
        .await;
    assert_eq!(comment.status, StatusCode::CREATED);
    assert_eq!(comment.body["author"], "ada");

    let reply = catalogue
        .api
        .send_as(
            &catalogue.admin,
            TestRequest::delete().uri(&format!("{comments_uri}/{}", comment.body["id"])),
        )
        .await;

    assert_eq!(reply.status, StatusCode::NO_CONTENT);
    assert_eq!(catalogue.api.harness.store.comment_count(), 0);
}

#[rstest]
#[actix_web::test]
async fn deleting_a_category_keeps_its_titles(#[future] catalogue: Catalogue) {
    let catalogue = catalogue.await;

    let reply = catalogue
        .api
        .send_as(
            &catalogue.admin,
            TestRequest::delete().uri("/api/v1/categories/film"),
        )
        .await;

    assert_eq!(reply.status, StatusCode::NO_CONTENT);
    let title = catalogue.title().await;
    assert_eq!(title["name"], "Heat");
    assert!(title["category"].is_null());
}

#[rstest]
#[actix_web::test]
async fn titles_filter_by_category_and_year(#[future] catalogue: Catalogue) {
    let catalogue = catalogue.await;

    let hit = catalogue
        .api
        .send(TestRequest::get().uri("/api/v1/titles?category=film&year=1995"))
        .await;
    let miss = catalogue
        .api
        .send(TestRequest::get().uri("/api/v1/titles?year=1996"))
        .await;

    assert_eq!(hit.status, StatusCode::OK);
    assert_eq!(hit.body["count"], 1);
    assert_eq!(miss.body["count"], 0);
}

#[rstest]
#[actix_web::test]
async fn readers_page_through_reviews(#[future] catalogue: Catalogue) {
    let catalogue = catalogue.await;
    for name in ["ada", "grace", "edsger"] {
        let user = catalogue.api.user(name, Role::User);
        catalogue.review(&user, 5).await;
    }

    let reply = catalogue
        .api
        .send(
            TestRequest::get()
                .uri(&format!("{}/reviews?limit=2", catalogue.title_uri))
                .insert_header(("host", "api.example.com")),
        )
        .await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["count"], 3);
    assert_eq!(reply.body["results"].as_array().map(Vec::len), Some(2));
    assert!(reply.body["previous"].is_null());
    let next = reply.body["next"].as_str().expect("next link");
    assert!(next.contains("offset=2"), "unexpected next link {next}");
}

#[rstest]
#[case("/api/v1/categories?offset=18446744073709551615")]
#[case("/api/v1/titles?limit=100&offset=9223372036854775808")]
#[actix_web::test]
async fn unaddressable_offsets_are_rejected(#[case] uri: &str) {
    let api = Api::new();

    let reply = api.send(TestRequest::get().uri(uri)).await;

    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["details"]["field"], "offset");
    assert_eq!(reply.body["details"]["code"], "out_of_range");
}

#[rstest]
#[actix_web::test]
async fn the_last_addressable_offset_is_an_empty_page() {
    let api = Api::new();

    let reply = api
        .send(TestRequest::get().uri("/api/v1/genres?limit=100&offset=9223372036854775807"))
        .await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["count"], 0);
    assert!(reply.body["next"].is_null());
    assert!(reply.body["previous"].as_str().is_some());
}
