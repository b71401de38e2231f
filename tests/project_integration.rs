mod helpers;

use axum::http::StatusCode;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use helpers::unique_email;

async fn create_project(app: &axum::Router, admin: &str, body: Value) -> Uuid {
    let (status, body) = helpers::post_json(app, admin, "/api/projects", body).await;
    assert_eq!(status, StatusCode::CREATED, "create project failed: {body}");
    Uuid::parse_str(body["id"].as_str().unwrap()).unwrap()
}

fn ids(body: &Value) -> Vec<String> {
    let mut ids: Vec<String> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap().to_owned())
        .collect();
    ids.sort();
    ids
}

#[sqlx::test(migrations = "./migrations")]
async fn mine_matches_every_membership_field(pool: PgPool) {
    let state = helpers::test_state(pool).await;
    let app = helpers::test_router(state.clone());
    let admin = helpers::admin_login(&app, &state).await;
    let (user, token) = helpers::register(&app, "Member", &unique_email("member")).await;
    let (other, _) = helpers::register(&app, "Other", &unique_email("other")).await;

    let managed = create_project(
        &app,
        &admin,
        serde_json::json!({ "name": "Managed", "project_manager": user }),
    )
    .await;
    let outreach = create_project(
        &app,
        &admin,
        serde_json::json!({ "name": "Outreach", "outreach": [other, user] }),
    )
    .await;
    let designers = create_project(
        &app,
        &admin,
        serde_json::json!({ "name": "Design", "designers": [user] }),
    )
    .await;
    let developers = create_project(
        &app,
        &admin,
        serde_json::json!({ "name": "Dev", "developers": [user], "project_manager": other }),
    )
    .await;
    create_project(
        &app,
        &admin,
        serde_json::json!({ "name": "Elsewhere", "project_manager": other, "developers": [other] }),
    )
    .await;

    let (status, body) = helpers::get_json(&app, &token, "/api/projects/mine").await;
    assert_eq!(status, StatusCode::OK);
    let mut expected: Vec<String> = [managed, outreach, designers, developers]
        .iter()
        .map(ToString::to_string)
        .collect();
    expected.sort();
    assert_eq!(ids(&body), expected);

    let (status, body) = helpers::get_json(&app, &token, "/api/projects").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 5);
}

#[sqlx::test(migrations = "./migrations")]
async fn user_without_projects_gets_empty_list(pool: PgPool) {
    let state = helpers::test_state(pool).await;
    let app = helpers::test_router(state.clone());
    let admin = helpers::admin_login(&app, &state).await;
    let (_, token) = helpers::register(&app, "Loner", &unique_email("loner")).await;
    create_project(&app, &admin, serde_json::json!({ "name": "Busy" })).await;

    let (status, body) = helpers::get_json(&app, &token, "/api/projects/mine").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!([]));
}

#[sqlx::test(migrations = "./migrations")]
async fn edit_and_delete_project(pool: PgPool) {
    let state = helpers::test_state(pool).await;
    let app = helpers::test_router(state.clone());
    let admin = helpers::admin_login(&app, &state).await;
    let (user, _) = helpers::register(&app, "Dev", &unique_email("dev")).await;
    let id = create_project(
        &app,
        &admin,
        serde_json::json!({ "name": "Site", "description": "Club website" }),
    )
    .await;

    let (status, body) = helpers::put_json(
        &app,
        &admin,
        &format!("/api/projects/{id}"),
        serde_json::json!({ "developers": [user] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["name"], "Site");
    assert_eq!(body["description"], "Club website");
    assert_eq!(body["developers"], serde_json::json!([user]));

    let (status, _) = helpers::delete_json(&app, &admin, &format!("/api/projects/{id}")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = helpers::delete_json(&app, &admin, &format!("/api/projects/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = helpers::put_json(
        &app,
        &admin,
        &format!("/api/projects/{id}"),
        serde_json::json!({ "name": "Gone" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "./migrations")]
async fn edit_can_clear_manager_and_description(pool: PgPool) {
    let state = helpers::test_state(pool).await;
    let app = helpers::test_router(state.clone());
    let admin = helpers::admin_login(&app, &state).await;
    let (manager, manager_token) = helpers::register(&app, "Lead", &unique_email("lead")).await;
    let id = create_project(
        &app,
        &admin,
        serde_json::json!({ "name": "Site", "description": "Club website", "project_manager": manager }),
    )
    .await;

    // Omitted fields stay put
    let (status, body) = helpers::put_json(
        &app,
        &admin,
        &format!("/api/projects/{id}"),
        serde_json::json!({ "name": "Website" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["description"], "Club website");
    assert_eq!(body["project_manager"], serde_json::json!(manager));

    let (status, body) = helpers::put_json(
        &app,
        &admin,
        &format!("/api/projects/{id}"),
        serde_json::json!({ "description": null, "project_manager": null }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["name"], "Website");
    assert!(body["description"].is_null());
    assert!(body["project_manager"].is_null());

    let (status, body) = helpers::get_json(&app, &manager_token, "/api/projects/mine").await;
    assert_eq!(status, StatusCode::OK);
    assert!(ids(&body).is_empty());
}

#[sqlx::test(migrations = "./migrations")]
async fn project_mutations_require_admin(pool: PgPool) {
    let state = helpers::test_state(pool).await;
    let app = helpers::test_router(state.clone());
    let admin = helpers::admin_login(&app, &state).await;
    let (_, reviewer) = helpers::reviewer(&app, &admin, true, true).await;

    let (status, _) = helpers::post_json(
        &app,
        &reviewer,
        "/api/projects",
        serde_json::json!({ "name": "Nope" }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = helpers::get_json(&app, "", "/api/projects").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
