//! End-to-end routing tests: descriptors, conventions, static fallback.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;
use tower_http::compression::CompressionLayer;
use waypost::render::HandlebarsRenderer;
use waypost::{App, Mode, PathSpec, RouteDescriptor, RouteOptions, RouteTags, ServerOptions};

mod common;

use common::TestSite;

fn conf_options(site: &TestSite, is_prod: bool) -> ServerOptions {
    ServerOptions {
        is_prod: Some(is_prod),
        routes: RouteOptions {
            conf: Some(site.root().join("routes.toml")),
            ..Default::default()
        },
        render: None,
    }
}

fn rendered_options(site: &TestSite, is_prod: bool) -> ServerOptions {
    let mode = if is_prod {
        Mode::Production
    } else {
        Mode::Development
    };
    let renderer = HandlebarsRenderer::new(site.root().join("public"), mode);
    ServerOptions {
        render: Some(Arc::new(renderer)),
        ..conf_options(site, is_prod)
    }
}

#[tokio::test]
async fn test_descriptor_route_renders_template() {
    let site = TestSite::new();
    site.write(
        "routes.toml",
        r#"
        [[routes]]
        method = "get"
        path = "/hello"
        name = "hello"
        tags = { template = "hello.hbs" }
        "#,
    );
    site.write(
        "hello.rhai",
        r#"
        fn handler(req) {
            this.log("saying hello");
            #{ name: "world" }
        }
        "#,
    );
    site.write("public/hello.hbs", "Hello {{name}}");

    let app = App::build(rendered_options(&site, true)).unwrap();
    let addr = common::spawn(app).await;
    let client = common::client();

    let res = client
        .get(format!("http://{addr}/hello"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert!(res.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/html"));
    assert_eq!(res.text().await.unwrap(), "Hello world");
}

#[tokio::test]
async fn test_dump_bypasses_the_template() {
    let site = TestSite::new();
    site.write(
        "routes.toml",
        r#"
        [[routes]]
        method = "get"
        path = "/hello"
        name = "hello"
        tags = { template = "hello.hbs" }
        "#,
    );
    site.write("hello.rhai", r#"fn handler(req) { #{ name: "world" } }"#);
    site.write("public/hello.hbs", "Hello {{name}}");

    let app = App::build(rendered_options(&site, true)).unwrap();
    let addr = common::spawn(app).await;
    let client = common::client();

    let res = client
        .get(format!("http://{addr}/hello?dump=true"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["content-type"], "application/json");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "name": "world" }));

    // Anything other than the literal "true" still renders.
    let res = client
        .get(format!("http://{addr}/hello?dump=yes"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.text().await.unwrap(), "Hello world");
}

#[tokio::test]
async fn test_convention_route_serves_raw_string() {
    let site = TestSite::new();
    site.write(
        "status.rhai",
        r#"
        const GET = "/status";
        fn handler(req) { "OK" }
        "#,
    );

    let app = App::build(ServerOptions {
        is_prod: Some(true),
        routes: RouteOptions {
            include: Some(site.root().to_path_buf()),
            ..Default::default()
        },
        render: None,
    })
    .unwrap();
    let addr = common::spawn(app).await;
    let client = common::client();

    let res = client
        .get(format!("http://{addr}/status"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert!(res.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    assert_eq!(res.text().await.unwrap(), "OK");

    // Bound as GET only.
    let res = client
        .post(format!("http://{addr}/status"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_descriptor_claim_beats_script_constants() {
    let site = TestSite::new();
    site.write(
        "routes.toml",
        r#"
        [[routes]]
        method = "get"
        path = "/by-descriptor"
        name = "dual"
        "#,
    );
    site.write(
        "dual.rhai",
        r#"
        const GET = "/by-convention";
        fn handler(req) { "claimed" }
        "#,
    );

    let app = App::build(conf_options(&site, true)).unwrap();
    let addr = common::spawn(app).await;
    let client = common::client();

    let res = client
        .get(format!("http://{addr}/by-descriptor"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "claimed");

    let res = client
        .get(format!("http://{addr}/by-convention"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_handler_skips_route_but_not_the_server() {
    let site = TestSite::new();
    site.write(
        "routes.toml",
        r#"
        [[routes]]
        method = "get"
        path = "/ghost"
        name = "ghost"

        [[routes]]
        method = "get"
        path = "/real"
        name = "real"
        "#,
    );
    site.write("real.rhai", r#"fn handler(req) { "here" }"#);

    let app = App::build(conf_options(&site, true)).unwrap();
    assert_eq!(app.route_count(), 1);
    let addr = common::spawn(app).await;
    let client = common::client();

    let res = client
        .get(format!("http://{addr}/real"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.text().await.unwrap(), "here");

    let res = client
        .get(format!("http://{addr}/ghost"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_static_fallback_serves_assets() {
    let site = TestSite::new();
    site.write("real.rhai", r#"fn handler(req) { "here" }"#);
    site.write("public/site.css", "body { color: teal }");

    let app = App::build(ServerOptions {
        is_prod: Some(true),
        routes: RouteOptions {
            include: Some(site.root().to_path_buf()),
            ..Default::default()
        },
        render: None,
    })
    .unwrap();
    let addr = common::spawn(app).await;
    let client = common::client();

    let res = client
        .get(format!("http://{addr}/site.css"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "body { color: teal }");

    let res = client
        .get(format!("http://{addr}/nothing-here"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_all_method_route_matches_any_method() {
    let site = TestSite::new();
    site.write(
        "echo.rhai",
        r#"
        const ALL = "/echo";
        fn handler(req) { req.method }
        "#,
    );

    let app = App::build(ServerOptions {
        is_prod: Some(true),
        routes: RouteOptions {
            include: Some(site.root().to_path_buf()),
            ..Default::default()
        },
        render: None,
    })
    .unwrap();
    let addr = common::spawn(app).await;
    let client = common::client();

    let res = client
        .get(format!("http://{addr}/echo"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.text().await.unwrap(), "GET");

    let res = client
        .delete(format!("http://{addr}/echo"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.text().await.unwrap(), "DELETE");
}

#[tokio::test]
async fn test_path_params_reach_the_script() {
    let site = TestSite::new();
    site.write(
        "users.rhai",
        r#"
        const GET = "/users/{id}";
        fn handler(req) { "user " + req.params.id }
        "#,
    );

    let app = App::build(ServerOptions {
        is_prod: Some(true),
        routes: RouteOptions {
            include: Some(site.root().to_path_buf()),
            ..Default::default()
        },
        render: None,
    })
    .unwrap();
    let addr = common::spawn(app).await;
    let client = common::client();

    let res = client
        .get(format!("http://{addr}/users/42"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.text().await.unwrap(), "user 42");
}

#[tokio::test]
async fn test_post_body_reaches_the_script() {
    let site = TestSite::new();
    site.write(
        "routes.toml",
        r#"
        [[routes]]
        method = "post"
        path = "/submit"
        name = "submit"
        "#,
    );
    site.write("submit.rhai", r#"fn handler(req) { #{ got: req.body } }"#);

    let app = App::build(conf_options(&site, true)).unwrap();
    let addr = common::spawn(app).await;
    let client = common::client();

    let res = client
        .post(format!("http://{addr}/submit"))
        .body("hello there")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "got": "hello there" }));
}

#[tokio::test]
async fn test_nested_scripts_bind_through_full_names() {
    let site = TestSite::new();
    site.write(
        "routes.toml",
        r#"
        [[routes]]
        method = "get"
        path = "/deep"
        name = "api_deep"
        "#,
    );
    site.write("api/deep.rhai", r#"fn handler(req) { "nested" }"#);

    let app = App::build(conf_options(&site, true)).unwrap();
    let addr = common::spawn(app).await;
    let client = common::client();

    let res = client
        .get(format!("http://{addr}/deep"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.text().await.unwrap(), "nested");
}

#[tokio::test]
async fn test_pre_parsed_routes_bind_without_a_conf_file() {
    let site = TestSite::new();
    site.write("inline.rhai", r#"fn handler(req) { "inline" }"#);

    let app = App::build(ServerOptions {
        is_prod: Some(true),
        routes: RouteOptions {
            routes: Some(vec![RouteDescriptor {
                method: Some("get".to_string()),
                path: PathSpec::Plain("/inline".to_string()),
                name: "inline".to_string(),
                tags: RouteTags::default(),
            }]),
            include: Some(site.root().to_path_buf()),
            ..Default::default()
        },
        render: None,
    })
    .unwrap();
    let addr = common::spawn(app).await;
    let client = common::client();

    let res = client
        .get(format!("http://{addr}/inline"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.text().await.unwrap(), "inline");
}

#[tokio::test]
async fn test_into_router_embeds_without_a_listener() {
    let site = TestSite::new();
    site.write(
        "ping.rhai",
        r#"
        const GET = "/ping";
        fn handler(req) { "pong" }
        "#,
    );

    let app = App::build(ServerOptions {
        is_prod: Some(true),
        routes: RouteOptions {
            include: Some(site.root().to_path_buf()),
            ..Default::default()
        },
        render: None,
    })
    .unwrap();

    let router = app.into_router();
    let response = router
        .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"pong");
}

#[tokio::test]
async fn test_layered_middleware_wraps_routes_and_fallback() {
    let site = TestSite::new();
    site.write(
        "big.rhai",
        r#"
        const GET = "/big";
        fn handler(req) {
            let line = "";
            for _i in 0..20 {
                line += "waypost waypost ";
            }
            line
        }
        "#,
    );
    site.write("public/big.css", &"body { color: teal }\n".repeat(10));

    let app = App::build(ServerOptions {
        is_prod: Some(true),
        routes: RouteOptions {
            include: Some(site.root().to_path_buf()),
            ..Default::default()
        },
        render: None,
    })
    .unwrap()
    .layer(CompressionLayer::new());
    let addr = common::spawn(app).await;
    let client = common::client();

    let res = client
        .get(format!("http://{addr}/big"))
        .header("accept-encoding", "gzip")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["content-encoding"], "gzip");

    let res = client
        .get(format!("http://{addr}/big.css"))
        .header("accept-encoding", "gzip")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["content-encoding"], "gzip");
}

#[tokio::test]
async fn test_handlers_facade_reports_claims() {
    let site = TestSite::new();
    site.write(
        "routes.toml",
        r#"
        [[routes]]
        method = "get"
        path = "/claimed"
        name = "claimed"
        "#,
    );
    site.write("claimed.rhai", r#"fn handler(req) { "c" }"#);
    site.write("helper.rhai", r#"fn handler(req) { "never routed" }"#);

    let app = App::build(conf_options(&site, true)).unwrap();

    let handlers = app.handlers();
    assert_eq!(handlers.len(), 2);

    let claimed = handlers.get(handlers.lookup("claimed").unwrap()).unwrap();
    assert!(claimed.handled);

    let orphans: Vec<_> = handlers.orphans().map(|r| r.short_name.clone()).collect();
    assert_eq!(orphans, vec!["helper"]);
}

#[tokio::test]
async fn test_invalid_route_list_fails_the_build() {
    let site = TestSite::new();
    site.write(
        "routes.toml",
        r#"
        [[routes]]
        method = "teleport"
        path = "no-slash"
        name = "bad"
        "#,
    );

    let err = App::build(conf_options(&site, true)).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("unknown method"), "got: {message}");
    assert!(message.contains("must start with '/'"), "got: {message}");
}
