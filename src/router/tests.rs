use super::core::PatternRouter;
use super::{RouteTarget, Router};

#[test]
fn test_root_path() {
    let (re, params) = PatternRouter::path_to_regex("/").unwrap();
    assert!(re.is_match("/"));
    assert!(params.is_empty());
}

#[test]
fn test_parameterized_path() {
    let (re, params) = PatternRouter::path_to_regex("/items/{id}").unwrap();
    assert!(re.is_match("/items/123"));
    assert!(!re.is_match("/items/123/extra"));
    assert_eq!(params, vec!["id"]);
}

#[test]
fn test_nested_path() {
    let (re, params) = PatternRouter::path_to_regex("/a/{b}/c").unwrap();
    assert!(re.is_match("/a/1/c"));
    assert_eq!(params, vec!["b"]);
}

#[test]
fn test_literal_segments_are_escaped() {
    let (re, _) = PatternRouter::path_to_regex("/feed.xml").unwrap();
    assert!(re.is_match("/feed.xml"));
    assert!(!re.is_match("/feedxxml"));
}

#[test]
fn test_none_and_root_resolve_to_defaults() {
    let router = PatternRouter::new();
    for uri in [None, Some("/"), Some(""), Some("/?page=2")] {
        let route = router.handle(uri);
        assert_eq!(route.module_name, None);
        assert_eq!(route.controller_name, "index");
        assert_eq!(route.action_name, "index");
        assert!(route.params.is_empty());
    }
}

#[test]
fn test_conventional_controller_action_params() {
    let router = PatternRouter::new();
    let route = router.handle(Some("/users/edit/7/draft/"));
    assert_eq!(route.controller_name, "users");
    assert_eq!(route.action_name, "edit");
    assert_eq!(route.params.as_slice(), ["7", "draft"]);
    assert_eq!(route.param(1), Some("draft"));
    assert_eq!(route.param(2), None);

    let route = router.handle(Some("/users"));
    assert_eq!(route.action_name, "index");
}

#[test]
fn test_module_prefix_only_for_declared_modules() {
    let mut router = PatternRouter::new();
    router.with_module("admin");

    let route = router.handle(Some("/admin/users/list"));
    assert_eq!(route.module_name.as_deref(), Some("admin"));
    assert_eq!(route.controller_name, "users");
    assert_eq!(route.action_name, "list");

    let route = router.handle(Some("/blog/users/list"));
    assert_eq!(route.module_name, None);
    assert_eq!(route.controller_name, "blog");
    assert_eq!(route.action_name, "users");
    assert_eq!(route.params.as_slice(), ["list"]);
}

#[test]
fn test_default_module_applies_when_uri_names_none() {
    let mut router = PatternRouter::new();
    router.with_module("admin").set_default_module("frontend");
    assert_eq!(
        router.handle(Some("/posts")).module_name.as_deref(),
        Some("frontend")
    );
    assert_eq!(
        router.handle(Some("/admin")).module_name.as_deref(),
        Some("admin")
    );
}

#[test]
fn test_explicit_route_wins_over_convention() {
    let mut router = PatternRouter::new();
    router
        .add("/blog/{slug}", RouteTarget::new("posts", "show"))
        .unwrap();

    let route = router.handle(Some("/blog/hello%20world"));
    assert_eq!(route.controller_name, "posts");
    assert_eq!(route.action_name, "show");
    assert_eq!(route.params.as_slice(), ["hello world"]);

    // Deeper paths do not match the pattern and fall through.
    let route = router.handle(Some("/blog/a/b"));
    assert_eq!(route.controller_name, "blog");
    assert_eq!(route.action_name, "a");
}

#[test]
fn test_reserved_placeholders_override_target() {
    let mut router = PatternRouter::new();
    router
        .add(
            "/api/{module}/{controller}/{action}/{id}",
            RouteTarget::new("unused", "unused"),
        )
        .unwrap();
    let route = router.handle(Some("/api/shop/orders/view/9"));
    assert_eq!(route.module_name.as_deref(), Some("shop"));
    assert_eq!(route.controller_name, "orders");
    assert_eq!(route.action_name, "view");
    assert_eq!(route.params.as_slice(), ["9"]);
}

#[test]
fn test_routes_tried_in_registration_order() {
    let mut router = PatternRouter::new();
    router
        .add("/p/{id}", RouteTarget::new("first", "index"))
        .unwrap()
        .add("/p/{slug}", RouteTarget::new("second", "index").in_module("m"))
        .unwrap();
    assert_eq!(router.patterns(), vec!["/p/{id}", "/p/{slug}"]);
    assert_eq!(router.handle(Some("/p/1")).controller_name, "first");
}
