//! Resolution pipeline behavior against counting collaborators.

use std::sync::Arc;

use route_resolver::config::parse_config;
use route_resolver::lifecycle::build_resolver;
use route_resolver::params;
use route_resolver::resolution::{
    ContentRecord, RequestContext, ResolveError, Resolver, RuleContributor, RuleScope, SiteId,
    TokenRejection,
};
use route_resolver::resolution::{Request, ResolverSettings};
use route_resolver::routing::{
    compile, ParamValue, RawRuleDeclaration, RouteResult, RuleConfig, RuleMode, Verb,
};
use route_resolver::store::{
    ConfigRuleSource, MemoryContentStore, MemoryTokenStore, StoredContent, StoredToken,
};

mod common;

use common::{CountingContent, CountingTokens};

fn content_store() -> MemoryContentStore {
    let store = MemoryContentStore::new();
    store.insert(StoredContent {
        id: "101".into(),
        uri: "blog/hello".into(),
        site_id: SiteId(1),
        enabled: true,
        handler: Some("entries/show".into()),
        params: params! { "entryId" => 101i64 },
    });
    store
}

fn token_store() -> MemoryTokenStore {
    let store = MemoryTokenStore::new();
    store.insert(
        "preview-token",
        StoredToken::new(RouteResult::new("entries/preview", params! { "draftId" => 7i64 })),
    );
    store
}

fn site_rules() -> Vec<RawRuleDeclaration> {
    vec![
        RawRuleDeclaration::keyed(
            "news/<slug>",
            RuleConfig::route("news/show").with_params(params! { "section" => "news" }),
        ),
        RawRuleDeclaration::shorthand("blog/<slug>", "blog/show"),
    ]
}

struct Fixture {
    resolver: Resolver,
    content: CountingContent,
    tokens: CountingTokens,
}

async fn fixture_with(settings: ResolverSettings) -> Fixture {
    let content = CountingContent::new(content_store());
    let tokens = CountingTokens::new(token_store());
    let resolver = Resolver::builder()
        .settings(settings)
        .content(Arc::new(content.clone()))
        .tokens(Arc::new(tokens.clone()))
        .rule_source(Arc::new(ConfigRuleSource::new(
            site_rules(),
            vec![RawRuleDeclaration::shorthand(r"entries/<id:\d+>", "entries/edit")],
        )))
        .build()
        .await
        .unwrap();

    Fixture {
        resolver,
        content,
        tokens,
    }
}

async fn fixture() -> Fixture {
    fixture_with(ResolverSettings::default()).await
}

#[tokio::test]
async fn test_end_to_end_rule_match() {
    let f = fixture().await;
    let mut ctx = RequestContext::new(Request::site("blog/hello-world"));

    let route = f.resolver.resolve(&mut ctx).await.unwrap();
    assert_eq!(route, RouteResult::new("blog/show", params! { "slug" => "hello-world" }));
    assert_eq!(ctx.params(), Some(&params! { "slug" => "hello-world" }));
    assert_eq!(f.content.calls(), 1);
}

#[tokio::test]
async fn test_token_wins_over_content() {
    let f = fixture().await;
    let mut ctx = RequestContext::new(Request::site("blog/hello").with_token("preview-token"));

    let route = f.resolver.resolve(&mut ctx).await.unwrap();
    assert_eq!(route.handler, "entries/preview");
    assert_eq!(route.params, params! { "draftId" => 7i64 });
    assert_eq!(f.content.calls(), 0);
}

#[tokio::test]
async fn test_invalid_token_does_not_fall_through() {
    let f = fixture().await;
    let mut ctx = RequestContext::new(Request::site("blog/hello").with_token("forged"));

    let err = f.resolver.resolve(&mut ctx).await.unwrap_err();
    assert!(matches!(err, ResolveError::InvalidToken(TokenRejection::Unknown)));
    assert_eq!(f.content.calls(), 0);
    assert!(ctx.params().is_none());

    // Cached: the token is not redeemed twice.
    let again = f.resolver.resolve(&mut ctx).await.unwrap_err();
    assert!(matches!(again, ResolveError::InvalidToken(TokenRejection::Unknown)));
    assert_eq!(f.tokens.calls(), 1);
}

#[tokio::test]
async fn test_exhausted_token_is_rejected() {
    let tokens = MemoryTokenStore::new();
    let mut token = StoredToken::new(RouteResult::handler_only("entries/preview"));
    token.usage_limit = Some(1);
    tokens.insert("once", token);
    let resolver = Resolver::builder().tokens(Arc::new(tokens)).build().await.unwrap();

    let mut first = RequestContext::new(Request::site("anything").with_token("once"));
    assert!(resolver.resolve(&mut first).await.is_ok());

    let mut second = RequestContext::new(Request::site("anything").with_token("once"));
    let err = resolver.resolve(&mut second).await.unwrap_err();
    assert!(matches!(err, ResolveError::InvalidToken(TokenRejection::Exhausted)));
}

#[tokio::test]
async fn test_content_wins_over_rules() {
    let f = fixture().await;
    let mut ctx = RequestContext::new(Request::site("/blog/hello/"));

    let route = f.resolver.resolve(&mut ctx).await.unwrap();
    assert_eq!(route, RouteResult::new("entries/show", params! { "entryId" => 101i64 }));

    let record = f.resolver.matched_content(&mut ctx).await.unwrap().unwrap();
    assert_eq!(record.id(), "101");
}

#[tokio::test]
async fn test_content_lookup_is_memoized() {
    let f = fixture().await;

    let mut ctx = RequestContext::new(Request::site("blog/hello"));
    f.resolver.resolve(&mut ctx).await.unwrap();
    f.resolver.matched_content(&mut ctx).await.unwrap();
    f.resolver.matched_content(&mut ctx).await.unwrap();
    assert_eq!(f.content.calls(), 1);

    // A miss is memoized as well.
    let mut ctx = RequestContext::new(Request::site("blog/other"));
    assert!(f.resolver.matched_content(&mut ctx).await.unwrap().is_none());
    f.resolver.resolve(&mut ctx).await.unwrap();
    assert_eq!(f.content.calls(), 2);
}

#[tokio::test]
async fn test_contexts_do_not_share_memoized_state() {
    let f = fixture().await;

    let mut a = RequestContext::new(Request::site("blog/hello"));
    let mut b = RequestContext::new(Request::site("blog/hello"));
    f.resolver.resolve(&mut a).await.unwrap();
    f.resolver.resolve(&mut b).await.unwrap();
    assert_eq!(f.content.calls(), 2);
}

#[tokio::test]
async fn test_content_skipped_when_not_installed() {
    let f = fixture_with(ResolverSettings {
        installed: false,
        ..Default::default()
    })
    .await;
    let mut ctx = RequestContext::new(Request::site("blog/hello"));

    let route = f.resolver.resolve(&mut ctx).await.unwrap();
    assert_eq!(route.handler, "blog/show");
    assert_eq!(f.content.calls(), 0);
    assert!(f.resolver.matched_content(&mut ctx).await.unwrap().is_none());
}

#[tokio::test]
async fn test_rule_literal_params_accumulate() {
    let f = fixture().await;
    let mut ctx = RequestContext::new(Request::site("news/launch"));

    let route = f.resolver.resolve(&mut ctx).await.unwrap();
    assert_eq!(route.handler, "news/show");
    assert_eq!(route.params, params! { "section" => "news", "slug" => "launch" });

    ctx.set_params(params! { "section" => "press", "page" => 2i64 });
    assert_eq!(
        ctx.params(),
        Some(&params! { "section" => "press", "slug" => "launch", "page" => 2i64 })
    );
}

#[tokio::test]
async fn test_rule_list_literals_are_not_repeated() {
    let resolver = Resolver::builder()
        .rule_source(Arc::new(ConfigRuleSource::new(
            vec![RawRuleDeclaration::keyed(
                "blog/<slug>",
                RuleConfig::route("blog/show").with_params(params! {
                    "tags" => vec![ParamValue::from("a")],
                    "meta" => params! { "layout" => "wide" },
                }),
            )],
            Vec::new(),
        )))
        .build()
        .await
        .unwrap();

    let expected = params! {
        "tags" => vec![ParamValue::from("a")],
        "meta" => params! { "layout" => "wide" },
        "slug" => "x",
    };

    let mut ctx = RequestContext::new(Request::site("blog/x"));
    let route = resolver.resolve(&mut ctx).await.unwrap();
    assert_eq!(route.params, expected);
    assert_eq!(ctx.params(), Some(&expected));

    // Memoized: a second call hands back the same params.
    assert_eq!(resolver.resolve(&mut ctx).await.unwrap().params, expected);
}

#[tokio::test]
async fn test_pattern_declaration_keeps_verb_and_mode() {
    let config = parse_config(
        r#"
        [[rules]]
        pattern = "api/save"
        route = "api/save"
        verb = ["POST"]
        mode = "parsing_only"
        params = { source = "api" }
        "#,
    )
    .unwrap();
    let resolver = build_resolver(&config).await.unwrap();

    let mut ctx = RequestContext::new(Request::site("api/save").with_verb(Verb::Post));
    assert_eq!(
        resolver.resolve(&mut ctx).await.unwrap(),
        RouteResult::new("api/save", params! { "source" => "api" })
    );

    let mut ctx = RequestContext::new(Request::site("api/save"));
    assert_eq!(
        resolver.resolve(&mut ctx).await.unwrap(),
        RouteResult::new("templates/render", params! { "template" => "api/save" })
    );

    assert_eq!(
        resolver.build_url(RuleScope::Site, "api/save", &params! { "id" => 1i64 }),
        "/actions/api/save?id=1"
    );
}

#[tokio::test]
async fn test_set_params_merges_nested_maps() {
    let f = fixture().await;
    let mut ctx = RequestContext::new(Request::site("blog/a"));
    f.resolver.resolve(&mut ctx).await.unwrap();

    ctx.set_params(params! { "a" => params! { "x" => 1i64 } });
    ctx.set_params(params! { "a" => params! { "y" => 2i64 } });

    let params = ctx.params().unwrap();
    assert_eq!(params.get("a"), Some(&params! { "x" => 1i64, "y" => 2i64 }.into()));
}

#[tokio::test]
async fn test_public_template_fallback() {
    let f = fixture().await;

    let mut ctx = RequestContext::new(Request::site("about/team"));
    let route = f.resolver.resolve(&mut ctx).await.unwrap();
    assert_eq!(
        route,
        RouteResult::new("templates/render", params! { "template" => "about/team" })
    );

    let mut ctx = RequestContext::new(Request::site("about/_partials/nav"));
    assert!(f.resolver.resolve(&mut ctx).await.unwrap_err().is_no_route());
}

#[tokio::test]
async fn test_console_requests_never_route() {
    let f = fixture().await;
    let mut ctx = RequestContext::new(Request::console());

    assert!(f.resolver.resolve(&mut ctx).await.unwrap_err().is_no_route());
    assert_eq!(f.content.calls(), 0);
    assert_eq!(f.tokens.calls(), 0);
}

#[tokio::test]
async fn test_control_panel_uses_its_own_rules() {
    let f = fixture().await;

    let mut ctx = RequestContext::new(Request::control_panel("entries/42"));
    let route = f.resolver.resolve(&mut ctx).await.unwrap();
    assert_eq!(route, RouteResult::new("entries/edit", params! { "id" => "42" }));
    assert_eq!(f.content.calls(), 0);

    let mut ctx = RequestContext::new(Request::control_panel("blog/hello"));
    let route = f.resolver.resolve(&mut ctx).await.unwrap();
    assert_eq!(route.handler, "templates/render");

    let mut ctx = RequestContext::new(Request::site("entries/42"));
    let route = f.resolver.resolve(&mut ctx).await.unwrap();
    assert_eq!(route.handler, "templates/render");
}

#[tokio::test]
async fn test_content_failure_propagates_and_is_not_cached() {
    let f = fixture().await;
    f.content.fail();
    let mut ctx = RequestContext::new(Request::site("blog/hello"));

    let err = f.resolver.resolve(&mut ctx).await.unwrap_err();
    assert!(matches!(err, ResolveError::Collaborator(_)));
    assert!(!err.is_no_route());
    assert!(!ctx.is_resolved());

    f.content
        .failing
        .store(false, std::sync::atomic::Ordering::SeqCst);
    let route = f.resolver.resolve(&mut ctx).await.unwrap();
    assert_eq!(route.handler, "entries/show");
}

#[tokio::test]
async fn test_token_failure_propagates() {
    let f = fixture().await;
    f.tokens
        .failing
        .store(true, std::sync::atomic::Ordering::SeqCst);
    let mut ctx = RequestContext::new(Request::site("blog/hello").with_token("preview-token"));

    let err = f.resolver.resolve(&mut ctx).await.unwrap_err();
    assert!(matches!(err, ResolveError::Collaborator(ref e) if e.collaborator == "tokens"));
}

#[tokio::test]
async fn test_verb_restricted_rules() {
    let resolver = Resolver::builder()
        .rule_source(Arc::new(ConfigRuleSource::new(
            vec![
                RawRuleDeclaration::shorthand("POST,PUT comments/<id>", "comments/save"),
                RawRuleDeclaration::shorthand("comments/<id>", "comments/show"),
            ],
            Vec::new(),
        )))
        .build()
        .await
        .unwrap();

    let mut ctx = RequestContext::new(Request::site("comments/9").with_verb(Verb::Put));
    assert_eq!(resolver.resolve(&mut ctx).await.unwrap().handler, "comments/save");

    let mut ctx = RequestContext::new(Request::site("comments/9"));
    assert_eq!(resolver.resolve(&mut ctx).await.unwrap().handler, "comments/show");

    assert_eq!(
        resolver.build_url(RuleScope::Site, "comments/save", &params! { "id" => 9i64 }),
        "/actions/comments/save?id=9"
    );
}

#[tokio::test]
async fn test_contributors_run_in_registration_order() {
    let feeds: Arc<dyn RuleContributor> =
        Arc::new(|scope: RuleScope, existing: &[RawRuleDeclaration]| {
            if scope == RuleScope::Site && !existing.is_empty() {
                vec![RawRuleDeclaration::shorthand("feed", "feeds/rss")]
            } else {
                Vec::new()
            }
        });
    let late: Arc<dyn RuleContributor> =
        Arc::new(|_: RuleScope, existing: &[RawRuleDeclaration]| {
            assert!(existing.iter().all(|d| d.key() != "sitemap"));
            vec![
                RawRuleDeclaration::shorthand("feed", "feeds/atom"),
                RawRuleDeclaration::shorthand("sitemap", "seo/sitemap"),
            ]
        });

    let resolver = Resolver::builder()
        .rule_source(Arc::new(ConfigRuleSource::new(site_rules(), Vec::new())))
        .contributor(feeds)
        .contributor(late)
        .build()
        .await
        .unwrap();

    let patterns: Vec<&str> = resolver
        .rules(RuleScope::Site)
        .iter()
        .map(|r| r.pattern.as_str())
        .collect();
    assert_eq!(patterns, vec!["news/<slug>", "blog/<slug>", "feed", "feed", "sitemap"]);
    assert_eq!(resolver.rules(RuleScope::ControlPanel).len(), 2);

    let mut ctx = RequestContext::new(Request::site("feed"));
    assert_eq!(resolver.resolve(&mut ctx).await.unwrap().handler, "feeds/rss");
}

#[tokio::test]
async fn test_compile_is_deterministic_and_infers_mode() {
    let declarations = vec![
        RawRuleDeclaration::shorthand("POST,PUT foo/<id>", "foo/save"),
        RawRuleDeclaration::shorthand("GET foo/<id>", "foo/show"),
        RawRuleDeclaration::shorthand("foo", "foo/index"),
    ];

    let first = compile(declarations.clone()).unwrap();
    let second = compile(declarations).unwrap();
    assert_eq!(first.rules(), second.rules());

    let rules = first.rules();
    assert_eq!(rules[0].verbs, [Verb::Post, Verb::Put].into_iter().collect());
    assert_eq!(rules[0].mode, RuleMode::ParsingOnly);
    assert_eq!(rules[1].mode, RuleMode::Both);
    assert!(rules[2].verbs.is_empty());
}

#[tokio::test]
async fn test_shared_resolver_across_tasks() {
    let f = fixture().await;
    let resolver = Arc::new(f.resolver);

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let resolver = resolver.clone();
            tokio::spawn(async move {
                let mut ctx = RequestContext::new(Request::site(format!("blog/post-{}", i)));
                let route = resolver.resolve(&mut ctx).await.unwrap();
                assert_eq!(route.params, params! { "slug" => format!("post-{}", i) });
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap();
    }
}

#[tokio::test]
async fn test_build_url_round_trips_through_rules() {
    let f = fixture().await;
    let url = f
        .resolver
        .build_url(RuleScope::Site, "news/show", &params! { "slug" => "launch", "section" => "news" });
    assert_eq!(url, "/news/launch");

    let url = f
        .resolver
        .build_url(RuleScope::ControlPanel, "entries/edit", &params! { "id" => 42i64 });
    assert_eq!(url, "/entries/42");
}
