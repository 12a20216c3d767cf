// Copyright (c) 2026 Bountyy Oy. All rights reserved.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use url::Url;

use mustekala::config::{CrawlOptions, RouteOptions};
use mustekala::{ParamValues, RouteSet, UrlContext};

fn normalization_benchmark(c: &mut Criterion) {
    let origin = Url::parse("https://devapp.example.com/").unwrap();
    let context = UrlContext::new(
        &origin,
        &CrawlOptions::default(),
        &["logout".to_string(), "/api/".to_string(), ".pdf".to_string()],
    );
    let base = "https://devapp.example.com/shop/items";
    let urls = [
        "/shop/",
        "https://devapp.example.com/orders/42?tab=history#top",
        "../profile",
        "https://other.example.com/away",
    ];

    c.bench_function("normalize_url", |b| {
        b.iter(|| {
            for &url in &urls {
                black_box(context.normalize(base, url));
            }
        })
    });

    c.bench_function("is_valid_url", |b| {
        b.iter(|| {
            for &url in &urls {
                black_box(context.is_valid(base, url));
            }
        })
    });
}

fn route_expansion_benchmark(c: &mut Criterion) {
    let source = r#"
        { path: '/' }, { path: '/orders' }, { path: '/orders/:id' },
        { path: '/pets/:petId/visits/:visitId' }, { path: '/settings' }
    "#;
    let routes = RouteSet::parse(source);
    let origin = Url::parse("https://devapp.example.com/").unwrap();
    let mut params = ParamValues::new();
    for i in 0..20 {
        params.insert("id", &i.to_string());
        params.insert("petId", &i.to_string());
        params.insert("visitId", &i.to_string());
    }
    let options = RouteOptions::default();

    c.bench_function("expand_routes", |b| {
        b.iter(|| black_box(routes.expand(&origin, &params, &options)))
    });

    let candidates: Vec<String> = (0..50)
        .map(|i| format!("https://devapp.example.com/orders/{}", i))
        .collect();
    c.bench_function("harvest_params", |b| {
        b.iter(|| {
            black_box(routes.extract_param_values(candidates.iter().map(String::as_str)))
        })
    });
}

criterion_group!(benches, normalization_benchmark, route_expansion_benchmark);
criterion_main!(benches);
