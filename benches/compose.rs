//! 配置合成基准测试
//!
//! 测试解码、逐字段合成和字段寻址的性能

use criterion::{criterion_group, criterion_main, Criterion};
use std::collections::HashMap;
use std::hint::black_box;
use strata::cli::{ServiceSettings, WebSettings};
use strata::cli::settings::{ServiceSettingsPartial, WebSettingsPartial};
use strata::source::{Decoder, TomlDecoder};
use strata::{compose, Schema, SourceId, SourceValue, Type};

const CONFIG_TOML: &str = r#"
default_webhook_url = "https://hooks.example.com/alert"
check_interval_seconds = 30
log_level = "debug"
max_concurrent_checks = 100

[headers]
User-Agent = "strata"
Authorization = "Bearer token"

[web]
enabled = true
port = 9090
layout_type = "table"
"#;

fn create_layers() -> Vec<SourceValue<ServiceSettings>> {
    let full = ServiceSettings {
        headers: HashMap::from([("X-Env".to_string(), "prod".to_string())]),
        web: Some(WebSettings::default()),
        ..Default::default()
    };

    vec![
        SourceValue::new(SourceId(0), "defaults", full.to_partial()),
        SourceValue::new(
            SourceId(1),
            "file",
            ServiceSettingsPartial {
                log_level: Some("warn".to_string()),
                retry_attempts: Some(5),
                ..Default::default()
            },
        ),
        SourceValue::new(
            SourceId(2),
            "env",
            ServiceSettingsPartial {
                web: Some(WebSettingsPartial {
                    port: Some(8443),
                    ..Default::default()
                }),
                ..Default::default()
            },
        ),
    ]
}

/// 配置合成基准测试
fn compose_benchmark(c: &mut Criterion) {
    c.bench_function("compose_three_layers", |b| {
        let base = ServiceSettings::default();
        let layers = create_layers();

        b.iter(|| {
            let settings = compose(black_box(&base), black_box(&layers)).unwrap();
            black_box(settings)
        });
    });

    c.bench_function("toml_decode_partial", |b| {
        let ty = Type::<ServiceSettings>::new();

        b.iter(|| {
            let partial = Decoder::decode(&TomlDecoder, black_box(CONFIG_TOML), &ty).unwrap();
            black_box(partial)
        });
    });

    c.bench_function("assign_by_path", |b| {
        let ty = Type::<ServiceSettings>::new();

        b.iter(|| {
            let mut builder = ty.builder();
            builder.set(&["web", "port"], black_box("8080")).unwrap();
            builder.set(&["retry_attempts"], black_box("7")).unwrap();
            black_box(builder.finish())
        });
    });

    c.bench_function("descriptor_leaf_paths", |b| {
        b.iter(|| black_box(ServiceSettings::descriptor().leaf_paths()));
    });
}

criterion_group!(benches, compose_benchmark);
criterion_main!(benches);
