use criterion::{black_box, criterion_group, criterion_main, Criterion};
use wp_change_tracker::parsing::{decode_role_value, unserialize};
use wp_change_tracker::roles::qualifying_users;
use wp_change_tracker::CapabilityRow;

fn capability_decoding_benchmark(c: &mut Criterion) {
    let test_values = vec![
        r#"a:1:{s:13:"administrator";b:1;}"#,
        r#"a:1:{s:10:"subscriber";b:1;}"#,
        r#"a:2:{s:6:"editor";b:1;s:12:"group_leader";b:1;}"#,
        r#"a:1:{s:20:"administrator";b:1;}"#,
        "b:0;",
        "administrator",
    ];

    c.bench_function("decode_role_value", |b| {
        b.iter(|| {
            for value in &test_values {
                black_box(decode_role_value(black_box(value)));
            }
        })
    });

    c.bench_function("unserialize_nested", |b| {
        let raw = r#"a:3:{s:13:"administrator";b:1;s:4:"meta";a:2:{i:0;s:3:"one";i:1;d:2.5;}s:1:"n";N;}"#;
        b.iter(|| black_box(unserialize(black_box(raw))))
    });
}

fn qualifying_users_benchmark(c: &mut Criterion) {
    let allowed: Vec<String> = ["administrator", "editor", "group_leader", "0"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let rows: Vec<CapabilityRow> = (0..1000u64)
        .map(|id| CapabilityRow {
            user_id: id,
            meta_value: Some(if id % 10 == 0 {
                r#"a:1:{s:13:"administrator";b:1;}"#.to_string()
            } else {
                r#"a:1:{s:10:"subscriber";b:1;}"#.to_string()
            }),
        })
        .collect();

    c.bench_function("qualifying_users_1000", |b| {
        b.iter(|| black_box(qualifying_users(black_box(&rows), black_box(&allowed))))
    });
}

criterion_group!(benches, capability_decoding_benchmark, qualifying_users_benchmark);
criterion_main!(benches);
