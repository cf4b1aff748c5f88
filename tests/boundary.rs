use std::collections::HashMap;
use std::thread;
use std::time::Duration;

use chrono::{TimeDelta, TimeZone, Utc};

use rowdex::core::types::{FieldKind, FieldValue, Value};
use rowdex::query::operator::{FilterOptions, FilterValue, Operator};
use rowdex::store::table::Table;

fn data(pairs: Vec<(&str, Value)>) -> HashMap<String, Value> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

#[test]
fn type_commitment_drops_the_conflicting_field_only() {
    let table = Table::new(Duration::from_secs(60));
    table.insert(data(vec![("f", Value::from("x"))]));
    table.insert(data(vec![("f", Value::from(5.0))]));

    assert_eq!(table.count(), 2);

    let matched = table.filter(
        Operator::Equals,
        "f",
        FilterValue::from("x"),
        FilterOptions::default(),
    );
    assert_eq!(matched.count(), 1);

    // The second row exists but carries no projection for the field.
    assert_eq!(table.project_field("f").len(), 1);
}

#[test]
fn reaper_expires_old_rows_but_not_fresh_ones() {
    let table = Table::new(Duration::from_secs(3));
    table.start_reaper();

    table.insert(data(vec![("name", Value::from("A"))]));
    table.insert(data(vec![("name", Value::from("B"))]));

    thread::sleep(Duration::from_secs(5));
    table.insert(data(vec![("name", Value::from("C"))]));

    assert_eq!(table.count(), 1);
    let gone = table.filter(
        Operator::Equals,
        "name",
        FilterValue::from("A"),
        FilterOptions::default(),
    );
    assert_eq!(gone.count(), 0);
    let fresh = table.filter(
        Operator::Equals,
        "name",
        FilterValue::from("C"),
        FilterOptions::default(),
    );
    assert_eq!(fresh.count(), 1);

    table.stop_reaper();
}

#[test]
fn cidr_filter_partitions_exactly() {
    let table = Table::new(Duration::from_secs(60));
    for ip in [
        "192.168.1.1",
        "192.168.1.2",
        "192.168.1.3",
        "10.168.1.1",
        "10.168.1.2",
        "10.168.1.3",
    ] {
        table.insert(data(vec![("ip", Value::from(ip))]));
    }

    let inside = table.filter(
        Operator::InCidr,
        "ip",
        FilterValue::from("192.168.1.0/24"),
        FilterOptions::default(),
    );
    assert_eq!(inside.count(), 3);
    for row in inside.to_slice() {
        let FieldValue::Text(ip) = &row["ip"] else {
            panic!("expected text value");
        };
        assert!(ip.starts_with("192.168.1."));
    }

    let outside = table.filter(
        Operator::NotInCidr,
        "ip",
        FilterValue::from("192.168.1.0/24"),
        FilterOptions::default(),
    );
    assert_eq!(outside.count(), 3);
    for row in outside.to_slice() {
        let FieldValue::Text(ip) = &row["ip"] else {
            panic!("expected text value");
        };
        assert!(ip.starts_with("10.168.1."));
    }
}

#[test]
fn between_on_numbers_swaps_reversed_bounds() {
    let table = Table::new(Duration::from_secs(60));
    table.insert(data(vec![("value", Value::from(50.0))]));

    let inside = table.filter(
        Operator::Between,
        "value",
        FilterValue::from([100.0, 0.0]),
        FilterOptions::default(),
    );
    assert_eq!(inside.count(), 1);

    let outside = table.filter(
        Operator::NotBetween,
        "value",
        FilterValue::from([100.0, 0.0]),
        FilterOptions::default(),
    );
    assert_eq!(outside.count(), 0);
}

#[test]
fn between_on_instants_is_inclusive_and_order_insensitive() {
    let table = Table::new(Duration::from_secs(600));
    let start = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
    for day in 0..6 {
        table.insert(data(vec![
            ("at", Value::from(start + TimeDelta::days(day))),
            ("ordinal", Value::from(day as f64)),
        ]));
    }

    let lo = start + TimeDelta::hours(24);
    let hi = start + TimeDelta::hours(72);

    for bounds in [[lo, hi], [hi, lo]] {
        let matched = table.filter(
            Operator::Between,
            "at",
            FilterValue::from(bounds),
            FilterOptions::default(),
        );
        assert_eq!(matched.count(), 3);

        let mut ordinals: Vec<f64> = matched.project_field_as_float("ordinal");
        ordinals.sort_by(f64::total_cmp);
        assert_eq!(ordinals, vec![1.0, 2.0, 3.0]);
    }
}

#[test]
fn explain_reports_selectivity_from_the_index() {
    let table = Table::new(Duration::from_secs(600));
    for i in 0..1000 {
        table.insert(data(vec![
            ("name", Value::from(format!("row-{}", i))),
            ("score", Value::from((i % 100) as f64)),
            ("active", Value::from(i % 2 == 0)),
        ]));
    }

    let plan = table.explain(Operator::Equals, "score", &FilterValue::from(50.0));
    assert_eq!(plan.key_kind, Some(FieldKind::Number));
    assert!(plan.index_used);
    assert_eq!(plan.total_rows, 1000);
    assert!(plan.estimated_rows > 0);
    assert!(plan.selectivity > 0.0);

    let unknown = table.explain(Operator::Equals, "nonexistent", &FilterValue::from("x"));
    assert_eq!(unknown.key_kind, None);
    assert!(!unknown.index_used);
}

#[test]
fn binary_and_text_round_trips_agree() {
    let table = Table::new(Duration::from_secs(300));
    let seen = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
    for i in 0..20 {
        table.insert(data(vec![
            ("name", Value::from(format!("row-{}", i))),
            ("score", Value::from(i as f64)),
            ("seen", Value::from(seen + TimeDelta::minutes(i))),
        ]));
    }

    let binary = tempfile::NamedTempFile::new().unwrap();
    table.save(binary.path()).unwrap();
    let from_binary = Table::new(Duration::from_secs(1));
    from_binary.load(binary.path()).unwrap();

    let text = tempfile::NamedTempFile::new().unwrap();
    table.export_text(text.path()).unwrap();
    let from_text = Table::new(Duration::from_secs(1));
    from_text.import_text(text.path()).unwrap();

    assert_eq!(from_binary.count(), 20);
    assert_eq!(from_text.count(), 20);
    assert_eq!(from_binary.ttl(), table.ttl());
    assert_eq!(from_text.ttl(), table.ttl());

    for restored in [&from_binary, &from_text] {
        let matched = restored.filter(
            Operator::Between,
            "score",
            FilterValue::from([5.0, 9.0]),
            FilterOptions::default(),
        );
        assert_eq!(matched.count(), 5);

        let seen_rows = restored.filter(
            Operator::Between,
            "seen",
            FilterValue::from([seen, seen + TimeDelta::minutes(3)]),
            FilterOptions::default(),
        );
        assert_eq!(seen_rows.count(), 4);
    }
}

#[test]
fn concurrent_readers_and_writers_keep_counts_consistent() {
    let table = Table::new(Duration::from_secs(60));
    let mut handles = Vec::new();

    for worker in 0..4 {
        let table = table.clone();
        handles.push(thread::spawn(move || {
            for i in 0..250 {
                table.insert(data(vec![
                    ("worker", Value::from(worker as f64)),
                    ("seq", Value::from(i as f64)),
                ]));
            }
        }));
    }
    for worker in 0..2 {
        let table = table.clone();
        handles.push(thread::spawn(move || {
            for _ in 0..100 {
                let _ = table.filter(
                    Operator::Equals,
                    "worker",
                    FilterValue::from(worker as f64),
                    FilterOptions::default(),
                );
                let _ = table.count();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(table.count(), 1000);
    let one_worker = table.filter(
        Operator::Equals,
        "worker",
        FilterValue::from(0.0),
        FilterOptions::default(),
    );
    assert_eq!(one_worker.count(), 250);
}
