/// Complete rowdex API demo
///
/// Demonstrates the major table operations:
/// - Insert (single, batch, nested data)
/// - Filter (probes, ranges, CIDR, patterns)
/// - Explain
/// - TTL reaping
/// - Persistence (binary and text)
use std::collections::HashMap;
use std::time::Duration;

use rowdex::core::types::Value;
use rowdex::query::operator::{FilterOptions, FilterValue, Operator};
use rowdex::store::table::Table;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("rowdex - in-memory TTL table demo\n");

    // Step 1: create a table with a 5 minute TTL
    println!("Creating table...");
    let table = Table::new(Duration::from_secs(300));
    table.start_reaper();
    println!("Done!\n");

    // Step 2: INSERT - single rows and a batch
    println!("Step 2: INSERT");
    table.insert(row(vec![
        ("host", Value::from("web-1")),
        ("ip", Value::from("192.168.1.10")),
        ("load", Value::from(0.42)),
        ("healthy", Value::from(true)),
    ]));
    table.insert(row(vec![
        ("host", Value::from("web-2")),
        ("ip", Value::from("192.168.1.11")),
        ("load", Value::from(0.87)),
        ("healthy", Value::from(false)),
    ]));
    table.insert_batch(vec![
        row(vec![
            ("host", Value::from("db-1")),
            ("ip", Value::from("10.0.0.5")),
            ("load", Value::from(0.65)),
            ("healthy", Value::from(true)),
        ]),
        row(vec![
            ("host", Value::from("db-2")),
            ("ip", Value::from("10.0.0.6")),
            ("load", Value::from(0.12)),
            ("healthy", Value::from(true)),
        ]),
    ])?;
    println!("  {} rows inserted\n", table.count());

    // Step 3: FILTER - different predicate shapes
    println!("Step 3: FILTER");
    let busy = table.filter(
        Operator::Greater,
        "load",
        FilterValue::from(0.5),
        FilterOptions::default(),
    );
    println!("  load > 0.5: {} rows", busy.count());

    let lan = table.filter(
        Operator::InCidr,
        "ip",
        FilterValue::from("192.168.0.0/16"),
        FilterOptions::default(),
    );
    println!("  ip in 192.168.0.0/16: {} rows", lan.count());

    let webs = table.filter(
        Operator::StartsWith,
        "host",
        FilterValue::from("web-"),
        FilterOptions::default(),
    );
    println!("  host starts with 'web-': {} rows", webs.count());

    // Step 4: EXPLAIN - estimate before executing
    println!("\nStep 4: EXPLAIN");
    let plan = table.explain(Operator::Equals, "healthy", &FilterValue::from(true));
    print!("{}", plan);

    // Step 5: PROJECT - feed the aggregation helpers
    println!("\nStep 5: PROJECT");
    let loads = table.project_field_as_float("load");
    let mean = loads.iter().sum::<f64>() / loads.len() as f64;
    println!("  mean load: {:.3}", mean);

    // Step 6: PERSIST - binary snapshot and text export
    println!("\nStep 6: PERSIST");
    let dir = std::env::temp_dir();
    let binary_path = dir.join("rowdex-demo.snap");
    let text_path = dir.join("rowdex-demo.json");

    table.save(&binary_path)?;
    table.export_text(&text_path)?;
    println!("  saved {:?} and {:?}", binary_path, text_path);

    let restored = Table::new(Duration::from_secs(1));
    restored.load(&binary_path)?;
    println!("  restored table has {} rows", restored.count());

    table.stop_reaper();
    println!("\nDemo complete.");
    Ok(())
}

fn row(pairs: Vec<(&str, Value)>) -> HashMap<String, Value> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}
