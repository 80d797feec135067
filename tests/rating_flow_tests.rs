//! End-to-end rating flow: book records, lookup tables, and a custom step
//! combined into one plan, run both ways.

use std::sync::Arc;

use ratekit::{
    Book, Column, CustomFn, Dimension, Engine, ExecConfig, Frame, KeyCell, KeyedTable, Plan, Step,
    TableRow, Value,
};

fn driver_book() -> Arc<Book> {
    let drivers = Frame::with_keys(
        vec![
            Column::new("driver_id", vec![1.into(), 2.into(), 3.into()]),
            Column::new("age", vec![19.into(), 35.into(), 70.into()]),
        ],
        vec!["driver_id".into()],
    )
    .unwrap();
    let mut book = Book::new();
    book.register("drivers", drivers);
    Arc::new(book)
}

fn rating_plan() -> Plan {
    let age_factor = KeyedTable::new(
        "age_factor",
        vec![Dimension::interval("age")],
        vec!["age_factor".to_string()],
        vec![
            TableRow::new(vec![KeyCell::Interval(16.0, 24.0)], vec![1.3.into()]),
            TableRow::new(vec![KeyCell::Interval(25.0, 69.0)], vec![1.0.into()]),
            TableRow::new(vec![KeyCell::Wildcard], vec![1.5.into()]),
        ],
    )
    .unwrap();

    let base_rate = KeyedTable::new(
        "base_rate",
        vec![],
        vec!["base_rate".to_string()],
        vec![TableRow::new(vec![], vec![100.0.into()])],
    )
    .unwrap();

    let premium: CustomFn = Arc::new(|ctx| {
        (ctx.get("base_rate")? * ctx.get("age_factor")?).into_frame("premium")
    });

    let mut plan = Plan::new("auto");
    plan.add_table(age_factor).unwrap();
    plan.add_table(base_rate).unwrap();
    plan.register(Step::custom("premium", premium)).unwrap();
    plan
}

fn premiums(session: &ratekit::Session) -> Vec<Value> {
    session
        .result("premium")
        .unwrap()
        .column("premium")
        .unwrap()
        .values
        .clone()
}

#[test]
fn sequential_run_rates_every_driver() {
    let engine = Engine::default();
    let session = engine.run(&rating_plan(), driver_book(), false).unwrap();

    assert_eq!(session.len(), 3);
    let got = premiums(&session);
    // 19 is in the young band, 35 in the adult band, 70 hits the fallback
    assert_eq!(got[0], Value::Num(130.0));
    assert_eq!(got[1], Value::Num(100.0));
    assert_eq!(got[2], Value::Num(150.0));
}

#[test]
fn parallel_run_produces_the_same_session() {
    let engine = Engine::new(ExecConfig {
        workers: Some(3),
        ..ExecConfig::default()
    });
    let plan = rating_plan();
    let seq = engine.run(&plan, driver_book(), false).unwrap();
    let par = engine.run(&plan, driver_book(), true).unwrap();

    assert_eq!(premiums(&seq), premiums(&par));
    let seq_names: Vec<&str> = seq.result_names().collect();
    assert_eq!(seq_names.len(), par.result_names().count());
}

#[test]
fn inferred_inputs_wire_the_custom_step_downstream() {
    let plan = rating_plan();
    let step = plan.get("premium").unwrap();
    assert_eq!(step.inputs(), &["base_rate", "age_factor"]);

    let order = plan.graph().static_order().unwrap();
    let pos = |n: &str| order.iter().position(|x| x == n).unwrap();
    assert!(pos("age_factor") < pos("premium"));
    assert!(pos("base_rate") < pos("premium"));
}

#[test]
fn engine_config_deserializes_and_runs() {
    let cfg: ExecConfig =
        serde_json::from_str(r#"{"workers": 2, "poll_timeout_ms": 10}"#).unwrap();
    let session = Engine::new(cfg)
        .run(&rating_plan(), driver_book(), true)
        .unwrap();
    assert_eq!(premiums(&session).len(), 3);
}

#[test]
fn intermediate_results_are_resolvable_by_column() {
    let engine = Engine::default();
    let session = engine.run(&rating_plan(), driver_book(), false).unwrap();

    use ratekit::Resolve;
    let factor = session.get("age_factor").unwrap();
    assert_eq!(factor.keys(), &["driver_id"]);
    assert_eq!(factor.column("age_factor").unwrap().values[2], Value::Num(1.5));
}
