use acis::{date_range, CsvStream, DataResult, Interval, Query, StreamLayout};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::{json, Value};
use std::io::Cursor;

fn multi_site_query(sites: u64) -> Query {
    let rows: Vec<Value> = (0..366).map(|i| json!([i.to_string(), "M", ["0.01", "A"]])).collect();
    let data: Vec<Value> = (0..sites)
        .map(|uid| json!({"meta": {"uid": uid, "name": format!("SITE {}", uid)}, "data": rows}))
        .collect();
    Query::new(
        json!({"sids": "okc", "sdate": "2012-01-01", "edate": "2012-12-31", "elems": "maxt,mint,pcpn"}),
        json!({ "data": data }),
    )
}

fn bench_normalize(c: &mut Criterion) {
    c.bench_function("date_range_daily_decade", |b| {
        b.iter(|| date_range(black_box("2000-01-01"), Some("2009-12-31"), &Interval::Daily).map(|r| r.count()))
    });

    let query = multi_site_query(50);
    c.bench_function("multi_stn_data_normalize", |b| {
        b.iter(|| DataResult::multi_stn_data(black_box(&query)))
    });

    let Ok(result) = DataResult::multi_stn_data(&query) else {
        return;
    };
    c.bench_function("multi_stn_data_iterate", |b| b.iter(|| black_box(&result).iter().count()));

    let body: String = std::iter::once("OKLAHOMA CITY\n".to_string())
        .chain((1..=28).map(|d| format!("2012-02-{:02},50,28,0.00\n", d)))
        .collect();
    c.bench_function("csv_stream_single_site", |b| {
        b.iter(|| {
            CsvStream::open(
                Cursor::new(black_box(body.as_str())),
                StreamLayout::SingleSite { sid: "okc".into() },
                vec!["maxt".into(), "mint".into(), "pcpn".into()],
            )
            .map(|stream| stream.count())
        })
    });
}

criterion_group!(benches, bench_normalize);
criterion_main!(benches);
