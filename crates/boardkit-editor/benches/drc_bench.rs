use boardkit_core::{NetId, Point};
use boardkit_editor::build::JobContext;
use boardkit_editor::model::{BoardItem, Document, ItemData, LayerId, Net, Plane, Polygon, Trace, Via};
use boardkit_editor::{BoardCommand, DrcJob, PlaneJob, UndoLog};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Point> {
    vec![
        Point::new(x0, y0),
        Point::new(x1, y0),
        Point::new(x1, y1),
        Point::new(x0, y1),
    ]
}

/// A square board with `rows` horizontal buses of traces and vias,
/// alternating between nets, plus a ground plane on the bottom.
fn synthetic_board(rows: usize) -> Document {
    let mut doc = Document::new("Bench");
    let mut undo = UndoLog::new(4);
    let size = rows as f64 + 10.0;

    let nets: Vec<Net> = (0..4)
        .map(|i| Net {
            id: NetId::new(),
            name: format!("N{}", i),
        })
        .collect();
    let ids: Vec<NetId> = nets.iter().map(|n| n.id).collect();
    for net in nets {
        undo.execute(BoardCommand::AddNet(net), &mut doc).unwrap();
    }

    let mut items = vec![
        BoardItem::new(ItemData::Polygon(Polygon {
            layer: LayerId::BoardOutline,
            path: rect(0.0, 0.0, size, size),
            width: 0.0,
            filled: true,
        })),
        BoardItem::new(ItemData::Plane(Plane {
            layer: LayerId::BottomCopper,
            net: Some(ids[0]),
            outline: rect(1.0, 1.0, size - 1.0, size - 1.0),
            min_width: 0.2,
            clearance: 0.3,
            priority: 0,
            keep_orphans: false,
        })),
    ];
    for row in 0..rows {
        let y = 5.0 + row as f64;
        let net = ids[row % ids.len()];
        for col in 0..4 {
            let x = 5.0 + col as f64 * (rows as f64 / 4.0);
            let end = Point::new(x + rows as f64 / 4.0 - 0.5, y);
            items.push(BoardItem::new(ItemData::Trace(Trace {
                layer: LayerId::TopCopper,
                net: Some(net),
                start: Point::new(x, y),
                end,
                width: 0.25,
            })));
            items.push(BoardItem::new(ItemData::Via(Via {
                position: end,
                size: 0.7,
                drill: 0.3,
                net: Some(net),
            })));
        }
    }
    undo.execute(BoardCommand::AddItems(items), &mut doc).unwrap();
    doc
}

fn bench_drc(c: &mut Criterion) {
    let mut group = c.benchmark_group("drc");
    for rows in [20, 80] {
        let doc = synthetic_board(rows);
        group.bench_with_input(BenchmarkId::new("quick", rows), &doc, |b, doc| {
            b.iter(|| {
                DrcJob::new(black_box(doc), true)
                    .execute(&JobContext::detached())
                    .unwrap()
            })
        });
        group.bench_with_input(BenchmarkId::new("full", rows), &doc, |b, doc| {
            b.iter(|| {
                DrcJob::new(black_box(doc), false)
                    .execute(&JobContext::detached())
                    .unwrap()
            })
        });
    }
    group.finish();
}

fn bench_planes(c: &mut Criterion) {
    let doc = synthetic_board(80);
    c.bench_function("planes_all_layers", |b| {
        b.iter(|| {
            let mut snapshot = doc.clone();
            PlaneJob::create(&mut snapshot, None, true)
                .unwrap()
                .compute(&JobContext::detached())
                .unwrap()
        })
    });
}

criterion_group!(benches, bench_drc, bench_planes);
criterion_main!(benches);
