use RustedCalc::engine::calc_engine::CalcEngine;
use RustedCalc::engine::operations::{Bounds, Operation, OperationRequest};
use RustedCalc::engine::results::PlotRequest;
use RustedCalc::symbolic::parse_expr::parse;
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn bench_parse(c: &mut Criterion) {
    let text = "2x^2*sin(3x + 1) - exp(-x/2)*log(x^2 + 1) + sqrt(x*y)/(1 + y**2)";
    c.bench_function("parse", |b| b.iter(|| parse(black_box(text))));
}

fn bench_sample(c: &mut Criterion) {
    let engine = CalcEngine::default();
    let line = PlotRequest::line(-10.0, 10.0, 2000);
    c.bench_function("sample 1D, 2000 points", |b| {
        b.iter(|| engine.sample_text(black_box("sin(x)*exp(-x^2/10)"), &line))
    });
    let surface = PlotRequest::surface((-3.0, 3.0), 200, (-3.0, 3.0), 200);
    c.bench_function("sample 2D, 200x200", |b| {
        b.iter(|| engine.sample_text(black_box("sin(x)*cos(y)"), &surface))
    });
}

fn bench_evaluate(c: &mut Criterion) {
    let engine = CalcEngine::default();
    let mut group = c.benchmark_group("evaluate");
    let requests = [
        ("simplify", OperationRequest::simple("(x + 1)^2 - x^2 + x/2 + x/3", Operation::Simplify)),
        ("differentiate", OperationRequest::simple("x^3*sin(x)*exp(x)", Operation::Differentiate)),
        ("integrate", OperationRequest::simple("x^2*exp(-x)", Operation::Integrate)),
        ("solve", OperationRequest::simple("x^5 - 3*x + 1", Operation::Solve)),
        (
            "definite_int",
            OperationRequest::new("exp(-x^2)", Operation::DefiniteInt, "x", Some(Bounds::interval(0.0, 2.0))),
        ),
    ];
    for (name, request) in requests {
        let Ok(request) = request else { continue };
        group.bench_function(name, |b| b.iter(|| engine.evaluate(black_box(&request))));
    }
    group.finish();
}

criterion_group!(benches, bench_parse, bench_sample, bench_evaluate);
criterion_main!(benches);
