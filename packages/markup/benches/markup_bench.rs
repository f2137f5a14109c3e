use criterion::{black_box, criterion_group, criterion_main, Criterion};
use folio_markup::{parse, serialize};

const ARTICLE: &str = r#"
<h1>Release notes</h1>
<p>This release brings <strong>tables</strong>, <em>image alignment</em> and a source view.</p>
<p><img src="https://cdn.example.com/hero.png" alt="Hero" class="align-center" width="640" height="320"></p>
<ul><li><p>Faster parsing</p></li><li><p>Fewer <code>surprises</code></p></li></ul>
<blockquote><p>Quoted text with a<br>hard break</p></blockquote>
<table><tbody><tr><th><p>Name</p></th><th><p>Value</p></th></tr><tr><td><p>a</p></td><td><p>1</p></td></tr></tbody></table>
<div class="embed"><iframe src="https://video.example.com/1"></iframe></div>
"#;

fn parse_article(c: &mut Criterion) {
    c.bench_function("parse_article", |b| b.iter(|| parse(black_box(ARTICLE))));
}

fn serialize_article(c: &mut Criterion) {
    let doc = parse(ARTICLE);

    c.bench_function("serialize_article", |b| b.iter(|| serialize(black_box(&doc))));
}

fn parse_large_document(c: &mut Criterion) {
    let source = ARTICLE.repeat(200);

    c.bench_function("parse_large_document", |b| {
        b.iter(|| parse(black_box(&source)))
    });
}

fn round_trip(c: &mut Criterion) {
    c.bench_function("round_trip", |b| {
        b.iter(|| {
            let doc = parse(black_box(ARTICLE));
            serialize(&doc)
        })
    });
}

criterion_group!(
    benches,
    parse_article,
    serialize_article,
    parse_large_document,
    round_trip
);
criterion_main!(benches);
