//! Criterion benchmarks for the extraction hot paths.
//!
//! Covers:
//! - Page body extraction (`core::extract::extract_page_body`)
//! - Index tree parsing (`core::extract::extract_index_tree`)
//! - Slug generation (`util::text::slugify`)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use shamela::core::extract::{extract_index_tree, extract_page_body};
use shamela::util::text::slugify;

fn sample_page_html(paragraphs: usize) -> String {
    let mut body = String::from("<html><head><title>صفحة: 5</title></head><body><div class=\"nass\">");
    for i in 0..paragraphs {
        body.push_str(&format!(
            "<p>هذا نص تجريبي لفقرة رقم {i} يحتوي على كلمات كافية لاختبار الأداء أثناء الاستخراج.</p>"
        ));
    }
    body.push_str("</div></body></html>");
    body
}

fn sample_index_html(chapters: usize, children_per_chapter: usize) -> String {
    let mut list = String::from("<html><body><div class=\"betaka-index\"><ul>");
    for c in 0..chapters {
        list.push_str(&format!("<li><a href=\"/book/43/{}\">الفصل {c}</a>", c * 10 + 1));
        if children_per_chapter > 0 {
            list.push_str("<ul>");
            for s in 0..children_per_chapter {
                list.push_str(&format!(
                    "<li><a href=\"/book/43/{}\">فرع {s}</a></li>",
                    c * 10 + 2 + s
                ));
            }
            list.push_str("</ul>");
        }
        list.push_str("</li>");
    }
    list.push_str("</ul></div></body></html>");
    list
}

fn bench_extract_page_body(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_page_body");
    for paragraphs in [10usize, 100, 500] {
        let html = sample_page_html(paragraphs);
        group.throughput(Throughput::Bytes(html.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(paragraphs), &html, |b, html| {
            b.iter(|| {
                let doc = scraper::Html::parse_document(html);
                black_box(extract_page_body(&doc))
            });
        });
    }
    group.finish();
}

fn bench_extract_index_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_index_tree");
    for chapters in [20usize, 200] {
        let html = sample_index_html(chapters, 5);
        group.bench_with_input(BenchmarkId::from_parameter(chapters), &html, |b, html| {
            b.iter(|| {
                let doc = scraper::Html::parse_document(html);
                black_box(extract_index_tree(&doc, "43"))
            });
        });
    }
    group.finish();
}

fn bench_slugify(c: &mut Criterion) {
    let title = "كتاب: شرح ديوان المتنبي - الطبعة الثالثة";
    c.bench_function("slugify", |b| b.iter(|| black_box(slugify(title))));
}

criterion_group!(benches, bench_extract_page_body, bench_extract_index_tree, bench_slugify);
criterion_main!(benches);
