use cart::{CartItemDraft, fingerprint, normalize_list};
use criterion::{Criterion, criterion_group, criterion_main};

fn make_drafts(lines: usize, duplicates: usize) -> Vec<CartItemDraft> {
    let mut drafts = Vec::with_capacity(lines * (duplicates + 1));
    for i in 0..lines {
        for _ in 0..=duplicates {
            drafts.push(CartItemDraft {
                unit_price: Some(9.99 + i as f64),
                currency: Some("eur".to_string()),
                quantity: Some(1.0 + (i % 3) as f64),
                ..CartItemDraft::new(format!("sku-{i}"), format!("  Item {i}  "))
            });
        }
    }
    drafts
}

fn bench_normalize_list(c: &mut Criterion) {
    let drafts = make_drafts(50, 0);
    c.bench_function("cart/normalize_list_50", |b| {
        b.iter(|| normalize_list(drafts.clone()));
    });

    let with_duplicates = make_drafts(50, 2);
    c.bench_function("cart/normalize_list_50_with_duplicates", |b| {
        b.iter(|| normalize_list(with_duplicates.clone()));
    });
}

fn bench_fingerprint(c: &mut Criterion) {
    let items = normalize_list(make_drafts(50, 0));
    c.bench_function("cart/fingerprint_50", |b| {
        b.iter(|| fingerprint(&items));
    });
}

criterion_group!(benches, bench_normalize_list, bench_fingerprint);
criterion_main!(benches);
