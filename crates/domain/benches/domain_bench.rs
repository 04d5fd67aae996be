use std::collections::BTreeMap;

use chrono::Utc;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use domain::{
    CartItem, CaviarDetails, CustomerInfoInput, DeliveryInfoInput, Money, NewOrder, NewProduct,
    NewVariant, Order, Product, ProductId, ShelfLife, VariantId,
};

fn make_cart(lines: usize) -> NewOrder {
    NewOrder {
        customer_info: CustomerInfoInput {
            full_name: "Bench Customer".into(),
            phone: "+380000000000".into(),
            ..Default::default()
        },
        delivery_info: DeliveryInfoInput {
            delivery_type: "courier".into(),
            country: "UA".into(),
            city: "Kyiv".into(),
            address: "Khreshchatyk 1".into(),
            ..Default::default()
        },
        items: (0..lines)
            .map(|i| {
                CartItem::new(
                    ProductId::new(),
                    VariantId::new(),
                    (i % 5 + 1) as i32,
                    Money::new(1_000 + i as i64, "UAH"),
                )
            })
            .collect(),
        notes: String::new(),
    }
}

fn bench_order_from_cart(c: &mut Criterion) {
    let mut group = c.benchmark_group("domain/order_from_cart");

    for lines in [1usize, 10, 50] {
        let cart = make_cart(lines);
        group.bench_with_input(BenchmarkId::from_parameter(lines), &cart, |b, cart| {
            b.iter(|| Order::from_cart(cart.clone()).unwrap());
        });
    }

    group.finish();
}

fn bench_product_create(c: &mut Criterion) {
    let input = NewProduct {
        slug: "bench-caviar".into(),
        name: "Bench caviar".into(),
        subtitle: "Benchmark".into(),
        description: String::new(),
        variants: (1..=4)
            .map(|i| NewVariant {
                mass: 50 * i,
                stock: 100,
                prices: BTreeMap::from([
                    ("ua".to_string(), Money::new(100_000, "UAH")),
                    ("eu".to_string(), Money::new(2_500, "EUR")),
                ]),
            })
            .collect(),
        details: CaviarDetails {
            fish_age: "10 years".into(),
            grain_size: "3 mm".into(),
            color: "black".into(),
            taste: "buttery".into(),
            texture: "soft".into(),
            shelf_life: ShelfLife {
                duration: "4 months".into(),
                ..Default::default()
            },
        },
    };

    c.bench_function("domain/product_create", |b| {
        b.iter(|| Product::create(input.clone(), Utc::now()).unwrap());
    });
}

criterion_group!(benches, bench_order_from_cart, bench_product_create);
criterion_main!(benches);
