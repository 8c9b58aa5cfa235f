use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use flight_booking::models::{Endpoint, FlightOffer, Money, Segment};
use flight_booking::offers::{sort_offers, CurrencyConverter, SortKey, SortOrder};
use rand::{thread_rng, Rng};
use rust_decimal::Decimal;

// Random mix of INR and USD offers on one route
fn random_offers(count: usize) -> Vec<FlightOffer> {
    let mut rng = thread_rng();
    let day = NaiveDate::from_ymd_opt(2026, 11, 20).expect("valid date");

    (0..count)
        .map(|i| {
            let departure = day.and_hms_opt(rng.gen_range(0..20), 0, 0).expect("valid time");
            let arrival = departure + chrono::Duration::minutes(rng.gen_range(60..300));
            let segment = Segment {
                carrier_code: "AI".to_string(),
                flight_number: format!("{}", 100 + i),
                departure: Endpoint {
                    airport_code: "DEL".to_string(),
                    at: departure,
                },
                arrival: Endpoint {
                    airport_code: "BOM".to_string(),
                    at: arrival,
                },
                duration: "PT2H15M".to_string(),
            };
            let price = if rng.gen_bool(0.5) {
                Money::new(Decimal::from(rng.gen_range(2_000i64..20_000)), "INR")
            } else {
                Money::new(Decimal::new(rng.gen_range(2_500i64..25_000), 2), "USD")
            };
            let seats = if rng.gen_bool(0.9) {
                Some(rng.gen_range(1..10))
            } else {
                None
            };
            FlightOffer::new(i.to_string(), vec![segment], None, price, seats)
                .expect("generated offer is valid")
        })
        .collect()
}

pub fn offer_sort_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("offer_sort");
    let converter = CurrencyConverter::default();

    for count in [10, 100, 1_000].iter() {
        let offers = random_offers(*count);

        group.bench_with_input(BenchmarkId::new("price", count), &offers, |b, offers| {
            b.iter(|| {
                sort_offers(
                    black_box(offers),
                    SortKey::Price,
                    SortOrder::Ascending,
                    &converter,
                )
            })
        });

        group.bench_with_input(BenchmarkId::new("seats_desc", count), &offers, |b, offers| {
            b.iter(|| {
                sort_offers(
                    black_box(offers),
                    SortKey::Seats,
                    SortOrder::Descending,
                    &converter,
                )
            })
        });
    }

    group.finish();
}

criterion_group!(benches, offer_sort_benchmark);
criterion_main!(benches);
