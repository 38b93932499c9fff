use criterion::{Criterion, black_box, criterion_group, criterion_main};
use pwcheck_breach::{HashDataset, sha1_hex_upper};

// Commonly used passwords, all present in the embedded dataset.
const COMMON_PASSWORDS: &[&str] = &[
    "123456",
    "password",
    "123456789",
    "12345678",
    "qwerty",
    "abc123",
    "password1",
    "111111",
    "iloveyou",
    "sunshine",
];

// Random ULIDs, never present.
const RANDOM_PASSWORDS: &[&str] = &[
    "01KFC4WS41FAJ3ACEJXTF8HV44",
    "01KFC4WS42PTGBA3M7VAF27C13",
    "01KFC4WS421ZQX52RVBY33X00H",
    "01KFC4WS42PCR9YS9BE5H07J2N",
    "01KFC4WS422QH0NCA4V9GTDJM0",
    "01KFC4WS420YDDKKP1R6PB3306",
    "01KFC4WS42SA1YYSWB0EJBHZ17",
    "01KFC4WS42YE2HH2JCZQY4GCXC",
    "01KFC4WS42RY3P99C454YQ2RRE",
    "01KFC4WS43SEKHX766ZNXC6619",
];

/// A dataset roughly the size of a large offline dump slice.
fn large_dataset() -> HashDataset {
    let hashes = (0..100_000).map(|i| sha1_hex_upper(&format!("generated-{i}")));
    HashDataset::new("bench", hashes).unwrap()
}

fn bench_global_dataset(c: &mut Criterion) {
    let dataset = HashDataset::global().unwrap();

    c.bench_function("global_mixed_20", |b| {
        b.iter(|| {
            for password in COMMON_PASSWORDS.iter().chain(RANDOM_PASSWORDS.iter()) {
                black_box(dataset.contains_password(black_box(password)).unwrap());
            }
        })
    });
}

fn bench_large_dataset(c: &mut Criterion) {
    let dataset = large_dataset();

    c.bench_function("large_random_10", |b| {
        b.iter(|| {
            for password in RANDOM_PASSWORDS {
                black_box(dataset.contains_password(black_box(password)).unwrap());
            }
        })
    });
}

criterion_group!(benches, bench_global_dataset, bench_large_dataset);
criterion_main!(benches);
