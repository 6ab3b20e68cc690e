use rand::{Rng, SeedableRng, rngs::StdRng};
use stencil::{Context, Value};

/// Generate n random contexts to use in the benchmark
pub fn generate_random_contexts(n: usize) -> Vec<Context> {
    let mut rng = StdRng::seed_from_u64(42); // Fixed seed for reproducibility
    let mut contexts = Vec::with_capacity(n);

    for _ in 0..n {
        let user: Value = [
            ("name", Value::from(random_string(&mut rng, 5, 10))),
            ("age", Value::Int(rng.random_range(18..80))),
            ("active", Value::Bool(rng.random_bool(0.7))),
        ]
        .into_iter()
        .collect();

        let items_count = rng.random_range(3..10);
        let items = (0..items_count)
            .map(|_| {
                [
                    ("name", Value::from(random_string(&mut rng, 3, 8))),
                    ("value", Value::Int(rng.random_range(10..1000))),
                    ("special", Value::Bool(rng.random_bool(0.3))),
                ]
                .into_iter()
                .collect::<Value>()
            })
            .collect();

        let mut context = Context::new();
        context
            .insert("user", user)
            .insert("items", Value::Array(items))
            .insert("show_details", rng.random_bool(0.8))
            .insert("has_access", rng.random_bool(0.6));
        contexts.push(context);
    }

    contexts
}

/// Generate a random string with length between min and max
fn random_string(rng: &mut StdRng, min_len: usize, max_len: usize) -> String {
    let charset = "abcdefghijklmnopqrstuvwxyz<>&";
    let len = rng.random_range(min_len..=max_len);

    (0..len)
        .map(|_| {
            let idx = rng.random_range(0..charset.len());
            charset.chars().nth(idx).unwrap()
        })
        .collect()
}

// Print binary size information - can be used from individual benchmarks
pub fn print_binary_size() {
    let binary_path = std::env::current_exe().unwrap();
    let metadata = std::fs::metadata(binary_path.clone()).unwrap();
    let size_bytes = metadata.len();
    let size_kb = size_bytes as f64 / 1024.0;
    let size_mb = size_kb / 1024.0;

    println!(
        "Binary size: {:.2} MB ({:.2} KB, {} bytes)",
        size_mb, size_kb, size_bytes
    );
    println!("Binary path: {}", binary_path.display());
}
