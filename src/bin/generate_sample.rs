//! Writes a synthetic heart-health CSV with the columns the report expects,
//! including a `date` column so the trend plot is produced.
//!
//! Usage: `generate_sample [OUTPUT]` (default `data/sample_heart_data.csv`).

use chrono::{Days, NaiveDate};

fn gauss_clamped(rng: &mut SimpleRng, mean: f64, std_dev: f64, lo: f64, hi: f64) -> f64 {
    rng.gauss(mean, std_dev).clamp(lo, hi).round()
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn main() {
    let output = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "data/sample_heart_data.csv".to_string());
    if let Some(parent) = std::path::Path::new(&output).parent() {
        std::fs::create_dir_all(parent).expect("Failed to create output directory");
    }

    let mut rng = SimpleRng::new(42);
    let start = NaiveDate::from_ymd_opt(2023, 1, 1).expect("valid start date");
    let n_patients = 500u64;

    let mut writer = csv::Writer::from_path(&output).expect("Failed to create output file");
    writer
        .write_record([
            "patient_id",
            "date",
            "age",
            "sex",
            "systolic_bp",
            "diastolic_bp",
            "total_cholesterol",
            "smoking",
            "diabetes",
        ])
        .expect("Failed to write header");

    for id in 0..n_patients {
        let age = gauss_clamped(&mut rng, 54.0, 12.0, 18.0, 90.0);
        // Pressure and cholesterol drift upwards with age.
        let age_effect = (age - 54.0) * 0.5;
        let systolic = gauss_clamped(&mut rng, 128.0 + age_effect, 16.0, 85.0, 210.0);
        let diastolic = gauss_clamped(&mut rng, 0.45 * systolic + 22.0, 7.0, 50.0, 130.0);
        let cholesterol = gauss_clamped(&mut rng, 195.0 + age_effect, 35.0, 110.0, 350.0);
        let sex = if rng.chance(0.5) { "Male" } else { "Female" };
        let date = start + Days::new(id * 365 / n_patients);

        writer
            .write_record([
                id.to_string(),
                date.format("%Y-%m-%d").to_string(),
                format!("{age:.0}"),
                sex.to_string(),
                format!("{systolic:.0}"),
                format!("{diastolic:.0}"),
                format!("{cholesterol:.0}"),
                u8::from(rng.chance(0.3)).to_string(),
                u8::from(rng.chance(0.15)).to_string(),
            ])
            .expect("Failed to write row");
    }
    writer.flush().expect("Failed to flush output");

    println!("Wrote {n_patients} patients to {output}");
}
