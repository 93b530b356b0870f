//! Synthetic airline reviews for exercising the pipeline.
//!
//! Each review is one JSON object per line on stdout, ready to be forwarded to
//! the event hub by whatever sender the operator prefers.
use anyhow::{Context, Result};
use chrono::{Datelike, Local, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::io::Write;
use std::time::Duration;

pub const AIRLINES: [&str; 12] = [
    "Air France",
    "Royal Air Maroc",
    "Air Arabia",
    "Emirates",
    "Saudia",
    "Ryanair",
    "Qatar Airways",
    "Lufthansa",
    "TAP Air Portugal",
    "KLM",
    "Turkish Airlines",
    "EasyJet",
];

const TITLES: [&str; 16] = [
    "Excellent experience",
    "Terrible flight",
    "Smooth journey",
    "Great service",
    "Awful food",
    "Lost luggage",
    "On-time and comfortable",
    "Never again",
    "Highly recommended",
    "Mediocre experience",
    "Delayed and frustrating",
    "Crew was amazing",
    "Unexpectedly good",
    "Total disappointment",
    "Worth every penny",
    "Terrible customer service",
];

const BODIES: [&str; 16] = [
    "The flight was on time and the crew was extremely helpful and friendly.",
    "I had the worst experience ever. The staff was rude and the plane was dirty.",
    "Seats were comfortable and there was plenty of legroom. Great value for the money.",
    "The food served on board was awful. Cold and tasteless.",
    "We departed late but arrived early. Impressive time management.",
    "Customer service was unreachable and offered no help with my issue.",
    "The cabin was clean and the inflight entertainment was decent.",
    "I will never book with this airline again. Completely unprofessional.",
    "Everything went smoothly. Luggage arrived on time and check-in was fast.",
    "Very noisy cabin and poor handling of turbulence.",
    "The flight attendants were polite and always smiling. It made a difference.",
    "They lost my suitcase and it took over a week to get it back.",
    "Boarding process was chaotic and disorganized.",
    "It was a short flight but surprisingly comfortable. Would fly again.",
    "They overbooked the flight and bumped me off. Unacceptable.",
    "Inflight entertainment was outdated and barely worked.",
];

const FIRST_NAMES: [&str; 12] = [
    "Amina", "Lucas", "Fatima", "Noah", "Yasmine", "Hugo", "Sofia", "Omar", "Chloe", "Mehdi",
    "Ines", "Thomas",
];

const LAST_NAMES: [&str; 12] = [
    "Benali", "Martin", "El Idrissi", "Dubois", "Haddad", "Moreau", "Silva", "Rossi", "Laurent",
    "Ait Said", "Fischer", "Bernard",
];

/// One generated review, matching the document shape the function stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Review {
    pub review_id: String,
    pub airline: String,
    pub reviewer: String,
    pub rating: u8,
    pub date: String,
    pub title: String,
    pub body: String,
}

/// Review source with an injectable RNG and reference date.
pub struct ReviewGenerator<R: Rng> {
    rng: R,
    today: NaiveDate,
}

impl ReviewGenerator<StdRng> {
    /// Seeded generator for reproducible output; unseeded uses OS entropy.
    pub fn new(seed: Option<u64>, today: NaiveDate) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng, today }
    }
}

impl<R: Rng> ReviewGenerator<R> {
    pub fn generate(&mut self) -> Review {
        let mut id_bytes = [0u8; 16];
        self.rng.fill(&mut id_bytes);
        let review_id = uuid::Builder::from_random_bytes(id_bytes)
            .into_uuid()
            .to_string();
        Review {
            review_id,
            airline: pick(&mut self.rng, &AIRLINES),
            reviewer: format!(
                "{} {}",
                pick(&mut self.rng, &FIRST_NAMES),
                pick(&mut self.rng, &LAST_NAMES)
            ),
            rating: self.rng.gen_range(1..=5),
            date: self.date_this_year().format("%Y-%m-%d").to_string(),
            title: pick(&mut self.rng, &TITLES),
            body: pick(&mut self.rng, &BODIES),
        }
    }

    /// Uniform date between January 1st and today.
    fn date_this_year(&mut self) -> NaiveDate {
        let offset = self.rng.gen_range(0..self.today.ordinal());
        NaiveDate::from_yo_opt(self.today.year(), offset + 1).unwrap_or(self.today)
    }
}

fn pick<R: Rng>(rng: &mut R, items: &[&str]) -> String {
    items.choose(rng).copied().unwrap_or_default().to_string()
}

/// Emit `count` reviews (0 = unbounded) with `interval` between them.
pub fn stream_reviews<W: Write>(
    out: &mut W,
    count: u64,
    interval: Duration,
    seed: Option<u64>,
) -> Result<()> {
    let mut generator = ReviewGenerator::new(seed, Local::now().date_naive());
    let mut emitted = 0u64;
    loop {
        let review = generator.generate();
        let line = serde_json::to_string(&review).context("serialize review")?;
        writeln!(out, "{line}").context("write review")?;
        out.flush().context("flush review output")?;
        emitted += 1;
        tracing::debug!(review_id = %review.review_id, emitted, "review generated");
        if count != 0 && emitted >= count {
            return Ok(());
        }
        std::thread::sleep(interval);
    }
}
