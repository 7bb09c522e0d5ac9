use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use clap::Parser;
use parquet::arrow::ArrowWriter;
use serde::Serialize;

/// Write a synthetic FMCG sales table for local development
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Output file; `.parquet` writes Parquet, anything else CSV
    #[arg(default_value = "fmcg_dataset.csv")]
    output: PathBuf,

    /// PRNG seed
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Also emit a few rows with a missing brand or non-numeric sales
    #[arg(long)]
    messy: bool,
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

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[(self.next_u64() % items.len() as u64) as usize]
    }
}

/// One CSV line, named like the dataset header.
#[derive(Debug, Serialize)]
struct SampleRow {
    #[serde(rename = "Brand")]
    brand: String,
    #[serde(rename = "PackType")]
    pack_type: String,
    #[serde(rename = "PPG")]
    ppg: String,
    #[serde(rename = "Channel")]
    channel: String,
    #[serde(rename = "Market")]
    market: String,
    #[serde(rename = "Year")]
    year: i64,
    #[serde(rename = "Month")]
    month: i64,
    #[serde(rename = "SalesValue")]
    sales_value: String,
    #[serde(rename = "Volume")]
    volume: f64,
}

const BRANDS: [(&str, f64); 5] = [
    ("Aurora", 1.6),
    ("Brisk", 1.2),
    ("Crestline", 1.0),
    ("Dewdrop", 0.7),
    ("Evergreen", 0.4),
];
const PACK_TYPES: [&str; 3] = ["Pouch", "Bottle", "Can"];
const PPGS: [&str; 4] = ["Small Single", "Small Multi", "Large Single", "Large Multi"];
const CHANNELS: [&str; 3] = ["Retail", "Wholesale", "E-commerce"];
const MARKETS: [&str; 4] = ["North", "South", "East", "West"];
const YEARS: [i64; 3] = [2021, 2022, 2023];

fn generate(seed: u64, messy: bool) -> Vec<SampleRow> {
    let mut rng = SimpleRng::new(seed);
    let mut rows = Vec::new();

    for &year in &YEARS {
        let growth = 1.0 + 0.08 * (year - YEARS[0]) as f64;
        for month in 1..=12_i64 {
            // Mild seasonality: peaks mid-year.
            let season = 1.0 + 0.25 * ((month as f64 - 1.0) / 11.0 * std::f64::consts::PI).sin();
            for &(brand, weight) in &BRANDS {
                let volume = (200.0 + 300.0 * rng.next_f64()) * weight * growth * season;
                let price = 2.5 + rng.next_f64();
                rows.push(SampleRow {
                    brand: brand.to_string(),
                    pack_type: rng.pick(&PACK_TYPES).to_string(),
                    ppg: rng.pick(&PPGS).to_string(),
                    channel: rng.pick(&CHANNELS).to_string(),
                    market: rng.pick(&MARKETS).to_string(),
                    year,
                    month,
                    sales_value: format!("{:.2}", volume * price),
                    volume: (volume * 100.0).round() / 100.0,
                });
            }
        }
    }

    if messy {
        for (i, row) in rows.iter_mut().enumerate() {
            if i % 97 == 13 {
                row.brand.clear();
            }
            if i % 131 == 7 {
                row.sales_value = "n/a".to_string();
            }
        }
    }
    rows
}

fn write_csv(path: &Path, rows: &[SampleRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    for row in rows {
        writer.serialize(row).context("writing CSV row")?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

fn write_parquet(path: &Path, rows: &[SampleRow]) -> Result<()> {
    let text = |f: fn(&SampleRow) -> &str| {
        StringArray::from(
            rows.iter()
                .map(|r| Some(f(r)).filter(|s| !s.is_empty()))
                .collect::<Vec<_>>(),
        )
    };

    let schema = Arc::new(Schema::new(vec![
        Field::new("Brand", DataType::Utf8, true),
        Field::new("PackType", DataType::Utf8, false),
        Field::new("PPG", DataType::Utf8, false),
        Field::new("Channel", DataType::Utf8, false),
        Field::new("Market", DataType::Utf8, false),
        Field::new("Year", DataType::Int64, false),
        Field::new("Month", DataType::Int64, false),
        Field::new("SalesValue", DataType::Float64, true),
        Field::new("Volume", DataType::Float64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(text(|r| r.brand.as_str())),
            Arc::new(text(|r| r.pack_type.as_str())),
            Arc::new(text(|r| r.ppg.as_str())),
            Arc::new(text(|r| r.channel.as_str())),
            Arc::new(text(|r| r.market.as_str())),
            Arc::new(Int64Array::from(rows.iter().map(|r| r.year).collect::<Vec<_>>())),
            Arc::new(Int64Array::from(rows.iter().map(|r| r.month).collect::<Vec<_>>())),
            Arc::new(Float64Array::from(
                rows.iter()
                    .map(|r| r.sales_value.parse::<f64>().ok())
                    .collect::<Vec<_>>(),
            )),
            Arc::new(Float64Array::from(rows.iter().map(|r| r.volume).collect::<Vec<_>>())),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let rows = generate(args.seed, args.messy);
    let is_parquet = args
        .output
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("parquet"));

    if is_parquet {
        write_parquet(&args.output, &rows)?;
    } else {
        write_csv(&args.output, &rows)?;
    }
    log::info!("wrote {} rows to {}", rows.len(), args.output.display());
    println!("Wrote {} rows to {}", rows.len(), args.output.display());
    Ok(())
}
