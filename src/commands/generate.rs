//! Generate synthetic route files for benchmarking `tripmerge merge`.
//!
//! Features:
//! - Any number of files, each listing persons by non-decreasing departure
//! - Departures drawn as a Poisson process over a time horizon, so files are
//!   written sorted in one pass with O(1) memory
//! - A configurable share of persons ride in vehicles defined right before them
//! - Deterministic reproducibility via seed (file `i` uses `seed + i`)
//! - Files are written to a temporary name and renamed once complete

use crate::routes::{Result, RouteError};
use crate::streaming::{ROUTES_FOOTER, ROUTES_HEADER};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::NamedTempFile;
use tracing::info;

/// Buffer size for I/O operations (8MB for better throughput)
const BUF_SIZE: usize = 8 * 1024 * 1024;

/// Number of distinct edge ids routes are drawn from.
const EDGE_COUNT: u32 = 10_000;

/// Size specification (parses 1K, 1M, etc.).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeSpec {
    pub count: u64,
}

impl SizeSpec {
    /// Parse size from string (e.g., "1K", "5M", "100").
    pub fn from_str(s: &str) -> Option<Self> {
        let s = s.trim().to_uppercase();
        if s.is_empty() {
            return None;
        }

        let (num_part, multiplier) = if let Some(n) = s.strip_suffix('K') {
            (n, 1_000u64)
        } else if let Some(n) = s.strip_suffix('M') {
            (n, 1_000_000u64)
        } else if let Some(n) = s.strip_suffix('G') {
            (n, 1_000_000_000u64)
        } else {
            (s.as_str(), 1u64)
        };

        num_part
            .parse::<u64>()
            .ok()
            .and_then(|n| n.checked_mul(multiplier))
            .map(|count| Self { count })
    }

    /// Format size for display.
    pub fn display(&self) -> String {
        format_count(self.count)
    }
}

/// Configuration for the generate command.
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    pub output_dir: PathBuf,
    /// Number of route files to write
    pub files: usize,
    /// Persons per file
    pub persons: u64,
    pub seed: u64,
    /// Upper bound on vehicles defined before a riding person
    pub max_vehicles: u32,
    /// Share of persons that ride (the rest walk and get no vehicle)
    pub ride_share: f64,
    /// Departures are spread over `[0, horizon)` seconds on average
    pub horizon: f64,
    pub force: bool,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./tripmerge_bench_data"),
            files: 4,
            persons: 100_000,
            seed: 42,
            max_vehicles: 2,
            ride_share: 0.6,
            horizon: 86_400.0,
            force: false,
        }
    }
}

impl GenerateConfig {
    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.ride_share) {
            return Err(RouteError::InvalidArgument(format!(
                "ride share must be within 0..=1, got {}",
                self.ride_share
            )));
        }
        if !(self.horizon.is_finite() && self.horizon > 0.0) {
            return Err(RouteError::InvalidArgument(format!(
                "horizon must be a positive number of seconds, got {}",
                self.horizon
            )));
        }
        Ok(())
    }
}

/// Statistics from generate operation.
#[derive(Debug, Default, Clone)]
pub struct GenerateStats {
    pub total_files: usize,
    pub skipped_files: usize,
    pub total_persons: u64,
    pub total_vehicles: u64,
    pub elapsed_secs: f64,
}

impl std::fmt::Display for GenerateStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} persons and {} vehicles in {} files, {} skipped ({:.1}s)",
            format_count(self.total_persons),
            format_count(self.total_vehicles),
            self.total_files,
            self.skipped_files,
            self.elapsed_secs
        )
    }
}

/// Generate command.
pub struct GenerateCommand {
    config: GenerateConfig,
}

impl GenerateCommand {
    /// Create a new generate command with the given config.
    pub fn new(config: GenerateConfig) -> Self {
        Self { config }
    }

    /// Path of the `index`-th generated file.
    pub fn file_path(&self, index: usize) -> PathBuf {
        self.config
            .output_dir
            .join(format!("routes_{:03}.rou.xml", index))
    }

    /// Run the generation.
    pub fn run(&self) -> Result<GenerateStats> {
        self.config.validate()?;
        let start = Instant::now();
        let mut stats = GenerateStats::default();

        fs::create_dir_all(&self.config.output_dir)?;
        info!(output = %self.config.output_dir.display(), "generating route files");

        for index in 0..self.config.files {
            let path = self.file_path(index);
            if !self.config.force && path.exists() {
                info!(path = %path.display(), "skipping (file exists, use --force to overwrite)");
                stats.skipped_files += 1;
                continue;
            }

            let mut rng = SmallRng::seed_from_u64(self.config.seed.wrapping_add(index as u64));
            let vehicles = self.generate_file(&path, index, &mut rng)?;
            info!(path = %path.display(), vehicles, "saved");

            stats.total_files += 1;
            stats.total_persons += self.config.persons;
            stats.total_vehicles += vehicles;
        }

        stats.elapsed_secs = start.elapsed().as_secs_f64();
        Ok(stats)
    }

    /// Write one route file, returning the number of vehicles it defines.
    fn generate_file(&self, path: &Path, index: usize, rng: &mut SmallRng) -> Result<u64> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let tmp = NamedTempFile::new_in(dir)?;
        let mut writer = BufWriter::with_capacity(BUF_SIZE, tmp);

        let vehicles = self.write_routes(&mut writer, index, rng)?;

        let tmp = writer.into_inner().map_err(|e| e.into_error())?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(vehicles)
    }

    /// Write a complete route document to `out`.
    pub fn write_routes<W: Write>(
        &self,
        out: &mut W,
        index: usize,
        rng: &mut SmallRng,
    ) -> Result<u64> {
        let mut itoa_buf = itoa::Buffer::new();
        let mut ryu_buf = ryu::Buffer::new();
        let prefix = format!("f{}", index);

        // Mean gap of a Poisson process with `persons` arrivals over the horizon
        let mean_gap = self.config.horizon / self.config.persons.max(1) as f64;
        let mut clock = 0.0f64;
        let mut vehicle_id = 0u64;

        out.write_all(ROUTES_HEADER.as_bytes())?;

        for person_id in 0..self.config.persons {
            let u: f64 = rng.gen();
            clock += -(1.0 - u).ln() * mean_gap;
            // Rounding is monotonic, so the file stays sorted
            let depart = (clock * 100.0).round() / 100.0;

            let rides = self.config.max_vehicles > 0 && rng.gen_bool(self.config.ride_share);
            let n_vehicles = if rides {
                rng.gen_range(1..=self.config.max_vehicles)
            } else {
                0
            };

            for _ in 0..n_vehicles {
                let (from, to) = random_edges(rng);
                out.write_all(b"<vehicle id=\"")?;
                out.write_all(prefix.as_bytes())?;
                out.write_all(b"_v")?;
                out.write_all(itoa_buf.format(vehicle_id).as_bytes())?;
                out.write_all(b"\" type=\"passenger\" depart=\"triggered\">\n        <route edges=\"e")?;
                out.write_all(itoa_buf.format(from).as_bytes())?;
                out.write_all(b" e")?;
                out.write_all(itoa_buf.format(to).as_bytes())?;
                out.write_all(b"\"/>\n    </vehicle>\n    ")?;
                vehicle_id += 1;
            }

            let (from, to) = random_edges(rng);
            out.write_all(b"<person id=\"")?;
            out.write_all(prefix.as_bytes())?;
            out.write_all(b"_p")?;
            out.write_all(itoa_buf.format(person_id).as_bytes())?;
            out.write_all(b"\" type=\"pedestrian\" depart=\"")?;
            out.write_all(ryu_buf.format(depart).as_bytes())?;
            out.write_all(b"\">\n        ")?;
            if n_vehicles > 0 {
                out.write_all(b"<ride from=\"e")?;
                out.write_all(itoa_buf.format(from).as_bytes())?;
                out.write_all(b"\" to=\"e")?;
                out.write_all(itoa_buf.format(to).as_bytes())?;
                out.write_all(b"\" lines=\"")?;
                out.write_all(prefix.as_bytes())?;
                out.write_all(b"_v")?;
                out.write_all(itoa_buf.format(vehicle_id - 1).as_bytes())?;
                out.write_all(b"\"/>")?;
            } else {
                out.write_all(b"<walk edges=\"e")?;
                out.write_all(itoa_buf.format(from).as_bytes())?;
                out.write_all(b" e")?;
                out.write_all(itoa_buf.format(to).as_bytes())?;
                out.write_all(b"\"/>")?;
            }
            out.write_all(b"\n    </person>\n")?;
            if person_id + 1 < self.config.persons {
                out.write_all(b"    ")?;
            }
        }

        out.write_all(ROUTES_FOOTER.as_bytes())?;
        out.write_all(b"\n")?;
        Ok(vehicle_id)
    }
}

#[inline]
fn random_edges(rng: &mut SmallRng) -> (u32, u32) {
    (rng.gen_range(0..EDGE_COUNT), rng.gen_range(0..EDGE_COUNT))
}

/// Format count for display (1K, 5M, etc.).
fn format_count(count: u64) -> String {
    if count >= 1_000_000_000 && count % 1_000_000_000 == 0 {
        format!("{}G", count / 1_000_000_000)
    } else if count >= 1_000_000 && count % 1_000_000 == 0 {
        format!("{}M", count / 1_000_000)
    } else if count >= 1_000 && count % 1_000 == 0 {
        format!("{}K", count / 1_000)
    } else {
        count.to_string()
    }
}
