//! Text-format particle I/O.
//!
//! Input files are whitespace-separated ASCII: a four-field header
//! (particle count, start time, end time, time step) followed by one
//! record per particle (`m x y z vx vy vz`). Snapshot files carry a
//! statistics header line, the particle count, and one vector per line
//! in input order. The test-data generator writes files the loader
//! accepts.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::{SimError, SimResult};
use crate::simulation::states::{NVec3, Particle, NDIM};

/// The input file header.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub particle_count: usize,
    pub t_start: f64,
    pub t_end: f64,
    pub dt: f64,
}

impl RunConfig {
    fn validate(&self) -> SimResult<()> {
        if self.particle_count == 0 {
            return Err(SimError::InvalidConfig(
                "particle count must be positive".into(),
            ));
        }
        if !self.t_end.is_finite() || self.t_end <= self.t_start {
            return Err(SimError::InvalidConfig(
                "end time must be greater than start time".into(),
            ));
        }
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(SimError::InvalidConfig("time step must be positive".into()));
        }
        Ok(())
    }
}

fn header_token<'a>(tokens: &mut impl Iterator<Item = &'a str>, what: &str) -> SimResult<&'a str> {
    tokens
        .next()
        .ok_or_else(|| SimError::InvalidConfig(format!("missing {what}")))
}

fn header_real<'a>(tokens: &mut impl Iterator<Item = &'a str>, what: &str) -> SimResult<f64> {
    header_token(tokens, what)?
        .parse()
        .map_err(|_| SimError::InvalidConfig(format!("malformed {what}")))
}

fn parse_header<'a>(tokens: &mut impl Iterator<Item = &'a str>) -> SimResult<RunConfig> {
    let count: i64 = header_token(tokens, "particle count")?
        .parse()
        .map_err(|_| SimError::InvalidConfig("malformed particle count".into()))?;
    if count <= 0 {
        return Err(SimError::InvalidConfig(
            "particle count must be positive".into(),
        ));
    }

    let config = RunConfig {
        particle_count: count as usize,
        t_start: header_real(tokens, "start time")?,
        t_end: header_real(tokens, "end time")?,
        dt: header_real(tokens, "time step")?,
    };
    config.validate()?;
    Ok(config)
}

/// Read and validate the header of an input file.
pub fn read_run_config(path: &Path) -> SimResult<RunConfig> {
    let text = fs::read_to_string(path).map_err(|e| SimError::io(path, e))?;
    parse_header(&mut text.split_ascii_whitespace())
}

fn particle_real<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
    index: usize,
    what: &str,
) -> SimResult<f64> {
    let tok = tokens.next().ok_or_else(|| SimError::InvalidParticle {
        index,
        reason: format!("missing {what}"),
    })?;
    let value: f64 = tok.parse().map_err(|_| SimError::InvalidParticle {
        index,
        reason: format!("malformed {what}: {tok:?}"),
    })?;
    if !value.is_finite() {
        return Err(SimError::InvalidParticle {
            index,
            reason: format!("{what} is not finite"),
        });
    }
    Ok(value)
}

/// Read the particle records of an input file whose header was already
/// read into `config`. Ids are assigned from input order.
pub fn read_particles(path: &Path, config: &RunConfig) -> SimResult<Vec<Particle>> {
    let text = fs::read_to_string(path).map_err(|e| SimError::io(path, e))?;
    let mut tokens = text.split_ascii_whitespace();

    // Skip past the header, which must agree with the one given.
    let header = parse_header(&mut tokens)?;
    if header.particle_count != config.particle_count {
        return Err(SimError::InvalidConfig(format!(
            "particle count changed between reads ({} vs {})",
            header.particle_count, config.particle_count
        )));
    }

    let mut particles = Vec::with_capacity(config.particle_count);
    for i in 0..config.particle_count {
        let m = particle_real(&mut tokens, i, "mass")?;
        if m <= 0.0 {
            return Err(SimError::InvalidParticle {
                index: i,
                reason: format!("mass must be positive, got {m}"),
            });
        }

        let mut x = NVec3::zeros();
        for k in 0..NDIM {
            x[k] = particle_real(&mut tokens, i, "position component")?;
        }
        let mut v = NVec3::zeros();
        for k in 0..NDIM {
            v[k] = particle_real(&mut tokens, i, "velocity component")?;
        }

        let mut p = Particle::new(m, x, v);
        p.id = i as u32;
        particles.push(p);
    }
    Ok(particles)
}

/// Snapshot file name carrying the run parameters:
/// `<base>_BH<N/1000>K_theta<θ>_pLeaf<cap>_<seq>.dat`.
pub fn snapshot_path(base: &str, n: usize, theta: f64, leaf_capacity: usize, seq: u64) -> PathBuf {
    PathBuf::from(format!(
        "{base}_BH{}K_theta{theta:.2}_pLeaf{leaf_capacity}_{seq}.dat",
        n / 1000
    ))
}

fn write_snapshot(
    path: &Path,
    header: &str,
    count: usize,
    vectors: impl Iterator<Item = NVec3>,
) -> SimResult<()> {
    let file = File::create(path).map_err(|e| SimError::io(path, e))?;
    let mut out = BufWriter::new(file);

    (|| -> std::io::Result<()> {
        writeln!(out, "{header}")?;
        writeln!(out, "{count}")?;
        for v in vectors {
            writeln!(out, "{:+.17e} {:+.17e} {:+.17e}", v.x, v.y, v.z)?;
        }
        out.flush()
    })()
    .map_err(|e| SimError::io(path, e))
}

/// Write every particle's force vector, in input order.
pub fn write_forces_snapshot(particles: &[Particle], header: &str, path: &Path) -> SimResult<()> {
    write_snapshot(path, header, particles.len(), particles.iter().map(|p| p.f))
}

/// Write every particle's position vector, in input order.
pub fn write_positions_snapshot(
    particles: &[Particle],
    header: &str,
    path: &Path,
) -> SimResult<()> {
    write_snapshot(path, header, particles.len(), particles.iter().map(|p| p.x))
}

/// Write a random but reproducible input file: masses in [5000, 15000),
/// positions in [0, 10)^3, velocities in [0, 100)^3.
pub fn generate_test_data(path: &Path, config: &RunConfig, seed: u64) -> SimResult<()> {
    config.validate()?;

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let file = File::create(path).map_err(|e| SimError::io(path, e))?;
    let mut out = BufWriter::new(file);

    (|| -> std::io::Result<()> {
        writeln!(
            out,
            "{}\n{}\n{}\n{}",
            config.particle_count, config.t_start, config.t_end, config.dt
        )?;
        for _ in 0..config.particle_count {
            write!(out, "{}", rng.gen_range(5000.0..15000.0))?;
            for _ in 0..NDIM {
                write!(out, " {}", rng.gen_range(0.0..10.0))?;
            }
            for _ in 0..NDIM {
                write!(out, " {}", rng.gen_range(0.0..100.0))?;
            }
            writeln!(out)?;
        }
        out.flush()
    })()
    .map_err(|e| SimError::io(path, e))
}
