//! Common utilities for integration tests
//!
//! This module provides cleanup guards and helper functions for integration tests.

use anyhow::Result;
use std::process::Command;
use std::thread;
use std::time::Duration;

/// Guard that ensures Docker container cleanup on drop (even on panic)
pub struct ContainerGuard {
    name: String,
}

impl ContainerGuard {
    pub fn new(name: String) -> Self {
        Self { name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for ContainerGuard {
    fn drop(&mut self) {
        cleanup_container(&self.name);
    }
}

/// Stop and remove a Docker container with its anonymous volumes
fn cleanup_container(name: &str) {
    let _ = Command::new("docker").args(["stop", name]).output();
    let _ = Command::new("docker").args(["rm", "-v", name]).output();
}

/// Helper to check if Docker is available
pub fn is_docker_available() -> bool {
    Command::new("docker")
        .arg("ps")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Start a PostgreSQL container and wait until it accepts connections
pub fn start_postgres_container(name: &str) -> Result<ContainerGuard> {
    let guard = ContainerGuard::new(name.to_string());
    let output = Command::new("docker")
        .args([
            "run",
            "-d",
            "--name",
            name,
            "-e",
            "POSTGRES_PASSWORD=testpass",
            "-e",
            "POSTGRES_DB=orders",
            "postgres:15-alpine",
        ])
        .output()?;
    if !output.status.success() {
        anyhow::bail!(
            "docker run failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }

    for _ in 0..30 {
        let ready = Command::new("docker")
            .args(["exec", name, "pg_isready", "-U", "postgres"])
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false);
        if ready {
            // pg_isready can succeed during the init restart
            thread::sleep(Duration::from_secs(2));
            return Ok(guard);
        }
        thread::sleep(Duration::from_secs(1));
    }

    Err(anyhow::anyhow!("PostgreSQL failed to become ready"))
}

/// Run SQL inside the container and return psql's unaligned output
pub fn psql(container: &str, db: &str, sql: &str) -> Result<String> {
    let output = Command::new("docker")
        .args([
            "exec", container, "psql", "-U", "postgres", "-d", db, "-tAc", sql,
        ])
        .output()?;
    if !output.status.success() {
        anyhow::bail!("psql failed: {}", String::from_utf8_lossy(&output.stderr));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
