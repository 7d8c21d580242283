//! Human-readable rendering of node records.

use chaintelemetry_core::{BenchmarkScore, NodeRecord};

/// `1536` → `"2 KB"`. Uses 1024-based units, rounded to whole numbers.
pub fn format_bytes(bytes: f64) -> String {
    const SIZES: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];
    if bytes <= 0.0 || !bytes.is_finite() {
        return "0 Byte".to_string();
    }
    let mut scaled = bytes;
    let mut i = 0;
    while scaled >= 1024.0 && i < SIZES.len() - 1 {
        scaled /= 1024.0;
        i += 1;
    }
    format!("{} {}", scaled.round(), SIZES[i])
}

/// `value` or `value/max`.
pub fn format_score(score: &BenchmarkScore) -> String {
    match score.max {
        Some(max) => format!("{}/{max}", score.value),
        None => score.value.to_string(),
    }
}

/// Seconds since `startup_time` (unix millis), never negative.
pub fn uptime_secs(startup_time: u64, now_millis: i64) -> u64 {
    let now = u64::try_from(now_millis).unwrap_or(0);
    now.saturating_sub(startup_time) / 1000
}

/// Render every known section of `node`.
pub fn render_detail(node: &NodeRecord, now_millis: i64) -> String {
    let mut out = Vec::new();

    out.push("=== Node Details ===".to_string());
    out.push(format!("ID: {}", node.id));
    out.push(format!("Name: {}", node.name));
    out.push(format!("Implementation: {}", node.implementation));
    out.push(format!("Version: {}", node.version));
    if let Some(validator) = &node.validator {
        out.push(format!("Validator: {validator}"));
    }

    out.push("\n=== Network Info ===".to_string());
    out.push(format!("Peer Count: {}", node.network.peer_count));
    if let Some(peer_id) = &node.network.peer_id {
        out.push(format!("Peer ID: {peer_id}"));
    }
    if let Some(ip) = &node.network.ip {
        out.push(format!("IP: {ip}"));
    }

    let sys = &node.system;
    out.push("\n=== System Info ===".to_string());
    out.push(format!("CPU: {}", sys.cpu));
    out.push(format!("Memory: {}", format_bytes(sys.memory as f64)));
    out.push(format!("Cores: {}", sys.core_count));
    out.push(format!(
        "Virtual Machine: {}",
        if sys.is_virtual_machine { "Yes" } else { "No" }
    ));
    if let Some(kernel) = &sys.kernel {
        out.push(format!("Kernel: {kernel}"));
    }
    if let Some(distribution) = &sys.distribution {
        out.push(format!("Distribution: {distribution}"));
    }
    for (label, value) in [
        ("Target OS", &sys.target_os),
        ("Target Arch", &sys.target_arch),
        ("Target Env", &sys.target_env),
    ] {
        out.push(format!("{label}: {}", value.as_deref().unwrap_or("-")));
    }

    if let Some(bench) = &sys.benchmarks {
        out.push("\n=== Benchmarks ===".to_string());
        for (label, score) in [
            ("CPU Hashrate", &bench.cpu_hashrate_score),
            ("Memory Memcpy", &bench.memory_memcpy_score),
            ("Disk Sequential Write", &bench.disk_sequential_write_score),
            ("Disk Random Write", &bench.disk_random_write_score),
        ] {
            if let Some(score) = score {
                out.push(format!("{label}: {}", format_score(score)));
            }
        }
        if let Some(vendor) = &bench.cpu_vendor {
            out.push(format!("CPU Vendor: {vendor}"));
        }
    }

    if let Some(location) = &node.location {
        out.push("\n=== Location ===".to_string());
        if let Some(city) = &location.city {
            out.push(format!("City: {city}"));
        }
        if let (Some(lat), Some(lon)) = (location.latitude, location.longitude) {
            out.push(format!("Coordinates: {lat}, {lon}"));
        }
        if let Some(provider) = &location.provider {
            out.push(format!("Provider: {provider}"));
        }
    }

    if let Some(block) = &node.block {
        out.push("\n=== Block Info ===".to_string());
        out.push(format!("Height: {}", block.height));
        out.push(format!("Hash: {}", block.hash));
        if let Some(ms) = block.propagation_time {
            out.push(format!("Propagation Time: {ms}ms"));
        }
        if let Some(finalized) = block.finalized_height {
            out.push(format!("Finalized: {finalized}"));
        }
    }

    if let Some(hw) = &node.hardware {
        out.push("\n=== Hardware Stats ===".to_string());
        if let Some(up) = hw.upload.last() {
            out.push(format!("Latest Upload: {}/s", format_bytes(*up)));
        }
        if let Some(down) = hw.download.last() {
            out.push(format!("Latest Download: {}/s", format_bytes(*down)));
        }
    }

    if let Some(size) = node.io.as_ref().and_then(|io| io.state_cache_size.last()) {
        out.push("\n=== IO Stats ===".to_string());
        out.push(format!("Latest State Cache Size: {}", format_bytes(*size)));
    }

    out.push("\n=== Status ===".to_string());
    out.push(format!("Stale: {}", if node.stale { "Yes" } else { "No" }));
    out.push(format!("Transaction Count: {}", node.transaction_count));
    if let Some(startup) = node.startup_time {
        out.push(format!("Uptime: {} seconds", uptime_secs(startup, now_millis)));
    }

    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes() {
        assert_eq!(format_bytes(0.0), "0 Byte");
        assert_eq!(format_bytes(512.0), "512 Bytes");
        assert_eq!(format_bytes(1536.0), "2 KB");
        assert_eq!(format_bytes(68_719_476_736.0), "64 GB");
        assert_eq!(format_bytes(1024f64.powi(6)), "1048576 TB");
    }

    #[test]
    fn scores() {
        assert_eq!(format_score(&BenchmarkScore { value: 1500, max: None }), "1500");
        assert_eq!(format_score(&BenchmarkScore { value: 9000, max: Some(16000) }), "9000/16000");
    }

    #[test]
    fn uptime_never_underflows() {
        assert_eq!(uptime_secs(1_000, 61_000), 60);
        assert_eq!(uptime_secs(10_000, 5_000), 0);
        assert_eq!(uptime_secs(0, -1), 0);
    }
}
