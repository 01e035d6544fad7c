use anyhow::{Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Report path that means "read from standard input".
pub const STDIN_REPORT: &str = "-";

lazy_static! {
    static ref SHA1_PATTERN: Regex = Regex::new(r"SHA1: ([A-Za-z0-9_:]+)").unwrap();
    static ref SHA256_PATTERN: Regex = Regex::new(r"SHA-256: ([A-Za-z0-9_:]+)").unwrap();
}

/// Digest algorithms recognized in a signing report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Sha1,
    Sha256,
}

impl Algorithm {
    /// Output order of the fingerprint blocks.
    pub const ALL: [Algorithm; 2] = [Algorithm::Sha1, Algorithm::Sha256];

    pub fn label(self) -> &'static str {
        match self {
            Algorithm::Sha1 => "SHA1",
            Algorithm::Sha256 => "SHA-256",
        }
    }

    fn pattern(self) -> &'static Regex {
        match self {
            Algorithm::Sha1 => &SHA1_PATTERN,
            Algorithm::Sha256 => &SHA256_PATTERN,
        }
    }

    /// Returns the value of the first `<label>: <value>` occurrence in `report`.
    pub fn find_first(self, report: &str) -> Option<&str> {
        self.pattern()
            .captures(report)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A colon separated digest, kept as its individual tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub algorithm: Algorithm,
    pub tokens: Vec<String>,
}

impl Fingerprint {
    pub fn parse(algorithm: Algorithm, value: &str) -> Self {
        Self {
            algorithm,
            tokens: value.split(':').map(str::to_owned).collect(),
        }
    }

    /// Regroups the tokens into lines of at most `size` tokens.
    pub fn groups(&self, size: usize) -> Vec<String> {
        self.tokens
            .chunks(size.max(1))
            .map(|chunk| chunk.join(":"))
            .collect()
    }

    /// Renders the `--- <label> ---` block, one newline-terminated line per group.
    pub fn render(&self, size: usize) -> String {
        let mut out = format!("--- {} ---\n", self.algorithm);
        for line in self.groups(size) {
            out.push_str(&line);
            out.push('\n');
        }
        out
    }
}

/// Extracts the first fingerprint of each known algorithm, SHA1 first.
pub fn extract(report: &str) -> Vec<Fingerprint> {
    Algorithm::ALL
        .iter()
        .filter_map(|&algorithm| {
            algorithm
                .find_first(report)
                .map(|value| Fingerprint::parse(algorithm, value))
        })
        .collect()
}

pub fn render_all(fingerprints: &[Fingerprint], group_size: usize) -> String {
    fingerprints
        .iter()
        .map(|fingerprint| fingerprint.render(group_size))
        .collect()
}

pub fn render_report(report: &str, group_size: usize) -> String {
    render_all(&extract(report), group_size)
}

pub fn read_report(path: &Path) -> Result<String> {
    if path.as_os_str() == STDIN_REPORT {
        return io::read_to_string(io::stdin()).context("Failed to read report from stdin");
    }
    fs::read_to_string(path).with_context(|| format!("Failed to read report {}", path.display()))
}

/// Reads the report at `path` and prints its formatted fingerprints to stdout.
///
/// A missing report is fatal and propagates to the caller.
pub fn run(path: &Path, group_size: usize) -> Result<()> {
    let report = read_report(path)?;
    let fingerprints = extract(&report);
    tracing::info!(
        "Found {} fingerprint(s) in {}",
        fingerprints.len(),
        path.display()
    );

    let mut stdout = io::stdout().lock();
    stdout.write_all(render_all(&fingerprints, group_size).as_bytes())?;
    stdout.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_REPORT: &str = "\
> Task :app:signingReport
Variant: debug
Config: debug
Store: /home/dev/.android/debug.keystore
Alias: AndroidDebugKey
MD5: 4A:1B:22:9C:AA:0D:12:34:56:78:9A:BC:DE:F0:11:22
SHA1: 9F:86:D0:81:88:4C:7D:65:9A:2F:EA:A0:C5:5A:D0:15:A3:BF:4F:1B
SHA-256: 2C:26:B4:6B:68:FF:C6:8F:F9:9B:45:3C:1D:30:41:34:13:42:2D:70:64:83:BF:A0:F9:8A:5E:88:62:66:E7:AE
Valid until: Friday, 10 March 2051
----------
Variant: release
Config: release
SHA1: 00:11:22:33:44:55:66:77:88:99:AA:BB:CC:DD:EE:FF:00:11:22:33
SHA-256: FF:EE:DD:CC:BB:AA:99:88:77:66:55:44:33:22:11:00:FF:EE:DD:CC:BB:AA:99:88:77:66:55:44:33:22:11:00
";

    #[test]
    fn inline_example_matches_expected_output() {
        let report = "SHA1: AB:CD:EF:01:23:45:67:89:AA SHA-256: 11:22:33";
        assert_eq!(
            render_report(report, 8),
            "--- SHA1 ---\nAB:CD:EF:01:23:45:67:89\nAA\n--- SHA-256 ---\n11:22:33\n"
        );
    }

    #[test]
    fn only_first_occurrence_is_used() {
        let fingerprints = extract(SAMPLE_REPORT);
        assert_eq!(fingerprints.len(), 2);
        assert_eq!(fingerprints[0].algorithm, Algorithm::Sha1);
        assert_eq!(fingerprints[0].tokens[0], "9F");
        assert_eq!(fingerprints[1].algorithm, Algorithm::Sha256);
        assert_eq!(fingerprints[1].tokens[0], "2C");
        assert!(!render_report(SAMPLE_REPORT, 8).contains("00:11:22:33"));
    }

    #[test]
    fn groups_cover_all_tokens_in_order() {
        for n in [1usize, 7, 8, 9, 16, 20, 32] {
            let value = (0..n)
                .map(|i| format!("{:02X}", i))
                .collect::<Vec<_>>()
                .join(":");
            let fingerprint = Fingerprint::parse(Algorithm::Sha1, &value);
            let lines = fingerprint.groups(8);

            assert_eq!(lines.len(), n.div_ceil(8), "line count for {n} tokens");
            assert!(lines.iter().all(|line| line.split(':').count() <= 8));
            assert_eq!(lines.join(":"), value);
        }
    }

    #[test]
    fn sha256_block_is_split_into_four_lines() {
        let rendered = render_report(SAMPLE_REPORT, 8);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "--- SHA1 ---");
        assert_eq!(lines[1], "9F:86:D0:81:88:4C:7D:65");
        assert_eq!(lines[3], "A3:BF:4F:1B");
        assert_eq!(lines[4], "--- SHA-256 ---");
        assert_eq!(lines.len(), 9);
    }

    #[test]
    fn report_without_fingerprints_renders_nothing() {
        assert!(extract("MD5: 00:11\nnothing to see").is_empty());
        assert_eq!(render_report("", 8), "");
    }

    #[test]
    fn sha256_alone_is_reported() {
        let rendered = render_report("Store: x\nSHA-256: AA:BB\n", 8);
        assert_eq!(rendered, "--- SHA-256 ---\nAA:BB\n");
    }

    #[test]
    fn value_stops_at_characters_outside_the_token_set() {
        let value = Algorithm::Sha1.find_first("SHA1: AB:CD, trailing").unwrap();
        assert_eq!(value, "AB:CD");
        assert_eq!(
            Algorithm::Sha1.find_first("SHA1: hex_ok:Z9\n"),
            Some("hex_ok:Z9")
        );
    }

    #[test]
    fn custom_group_size_is_respected() {
        let fingerprint = Fingerprint::parse(Algorithm::Sha1, "A:B:C:D:E");
        assert_eq!(fingerprint.groups(2), vec!["A:B", "C:D", "E"]);
    }

    #[test]
    fn missing_report_is_an_error() {
        let err = read_report(Path::new("/nonexistent/signing_report.txt")).unwrap_err();
        assert!(format!("{err:#}").contains("signing_report.txt"));
    }
}
