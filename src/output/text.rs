//! Human-readable terminal output.
//!
//! Colors come from yansi and are dropped globally with `--no-color` or
//! `NO_COLOR`, so the writers themselves never check.

use std::io::{self, Write};

use bytesize::ByteSize;
use yansi::Paint;

use crate::cascade::MatchGuarantee;
use crate::duplicates::{DuplicateGroup, ScanSummary};
use crate::scanner::CandidateFile;

/// Report of a `scan` run.
pub struct TextOutput<'a> {
    groups: &'a [DuplicateGroup],
    summary: &'a ScanSummary,
    show_stats: bool,
}

impl<'a> TextOutput<'a> {
    #[must_use]
    pub fn new(groups: &'a [DuplicateGroup], summary: &'a ScanSummary) -> Self {
        Self {
            groups,
            summary,
            show_stats: false,
        }
    }

    /// Append the per-stage table.
    #[must_use]
    pub fn with_stats(mut self, show: bool) -> Self {
        self.show_stats = show;
        self
    }

    /// # Errors
    ///
    /// Returns any error from the writer.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        for (idx, group) in self.groups.iter().enumerate() {
            write_group(w, idx + 1, group)?;
        }
        self.write_unreadable(w)?;
        self.write_footer(w)?;
        if self.show_stats {
            self.write_stats(w)?;
        }
        Ok(())
    }

    fn write_unreadable<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let summary = self.summary;
        if !summary.has_errors() {
            return Ok(());
        }
        writeln!(
            w,
            "{}",
            format!(
                "Skipped {} unreadable file(s), {} walk error(s):",
                summary.unreadable.len(),
                summary.scan_errors.len()
            )
            .yellow()
        )?;
        for file in &summary.unreadable {
            writeln!(w, "  {} ({})", file.path.display(), file.kind)?;
        }
        for err in &summary.scan_errors {
            writeln!(w, "  {err}")?;
        }
        writeln!(w)
    }

    fn write_footer<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let summary = self.summary;
        if self.groups.is_empty() {
            writeln!(
                w,
                "{} among {} files ({}).",
                "No duplicates found".green(),
                summary.total_files,
                summary.total_size_display()
            )?;
        } else {
            writeln!(
                w,
                "{} duplicate group(s), {} redundant file(s), {} reclaimable ({:.1}% of {}).",
                summary.duplicate_groups.bold(),
                summary.duplicate_files,
                summary.reclaimable_display().bold(),
                summary.wasted_percentage(),
                summary.total_size_display()
            )?;
        }

        let plan: Vec<&str> = summary.plan.iter().map(|k| k.name()).collect();
        let guarantee = summary
            .guarantee
            .map_or_else(|| "-".to_string(), |g| g.to_string());
        writeln!(
            w,
            "Cascade: {} (chunk {}, {}), read {} in {:.2?}.",
            plan.join(" > "),
            summary.chunk_policy,
            guarantee,
            ByteSize::b(summary.bytes_read),
            summary.scan_duration
        )?;

        if summary.interrupted {
            writeln!(
                w,
                "{}",
                format!(
                    "Interrupted: {} size bucket(s) were not examined; results are incomplete.",
                    summary.buckets_skipped
                )
                .red()
                .bold()
            )?;
        }
        Ok(())
    }

    fn write_stats<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let summary = self.summary;
        writeln!(w)?;
        writeln!(w, "{}", "Stage statistics".bold().underline())?;
        writeln!(
            w,
            "{:<15} {:>9} {:>9} {:>10} {:>7} {:>7} {:>11} {:>9}",
            "probe", "files in", "groups", "eliminated", "rate", "failed", "read", "time"
        )?;
        writeln!(
            w,
            "{:<15} {:>9} {:>9} {:>10} {:>6.1}% {:>7} {:>11} {:>9}",
            "size",
            summary.total_files,
            summary.size_buckets,
            summary.eliminated_by_size,
            percent(summary.eliminated_by_size, summary.total_files),
            0,
            "-",
            "-"
        )?;
        for stage in &summary.stages {
            writeln!(
                w,
                "{:<15} {:>9} {:>9} {:>10} {:>6.1}% {:>7} {:>11} {:>9}",
                stage.kind.name(),
                stage.files_in,
                stage.groups_out,
                stage.eliminated,
                stage.elimination_rate(),
                stage.failed,
                ByteSize::b(stage.bytes_read).to_string(),
                format!("{:.1?}", stage.duration)
            )?;
        }
        writeln!(
            w,
            "{} windows read, {} cache hits, {} fingerprints compared, {} exact group(s).",
            summary.probes_executed,
            summary.cache_hits,
            summary.fingerprints_compared,
            summary.exact_groups
        )
    }
}

fn write_group<W: Write>(w: &mut W, number: usize, group: &DuplicateGroup) -> io::Result<()> {
    let guarantee = match group.guarantee {
        MatchGuarantee::Exact => "exact".green().to_string(),
        MatchGuarantee::Probabilistic => "probabilistic".yellow().to_string(),
    };
    writeln!(
        w,
        "{} {} files, {} each, {} [{}]",
        format!("Group {number}:").cyan().bold(),
        group.len(),
        ByteSize::b(group.size),
        guarantee,
        &group.fingerprint_hex()[..16]
    )?;
    for path in &group.files {
        writeln!(w, "  {}", path.display())?;
    }
    writeln!(w)
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Candidate listing for `dupsift list`: size then path, largest first.
///
/// # Errors
///
/// Returns any error from the writer.
pub fn write_candidates<W: Write>(w: &mut W, files: &[CandidateFile]) -> io::Result<()> {
    for file in files {
        writeln!(
            w,
            "{:>12}  {}",
            ByteSize::b(file.size).to_string(),
            file.path.display()
        )?;
    }
    let total: u64 = files.iter().map(|f| f.size).sum();
    writeln!(w, "{} files, {}", files.len(), ByteSize::b(total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascade::{Fingerprint, ProbeKind};
    use crate::duplicates::{StageStats, UnreadableFile};
    use std::path::PathBuf;

    fn render(output: &TextOutput<'_>) -> String {
        yansi::disable();
        let mut buffer = Vec::new();
        output.write_to(&mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    fn sample_group() -> DuplicateGroup {
        DuplicateGroup::new(
            Fingerprint::from_bytes([0xab; 32]),
            2048,
            vec![PathBuf::from("/data/a.bin"), PathBuf::from("/data/b.bin")],
            MatchGuarantee::Probabilistic,
        )
    }

    #[test]
    fn test_groups_are_listed() {
        let groups = vec![sample_group()];
        let summary = ScanSummary {
            plan: vec![ProbeKind::Size, ProbeKind::Front],
            duplicate_groups: 1,
            duplicate_files: 1,
            reclaimable_space: 2048,
            ..ScanSummary::default()
        };
        let text = render(&TextOutput::new(&groups, &summary));

        assert!(text.contains("Group 1: 2 files"));
        assert!(text.contains("probabilistic"));
        assert!(text.contains("abababababababab"));
        assert!(text.contains("  /data/a.bin\n  /data/b.bin\n"));
        assert!(text.contains("Cascade: size > front"));
        assert!(!text.contains("Stage statistics"));
    }

    #[test]
    fn test_no_duplicates_and_interruption() {
        let summary = ScanSummary {
            total_files: 3,
            interrupted: true,
            buckets_skipped: 2,
            ..ScanSummary::default()
        };
        let text = render(&TextOutput::new(&[], &summary));
        assert!(text.contains("No duplicates found among 3 files"));
        assert!(text.contains("2 size bucket(s) were not examined"));
    }

    #[test]
    fn test_unreadable_and_stats() {
        let mut front = StageStats::new(ProbeKind::Front);
        front.files_in = 10;
        front.eliminated = 5;
        let summary = ScanSummary {
            total_files: 20,
            eliminated_by_size: 10,
            stages: vec![front],
            unreadable: vec![UnreadableFile {
                path: PathBuf::from("/locked"),
                kind: "permission_denied",
                reason: "Permission denied: /locked".to_string(),
            }],
            ..ScanSummary::default()
        };
        let text = render(&TextOutput::new(&[], &summary).with_stats(true));
        assert!(text.contains("Skipped 1 unreadable file(s)"));
        assert!(text.contains("/locked (permission_denied)"));
        assert!(text.contains("Stage statistics"));
        assert!(text.contains("front"));
        assert!(text.contains("50.0%"));
    }

    #[test]
    fn test_write_candidates() {
        let files = vec![
            CandidateFile::new("/x/big", 4096),
            CandidateFile::new("/x/small", 10),
        ];
        let mut buffer = Vec::new();
        write_candidates(&mut buffer, &files).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.lines().next().unwrap().ends_with("/x/big"));
        assert!(text.lines().last().unwrap().starts_with("2 files, "));
    }
}
