//! Line-based diffs between local and upstream file content.
//!
//! The alignment is a longest-common-subsequence over lines after trimming the
//! common prefix and suffix. Lines keep their terminators, so a missing final
//! newline is a real difference and shows up as one.

use serde::Serialize;
use std::collections::HashSet;
use std::fmt::Write as _;
use tracing::debug;

/// Line counts of a diff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffStats {
    pub added: usize,
    pub removed: usize,
    pub unchanged: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpKind {
    Equal,
    Removed,
    Added,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct DiffOp {
    kind: OpKind,
    line: String,
}

/// Result of comparing two texts line by line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    /// Byte-for-byte equality of the inputs
    pub identical: bool,
    pub stats: DiffStats,
    ops: Vec<DiffOp>,
}

impl FileDiff {
    /// Compare `old` (local) against `new` (upstream).
    ///
    /// Non-UTF-8 input is compared lossily for display; `identical` is always
    /// decided on the raw bytes.
    #[must_use]
    pub fn between(old: &[u8], new: &[u8]) -> Self {
        let identical = old == new;
        let old_text = String::from_utf8_lossy(old);
        let new_text = String::from_utf8_lossy(new);
        let old_lines: Vec<&str> = old_text.split_inclusive('\n').collect();
        let new_lines: Vec<&str> = new_text.split_inclusive('\n').collect();

        let ops = line_ops(&old_lines, &new_lines);
        let mut stats = DiffStats::default();
        for op in &ops {
            match op.kind {
                OpKind::Equal => stats.unchanged += 1,
                OpKind::Removed => stats.removed += 1,
                OpKind::Added => stats.added += 1,
            }
        }

        Self {
            identical,
            stats,
            ops,
        }
    }

    /// One-line summary such as `+3 -1`.
    #[must_use]
    pub fn summary(&self) -> String {
        format!("+{} -{}", self.stats.added, self.stats.removed)
    }

    /// Unified diff with `context` lines around each change.
    ///
    /// Returns an empty string when no line differs.
    #[must_use]
    pub fn render_unified(&self, old_label: &str, new_label: &str, context: usize) -> String {
        let changes: Vec<usize> = self
            .ops
            .iter()
            .enumerate()
            .filter(|(_, op)| op.kind != OpKind::Equal)
            .map(|(i, _)| i)
            .collect();
        if changes.is_empty() {
            return String::new();
        }

        // Op index ranges, merged when their context overlaps
        let mut hunks: Vec<(usize, usize)> = Vec::new();
        for &idx in &changes {
            let start = idx.saturating_sub(context);
            let end = (idx + 1 + context).min(self.ops.len());
            match hunks.last_mut() {
                Some(last) if start <= last.1 => last.1 = last.1.max(end),
                _ => hunks.push((start, end)),
            }
        }

        // Lines of each side consumed before op i
        let mut old_before = Vec::with_capacity(self.ops.len());
        let mut new_before = Vec::with_capacity(self.ops.len());
        let (mut old_pos, mut new_pos) = (0usize, 0usize);
        for op in &self.ops {
            old_before.push(old_pos);
            new_before.push(new_pos);
            match op.kind {
                OpKind::Equal => {
                    old_pos += 1;
                    new_pos += 1;
                }
                OpKind::Removed => old_pos += 1,
                OpKind::Added => new_pos += 1,
            }
        }

        let mut out = String::new();
        let _ = writeln!(out, "--- {old_label}");
        let _ = writeln!(out, "+++ {new_label}");

        for (start, end) in hunks {
            let slice = &self.ops[start..end];
            let old_count = slice.iter().filter(|op| op.kind != OpKind::Added).count();
            let new_count = slice.iter().filter(|op| op.kind != OpKind::Removed).count();
            let old_start = if old_count == 0 { old_before[start] } else { old_before[start] + 1 };
            let new_start = if new_count == 0 { new_before[start] } else { new_before[start] + 1 };
            let _ = writeln!(out, "@@ -{old_start},{old_count} +{new_start},{new_count} @@");

            for op in slice {
                let marker = match op.kind {
                    OpKind::Equal => ' ',
                    OpKind::Removed => '-',
                    OpKind::Added => '+',
                };
                match op.line.strip_suffix('\n') {
                    Some(line) => {
                        let _ = writeln!(out, "{marker}{}", line.strip_suffix('\r').unwrap_or(line));
                    }
                    None => {
                        let _ = writeln!(out, "{marker}{}", op.line);
                        out.push_str("\\ No newline at end of file\n");
                    }
                }
            }
        }

        out
    }
}

fn line_ops(old: &[&str], new: &[&str]) -> Vec<DiffOp> {
    let prefix = old.iter().zip(new).take_while(|(a, b)| a == b).count();
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let old_mid = &old[prefix..old.len() - suffix];
    let new_mid = &new[prefix..new.len() - suffix];

    let equal = |line: &str| DiffOp {
        kind: OpKind::Equal,
        line: line.to_string(),
    };

    let mut ops: Vec<DiffOp> = old[..prefix].iter().map(|l| equal(l)).collect();

    let alignment = lcs_alignment(old_mid, new_mid);
    let (mut i, mut j) = (0usize, 0usize);
    for (ai, bj) in alignment.into_iter().chain(std::iter::once((old_mid.len(), new_mid.len()))) {
        ops.extend(old_mid[i..ai].iter().map(|l| DiffOp {
            kind: OpKind::Removed,
            line: (*l).to_string(),
        }));
        ops.extend(new_mid[j..bj].iter().map(|l| DiffOp {
            kind: OpKind::Added,
            line: (*l).to_string(),
        }));
        if ai < old_mid.len() {
            ops.push(equal(old_mid[ai]));
        }
        i = ai + 1;
        j = bj + 1;
    }

    ops.extend(old[old.len() - suffix..].iter().map(|l| equal(l)));
    ops
}

/// Alignment tables larger than this are not built; the region is reported
/// as removed-then-added instead.
const MAX_ALIGNMENT_CELLS: usize = 4_000_000;

/// Matching `(old, new)` index pairs of a longest common subsequence.
fn lcs_alignment(a: &[&str], b: &[&str]) -> Vec<(usize, usize)> {
    // A line present on one side only is never part of the subsequence
    let in_a: HashSet<&str> = a.iter().copied().collect();
    let in_b: HashSet<&str> = b.iter().copied().collect();
    let a_idx: Vec<usize> = (0..a.len()).filter(|&i| in_b.contains(a[i])).collect();
    let b_idx: Vec<usize> = (0..b.len()).filter(|&j| in_a.contains(b[j])).collect();

    let m = a_idx.len();
    let n = b_idx.len();
    if m == 0 || n == 0 {
        return Vec::new();
    }

    let width = n + 1;
    let cells = (m + 1).saturating_mul(width);
    if cells > MAX_ALIGNMENT_CELLS {
        debug!("Diff region of {}x{} lines too large to align, reporting it as replaced", m, n);
        return Vec::new();
    }

    // dp[i * width + j] = LCS length of the first i and j candidate lines
    let mut dp = vec![0u32; cells];
    for i in 1..=m {
        for j in 1..=n {
            dp[i * width + j] = if a[a_idx[i - 1]] == b[b_idx[j - 1]] {
                dp[(i - 1) * width + j - 1] + 1
            } else {
                dp[i * width + j - 1].max(dp[(i - 1) * width + j])
            };
        }
    }

    let mut alignment = Vec::new();
    let (mut i, mut j) = (m, n);
    while i > 0 && j > 0 {
        if a[a_idx[i - 1]] == b[b_idx[j - 1]] {
            alignment.push((a_idx[i - 1], b_idx[j - 1]));
            i -= 1;
            j -= 1;
        } else if dp[i * width + j - 1] > dp[(i - 1) * width + j] {
            j -= 1;
        } else {
            i -= 1;
        }
    }

    alignment.reverse();
    alignment
}
