//! `lognorm normalize` command handler

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use lognorm_core::types::Record;
use lognorm_normalizer::NormalizerPool;

use crate::cli::NormalizeArgs;
use crate::commands::{ConfigSource, build_pool};
use crate::error::CliError;

/// Execute the `normalize` command.
///
/// Every input line becomes one JSON record on stdout, whether it matched or not.
pub async fn execute(args: NormalizeArgs, source: &ConfigSource) -> Result<(), CliError> {
    let config = source.load().await?;
    let pool = build_pool(&config).await?;
    disable_rule_sets(&pool, &args.disable);

    let mut out = std::io::BufWriter::new(std::io::stdout());

    let stats = match &args.file {
        Some(path) => {
            let file = tokio::fs::File::open(path).await?;
            normalize_lines(&pool, &args, BufReader::new(file), &mut out).await?
        }
        None => normalize_lines(&pool, &args, BufReader::new(tokio::io::stdin()), &mut out).await?,
    };
    out.flush()?;

    info!(lines = stats.lines, matched = stats.matched, "normalization finished");
    Ok(())
}

/// Line counters for the final log summary.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    pub lines: usize,
    pub matched: usize,
}

/// Apply `--disable` on top of the current activation state.
fn disable_rule_sets(pool: &NormalizerPool, disable: &[String]) {
    if disable.is_empty() {
        return;
    }

    let mut active: BTreeMap<String, bool> = pool.active_rule_sets();
    for id in disable {
        match active.get_mut(id) {
            Some(flag) => *flag = false,
            None => warn!(rule_set = %id, "cannot disable unknown rule set"),
        }
    }
    pool.set_active_rule_sets(active);
}

/// Build the input record for one line.
fn make_record(line: &str, args: &NormalizeArgs, timezone_field: &str) -> Record {
    let mut record = Record::with_field(args.field.as_str(), line);
    if let Some(zone) = &args.timezone {
        record.insert(timezone_field, zone.as_str());
    }
    record
}

/// Normalize every line of `reader`. Invalid UTF-8 is replaced, never fatal.
async fn normalize_lines<R: AsyncBufRead + Unpin>(
    pool: &NormalizerPool,
    args: &NormalizeArgs,
    mut reader: R,
    out: &mut dyn Write,
) -> Result<NormalizeStats, CliError> {
    let mut stats = NormalizeStats::default();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        stats.lines += 1;

        let bytes = buf.strip_suffix(b"\n").unwrap_or(&buf);
        let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
        let line = String::from_utf8_lossy(bytes);
        if matches!(line, Cow::Owned(_)) {
            warn!(line = stats.lines, "input line is not valid UTF-8, invalid bytes replaced");
        }
        let mut record = make_record(&line, args, pool.timezone_field());

        if pool.normalize(&mut record) > 0 {
            stats.matched += 1;
        }

        serde_json::to_writer(&mut *out, &record)?;
        writeln!(out)?;
    }

    Ok(stats)
}
