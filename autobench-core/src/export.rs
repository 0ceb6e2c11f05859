//! CSV export of benchmark results.

use std::fmt::Write;

use crate::result::BenchmarkResult;

/// Header row written by [`render_csv`].
pub const CSV_HEADER: &str = "TestCase,Temperature,TopP,TopK,MinP,RepeatPenalty,FrequencyPenalty,PresencePenalty,MaxTokens,Seed,Score%,Pass,TokensPerSec,TTFT,Latency,Response";

/// Render results as CSV, one row per result.
///
/// The test case name and response are always quoted with embedded quotes
/// doubled. Time to first token and latency are in seconds.
#[must_use]
pub fn render_csv(results: &[BenchmarkResult]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for r in results {
        let c = &r.config;
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{},{:.1},{},{:.1},{:.2},{:.1},{}",
            quote(&r.test_case_name),
            c.temperature,
            c.top_p,
            c.top_k,
            c.min_p,
            c.repeat_penalty,
            c.frequency_penalty,
            c.presence_penalty,
            c.max_tokens,
            c.seed,
            r.match_percentage,
            r.is_pass,
            r.metrics.tokens_per_second,
            r.metrics.time_to_first_token_ms / 1000.0,
            r.metrics.total_latency_ms / 1000.0,
            quote(&r.response),
        );
    }
    out
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}
