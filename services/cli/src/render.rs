use calleval::error::AppError;
use calleval::evaluation::{MetricCatalog, MetricVerdict, PhaseTag, Polarity, Scorecard};
use calleval::transcript::{censor_segments, format_duration, CallTranscript, Segment};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::Serialize;
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Json,
    Text,
    Csv,
}

/// Scorecard plus the call metadata printed alongside it.
#[derive(Debug, Serialize)]
pub(crate) struct EvaluationReport {
    pub(crate) call_id: Option<String>,
    pub(crate) generated_at: DateTime<Utc>,
    pub(crate) duration: String,
    pub(crate) duration_seconds: f64,
    pub(crate) scorecard: Scorecard,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) transcript: Option<Vec<Segment>>,
}

impl EvaluationReport {
    pub(crate) fn new(
        transcript: &CallTranscript,
        scorecard: Scorecard,
        include_transcript: bool,
        censor: bool,
    ) -> Self {
        let duration_seconds = transcript.total_duration();
        let segments = include_transcript.then(|| {
            if censor {
                censor_segments(&transcript.segments)
            } else {
                transcript.segments.clone()
            }
        });

        Self {
            call_id: transcript.call_id.clone(),
            generated_at: Utc::now(),
            duration: format_duration(duration_seconds),
            duration_seconds,
            scorecard,
            transcript: segments,
        }
    }
}

pub(crate) fn write_report<W: Write>(
    report: &EvaluationReport,
    format: OutputFormat,
    out: W,
) -> Result<(), AppError> {
    match format {
        OutputFormat::Json => write_json(report, out),
        OutputFormat::Text => write_text(report, out),
        OutputFormat::Csv => write_csv(report, out),
    }
}

fn write_json<W: Write>(report: &EvaluationReport, mut out: W) -> Result<(), AppError> {
    serde_json::to_writer_pretty(&mut out, report).map_err(io::Error::from)?;
    writeln!(out)?;
    Ok(())
}

fn write_text<W: Write>(report: &EvaluationReport, mut out: W) -> Result<(), AppError> {
    let card = &report.scorecard;
    let speaker = card
        .primary_speaker
        .as_ref()
        .map(|speaker| speaker.as_str())
        .unwrap_or("unknown speaker");

    writeln!(
        out,
        "Call {} ({}), {}, {} segments scored",
        report.call_id.as_deref().unwrap_or("-"),
        report.duration,
        speaker,
        card.segments_evaluated
    )?;
    writeln!(
        out,
        "Score: {:.1} / {:.1} ({:.1}%) {}",
        card.total_score,
        card.max_score,
        card.percentage,
        card.rating.label()
    )?;

    writeln!(out, "\nPhase totals:")?;
    for tag in PhaseTag::ordered() {
        if let Some(total) = card.phase_totals.get(&tag) {
            writeln!(
                out,
                "  {:<18} {:>5.1} / {:<5.1}",
                tag.label(),
                total.score,
                total.max
            )?;
        }
    }

    for tag in PhaseTag::ordered() {
        let mut verdicts = card
            .metrics
            .values()
            .filter(|verdict| verdict.phase == tag)
            .peekable();
        if verdicts.peek().is_none() {
            continue;
        }
        writeln!(out, "\n{}:", tag.label())?;
        for verdict in verdicts {
            writeln!(out, "  {}", metric_line(verdict))?;
        }
    }

    if let Some(segments) = &report.transcript {
        writeln!(out, "\nTranscript:")?;
        for segment in segments {
            writeln!(
                out,
                "  [{}] {}: {}",
                format_duration(segment.start_seconds),
                segment.speaker_id.as_str(),
                segment.text
            )?;
        }
    }

    Ok(())
}

fn metric_line(verdict: &MetricVerdict) -> String {
    let mark = if verdict.detected { "x" } else { " " };
    let mut line = format!(
        "[{mark}] {:<34} {:>5.1} / {:<5.1}",
        verdict.label, verdict.weighted_score, verdict.weight
    );
    if let Some(index) = verdict.evidence.segment_index {
        line.push_str(&format!(" segment {index}"));
    }
    if let Some(rule) = &verdict.evidence.matched_rule {
        line.push_str(&format!(" matched `{rule}`"));
    }
    if let Some(canonical) = &verdict.credited_by {
        line.push_str(&format!(" via {canonical}"));
    }
    if verdict.evidence.no_evidence {
        line.push_str(" (no evidence)");
    }
    line
}

#[derive(Serialize)]
struct MetricRow<'a> {
    call_id: &'a str,
    metric: &'a str,
    label: &'a str,
    phase: PhaseTag,
    polarity: Polarity,
    detected: bool,
    score: f64,
    weight: f64,
    weighted_score: f64,
    segment_index: Option<usize>,
    matched_rule: Option<&'a str>,
    credited_by: Option<&'a str>,
}

fn write_csv<W: Write>(report: &EvaluationReport, out: W) -> Result<(), AppError> {
    let call_id = report.call_id.as_deref().unwrap_or_default();
    let mut writer = csv::Writer::from_writer(out);
    for verdict in report.scorecard.metrics.values() {
        writer
            .serialize(MetricRow {
                call_id,
                metric: &verdict.metric_name,
                label: &verdict.label,
                phase: verdict.phase,
                polarity: verdict.polarity,
                detected: verdict.detected,
                score: verdict.score,
                weight: verdict.weight,
                weighted_score: verdict.weighted_score,
                segment_index: verdict.evidence.segment_index,
                matched_rule: verdict.evidence.matched_rule.as_deref(),
                credited_by: verdict.credited_by.as_deref(),
            })
            .map_err(io::Error::from)?;
    }
    writer.flush()?;
    Ok(())
}

pub(crate) fn write_catalog<W: Write>(catalog: &MetricCatalog, mut out: W) -> Result<(), AppError> {
    writeln!(
        out,
        "Catalog {} ({} metrics, max score {:.1})",
        catalog.version(),
        catalog.metrics().len(),
        catalog.max_score()
    )?;
    for metric in catalog.metrics() {
        let phases = metric
            .phases
            .iter()
            .map(|phase| phase.label())
            .collect::<Vec<_>>()
            .join(", ");
        let mut line = format!(
            "  {:<28} {:>5.1}  {:<24} {} rules",
            metric.name,
            metric.weight,
            phases,
            metric.rules.len()
        );
        if metric.polarity == Polarity::Inverse {
            line.push_str(", inverse");
        }
        if let Some(canonical) = &metric.or_group {
            line.push_str(&format!(", or-group {canonical}"));
        }
        writeln!(out, "{line}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use calleval::evaluation::{EvaluationEngine, ExternalPredictions};
    use calleval::transcript::SpeakerId;

    fn sample_transcript() -> CallTranscript {
        let mut transcript = CallTranscript::new(vec![
            Segment::new(
                "SPEAKER_00",
                "Good morning, thank you for calling, this is Dana.",
                0.0,
                6.0,
            ),
            Segment::new("SPEAKER_01", "Hi, I need to move my appointment.", 7.0, 10.0),
            Segment::new("SPEAKER_00", "Um, can I have your date of birth?", 60.0, 65.0),
            Segment::new("SPEAKER_01", "This damn line keeps dropping.", 66.0, 70.0),
            Segment::new(
                "SPEAKER_00",
                "Is there anything else I can help you with?",
                280.0,
                290.0,
            ),
        ]);
        transcript.call_id = Some("call-42".to_string());
        transcript.primary_speaker = Some(SpeakerId::new("SPEAKER_00"));
        transcript
    }

    fn sample_report(include_transcript: bool, censor: bool) -> EvaluationReport {
        let transcript = sample_transcript();
        let engine = EvaluationEngine::new(MetricCatalog::standard().expect("standard catalog"));
        let scorecard = engine.evaluate(&transcript, &ExternalPredictions::default());
        EvaluationReport::new(&transcript, scorecard, include_transcript, censor)
    }

    fn render(report: &EvaluationReport, format: OutputFormat) -> String {
        let mut buffer = Vec::new();
        write_report(report, format, &mut buffer).expect("report renders");
        String::from_utf8(buffer).expect("utf-8 output")
    }

    #[test]
    fn json_report_carries_call_metadata() {
        let report = sample_report(false, false);
        let json: serde_json::Value =
            serde_json::from_str(&render(&report, OutputFormat::Json)).expect("valid json");

        assert_eq!(json["call_id"], "call-42");
        assert_eq!(json["duration"], "4:50");
        assert!(json["generated_at"].is_string());
        assert!(json["scorecard"]["metrics"]["professional_greeting"].is_object());
        assert!(json.get("transcript").is_none());
    }

    #[test]
    fn censored_transcript_masks_profanity_in_output() {
        let report = sample_report(true, true);
        let text = render(&report, OutputFormat::Text);

        assert!(text.contains("This d*** line keeps dropping."));
        assert!(!text.contains("damn"));
    }

    #[test]
    fn text_report_groups_metrics_by_phase() {
        let report = sample_report(false, false);
        let text = render(&report, OutputFormat::Text);

        assert!(text.starts_with("Call call-42 (4:50), SPEAKER_00, 3 segments scored"));
        assert!(text.contains("Phase totals:"));
        assert!(text.contains("\nOpening Spiel:\n"));
        assert!(text.contains("\nClosing/Wrap-up:\n"));
    }

    #[test]
    fn csv_report_has_one_row_per_metric() {
        let report = sample_report(false, false);
        let csv = render(&report, OutputFormat::Csv);
        let mut lines = csv.lines();

        let header = lines.next().expect("header row");
        assert!(header.starts_with("call_id,metric,label,phase,polarity,detected"));
        assert_eq!(lines.count(), report.scorecard.metrics.len());
        assert!(csv.contains("call-42,ended_call_properly,"));
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "reader went away"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_failures_surface_as_io_errors() {
        let report = sample_report(false, false);

        for format in [OutputFormat::Json, OutputFormat::Text, OutputFormat::Csv] {
            let err = write_report(&report, format, ClosedPipe).expect_err("write fails");
            match err {
                AppError::Io(err) => assert_eq!(err.kind(), io::ErrorKind::BrokenPipe),
                other => panic!("unexpected error for {format:?}: {other}"),
            }
        }
    }

    #[test]
    fn catalog_listing_names_every_metric() {
        let catalog = MetricCatalog::standard().expect("standard catalog");
        let mut buffer = Vec::new();
        write_catalog(&catalog, &mut buffer).expect("catalog renders");
        let listing = String::from_utf8(buffer).expect("utf-8 output");

        assert!(listing.starts_with("Catalog 2024.2 (13 metrics, max score 100.0)"));
        assert!(listing.contains("no_fillers_stammers"));
        assert!(listing.contains(", inverse"));
        assert!(listing.contains(", or-group active_listening"));
    }
}
