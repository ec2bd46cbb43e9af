use std::fmt::Write;

use crate::models::{Selection, SeriesStats};

const CLASSNAME: &str = "ml.eval";

/// Renders the chosen operating point as a JUnit-style testsuite so CI systems can
/// display precision, recall and F1 next to regular test results.
pub fn render(suite_name: &str, selection: &Selection) -> String {
    let point = &selection.point;
    let mut xml = String::new();

    let _ = writeln!(xml, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    let _ = writeln!(
        xml,
        r#"<testsuite name="{}" tests="3" failures="0">"#,
        escape(suite_name)
    );
    for (name, value) in [
        ("precision", point.precision),
        ("recall", point.recall),
        ("f1", point.f1),
    ] {
        let _ = writeln!(xml, r#"  <testcase classname="{CLASSNAME}" name="{name}">"#);
        let _ = writeln!(xml, "    <system-out>{value:.6}</system-out>");
        let _ = writeln!(xml, "  </testcase>");
    }
    let _ = writeln!(xml, "  <system-out><![CDATA[");
    let _ = writeln!(
        xml,
        "Threshold usado: {}={}",
        selection.strategy, point.threshold
    );
    let _ = writeln!(
        xml,
        "TP={} FP={} TN={} FN={}",
        point.tp, point.fp, point.tn, point.fn_
    );
    let _ = writeln!(
        xml,
        "Precision={:.4}  Recall={:.4}  F1={:.4}",
        point.precision, point.recall, point.f1
    );
    let _ = writeln!(xml, "{}", distribution_line("ALL", &selection.scores_all));
    let _ = writeln!(
        xml,
        "{}",
        distribution_line("PRED_POS", &selection.scores_predicted_positive)
    );
    let _ = writeln!(xml, "  ]]></system-out>");
    let _ = writeln!(xml, "</testsuite>");
    xml
}

fn distribution_line(label: &str, stats: &SeriesStats) -> String {
    format!(
        "SCORES {}: mean={:.4}, median={:.4}, std={:.4}, cv={:.4}",
        label, stats.mean, stats.median, stats.std, stats.cv
    )
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
