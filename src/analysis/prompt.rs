// Request text sent to the analysis service

use std::fmt::Write;

use crate::audiometry::SeverityLevel;
use crate::history::Session;

/// Human-readable severity name for `language`
pub fn severity_label(severity: SeverityLevel, language: &str) -> &'static str {
    if language == "zh" {
        match severity {
            SeverityLevel::Normal => "正常",
            SeverityLevel::Mild => "轻度",
            SeverityLevel::Moderate => "中度",
            SeverityLevel::Severe => "重度",
            SeverityLevel::Profound => "极重度",
        }
    } else {
        match severity {
            SeverityLevel::Normal => "Normal",
            SeverityLevel::Mild => "Mild",
            SeverityLevel::Moderate => "Moderate",
            SeverityLevel::Severe => "Severe",
            SeverityLevel::Profound => "Profound",
        }
    }
}

/// Build the language-tagged summary of `session`.
///
/// `zh` selects the Chinese template; every other code gets English.
pub fn format_prompt(session: &Session, language: &str) -> String {
    let chinese = language == "zh";
    let mut prompt = String::new();

    prompt.push_str(if chinese {
        "请分析以下听力测试结果：\n"
    } else {
        "Please analyze the following hearing test results:\n"
    });

    for result in session.results() {
        // Writing to a String cannot fail
        let _ = if chinese {
            writeln!(prompt, "频率 {}Hz: {:.1}dB", result.frequency, result.threshold)
        } else {
            writeln!(
                prompt,
                "Frequency {}Hz: {:.1}dB",
                result.frequency, result.threshold
            )
        };
    }

    let average = session.average_threshold();
    let label = severity_label(session.severity(), language);
    let _ = if chinese {
        write!(
            prompt,
            "\n平均听力损失：{:.1}dB\n听力等级：{}\n\n请用中文给出专业的分析和建议。",
            average, label
        )
    } else {
        write!(
            prompt,
            "\nAverage hearing loss: {:.1}dB\nHearing level: {}\n\nPlease provide professional analysis and suggestions in English.",
            average, label
        )
    };

    prompt
}
